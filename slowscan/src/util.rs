use crate::{
    CHANNEL_HIGH_TONE,
    CHANNEL_LOW_TONE,
    HERTZ_PER_LEVEL,
};

#[inline]
pub fn seconds_to_samples(seconds: f64, sample_rate: f32) -> usize {
    (seconds * f64::from(sample_rate)).round().max(0.0) as usize
}

#[inline]
pub fn round_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Maps a channel tone to its 0 - 255 level. Tones outside the channel band
/// saturate.
#[inline]
pub fn frequency_to_level(frequency: f32) -> u8 {
    let frequency = frequency.clamp(CHANNEL_LOW_TONE, CHANNEL_HIGH_TONE);
    round_to_u8((frequency - CHANNEL_LOW_TONE) / HERTZ_PER_LEVEL)
}

#[inline]
pub fn level_to_frequency(level: u8) -> f32 {
    CHANNEL_LOW_TONE + f32::from(level) * HERTZ_PER_LEVEL
}
