//! Slow-scan television (SSTV) encoding and decoding.
//!
//! The decoder works on a fully buffered mono sample stream: it searches for
//! the calibration header, reads the VIS code to select a [mode][modes], and
//! then samples every pixel with a short FFT, re-synchronizing on the
//! horizontal sync pulses as it goes. The encoder renders the same waveform
//! from an RGB raster with a single phase-continuous oscillator.
//!
//! # References
//!
//! - <http://lionel.cordesses.free.fr/gpages/sstv.html>
//! - <https://web.archive.org/web/20120505141047/http://www.cs.helsinki.fi/u/okraisan/slowrx/>
//! - <http://www.barberdsp.com/downloads/Dayton%20Paper.pdf>
//! - <https://web.archive.org/web/20120313215600/http://lionel.cordesses.free.fr/gpages/Cordesses.pdf>

pub mod audio;
pub mod decoder;
pub mod encoder;
pub mod image;
pub mod modes;
pub mod progress;
pub mod spectrum;
pub mod tone;
mod util;

pub use crate::{
    audio::Audio,
    decoder::{
        DecodeError,
        DecodedImage,
        SstvDecoder,
    },
    encoder::SstvEncoder,
    image::FrameBuffer,
    modes::{
        ModeSpecification,
        VisCode,
    },
};

pub const LEADER_TONE: f32 = 1900.0;
pub const LEADER_TIME: f64 = 0.300;

pub const LEADER_BREAK_TIME: f64 = 0.010;

pub const VIS_BIT_TIME: f64 = 0.030;
pub const VIS_ONE_TONE: f32 = 1100.0;
pub const VIS_ZERO_TONE: f32 = 1300.0;

// sync, leader break, vis start/stop
pub const SYNC_TONE: f32 = 1200.0;

pub const PORCH_TONE: f32 = 1500.0;

// robot separator porch, and the separator in front of B-Y
pub const SEPARATOR_PORCH_TONE: f32 = 1900.0;
pub const ODD_SEPARATOR_TONE: f32 = 2300.0;

pub const CHANNEL_LOW_TONE: f32 = 1500.0;
pub const CHANNEL_HIGH_TONE: f32 = 2300.0;

/// Width of one of the 256 levels in the 1500 - 2300 Hz channel band.
pub const HERTZ_PER_LEVEL: f32 = 3.1372549;

pub trait GetSampleRate {
    fn sample_rate(&self) -> f32;
}

impl<T: GetSampleRate> GetSampleRate for &T {
    #[inline]
    fn sample_rate(&self) -> f32 {
        (&**self).sample_rate()
    }
}

/// Decodes an SSTV transmission from `samples`.
///
/// `skip_seconds` trims the start of the stream before the header search
/// begins. Running out of samples in the middle of the image is not an error:
/// check [`DecodedImage::is_complete`].
pub fn decode(
    samples: &[f32],
    sample_rate: f32,
    skip_seconds: f32,
) -> Result<DecodedImage, DecodeError> {
    let mut decoder = SstvDecoder::new(samples, sample_rate);
    decoder.skip(skip_seconds);
    decoder.decode()
}

/// Encodes `raster` with `mode` at [`encoder::DEFAULT_SAMPLE_RATE`].
pub fn encode<F>(raster: &F, mode: &ModeSpecification) -> Audio
where
    F: FrameBuffer,
{
    SstvEncoder::new(encoder::DEFAULT_SAMPLE_RATE).encode(raster, mode)
}
