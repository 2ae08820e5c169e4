//! SSTV encoder.
//!
//! Renders the calibration header, the VIS code and every image line as one
//! continuous waveform. All tones are produced by a single
//! [`ToneGenerator`], so the phase never jumps between segments.

use crate::{
    GetSampleRate,
    LEADER_BREAK_TIME,
    LEADER_TIME,
    LEADER_TONE,
    ODD_SEPARATOR_TONE,
    PORCH_TONE,
    SEPARATOR_PORCH_TONE,
    SYNC_TONE,
    VIS_BIT_TIME,
    VIS_ONE_TONE,
    VIS_ZERO_TONE,
    audio::Audio,
    image::{
        FrameBuffer,
        rgb_to_yuv,
    },
    modes::{
        ModeSpecification,
        ScanLayout,
    },
    progress::{
        NoProgress,
        Progress,
        ReportProgress,
    },
    tone::ToneGenerator,
    util::{
        level_to_frequency,
        seconds_to_samples,
    },
};

pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

#[derive(Clone, Copy, Debug)]
struct Pulse {
    pub frequency: f32,
    pub duration: f64,
}

impl Pulse {
    #[inline]
    pub const fn new(frequency: f32, duration: f64) -> Self {
        Self {
            frequency,
            duration,
        }
    }
}

const HEADER: [Pulse; 4] = [
    Pulse::new(LEADER_TONE, LEADER_TIME),
    Pulse::new(SYNC_TONE, LEADER_BREAK_TIME),
    Pulse::new(LEADER_TONE, LEADER_TIME),
    // VIS start bit
    Pulse::new(SYNC_TONE, VIS_BIT_TIME),
];

/// One image line split into its color planes.
#[derive(Clone, Debug)]
struct LineData {
    red: Vec<u8>,
    green: Vec<u8>,
    blue: Vec<u8>,
}

impl LineData {
    /// Columns past the raster's right edge are black.
    fn read<F>(raster: &F, y: usize, width: usize) -> Self
    where
        F: FrameBuffer,
    {
        let mut line = Self {
            red: vec![0; width],
            green: vec![0; width],
            blue: vec![0; width],
        };

        for x in 0..width.min(raster.width()) {
            let [red, green, blue] = raster.rgb(x, y);
            line.red[x] = red;
            line.green[x] = green;
            line.blue[x] = blue;
        }

        line
    }
}

#[derive(derive_more::Debug)]
pub struct SstvEncoder<P = NoProgress> {
    tone: ToneGenerator,
    #[debug(skip)]
    samples: Vec<f32>,
    #[debug(skip)]
    progress: P,
}

impl SstvEncoder<NoProgress> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            tone: ToneGenerator::new(sample_rate),
            samples: vec![],
            progress: NoProgress,
        }
    }
}

impl Default for SstvEncoder<NoProgress> {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl<P> SstvEncoder<P>
where
    P: ReportProgress,
{
    pub fn with_progress<Q>(self, progress: Q) -> SstvEncoder<Q>
    where
        Q: ReportProgress,
    {
        SstvEncoder {
            tone: self.tone,
            samples: self.samples,
            progress,
        }
    }

    #[inline]
    fn samples_for(&self, seconds: f64) -> usize {
        seconds_to_samples(seconds, self.tone.sample_rate())
    }

    #[inline]
    fn emit(&mut self, pulse: Pulse) {
        let num_samples = self.samples_for(pulse.duration);
        self.tone
            .fill(pulse.frequency, num_samples, &mut self.samples);
    }

    /// Appends a tone of `frequency` Hz lasting `duration` seconds.
    pub fn emit_tone(&mut self, frequency: f32, duration: f64) {
        self.emit(Pulse::new(frequency, duration));
    }

    /// Appends the 8 VIS bits (LSB first, parity last) followed by the stop
    /// bit.
    pub fn emit_vis_bits(&mut self, bits: [bool; 8]) {
        for bit in bits {
            let frequency = if bit { VIS_ONE_TONE } else { VIS_ZERO_TONE };
            self.emit(Pulse::new(frequency, VIS_BIT_TIME));
        }
        self.emit(Pulse::new(SYNC_TONE, VIS_BIT_TIME));
    }

    /// Appends the calibration header and the mode's VIS code.
    pub fn emit_header(&mut self, mode: &ModeSpecification) {
        for pulse in HEADER {
            self.emit(pulse);
        }

        let mut bits = [false; 8];
        for (i, bit) in bits.iter_mut().take(7).enumerate() {
            *bit = mode.vis_code.get_bit(i as u8);
        }
        bits[7] = mode.vis_code.parity();

        self.emit_vis_bits(bits);
    }

    /// Appends a scan of `pixels` spread evenly over `duration` seconds.
    pub fn emit_scan(&mut self, pixels: &[u8], duration: f64) {
        if pixels.is_empty() {
            return;
        }

        let num_samples = self.samples_for(duration);
        let samples_per_pixel = duration * f64::from(self.tone.sample_rate()) / pixels.len() as f64;

        self.samples.reserve(num_samples);
        for i in 0..num_samples {
            let x = ((i as f64 / samples_per_pixel) as usize).min(pixels.len() - 1);
            let sample = self.tone.next(level_to_frequency(pixels[x]));
            self.samples.push(sample);
        }
    }

    fn emit_martin_line(&mut self, mode: &ModeSpecification, line: &LineData) {
        self.emit(Pulse::new(SYNC_TONE, mode.sync_time));
        self.emit(Pulse::new(PORCH_TONE, mode.porch_time));

        for channel in [&line.green, &line.blue, &line.red] {
            self.emit_scan(channel, mode.scan_time);
            self.emit(Pulse::new(PORCH_TONE, mode.sep_time));
        }
    }

    fn emit_scottie_line(&mut self, mode: &ModeSpecification, line: &LineData) {
        self.emit(Pulse::new(PORCH_TONE, mode.sep_time));
        self.emit_scan(&line.green, mode.scan_time);
        self.emit(Pulse::new(PORCH_TONE, mode.sep_time));
        self.emit_scan(&line.blue, mode.scan_time);
        self.emit(Pulse::new(SYNC_TONE, mode.sync_time));
        self.emit(Pulse::new(PORCH_TONE, mode.porch_time));
        self.emit_scan(&line.red, mode.scan_time);
    }

    /// Robot 36 sends luma on every line and one chroma component on
    /// alternating lines. Each chroma value is averaged over the line pair.
    fn emit_robot36_line(
        &mut self,
        mode: &ModeSpecification,
        y: usize,
        line: &LineData,
        partner: Option<&LineData>,
    ) {
        let half_scan_time = mode.half_scan_time.unwrap_or(mode.scan_time);
        let even = y % 2 == 0;

        let yuv = line_to_yuv(line);
        let partner_yuv = partner.map(line_to_yuv);

        // V on even lines, U on odd lines
        let component = if even { 2 } else { 1 };
        let chroma = yuv
            .iter()
            .enumerate()
            .map(|(x, own)| {
                match &partner_yuv {
                    Some(partner) => mean(own[component], partner[x][component]),
                    None => own[component],
                }
            })
            .collect::<Vec<_>>();
        let luma = yuv.iter().map(|pixel| pixel[0]).collect::<Vec<_>>();

        let separator = if even { PORCH_TONE } else { ODD_SEPARATOR_TONE };

        self.emit(Pulse::new(SYNC_TONE, mode.sync_time));
        self.emit(Pulse::new(PORCH_TONE, mode.porch_time));
        self.emit_scan(&luma, mode.scan_time);
        self.emit(Pulse::new(separator, mode.sep_time));
        self.emit(Pulse::new(SEPARATOR_PORCH_TONE, mode.sep_porch_time));
        self.emit_scan(&chroma, half_scan_time);
    }

    fn emit_robot72_line(&mut self, mode: &ModeSpecification, line: &LineData) {
        let half_scan_time = mode.half_scan_time.unwrap_or(mode.scan_time);

        let yuv = line_to_yuv(line);
        let plane = |component: usize| yuv.iter().map(|pixel| pixel[component]).collect::<Vec<_>>();

        self.emit(Pulse::new(SYNC_TONE, mode.sync_time));
        self.emit(Pulse::new(PORCH_TONE, mode.porch_time));
        self.emit_scan(&plane(0), mode.scan_time);
        self.emit(Pulse::new(PORCH_TONE, mode.sep_time));
        self.emit(Pulse::new(SEPARATOR_PORCH_TONE, mode.sep_porch_time));
        self.emit_scan(&plane(2), half_scan_time);
        self.emit(Pulse::new(ODD_SEPARATOR_TONE, mode.sep_time));
        self.emit(Pulse::new(SEPARATOR_PORCH_TONE, mode.sep_porch_time));
        self.emit_scan(&plane(1), half_scan_time);
    }

    /// Encodes `raster` and returns the complete transmission.
    ///
    /// The raster should match the mode's geometry. Rows below the mode's
    /// line count are ignored, missing rows are not transmitted and missing
    /// columns are sent as black.
    pub fn encode<F>(mut self, raster: &F, mode: &ModeSpecification) -> Audio
    where
        F: FrameBuffer,
    {
        tracing::debug!(mode = mode.name, "encoding image");

        if raster.width() != mode.pixels_per_line || raster.height() != mode.num_lines {
            tracing::warn!(
                "image dimensions ({}x{}) do not match {} ({}x{}), output may be distorted",
                raster.width(),
                raster.height(),
                mode.name,
                mode.pixels_per_line,
                mode.num_lines
            );
        }

        self.emit_header(mode);

        if mode.has_start_sync {
            self.emit(Pulse::new(SYNC_TONE, mode.sync_time));
        }

        let num_lines = mode.num_lines.min(raster.height());
        let width = mode.pixels_per_line;

        for y in 0..num_lines {
            let line = LineData::read(raster, y, width);

            match mode.layout {
                ScanLayout::Martin => self.emit_martin_line(mode, &line),
                ScanLayout::Scottie => self.emit_scottie_line(mode, &line),
                ScanLayout::Robot if mode.has_alternating_scan => {
                    let partner_y = if y % 2 == 0 { Some(y + 1) } else { y.checked_sub(1) };
                    let partner = partner_y
                        .filter(|partner_y| *partner_y < num_lines)
                        .map(|partner_y| LineData::read(raster, partner_y, width));
                    self.emit_robot36_line(mode, y, &line, partner.as_ref());
                }
                ScanLayout::Robot => self.emit_robot72_line(mode, &line),
            }

            self.progress.report(Progress::EncodeLine {
                line: y,
                num_lines: mode.num_lines,
            });
        }

        tracing::debug!(num_samples = self.samples.len(), "encoding done");

        Audio {
            sample_rate: self.tone.sample_rate(),
            samples: self.samples,
        }
    }

    /// Consumes the encoder and returns the samples emitted so far.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl<P> GetSampleRate for SstvEncoder<P> {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.tone.sample_rate()
    }
}

fn line_to_yuv(line: &LineData) -> Vec<[u8; 3]> {
    line.red
        .iter()
        .zip(&line.green)
        .zip(&line.blue)
        .map(|((red, green), blue)| rgb_to_yuv([*red, *green, *blue]))
        .collect()
}

#[inline]
fn mean(a: u8, b: u8) -> u8 {
    ((u16::from(a) + u16::from(b) + 1) / 2) as u8
}
