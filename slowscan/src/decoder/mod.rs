//! Buffered SSTV decoder.
//!
//! Decoding runs in stages, each of which can also be driven on its own:
//!
//! 1. [`SstvDecoder::find_header`] slides over the stream looking for the
//!    calibration header.
//! 2. [`SstvDecoder::decode_vis`] reads the mode-select code behind it.
//! 3. [`SstvDecoder::decode_image_data`] samples every pixel, realigning on the
//!    horizontal sync pulses so timing drift does not accumulate.
//! 4. [`compose`] turns the channel grid into an RGB image.

mod header;
mod scan;
mod sync;
mod vis;

use image::RgbImage;

pub use self::{
    header::{
        BREAK_OFFSET,
        HEADER_SIZE,
        HEADER_WINDOW_SIZE,
        LEADER_OFFSET,
        VIS_START_OFFSET,
    },
    scan::ScanResult,
    sync::SyncEdge,
};
use crate::{
    GetSampleRate,
    VIS_BIT_TIME,
    image::compose,
    modes::{
        DefaultModes,
        ModeSelectError,
        ModeSpecification,
        SelectMode,
    },
    progress::{
        NoProgress,
        Progress,
        ReportProgress,
    },
    spectrum::SpectralAnalyzer,
    util::seconds_to_samples,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("couldn't find SSTV header")]
    HeaderNotFound,
    #[error("stream ended while reading the VIS code")]
    VisTruncated,
    #[error("error decoding VIS header")]
    ModeSelect(#[from] ModeSelectError),
    #[error("reached end of audio before image data")]
    NoImageData,
}

/// An image decoded from a transmission. If the stream ended early, only
/// the first `lines_decoded` lines hold image data.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub mode: ModeSpecification,
    pub image: RgbImage,
    pub lines_decoded: usize,
}

impl DecodedImage {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.lines_decoded == self.mode.num_lines
    }
}

#[derive(derive_more::Debug)]
pub struct SstvDecoder<'a, M = DefaultModes, P = NoProgress> {
    #[debug(skip)]
    samples: &'a [f32],
    sample_rate: f32,
    analyzer: SpectralAnalyzer,
    select_mode: M,
    #[debug(skip)]
    progress: P,
}

impl<'a> SstvDecoder<'a, DefaultModes, NoProgress> {
    #[inline]
    pub fn new(samples: &'a [f32], sample_rate: f32) -> Self {
        Self::new_with_mode_select(samples, sample_rate, DefaultModes)
    }
}

impl<'a, M> SstvDecoder<'a, M, NoProgress>
where
    M: SelectMode,
{
    pub fn new_with_mode_select(samples: &'a [f32], sample_rate: f32, select_mode: M) -> Self {
        // the VIS bits are the longest windows we analyze
        let analyzer = SpectralAnalyzer::for_window_time(sample_rate, VIS_BIT_TIME);

        Self {
            samples,
            sample_rate,
            analyzer,
            select_mode,
            progress: NoProgress,
        }
    }
}

impl<'a, M, P> SstvDecoder<'a, M, P>
where
    M: SelectMode,
    P: ReportProgress,
{
    pub fn with_progress<Q>(self, progress: Q) -> SstvDecoder<'a, M, Q>
    where
        Q: ReportProgress,
    {
        SstvDecoder {
            samples: self.samples,
            sample_rate: self.sample_rate,
            analyzer: self.analyzer,
            select_mode: self.select_mode,
            progress,
        }
    }

    /// Drops the first `seconds` of the stream.
    pub fn skip(&mut self, seconds: f32) {
        if seconds > 0.0 {
            let num_samples = seconds_to_samples(f64::from(seconds), self.sample_rate);
            tracing::debug!(seconds, num_samples, "skipping");
            self.samples = self.samples.get(num_samples..).unwrap_or_default();
        }
    }

    #[inline]
    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    /// The `length` samples starting at `offset`, if the stream is long
    /// enough.
    #[inline]
    fn window(&self, offset: usize, length: usize) -> Option<&'a [f32]> {
        self.samples.get(offset..offset.checked_add(length)?)
    }

    #[inline]
    fn peak_frequency_at(&mut self, offset: usize, length: usize) -> Option<f32> {
        let window = self.window(offset, length)?;
        Some(self.analyzer.peak_frequency(window))
    }

    #[inline]
    fn samples_for(&self, seconds: f64) -> usize {
        seconds_to_samples(seconds, self.sample_rate)
    }

    /// Finds the header and reads the VIS code. Returns the mode and the
    /// offset at which the image data starts.
    pub fn detect_mode(&mut self) -> Result<(ModeSpecification, usize), DecodeError> {
        let header_end = self.find_header().ok_or(DecodeError::HeaderNotFound)?;
        self.progress.report(Progress::HeaderFound { offset: header_end });

        let mode = self.decode_vis(header_end)?;
        self.progress.report(Progress::ModeDetected { name: mode.name });
        tracing::info!("detected SSTV mode {}", mode.name);

        // 8 VIS bits and the stop bit
        let vis_end = header_end + self.samples_for(VIS_BIT_TIME * 9.0);
        Ok((mode, vis_end))
    }

    pub fn decode(&mut self) -> Result<DecodedImage, DecodeError> {
        let (mode, vis_end) = self.detect_mode()?;

        let ScanResult {
            grid,
            lines_decoded,
        } = self.decode_image_data(vis_end, &mode)?;

        let image = compose(&grid, &mode);

        Ok(DecodedImage {
            mode,
            image,
            lines_decoded,
        })
    }
}

impl<M, P> GetSampleRate for SstvDecoder<'_, M, P> {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
