//! Progress notifications for long-running encodes and decodes.
//!
//! Reporting is fire-and-forget: a sink cannot fail or stop the work it
//! observes.

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
    /// Searching for the calibration header, `seconds` into the stream.
    HeaderSearch { seconds: f32 },
    HeaderFound { offset: usize },
    ModeDetected { name: &'static str },
    /// `line` of `num_lines` has been decoded.
    DecodeLine { line: usize, num_lines: usize },
    /// `line` of `num_lines` has been rendered.
    EncodeLine { line: usize, num_lines: usize },
}

pub trait ReportProgress {
    fn report(&mut self, progress: Progress);
}

impl<F> ReportProgress for F
where
    F: FnMut(Progress),
{
    #[inline]
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ReportProgress for NoProgress {
    #[inline]
    fn report(&mut self, _progress: Progress) {}
}

/// Forwards progress to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ReportProgress for LogProgress {
    fn report(&mut self, progress: Progress) {
        match progress {
            Progress::HeaderSearch { seconds } => {
                tracing::debug!("searching for calibration header... {seconds:.1}s");
            }
            Progress::HeaderFound { offset } => {
                tracing::info!(offset, "found calibration header");
            }
            Progress::ModeDetected { name } => tracing::info!("detected SSTV mode {name}"),
            Progress::DecodeLine { line, num_lines } => {
                tracing::trace!("decoding image... line {}/{num_lines}", line + 1);
            }
            Progress::EncodeLine { line, num_lines } => {
                tracing::trace!("encoding image... line {}/{num_lines}", line + 1);
            }
        }
    }
}
