use std::io::Write;

use slowscan::progress::{
    Progress,
    ReportProgress,
};

const BAR_WIDTH: usize = 30;

/// Draws progress on stderr, overwriting the current line.
#[derive(Debug, Default)]
pub struct ProgressBar;

impl ProgressBar {
    fn draw(&self, message: &str, current: usize, total: usize) {
        let fraction = if total > 1 {
            current as f32 / (total - 1) as f32
        }
        else {
            1.0
        };
        let filled = ((BAR_WIDTH as f32 * fraction).round() as usize).min(BAR_WIDTH);

        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\r{message} [{}{}] {:.0}%",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            fraction * 100.0
        );
        if current + 1 >= total {
            let _ = writeln!(stderr);
        }
    }
}

impl ReportProgress for ProgressBar {
    fn report(&mut self, progress: Progress) {
        match progress {
            Progress::HeaderSearch { seconds } => {
                eprint!("\rSearching for calibration header... {seconds:.1}s");
            }
            Progress::HeaderFound { .. } => {
                eprintln!("\rSearching for calibration header... Found!    ");
            }
            Progress::ModeDetected { name } => eprintln!("Detected SSTV mode {name}"),
            Progress::DecodeLine { line, num_lines } => {
                self.draw("Decoding image...", line, num_lines);
            }
            Progress::EncodeLine { line, num_lines } => {
                self.draw("Encoding image...", line, num_lines);
            }
        }
    }
}
