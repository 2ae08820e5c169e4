//! Calibration header search.

use super::SstvDecoder;
use crate::{
    LEADER_BREAK_TIME,
    LEADER_TIME,
    LEADER_TONE,
    SYNC_TONE,
    VIS_BIT_TIME,
    modes::SelectMode,
    progress::{
        Progress,
        ReportProgress,
    },
};

pub const BREAK_OFFSET: f64 = LEADER_TIME;
pub const LEADER_OFFSET: f64 = LEADER_TIME + LEADER_BREAK_TIME;
pub const VIS_START_OFFSET: f64 = 2.0 * LEADER_TIME + LEADER_BREAK_TIME;

/// Leader, break, leader and VIS start bit.
pub const HEADER_SIZE: f64 = VIS_START_OFFSET + VIS_BIT_TIME;

/// Length of the window probed for each of the four header tones.
pub const HEADER_WINDOW_SIZE: f64 = 0.010;

const SEARCH_STEP: f64 = 0.002;
const TOLERANCE: f32 = 50.0;
const PROGRESS_INTERVAL: usize = 256;

impl<M, P> SstvDecoder<'_, M, P>
where
    M: SelectMode,
    P: ReportProgress,
{
    /// Searches for the calibration header and returns the offset of the
    /// sample right after it, where the VIS code starts.
    pub fn find_header(&mut self) -> Option<usize> {
        let header_size = self.samples_for(HEADER_SIZE);
        let window_size = self.samples_for(HEADER_WINDOW_SIZE);
        let step = self.samples_for(SEARCH_STEP).max(1);

        let probes = [
            (0, LEADER_TONE),
            (self.samples_for(BREAK_OFFSET), SYNC_TONE),
            (self.samples_for(LEADER_OFFSET), LEADER_TONE),
            (self.samples_for(VIS_START_OFFSET), SYNC_TONE),
        ];

        let end = self.samples.len().checked_sub(header_size)?;

        for (i, position) in (0..end).step_by(step).enumerate() {
            if i % PROGRESS_INTERVAL == 0 {
                self.progress.report(Progress::HeaderSearch {
                    seconds: position as f32 / self.sample_rate,
                });
            }

            let found = probes.iter().all(|&(offset, tone)| {
                self.peak_frequency_at(position + offset, window_size)
                    .is_some_and(|frequency| (frequency - tone).abs() < TOLERANCE)
            });

            if found {
                tracing::debug!(position, "found calibration header");
                return Some(position + header_size);
            }
        }

        tracing::debug!("calibration header not found");
        None
    }
}
