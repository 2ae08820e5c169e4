//! Horizontal sync alignment.

use super::SstvDecoder;
use crate::{
    modes::{
        ModeSpecification,
        SelectMode,
    },
    progress::ReportProgress,
};

/// Anything above this is picture data or porch, not a sync pulse.
const SYNC_THRESHOLD: f32 = 1350.0;

/// The sync window is a bit longer than the pulse itself.
const SYNC_WINDOW_FACTOR: f64 = 1.4;

/// Which edge of a sync pulse [`SstvDecoder::align_sync`] returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncEdge {
    Start,
    End,
}

impl<M, P> SstvDecoder<'_, M, P>
where
    M: SelectMode,
    P: ReportProgress,
{
    /// Scans forward from `start` for the next sync pulse.
    ///
    /// The first window whose peak frequency rises above the sync band marks
    /// the end of the pulse. Returns `None` if the stream ends first.
    pub fn align_sync(
        &mut self,
        start: usize,
        mode: &ModeSpecification,
        edge: SyncEdge,
    ) -> Option<usize> {
        let window = self.samples_for(mode.sync_time * SYNC_WINDOW_FACTOR);
        let stop = self.samples.len().checked_sub(window)?;

        let position = (start..stop).find(|&position| {
            self.peak_frequency_at(position, window)
                .is_some_and(|frequency| frequency > SYNC_THRESHOLD)
        })?;

        let sync_end = position + window / 2;

        match edge {
            SyncEdge::Start => Some(sync_end.saturating_sub(self.samples_for(mode.sync_time))),
            SyncEdge::End => Some(sync_end),
        }
    }
}
