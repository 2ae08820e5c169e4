//! Pixel sampling.

use super::{
    DecodeError,
    SstvDecoder,
    SyncEdge,
};
use crate::{
    image::ImageGrid,
    modes::{
        ModeSpecification,
        SelectMode,
    },
    progress::{
        Progress,
        ReportProgress,
    },
    util::frequency_to_level,
};

/// Channel values read from the stream.
#[derive(Clone, Debug)]
pub struct ScanResult {
    pub grid: ImageGrid,
    /// Number of lines fully decoded before the stream ran out.
    pub lines_decoded: usize,
}

impl<M, P> SstvDecoder<'_, M, P>
where
    M: SelectMode,
    P: ReportProgress,
{
    /// Samples every pixel of the image starting at `start`, the end of the
    /// VIS code.
    ///
    /// Each line is re-aligned on its sync pulse. If the stream ends
    /// mid-image, the lines decoded so far are returned and the rest of the
    /// grid stays zero.
    pub fn decode_image_data(
        &mut self,
        start: usize,
        mode: &ModeSpecification,
    ) -> Result<ScanResult, DecodeError> {
        let sample_rate = f64::from(self.sample_rate);
        let mut grid = ImageGrid::for_mode(mode);

        let mut sequence_start = start;
        if mode.has_start_sync {
            sequence_start = self
                .align_sync(start, mode, SyncEdge::End)
                .ok_or(DecodeError::NoImageData)?;
        }

        for line in 0..mode.num_lines {
            if line == 0 && mode.sync_channel > 0 {
                // the sync pulse sits in the middle of the line, so rewind to
                // where the line starts.
                let sync_offset = mode.channel_offsets[mode.sync_channel];
                sequence_start = sequence_start
                    .saturating_sub(self.samples_for(sync_offset + mode.scan_time));
            }

            for channel in 0..mode.num_channels {
                if channel == mode.sync_channel {
                    if line > 0 || channel > 0 {
                        sequence_start += self.samples_for(mode.line_time);
                    }

                    let Some(sync_start) = self.align_sync(sequence_start, mode, SyncEdge::Start)
                    else {
                        return Ok(self.end_of_stream(grid, line));
                    };
                    sequence_start = sync_start;
                }

                let pixel_time = mode.channel_pixel_time(channel);
                let centre_window_time = pixel_time * mode.window_factor / 2.0;
                let pixel_window = self.samples_for(centre_window_time * 2.0);
                let channel_offset = mode.channel_offsets[channel];

                for x in 0..mode.pixels_per_line {
                    let position = (sequence_start as f64
                        + (channel_offset + x as f64 * pixel_time - centre_window_time)
                            * sample_rate)
                        .round()
                        .max(0.0) as usize;

                    if position + pixel_window >= self.samples.len() {
                        return Ok(self.end_of_stream(grid, line));
                    }

                    let frequency = self.analyzer.peak_frequency(
                        &self.samples[position..position + pixel_window],
                    );
                    grid.set(line, channel, x, frequency_to_level(frequency));
                }
            }

            self.progress.report(Progress::DecodeLine {
                line,
                num_lines: mode.num_lines,
            });
        }

        Ok(ScanResult {
            grid,
            lines_decoded: mode.num_lines,
        })
    }

    fn end_of_stream(&self, grid: ImageGrid, lines_decoded: usize) -> ScanResult {
        tracing::warn!(
            lines_decoded,
            num_lines = grid.num_lines(),
            "reached end of audio while decoding"
        );
        ScanResult {
            grid,
            lines_decoded,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        SstvDecoder,
        decoder::DecodeError,
        modes::ModeSpecification,
    };

    #[test]
    fn missing_leading_sync_is_fatal() {
        let samples = vec![0.0; 1000];
        let mut decoder = SstvDecoder::new(&samples, 48000.0);
        assert_eq!(
            decoder
                .decode_image_data(0, &ModeSpecification::S1)
                .unwrap_err(),
            DecodeError::NoImageData
        );
    }

    #[test]
    fn empty_stream_gives_empty_grid() {
        let mut decoder = SstvDecoder::new(&[], 48000.0);
        let result = decoder
            .decode_image_data(0, &ModeSpecification::M1)
            .unwrap();
        assert_eq!(result.lines_decoded, 0);
        assert_eq!(result.grid.num_lines(), 256);
        assert!(result.grid.scan(0, 0).iter().all(|&value| value == 0));
    }
}
