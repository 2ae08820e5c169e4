//! VIS code reader.

use super::{
    DecodeError,
    SstvDecoder,
};
use crate::{
    SYNC_TONE,
    VIS_BIT_TIME,
    modes::{
        ModeSpecification,
        SelectMode,
        VisCode,
    },
    progress::ReportProgress,
};

impl<M, P> SstvDecoder<'_, M, P>
where
    M: SelectMode,
    P: ReportProgress,
{
    /// Reads the 7 VIS bits and the parity bit starting at `offset` and
    /// looks up the signalled mode.
    pub fn decode_vis(&mut self, offset: usize) -> Result<ModeSpecification, DecodeError> {
        let bit_size = self.samples_for(VIS_BIT_TIME);
        let mut bits = [false; 8];

        for (i, bit) in bits.iter_mut().enumerate() {
            let frequency = self
                .peak_frequency_at(offset + i * bit_size, bit_size)
                .ok_or(DecodeError::VisTruncated)?;

            // 1100 Hz is a one, 1300 Hz a zero
            *bit = frequency <= SYNC_TONE;
        }

        tracing::debug!(?bits, "VIS bits");

        let mut code_bits = [false; 7];
        code_bits.copy_from_slice(&bits[..7]);
        let vis_code = VisCode::from_bits(code_bits);
        let parity = bits[7];

        Ok(self
            .select_mode
            .mode_specification_with_parity(vis_code, parity)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        SstvDecoder,
        decoder::DecodeError,
        encoder::SstvEncoder,
        modes::{
            ModeSelectError,
            ModeSpecification,
            VisCode,
            builtin_mode_specification,
            builtin_modes,
        },
    };

    const SAMPLE_RATE: f32 = 48000.0;

    fn vis_bits(bits: [bool; 8]) -> Vec<f32> {
        let mut encoder = SstvEncoder::new(SAMPLE_RATE);
        encoder.emit_vis_bits(bits);
        encoder.into_samples()
    }

    fn code_bits(vis_code: u8) -> [bool; 8] {
        let code = VisCode::new(vis_code).unwrap();
        let mut bits = [false; 8];
        for (i, bit) in bits.iter_mut().take(7).enumerate() {
            *bit = code.get_bit(i as u8);
        }
        bits[7] = code.parity();
        bits
    }

    #[test]
    fn it_decodes_all_builtin_codes() {
        for mode in builtin_modes() {
            let samples = vis_bits(code_bits(mode.vis_code.get()));
            let mut decoder = SstvDecoder::new(&samples, SAMPLE_RATE);
            let decoded = decoder.decode_vis(0).unwrap();
            assert_eq!(decoded.name, mode.name);
        }
    }

    #[test]
    fn single_bit_flips_never_decode_same_mode() {
        for mode in builtin_modes() {
            let bits = code_bits(mode.vis_code.get());

            for flip in 0..8 {
                let mut flipped = bits;
                flipped[flip] = !flipped[flip];

                let samples = vis_bits(flipped);
                let mut decoder = SstvDecoder::new(&samples, SAMPLE_RATE);
                match decoder.decode_vis(0) {
                    Err(DecodeError::ModeSelect(ModeSelectError::Parity { .. })) => {}
                    Err(error) => panic!("unexpected error: {error}"),
                    Ok(decoded) => assert_ne!(decoded.name, mode.name),
                }
            }
        }
    }

    #[test]
    fn it_rejects_odd_parity_for_every_payload() {
        for value in 0..128 {
            let mut bits = code_bits(value);
            bits[7] = !bits[7];

            let samples = vis_bits(bits);
            let mut decoder = SstvDecoder::new(&samples, SAMPLE_RATE);
            assert_eq!(
                decoder.decode_vis(0).unwrap_err(),
                DecodeError::ModeSelect(ModeSelectError::Parity {
                    vis_code: VisCode::new(value).unwrap(),
                    parity: bits[7],
                })
            );
        }
    }

    #[test]
    fn it_rejects_unknown_codes() {
        let unknown = (0..128)
            .find(|&value| builtin_mode_specification(VisCode::new(value).unwrap()).is_none())
            .unwrap();

        let samples = vis_bits(code_bits(unknown));
        let mut decoder = SstvDecoder::new(&samples, SAMPLE_RATE);
        assert_eq!(
            decoder.decode_vis(0).unwrap_err(),
            DecodeError::ModeSelect(ModeSelectError::UnknownMode {
                vis_code: VisCode::new(unknown).unwrap(),
            })
        );
    }

    #[test]
    fn it_restricts_to_expected_mode() {
        let samples = vis_bits(code_bits(ModeSpecification::S1.vis_code.get()));
        let mut decoder =
            SstvDecoder::new_with_mode_select(&samples, SAMPLE_RATE, ModeSpecification::M1);
        assert!(matches!(
            decoder.decode_vis(0),
            Err(DecodeError::ModeSelect(ModeSelectError::UnknownMode { .. }))
        ));
    }

    #[test]
    fn it_fails_on_truncated_code() {
        let mut samples = vis_bits(code_bits(ModeSpecification::M1.vis_code.get()));
        samples.truncate(samples.len() / 2);

        let mut decoder = SstvDecoder::new(&samples, SAMPLE_RATE);
        assert_eq!(decoder.decode_vis(0).unwrap_err(), DecodeError::VisTruncated);
    }
}
