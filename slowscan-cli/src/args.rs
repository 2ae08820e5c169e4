use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[clap(about = "Encode and decode slow-scan television")]
pub enum Args {
    /// Decode SSTV audio (WAV) into a PNG image.
    Decode {
        input: PathBuf,

        #[clap(short, long, default_value = "result.png")]
        output: PathBuf,

        /// Start decoding this many seconds into the recording.
        #[clap(short, long, default_value = "0")]
        skip: f32,
    },

    /// Encode an image into SSTV audio (WAV).
    Encode {
        input: PathBuf,

        #[clap(short, long, default_value = "result.wav")]
        output: PathBuf,

        /// SSTV mode, by name ("Martin 1") or short name ("M1").
        #[clap(short, long, default_value = "Martin 1")]
        mode: String,

        #[clap(short = 'r', long = "samplerate", default_value = "48000")]
        sample_rate: f32,
    },

    /// List supported SSTV modes.
    ListModes,
}
