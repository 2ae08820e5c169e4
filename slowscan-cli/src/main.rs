mod args;
mod progress;

use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{
    Error,
    bail,
};
use image::ImageReader;
use slowscan::{
    SstvDecoder,
    SstvEncoder,
    audio::{
        read_wav,
        write_wav,
    },
    modes::{
        builtin_modes,
        mode_by_name,
    },
};
use tracing_subscriber::EnvFilter;

use crate::{
    args::Args,
    progress::ProgressBar,
};

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args);

    match args {
        Args::Decode {
            input,
            output,
            skip,
        } => decode(&input, &output, skip),
        Args::Encode {
            input,
            output,
            mode,
            sample_rate,
        } => encode(&input, &output, &mode, sample_rate),
        Args::ListModes => {
            list_modes();
            Ok(())
        }
    }
}

fn decode(input: &Path, output: &Path, skip: f32) -> Result<(), Error> {
    if skip < 0.0 {
        bail!("Skip must not be negative");
    }

    let audio = read_wav(input)?;
    tracing::info!(
        "read {:.1} seconds of audio at {} Hz",
        audio.duration(),
        audio.sample_rate
    );

    let mut decoder =
        SstvDecoder::new(&audio.samples, audio.sample_rate).with_progress(ProgressBar);
    decoder.skip(skip);
    let decoded = decoder.decode()?;

    if !decoded.is_complete() {
        eprintln!(
            "Reached end of audio after {} of {} lines",
            decoded.lines_decoded, decoded.mode.num_lines
        );
    }

    decoded.image.save(output)?;
    eprintln!("Saved to {}", output.display());

    Ok(())
}

fn encode(input: &Path, output: &Path, mode: &str, sample_rate: f32) -> Result<(), Error> {
    if sample_rate.is_nan() || sample_rate <= 0.0 {
        bail!("Sample rate must be positive");
    }

    let mode = mode_by_name(mode)?;
    let image = ImageReader::open(input)?.decode()?.into_rgb8();

    eprintln!("Encoding image to SSTV ({})...", mode.name);
    let audio = SstvEncoder::new(sample_rate)
        .with_progress(ProgressBar)
        .encode(&image, mode);

    write_wav(output, &audio)?;
    eprintln!("Saved to {}", output.display());

    Ok(())
}

fn list_modes() {
    println!("Supported modes:");
    for mode in builtin_modes() {
        println!(
            "  {:<10} {:<4} VIS {:>3}  {}x{}  {:.1}s",
            mode.name,
            mode.short_name,
            mode.vis_code.get(),
            mode.pixels_per_line,
            mode.num_lines,
            mode.image_time()
        );
    }
}
