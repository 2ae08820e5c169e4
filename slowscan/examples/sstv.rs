//! Encodes an image, optionally writes the transmission to a WAV file, and
//! decodes it again.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Error;
use image::{
    ImageReader,
    Rgb,
    RgbImage,
};
use slowscan::{
    SstvDecoder,
    SstvEncoder,
    audio::write_wav,
    modes::mode_by_name,
    progress::LogProgress,
};

#[derive(Debug, clap::Parser)]
struct Args {
    /// Image to send. A color bar test pattern is used if omitted.
    image: Option<PathBuf>,
    #[clap(short, long, default_value = "Martin 2")]
    mode: String,
    #[clap(short, long, default_value = "48000")]
    sample_rate: f32,
    /// Also write the transmission to this WAV file.
    #[clap(short, long)]
    wav: Option<PathBuf>,
    #[clap(short, long, default_value = "sstv_decoded.png")]
    output: PathBuf,
}

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mode = mode_by_name(&args.mode)?;

    let image = match &args.image {
        Some(path) => ImageReader::open(path)?.decode()?.into_rgb8(),
        None => color_bars(mode.pixels_per_line as u32, mode.num_lines as u32),
    };

    let audio = SstvEncoder::new(args.sample_rate)
        .with_progress(LogProgress)
        .encode(&image, mode);
    tracing::info!(
        "encoded {} seconds of audio at {} Hz",
        audio.duration(),
        audio.sample_rate
    );

    if let Some(path) = &args.wav {
        write_wav(path, &audio)?;
    }

    let decoded = SstvDecoder::new(&audio.samples, audio.sample_rate)
        .with_progress(LogProgress)
        .decode()?;
    tracing::info!(
        "decoded {}/{} lines of {}",
        decoded.lines_decoded,
        decoded.mode.num_lines,
        decoded.mode.name
    );

    decoded.image.save(&args.output)?;

    Ok(())
}

fn color_bars(width: u32, height: u32) -> RgbImage {
    const BARS: [[u8; 3]; 8] = [
        [255, 255, 255],
        [255, 255, 0],
        [0, 255, 255],
        [0, 255, 0],
        [255, 0, 255],
        [255, 0, 0],
        [0, 0, 255],
        [0, 0, 0],
    ];

    RgbImage::from_fn(width, height, |x, _y| {
        Rgb(BARS[(x as usize * BARS.len() / width as usize).min(BARS.len() - 1)])
    })
}
