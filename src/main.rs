// Demo runner: loads an image file, quantizes it into the 16-colour canvas
// palette and runs the spotlight loop against it, painting the selected
// segment into the terminal. With `--simpaint` it also scribbles 50 random
// pixels onto the canvas every cycle to exercise the activity estimator, the
// same way the live canvas feed would.

use anyhow::{Context, bail};
use canvas_spotlight::console;
use canvas_spotlight::core_modules::palette;
use canvas_spotlight::core_modules::pixel_grid::PixelChange;
use canvas_spotlight::core_modules::scorer::ScoringMode;
use canvas_spotlight::pipeline::{Spotlight, SpotlightConfig};
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::io::Write;
use std::time::Duration;

struct Args {
    image: String,
    mode: ScoringMode,
    stride: u32,
    rotation_count: usize,
    simpaint: bool,
    console: bool,
    interval_secs: u64,
}

fn print_help() {
    eprintln!(
        "Usage: canvas_spotlight <image> [options]

Rotates a 64x64 spotlight across the interesting parts of an image.

Options:
  --parallel        score with the data-parallel backend (default: sequential)
  --stride N        candidate window spacing, N >= 1 (default: 5)
  --rotation N      number of recent segments excluded from re-selection (default: 10)
  --interval SECS   seconds between cycles (default: 10)
  --simpaint        repaint 50 random pixels each cycle
  --no-console      do not render segments to the terminal
  -h, --help        show this help"
    );
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        image: String::new(),
        mode: ScoringMode::Sequential,
        stride: 5,
        rotation_count: 10,
        simpaint: false,
        console: true,
        interval_secs: 10,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--parallel" => args.mode = ScoringMode::Parallel,
            "--simpaint" => args.simpaint = true,
            "--no-console" => args.console = false,
            "--stride" => {
                let value = iter.next().context("--stride needs a value")?;
                args.stride = value.parse().context("--stride must be a number")?;
            }
            "--rotation" => {
                let value = iter.next().context("--rotation needs a value")?;
                args.rotation_count = value.parse().context("--rotation must be a number")?;
            }
            "--interval" => {
                let value = iter.next().context("--interval needs a value")?;
                args.interval_secs = value.parse().context("--interval must be a number")?;
            }
            other if args.image.is_empty() && !other.starts_with('-') => {
                args.image = other.to_string();
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    if args.image.is_empty() {
        print_help();
        bail!("an image path is required");
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = parse_args()?;

    let img = image::open(&args.image)
        .with_context(|| format!("could not open image {}", args.image))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    let colours: Vec<u8> = img
        .pixels()
        .map(|p| palette::nearest_colour(p.0[0], p.0[1], p.0[2]))
        .collect();
    info!("quantized {} to a {width}x{height} canvas", args.image);

    let mut spotlight = Spotlight::new(SpotlightConfig {
        stride: args.stride,
        rotation_count: args.rotation_count,
        mode: args.mode,
    })?;
    spotlight.load_snapshot(width, height, colours)?;

    let mut rng = Pcg32::from_entropy();
    info!("the first segment should appear shortly");

    loop {
        let frame = spotlight.next_frame()?;
        if args.console {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            console::render_rgb(&mut out, &frame.rgb, 64, 64)?;
            out.flush()?;
        }

        if args.simpaint {
            let changes: Vec<PixelChange> = (0..50)
                .map(|_| PixelChange {
                    x: rng.gen_range(0..width),
                    y: rng.gen_range(0..height),
                    colour: rng.gen_range(0..16),
                })
                .collect();
            // A stalled clock is recoverable: skip this batch and retry on
            // the next tick.
            if let Err(err) = spotlight.apply_updates(&changes) {
                warn!("skipping simulated paint batch: {err}");
            }
        }

        std::thread::sleep(Duration::from_secs(args.interval_secs));
    }
}
