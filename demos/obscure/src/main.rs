use argh::FromArgs;
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use veil::image::Image;
use veil::imgproc::{filter::ObscureFilter, parallel::ExecutionStrategy};
use veil::io::{png::write_image_png_rgb8, raw::raw_format_rgb8, raw::write_image_raw_rgb8};

/// Obscures a screen capture with a blur or a pixelation filter
#[derive(Debug, FromArgs)]
struct Args {
    /// radius then mode `<radius> <mode>`: the half-width of the window or block, then the number of
    /// box blur passes, `pixel` to pixelate or `gauss:<sigma>`
    #[argh(positional)]
    filter: Vec<String>,

    /// path to the png capture
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// output path; defaults to a fresh temporary file, or stdout with --raw
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// write raw interleaved rgb bytes instead of a png
    #[argh(switch)]
    raw: bool,

    /// json file holding the filter, overrides the positional arguments
    #[argh(option)]
    config: Option<PathBuf>,

    /// number of worker threads, defaults to the global rayon pool
    #[argh(option, short = 'j')]
    threads: Option<usize>,
}

fn parse_filter(radius: i64, mode: &str) -> Result<ObscureFilter, String> {
    const NEGATIVE: &str = "radius/times must be non-negative";

    let radius = usize::try_from(radius).map_err(|_| NEGATIVE.to_string())?;

    if mode == "pixel" {
        return Ok(ObscureFilter::Pixelate { radius });
    }

    if let Some(sigma) = mode.strip_prefix("gauss:") {
        let sigma = sigma
            .parse::<f64>()
            .map_err(|e| format!("invalid sigma `{sigma}`: {e}"))?;
        return Ok(ObscureFilter::Gaussian { radius, sigma });
    }

    let passes = mode
        .parse::<i64>()
        .map_err(|e| format!("invalid mode `{mode}`: {e}"))?;
    let passes = usize::try_from(passes).map_err(|_| NEGATIVE.to_string())?;

    Ok(ObscureFilter::box_blur(radius, passes))
}

// options that consume the next argument as their value
const VALUE_OPTIONS: &[&str] = &["-i", "--input", "-o", "--output", "--config", "-j", "--threads"];

fn is_negative_number(arg: &str) -> bool {
    arg.strip_prefix('-')
        .is_some_and(|n| n.starts_with(|c: char| c.is_ascii_digit()))
}

/// Parse the command line, letting negative numbers through as positionals.
///
/// argh reads every argument starting with `-` as a flag, so the positionals are
/// moved after a `--` and reach [`parse_filter`], which reports them.
fn parse_args(command: &str, args: &[&str]) -> Result<Args, argh::EarlyExit> {
    let mut options = Vec::with_capacity(args.len() + 1);
    let mut positionals = Vec::new();

    let mut iter = args.iter().copied();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            positionals.extend(iter.by_ref());
        } else if VALUE_OPTIONS.contains(&arg) {
            options.push(arg);
            options.extend(iter.next());
        } else if arg.starts_with('-') && !is_negative_number(arg) {
            options.push(arg);
        } else {
            positionals.push(arg);
        }
    }

    if !positionals.is_empty() {
        options.push("--");
        options.extend(positionals);
    }

    Args::from_args(&[command], &options)
}

fn load_filter(args: &Args) -> Result<ObscureFilter, Box<dyn std::error::Error>> {
    if let Some(config) = &args.config {
        let filter = serde_json::from_str(&fs::read_to_string(config)?)?;
        return Ok(filter);
    }

    match args.filter.as_slice() {
        [radius, mode] => {
            let radius = radius
                .parse::<i64>()
                .map_err(|e| format!("invalid radius `{radius}`: {e}"))?;
            Ok(parse_filter(radius, mode)?)
        }
        _ => Err("expected `<radius> <mode>` or --config".into()),
    }
}

fn write_output(args: &Args, image: &Image<u8, 3>) -> Result<(), Box<dyn std::error::Error>> {
    if args.raw {
        log::info!("raw format: {}", raw_format_rgb8(image));
        match &args.output {
            Some(path) => {
                let mut writer = BufWriter::new(fs::File::create(path)?);
                write_image_raw_rgb8(&mut writer, image)?;
                writer.flush()?;
            }
            None => {
                let mut writer = BufWriter::new(io::stdout().lock());
                write_image_raw_rgb8(&mut writer, image)?;
                writer.flush()?;
            }
        }
        return Ok(());
    }

    let path = match &args.output {
        Some(path) => path.clone(),
        None => {
            let (_, path) = tempfile::Builder::new()
                .prefix("veil.")
                .suffix(".png")
                .tempfile()?
                .keep()?;
            path
        }
    };

    write_image_png_rgb8(&path, image)?;

    // the locker picks the image up from this path
    println!("{}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let argv: Vec<String> = std::env::args().collect();
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let (command, rest) = argv.split_first().ok_or("missing program name")?;

    let args = match parse_args(command, rest) {
        Ok(args) => args,
        Err(exit) => match exit.status {
            Ok(()) => {
                println!("{}", exit.output);
                return Ok(());
            }
            Err(()) => {
                eprintln!("{}\nRun {} --help for more information.", exit.output, command);
                std::process::exit(1);
            }
        },
    };

    let filter = load_filter(&args)?;
    let strategy = match args.threads {
        Some(n) => ExecutionStrategy::Fixed(n),
        None => ExecutionStrategy::Auto,
    };

    let capture = veil::io::png::read_image_png_rgb8(&args.input)?;
    log::info!("applying {:?} to a {} capture", filter, capture.size());

    let obscured = filter.apply_with_strategy(&capture, strategy)?;
    write_output(&args, &obscured)?;

    Ok(())
}
