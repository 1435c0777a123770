use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use image_to_bead_pattern_wasm::{ConversionMode, ConvertOptions, Palette, bead_chart, convert_bytes};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

/// Turn images into bead patterns (native wrapper around the WASM library).
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Beads per side
    #[arg(short, long, default_value_t = 50)]
    grid_size: u32,

    /// dominant, average, simple or realistic
    #[arg(short, long, default_value_t = ConversionMode::Dominant)]
    mode: ConversionMode,

    /// Merge threshold (RGB distance), dominant mode only
    #[arg(short, long, default_value_t = 30.0)]
    threshold: f64,

    /// Target color count for simple/realistic modes
    #[arg(short = 'k', long, default_value_t = 16)]
    color_count: usize,

    /// Color complexity 0-100 for simple/realistic modes
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    complexity: u8,

    /// Bead catalog JSON (array of {id, name, hex, rgb, category})
    #[arg(short, long, conflicts_with = "palette")]
    catalog: Option<PathBuf>,

    /// Comma-separated list of hex colors to use as palette instead of a catalog
    #[arg(short = 'p', long)]
    palette: Option<String>,

    /// Output directory (defaults to the input's directory)
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Also write a plain-text bead chart next to the JSON
    #[arg(long)]
    chart: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_log(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} {t} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .context("invalid log configuration")?;
    log4rs::init_config(config).context("logger already initialized")?;
    Ok(())
}

fn load_palette(args: &Args) -> Result<Palette> {
    if let Some(list) = &args.palette {
        let hexes: Vec<&str> = list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        return Palette::from_hex_list(hexes.as_slice()).context("invalid --palette");
    }
    let Some(path) = &args.catalog else {
        bail!("either --catalog or --palette is required");
    };
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Palette::from_catalog_json(&json).with_context(|| format!("loading catalog {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_log(args.verbose)?;

    let palette = load_palette(&args)?;
    let options = ConvertOptions {
        grid_size: args.grid_size,
        mode: args.mode,
        merge_threshold: args.threshold,
        color_count: args.color_count,
        color_complexity: args.complexity,
    };
    options.validate()?;

    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let result = convert_bytes(&bytes, &palette, &options)
            .with_context(|| format!("converting {}", input.display()))?;
        if result.total_beads == 0 {
            log::warn!("{} produced an empty pattern (fully transparent)", input.display());
        }

        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        let dir = match &args.out_dir {
            Some(dir) => dir.clone(),
            None => input.parent().map(PathBuf::from).unwrap_or_default(),
        };
        fs::create_dir_all(&dir)?;

        let json_path = dir.join(format!("{stem}.beads.json"));
        fs::write(&json_path, serde_json::to_string_pretty(&result)?)?;
        println!("Saved → {}", json_path.display());

        if args.chart {
            let chart_path = dir.join(format!("{stem}.chart.txt"));
            fs::write(&chart_path, bead_chart(&result))?;
            println!("Saved → {}", chart_path.display());
        }
    }

    Ok(())
}
