use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use bullseye_cli::{configure, draw_keypoints, load_gray, preset_config, render_config, run_detection, CliResult};
use bullseye_detect::DetectorConfig;
use clap::{Args, Parser, Subcommand};
use log::{error, info};

#[derive(Parser)]
#[command(name = "bullseye")]
#[command(about = "Detect concentric-ring (bullseye) fiducials in grayscale images")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect bullseyes in an image.
    Detect(DetectArgs),

    /// Print a configuration preset.
    ShowConfig {
        /// Preset name: reference, coarse or strict.
        #[arg(long, default_value = "reference")]
        preset: String,

        /// Print JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Configuration file (.toml or .json); flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Radius of the central disk in pixels.
    #[arg(long)]
    min_radius: Option<usize>,

    /// Outer radius of the last annulus in pixels.
    #[arg(long)]
    max_radius: Option<usize>,

    /// Number of annuli between the two radii.
    #[arg(long)]
    ring_count: Option<usize>,

    /// Minimum bullseye score for a keypoint.
    #[arg(long)]
    min_score: Option<f64>,

    /// Worker threads for scanning.
    #[arg(long)]
    threads: Option<usize>,

    /// Write an overlay image with the detected keypoints.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

impl DetectArgs {
    fn resolve_config(&self) -> CliResult<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::load(path)?,
            None => DetectorConfig::reference_preset(),
        };
        if let Some(v) = self.min_radius {
            config.core.min_radius = v;
        }
        if let Some(v) = self.max_radius {
            config.core.max_radius = v;
        }
        if let Some(v) = self.ring_count {
            config.core.ring_count = v;
        }
        if let Some(v) = self.min_score {
            config.scoring.min_score = v;
        }
        if let Some(v) = self.threads {
            config.core.n_threads = v;
        }
        Ok(config)
    }
}

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let config = args.resolve_config()?;
    info!("{}", config.summary());
    let detector = configure(config.clone())?;
    let image = load_gray(&args.image)?;

    let t0 = Instant::now();
    let report = run_detection(&detector, config, &image)?;
    info!("Detection took {:.2?}", t0.elapsed());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }

    if let Some(path) = &args.output {
        draw_keypoints(&image, &report).save(path)?;
        info!("Overlay written to {}", path.display());
    }
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::ShowConfig { preset, json } => {
            let config = preset_config(&preset)?;
            println!("{}", render_config(&config, json)?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
