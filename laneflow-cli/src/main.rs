//! Laneflow CLI: section crossing and traffic-flow analysis of one lane.
//!
//! Commands:
//! - `analyze`: load trajectories (or synthesize them), analyze one lane, print a report
//! - `synthesize`: write seeded synthetic trajectories as normalized CSV
//!
//! Reports go to stdout; logs go to stderr (`RUST_LOG` overrides the default `info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use laneflow_core::domain::LaneId;
use laneflow_runner::data_loader::write_csv;
use laneflow_runner::{
    export_crossings_csv, export_flow_csv, export_json, generate_trajectories, render_text_summary,
    run_lane_analysis, DataFormat, RunConfig, SyntheticConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "laneflow", about = "Laneflow CLI: lane section crossing and flow analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one lane of a trajectory file.
    Analyze {
        /// Path to a TOML run config. Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Trajectory file.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Trajectory file format.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Lane to analyze.
        #[arg(long)]
        lane: Option<u32>,

        /// Section positions, comma-separated (e.g. 200,400,600).
        #[arg(long, value_delimiter = ',')]
        sections: Option<Vec<f64>>,

        /// Window width in seconds.
        #[arg(long)]
        window: Option<f64>,

        /// Report format.
        #[arg(long, value_enum, default_value_t = OutputArg::Text)]
        output: OutputArg,

        /// Use synthetic trajectories when no data file is given.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for synthetic trajectories.
        #[arg(long)]
        seed: Option<u64>,

        /// Run single-threaded.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Write seeded synthetic trajectories as normalized CSV to stdout.
    Synthesize {
        /// Number of vehicles.
        #[arg(long, default_value_t = 300)]
        vehicles: usize,

        /// Mean arrival rate in vehicles per second.
        #[arg(long, default_value_t = 0.5)]
        rate: f64,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Ngsim,
    Csv,
}

impl From<FormatArg> for DataFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Ngsim => DataFormat::Ngsim,
            FormatArg::Csv => DataFormat::Csv,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    Text,
    Json,
    FlowCsv,
    CrossingsCsv,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            config,
            data,
            format,
            lane,
            sections,
            window,
            output,
            synthetic,
            seed,
            sequential,
        } => {
            let mut run_config = match config {
                Some(path) => RunConfig::from_file(&path)
                    .with_context(|| format!("loading run config {}", path.display()))?,
                None => RunConfig::default(),
            };
            if let Some(path) = data {
                run_config.data.path = Some(path);
            }
            if let Some(format) = format {
                run_config.data.format = format.into();
            }
            if let Some(lane) = lane {
                run_config.data.lane = LaneId(lane);
                run_config.synthetic.lane = LaneId(lane);
            }
            if let Some(sections) = sections {
                run_config.analysis.sections = sections;
            }
            if let Some(window) = window {
                run_config.analysis.window_width_s = window;
            }
            if let Some(seed) = seed {
                run_config.synthetic.seed = seed;
            }
            run_config.data.synthetic |= synthetic;
            run_config.parallel &= !sequential;

            run_analyze(&run_config, output)
        }
        Commands::Synthesize {
            vehicles,
            rate,
            seed,
        } => run_synthesize(vehicles, rate, seed),
    }
}

fn run_analyze(config: &RunConfig, output: OutputArg) -> Result<()> {
    let report = run_lane_analysis(config).context("lane analysis failed")?;
    info!(
        lane = %report.analysis.lane,
        events = report.analysis.total_events(),
        rejected = report.analysis.rejected.len(),
        "analysis complete"
    );

    let rendered = match output {
        OutputArg::Text => render_text_summary(&report),
        OutputArg::Json => export_json(&report)?,
        OutputArg::FlowCsv => export_flow_csv(&report.analysis)?,
        OutputArg::CrossingsCsv => export_crossings_csv(&report.analysis)?,
    };
    print!("{rendered}");
    if output == OutputArg::Json {
        println!();
    }
    Ok(())
}

fn run_synthesize(vehicles: usize, rate: f64, seed: u64) -> Result<()> {
    let config = SyntheticConfig {
        vehicles,
        arrival_rate: rate,
        seed,
        ..SyntheticConfig::default()
    };
    let records = generate_trajectories(&config)?;
    info!(vehicles, rows = records.len(), seed, "generated synthetic trajectories");
    print!("{}", write_csv(&records)?);
    Ok(())
}
