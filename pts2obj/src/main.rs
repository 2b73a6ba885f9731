#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![doc = include_str!("../../README.md")]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap::arg;
use log::error;
use pts_mesh::Config;
use pts_mesh::Orchestrator;
use pts_mesh::color::Palette;
use pts_mesh::mesh::inspect;
use pts_mesh::normalize::summary;
use pts_mesh::pipeline::preview;
use pts_mesh::reconstruct::AlphaParams;
use pts_mesh::reconstruct::PoissonParams;
use pts_mesh::reconstruct::StrategyMetadata;
use pts_mesh::reconstruct::ThresholdParams;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(version, about, long_about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(long = "alpha", default_value_t = AlphaParams::default().alpha)]
    alpha: f64,
    #[arg(long = "radius", default_value_t = PoissonParams::default().radius)]
    radius: f64,
    #[arg(long = "max-nn", default_value_t = PoissonParams::default().max_nn)]
    max_nn: usize,
    #[arg(long = "depth", default_value_t = PoissonParams::default().depth)]
    depth: u32,
    #[arg(long = "threshold", default_value_t = ThresholdParams::default().threshold)]
    threshold: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconstruct a mesh, written next to the input as `<stem>_<algorithm>.obj`.
    Mesh {
        #[arg(long = "input", short = 'i', help = "point cloud file (.pts)")]
        input: PathBuf,
        #[arg(long = "algorithm", short = 'a', default_value = "delaunay")]
        algorithm: String,
    },
    /// Print point cloud diagnostics as JSON.
    Info {
        #[arg(long = "input", short = 'i', help = "point cloud file (.pts)")]
        input: Vec<PathBuf>,
    },
    /// Print mesh statistics as JSON.
    Inspect {
        #[arg(long = "input", short = 'i', help = "mesh file (.obj)")]
        input: PathBuf,
    },
    /// Write the cloud as colored vertices, `<stem>_preview_<palette>.obj`.
    Preview {
        #[arg(long = "input", short = 'i', help = "point cloud file (.pts)")]
        input: PathBuf,
        #[arg(long = "palette", short = 'p', value_enum, default_value_t = PaletteArg::Inferno)]
        palette: PaletteArg,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PaletteArg {
    Height,
    Inferno,
    Viridis,
}

impl From<PaletteArg> for Palette {
    fn from(arg: PaletteArg) -> Self {
        match arg {
            PaletteArg::Height => Self::HeightGradient,
            PaletteArg::Inferno => Self::Inferno,
            PaletteArg::Viridis => Self::Viridis,
        }
    }
}

impl Cli {
    fn config(&self, sources: Vec<PathBuf>) -> Config {
        Config {
            sources,
            alpha: AlphaParams { alpha: self.alpha },
            poisson: PoissonParams {
                radius: self.radius,
                max_nn: self.max_nn,
                depth: self.depth,
            },
            threshold: ThresholdParams {
                threshold: self.threshold,
                alpha: self.alpha,
            },
        }
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("could not format the report: {e}"),
    }
}

fn run(cli: &Cli) -> pts_mesh::Result<()> {
    match &cli.command {
        Command::Mesh { input, algorithm } => {
            let orchestrator = Orchestrator::new(cli.config(Vec::new()));
            let result = orchestrator.create_mesh(input, algorithm)?;
            let densities = match &result.metadata {
                StrategyMetadata::Poisson { densities } => summary(densities),
                StrategyMetadata::None => None,
            };
            print_json(&serde_json::json!({
                "output": result.output_path.display().to_string(),
                "mesh_info": inspect(&result.mesh),
                "densities": densities,
            }));
        }
        Command::Info { input } => {
            let orchestrator = Orchestrator::new(cli.config(input.clone()));
            print_json(&orchestrator.point_cloud_info(None)?);
        }
        Command::Inspect { input } => {
            let orchestrator = Orchestrator::new(cli.config(Vec::new()));
            print_json(&orchestrator.mesh_info(input)?);
        }
        Command::Preview { input, palette } => {
            let path = preview(input, (*palette).into())?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Exception: {e}");
            ExitCode::FAILURE
        }
    }
}
