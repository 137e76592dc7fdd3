use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use globe_choropleth::data::OfflineFetcher;
use globe_choropleth::{AppConfig, Pipeline};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download, repair and classify the dataset, then write the globe map
    Render(RenderArgs),

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory, overrides `[output] directory`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of population classes
    #[arg(short = 'n', long)]
    classes: Option<usize>,

    /// Never touch the network, use the cached dataset only
    #[arg(long)]
    offline: bool,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(path),
        None => Ok(AppConfig::default()),
    }
}

fn render(args: &RenderArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(dir) = &args.output {
        config.output.directory = dir.clone();
    }
    if let Some(classes) = args.classes {
        config.classification.classes = classes;
    }

    let mut pipeline = Pipeline::new(config);
    if args.offline {
        pipeline = pipeline.with_fetcher(Box::new(OfflineFetcher));
    }

    match pipeline.run() {
        Ok(summary) => {
            info!(
                "{} countries in {} classes",
                summary.records,
                summary.scheme.len()
            );
            for path in &summary.written {
                println!("{}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            let stage = e.stage();
            Err(anyhow::Error::new(e).context(format!("{stage} stage failed")))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Render(args) => render(args),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp(None)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from([
            "globe-choropleth",
            "-q",
            "render",
            "--config",
            "choropleth.toml",
            "-n",
            "5",
            "--offline",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.config, Some(PathBuf::from("choropleth.toml")));
                assert_eq!(args.classes, Some(5));
                assert!(args.offline);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_config_without_file_prints_defaults() {
        let cli = Cli::try_parse_from(["globe-choropleth", "config"]).unwrap();
        run(&cli).unwrap();
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Some(Path::new("/nonexistent/choropleth.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
