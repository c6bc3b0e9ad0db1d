use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod assemble;
mod bootstrap;
mod config;
mod context;
mod controllers;
mod http;
mod reconciler;
#[cfg(test)]
mod test_support;

#[derive(Parser)]
#[command(
    name = "chia-operator",
    version,
    about = "Kubernetes operator for Chia blockchain services"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controllers (default)
    Run(RunArgs),
    /// Print every CustomResourceDefinition as a multi-document YAML stream
    Crds,
}

#[derive(Args, Default)]
struct RunArgs {
    /// Config file; falls back to CHIA_OPERATOR_CONFIG, then configs/operator.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Crds => {
            print!("{}", render_crds()?);
            Ok(())
        }
        Commands::Run(args) => {
            chia_otel::init();
            let result = match config::load(args.config.as_deref()) {
                Ok(cfg) => bootstrap::run(cfg).await,
                Err(err) => Err(err),
            };
            chia_otel::shutdown();
            result
        }
    }
}

fn render_crds() -> Result<String> {
    let docs = chia_api::crds()
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crds_render_as_one_stream() {
        let rendered = render_crds().unwrap();
        assert_eq!(rendered.matches("---\n").count(), 9);
        assert!(rendered.contains("name: chiacas.k8s.chia.net"));
        assert!(rendered.contains("name: chiawallets.k8s.chia.net"));
    }

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["chia-operator"]).unwrap();
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["chia-operator", "run", "--config", "op.toml"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.config, Some(PathBuf::from("op.toml")))
            }
            _ => panic!("expected run"),
        }
    }
}
