use clap::Parser;
use std::path::{Path, PathBuf};
use tourism::config::{self, Configuration};
use tourism::error::Result;
use tourism::pipeline::{RunReport, TrainingPipeline};

#[derive(Parser, Debug)]
#[command(
    name = "tourism",
    about = "Ingest and transform the tourism package dataset",
    version
)]
pub struct Cli {
    /// Path to the pipeline config. Defaults to config/config.yaml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the dataset schema. Defaults to config/schema.yaml.
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

/// Run the full pipeline with paths resolved against `root`.
pub fn run(cli: &Cli, root: &Path) -> Result<RunReport> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::default_config_path(root));
    let schema_path = cli
        .schema
        .clone()
        .unwrap_or_else(|| config::default_schema_path(root));

    tracing::info!(
        "Using config {} and schema {}",
        config_path.display(),
        schema_path.display()
    );

    let configuration =
        Configuration::with_root(root, &config_path, &config::current_time_stamp())?;
    TrainingPipeline::new(configuration, schema_path).run_pipeline()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_uses_defaults() {
        let cli = Cli::parse_from(["tourism"]);
        assert!(cli.config.is_none());
        assert!(cli.schema.is_none());

        let cli = Cli::parse_from(["tourism", "--config", "other.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("other.yaml")));
    }
}
