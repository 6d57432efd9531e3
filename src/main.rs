use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use concept_search::config::{self, AppConfig};
use concept_search::drivers;
use concept_search::import::Importer;
use concept_search::{query, source};

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")");

#[derive(Parser)]
#[command(
    version,
    long_version = LONG_VERSION,
    about = "Index SKOS concept records into a search backend and query them"
)]
struct Cli {
    /// Config file (default: ./config.json) / 配置文件
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search backend / 搜索后端
    #[arg(short, long, global = true, default_value = "local")]
    backend: String,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Rebuild the index from NDJSON/JSON records (file, URL or "-" for stdin)
    Create {
        source: String,
        /// Run one query after the import
        #[arg(long)]
        probe: Option<String>,
    },
    /// Query the index
    Search { query: String },
    /// Write the default configuration
    InitConfig {
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// List available backends
    Backends,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };

    // Logs go to stderr, stdout carries query output / 日志输出到 stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concept_search=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// --help / --version print to stdout and succeed, usage errors exit 1 / 参数错误退出码
fn usage_exit_code(e: &clap::Error) -> u8 {
    if e.use_stderr() {
        1
    } else {
        0
    }
}

async fn run(cli: Cli) -> Result<()> {
    let manager = drivers::default_manager();

    match cli.cmd {
        Cmd::InitConfig { force } => {
            let path = config::config_path(cli.config.as_deref());
            config::save_config(&AppConfig::default(), &path, force)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Cmd::Backends => {
            for (name, description) in manager.describe() {
                println!("{:<12} {}", name, description);
            }
        }
        Cmd::Create { source: input, probe } => {
            let app_config = config::load_config(cli.config.as_deref())?;
            let backend = manager.create(&cli.backend, &app_config)?;
            tracing::info!("Creating {} index from {}", backend.name(), input);

            let records = source::open(&input)
                .await
                .with_context(|| format!("cannot read records from {}", input))?;
            Importer::new(backend.as_ref()).run(records).await?;

            if let Some(probe) = probe {
                print!("{}", query::run_search(backend.as_ref(), &probe).await?);
            }
        }
        Cmd::Search { query: q } => {
            let app_config = config::load_config(cli.config.as_deref())?;
            let backend = manager.create(&cli.backend, &app_config)?;
            print!("{}", query::run_search(backend.as_ref(), &q).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse_error(args: &[&str]) -> clap::Error {
        match Cli::try_parse_from(args) {
            Ok(_) => panic!("{:?} should not parse", args),
            Err(e) => e,
        }
    }

    #[test]
    fn test_missing_arguments_exit_1() {
        assert_eq!(usage_exit_code(&parse_error(&["concept-search"])), 1);
        assert_eq!(usage_exit_code(&parse_error(&["concept-search", "search"])), 1);
        assert_eq!(usage_exit_code(&parse_error(&["concept-search", "create"])), 1);
        assert_eq!(usage_exit_code(&parse_error(&["concept-search", "reindex", "x"])), 1);
    }

    #[test]
    fn test_help_and_version_exit_0() {
        assert_eq!(usage_exit_code(&parse_error(&["concept-search", "--help"])), 0);
        assert_eq!(usage_exit_code(&parse_error(&["concept-search", "search", "--help"])), 0);
        assert_eq!(usage_exit_code(&parse_error(&["concept-search", "--version"])), 0);
    }

    #[test]
    fn test_parse_global_backend_after_subcommand() {
        let cli = Cli::try_parse_from(["concept-search", "create", "data.ndjson", "-b", "typesense"]).unwrap();
        assert_eq!(cli.backend, "typesense");
        assert!(cli.config.is_none());
        match cli.cmd {
            Cmd::Create { source: input, .. } => assert_eq!(input, "data.ndjson"),
            _ => panic!("expected create"),
        }

        let cli = Cli::try_parse_from(["concept-search", "search", "Kreislauf"]).unwrap();
        assert_eq!(cli.backend, "local");
    }

    #[tokio::test]
    async fn test_unknown_backend_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        config::save_config(&AppConfig::default(), &path, false).unwrap();

        let cli = Cli::try_parse_from([
            "concept-search",
            "--config",
            path.to_str().unwrap(),
            "-b",
            "elasticsearch",
            "search",
            "x",
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Available backends"));
    }

    #[tokio::test]
    async fn test_missing_explicit_config_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let cli = Cli::try_parse_from(["concept-search", "--config", path.to_str().unwrap(), "search", "x"]).unwrap();
        assert!(run(cli).await.is_err());
    }
}
