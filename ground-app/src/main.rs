use anyhow::{Context, Result};
use clap::Parser;
use ground_common::Locale;
use ground_common::observability::{LogConfig, init_logging};
use ground_config::{GroundConfig, GroundConfigLoader};
use std::path::PathBuf;
mod repl;
mod wiring;

/// Search-grounded chat in the terminal.
#[derive(Parser, Debug)]
#[command(name = "ground", version, about)]
struct Cli {
    /// YAML configuration file; skipped when missing.
    #[arg(short = 'c', long = "config", default_value = "ground.yaml")]
    config: PathBuf,

    /// Conversation locale (en, vi).
    #[arg(long)]
    locale: Option<Locale>,

    /// Number of web pages to ground each session on.
    #[arg(long)]
    topk: Option<usize>,

    /// Mirror logs to stderr.
    #[arg(long = "log-stderr")]
    log_stderr: bool,
}

impl Cli {
    fn apply(&self, cfg: &mut GroundConfig) {
        if let Some(locale) = self.locale {
            cfg.session.locale = locale;
        }
        if let Some(topk) = self.topk {
            cfg.search.topk = topk;
        }
        if self.log_stderr {
            cfg.logging.emit_stderr = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) .env, then config (env wins over file)
    let _ = dotenvy::dotenv();
    let mut cfg = GroundConfigLoader::new()
        .with_optional_file(&cli.config)
        .load()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.apply(&mut cfg);
    cfg.validate().context("invalid configuration")?;

    // 2) logging
    let log_path = init_logging(LogConfig {
        app_name: "ground",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(log = %log_path.display(), locale = %cfg.session.locale, "ground.start");

    // 3) wiring + loop
    let app = wiring::build_from_config(&cfg)?;
    repl::run(&app, cfg.session.max_turns).await
}
