// src/main.rs — codegate entry point

use clap::Parser;
use tokio_util::sync::CancellationToken;

use codegate::cli::run::{run_tasks, RunOptions};
use codegate::cli::{Cli, Commands};
use codegate::infra::config::Config;
use codegate::infra::logger;

/// Exit code when the run finished but not every task passed the gate.
const EXIT_NOT_ACCEPTED: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG)
    logger::init_logging(logger::level_for(cli.verbose, cli.quiet));

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_NOT_ACCEPTED),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    // Load config (falls back to defaults if no config.toml)
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let opts = RunOptions {
        max_retries: cli.max_retries,
        warning_threshold: cli.warning_threshold,
        producer: cli.producer.clone(),
        analyzer: cli.analyzer.clone(),
        report_dir: (!cli.no_report).then(|| cli.report_dir.clone()),
        json: cli.json,
        quiet: cli.quiet,
    };

    if let Some(Commands::Check { ref file, ref task }) = cli.command {
        let threshold = opts.workflow_config(&config).warning_threshold;
        return codegate::cli::check::run_check(
            file,
            task.as_deref(),
            opts.analyzer.as_deref(),
            &config,
            threshold,
        )
        .await;
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, finishing up...");
            on_signal.cancel();
        }
    });

    run_tasks(&cli.tasks(), &config, &opts, cancel).await
}
