//! Watch command implementation

use anyhow::{Context, Result};
use tokio::sync::watch;

use goview::output::{generate_execution_id, output_json, ChangeResponse, JsonResponse};
use goview::{run_watch_pipeline, OutputFormat, WatchPipelineConfig};

pub fn run_watch(config: WatchPipelineConfig, output_format: OutputFormat) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Register signal handlers for SIGINT and SIGTERM
    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;
        std::thread::spawn(move || {
            if let Some(sig) = signals.forever().next() {
                tracing::info!(signal = sig, "shutting down");
                let _ = shutdown_tx.send(true);
            }
        });
    }
    #[cfg(not(unix))]
    let _shutdown_tx = shutdown_tx;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start runtime")?;

    let execution_id = generate_execution_id();
    let report = runtime.block_on(run_watch_pipeline(config, shutdown_rx, |module, outcome| {
        if output_format.is_json() {
            let response = JsonResponse::new(ChangeResponse::new(module, outcome), &execution_id);
            if let Err(err) = output_json(&response, output_format) {
                tracing::warn!(error = %err, "cannot write change");
            }
        } else {
            let s = module.summary();
            println!(
                "{} ({} packages, {} tests, {} examples, {} benchmarks)",
                outcome, s.packages, s.tests, s.examples, s.benchmarks
            );
        }
    }))?;

    eprintln!(
        "Stopped after {} events ({} applied, {} skipped, {} failed)",
        report.stats.events, report.stats.applied, report.stats.skipped, report.stats.failed
    );
    Ok(())
}
