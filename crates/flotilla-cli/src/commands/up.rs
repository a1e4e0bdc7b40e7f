//! Up command - deploy the plan wave by wave

use std::path::Path;
use std::sync::Arc;

use console::style;
use tokio::sync::watch;

use flotilla_exec::{HelmExecutor, MockExecutor, Outcome, ReleaseExecutor, Scheduler};
use flotilla_plan::Plan;

use crate::error::{CliError, Result};

/// Run the up command
pub async fn run(
    file: &Path,
    tags: &[String],
    dry_run: bool,
    workers: Option<usize>,
) -> Result<()> {
    let plan = Plan::from_file(file)?.with_tags(tags);

    if plan.is_empty() {
        println!("{} Nothing to deploy", style("→").blue().bold());
        return Ok(());
    }

    let executor: Arc<dyn ReleaseExecutor> = if dry_run {
        println!(
            "{} Dry run - no changes will be applied",
            style("→").blue().bold()
        );
        Arc::new(MockExecutor::new())
    } else {
        Arc::new(HelmExecutor::new())
    };

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let mut scheduler = Scheduler::new(executor).with_cancel(cancel_rx);
    if let Some(workers) = workers {
        scheduler = scheduler.with_worker_limit(workers);
    }

    let result = scheduler.run(&plan.releases).await?;

    for release in &result.results {
        match &release.outcome {
            Outcome::Succeeded => println!(
                "{} {} ({}s)",
                style("✓").green().bold(),
                style(&release.uniq).cyan(),
                release.duration().num_seconds()
            ),
            Outcome::Failed(err) => println!(
                "{} {} failed: {}",
                style("✗").red().bold(),
                style(&release.uniq).cyan(),
                err
            ),
            Outcome::Skipped(err) => println!(
                "{} {} skipped: {}",
                style("-").yellow().bold(),
                style(&release.uniq).cyan(),
                err
            ),
        }
    }

    let failed = result.failed().len();
    let skipped = result.skipped().len();
    if failed + skipped > 0 {
        return Err(CliError::DeployFailed { failed, skipped });
    }

    println!(
        "{} Deployed {} release(s) in {}s",
        style("✓").green().bold(),
        style(result.results.len()).yellow(),
        (result.finished_at - result.started_at).num_seconds()
    );

    Ok(())
}
