//! `notchd replay`: drive a scenario file through a live coordinator in
//! real time and report each expectation.

use anyhow::{Context, bail};
use notchd_coordinator::Coordinator;
use notchd_core::NotchConfig;
use notchd_core::scenario::{Scenario, StepAction};
use tracing::info;

use crate::cli::ReplayOpts;

/// Outcome of one checked step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub passed: bool,
    pub line: String,
}

pub async fn replay(scenario: &Scenario, config: NotchConfig, keep_going: bool) -> Vec<StepReport> {
    let coordinator = Coordinator::spawn(config);
    let start = tokio::time::Instant::now();
    let mut reports = Vec::new();

    for step in &scenario.steps {
        tokio::time::sleep_until(start + step.offset()).await;
        match &step.action {
            StepAction::Signal { event } => coordinator.submit(event.clone()),
            StepAction::Hold { widget, pane } => coordinator.request_hold(*widget, *pane),
            StepAction::Release { widget } => coordinator.release_hold(*widget),
            StepAction::Check => {}
        }
        coordinator.flush().await;

        let Some(expected) = step.expect else {
            continue;
        };
        let actual = coordinator.current();
        let passed = actual == expected;
        let line = if passed {
            format!("ok   {:>6}ms  {}", step.at_ms, actual)
        } else {
            format!("FAIL {:>6}ms  expected {}, got {}", step.at_ms, expected, actual)
        };
        reports.push(StepReport { passed, line });
        if !passed && !keep_going {
            break;
        }
    }

    let stats = coordinator.stats();
    info!(
        scenario = %scenario.name,
        accepted = stats.accepted,
        live_timers = stats.live_timers(),
        stats = ?stats,
        "replay finished"
    );
    coordinator.shutdown();
    reports
}

pub async fn run(config: NotchConfig, opts: &ReplayOpts) -> anyhow::Result<()> {
    let scenario = Scenario::load(&opts.file)
        .with_context(|| format!("loading scenario {}", opts.file.display()))?;
    let config = scenario.config.clone().unwrap_or(config);

    println!("scenario {}: {}", scenario.name, scenario.description);
    let reports = replay(&scenario, config, opts.keep_going).await;
    for report in &reports {
        println!("  {}", report.line);
    }

    let failed = reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{failed} of {} expectations failed", reports.len());
    }
    println!("{} expectations passed", reports.len());
    Ok(())
}
