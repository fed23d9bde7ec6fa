use std::path::PathBuf;

use lotofacil_core::Draw;
use lotofacil_evaluator::detector::{Baseline, EventRecord, RareEventDetector, RareThreshold};
use lotofacil_training::persistence::LearningStore as _;

use crate::{command::StateArg, model::report::DetectionReport, util::Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DetectArg {
    #[clap(flatten)]
    state: StateArg,
    /// Trailing draws used for frequencies
    #[arg(long, default_value_t = 50)]
    window: usize,
    /// Flag values beyond this many standard deviations instead of the
    /// 2.5th and 97.5th percentiles
    #[arg(long)]
    std_dev: Option<f32>,
    /// Only report events of the latest draws
    #[arg(long)]
    last: Option<usize>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DetectArg) -> anyhow::Result<()> {
    let threshold = match arg.std_dev {
        Some(k) if k > 0.0 => RareThreshold::StdDev { k },
        Some(k) => anyhow::bail!("--std-dev must be positive, got {k}"),
        None => RareThreshold::default(),
    };
    let store = arg.state.open()?;
    let history = store.load_history()?.unwrap_or_default();
    let detector = RareEventDetector::from_history(&history, arg.window, threshold);

    let mut events = detector.scan_history(&history);
    if let Some(last) = arg.last {
        retain_latest(&mut events, history.draws(), last);
    }
    let jump_precursor = detector.jump_precursor(&history);
    if jump_precursor {
        tracing::warn!("jump precursor: the latest draws combine high sums with long runs");
    }

    let report = DetectionReport {
        draws: history.len(),
        baseline_samples: detector.baseline().map_or(0, Baseline::sample_count),
        events,
        jump_precursor,
    };
    tracing::info!(
        draws = report.draws,
        events = report.events.len(),
        "rare-event scan finished"
    );
    Output::save_json(&report, arg.output.clone())
}

/// Keeps the events of the `last` latest draws.
fn retain_latest(events: &mut Vec<EventRecord>, draws: &[Draw], last: usize) {
    let Some(pos) = draws.len().checked_sub(last) else {
        return;
    };
    match draws.get(pos) {
        Some(first) => events.retain(|e| e.draw_index.is_some_and(|i| i >= first.index())),
        None => events.clear(),
    }
}
