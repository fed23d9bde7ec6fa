use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use lotofacil_core::{Draw, NumberSet};
use lotofacil_evaluator::extractor::FeatureExtractor;
use lotofacil_training::{
    persistence::LearningStore as _,
    reinforcement::{Outcome, Prediction, RlAdapter},
};

use crate::{
    command::StateArg,
    model::report::{LearnReport, ScoredPrediction},
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct LearnArg {
    #[clap(flatten)]
    state: StateArg,
    /// Config file; defaults to config.json in the state directory
    #[arg(long)]
    config: Option<PathBuf>,
    /// Report written by `optimize`
    #[arg(long)]
    report: PathBuf,
    /// The fifteen drawn numbers (comma separated)
    #[arg(long, value_delimiter = ',', required = true)]
    numbers: Vec<u8>,
    /// Draw index; defaults to the next index of the history
    #[arg(long)]
    index: Option<u32>,
    /// Draw date (RFC 3339)
    #[arg(long)]
    drawn_at: Option<DateTime<Utc>>,
    /// Output file path for the scored predictions
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &LearnArg) -> anyhow::Result<()> {
    let config = arg.state.load_config(arg.config.as_deref())?;
    let mut store = arg.state.open()?;
    let mut history = store.load_history()?.unwrap_or_default();
    let report = util::read_report_file(&arg.report)?;

    let numbers = NumberSet::pick(arg.numbers.iter().copied()).context("Invalid draw numbers")?;
    let index = arg.index.unwrap_or_else(|| history.next_index());
    if index != report.target_draw {
        tracing::warn!(
            index,
            target = report.target_draw,
            "report was made for another draw"
        );
    }
    let draw = Draw::new(index, arg.drawn_at, numbers)?;

    // Features see the history as it was when the predictions were made.
    let extractor = FeatureExtractor::new(&history, config.frequency_window);
    let predictions = report
        .predictions
        .iter()
        .map(|p| -> anyhow::Result<Prediction> {
            Ok(Prediction {
                numbers: p.numbers,
                features: extractor.extract_numbers(p.numbers)?,
                mutation: p.mutation.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Nothing is learned or saved unless the draw extends the history.
    history
        .append(draw.clone())
        .with_context(|| format!("Cannot append draw {index} to the history"))?;

    let mut learning = store.load_learning_state(&config.rl)?;
    let adapter = RlAdapter::new(&config.rl);
    let outcome = Outcome { draw, predictions };
    let hits = outcome.hits();
    let weights = adapter.adjust_weights(&mut learning, &outcome);
    store.save_history(&history)?;
    store.save_learning_state(&learning)?;

    for (feature, weight) in weights.iter() {
        tracing::debug!(%feature, weight, "weight");
    }
    tracing::info!(
        draw = index,
        winning = hits.winning,
        best = hits.best,
        mean = format_args!("{:.2}", hits.mean),
        prize_points = hits.prize_points,
        "predictions scored"
    );
    tracing::info!(
        draw = index,
        episodes = learning.qtable.episodes(),
        epsilon = learning.qtable.epsilon(),
        "learning state saved"
    );

    let learn_report = LearnReport {
        draw: index,
        numbers,
        predictions: report
            .predictions
            .iter()
            .map(|p| ScoredPrediction {
                rank: p.rank,
                numbers: p.numbers,
                matches: outcome.draw.matches(p.numbers),
            })
            .collect(),
        hits,
        episodes: learning.qtable.episodes(),
        epsilon: learning.qtable.epsilon(),
    };
    Output::save_json(&learn_report, arg.output.clone())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use lotofacil_core::DrawHistory;
    use lotofacil_training::{
        config::{RlConfig, RunMode},
        optimizer::Termination,
        persistence::LearningStore as _,
    };

    use super::*;
    use crate::{model::report::Report, store::JsonDirStore};

    fn setup(dir: &Path, latest: u32) -> (LearnArg, JsonDirStore) {
        let mut store = JsonDirStore::open(dir.join("state")).unwrap();
        let numbers = NumberSet::pick(1_u8..=15).unwrap();
        let history = DrawHistory::from_draws(vec![Draw::new(latest, None, numbers).unwrap()]);
        store.save_history(&history.unwrap()).unwrap();
        let report = Report {
            generated_at: Utc::now(),
            seed: 0,
            target_draw: latest + 1,
            history_len: 1,
            mode: RunMode::Normal,
            termination: Termination::Exhausted,
            partial: false,
            generations: 1,
            predictions: Vec::new(),
            trace: Vec::new(),
        };
        let report_path = dir.join("report.json");
        Output::save_json(&report, Some(report_path.clone())).unwrap();

        let arg = LearnArg {
            state: StateArg {
                state_dir: dir.join("state"),
            },
            config: None,
            report: report_path,
            numbers: (5..=19).collect(),
            index: None,
            drawn_at: None,
            output: Some(dir.join("learned.json")),
        };
        (arg, store)
    }

    #[test]
    fn test_rejected_draw_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (mut arg, store) = setup(dir.path(), 10);
        arg.index = Some(5);

        assert!(run(&arg).is_err());
        assert_eq!(store.load_history().unwrap().unwrap().len(), 1);
        assert!(store.load_weights().unwrap().is_none());
        assert!(store.load_qtable().unwrap().is_none());
    }

    #[test]
    fn test_draw_is_learned_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let (arg, store) = setup(dir.path(), 10);

        run(&arg).unwrap();
        let history = store.load_history().unwrap().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().index(), 11);
        let learning = store.load_learning_state(&RlConfig::default()).unwrap();
        assert_eq!(learning.qtable.episodes(), 1);

        let learned: serde_json::Value =
            util::read_json_file("learn report", dir.path().join("learned.json")).unwrap();
        assert_eq!(learned["draw"], 11);
        assert_eq!(learned["hits"]["winning"], 0);
    }
}
