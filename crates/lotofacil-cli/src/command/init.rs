use lotofacil_core::DrawHistory;
use lotofacil_training::{
    config::OptimizerConfig,
    persistence::{DocumentKind, LearningStore as _},
    reinforcement::LearningState,
};

use crate::{command::StateArg, util::Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InitArg {
    #[clap(flatten)]
    state: StateArg,
    /// Seed stored in the default config
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Reset learned weights and Q-values that already exist
    #[arg(long)]
    force: bool,
}

pub(crate) fn run(arg: &InitArg) -> anyhow::Result<()> {
    let InitArg { state, seed, force } = arg;
    let mut store = state.open()?;
    if !force && (store.contains(DocumentKind::Weights) || store.contains(DocumentKind::QTable)) {
        anyhow::bail!(
            "{} already holds learned state; pass --force to reset it",
            store.dir().display()
        );
    }

    let config = OptimizerConfig::with_seed(*seed);
    store.save_learning_state(&LearningState::new(&config.rl))?;
    if !store.contains(DocumentKind::History) {
        store.save_history(&DrawHistory::new())?;
    }
    Output::save_json(&config, Some(state.config_path()))?;

    tracing::info!(
        dir = %store.dir().display(),
        seed,
        "initialized state directory"
    );
    Ok(())
}
