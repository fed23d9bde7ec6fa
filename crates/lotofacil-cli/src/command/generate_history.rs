use std::{fs, path::PathBuf};

use anyhow::Context as _;
use lotofacil_training::{
    persistence::{self, DocumentKind, LearningStore as _},
    synthetic::BiasedHistory,
};

use crate::command::StateArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GenerateHistoryArg {
    #[clap(flatten)]
    state: StateArg,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of draws to generate
    #[arg(long, default_value_t = 50)]
    draws: u32,
    /// Numbers drawn with the hot weight (comma separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15"
    )]
    hot: Vec<u8>,
    #[arg(long, default_value_t = 0.9)]
    hot_weight: f32,
    #[arg(long, default_value_t = 0.1)]
    cold_weight: f32,
    /// Replace an existing history
    #[arg(long)]
    force: bool,
    /// Write the history to this file instead of the state directory
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &GenerateHistoryArg) -> anyhow::Result<()> {
    let params = BiasedHistory {
        seed: arg.seed,
        draws: arg.draws,
        hot_numbers: arg.hot.clone(),
        hot_weight: arg.hot_weight,
        cold_weight: arg.cold_weight,
    };
    let history = params.generate()?;

    if let Some(path) = &arg.output {
        // Same envelope as history.json, so the file can seed a state directory.
        let json = persistence::encode(DocumentKind::History, &history)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write history file: {}", path.display()))?;
        tracing::info!(draws = history.len(), path = %path.display(), "history written");
        return Ok(());
    }

    let mut store = arg.state.open()?;
    if !arg.force && store.load_history()?.is_some_and(|h| !h.is_empty()) {
        anyhow::bail!(
            "{} already exists; pass --force to replace it",
            store.path(DocumentKind::History).display()
        );
    }
    store.save_history(&history)?;
    tracing::info!(
        draws = history.len(),
        hot = ?arg.hot,
        path = %store.path(DocumentKind::History).display(),
        "synthetic history saved"
    );
    Ok(())
}
