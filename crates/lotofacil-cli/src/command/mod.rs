use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use lotofacil_training::config::OptimizerConfig;

use self::{
    detect::DetectArg, generate_history::GenerateHistoryArg, init::InitArg, learn::LearnArg,
    optimize::OptimizeArg,
};

mod detect;
mod generate_history;
mod init;
mod learn;
mod optimize;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Write default weights, an empty Q-table and a default config
    Init(#[clap(flatten)] InitArg),
    /// Write a synthetic history biased towards chosen numbers
    GenerateHistory(#[clap(flatten)] GenerateHistoryArg),
    /// Search for selections and publish them as predictions
    Optimize(#[clap(flatten)] OptimizeArg),
    /// Learn from a real draw and append it to the history
    Learn(#[clap(flatten)] LearnArg),
    /// Report rare events and the jump precursor alert
    Detect(#[clap(flatten)] DetectArg),
}

/// Location of the persisted history and learned state.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct StateArg {
    /// State directory
    #[arg(long, default_value = "state")]
    state_dir: PathBuf,
}

impl StateArg {
    const CONFIG_FILE: &str = "config.json";

    fn open(&self) -> anyhow::Result<crate::store::JsonDirStore> {
        crate::store::JsonDirStore::open(&self.state_dir).map_err(anyhow::Error::from)
    }

    fn config_path(&self) -> PathBuf {
        self.state_dir.join(Self::CONFIG_FILE)
    }

    /// Configuration from `explicit`, else from the state directory, else
    /// the defaults.
    fn load_config(&self, explicit: Option<&Path>) -> anyhow::Result<OptimizerConfig> {
        if let Some(path) = explicit {
            return crate::util::read_config_file(path);
        }
        let path = self.config_path();
        if path.is_file() {
            crate::util::read_config_file(path)
        } else {
            tracing::debug!("no config file, using defaults");
            Ok(OptimizerConfig::with_seed(0))
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Init(arg) => init::run(&arg)?,
        Mode::GenerateHistory(arg) => generate_history::run(&arg)?,
        Mode::Optimize(arg) => optimize::run(&arg)?,
        Mode::Learn(arg) => learn::run(&arg)?,
        Mode::Detect(arg) => detect::run(&arg)?,
    }
    Ok(())
}
