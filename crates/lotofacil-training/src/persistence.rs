//! Versioned persistence of the history and the learned state.
//!
//! Every document is stored as `{ "schema_version": N, "data": ... }`. A
//! document with another schema version, or weights learned for another
//! feature set, is rejected with [`StoreError::SchemaMismatch`] before any
//! of it is used.

use std::{collections::BTreeMap, io, path::PathBuf};

use lotofacil_core::DrawHistory;
use lotofacil_evaluator::{feature::FEATURE_SET_VERSION, weights::WeightVector};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    config::RlConfig,
    reinforcement::{LearningState, QTable},
};

pub const HISTORY_SCHEMA_VERSION: u32 = 1;
pub const WEIGHTS_SCHEMA_VERSION: u32 = 1;
pub const QTABLE_SCHEMA_VERSION: u32 = 1;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, derive_more::Display, derive_more::IsVariant,
)]
pub enum DocumentKind {
    #[display("history")]
    History,
    #[display("weights")]
    Weights,
    #[display("Q-table")]
    QTable,
}

impl DocumentKind {
    /// Schema version written and accepted for this kind.
    #[must_use]
    pub fn schema_version(self) -> u32 {
        match self {
            Self::History => HISTORY_SCHEMA_VERSION,
            Self::Weights => WEIGHTS_SCHEMA_VERSION,
            Self::QTable => QTABLE_SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("{kind} schema version {found} is not supported (expected {expected})")]
    SchemaMismatch {
        kind: DocumentKind,
        expected: u32,
        found: u32,
    },
    #[display("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("malformed {kind} document: {source}")]
    Malformed {
        kind: DocumentKind,
        source: serde_json::Error,
    },
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    schema_version: u32,
    data: serde_json::Value,
}

/// Wraps `value` in a versioned envelope.
pub fn encode<T>(kind: DocumentKind, value: &T) -> Result<String, StoreError>
where
    T: Serialize,
{
    let envelope = EnvelopeRef {
        schema_version: kind.schema_version(),
        data: value,
    };
    serde_json::to_string_pretty(&envelope).map_err(|source| StoreError::Malformed { kind, source })
}

/// Unwraps a versioned envelope, checking the schema version before the
/// payload is parsed.
///
/// ```
/// use lotofacil_training::persistence::{DocumentKind, StoreError, decode};
///
/// let json = r#"{ "schema_version": 99, "data": [] }"#;
/// let err = decode::<Vec<u8>>(DocumentKind::History, json).unwrap_err();
/// assert!(matches!(err, StoreError::SchemaMismatch { found: 99, .. }));
/// ```
pub fn decode<T>(kind: DocumentKind, json: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    let malformed = |source| StoreError::Malformed { kind, source };
    let envelope: Envelope = serde_json::from_str(json).map_err(malformed)?;
    let expected = kind.schema_version();
    if envelope.schema_version != expected {
        return Err(StoreError::SchemaMismatch {
            kind,
            expected,
            found: envelope.schema_version,
        });
    }
    serde_json::from_value(envelope.data).map_err(malformed)
}

/// Decodes a weight document and checks its feature-set version.
pub fn decode_weights(json: &str) -> Result<WeightVector, StoreError> {
    let weights: WeightVector = decode(DocumentKind::Weights, json)?;
    if weights.feature_set_version() != FEATURE_SET_VERSION {
        return Err(StoreError::SchemaMismatch {
            kind: DocumentKind::Weights,
            expected: FEATURE_SET_VERSION,
            found: weights.feature_set_version(),
        });
    }
    Ok(weights)
}

/// Storage for the history and the learned state.
///
/// Loads return `Ok(None)` when nothing has been stored yet.
pub trait LearningStore {
    fn load_history(&self) -> Result<Option<DrawHistory>, StoreError>;
    fn save_history(&mut self, history: &DrawHistory) -> Result<(), StoreError>;
    fn load_weights(&self) -> Result<Option<WeightVector>, StoreError>;
    fn save_weights(&mut self, weights: &WeightVector) -> Result<(), StoreError>;
    fn load_qtable(&self) -> Result<Option<QTable>, StoreError>;
    fn save_qtable(&mut self, qtable: &QTable) -> Result<(), StoreError>;

    /// Stored weights and Q-table, with defaults for whatever is missing.
    fn load_learning_state(&self, config: &RlConfig) -> Result<LearningState, StoreError> {
        let fresh = LearningState::new(config);
        Ok(LearningState {
            weights: self.load_weights()?.unwrap_or(fresh.weights),
            qtable: self.load_qtable()?.unwrap_or(fresh.qtable),
        })
    }

    fn save_learning_state(&mut self, learning: &LearningState) -> Result<(), StoreError> {
        self.save_weights(&learning.weights)?;
        self.save_qtable(&learning.qtable)
    }
}

/// Store keeping encoded documents in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    documents: BTreeMap<DocumentKind, String>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw document as if it had been written by another version.
    pub fn insert_raw(&mut self, kind: DocumentKind, json: impl Into<String>) {
        self.documents.insert(kind, json.into());
    }

    #[must_use]
    pub fn raw(&self, kind: DocumentKind) -> Option<&str> {
        self.documents.get(&kind).map(String::as_str)
    }

    fn load<T>(&self, kind: DocumentKind) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        self.raw(kind).map(|json| decode(kind, json)).transpose()
    }

    fn save<T>(&mut self, kind: DocumentKind, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let json = encode(kind, value)?;
        self.documents.insert(kind, json);
        Ok(())
    }
}

impl LearningStore for InMemoryStore {
    fn load_history(&self) -> Result<Option<DrawHistory>, StoreError> {
        self.load(DocumentKind::History)
    }

    fn save_history(&mut self, history: &DrawHistory) -> Result<(), StoreError> {
        self.save(DocumentKind::History, history)
    }

    fn load_weights(&self) -> Result<Option<WeightVector>, StoreError> {
        self.raw(DocumentKind::Weights).map(decode_weights).transpose()
    }

    fn save_weights(&mut self, weights: &WeightVector) -> Result<(), StoreError> {
        self.save(DocumentKind::Weights, weights)
    }

    fn load_qtable(&self) -> Result<Option<QTable>, StoreError> {
        self.load(DocumentKind::QTable)
    }

    fn save_qtable(&mut self, qtable: &QTable) -> Result<(), StoreError> {
        self.save(DocumentKind::QTable, qtable)
    }
}
