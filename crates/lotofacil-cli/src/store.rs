use std::{
    fs, io,
    path::{Path, PathBuf},
};

use lotofacil_core::DrawHistory;
use lotofacil_evaluator::weights::WeightVector;
use lotofacil_training::{
    persistence::{DocumentKind, LearningStore, StoreError, decode, decode_weights, encode},
    reinforcement::QTable,
};

/// Learning state kept as one JSON document per kind in a directory.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: DocumentKind) -> PathBuf {
        let name = match kind {
            DocumentKind::History => "history.json",
            DocumentKind::Weights => "weights.json",
            DocumentKind::QTable => "qtable.json",
        };
        self.dir.join(name)
    }

    pub fn contains(&self, kind: DocumentKind) -> bool {
        self.path(kind).is_file()
    }

    fn read(&self, kind: DocumentKind) -> Result<Option<String>, StoreError> {
        let path = self.path(kind);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(json)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Writes to a temporary file, then renames it into place.
    fn write(&self, kind: DocumentKind, json: &str) -> Result<(), StoreError> {
        let path = self.path(kind);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })?;
        tracing::debug!(%kind, path = %self.path(kind).display(), "document saved");
        Ok(())
    }
}

impl LearningStore for JsonDirStore {
    fn load_history(&self) -> Result<Option<DrawHistory>, StoreError> {
        self.read(DocumentKind::History)?
            .map(|json| decode(DocumentKind::History, &json))
            .transpose()
    }

    fn save_history(&mut self, history: &DrawHistory) -> Result<(), StoreError> {
        self.write(DocumentKind::History, &encode(DocumentKind::History, history)?)
    }

    fn load_weights(&self) -> Result<Option<WeightVector>, StoreError> {
        self.read(DocumentKind::Weights)?
            .map(|json| decode_weights(&json))
            .transpose()
    }

    fn save_weights(&mut self, weights: &WeightVector) -> Result<(), StoreError> {
        self.write(DocumentKind::Weights, &encode(DocumentKind::Weights, weights)?)
    }

    fn load_qtable(&self) -> Result<Option<QTable>, StoreError> {
        self.read(DocumentKind::QTable)?
            .map(|json| decode(DocumentKind::QTable, &json))
            .transpose()
    }

    fn save_qtable(&mut self, qtable: &QTable) -> Result<(), StoreError> {
        self.write(DocumentKind::QTable, &encode(DocumentKind::QTable, qtable)?)
    }
}

#[cfg(test)]
mod tests {
    use lotofacil_core::{Draw, NumberSet};
    use lotofacil_training::{config::RlConfig, reinforcement::LearningState};

    use super::*;

    #[test]
    fn test_missing_documents_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path().join("state")).unwrap();
        assert!(store.load_history().unwrap().is_none());
        assert!(store.load_weights().unwrap().is_none());
        assert!(store.load_qtable().unwrap().is_none());
    }

    #[test]
    fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonDirStore::open(dir.path()).unwrap();
        let history = DrawHistory::from_draws(vec![
            Draw::new(1, None, NumberSet::pick(1_u8..=15).unwrap()).unwrap(),
        ])
        .unwrap();
        let learning = LearningState::new(&RlConfig::default());
        store.save_history(&history).unwrap();
        store.save_learning_state(&learning).unwrap();

        let store = JsonDirStore::open(dir.path()).unwrap();
        assert_eq!(store.load_history().unwrap(), Some(history));
        assert_eq!(
            store.load_learning_state(&RlConfig::default()).unwrap(),
            learning
        );
        assert!(!store.path(DocumentKind::History).with_extension("json.tmp").exists());
    }

    #[test]
    fn test_foreign_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        fs::write(
            store.path(DocumentKind::History),
            r#"{ "schema_version": 0, "data": [] }"#,
        )
        .unwrap();
        assert!(matches!(
            store.load_history().unwrap_err(),
            StoreError::SchemaMismatch {
                kind: DocumentKind::History,
                ..
            }
        ));
    }
}
