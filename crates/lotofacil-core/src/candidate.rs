use serde::{Deserialize, Serialize};

use crate::{InvalidEntityError, NumberSet};

/// Identifier of a candidate, unique within one optimization run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
#[display("#{_0}")]
pub struct CandidateId(pub u64);

/// Parents a candidate was recombined from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lineage {
    pub parents: [CandidateId; 2],
}

/// A proposed 15-number selection.
///
/// `fitness` is `None` until the candidate has been evaluated. Candidates of
/// the initial population have no lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CandidateRecord", into = "CandidateRecord")]
pub struct Candidate {
    id: CandidateId,
    numbers: NumberSet,
    generation_born: u32,
    fitness: Option<f32>,
    lineage: Option<Lineage>,
}

impl Candidate {
    pub fn new(
        id: CandidateId,
        numbers: NumberSet,
        generation_born: u32,
        lineage: Option<Lineage>,
    ) -> Result<Self, InvalidEntityError> {
        numbers.validate_pick()?;
        Ok(Self {
            id,
            numbers,
            generation_born,
            fitness: None,
            lineage,
        })
    }

    #[must_use]
    pub fn id(&self) -> CandidateId {
        self.id
    }

    #[must_use]
    pub fn numbers(&self) -> NumberSet {
        self.numbers
    }

    #[must_use]
    pub fn generation_born(&self) -> u32 {
        self.generation_born
    }

    #[must_use]
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    #[must_use]
    pub fn lineage(&self) -> Option<Lineage> {
        self.lineage
    }

    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = Some(fitness);
    }
}

#[derive(Serialize, Deserialize)]
struct CandidateRecord {
    id: CandidateId,
    numbers: NumberSet,
    generation_born: u32,
    #[serde(default)]
    fitness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lineage: Option<Lineage>,
}

impl TryFrom<CandidateRecord> for Candidate {
    type Error = InvalidEntityError;

    fn try_from(record: CandidateRecord) -> Result<Self, Self::Error> {
        let mut candidate = Self::new(
            record.id,
            record.numbers,
            record.generation_born,
            record.lineage,
        )?;
        candidate.fitness = record.fitness;
        Ok(candidate)
    }
}

impl From<Candidate> for CandidateRecord {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            numbers: candidate.numbers,
            generation_born: candidate.generation_born,
            fitness: candidate.fitness,
            lineage: candidate.lineage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_candidate_is_unevaluated() {
        let mut candidate =
            Candidate::new(CandidateId(7), NumberSet::pick(11_u8..=25).unwrap(), 0, None).unwrap();
        assert_eq!(candidate.fitness(), None);
        candidate.set_fitness(1.5);
        assert_eq!(candidate.fitness(), Some(1.5));
        assert_eq!(candidate.id().to_string(), "#7");
    }

    #[test]
    fn test_new_rejects_wrong_count() {
        let numbers = NumberSet::from_numbers(1_u8..=16).unwrap();
        assert_eq!(
            Candidate::new(CandidateId(0), numbers, 0, None),
            Err(InvalidEntityError::WrongCount { count: 16 })
        );
    }

    #[test]
    fn test_serde_keeps_lineage() {
        let lineage = Lineage {
            parents: [CandidateId(1), CandidateId(2)],
        };
        let candidate = Candidate::new(
            CandidateId(3),
            NumberSet::pick(1_u8..=15).unwrap(),
            4,
            Some(lineage),
        )
        .unwrap();
        let json = serde_json::to_string(&candidate).unwrap();
        let back: Candidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);
    }
}
