//! Genetic search over 15-of-25 selections.
//!
//! A [`GeneticEngine`] walks one population through the generation cycle:
//!
//! ```text
//! Initialized ─▶ Evaluated ─▶ Selected ─▶ Recombined ─▶ Mutated ─▶ Evaluated ─▶ …
//!                    │
//!                    └─▶ Converged | Exhausted
//! ```
//!
//! 1. **Evaluate** - unevaluated individuals are scored on scoped worker
//!    threads; the scope is the generation barrier
//! 2. **Select** - the elite share is kept as is; parents of every other slot
//!    are drawn by tournament or roulette
//! 3. **Recombine** - children keep the numbers common to both parents and
//!    fill up from their symmetric difference
//! 4. **Mutate** - with probability `mutation_rate` one member is swapped for
//!    an outside number chosen by the RL policy, or uniformly without one
//!
//! Every candidate is validated at construction. A child that is not a valid
//! selection aborts the run with an [`InvariantViolation`].

use std::{panic, thread};

use lotofacil_core::{Candidate, CandidateId, InvalidEntityError, Lineage, NumberSet};
use lotofacil_evaluator::{
    feature::FeatureVector,
    fitness::{EvaluateError, FitnessEvaluator},
    weights::WeightVector,
};
use rand::{Rng, seq::IndexedRandom};

use crate::{
    config::{InitStrategy, OptimizerConfig, Selection},
    operators,
    reinforcement::{MutationRecord, QTable, RlAdapter},
};

/// Attempts to place an initial candidate at the Hamming floor before the
/// last draw is accepted as is.
const MAX_INIT_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum GenerationPhase {
    Initialized,
    Evaluated,
    Selected,
    Recombined,
    Mutated,
    Converged,
    Exhausted,
}

/// A produced candidate that is not a valid selection.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display(
    "generation {generation} produced invalid candidate [{numbers}] (lineage {lineage:?}): {source}"
)]
pub struct InvariantViolation {
    pub generation: u32,
    pub numbers: NumberSet,
    pub lineage: Option<Lineage>,
    pub source: InvalidEntityError,
}

/// Hands out run-unique candidate ids.
#[derive(Debug, Default)]
pub struct CandidateIdAllocator {
    next: u64,
}

impl CandidateIdAllocator {
    pub fn next_id(&mut self) -> CandidateId {
        let id = CandidateId(self.next);
        self.next += 1;
        id
    }
}

/// A candidate with what the engine knows about it.
#[derive(Debug, Clone)]
pub struct Individual {
    candidate: Candidate,
    features: Option<FeatureVector>,
    mutation: Option<MutationRecord>,
    parent_fitness: Option<f32>,
}

impl Individual {
    fn new(candidate: Candidate) -> Self {
        Self {
            candidate,
            features: None,
            mutation: None,
            parent_fitness: None,
        }
    }

    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Fitness, or negative infinity before evaluation.
    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.candidate.fitness().unwrap_or(f32::NEG_INFINITY)
    }

    #[must_use]
    pub fn features(&self) -> Option<&FeatureVector> {
        self.features.as_ref()
    }

    /// Set on children mutated in the current generation.
    #[must_use]
    pub fn mutation(&self) -> Option<&MutationRecord> {
        self.mutation.as_ref()
    }

    fn evaluate(
        &mut self,
        evaluator: &FitnessEvaluator<'_>,
        weights: &WeightVector,
    ) -> Result<(), EvaluateError> {
        let features = evaluator.features(&self.candidate)?;
        let events = evaluator.events(&features);
        let fitness = evaluator.evaluate_features(&features, weights, &events)?;
        self.candidate.set_fitness(fitness);
        self.features = Some(features);
        Ok(())
    }
}

/// Population and phase of one genetic search.
#[derive(Debug)]
pub struct GeneticEngine<'a, 'h> {
    config: &'a OptimizerConfig,
    evaluator: &'a FitnessEvaluator<'h>,
    weights: &'a WeightVector,
    phase: GenerationPhase,
    generation: u32,
    population: Vec<Individual>,
    elite_count: usize,
    parents: Vec<[usize; 2]>,
    ids: CandidateIdAllocator,
}

impl<'a, 'h> GeneticEngine<'a, 'h> {
    /// Samples the first generation.
    ///
    /// Each candidate is redrawn up to 100 times until it lies at least
    /// `min_hamming_distance` from every earlier one; after that the last
    /// draw is accepted and a warning is logged.
    pub fn initialize<R>(
        config: &'a OptimizerConfig,
        evaluator: &'a FitnessEvaluator<'h>,
        weights: &'a WeightVector,
        rng: &mut R,
    ) -> Result<Self, InvariantViolation>
    where
        R: Rng + ?Sized,
    {
        let strata = match config.init_strategy {
            InitStrategy::Uniform => None,
            InitStrategy::Stratified => Some(Strata::new(
                &evaluator.extractor().frequencies().ranked(),
            )),
        };
        let floor = config.min_hamming_distance;
        let mut picks: Vec<NumberSet> = Vec::with_capacity(config.population_size);
        let mut crowded = 0;
        for slot in 0..config.population_size {
            let sample = |rng: &mut R| match &strata {
                Some(strata) => strata.sample(slot, config.population_size, rng),
                None => operators::random_pick(rng),
            };
            let too_close = |pick: NumberSet| picks.iter().any(|p| p.hamming_distance(pick) < floor);
            let mut pick = sample(rng);
            let mut attempts = 1;
            while attempts < MAX_INIT_ATTEMPTS && too_close(pick) {
                pick = sample(rng);
                attempts += 1;
            }
            if too_close(pick) {
                crowded += 1;
            }
            picks.push(pick);
        }
        if crowded > 0 {
            tracing::warn!(
                crowded,
                floor,
                "initial candidates accepted below the Hamming distance floor"
            );
        }

        let mut ids = CandidateIdAllocator::default();
        let population = picks
            .into_iter()
            .map(|numbers| {
                Candidate::new(ids.next_id(), numbers, 0, None)
                    .map(Individual::new)
                    .map_err(|source| InvariantViolation {
                        generation: 0,
                        numbers,
                        lineage: None,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            evaluator,
            weights,
            phase: GenerationPhase::Initialized,
            generation: 0,
            population,
            elite_count: config.elite_count(),
            parents: vec![],
            ids,
        })
    }

    #[must_use]
    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    /// Zero-based index of the current generation.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Individuals, best first once evaluated.
    #[must_use]
    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.population.first()
    }

    /// Evaluated children carrying a mutation record, with their fitness.
    pub fn mutation_outcomes(
        &self,
    ) -> impl Iterator<Item = (&MutationRecord, f32, &FeatureVector)> {
        self.population.iter().filter_map(|ind| {
            Some((
                ind.mutation.as_ref()?,
                ind.candidate.fitness()?,
                ind.features.as_ref()?,
            ))
        })
    }

    /// Scores every unevaluated individual and sorts the population best
    /// first. Ties are ordered by their numbers.
    pub fn evaluate(&mut self) -> Result<(), EvaluateError> {
        debug_assert!(matches!(
            self.phase,
            GenerationPhase::Initialized | GenerationPhase::Mutated
        ));
        let evaluator = self.evaluator;
        let weights = self.weights;
        let mut pending = self
            .population
            .iter_mut()
            .filter(|ind| ind.candidate.fitness().is_none())
            .collect::<Vec<_>>();
        let chunk_size = pending.len().div_ceil(self.config.worker_threads).max(1);

        thread::scope(|s| {
            let handles = pending
                .chunks_mut(chunk_size)
                .map(|chunk| {
                    s.spawn(move || {
                        chunk
                            .iter_mut()
                            .try_for_each(|ind| ind.evaluate(evaluator, weights))
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .try_for_each(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
        })?;

        self.population.sort_by(|a, b| {
            b.fitness()
                .total_cmp(&a.fitness())
                .then_with(|| a.candidate.numbers().cmp(&b.candidate.numbers()))
        });
        self.phase = GenerationPhase::Evaluated;
        Ok(())
    }

    /// Chooses the parents of every non-elite slot of the next generation.
    pub fn select<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        debug_assert_eq!(self.phase, GenerationPhase::Evaluated);
        let indices = (0..self.population.len()).collect::<Vec<_>>();
        let slots = self.population.len() - self.elite_count;
        let mut parents = Vec::with_capacity(slots);
        for _ in 0..slots {
            parents.push([
                self.select_one(&indices, rng),
                self.select_one(&indices, rng),
            ]);
        }
        self.parents = parents;
        self.phase = GenerationPhase::Selected;
    }

    fn select_one<R>(&self, indices: &[usize], rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let fitness = |i: &usize| self.population[*i].fitness();
        let chosen = match self.config.selection {
            Selection::Tournament { size } => indices
                .choose_multiple(rng, size)
                .copied()
                .max_by(|a, b| fitness(a).total_cmp(&fitness(b)).then(b.cmp(a))),
            Selection::Roulette => {
                let min = indices.iter().map(fitness).fold(f32::INFINITY, f32::min);
                indices
                    .choose_weighted(rng, |i| f64::from(fitness(i) - min) + 1e-6)
                    .ok()
                    .copied()
            }
        };
        chosen.unwrap_or(0)
    }

    /// Builds the next generation: elites first, then one child per selected
    /// parent pair.
    pub fn recombine<R>(&mut self, rng: &mut R) -> Result<(), InvariantViolation>
    where
        R: Rng + ?Sized,
    {
        debug_assert_eq!(self.phase, GenerationPhase::Selected);
        let generation = self.generation + 1;
        let crossover_rate = f64::from(self.config.crossover_rate);
        let children = std::mem::take(&mut self.parents)
            .into_iter()
            .map(|[a, b]| {
                let (a, b) = (&self.population[a], &self.population[b]);
                let numbers = if rng.random_bool(crossover_rate) {
                    operators::crossover(a.candidate.numbers(), b.candidate.numbers(), rng)
                } else {
                    a.candidate.numbers()
                };
                let lineage = Lineage {
                    parents: [a.candidate.id(), b.candidate.id()],
                };
                (numbers, lineage, f32::midpoint(a.fitness(), b.fitness()))
            })
            .collect::<Vec<_>>();

        let mut next = self.population[..self.elite_count]
            .iter()
            .map(|elite| Individual {
                mutation: None,
                parent_fitness: None,
                ..elite.clone()
            })
            .collect::<Vec<_>>();
        for (numbers, lineage, parent_fitness) in children {
            let candidate = Candidate::new(self.ids.next_id(), numbers, generation, Some(lineage))
                .map_err(|source| InvariantViolation {
                    generation,
                    numbers,
                    lineage: Some(lineage),
                    source,
                })?;
            next.push(Individual {
                parent_fitness: Some(parent_fitness),
                ..Individual::new(candidate)
            });
        }
        self.population = next;
        self.generation = generation;
        self.phase = GenerationPhase::Recombined;
        Ok(())
    }

    /// Mutates each child with probability `mutation_rate`.
    ///
    /// With `policy` set, the inserted number comes from the RL adapter's
    /// epsilon-greedy choice over the child's pre-mutation state, and the
    /// child records the mutation for later credit.
    pub fn mutate<R>(
        &mut self,
        policy: Option<(&RlAdapter, &QTable)>,
        rng: &mut R,
    ) -> Result<(), InvariantViolation>
    where
        R: Rng + ?Sized,
    {
        debug_assert_eq!(self.phase, GenerationPhase::Recombined);
        let generation = self.generation;
        let rate = f64::from(self.config.mutation_rate);
        for i in self.elite_count..self.population.len() {
            if !rng.random_bool(rate) {
                continue;
            }
            let child = &self.population[i];
            let (id, current, lineage) = (
                child.candidate.id(),
                child.candidate.numbers(),
                child.candidate.lineage(),
            );
            let parent_fitness = child.parent_fitness;
            let violation = |numbers, source| InvariantViolation {
                generation,
                numbers,
                lineage,
                source,
            };

            let Some(removed) = operators::random_member(current, rng) else {
                continue;
            };
            let (inserted, mutation) = match policy {
                Some((adapter, qtable)) => {
                    let features = self
                        .evaluator
                        .extractor()
                        .extract_numbers(current)
                        .map_err(|source| violation(current, source))?;
                    let state = adapter.discretizer().state(&features);
                    let Some(action) = adapter.select_action(qtable, &state, current, rng) else {
                        continue;
                    };
                    let record = MutationRecord {
                        state,
                        action,
                        parent_fitness: parent_fitness.unwrap_or(f32::NEG_INFINITY),
                    };
                    (action.0, Some(record))
                }
                None => match operators::random_outsider(current, rng) {
                    Some(n) => (n, None),
                    None => continue,
                },
            };
            let Some(numbers) = operators::swap_member(current, removed, inserted) else {
                continue;
            };
            let candidate = Candidate::new(id, numbers, generation, lineage)
                .map_err(|source| violation(numbers, source))?;
            self.population[i] = Individual {
                candidate,
                features: None,
                mutation,
                parent_fitness,
            };
        }
        self.phase = GenerationPhase::Mutated;
        Ok(())
    }

    /// Marks the search as finished.
    pub fn finish(&mut self, phase: GenerationPhase) {
        debug_assert!(phase.is_converged() || phase.is_exhausted());
        self.phase = phase;
    }
}

/// Hot, warm and cold numbers by trailing frequency.
struct Strata {
    hot: Vec<u8>,
    warm: Vec<u8>,
    cold: Vec<u8>,
}

impl Strata {
    const HOT: usize = 10;
    const WARM: usize = 8;

    fn new(ranked: &[u8]) -> Self {
        Self {
            hot: ranked[..Self::HOT].to_vec(),
            warm: ranked[Self::HOT..Self::HOT + Self::WARM].to_vec(),
            cold: ranked[Self::HOT + Self::WARM..].to_vec(),
        }
    }

    /// The first half of the population leans hot, the next 30% warm and the
    /// rest cold.
    fn sample<R>(&self, slot: usize, population_size: usize, rng: &mut R) -> NumberSet
    where
        R: Rng + ?Sized,
    {
        let (preferred, count) = if slot * 10 < population_size * 5 {
            (&self.hot, 10)
        } else if slot * 10 < population_size * 8 {
            (&self.warm, 7)
        } else {
            (&self.cold, 5)
        };
        let others = self
            .hot
            .iter()
            .chain(&self.warm)
            .chain(&self.cold)
            .copied()
            .filter(|n| !preferred.contains(n))
            .collect::<Vec<_>>();
        operators::biased_pick(rng, preferred, &others, count)
    }
}
