use crate::mutator::{MutatorCatalog, MutatorKind};
use rand::Rng;
use rand_core::RngCore;
use thiserror::Error;

/// Errors that can occur during scheduler operations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// The catalog has no mutators, so there is nothing to schedule.
    #[error("Mutator catalog is empty, cannot plan mutations")]
    CatalogEmpty,
    /// A plan entry names a mutator the catalog does not have.
    #[error("Plan entry {index} is out of range for a catalog of {catalog_size} mutators")]
    IndexOutOfRange { index: usize, catalog_size: usize },
}

/// An ordered list of catalog indices, one per candidate to generate.
///
/// Repeats are expected; each entry is an independent draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationPlan {
    indices: Vec<usize>,
}

impl MutationPlan {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolves every index against `catalog`, one mutator per entry.
    ///
    /// Fails on the first index the catalog does not contain.
    pub fn resolve(&self, catalog: &MutatorCatalog) -> Result<Vec<MutatorKind>, SchedulerError> {
        self.indices
            .iter()
            .map(|&index| {
                catalog
                    .get(index)
                    .copied()
                    .ok_or(SchedulerError::IndexOutOfRange {
                        index,
                        catalog_size: catalog.len(),
                    })
            })
            .collect()
    }
}

/// A `Scheduler` decides which mutators a campaign will apply, and in what order.
///
/// Schedulers only choose catalog indices; applying the mutators is the job of
/// the [`InputGenerator`](crate::generator::InputGenerator).
pub trait Scheduler: Send + Sync {
    /// Draws a plan of `count` catalog indices.
    ///
    /// # Arguments
    /// * `catalog_size`: Number of mutators in the catalog. Must be non-zero.
    /// * `count`: Number of entries to draw.
    /// * `rng`: Random source for the draws.
    ///
    /// # Returns
    /// The plan, or `SchedulerError::CatalogEmpty` when `catalog_size` is zero.
    fn plan(
        &mut self,
        catalog_size: usize,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<MutationPlan, SchedulerError>;
}

/// Draws every plan entry independently and uniformly from the catalog.
#[derive(Default, Debug)]
pub struct RandomScheduler;

impl RandomScheduler {
    /// Creates a new `RandomScheduler`.
    pub fn new() -> Self {
        RandomScheduler
    }
}

impl Scheduler for RandomScheduler {
    fn plan(
        &mut self,
        catalog_size: usize,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<MutationPlan, SchedulerError> {
        if catalog_size == 0 {
            return Err(SchedulerError::CatalogEmpty);
        }
        let indices = (0..count)
            .map(|_| rng.random_range(0..catalog_size))
            .collect();
        Ok(MutationPlan { indices })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn random_scheduler_rejects_empty_catalog() {
        let mut scheduler = RandomScheduler::new();
        let mut rng = ChaCha8Rng::from_seed([0; 32]);

        assert_eq!(
            scheduler.plan(0, 10, &mut rng),
            Err(SchedulerError::CatalogEmpty)
        );
    }

    #[test]
    fn random_scheduler_draws_requested_count_in_range() {
        let mut scheduler = RandomScheduler::new();
        let mut rng = ChaCha8Rng::from_seed([1; 32]);

        let plan = scheduler
            .plan(3, 1000, &mut rng)
            .expect("Planning over a non-empty catalog should succeed");
        assert_eq!(plan.len(), 1000);
        assert!(plan.indices().iter().all(|&i| i < 3));

        let distinct: HashSet<usize> = plan.indices().iter().copied().collect();
        assert_eq!(
            distinct.len(),
            3,
            "Every mutator should be drawn over 1000 selections, got {distinct:?}"
        );
    }

    #[test]
    fn random_scheduler_allows_repeats() {
        let mut scheduler = RandomScheduler::new();
        let mut rng = ChaCha8Rng::from_seed([2; 32]);

        let plan = scheduler.plan(2, 10, &mut rng).unwrap();
        let distinct: HashSet<usize> = plan.indices().iter().copied().collect();
        assert!(distinct.len() < plan.len());
    }

    #[test]
    fn random_scheduler_zero_count_is_empty_plan() {
        let mut scheduler = RandomScheduler::new();
        let mut rng = ChaCha8Rng::from_seed([3; 32]);

        let plan = scheduler.plan(4, 0, &mut rng).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn random_scheduler_is_deterministic_for_a_fixed_seed() {
        let mut scheduler = RandomScheduler::new();
        let mut rng_a = ChaCha8Rng::from_seed([9; 32]);
        let mut rng_b = ChaCha8Rng::from_seed([9; 32]);

        assert_eq!(
            scheduler.plan(4, 64, &mut rng_a).unwrap(),
            scheduler.plan(4, 64, &mut rng_b).unwrap()
        );
    }

    #[test]
    fn plan_resolves_against_catalog() {
        let catalog = MutatorCatalog::standard(20, false);
        let plan = MutationPlan::from_indices(vec![1, 0, 2, 1]);

        assert_eq!(
            plan.resolve(&catalog).unwrap(),
            vec![
                MutatorKind::DeleteCharacter,
                MutatorKind::InsertBracket,
                MutatorKind::InsertRandomString { max_len: 20 },
                MutatorKind::DeleteCharacter,
            ]
        );
    }

    #[test]
    fn plan_with_unknown_index_fails_to_resolve() {
        let catalog = MutatorCatalog::standard(20, false);
        let plan = MutationPlan::from_indices(vec![1, 0, 7, 1]);

        assert_eq!(
            plan.resolve(&catalog),
            Err(SchedulerError::IndexOutOfRange {
                index: 7,
                catalog_size: 3,
            })
        );
    }
}
