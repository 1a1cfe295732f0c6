use crate::mutator::{Mutation, Mutator, MutatorCatalog, MutatorKind};
use crate::scheduler::{MutationPlan, SchedulerError};
use rand::Rng;
use serde::Serialize;

/// One payload submitted to the target.
///
/// The baseline candidate is the seed itself; every other candidate is the seed
/// after exactly one mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub input: String,
    /// Mutator that produced this candidate, `None` for the baseline.
    pub mutator: Option<MutatorKind>,
    /// Edit that was applied. `None` for the baseline, and for a mutator that
    /// had nothing to change (deleting from an empty seed).
    pub mutation: Option<Mutation>,
}

impl Candidate {
    pub fn baseline(seed: &str) -> Self {
        Self {
            input: seed.to_string(),
            mutator: None,
            mutation: None,
        }
    }

    /// Builds a candidate by applying a known mutation to `seed`.
    pub fn from_mutation(seed: &str, mutator: MutatorKind, mutation: Mutation) -> Self {
        Self {
            input: mutation.apply(seed),
            mutator: Some(mutator),
            mutation: Some(mutation),
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.mutator.is_none()
    }
}

/// Turns a seed and a mutation plan into candidates.
///
/// Each plan entry is applied to the original seed, never to the output of a
/// previous entry, so every candidate differs from the seed by one edit.
pub struct InputGenerator<'c> {
    catalog: &'c MutatorCatalog,
}

impl<'c> InputGenerator<'c> {
    pub fn new(catalog: &'c MutatorCatalog) -> Self {
        Self { catalog }
    }

    /// One mutated candidate per plan entry, in plan order.
    ///
    /// Fails without generating anything if the plan names a mutator the
    /// catalog does not have.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        seed: &str,
        plan: &MutationPlan,
        rng: &mut R,
    ) -> Result<Vec<Candidate>, SchedulerError> {
        let kinds = plan.resolve(self.catalog)?;
        Ok(kinds
            .into_iter()
            .map(|kind| match kind.choose(seed, rng) {
                Some(mutation) => Candidate::from_mutation(seed, kind, mutation),
                None => Candidate {
                    input: seed.to_string(),
                    mutator: Some(kind),
                    mutation: None,
                },
            })
            .collect())
    }

    /// The full campaign input list: the verbatim seed first, then [`Self::generate`].
    pub fn candidates_with_baseline<R: Rng + ?Sized>(
        &self,
        seed: &str,
        plan: &MutationPlan,
        rng: &mut R,
    ) -> Result<Vec<Candidate>, SchedulerError> {
        let mut candidates = Vec::with_capacity(plan.len() + 1);
        candidates.push(Candidate::baseline(seed));
        candidates.extend(self.generate(seed, plan, rng)?);
        Ok(candidates)
    }
}
