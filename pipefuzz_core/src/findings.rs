use crate::generator::Candidate;
use crate::mutator::{Mutation, MutatorKind};
use crate::oracle::CrashReport;
use serde::Serialize;
use std::collections::HashMap;

/// One distinct crash signature and the first input that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Captured output of the crashing run; unique within a [`FindingSet`].
    pub output: String,
    /// Input that reproduces the crash.
    pub input: String,
    pub exit_code: i32,
    pub input_hash: String,
    /// Position of the input in the campaign, `0` being the unmutated seed.
    pub candidate_index: usize,
    pub mutator: Option<MutatorKind>,
    pub mutation: Option<Mutation>,
}

impl Finding {
    pub fn new(report: CrashReport<String>, candidate_index: usize, candidate: &Candidate) -> Self {
        Self {
            output: report.output,
            input: report.input,
            exit_code: report.exit_code,
            input_hash: report.input_hash,
            candidate_index,
            mutator: candidate.mutator,
            mutation: candidate.mutation.clone(),
        }
    }
}

/// Crash findings deduplicated by output text.
///
/// Insertion is first-write-wins: once an output has been seen, later inputs
/// producing the same output are dropped. Iteration follows insertion order.
#[derive(Debug, Default)]
pub struct FindingSet {
    findings: Vec<Finding>,
    by_output: HashMap<String, usize>,
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `finding` unless its output is already known.
    ///
    /// Returns `true` if the finding was new.
    pub fn insert(&mut self, finding: Finding) -> bool {
        if self.by_output.contains_key(&finding.output) {
            return false;
        }
        self.by_output
            .insert(finding.output.clone(), self.findings.len());
        self.findings.push(finding);
        true
    }

    pub fn contains_output(&self, output: &str) -> bool {
        self.by_output.contains_key(output)
    }

    pub fn get(&self, output: &str) -> Option<&Finding> {
        self.by_output.get(output).map(|&i| &self.findings[i])
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.findings
    }
}
