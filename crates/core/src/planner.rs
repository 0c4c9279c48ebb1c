//! Batch planning over the pending subset of the working set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::format::{detect, Operation};
use crate::input::InputFile;

/// How the operations offered for "convert all" are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Every operation at least one pending file allows.
    #[default]
    Union,
    /// Only operations every recognized pending file allows.
    Intersection,
}

/// Operations offered for a batch over `pending`.
///
/// Empty unless more than one file is pending. Files whose format cannot be
/// detected contribute nothing under either policy.
pub fn common_operations<'a, I>(pending: I, policy: BatchPolicy) -> BTreeSet<Operation>
where
    I: IntoIterator<Item = &'a InputFile>,
{
    let files: Vec<&InputFile> = pending.into_iter().collect();
    if files.len() < 2 {
        return BTreeSet::new();
    }

    let mut allowed = files.iter().filter_map(|file| detect(file)).map(|format| {
        format
            .descriptor()
            .allowed_operations
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
    });

    match policy {
        BatchPolicy::Union => allowed.flatten().collect(),
        BatchPolicy::Intersection => {
            let Some(first) = allowed.next() else {
                return BTreeSet::new();
            };
            allowed.fold(first, |acc, ops| acc.intersection(&ops).copied().collect())
        }
    }
}

/// Whether a batch for `operation` would convert `file`.
pub fn is_eligible(file: &InputFile, operation: Operation) -> bool {
    detect(file).is_some_and(|format| format.descriptor().allows(operation))
}
