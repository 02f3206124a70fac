//! Static propagation table
//!
//! Maps a committed source index to the derived indices that republish the
//! same value. Rules are declarative configuration; the table is validated
//! against the database size once and is read-only afterwards.

use errors::{VoltageError, VoltageResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// One propagation rule: `source → [targets...]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationRule {
    /// Index written by the command
    pub source: u16,
    /// Derived indices, committed in this order
    #[serde(default)]
    pub targets: Vec<u16>,
    /// Commit the source index itself before the targets
    #[serde(default = "default_true")]
    pub commit_source: bool,
}

impl PropagationRule {
    pub fn new(source: u16, targets: impl Into<Vec<u16>>) -> Self {
        Self {
            source,
            targets: targets.into(),
            commit_source: true,
        }
    }

    /// Rule that publishes only its targets
    pub fn targets_only(source: u16, targets: impl Into<Vec<u16>>) -> Self {
        Self {
            commit_source: false,
            ..Self::new(source, targets)
        }
    }
}

/// Read-only propagation table keyed by source index
#[derive(Debug, Clone, Default)]
pub struct PropagationTable {
    rules: FxHashMap<u16, PropagationRule>,
}

impl PropagationTable {
    /// Build and validate the table
    ///
    /// # Errors
    /// * `PointIndexOutOfRange` - a source or target is `>= database_size`
    /// * `DuplicateRule` - two rules share a source index
    pub fn new<I>(rules: I, database_size: u16) -> VoltageResult<Self>
    where
        I: IntoIterator<Item = PropagationRule>,
    {
        let mut table = FxHashMap::default();

        for rule in rules {
            let out_of_range = std::iter::once(rule.source)
                .chain(rule.targets.iter().copied())
                .find(|&index| index >= database_size);
            if let Some(index) = out_of_range {
                return Err(VoltageError::PointIndexOutOfRange {
                    index,
                    size: database_size,
                });
            }

            let source = rule.source;
            if table.insert(source, rule).is_some() {
                return Err(VoltageError::DuplicateRule(source));
            }
        }

        Ok(Self { rules: table })
    }

    /// Table without any rule: every commit touches only its own index
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derived targets for `source`, in declared order (possibly empty)
    pub fn lookup(&self, source: u16) -> &[u16] {
        self.rules
            .get(&source)
            .map(|rule| rule.targets.as_slice())
            .unwrap_or(&[])
    }

    /// Get the full rule for `source`
    pub fn rule(&self, source: u16) -> Option<&PropagationRule> {
        self.rules.get(&source)
    }

    /// Ordered list of indices a command on `source` commits
    ///
    /// Without a rule this is just `[source]`. With a rule it is the source
    /// (unless the rule disables it) followed by every target.
    pub fn commit_plan(&self, source: u16) -> Vec<u16> {
        match self.rules.get(&source) {
            None => vec![source],
            Some(rule) => {
                let mut plan = Vec::with_capacity(rule.targets.len() + 1);
                if rule.commit_source {
                    plan.push(source);
                }
                plan.extend_from_slice(&rule.targets);
                plan
            },
        }
    }

    /// Iterate rules (unordered)
    pub fn rules(&self) -> impl Iterator<Item = &PropagationRule> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
