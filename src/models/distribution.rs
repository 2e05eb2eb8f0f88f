//! Per-build histograms of findings by severity and violations by state.

use super::level::{Bucket, Severity, ViolationState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "K: Serialize",
    deserialize = "K: Deserialize<'de> + Bucket"
))]
/// Counter bucketing items of one build by `K`.
///
/// The build number identifies the distribution in history and trend output
/// but takes no part in equality.
pub struct Distribution<K: Bucket> {
    pub build_number: u32,
    #[serde(default)]
    counts: BTreeMap<K, u32>,
}

/// Findings of one build by severity.
pub type SeverityDistribution = Distribution<Severity>;
/// Policy violations of one build by state.
pub type ViolationDistribution = Distribution<ViolationState>;

impl<K: Bucket> Distribution<K> {
    pub fn new(build_number: u32) -> Self {
        Self {
            build_number,
            counts: BTreeMap::new(),
        }
    }

    /// Fold one `add` per observed level.
    pub fn from_levels<I>(build_number: u32, levels: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let mut dist = Self::new(build_number);
        for level in levels {
            dist.add(level);
        }
        dist
    }

    pub fn add(&mut self, level: K) {
        let slot = self.counts.entry(level).or_insert(0);
        *slot = slot.saturating_add(1);
    }

    pub fn get(&self, level: K) -> u32 {
        self.counts.get(&level).copied().unwrap_or(0)
    }

    /// Sum across every bucket.
    pub fn total(&self) -> u32 {
        K::ALL
            .iter()
            .fold(0u32, |acc, k| acc.saturating_add(self.get(*k)))
    }

    /// Counts for every bucket, lowest rank first, zeros included.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (K, u32)> + '_ {
        K::ALL.iter().map(move |k| (*k, self.get(*k)))
    }
}

impl<K: Bucket> PartialEq for Distribution<K> {
    fn eq(&self, other: &Self) -> bool {
        K::ALL.iter().all(|k| self.get(*k) == other.get(*k))
    }
}

impl<K: Bucket> Eq for Distribution<K> {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Severity and violation distributions of one build under one filtering mode.
pub struct Snapshot {
    pub findings: SeverityDistribution,
    pub violations: ViolationDistribution,
}

impl Snapshot {
    /// All-zero snapshot, used when no qualifying previous build exists.
    pub fn empty(build_number: u32) -> Self {
        Self {
            findings: Distribution::new(build_number),
            violations: Distribution::new(build_number),
        }
    }

    pub fn build_number(&self) -> u32 {
        self.findings.build_number
    }
}
