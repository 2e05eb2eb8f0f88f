//! Ordered bucket keys: vulnerability severity and policy violation state.
//!
//! Both enums implement [`Bucket`], which lets distributions and threshold
//! tables be written once and instantiated per key type.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// A key of a per-build distribution.
pub trait Bucket: Copy + Ord + Hash + fmt::Debug + fmt::Display + 'static {
    /// Every bucket, lowest rank first.
    const ALL: &'static [Self];
    /// Buckets that thresholds are evaluated for, most severe first.
    const GATED: &'static [Self];
    /// Kind label used in rule names and overrides (`findings` / `violations`).
    const KIND: &'static str;

    /// Lowercase name used in config keys and output.
    fn name(self) -> &'static str;

    /// Lenient parse; unknown or empty input lands in the unassigned bucket.
    fn parse_lenient(s: &str) -> Self;

    /// Strict lookup by config key name.
    fn from_name(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.name().eq_ignore_ascii_case(s.trim()))
    }
}

/// Accepts any string (case-insensitive) and maps null/unknown input to the
/// unassigned bucket, mirroring how the analysis server reports gaps.
struct LenientVisitor<B>(PhantomData<B>);

impl<'de, B: Bucket> Visitor<'de> for LenientVisitor<B> {
    type Value = B;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a {} level name", B::KIND)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<B, E> {
        Ok(B::parse_lenient(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<B, E> {
        Ok(B::parse_lenient(""))
    }

    fn visit_none<E: de::Error>(self) -> Result<B, E> {
        Ok(B::parse_lenient(""))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
/// Danger ranking of a vulnerability finding.
pub enum Severity {
    #[default]
    Unassigned,
    Low,
    Medium,
    High,
    Critical,
}

impl Bucket for Severity {
    const ALL: &'static [Self] = &[
        Severity::Unassigned,
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];
    const GATED: &'static [Self] = &[
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Unassigned,
    ];
    const KIND: &'static str = "findings";

    fn name(self) -> &'static str {
        match self {
            Severity::Unassigned => "unassigned",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    fn parse_lenient(s: &str) -> Self {
        Self::from_name(s).unwrap_or(Severity::Unassigned)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(LenientVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
/// Policy violation ranking. `Unassigned` collects values that fail to parse.
pub enum ViolationState {
    #[default]
    Unassigned,
    Info,
    Warn,
    Fail,
}

impl Bucket for ViolationState {
    const ALL: &'static [Self] = &[
        ViolationState::Unassigned,
        ViolationState::Info,
        ViolationState::Warn,
        ViolationState::Fail,
    ];
    const GATED: &'static [Self] = &[
        ViolationState::Fail,
        ViolationState::Warn,
        ViolationState::Info,
    ];
    const KIND: &'static str = "violations";

    fn name(self) -> &'static str {
        match self {
            ViolationState::Unassigned => "unassigned",
            ViolationState::Info => "info",
            ViolationState::Warn => "warn",
            ViolationState::Fail => "fail",
        }
    }

    fn parse_lenient(s: &str) -> Self {
        Self::from_name(s).unwrap_or(ViolationState::Unassigned)
    }
}

impl fmt::Display for ViolationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ViolationState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_any(LenientVisitor(PhantomData))
    }
}
