//! Star type labels produced by the classifier.
//!
//! The integer codes emitted by the classifier are mapped to names here and
//! nowhere else. Code order follows the `Star type` column of the training
//! data: dwarfs first, ordered by increasing size, then the giants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of distinct star types the classifier can emit.
pub const STAR_TYPE_COUNT: usize = 6;

/// Closed set of star types with their fixed classifier codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StarType {
    /// Code 0: substellar objects, absolute magnitude above ~16
    #[serde(rename = "Brown Dwarf")]
    BrownDwarf,

    /// Code 1: cool, faint M-type main sequence stars
    #[serde(rename = "Red Dwarf")]
    RedDwarf,

    /// Code 2: hot, compact stellar remnants
    #[serde(rename = "White Dwarf")]
    WhiteDwarf,

    /// Code 3: core hydrogen burning stars such as the Sun
    #[serde(rename = "Main Sequence")]
    MainSequence,

    /// Code 4: evolved massive stars
    Supergiant,

    /// Code 5: the most luminous and largest evolved stars
    Hypergiant,
}

impl StarType {
    /// All star types in code order.
    pub const ALL: [StarType; STAR_TYPE_COUNT] = [
        StarType::BrownDwarf,
        StarType::RedDwarf,
        StarType::WhiteDwarf,
        StarType::MainSequence,
        StarType::Supergiant,
        StarType::Hypergiant,
    ];

    /// Map a classifier code to its star type.
    ///
    /// Returns None for codes outside `0..STAR_TYPE_COUNT`.
    pub fn from_code(code: usize) -> Option<Self> {
        Self::ALL.get(code).copied()
    }

    /// Classifier code of this star type.
    pub fn code(self) -> usize {
        self as usize
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            StarType::BrownDwarf => "Brown Dwarf",
            StarType::RedDwarf => "Red Dwarf",
            StarType::WhiteDwarf => "White Dwarf",
            StarType::MainSequence => "Main Sequence",
            StarType::Supergiant => "Supergiant",
            StarType::Hypergiant => "Hypergiant",
        }
    }
}

impl fmt::Display for StarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StarType {
    type Err = String;

    /// Parse a star type name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown star type: {wanted}"))
    }
}
