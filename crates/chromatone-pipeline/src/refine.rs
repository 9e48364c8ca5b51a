//! Refinement: filter each region's weighted notes down to what should
//! actually be played.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::note::Note;

/// Selects how weighted notes are filtered into the final note lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefineMethod {
    /// Drop notes below a weight floor and cap the count per region.
    #[default]
    Trim,
}

impl RefineMethod {
    /// The wire/CLI name of this method.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Trim => "trim",
        }
    }
}

impl fmt::Display for RefineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RefineMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trim" => Ok(Self::Trim),
            other => Err(format!("unknown refine method: {other}")),
        }
    }
}

/// Refine one weighted note list per region into one plain note list per
/// region. Region count and order are preserved 1:1.
#[must_use]
pub fn refine(
    weighted: &[Vec<(Note, f64)>],
    method: RefineMethod,
    min_weight: f64,
    max_notes: usize,
) -> Vec<Vec<Note>> {
    match method {
        RefineMethod::Trim => trim(weighted, min_weight, max_notes),
    }
}

/// Drop notes lighter than `min_weight`, order the rest by descending
/// weight, and keep at most `max_notes` per region.
#[must_use]
pub fn trim(weighted: &[Vec<(Note, f64)>], min_weight: f64, max_notes: usize) -> Vec<Vec<Note>> {
    weighted
        .iter()
        .map(|notes| {
            let mut kept: Vec<(Note, f64)> = notes
                .iter()
                .copied()
                .filter(|&(_, w)| w >= min_weight)
                .collect();
            // Stable sort keeps the incoming order among equal weights.
            kept.sort_by(|a, b| b.1.total_cmp(&a.1));
            kept.into_iter()
                .take(max_notes)
                .map(|(note, _)| note)
                .collect()
        })
        .collect()
}
