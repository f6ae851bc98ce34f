//! Funding stages and per-stage value tables

use std::fmt;

use serde::{Deserialize, Serialize};

/// A funding stage in the modelled lifecycle.
///
/// Stages are ordered: Pre-Seed → Seed → Series A → Series B → Series C → IPO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreSeed,
    Seed,
    SeriesA,
    SeriesB,
    SeriesC,
    Ipo,
}

impl Stage {
    /// All stages in lifecycle order
    pub const ALL: [Stage; 6] = [
        Stage::PreSeed,
        Stage::Seed,
        Stage::SeriesA,
        Stage::SeriesB,
        Stage::SeriesC,
        Stage::Ipo,
    ];

    /// The stage reached by the next funding round, if any
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::PreSeed => Some(Stage::Seed),
            Stage::Seed => Some(Stage::SeriesA),
            Stage::SeriesA => Some(Stage::SeriesB),
            Stage::SeriesB => Some(Stage::SeriesC),
            Stage::SeriesC => Some(Stage::Ipo),
            Stage::Ipo => None,
        }
    }

    /// True for the last modelled stage
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Position in lifecycle order (Pre-Seed = 0)
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Stage::PreSeed => "Pre-Seed",
            Stage::Seed => "Seed",
            Stage::SeriesA => "Series A",
            Stage::SeriesB => "Series B",
            Stage::SeriesC => "Series C",
            Stage::Ipo => "IPO",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Stage::PreSeed => "pre_seed",
            Stage::Seed => "seed",
            Stage::SeriesA => "series_a",
            Stage::SeriesB => "series_b",
            Stage::SeriesC => "series_c",
            Stage::Ipo => "ipo",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per stage, Pre-Seed through IPO.
///
/// Used for attributes that belong to the stage itself (loss probability,
/// exit valuation range).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageValues<T> {
    pub pre_seed: T,
    pub seed: T,
    pub series_a: T,
    pub series_b: T,
    pub series_c: T,
    pub ipo: T,
}

impl<T> StageValues<T> {
    pub fn get(&self, stage: Stage) -> &T {
        match stage {
            Stage::PreSeed => &self.pre_seed,
            Stage::Seed => &self.seed,
            Stage::SeriesA => &self.series_a,
            Stage::SeriesB => &self.series_b,
            Stage::SeriesC => &self.series_c,
            Stage::Ipo => &self.ipo,
        }
    }

    pub fn get_mut(&mut self, stage: Stage) -> &mut T {
        match stage {
            Stage::PreSeed => &mut self.pre_seed,
            Stage::Seed => &mut self.seed,
            Stage::SeriesA => &mut self.series_a,
            Stage::SeriesB => &mut self.series_b,
            Stage::SeriesC => &mut self.series_c,
            Stage::Ipo => &mut self.ipo,
        }
    }

    /// Iterate `(stage, value)` pairs in lifecycle order
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &T)> {
        Stage::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    /// Apply `f` to every value in place
    pub fn for_each_mut(&mut self, mut f: impl FnMut(Stage, &mut T)) {
        for stage in Stage::ALL {
            f(stage, self.get_mut(stage));
        }
    }

    /// Field path used in validation messages, e.g. `stages.series_a`
    pub(crate) fn field_name(stage: Stage) -> String {
        format!("stages.{}", stage.key())
    }
}

impl<T: Clone> StageValues<T> {
    /// The same value at every stage
    pub fn uniform(value: T) -> Self {
        Self {
            pre_seed: value.clone(),
            seed: value.clone(),
            series_a: value.clone(),
            series_b: value.clone(),
            series_c: value.clone(),
            ipo: value,
        }
    }
}

/// One value per funding round, keyed by the stage the round leads into.
///
/// There is no round into Pre-Seed, so lookups for it return `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundValues<T> {
    pub seed: T,
    pub series_a: T,
    pub series_b: T,
    pub series_c: T,
    pub ipo: T,
}

impl<T> RoundValues<T> {
    /// The round leading into `to`
    pub fn get(&self, to: Stage) -> Option<&T> {
        match to {
            Stage::PreSeed => None,
            Stage::Seed => Some(&self.seed),
            Stage::SeriesA => Some(&self.series_a),
            Stage::SeriesB => Some(&self.series_b),
            Stage::SeriesC => Some(&self.series_c),
            Stage::Ipo => Some(&self.ipo),
        }
    }

    pub fn get_mut(&mut self, to: Stage) -> Option<&mut T> {
        match to {
            Stage::PreSeed => None,
            Stage::Seed => Some(&mut self.seed),
            Stage::SeriesA => Some(&mut self.series_a),
            Stage::SeriesB => Some(&mut self.series_b),
            Stage::SeriesC => Some(&mut self.series_c),
            Stage::Ipo => Some(&mut self.ipo),
        }
    }

    /// Iterate `(destination stage, value)` pairs in lifecycle order
    pub fn iter(&self) -> impl Iterator<Item = (Stage, &T)> {
        Stage::ALL
            .into_iter()
            .filter_map(move |s| self.get(s).map(|v| (s, v)))
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(Stage, &mut T)) {
        for stage in Stage::ALL {
            if let Some(v) = self.get_mut(stage) {
                f(stage, v);
            }
        }
    }

    pub(crate) fn field_name(to: Stage) -> String {
        format!("rounds.{}", to.key())
    }
}

impl<T: Clone> RoundValues<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            seed: value.clone(),
            series_a: value.clone(),
            series_b: value.clone(),
            series_c: value.clone(),
            ipo: value,
        }
    }
}
