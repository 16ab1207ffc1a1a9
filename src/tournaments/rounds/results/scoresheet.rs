//! A scoresheet holds the marks of one adjudicator (or of the whole panel,
//! when ballots are entered per debate) for every speaker position of every
//! side.
//!
//! The winner of a scoresheet is the side with the strictly highest total,
//! and a scoresheet without a winner is not valid: low-point wins and
//! declared winners are not supported.

use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::tournaments::{
    Tournament,
    rounds::{Side, results::ResultError},
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpeakRange {
    pub min: f32,
    pub max: f32,
}

impl SpeakRange {
    fn of(min: Option<f32>, max: Option<f32>) -> Option<Self> {
        match (min, max) {
            (None, None) => None,
            (min, max) => Some(SpeakRange {
                min: min.unwrap_or(f32::NEG_INFINITY),
                max: max.unwrap_or(f32::INFINITY),
            }),
        }
    }

    fn contains(&self, score: f32) -> bool {
        self.min <= score && score <= self.max
    }
}

/// The speaks a scoresheet accepts. Unbounded unless the tournament sets a
/// range.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreBounds {
    pub substantive: Option<SpeakRange>,
    pub reply: Option<SpeakRange>,
    pub reply_position: Option<i64>,
}

impl ScoreBounds {
    pub fn of_tournament(tournament: &Tournament) -> Self {
        ScoreBounds {
            substantive: SpeakRange::of(
                tournament.substantive_speech_min_speak,
                tournament.substantive_speech_max_speak,
            ),
            reply: SpeakRange::of(
                tournament.reply_speech_min_speak,
                tournament.reply_speech_max_speak,
            ),
            reply_position: tournament.reply_position(),
        }
    }

    pub fn permits(&self, position: i64, score: f32) -> bool {
        if !score.is_finite() {
            return false;
        }
        let range = if self.reply_position == Some(position) {
            &self.reply
        } else {
            &self.substantive
        };
        range.is_none_or(|range| range.contains(score))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Scoresheet {
    scores: IndexMap<Side, IndexMap<i64, Option<f32>>>,
    bounds: ScoreBounds,
}

impl Scoresheet {
    pub fn new(sides: &[Side], positions: &[i64]) -> Self {
        Scoresheet {
            scores: sides
                .iter()
                .map(|side| {
                    (*side, positions.iter().map(|pos| (*pos, None)).collect())
                })
                .collect(),
            bounds: ScoreBounds::default(),
        }
    }

    pub fn with_bounds(mut self, bounds: ScoreBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn get_score(&self, side: Side, position: i64) -> Option<f32> {
        self.scores
            .get(&side)
            .and_then(|scores| scores.get(&position))
            .copied()
            .flatten()
    }

    pub fn set_score(
        &mut self,
        side: Side,
        position: i64,
        score: Option<f32>,
    ) -> Result<(), ResultError> {
        let slot = self
            .scores
            .get_mut(&side)
            .ok_or(ResultError::UnknownSide(side))?
            .get_mut(&position)
            .ok_or(ResultError::UnknownPosition(position))?;
        *slot = score;
        Ok(())
    }

    /// The sum of the side's scores, or `None` if any of them is missing or
    /// the sum does not fit in a `Decimal`.
    pub fn get_total(&self, side: Side) -> Option<Decimal> {
        self.scores
            .get(&side)?
            .values()
            .try_fold(Decimal::ZERO, |total, score| {
                total.checked_add(score.and_then(Decimal::from_f32)?)
            })
    }

    /// The side with the highest total. `None` if the sheet is incomplete or
    /// the highest total is shared.
    pub fn winner(&self) -> Option<Side> {
        if !self.is_complete() {
            return None;
        }

        let mut best: Option<(Side, Decimal)> = None;
        let mut shared = false;
        for side in self.scores.keys() {
            let total = self.get_total(*side)?;
            match best {
                Some((_, top)) if total == top => shared = true,
                Some((_, top)) if total < top => {}
                _ => {
                    best = Some((*side, total));
                    shared = false;
                }
            }
        }

        match (best, shared) {
            (Some((side, _)), false) => Some(side),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.scores
            .values()
            .flat_map(|scores| scores.values())
            .all(Option::is_some)
    }

    /// Complete, every score is within the tournament's speak range, and the
    /// scoresheet has a winner.
    pub fn is_valid(&self) -> bool {
        if !self.is_complete() {
            return false;
        }

        let in_range = self.scores.values().all(|scores| {
            scores.iter().all(|(pos, score)| {
                score.is_some_and(|score| self.bounds.permits(*pos, score))
            })
        });

        in_range && self.winner().is_some()
    }

    pub fn identical(&self, other: &Scoresheet) -> bool {
        self.scores == other.scores
    }
}
