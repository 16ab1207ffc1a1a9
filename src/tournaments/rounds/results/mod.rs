//! Debate results.
//!
//! A result is built for a single ballot (one submission of a debate's
//! outcome) and buffers everything that submission records: which team is
//! on which side, who gave each speech, and the scores. The kind of result
//! depends on how the tournament collects ballots:
//!
//! - [`VotingDebateResult`] when every adjudicator submits their own
//!   scoresheet and the debate is decided by majority,
//! - [`ConsensusDebateResult`] when the panel submits one scoresheet,
//! - [`ForfeitDebateResult`] when one team forfeited.
//!
//! Loading always happens in three steps: `init_blank_buffer`, then the
//! rows are read in (for a single ballot or for many at once, see
//! [`prefetch`]), then `assert_loaded` checks the buffers have the shape the
//! tournament configuration says they should.
//!
//! Saving writes team and speaker score rows with upserts, but does not
//! open a transaction of its own; see [`crate::state::save_atomically`].

use std::slice;

use diesel::{connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::tournaments::{
    Tournament,
    config::BallotsPerDebate,
    rounds::{Side, ballots::Ballot},
    teams::Team,
};

pub mod consensus;
pub mod display;
pub mod error;
pub mod forfeit;
pub mod prefetch;
pub mod records;
pub mod scoresheet;
pub mod speakers;
pub mod teams;
pub mod voting;

pub use consensus::ConsensusDebateResult;
pub use error::ResultError;
pub use forfeit::ForfeitDebateResult;
pub use voting::VotingDebateResult;

use display::SheetBreakdown;
use prefetch::{DebateRows, Needs, ResultRows};
use records::{FieldValue, TeamScoreField, forfeiters_of_ballots};

/// How far along a result is, for showing next to a debate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Something still has to be filled in.
    Missing,
    /// Everything is filled in but the result contradicts itself, for
    /// example a scoresheet with tied totals or a speak out of range.
    Erroneous,
    Valid,
}

/// The behaviour every kind of result shares.
pub trait ResultBuffer {
    fn ballot(&self) -> &Ballot;

    /// The rows this kind of result is loaded from.
    fn needs(&self) -> Needs;

    /// Resets every buffer to the configured sides and positions, with
    /// nothing filled in.
    fn init_blank_buffer(&mut self);

    fn load_from_rows(&mut self, rows: &DebateRows<'_>) -> Result<(), ResultError>;

    /// Checks the buffers are keyed by exactly the configured sides (and
    /// positions, and adjudicators, where those apply).
    fn assert_loaded(&self) -> Result<(), ResultError>;

    /// Whether everything has been filled in. A malformed result is logged
    /// and reported as incomplete.
    fn is_complete(&self) -> bool;

    fn is_valid(&self) -> bool;

    fn identical(&self, other: &Self) -> bool;

    /// The value of a team score column for the team on `side`, or `None`
    /// if this kind of result does not set that column.
    fn team_score_field(
        &self,
        field: TeamScoreField,
        side: Side,
    ) -> Result<Option<FieldValue>, ResultError>;

    /// Writes the result. Fails without writing anything if the result is
    /// not valid.
    fn save(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError>;

    fn load_from_db(
        &mut self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        let ballot = self.ballot().clone();
        let rows = ResultRows::fetch(slice::from_ref(&ballot), self.needs(), conn)?;
        self.load_from_rows(&rows.for_ballot(&ballot))
    }

    fn full_load(
        &mut self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        self.init_blank_buffer();
        self.load_from_db(conn)?;
        self.assert_loaded()
    }

    fn status(&self) -> ResultStatus {
        if !self.is_complete() {
            ResultStatus::Missing
        } else if !self.is_valid() {
            ResultStatus::Erroneous
        } else {
            ResultStatus::Valid
        }
    }
}

/// The mean of the values, or `None` if there are none, any is missing or
/// the sum overflows.
pub(crate) fn mean(
    values: impl IntoIterator<Item = Option<Decimal>>,
) -> Option<Decimal> {
    let values = values.into_iter().collect::<Option<Vec<_>>>()?;
    if values.is_empty() {
        return None;
    }
    values
        .iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(*value))?
        .checked_div(Decimal::from(values.len()))
}

#[derive(Clone, Debug)]
pub enum DebateResult {
    Voting(VotingDebateResult),
    Consensus(ConsensusDebateResult),
    Forfeit(ForfeitDebateResult),
}

impl DebateResult {
    /// An unloaded result of the kind the tournament's ballot setting calls
    /// for.
    pub fn new(
        ballot: Ballot,
        tournament: &Tournament,
    ) -> Result<Self, ResultError> {
        Ok(match tournament.ballots_per_debate()? {
            BallotsPerDebate::PerAdjudicator => DebateResult::Voting(
                VotingDebateResult::new(ballot, tournament.clone()),
            ),
            BallotsPerDebate::PerDebate => DebateResult::Consensus(
                ConsensusDebateResult::new(ballot, tournament.clone()),
            ),
        })
    }

    /// Like [`DebateResult::new`], except that a ballot which was saved as a
    /// forfeit by `forfeiter` comes back as a [`ForfeitDebateResult`].
    pub fn from_stored(
        ballot: Ballot,
        tournament: &Tournament,
        forfeiter: Option<Side>,
    ) -> Result<Self, ResultError> {
        match forfeiter {
            Some(side) => Ok(DebateResult::Forfeit(ForfeitDebateResult::new(
                ballot, tournament, side,
            )?)),
            None => DebateResult::new(ballot, tournament),
        }
    }

    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        ballot_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Self, ResultError> {
        let ballot = Ballot::fetch(ballot_id, &mut *conn)?;
        debate_result(ballot, None, true, conn)
    }

    pub fn is_voting(&self) -> bool {
        matches!(self, DebateResult::Voting(_))
    }

    pub fn has_speakers(&self) -> bool {
        !matches!(self, DebateResult::Forfeit(_))
    }

    pub fn as_voting(&self) -> Option<&VotingDebateResult> {
        match self {
            DebateResult::Voting(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_voting_mut(&mut self) -> Option<&mut VotingDebateResult> {
        match self {
            DebateResult::Voting(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_consensus(&self) -> Option<&ConsensusDebateResult> {
        match self {
            DebateResult::Consensus(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_consensus_mut(&mut self) -> Option<&mut ConsensusDebateResult> {
        match self {
            DebateResult::Consensus(result) => Some(result),
            _ => None,
        }
    }

    pub fn as_forfeit(&self) -> Option<&ForfeitDebateResult> {
        match self {
            DebateResult::Forfeit(result) => Some(result),
            _ => None,
        }
    }

    pub fn set_sides(
        &mut self,
        teams: &[Team],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        match self {
            DebateResult::Voting(result) => result.set_sides(teams, conn),
            DebateResult::Consensus(result) => result.set_sides(teams, conn),
            DebateResult::Forfeit(result) => result.set_sides(teams, conn),
        }
    }

    pub fn winning_side(&self) -> Result<Option<Side>, ResultError> {
        match self {
            DebateResult::Voting(result) => result.winning_side(),
            DebateResult::Consensus(result) => Ok(result.winning_side()),
            DebateResult::Forfeit(result) => Ok(result.winning_side()),
        }
    }

    pub fn winning_team(&self) -> Result<Option<&Team>, ResultError> {
        match self {
            DebateResult::Voting(result) => result.winning_team(),
            DebateResult::Consensus(result) => Ok(result.winning_team()),
            DebateResult::Forfeit(result) => Ok(result.winning_team()),
        }
    }

    pub fn breakdown(&self) -> Vec<SheetBreakdown> {
        match self {
            DebateResult::Voting(result) => result.breakdown(),
            DebateResult::Consensus(result) => result.breakdown(),
            DebateResult::Forfeit(result) => result.breakdown(),
        }
    }
}

impl ResultBuffer for DebateResult {
    fn ballot(&self) -> &Ballot {
        match self {
            DebateResult::Voting(result) => result.ballot(),
            DebateResult::Consensus(result) => result.ballot(),
            DebateResult::Forfeit(result) => result.ballot(),
        }
    }

    fn needs(&self) -> Needs {
        match self {
            DebateResult::Voting(result) => result.needs(),
            DebateResult::Consensus(result) => result.needs(),
            DebateResult::Forfeit(result) => result.needs(),
        }
    }

    fn init_blank_buffer(&mut self) {
        match self {
            DebateResult::Voting(result) => result.init_blank_buffer(),
            DebateResult::Consensus(result) => result.init_blank_buffer(),
            DebateResult::Forfeit(result) => result.init_blank_buffer(),
        }
    }

    fn load_from_rows(&mut self, rows: &DebateRows<'_>) -> Result<(), ResultError> {
        match self {
            DebateResult::Voting(result) => result.load_from_rows(rows),
            DebateResult::Consensus(result) => result.load_from_rows(rows),
            DebateResult::Forfeit(result) => result.load_from_rows(rows),
        }
    }

    fn assert_loaded(&self) -> Result<(), ResultError> {
        match self {
            DebateResult::Voting(result) => result.assert_loaded(),
            DebateResult::Consensus(result) => result.assert_loaded(),
            DebateResult::Forfeit(result) => result.assert_loaded(),
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            DebateResult::Voting(result) => result.is_complete(),
            DebateResult::Consensus(result) => result.is_complete(),
            DebateResult::Forfeit(result) => result.is_complete(),
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            DebateResult::Voting(result) => result.is_valid(),
            DebateResult::Consensus(result) => result.is_valid(),
            DebateResult::Forfeit(result) => result.is_valid(),
        }
    }

    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (DebateResult::Voting(a), DebateResult::Voting(b)) => a.identical(b),
            (DebateResult::Consensus(a), DebateResult::Consensus(b)) => {
                a.identical(b)
            }
            (DebateResult::Forfeit(a), DebateResult::Forfeit(b)) => a.identical(b),
            _ => false,
        }
    }

    fn team_score_field(
        &self,
        field: TeamScoreField,
        side: Side,
    ) -> Result<Option<FieldValue>, ResultError> {
        match self {
            DebateResult::Voting(result) => result.team_score_field(field, side),
            DebateResult::Consensus(result) => result.team_score_field(field, side),
            DebateResult::Forfeit(result) => result.team_score_field(field, side),
        }
    }

    fn save(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        match self {
            DebateResult::Voting(result) => result.save(conn),
            DebateResult::Consensus(result) => result.save(conn),
            DebateResult::Forfeit(result) => result.save(conn),
        }
    }
}

/// Builds the result of a ballot, of the kind the tournament's ballot
/// setting calls for, or a forfeit if the ballot was saved as one. Pass the
/// tournament if it has already been fetched. With `load` unset the result is
/// left unloaded, for bulk loading.
pub fn debate_result(
    ballot: Ballot,
    tournament: Option<&Tournament>,
    load: bool,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<DebateResult, ResultError> {
    let forfeiter = forfeiters_of_ballots(slice::from_ref(&ballot.id), &mut *conn)?
        .remove(&ballot.id);
    let mut result = match tournament {
        Some(tournament) => DebateResult::from_stored(ballot, tournament, forfeiter)?,
        None => {
            let tournament = Tournament::fetch(&ballot.tournament_id, &mut *conn)?;
            DebateResult::from_stored(ballot, &tournament, forfeiter)?
        }
    };
    if load {
        result.full_load(conn)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::sample_tournament, tournaments::config::ConfigurationError};

    fn ballot() -> Ballot {
        Ballot {
            id: "b".into(),
            tournament_id: "t".into(),
            debate_id: "d".into(),
            submitted_at: chrono::NaiveDateTime::default(),
            version: 0,
            confirmed: false,
        }
    }

    #[test]
    fn ballot_setting_picks_kind_of_result() {
        let voting = sample_tournament(3, true, "per-adjudicator");
        assert!(DebateResult::new(ballot(), &voting).unwrap().is_voting());

        let consensus = sample_tournament(3, true, "per-debate");
        let result = DebateResult::new(ballot(), &consensus).unwrap();
        assert!(result.as_consensus().is_some());
        assert!(result.has_speakers());
    }

    #[test]
    fn unknown_ballot_setting_is_a_configuration_error() {
        let tournament = sample_tournament(3, true, "per-speaker");
        assert!(matches!(
            DebateResult::new(ballot(), &tournament),
            Err(ResultError::Configuration(
                ConfigurationError::UnknownBallotsPerDebate(value)
            )) if value == "per-speaker"
        ));
    }

    #[test]
    fn unloaded_result_is_missing_not_malformed() {
        let tournament = sample_tournament(3, true, "per-debate");
        let mut result = DebateResult::new(ballot(), &tournament).unwrap();
        assert!(result.assert_loaded().is_err());
        assert!(!result.is_complete());
        assert_eq!(result.status(), ResultStatus::Missing);

        result.init_blank_buffer();
        result.assert_loaded().unwrap();
        assert_eq!(result.status(), ResultStatus::Missing);
    }

    #[test]
    fn mean_needs_every_value() {
        assert_eq!(
            mean([Some(Decimal::from(70)), Some(Decimal::from(75))]),
            Some(Decimal::new(725, 1))
        );
        assert_eq!(mean([Some(Decimal::from(70)), None]), None);
        assert_eq!(mean([]), None);
    }

    #[test]
    fn mean_of_values_too_large_to_sum_is_none() {
        assert_eq!(mean([Some(Decimal::MAX), Some(Decimal::MAX)]), None);
    }
}
