//! Rows of the score tables, and the writes a result performs when it is
//! saved. Every write is an upsert keyed on the natural key of the row, so
//! saving the same result twice leaves the tables unchanged.

use std::collections::HashMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    schema::{
        tournament_debate_teams, tournament_speaker_scores,
        tournament_speaker_scores_by_judge, tournament_team_scores,
    },
    tournaments::rounds::{Side, results::ResultError},
};

#[derive(Queryable, Serialize, Clone, Debug, PartialEq)]
pub struct SpeakerScore {
    pub id: String,
    pub ballot_id: String,
    pub debate_team_id: String,
    pub speaker_id: Option<String>,
    pub position: i64,
    pub score: Option<f32>,
    pub ghost: bool,
}

#[derive(Queryable, Serialize, Clone, Debug, PartialEq)]
pub struct SpeakerScoreByJudge {
    pub id: String,
    pub ballot_id: String,
    pub debate_team_id: String,
    pub debate_judge_id: String,
    pub position: i64,
    pub score: Option<f32>,
}

#[derive(Queryable, Serialize, Clone, Debug, PartialEq)]
pub struct TeamScore {
    pub id: String,
    pub ballot_id: String,
    pub debate_team_id: String,
    pub points: Option<i64>,
    pub win: Option<bool>,
    pub margin: Option<f32>,
    pub score: Option<f32>,
    pub votes_given: Option<i64>,
    pub votes_possible: Option<i64>,
    pub forfeit: bool,
}

/// The columns of a team score row that a result can fill in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TeamScoreField {
    Points,
    Win,
    Margin,
    Score,
    VotesGiven,
    VotesPossible,
    Forfeit,
}

impl TeamScoreField {
    pub const ALL: [TeamScoreField; 7] = [
        TeamScoreField::Points,
        TeamScoreField::Win,
        TeamScoreField::Margin,
        TeamScoreField::Score,
        TeamScoreField::VotesGiven,
        TeamScoreField::VotesPossible,
        TeamScoreField::Forfeit,
    ];
}

/// The value a result computes for one [`TeamScoreField`]. The inner `None`
/// is written as `NULL`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(Option<i64>),
    Boolean(Option<bool>),
    Decimal(Option<Decimal>),
}

/// The fields of a team score row to overwrite. Fields left as `None` keep
/// whatever is stored already (the column default, for new rows).
#[derive(AsChangeset, Default, Debug, PartialEq)]
#[diesel(table_name = tournament_team_scores)]
pub struct TeamScoreChangeset {
    pub points: Option<Option<i64>>,
    pub win: Option<Option<bool>>,
    pub margin: Option<Option<f32>>,
    pub score: Option<Option<f32>>,
    pub votes_given: Option<Option<i64>>,
    pub votes_possible: Option<Option<i64>>,
    pub forfeit: Option<bool>,
}

impl TeamScoreChangeset {
    pub fn set(
        &mut self,
        field: TeamScoreField,
        value: FieldValue,
    ) -> Result<(), ResultError> {
        match (field, value) {
            (TeamScoreField::Points, FieldValue::Integer(v)) => {
                self.points = Some(v)
            }
            (TeamScoreField::VotesGiven, FieldValue::Integer(v)) => {
                self.votes_given = Some(v)
            }
            (TeamScoreField::VotesPossible, FieldValue::Integer(v)) => {
                self.votes_possible = Some(v)
            }
            (TeamScoreField::Win, FieldValue::Boolean(v)) => self.win = Some(v),
            (TeamScoreField::Forfeit, FieldValue::Boolean(v)) => {
                self.forfeit = Some(v.unwrap_or(false))
            }
            (TeamScoreField::Margin, FieldValue::Decimal(v)) => {
                self.margin = Some(v.and_then(|v| v.to_f32()))
            }
            (TeamScoreField::Score, FieldValue::Decimal(v)) => {
                self.score = Some(v.and_then(|v| v.to_f32()))
            }
            (field, value) => {
                return Err(ResultError::Structure(format!(
                    "{value:?} is the wrong kind of value for {field:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == TeamScoreChangeset::default()
    }
}

#[tracing::instrument(skip(conn, changeset))]
pub fn upsert_team_score(
    ballot_id: &str,
    debate_team_id: &str,
    changeset: &TeamScoreChangeset,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<()> {
    diesel::insert_into(tournament_team_scores::table)
        .values((
            tournament_team_scores::id.eq(Uuid::now_v7().to_string()),
            tournament_team_scores::ballot_id.eq(ballot_id),
            tournament_team_scores::debate_team_id.eq(debate_team_id),
        ))
        .on_conflict((
            tournament_team_scores::ballot_id,
            tournament_team_scores::debate_team_id,
        ))
        .do_nothing()
        .execute(&mut *conn)?;

    if changeset.is_empty() {
        return Ok(());
    }

    diesel::update(
        tournament_team_scores::table.filter(
            tournament_team_scores::ballot_id
                .eq(ballot_id)
                .and(tournament_team_scores::debate_team_id.eq(debate_team_id)),
        ),
    )
    .set(changeset)
    .execute(conn)?;

    Ok(())
}

pub fn upsert_speaker_score(
    ballot_id: &str,
    debate_team_id: &str,
    position: i64,
    speaker_id: Option<String>,
    score: Option<f32>,
    ghost: bool,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<()> {
    diesel::insert_into(tournament_speaker_scores::table)
        .values((
            tournament_speaker_scores::id.eq(Uuid::now_v7().to_string()),
            tournament_speaker_scores::ballot_id.eq(ballot_id),
            tournament_speaker_scores::debate_team_id.eq(debate_team_id),
            tournament_speaker_scores::speaker_id.eq(&speaker_id),
            tournament_speaker_scores::position.eq(position),
            tournament_speaker_scores::score.eq(score),
            tournament_speaker_scores::ghost.eq(ghost),
        ))
        .on_conflict((
            tournament_speaker_scores::ballot_id,
            tournament_speaker_scores::debate_team_id,
            tournament_speaker_scores::position,
        ))
        .do_update()
        .set((
            tournament_speaker_scores::speaker_id.eq(&speaker_id),
            tournament_speaker_scores::score.eq(score),
            tournament_speaker_scores::ghost.eq(ghost),
        ))
        .execute(conn)?;
    Ok(())
}

pub fn upsert_judge_score(
    ballot_id: &str,
    debate_team_id: &str,
    debate_judge_id: &str,
    position: i64,
    score: Option<f32>,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<()> {
    diesel::insert_into(tournament_speaker_scores_by_judge::table)
        .values((
            tournament_speaker_scores_by_judge::id.eq(Uuid::now_v7().to_string()),
            tournament_speaker_scores_by_judge::ballot_id.eq(ballot_id),
            tournament_speaker_scores_by_judge::debate_team_id.eq(debate_team_id),
            tournament_speaker_scores_by_judge::debate_judge_id
                .eq(debate_judge_id),
            tournament_speaker_scores_by_judge::position.eq(position),
            tournament_speaker_scores_by_judge::score.eq(score),
        ))
        .on_conflict((
            tournament_speaker_scores_by_judge::ballot_id,
            tournament_speaker_scores_by_judge::debate_team_id,
            tournament_speaker_scores_by_judge::debate_judge_id,
            tournament_speaker_scores_by_judge::position,
        ))
        .do_update()
        .set(tournament_speaker_scores_by_judge::score.eq(score))
        .execute(conn)?;
    Ok(())
}

pub fn team_scores_of_ballot(
    ballot_id: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<TeamScore>> {
    tournament_team_scores::table
        .filter(tournament_team_scores::ballot_id.eq(ballot_id))
        .load::<TeamScore>(conn)
}

/// The side that forfeited, for each of the ballots that was saved as a
/// forfeit. Ballots with no forfeit (or whose forfeiting team has no side)
/// are left out.
#[tracing::instrument(skip(ballot_ids, conn), fields(n = ballot_ids.len()))]
pub fn forfeiters_of_ballots(
    ballot_ids: &[String],
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<HashMap<String, Side>> {
    let rows = tournament_team_scores::table
        .inner_join(tournament_debate_teams::table)
        .filter(tournament_team_scores::ballot_id.eq_any(ballot_ids))
        .filter(tournament_team_scores::forfeit.eq(true))
        .select((tournament_team_scores::ballot_id, tournament_debate_teams::side))
        .load::<(String, Option<i64>)>(conn)?;

    Ok(rows
        .into_iter()
        .filter_map(|(ballot_id, side)| side.map(|side| (ballot_id, Side(side))))
        .collect())
}
