use chrono::NaiveDateTime;
use diesel::{Queryable, connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::tournament_ballots;

/// A single submission of a result for a debate. A debate may have several of
/// these over time (for example when a result is re-entered after a mistake),
/// and each one carries its own set of scores.
#[derive(Queryable, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Ballot {
    pub id: String,
    pub tournament_id: String,
    pub debate_id: String,
    pub submitted_at: NaiveDateTime,
    pub version: i64,
    pub confirmed: bool,
}

impl Ballot {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        ballot_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        tournament_ballots::table
            .filter(tournament_ballots::id.eq(ballot_id))
            .first::<Ballot>(conn)
    }

    /// All the ballots submitted for a debate, oldest first.
    pub fn of_debate(
        debate_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Self>> {
        tournament_ballots::table
            .filter(tournament_ballots::debate_id.eq(debate_id))
            .order_by(tournament_ballots::version.asc())
            .load::<Ballot>(conn)
    }

    /// The confirmed ballots of a tournament.
    pub fn confirmed_of_tournament(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Self>> {
        tournament_ballots::table
            .filter(
                tournament_ballots::tournament_id
                    .eq(tid)
                    .and(tournament_ballots::confirmed.eq(true)),
            )
            .order_by(tournament_ballots::submitted_at.asc())
            .load::<Ballot>(conn)
    }

    /// Records a new (unconfirmed) submission for the debate. Its version is
    /// one more than the latest existing submission.
    #[tracing::instrument(skip(conn))]
    pub fn create(
        tid: &str,
        debate_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        let latest = tournament_ballots::table
            .filter(tournament_ballots::debate_id.eq(debate_id))
            .select(diesel::dsl::max(tournament_ballots::version))
            .first::<Option<i64>>(conn)?;

        let id = Uuid::now_v7().to_string();
        diesel::insert_into(tournament_ballots::table)
            .values((
                tournament_ballots::id.eq(&id),
                tournament_ballots::tournament_id.eq(tid),
                tournament_ballots::debate_id.eq(debate_id),
                tournament_ballots::submitted_at
                    .eq(chrono::Utc::now().naive_utc()),
                tournament_ballots::version.eq(latest.map_or(0, |v| v + 1)),
                tournament_ballots::confirmed.eq(false),
            ))
            .execute(conn)?;

        Self::fetch(&id, conn)
    }

    /// Marks this ballot as the confirmed result of its debate, unconfirming
    /// any other ballot for the same debate.
    pub fn confirm(
        &mut self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<()> {
        diesel::update(
            tournament_ballots::table.filter(
                tournament_ballots::debate_id
                    .eq(&self.debate_id)
                    .and(tournament_ballots::id.ne(&self.id)),
            ),
        )
        .set(tournament_ballots::confirmed.eq(false))
        .execute(conn)?;

        diesel::update(
            tournament_ballots::table.filter(tournament_ballots::id.eq(&self.id)),
        )
        .set(tournament_ballots::confirmed.eq(true))
        .execute(conn)?;

        self.confirmed = true;
        Ok(())
    }
}
