use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    schema::{tournament_debate_teams, tournament_debates, tournament_teams},
    tournaments::{rounds::Side, teams::Team},
};

#[derive(Queryable, QueryableByName, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[diesel(table_name = tournament_debates)]
pub struct Debate {
    pub id: String,
    pub tournament_id: String,
    pub number: i64,
}

impl Debate {
    pub fn fetch(
        id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        tournament_debates::table
            .filter(tournament_debates::id.eq(id))
            .first::<Debate>(conn)
    }
}

#[derive(Queryable, QueryableByName, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = tournament_debate_teams)]
/// This struct represents a single row in the `tournament_debate_teams` table.
pub struct DebateTeam {
    pub id: String,
    pub debate_id: String,
    pub team_id: String,
    /// `None` if the team has not been allocated a side yet.
    pub side: Option<i64>,
}

impl DebateTeam {
    pub fn side(&self) -> Option<Side> {
        self.side.map(Side)
    }
}

/// Loads every team of the given debates, together with its debate team
/// binding (allocated or not).
pub fn teams_of_debates(
    debate_ids: &[String],
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<(DebateTeam, Team)>> {
    tournament_debate_teams::table
        .inner_join(
            tournament_teams::table
                .on(tournament_debate_teams::team_id.eq(tournament_teams::id)),
        )
        .filter(tournament_debate_teams::debate_id.eq_any(debate_ids))
        .order_by((
            tournament_debate_teams::debate_id.asc(),
            tournament_debate_teams::side.asc(),
        ))
        .select((
            tournament_debate_teams::all_columns,
            tournament_teams::all_columns,
        ))
        .load::<(DebateTeam, Team)>(conn)
}

/// Allocates `side` to the debate team with the given id. Written straight
/// away rather than with the rest of a result, because other parts of a
/// result are keyed by side.
pub fn allocate_side(
    debate_team_id: &str,
    side: Side,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<usize> {
    diesel::update(
        tournament_debate_teams::table
            .filter(tournament_debate_teams::id.eq(debate_team_id)),
    )
    .set(tournament_debate_teams::side.eq(Some(side.0)))
    .execute(conn)
}
