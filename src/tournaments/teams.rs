use std::collections::HashMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    schema::{tournament_speakers, tournament_team_speakers, tournament_teams},
    tournaments::participants::Speaker,
};

#[derive(Serialize, Deserialize, Queryable, Clone, Debug, PartialEq, Eq)]
pub struct Team {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub number: i64,
}

impl Team {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        team_id: &str,
        tournament_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Team> {
        let ret = tournament_teams::table
            .filter(
                tournament_teams::id
                    .eq(team_id)
                    .and(tournament_teams::tournament_id.eq(tournament_id)),
            )
            .first::<Team>(&mut *conn);

        tracing::trace!("ok? {}", ret.is_ok());

        ret
    }
}

/// Loads the speakers of each of the given teams, keyed by team id. Teams
/// without any speakers are absent from the map.
pub fn rosters_of_teams(
    team_ids: &[String],
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<HashMap<String, Vec<Speaker>>> {
    let rows = tournament_team_speakers::table
        .inner_join(
            tournament_speakers::table.on(tournament_team_speakers::speaker_id
                .eq(tournament_speakers::id)),
        )
        .filter(tournament_team_speakers::team_id.eq_any(team_ids))
        .order_by(tournament_speakers::name.asc())
        .select((
            tournament_team_speakers::team_id,
            tournament_speakers::all_columns,
        ))
        .load::<(String, Speaker)>(conn)?;

    let mut rosters: HashMap<String, Vec<Speaker>> = HashMap::new();
    for (team_id, speaker) in rows {
        rosters.entry(team_id).or_default().push(speaker);
    }
    Ok(rosters)
}
