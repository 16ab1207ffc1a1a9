//! Fixtures for the database-backed tests. Every test gets its own in-memory
//! database with the migrations applied.

use diesel::{SqliteConnection, prelude::*};
use uuid::Uuid;

use crate::{
    schema::{
        tournament_debate_judges, tournament_debate_teams, tournament_debates,
        tournament_judges, tournament_speakers, tournament_team_speakers,
        tournament_teams, tournaments,
    },
    state,
    tournaments::{
        Tournament,
        participants::{Judge, JudgeRole, Speaker},
        rounds::{ballots::Ballot, debates::Debate},
        teams::Team,
    },
};

mod forfeit;
mod standings;
mod voting;

fn id() -> String {
    Uuid::now_v7().to_string()
}

/// A tournament that only exists in memory, for tests of code that never
/// touches the database.
pub fn sample_tournament(
    substantive_speakers: i64,
    reply_speakers: bool,
    ballots_per_debate: &str,
) -> Tournament {
    Tournament {
        id: "sample".into(),
        name: "Sample Open".into(),
        abbrv: "SO".into(),
        slug: "sample".into(),
        created_at: chrono::NaiveDateTime::default(),
        substantive_speakers,
        reply_speakers,
        ballots_per_debate: ballots_per_debate.into(),
        margin_includes_dissenters: false,
        substantive_speech_min_speak: None,
        substantive_speech_max_speak: None,
        reply_speech_min_speak: None,
        reply_speech_max_speak: None,
    }
}

pub fn conn() -> SqliteConnection {
    state::connect(":memory:").unwrap()
}

pub fn insert_tournament(
    conn: &mut SqliteConnection,
    ballots_per_debate: &str,
    margin_includes_dissenters: bool,
) -> Tournament {
    let tid = id();
    diesel::insert_into(tournaments::table)
        .values((
            tournaments::id.eq(&tid),
            tournaments::name.eq("Test Tournament"),
            tournaments::abbrv.eq("TT"),
            tournaments::slug.eq(format!("tt-{tid}")),
            tournaments::substantive_speakers.eq(3i64),
            tournaments::reply_speakers.eq(true),
            tournaments::ballots_per_debate.eq(ballots_per_debate),
            tournaments::margin_includes_dissenters.eq(margin_includes_dissenters),
        ))
        .execute(conn)
        .unwrap();
    Tournament::fetch(&tid, conn).unwrap()
}

/// One debate between two teams of three speakers, with its panel and a
/// fresh ballot. `teams[0]` is meant for the affirmative.
pub struct DebateFixture {
    pub tournament: Tournament,
    pub debate: Debate,
    pub teams: Vec<Team>,
    pub rosters: Vec<Vec<Speaker>>,
    pub panel: Vec<Judge>,
    pub ballot: Ballot,
}

impl DebateFixture {
    pub fn new(
        conn: &mut SqliteConnection,
        tournament: &Tournament,
        roles: &[JudgeRole],
    ) -> Self {
        let debate_id = id();
        diesel::insert_into(tournament_debates::table)
            .values((
                tournament_debates::id.eq(&debate_id),
                tournament_debates::tournament_id.eq(&tournament.id),
                tournament_debates::number.eq(1i64),
            ))
            .execute(conn)
            .unwrap();

        let mut teams = Vec::new();
        let mut rosters = Vec::new();
        for (number, name) in (1i64..).zip(["Able", "Baker"]) {
            let team_id = id();
            diesel::insert_into(tournament_teams::table)
                .values((
                    tournament_teams::id.eq(&team_id),
                    tournament_teams::tournament_id.eq(&tournament.id),
                    tournament_teams::name.eq(name),
                    tournament_teams::number.eq(number),
                ))
                .execute(conn)
                .unwrap();

            let mut speaker_ids = Vec::new();
            for i in 1..=tournament.substantive_speakers {
                let speaker_id = id();
                diesel::insert_into(tournament_speakers::table)
                    .values((
                        tournament_speakers::id.eq(&speaker_id),
                        tournament_speakers::tournament_id.eq(&tournament.id),
                        tournament_speakers::name.eq(format!("{name} {i}")),
                        tournament_speakers::email
                            .eq(format!("{}{i}@example.com", name.to_lowercase())),
                    ))
                    .execute(conn)
                    .unwrap();
                diesel::insert_into(tournament_team_speakers::table)
                    .values((
                        tournament_team_speakers::id.eq(id()),
                        tournament_team_speakers::team_id.eq(&team_id),
                        tournament_team_speakers::speaker_id.eq(&speaker_id),
                    ))
                    .execute(conn)
                    .unwrap();
                speaker_ids.push(speaker_id);
            }

            diesel::insert_into(tournament_debate_teams::table)
                .values((
                    tournament_debate_teams::id.eq(id()),
                    tournament_debate_teams::debate_id.eq(&debate_id),
                    tournament_debate_teams::team_id.eq(&team_id),
                    tournament_debate_teams::side.eq(None::<i64>),
                ))
                .execute(conn)
                .unwrap();

            teams.push(Team::fetch(&team_id, &tournament.id, conn).unwrap());
            let mut roster = Speaker::fetch_many(&speaker_ids, conn).unwrap();
            roster.sort_by(|a, b| a.name.cmp(&b.name));
            rosters.push(roster);
        }

        let mut panel = Vec::new();
        for (number, role) in (1i64..).zip(roles) {
            let judge_id = id();
            diesel::insert_into(tournament_judges::table)
                .values((
                    tournament_judges::id.eq(&judge_id),
                    tournament_judges::tournament_id.eq(&tournament.id),
                    tournament_judges::name.eq(format!("Judge {number}")),
                    tournament_judges::email.eq(format!("j{number}@example.com")),
                    tournament_judges::number.eq(number),
                ))
                .execute(conn)
                .unwrap();
            diesel::insert_into(tournament_debate_judges::table)
                .values((
                    tournament_debate_judges::id.eq(id()),
                    tournament_debate_judges::debate_id.eq(&debate_id),
                    tournament_debate_judges::judge_id.eq(&judge_id),
                    tournament_debate_judges::status.eq(role.status_code()),
                ))
                .execute(conn)
                .unwrap();
            panel.push(
                tournament_judges::table
                    .filter(tournament_judges::id.eq(&judge_id))
                    .first::<Judge>(conn)
                    .unwrap(),
            );
        }

        let ballot = Ballot::create(&tournament.id, &debate_id, conn).unwrap();

        DebateFixture {
            tournament: tournament.clone(),
            debate: Debate::fetch(&debate_id, conn).unwrap(),
            teams,
            rosters,
            panel,
            ballot,
        }
    }

    /// The speaker who gives the speech in `position` for `teams[team]`. The
    /// first speaker also gives the reply.
    pub fn speaker(&self, team: usize, position: i64) -> Speaker {
        let roster = &self.rosters[team];
        let index = (position - 1) as usize % roster.len();
        roster[index].clone()
    }
}

/// The number of team score, speaker score and per-judge score rows.
pub fn score_row_counts(conn: &mut SqliteConnection) -> [i64; 3] {
    use crate::schema::{
        tournament_speaker_scores, tournament_speaker_scores_by_judge,
        tournament_team_scores,
    };

    [
        tournament_team_scores::table
            .count()
            .get_result::<i64>(conn)
            .unwrap(),
        tournament_speaker_scores::table
            .count()
            .get_result::<i64>(conn)
            .unwrap(),
        tournament_speaker_scores_by_judge::table
            .count()
            .get_result::<i64>(conn)
            .unwrap(),
    ]
}
