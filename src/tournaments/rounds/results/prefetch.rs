//! Bulk loading of results. Loading a result one ballot at a time costs a
//! handful of queries per ballot, which adds up on the standings and
//! results pages; here the rows of many ballots are fetched with a fixed
//! number of queries and then handed out per ballot.

use std::collections::{HashMap, HashSet};

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use itertools::Itertools;

use crate::{
    schema::{tournament_speaker_scores, tournament_speaker_scores_by_judge},
    tournaments::{
        Tournament,
        participants::{PanelMember, Speaker, panels_of_debates},
        rounds::{
            ballots::Ballot,
            debates::{DebateTeam, teams_of_debates},
            results::{
                DebateResult, ResultBuffer, ResultError,
                records::{SpeakerScore, SpeakerScoreByJudge, forfeiters_of_ballots},
            },
        },
        teams::{Team, rosters_of_teams},
    },
};

/// What to load alongside the debate teams of each ballot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Needs {
    pub speaker_scores: bool,
    pub panels: bool,
}

#[derive(Debug, Default)]
pub struct ResultRows {
    debate_teams: HashMap<String, Vec<(DebateTeam, Team)>>,
    rosters: HashMap<String, Vec<Speaker>>,
    speaker_scores: HashMap<String, Vec<SpeakerScore>>,
    speakers: HashMap<String, Speaker>,
    panels: HashMap<String, Vec<PanelMember>>,
    judge_scores: HashMap<String, Vec<SpeakerScoreByJudge>>,
}

/// The rows belonging to a single ballot.
#[derive(Copy, Clone, Debug)]
pub struct DebateRows<'a> {
    pub debate_teams: &'a [(DebateTeam, Team)],
    pub rosters: &'a HashMap<String, Vec<Speaker>>,
    pub speaker_scores: &'a [SpeakerScore],
    pub speakers: &'a HashMap<String, Speaker>,
    pub panel: &'a [PanelMember],
    pub judge_scores: &'a [SpeakerScoreByJudge],
}

impl ResultRows {
    #[tracing::instrument(skip(ballots, conn), fields(n = ballots.len()))]
    pub fn fetch(
        ballots: &[Ballot],
        needs: Needs,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        let debate_ids = ballots
            .iter()
            .map(|ballot| ballot.debate_id.clone())
            .unique()
            .collect::<Vec<_>>();
        let ballot_ids = ballots
            .iter()
            .map(|ballot| ballot.id.clone())
            .collect::<Vec<_>>();

        let mut rows = ResultRows::default();

        let debate_teams = teams_of_debates(&debate_ids, &mut *conn)?;
        let team_ids = debate_teams
            .iter()
            .map(|(_, team)| team.id.clone())
            .unique()
            .collect::<Vec<_>>();
        rows.rosters = rosters_of_teams(&team_ids, &mut *conn)?;
        rows.debate_teams = debate_teams
            .into_iter()
            .into_group_map_by(|(dt, _)| dt.debate_id.clone());

        if needs.speaker_scores {
            let scores = tournament_speaker_scores::table
                .filter(tournament_speaker_scores::ballot_id.eq_any(&ballot_ids))
                .order_by(tournament_speaker_scores::position.asc())
                .load::<SpeakerScore>(&mut *conn)?;

            let rostered = rows
                .rosters
                .values()
                .flatten()
                .map(|speaker| speaker.id.as_str())
                .collect::<HashSet<_>>();
            let unrostered = scores
                .iter()
                .filter_map(|score| score.speaker_id.clone())
                .filter(|id| !rostered.contains(id.as_str()))
                .unique()
                .collect::<Vec<_>>();

            rows.speakers = rows
                .rosters
                .values()
                .flatten()
                .cloned()
                .chain(Speaker::fetch_many(&unrostered, &mut *conn)?)
                .map(|speaker| (speaker.id.clone(), speaker))
                .collect();
            rows.speaker_scores = scores
                .into_iter()
                .into_group_map_by(|score| score.ballot_id.clone());
        }

        if needs.panels {
            rows.panels = panels_of_debates(&debate_ids, &mut *conn)?
                .into_iter()
                .into_group_map_by(|member| {
                    member.debate_judge.debate_id.clone()
                });
            rows.judge_scores = tournament_speaker_scores_by_judge::table
                .filter(
                    tournament_speaker_scores_by_judge::ballot_id
                        .eq_any(&ballot_ids),
                )
                .load::<SpeakerScoreByJudge>(conn)?
                .into_iter()
                .into_group_map_by(|score| score.ballot_id.clone());
        }

        Ok(rows)
    }

    pub fn for_ballot(&self, ballot: &Ballot) -> DebateRows<'_> {
        DebateRows {
            debate_teams: slice_of(&self.debate_teams, &ballot.debate_id),
            rosters: &self.rosters,
            speaker_scores: slice_of(&self.speaker_scores, &ballot.id),
            speakers: &self.speakers,
            panel: slice_of(&self.panels, &ballot.debate_id),
            judge_scores: slice_of(&self.judge_scores, &ballot.id),
        }
    }
}

fn slice_of<'a, T>(map: &'a HashMap<String, Vec<T>>, key: &str) -> &'a [T] {
    map.get(key).map(Vec::as_slice).unwrap_or(&[])
}

/// Builds and loads the results of many ballots of one tournament at once.
/// Each result is checked with `assert_loaded` before it is returned.
#[tracing::instrument(skip_all, fields(tournament = %tournament.id, n = ballots.len()))]
pub fn populate_results(
    ballots: Vec<Ballot>,
    tournament: &Tournament,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<DebateResult>, ResultError> {
    let ballot_ids = ballots
        .iter()
        .map(|ballot| ballot.id.clone())
        .collect::<Vec<_>>();
    let forfeiters = forfeiters_of_ballots(&ballot_ids, &mut *conn)?;
    let mut results = ballots
        .iter()
        .cloned()
        .map(|ballot| {
            let forfeiter = forfeiters.get(&ballot.id).copied();
            DebateResult::from_stored(ballot, tournament, forfeiter)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let needs = results
        .iter()
        .map(DebateResult::needs)
        .fold(Needs::default(), |a, b| Needs {
            speaker_scores: a.speaker_scores || b.speaker_scores,
            panels: a.panels || b.panels,
        });
    let rows = ResultRows::fetch(&ballots, needs, conn)?;

    for result in &mut results {
        result.init_blank_buffer();
        let ballot = result.ballot().clone();
        result.load_from_rows(&rows.for_ballot(&ballot))?;
        result.assert_loaded()?;
    }

    Ok(results)
}
