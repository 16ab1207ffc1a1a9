use std::collections::HashMap;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use indexmap::IndexMap;

use crate::tournaments::{
    participants::Speaker,
    rounds::{
        Side,
        ballots::Ballot,
        debates::{self, DebateTeam, teams_of_debates},
        results::{
            ResultError,
            prefetch::DebateRows,
            records::{
                FieldValue, TeamScoreChangeset, TeamScoreField,
                upsert_team_score,
            },
        },
    },
    teams::{Team, rosters_of_teams},
};

/// A team bound to a side of a debate, with the speakers it may field.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundTeam {
    pub debate_team: DebateTeam,
    pub team: Team,
    pub roster: Vec<Speaker>,
}

impl BoundTeam {
    pub fn has_speaker(&self, speaker_id: &str) -> bool {
        self.roster.iter().any(|speaker| speaker.id == speaker_id)
    }
}

/// Which team is on which side. Before `init_blank` is called the buffer is
/// unloaded and holds no sides at all; afterwards every configured side is
/// present, bound or not.
#[derive(Clone, Debug, Default)]
pub struct TeamBuffer {
    sides: Vec<Side>,
    teams: IndexMap<Side, Option<BoundTeam>>,
}

impl TeamBuffer {
    pub fn new(sides: Vec<Side>) -> Self {
        TeamBuffer {
            sides,
            teams: IndexMap::new(),
        }
    }

    pub fn init_blank(&mut self) {
        self.teams = self.sides.iter().map(|side| (*side, None)).collect();
    }

    /// Binds the debate teams that have one of the configured sides. Teams
    /// on any other side (or none) are ignored.
    pub fn load_from_rows(&mut self, rows: &DebateRows<'_>) {
        self.bind(rows.debate_teams, rows.rosters);
    }

    fn bind(
        &mut self,
        debate_teams: &[(DebateTeam, Team)],
        rosters: &HashMap<String, Vec<Speaker>>,
    ) {
        for (debate_team, team) in debate_teams {
            let Some(side) = debate_team.side() else {
                continue;
            };
            if let Some(slot) = self.teams.get_mut(&side) {
                *slot = Some(BoundTeam {
                    debate_team: debate_team.clone(),
                    team: team.clone(),
                    roster: rosters.get(&team.id).cloned().unwrap_or_default(),
                });
            }
        }
    }

    pub fn assert_loaded(&self) -> Result<(), ResultError> {
        if self.teams.len() != self.sides.len()
            || !self.sides.iter().all(|side| self.teams.contains_key(side))
        {
            return Err(ResultError::Structure(format!(
                "teams are keyed by {:?}, but the sides are {:?}",
                self.teams.keys().collect::<Vec<_>>(),
                self.sides
            )));
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        !self.teams.is_empty() && self.teams.values().all(Option::is_some)
    }

    pub fn identical(&self, other: &TeamBuffer) -> bool {
        let ids = |buffer: &TeamBuffer| {
            buffer
                .teams
                .iter()
                .map(|(side, bound)| {
                    (*side, bound.as_ref().map(|b| b.debate_team.id.clone()))
                })
                .collect::<Vec<_>>()
        };
        ids(self) == ids(other)
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn get(&self, side: Side) -> Option<&BoundTeam> {
        self.teams.get(&side).and_then(Option::as_ref)
    }

    pub fn side_of_debate_team(&self, debate_team_id: &str) -> Option<Side> {
        self.teams.iter().find_map(|(side, bound)| {
            bound
                .as_ref()
                .filter(|bound| bound.debate_team.id == debate_team_id)
                .map(|_| *side)
        })
    }

    /// Puts `teams[i]` on the i-th side of the debate. This is written to the
    /// database straight away, after which the bindings are reloaded.
    #[tracing::instrument(skip(self, teams, conn), fields(n = teams.len()))]
    pub fn set_sides(
        &mut self,
        debate_id: &str,
        teams: &[Team],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        if teams.len() != self.sides.len() {
            return Err(ResultError::WrongTeamCount {
                expected: self.sides.len(),
                got: teams.len(),
            });
        }

        let debate_ids = [debate_id.to_string()];
        let in_debate = teams_of_debates(&debate_ids, &mut *conn)?;

        let mut allocations = Vec::with_capacity(teams.len());
        for (side, team) in self.sides.iter().zip(teams) {
            let (debate_team, _) = in_debate
                .iter()
                .find(|(dt, _)| dt.team_id == team.id)
                .ok_or_else(|| ResultError::TeamNotInDebate {
                    team: team.id.clone(),
                    debate: debate_id.to_string(),
                })?;
            allocations.push((debate_team.id.clone(), *side));
        }

        for (debate_team_id, side) in &allocations {
            debates::allocate_side(debate_team_id, *side, &mut *conn)?;
        }

        let reloaded = teams_of_debates(&debate_ids, &mut *conn)?;
        let team_ids = reloaded
            .iter()
            .map(|(_, team)| team.id.clone())
            .collect::<Vec<_>>();
        let rosters = rosters_of_teams(&team_ids, conn)?;
        self.init_blank();
        self.bind(&reloaded, &rosters);

        Ok(())
    }

    /// Writes a team score row for every side, filling in whichever fields
    /// `value_of` says apply.
    pub fn save_team_scores(
        &self,
        ballot: &Ballot,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
        value_of: impl Fn(
            TeamScoreField,
            Side,
        ) -> Result<Option<FieldValue>, ResultError>,
    ) -> Result<(), ResultError> {
        for side in &self.sides {
            let bound = self.get(*side).ok_or(ResultError::SidesNotSet)?;

            let mut changeset = TeamScoreChangeset::default();
            for field in TeamScoreField::ALL {
                if let Some(value) = value_of(field, *side)? {
                    changeset.set(field, value)?;
                }
            }

            upsert_team_score(
                &ballot.id,
                &bound.debate_team.id,
                &changeset,
                &mut *conn,
            )?;
        }
        Ok(())
    }
}
