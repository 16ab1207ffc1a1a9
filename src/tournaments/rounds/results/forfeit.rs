//! A debate won by forfeit. There are no speeches to score: the team that
//! forfeited loses and the other team wins.

use diesel::{connection::LoadConnection, sqlite::Sqlite};

use crate::tournaments::{
    Tournament,
    rounds::{
        Side,
        ballots::Ballot,
        results::{
            ResultBuffer, ResultError,
            display::{SheetBreakdown, SideRow},
            prefetch::{DebateRows, Needs},
            records::{FieldValue, TeamScoreField},
            teams::{BoundTeam, TeamBuffer},
        },
        side_names::name_of_side,
    },
    teams::Team,
};

#[derive(Clone, Debug)]
pub struct ForfeitDebateResult {
    ballot: Ballot,
    teams: TeamBuffer,
    forfeiter: Side,
}

impl ForfeitDebateResult {
    pub fn new(
        ballot: Ballot,
        tournament: &Tournament,
        forfeiter: Side,
    ) -> Result<Self, ResultError> {
        let sides = tournament.sides();
        if !sides.contains(&forfeiter) {
            return Err(ResultError::UnknownSide(forfeiter));
        }
        Ok(ForfeitDebateResult {
            ballot,
            teams: TeamBuffer::new(sides),
            forfeiter,
        })
    }

    pub fn forfeiter(&self) -> Side {
        self.forfeiter
    }

    pub fn set_sides(
        &mut self,
        teams: &[Team],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        self.teams.set_sides(&self.ballot.debate_id, teams, conn)
    }

    pub fn team(&self, side: Side) -> Option<&BoundTeam> {
        self.teams.get(side)
    }

    /// With two sides, the side that did not forfeit.
    pub fn winning_side(&self) -> Option<Side> {
        match self.teams.sides() {
            [a, b] if *a == self.forfeiter => Some(*b),
            [a, b] if *b == self.forfeiter => Some(*a),
            _ => None,
        }
    }

    pub fn winning_team(&self) -> Option<&Team> {
        self.winning_side()
            .and_then(|side| self.teams.get(side))
            .map(|bound| &bound.team)
    }

    pub fn points(&self, side: Side) -> i64 {
        i64::from(side != self.forfeiter)
    }

    pub fn win(&self, side: Side) -> bool {
        side != self.forfeiter
    }

    pub fn breakdown(&self) -> Vec<SheetBreakdown> {
        let sides = self
            .teams
            .sides()
            .iter()
            .map(|side| SideRow {
                side: *side,
                side_name: name_of_side(*side, false),
                team: self.teams.get(*side).map(|bound| bound.team.clone()),
                total: None,
                win: self.win(*side),
                speakers: Vec::new(),
            })
            .collect();
        vec![SheetBreakdown {
            adjudicator: None,
            sides,
        }]
    }
}

impl ResultBuffer for ForfeitDebateResult {
    fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    fn needs(&self) -> Needs {
        Needs::default()
    }

    fn init_blank_buffer(&mut self) {
        self.teams.init_blank();
    }

    fn load_from_rows(&mut self, rows: &DebateRows<'_>) -> Result<(), ResultError> {
        self.teams.load_from_rows(rows);
        Ok(())
    }

    fn assert_loaded(&self) -> Result<(), ResultError> {
        self.teams.assert_loaded()
    }

    fn is_complete(&self) -> bool {
        if let Err(e) = self.assert_loaded() {
            tracing::warn!("not complete, the result is malformed: {e}");
            return false;
        }
        self.teams.is_complete()
    }

    fn is_valid(&self) -> bool {
        self.is_complete()
    }

    fn identical(&self, other: &Self) -> bool {
        self.teams.identical(&other.teams) && self.forfeiter == other.forfeiter
    }

    fn team_score_field(
        &self,
        field: TeamScoreField,
        side: Side,
    ) -> Result<Option<FieldValue>, ResultError> {
        Ok(match field {
            TeamScoreField::Points => {
                Some(FieldValue::Integer(Some(self.points(side))))
            }
            TeamScoreField::Win => Some(FieldValue::Boolean(Some(self.win(side)))),
            TeamScoreField::Forfeit if side == self.forfeiter => {
                Some(FieldValue::Boolean(Some(true)))
            }
            _ => None,
        })
    }

    #[tracing::instrument(skip_all, fields(ballot = %self.ballot.id, forfeiter = %self.forfeiter))]
    fn save(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        if !self.is_valid() {
            return Err(ResultError::InvalidResult("save"));
        }
        self.teams.save_team_scores(&self.ballot, conn, |field, side| {
            self.team_score_field(field, side)
        })?;
        tracing::debug!("saved forfeit");
        Ok(())
    }
}
