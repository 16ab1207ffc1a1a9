//! Results entered once per debate. The panel agrees on a single
//! scoresheet, and its winner is the winner of the debate.

use diesel::{connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::tournaments::{
    Tournament,
    participants::Speaker,
    rounds::{
        Side,
        ballots::Ballot,
        results::{
            ResultBuffer, ResultError,
            display::{SheetBreakdown, side_rows},
            prefetch::{DebateRows, Needs},
            records::{FieldValue, TeamScoreField},
            scoresheet::{ScoreBounds, Scoresheet},
            speakers::{SpeakerAssignment, SpeakerBuffer, calculate_margin},
            teams::{BoundTeam, TeamBuffer},
        },
    },
    teams::Team,
};

#[derive(Clone, Debug)]
pub struct ConsensusDebateResult {
    ballot: Ballot,
    tournament: Tournament,
    teams: TeamBuffer,
    speakers: SpeakerBuffer,
    scoresheet: Scoresheet,
}

impl ConsensusDebateResult {
    pub fn new(ballot: Ballot, tournament: Tournament) -> Self {
        let sides = tournament.sides();
        let positions = tournament.positions();
        let scoresheet = Scoresheet::new(&sides, &positions)
            .with_bounds(ScoreBounds::of_tournament(&tournament));
        ConsensusDebateResult {
            ballot,
            teams: TeamBuffer::new(sides.clone()),
            speakers: SpeakerBuffer::new(sides, positions),
            scoresheet,
            tournament,
        }
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    pub fn scoresheet(&self) -> &Scoresheet {
        &self.scoresheet
    }

    pub fn get_score(&self, side: Side, position: i64) -> Option<f32> {
        self.scoresheet.get_score(side, position)
    }

    pub fn set_score(
        &mut self,
        side: Side,
        position: i64,
        score: Option<f32>,
    ) -> Result<(), ResultError> {
        self.scoresheet.set_score(side, position, score)
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

    pub fn get_speaker(
        &self,
        side: Side,
        position: i64,
    ) -> Result<Option<&Speaker>, ResultError> {
        self.speakers.get_speaker(side, position)
    }

    pub fn set_speaker(
        &mut self,
        side: Side,
        position: i64,
        speaker: Speaker,
    ) -> Result<SpeakerAssignment, ResultError> {
        self.speakers.set_speaker(&self.teams, side, position, speaker)
    }

    pub fn get_ghost(
        &self,
        side: Side,
        position: i64,
    ) -> Result<bool, ResultError> {
        self.speakers.get_ghost(side, position)
    }

    pub fn set_ghost(
        &mut self,
        side: Side,
        position: i64,
        ghost: bool,
    ) -> Result<(), ResultError> {
        self.speakers.set_ghost(side, position, ghost)
    }

    pub fn winning_side(&self) -> Option<Side> {
        self.scoresheet.winner()
    }

    pub fn winning_team(&self) -> Option<&Team> {
        self.winning_side()
            .and_then(|side| self.teams.get(side))
            .map(|bound| &bound.team)
    }

    pub fn points(&self, side: Side) -> Option<i64> {
        self.winning_side().map(|winner| i64::from(winner == side))
    }

    pub fn win(&self, side: Side) -> Option<bool> {
        self.winning_side().map(|winner| winner == side)
    }

    pub fn score(&self, side: Side) -> Option<Decimal> {
        self.scoresheet.get_total(side)
    }

    pub fn margin(&self, side: Side) -> Result<Option<Decimal>, ResultError> {
        calculate_margin(self.teams.sides(), side, |side| Ok(self.score(side)))
    }

    pub fn get_speaker_score(&self, side: Side, position: i64) -> Option<Decimal> {
        self.scoresheet
            .get_score(side, position)
            .and_then(Decimal::from_f32)
    }

    pub fn breakdown(&self) -> Vec<SheetBreakdown> {
        vec![SheetBreakdown {
            adjudicator: None,
            sides: side_rows(
                &self.tournament,
                &self.teams,
                &self.speakers,
                |side, pos| self.scoresheet.get_score(side, pos),
                |side| self.scoresheet.get_total(side),
                self.scoresheet.winner(),
            ),
        }]
    }
}

impl ResultBuffer for ConsensusDebateResult {
    fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    fn needs(&self) -> Needs {
        Needs {
            speaker_scores: true,
            panels: false,
        }
    }

    fn init_blank_buffer(&mut self) {
        self.teams.init_blank();
        self.speakers.init_blank();
        self.scoresheet = Scoresheet::new(self.teams.sides(), self.speakers.positions())
            .with_bounds(ScoreBounds::of_tournament(&self.tournament));
    }

    fn load_from_rows(&mut self, rows: &DebateRows<'_>) -> Result<(), ResultError> {
        self.teams.load_from_rows(rows);
        let scoresheet = &mut self.scoresheet;
        self.speakers.load_from_rows(rows, &self.teams, |side, pos, score| {
            scoresheet.set_score(side, pos, score)
        })
    }

    fn assert_loaded(&self) -> Result<(), ResultError> {
        self.teams.assert_loaded()?;
        self.speakers.assert_loaded()
    }

    fn is_complete(&self) -> bool {
        if let Err(e) = self.assert_loaded() {
            tracing::warn!("not complete, the result is malformed: {e}");
            return false;
        }
        self.teams.is_complete()
            && self.speakers.is_complete()
            && self.scoresheet.is_complete()
    }

    fn is_valid(&self) -> bool {
        self.is_complete() && self.scoresheet.is_valid()
    }

    fn identical(&self, other: &Self) -> bool {
        self.teams.identical(&other.teams)
            && self.speakers.identical(&other.speakers)
            && self.scoresheet.identical(&other.scoresheet)
    }

    fn team_score_field(
        &self,
        field: TeamScoreField,
        side: Side,
    ) -> Result<Option<FieldValue>, ResultError> {
        Ok(match field {
            TeamScoreField::Points => Some(FieldValue::Integer(self.points(side))),
            TeamScoreField::Win => Some(FieldValue::Boolean(self.win(side))),
            TeamScoreField::Margin => Some(FieldValue::Decimal(self.margin(side)?)),
            TeamScoreField::Score => Some(FieldValue::Decimal(self.score(side))),
            TeamScoreField::VotesGiven
            | TeamScoreField::VotesPossible
            | TeamScoreField::Forfeit => None,
        })
    }

    #[tracing::instrument(skip_all, fields(ballot = %self.ballot.id))]
    fn save(
        &self,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        if !self.is_valid() {
            return Err(ResultError::InvalidResult("save"));
        }

        self.teams.save_team_scores(&self.ballot, &mut *conn, |field, side| {
            self.team_score_field(field, side)
        })?;
        self.speakers.save(&self.ballot, &self.teams, conn, |side, pos| {
            Ok(self.get_speaker_score(side, pos))
        })?;

        tracing::debug!("saved consensus result");
        Ok(())
    }
}
