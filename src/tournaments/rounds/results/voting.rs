//! Results entered per adjudicator. Every voting member of the panel fills
//! in a scoresheet; the winner of each scoresheet is that adjudicator's
//! vote, and the side with the most votes wins. When the votes are split
//! evenly the chair's vote decides.

use std::collections::HashMap;

use diesel::{connection::LoadConnection, sqlite::Sqlite};
use indexmap::IndexMap;
use itertools::Itertools;
use once_cell::unsync::OnceCell;
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::tournaments::{
    Tournament,
    participants::{Judge, JudgeRole, PanelMember, Speaker},
    rounds::{
        Side,
        ballots::Ballot,
        results::{
            ResultBuffer, ResultError, mean,
            display::{SheetBreakdown, side_rows},
            prefetch::{DebateRows, Needs},
            records::{FieldValue, TeamScoreField, upsert_judge_score},
            scoresheet::{ScoreBounds, Scoresheet},
            speakers::{SpeakerAssignment, SpeakerBuffer, calculate_margin},
            teams::{BoundTeam, TeamBuffer},
        },
    },
    teams::Team,
};

/// The outcome of a panel vote.
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub winner: Side,
    /// The ids of the judges who voted for each side, in panel order.
    pub adjudicators_for: IndexMap<Side, Vec<String>>,
    /// Whether the panel was split evenly and the chair's vote decided it.
    pub casting_vote: bool,
}

impl Decision {
    pub fn majority(&self) -> &[String] {
        self.adjudicators_for
            .get(&self.winner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn votes_for(&self, side: Side) -> usize {
        self.adjudicators_for.get(&side).map_or(0, Vec::len)
    }
}

/// Decides a debate from the votes of its panel, given as (judge id, side)
/// pairs in panel order. The side with the most votes wins; if several
/// sides share the most votes, the chair's vote decides between them.
pub fn majority_decision(
    sides: &[Side],
    votes: &[(String, Side)],
    chair: Option<&str>,
) -> Result<Decision, ResultError> {
    let mut adjudicators_for: IndexMap<Side, Vec<String>> =
        sides.iter().map(|side| (*side, Vec::new())).collect();
    for (judge, side) in votes {
        adjudicators_for
            .get_mut(side)
            .ok_or(ResultError::UnknownSide(*side))?
            .push(judge.clone());
    }

    let most = adjudicators_for.values().map(Vec::len).max().unwrap_or(0);
    let leaders = adjudicators_for
        .iter()
        .filter(|(_, judges)| judges.len() == most)
        .map(|(side, _)| *side)
        .collect::<Vec<_>>();

    if let [winner] = leaders.as_slice() {
        return Ok(Decision {
            winner: *winner,
            adjudicators_for,
            casting_vote: false,
        });
    }

    let chair = chair.ok_or_else(|| {
        ResultError::Structure(
            "the panel is split and there is no chair to break the tie".into(),
        )
    })?;
    let chair_side = votes
        .iter()
        .find(|(judge, _)| judge == chair)
        .map(|(_, side)| *side)
        .ok_or_else(|| ResultError::UnknownAdjudicator(chair.to_string()))?;
    if !leaders.contains(&chair_side) {
        return Err(ResultError::Structure(format!(
            "the chair voted for {chair_side}, which is not one of the tied sides {leaders:?}"
        )));
    }

    tracing::info!(
        "panel split {} with {most} votes each, the chair's vote for {chair_side} decides",
        leaders.iter().join("/"),
    );

    Ok(Decision {
        winner: chair_side,
        adjudicators_for,
        casting_vote: true,
    })
}

#[derive(Clone, Debug)]
pub struct VotingDebateResult {
    ballot: Ballot,
    tournament: Tournament,
    teams: TeamBuffer,
    speakers: SpeakerBuffer,
    panel: Vec<PanelMember>,
    scoresheets: IndexMap<String, Scoresheet>,
    decision: OnceCell<Decision>,
}

impl VotingDebateResult {
    /// An unloaded result. Call [`ResultBuffer::full_load`] (or load it in
    /// bulk with [`populate_results`](super::prefetch::populate_results))
    /// before using it.
    pub fn new(ballot: Ballot, tournament: Tournament) -> Self {
        let sides = tournament.sides();
        let positions = tournament.positions();
        VotingDebateResult {
            ballot,
            teams: TeamBuffer::new(sides.clone()),
            speakers: SpeakerBuffer::new(sides, positions),
            tournament,
            panel: Vec::new(),
            scoresheets: IndexMap::new(),
            decision: OnceCell::new(),
        }
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    pub fn panel(&self) -> &[PanelMember] {
        &self.panel
    }

    pub fn chair(&self) -> Option<&PanelMember> {
        self.panel
            .iter()
            .find(|member| member.role == JudgeRole::Chair)
    }

    fn blank_scoresheet(&self) -> Scoresheet {
        Scoresheet::new(self.teams.sides(), self.speakers.positions())
            .with_bounds(ScoreBounds::of_tournament(&self.tournament))
    }

    fn member(&self, judge_id: &str) -> Option<&PanelMember> {
        self.panel.iter().find(|member| member.judge.id == judge_id)
    }

    pub fn scoresheet(&self, judge_id: &str) -> Option<&Scoresheet> {
        self.scoresheets.get(judge_id)
    }

    pub fn get_score(
        &self,
        judge_id: &str,
        side: Side,
        position: i64,
    ) -> Result<Option<f32>, ResultError> {
        let sheet = self
            .scoresheets
            .get(judge_id)
            .ok_or_else(|| ResultError::UnknownAdjudicator(judge_id.into()))?;
        Ok(sheet.get_score(side, position))
    }

    pub fn set_score(
        &mut self,
        judge_id: &str,
        side: Side,
        position: i64,
        score: Option<f32>,
    ) -> Result<(), ResultError> {
        self.decision.take();
        self.scoresheets
            .get_mut(judge_id)
            .ok_or_else(|| ResultError::UnknownAdjudicator(judge_id.into()))?
            .set_score(side, position, score)
    }

    pub fn set_sides(
        &mut self,
        teams: &[Team],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ResultError> {
        self.decision.take();
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
        self.decision.take();
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

    /// The decision of the panel, computed the first time it is asked for.
    /// Fails if the result is not valid.
    pub fn decision(&self) -> Result<&Decision, ResultError> {
        if !self.is_valid() {
            return Err(ResultError::InvalidResult("decide"));
        }
        self.decision.get_or_try_init(|| {
            let votes = self
                .scoresheets
                .iter()
                .map(|(judge_id, sheet)| {
                    sheet
                        .winner()
                        .map(|side| (judge_id.clone(), side))
                        .ok_or_else(|| {
                            ResultError::MissingWinner(judge_id.clone())
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let chair = self.chair().map(|member| member.judge.id.as_str());
            majority_decision(self.teams.sides(), &votes, chair)
        })
    }

    /// The decision, or `None` while the result is still incomplete.
    fn decided(&self) -> Result<Option<&Decision>, ResultError> {
        if !self.is_complete() {
            return Ok(None);
        }
        self.decision().map(Some)
    }

    fn judges(&self, ids: &[String]) -> Vec<&Judge> {
        ids.iter()
            .filter_map(|id| self.member(id).map(|member| &member.judge))
            .collect()
    }

    /// The adjudicators who voted for the winning side.
    pub fn majority_adjudicators(&self) -> Result<Vec<&Judge>, ResultError> {
        Ok(self
            .decided()?
            .map(|decision| self.judges(decision.majority()))
            .unwrap_or_default())
    }

    fn relevant_ids(&self) -> Result<Vec<String>, ResultError> {
        let Some(decision) = self.decided()? else {
            return Ok(Vec::new());
        };
        Ok(if self.tournament.margin_includes_dissenters {
            self.scoresheets.keys().cloned().collect()
        } else {
            decision.majority().to_vec()
        })
    }

    /// The adjudicators whose scores are averaged into team and speaker
    /// scores: everyone who voted if the tournament counts dissenting
    /// ballots, otherwise only the majority.
    pub fn relevant_adjudicators(&self) -> Result<Vec<&Judge>, ResultError> {
        Ok(self.judges(&self.relevant_ids()?))
    }

    pub fn winning_side(&self) -> Result<Option<Side>, ResultError> {
        Ok(self.decided()?.map(|decision| decision.winner))
    }

    pub fn winning_team(&self) -> Result<Option<&Team>, ResultError> {
        Ok(self
            .winning_side()?
            .and_then(|side| self.teams.get(side))
            .map(|bound| &bound.team))
    }

    pub fn points(&self, side: Side) -> Result<Option<i64>, ResultError> {
        Ok(self
            .winning_side()?
            .map(|winner| i64::from(winner == side)))
    }

    pub fn win(&self, side: Side) -> Result<Option<bool>, ResultError> {
        Ok(self.winning_side()?.map(|winner| winner == side))
    }

    /// The mean total of the side across the relevant adjudicators.
    pub fn score(&self, side: Side) -> Result<Option<Decimal>, ResultError> {
        let ids = self.relevant_ids()?;
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(mean(ids.iter().map(|id| {
            self.scoresheets.get(id).and_then(|sheet| sheet.get_total(side))
        })))
    }

    pub fn margin(&self, side: Side) -> Result<Option<Decimal>, ResultError> {
        calculate_margin(self.teams.sides(), side, |side| self.score(side))
    }

    pub fn votes_given(&self, side: Side) -> Result<Option<i64>, ResultError> {
        Ok(self
            .decided()?
            .map(|decision| decision.votes_for(side) as i64))
    }

    /// The number of adjudicators with a scoresheet. Available whether or
    /// not the result is complete.
    pub fn votes_possible(&self, _side: Side) -> i64 {
        self.scoresheets.len() as i64
    }

    /// The mean score of the speaker across the relevant adjudicators.
    pub fn get_speaker_score(
        &self,
        side: Side,
        position: i64,
    ) -> Result<Option<Decimal>, ResultError> {
        let ids = self.relevant_ids()?;
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(mean(ids.iter().map(|id| {
            self.scoresheets
                .get(id)
                .and_then(|sheet| sheet.get_score(side, position))
                .and_then(Decimal::from_f32)
        })))
    }

    /// Every member of the panel with their role, and whether they voted
    /// against the decision. Trainees never count as a split.
    pub fn adjudicators_with_splits(
        &self,
    ) -> Result<impl Iterator<Item = (&Judge, JudgeRole, bool)> + '_, ResultError>
    {
        let decision = self.decided()?;
        let decided = decision.is_some();
        let majority = decision.map(Decision::majority).unwrap_or(&[]);
        Ok(self.panel.iter().map(move |member| {
            let split = decided
                && member.role.votes()
                && !majority.contains(&member.judge.id);
            (&member.judge, member.role, split)
        }))
    }

    pub fn breakdown(&self) -> Vec<SheetBreakdown> {
        self.scoresheets
            .iter()
            .map(|(judge_id, sheet)| SheetBreakdown {
                adjudicator: self.member(judge_id).map(|m| m.judge.clone()),
                sides: side_rows(
                    &self.tournament,
                    &self.teams,
                    &self.speakers,
                    |side, pos| sheet.get_score(side, pos),
                    |side| sheet.get_total(side),
                    sheet.winner(),
                ),
            })
            .collect()
    }
}

impl ResultBuffer for VotingDebateResult {
    fn ballot(&self) -> &Ballot {
        &self.ballot
    }

    fn needs(&self) -> Needs {
        Needs {
            speaker_scores: true,
            panels: true,
        }
    }

    fn init_blank_buffer(&mut self) {
        self.decision.take();
        self.teams.init_blank();
        self.speakers.init_blank();
        self.panel.clear();
        self.scoresheets.clear();
    }

    fn load_from_rows(&mut self, rows: &DebateRows<'_>) -> Result<(), ResultError> {
        self.decision.take();
        self.teams.load_from_rows(rows);
        // speaker rows carry the averaged score, which is recomputed from
        // the scoresheets
        self.speakers
            .load_from_rows(rows, &self.teams, |_, _, _| Ok(()))?;

        self.panel = rows.panel.to_vec();
        let voting = self
            .panel
            .iter()
            .filter(|member| member.role.votes())
            .map(|member| {
                (member.debate_judge.id.clone(), member.judge.id.clone())
            })
            .collect::<HashMap<_, _>>();
        let blank = self.blank_scoresheet();
        self.scoresheets = self
            .panel
            .iter()
            .filter(|member| member.role.votes())
            .map(|member| (member.judge.id.clone(), blank.clone()))
            .collect();

        for row in rows.judge_scores {
            let Some(judge_id) = voting.get(&row.debate_judge_id) else {
                continue;
            };
            let Some(side) = self.teams.side_of_debate_team(&row.debate_team_id)
            else {
                continue;
            };
            if !self.speakers.positions().contains(&row.position) {
                continue;
            }
            if let Some(sheet) = self.scoresheets.get_mut(judge_id) {
                sheet.set_score(side, row.position, row.score)?;
            }
        }
        Ok(())
    }

    fn assert_loaded(&self) -> Result<(), ResultError> {
        self.teams.assert_loaded()?;
        self.speakers.assert_loaded()?;

        if self.teams.sides() != [Side::AFF, Side::NEG] {
            return Err(ResultError::Structure(format!(
                "voting results need exactly two sides, not {:?}",
                self.teams.sides()
            )));
        }

        let voting = self
            .panel
            .iter()
            .filter(|member| member.role.votes())
            .map(|member| member.judge.id.as_str())
            .sorted()
            .collect::<Vec<_>>();
        let with_sheets = self
            .scoresheets
            .keys()
            .map(String::as_str)
            .sorted()
            .collect::<Vec<_>>();
        if voting != with_sheets {
            return Err(ResultError::Structure(format!(
                "scoresheets are held for {with_sheets:?}, but the voting \
                 adjudicators are {voting:?}"
            )));
        }
        Ok(())
    }

    fn is_complete(&self) -> bool {
        if let Err(e) = self.assert_loaded() {
            tracing::warn!("not complete, the result is malformed: {e}");
            return false;
        }
        self.teams.is_complete()
            && self.speakers.is_complete()
            && self.chair().is_some()
            && self.scoresheets.values().all(Scoresheet::is_complete)
    }

    fn is_valid(&self) -> bool {
        self.is_complete() && self.scoresheets.values().all(Scoresheet::is_valid)
    }

    fn identical(&self, other: &Self) -> bool {
        self.teams.identical(&other.teams)
            && self.speakers.identical(&other.speakers)
            && self.scoresheets.len() == other.scoresheets.len()
            && self.scoresheets.iter().all(|(judge_id, sheet)| {
                other
                    .scoresheets
                    .get(judge_id)
                    .is_some_and(|theirs| sheet.identical(theirs))
            })
    }

    fn team_score_field(
        &self,
        field: TeamScoreField,
        side: Side,
    ) -> Result<Option<FieldValue>, ResultError> {
        Ok(Some(match field {
            TeamScoreField::Points => FieldValue::Integer(self.points(side)?),
            TeamScoreField::Win => FieldValue::Boolean(self.win(side)?),
            TeamScoreField::Margin => FieldValue::Decimal(self.margin(side)?),
            TeamScoreField::Score => FieldValue::Decimal(self.score(side)?),
            TeamScoreField::VotesGiven => {
                FieldValue::Integer(self.votes_given(side)?)
            }
            TeamScoreField::VotesPossible => {
                FieldValue::Integer(Some(self.votes_possible(side)))
            }
            TeamScoreField::Forfeit => return Ok(None),
        }))
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
        self.speakers.save(&self.ballot, &self.teams, &mut *conn, |side, pos| {
            self.get_speaker_score(side, pos)
        })?;

        for (judge_id, sheet) in &self.scoresheets {
            let member = self
                .member(judge_id)
                .ok_or_else(|| ResultError::UnknownAdjudicator(judge_id.clone()))?;
            for side in self.teams.sides() {
                let bound = self.teams.get(*side).ok_or(ResultError::SidesNotSet)?;
                for position in self.speakers.positions() {
                    upsert_judge_score(
                        &self.ballot.id,
                        &bound.debate_team.id,
                        &member.debate_judge.id,
                        *position,
                        sheet.get_score(*side, *position),
                        &mut *conn,
                    )?;
                }
            }
        }

        tracing::debug!("saved voting result");
        Ok(())
    }
}
