//! A flattened view of a result for rendering: one table per scoresheet,
//! with everything needed to print it already looked up.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::tournaments::{
    Tournament,
    participants::{Judge, Speaker},
    rounds::{
        Side,
        results::{speakers::SpeakerBuffer, teams::TeamBuffer},
        side_names::{name_of_position, name_of_side},
    },
    teams::Team,
};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SpeakerRow {
    pub position: i64,
    pub position_name: String,
    pub speaker: Option<Speaker>,
    pub ghost: bool,
    pub score: Option<f32>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SideRow {
    pub side: Side,
    pub side_name: String,
    pub team: Option<Team>,
    pub total: Option<Decimal>,
    pub win: bool,
    pub speakers: Vec<SpeakerRow>,
}

/// One scoresheet. `adjudicator` is `None` for the shared scoresheet of a
/// result entered per debate.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SheetBreakdown {
    pub adjudicator: Option<Judge>,
    pub sides: Vec<SideRow>,
}

pub(crate) fn side_rows(
    tournament: &Tournament,
    teams: &TeamBuffer,
    speakers: &SpeakerBuffer,
    score: impl Fn(Side, i64) -> Option<f32>,
    total: impl Fn(Side) -> Option<Decimal>,
    winner: Option<Side>,
) -> Vec<SideRow> {
    teams
        .sides()
        .iter()
        .map(|side| SideRow {
            side: *side,
            side_name: name_of_side(*side, false),
            team: teams.get(*side).map(|bound| bound.team.clone()),
            total: total(*side),
            win: winner == Some(*side),
            speakers: speakers
                .positions()
                .iter()
                .map(|pos| SpeakerRow {
                    position: *pos,
                    position_name: name_of_position(tournament, *pos),
                    speaker: speakers.get_speaker(*side, *pos).ok().flatten().cloned(),
                    ghost: speakers.get_ghost(*side, *pos).unwrap_or(false),
                    score: score(*side, *pos),
                })
                .collect(),
        })
        .collect()
}
