use diesel::{connection::LoadConnection, sqlite::Sqlite};
use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::tournaments::{
    participants::Speaker,
    rounds::{
        Side,
        ballots::Ballot,
        results::{
            ResultError, prefetch::DebateRows, records::upsert_speaker_score,
            teams::TeamBuffer,
        },
    },
};

/// What happened to a speaker passed to [`SpeakerBuffer::set_speaker`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum SpeakerAssignment {
    Assigned,
    /// The speaker is not on the team's roster; the position is unchanged.
    Rejected,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Slot {
    speaker: Option<Speaker>,
    ghost: bool,
}

/// Who spoke in each position, and whether that speech was a ghost (an
/// iron-person or substitute speech that does not count towards the
/// speaker's standing).
#[derive(Clone, Debug, Default)]
pub struct SpeakerBuffer {
    sides: Vec<Side>,
    positions: Vec<i64>,
    slots: IndexMap<Side, IndexMap<i64, Slot>>,
}

impl SpeakerBuffer {
    pub fn new(sides: Vec<Side>, positions: Vec<i64>) -> Self {
        SpeakerBuffer {
            sides,
            positions,
            slots: IndexMap::new(),
        }
    }

    pub fn init_blank(&mut self) {
        self.slots = self
            .sides
            .iter()
            .map(|side| {
                let slots = self
                    .positions
                    .iter()
                    .map(|pos| (*pos, Slot::default()))
                    .collect();
                (*side, slots)
            })
            .collect();
    }

    /// Fills the buffer from the speaker score rows of the ballot. Rows for
    /// unbound debate teams and for positions the tournament does not use
    /// are skipped. Calls `score` with every row it keeps, so that results
    /// which store a single scoresheet can read it off the same rows.
    pub fn load_from_rows(
        &mut self,
        rows: &DebateRows<'_>,
        teams: &TeamBuffer,
        mut score: impl FnMut(Side, i64, Option<f32>) -> Result<(), ResultError>,
    ) -> Result<(), ResultError> {
        for row in rows.speaker_scores {
            let Some(side) = teams.side_of_debate_team(&row.debate_team_id)
            else {
                continue;
            };
            let Some(slot) = self
                .slots
                .get_mut(&side)
                .and_then(|slots| slots.get_mut(&row.position))
            else {
                continue;
            };

            slot.speaker = row
                .speaker_id
                .as_ref()
                .and_then(|id| rows.speakers.get(id))
                .cloned();
            slot.ghost = row.ghost;
            score(side, row.position, row.score)?;
        }
        Ok(())
    }

    pub fn assert_loaded(&self) -> Result<(), ResultError> {
        let sides_match = self.slots.len() == self.sides.len()
            && self.sides.iter().all(|side| self.slots.contains_key(side));
        if !sides_match {
            return Err(ResultError::Structure(format!(
                "speakers are keyed by {:?}, but the sides are {:?}",
                self.slots.keys().collect::<Vec<_>>(),
                self.sides
            )));
        }

        for (side, slots) in &self.slots {
            if !slots.keys().eq(self.positions.iter()) {
                return Err(ResultError::Structure(format!(
                    "speakers on {side:?} have positions {:?}, expected {:?}",
                    slots.keys().collect::<Vec<_>>(),
                    self.positions
                )));
            }
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty()
            && self
                .slots
                .values()
                .flat_map(|slots| slots.values())
                .all(|slot| slot.speaker.is_some())
    }

    pub fn identical(&self, other: &SpeakerBuffer) -> bool {
        self.slots == other.slots
    }

    pub fn positions(&self) -> &[i64] {
        &self.positions
    }

    fn slot(&self, side: Side, position: i64) -> Result<&Slot, ResultError> {
        self.slots
            .get(&side)
            .ok_or(ResultError::UnknownSide(side))?
            .get(&position)
            .ok_or(ResultError::UnknownPosition(position))
    }

    fn slot_mut(
        &mut self,
        side: Side,
        position: i64,
    ) -> Result<&mut Slot, ResultError> {
        self.slots
            .get_mut(&side)
            .ok_or(ResultError::UnknownSide(side))?
            .get_mut(&position)
            .ok_or(ResultError::UnknownPosition(position))
    }

    pub fn get_speaker(
        &self,
        side: Side,
        position: i64,
    ) -> Result<Option<&Speaker>, ResultError> {
        Ok(self.slot(side, position)?.speaker.as_ref())
    }

    /// Puts `speaker` in the given position. Speakers who are not on the
    /// roster of the team on that side are refused and logged.
    pub fn set_speaker(
        &mut self,
        teams: &TeamBuffer,
        side: Side,
        position: i64,
        speaker: Speaker,
    ) -> Result<SpeakerAssignment, ResultError> {
        if !self.sides.contains(&side) {
            return Err(ResultError::UnknownSide(side));
        }
        let bound = teams.get(side).ok_or(ResultError::SidesNotSet)?;

        if !bound.has_speaker(&speaker.id) {
            tracing::error!(
                "speaker {} ({}) is not on team {} ({}), not setting them as \
                 speaker {position} on {side}",
                speaker.name,
                speaker.id,
                bound.team.name,
                bound.team.id,
            );
            return Ok(SpeakerAssignment::Rejected);
        }

        self.slot_mut(side, position)?.speaker = Some(speaker);
        Ok(SpeakerAssignment::Assigned)
    }

    pub fn get_ghost(
        &self,
        side: Side,
        position: i64,
    ) -> Result<bool, ResultError> {
        Ok(self.slot(side, position)?.ghost)
    }

    pub fn set_ghost(
        &mut self,
        side: Side,
        position: i64,
        ghost: bool,
    ) -> Result<(), ResultError> {
        self.slot_mut(side, position)?.ghost = ghost;
        Ok(())
    }

    /// Writes a speaker score row for every position of every side, with
    /// the score `score_of` gives for it.
    pub fn save(
        &self,
        ballot: &Ballot,
        teams: &TeamBuffer,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
        score_of: impl Fn(Side, i64) -> Result<Option<Decimal>, ResultError>,
    ) -> Result<(), ResultError> {
        for (side, slots) in &self.slots {
            let bound = teams.get(*side).ok_or(ResultError::SidesNotSet)?;
            for (position, slot) in slots {
                let score = score_of(*side, *position)?;
                upsert_speaker_score(
                    &ballot.id,
                    &bound.debate_team.id,
                    *position,
                    slot.speaker.as_ref().map(|s| s.id.clone()),
                    score.and_then(|score| score.to_f32()),
                    slot.ghost,
                    &mut *conn,
                )?;
            }
        }
        Ok(())
    }
}

/// The side's total minus the other side's total. `None` if either total is
/// unavailable or the difference overflows. Only defined for two-team
/// debates.
pub fn calculate_margin(
    sides: &[Side],
    side: Side,
    total_of: impl Fn(Side) -> Result<Option<Decimal>, ResultError>,
) -> Result<Option<Decimal>, ResultError> {
    let [first, second] = sides else {
        return Err(ResultError::Structure(format!(
            "margins are only defined for two sides, not {sides:?}"
        )));
    };
    let other = if side == *first {
        *second
    } else if side == *second {
        *first
    } else {
        return Err(ResultError::UnknownSide(side));
    };

    match (total_of(side)?, total_of(other)?) {
        (Some(own), Some(theirs)) => Ok(own.checked_sub(theirs)),
        _ => Ok(None),
    }
}
