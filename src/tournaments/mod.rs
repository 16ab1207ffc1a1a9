use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{
    schema::tournaments,
    tournaments::{
        config::{BallotsPerDebate, ConfigurationError},
        rounds::Side,
    },
};

pub mod config;
pub mod participants;
pub mod rounds;
pub mod standings;
pub mod teams;

#[derive(Queryable, Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub abbrv: String,
    pub slug: String,
    pub created_at: chrono::NaiveDateTime,
    pub substantive_speakers: i64,
    pub reply_speakers: bool,
    pub ballots_per_debate: String,
    pub margin_includes_dissenters: bool,
    pub substantive_speech_min_speak: Option<f32>,
    pub substantive_speech_max_speak: Option<f32>,
    pub reply_speech_min_speak: Option<f32>,
    pub reply_speech_max_speak: Option<f32>,
}

impl Tournament {
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Tournament> {
        tournaments::table
            .filter(tournaments::id.eq(tid))
            .first::<Tournament>(conn)
    }

    /// The sides of every debate in this tournament, in order. Only two-team
    /// formats are supported at the moment.
    pub fn sides(&self) -> Vec<Side> {
        vec![Side::AFF, Side::NEG]
    }

    /// Speaker positions, numbered from 1. The reply speech (if there is one)
    /// takes the number after the last substantive speaker.
    pub fn positions(&self) -> Vec<i64> {
        let last = self.substantive_speakers + i64::from(self.reply_speakers);
        (1..=last).collect()
    }

    pub fn reply_position(&self) -> Option<i64> {
        self.reply_speakers.then_some(self.substantive_speakers + 1)
    }

    pub fn ballots_per_debate(
        &self,
    ) -> Result<BallotsPerDebate, ConfigurationError> {
        self.ballots_per_debate.parse()
    }
}
