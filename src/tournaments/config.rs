use std::{fmt, str::FromStr};

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::{schema::tournaments, tournaments::Tournament};

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "invalid choice for `ballots_per_debate`: {0:?} (expected \
         'per-adjudicator' or 'per-debate')"
    )]
    UnknownBallotsPerDebate(String),
    #[error("the configuration file is malformed: {0}")]
    Malformed(#[from] toml::de::Error),
    #[error("could not serialize the configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("`{field}` must be at least 1 (got {value})")]
    TooFewSpeakers { field: &'static str, value: i64 },
    #[error("speak range for {which} is empty ({min} > {max})")]
    EmptySpeakRange { which: &'static str, min: f32, max: f32 },
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// How ballots are entered for a debate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BallotsPerDebate {
    /// Each voting adjudicator fills in their own scoresheet, and the debate
    /// is decided by majority.
    PerAdjudicator,
    /// The panel fills in one scoresheet between them.
    PerDebate,
}

impl FromStr for BallotsPerDebate {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-adjudicator" | "per-adj" => Ok(BallotsPerDebate::PerAdjudicator),
            "per-debate" => Ok(BallotsPerDebate::PerDebate),
            other => {
                Err(ConfigurationError::UnknownBallotsPerDebate(other.to_string()))
            }
        }
    }
}

impl fmt::Display for BallotsPerDebate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BallotsPerDebate::PerAdjudicator => "per-adjudicator",
            BallotsPerDebate::PerDebate => "per-debate",
        })
    }
}

/// The result-related settings of a tournament, in a form that can be
/// edited as TOML.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TournamentConfig {
    pub substantive_speakers: i64,
    pub reply_speakers: bool,
    pub ballots_per_debate: String,
    pub margin_includes_dissenters: bool,
    pub substantive_speech_min_speak: Option<f32>,
    pub substantive_speech_max_speak: Option<f32>,
    pub reply_speech_min_speak: Option<f32>,
    pub reply_speech_max_speak: Option<f32>,
}

pub fn config_of_tournament(tournament: &Tournament) -> TournamentConfig {
    TournamentConfig {
        substantive_speakers: tournament.substantive_speakers,
        reply_speakers: tournament.reply_speakers,
        ballots_per_debate: tournament.ballots_per_debate.clone(),
        margin_includes_dissenters: tournament.margin_includes_dissenters,
        substantive_speech_min_speak: tournament.substantive_speech_min_speak,
        substantive_speech_max_speak: tournament.substantive_speech_max_speak,
        reply_speech_min_speak: tournament.reply_speech_min_speak,
        reply_speech_max_speak: tournament.reply_speech_max_speak,
    }
}

impl TournamentConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigurationError> {
        let config = toml::from_str::<TournamentConfig>(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigurationError> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.ballots_per_debate.parse::<BallotsPerDebate>()?;

        if self.substantive_speakers < 1 {
            return Err(ConfigurationError::TooFewSpeakers {
                field: "substantive_speakers",
                value: self.substantive_speakers,
            });
        }

        let ranges = [
            (
                "substantive speeches",
                self.substantive_speech_min_speak,
                self.substantive_speech_max_speak,
            ),
            (
                "reply speeches",
                self.reply_speech_min_speak,
                self.reply_speech_max_speak,
            ),
        ];
        for (which, min, max) in ranges {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(ConfigurationError::EmptySpeakRange {
                        which,
                        min,
                        max,
                    });
                }
            }
        }

        Ok(())
    }

    /// Validates the configuration and writes it to the tournament.
    ///
    /// TODO: refuse changes to the speaker positions once ballots have been
    /// entered, as stored scores for retired positions are silently ignored.
    #[tracing::instrument(skip(conn))]
    pub fn apply(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), ConfigurationError> {
        self.validate()?;

        let n = diesel::update(tournaments::table.filter(tournaments::id.eq(tid)))
            .set((
                tournaments::substantive_speakers.eq(self.substantive_speakers),
                tournaments::reply_speakers.eq(self.reply_speakers),
                tournaments::ballots_per_debate.eq(&self.ballots_per_debate),
                tournaments::margin_includes_dissenters
                    .eq(self.margin_includes_dissenters),
                tournaments::substantive_speech_min_speak
                    .eq(self.substantive_speech_min_speak),
                tournaments::substantive_speech_max_speak
                    .eq(self.substantive_speech_max_speak),
                tournaments::reply_speech_min_speak
                    .eq(self.reply_speech_min_speak),
                tournaments::reply_speech_max_speak
                    .eq(self.reply_speech_max_speak),
            ))
            .execute(conn)?;

        if n == 0 {
            return Err(diesel::result::Error::NotFound.into());
        }

        tracing::trace!("updated configuration of tournament {tid}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TournamentConfig {
        TournamentConfig {
            substantive_speakers: 3,
            reply_speakers: true,
            ballots_per_debate: "per-adjudicator".to_string(),
            margin_includes_dissenters: false,
            substantive_speech_min_speak: Some(60.0),
            substantive_speech_max_speak: Some(80.0),
            reply_speech_min_speak: Some(30.0),
            reply_speech_max_speak: Some(40.0),
        }
    }

    #[test]
    fn parses_ballots_per_debate() {
        assert_eq!(
            "per-adjudicator".parse::<BallotsPerDebate>().unwrap(),
            BallotsPerDebate::PerAdjudicator
        );
        assert_eq!(
            "per-debate".parse::<BallotsPerDebate>().unwrap(),
            BallotsPerDebate::PerDebate
        );
    }

    #[test]
    fn unknown_ballots_per_debate_names_the_value() {
        let err = "per-room".parse::<BallotsPerDebate>().unwrap_err();
        assert!(matches!(
            &err,
            ConfigurationError::UnknownBallotsPerDebate(v) if v == "per-room"
        ));
        assert!(err.to_string().contains("per-room"));
    }

    #[test]
    fn toml_config_survives_editing() {
        let config = sample();
        let text = config.to_toml().unwrap();
        assert_eq!(TournamentConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn rejects_inverted_speak_range() {
        let mut config = sample();
        config.reply_speech_min_speak = Some(45.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::EmptySpeakRange { .. })
        ));
    }

    #[test]
    fn rejects_bad_ballot_setup_in_toml() {
        let mut config = sample();
        config.ballots_per_debate = "consensus".to_string();
        let text = config.to_toml().unwrap();
        assert!(matches!(
            TournamentConfig::from_toml(&text),
            Err(ConfigurationError::UnknownBallotsPerDebate(_))
        ));
    }
}
