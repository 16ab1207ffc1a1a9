//! Team standings, computed from the team scores of confirmed ballots.

use std::collections::HashMap;

use diesel::prelude::*;
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::schema::tournament_teams;
use crate::tournaments::standings::metrics::ballots::BallotsComputer;
use crate::tournaments::standings::metrics::margins::SumOfMarginsComputer;
use crate::tournaments::standings::metrics::points::{
    TeamPointsComputer, TeamWinsComputer,
};
use crate::tournaments::standings::metrics::tss::TotalTeamSpeakerScoreComputer;
use crate::tournaments::standings::metrics::{Metric, MetricValue};
use crate::tournaments::teams::Team;

pub mod metrics;

#[derive(
    Serialize, Deserialize, clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq,
)]
#[serde(rename_all = "snake_case")]
pub enum TeamMetric {
    Points,
    Wins,
    Ballots,
    SpeakerScore,
    Margins,
}

impl TeamMetric {
    pub const DEFAULT: [TeamMetric; 3] = [
        TeamMetric::Points,
        TeamMetric::SpeakerScore,
        TeamMetric::Margins,
    ];

    /// The value of the metric for a team with no results.
    fn zero(&self) -> MetricValue {
        match self {
            TeamMetric::Points | TeamMetric::Wins | TeamMetric::Ballots => {
                MetricValue::Integer(0)
            }
            TeamMetric::SpeakerScore | TeamMetric::Margins => {
                MetricValue::Float(Decimal::ZERO)
            }
        }
    }

    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        match self {
            TeamMetric::Points => TeamPointsComputer.compute(tid, conn),
            TeamMetric::Wins => TeamWinsComputer.compute(tid, conn),
            TeamMetric::Ballots => BallotsComputer.compute(tid, conn),
            TeamMetric::SpeakerScore => {
                TotalTeamSpeakerScoreComputer.compute(tid, conn)
            }
            TeamMetric::Margins => SumOfMarginsComputer.compute(tid, conn),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct StandingsRow {
    /// Teams with the same values share a rank.
    pub rank: usize,
    pub team: Team,
    pub values: Vec<MetricValue>,
}

#[derive(Serialize, Clone, Debug)]
pub struct TeamStandings {
    pub metrics: Vec<TeamMetric>,
    pub rows: Vec<StandingsRow>,
}

impl TeamStandings {
    /// Ranks every team of the tournament by the given metrics, earlier
    /// metrics taking precedence.
    #[tracing::instrument(skip(conn))]
    pub fn fetch(
        tid: &str,
        metrics: &[TeamMetric],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Self> {
        let mut metrics_of_team: HashMap<String, Vec<MetricValue>> =
            HashMap::new();

        let teams = tournament_teams::table
            .filter(tournament_teams::tournament_id.eq(tid))
            .load::<Team>(&mut *conn)?;

        for metric in metrics {
            let values = metric.compute(tid, &mut *conn)?;
            for team in &teams {
                let value =
                    values.get(&team.id).copied().unwrap_or(metric.zero());
                metrics_of_team.entry(team.id.clone()).or_default().push(value);
            }
        }

        let mut sorted = teams
            .into_iter()
            .map(|team| {
                let values =
                    metrics_of_team.remove(&team.id).unwrap_or_default();
                (team, values)
            })
            .collect::<Vec<_>>();
        sorted.sort_by(|(a, a_values), (b, b_values)| {
            b_values.cmp(a_values).then(a.number.cmp(&b.number))
        });

        let mut rows: Vec<StandingsRow> = Vec::with_capacity(sorted.len());
        for (i, (team, values)) in sorted.into_iter().enumerate() {
            let rank = match rows.last() {
                Some(prev) if prev.values == values => prev.rank,
                _ => i + 1,
            };
            rows.push(StandingsRow { rank, team, values });
        }

        Ok(TeamStandings {
            metrics: metrics.to_vec(),
            rows,
        })
    }
}
