use std::collections::HashMap;

use diesel::prelude::*;
use diesel::{connection::LoadConnection, sqlite::Sqlite};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use serde::Serialize;

use crate::{
    schema::{tournament_ballots, tournament_debate_teams, tournament_team_scores},
    tournaments::rounds::results::records::TeamScore,
};

pub mod ballots;
pub mod margins;
pub mod points;
pub mod tss;

pub trait Metric<V> {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, V>>;
}

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(Decimal),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricValue::Integer(integer) => write!(f, "{integer}"),
            MetricValue::Float(decimal) => write!(f, "{decimal}"),
        }
    }
}

/// The team score rows of every confirmed ballot in the tournament, paired
/// with the id of the team they belong to.
pub fn confirmed_team_scores(
    tid: &str,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<(String, TeamScore)>> {
    tournament_team_scores::table
        .inner_join(tournament_ballots::table)
        .inner_join(tournament_debate_teams::table)
        .filter(tournament_ballots::tournament_id.eq(tid))
        .filter(tournament_ballots::confirmed.eq(true))
        .select((
            tournament_debate_teams::team_id,
            tournament_team_scores::all_columns,
        ))
        .load::<(String, TeamScore)>(conn)
}

pub(crate) fn sum_integers(
    rows: Vec<(String, TeamScore)>,
    value: impl Fn(&TeamScore) -> Option<i64>,
) -> HashMap<String, MetricValue> {
    let mut totals: HashMap<String, i64> = HashMap::new();
    for (team_id, row) in rows {
        if let Some(v) = value(&row) {
            let total = totals.entry(team_id).or_insert(0);
            *total = total.saturating_add(v);
        }
    }
    totals
        .into_iter()
        .map(|(team_id, total)| (team_id, MetricValue::Integer(total)))
        .collect()
}

pub(crate) fn sum_decimals(
    rows: Vec<(String, TeamScore)>,
    value: impl Fn(&TeamScore) -> Option<f32>,
) -> HashMap<String, MetricValue> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for (team_id, row) in rows {
        if let Some(v) = value(&row).and_then(Decimal::from_f32) {
            let total = totals.entry(team_id).or_insert(Decimal::ZERO);
            *total = total.saturating_add(v);
        }
    }
    totals
        .into_iter()
        .map(|(team_id, total)| (team_id, MetricValue::Float(total)))
        .collect()
}
