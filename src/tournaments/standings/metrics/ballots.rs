use std::collections::HashMap;

use diesel::{QueryResult, connection::LoadConnection, sqlite::Sqlite};

use crate::tournaments::standings::metrics::{
    Metric, MetricValue, confirmed_team_scores, sum_integers,
};

/// The number of adjudicators' votes the team received. Only results entered
/// per adjudicator record votes.
pub struct BallotsComputer;

impl Metric<MetricValue> for BallotsComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let rows = confirmed_team_scores(tid, conn)?;
        Ok(sum_integers(rows, |row| row.votes_given))
    }
}
