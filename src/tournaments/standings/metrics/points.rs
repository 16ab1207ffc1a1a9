use std::collections::HashMap;

use diesel::{QueryResult, connection::LoadConnection, sqlite::Sqlite};

use crate::tournaments::standings::metrics::{
    Metric, MetricValue, confirmed_team_scores, sum_integers,
};

pub struct TeamPointsComputer;

impl Metric<MetricValue> for TeamPointsComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let rows = confirmed_team_scores(tid, conn)?;
        tracing::trace!("summing points over {} team scores", rows.len());
        Ok(sum_integers(rows, |row| row.points))
    }
}

/// The number of debates the team won. Unlike points, a result that has no
/// win recorded (for example one still missing scores) counts for nothing.
pub struct TeamWinsComputer;

impl Metric<MetricValue> for TeamWinsComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let rows = confirmed_team_scores(tid, conn)?;
        Ok(sum_integers(rows, |row| row.win.map(i64::from)))
    }
}
