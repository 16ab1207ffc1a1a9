use std::collections::HashMap;

use diesel::{QueryResult, connection::LoadConnection, sqlite::Sqlite};

use crate::tournaments::standings::metrics::{
    Metric, MetricValue, confirmed_team_scores, sum_decimals,
};

pub struct SumOfMarginsComputer;

impl Metric<MetricValue> for SumOfMarginsComputer {
    fn compute(
        &self,
        tid: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<HashMap<String, MetricValue>> {
        let rows = confirmed_team_scores(tid, conn)?;
        Ok(sum_decimals(rows, |row| row.margin))
    }
}
