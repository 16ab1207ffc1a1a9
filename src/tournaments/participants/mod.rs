use std::fmt;

use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};

use crate::schema::{
    tournament_debate_judges, tournament_judges, tournament_speakers,
};

#[derive(Queryable, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Speaker {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub email: String,
}

impl Speaker {
    pub fn fetch_many(
        ids: &[String],
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> QueryResult<Vec<Speaker>> {
        tournament_speakers::table
            .filter(tournament_speakers::id.eq_any(ids))
            .load::<Speaker>(conn)
    }
}

#[derive(Queryable, QueryableByName, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[diesel(check_for_backend(Sqlite))]
#[diesel(table_name = tournament_judges)]
pub struct Judge {
    pub id: String,
    pub tournament_id: String,
    pub name: String,
    pub email: String,
    pub number: i64,
}

#[derive(Queryable, QueryableByName, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[diesel(check_for_backend(Sqlite))]
#[diesel(table_name = tournament_debate_judges)]
pub struct DebateJudge {
    pub id: String,
    pub debate_id: String,
    pub judge_id: String,
    pub status: String,
}

impl DebateJudge {
    /// The role of this judge on the panel. Unknown status codes are treated
    /// as trainees, so that they never vote.
    pub fn role(&self) -> JudgeRole {
        match self.status.as_str() {
            "C" => JudgeRole::Chair,
            "P" => JudgeRole::Panellist,
            "T" => JudgeRole::Trainee,
            other => {
                tracing::warn!(
                    "debate judge {} has unknown status {other:?}, treating as trainee",
                    self.id
                );
                JudgeRole::Trainee
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JudgeRole {
    Chair,
    Panellist,
    Trainee,
}

impl JudgeRole {
    pub fn status_code(&self) -> &'static str {
        match self {
            JudgeRole::Chair => "C",
            JudgeRole::Panellist => "P",
            JudgeRole::Trainee => "T",
        }
    }

    pub fn votes(&self) -> bool {
        !matches!(self, JudgeRole::Trainee)
    }
}

impl fmt::Display for JudgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JudgeRole::Chair => "chair",
            JudgeRole::Panellist => "panellist",
            JudgeRole::Trainee => "trainee",
        })
    }
}

/// A judge allocated to a debate, with their role on the panel.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PanelMember {
    pub debate_judge: DebateJudge,
    pub judge: Judge,
    pub role: JudgeRole,
}

/// Loads the panels of the given debates: chair first, then panellists, then
/// trainees.
pub fn panels_of_debates(
    debate_ids: &[String],
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> QueryResult<Vec<PanelMember>> {
    let mut panel = tournament_debate_judges::table
        .inner_join(
            tournament_judges::table
                .on(tournament_debate_judges::judge_id.eq(tournament_judges::id)),
        )
        .filter(tournament_debate_judges::debate_id.eq_any(debate_ids))
        .select((
            tournament_debate_judges::all_columns,
            tournament_judges::all_columns,
        ))
        .load::<(DebateJudge, Judge)>(conn)?
        .into_iter()
        .map(|(debate_judge, judge)| PanelMember {
            role: debate_judge.role(),
            debate_judge,
            judge,
        })
        .collect::<Vec<_>>();

    panel.sort_by(|a, b| {
        (&a.debate_judge.debate_id, a.role, a.judge.number).cmp(&(
            &b.debate_judge.debate_id,
            b.role,
            b.judge.number,
        ))
    });

    Ok(panel)
}
