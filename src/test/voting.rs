use diesel::SqliteConnection;
use rust_decimal::Decimal;

use crate::{
    state::save_atomically,
    test::{DebateFixture, conn, insert_tournament, score_row_counts},
    tournaments::{
        participants::{Judge, JudgeRole},
        rounds::{
            Side,
            results::{
                DebateResult, ResultBuffer, ResultError, ResultStatus,
                VotingDebateResult, debate_result,
                records::team_scores_of_ballot,
                speakers::SpeakerAssignment,
            },
        },
    },
};

const POSITIONS: [i64; 4] = [1, 2, 3, 4];

/// A loaded voting result with sides and speakers set, but no scores.
fn voting_result(
    conn: &mut SqliteConnection,
    roles: &[JudgeRole],
    margin_includes_dissenters: bool,
) -> (DebateFixture, VotingDebateResult) {
    let tournament =
        insert_tournament(conn, "per-adjudicator", margin_includes_dissenters);
    let fixture = DebateFixture::new(conn, &tournament, roles);

    let mut result =
        debate_result(fixture.ballot.clone(), Some(&tournament), true, conn)
            .unwrap();
    result.set_sides(&fixture.teams, conn).unwrap();
    let DebateResult::Voting(mut result) = result else {
        panic!("expected a voting result");
    };

    for (team, side) in [Side::AFF, Side::NEG].into_iter().enumerate() {
        for pos in POSITIONS {
            assert_eq!(
                result
                    .set_speaker(side, pos, fixture.speaker(team, pos))
                    .unwrap(),
                SpeakerAssignment::Assigned
            );
        }
    }

    (fixture, result)
}

fn fill_sheet(result: &mut VotingDebateResult, judge: &Judge, aff: f32, neg: f32) {
    for pos in POSITIONS {
        result.set_score(&judge.id, Side::AFF, pos, Some(aff)).unwrap();
        result.set_score(&judge.id, Side::NEG, pos, Some(neg)).unwrap();
    }
}

#[test]
fn three_judge_majority() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(
        &mut conn,
        &[JudgeRole::Chair, JudgeRole::Panellist, JudgeRole::Panellist],
        false,
    );
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);
    fill_sheet(&mut result, &fixture.panel[1], 76.0, 73.0);
    fill_sheet(&mut result, &fixture.panel[2], 70.0, 72.0);

    assert!(result.is_valid());
    assert_eq!(result.winning_side().unwrap(), Some(Side::AFF));
    assert_eq!(result.winning_team().unwrap(), Some(&fixture.teams[0]));
    assert_eq!(result.votes_given(Side::AFF).unwrap(), Some(2));
    assert_eq!(result.votes_given(Side::NEG).unwrap(), Some(1));
    assert_eq!(result.votes_possible(Side::AFF), 3);
    assert_eq!(result.points(Side::AFF).unwrap(), Some(1));
    assert_eq!(result.points(Side::NEG).unwrap(), Some(0));
    assert!(!result.decision().unwrap().casting_vote);

    // only the majority counts towards scores
    assert_eq!(result.score(Side::AFF).unwrap(), Some(Decimal::from(302)));
    assert_eq!(result.score(Side::NEG).unwrap(), Some(Decimal::from(294)));
    assert_eq!(result.margin(Side::AFF).unwrap(), Some(Decimal::from(8)));
    assert_eq!(result.margin(Side::NEG).unwrap(), Some(Decimal::from(-8)));
    assert_eq!(
        result.get_speaker_score(Side::AFF, 1).unwrap(),
        Some(Decimal::new(755, 1))
    );

    let splits = result
        .adjudicators_with_splits()
        .unwrap()
        .map(|(judge, _, split)| (judge.id.clone(), split))
        .collect::<Vec<_>>();
    assert_eq!(
        splits,
        [
            (fixture.panel[0].id.clone(), false),
            (fixture.panel[1].id.clone(), false),
            (fixture.panel[2].id.clone(), true),
        ]
    );
}

#[test]
fn chair_breaks_split_panel() {
    let mut conn = conn();
    let (fixture, mut result) =
        voting_result(&mut conn, &[JudgeRole::Chair, JudgeRole::Panellist], false);
    fill_sheet(&mut result, &fixture.panel[0], 74.0, 75.0);
    fill_sheet(&mut result, &fixture.panel[1], 76.0, 73.0);

    assert_eq!(result.winning_side().unwrap(), Some(Side::NEG));
    assert!(result.decision().unwrap().casting_vote);
    let majority = result.majority_adjudicators().unwrap();
    assert_eq!(majority, [&fixture.panel[0]]);
    assert_eq!(result.votes_given(Side::AFF).unwrap(), Some(1));
    assert_eq!(result.votes_given(Side::NEG).unwrap(), Some(1));
}

#[test]
fn dissenters_count_when_configured() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(
        &mut conn,
        &[JudgeRole::Chair, JudgeRole::Panellist, JudgeRole::Panellist],
        true,
    );
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);
    fill_sheet(&mut result, &fixture.panel[1], 76.0, 73.0);
    fill_sheet(&mut result, &fixture.panel[2], 70.0, 72.0);

    assert_eq!(result.relevant_adjudicators().unwrap().len(), 3);
    assert_eq!(result.score(Side::NEG).unwrap(), Some(Decimal::from(292)));
    let aff = result.margin(Side::AFF).unwrap().unwrap();
    let neg = result.margin(Side::NEG).unwrap().unwrap();
    assert!(aff > Decimal::ZERO);
    assert_eq!(aff, -neg);
}

#[test]
fn trainees_have_no_scoresheet_and_never_split() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(
        &mut conn,
        &[JudgeRole::Chair, JudgeRole::Trainee],
        false,
    );
    assert!(matches!(
        result.set_score(&fixture.panel[1].id, Side::AFF, 1, Some(75.0)),
        Err(ResultError::UnknownAdjudicator(_))
    ));

    fill_sheet(&mut result, &fixture.panel[0], 72.0, 75.0);
    assert_eq!(result.votes_possible(Side::AFF), 1);

    let splits = result.adjudicators_with_splits().unwrap().collect::<Vec<_>>();
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[1].1, JudgeRole::Trainee);
    assert!(!splits[1].2);
}

#[test]
fn incomplete_result_gives_defaults() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(
        &mut conn,
        &[JudgeRole::Chair, JudgeRole::Panellist, JudgeRole::Panellist],
        false,
    );
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);

    assert!(!result.is_complete());
    assert_eq!(result.status(), ResultStatus::Missing);
    assert_eq!(result.winning_side().unwrap(), None);
    assert!(result.majority_adjudicators().unwrap().is_empty());
    assert_eq!(result.points(Side::AFF).unwrap(), None);
    assert_eq!(result.margin(Side::AFF).unwrap(), None);
    assert_eq!(result.votes_possible(Side::NEG), 3);
    assert!(matches!(
        result.decision(),
        Err(ResultError::InvalidResult(_))
    ));
}

#[test]
fn panel_without_chair_is_never_complete() {
    let mut conn = conn();
    let (fixture, mut result) =
        voting_result(&mut conn, &[JudgeRole::Panellist], false);
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);

    assert!(result.scoresheet(&fixture.panel[0].id).unwrap().is_valid());
    assert!(!result.is_complete());
}

#[test]
fn tied_scoresheet_is_erroneous_and_cannot_be_saved() {
    let mut conn = conn();
    let (fixture, mut result) =
        voting_result(&mut conn, &[JudgeRole::Chair, JudgeRole::Panellist], false);
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);
    fill_sheet(&mut result, &fixture.panel[1], 74.0, 74.0);

    assert!(result.is_complete());
    assert!(!result.is_valid());
    assert_eq!(result.status(), ResultStatus::Erroneous);
    assert!(matches!(
        result.winning_side(),
        Err(ResultError::InvalidResult(_))
    ));

    let result = DebateResult::Voting(result);
    assert!(matches!(
        save_atomically(&result, &mut conn),
        Err(ResultError::InvalidResult("save"))
    ));
    assert_eq!(score_row_counts(&mut conn), [0, 0, 0]);
}

#[test]
fn decision_follows_later_edits() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(&mut conn, &[JudgeRole::Chair], false);
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);
    assert_eq!(result.winning_side().unwrap(), Some(Side::AFF));

    fill_sheet(&mut result, &fixture.panel[0], 73.0, 74.0);
    assert_eq!(result.winning_side().unwrap(), Some(Side::NEG));
}

#[test]
fn speakers_from_the_other_team_are_rejected() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(&mut conn, &[JudgeRole::Chair], false);
    let before = result.get_speaker(Side::AFF, 2).unwrap().cloned();

    let assignment = result
        .set_speaker(Side::AFF, 2, fixture.speaker(1, 2))
        .unwrap();
    assert_eq!(assignment, SpeakerAssignment::Rejected);
    assert_eq!(result.get_speaker(Side::AFF, 2).unwrap().cloned(), before);
}

#[test]
fn set_sides_checks_the_teams() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(&mut conn, &[JudgeRole::Chair], false);

    assert!(matches!(
        result.set_sides(&fixture.teams[..1], &mut conn),
        Err(ResultError::WrongTeamCount { expected: 2, got: 1 })
    ));

    let mut stranger = fixture.teams[1].clone();
    stranger.id = "not-in-this-debate".into();
    assert!(matches!(
        result.set_sides(&[fixture.teams[0].clone(), stranger], &mut conn),
        Err(ResultError::TeamNotInDebate { .. })
    ));

    // swapping sides is written straight away
    let swapped = [fixture.teams[1].clone(), fixture.teams[0].clone()];
    result.set_sides(&swapped, &mut conn).unwrap();
    assert_eq!(result.team(Side::AFF).unwrap().team, fixture.teams[1]);
    let reloaded = DebateResult::fetch(&fixture.ballot.id, &mut conn).unwrap();
    assert_eq!(
        reloaded.as_voting().unwrap().team(Side::AFF).unwrap().team,
        fixture.teams[1]
    );
}

#[test]
fn save_round_trips_and_is_idempotent() {
    let mut conn = conn();
    let (fixture, mut result) = voting_result(
        &mut conn,
        &[JudgeRole::Chair, JudgeRole::Panellist, JudgeRole::Panellist],
        false,
    );
    fill_sheet(&mut result, &fixture.panel[0], 75.0, 74.0);
    fill_sheet(&mut result, &fixture.panel[1], 76.0, 73.0);
    fill_sheet(&mut result, &fixture.panel[2], 70.0, 72.0);
    result.set_ghost(Side::NEG, 4, true).unwrap();

    let result = DebateResult::Voting(result);
    save_atomically(&result, &mut conn).unwrap();
    assert_eq!(score_row_counts(&mut conn), [2, 8, 24]);

    let reloaded = DebateResult::fetch(&fixture.ballot.id, &mut conn).unwrap();
    assert!(reloaded.identical(&result));
    assert!(reloaded.as_voting().unwrap().get_ghost(Side::NEG, 4).unwrap());
    assert_eq!(reloaded.status(), ResultStatus::Valid);

    save_atomically(&reloaded, &mut conn).unwrap();
    assert_eq!(score_row_counts(&mut conn), [2, 8, 24]);

    let aff_team = result.as_voting().unwrap().team(Side::AFF).unwrap();
    let rows = team_scores_of_ballot(&fixture.ballot.id, &mut conn).unwrap();
    let aff = rows
        .iter()
        .find(|row| row.debate_team_id == aff_team.debate_team.id)
        .unwrap();
    assert_eq!(aff.points, Some(1));
    assert_eq!(aff.win, Some(true));
    assert_eq!(aff.score, Some(302.0));
    assert_eq!(aff.margin, Some(8.0));
    assert_eq!(aff.votes_given, Some(2));
    assert_eq!(aff.votes_possible, Some(3));
    assert!(!aff.forfeit);
}
