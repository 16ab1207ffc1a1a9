use crate::{
    state::save_atomically,
    test::{DebateFixture, conn, insert_tournament, score_row_counts},
    tournaments::{
        participants::JudgeRole,
        rounds::{
            Side,
            ballots::Ballot,
            results::{
                DebateResult, ForfeitDebateResult, ResultBuffer, ResultError,
                ResultStatus, prefetch::populate_results,
                records::team_scores_of_ballot,
            },
        },
    },
};

#[test]
fn the_side_that_did_not_forfeit_wins() {
    let mut conn = conn();
    let tournament = insert_tournament(&mut conn, "per-adjudicator", false);
    let fixture = DebateFixture::new(&mut conn, &tournament, &[JudgeRole::Chair]);

    let mut result =
        ForfeitDebateResult::new(fixture.ballot.clone(), &tournament, Side::NEG)
            .unwrap();
    result.full_load(&mut conn).unwrap();
    assert_eq!(result.status(), ResultStatus::Missing);

    result.set_sides(&fixture.teams, &mut conn).unwrap();
    assert_eq!(result.status(), ResultStatus::Valid);
    assert_eq!(result.winning_side(), Some(Side::AFF));
    assert_eq!(result.winning_team(), Some(&fixture.teams[0]));
    assert_eq!(result.points(Side::AFF), 1);
    assert_eq!(result.points(Side::NEG), 0);
    assert!(!result.win(Side::NEG));

    let result = DebateResult::Forfeit(result);
    assert!(!result.has_speakers());
    save_atomically(&result, &mut conn).unwrap();
    assert_eq!(score_row_counts(&mut conn), [2, 0, 0]);

    let rows = team_scores_of_ballot(&fixture.ballot.id, &mut conn).unwrap();
    let forfeit = result.as_forfeit().unwrap();
    let aff_id = &forfeit.team(Side::AFF).unwrap().debate_team.id;
    for row in rows {
        let aff = &row.debate_team_id == aff_id;
        assert_eq!(row.points, Some(i64::from(aff)));
        assert_eq!(row.win, Some(aff));
        assert_eq!(row.forfeit, !aff);
        assert_eq!(row.margin, None);
        assert_eq!(row.score, None);
        assert_eq!(row.votes_given, None);
    }
}

#[test]
fn unknown_forfeiter_is_rejected() {
    let mut conn = conn();
    let tournament = insert_tournament(&mut conn, "per-debate", false);
    let fixture = DebateFixture::new(&mut conn, &tournament, &[JudgeRole::Chair]);

    assert!(matches!(
        ForfeitDebateResult::new(fixture.ballot, &tournament, Side(2)),
        Err(ResultError::UnknownSide(Side(2)))
    ));
}

#[test]
fn unbound_forfeit_cannot_be_saved() {
    let mut conn = conn();
    let tournament = insert_tournament(&mut conn, "per-debate", false);
    let fixture = DebateFixture::new(&mut conn, &tournament, &[JudgeRole::Chair]);

    let mut result =
        ForfeitDebateResult::new(fixture.ballot, &tournament, Side::AFF).unwrap();
    result.full_load(&mut conn).unwrap();
    assert_eq!(result.winning_side(), Some(Side::NEG));
    assert_eq!(result.winning_team(), None);
    assert!(matches!(
        save_atomically(&DebateResult::Forfeit(result), &mut conn),
        Err(ResultError::InvalidResult(_))
    ));
    assert_eq!(score_row_counts(&mut conn), [0, 0, 0]);
}

#[test]
fn saved_forfeit_loads_back_as_a_forfeit() {
    let mut conn = conn();
    let tournament = insert_tournament(&mut conn, "per-adjudicator", false);
    let mut fixture =
        DebateFixture::new(&mut conn, &tournament, &[JudgeRole::Chair]);

    let mut forfeit =
        ForfeitDebateResult::new(fixture.ballot.clone(), &tournament, Side::NEG)
            .unwrap();
    forfeit.full_load(&mut conn).unwrap();
    forfeit.set_sides(&fixture.teams, &mut conn).unwrap();
    let saved = DebateResult::Forfeit(forfeit);
    save_atomically(&saved, &mut conn).unwrap();
    fixture.ballot.confirm(&mut conn).unwrap();

    let reloaded = DebateResult::fetch(&fixture.ballot.id, &mut conn).unwrap();
    assert_eq!(reloaded.as_forfeit().unwrap().forfeiter(), Side::NEG);
    assert!(reloaded.identical(&saved));
    assert_eq!(reloaded.status(), ResultStatus::Valid);
    assert_eq!(reloaded.winning_team().unwrap(), Some(&fixture.teams[0]));

    // saving it again leaves the rows as they were
    let before = team_scores_of_ballot(&fixture.ballot.id, &mut conn).unwrap();
    save_atomically(&reloaded, &mut conn).unwrap();
    let after = team_scores_of_ballot(&fixture.ballot.id, &mut conn).unwrap();
    assert_eq!(before, after);
    assert_eq!(score_row_counts(&mut conn), [2, 0, 0]);

    let confirmed = Ballot::confirmed_of_tournament(&tournament.id, &mut conn).unwrap();
    let results = populate_results(confirmed, &tournament, &mut conn).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].identical(&saved));
    assert_eq!(results[0].status(), ResultStatus::Valid);
}
