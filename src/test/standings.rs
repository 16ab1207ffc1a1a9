use diesel::SqliteConnection;
use rust_decimal::Decimal;

use crate::{
    state::save_atomically,
    test::{DebateFixture, conn, insert_tournament},
    tournaments::{
        Tournament,
        participants::JudgeRole,
        rounds::{
            Side,
            results::{ForfeitDebateResult, ResultBuffer, debate_result},
        },
        standings::{TeamMetric, TeamStandings, metrics::MetricValue},
    },
};

/// Saves a consensus result for the fixture's debate. `teams[0]` is the
/// affirmative.
fn save_consensus(
    conn: &mut SqliteConnection,
    fixture: &DebateFixture,
    aff: f32,
    neg: f32,
) {
    let mut result =
        debate_result(fixture.ballot.clone(), Some(&fixture.tournament), true, conn)
            .unwrap();
    result.set_sides(&fixture.teams, conn).unwrap();
    let consensus = result.as_consensus_mut().unwrap();
    for (team, side, score) in [(0, Side::AFF, aff), (1, Side::NEG, neg)] {
        for pos in 1..=4 {
            let _ = consensus
                .set_speaker(side, pos, fixture.speaker(team, pos))
                .unwrap();
            consensus.set_score(side, pos, Some(score)).unwrap();
        }
    }
    save_atomically(&result, conn).unwrap();
}

fn setup(conn: &mut SqliteConnection) -> (Tournament, Vec<DebateFixture>) {
    let tournament = insert_tournament(conn, "per-debate", false);
    let fixtures = (0..2)
        .map(|_| DebateFixture::new(conn, &tournament, &[JudgeRole::Chair]))
        .collect::<Vec<_>>();
    (tournament, fixtures)
}

#[test]
fn only_confirmed_ballots_count() {
    let mut conn = conn();
    let (tournament, mut fixtures) = setup(&mut conn);
    save_consensus(&mut conn, &fixtures[0], 75.0, 74.0);
    save_consensus(&mut conn, &fixtures[1], 70.0, 71.0);
    fixtures[0].ballot.confirm(&mut conn).unwrap();

    let standings =
        TeamStandings::fetch(&tournament.id, &TeamMetric::DEFAULT, &mut conn)
            .unwrap();
    assert_eq!(standings.rows.len(), 4);

    let first = &standings.rows[0];
    assert_eq!(first.team.id, fixtures[0].teams[0].id);
    assert_eq!(first.rank, 1);
    assert_eq!(
        first.values,
        vec![
            MetricValue::Integer(1),
            MetricValue::Float(Decimal::from(300)),
            MetricValue::Float(Decimal::from(4)),
        ]
    );

    let second = &standings.rows[1];
    assert_eq!(second.team.id, fixtures[0].teams[1].id);
    assert_eq!(second.rank, 2);
    assert_eq!(second.values[2], MetricValue::Float(Decimal::from(-4)));

    // the unconfirmed debate contributes nothing, so its teams tie
    for row in &standings.rows[2..] {
        assert_eq!(row.rank, 3);
        assert_eq!(
            row.values,
            vec![
                MetricValue::Integer(0),
                MetricValue::Float(Decimal::ZERO),
                MetricValue::Float(Decimal::ZERO),
            ]
        );
    }
}

#[test]
fn forfeits_count_as_wins_without_speaks() {
    let mut conn = conn();
    let (tournament, mut fixtures) = setup(&mut conn);
    save_consensus(&mut conn, &fixtures[0], 75.0, 74.0);
    fixtures[0].ballot.confirm(&mut conn).unwrap();

    let mut forfeit = ForfeitDebateResult::new(
        fixtures[1].ballot.clone(),
        &tournament,
        Side::AFF,
    )
    .unwrap();
    forfeit.full_load(&mut conn).unwrap();
    forfeit.set_sides(&fixtures[1].teams, &mut conn).unwrap();
    forfeit.save(&mut conn).unwrap();
    fixtures[1].ballot.confirm(&mut conn).unwrap();

    let standings = TeamStandings::fetch(
        &tournament.id,
        &[TeamMetric::Wins, TeamMetric::SpeakerScore, TeamMetric::Ballots],
        &mut conn,
    )
    .unwrap();
    let row_of = |team_id: &str| {
        standings
            .rows
            .iter()
            .find(|row| row.team.id == team_id)
            .unwrap()
    };

    let winner = row_of(&fixtures[1].teams[1].id);
    assert_eq!(winner.rank, 2);
    assert_eq!(
        winner.values,
        vec![
            MetricValue::Integer(1),
            MetricValue::Float(Decimal::ZERO),
            MetricValue::Integer(0),
        ]
    );
    assert_eq!(row_of(&fixtures[0].teams[0].id).rank, 1);
    assert_eq!(
        row_of(&fixtures[1].teams[0].id).values[0],
        MetricValue::Integer(0)
    );
}
