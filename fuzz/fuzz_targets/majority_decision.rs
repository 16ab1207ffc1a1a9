//! Feeds arbitrary panel votes to the majority decision. Each vote is true
//! for the affirmative; the chair is picked by index into the votes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tally::tournaments::rounds::{Side, results::voting::majority_decision};

const SIDES: [Side; 2] = [Side::AFF, Side::NEG];

fuzz_target!(|input: (Vec<bool>, Option<u8>)| {
    let (ballots, chair) = input;
    let votes = ballots
        .iter()
        .enumerate()
        .map(|(i, aff)| (i.to_string(), if *aff { Side::AFF } else { Side::NEG }))
        .collect::<Vec<_>>();
    let chair = chair
        .map(usize::from)
        .filter(|i| *i < votes.len())
        .map(|i| i.to_string());

    let aff = votes.iter().filter(|(_, side)| *side == Side::AFF).count();
    let neg = votes.len() - aff;

    match majority_decision(&SIDES, &votes, chair.as_deref()) {
        Ok(decision) => {
            assert_eq!(decision.votes_for(Side::AFF), aff);
            assert_eq!(decision.votes_for(Side::NEG), neg);
            assert_eq!(decision.casting_vote, aff == neg);
            if aff != neg {
                let expected = if aff > neg { Side::AFF } else { Side::NEG };
                assert_eq!(decision.winner, expected);
            }
        }
        Err(_) => assert!(aff == neg && chair.is_none()),
    }
});
