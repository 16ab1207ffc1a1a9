use crate::tournaments::{Tournament, rounds::Side};

pub fn name_of_side(side: Side, short: bool) -> String {
    match (side, short) {
        (Side::AFF, true) => "Aff",
        (Side::AFF, false) => "Affirmative",
        (Side::NEG, true) => "Neg",
        (Side::NEG, false) => "Negative",
        (Side(n), _) => return format!("Side {n}"),
    }
    .into()
}

pub fn name_of_position(tournament: &Tournament, position: i64) -> String {
    if tournament.reply_position() == Some(position) {
        return "Reply".into();
    }

    let suffix = match (position % 10, position % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{position}{suffix}")
}

/// Side names paired with the names of each speaker position, in order.
pub fn side_and_position_names(
    tournament: &Tournament,
) -> Vec<(Side, String, Vec<(i64, String)>)> {
    let positions = tournament
        .positions()
        .into_iter()
        .map(|pos| (pos, name_of_position(tournament, pos)))
        .collect::<Vec<_>>();

    tournament
        .sides()
        .into_iter()
        .map(|side| (side, name_of_side(side, false), positions.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::sample_tournament;

    #[test]
    fn position_names() {
        let tournament = sample_tournament(3, true, "per-debate");
        let names = tournament
            .positions()
            .into_iter()
            .map(|pos| name_of_position(&tournament, pos))
            .collect::<Vec<_>>();
        assert_eq!(names, ["1st", "2nd", "3rd", "Reply"]);
    }

    #[test]
    fn side_names_fall_back_to_number() {
        assert_eq!(name_of_side(Side::AFF, false), "Affirmative");
        assert_eq!(name_of_side(Side::NEG, true), "Neg");
        assert_eq!(name_of_side(Side(3), true), "Side 3");
    }
}
