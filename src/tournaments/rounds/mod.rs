use std::fmt;

use serde::{Deserialize, Serialize};

pub mod ballots;
pub mod debates;
pub mod results;
pub mod side_names;

/// One of the positions a team can take in a debate. Sides are stored as
/// integers; in two-team formats `0` is the affirmative and `1` the negative.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Side(pub i64);

impl Side {
    pub const AFF: Side = Side(0);
    pub const NEG: Side = Side(1);
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&side_names::name_of_side(*self, true))
    }
}
