use std::fmt::Display;

use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The shape of ballot a vote record was cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    /// A yes/no judgment on a position's only candidate.
    Single,
    /// The pick of one candidate among several.
    Multiple,
}

impl From<VoteKind> for Bson {
    fn from(kind: VoteKind) -> Self {
        to_bson(&kind).expect("Serialisation is infallible")
    }
}

/// The value recorded against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Yes,
    No,
    Selected,
}

impl Choice {
    /// Is this choice allowed on a vote of the given kind?
    pub fn fits(self, kind: VoteKind) -> bool {
        match kind {
            VoteKind::Single => matches!(self, Self::Yes | Self::No),
            VoteKind::Multiple => self == Self::Selected,
        }
    }
}

impl Display for Choice {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Yes => "yes",
                Self::No => "no",
                Self::Selected => "selected",
            }
        )
    }
}

impl From<Choice> for Bson {
    fn from(choice: Choice) -> Self {
        to_bson(&choice).expect("Serialisation is infallible")
    }
}
