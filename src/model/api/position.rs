use serde::{Deserialize, Serialize};

use crate::engine::BallotShape;
use crate::model::{
    db::{
        candidate::Candidate,
        position::{NewPosition, Position},
    },
    mongodb::{serde_hex, Id},
};

/// A position to create.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PositionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TryFrom<PositionSpec> for NewPosition {
    type Error = String;

    fn try_from(spec: PositionSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err("Position name must not be empty".to_string());
        }
        Ok(Self {
            name: name.to_string(),
            description: spec.description,
        })
    }
}

/// A user to register as a candidate for a position.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CandidateSpec {
    #[serde(with = "serde_hex")]
    pub user_id: Id,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDesc {
    #[serde(with = "serde_hex")]
    pub id: Id,
    #[serde(with = "serde_hex")]
    pub user_id: Id,
    pub name: String,
    pub photo: Option<String>,
}

impl From<Candidate> for CandidateDesc {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            user_id: candidate.candidate.user_id,
            name: candidate.candidate.name,
            photo: candidate.candidate.photo,
        }
    }
}

/// How a position appears on the ballot right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeDesc {
    Single,
    Multiple,
    /// No candidates: left off the ballot.
    Unvotable,
}

impl From<Option<BallotShape>> for ShapeDesc {
    fn from(shape: Option<BallotShape>) -> Self {
        match shape {
            Some(BallotShape::Single) => Self::Single,
            Some(BallotShape::Multiple) => Self::Multiple,
            None => Self::Unvotable,
        }
    }
}

/// A position with its live candidates and the ballot shape they imply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionDesc {
    #[serde(with = "serde_hex")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub shape: ShapeDesc,
    pub candidates: Vec<CandidateDesc>,
}

impl PositionDesc {
    pub fn new(position: Position, shape: Option<BallotShape>, candidates: Vec<Candidate>) -> Self {
        Self {
            id: position.id,
            name: position.position.name,
            description: position.position.description,
            shape: shape.into(),
            candidates: candidates.into_iter().map(CandidateDesc::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_name_required() {
        let blank = PositionSpec {
            name: "   ".to_string(),
            description: String::new(),
        };
        assert!(NewPosition::try_from(blank).is_err());

        let padded = PositionSpec {
            name: " Chair ".to_string(),
            description: "Runs meetings.".to_string(),
        };
        assert_eq!(NewPosition::try_from(padded).unwrap().name, "Chair");
    }

    #[test]
    fn shape_descriptions() {
        assert_eq!(ShapeDesc::from(None), ShapeDesc::Unvotable);
        assert_eq!(
            rocket::serde::json::serde_json::to_value(ShapeDesc::from(Some(BallotShape::Single)))
                .unwrap(),
            "single"
        );
    }
}
