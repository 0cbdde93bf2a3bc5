use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::engine::shape::{shape_of, BallotShape};
use crate::model::{
    common::vote::Choice,
    db::{candidate::Candidate, position::Position, vote::Vote},
    mongodb::{serde_hex, Id},
};

/// The result of a position with exactly one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTally {
    #[serde(with = "serde_hex")]
    pub candidate_id: Id,
    pub candidate_name: String,
    pub yes_count: u64,
    pub no_count: u64,
    /// `yes_count + no_count`.
    pub total: u64,
    /// Share of yes votes, truncated to a whole percent.
    pub yes_percentage: u32,
}

impl ApprovalTally {
    /// Share of yes votes, unrounded. Zero if nobody voted.
    pub fn exact_yes_percentage(&self) -> f64 {
        percent(self.yes_count, self.total)
    }
}

/// One candidate's result in a position with several candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTally {
    #[serde(with = "serde_hex")]
    pub candidate_id: Id,
    pub candidate_name: String,
    pub selected_count: u64,
    /// Distinct voters who cast a ballot for the position, whoever they chose.
    pub total_ballots: u64,
}

impl SelectionTally {
    /// Share of the position's ballots that chose this candidate. Zero if nobody voted.
    pub fn percentage(&self) -> f64 {
        percent(self.selected_count, self.total_ballots)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum TallyOutcome {
    #[serde(rename = "single")]
    Approval(ApprovalTally),
    #[serde(rename = "multiple")]
    Selection { candidates: Vec<SelectionTally> },
    /// No candidates, so nothing to count.
    Unvotable,
}

/// The aggregated result of one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionResult {
    #[serde(with = "serde_hex")]
    pub position_id: Id,
    pub position_name: String,
    #[serde(flatten)]
    pub outcome: TallyOutcome,
}

/// Aggregate the votes cast for `position`.
///
/// `candidates` are the position's current candidates and decide how votes
/// are counted. `votes` may contain votes for other positions; they are
/// ignored. Votes whose kind does not match the current shape are not
/// counted for any candidate, but their voters still count towards
/// `total_ballots`.
pub fn tally(position: &Position, candidates: &[Candidate], votes: &[Vote]) -> PositionResult {
    let outcome = match shape_of(candidates.len()) {
        None => TallyOutcome::Unvotable,
        Some(shape) => {
            let kind = shape.vote_kind();
            let for_position: Vec<&Vote> = votes
                .iter()
                .filter(|v| v.position_id == position.id)
                .collect();
            let count = |candidate: &Candidate, choice: Choice| {
                for_position
                    .iter()
                    .filter(|v| {
                        v.kind == kind && v.candidate_id == candidate.id && v.choice == choice
                    })
                    .count() as u64
            };

            match shape {
                BallotShape::Single => {
                    let candidate = &candidates[0];
                    let yes_count = count(candidate, Choice::Yes);
                    let no_count = count(candidate, Choice::No);
                    let total = yes_count + no_count;
                    TallyOutcome::Approval(ApprovalTally {
                        candidate_id: candidate.id,
                        candidate_name: candidate.name.clone(),
                        yes_count,
                        no_count,
                        total,
                        yes_percentage: (yes_count * 100).checked_div(total).unwrap_or(0) as u32,
                    })
                }
                BallotShape::Multiple => {
                    // Every voter on this position, including those whose
                    // vote predates the current shape.
                    let total_ballots = for_position
                        .iter()
                        .map(|v| v.voter_id)
                        .collect::<HashSet<_>>()
                        .len() as u64;
                    TallyOutcome::Selection {
                        candidates: candidates
                            .iter()
                            .map(|candidate| SelectionTally {
                                candidate_id: candidate.id,
                                candidate_name: candidate.name.clone(),
                                selected_count: count(candidate, Choice::Selected),
                                total_ballots,
                            })
                            .collect(),
                    }
                }
            }
        }
    };

    PositionResult {
        position_id: position.id,
        position_name: position.name.clone(),
        outcome,
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rocket::serde::json::serde_json;

    use crate::model::db::{position::PositionCore, vote::VoteCore};

    use super::*;

    fn position(core: PositionCore) -> Position {
        Position {
            id: Id::new(),
            position: core,
        }
    }

    fn stored(vote: VoteCore) -> Vote {
        Vote {
            id: Id::new(),
            vote,
        }
    }

    fn pick(voter: Id, position: &Position, candidate: &Candidate) -> Vote {
        let vote = VoteCore::multiple(voter, position.id, candidate.id, Utc::now());
        stored(vote)
    }

    fn judge(voter: Id, position: &Position, candidate: &Candidate, choice: Choice) -> Vote {
        let vote = VoteCore::single(voter, position.id, candidate.id, choice, Utc::now());
        stored(vote.unwrap())
    }

    fn selections(result: &PositionResult) -> &[SelectionTally] {
        match &result.outcome {
            TallyOutcome::Selection { candidates } => candidates,
            other => panic!("expected a selection tally, got {other:?}"),
        }
    }

    fn approval(result: &PositionResult) -> &ApprovalTally {
        match &result.outcome {
            TallyOutcome::Approval(approval) => approval,
            other => panic!("expected an approval tally, got {other:?}"),
        }
    }

    #[test]
    fn secretary_with_one_ballot() {
        let secretary = position(PositionCore::secretary());
        let a = Candidate::example("A", secretary.id);
        let b = Candidate::example("B", secretary.id);
        let votes = vec![pick(Id::new(), &secretary, &a)];

        let result = tally(&secretary, &[a.clone(), b.clone()], &votes);
        assert_eq!(result.position_name, "Secretary");

        let rows = selections(&result);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].candidate_id, a.id);
        assert_eq!(rows[0].selected_count, 1);
        assert_eq!(rows[0].total_ballots, 1);
        assert_eq!(rows[1].candidate_id, b.id);
        assert_eq!(rows[1].selected_count, 0);
        assert_eq!(rows[1].total_ballots, 1);
        assert_eq!(rows[0].percentage(), 100.0);
        assert_eq!(rows[1].percentage(), 0.0);
    }

    #[test]
    fn treasurer_with_one_yes() {
        let treasurer = position(PositionCore::treasurer());
        let c = Candidate::example("C", treasurer.id);
        let votes = vec![judge(Id::new(), &treasurer, &c, Choice::Yes)];

        let result = tally(&treasurer, &[c.clone()], &votes);
        let row = approval(&result);
        assert_eq!(row.candidate_id, c.id);
        assert_eq!(row.yes_count, 1);
        assert_eq!(row.no_count, 0);
        assert_eq!(row.total, 1);
        assert_eq!(row.yes_percentage, 100);
    }

    #[test]
    fn yes_percentage_is_truncated() {
        let treasurer = position(PositionCore::treasurer());
        let c = Candidate::example("C", treasurer.id);
        let votes = vec![
            judge(Id::new(), &treasurer, &c, Choice::Yes),
            judge(Id::new(), &treasurer, &c, Choice::Yes),
            judge(Id::new(), &treasurer, &c, Choice::No),
        ];

        let result = tally(&treasurer, &[c], &votes);
        let row = approval(&result);
        assert_eq!(row.total, 3);
        assert_eq!(row.yes_percentage, 66);
        assert!((row.exact_yes_percentage() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn total_ballots_counts_voters_not_selections() {
        let secretary = position(PositionCore::secretary());
        let a = Candidate::example("A", secretary.id);
        let b = Candidate::example("B", secretary.id);
        let c = Candidate::example("C", secretary.id);
        let votes = vec![
            pick(Id::new(), &secretary, &a),
            pick(Id::new(), &secretary, &a),
            pick(Id::new(), &secretary, &b),
        ];

        let result = tally(&secretary, &[a, b, c], &votes);
        let rows = selections(&result);
        assert!(rows.iter().all(|row| row.total_ballots == 3));
        let selected: Vec<u64> = rows.iter().map(|row| row.selected_count).collect();
        assert_eq!(selected, vec![2, 1, 0]);
    }

    #[test]
    fn stale_kinds_count_as_ballots_only() {
        let secretary = position(PositionCore::secretary());
        let treasurer = position(PositionCore::treasurer());
        let a = Candidate::example("A", secretary.id);
        let b = Candidate::example("B", secretary.id);
        let t = Candidate::example("T", treasurer.id);
        let voter = Id::new();
        let votes = vec![
            judge(voter, &treasurer, &t, Choice::Yes),
            // Cast while A was still the only candidate.
            judge(Id::new(), &secretary, &a, Choice::No),
            pick(voter, &secretary, &b),
        ];

        let result = tally(&secretary, &[a, b], &votes);
        let rows = selections(&result);
        assert_eq!(rows[0].selected_count, 0);
        assert_eq!(rows[1].selected_count, 1);
        // The treasurer vote is not a secretary ballot; the stale one is.
        assert!(rows.iter().all(|row| row.total_ballots == 2));
        assert_eq!(rows[1].percentage(), 50.0);
    }

    #[test]
    fn stale_yes_vote_still_counts_towards_ballots() {
        let secretary = position(PositionCore::secretary());
        let a = Candidate::example("A", secretary.id);
        let b = Candidate::example("B", secretary.id);
        let votes = vec![
            judge(Id::new(), &secretary, &a, Choice::Yes),
            pick(Id::new(), &secretary, &b),
        ];

        let result = tally(&secretary, &[a, b], &votes);
        let rows = selections(&result);
        assert_eq!(rows[0].selected_count, 0);
        assert_eq!(rows[1].selected_count, 1);
        assert_eq!(rows[1].total_ballots, 2);
    }

    #[test]
    fn empty_positions() {
        let auditor = position(PositionCore::auditor());
        assert_eq!(tally(&auditor, &[], &[]).outcome, TallyOutcome::Unvotable);

        let treasurer = position(PositionCore::treasurer());
        let c = Candidate::example("C", treasurer.id);
        let result = tally(&treasurer, &[c], &[]);
        let row = approval(&result);
        assert_eq!(row.total, 0);
        assert_eq!(row.yes_percentage, 0);
        assert_eq!(row.exact_yes_percentage(), 0.0);

        let secretary = position(PositionCore::secretary());
        let a = Candidate::example("A", secretary.id);
        let b = Candidate::example("B", secretary.id);
        let result = tally(&secretary, &[a, b], &[]);
        assert!(selections(&result)
            .iter()
            .all(|row| row.total_ballots == 0 && row.percentage() == 0.0));
    }

    #[test]
    fn tally_is_idempotent() {
        let secretary = position(PositionCore::secretary());
        let a = Candidate::example("A", secretary.id);
        let b = Candidate::example("B", secretary.id);
        let candidates = [a.clone(), b];
        let votes = vec![pick(Id::new(), &secretary, &a)];

        assert_eq!(
            tally(&secretary, &candidates, &votes),
            tally(&secretary, &candidates, &votes)
        );
    }

    #[test]
    fn serialised_with_shape_tag() {
        let treasurer = position(PositionCore::treasurer());
        let c = Candidate::example("C", treasurer.id);
        let result = tally(&treasurer, &[c], &[]);
        let json = serde_json::to_value(result).unwrap();
        assert_eq!(json["shape"], "single");
        assert_eq!(json["position_id"], treasurer.id.to_string());
        assert_eq!(json["yes_percentage"], 0);
    }
}
