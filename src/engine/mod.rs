//! The election state and tally engine.
//!
//! Everything in here is a pure function over already-loaded records: no
//! database handles, no clocks read behind the caller's back. The API layer
//! gathers the inputs, calls in, and persists whatever comes out.

pub mod clock;
pub mod recorder;
pub mod shape;
pub mod tally;

pub use clock::{is_voting_open, remaining_time, start_manually, stop_manually};
pub use recorder::{BallotContext, Selection, VoteError, VoteRecorder};
pub use shape::{shape_of, BallotShape};
pub use tally::{tally, ApprovalTally, PositionResult, SelectionTally, TallyOutcome};
