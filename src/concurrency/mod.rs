pub mod clock;
pub mod guard;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{
    change_token, evaluate_collection_read, evaluate_read, evaluate_write, next_timestamp,
    precondition_state, PreconditionState, ReadDecision, ReadOutcome, ReadPreconditions,
    WriteDecision, WritePreconditions,
};
pub use token::{ChangeToken, IfMatch};
