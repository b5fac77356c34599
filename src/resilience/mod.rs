pub mod timeout;

pub use timeout::{with_deadline, with_timeout, BranchOutcome};
