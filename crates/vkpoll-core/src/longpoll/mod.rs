//! Long-poll session state machine and the update stream built on top of it.

pub mod session;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use session::{ChangePointer, LongPollKind, LongPollSession, PollOutcome, PollParams};
pub use stream::UpdateStream;
