//! The poll loop and the pieces it is built from.
//!
//! This module contains:
//! - `PollLoop` - the attach / poll / re-attach state machine
//! - `SnapshotCell` - single-writer slot the loop publishes into
//! - `ShutdownSignal` - cooperative cancellation with interruptible waits
//! - `RetryStrategy` - attach retry policy

mod poll_loop;
mod publish;
mod retry;
mod shutdown;

pub use poll_loop::{LoopEvent, LoopState, PollLoop};
pub use publish::SnapshotCell;
pub use retry::{AttachBackoff, RetryStrategy};
pub use shutdown::ShutdownSignal;
