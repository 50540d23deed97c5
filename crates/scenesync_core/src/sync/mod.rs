//! # Synchronization Primitives for the Load/Merge Pipeline
//!
//! ## The Problem
//!
//! ```text
//! Background thread:  LOAD assets, wait for uploads, STAGE a diff
//! Upload threads:     CREATE GPU resources for the loaded assets
//! Update thread:      MERGE the staged diff into the live scene
//!
//! Without synchronization: the renderer sees a half-uploaded resource
//! Without cancellation:    teardown hangs on a thread nobody will wake
//! ```
//!
//! ## The Solution
//!
//! ```text
//! Cycle N:
//!   Background submits uploads + one arrival per upload thread
//!   Background waits on CountdownBarrier(threads + 1)
//!   Background stages diff, resets MergeGate, blocks on it
//!   Update thread applies diff, releases MergeGate
//!
//! Teardown:
//!   cancel() on both -> every waiter returns SyncError::Cancelled
//! ```

mod barrier;
mod gate;

pub use barrier::{ArrivalTicket, CountdownBarrier};
pub use gate::MergeGate;
