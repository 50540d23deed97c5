//! # SceneSync Core
//!
//! Blocking primitives shared by the background loader, the upload threads
//! and the update thread.
//!
//! ## Architecture Rules
//!
//! 1. **Every wait is cancellable** - a teardown request force-releases it
//! 2. **One-shot per cycle** - gates and barriers are reset or recreated each cycle
//! 3. **No lost wake-ups** - a release issued before the wait is still observed
//!
//! ## Example
//!
//! ```rust,ignore
//! use scenesync_core::{CountdownBarrier, MergeGate};
//!
//! let barrier = CountdownBarrier::new(upload_threads + 1);
//! // ... each upload thread calls barrier.arrive()
//! barrier.arrive_and_wait()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod sync;

pub use error::{SyncError, SyncResult};
pub use sync::{ArrivalTicket, CountdownBarrier, MergeGate};
