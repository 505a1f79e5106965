//! Item streaming: per-subreddit pagination and the demand-driven fan-in.
//!
//! - [`worker`] - pagination state machine for one subreddit
//! - [`fan_in`] - merges N workers behind a single event channel

pub mod fan_in;
pub mod worker;

pub use fan_in::{FanInStream, StreamEvent};
pub use worker::{ListingState, PageSettings, SubredditWorker};
