//! Receiver state tracking and change events

mod events;
mod tracker;
#[cfg(test)]
mod tests;

pub use events::{ChangeFilter, StateChange};
pub use tracker::StateTracker;
