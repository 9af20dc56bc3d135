pub mod attempt;
pub mod item_flow;

pub use attempt::{backoff_delay, Attempt, Stage};
pub use item_flow::{inter_item_delay, ItemFlow, ItemOutcome};
