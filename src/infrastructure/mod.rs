pub mod js_executor;
pub mod probe;

pub use js_executor::JsExecutor;
pub use probe::{Prober, TimedOut};
