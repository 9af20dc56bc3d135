pub mod resume_state;
pub mod work_item;

pub use resume_state::ResumeState;
pub use work_item::{assign_output, discover_work_items, WorkItem};
