pub mod session;

pub use session::{check_profile_lock, connect_to_browser, launch_browser, BrowserSession};
