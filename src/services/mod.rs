pub mod chrome_surface;
pub mod locator;
pub mod resume_store;
pub mod run_log;
pub mod surface;

pub use chrome_surface::{ChromeProvider, ChromeSettings, ChromeSurface};
pub use locator::Locator;
pub use resume_store::ResumeStore;
pub use run_log::RunLog;
pub use surface::{Surface, SurfaceProvider};
