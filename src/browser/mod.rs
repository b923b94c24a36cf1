pub mod supervisor;

pub use supervisor::{BrowserHandle, BrowserState, BrowserSupervisor, LaunchOptions};
