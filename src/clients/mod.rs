pub mod backend_client;
pub mod devtools_client;

pub use backend_client::BackendClient;
pub use devtools_client::{DevToolsClient, TabInfo};
