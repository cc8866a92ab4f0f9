pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod error;
pub mod http;
pub mod keys;
pub mod types;

pub use cached_client::EmployeeDirectory;
pub use error::{HttpError, HttpResult};
