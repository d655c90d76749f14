mod client;
mod errors;
pub mod types;
pub use self::client::{Client, Operation, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use self::errors::Error;
