pub mod client;
pub mod error;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod stream;

pub use client::{ApiClient, ByteStream};
pub use error::ApiError;
pub use stream::StreamParser;
