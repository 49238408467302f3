pub mod client;
pub mod credentials;
pub mod http_client;
pub mod oracle;
pub mod prompts;

pub use client::*;
pub use credentials::*;
pub use oracle::*;
