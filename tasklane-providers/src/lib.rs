pub mod backend;
pub mod error;
pub mod parse;
pub mod request;
pub mod runtime;

pub use error::RemoteError;
