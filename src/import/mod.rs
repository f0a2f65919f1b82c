pub mod composer;
pub mod creator;
pub mod error;
pub mod headers;
pub mod legacy;
pub mod payload;
pub mod resolver;
pub mod retry;
pub mod row;
pub mod runner;

pub use runner::{ImportRunner, ImportSummary};
