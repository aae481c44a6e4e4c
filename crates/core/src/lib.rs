// crates/core/src/lib.rs
pub mod error;
pub mod ids;
pub mod paths;
pub mod timestamp;
pub mod types;

pub use error::*;
pub use types::*;
