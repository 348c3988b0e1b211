#![forbid(unsafe_code)]

mod canonical;
mod ids;

pub use canonical::*;
pub use ids::*;
