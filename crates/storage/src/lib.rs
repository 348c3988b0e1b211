#![forbid(unsafe_code)]

mod cas;
mod store;

pub use cas::ContentStore;
pub use store::*;
