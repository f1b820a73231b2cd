pub mod memory;
mod pagination;
mod repository;

pub use pagination::*;
pub use repository::*;
