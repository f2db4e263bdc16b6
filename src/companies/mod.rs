pub mod loader;
pub mod ladder;

pub use loader::{Company, CompanyLoader};
pub use ladder::CompanyLadder;
