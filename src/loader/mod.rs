//! Source table loading

pub mod reader;

pub use reader::{load, load_from_reader, ResolvedColumns};
