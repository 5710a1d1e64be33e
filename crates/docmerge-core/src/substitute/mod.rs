pub mod engine;
pub mod walker;

pub use engine::{substitute_block, Replacements, Substitution};
pub use walker::{apply, WalkReport};
