pub mod engine;
pub mod merger;

pub use engine::*;
pub use merger::*;
