pub mod assets;
pub mod logo;
pub mod storage;

pub use assets::*;
pub use logo::*;
pub use storage::*;
