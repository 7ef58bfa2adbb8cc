pub mod company;
pub mod country;
pub mod taxonomy;

pub use company::*;
pub use country::*;
pub use taxonomy::*;
