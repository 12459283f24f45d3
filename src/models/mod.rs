pub mod country;
pub mod raw;

pub use country::*;
pub use raw::*;
