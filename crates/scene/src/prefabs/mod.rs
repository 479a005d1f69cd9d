pub mod globe;
pub mod marker;

pub use globe::*;
pub use marker::*;
