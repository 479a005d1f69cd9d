pub mod mat;
pub mod precision;
pub mod sphere;
pub mod vec;

pub use mat::*;
pub use precision::*;
pub use sphere::*;
pub use vec::*;
