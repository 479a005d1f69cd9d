pub mod drawable3d;
pub mod light;
pub mod marker;
pub mod material;
pub mod transform;

pub use drawable3d::*;
pub use light::*;
pub use marker::*;
pub use material::*;
pub use transform::*;
