pub mod mesh;
pub mod renderer;

pub use mesh::*;
pub use renderer::*;
