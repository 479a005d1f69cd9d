pub mod frame;
pub mod interval;
pub mod scheduler;

pub use frame::*;
pub use interval::*;
pub use scheduler::*;
