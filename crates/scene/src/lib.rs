pub mod animation;
pub mod assets;
pub mod camera;
pub mod components;
pub mod config;
pub mod context;
pub mod entity;
pub mod geolocation;
pub mod interaction;
pub mod orbit;
pub mod picking;
pub mod prefabs;
pub mod rotation;
pub mod world;

pub use config::GlobeConfig;
pub use context::{GlobeNodes, SceneContext};
pub use world::*;
