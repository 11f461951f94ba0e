pub mod error;
pub mod renderer;

pub use error::{LightingError, Result};
pub use renderer::{Light, LightingConfig, LightingEngine, LightingShaders, Rect, SharedLight};
