//! The interpolation network assembled from the pyramid, plus its driver entry points.

pub mod config;
pub mod estimate;
pub mod model;
pub mod synthesis;

pub use config::{NetworkConfig, build_thread_pool};
pub use estimate::{Interpolator, estimate, frame_from_image, frame_to_image};
pub use model::{Network, NetworkPlan};
