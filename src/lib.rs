//! Globe core: equirectangular maps on a rotatable sphere.
//!
//! - [`tessellate`] turns a map into lat/lon quad strips for the renderer.
//! - [`rotation`] maps lat/lon through the viewer's yaw/tilt and back.
//! - [`reproject`] flattens the current orientation into a new map.
//!
//! Windowing, GPU and UI live in the binary; this crate only exchanges
//! images, orientation deltas and vertex streams with it.

pub mod config;
pub mod equirect;
pub mod error;
pub mod maps;
pub mod orientation;
pub mod reproject;
pub mod rotation;
pub mod tessellate;

pub use config::{ControlScheme, GlobeConfig, GridResolution};
pub use equirect::EquirectangularImage;
pub use error::{GlobeError, Result};
pub use orientation::{ControlEvent, OrientationState};
pub use reproject::{reproject, ReprojectOptions};
pub use rotation::SphericalRotation;
pub use tessellate::{tessellate, BandColoring, QuadStrip, SphereVertex};
