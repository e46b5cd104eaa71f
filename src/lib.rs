//! # Connectors
//!
//! A small physics scene: coloured balls ("connectors") that are pulled
//! toward the origin every frame and pushed around by a kinematic pointer
//! that follows the mouse.
//!
//! ## Quick Start
//!
//! ```no_run
//! use connectors::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     Simulation::new()
//!         .with_seed(7)
//!         .with_orbit(true)
//!         .run()
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Controllers
//!
//! Each frame three small controllers run against the physics world:
//!
//! - [`PointerController`] maps the mouse to a point on the `z = 0` plane and
//!   moves the pointer body there.
//! - [`ConnectorController`] applies a restoring impulse `-k * position` to
//!   its connector, with `k` depending on the collider shape.
//! - [`ColorAnimator`] eases each connector's colour toward its target.
//!
//! Controllers only see bodies through [`RigidBodyProxy`], so they can be
//! tested without a world.
//!
//! ### Scenes
//!
//! A [`SceneConfig`] (plain data, loadable from JSON) is turned into a
//! [`Scene`] by [`Scene::compose`]. Random spawn positions are drawn once,
//! from the config's seed. [`SceneRunner`] mounts the scene in a
//! [`PhysicsWorld`] and ticks it:
//!
//! ```
//! use connectors::prelude::*;
//!
//! let mut runner = SceneRunner::new(SceneConfig::default()).unwrap();
//! let input = InputSample::new(Vec2::ZERO, Viewport::new(10.0, 8.0));
//! for _ in 0..120 {
//!     runner.tick(&input, 1.0 / 60.0);
//! }
//! assert!(runner.mean_distance_to_origin() < 5.0);
//! ```
//!
//! ## Controls
//!
//! | Input | Action |
//! |-------|--------|
//! | Mouse | Move the pointer |
//! | Left drag | Orbit the camera |
//! | Right drag | Pan |
//! | Scroll | Zoom |
//! | `Space` | Pause |
//! | `R` | Reset |
//! | `G` | Toggle the axis gizmo |
//! | `O` | Toggle orbit controls |
//! | `Esc` | Quit |

mod body;
pub mod camera;
pub mod color;
pub mod config;
pub mod connector;
pub mod error;
mod gpu;
pub mod input;
pub mod physics;
pub mod pointer;
pub mod scene;
mod simulation;
pub mod time;
pub mod viewport;

pub use body::RigidBodyProxy;
pub use camera::Camera;
pub use color::{Color, ColorAnimator};
pub use config::SceneConfig;
pub use connector::{ConnectorController, ImpulseProfile};
pub use error::{ConfigError, GpuError, SimulationError};
pub use glam::{Mat4, Quat, Vec2, Vec3};
pub use input::{Input, InputSample, KeyCode, MouseButton};
pub use physics::{BodyHandle, PhysicsWorld, RigidBody, RigidBodyBuilder};
pub use pointer::PointerController;
pub use scene::{ColliderPreset, Renderable, Scene};
pub use simulation::{HeadlessReport, SceneRunner, Simulation, TickReport};
pub use time::{FixedStep, Time};
pub use viewport::Viewport;

pub mod prelude {
    pub use crate::color::{Color, ColorAnimator};
    pub use crate::config::{ConnectorConfig, SceneConfig};
    pub use crate::connector::{ConnectorController, ImpulseProfile};
    pub use crate::error::SimulationError;
    pub use crate::input::InputSample;
    pub use crate::physics::{Collider, PhysicsWorld, RigidBodyBuilder};
    pub use crate::pointer::PointerController;
    pub use crate::scene::{ColliderPreset, Scene};
    pub use crate::simulation::{SceneRunner, Simulation};
    pub use crate::viewport::Viewport;
    pub use crate::RigidBodyProxy;
    pub use glam::{Vec2, Vec3};
}
