//! Scene configuration.
//!
//! Everything that shapes the scene is plain data here, loaded from JSON
//! with serde. Every field has a default, so an empty object `{}` is the
//! stock scene: ten coloured connectors, two glass ones, a pointer, zero
//! gravity, and the camera at `(3, 2, 3)`.
//!
//! ```
//! use connectors::config::SceneConfig;
//!
//! let config = SceneConfig::from_json(r#"{ "seed": 7, "overlays": { "gizmo": false } }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert!(!config.overlays.gizmo);
//! assert_eq!(config.connectors.len(), 12);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::{Color, DEFAULT_SMOOTH_TIME};
use crate::error::ConfigError;
use crate::scene::{ColliderPreset, TransmissionMaterial};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Seed for the one-time random placement of connectors.
    pub seed: u64,
    /// Connectors without an explicit position are placed uniformly in a
    /// cube of this edge length centred on the origin.
    pub spawn_spread: f32,
    /// Colour every connector shows before easing to its own colour.
    pub start_color: String,
    /// Time constant of the colour easing, in seconds.
    pub color_smooth_time: f32,
    pub background: String,
    pub physics: PhysicsConfig,
    pub body: BodyConfig,
    pub pointer: PointerConfig,
    pub connectors: Vec<ConnectorConfig>,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub overlays: OverlayConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            spawn_spread: 10.0,
            start_color: "#ffffff".into(),
            color_smooth_time: DEFAULT_SMOOTH_TIME,
            background: "#ececec".into(),
            physics: PhysicsConfig::default(),
            body: BodyConfig::default(),
            pointer: PointerConfig::default(),
            connectors: default_connectors(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            overlays: OverlayConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Read, parse, and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SceneConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ranges and colour strings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spawn_spread >= 0.0 && self.spawn_spread.is_finite()) {
            return Err(ConfigError::invalid("spawn_spread", format!("must be finite and >= 0, got {}", self.spawn_spread)));
        }
        if !(self.color_smooth_time > 0.0) {
            return Err(ConfigError::invalid(
                "color_smooth_time",
                format!("must be > 0, got {}", self.color_smooth_time),
            ));
        }
        Color::parse(&self.start_color)?;
        Color::parse(&self.background)?;

        self.physics.validate()?;
        self.body.validate()?;

        if !(self.pointer.radius > 0.0) {
            return Err(ConfigError::invalid("pointer.radius", format!("must be > 0, got {}", self.pointer.radius)));
        }

        if self.connectors.is_empty() {
            return Err(ConfigError::invalid("connectors", "at least one connector is required"));
        }
        for connector in &self.connectors {
            connector.validate()?;
        }

        self.camera.validate()?;
        self.lighting.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsConfig {
    pub gravity: [f32; 3],
    /// Fixed physics sub-step, in seconds.
    pub timestep: f32,
    /// Upper bound on sub-steps per rendered frame.
    pub max_substeps: u32,
    pub solver_iterations: usize,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0; 3],
            timestep: 1.0 / 60.0,
            max_substeps: 4,
            solver_iterations: 8,
        }
    }
}

impl PhysicsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.timestep > 0.0) {
            return Err(ConfigError::invalid("physics.timestep", format!("must be > 0, got {}", self.timestep)));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::invalid("physics.max_substeps", "must be at least 1"));
        }
        if self.solver_iterations == 0 {
            return Err(ConfigError::invalid("physics.solver_iterations", "must be at least 1"));
        }
        Ok(())
    }
}

/// Body settings shared by every connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BodyConfig {
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub friction: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            linear_damping: 4.0,
            angular_damping: 1.0,
            friction: 0.1,
        }
    }
}

impl BodyConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("body.linear_damping", self.linear_damping),
            ("body.angular_damping", self.angular_damping),
            ("body.friction", self.friction),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::invalid(field, format!("must be >= 0, got {}", value)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointerConfig {
    pub radius: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self { radius: 1.0 }
    }
}

/// One connector in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectorConfig {
    pub color: String,
    pub roughness: f32,
    /// Accent connectors carry a point light in their own colour.
    pub accent: bool,
    /// Fixed spawn position; random when absent.
    pub position: Option<[f32; 3]>,
    pub collider: ColliderPreset,
    /// Restoring strength; defaults to the collider preset's.
    pub strength: Option<f32>,
    /// Render as glass instead of a plain surface.
    pub transmission: Option<TransmissionMaterial>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            color: "white".into(),
            roughness: 0.75,
            accent: false,
            position: None,
            collider: ColliderPreset::default(),
            strength: None,
            transmission: None,
        }
    }
}

impl ConnectorConfig {
    pub fn new(color: &str, roughness: f32) -> Self {
        Self {
            color: color.into(),
            roughness,
            ..Self::default()
        }
    }

    pub fn with_accent(mut self) -> Self {
        self.accent = true;
        self
    }

    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_collider(mut self, collider: ColliderPreset) -> Self {
        self.collider = collider;
        self
    }

    pub fn with_transmission(mut self, material: TransmissionMaterial) -> Self {
        self.transmission = Some(material);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Color::parse(&self.color)?;
        if !(0.0..=1.0).contains(&self.roughness) {
            return Err(ConfigError::invalid(
                "connectors.roughness",
                format!("must be within [0, 1], got {}", self.roughness),
            ));
        }
        if let ColliderPreset::Ball { radius } = self.collider {
            if !(radius > 0.0) {
                return Err(ConfigError::invalid(
                    "connectors.collider.radius",
                    format!("must be > 0, got {}", radius),
                ));
            }
        }
        if let Some(strength) = self.strength {
            if !(strength >= 0.0 && strength.is_finite()) {
                return Err(ConfigError::invalid(
                    "connectors.strength",
                    format!("must be finite and >= 0, got {}", strength),
                ));
            }
        }
        if let Some(position) = self.position {
            if position.iter().any(|c| !c.is_finite()) {
                return Err(ConfigError::invalid("connectors.position", "must be finite"));
            }
        }
        Ok(())
    }
}

/// The stock scene's connectors.
pub fn default_connectors() -> Vec<ConnectorConfig> {
    vec![
        ConnectorConfig::new("#a2cc89", 0.1),
        ConnectorConfig::new("#a2cc89", 0.75),
        ConnectorConfig::new("#a2cc89", 0.75),
        ConnectorConfig::new("#80c8ef", 0.1),
        ConnectorConfig::new("#80c8ef", 0.75),
        ConnectorConfig::new("#ff4060", 0.1),
        ConnectorConfig::new("#ff4060", 0.1).with_accent(),
        ConnectorConfig::new("#ff4060", 0.75).with_accent(),
        ConnectorConfig::new("#a2cc89", 0.1).with_accent(),
        ConnectorConfig::new("#80c8ef", 0.75).with_accent(),
        ConnectorConfig::default()
            .with_position([10.0, 10.0, 5.0])
            .with_transmission(TransmissionMaterial::default()),
        ConnectorConfig::default()
            .with_position([10.0, 10.0, 5.0])
            .with_transmission(TransmissionMaterial::default()),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Vertical field of view, in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [3.0, 2.0, 3.0],
            target: [0.0; 3],
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(ConfigError::invalid("camera.fov", format!("must be within (0, 180), got {}", self.fov)));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::invalid("camera.far", "need 0 < near < far"));
        }
        if self.position == self.target {
            return Err(ConfigError::invalid("camera.position", "must differ from camera.target"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightingConfig {
    pub ambient: f32,
    pub spot_position: [f32; 3],
    pub spot_intensity: f32,
    /// Half-angle of the spot cone, in radians.
    pub spot_angle: f32,
    /// Fraction of the cone over which the spot fades out.
    pub spot_penumbra: f32,
    pub accent_intensity: f32,
    pub accent_range: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: 0.75,
            spot_position: [10.0, 10.0, 10.0],
            spot_intensity: 1.0,
            spot_angle: 0.15,
            spot_penumbra: 1.0,
            accent_intensity: 4.0,
            accent_range: 2.5,
        }
    }
}

impl LightingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.accent_range > 0.0) {
            return Err(ConfigError::invalid("lighting.accent_range", format!("must be > 0, got {}", self.accent_range)));
        }
        if !(0.0..=1.0).contains(&self.spot_penumbra) {
            return Err(ConfigError::invalid("lighting.spot_penumbra", "must be within [0, 1]"));
        }
        Ok(())
    }
}

/// Passive overlays; neither affects the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    pub orbit: bool,
    pub gizmo: bool,
    /// Gizmo inset from the top-right corner, in physical pixels.
    pub gizmo_margin: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            orbit: true,
            gizmo: true,
            gizmo_margin: 75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_stock_scene() {
        let config = SceneConfig::from_json("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.connectors.len(), 12);
        assert_eq!(config.connectors.iter().filter(|c| c.accent).count(), 4);
        assert_eq!(config.connectors.iter().filter(|c| c.transmission.is_some()).count(), 2);
        assert_eq!(config.physics.gravity, [0.0; 3]);
        assert_eq!(config.camera.position, [3.0, 2.0, 3.0]);
    }

    #[test]
    fn test_default_round_trips_through_json() {
        let json = SceneConfig::default().to_json().unwrap();
        let back = SceneConfig::from_json(&json).unwrap();
        assert_eq!(back, SceneConfig::default());
    }

    #[test]
    fn test_partial_connector_list() {
        let config = SceneConfig::from_json(
            r##"{
                "connectors": [
                    { "color": "#ff4060", "accent": true },
                    { "collider": { "kind": "compound_box" }, "position": [1, 2, 3] },
                    { "collider": { "kind": "ball", "radius": 0.25 }, "strength": 0.5 }
                ]
            }"##,
        )
        .unwrap();

        assert_eq!(config.connectors.len(), 3);
        assert!(config.connectors[0].accent);
        assert_eq!(config.connectors[0].roughness, 0.75);
        assert_eq!(config.connectors[1].collider, ColliderPreset::CompoundBox);
        assert_eq!(config.connectors[1].position, Some([1.0, 2.0, 3.0]));
        assert_eq!(config.connectors[2].collider, ColliderPreset::Ball { radius: 0.25 });
        assert_eq!(config.connectors[2].strength, Some(0.5));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let err = SceneConfig::from_json(r#"{ "gravity": [0, -9.8, 0] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_bad_colour_is_rejected() {
        let err = SceneConfig::from_json(r#"{ "connectors": [ { "color": "chartreuse-ish" } ] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidColor(_)));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            (r#"{ "connectors": [] }"#, "connectors"),
            (r#"{ "pointer": { "radius": 0 } }"#, "pointer.radius"),
            (r#"{ "color_smooth_time": 0 }"#, "color_smooth_time"),
            (r#"{ "physics": { "timestep": -1 } }"#, "physics.timestep"),
            (r#"{ "connectors": [ { "collider": { "kind": "ball", "radius": -0.5 } } ] }"#, "connectors.collider.radius"),
            (r#"{ "connectors": [ { "roughness": 2 } ] }"#, "connectors.roughness"),
            (r#"{ "camera": { "fov": 190 } }"#, "camera.fov"),
        ];
        for (json, expected) in cases {
            match SceneConfig::from_json(json) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected, "{}", json),
                other => panic!("{}: expected InvalidValue, got {:?}", json, other),
            }
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = SceneConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
