//! Tuning for grappling agents and the physics step
//!
//! Loaded from JSON. Every field has a default taken from the shipped game
//! tuning, so a config file only needs the values it changes. Values are
//! validated on load; the simulation assumes a validated config.

use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::consts::{AGENT_MASS, AGENT_RADIUS, MAX_SUBSTEPS, SIM_DT};
use crate::sim::physics::{LayerMask, Tag};

/// Configuration load/validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field}: max {max} is below min {min}")]
    InvertedRange { field: &'static str, min: f32, max: f32 },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
    if max >= min {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange { field, min, max })
    }
}

/// Tether and spin settings shared by both agent kinds
///
/// `Default` is the AI tuning. Fields missing from a nested `grapple` object
/// fall back to the defaults of the agent kind it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrappleConfig {
    /// How far to look for anchors
    pub search_radius: f32,
    /// Tether is never shorter than this
    pub min_rope_length: f32,
    /// Layers anchors are searched on
    pub layers: LayerMask,
    /// Spin force ramp per second
    pub rotation_acceleration: f32,
    /// Spin force cap
    pub max_spin_speed: f32,
    /// Cooldown after a release before the next attach
    pub lockout_time: f32,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            search_radius: 10.0,
            min_rope_length: 2.0,
            layers: LayerMask::default(),
            rotation_acceleration: 5.0,
            max_spin_speed: 20.0,
            lockout_time: 1.0,
        }
    }
}

const AI_GRAPPLE_FIELDS: [&str; 5] = [
    "ai.grapple.search_radius",
    "ai.grapple.min_rope_length",
    "ai.grapple.rotation_acceleration",
    "ai.grapple.max_spin_speed",
    "ai.grapple.lockout_time",
];

const PLAYER_GRAPPLE_FIELDS: [&str; 5] = [
    "player.grapple.search_radius",
    "player.grapple.min_rope_length",
    "player.grapple.rotation_acceleration",
    "player.grapple.max_spin_speed",
    "player.grapple.lockout_time",
];

/// A `grapple` object as written, with only the fields it sets
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GrappleOverrides {
    search_radius: Option<f32>,
    min_rope_length: Option<f32>,
    layers: Option<LayerMask>,
    rotation_acceleration: Option<f32>,
    max_spin_speed: Option<f32>,
    lockout_time: Option<f32>,
}

impl GrappleOverrides {
    fn over(self, base: GrappleConfig) -> GrappleConfig {
        GrappleConfig {
            search_radius: self.search_radius.unwrap_or(base.search_radius),
            min_rope_length: self.min_rope_length.unwrap_or(base.min_rope_length),
            layers: self.layers.unwrap_or(base.layers),
            rotation_acceleration: self.rotation_acceleration.unwrap_or(base.rotation_acceleration),
            max_spin_speed: self.max_spin_speed.unwrap_or(base.max_spin_speed),
            lockout_time: self.lockout_time.unwrap_or(base.lockout_time),
        }
    }
}

fn player_grapple_defaults() -> GrappleConfig {
    GrappleConfig {
        min_rope_length: 1.0,
        rotation_acceleration: 4.0,
        max_spin_speed: 500.0,
        lockout_time: 0.6,
        ..GrappleConfig::default()
    }
}

fn player_grapple<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GrappleConfig, D::Error> {
    Ok(GrappleOverrides::deserialize(deserializer)?.over(player_grapple_defaults()))
}

impl GrappleConfig {
    fn validate(&self, fields: &[&'static str; 5]) -> Result<(), ConfigError> {
        positive(fields[0], self.search_radius)?;
        non_negative(fields[1], self.min_rope_length)?;
        non_negative(fields[2], self.rotation_acceleration)?;
        non_negative(fields[3], self.max_spin_speed)?;
        non_negative(fields[4], self.lockout_time)
    }
}

/// AI agent tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub grapple: GrappleConfig,
    /// Tangential speed that allows an early release
    pub spin_speed_breakpoint: f32,
    /// Max angle (degrees) between velocity and target direction for an automatic release
    pub release_angle_threshold: f32,
    /// Grapple duration is drawn from [min_grapple_time, max_grapple_time] on every attach
    pub min_grapple_time: f32,
    pub max_grapple_time: f32,
    /// Delay before a freshly spawned AI starts grappling, drawn from this range
    pub min_start_delay: f32,
    pub max_start_delay: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            grapple: GrappleConfig::default(),
            spin_speed_breakpoint: 40.0,
            release_angle_threshold: 10.0,
            min_grapple_time: 2.0,
            max_grapple_time: 5.0,
            min_start_delay: 0.3,
            max_start_delay: 1.2,
        }
    }
}

impl AiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grapple.validate(&AI_GRAPPLE_FIELDS)?;
        non_negative("ai.spin_speed_breakpoint", self.spin_speed_breakpoint)?;
        non_negative("ai.release_angle_threshold", self.release_angle_threshold)?;
        non_negative("ai.min_grapple_time", self.min_grapple_time)?;
        ordered("ai.grapple_time", self.min_grapple_time, self.max_grapple_time)?;
        non_negative("ai.min_start_delay", self.min_start_delay)?;
        ordered("ai.start_delay", self.min_start_delay, self.max_start_delay)
    }
}

/// Player agent tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    #[serde(deserialize_with = "player_grapple")]
    pub grapple: GrappleConfig,
    /// Aim used for anchor scoring when a toggle carries no aim of its own
    pub aim: Vec2,
    /// Let go when touching a collider tagged with one of `hazard_tags`
    pub break_on_contact: bool,
    pub hazard_tags: Vec<Tag>,
    /// Let go when total speed exceeds `spin_force_break_threshold`
    pub break_on_spin_force: bool,
    pub spin_force_break_threshold: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            grapple: player_grapple_defaults(),
            aim: Vec2::Y,
            break_on_contact: true,
            hazard_tags: vec![Tag::Enemy, Tag::Obstacle],
            break_on_spin_force: false,
            spin_force_break_threshold: 50.0,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grapple.validate(&PLAYER_GRAPPLE_FIELDS)?;
        non_negative("player.spin_force_break_threshold", self.spin_force_break_threshold)
    }

    pub fn is_hazard(&self, tag: Tag) -> bool {
        self.hazard_tags.contains(&tag)
    }
}

/// Physics step settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec2,
    /// Fixed step used by `FixedStepper`
    pub fixed_dt: f32,
    /// Max steps per frame before dropping time
    pub max_substeps: u32,
    /// Bounciness of contacts (0 = no bounce)
    pub restitution: f32,
    pub agent_mass: f32,
    pub agent_radius: f32,
    pub agent_linear_drag: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            fixed_dt: SIM_DT,
            max_substeps: MAX_SUBSTEPS,
            restitution: 0.0,
            agent_mass: AGENT_MASS,
            agent_radius: AGENT_RADIUS,
            agent_linear_drag: 0.0,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("physics.fixed_dt", self.fixed_dt)?;
        positive("physics.max_substeps", self.max_substeps as f32)?;
        non_negative("physics.restitution", self.restitution)?;
        positive("physics.agent_mass", self.agent_mass)?;
        positive("physics.agent_radius", self.agent_radius)?;
        non_negative("physics.agent_linear_drag", self.agent_linear_drag)
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    pub ai: AiConfig,
    pub player: PlayerConfig,
    pub physics: PhysicsConfig,
}

impl SwingConfig {
    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SwingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ai.validate()?;
        self.player.validate()?;
        self.physics.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SwingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_tuning() {
        let config = SwingConfig::default();
        assert_eq!(config.ai.grapple.min_rope_length, 2.0);
        assert_eq!(config.ai.max_grapple_time, 5.0);
        assert_eq!(config.player.grapple.min_rope_length, 1.0);
        assert_eq!(config.player.grapple.max_spin_speed, 500.0);
        assert_eq!(config.player.grapple.lockout_time, 0.6);
        assert!(config.player.is_hazard(Tag::Enemy));
        assert!(!config.player.is_hazard(Tag::Player));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SwingConfig::from_json_str(r#"{ "ai": { "release_angle_threshold": 25.0 } }"#).unwrap();
        assert_eq!(config.ai.release_angle_threshold, 25.0);
        assert_eq!(config.ai.spin_speed_breakpoint, 40.0);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn test_partial_grapple_keeps_kind_defaults() {
        let config = SwingConfig::from_json_str(
            r#"{ "player": { "grapple": { "lockout_time": 0.8 } }, "ai": { "grapple": { "search_radius": 6.0 } } }"#,
        )
        .unwrap();

        let player = &config.player.grapple;
        assert_eq!(player.lockout_time, 0.8);
        assert_eq!(player.max_spin_speed, 500.0);
        assert_eq!(player.min_rope_length, 1.0);
        assert_eq!(player.rotation_acceleration, 4.0);

        let ai = &config.ai.grapple;
        assert_eq!(ai.search_radius, 6.0);
        assert_eq!(ai.max_spin_speed, 20.0);
        assert_eq!(ai.lockout_time, 1.0);
    }

    #[test]
    fn test_inverted_grapple_time_rejected() {
        let err = SwingConfig::from_json_str(r#"{ "ai": { "min_grapple_time": 5.0, "max_grapple_time": 2.0 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvertedRange {
                field: "ai.grapple_time",
                ..
            }
        ));
    }

    #[test]
    fn test_non_positive_radius_rejected() {
        let mut config = SwingConfig::default();
        config.player.grapple.search_radius = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "player.grapple.search_radius",
                ..
            })
        ));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = SwingConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SwingConfig::load("/definitely/not/here/swing.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = SwingConfig::default();
        config.player.break_on_spin_force = true;
        config.physics.gravity = Vec2::ZERO;
        let json = serde_json::to_string(&config).unwrap();
        let decoded = SwingConfig::from_json_str(&json).unwrap();
        assert_eq!(config, decoded);
    }
}
