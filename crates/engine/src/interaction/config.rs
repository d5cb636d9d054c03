use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingComponentMode {
    /// Refuse actions that would need a missing marker attached.
    Strict,
    /// Attach the missing marker and continue.
    #[default]
    Fallback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionPolicy {
    pub world_grab_enabled: bool,
    /// Debug switch: world-grab ignores the manipulable tag.
    pub world_grab_any_target: bool,
    pub auto_pick_dynamic: bool,
    /// Whether the pickup stage also honors `auto_pick_dynamic`. Affordance
    /// resolution always does.
    pub auto_pick_in_pickup: bool,
    pub missing_component_mode: MissingComponentMode,
}

impl InteractionPolicy {
    pub fn is_strict(&self) -> bool {
        self.missing_component_mode == MissingComponentMode::Strict
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionTuning {
    pub spring_stiffness: f32,
    pub gravity: Vec3,
    pub slingshot_min_speed: f32,
    pub slingshot_max_speed: f32,
    pub sweep_speed_threshold: f32,
    pub sweep_pullback: f32,
    pub hover_max_distance: f32,
    pub cooldown_seconds: f32,
    pub min_follow_factor: f32,
    pub min_inv_mass: f32,
}

impl Default for InteractionTuning {
    fn default() -> Self {
        Self {
            spring_stiffness: 120.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            slingshot_min_speed: 10.0,
            slingshot_max_speed: 35.0,
            sweep_speed_threshold: 0.05,
            sweep_pullback: 0.01,
            hover_max_distance: 100.0,
            cooldown_seconds: 0.1,
            min_follow_factor: 0.05,
            min_inv_mass: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("slingshot_min_speed ({min}) exceeds slingshot_max_speed ({max})")]
    SlingshotRange { min: f32, max: f32 },
    #[error("min_follow_factor must be within (0, 1], got {0}")]
    FollowFactorRange(f32),
}

impl InteractionTuning {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("gravity.x", self.gravity.x),
            ("gravity.y", self.gravity.y),
            ("gravity.z", self.gravity.z),
        ] {
            require_finite(field, value)?;
        }
        require_positive("spring_stiffness", self.spring_stiffness)?;
        require_positive("hover_max_distance", self.hover_max_distance)?;
        require_positive("min_inv_mass", self.min_inv_mass)?;
        require_non_negative("slingshot_min_speed", self.slingshot_min_speed)?;
        require_non_negative("slingshot_max_speed", self.slingshot_max_speed)?;
        require_non_negative("sweep_speed_threshold", self.sweep_speed_threshold)?;
        require_non_negative("sweep_pullback", self.sweep_pullback)?;
        require_non_negative("cooldown_seconds", self.cooldown_seconds)?;
        require_finite("min_follow_factor", self.min_follow_factor)?;

        if self.slingshot_min_speed > self.slingshot_max_speed {
            return Err(ConfigError::SlingshotRange {
                min: self.slingshot_min_speed,
                max: self.slingshot_max_speed,
            });
        }
        if self.min_follow_factor <= 0.0 || self.min_follow_factor > 1.0 {
            return Err(ConfigError::FollowFactorRange(self.min_follow_factor));
        }
        Ok(())
    }
}

fn require_finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn require_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    require_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn require_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    require_finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// Policy plus tuning, as loaded from a config file. Every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub policy: InteractionPolicy,
    pub tuning: InteractionTuning,
}

impl InteractionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tuning.validate()
    }
}
