use crate::error::ConfigError;
use nalgebra as na;
use serde::Deserialize;
use std::path::Path;

/// Thresholds used to read gestures out of a landmark frame.
///
/// All values are in normalized image units.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GestureConfig {
    /// Maximum nose to eye-outer horizontal distance that counts as a head turn.
    pub yaw_threshold: f32,
    /// Maximum wrist to elbow distance for folded arms.
    pub fold_threshold: f32,
    /// Extra slack on top of `fold_threshold` for wrists raised to the shoulders.
    pub raise_margin: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            yaw_threshold: 0.02,
            fold_threshold: 0.085,
            raise_margin: 0.035,
        }
    }
}

impl GestureConfig {
    pub fn raise_threshold(&self) -> f32 {
        self.fold_threshold + self.raise_margin
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("gesture.yaw_threshold", self.yaw_threshold)?;
        positive("gesture.fold_threshold", self.fold_threshold)?;
        if !self.raise_margin.is_finite() || self.raise_margin < 0.0 {
            return Err(ConfigError::invalid(
                "gesture.raise_margin",
                self.raise_margin,
            ));
        }
        Ok(())
    }
}

/// How per tick impulses are turned into motion.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MotionIntegration {
    /// Fixed step per tick regardless of frame time.
    PerTick,
    /// Step scaled by elapsed time, equal to `PerTick` at `reference_hz`.
    Elapsed { reference_hz: f32 },
}

impl Default for MotionIntegration {
    fn default() -> Self {
        MotionIntegration::PerTick
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ControllerConfig {
    /// Scene units per tick.
    pub movement_speed: f32,
    /// Radians per tick.
    pub rotation_speed: f32,
    pub integration: MotionIntegration,
    /// Multipliers applied to the grab vector before it is placed around the camera.
    pub marker_scale: [f32; 3],
    pub marker_offset: [f32; 3],
    /// Objects further than this from the grab marker can not be grabbed.
    pub grab_threshold: f32,
    pub initial_position: [f32; 3],
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            movement_speed: 0.05,
            rotation_speed: 0.03,
            integration: MotionIntegration::PerTick,
            marker_scale: [-1.5, -1.5, 1.5],
            marker_offset: [1.0, 0.5, 0.0],
            grab_threshold: 10.0,
            initial_position: [0.0, 0.0, 5.0],
        }
    }
}

impl ControllerConfig {
    pub fn marker_scale(&self) -> na::Vector3<f32> {
        na::Vector3::from(self.marker_scale)
    }

    pub fn marker_offset(&self) -> na::Vector3<f32> {
        na::Vector3::from(self.marker_offset)
    }

    pub fn initial_position(&self) -> na::Point3<f32> {
        na::Point3::from(na::Vector3::from(self.initial_position))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("controller.movement_speed", self.movement_speed)?;
        positive("controller.rotation_speed", self.rotation_speed)?;
        positive("controller.grab_threshold", self.grab_threshold)?;
        if let MotionIntegration::Elapsed { reference_hz } = self.integration {
            positive("controller.integration.reference_hz", reference_hz)?;
        }
        for value in self
            .marker_scale
            .iter()
            .chain(self.marker_offset.iter())
            .chain(self.initial_position.iter())
        {
            if !value.is_finite() {
                return Err(ConfigError::invalid("controller.marker", *value));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MqttConfig {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub topic: String,
    /// Seconds between reconnect attempts once connected.
    pub reconnect_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: String::from("pose_navigator"),
            host: String::from("mqtt.local"),
            port: 1883,
            topic: String::from("pose/landmarks"),
            reconnect_secs: 5,
        }
    }
}

/// Top level configuration, usually read from a JSON file.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NavigatorConfig {
    pub gesture: GestureConfig,
    pub controller: ControllerConfig,
    pub mqtt: MqttConfig,
}

impl NavigatorConfig {
    pub fn from_json(data: &[u8]) -> Result<Self, ConfigError> {
        let config: NavigatorConfig = serde_json::from_slice(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gesture.validate()?;
        self.controller.validate()
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value))
    }
}
