use glam::{DVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level harness configuration.
///
/// Every section falls back to its defaults, so a YAML file only needs to
/// name the knobs it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub pacer: PacerConfig,
    pub sim: SimConfig,
}

/// Initial window (viewport) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "My game".into(),
            width: 800,
            height: 800,
        }
    }
}

/// Initial camera framing and the constants of the screen/world mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// World point shown at the middle of the viewport.
    pub center: DVec2,
    pub zoom: f64,
    /// Vertical half-height of the visible world at zoom 1, in world units.
    pub base_half_height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl CameraConfig {
    pub const DEFAULT_CENTER: DVec2 = DVec2::new(0.0, 20.0);
    pub const DEFAULT_ZOOM: f64 = 1.0;
    pub const DEFAULT_BASE_HALF_HEIGHT: f64 = 25.0;
    pub const DEFAULT_MIN_ZOOM: f64 = 0.02;
    pub const DEFAULT_MAX_ZOOM: f64 = 20.0;

    /// True when `0 < min_zoom <= max_zoom < inf`.
    pub fn zoom_limits_valid(&self) -> bool {
        self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom && self.max_zoom.is_finite()
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            center: Self::DEFAULT_CENTER,
            zoom: Self::DEFAULT_ZOOM,
            base_half_height: Self::DEFAULT_BASE_HALF_HEIGHT,
            min_zoom: Self::DEFAULT_MIN_ZOOM,
            max_zoom: Self::DEFAULT_MAX_ZOOM,
        }
    }
}

/// Frame pacing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    pub target_fps: f64,
    /// Weight kept from the previous sleep adjustment each frame.
    pub smoothing: f64,
}

impl PacerConfig {
    pub const DEFAULT_TARGET_FPS: f64 = 60.0;
    pub const DEFAULT_SMOOTHING: f64 = 0.9;

    /// Period for `fps`, or `None` when it is not a positive rate or its
    /// reciprocal does not fit in a [`Duration`].
    pub fn period_for(fps: f64) -> Option<Duration> {
        if !(fps > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / fps).ok()
    }

    /// Desired duration of one loop iteration.
    ///
    /// An unusable `target_fps` falls back to the default rate; `validate`
    /// rejects such configs up front.
    pub fn target_period(&self) -> Duration {
        Self::period_for(self.target_fps)
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / Self::DEFAULT_TARGET_FPS))
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            target_fps: Self::DEFAULT_TARGET_FPS,
            smoothing: Self::DEFAULT_SMOOTHING,
        }
    }
}

/// Physics world settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub gravity: Vec2,
    /// Populate the world with a ground plane and a stack of boxes on startup.
    pub spawn_demo_scene: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -10.0),
            spawn_demo_scene: true,
        }
    }
}

impl WorkshopConfig {
    /// Read and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, otherwise start from the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML, e.g. to print the effective config.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check the numeric invariants the camera and pacer rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.window.width == 0 || self.window.height == 0 {
            return invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            ));
        }
        let cam = &self.camera;
        if !(cam.zoom > 0.0 && cam.zoom.is_finite()) {
            return invalid(format!(
                "camera.zoom must be positive and finite, got {}",
                cam.zoom
            ));
        }
        if !(cam.base_half_height > 0.0 && cam.base_half_height.is_finite()) {
            return invalid(format!(
                "camera.base_half_height must be positive and finite, got {}",
                cam.base_half_height
            ));
        }
        if !cam.zoom_limits_valid() {
            return invalid(format!(
                "camera zoom limits must satisfy 0 < min_zoom <= max_zoom < inf, got [{}, {}]",
                cam.min_zoom, cam.max_zoom
            ));
        }
        if !cam.center.is_finite() {
            return invalid("camera.center must be finite".into());
        }
        let fps = self.pacer.target_fps;
        if !(fps.is_finite() && PacerConfig::period_for(fps).is_some()) {
            return invalid(format!(
                "pacer.target_fps must be positive with a representable frame period, got {}",
                self.pacer.target_fps
            ));
        }
        if !(0.0..1.0).contains(&self.pacer.smoothing) {
            return invalid(format!(
                "pacer.smoothing must be in [0, 1), got {}",
                self.pacer.smoothing
            ));
        }
        Ok(())
    }
}
