//! Widget configuration.
//!
//! Settings live in `widget.toml` under `~/.config/schatzkarte/` by default.
//! Every section is optional; missing keys take the built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use schatzkarte_core::{DEFAULT_WAITING_THRESHOLD_MINUTES, Size};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{WidgetError, WidgetResult};

/// Configuration for one widget instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub geometry: GeometrySettings,
    pub countdown: CountdownSettings,
    pub provider: ProviderSettings,
    pub surface: SurfaceStyle,
}

/// Frame geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometrySettings {
    /// Size of the frame in small mode.
    pub small_size: Size,
    /// Distance from the bottom-right viewport corner in small mode.
    pub margin: f64,
    /// Resize floor.
    pub min_size: Size,
    /// Pixels of the frame that must stay on screen while dragging.
    pub min_visible: f64,
    /// Share of the viewport covered in large mode.
    pub large_fraction: f64,
    /// Viewport assumed until the host reports a real one.
    pub initial_viewport: Size,
}

impl Default for GeometrySettings {
    fn default() -> Self {
        Self {
            small_size: Size::new(360.0, 270.0),
            margin: 20.0,
            min_size: Size::new(240.0, 180.0),
            min_visible: 60.0,
            large_fraction: 0.8,
            initial_viewport: Size::new(1280.0, 800.0),
        }
    }
}

/// Waiting-room countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountdownSettings {
    /// Minutes before start at which the countdown is shown.
    pub waiting_threshold_minutes: u32,
    /// Seconds between countdown ticks.
    pub tick_secs: u64,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            waiting_threshold_minutes: DEFAULT_WAITING_THRESHOLD_MINUTES,
            tick_secs: 60,
        }
    }
}

impl CountdownSettings {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

/// Conferencing provider location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Host serving `external_api.js`.
    pub domain: String,
    /// DOM id of the element the provider mounts its iframe into.
    pub parent_node_id: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            domain: "8x8.vc".to_string(),
            parent_node_id: "schatzkarte-meeting-surface".to_string(),
        }
    }
}

impl ProviderSettings {
    /// Returns the SDK script URL, scoped to `app_id` when one is given.
    pub fn script_url(&self, app_id: Option<&str>) -> WidgetResult<Url> {
        let raw = match app_id.filter(|id| !id.is_empty()) {
            Some(app_id) => format!("https://{}/{}/external_api.js", self.domain, app_id),
            None => format!("https://{}/external_api.js", self.domain),
        };
        Url::parse(&raw).map_err(|e| WidgetError::config(format!("invalid SDK url {raw}: {e}")))
    }

    /// Returns the room name the provider expects.
    pub fn room_name(&self, room: &str, app_id: Option<&str>) -> String {
        match app_id.filter(|id| !id.is_empty()) {
            Some(app_id) => format!("{app_id}/{room}"),
            None => room.to_string(),
        }
    }
}

/// Styling forced onto the provider's iframe after every join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceStyle {
    pub width: String,
    pub height: String,
    pub border: String,
    pub border_radius: String,
}

impl Default for SurfaceStyle {
    fn default() -> Self {
        Self {
            width: "100%".to_string(),
            height: "100%".to_string(),
            border: "0".to_string(),
            border_radius: "12px".to_string(),
        }
    }
}

impl WidgetConfig {
    /// Loads configuration from the default path, or defaults if absent.
    pub fn load() -> WidgetResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> WidgetResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("schatzkarte")
            .join("widget.toml")
    }

    /// Checks values that would make the widget unusable.
    pub fn validate(&self) -> WidgetResult<()> {
        let geometry = &self.geometry;
        for (name, size) in [
            ("small_size", geometry.small_size),
            ("min_size", geometry.min_size),
            ("initial_viewport", geometry.initial_viewport),
        ] {
            if size.width <= 0.0 || size.height <= 0.0 {
                return Err(WidgetError::config(format!(
                    "geometry.{name} must be positive"
                )));
            }
        }
        if geometry.small_size.width < geometry.min_size.width
            || geometry.small_size.height < geometry.min_size.height
        {
            return Err(WidgetError::config(
                "geometry.small_size must not be below geometry.min_size",
            ));
        }
        if !(geometry.large_fraction > 0.0 && geometry.large_fraction <= 1.0) {
            return Err(WidgetError::config(
                "geometry.large_fraction must be in (0, 1]",
            ));
        }
        if geometry.margin < 0.0 || geometry.min_visible < 0.0 {
            return Err(WidgetError::config(
                "geometry.margin and geometry.min_visible must not be negative",
            ));
        }
        if self.countdown.tick_secs == 0 {
            return Err(WidgetError::config("countdown.tick_secs must be > 0"));
        }
        if self.provider.domain.trim().is_empty() {
            return Err(WidgetError::config("provider.domain must not be empty"));
        }
        self.provider.script_url(None)?;
        Ok(())
    }

    /// Builder: set the small frame size.
    pub fn with_small_size(mut self, size: Size) -> Self {
        self.geometry.small_size = size;
        self
    }

    /// Builder: set the initial viewport.
    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.geometry.initial_viewport = viewport;
        self
    }

    /// Builder: set the countdown tick period.
    pub fn with_tick_secs(mut self, secs: u64) -> Self {
        self.countdown.tick_secs = secs;
        self
    }

    /// Builder: set the provider domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.provider.domain = domain.into();
        self
    }
}
