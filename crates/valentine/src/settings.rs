use std::fs;
use std::path::{Path, PathBuf};

use renderer::gradient::parse_hex_color;
use renderer::{Antialiasing, GradientSettings, RendererConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render settings: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// `[window]` table of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub antialias: Antialiasing,
}

impl Default for WindowSettings {
    fn default() -> Self {
        let defaults = RendererConfig::default();
        Self {
            width: defaults.surface_size.0,
            height: defaults.surface_size.1,
            title: defaults.title,
            antialias: defaults.antialiasing,
        }
    }
}

/// Everything the settings file can hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub window: WindowSettings,
    pub gradient: GradientSettings,
}

impl Settings {
    /// Reads `path`, or starts from the built-in defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Applies command-line flags on top of the file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        let gradient = &mut self.gradient;
        if let Some(colors) = &cli.colors {
            gradient.colors = colors.iter().map(|color| color.trim().to_string()).collect();
        }
        if cli.paused {
            gradient.playing = false;
        }
        if cli.darken_top {
            gradient.darken_top = true;
        }
        if let Some(power) = cli.shadow_power {
            gradient.shadow_power = power;
        }
        if let Some(speed) = cli.noise_speed {
            gradient.noise_speed = speed;
        }
        if let Some(frequency) = cli.noise_frequency {
            gradient.noise_frequency = frequency;
        }

        let window = &mut self.window;
        if let Some((width, height)) = cli.size {
            window.width = width;
            window.height = height;
        }
        if let Some(title) = &cli.title {
            window.title = title.clone();
        }
        if let Some(antialias) = cli.antialias {
            window.antialias = antialias;
        }
    }

    /// Rejects settings the gradient could not be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window dimensions must be greater than zero".into(),
            ));
        }
        let gradient = &self.gradient;
        if gradient.colors.is_empty() {
            return Err(ConfigError::Invalid("at least one color is required".into()));
        }
        for color in &gradient.colors {
            parse_hex_color(color).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        }
        let scalars = [
            ("shadow_power", gradient.shadow_power),
            ("noise_speed", gradient.noise_speed),
            ("noise_frequency", gradient.noise_frequency[0]),
            ("noise_frequency", gradient.noise_frequency[1]),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, value)| !value.is_finite()) {
            return Err(ConfigError::Invalid(format!("{name} must be a finite number")));
        }
        Ok(())
    }

    pub fn into_renderer_config(self) -> RendererConfig {
        RendererConfig {
            surface_size: (self.window.width, self.window.height),
            title: self.window.title,
            antialiasing: self.window.antialias,
            settings: self.gradient,
        }
    }
}
