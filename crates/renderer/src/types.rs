use serde::{Deserialize, Serialize};

/// Colors the gradient starts from when none are configured.
pub const DEFAULT_COLORS: [&str; 6] = [
    "#38bdf8", "#ffffff", "#38bdf8", "#ffffff", "#38bdf8", "#ffffff",
];

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

impl std::fmt::Display for Antialiasing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Antialiasing::Auto => f.write_str("auto"),
            Antialiasing::Off => f.write_str("off"),
            Antialiasing::Samples(count) => write!(f, "{count}"),
        }
    }
}

impl std::str::FromStr for Antialiasing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("anti-alias mode must not be empty".to_string());
        }

        let normalized = trimmed.to_ascii_lowercase();
        match normalized.as_str() {
            "auto" | "max" | "default" => Ok(Antialiasing::Auto),
            "off" | "none" | "disable" | "disabled" => Ok(Antialiasing::Off),
            _ => {
                let samples: u32 = normalized.parse().map_err(|_| {
                    format!("invalid anti-alias sample count '{trimmed}'; use auto/off or 2/4/8/16")
                })?;

                if samples == 0 || samples == 1 {
                    return Ok(Antialiasing::Off);
                }

                if !matches!(samples, 2 | 4 | 8 | 16) {
                    return Err(format!(
                        "unsupported sample count {samples}; supported values are 2, 4, 8, or 16"
                    ));
                }

                Ok(Antialiasing::Samples(samples))
            }
        }
    }
}

impl Serialize for Antialiasing {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Antialiasing {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Vertex deformation overrides. Unset fields keep the material's values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeformSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incline: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_top: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_bottom: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_freq: Option<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_amp: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_flow: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_seed: Option<f32>,
}

impl DeformSettings {
    /// The deformation the page applies on top of the material defaults.
    pub fn page_default() -> Self {
        Self {
            incline: Some(0.5),
            noise_amp: Some(250.0),
            noise_flow: Some(5.0),
            ..Self::default()
        }
    }
}

/// Everything the host applies to a gradient after constructing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GradientSettings {
    /// Hex triplets; the first is the base color, the rest become wave layers.
    pub colors: Vec<String>,
    /// Start animating as soon as the gradient exists.
    pub playing: bool,
    pub shadow_power: f32,
    pub darken_top: bool,
    pub noise_speed: f32,
    pub noise_frequency: [f32; 2],
    pub deform: DeformSettings,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.iter().map(|color| color.to_string()).collect(),
            playing: true,
            shadow_power: 8.0,
            darken_top: false,
            noise_speed: 0.00001,
            noise_frequency: [0.0001, 0.0009],
            deform: DeformSettings::page_default(),
        }
    }
}

/// Configuration passed to the renderer at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Anti-aliasing mode requested by the caller.
    pub antialiasing: Antialiasing,
    pub settings: GradientSettings,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "valentine".to_string(),
            antialiasing: Antialiasing::default(),
            settings: GradientSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_page() {
        let settings = GradientSettings::default();
        assert_eq!(settings.colors.len(), 6);
        assert_eq!(settings.colors[0], "#38bdf8");
        assert_eq!(settings.colors[1], "#ffffff");
        assert!(settings.playing);
        assert_eq!(settings.shadow_power, 8.0);
        assert_eq!(settings.deform.incline, Some(0.5));
        assert_eq!(settings.deform.offset_top, None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: GradientSettings = toml::from_str(
            r##"
colors = ["#ff0000", "#00ff00"]
darken_top = true

[deform]
noise_amp = 100.0
"##,
        )
        .unwrap();
        assert_eq!(settings.colors, ["#ff0000", "#00ff00"]);
        assert!(settings.darken_top);
        assert_eq!(settings.noise_frequency, [0.0001, 0.0009]);
        // a provided table replaces the page deformation as a whole
        assert_eq!(settings.deform.noise_amp, Some(100.0));
        assert_eq!(settings.deform.incline, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<GradientSettings>("colour = []").is_err());
    }

    #[test]
    fn antialiasing_parses_names_and_counts() {
        assert_eq!("auto".parse::<Antialiasing>(), Ok(Antialiasing::Auto));
        assert_eq!("OFF".parse::<Antialiasing>(), Ok(Antialiasing::Off));
        assert_eq!("4".parse::<Antialiasing>(), Ok(Antialiasing::Samples(4)));
        assert_eq!("1".parse::<Antialiasing>(), Ok(Antialiasing::Off));
        assert!("many".parse::<Antialiasing>().is_err());
        assert!("3".parse::<Antialiasing>().is_err());
    }
}
