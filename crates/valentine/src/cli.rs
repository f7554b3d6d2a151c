use std::path::PathBuf;

use clap::Parser;
use renderer::Antialiasing;

#[derive(Parser, Debug)]
#[command(
    name = "valentine",
    author,
    version,
    about = "Animated gradient-wave background",
    arg_required_else_help = false
)]
pub struct Cli {
    /// TOML settings file; CLI flags override its values.
    #[arg(long, value_name = "FILE", env = "VALENTINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gradient colors as comma-separated hex triplets (first one is the base).
    #[arg(long, value_name = "HEX,...", value_delimiter = ',')]
    pub colors: Option<Vec<String>>,

    /// Open with the animation paused; space toggles playback.
    #[arg(long)]
    pub paused: bool,

    /// Darken the top of the surface.
    #[arg(long)]
    pub darken_top: bool,

    /// Strength of the top shadow.
    #[arg(long, value_name = "POWER")]
    pub shadow_power: Option<f32>,

    /// Global noise speed.
    #[arg(long, value_name = "SPEED")]
    pub noise_speed: Option<f32>,

    /// Global noise frequency as `X,Y`.
    #[arg(long, value_name = "X,Y", value_parser = parse_pair)]
    pub noise_frequency: Option<[f32; 2]>,

    /// Window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Anti-aliasing policy: `auto`, `off`, or an explicit MSAA sample count (e.g. `4`).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<Antialiasing>,

    /// Print the resolved settings as TOML and exit without opening a window.
    #[arg(long)]
    pub dump_config: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_antialias(value: &str) -> Result<Antialiasing, String> {
    value.parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .trim()
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1920x1080".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_pair(value: &str) -> Result<[f32; 2], String> {
    let (x, y) = value
        .split_once([',', 'x', 'X'])
        .ok_or_else(|| "expected two numbers separated by a comma".to_string())?;
    let x = x
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid number '{}'", x.trim()))?;
    let y = y
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid number '{}'", y.trim()))?;
    if !x.is_finite() || !y.is_finite() {
        return Err("values must be finite".into());
    }
    Ok([x, y])
}
