use anyhow::{Context, Result};
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::settings::Settings;

pub fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    settings.apply_overrides(&cli);
    settings.validate()?;

    if cli.dump_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    tracing::debug!(
        config = ?cli.config,
        colors = settings.gradient.colors.len(),
        playing = settings.gradient.playing,
        antialias = %settings.window.antialias,
        "resolved valentine settings"
    );
    let mut renderer = Renderer::new(settings.into_renderer_config());
    tracing::info!(
        width = renderer.config().surface_size.0,
        height = renderer.config().surface_size.1,
        "starting gradient window"
    );
    renderer.run()
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
