mod settings;

use std::env;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    LogSettings, PartialSettings, RelaySettings, ServerSettings, Settings,
};

/// Loads the configuration, lowest precedence first:
/// built-in defaults, `config/default.*`, `RELAY_`-prefixed environment
/// variables (`__` separates sections, e.g. `RELAY_RELAY__PING_INTERVAL_MS`),
/// then the bare `HOST` and `PORT` variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("RELAY")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("server.host", env::var("HOST").ok())?
        .set_override_option("server.port", env::var("PORT").ok())?
        .build()?;

    let partial: PartialSettings = config.try_deserialize()?;
    let settings = partial.merge(Settings::default());

    if settings.relay.ping_interval_ms == 0 {
        return Err(ConfigError::Message(
            "relay.ping_interval_ms must be greater than zero".to_string(),
        ));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests;
