mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{LogSettings, RelaySettings, ServerSettings, Settings};

/// Prefix for environment overrides, e.g. `LINECAST__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "LINECAST";

/// Loads the configuration from the default file and environment variables
/// Merges the configuration with default values
/// Returns a `Settings` struct containing the server, relay and log configurations
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge_with_defaults(partial))
}

fn merge_with_defaults(partial: PartialSettings) -> Settings {
    let default = Settings::default();
    let server = partial.server.as_ref();
    let relay = partial.relay.as_ref();

    Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
        },
        relay: RelaySettings {
            max_connections: relay
                .and_then(|r| r.max_connections)
                .unwrap_or(default.relay.max_connections),
            handshake_timeout_ms: relay
                .and_then(|r| r.handshake_timeout_ms)
                .unwrap_or(default.relay.handshake_timeout_ms),
            write_timeout_ms: relay
                .and_then(|r| r.write_timeout_ms)
                .unwrap_or(default.relay.write_timeout_ms),
            max_line_bytes: relay
                .and_then(|r| r.max_line_bytes)
                .unwrap_or(default.relay.max_line_bytes),
        },
        log: LogSettings {
            level: partial
                .log
                .and_then(|l| l.level)
                .unwrap_or(default.log.level),
        },
    }
}
