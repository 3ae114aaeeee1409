use crate::error::{Result, ServerError};
use std::fs;
use std::path::{Path, PathBuf};

/// Parsed server configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the corpus file whose lines form the search domain.
    pub linux_path: PathBuf,
    /// Re-read the corpus on every query instead of indexing it once.
    pub reread_on_query: bool,
    /// Wrap the listening socket in TLS.
    pub use_ssl: bool,
    /// TCP port the server listens on.
    pub port: u16,
}

/// Parses a boolean configuration value.
///
/// Accepts `true`/`false`, `1`/`0`, and `yes`/`no`, case-insensitively.
pub fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ServerError::Config(format!(
            "invalid boolean value '{}' for key '{}' (expected true/false, 1/0, or yes/no)",
            other, key
        ))),
    }
}

/// Loads and validates the configuration file.
///
/// Blank lines and `#` comments are ignored. Keys are matched
/// case-insensitively. All four keys are required; a missing key, an
/// unparseable value, a port outside `1..=65535`, or a `linuxpath` that does
/// not resolve to a readable regular file is a [`ServerError::Config`].
pub fn load_config_file(config_path: &Path) -> Result<ServerConfig> {
    let contents = fs::read_to_string(config_path).map_err(|e| {
        ServerError::Config(format!(
            "missing required configuration file '{}': {}",
            config_path.display(),
            e
        ))
    })?;

    let mut linux_path: Option<PathBuf> = None;
    let mut reread_on_query: Option<bool> = None;
    let mut use_ssl: Option<bool> = None;
    let mut port: Option<u16> = None;

    for line in contents.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };

        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "linuxpath" => linux_path = Some(PathBuf::from(value)),
            "reread_on_query" => reread_on_query = Some(parse_bool("REREAD_ON_QUERY", value)?),
            "use_ssl" => use_ssl = Some(parse_bool("USE_SSL", value)?),
            "port" => {
                let parsed: u32 = value.parse().map_err(|_| {
                    ServerError::Config(format!("invalid PORT value '{}'", value))
                })?;
                if parsed == 0 || parsed > u32::from(u16::MAX) {
                    return Err(ServerError::Config(format!(
                        "PORT {} out of range (expected 1..=65535)",
                        parsed
                    )));
                }
                port = Some(parsed as u16);
            }
            _ => {}
        }
    }

    let linux_path =
        linux_path.ok_or_else(|| ServerError::Config("missing required key 'linuxpath'".into()))?;
    let reread_on_query = reread_on_query
        .ok_or_else(|| ServerError::Config("missing required key 'REREAD_ON_QUERY'".into()))?;
    let use_ssl =
        use_ssl.ok_or_else(|| ServerError::Config("missing required key 'USE_SSL'".into()))?;
    let port = port.ok_or_else(|| ServerError::Config("missing required key 'PORT'".into()))?;

    let metadata = fs::metadata(&linux_path).map_err(|e| {
        ServerError::Config(format!(
            "linuxpath '{}' is not readable: {}",
            linux_path.display(),
            e
        ))
    })?;
    if !metadata.is_file() {
        return Err(ServerError::Config(format!(
            "linuxpath '{}' is not a regular file",
            linux_path.display()
        )));
    }
    fs::File::open(&linux_path).map_err(|e| {
        ServerError::Config(format!(
            "linuxpath '{}' cannot be opened for reading: {}",
            linux_path.display(),
            e
        ))
    })?;

    Ok(ServerConfig {
        linux_path,
        reread_on_query,
        use_ssl,
        port,
    })
}
