//! Value parsers for CLI arguments that clap cannot check on its own

use std::fs;
use std::path::PathBuf;

/// Largest block timeout accepted on the command line, one hour
const MAX_BLOCK_TIMEOUT_SECONDS: u64 = 3600;

/// Validate that a file path exists, is a file and is readable
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!(
            "Cannot read configuration file '{}': {}",
            path_str, e
        )),
    }
}

/// Validate the worker block timeout in whole seconds.
///
/// Zero is rejected: a zero BRPOP timeout blocks forever.
pub fn validate_block_timeout(value: &str) -> Result<u64, String> {
    let seconds: u64 = value.trim().parse().map_err(|_| {
        format!(
            "Block timeout must be a whole number of seconds, got: '{}'",
            value
        )
    })?;

    if seconds == 0 {
        return Err("Block timeout must be at least 1 second".to_string());
    }

    if seconds > MAX_BLOCK_TIMEOUT_SECONDS {
        return Err(format!(
            "Block timeout cannot exceed {} seconds",
            MAX_BLOCK_TIMEOUT_SECONDS
        ));
    }

    Ok(seconds)
}
