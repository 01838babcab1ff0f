//! Organizer configuration.
//!
//! Configuration is a JSON file whose options all have defaults. A missing
//! file is created with the defaults so it can be edited in place; a file
//! that fails to parse or validate stops the organizer before any cycle
//! runs.

mod model;
mod validation;

use std::path::Path;
use std::time::Duration;

use tracing::info;

pub use model::{ArchiveSettings, Config, DEFAULT_DOCUMENTS_PATH, Folders, ReadingDetection};
pub use validation::{ValidationError, ValidationResult, validate_config};

use crate::fsio::{bounded, read_optional, write_atomic};
use crate::{Error, Result};

/// Limit for reading or creating the configuration file.
const CONFIG_IO_TIMEOUT: Duration = Duration::from_secs(10);

impl Config {
    /// Parse and validate a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid JSON for a
    /// configuration or any option fails validation.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("cannot parse configuration: {e}")))?;
        config.validated()
    }

    /// Check every option, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing each invalid option.
    pub fn validated(self) -> Result<Self> {
        validate_config(&self).map_err(|errors| {
            let problems: Vec<String> = errors.iter().map(ToString::to_string).collect();
            Error::Config(problems.join("; "))
        })?;
        Ok(self)
    }

    /// Load the configuration at `path`, writing the defaults there first
    /// if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or created, or if it is
    /// malformed or invalid.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if let Some(bytes) = read_optional(path, CONFIG_IO_TIMEOUT).await? {
            let text = String::from_utf8(bytes).map_err(|e| {
                Error::Config(format!("{} is not valid UTF-8: {e}", path.display()))
            })?;
            return Self::from_json(&text)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())));
        }

        let config = Self::default();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            bounded(CONFIG_IO_TIMEOUT, tokio::fs::create_dir_all(parent)).await?;
        }
        let bytes = serde_json::to_vec_pretty(&config)?;
        write_atomic(path, bytes, CONFIG_IO_TIMEOUT).await?;
        info!(path = %path.display(), "Created default configuration");
        Ok(config)
    }
}
