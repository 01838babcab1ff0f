//! Configuration validation.

use chrono::format::{Item, StrftimeItems};

use super::model::Config;

/// Validation error for the organizer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// To-read folder name is empty.
    EmptyToReadFolder,
    /// Read folder name is empty.
    EmptyReadFolder,
    /// Archive folder name is empty.
    EmptyArchiveFolder,
    /// Two managed folders share a name.
    DuplicateFolderNames,
    /// A folder name contains a path separator.
    FolderNameWithSeparator,
    /// A source pattern is blank.
    BlankSourcePattern,
    /// No source patterns and web-name detection is off.
    NoSourcePatterns,
    /// Poll interval is zero.
    ZeroPollInterval,
    /// I/O timeout is zero.
    ZeroIoTimeout,
    /// Pages threshold is outside `[0, 1]`.
    PagesThresholdOutOfRange,
    /// Date format is empty.
    EmptyDateFormat,
    /// Date format contains an invalid specifier.
    InvalidDateFormat,
    /// Documents path is empty.
    EmptyDocumentsPath,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyToReadFolder => "To-read folder name is required",
            Self::EmptyReadFolder => "Read folder name is required",
            Self::EmptyArchiveFolder => "Archive folder name is required",
            Self::DuplicateFolderNames => "Folder names must be distinct",
            Self::FolderNameWithSeparator => "Folder names must not contain '/'",
            Self::BlankSourcePattern => "Source patterns must not be blank",
            Self::NoSourcePatterns => {
                "At least one source pattern is required unless detect_web_names is on"
            }
            Self::ZeroPollInterval => "Poll interval must be at least 1 second",
            Self::ZeroIoTimeout => "I/O timeout must be at least 1 second",
            Self::PagesThresholdOutOfRange => "Pages threshold must be between 0 and 1",
            Self::EmptyDateFormat => "Date format is required",
            Self::InvalidDateFormat => "Date format contains an invalid specifier",
            Self::EmptyDocumentsPath => "Documents path is required",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyToReadFolder => "folders.to_read",
            Self::EmptyReadFolder => "folders.read",
            Self::EmptyArchiveFolder => "folders.archive",
            Self::DuplicateFolderNames | Self::FolderNameWithSeparator => "folders",
            Self::BlankSourcePattern | Self::NoSourcePatterns => "source_patterns",
            Self::ZeroPollInterval => "poll_interval",
            Self::ZeroIoTimeout => "io_timeout",
            Self::PagesThresholdOutOfRange => "reading_detection.pages_threshold",
            Self::EmptyDateFormat | Self::InvalidDateFormat => "date_format",
            Self::EmptyDocumentsPath => "documents_path",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field(), self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a configuration.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a configuration.
///
/// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all errors.
///
/// # Errors
///
/// Returns a vector of `ValidationError` if any options are invalid.
pub fn validate_config(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();

    // Folders
    let folders = [
        (&config.folders.to_read, ValidationError::EmptyToReadFolder),
        (&config.folders.read, ValidationError::EmptyReadFolder),
        (&config.folders.archive, ValidationError::EmptyArchiveFolder),
    ];
    for (name, error) in &folders {
        if name.trim().is_empty() {
            errors.push(error.clone());
        }
    }
    let names: Vec<&str> = folders.iter().map(|(name, _)| name.trim()).collect();
    if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
        errors.push(ValidationError::DuplicateFolderNames);
    }
    if names.iter().any(|name| name.contains('/')) {
        errors.push(ValidationError::FolderNameWithSeparator);
    }

    // Detection
    if config.source_patterns.iter().any(|p| p.trim().is_empty()) {
        errors.push(ValidationError::BlankSourcePattern);
    }
    if config.source_patterns.is_empty() && !config.detect_web_names {
        errors.push(ValidationError::NoSourcePatterns);
    }
    if !(0.0..=1.0).contains(&config.reading_detection.pages_threshold) {
        errors.push(ValidationError::PagesThresholdOutOfRange);
    }

    // Timing
    if config.poll_interval == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }
    if config.io_timeout == 0 {
        errors.push(ValidationError::ZeroIoTimeout);
    }

    // Date buckets
    if config.date_format.trim().is_empty() {
        errors.push(ValidationError::EmptyDateFormat);
    } else if !is_valid_date_format(&config.date_format) {
        errors.push(ValidationError::InvalidDateFormat);
    }

    if config.documents_path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyDocumentsPath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Returns true if `format` parses as a `strftime` pattern.
pub(crate) fn is_valid_date_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_date_formats() {
        assert!(is_valid_date_format("%Y-%m-%d"));
        assert!(is_valid_date_format("%B %Y"));
        assert!(is_valid_date_format("plain"));
        assert!(!is_valid_date_format("%Q"));
        assert!(!is_valid_date_format("%Y-%"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.folders.to_read = "  ".to_string();
        config.folders.archive = config.folders.read.clone();
        config.source_patterns.push(String::new());
        config.poll_interval = 0;
        config.io_timeout = 0;
        config.reading_detection.pages_threshold = 1.5;
        config.date_format = "%Q".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::EmptyToReadFolder));
        assert!(errors.contains(&ValidationError::DuplicateFolderNames));
        assert!(errors.contains(&ValidationError::BlankSourcePattern));
        assert!(errors.contains(&ValidationError::ZeroPollInterval));
        assert!(errors.contains(&ValidationError::ZeroIoTimeout));
        assert!(errors.contains(&ValidationError::PagesThresholdOutOfRange));
        assert!(errors.contains(&ValidationError::InvalidDateFormat));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_pages_threshold_bounds_inclusive() {
        let mut config = Config::default();
        config.reading_detection.pages_threshold = 0.0;
        assert!(validate_config(&config).is_ok());
        config.reading_detection.pages_threshold = 1.0;
        assert!(validate_config(&config).is_ok());
        config.reading_detection.pages_threshold = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_patterns_optional_with_web_names() {
        let mut config = Config::default();
        config.source_patterns.clear();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::NoSourcePatterns]
        );

        config.detect_web_names = true;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_error_display_names_field() {
        let error = ValidationError::ZeroPollInterval;
        assert_eq!(
            error.to_string(),
            "poll_interval: Poll interval must be at least 1 second"
        );
    }
}
