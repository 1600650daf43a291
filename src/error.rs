//! Error types for locales, translation stores, tag registries, rendering and delivery
use std::path::PathBuf;

use thiserror::Error;

/// A locale string that could not be read as a language tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    #[error("Locale code is empty")]
    Empty,
    #[error("Invalid language tag '{tag}': {reason}")]
    Invalid { tag: String, reason: String },
}

/// Failure while (re)loading a translation source.
///
/// A failed reload never replaces the snapshot that was active before it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed entry in '{}' at line {line}: {message}", .path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("Failed to parse JSON from '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid file name: {}", .0.display())]
    InvalidFileName(PathBuf),
    #[error("Translation source '{source_name}' failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },
}

/// Result type for translation store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The argument a [`ParseError`] points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentRef {
    /// Zero-based position of the argument after the tag name.
    pub index: usize,
    pub value: String,
}

/// Raised by the template engine at the tag site that could not be resolved.
///
/// The whole render fails; there is no partial output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{message} in '{tag}' at position {position}{}", describe_argument(.argument))]
    Tag {
        message: String,
        tag: String,
        position: usize,
        argument: Option<ArgumentRef>,
    },
    #[error("Markup nested deeper than {limit} levels in '{tag}' at position {position}")]
    DepthExceeded {
        limit: usize,
        tag: String,
        position: usize,
    },
}

fn describe_argument(argument: &Option<ArgumentRef>) -> String {
    match argument {
        Some(argument) => format!(" (argument {}: '{}')", argument.index + 1, argument.value),
        None => String::new(),
    }
}

impl ParseError {
    /// The offending argument, if the error was raised for one.
    pub fn argument(&self) -> Option<&ArgumentRef> {
        match self {
            ParseError::Tag { argument, .. } => argument.as_ref(),
            ParseError::DepthExceeded { .. } => None,
        }
    }

    /// Byte offset of the failing tag inside the template being parsed.
    pub fn position(&self) -> usize {
        match self {
            ParseError::Tag { position, .. } | ParseError::DepthExceeded { position, .. } => {
                *position
            }
        }
    }
}

/// Invalid configuration detected while freezing a builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Invalid tag name '{0}': names must match [!?#]?[a-z0-9_-]+")]
    InvalidTagName(String),
    #[error("Default locale must not be empty")]
    EmptyDefaultLocale,
    #[error("The phrase tag needs a translation store; create the builder from a renderer")]
    PhraseTagUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Tags(#[from] BuildError),
}

/// A recipient refused or failed to take a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Delivery failed: {message}")]
pub struct DeliveryError {
    pub message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        DeliveryError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid value '{value}' for {variable}")]
    InvalidValue { variable: String, value: String },
}
