use std::fmt;

/// Error types for a single row's import.
///
/// Everything except `Transport` is confined to the row that raised it and
/// ends up as that row's outcome text.
#[derive(Debug)]
pub enum ImportError {
    /// A named reference (business unit, policy, team) does not exist
    NotFound {
        collection: String,
        field: String,
        name: String,
    },

    /// A lookup kept failing with a non-success status until the attempt cap
    LookupFailed {
        collection: String,
        name: String,
        status: u16,
    },

    /// The creation request was rejected
    Creation { status: u16, body: Option<String> },

    /// The legacy update reported an error after the application was created
    LegacyUpdate(String),

    /// A response could not be interpreted
    MalformedResponse(String),

    /// A request never completed; ends the whole run
    Transport(anyhow::Error),
}

impl ImportError {
    pub fn not_found(collection: &str, field: &str, name: &str) -> Self {
        ImportError::NotFound {
            collection: collection.to_string(),
            field: field.to_string(),
            name: name.to_string(),
        }
    }

    /// Whether the error must stop the run instead of being recorded on the row
    pub fn is_fatal(&self) -> bool {
        matches!(self, ImportError::Transport(_))
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotFound {
                collection,
                field,
                name,
            } => {
                write!(
                    f,
                    "ERROR: No {} with {} equal to '{}' found",
                    collection, field, name
                )
            }
            ImportError::LookupFailed {
                collection,
                name,
                status,
            } => {
                write!(
                    f,
                    "ERROR: trying to get {} named {} (last status {})",
                    collection, name, status
                )
            }
            ImportError::Creation { status, body } => {
                write!(f, "Unable to create application profile: {}", status)?;

                match body {
                    Some(body) => write!(f, " - {}", body),
                    None => Ok(()),
                }
            }
            ImportError::LegacyUpdate(msg) => {
                write!(
                    f,
                    "ERROR: Unable to add xml-only fields to application: {}",
                    msg
                )
            }
            ImportError::MalformedResponse(msg) => {
                write!(f, "ERROR: Unexpected response: {}", msg)
            }
            ImportError::Transport(err) => {
                write!(f, "Request failed: {:#}", err)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Transport(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::MalformedResponse(err.to_string())
    }
}

impl From<quick_xml::Error> for ImportError {
    fn from(err: quick_xml::Error) -> Self {
        ImportError::MalformedResponse(err.to_string())
    }
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;
