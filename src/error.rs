//! Error taxonomy for the data-access layer.

use thiserror::Error;

/// Maximum length for response bodies quoted in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors produced by the Metlink data-access layer.
///
/// The type is `Clone` so that a single in-flight refresh can hand the same
/// outcome to every caller that joined it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// Network or API failure while talking to the transit API
  #[error("Failed to fetch {resource}: {message}")]
  RemoteFetch {
    resource: String,
    status: Option<u16>,
    message: String,
  },

  /// A single cached row could not be persisted
  #[error("Failed to insert {collection} row {key}: {message}")]
  RowInsert {
    collection: &'static str,
    key: String,
    message: String,
  },

  /// The preference store could not be read
  #[error("Failed to read preference {key}: {message}")]
  PreferenceRead { key: String, message: String },

  /// Local store failure (open, clear, read)
  #[error("Store error: {0}")]
  Store(String),

  /// Invalid client configuration
  #[error("Configuration error: {0}")]
  Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  /// Build a remote error from a transport failure.
  pub fn transport(resource: impl Into<String>, err: &reqwest::Error) -> Self {
    Error::RemoteFetch {
      resource: resource.into(),
      status: err.status().map(|s| s.as_u16()),
      message: err.to_string(),
    }
  }

  /// Build a remote error from a non-success HTTP status.
  pub fn from_status(resource: impl Into<String>, status: reqwest::StatusCode, body: &str) -> Self {
    Error::RemoteFetch {
      resource: resource.into(),
      status: Some(status.as_u16()),
      message: format!("Status {}: {}", status, truncate_body(body)),
    }
  }

  /// Whether this error came from the remote API.
  pub fn is_remote(&self) -> bool {
    matches!(self, Error::RemoteFetch { .. })
  }
}

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
  if body.len() <= MAX_ERROR_BODY_LENGTH {
    return body.to_string();
  }
  let mut end = MAX_ERROR_BODY_LENGTH;
  while !body.is_char_boundary(end) {
    end -= 1;
  }
  format!(
    "{}... (truncated, {} total bytes)",
    &body[..end],
    body.len()
  )
}
