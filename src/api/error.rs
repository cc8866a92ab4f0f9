use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Shown when an error carries neither a message nor anything printable.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// Failure of a call to the backend.
///
/// Cloneable so that one in-flight fetch can hand the same outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
  /// No response: connection refused, DNS, TLS, reset
  #[error("network error: {0}")]
  Transport(String),
  #[error("request timed out")]
  Timeout,
  /// 401 - the session is no longer valid
  #[error("not authorized (status {status})")]
  Unauthorized { status: u16, message: Option<String> },
  /// Validation, conflict, not-found and other 4xx
  #[error("request rejected (status {status})")]
  Rejected { status: u16, message: Option<String> },
  #[error("server error (status {status})")]
  Server { status: u16, message: Option<String> },
  /// The response arrived but its body was not what we expected
  #[error("unexpected response: {0}")]
  Decode(String),
  /// The request could not be built
  #[error("invalid request: {0}")]
  Request(String),
}

pub type HttpResult<T> = Result<T, HttpError>;

impl HttpError {
  /// Classify a non-success response, pulling a message out of its body.
  pub fn from_status(status: StatusCode, body: &str) -> Self {
    let message = message_from_text(body);
    let code = status.as_u16();

    if status == StatusCode::UNAUTHORIZED {
      HttpError::Unauthorized {
        status: code,
        message,
      }
    } else if status.is_server_error() {
      HttpError::Server {
        status: code,
        message,
      }
    } else {
      HttpError::Rejected {
        status: code,
        message,
      }
    }
  }

  pub fn from_reqwest(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      HttpError::Timeout
    } else if err.is_builder() {
      HttpError::Request(err.to_string())
    } else {
      HttpError::Transport(err.to_string())
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      HttpError::Unauthorized { status, .. }
      | HttpError::Rejected { status, .. }
      | HttpError::Server { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn is_unauthorized(&self) -> bool {
    matches!(self, HttpError::Unauthorized { .. })
  }

  /// Display text taken from the response body, if the backend sent one.
  pub fn message(&self) -> Option<&str> {
    match self {
      HttpError::Unauthorized { message, .. }
      | HttpError::Rejected { message, .. }
      | HttpError::Server { message, .. } => message.as_deref(),
      _ => None,
    }
  }

  /// Text to show the user: the backend's message when there is one,
  /// otherwise the error's own description.
  pub fn display_message(&self) -> String {
    match self.message() {
      Some(message) if !message.trim().is_empty() => message.to_string(),
      _ => self.to_string(),
    }
  }
}

impl From<serde_json::Error> for HttpError {
  fn from(err: serde_json::Error) -> Self {
    HttpError::Decode(err.to_string())
  }
}

/// Display text for a JSON error object.
///
/// `message` wins, then any scalar's string form; an object or array without
/// a message yields [`UNKNOWN_ERROR`].
pub fn display_body_message(body: &Value) -> String {
  if let Some(message) = message_from_body(body) {
    return message;
  }

  match body {
    Value::String(s) if !s.trim().is_empty() => s.clone(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    _ => UNKNOWN_ERROR.to_string(),
  }
}

/// Pull `message` (or, failing that, `error`) out of an error body.
pub fn message_from_body(body: &Value) -> Option<String> {
  let object = body.as_object()?;
  ["message", "error"]
    .iter()
    .filter_map(|field| object.get(*field))
    .find_map(|value| match value {
      Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
      Value::Object(_) => message_from_body(value),
      _ => None,
    })
}

fn message_from_text(body: &str) -> Option<String> {
  let trimmed = body.trim();
  if trimmed.is_empty() {
    return None;
  }

  match serde_json::from_str::<Value>(trimmed) {
    Ok(value) => Some(display_body_message(&value)),
    // Plain-text bodies are messages as-is, HTML error pages are not
    Err(_) if !trimmed.starts_with('<') => Some(trimmed.to_string()),
    Err(_) => None,
  }
}
