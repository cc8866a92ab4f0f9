//! The single chokepoint for calls to the backend.
//!
//! Every request gets the session's bearer token when there is one. A 401
//! from any endpoint ends the session and sends the user to the login view,
//! and the error still goes back to the caller so its pending state settles.

use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::error::{HttpError, HttpResult};
use crate::nav::{Navigator, Route};
use crate::session::Session;

/// Request payload
pub enum Body {
  Json(Value),
  Multipart(Form),
}

#[derive(Clone)]
pub struct HttpClient {
  http: reqwest::Client,
  base_url: Url,
  session: Arc<Session>,
  navigator: Navigator,
}

impl HttpClient {
  pub fn new(
    base_url: &str,
    timeout: Duration,
    session: Arc<Session>,
    navigator: Navigator,
  ) -> HttpResult<Self> {
    let base_url = Url::parse(base_url).map_err(|e| HttpError::Request(e.to_string()))?;
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(HttpError::from_reqwest)?;

    Ok(Self {
      http,
      base_url,
      session,
      navigator,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn session(&self) -> &Arc<Session> {
    &self.session
  }

  /// Resolve an API path (e.g. `/emp/employees/7`) against the base URL,
  /// keeping the base's own path prefix.
  fn endpoint(&self, path: &str) -> HttpResult<Url> {
    let base = self.base_url.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{}/{}", base, path)).map_err(|e| HttpError::Request(e.to_string()))
  }

  /// Send one request and return the parsed JSON body (`Null` when empty).
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<Body>,
    query: &[(&str, &str)],
  ) -> HttpResult<Value> {
    let url = self.endpoint(path)?;
    let mut builder = self.http.request(method.clone(), url);

    if !query.is_empty() {
      builder = builder.query(query);
    }

    // No token is fine, the backend decides what anonymous callers may do
    if let Some(token) = self.session.token() {
      builder = builder.bearer_auth(token);
    }

    builder = match body {
      Some(Body::Json(value)) => builder.json(&value),
      Some(Body::Multipart(form)) => builder.multipart(form),
      None => builder,
    };

    debug!(%method, path, "sending request");
    let response = builder.send().await.map_err(|e| {
      let err = HttpError::from_reqwest(e);
      warn!(%method, path, error = %err, "request failed");
      err
    })?;

    let status = response.status();
    let text = response.text().await;

    // The session ends on a 401 even when its body cannot be read
    if status == StatusCode::UNAUTHORIZED {
      self.expire_session(path);
      return Err(HttpError::from_status(status, text.as_deref().unwrap_or_default()));
    }

    let text = text.map_err(HttpError::from_reqwest)?;

    if !status.is_success() {
      let err = HttpError::from_status(status, &text);
      warn!(%method, path, status = status.as_u16(), error = %err.display_message(), "request rejected");
      return Err(err);
    }

    debug!(%method, path, status = status.as_u16(), "request succeeded");

    if text.trim().is_empty() {
      return Ok(Value::Null);
    }
    // A 2xx is a success whatever its body; callers decide what they need
    match serde_json::from_str(&text) {
      Ok(value) => Ok(value),
      Err(_) => {
        debug!(%method, path, "response body is not JSON");
        Ok(Value::String(text))
      }
    }
  }

  pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> HttpResult<Value> {
    self.request(Method::GET, path, None, query).await
  }

  pub async fn post(&self, path: &str, body: Body) -> HttpResult<Value> {
    self.request(Method::POST, path, Some(body), &[]).await
  }

  pub async fn put(&self, path: &str, body: Body) -> HttpResult<Value> {
    self.request(Method::PUT, path, Some(body), &[]).await
  }

  pub async fn delete(&self, path: &str) -> HttpResult<Value> {
    self.request(Method::DELETE, path, None, &[]).await
  }

  fn expire_session(&self, path: &str) {
    info!(path, "received 401, ending session");
    self.session.sign_out();
    self.navigator.navigate(Route::Login);
  }
}

impl std::fmt::Debug for HttpClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HttpClient")
      .field("base_url", &self.base_url.as_str())
      .field("session", &self.session)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client(base: &str) -> HttpClient {
    let (navigator, _rx) = Navigator::new();
    HttpClient::new(
      base,
      Duration::from_secs(5),
      Arc::new(Session::in_memory()),
      navigator,
    )
    .unwrap()
  }

  #[test]
  fn test_endpoint_keeps_base_path() {
    let client = client("http://localhost:3000/api/v1");
    assert_eq!(
      client.endpoint("/emp/employees/7").unwrap().as_str(),
      "http://localhost:3000/api/v1/emp/employees/7"
    );

    let client = self::client("http://localhost:3000/api/v1/");
    assert_eq!(
      client.endpoint("user/login").unwrap().as_str(),
      "http://localhost:3000/api/v1/user/login"
    );
  }

  #[test]
  fn test_invalid_base_url() {
    let (navigator, _rx) = Navigator::new();
    let result = HttpClient::new(
      "::nope::",
      Duration::from_secs(5),
      Arc::new(Session::in_memory()),
      navigator,
    );
    assert!(matches!(result, Err(HttpError::Request(_))));
  }

  /// One-shot server answering any request with `response`, then hanging up.
  async fn serve_raw(response: &'static str) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let (mut socket, _) = listener.accept().await.unwrap();
      let mut buf = [0u8; 4096];
      let _ = socket.read(&mut buf).await;
      let _ = socket.write_all(response.as_bytes()).await;
    });
    format!("http://{}/api", addr)
  }

  #[tokio::test]
  async fn test_unreadable_401_body_still_ends_session() {
    // Promises 100 bytes, sends a few, closes
    let base = serve_raw("HTTP/1.1 401 Unauthorized\r\ncontent-length: 100\r\n\r\n{\"mess").await;
    let session = Arc::new(Session::in_memory());
    session.sign_in("t0k".to_string());
    let (navigator, mut routes) = Navigator::new();
    let client = HttpClient::new(&base, Duration::from_secs(5), session.clone(), navigator).unwrap();

    let err = client.get("/emp/employees", &[]).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert!(!session.is_authenticated());
    assert_eq!(routes.try_recv().ok(), Some(Route::Login));
  }

  #[tokio::test]
  async fn test_plain_text_success_body_is_not_an_error() {
    let base = serve_raw("HTTP/1.1 200 OK\r\ncontent-length: 7\r\nconnection: close\r\n\r\nUpdated").await;
    let client = client(&base);

    let body = client.get("/emp/employees/1", &[]).await.unwrap();
    assert_eq!(body, Value::String("Updated".to_string()));
  }

  #[tokio::test]
  async fn test_connection_refused_is_transport_error() {
    // Port 9 (discard) is closed on any sane test machine
    let client = client("http://127.0.0.1:9/api");
    let err = client.get("/emp/employees", &[]).await.unwrap_err();
    assert!(matches!(err, HttpError::Transport(_) | HttpError::Timeout));
  }
}
