use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::sync::Arc;

use super::api_types::{decode_employee, decode_employees, decode_login, decode_user};
use super::error::{HttpError, HttpResult};
use super::http::{Body, HttpClient};
use super::types::{Credentials, Employee, EmployeeDraft, LoginResponse, SignupRequest, User};
use crate::config::ApiConfig;
use crate::nav::Navigator;
use crate::session::Session;

const EMPLOYEES: &str = "/emp/employees";

/// Employee management API client, one method per endpoint, no caching
#[derive(Clone, Debug)]
pub struct ApiClient {
  http: HttpClient,
}

impl ApiClient {
  pub fn new(config: &ApiConfig, session: Arc<Session>, navigator: Navigator) -> HttpResult<Self> {
    let timeout = std::time::Duration::from_secs(config.timeout_secs);
    let http = HttpClient::new(&config.base_url, timeout, session, navigator)?;
    Ok(Self { http })
  }

  pub fn http(&self) -> &HttpClient {
    &self.http
  }

  /// Exchange credentials for a token
  pub async fn login(&self, credentials: &Credentials) -> HttpResult<LoginResponse> {
    let body = serde_json::to_value(credentials).map_err(|e| HttpError::Request(e.to_string()))?;
    let response = self.http.post("/user/login", Body::Json(body)).await?;
    decode_login(response)
  }

  /// Register a new account
  pub async fn signup(&self, request: &SignupRequest) -> HttpResult<User> {
    let body = serde_json::to_value(request).map_err(|e| HttpError::Request(e.to_string()))?;
    let response = self.http.post("/user/signup", Body::Json(body)).await?;
    decode_user(response)
  }

  /// List employees, optionally filtered by a free-text search term
  pub async fn list_employees(&self, search: &str) -> HttpResult<Vec<Employee>> {
    let query: Vec<(&str, &str)> = if search.is_empty() {
      Vec::new()
    } else {
      vec![("search", search)]
    };

    let response = self.http.get(EMPLOYEES, &query).await?;
    decode_employees(response)
  }

  /// Get a single employee by id
  pub async fn get_employee(&self, id: &str) -> HttpResult<Employee> {
    let response = self.http.get(&employee_path(id), &[]).await?;
    decode_employee(response)
  }

  /// Employees in a department
  pub async fn search_by_department(&self, department: &str) -> HttpResult<Vec<Employee>> {
    let response = self
      .http
      .get(&format!("{}/search", EMPLOYEES), &[("department", department)])
      .await?;
    decode_employees(response)
  }

  /// Create an employee. Returns the raw response body so the caller can
  /// act on success before decoding it.
  pub async fn create_employee(&self, draft: &EmployeeDraft) -> HttpResult<Value> {
    self
      .http
      .post(EMPLOYEES, Body::Multipart(employee_form(draft)?))
      .await
  }

  /// Replace an employee's fields. Returns the raw response body.
  pub async fn update_employee(&self, id: &str, draft: &EmployeeDraft) -> HttpResult<Value> {
    self
      .http
      .put(&employee_path(id), Body::Multipart(employee_form(draft)?))
      .await
  }

  pub async fn delete_employee(&self, id: &str) -> HttpResult<()> {
    self.http.delete(&employee_path(id)).await?;
    Ok(())
  }
}

fn employee_path(id: &str) -> String {
  // Ids come from the backend or the route; keep them to one path segment
  let segment: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
  format!("{}/{}", EMPLOYEES, segment)
}

/// Build the multipart body for create/update.
fn employee_form(draft: &EmployeeDraft) -> HttpResult<Form> {
  let mut form = Form::new();
  for (name, value) in draft.text_fields() {
    form = form.text(name, value);
  }

  if let Some(photo) = &draft.photo {
    let part = Part::bytes(photo.bytes.clone())
      .file_name(photo.file_name.clone())
      .mime_str(&photo.media_type)
      .map_err(|e| HttpError::Request(format!("invalid photo media type: {}", e)))?;
    form = form.part("photo", part);
  }

  Ok(form)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::PhotoUpload;

  #[test]
  fn test_employee_path_escapes_segment() {
    assert_eq!(employee_path("42"), "/emp/employees/42");
    assert_eq!(employee_path("a/b"), "/emp/employees/a%2Fb");
  }

  #[test]
  fn test_form_rejects_bad_media_type() {
    let draft = EmployeeDraft {
      photo: Some(PhotoUpload {
        file_name: "x".into(),
        media_type: "not a mime".into(),
        bytes: vec![1, 2, 3],
      }),
      ..EmployeeDraft::default()
    };
    assert!(matches!(employee_form(&draft), Err(HttpError::Request(_))));
  }

  #[test]
  fn test_form_with_photo_builds() {
    let draft = EmployeeDraft {
      first_name: "Jane".into(),
      photo: Some(PhotoUpload {
        file_name: "jane.png".into(),
        media_type: "image/png".into(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
      }),
      ..EmployeeDraft::default()
    };
    assert!(employee_form(&draft).is_ok());
  }
}
