//! Serde-deserializable types matching the backend's responses.
//!
//! The backend is loose about shapes (ids as numbers or strings, salaries as
//! strings, dates as full timestamps, payloads sometimes wrapped in `data`),
//! so it is absorbed here and the domain types stay strict.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::{HttpError, HttpResult};
use super::types::{Employee, LoginResponse, Photo, User};

/// Decode a response body, unwrapping a `{ "data": ... }` envelope if present.
pub fn decode_payload<T: DeserializeOwned>(body: Value) -> HttpResult<T> {
  let payload = match body {
    Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
    other => other,
  };

  serde_json::from_value(payload).map_err(|e| HttpError::Decode(e.to_string()))
}

// ============================================================================
// Loosely-typed scalars
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiId {
  Number(i64),
  Text(String),
}

impl ApiId {
  fn into_string(self) -> String {
    match self {
      ApiId::Number(n) => n.to_string(),
      ApiId::Text(s) => s,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiNumber {
  Number(f64),
  Text(String),
}

impl ApiNumber {
  fn as_f64(&self) -> Option<f64> {
    match self {
      ApiNumber::Number(n) => Some(*n),
      ApiNumber::Text(s) => s.trim().parse().ok(),
    }
  }
}

/// Parse `2024-01-01` or `2024-01-01T00:00:00.000Z`, keeping the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
  let date_part = raw.split('T').next()?.trim();
  NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

// ============================================================================
// Employee
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiEmployee {
  pub employee_id: Option<ApiId>,
  pub id: Option<ApiId>,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub position: String,
  #[serde(default)]
  pub department: String,
  pub salary: Option<ApiNumber>,
  pub date_of_joining: Option<String>,
  // Base64 text; anything else (e.g. a serialized buffer) is ignored
  pub photo: Option<Value>,
  #[serde(rename = "photoType")]
  pub photo_type: Option<String>,
}

impl ApiEmployee {
  pub fn into_employee(self) -> HttpResult<Employee> {
    let id = self
      .employee_id
      .or(self.id)
      .map(ApiId::into_string)
      .ok_or_else(|| HttpError::Decode("employee record without an id".to_string()))?;

    let photo = match self.photo {
      Some(Value::String(base64)) if !base64.is_empty() => Some(Photo {
        media_type: self
          .photo_type
          .unwrap_or_else(|| "application/octet-stream".to_string()),
        base64,
      }),
      _ => None,
    };

    Ok(Employee {
      id,
      first_name: self.first_name,
      last_name: self.last_name,
      email: self.email,
      position: self.position,
      department: self.department,
      salary: self.salary.as_ref().and_then(ApiNumber::as_f64),
      date_of_joining: self.date_of_joining.as_deref().and_then(parse_date),
      photo,
    })
  }
}

pub fn decode_employee(body: Value) -> HttpResult<Employee> {
  decode_payload::<ApiEmployee>(body)?.into_employee()
}

/// Decode a list; a missing or null payload is an empty directory.
pub fn decode_employees(body: Value) -> HttpResult<Vec<Employee>> {
  let records: Option<Vec<ApiEmployee>> = decode_payload(body)?;
  records
    .unwrap_or_default()
    .into_iter()
    .map(ApiEmployee::into_employee)
    .collect()
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiLoginResponse {
  token: Option<String>,
  #[serde(rename = "accessToken")]
  access_token: Option<String>,
}

pub fn decode_login(body: Value) -> HttpResult<LoginResponse> {
  // Token may sit at the top level or inside `data`
  let top: ApiLoginResponse =
    serde_json::from_value(body.clone()).map_err(|e| HttpError::Decode(e.to_string()))?;
  let token = match top.token.or(top.access_token) {
    Some(token) => Some(token),
    None => decode_payload::<ApiLoginResponse>(body)
      .ok()
      .and_then(|inner| inner.token.or(inner.access_token)),
  };

  match token {
    Some(token) if !token.is_empty() => Ok(LoginResponse { token }),
    _ => Err(HttpError::Decode("login response without a token".to_string())),
  }
}

pub fn decode_user(body: Value) -> HttpResult<User> {
  match body {
    Value::Null => Ok(User::default()),
    body => Ok(decode_payload::<Option<User>>(body)?.unwrap_or_default()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_decode_wrapped_list() {
    let body = json!({
      "data": [
        {
          "id": 9,
          "employee_id": "E-1",
          "first_name": "Jane",
          "last_name": "Doe",
          "email": "jane@x.com",
          "position": "Engineer",
          "department": "Tech",
          "salary": "75000",
          "date_of_joining": "2024-01-01T00:00:00.000Z"
        }
      ]
    });

    let employees = decode_employees(body).unwrap();
    assert_eq!(employees.len(), 1);
    let jane = &employees[0];
    assert_eq!(jane.id, "E-1");
    assert_eq!(jane.salary, Some(75000.0));
    assert_eq!(jane.date_of_joining, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert!(jane.photo.is_none());
  }

  #[test]
  fn test_decode_bare_record_with_numeric_id_and_photo() {
    let body = json!({
      "employee_id": 42,
      "first_name": "Ann",
      "salary": 1000,
      "photo": "aGVsbG8=",
      "photoType": "image/png"
    });

    let employee = decode_employee(body).unwrap();
    assert_eq!(employee.id, "42");
    assert_eq!(employee.salary, Some(1000.0));
    assert_eq!(employee.photo.unwrap().media_type, "image/png");
  }

  #[test]
  fn test_record_without_id_is_decode_error() {
    let err = decode_employee(json!({ "data": { "first_name": "X" } })).unwrap_err();
    assert!(matches!(err, HttpError::Decode(_)));
  }

  #[test]
  fn test_null_list_is_empty() {
    assert!(decode_employees(json!({ "data": null })).unwrap().is_empty());
  }

  #[test]
  fn test_decode_login_variants() {
    assert_eq!(decode_login(json!({ "token": "t1" })).unwrap().token, "t1");
    assert_eq!(
      decode_login(json!({ "data": { "token": "t2" } })).unwrap().token,
      "t2"
    );
    assert!(decode_login(json!({ "message": "ok" })).is_err());
  }

  #[test]
  fn test_decode_user() {
    let user = decode_user(json!({ "data": { "username": "jd", "email": "jd@x.com" } })).unwrap();
    assert_eq!(user.username.as_deref(), Some("jd"));
    assert_eq!(decode_user(Value::Null).unwrap(), User::default());
  }

  #[test]
  fn test_parse_date() {
    assert_eq!(parse_date("2023-12-31"), NaiveDate::from_ymd_opt(2023, 12, 31));
    assert_eq!(parse_date("garbage"), None);
  }
}
