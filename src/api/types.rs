use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Employee record as the rest of the client sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
  pub id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub position: String,
  pub department: String,
  pub salary: Option<f64>,
  pub date_of_joining: Option<NaiveDate>,
  pub photo: Option<Photo>,
}

impl Employee {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }
}

/// Stored profile photo, base64 encoded as the backend returns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
  pub media_type: String,
  pub base64: String,
}

impl Photo {
  /// Approximate decoded size in bytes.
  pub fn size(&self) -> usize {
    let padding = self.base64.chars().rev().take_while(|c| *c == '=').count();
    (self.base64.len() / 4 * 3).saturating_sub(padding)
  }
}

/// Fields sent when creating or updating an employee
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeDraft {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub position: String,
  pub department: String,
  pub salary: Option<f64>,
  pub date_of_joining: Option<NaiveDate>,
  pub photo: Option<PhotoUpload>,
}

impl EmployeeDraft {
  /// Start an edit from an existing record. The stored photo is kept
  /// server-side unless a new one is attached.
  pub fn from_employee(employee: &Employee) -> Self {
    Self {
      first_name: employee.first_name.clone(),
      last_name: employee.last_name.clone(),
      email: employee.email.clone(),
      position: employee.position.clone(),
      department: employee.department.clone(),
      salary: employee.salary,
      date_of_joining: employee.date_of_joining,
      photo: None,
    }
  }

  /// Text fields in the order the backend's form expects them.
  pub fn text_fields(&self) -> Vec<(&'static str, String)> {
    vec![
      ("first_name", self.first_name.clone()),
      ("last_name", self.last_name.clone()),
      ("email", self.email.clone()),
      ("position", self.position.clone()),
      ("salary", self.salary.map(format_salary).unwrap_or_default()),
      (
        "date_of_joining",
        self
          .date_of_joining
          .map(|d| d.format("%Y-%m-%d").to_string())
          .unwrap_or_default(),
      ),
      ("department", self.department.clone()),
    ]
  }
}

/// Whole salaries are sent without a fractional part.
pub fn format_salary(salary: f64) -> String {
  if salary.fract() == 0.0 && salary.abs() < 1e15 {
    format!("{}", salary as i64)
  } else {
    salary.to_string()
  }
}

/// Photo file attached to a create/update form
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoUpload {
  pub file_name: String,
  pub media_type: String,
  pub bytes: Vec<u8>,
}

impl PhotoUpload {
  pub fn from_path(path: &Path) -> std::io::Result<Self> {
    let bytes = std::fs::read(path)?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "photo".to_string());

    Ok(Self {
      media_type: media_type_for(path).to_string(),
      file_name,
      bytes,
    })
  }
}

/// Guess an image media type from the file extension.
pub fn media_type_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .map(|e| e.to_string_lossy().to_lowercase())
    .unwrap_or_default();

  match ext.as_str() {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    _ => "application/octet-stream",
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignupRequest {
  pub username: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
  pub token: String,
}

/// Account returned by signup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct User {
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_media_type_for() {
    assert_eq!(media_type_for(Path::new("me.PNG")), "image/png");
    assert_eq!(media_type_for(Path::new("/tmp/a.jpeg")), "image/jpeg");
    assert_eq!(media_type_for(Path::new("noext")), "application/octet-stream");
  }

  #[test]
  fn test_text_fields_formatting() {
    let draft = EmployeeDraft {
      first_name: "Jane".into(),
      last_name: "Doe".into(),
      email: "jane@x.com".into(),
      position: "Engineer".into(),
      department: "Tech".into(),
      salary: Some(75000.0),
      date_of_joining: NaiveDate::from_ymd_opt(2024, 1, 1),
      photo: None,
    };

    let fields = draft.text_fields();
    assert!(fields.contains(&("salary", "75000".to_string())));
    assert!(fields.contains(&("date_of_joining", "2024-01-01".to_string())));
    assert_eq!(fields.len(), 7);
  }

  #[test]
  fn test_fractional_salary() {
    assert_eq!(format_salary(1234.5), "1234.5");
  }

  #[test]
  fn test_full_name_trims_missing_parts() {
    let employee = Employee {
      id: "1".into(),
      first_name: "Cher".into(),
      last_name: String::new(),
      email: String::new(),
      position: String::new(),
      department: String::new(),
      salary: None,
      date_of_joining: None,
      photo: None,
    };
    assert_eq!(employee.full_name(), "Cher");
  }

  #[test]
  fn test_photo_size() {
    let photo = Photo {
      media_type: "image/png".into(),
      base64: "aGVsbG8=".into(),
    };
    assert_eq!(photo.size(), 5);
  }
}
