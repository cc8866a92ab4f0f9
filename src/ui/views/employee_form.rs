use crate::api::types::{format_salary, Employee, EmployeeDraft, PhotoUpload};
use crate::nav::{Route, ScheduledNavigation};
use crate::query::{Mutation, Query};
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::renderfns::{centered_rect, panel, status_line};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ViewContext;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::path::Path;

const FIRST_NAME: usize = 0;
const LAST_NAME: usize = 1;
const EMAIL: usize = 2;
const POSITION: usize = 3;
const SALARY: usize = 4;
const DATE_OF_JOINING: usize = 5;
const DEPARTMENT: usize = 6;
const PHOTO: usize = 7;

/// Add or edit
enum Mode {
  Add,
  Update {
    id: String,
    /// Current record, used to pre-fill the form
    current: Query<Option<Employee>>,
    prefilled: bool,
  },
}

/// Create/update form. Both redirect to the directory a few seconds after a
/// successful save.
pub struct EmployeeFormView {
  ctx: ViewContext,
  mode: Mode,
  form: Form,
  save: Mutation<Option<Employee>>,
  invalid: Option<String>,
  redirect: Option<ScheduledNavigation>,
}

fn employee_fields() -> Form {
  Form::new(vec![
    FormField::text("First name"),
    FormField::text("Last name"),
    FormField::text("Email").with_hint("example@domain.com"),
    FormField::text("Position"),
    FormField::text("Salary").with_hint("e.g. 75000"),
    FormField::text("Date of joining").with_hint("YYYY-MM-DD"),
    FormField::text("Department"),
    FormField::text("Photo").with_hint("path to an image file (optional)"),
  ])
}

impl EmployeeFormView {
  pub fn add(ctx: ViewContext) -> Self {
    Self {
      ctx,
      mode: Mode::Add,
      form: employee_fields(),
      save: Mutation::new(),
      invalid: None,
      redirect: None,
    }
  }

  pub fn update(ctx: ViewContext, id: String) -> Self {
    let directory = ctx.directory.clone();
    let employee_id = id.clone();
    let mut current = Query::new(move || {
      let directory = directory.clone();
      let id = employee_id.clone();
      async move {
        directory
          .get_employee_by_id(Some(&id))
          .await
          .map_err(|e| e.display_message())
      }
    })
    .with_options(&ctx.directory.detail_options())
    .with_enabled(!id.is_empty());

    current.fetch();

    Self {
      ctx,
      mode: Mode::Update {
        id,
        current,
        prefilled: false,
      },
      form: employee_fields(),
      save: Mutation::new(),
      invalid: None,
      redirect: None,
    }
  }

  fn prefill(&mut self, employee: &Employee) {
    let draft = EmployeeDraft::from_employee(employee);
    self.form.set_value(FIRST_NAME, &draft.first_name);
    self.form.set_value(LAST_NAME, &draft.last_name);
    self.form.set_value(EMAIL, &draft.email);
    self.form.set_value(POSITION, &draft.position);
    self.form.set_value(
      SALARY,
      &draft.salary.map(format_salary).unwrap_or_default(),
    );
    self.form.set_value(
      DATE_OF_JOINING,
      &draft
        .date_of_joining
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default(),
    );
    self.form.set_value(DEPARTMENT, &draft.department);
  }

  /// Whether the form can be edited and submitted right now
  fn ready(&self) -> bool {
    match &self.mode {
      Mode::Add => true,
      Mode::Update { prefilled, .. } => *prefilled,
    }
  }

  fn submit(&mut self) {
    if !self.ready() || self.save.is_pending() {
      return;
    }

    let draft = match draft_from_form(&self.form) {
      Ok(draft) => draft,
      Err(message) => {
        self.invalid = Some(message);
        return;
      }
    };
    self.invalid = None;

    let directory = self.ctx.directory.clone();
    match &self.mode {
      Mode::Add => {
        self.save.mutate(async move {
          directory
            .create_employee(&draft)
            .await
            .map_err(|e| e.display_message())
        });
      }
      Mode::Update { id, .. } => {
        let id = id.clone();
        self.save.mutate(async move {
          directory
            .update_employee(&id, &draft)
            .await
            .map_err(|e| e.display_message())
        });
      }
    }
  }

  fn title(&self) -> String {
    let base = match &self.mode {
      Mode::Add => "Add New Employee".to_string(),
      Mode::Update { id, .. } => format!("Update Employee {}", id),
    };
    if self.save.is_pending() {
      format!("{} (saving...)", base)
    } else {
      base
    }
  }

  fn success_message(&self) -> Option<String> {
    let verb = match self.mode {
      Mode::Add => "added",
      Mode::Update { .. } => "updated",
    };
    self.save.is_success().then(|| {
      format!(
        "Employee {}! Redirecting to the dashboard in {} seconds...",
        verb,
        self.ctx.redirect_delay.as_secs()
      )
    })
  }

  /// Message replacing the form while the record to edit is unavailable
  fn blocking_message(&self) -> Option<(String, Color)> {
    let Mode::Update { id, current, prefilled } = &self.mode else {
      return None;
    };
    if *prefilled {
      return None;
    }

    if id.is_empty() {
      return Some(("No employee ID was given.".to_string(), Color::Yellow));
    }
    if let Some(error) = current.error() {
      return Some((format!("Error: {}", error), Color::Red));
    }
    if let Some(None) = current.data() {
      return Some((format!("Employee {} does not exist.", id), Color::Yellow));
    }
    Some(("Loading employee...".to_string(), Color::DarkGray))
  }
}

/// Validate and convert the form into a draft.
fn draft_from_form(form: &Form) -> Result<EmployeeDraft, String> {
  let required = [
    (FIRST_NAME, "First name"),
    (LAST_NAME, "Last name"),
    (EMAIL, "Email"),
  ];
  if let Some((_, label)) = required.iter().find(|(i, _)| form.trimmed(*i).is_empty()) {
    return Err(format!("{} is required.", label));
  }

  let salary = match form.trimmed(SALARY) {
    "" => None,
    s => Some(
      s.parse::<f64>()
        .map_err(|_| format!("Salary must be a number, got '{}'.", s))?,
    ),
  };

  let date_of_joining = match form.trimmed(DATE_OF_JOINING) {
    "" => None,
    s => Some(
      NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Date of joining must be YYYY-MM-DD, got '{}'.", s))?,
    ),
  };

  let photo = match form.trimmed(PHOTO) {
    "" => None,
    path => Some(
      PhotoUpload::from_path(Path::new(path))
        .map_err(|e| format!("Cannot read photo '{}': {}", path, e))?,
    ),
  };

  Ok(EmployeeDraft {
    first_name: form.trimmed(FIRST_NAME).to_string(),
    last_name: form.trimmed(LAST_NAME).to_string(),
    email: form.trimmed(EMAIL).to_string(),
    position: form.trimmed(POSITION).to_string(),
    department: form.trimmed(DEPARTMENT).to_string(),
    salary,
    date_of_joining,
    photo,
  })
}

impl View for EmployeeFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if !self.ready() {
      return match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
          ViewAction::Navigate(Route::Dashboard)
        }
        KeyCode::Char('r') => {
          if let Mode::Update { current, .. } = &mut self.mode {
            current.refetch();
          }
          ViewAction::None
        }
        _ => ViewAction::None,
      };
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(),
      KeyResult::Event(FormEvent::Cancel) => return ViewAction::Navigate(Route::Dashboard),
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = centered_rect(80, self.form.height() + 5, area);
    let block = panel(&self.title(), Color::Blue);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some((message, color)) = self.blocking_message() {
      frame.render_widget(
        Paragraph::new(message).style(Style::default().fg(color)),
        inner,
      );
      return;
    }

    let chunks = Layout::vertical([Constraint::Length(2), Constraint::Min(self.form.height())])
      .split(inner);

    let error = self.invalid.as_deref().or(self.save.error());
    let success = self.success_message();
    status_line(frame, chunks[0], error, success.as_deref());
    self.form.render(frame, chunks[1], self.save.is_pending());
  }

  fn tick(&mut self) {
    let mut loaded = None;
    if let Mode::Update {
      current, prefilled, ..
    } = &mut self.mode
    {
      if current.poll() && !*prefilled {
        if let Some(Some(employee)) = current.data() {
          loaded = Some(employee.clone());
          *prefilled = true;
        }
      }
    }
    if let Some(employee) = loaded {
      self.prefill(&employee);
    }

    if self.save.poll() && self.save.is_success() {
      if let Mode::Add = self.mode {
        self.form.clear();
      }
      self.redirect = Some(
        self
          .ctx
          .navigator
          .schedule(Route::Dashboard, self.ctx.redirect_delay),
      );
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("tab", "next field").with_priority(10),
      Shortcut::new("^s", "save").with_priority(20),
      Shortcut::new("esc", "cancel").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled() -> Form {
    let mut form = employee_fields();
    form.set_value(FIRST_NAME, "Jane");
    form.set_value(LAST_NAME, "Doe");
    form.set_value(EMAIL, "jane@x.com");
    form.set_value(POSITION, "Engineer");
    form.set_value(SALARY, "75000");
    form.set_value(DATE_OF_JOINING, "2024-01-01");
    form.set_value(DEPARTMENT, "Tech");
    form
  }

  #[test]
  fn test_draft_from_form() {
    let draft = draft_from_form(&filled()).unwrap();
    assert_eq!(draft.email, "jane@x.com");
    assert_eq!(draft.salary, Some(75000.0));
    assert_eq!(draft.date_of_joining, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert!(draft.photo.is_none());
  }

  #[test]
  fn test_optional_fields_may_be_empty() {
    let mut form = filled();
    form.set_value(SALARY, "");
    form.set_value(DATE_OF_JOINING, " ");
    let draft = draft_from_form(&form).unwrap();
    assert_eq!(draft.salary, None);
    assert_eq!(draft.date_of_joining, None);
  }

  #[test]
  fn test_validation_messages() {
    let mut form = filled();
    form.set_value(EMAIL, "");
    assert_eq!(draft_from_form(&form).unwrap_err(), "Email is required.");

    let mut form = filled();
    form.set_value(SALARY, "lots");
    assert!(draft_from_form(&form).unwrap_err().starts_with("Salary"));

    let mut form = filled();
    form.set_value(DATE_OF_JOINING, "01/02/2024");
    assert!(draft_from_form(&form).unwrap_err().starts_with("Date of joining"));

    let mut form = filled();
    form.set_value(PHOTO, "/definitely/not/here.png");
    assert!(draft_from_form(&form).unwrap_err().starts_with("Cannot read photo"));
  }
}
