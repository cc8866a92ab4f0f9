use crate::api::types::{Credentials, LoginResponse};
use crate::query::Mutation;
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::renderfns::{centered_rect, panel, status_line};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ViewContext;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const EMAIL: usize = 0;
const PASSWORD: usize = 1;

/// Sign-in screen. A successful login moves straight to the directory.
pub struct LoginView {
  ctx: ViewContext,
  form: Form,
  login: Mutation<LoginResponse>,
  /// Validation message, shown instead of the request error
  invalid: Option<String>,
}

impl LoginView {
  pub fn new(ctx: ViewContext) -> Self {
    Self {
      ctx,
      form: Form::new(vec![
        FormField::text("Email").with_hint("example@domain.com"),
        FormField::secret("Password"),
      ]),
      login: Mutation::new(),
      invalid: None,
    }
  }

  fn submit(&mut self) {
    let credentials = Credentials {
      email: self.form.trimmed(EMAIL).to_string(),
      password: self.form.value(PASSWORD).to_string(),
    };

    if credentials.email.is_empty() || credentials.password.is_empty() {
      self.invalid = Some("Email and password are required.".to_string());
      return;
    }
    self.invalid = None;

    let directory = self.ctx.directory.clone();
    self.login.mutate(async move {
      directory
        .login(&credentials)
        .await
        .map_err(|e| e.display_message())
    });
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(),
      KeyResult::Event(FormEvent::Cancel) => self.form.clear(),
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = centered_rect(60, 10, area);
    let title = if self.login.is_pending() {
      "Login (signing in...)"
    } else {
      "Login"
    };
    let block = panel(title, Color::Blue);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([Constraint::Length(2), Constraint::Min(self.form.height())])
      .split(inner);

    let error = self.invalid.as_deref().or(self.login.error());
    status_line(frame, chunks[0], error, None);
    self.form.render(frame, chunks[1], self.login.is_pending());
  }

  fn tick(&mut self) {
    if self.login.poll() && self.login.is_success() {
      self.form.clear();
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("tab", "next field").with_priority(10),
      Shortcut::new("enter", "sign in").with_priority(20),
      Shortcut::new("esc", "clear").with_priority(30),
    ]
  }
}
