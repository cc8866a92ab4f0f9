use crate::api::types::{SignupRequest, User};
use crate::nav::{Route, ScheduledNavigation};
use crate::query::Mutation;
use crate::ui::components::{Form, FormEvent, FormField, KeyResult};
use crate::ui::renderfns::{centered_rect, panel, status_line};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ViewContext;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

const USERNAME: usize = 0;
const EMAIL: usize = 1;
const PASSWORD: usize = 2;

/// Account creation. Does not sign in; after success it returns to the login
/// screen once the redirect delay has passed.
pub struct SignupView {
  ctx: ViewContext,
  form: Form,
  signup: Mutation<User>,
  invalid: Option<String>,
  redirect: Option<ScheduledNavigation>,
}

impl SignupView {
  pub fn new(ctx: ViewContext) -> Self {
    Self {
      ctx,
      form: Form::new(vec![
        FormField::text("Username"),
        FormField::text("Email").with_hint("example@domain.com"),
        FormField::secret("Password"),
      ]),
      signup: Mutation::new(),
      invalid: None,
      redirect: None,
    }
  }

  fn submit(&mut self) {
    let request = SignupRequest {
      username: self.form.trimmed(USERNAME).to_string(),
      email: self.form.trimmed(EMAIL).to_string(),
      password: self.form.value(PASSWORD).to_string(),
    };

    if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
      self.invalid = Some("All fields are required.".to_string());
      return;
    }
    self.invalid = None;

    let directory = self.ctx.directory.clone();
    self.signup.mutate(async move {
      directory
        .signup(&request)
        .await
        .map_err(|e| e.display_message())
    });
  }

  fn success_message(&self) -> Option<String> {
    self.signup.is_success().then(|| {
      format!(
        "Account created! Redirecting to login in {} seconds...",
        self.ctx.redirect_delay.as_secs()
      )
    })
  }
}

impl View for SignupView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submit) => self.submit(),
      KeyResult::Event(FormEvent::Cancel) => return ViewAction::Navigate(Route::Login),
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = centered_rect(64, 12, area);
    let title = if self.signup.is_pending() {
      "Create an account (submitting...)"
    } else {
      "Create an account"
    };
    let block = panel(title, Color::Blue);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::vertical([Constraint::Length(2), Constraint::Min(self.form.height())])
      .split(inner);

    let error = self.invalid.as_deref().or(self.signup.error());
    let success = self.success_message();
    status_line(frame, chunks[0], error, success.as_deref());
    self.form.render(frame, chunks[1], self.signup.is_pending());
  }

  fn tick(&mut self) {
    if self.signup.poll() && self.signup.is_success() {
      self.form.clear();
      self.redirect = Some(
        self
          .ctx
          .navigator
          .schedule(Route::Login, self.ctx.redirect_delay),
      );
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("tab", "next field").with_priority(10),
      Shortcut::new("enter", "sign up").with_priority(20),
      Shortcut::new("esc", "to login").with_priority(30),
    ]
  }
}
