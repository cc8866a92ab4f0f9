use crate::nav::{Route, ScheduledNavigation};
use crate::query::Mutation;
use crate::ui::renderfns::{centered_rect, panel, status_line};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::ViewContext;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Confirmation before permanently deleting a record
pub struct DeleteConfirmView {
  ctx: ViewContext,
  id: String,
  delete: Mutation<()>,
  redirect: Option<ScheduledNavigation>,
}

impl DeleteConfirmView {
  pub fn new(ctx: ViewContext, id: String) -> Self {
    Self {
      ctx,
      id,
      delete: Mutation::new(),
      redirect: None,
    }
  }

  fn confirm(&mut self) {
    if self.id.is_empty() || self.delete.is_success() {
      return;
    }

    let directory = self.ctx.directory.clone();
    let id = self.id.clone();
    self.delete.mutate(async move {
      directory
        .delete_employee(&id)
        .await
        .map_err(|e| e.display_message())
    });
  }
}

impl View for DeleteConfirmView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('y') | KeyCode::Enter => {
        self.confirm();
        ViewAction::None
      }
      KeyCode::Char('n') | KeyCode::Char('q') | KeyCode::Esc => {
        ViewAction::Navigate(Route::Dashboard)
      }
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let area = centered_rect(64, 9, area);
    let (title, color) = if self.delete.is_success() {
      ("Deletion Successful", Color::Green)
    } else {
      ("Confirm Permanent Deletion", Color::Red)
    };
    let block = panel(title, color);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.id.is_empty() {
      let paragraph = Paragraph::new("No employee ID was given to delete.")
        .style(Style::default().fg(Color::Yellow));
      frame.render_widget(paragraph, inner);
      return;
    }

    let chunks = Layout::vertical([Constraint::Length(3), Constraint::Min(2)]).split(inner);

    let body = if self.delete.is_success() {
      vec![Line::from(format!(
        "Employee {} has been permanently removed.",
        self.id
      ))]
    } else {
      vec![
        Line::from("You are about to permanently delete employee record:"),
        Line::styled(format!("ID: {}", self.id), Style::default().fg(Color::Red).bold()),
        Line::styled(
          if self.delete.is_pending() {
            "Deleting..."
          } else {
            "Press y to delete, n to cancel."
          },
          Style::default().fg(Color::DarkGray),
        ),
      ]
    };
    frame.render_widget(Paragraph::new(body).alignment(Alignment::Center), chunks[0]);

    let success = self.delete.is_success().then(|| {
      format!(
        "Redirecting to the dashboard in {} seconds...",
        self.ctx.redirect_delay.as_secs()
      )
    });
    status_line(frame, chunks[1], self.delete.error(), success.as_deref());
  }

  fn tick(&mut self) {
    if self.delete.poll() && self.delete.is_success() {
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
      Shortcut::new("y", "delete").with_priority(10),
      Shortcut::new("n", "cancel").with_priority(20),
    ]
  }
}
