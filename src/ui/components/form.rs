use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Events a form hands back to its view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter on the last field, or Ctrl-S anywhere
  Submit,
  /// Escape
  Cancel,
}

/// One labelled input
#[derive(Debug, Clone)]
pub struct FormField {
  pub label: &'static str,
  pub hint: Option<&'static str>,
  pub input: TextInput,
}

impl FormField {
  pub fn text(label: &'static str) -> Self {
    Self {
      label,
      hint: None,
      input: TextInput::new(),
    }
  }

  pub fn secret(label: &'static str) -> Self {
    Self {
      label,
      hint: None,
      input: TextInput::masked(),
    }
  }

  pub fn with_hint(mut self, hint: &'static str) -> Self {
    self.hint = Some(hint);
    self
  }
}

/// Vertical stack of fields with one focused at a time
#[derive(Debug, Clone)]
pub struct Form {
  fields: Vec<FormField>,
  focus: usize,
}

impl Form {
  pub fn new(fields: Vec<FormField>) -> Self {
    Self { fields, focus: 0 }
  }

  pub fn value(&self, index: usize) -> &str {
    self
      .fields
      .get(index)
      .map(|f| f.input.value())
      .unwrap_or_default()
  }

  /// Trimmed value
  pub fn trimmed(&self, index: usize) -> &str {
    self.value(index).trim()
  }

  pub fn set_value(&mut self, index: usize, value: &str) {
    if let Some(field) = self.fields.get_mut(index) {
      field.input.set_value(value);
    }
  }

  pub fn clear(&mut self) {
    for field in &mut self.fields {
      field.input.clear();
    }
    self.focus = 0;
  }

  pub fn focus(&self) -> usize {
    self.focus
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  fn next(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + 1) % self.fields.len();
    }
  }

  fn previous(&mut self) {
    if !self.fields.is_empty() {
      self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.previous();
        return KeyResult::Handled;
      }
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        return KeyResult::Event(FormEvent::Submit);
      }
      _ => {}
    }

    let last = self.fields.len().saturating_sub(1);
    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::NotHandled;
    };

    match field.input.handle_key(key) {
      InputResult::Submitted(_) if self.focus == last => KeyResult::Event(FormEvent::Submit),
      InputResult::Submitted(_) => {
        self.next();
        KeyResult::Handled
      }
      InputResult::Cancelled => KeyResult::Event(FormEvent::Cancel),
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Rows needed by `render`
  pub fn height(&self) -> u16 {
    self.fields.len() as u16 * 2
  }

  /// Two rows per field: label, then the value with a cursor on the focused one
  pub fn render(&self, frame: &mut Frame, area: Rect, disabled: bool) {
    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.len())
      .max()
      .unwrap_or(0);

    let mut lines = Vec::with_capacity(self.fields.len() * 2);
    for (i, field) in self.fields.iter().enumerate() {
      let focused = i == self.focus && !disabled;
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };

      let mut spans = vec![
        Span::styled(format!("{:>width$}: ", field.label, width = label_width), label_style),
        Span::raw(field.input.display()),
      ];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Cyan)));
      }
      if field.input.is_empty() {
        if let Some(hint) = field.hint {
          spans.push(Span::styled(format!(" {}", hint), Style::default().fg(Color::DarkGray)));
        }
      }

      lines.push(Line::from(spans));
      lines.push(Line::raw(""));
    }

    frame.render_widget(Paragraph::new(lines), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn form() -> Form {
    Form::new(vec![FormField::text("Email"), FormField::secret("Password")])
  }

  #[test]
  fn test_enter_moves_then_submits() {
    let mut form = form();
    form.handle_key(key(KeyCode::Char('a')));
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(form.focus(), 1);

    form.handle_key(key(KeyCode::Char('p')));
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submit)
    );
    assert_eq!(form.value(0), "a");
    assert_eq!(form.value(1), "p");
  }

  #[test]
  fn test_focus_wraps() {
    let mut form = form();
    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focus(), 1);
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focus(), 0);
  }

  #[test]
  fn test_ctrl_s_submits_and_esc_cancels() {
    let mut form = form();
    assert_eq!(
      form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)),
      KeyResult::Event(FormEvent::Submit)
    );
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancel)
    );
  }

  #[test]
  fn test_clear_resets_values_and_focus() {
    let mut form = form();
    form.set_value(0, " jane@x.com ");
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.trimmed(0), "jane@x.com");

    form.clear();
    assert_eq!(form.value(0), "");
    assert_eq!(form.focus(), 0);
  }
}
