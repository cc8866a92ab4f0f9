use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Enter pressed with this (trimmed) term
  Submitted(String),
  /// Escape pressed, nothing applied
  Cancelled,
}

/// Prompt opened with `/` that yields a term on Enter
#[derive(Debug, Clone)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
  title: &'static str,
}

impl SearchInput {
  pub fn new(title: &'static str) -> Self {
    Self {
      input: TextInput::new(),
      active: false,
      title,
    }
  }

  /// Check if search is currently active
  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Text typed so far
  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Open the prompt, pre-filled with the term currently applied
  pub fn activate(&mut self, current: &str) {
    self.active = true;
    self.input.set_value(current);
  }

  /// Handle a key event
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent, current: &str) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate(current);
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(term) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted(term.trim().to_string()))
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(SearchEvent::Cancelled)
      }
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30.min(area.width), 60.min(area.width));
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));

    // Clear the area behind the overlay
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.display()),
      Span::styled("_", Style::default().fg(Color::Yellow)), // Cursor
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_slash_activates_with_current_term() {
    let mut search = SearchInput::new("Department");
    assert_eq!(search.handle_key(key(KeyCode::Char('x')), ""), KeyResult::NotHandled);

    assert_eq!(search.handle_key(key(KeyCode::Char('/')), "Tech"), KeyResult::Handled);
    assert!(search.is_active());
    assert_eq!(search.query(), "Tech");
  }

  #[test]
  fn test_submit_trims_term() {
    let mut search = SearchInput::new("Department");
    search.handle_key(key(KeyCode::Char('/')), "");
    for c in " Sales ".chars() {
      search.handle_key(key(KeyCode::Char(c)), "");
    }

    assert_eq!(
      search.handle_key(key(KeyCode::Enter), ""),
      KeyResult::Event(SearchEvent::Submitted("Sales".to_string()))
    );
    assert!(!search.is_active());
  }

  #[test]
  fn test_escape_cancels() {
    let mut search = SearchInput::new("Department");
    search.handle_key(key(KeyCode::Char('/')), "");
    assert_eq!(
      search.handle_key(key(KeyCode::Esc), ""),
      KeyResult::Event(SearchEvent::Cancelled)
    );
    assert!(!search.is_active());
  }
}
