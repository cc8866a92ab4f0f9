use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Truncate a string to a maximum number of chars, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// A `width` x `height` rect centred in `area`, shrunk to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

/// Bordered panel used by every screen
pub fn panel(title: &str, color: Color) -> Block<'static> {
  Block::default()
    .title(format!(" {} ", title))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(color))
}

/// Error or success banner line
pub fn status_line(frame: &mut Frame, area: Rect, error: Option<&str>, success: Option<&str>) {
  let line = match (error, success) {
    (Some(e), _) => Line::styled(format!("Error: {}", e), Style::default().fg(Color::Red)),
    (None, Some(s)) => Line::styled(s.to_string(), Style::default().fg(Color::Green)),
    (None, None) => return,
  };
  frame.render_widget(Paragraph::new(line).wrap(Wrap { trim: true }), area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Renée Éloïse", 8), "Renée...");
  }

  #[test]
  fn test_centered_rect_fits_inside() {
    let area = Rect::new(0, 0, 100, 40);
    assert_eq!(centered_rect(60, 20, area), Rect::new(20, 10, 60, 20));
    assert_eq!(centered_rect(200, 80, area), area);
  }
}
