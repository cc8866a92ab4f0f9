use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: title, backend host and the session shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: Option<&str>,
  base_url: &str,
  authenticated: bool,
) {
  let host = extract_host(base_url);
  let title = title.unwrap_or("staffdir");

  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
  ];

  let (state, color) = if authenticated {
    (" signed in ", Color::Green)
  } else {
    (" signed out ", Color::Yellow)
  };
  spans.push(Span::styled(state, Style::default().fg(color).bold()));
  spans.push(Span::raw("  "));

  let shortcuts: &[(&str, &str)] = if authenticated {
    &[("^d", "directory"), ("^o", "logout"), ("^c", "quit")]
  } else {
    &[("^l", "login"), ("^n", "signup"), ("^c", "quit")]
  };
  for (i, (key, label)) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    // Keys and brackets highlighted, descriptions dimmed
    spans.push(Span::styled(format!("<{}>", key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}", label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host (and port) of the API base URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("http://localhost:3000/api/v1"), "localhost:3000");
    assert_eq!(extract_host("https://hr.example.com/api/v1"), "hr.example.com");
    assert_eq!(extract_host("hr.internal"), "hr.internal");
  }
}
