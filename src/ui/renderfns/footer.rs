use crate::ui::view::Shortcut;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: current screen and its shortcuts
pub fn draw_footer(frame: &mut Frame, area: Rect, label: &str, shortcuts: &[Shortcut]) {
  let mut spans = vec![
    Span::raw(" "),
    Span::styled(label.to_string(), Style::default().fg(Color::Cyan).bold()),
  ];

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);

  for shortcut in shortcuts {
    spans.push(Span::styled("  <", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(shortcut.key, Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(">", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
