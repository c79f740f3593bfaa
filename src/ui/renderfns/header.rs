use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::Shortcut;

/// Logo, backend host, signed-in user and the current view's shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  base_url: &str,
  username: Option<&str>,
  shortcuts: &[Shortcut],
) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));
  let mut spans = vec![
    Span::styled(" greenspace ", Style::default().fg(Color::Green).bold()),
    sep(),
    Span::styled(format!(" {} ", host(base_url)), Style::default().fg(Color::White)),
    sep(),
    match username {
      Some(user) => Span::styled(format!(" @{} ", user), Style::default().fg(Color::Yellow).bold()),
      None => Span::styled(" anonymous ", Style::default().fg(Color::DarkGray)),
    },
    Span::raw(" "),
  ];

  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::styled(
      format!(" <{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  frame.render_widget(
    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black)),
    area,
  );
}

/// Host and port of the backend URL
fn host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
