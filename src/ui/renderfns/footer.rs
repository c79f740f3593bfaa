use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::Notice;

/// Breadcrumb of the view stack, current view highlighted, with the app's
/// last notice on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], notice: Option<&Notice>) {
  let last = breadcrumb.len().saturating_sub(1);
  let mut spans = vec![Span::raw(" ")];
  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" › ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == last {
      Style::default().fg(Color::Green).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let [crumbs, status] =
    Layout::horizontal([Constraint::Min(10), Constraint::Percentage(40)]).areas(area);
  let style = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(style), crumbs);
  frame.render_widget(
    Paragraph::new(super::notice_line(notice))
      .alignment(Alignment::Right)
      .style(style),
    status,
  );
}
