use chrono::NaiveDateTime;
use ratatui::prelude::*;

use crate::api::types::{GroupPrivacy, Medal, ReactionType};
use crate::query::{PageNav, PageWindow, SortField};
use crate::ui::Notice;

/// Truncate to `max_len` characters, ending in "..." when cut
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    return s.to_string();
  }
  let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
  format!("{}...", kept)
}

/// First line only, for one-row list entries
pub fn first_line(s: &str) -> &str {
  s.lines().next().unwrap_or("")
}

pub fn format_date(date: Option<NaiveDateTime>) -> String {
  date
    .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
    .unwrap_or_else(|| "-".to_string())
}

pub fn privacy_color(privacy: GroupPrivacy) -> Color {
  match privacy {
    GroupPrivacy::Public => Color::Green,
    GroupPrivacy::Private => Color::Yellow,
    GroupPrivacy::Secret => Color::Red,
  }
}

pub fn medal_symbol(medal: Option<Medal>) -> Span<'static> {
  match medal {
    Some(Medal::Gold) => Span::styled("●", Style::default().fg(Color::Yellow)),
    Some(Medal::Silver) => Span::styled("●", Style::default().fg(Color::Gray)),
    Some(Medal::Bronze) => Span::styled("●", Style::default().fg(Color::LightRed)),
    None => Span::raw(" "),
  }
}

/// Number key that toggles each reaction
pub fn reaction_key(reaction: ReactionType) -> char {
  let idx = ReactionType::ALL
    .iter()
    .position(|r| *r == reaction)
    .unwrap_or(0);
  char::from(b'1' + idx as u8)
}

/// Rect of `percent_width` of `area`, `height` rows tall, centred
pub fn centered(area: Rect, percent_width: u16, height: u16) -> Rect {
  let width = (area.width * percent_width / 100).max(20).min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

/// `‹ 1 2 [3] 4 5 ›  size 10` with disabled arrows dimmed
pub fn page_bar<S: SortField>(window: &PageWindow<S>, nav: &PageNav) -> Line<'static> {
  let dim = Style::default().fg(Color::DarkGray);
  let active = Style::default().fg(Color::Cyan);
  let arrow = |enabled: bool| if enabled { active } else { dim };

  let mut spans = vec![Span::styled(" ‹ ", arrow(nav.has_prev()))];
  if nav.page > 0 && !nav.visible_pages().contains(&0) {
    spans.push(Span::styled("… ", dim));
  }
  for page in nav.visible_pages() {
    let label = format!("{}", page + 1);
    if page == window.page() {
      spans.push(Span::styled(
        format!("[{}] ", label),
        Style::default().fg(Color::Yellow).bold(),
      ));
    } else {
      spans.push(Span::raw(format!("{} ", label)));
    }
  }
  if nav.visible_pages().end < nav.total_pages {
    spans.push(Span::styled("… ", dim));
  }
  spans.push(Span::styled("› ", arrow(nav.has_next())));
  spans.push(Span::styled(format!(" size {}", window.size().get()), dim));
  Line::from(spans)
}

pub fn notice_line(notice: Option<&Notice>) -> Line<'static> {
  match notice {
    Some(Notice::Info(text)) => Line::styled(format!(" {}", text), Style::default().fg(Color::Green)),
    Some(Notice::Error(text)) => Line::styled(format!(" {}", text), Style::default().fg(Color::Red)),
    None => Line::default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{PageSize, Unsorted};

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("héllo wörld", 8), "héllo...");
  }

  #[test]
  fn test_reaction_keys() {
    assert_eq!(reaction_key(ReactionType::Like), '1');
    assert_eq!(reaction_key(ReactionType::Angry), '6');
  }

  #[test]
  fn test_page_bar_marks_current_page() {
    let mut window: PageWindow<Unsorted> = PageWindow::new(PageSize::default());
    let nav = PageNav {
      page: 0,
      total_pages: 8,
      last: false,
    };
    window.go_to(2, &nav);
    let text: String = page_bar(&window, &PageNav { page: 2, ..nav })
      .spans
      .iter()
      .map(|s| s.content.to_string())
      .collect();
    assert!(text.contains("[3]"));
    assert!(text.contains("1 2 [3] 4 5"));
    assert!(text.ends_with("size 10"));
  }

  #[test]
  fn test_centered_fits_area() {
    let area = Rect::new(0, 0, 100, 40);
    let rect = centered(area, 50, 5);
    assert_eq!(rect, Rect::new(25, 17, 50, 5));
    let small = centered(Rect::new(0, 0, 10, 2), 50, 5);
    assert!(small.width <= 10 && small.height <= 2);
  }
}
