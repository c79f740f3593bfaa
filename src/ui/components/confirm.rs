use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::KeyResult;
use crate::ui::renderfns::centered;

/// Yes/no prompt guarding a destructive action
#[derive(Debug, Clone)]
pub struct Confirm<T> {
  pending: Option<(T, String)>,
}

impl<T> Default for Confirm<T> {
  fn default() -> Self {
    Self { pending: None }
  }
}

impl<T> Confirm<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn ask(&mut self, action: T, question: impl Into<String>) {
    self.pending = Some((action, question.into()));
  }

  /// `y` yields the action; `n` or Esc drops it. Other keys are swallowed.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<T> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') => match self.pending.take() {
        Some((action, _)) => KeyResult::Event(action),
        None => KeyResult::Handled,
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
        self.pending = None;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((_, question)) = &self.pending else {
      return;
    };
    let overlay = centered(area, 50, 5);
    frame.render_widget(Clear, overlay);
    let text = vec![
      Line::from(question.as_str()),
      Line::from(""),
      Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Cyan)),
        Span::styled(": yes  ", Style::default().fg(Color::DarkGray)),
        Span::styled("n", Style::default().fg(Color::Cyan)),
        Span::styled(": no", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let block = Block::default()
      .title(" Confirm ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red));
    frame.render_widget(
      Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
      overlay,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  #[test]
  fn test_yes_yields_action_once() {
    let mut confirm = Confirm::new();
    confirm.ask(12_i64, "Delete publication?");
    assert_eq!(confirm.handle_key(key('x')), KeyResult::Handled);
    assert_eq!(confirm.handle_key(key('y')), KeyResult::Event(12));
    assert!(!confirm.is_active());
    assert_eq!(confirm.handle_key(key('y')), KeyResult::NotHandled);
  }

  #[test]
  fn test_no_discards() {
    let mut confirm = Confirm::new();
    confirm.ask("group", "Delete group?");
    assert_eq!(confirm.handle_key(key('n')), KeyResult::Handled);
    assert!(!confirm.is_active());
  }
}
