use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::input::{InputEvent, TextInput};
use super::KeyResult;
use crate::ui::renderfns::centered;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposerEvent<T> {
  /// Non-blank text for the purpose the composer was opened with
  Submitted(T, String),
  Cancelled,
}

/// Modal single-line editor for comments, posts and names.
///
/// `T` tags what the text is for, so one composer serves several actions.
#[derive(Debug, Clone)]
pub struct Composer<T> {
  open: Option<(T, &'static str)>,
  input: TextInput,
  hint: Option<&'static str>,
}

impl<T> Default for Composer<T> {
  fn default() -> Self {
    Self {
      open: None,
      input: TextInput::new(),
      hint: None,
    }
  }
}

impl<T: Clone> Composer<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.open.is_some()
  }

  pub fn open(&mut self, purpose: T, title: &'static str, initial: &str) {
    self.open = Some((purpose, title));
    self.input = TextInput::with_value(initial);
    self.hint = None;
  }

  pub fn close(&mut self) {
    self.open = None;
    self.input.clear();
    self.hint = None;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ComposerEvent<T>> {
    let Some((purpose, _)) = self.open.clone() else {
      return KeyResult::NotHandled;
    };
    match self.input.handle_key(key) {
      KeyResult::Event(InputEvent::Submitted(text)) => {
        if text.trim().is_empty() {
          self.hint = Some("Text cannot be empty");
          return KeyResult::Handled;
        }
        self.close();
        KeyResult::Event(ComposerEvent::Submitted(purpose, text.trim().to_string()))
      }
      KeyResult::Event(InputEvent::Cancelled) => {
        self.close();
        KeyResult::Event(ComposerEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((_, title)) = &self.open else {
      return;
    };
    let overlay = centered(area, 70, 5);
    frame.render_widget(Clear, overlay);

    let footer = match self.hint {
      Some(hint) => Span::styled(hint, Style::default().fg(Color::Red)),
      None => Span::styled("Enter: send  Esc: cancel", Style::default().fg(Color::DarkGray)),
    };
    let text = vec![
      Line::from(vec![
        Span::raw(self.input.value()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
      ]),
      Line::from(""),
      Line::from(footer),
    ];
    let block = Block::default()
      .title(format!(" {} ", title))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(
      Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
      overlay,
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[derive(Debug, Clone, PartialEq, Eq)]
  enum Purpose {
    Reply(i64),
  }

  #[test]
  fn test_inactive_passes_keys_through() {
    let mut composer: Composer<Purpose> = Composer::new();
    assert_eq!(composer.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_submit_carries_purpose() {
    let mut composer = Composer::new();
    composer.open(Purpose::Reply(3), "Reply", "");
    for c in " thanks ".chars() {
      composer.handle_key(key(KeyCode::Char(c)));
    }
    assert_eq!(
      composer.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(ComposerEvent::Submitted(Purpose::Reply(3), "thanks".into()))
    );
    assert!(!composer.is_active());
  }

  #[test]
  fn test_blank_submit_stays_open() {
    let mut composer = Composer::new();
    composer.open(Purpose::Reply(3), "Reply", "  ");
    assert_eq!(composer.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert!(composer.is_active());
    assert_eq!(
      composer.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ComposerEvent::Cancelled)
    );
  }
}
