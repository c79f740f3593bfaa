pub mod components;
pub mod context;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::ListState;

use crate::api::ApiError;
use crate::app::App;

/// One-line status message shown by a view after a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  Info(String),
  Error(String),
}

impl Notice {
  /// `done` on success, the error message otherwise
  pub fn outcome<T>(result: &Result<T, ApiError>, done: &str) -> Self {
    match result {
      Ok(_) => Notice::Info(done.to_string()),
      Err(e) => Notice::Error(e.to_string()),
    }
  }
}

/// Keep the selection inside `len` items, selecting the first when unset
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, body, footer] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  renderfns::draw_header(
    frame,
    header,
    app.base_url(),
    app.username(),
    &app.shortcuts(),
  );
  app.render_view(frame, body);
  renderfns::draw_footer(frame, footer, &app.breadcrumb(), app.notice());
  app.render_overlays(frame, body);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_clamped() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_notice_outcome() {
    let ok: Result<(), ApiError> = Ok(());
    assert_eq!(Notice::outcome(&ok, "Saved"), Notice::Info("Saved".into()));
    let err: Result<(), ApiError> = Err(ApiError::Unauthenticated);
    assert!(matches!(Notice::outcome(&err, "Saved"), Notice::Error(_)));
  }
}
