use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::api::types::{Page, Publication, PublicationDraft, PublicationSort};
use crate::api::{keys, ApiClient, ApiError, Change};
use crate::query::{Mutation, Unsorted};
use crate::ui::components::{Composer, ComposerEvent, Confirm, KeyResult, PagedList};
use crate::ui::context::{Changes, Context};
use crate::ui::renderfns::{first_line, format_date, notice_line, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::PublicationDetailView;
use crate::ui::Notice;

/// Which publications the list shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationScope {
  Feed,
  /// Publications written by `username`
  User(String),
}

enum Pages {
  Feed(PagedList<PublicationSort, Page<Publication>>),
  User(PagedList<Unsorted, Page<Publication>>),
}

impl Pages {
  fn handle_key(&mut self, key: KeyEvent) -> bool {
    match self {
      Pages::Feed(list) => list.handle_key(key),
      Pages::User(list) => list.handle_key(key),
    }
  }

  fn poll(&mut self) -> bool {
    match self {
      Pages::Feed(list) => list.poll(),
      Pages::User(list) => list.poll(),
    }
  }

  fn selected(&self) -> Option<&Publication> {
    match self {
      Pages::Feed(list) => list.selected(),
      Pages::User(list) => list.selected(),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, label: &str) {
    let empty = "No publications yet.";
    match self {
      Pages::Feed(list) => list.render(frame, area, label, empty, publication_row),
      Pages::User(list) => list.render(frame, area, label, empty, publication_row),
    }
  }
}

fn publication_row(p: &Publication) -> Line<'static> {
  let place = p
    .group_name
    .as_ref()
    .map(|g| format!(" in {}", truncate(g, 16)))
    .unwrap_or_default();
  Line::from(vec![
    Span::styled(format!("{:<6}", p.id), Style::default().fg(Color::Cyan)),
    Span::styled(
      format!("{:<17}", format_date(p.create_date)),
      Style::default().fg(Color::DarkGray),
    ),
    Span::styled(
      format!("@{}{}  ", truncate(&p.author.username, 14), place),
      Style::default().fg(Color::Yellow),
    ),
    Span::raw(truncate(first_line(&p.content), 56)),
    Span::styled(
      format!("  ♥{}", p.total_reactions()),
      Style::default().fg(Color::DarkGray),
    ),
  ])
}

enum PublicationOp {
  Create(PublicationDraft),
  Delete(i64),
}

impl Changes for PublicationOp {
  fn change(&self) -> Change {
    match self {
      PublicationOp::Create(_) => Change::PublicationCreated,
      PublicationOp::Delete(id) => Change::PublicationDeleted {
        publication_id: *id,
      },
    }
  }
}

async fn run(client: ApiClient, op: PublicationOp) -> Result<&'static str, ApiError> {
  match op {
    PublicationOp::Create(draft) => client
      .create_publication(&draft)
      .await
      .map(|_| "Published"),
    PublicationOp::Delete(id) => client
      .delete_publication(id)
      .await
      .map(|_| "Publication deleted"),
  }
}

/// The global feed or one author's publications
pub struct PublicationListView {
  ctx: Context,
  scope: PublicationScope,
  pages: Pages,
  ops: Mutation<PublicationOp, &'static str>,
  composer: Composer<()>,
  confirm: Confirm<i64>,
  notice: Option<Notice>,
}

impl PublicationListView {
  pub fn new(ctx: Context, scope: PublicationScope) -> Self {
    let client = ctx.client.clone();
    let pages = match &scope {
      PublicationScope::Feed => Pages::Feed(PagedList::new(&ctx, keys::publications, move |w| {
        let client = client.clone();
        let w = w.clone();
        async move { client.list_publications(&w).await }
      })),
      PublicationScope::User(username) => {
        let key_user = username.clone();
        let username = username.clone();
        Pages::User(PagedList::new(
          &ctx,
          move |w| keys::user_publications(&key_user, w),
          move |w| {
            let client = client.clone();
            let username = username.clone();
            let w = w.clone();
            async move { client.user_publications(&username, &w).await }
          },
        ))
      }
    };

    Self {
      ops: ctx.mutation(run),
      ctx,
      scope,
      pages,
      composer: Composer::new(),
      confirm: Confirm::new(),
      notice: None,
    }
  }

  fn label(&self) -> String {
    match &self.scope {
      PublicationScope::Feed => "Feed".to_string(),
      PublicationScope::User(user) => format!("Publications of @{}", user),
    }
  }

  fn is_own(&self, publication: &Publication) -> bool {
    self.ctx.username() == Some(publication.author.username.as_str())
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::NotHandled => {}
      KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::Event(id) => {
        self.ops.mutate(PublicationOp::Delete(id));
        self.notice = Some(Notice::Info("Deleting...".into()));
        return Some(ViewAction::None);
      }
    }
    match self.composer.handle_key(key) {
      KeyResult::NotHandled => None,
      KeyResult::Handled | KeyResult::Event(ComposerEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::Event(ComposerEvent::Submitted((), content)) => {
        self.ops.mutate(PublicationOp::Create(PublicationDraft {
          content,
          ..Default::default()
        }));
        self.notice = Some(Notice::Info("Publishing...".into()));
        Some(ViewAction::None)
      }
    }
  }
}

impl View for PublicationListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(action) = self.handle_overlays(key) {
      return action;
    }
    if self.pages.handle_key(key) {
      return ViewAction::None;
    }
    match key.code {
      KeyCode::Enter => {
        if let Some(p) = self.pages.selected() {
          return ViewAction::Push(Box::new(PublicationDetailView::new(self.ctx.clone(), p.id)));
        }
      }
      KeyCode::Char('n') if self.ctx.username().is_some() => {
        self.composer.open((), "New publication", "");
      }
      KeyCode::Char('d') => match self.pages.selected() {
        Some(p) if self.is_own(p) => {
          let question = format!("Delete \"{}\"?", truncate(first_line(&p.content), 40));
          let id = p.id;
          self.confirm.ask(id, question);
        }
        Some(_) => {
          self.notice = Some(Notice::Error("You can only delete your own publications".into()));
        }
        None => {}
      },
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [list_area, notice_area] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
    let label = self.label();
    self.pages.render(frame, list_area, &label);
    frame.render_widget(Paragraph::new(notice_line(self.notice.as_ref())), notice_area);
    self.composer.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.label()
  }

  fn tick(&mut self) -> ViewAction {
    self.pages.poll();
    if let Some(result) = self.ops.poll() {
      self.notice = Some(match result {
        Ok(done) => Notice::Info(done.to_string()),
        Err(e) => Notice::Error(e.to_string()),
      });
    }
    ViewAction::None
  }

  fn is_capturing_input(&self) -> bool {
    self.composer.is_active() || self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("h/l", "page").with_priority(20),
      Shortcut::new("n", "new").with_priority(40),
      Shortcut::new("d", "delete").with_priority(50),
      Shortcut::new("q", "back").with_priority(90),
    ];
    if matches!(self.scope, PublicationScope::Feed) {
      shortcuts.push(Shortcut::new("s/o", "sort").with_priority(30));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_publication_op_changes() {
    let create = PublicationOp::Create(PublicationDraft::default());
    assert_eq!(create.change(), Change::PublicationCreated);
    assert_eq!(
      PublicationOp::Delete(8).change(),
      Change::PublicationDeleted { publication_id: 8 }
    );
  }
}
