use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::api::types::{Group, GroupDraft, GroupSort, Page};
use crate::api::{keys, Change};
use crate::query::{Mutation, Unsorted};
use crate::ui::components::{Composer, ComposerEvent, KeyResult, PagedList};
use crate::ui::context::{Changes, Context};
use crate::ui::renderfns::{notice_line, privacy_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::GroupDetailView;
use crate::ui::Notice;

/// Which groups the list shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupScope {
  All,
  /// Groups `username` belongs to
  Member(String),
}

enum Pages {
  All(PagedList<GroupSort, Page<Group>>),
  Member(PagedList<Unsorted, Page<Group>>),
}

impl Pages {
  fn handle_key(&mut self, key: KeyEvent) -> bool {
    match self {
      Pages::All(list) => list.handle_key(key),
      Pages::Member(list) => list.handle_key(key),
    }
  }

  fn poll(&mut self) -> bool {
    match self {
      Pages::All(list) => list.poll(),
      Pages::Member(list) => list.poll(),
    }
  }

  fn selected(&self) -> Option<&Group> {
    match self {
      Pages::All(list) => list.selected(),
      Pages::Member(list) => list.selected(),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, label: &str) {
    let empty = "No groups found.";
    match self {
      Pages::All(list) => list.render(frame, area, label, empty, group_row),
      Pages::Member(list) => list.render(frame, area, label, empty, group_row),
    }
  }
}

fn group_row(group: &Group) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{:<6}", group.id), Style::default().fg(Color::Cyan)),
    Span::styled(
      format!("{:<8}", group.privacy.label()),
      Style::default().fg(privacy_color(group.privacy)),
    ),
    Span::raw(format!("{:<32}", truncate(&group.name, 30))),
    Span::styled(
      format!(
        "{:>4} members  @{}",
        group.members.len(),
        group.admin_username.as_deref().unwrap_or("?")
      ),
      Style::default().fg(Color::DarkGray),
    ),
  ])
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Prompt {
  Name,
  Description { name: String },
}

struct CreateGroup(GroupDraft);

impl Changes for CreateGroup {
  fn change(&self) -> Change {
    Change::GroupCreated
  }
}

/// Paginated group listing, all groups or one member's
pub struct GroupListView {
  ctx: Context,
  scope: GroupScope,
  pages: Pages,
  composer: Composer<Prompt>,
  create: Mutation<CreateGroup, Group>,
  notice: Option<Notice>,
}

impl GroupListView {
  pub fn new(ctx: Context, scope: GroupScope) -> Self {
    let client = ctx.client.clone();
    let pages = match &scope {
      GroupScope::All => Pages::All(PagedList::new(&ctx, keys::groups, move |w| {
        let client = client.clone();
        let w = w.clone();
        async move { client.list_groups(&w).await }
      })),
      GroupScope::Member(username) => {
        let key_user = username.clone();
        let username = username.clone();
        Pages::Member(PagedList::new(
          &ctx,
          move |w| keys::groups_by_member(&key_user, w),
          move |w| {
            let client = client.clone();
            let username = username.clone();
            let w = w.clone();
            async move { client.groups_by_member(&username, &w).await }
          },
        ))
      }
    };
    let create = ctx.mutation(|client, CreateGroup(draft)| async move {
      client.create_group(&draft).await
    });

    Self {
      ctx,
      scope,
      pages,
      composer: Composer::new(),
      create,
      notice: None,
    }
  }

  fn label(&self) -> String {
    match &self.scope {
      GroupScope::All => "Groups".to_string(),
      GroupScope::Member(user) => format!("Groups of @{}", user),
    }
  }

  fn handle_prompt(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.composer.handle_key(key) {
      KeyResult::NotHandled => None,
      KeyResult::Handled | KeyResult::Event(ComposerEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::Event(ComposerEvent::Submitted(Prompt::Name, name)) => {
        self
          .composer
          .open(Prompt::Description { name }, "Group description", "");
        Some(ViewAction::None)
      }
      KeyResult::Event(ComposerEvent::Submitted(Prompt::Description { name }, description)) => {
        self.create.mutate(CreateGroup(GroupDraft {
          name,
          description,
          ..Default::default()
        }));
        self.notice = Some(Notice::Info("Creating group...".into()));
        Some(ViewAction::None)
      }
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Enter => self.pages.selected().map(|group| {
        ViewAction::Push(Box::new(GroupDetailView::new(
          self.ctx.clone(),
          group.id,
          group.name.clone(),
        )))
      }),
      KeyCode::Char('n') => {
        self.composer.open(Prompt::Name, "New group name", "");
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for GroupListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(action) = self.handle_prompt(key) {
      return action;
    }
    if self.pages.handle_key(key) {
      return ViewAction::None;
    }
    self.handle_actions(key).unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [list_area, notice_area] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
    let label = self.label();
    self.pages.render(frame, list_area, &label);
    frame.render_widget(Paragraph::new(notice_line(self.notice.as_ref())), notice_area);
    self.composer.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.label()
  }

  fn tick(&mut self) -> ViewAction {
    self.pages.poll();
    if let Some(result) = self.create.poll() {
      self.notice = Some(Notice::outcome(&result, "Group created"));
    }
    ViewAction::None
  }

  fn is_capturing_input(&self) -> bool {
    self.composer.is_active()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("h/l", "page").with_priority(20),
      Shortcut::new("z", "size").with_priority(40),
      Shortcut::new("n", "new group").with_priority(50),
      Shortcut::new("q", "back").with_priority(90),
    ];
    if matches!(self.scope, GroupScope::All) {
      shortcuts.push(Shortcut::new("o", "order").with_priority(30));
    }
    shortcuts
  }
}
