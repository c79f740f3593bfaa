use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::{GroupMember, MemberSettings, MemberSort, MemberStats, Page};
use crate::api::{keys, ApiClient, ApiError, Change};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{Confirm, KeyResult, PagedList};
use crate::ui::context::{Changes, Context};
use crate::ui::renderfns::{format_date, medal_symbol, notice_line, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::Notice;

enum MemberOp {
  Remove {
    group_id: i64,
    username: String,
  },
  Settings {
    group_id: i64,
    username: String,
    settings: MemberSettings,
  },
}

impl Changes for MemberOp {
  fn change(&self) -> Change {
    match self {
      MemberOp::Remove { group_id, username } => Change::MemberRemoved {
        group_id: *group_id,
        username: username.clone(),
      },
      MemberOp::Settings {
        group_id, username, ..
      } => Change::MemberSettingsUpdated {
        group_id: *group_id,
        username: username.clone(),
      },
    }
  }
}

async fn run(client: ApiClient, op: MemberOp) -> Result<&'static str, ApiError> {
  match op {
    MemberOp::Remove { group_id, username } => client
      .remove_member(group_id, &username)
      .await
      .map(|_| "Member removed"),
    MemberOp::Settings {
      group_id,
      username,
      settings,
    } => client
      .update_member_settings(group_id, &username, settings)
      .await
      .map(|_| "Permissions updated"),
  }
}

fn member_row(member: &GroupMember) -> Line<'static> {
  let flag = |on: bool, label: &'static str| {
    if on {
      Span::styled(label, Style::default().fg(Color::Green))
    } else {
      Span::styled("-", Style::default().fg(Color::DarkGray))
    }
  };
  Line::from(vec![
    medal_symbol(member.medal),
    Span::raw(" "),
    Span::styled(
      format!("@{:<16}", truncate(&member.username, 16)),
      Style::default().fg(Color::Yellow),
    ),
    Span::raw(format!("{:<24}", truncate(&member.display_name, 22))),
    Span::styled(
      format!("{:<18}", format_date(member.join_date)),
      Style::default().fg(Color::DarkGray),
    ),
    flag(member.can_post, "P"),
    flag(member.can_comment, "C"),
  ])
}

/// All members of one group, with per-member activity stats
pub struct MemberListView {
  group_id: i64,
  group_name: String,
  admin: bool,
  members: PagedList<MemberSort, Page<GroupMember>>,
  stats: Query<(i64, String), MemberStats>,
  ops: Mutation<MemberOp, &'static str>,
  confirm: Confirm<String>,
  notice: Option<Notice>,
}

impl MemberListView {
  pub fn new(ctx: Context, group_id: i64, group_name: String, admin: bool) -> Self {
    let client = ctx.client.clone();
    let members = PagedList::new(
      &ctx,
      move |w| keys::all_group_members(group_id, w),
      {
        let client = client.clone();
        move |w| {
          let client = client.clone();
          let w = w.clone();
          async move { client.group_members(group_id, &w).await }
        }
      },
    );

    // Enabled once a member is selected
    let stats = Query::new(
      ctx.cache.clone(),
      (group_id, String::new()),
      |(group_id, username): &(i64, String)| keys::member_stats(*group_id, username),
      move |(group_id, username): &(i64, String)| {
        let client = client.clone();
        let group_id = *group_id;
        let username = username.clone();
        async move { client.member_stats(group_id, &username).await }
      },
    )
    .enabled(false);

    Self {
      group_id,
      group_name,
      admin,
      members,
      stats,
      ops: ctx.mutation(run),
      confirm: Confirm::new(),
      notice: None,
    }
  }

  /// Point the stats query at the current selection
  fn follow_selection(&mut self) {
    let Some(username) = self.members.selected().map(|m| m.username.clone()) else {
      return;
    };
    if self.stats.params().1 != username {
      self.stats.set_params((self.group_id, username));
    }
    self.stats.set_enabled(true);
  }

  fn toggle(&mut self, post: bool) {
    let Some(member) = self.members.selected() else {
      return;
    };
    let settings = MemberSettings {
      can_post: member.can_post ^ post,
      can_comment: member.can_comment ^ !post,
    };
    let op = MemberOp::Settings {
      group_id: self.group_id,
      username: member.username.clone(),
      settings,
    };
    self.ops.mutate(op);
    self.notice = Some(Notice::Info("Saving...".into()));
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Activity ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let text = match self.stats.state() {
      QueryState::Idle => vec![Line::from("Select a member")],
      QueryState::Loading => vec![Line::from("Loading...")],
      QueryState::Error(e) => vec![Line::styled(
        e.to_string(),
        Style::default().fg(Color::Red),
      )],
      QueryState::Success(stats) => {
        let row = |label: &'static str, value: String| {
          Line::from(vec![
            Span::styled(label, Style::default().fg(Color::DarkGray)),
            Span::raw(value),
          ])
        };
        vec![
          Line::styled(
            format!("@{}", stats.username),
            Style::default().fg(Color::Yellow),
          ),
          row("Publications: ", stats.publication_count.to_string()),
          row("Comments:     ", stats.comment_count.to_string()),
          row("Reactions:    ", stats.reaction_count.to_string()),
          row("Joined:       ", format_date(stats.join_date)),
          row("Last post:    ", format_date(stats.last_publication_date)),
          row("Last comment: ", format_date(stats.last_comment_date)),
        ]
      }
    };
    frame.render_widget(Paragraph::new(text).block(block), area);
  }
}

impl View for MemberListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::NotHandled => {}
      KeyResult::Handled => return ViewAction::None,
      KeyResult::Event(username) => {
        self.ops.mutate(MemberOp::Remove {
          group_id: self.group_id,
          username,
        });
        self.notice = Some(Notice::Info("Removing member...".into()));
        return ViewAction::None;
      }
    }

    if self.members.handle_key(key) {
      self.follow_selection();
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('x') if self.admin => {
        if let Some(member) = self.members.selected() {
          let question = format!("Remove @{} from {}?", member.username, self.group_name);
          self.confirm.ask(member.username.clone(), question);
        }
      }
      KeyCode::Char('p') if self.admin => self.toggle(true),
      KeyCode::Char('c') if self.admin => self.toggle(false),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [body, notice] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);
    let [list, side] =
      Layout::horizontal([Constraint::Percentage(68), Constraint::Percentage(32)]).areas(body);
    let label = format!("Members of {}", self.group_name);
    self
      .members
      .render(frame, list, &label, "No members.", member_row);
    self.render_stats(frame, side);
    frame.render_widget(Paragraph::new(notice_line(self.notice.as_ref())), notice);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Members".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if self.members.poll() {
      self.follow_selection();
    }
    self.stats.poll();
    if let Some(result) = self.ops.poll() {
      self.notice = Some(match result {
        Ok(done) => Notice::Info(done.to_string()),
        Err(e) => Notice::Error(e.to_string()),
      });
    }
    ViewAction::None
  }

  fn is_capturing_input(&self) -> bool {
    self.confirm.is_active()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("h/l", "page").with_priority(20),
      Shortcut::new("s/o", "sort").with_priority(30),
      Shortcut::new("q", "back").with_priority(90),
    ];
    if self.admin {
      shortcuts.extend([
        Shortcut::new("p/c", "rights").with_priority(40),
        Shortcut::new("x", "remove").with_priority(50),
      ]);
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_member_op_changes() {
    let remove = MemberOp::Remove {
      group_id: 3,
      username: "lina".into(),
    };
    assert_eq!(
      remove.change(),
      Change::MemberRemoved {
        group_id: 3,
        username: "lina".into()
      }
    );

    let settings = MemberOp::Settings {
      group_id: 3,
      username: "lina".into(),
      settings: MemberSettings {
        can_post: false,
        can_comment: true,
      },
    };
    assert!(matches!(
      settings.change(),
      Change::MemberSettingsUpdated { group_id: 3, .. }
    ));
  }
}
