use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::api::types::{
  Gated, Group, GroupDraft, GroupMember, MembershipRequest, Page, PhotoKind, Publication,
  PublicationDraft, RequestStatus, Upload,
};
use crate::api::{keys, ApiError, Change};
use crate::query::{Mutation, Query, QueryState, Unsorted};
use crate::ui::components::{
  Composer, ComposerEvent, Confirm, KeyResult, PagedList,
};
use crate::ui::context::{Changes, Context};
use crate::ui::renderfns::{
  first_line, format_date, medal_symbol, notice_line, privacy_color, truncate,
};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{MemberListView, PublicationDetailView, RequestListView};
use crate::ui::Notice;

/// Writes available from the group screen
enum GroupOp {
  Join(i64),
  Post(i64, PublicationDraft),
  Update(i64, GroupDraft),
  Delete(i64),
  Photo(i64, PhotoKind, PathBuf),
}

impl Changes for GroupOp {
  fn change(&self) -> Change {
    match self {
      GroupOp::Join(group_id) => Change::MembershipRequested {
        group_id: *group_id,
      },
      GroupOp::Post(group_id, _) => Change::GroupPublicationCreated {
        group_id: *group_id,
      },
      GroupOp::Update(group_id, _) => Change::GroupUpdated {
        group_id: *group_id,
      },
      GroupOp::Delete(group_id) => Change::GroupDeleted {
        group_id: *group_id,
      },
      GroupOp::Photo(group_id, _, _) => Change::GroupPhotoUploaded {
        group_id: *group_id,
      },
    }
  }
}

/// What finished, so the view can react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Done {
  Joined,
  Posted,
  Updated,
  Deleted,
  PhotoUploaded,
}

impl Done {
  fn message(&self) -> &'static str {
    match self {
      Done::Joined => "Membership requested",
      Done::Posted => "Published to group",
      Done::Updated => "Group updated",
      Done::Deleted => "Group deleted",
      Done::PhotoUploaded => "Photo uploaded",
    }
  }
}

async fn run(client: crate::api::ApiClient, op: GroupOp) -> Result<Done, ApiError> {
  match op {
    GroupOp::Join(id) => client.request_membership(id).await.map(|_| Done::Joined),
    GroupOp::Post(id, draft) => client
      .create_group_publication(id, &draft)
      .await
      .map(|_| Done::Posted),
    GroupOp::Update(id, draft) => client.update_group(id, &draft).await.map(|_| Done::Updated),
    GroupOp::Delete(id) => client.delete_group(id).await.map(|_| Done::Deleted),
    GroupOp::Photo(id, kind, path) => {
      let upload = Upload::read(&path).await?;
      client
        .upload_group_photo(id, kind, upload)
        .await
        .map(|_| Done::PhotoUploaded)
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
  Post,
  Description,
  Photo(PhotoKind),
}

/// Where the viewer stands with this group
#[derive(Debug, Clone, PartialEq)]
enum Membership {
  Admin,
  Member,
  Pending(Option<chrono::NaiveDateTime>),
  Outsider,
  Unknown,
}

pub struct GroupDetailView {
  ctx: Context,
  group_id: i64,
  name: String,
  group: Query<i64, Group>,
  my_request: Query<i64, Option<MembershipRequest>>,
  top_members: Query<i64, Vec<GroupMember>>,
  publications: PagedList<Unsorted, Gated<Page<Publication>>>,
  ops: Mutation<GroupOp, Done>,
  composer: Composer<Prompt>,
  confirm: Confirm<i64>,
  notice: Option<Notice>,
}

impl GroupDetailView {
  pub fn new(ctx: Context, group_id: i64, name: String) -> Self {
    let client = ctx.client.clone();
    let mut group = Query::new(ctx.cache.clone(), group_id, |id: &i64| keys::group(*id), {
      let client = client.clone();
      move |id: &i64| {
        let client = client.clone();
        let id = *id;
        async move { client.get_group(id).await }
      }
    });
    group.fetch();

    // Anonymous viewers have no request to look up
    let mut my_request = Query::new(
      ctx.cache.clone(),
      group_id,
      |id: &i64| keys::user_membership_request(*id),
      {
        let client = client.clone();
        move |id: &i64| {
          let client = client.clone();
          let id = *id;
          async move { client.my_membership_request(id).await }
        }
      },
    )
    .enabled(ctx.username().is_some());
    my_request.fetch();

    let mut top_members = Query::new(
      ctx.cache.clone(),
      group_id,
      |id: &i64| keys::top5_group_members(*id),
      {
        let client = client.clone();
        move |id: &i64| {
          let client = client.clone();
          let id = *id;
          async move { client.top_members(id).await }
        }
      },
    );
    top_members.fetch();

    let publications = PagedList::new(
      &ctx,
      move |w| keys::group_publications(group_id, w),
      move |w| {
        let client = client.clone();
        let w = w.clone();
        async move { client.group_publications(group_id, &w).await }
      },
    );

    let ops = ctx.mutation(run);

    Self {
      ctx,
      group_id,
      name,
      group,
      my_request,
      top_members,
      publications,
      ops,
      composer: Composer::new(),
      confirm: Confirm::new(),
      notice: None,
    }
  }

  fn membership(&self) -> Membership {
    let user = self.ctx.username();
    match self.group.data() {
      Some(group) if group.is_admin(user) => Membership::Admin,
      Some(group) if group.is_member(user) => Membership::Member,
      Some(_) => match self.my_request.data() {
        Some(Some(request)) if request.status == RequestStatus::Pending => {
          Membership::Pending(request.request_date)
        }
        _ => Membership::Outsider,
      },
      None => Membership::Unknown,
    }
  }

  fn is_admin(&self) -> bool {
    self.membership() == Membership::Admin
  }

  fn submit(&mut self, op: GroupOp, progress: &str) {
    self.ops.mutate(op);
    self.notice = Some(Notice::Info(progress.to_string()));
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::NotHandled => {}
      KeyResult::Handled => return Some(ViewAction::None),
      KeyResult::Event(id) => {
        self.submit(GroupOp::Delete(id), "Deleting group...");
        return Some(ViewAction::None);
      }
    }

    match self.composer.handle_key(key) {
      KeyResult::NotHandled => None,
      KeyResult::Handled | KeyResult::Event(ComposerEvent::Cancelled) => Some(ViewAction::None),
      KeyResult::Event(ComposerEvent::Submitted(prompt, text)) => {
        let id = self.group_id;
        match prompt {
          Prompt::Post => self.submit(
            GroupOp::Post(
              id,
              PublicationDraft {
                content: text,
                ..Default::default()
              },
            ),
            "Publishing...",
          ),
          Prompt::Description => {
            let draft = self.group.data().map(|group| GroupDraft {
              name: group.name.clone(),
              description: text,
              privacy_level: group.privacy,
              profile_photo_url: group.profile_photo_url.clone(),
              cover_photo_url: group.cover_photo_url.clone(),
            });
            if let Some(draft) = draft {
              self.submit(GroupOp::Update(id, draft), "Saving...");
            }
          }
          Prompt::Photo(kind) => {
            self.submit(GroupOp::Photo(id, kind, PathBuf::from(text)), "Uploading...")
          }
        }
        Some(ViewAction::None)
      }
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let admin = self.is_admin();
    match key.code {
      KeyCode::Enter => self.publications.selected().map(|p| {
        ViewAction::Push(Box::new(PublicationDetailView::new(self.ctx.clone(), p.id)))
      }),
      KeyCode::Char('J') if self.membership() == Membership::Outsider => {
        self.submit(GroupOp::Join(self.group_id), "Requesting membership...");
        Some(ViewAction::None)
      }
      KeyCode::Char('p') if matches!(self.membership(), Membership::Admin | Membership::Member) => {
        self.composer.open(Prompt::Post, "Post to group", "");
        Some(ViewAction::None)
      }
      KeyCode::Char('m') => Some(ViewAction::Push(Box::new(MemberListView::new(
        self.ctx.clone(),
        self.group_id,
        self.name.clone(),
        admin,
      )))),
      KeyCode::Char('R') if admin => Some(ViewAction::Push(Box::new(RequestListView::new(
        self.ctx.clone(),
        self.group_id,
        self.name.clone(),
      )))),
      KeyCode::Char('e') if admin => {
        let current = self
          .group
          .data()
          .map(|g| g.description.clone())
          .unwrap_or_default();
        self.composer.open(Prompt::Description, "Group description", &current);
        Some(ViewAction::None)
      }
      KeyCode::Char('u') if admin => {
        self
          .composer
          .open(Prompt::Photo(PhotoKind::Profile), "Profile photo file", "");
        Some(ViewAction::None)
      }
      KeyCode::Char('U') if admin => {
        self
          .composer
          .open(Prompt::Photo(PhotoKind::Cover), "Cover photo file", "");
        Some(ViewAction::None)
      }
      KeyCode::Char('D') if admin => {
        self
          .confirm
          .ask(self.group_id, format!("Delete group \"{}\"?", self.name));
        Some(ViewAction::None)
      }
      KeyCode::Char('r') => {
        self.group.refetch();
        self.my_request.refetch();
        self.top_members.refetch();
        self.publications.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }

  fn render_info(&self, frame: &mut Frame, area: Rect) {
    let title = match self.group.state() {
      QueryState::Loading => format!(" {} (loading...) ", self.name),
      QueryState::Error(e) => format!(" {} (error: {}) ", self.name, e),
      _ => format!(" {} ", self.name),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(group) = self.group.data() else {
      frame.render_widget(block, area);
      return;
    };

    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
    let status = match self.membership() {
      Membership::Admin => Span::styled("You are the admin", Style::default().fg(Color::Green)),
      Membership::Member => Span::styled("Member", Style::default().fg(Color::Green)),
      Membership::Pending(since) => Span::styled(
        format!("Request pending since {}", format_date(since)),
        Style::default().fg(Color::Yellow),
      ),
      Membership::Outsider => Span::styled(
        "Not a member, press J to request to join",
        Style::default().fg(Color::DarkGray),
      ),
      Membership::Unknown => Span::raw(""),
    };

    let mut top = vec![label("Top members: ")];
    match self.top_members.data() {
      Some(members) if !members.is_empty() => {
        for member in members {
          top.push(medal_symbol(member.medal));
          top.push(Span::raw(format!("{}  ", member.username)));
        }
      }
      Some(_) => top.push(Span::raw("none yet")),
      None => top.push(label("...")),
    }

    let lines = vec![
      Line::from(vec![
        label("Privacy: "),
        Span::styled(
          group.privacy.label(),
          Style::default().fg(privacy_color(group.privacy)),
        ),
        label("   Admin: "),
        Span::raw(format!("@{}", group.admin_username.as_deref().unwrap_or("?"))),
        label("   Members: "),
        Span::raw(group.members.len().to_string()),
      ]),
      Line::from(status),
      Line::from(top),
      Line::from(Span::raw(group.description.clone())),
    ];
    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
      area,
    );
  }

  fn render_publications(&mut self, frame: &mut Frame, area: Rect) {
    if self.publications.data().is_some_and(Gated::is_restricted) {
      let block = Block::default()
        .title(" Publications ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
      frame.render_widget(
        Paragraph::new("Publications in this group are visible to members only.")
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }
    self.publications.render(
      frame,
      area,
      "Publications",
      "Nothing posted yet.",
      |p: &Publication| {
        Line::from(vec![
          Span::styled(format!("{:<6}", p.id), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("@{:<14}", truncate(&p.author.username, 14)),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(truncate(first_line(&p.content), 60)),
        ])
      },
    );
  }
}

impl View for GroupDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(action) = self.handle_overlays(key) {
      return action;
    }
    if key.code != KeyCode::Char('r') && self.publications.handle_key(key) {
      return ViewAction::None;
    }
    self.handle_actions(key).unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [info, list, notice] = Layout::vertical([
      Constraint::Length(7),
      Constraint::Min(3),
      Constraint::Length(1),
    ])
    .areas(area);
    self.render_info(frame, info);
    self.render_publications(frame, list);
    frame.render_widget(Paragraph::new(notice_line(self.notice.as_ref())), notice);
    self.composer.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn tick(&mut self) -> ViewAction {
    if self.group.poll() {
      if let Some(group) = self.group.data() {
        self.name = group.name.clone();
      }
    }
    self.my_request.poll();
    self.top_members.poll();
    self.publications.poll();

    if let Some(result) = self.ops.poll() {
      if result == Ok(Done::Deleted) {
        return ViewAction::Pop;
      }
      self.notice = Some(match &result {
        Ok(done) => Notice::Info(done.message().to_string()),
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
      Shortcut::new("m", "members").with_priority(20),
      Shortcut::new("q", "back").with_priority(90),
    ];
    match self.membership() {
      Membership::Admin => shortcuts.extend([
        Shortcut::new("p", "post").with_priority(30),
        Shortcut::new("R", "requests").with_priority(40),
        Shortcut::new("e", "edit").with_priority(50),
        Shortcut::new("u/U", "photos").with_priority(60),
        Shortcut::new("D", "delete").with_priority(70),
      ]),
      Membership::Member => shortcuts.push(Shortcut::new("p", "post").with_priority(30)),
      Membership::Outsider => shortcuts.push(Shortcut::new("J", "join").with_priority(30)),
      _ => {}
    }
    shortcuts
  }
}
