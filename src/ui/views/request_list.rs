use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::{MembershipDecision, MembershipRequest, RequestStatus};
use crate::api::{keys, Change};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::context::{Changes, Context};
use crate::ui::renderfns::{format_date, notice_line};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::{ensure_valid_selection, Notice};

struct Decide {
  group_id: i64,
  request_id: i64,
  status: RequestStatus,
}

impl Changes for Decide {
  fn change(&self) -> Change {
    Change::MembershipDecided {
      group_id: self.group_id,
    }
  }
}

fn status_style(status: RequestStatus) -> Style {
  match status {
    RequestStatus::Pending => Style::default().fg(Color::Yellow),
    RequestStatus::Approved => Style::default().fg(Color::Green),
    RequestStatus::Rejected => Style::default().fg(Color::Red),
  }
}

/// Stable order with undecided requests on top
fn pending_first(requests: &Vec<MembershipRequest>) -> Vec<MembershipRequest> {
  let mut sorted = requests.clone();
  sorted.sort_by_key(|r| r.status != RequestStatus::Pending);
  sorted
}

/// Pending membership requests for a group the viewer administers
pub struct RequestListView {
  group_id: i64,
  group_name: String,
  requests: Query<i64, Vec<MembershipRequest>>,
  decide: Mutation<Decide, MembershipDecision>,
  list_state: ListState,
  notice: Option<Notice>,
}

impl RequestListView {
  pub fn new(ctx: Context, group_id: i64, group_name: String) -> Self {
    let client = ctx.client.clone();
    let mut requests = Query::new(
      ctx.cache.clone(),
      group_id,
      |id: &i64| keys::membership_requests(*id),
      move |id: &i64| {
        let client = client.clone();
        let id = *id;
        async move { client.membership_requests(id).await }
      },
    )
    .select(pending_first);
    requests.fetch();

    let decide = ctx.mutation(|client, d: Decide| async move {
      client
        .handle_membership_request(d.request_id, d.status)
        .await
    });

    Self {
      group_id,
      group_name,
      requests,
      decide,
      list_state: ListState::default(),
      notice: None,
    }
  }

  fn selected(&self) -> Option<&MembershipRequest> {
    let requests = self.requests.data()?;
    self.list_state.selected().and_then(|i| requests.get(i))
  }

  fn answer(&mut self, status: RequestStatus) {
    let Some(request) = self.selected() else {
      return;
    };
    if request.status != RequestStatus::Pending {
      self.notice = Some(Notice::Error(format!(
        "Request from @{} was already handled",
        request.username
      )));
      return;
    }
    let decision = Decide {
      group_id: self.group_id,
      request_id: request.id,
      status,
    };
    self.decide.mutate(decision);
    self.notice = Some(Notice::Info("Sending decision...".into()));
  }
}

impl View for RequestListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('a') => self.answer(RequestStatus::Approved),
      KeyCode::Char('x') => self.answer(RequestStatus::Rejected),
      KeyCode::Char('r') => self.requests.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [list_area, notice_area] =
      Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

    let count = self.requests.data().map(Vec::len).unwrap_or(0);
    let title = match self.requests.state() {
      QueryState::Loading => format!(" Requests for {} (loading...) ", self.group_name),
      QueryState::Error(e) => format!(" Requests for {} (error: {}) ", self.group_name, e),
      _ => format!(" Requests for {} ({}) ", self.group_name, count),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let requests = self.requests.data().map(Vec::as_slice).unwrap_or(&[]);
    if requests.is_empty() {
      frame.render_widget(
        Paragraph::new("No membership requests.")
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        list_area,
      );
    } else {
      ensure_valid_selection(&mut self.list_state, requests.len());
      let items: Vec<ListItem> = requests
        .iter()
        .map(|r| {
          ListItem::new(Line::from(vec![
            Span::styled(
              format!("@{:<18}", r.username),
              Style::default().fg(Color::Yellow),
            ),
            Span::styled(
              format!("{:<20}", format_date(r.request_date)),
              Style::default().fg(Color::DarkGray),
            ),
            Span::styled(r.status.as_param(), status_style(r.status)),
          ]))
        })
        .collect();
      let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
      frame.render_stateful_widget(list, list_area, &mut self.list_state);
    }

    frame.render_widget(Paragraph::new(notice_line(self.notice.as_ref())), notice_area);
  }

  fn breadcrumb_label(&self) -> String {
    "Requests".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.requests.poll();
    if let Some(result) = self.decide.poll() {
      self.notice = Some(match result {
        Ok(decision) => Notice::Info(format!(
          "Request {} {}",
          decision.request_id,
          decision.status.as_param().to_lowercase()
        )),
        Err(e) => Notice::Error(e.to_string()),
      });
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("a", "approve").with_priority(20),
      Shortcut::new("x", "reject").with_priority(30),
      Shortcut::new("r", "refresh").with_priority(80),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
