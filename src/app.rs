use std::io::stdout;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::commands::Action;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryCache;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::context::Context;
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{GroupListView, GroupScope, PublicationListView, PublicationScope};
use crate::ui::{self, Notice};

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// The `:` palette
  command_input: CommandInput,

  /// Feedback for palette commands
  notice: Option<Notice>,

  config: Config,

  /// Shared client, cache and list defaults handed to every view
  ctx: Context,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = ApiClient::new(&config, config.session())?;
    let cache = QueryCache::new(config.cache.stale_time());
    let ctx = Context::new(client, cache, config.lists.page_size);
    let root: Box<dyn View> = Box::new(GroupListView::new(ctx.clone(), GroupScope::All));

    Ok(Self {
      view_stack: vec![root],
      command_input: CommandInput::new(),
      notice: None,
      config,
      ctx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }
    info!("quitting");
    Ok(())
  }

  fn tick(&mut self) {
    // Views below the top keep polling so they are current when revealed
    let mut pop_at = None;
    for (i, view) in self.view_stack.iter_mut().enumerate() {
      if matches!(view.tick(), ViewAction::Pop) && pop_at.is_none() {
        pop_at = Some(i);
      }
    }
    if let Some(i) = pop_at {
      self.close_from(i);
    }

    let collected = self.ctx.cache.gc(self.config.cache.gc_time());
    if collected > 0 {
      debug!(collected, "cache entries collected");
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self.view_stack.last().is_some_and(|v| v.is_capturing_input());
    if !capturing || self.command_input.is_active() {
      match self.command_input.handle_key(key) {
        KeyResult::NotHandled => {}
        KeyResult::Handled => return,
        KeyResult::Event(event) => {
          self.handle_command(event);
          return;
        }
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => {
        debug!(view = %next.breadcrumb_label(), "push view");
        self.notice = None;
        self.view_stack.push(next);
      }
      ViewAction::Pop => {
        let top = self.view_stack.len() - 1;
        self.close_from(top);
      }
    }
  }

  /// Close the view at `index` and everything above it. Closing the root quits.
  fn close_from(&mut self, index: usize) {
    if index == 0 {
      self.should_quit = true;
      return;
    }
    self.view_stack.truncate(index);
  }

  fn handle_command(&mut self, event: CommandEvent) {
    match event {
      CommandEvent::Cancelled => {}
      CommandEvent::Unknown(text) => {
        self.notice = Some(Notice::Error(format!("Unknown command: {}", text)));
      }
      CommandEvent::Run(action) => self.run_action(action),
    }
  }

  fn run_action(&mut self, action: Action) {
    info!(?action, "command");
    let ctx = self.ctx.clone();
    let root: Box<dyn View> = match action {
      Action::Quit => {
        self.should_quit = true;
        return;
      }
      Action::Groups => Box::new(GroupListView::new(ctx, GroupScope::All)),
      Action::Feed => Box::new(PublicationListView::new(ctx, PublicationScope::Feed)),
      Action::Mine | Action::MyGroups => {
        let Some(username) = self.ctx.username().map(str::to_string) else {
          self.notice = Some(Notice::Error(
            "No username configured. Use --user or GREENSPACE_USERNAME.".into(),
          ));
          return;
        };
        if action == Action::Mine {
          Box::new(PublicationListView::new(ctx, PublicationScope::User(username)))
        } else {
          Box::new(GroupListView::new(ctx, GroupScope::Member(username)))
        }
      }
    };
    self.notice = None;
    self.view_stack.clear();
    self.view_stack.push(root);
  }

  // Accessors for UI rendering

  pub fn base_url(&self) -> &str {
    &self.config.api.url
  }

  pub fn username(&self) -> Option<&str> {
    self.ctx.username()
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }

  pub fn shortcuts(&self) -> Vec<Shortcut> {
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn render_view(&mut self, frame: &mut Frame, area: Rect) {
    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, area);
    }
  }

  pub fn render_overlays(&self, frame: &mut Frame, area: Rect) {
    self.command_input.render_overlay(frame, area);
  }
}
