use std::collections::HashMap;
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::api::types::{
  Comment, CommentDraft, Media, MediaUpdate, Page, Publication, PublicationDraft, Reaction,
  ReactionCounts, ReactionTarget, ReactionType, Upload,
};
use crate::api::{keys, ApiClient, ApiError, Change, ImageBlob};
use crate::query::tree::{reply_count, top_level, Row};
use crate::query::{Expansion, Mutation, PageNav, PageWindow, Query, QueryState, ThreadState, Unsorted};
use crate::ui::components::{apply_page_key, Composer, ComposerEvent, Confirm, KeyResult};
use crate::ui::context::{Changes, Context};
use crate::ui::renderfns::{format_date, notice_line, page_bar, reaction_key, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::{ensure_valid_selection, Notice};

/// Every write the publication screen can issue
enum Op {
  React {
    target: ReactionTarget,
    kind: ReactionType,
  },
  Unreact {
    target: ReactionTarget,
    reaction_id: i64,
  },
  Comment {
    publication_id: i64,
    content: String,
  },
  Reply {
    publication_id: i64,
    parent_id: i64,
    content: String,
  },
  EditComment {
    publication_id: i64,
    id: i64,
    parent_id: Option<i64>,
    content: String,
  },
  DeleteComment {
    publication_id: i64,
    id: i64,
    parent_id: Option<i64>,
  },
  EditPublication {
    id: i64,
    draft: PublicationDraft,
  },
  DeletePublication(i64),
  Upload {
    publication_id: i64,
    path: PathBuf,
    display_order: i32,
  },
  UploadBatch {
    publication_id: i64,
    paths: Vec<PathBuf>,
    captions: Vec<String>,
  },
  Caption {
    publication_id: i64,
    media_id: i64,
    caption: String,
  },
  DeleteMedia {
    publication_id: i64,
    media_id: i64,
  },
}

impl Changes for Op {
  fn change(&self) -> Change {
    match self {
      Op::React { target, .. } => Change::Reacted { target: *target },
      Op::Unreact { target, .. } => Change::ReactionDeleted { target: *target },
      Op::Comment { publication_id, .. } => Change::CommentAdded {
        publication_id: *publication_id,
      },
      Op::Reply {
        publication_id,
        parent_id,
        ..
      } => Change::ReplyAdded {
        publication_id: *publication_id,
        parent_id: *parent_id,
      },
      Op::EditComment {
        publication_id,
        parent_id,
        ..
      } => Change::CommentUpdated {
        publication_id: *publication_id,
        parent_id: *parent_id,
      },
      Op::DeleteComment {
        publication_id,
        parent_id,
        ..
      } => Change::CommentDeleted {
        publication_id: *publication_id,
        parent_id: *parent_id,
      },
      Op::EditPublication { id, .. } => Change::PublicationUpdated {
        publication_id: *id,
      },
      Op::DeletePublication(id) => Change::PublicationDeleted {
        publication_id: *id,
      },
      Op::Upload { publication_id, .. } => Change::MediaUploaded {
        publication_id: *publication_id,
      },
      Op::UploadBatch { publication_id, .. } => Change::MediaBatchUploaded {
        publication_id: *publication_id,
      },
      Op::Caption { publication_id, .. } => Change::MediaUpdated {
        publication_id: *publication_id,
      },
      Op::DeleteMedia { publication_id, .. } => Change::MediaDeleted {
        publication_id: *publication_id,
      },
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Done {
  Reacted,
  Unreacted,
  Commented,
  Replied,
  CommentEdited,
  CommentDeleted,
  PublicationEdited,
  PublicationDeleted,
  Uploaded(usize),
  CaptionSaved,
  MediaDeleted,
}

impl Done {
  fn message(&self) -> String {
    match self {
      Done::Reacted => "Reaction saved".into(),
      Done::Unreacted => "Reaction removed".into(),
      Done::Commented => "Comment added".into(),
      Done::Replied => "Reply added".into(),
      Done::CommentEdited => "Comment updated".into(),
      Done::CommentDeleted => "Comment deleted".into(),
      Done::PublicationEdited => "Publication updated".into(),
      Done::PublicationDeleted => "Publication deleted".into(),
      Done::Uploaded(1) => "Uploaded 1 file".into(),
      Done::Uploaded(n) => format!("Uploaded {} files", n),
      Done::CaptionSaved => "Caption saved".into(),
      Done::MediaDeleted => "Media deleted".into(),
    }
  }
}

async fn run(client: ApiClient, op: Op) -> Result<Done, ApiError> {
  match op {
    Op::React { target, kind } => client.react(target, kind).await.map(|_| Done::Reacted),
    Op::Unreact { reaction_id, .. } => client
      .delete_reaction(reaction_id)
      .await
      .map(|_| Done::Unreacted),
    Op::Comment {
      publication_id,
      content,
    } => client
      .add_comment(publication_id, &CommentDraft { content })
      .await
      .map(|_| Done::Commented),
    Op::Reply {
      parent_id, content, ..
    } => client
      .reply_to_comment(parent_id, &CommentDraft { content })
      .await
      .map(|_| Done::Replied),
    Op::EditComment { id, content, .. } => client
      .update_comment(id, &CommentDraft { content })
      .await
      .map(|_| Done::CommentEdited),
    Op::DeleteComment { id, .. } => client
      .delete_comment(id)
      .await
      .map(|_| Done::CommentDeleted),
    Op::EditPublication { id, draft } => client
      .update_publication(id, &draft)
      .await
      .map(|_| Done::PublicationEdited),
    Op::DeletePublication(id) => client
      .delete_publication(id)
      .await
      .map(|_| Done::PublicationDeleted),
    Op::Upload {
      publication_id,
      path,
      display_order,
    } => {
      let upload = Upload::read(&path).await?;
      client
        .upload_media(publication_id, upload, None, Some(display_order))
        .await
        .map(|_| Done::Uploaded(1))
    }
    Op::UploadBatch {
      publication_id,
      paths,
      captions,
    } => {
      let mut uploads = Vec::with_capacity(paths.len());
      for path in &paths {
        uploads.push(Upload::read(path).await?);
      }
      let count = uploads.len();
      client
        .upload_media_batch(publication_id, uploads, captions)
        .await
        .map(|_| Done::Uploaded(count))
    }
    Op::Caption {
      media_id, caption, ..
    } => {
      let update = MediaUpdate {
        caption: Some(caption),
        display_order: None,
      };
      client
        .update_media(media_id, &update)
        .await
        .map(|_| Done::CaptionSaved)
    }
    Op::DeleteMedia { media_id, .. } => client
      .delete_media(media_id)
      .await
      .map(|_| Done::MediaDeleted),
  }
}

/// Split a comma separated list of `path` or `path=caption` entries into
/// paths and index-aligned captions (empty when none was given)
fn parse_uploads(input: &str) -> (Vec<PathBuf>, Vec<String>) {
  input
    .split(',')
    .map(str::trim)
    .filter(|entry| !entry.is_empty())
    .filter_map(|entry| {
      let (path, caption) = entry.split_once('=').unwrap_or((entry, ""));
      let path = path.trim();
      (!path.is_empty()).then(|| (PathBuf::from(path), caption.trim().to_string()))
    })
    .unzip()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Publication,
  Comments,
  Media,
}

impl Focus {
  fn next(self) -> Self {
    match self {
      Focus::Publication => Focus::Comments,
      Focus::Comments => Focus::Media,
      Focus::Media => Focus::Publication,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Prompt {
  Comment,
  Reply(i64),
  EditComment { id: i64, parent_id: Option<i64> },
  EditPublication,
  Upload,
  UploadBatch,
  Caption(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
  Comment { id: i64, parent_id: Option<i64> },
  Media(i64),
  Publication,
}

fn counts_query(ctx: &Context, target: ReactionTarget) -> Query<ReactionTarget, ReactionCounts> {
  let client = ctx.client.clone();
  Query::new(
    ctx.cache.clone(),
    target,
    |t: &ReactionTarget| keys::reaction_counts(*t),
    move |t: &ReactionTarget| {
      let client = client.clone();
      let t = *t;
      async move { client.reaction_counts(t).await }
    },
  )
}

fn mine_query(ctx: &Context, target: ReactionTarget) -> Query<ReactionTarget, Option<Reaction>> {
  let client = ctx.client.clone();
  Query::new(
    ctx.cache.clone(),
    target,
    |t: &ReactionTarget| keys::user_reaction(*t),
    move |t: &ReactionTarget| {
      let client = client.clone();
      let t = *t;
      async move { client.my_reaction(t).await }
    },
  )
  .enabled(ctx.username().is_some())
}

fn reaction_bar(counts: Option<&ReactionCounts>, mine: Option<&Reaction>) -> Line<'static> {
  let mut spans = Vec::new();
  for kind in ReactionType::ALL {
    let n = counts.map(|c| c.get(kind)).unwrap_or(0);
    let style = if mine.is_some_and(|r| r.reaction_type == kind) {
      Style::default().fg(Color::Black).bg(Color::Yellow)
    } else if n > 0 {
      Style::default()
    } else {
      Style::default().fg(Color::DarkGray)
    };
    spans.push(Span::styled(
      format!("{}:{} {}", reaction_key(kind), kind.label(), n),
      style,
    ));
    spans.push(Span::raw("  "));
  }
  Line::from(spans)
}

fn comment_line(row: &Row<'_, Comment>, expanded: bool, loaded: Option<&[Comment]>) -> Line<'static> {
  let comment = row.item;
  let replies = reply_count(comment, loaded);
  let marker = match (expanded, replies) {
    (true, _) => "▾ ",
    (false, 0) => "  ",
    (false, _) => "▸ ",
  };
  let mut spans = vec![
    Span::raw("  ".repeat(row.depth)),
    Span::styled(marker, Style::default().fg(Color::Cyan)),
    Span::styled(
      format!("@{} ", comment.author.username),
      Style::default().fg(Color::Yellow),
    ),
    Span::raw(truncate(comment.content.lines().next().unwrap_or(""), 60)),
  ];
  if comment.is_edited {
    spans.push(Span::styled(" (edited)", Style::default().fg(Color::DarkGray)));
  }
  if replies > 0 {
    spans.push(Span::styled(
      format!("  {} repl{}", replies, if replies == 1 { "y" } else { "ies" }),
      Style::default().fg(Color::DarkGray),
    ));
  }
  Line::from(spans)
}

/// One publication with reactions, threaded comments and attached media
pub struct PublicationDetailView {
  ctx: Context,
  publication_id: i64,
  focus: Focus,
  publication: Query<i64, Publication>,
  counts: Query<ReactionTarget, ReactionCounts>,
  mine: Query<ReactionTarget, Option<Reaction>>,
  reactors: Query<ReactionTarget, Vec<Reaction>>,
  comments: Query<PageWindow<Unsorted>, Page<Comment>>,
  comment_total: Query<i64, u64>,
  /// Reactions on the selected comment
  comment_counts: Query<ReactionTarget, ReactionCounts>,
  comment_mine: Query<ReactionTarget, Option<Reaction>>,
  replies: HashMap<i64, Query<i64, Vec<Comment>>>,
  threads: ThreadState,
  comment_state: ListState,
  media: Query<i64, Vec<Media>>,
  media_state: ListState,
  image: Query<String, ImageBlob>,
  ops: Mutation<Op, Done>,
  composer: Composer<Prompt>,
  confirm: Confirm<Removal>,
  notice: Option<Notice>,
}

impl PublicationDetailView {
  pub fn new(ctx: Context, publication_id: i64) -> Self {
    let client = ctx.client.clone();
    let target = ReactionTarget::Publication(publication_id);

    let mut publication = Query::new(
      ctx.cache.clone(),
      publication_id,
      |id: &i64| keys::publication(*id),
      {
        let client = client.clone();
        move |id: &i64| {
          let client = client.clone();
          let id = *id;
          async move { client.get_publication(id).await }
        }
      },
    );
    publication.fetch();

    let mut counts = counts_query(&ctx, target);
    counts.fetch();
    let mut mine = mine_query(&ctx, target);
    mine.fetch();

    let mut reactors = Query::new(
      ctx.cache.clone(),
      target,
      |t: &ReactionTarget| keys::reactions(*t),
      {
        let client = client.clone();
        move |t: &ReactionTarget| {
          let client = client.clone();
          let t = *t;
          async move { client.reactions(t).await }
        }
      },
    );
    reactors.fetch();

    let mut comments = Query::new(
      ctx.cache.clone(),
      ctx.window::<Unsorted>(),
      move |w: &PageWindow<Unsorted>| keys::publication_comments(publication_id, w),
      {
        let client = client.clone();
        move |w: &PageWindow<Unsorted>| {
          let client = client.clone();
          let w = w.clone();
          async move { client.publication_comments(publication_id, &w).await }
        }
      },
    )
    .keep_previous_data();
    comments.fetch();

    let mut comment_total = Query::new(
      ctx.cache.clone(),
      publication_id,
      |id: &i64| keys::publication_comment_count(*id),
      {
        let client = client.clone();
        move |id: &i64| {
          let client = client.clone();
          let id = *id;
          async move { client.comment_count(id).await }
        }
      },
    );
    comment_total.fetch();

    let mut media = Query::new(
      ctx.cache.clone(),
      publication_id,
      |id: &i64| keys::publication_media(*id),
      {
        let client = client.clone();
        move |id: &i64| {
          let client = client.clone();
          let id = *id;
          async move { client.publication_media(id).await }
        }
      },
    );
    media.fetch();

    // Fetched on demand for the selected media item
    let image = Query::new(
      ctx.cache.clone(),
      String::new(),
      |path: &String| keys::image(path),
      move |path: &String| {
        let client = client.clone();
        let path = path.clone();
        async move { client.fetch_image(&path).await }
      },
    )
    .enabled(false);

    let placeholder = ReactionTarget::Comment(0);
    Self {
      publication_id,
      focus: Focus::Publication,
      publication,
      counts,
      mine,
      reactors,
      comments,
      comment_total,
      comment_counts: counts_query(&ctx, placeholder).enabled(false),
      comment_mine: mine_query(&ctx, placeholder).enabled(false),
      replies: HashMap::new(),
      threads: ThreadState::new(),
      comment_state: ListState::default(),
      media,
      media_state: ListState::default(),
      image,
      ops: ctx.mutation(run),
      ctx,
      composer: Composer::new(),
      confirm: Confirm::new(),
      notice: None,
    }
  }

  fn is_author(&self) -> bool {
    self
      .publication
      .data()
      .is_some_and(|p| self.ctx.username() == Some(p.author.username.as_str()))
  }

  fn owns(&self, comment: &Comment) -> bool {
    self.ctx.username() == Some(comment.author.username.as_str())
  }

  fn submit(&mut self, op: Op, progress: &str) {
    self.ops.mutate(op);
    self.notice = Some(Notice::Info(progress.to_string()));
  }

  fn deny(&mut self, message: &str) {
    self.notice = Some(Notice::Error(message.to_string()));
  }

  // ---------------------------------------------------------------------
  // Comments
  // ---------------------------------------------------------------------

  fn rows(&self) -> Vec<Row<'_, Comment>> {
    let Some(page) = self.comments.data() else {
      return Vec::new();
    };
    let roots = top_level(&page.items);
    self.threads.visible_rows(&roots, |id| {
      self
        .replies
        .get(&id)
        .and_then(|q| q.data())
        .map(Vec::as_slice)
    })
  }

  fn selected_comment(&self) -> Option<Comment> {
    let index = self.comment_state.selected()?;
    self.rows().get(index).map(|row| row.item.clone())
  }

  fn replies_query(&self, comment_id: i64) -> Query<i64, Vec<Comment>> {
    let client = self.ctx.client.clone();
    Query::new(
      self.ctx.cache.clone(),
      comment_id,
      |id: &i64| keys::comment_replies(*id),
      move |id: &i64| {
        let client = client.clone();
        let id = *id;
        async move { client.comment_replies(id).await }
      },
    )
  }

  fn toggle_thread(&mut self) {
    let Some(comment) = self.selected_comment() else {
      return;
    };
    match self.threads.toggle(comment.id) {
      Expansion::FirstOpen => {
        let mut query = self.replies_query(comment.id);
        query.fetch();
        self.replies.insert(comment.id, query);
      }
      Expansion::Reopened => {
        if let Some(query) = self.replies.get_mut(&comment.id) {
          query.fetch();
        }
      }
      Expansion::Collapsed => {}
    }
  }

  /// Point the comment reaction queries at the selected comment
  fn follow_comment(&mut self) {
    let Some(comment) = self.selected_comment() else {
      return;
    };
    let target = ReactionTarget::Comment(comment.id);
    self.comment_counts.set_params(target);
    self.comment_counts.set_enabled(true);
    self.comment_mine.set_params(target);
    self.comment_mine.set_enabled(self.ctx.username().is_some());
  }

  fn page_comments(&mut self, key: KeyEvent) -> bool {
    let mut window = self.comments.params().clone();
    let nav = self
      .comments
      .data()
      .map(PageNav::from_page)
      .unwrap_or_default();
    if !apply_page_key(&mut window, &nav, key) {
      return false;
    }
    self.comments.set_params(window);
    self.threads.collapse_all();
    self.comment_state.select(Some(0));
    true
  }

  fn handle_comment_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.comment_state.select_next();
        self.follow_comment();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.comment_state.select_previous();
        self.follow_comment();
      }
      KeyCode::Enter => self.toggle_thread(),
      KeyCode::Char('a') if self.ctx.username().is_some() => {
        if let Some(comment) = self.selected_comment() {
          self.composer.open(Prompt::Reply(comment.id), "Reply", "");
        }
      }
      KeyCode::Char('e') => match self.selected_comment() {
        Some(c) if self.owns(&c) => self.composer.open(
          Prompt::EditComment {
            id: c.id,
            parent_id: c.parent_comment_id,
          },
          "Edit comment",
          &c.content,
        ),
        Some(_) => self.deny("You can only edit your own comments"),
        None => {}
      },
      KeyCode::Char('d') => match self.selected_comment() {
        Some(c) if self.owns(&c) => self.confirm.ask(
          Removal::Comment {
            id: c.id,
            parent_id: c.parent_comment_id,
          },
          format!("Delete comment \"{}\"?", truncate(&c.content, 40)),
        ),
        Some(_) => self.deny("You can only delete your own comments"),
        None => {}
      },
      _ => {
        self.page_comments(key);
      }
    }
  }

  // ---------------------------------------------------------------------
  // Media
  // ---------------------------------------------------------------------

  fn selected_media(&self) -> Option<&Media> {
    let index = self.media_state.selected()?;
    self.media.data()?.get(index)
  }

  fn open_image(&mut self) {
    let path = self
      .selected_media()
      .and_then(|m| m.file_url.clone().or_else(|| m.thumbnail_url.clone()));
    match path {
      Some(path) => {
        self.image.set_params(path);
        self.image.set_enabled(true);
      }
      None => self.deny("This item has no file"),
    }
  }

  fn handle_media_key(&mut self, key: KeyEvent) {
    let author = self.is_author();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.media_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.media_state.select_previous(),
      KeyCode::Enter | KeyCode::Char('i') => self.open_image(),
      KeyCode::Char('u') if author => self.composer.open(Prompt::Upload, "File to upload", ""),
      KeyCode::Char('U') if author => {
        self
          .composer
          .open(Prompt::UploadBatch, "Files as path[=caption], comma separated", "")
      }
      KeyCode::Char('e') if author => {
        if let Some(m) = self.selected_media() {
          let prompt = Prompt::Caption(m.id);
          let caption = m.caption.clone().unwrap_or_default();
          self.composer.open(prompt, "Caption", &caption);
        }
      }
      KeyCode::Char('d') if author => {
        if let Some(m) = self.selected_media() {
          let question = format!("Delete {}?", m.file_name);
          let id = m.id;
          self.confirm.ask(Removal::Media(id), question);
        }
      }
      KeyCode::Char('u' | 'U' | 'e' | 'd') => {
        self.deny("Only the author can change media");
      }
      _ => {}
    }
  }

  // ---------------------------------------------------------------------
  // Reactions
  // ---------------------------------------------------------------------

  /// Toggle `kind` on the focused target: the same reaction again removes it.
  fn react(&mut self, kind: ReactionType) {
    if self.ctx.username().is_none() {
      self.deny("Set a username to react");
      return;
    }
    let (target, mine) = match self.focus {
      Focus::Comments => match self.selected_comment() {
        Some(c) => (ReactionTarget::Comment(c.id), &self.comment_mine),
        None => return,
      },
      _ => (ReactionTarget::Publication(self.publication_id), &self.mine),
    };
    let existing = mine
      .data()
      .filter(|_| *mine.params() == target)
      .and_then(Option::as_ref)
      .filter(|r| r.reaction_type == kind)
      .map(|r| r.id);
    let op = match existing {
      Some(reaction_id) => Op::Unreact {
        target,
        reaction_id,
      },
      None => Op::React { target, kind },
    };
    self.submit(op, "Reacting...");
  }

  // ---------------------------------------------------------------------
  // Overlays
  // ---------------------------------------------------------------------

  fn handle_overlays(&mut self, key: KeyEvent) -> bool {
    let publication_id = self.publication_id;
    match self.confirm.handle_key(key) {
      KeyResult::NotHandled => {}
      KeyResult::Handled => return true,
      KeyResult::Event(removal) => {
        let op = match removal {
          Removal::Comment { id, parent_id } => Op::DeleteComment {
            publication_id,
            id,
            parent_id,
          },
          Removal::Media(media_id) => Op::DeleteMedia {
            publication_id,
            media_id,
          },
          Removal::Publication => Op::DeletePublication(publication_id),
        };
        self.submit(op, "Deleting...");
        return true;
      }
    }

    let (prompt, text) = match self.composer.handle_key(key) {
      KeyResult::NotHandled => return false,
      KeyResult::Handled | KeyResult::Event(ComposerEvent::Cancelled) => return true,
      KeyResult::Event(ComposerEvent::Submitted(prompt, text)) => (prompt, text),
    };
    let op = match prompt {
      Prompt::Comment => Op::Comment {
        publication_id,
        content: text,
      },
      Prompt::Reply(parent_id) => Op::Reply {
        publication_id,
        parent_id,
        content: text,
      },
      Prompt::EditComment { id, parent_id } => Op::EditComment {
        publication_id,
        id,
        parent_id,
        content: text,
      },
      Prompt::EditPublication => {
        let Some(current) = self.publication.data() else {
          return true;
        };
        Op::EditPublication {
          id: publication_id,
          draft: PublicationDraft {
            content: text,
            privacy_level: current.privacy_level(),
            location: current.location.clone(),
            feeling: current.feeling.clone(),
          },
        }
      }
      Prompt::Upload => Op::Upload {
        publication_id,
        path: PathBuf::from(text),
        display_order: self.media.data().map(Vec::len).unwrap_or(0) as i32,
      },
      Prompt::UploadBatch => {
        let (paths, captions) = parse_uploads(&text);
        Op::UploadBatch {
          publication_id,
          paths,
          captions,
        }
      }
      Prompt::Caption(media_id) => Op::Caption {
        publication_id,
        media_id,
        caption: text,
      },
    };
    self.submit(op, "Saving...");
    true
  }

  // ---------------------------------------------------------------------
  // Rendering
  // ---------------------------------------------------------------------

  fn pane(&self, title: String, focus: Focus) -> Block<'static> {
    let color = if self.focus == focus {
      Color::Cyan
    } else {
      Color::Blue
    };
    Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color))
  }

  fn render_publication(&self, frame: &mut Frame, area: Rect) {
    let title = match self.publication.state() {
      QueryState::Loading => " Publication (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Publication (error: {}) ", e),
      _ => format!(" Publication {} ", self.publication_id),
    };
    let block = self.pane(title, Focus::Publication);
    let Some(p) = self.publication.data() else {
      frame.render_widget(block, area);
      return;
    };

    let dim = Style::default().fg(Color::DarkGray);
    let mut byline = vec![
      Span::styled(format!("@{}", p.author.username), Style::default().fg(Color::Yellow)),
      Span::styled(format!("  {}", format_date(p.create_date)), dim),
      Span::styled(format!("  {} views", p.view_count), dim),
    ];
    if let Some(group) = &p.group_name {
      byline.push(Span::styled(format!("  in {}", group), dim));
    }
    if let Some(target) = &p.target_username {
      byline.push(Span::styled(format!("  to @{}", target), dim));
    }
    if p.is_edited {
      byline.push(Span::styled("  (edited)", dim));
    }

    let mine = self.mine.data().and_then(Option::as_ref);
    let reactors = match self.reactors.data() {
      Some(list) if !list.is_empty() => {
        let names: Vec<String> = list
          .iter()
          .take(8)
          .map(|r| format!("@{}", r.author.username))
          .collect();
        let more = list.len().saturating_sub(8);
        let tail = if more > 0 {
          format!(" and {} more", more)
        } else {
          String::new()
        };
        format!("Reacted: {}{}", names.join(" "), tail)
      }
      _ => String::new(),
    };

    let mut lines = vec![
      Line::from(byline),
      reaction_bar(self.counts.data(), mine),
      Line::styled(reactors, dim),
      Line::default(),
    ];
    lines.extend(p.content.lines().map(|l| Line::from(l.to_string())));
    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
      area,
    );
  }

  fn render_comments(&mut self, frame: &mut Frame, area: Rect) {
    let total = self
      .comment_total
      .data()
      .map(|n| format!(" ({})", n))
      .unwrap_or_default();
    let title = match self.comments.state() {
      QueryState::Loading => " Comments (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Comments (error: {}) ", e),
      _ => format!(" Comments{} ", total),
    };
    let block = self.pane(title, Focus::Comments);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [list_area, bar_area, reaction_area] = Layout::vertical([
      Constraint::Min(1),
      Constraint::Length(1),
      Constraint::Length(1),
    ])
    .areas(inner);

    let lines: Vec<Line<'static>> = self
      .rows()
      .iter()
      .map(|row| {
        let id = row.item.id;
        let loaded = self
          .replies
          .get(&id)
          .and_then(|q| q.data())
          .map(Vec::as_slice);
        comment_line(row, self.threads.is_expanded(id), loaded)
      })
      .collect();

    if lines.is_empty() {
      frame.render_widget(
        Paragraph::new("No comments yet.").style(Style::default().fg(Color::DarkGray)),
        list_area,
      );
    } else {
      ensure_valid_selection(&mut self.comment_state, lines.len());
      let list = List::new(lines.into_iter().map(ListItem::new))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
      frame.render_stateful_widget(list, list_area, &mut self.comment_state);
    }

    if let Some(page) = self.comments.data() {
      let nav = PageNav::from_page(page);
      frame.render_widget(Paragraph::new(page_bar(self.comments.params(), &nav)), bar_area);
    }

    if self.focus == Focus::Comments && self.comment_counts.is_enabled() {
      let mine = self
        .comment_mine
        .data()
        .and_then(Option::as_ref);
      frame.render_widget(
        Paragraph::new(reaction_bar(self.comment_counts.data(), mine)),
        reaction_area,
      );
    }
  }

  fn render_media(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.media.state() {
      QueryState::Loading => " Media (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Media (error: {}) ", e),
      _ => format!(" Media ({}) ", self.media.data().map(Vec::len).unwrap_or(0)),
    };
    let block = self.pane(title, Focus::Media);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let [list_area, image_area] =
      Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(inner);

    let items: Vec<ListItem> = self
      .media
      .data()
      .map(|media| {
        media
          .iter()
          .map(|m| {
            let kind = m
              .media_type
              .map(|t| format!("{:?}", t).to_lowercase())
              .unwrap_or_else(|| "file".into());
            let caption = m.caption.as_deref().unwrap_or("");
            ListItem::new(Line::from(vec![
              Span::styled(format!("{:<9}", kind), Style::default().fg(Color::Cyan)),
              Span::raw(truncate(&m.file_name, 24)),
              Span::styled(
                format!("  {}", truncate(caption, 30)),
                Style::default().fg(Color::DarkGray),
              ),
            ]))
          })
          .collect()
      })
      .unwrap_or_default();

    if items.is_empty() {
      frame.render_widget(
        Paragraph::new("No media.").style(Style::default().fg(Color::DarkGray)),
        list_area,
      );
    } else {
      ensure_valid_selection(&mut self.media_state, items.len());
      let list = List::new(items)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
      frame.render_stateful_widget(list, list_area, &mut self.media_state);
    }

    let image = match self.image.state() {
      QueryState::Idle => Line::styled("Enter to download", Style::default().fg(Color::DarkGray)),
      QueryState::Loading => Line::from("Downloading..."),
      QueryState::Error(e) => Line::styled(e.to_string(), Style::default().fg(Color::Red)),
      QueryState::Success(blob) => Line::from(format!(
        "{}  {:.1} KiB",
        blob.content_type.as_deref().unwrap_or("unknown type"),
        blob.len() as f64 / 1024.0
      )),
    };
    frame.render_widget(Paragraph::new(image).wrap(Wrap { trim: true }), image_area);
  }
}

impl View for PublicationDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.handle_overlays(key) {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Tab => {
        self.focus = self.focus.next();
        if self.focus == Focus::Comments {
          self.follow_comment();
        }
        return ViewAction::None;
      }
      KeyCode::Char(c @ '1'..='6') => {
        let index = (c as u8 - b'1') as usize;
        self.react(ReactionType::ALL[index]);
        return ViewAction::None;
      }
      KeyCode::Char('n') if self.ctx.username().is_some() => {
        self.composer.open(Prompt::Comment, "Comment", "");
        return ViewAction::None;
      }
      KeyCode::Char('E') if self.is_author() => {
        let content = self
          .publication
          .data()
          .map(|p| p.content.clone())
          .unwrap_or_default();
        self.composer.open(Prompt::EditPublication, "Edit publication", &content);
        return ViewAction::None;
      }
      KeyCode::Char('D') if self.is_author() => {
        self
          .confirm
          .ask(Removal::Publication, "Delete this publication?");
        return ViewAction::None;
      }
      KeyCode::Char('r') => {
        self.publication.refetch();
        self.counts.refetch();
        self.mine.refetch();
        self.reactors.refetch();
        self.comments.refetch();
        self.comment_total.refetch();
        self.media.refetch();
        for query in self.replies.values_mut() {
          query.refetch();
        }
        return ViewAction::None;
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }

    match self.focus {
      Focus::Comments => self.handle_comment_key(key),
      Focus::Media => self.handle_media_key(key),
      Focus::Publication => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [top, middle, notice] = Layout::vertical([
      Constraint::Length(10),
      Constraint::Min(6),
      Constraint::Length(1),
    ])
    .areas(area);
    let [comments, media] =
      Layout::horizontal([Constraint::Percentage(64), Constraint::Percentage(36)]).areas(middle);

    self.render_publication(frame, top);
    self.render_comments(frame, comments);
    self.render_media(frame, media);
    frame.render_widget(Paragraph::new(notice_line(self.notice.as_ref())), notice);
    self.composer.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Publication {}", self.publication_id)
  }

  fn tick(&mut self) -> ViewAction {
    self.publication.poll();
    self.counts.poll();
    self.mine.poll();
    self.reactors.poll();
    if self.comments.poll() && self.focus == Focus::Comments {
      self.follow_comment();
    }
    self.comment_total.poll();
    self.comment_counts.poll();
    self.comment_mine.poll();
    for query in self.replies.values_mut() {
      query.poll();
    }
    self.media.poll();
    self.image.poll();

    if let Some(result) = self.ops.poll() {
      if result == Ok(Done::PublicationDeleted) {
        return ViewAction::Pop;
      }
      self.notice = Some(match result {
        Ok(done) => Notice::Info(done.message()),
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
      Shortcut::new("tab", "focus").with_priority(20),
      Shortcut::new("1-6", "react").with_priority(30),
      Shortcut::new("n", "comment").with_priority(40),
      Shortcut::new("q", "back").with_priority(90),
    ];
    match self.focus {
      Focus::Comments => shortcuts.extend([
        Shortcut::new("enter", "replies").with_priority(50),
        Shortcut::new("a", "reply").with_priority(55),
        Shortcut::new("e/d", "edit/delete").with_priority(60),
      ]),
      Focus::Media => shortcuts.extend([
        Shortcut::new("enter", "download").with_priority(50),
        Shortcut::new("u/U", "upload").with_priority(55),
      ]),
      Focus::Publication if self.is_author() => {
        shortcuts.push(Shortcut::new("E/D", "edit/delete").with_priority(50))
      }
      Focus::Publication => {}
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_uploads() {
    let (paths, captions) = parse_uploads(" a.png, ,b dir/c.jpg = Moss wall ,=orphan,");
    assert_eq!(
      paths,
      vec![PathBuf::from("a.png"), PathBuf::from("b dir/c.jpg")]
    );
    assert_eq!(captions, vec![String::new(), "Moss wall".to_string()]);

    let (paths, captions) = parse_uploads("  ");
    assert!(paths.is_empty());
    assert!(captions.is_empty());
  }

  #[test]
  fn test_reply_edits_touch_parent_thread() {
    let edit = Op::EditComment {
      publication_id: 5,
      id: 7,
      parent_id: Some(3),
      content: "fixed".into(),
    };
    assert_eq!(
      edit.change(),
      Change::CommentUpdated {
        publication_id: 5,
        parent_id: Some(3)
      }
    );

    let delete = Op::DeleteComment {
      publication_id: 5,
      id: 7,
      parent_id: Some(3),
    };
    let prefixes = delete.change().invalidates();
    assert!(prefixes.contains(&keys::comment_replies(3)));
  }

  #[test]
  fn test_focus_cycles() {
    assert_eq!(Focus::Publication.next(), Focus::Comments);
    assert_eq!(Focus::Comments.next(), Focus::Media);
    assert_eq!(Focus::Media.next(), Focus::Publication);
  }

  #[test]
  fn test_done_messages() {
    assert_eq!(Done::Uploaded(1).message(), "Uploaded 1 file");
    assert_eq!(Done::Uploaded(3).message(), "Uploaded 3 files");
  }
}
