//! A selectable list backed by a paginated query.

use std::future::Future;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::api::types::{Gated, Page};
use crate::api::ApiError;
use crate::query::{PageNav, PageWindow, Query, QueryKey, QueryState, SortField};
use crate::ui::context::Context;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::page_bar;

/// Fetched data that may hold a page of items
pub trait PageSource: Clone + Send + Sync + 'static {
  type Item;

  fn page(&self) -> Option<&Page<Self::Item>>;
}

impl<T: Clone + Send + Sync + 'static> PageSource for Page<T> {
  type Item = T;

  fn page(&self) -> Option<&Page<T>> {
    Some(self)
  }
}

impl<T: Clone + Send + Sync + 'static> PageSource for Gated<Page<T>> {
  type Item = T;

  fn page(&self) -> Option<&Page<T>> {
    self.allowed()
  }
}

/// Apply a paging key to `window`.
///
/// `h`/`l` step pages, `g`/`G` jump to the ends, `s` cycles the sort field,
/// `o` flips the direction and `z` cycles the page size. Returns true when
/// the window changed.
pub fn apply_page_key<S: SortField>(window: &mut PageWindow<S>, nav: &PageNav, key: KeyEvent) -> bool {
  let before = window.clone();
  match key.code {
    KeyCode::Char('l') | KeyCode::Right | KeyCode::PageDown => {
      window.next_page(nav);
    }
    KeyCode::Char('h') | KeyCode::Left | KeyCode::PageUp => {
      window.prev_page(nav);
    }
    KeyCode::Char('g') | KeyCode::Home => {
      window.first_page();
    }
    KeyCode::Char('G') | KeyCode::End => {
      window.last_page(nav);
    }
    KeyCode::Char('s') if window.is_sortable() => window.cycle_sort(),
    KeyCode::Char('o') if window.is_sortable() => window.toggle_direction(),
    KeyCode::Char('z') => window.cycle_size(),
    _ => return false,
  }
  *window != before
}

pub struct PagedList<S: SortField, D: PageSource> {
  query: Query<PageWindow<S>, D>,
  list_state: ListState,
}

impl<S, D> PagedList<S, D>
where
  S: SortField,
  D: PageSource,
{
  /// Build the query at page 0 and start fetching.
  pub fn new<K, F, Fut>(ctx: &Context, key_fn: K, fetcher: F) -> Self
  where
    K: Fn(&PageWindow<S>) -> QueryKey + Send + Sync + 'static,
    F: Fn(&PageWindow<S>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<D, ApiError>> + Send + 'static,
  {
    let mut query =
      Query::new(ctx.cache.clone(), ctx.window::<S>(), key_fn, fetcher).keep_previous_data();
    query.fetch();
    Self {
      query,
      list_state: ListState::default(),
    }
  }

  pub fn query(&self) -> &Query<PageWindow<S>, D> {
    &self.query
  }

  pub fn data(&self) -> Option<&D> {
    self.query.data()
  }

  pub fn items(&self) -> &[D::Item] {
    self
      .query
      .data()
      .and_then(D::page)
      .map(|p| p.items.as_slice())
      .unwrap_or(&[])
  }

  pub fn selected(&self) -> Option<&D::Item> {
    self.list_state.selected().and_then(|i| self.items().get(i))
  }

  pub fn nav(&self) -> PageNav {
    self
      .query
      .data()
      .and_then(D::page)
      .map(PageNav::from_page)
      .unwrap_or_default()
  }

  pub fn window(&self) -> &PageWindow<S> {
    self.query.params()
  }

  pub fn poll(&mut self) -> bool {
    self.query.poll()
  }

  pub fn refetch(&mut self) {
    self.query.refetch();
  }

  /// Selection, paging, sorting and `r` refresh. Returns true if consumed.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        return true;
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        return true;
      }
      KeyCode::Char('r') => {
        self.query.refetch();
        return true;
      }
      _ => {}
    }

    let mut window = self.window().clone();
    let nav = self.nav();
    if !apply_page_key(&mut window, &nav, key) {
      return matches!(
        key.code,
        KeyCode::Char('h' | 'l' | 'g' | 'G' | 'z') | KeyCode::Left | KeyCode::Right
      );
    }
    self.query.set_params(window);
    self.list_state.select(Some(0));
    true
  }

  /// `label (n/total) · sort ↓` plus loading and error markers
  pub fn title(&self, label: &str) -> String {
    let sort = self
      .window()
      .sort_label()
      .map(|s| format!(" · {}", s))
      .unwrap_or_default();
    let total = self
      .data()
      .and_then(D::page)
      .map(|p| p.total_elements);
    match (self.query.state(), total) {
      (QueryState::Loading, _) => format!(" {} (loading...) ", label),
      (QueryState::Error(e), _) => format!(" {} (error: {}) ", label, e),
      (_, Some(total)) if self.query.is_previous_data() || self.query.is_fetching() => {
        format!(" {} ({}){} (refreshing...) ", label, total, sort)
      }
      (_, Some(total)) => format!(" {} ({}){} ", label, total, sort),
      _ => format!(" {}{} ", label, sort),
    }
  }

  /// Render the list with a page bar underneath
  pub fn render<F>(&mut self, frame: &mut Frame, area: Rect, label: &str, empty: &str, row: F)
  where
    F: Fn(&D::Item) -> Line<'static>,
  {
    let block = Block::default()
      .title(self.title(label))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [list_area, bar_area] =
      Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
    frame.render_widget(Paragraph::new(page_bar(self.window(), &self.nav())), bar_area);

    let len = self.items().len();
    ensure_valid_selection(&mut self.list_state, len);
    if len == 0 {
      if !self.query.is_loading() {
        let content = if self.query.is_error() {
          "Failed to load. Press 'r' to retry."
        } else {
          empty
        };
        frame.render_widget(
          Paragraph::new(content).style(Style::default().fg(Color::DarkGray)),
          list_area,
        );
      }
      return;
    }

    let items: Vec<ListItem> = self.items().iter().map(|i| ListItem::new(row(i))).collect();
    let list = List::new(items)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut self.list_state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::PublicationSort;
  use crate::query::{PageSize, SortDirection, Unsorted};
  use crossterm::event::KeyModifiers;

  fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
  }

  fn nav(page: u32, total_pages: u32) -> PageNav {
    PageNav {
      page,
      total_pages,
      last: page + 1 >= total_pages,
    }
  }

  #[test]
  fn test_page_keys_respect_bounds() {
    let mut window: PageWindow<Unsorted> = PageWindow::new(PageSize::default());
    assert!(!apply_page_key(&mut window, &nav(0, 3), key('h')));
    assert!(apply_page_key(&mut window, &nav(0, 3), key('l')));
    assert_eq!(window.page(), 1);
    assert!(apply_page_key(&mut window, &nav(1, 3), key('G')));
    assert_eq!(window.page(), 2);
    assert!(!apply_page_key(&mut window, &nav(2, 3), key('l')));
    assert!(apply_page_key(&mut window, &nav(2, 3), key('g')));
    assert_eq!(window.page(), 0);
  }

  #[test]
  fn test_sort_keys_reset_page() {
    let mut window: PageWindow<PublicationSort> = PageWindow::new(PageSize::default());
    apply_page_key(&mut window, &nav(0, 4), key('l'));
    assert!(apply_page_key(&mut window, &nav(1, 4), key('s')));
    assert_eq!(window.sort(), PublicationSort::ViewCount);
    assert_eq!(window.page(), 0);

    apply_page_key(&mut window, &nav(0, 4), key('l'));
    assert!(apply_page_key(&mut window, &nav(1, 4), key('o')));
    assert_eq!(window.direction(), SortDirection::Asc);
    assert_eq!(window.page(), 0);

    assert!(apply_page_key(&mut window, &nav(0, 4), key('z')));
    assert_eq!(window.size().get(), 20);
  }

  #[test]
  fn test_sort_keys_ignored_when_unsorted() {
    let mut window: PageWindow<Unsorted> = PageWindow::new(PageSize::default());
    assert!(!apply_page_key(&mut window, &nav(0, 2), key('s')));
    assert!(!apply_page_key(&mut window, &nav(0, 2), key('o')));
  }

  #[test]
  fn test_gated_source_hides_restricted_pages() {
    let page = Page {
      items: vec![1, 2],
      total_elements: 2,
      total_pages: 1,
      number: 0,
      last: true,
    };
    assert_eq!(Gated::Allowed(page.clone()).page().map(|p| p.items.len()), Some(2));
    assert!(Gated::<Page<i32>>::Restricted.page().is_none());
  }
}
