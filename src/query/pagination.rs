//! Page/size/sort state for paginated list views.

use std::ops::Range;

use super::key::QueryKey;
use crate::api::types::Page;

/// A server-side sort column for one listing
pub trait SortField: Copy + Eq + Default + Send + Sync + 'static {
  /// Value of the `sortBy` parameter, `None` when the endpoint takes no sort
  fn param(&self) -> Option<&'static str>;
  fn label(&self) -> &'static str;
  fn all() -> &'static [Self];

  /// Next field in declaration order, wrapping around
  fn next(&self) -> Self {
    let all = Self::all();
    let idx = all.iter().position(|f| f == self).unwrap_or(0);
    all.get((idx + 1) % all.len().max(1)).copied().unwrap_or_default()
  }
}

/// Sort field for endpoints that only accept page and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unsorted;

impl SortField for Unsorted {
  fn param(&self) -> Option<&'static str> {
    None
  }

  fn label(&self) -> &'static str {
    ""
  }

  fn all() -> &'static [Self] {
    &[Unsorted]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

impl SortDirection {
  pub fn param(&self) -> &'static str {
    match self {
      SortDirection::Asc => "asc",
      SortDirection::Desc => "desc",
    }
  }

  pub fn toggled(&self) -> Self {
    match self {
      SortDirection::Asc => SortDirection::Desc,
      SortDirection::Desc => SortDirection::Asc,
    }
  }

  pub fn arrow(&self) -> &'static str {
    match self {
      SortDirection::Asc => "↑",
      SortDirection::Desc => "↓",
    }
  }
}

/// One of the allowed page sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSize(u32);

impl PageSize {
  pub const OPTIONS: [u32; 4] = [5, 10, 20, 50];

  /// Use `n` when it is an allowed size, otherwise the default.
  pub fn new(n: u32) -> Self {
    if Self::OPTIONS.contains(&n) {
      Self(n)
    } else {
      Self::default()
    }
  }

  pub fn get(&self) -> u32 {
    self.0
  }

  pub fn next(&self) -> Self {
    let idx = Self::OPTIONS.iter().position(|n| *n == self.0).unwrap_or(0);
    Self(Self::OPTIONS[(idx + 1) % Self::OPTIONS.len()])
  }
}

impl Default for PageSize {
  fn default() -> Self {
    Self(10)
  }
}

/// Navigation facts derived from a loaded page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageNav {
  pub page: u32,
  pub total_pages: u32,
  pub last: bool,
}

impl PageNav {
  pub const VISIBLE: u32 = 5;

  pub fn from_page<T>(page: &Page<T>) -> Self {
    Self {
      page: page.number,
      total_pages: page.total_pages,
      last: page.last,
    }
  }

  pub fn has_prev(&self) -> bool {
    self.page > 0
  }

  pub fn has_next(&self) -> bool {
    !self.last && self.page.saturating_add(1) < self.total_pages
  }

  /// At most five page indices centred on the current page
  pub fn visible_pages(&self) -> Range<u32> {
    let end = self
      .page
      .saturating_sub(Self::VISIBLE / 2)
      .saturating_add(Self::VISIBLE)
      .min(self.total_pages);
    let start = end.saturating_sub(Self::VISIBLE);
    start..end
  }
}

/// Client-local page window for one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow<S: SortField> {
  page: u32,
  size: PageSize,
  sort: S,
  direction: SortDirection,
}

impl<S: SortField> PageWindow<S> {
  pub fn new(size: PageSize) -> Self {
    Self {
      page: 0,
      size,
      sort: S::default(),
      direction: SortDirection::default(),
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn size(&self) -> PageSize {
    self.size
  }

  pub fn sort(&self) -> S {
    self.sort
  }

  pub fn direction(&self) -> SortDirection {
    self.direction
  }

  pub fn is_sortable(&self) -> bool {
    self.sort.param().is_some()
  }

  /// Step from the requested page, which may still be loading while `nav`
  /// describes the page on screen.
  pub fn next_page(&mut self, nav: &PageNav) -> bool {
    if self.page == nav.page && !nav.has_next() {
      return false;
    }
    self.go_to(self.page.saturating_add(1), nav)
  }

  pub fn prev_page(&mut self, nav: &PageNav) -> bool {
    self
      .page
      .checked_sub(1)
      .is_some_and(|page| self.go_to(page, nav))
  }

  pub fn first_page(&mut self) -> bool {
    let moved = self.page != 0;
    self.page = 0;
    moved
  }

  pub fn last_page(&mut self, nav: &PageNav) -> bool {
    self.go_to(nav.total_pages.saturating_sub(1), nav)
  }

  /// Jump to `page` if it exists
  pub fn go_to(&mut self, page: u32, nav: &PageNav) -> bool {
    if page >= nav.total_pages.max(1) || page == self.page {
      return false;
    }
    self.page = page;
    true
  }

  pub fn set_size(&mut self, size: PageSize) {
    if size != self.size {
      self.size = size;
      self.page = 0;
    }
  }

  pub fn cycle_size(&mut self) {
    self.set_size(self.size.next());
  }

  pub fn set_sort(&mut self, sort: S) {
    if sort != self.sort {
      self.sort = sort;
      self.page = 0;
    }
  }

  pub fn cycle_sort(&mut self) {
    self.set_sort(self.sort.next());
  }

  pub fn set_direction(&mut self, direction: SortDirection) {
    if direction != self.direction {
      self.direction = direction;
      self.page = 0;
    }
  }

  pub fn toggle_direction(&mut self) {
    self.set_direction(self.direction.toggled());
  }

  /// `page`, `size` and, for sortable listings, `sortBy` and `direction`
  pub fn query_params(&self) -> Vec<(&'static str, String)> {
    let mut params = vec![
      ("page", self.page.to_string()),
      ("size", self.size.get().to_string()),
    ];
    if let Some(field) = self.sort.param() {
      params.push(("sortBy", field.to_string()));
      params.push(("direction", self.direction.param().to_string()));
    }
    params
  }

  /// Append the window to a resource key, in query-parameter order
  pub fn extend_key(&self, key: QueryKey) -> QueryKey {
    let key = key.with(self.page).with(self.size.get());
    match self.sort.param() {
      Some(field) => key.with(field).with(self.direction.param()),
      None => key,
    }
  }

  /// "name ↓" style label for the list title
  pub fn sort_label(&self) -> Option<String> {
    self
      .sort
      .param()
      .map(|_| format!("{} {}", self.sort.label(), self.direction.arrow()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{MemberSort, PublicationSort};

  fn nav(page: u32, total_pages: u32) -> PageNav {
    PageNav {
      page,
      total_pages,
      last: page + 1 >= total_pages,
    }
  }

  #[test]
  fn test_page_size_only_allows_known_sizes() {
    assert_eq!(PageSize::new(20).get(), 20);
    assert_eq!(PageSize::new(7).get(), 10);
    assert_eq!(PageSize::new(50).next().get(), 5);
  }

  #[test]
  fn test_prev_disabled_on_first_page() {
    let mut window: PageWindow<PublicationSort> = PageWindow::new(PageSize::default());
    assert!(!window.prev_page(&nav(0, 5)));
    assert_eq!(window.page(), 0);
  }

  #[test]
  fn test_next_disabled_on_last_page() {
    let mut window: PageWindow<PublicationSort> = PageWindow::new(PageSize::default());
    assert!(window.last_page(&nav(0, 5)));
    assert_eq!(window.page(), 4);
    assert!(!window.next_page(&nav(4, 5)));

    // `last` alone also stops forward navigation
    let flagged = PageNav {
      page: 1,
      total_pages: 5,
      last: true,
    };
    assert!(!flagged.has_next());
  }

  #[test]
  fn test_repeated_turns_advance_past_loading_page() {
    let mut window: PageWindow<PublicationSort> = PageWindow::new(PageSize::default());
    // Page 0 stays on screen while the next pages load
    let shown = nav(0, 3);
    assert!(window.next_page(&shown));
    assert!(window.next_page(&shown));
    assert_eq!(window.page(), 2);
    assert!(!window.next_page(&shown));
    assert_eq!(window.page(), 2);

    assert!(window.prev_page(&shown));
    assert_eq!(window.page(), 1);
  }

  #[test]
  fn test_changes_reset_page() {
    let mut window: PageWindow<MemberSort> = PageWindow::new(PageSize::default());
    window.go_to(3, &nav(0, 5));
    window.cycle_sort();
    assert_eq!(window.page(), 0);
    assert_eq!(window.sort(), MemberSort::CommentCount);

    window.go_to(2, &nav(0, 5));
    window.toggle_direction();
    assert_eq!(window.page(), 0);
    assert_eq!(window.direction(), SortDirection::Asc);

    window.go_to(2, &nav(0, 5));
    window.cycle_size();
    assert_eq!(window.page(), 0);
    assert_eq!(window.size().get(), 20);
  }

  #[test]
  fn test_sort_cycle_wraps() {
    assert_eq!(MemberSort::JoinDate.next(), MemberSort::PublicationCount);
    assert_eq!(Unsorted.next(), Unsorted);
  }

  #[test]
  fn test_query_params() {
    let mut window: PageWindow<PublicationSort> = PageWindow::new(PageSize::new(20));
    window.set_sort(PublicationSort::ViewCount);
    window.set_direction(SortDirection::Asc);
    assert_eq!(
      window.query_params(),
      vec![
        ("page", "0".to_string()),
        ("size", "20".to_string()),
        ("sortBy", "viewCount".to_string()),
        ("direction", "asc".to_string()),
      ]
    );

    let unsorted: PageWindow<Unsorted> = PageWindow::new(PageSize::default());
    assert_eq!(unsorted.query_params().len(), 2);
    assert!(unsorted.sort_label().is_none());
  }

  #[test]
  fn test_visible_pages_window() {
    assert_eq!(nav(0, 3).visible_pages(), 0..3);
    assert_eq!(nav(0, 10).visible_pages(), 0..5);
    assert_eq!(nav(5, 10).visible_pages(), 3..8);
    assert_eq!(nav(9, 10).visible_pages(), 5..10);
    assert_eq!(nav(0, 0).visible_pages(), 0..0);
  }
}
