//! Expand/collapse state for threaded records such as comments and replies.

use std::collections::HashSet;

/// A record that may be a reply to another record of the same kind
pub trait Threaded {
  fn id(&self) -> i64;
  fn parent_id(&self) -> Option<i64>;
  /// Reply counter reported by the backend, if any
  fn explicit_reply_count(&self) -> Option<u64>;
}

/// Records that are not replies
pub fn top_level<T: Threaded>(items: &[T]) -> Vec<&T> {
  items.iter().filter(|i| i.parent_id().is_none()).collect()
}

/// Explicit counter when positive, else the number of loaded replies.
pub fn reply_count<T: Threaded>(item: &T, loaded: Option<&[T]>) -> u64 {
  match item.explicit_reply_count() {
    Some(n) if n > 0 => n,
    _ => loaded.map(|r| r.len() as u64).unwrap_or(0),
  }
}

/// What a toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
  /// Expanded for the first time; replies must be loaded
  FirstOpen,
  /// Expanded again; replies are already loaded
  Reopened,
  Collapsed,
}

/// A record placed in the flattened thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row<'a, T> {
  pub item: &'a T,
  pub depth: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadState {
  expanded: HashSet<i64>,
  /// Ids whose replies were requested at least once
  opened: HashSet<i64>,
}

impl ThreadState {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn toggle(&mut self, id: i64) -> Expansion {
    if self.expanded.remove(&id) {
      return Expansion::Collapsed;
    }
    self.expanded.insert(id);
    if self.opened.insert(id) {
      Expansion::FirstOpen
    } else {
      Expansion::Reopened
    }
  }

  pub fn is_expanded(&self, id: i64) -> bool {
    self.expanded.contains(&id)
  }

  pub fn collapse_all(&mut self) {
    self.expanded.clear();
  }

  /// Flatten `roots` and the replies of expanded records, depth first.
  pub fn visible_rows<'a, T, F>(&self, roots: &[&'a T], replies: F) -> Vec<Row<'a, T>>
  where
    T: Threaded,
    F: Fn(i64) -> Option<&'a [T]>,
  {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    for root in roots {
      self.push_rows(*root, 0, &replies, &mut rows, &mut seen);
    }
    rows
  }

  fn push_rows<'a, T, F>(
    &self,
    item: &'a T,
    depth: usize,
    replies: &F,
    rows: &mut Vec<Row<'a, T>>,
    seen: &mut HashSet<i64>,
  ) where
    T: Threaded,
    F: Fn(i64) -> Option<&'a [T]>,
  {
    // Guard against cycles in malformed data
    if !seen.insert(item.id()) {
      return;
    }
    rows.push(Row { item, depth });
    if !self.is_expanded(item.id()) {
      return;
    }
    if let Some(children) = replies(item.id()) {
      for child in children {
        self.push_rows(child, depth + 1, replies, rows, seen);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[derive(Debug, PartialEq)]
  struct Note {
    id: i64,
    parent: Option<i64>,
    replies: Option<u64>,
  }

  impl Threaded for Note {
    fn id(&self) -> i64 {
      self.id
    }
    fn parent_id(&self) -> Option<i64> {
      self.parent
    }
    fn explicit_reply_count(&self) -> Option<u64> {
      self.replies
    }
  }

  fn note(id: i64, parent: Option<i64>) -> Note {
    Note {
      id,
      parent,
      replies: None,
    }
  }

  #[test]
  fn test_top_level_excludes_replies() {
    let notes = vec![note(1, None), note(2, Some(1)), note(3, None)];
    let ids: Vec<i64> = top_level(&notes).iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 3]);
  }

  #[test]
  fn test_reply_count_prefers_counter() {
    let loaded = vec![note(2, Some(1))];
    let counted = Note {
      id: 1,
      parent: None,
      replies: Some(4),
    };
    assert_eq!(reply_count(&counted, Some(loaded.as_slice())), 4);

    let zero = Note {
      id: 1,
      parent: None,
      replies: Some(0),
    };
    assert_eq!(reply_count(&zero, Some(loaded.as_slice())), 1);
    assert_eq!(reply_count(&note(1, None), None), 0);
  }

  #[test]
  fn test_toggle_loads_once() {
    let mut state = ThreadState::new();
    assert_eq!(state.toggle(3), Expansion::FirstOpen);
    assert_eq!(state.toggle(3), Expansion::Collapsed);
    assert_eq!(state.toggle(3), Expansion::Reopened);
  }

  #[test]
  fn test_visible_rows_follow_expansion() {
    let roots = vec![note(1, None), note(5, None)];
    let mut replies: HashMap<i64, Vec<Note>> = HashMap::new();
    replies.insert(1, vec![note(2, Some(1)), note(3, Some(1))]);
    replies.insert(3, vec![note(4, Some(3))]);

    let root_refs: Vec<&Note> = roots.iter().collect();
    let lookup = |id: i64| replies.get(&id).map(Vec::as_slice);

    let mut state = ThreadState::new();
    let collapsed: Vec<i64> = state
      .visible_rows(&root_refs, lookup)
      .iter()
      .map(|r| r.item.id)
      .collect();
    assert_eq!(collapsed, vec![1, 5]);

    state.toggle(1);
    state.toggle(3);
    let rows = state.visible_rows(&root_refs, lookup);
    let layout: Vec<(i64, usize)> = rows.iter().map(|r| (r.item.id, r.depth)).collect();
    assert_eq!(layout, vec![(1, 0), (2, 1), (3, 1), (4, 2), (5, 0)]);

    // Collapsing the parent hides its loaded replies
    state.toggle(1);
    assert_eq!(state.visible_rows(&root_refs, lookup).len(), 2);
  }
}
