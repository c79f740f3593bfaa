//! Which cached reads each kind of write makes stale.

use crate::api::keys::{self, resource};
use crate::api::types::ReactionTarget;
use crate::query::QueryKey;

/// A successful write against the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
  GroupCreated,
  GroupUpdated { group_id: i64 },
  GroupDeleted { group_id: i64 },
  GroupPhotoUploaded { group_id: i64 },
  MembershipRequested { group_id: i64 },
  MembershipDecided { group_id: i64 },
  MemberRemoved { group_id: i64, username: String },
  MemberSettingsUpdated { group_id: i64, username: String },
  GroupPublicationCreated { group_id: i64 },
  PublicationCreated,
  PublicationUpdated { publication_id: i64 },
  PublicationDeleted { publication_id: i64 },
  CommentAdded { publication_id: i64 },
  ReplyAdded { publication_id: i64, parent_id: i64 },
  CommentUpdated { publication_id: i64, parent_id: Option<i64> },
  CommentDeleted { publication_id: i64, parent_id: Option<i64> },
  Reacted { target: ReactionTarget },
  ReactionDeleted { target: ReactionTarget },
  MediaUploaded { publication_id: i64 },
  MediaBatchUploaded { publication_id: i64 },
  MediaUpdated { publication_id: i64 },
  MediaDeleted { publication_id: i64 },
}

fn all(resource: &str) -> QueryKey {
  QueryKey::new(resource)
}

impl Change {
  /// Key prefixes to invalidate once this change has succeeded
  pub fn invalidates(&self) -> Vec<QueryKey> {
    match self {
      Change::GroupCreated => vec![all(resource::GROUPS), all(resource::GROUPS_BY_MEMBER)],
      Change::GroupUpdated { group_id }
      | Change::GroupDeleted { group_id }
      | Change::GroupPhotoUploaded { group_id } => vec![
        all(resource::GROUPS),
        keys::group(*group_id),
        all(resource::GROUPS_BY_MEMBER),
      ],
      Change::MembershipRequested { group_id } => vec![
        keys::group(*group_id),
        all(resource::GROUPS_BY_MEMBER),
        keys::user_membership_request(*group_id),
      ],
      Change::MembershipDecided { group_id } => vec![
        all(resource::GROUPS),
        all(resource::GROUPS_BY_MEMBER),
        all(resource::MEMBERSHIP_REQUESTS),
        all(resource::USER_MEMBERSHIP_REQUEST),
        keys::group(*group_id),
        all(resource::ALL_GROUP_MEMBERS).with(*group_id),
        keys::top5_group_members(*group_id),
        all(resource::MEMBER_STATS).with(*group_id),
      ],
      Change::MemberRemoved { group_id, username } => vec![
        keys::group(*group_id),
        all(resource::GROUPS_BY_MEMBER),
        keys::top5_group_members(*group_id),
        all(resource::ALL_GROUP_MEMBERS).with(*group_id),
        keys::member_stats(*group_id, username),
      ],
      Change::MemberSettingsUpdated { group_id, username } => vec![
        all(resource::ALL_GROUP_MEMBERS).with(*group_id),
        keys::group(*group_id),
        keys::top5_group_members(*group_id),
        keys::member_stats(*group_id, username),
      ],
      Change::GroupPublicationCreated { group_id } => vec![
        all(resource::GROUP_PUBLICATIONS).with(*group_id),
        keys::group(*group_id),
        all(resource::PUBLICATIONS),
      ],
      Change::PublicationCreated => vec![
        all(resource::PUBLICATIONS),
        all(resource::USER_PUBLICATIONS),
      ],
      Change::PublicationUpdated { publication_id } => vec![
        all(resource::PUBLICATIONS),
        keys::publication(*publication_id),
        all(resource::USER_PUBLICATIONS),
      ],
      Change::PublicationDeleted { publication_id } => vec![
        all(resource::PUBLICATIONS),
        keys::publication(*publication_id),
        all(resource::USER_PUBLICATIONS),
        all(resource::PUBLICATION_COMMENTS).with(*publication_id),
      ],
      Change::CommentAdded { publication_id } => vec![
        all(resource::PUBLICATION_COMMENTS).with(*publication_id),
        keys::publication_comment_count(*publication_id),
        keys::publication(*publication_id),
      ],
      Change::ReplyAdded {
        publication_id,
        parent_id,
      } => vec![
        keys::comment_replies(*parent_id),
        all(resource::PUBLICATION_COMMENTS).with(*publication_id),
        keys::publication_comment_count(*publication_id),
      ],
      Change::CommentUpdated {
        publication_id,
        parent_id,
      } => {
        let mut prefixes = vec![all(resource::PUBLICATION_COMMENTS).with(*publication_id)];
        prefixes.extend(parent_id.map(keys::comment_replies));
        prefixes
      }
      Change::CommentDeleted {
        publication_id,
        parent_id,
      } => {
        let mut prefixes = vec![
          all(resource::PUBLICATION_COMMENTS).with(*publication_id),
          keys::publication_comment_count(*publication_id),
        ];
        prefixes.extend(parent_id.map(keys::comment_replies));
        prefixes
      }
      Change::Reacted { target } | Change::ReactionDeleted { target } => {
        let mut prefixes = vec![
          keys::reaction_counts(*target),
          keys::user_reaction(*target),
          keys::reactions(*target),
        ];
        if let ReactionTarget::Publication(id) = target {
          prefixes.push(keys::publication(*id));
        }
        prefixes
      }
      Change::MediaUploaded { publication_id } | Change::MediaDeleted { publication_id } => vec![
        keys::publication_media(*publication_id),
        keys::publication(*publication_id),
      ],
      Change::MediaBatchUploaded { publication_id } => vec![
        keys::publication_media(*publication_id),
        keys::publication(*publication_id),
        all(resource::PUBLICATIONS),
        all(resource::USER_PUBLICATIONS),
      ],
      Change::MediaUpdated { publication_id } => vec![keys::publication_media(*publication_id)],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{PageSize, PageWindow, QueryCache};
  use std::time::Duration;

  #[test]
  fn test_deleting_reply_invalidates_thread_and_page() {
    let keys = Change::CommentDeleted {
      publication_id: 12,
      parent_id: Some(3),
    }
    .invalidates();
    assert!(keys.contains(&QueryKey::new("commentReplies").with(3)));
    assert!(keys.contains(&QueryKey::new("publicationComments").with(12)));
    assert!(keys.contains(&QueryKey::new("publicationCommentCount").with(12)));
  }

  #[test]
  fn test_deleting_top_level_comment_skips_replies() {
    let keys = Change::CommentDeleted {
      publication_id: 12,
      parent_id: None,
    }
    .invalidates();
    assert!(keys.iter().all(|k| k.resource() != Some("commentReplies")));
  }

  #[test]
  fn test_comment_delete_reaches_mounted_pages() {
    let cache = QueryCache::new(Duration::from_secs(60));
    let window = PageWindow::new(PageSize::default());
    let page_key = keys::publication_comments(12, &window);
    let replies_key = keys::comment_replies(3);
    let other_thread = keys::comment_replies(4);
    let _a = cache.subscribe(&page_key);
    let _b = cache.subscribe(&replies_key);
    let _c = cache.subscribe(&other_thread);
    for key in [&page_key, &replies_key, &other_thread] {
      cache.set_data(key, ());
    }

    let change = Change::CommentDeleted {
      publication_id: 12,
      parent_id: Some(3),
    };
    for key in change.invalidates() {
      cache.invalidate(&key);
    }

    assert!(cache.snapshot(&page_key).unwrap().invalidated);
    assert!(cache.snapshot(&replies_key).unwrap().invalidated);
    assert!(!cache.snapshot(&other_thread).unwrap().invalidated);
  }

  #[test]
  fn test_membership_decision_refreshes_member_views() {
    let keys = Change::MembershipDecided { group_id: 4 }.invalidates();
    for expected in [
      QueryKey::new("allGroupMembers").with(4),
      QueryKey::new("top5GroupMembers").with(4),
      QueryKey::new("memberStats").with(4),
      QueryKey::new("membershipRequests"),
      QueryKey::new("group").with(4),
    ] {
      assert!(keys.contains(&expected), "missing {expected}");
    }
  }

  #[test]
  fn test_comment_reactions_leave_publication_alone() {
    let keys = Change::Reacted {
      target: ReactionTarget::Comment(7),
    }
    .invalidates();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().all(|k| k.resource() != Some("publication")));

    let keys = Change::Reacted {
      target: ReactionTarget::Publication(12),
    }
    .invalidates();
    assert!(keys.contains(&QueryKey::new("publication").with(12)));
  }

  #[test]
  fn test_publication_delete_drops_comment_pages() {
    let keys = Change::PublicationDeleted { publication_id: 12 }.invalidates();
    assert!(keys.contains(&QueryKey::new("publicationComments").with(12)));
    assert!(keys.contains(&QueryKey::new("userPublications")));
  }
}
