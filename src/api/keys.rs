//! Query keys for every cached read.
//!
//! The first part of each key is its resource name. Mutations invalidate by
//! prefix, so a key's parts are ordered from coarse to fine.

use crate::api::types::{GroupSort, MemberSort, PublicationSort, ReactionTarget};
use crate::query::{PageWindow, QueryKey, Unsorted};

pub mod resource {
  pub const GROUPS: &str = "groups";
  pub const GROUP: &str = "group";
  pub const GROUPS_BY_MEMBER: &str = "groupsByMember";
  pub const GROUP_PUBLICATIONS: &str = "groupPublications";
  pub const MEMBERSHIP_REQUESTS: &str = "membershipRequests";
  pub const USER_MEMBERSHIP_REQUEST: &str = "userMembershipRequest";
  pub const TOP5_GROUP_MEMBERS: &str = "top5GroupMembers";
  pub const ALL_GROUP_MEMBERS: &str = "allGroupMembers";
  pub const MEMBER_STATS: &str = "memberStats";
  pub const PUBLICATIONS: &str = "publications";
  pub const PUBLICATION: &str = "publication";
  pub const USER_PUBLICATIONS: &str = "userPublications";
  pub const PUBLICATION_COMMENTS: &str = "publicationComments";
  pub const COMMENT_REPLIES: &str = "commentReplies";
  pub const PUBLICATION_COMMENT_COUNT: &str = "publicationCommentCount";
  pub const PUBLICATION_REACTION_COUNTS: &str = "publicationReactionCounts";
  pub const COMMENT_REACTION_COUNTS: &str = "commentReactionCounts";
  pub const USER_PUBLICATION_REACTION: &str = "userPublicationReaction";
  pub const USER_COMMENT_REACTION: &str = "userCommentReaction";
  pub const PUBLICATION_REACTIONS: &str = "publicationReactions";
  pub const COMMENT_REACTIONS: &str = "commentReactions";
  pub const PUBLICATION_MEDIA: &str = "publicationMedia";
  pub const IMAGE: &str = "image";
}

use resource::*;

pub fn groups(window: &PageWindow<GroupSort>) -> QueryKey {
  window.extend_key(QueryKey::new(GROUPS))
}

pub fn group(id: i64) -> QueryKey {
  QueryKey::new(GROUP).with(id)
}

pub fn groups_by_member(username: &str, window: &PageWindow<Unsorted>) -> QueryKey {
  window.extend_key(QueryKey::new(GROUPS_BY_MEMBER).with(username))
}

pub fn group_publications(group_id: i64, window: &PageWindow<Unsorted>) -> QueryKey {
  window.extend_key(QueryKey::new(GROUP_PUBLICATIONS).with(group_id))
}

pub fn membership_requests(group_id: i64) -> QueryKey {
  QueryKey::new(MEMBERSHIP_REQUESTS).with(group_id)
}

pub fn user_membership_request(group_id: i64) -> QueryKey {
  QueryKey::new(USER_MEMBERSHIP_REQUEST).with(group_id)
}

pub fn top5_group_members(group_id: i64) -> QueryKey {
  QueryKey::new(TOP5_GROUP_MEMBERS).with(group_id)
}

pub fn all_group_members(group_id: i64, window: &PageWindow<MemberSort>) -> QueryKey {
  window.extend_key(QueryKey::new(ALL_GROUP_MEMBERS).with(group_id))
}

pub fn member_stats(group_id: i64, username: &str) -> QueryKey {
  QueryKey::new(MEMBER_STATS).with(group_id).with(username)
}

pub fn publications(window: &PageWindow<PublicationSort>) -> QueryKey {
  window.extend_key(QueryKey::new(PUBLICATIONS))
}

pub fn publication(id: i64) -> QueryKey {
  QueryKey::new(PUBLICATION).with(id)
}

pub fn user_publications(username: &str, window: &PageWindow<Unsorted>) -> QueryKey {
  window.extend_key(QueryKey::new(USER_PUBLICATIONS).with(username))
}

pub fn publication_comments(publication_id: i64, window: &PageWindow<Unsorted>) -> QueryKey {
  window.extend_key(QueryKey::new(PUBLICATION_COMMENTS).with(publication_id))
}

pub fn comment_replies(comment_id: i64) -> QueryKey {
  QueryKey::new(COMMENT_REPLIES).with(comment_id)
}

pub fn publication_comment_count(publication_id: i64) -> QueryKey {
  QueryKey::new(PUBLICATION_COMMENT_COUNT).with(publication_id)
}

pub fn reaction_counts(target: ReactionTarget) -> QueryKey {
  let resource = match target {
    ReactionTarget::Publication(_) => PUBLICATION_REACTION_COUNTS,
    ReactionTarget::Comment(_) => COMMENT_REACTION_COUNTS,
  };
  QueryKey::new(resource).with(target.id())
}

pub fn user_reaction(target: ReactionTarget) -> QueryKey {
  let resource = match target {
    ReactionTarget::Publication(_) => USER_PUBLICATION_REACTION,
    ReactionTarget::Comment(_) => USER_COMMENT_REACTION,
  };
  QueryKey::new(resource).with(target.id())
}

pub fn reactions(target: ReactionTarget) -> QueryKey {
  let resource = match target {
    ReactionTarget::Publication(_) => PUBLICATION_REACTIONS,
    ReactionTarget::Comment(_) => COMMENT_REACTIONS,
  };
  QueryKey::new(resource).with(target.id())
}

pub fn publication_media(publication_id: i64) -> QueryKey {
  QueryKey::new(PUBLICATION_MEDIA).with(publication_id)
}

pub fn image(path: &str) -> QueryKey {
  QueryKey::new(IMAGE).with(path)
}
