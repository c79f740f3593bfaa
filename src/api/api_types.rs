//! Serde-deserializable types matching Greenspace API responses.
//!
//! These mirror the backend's camelCase DTOs and are reshaped into the flat
//! records in `types` by the `into_*` conversions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::types::{
  Comment, Group, GroupMember, Media, MemberStats, MembershipRequest, Page, Publication, Reaction,
  ReactionCounts, ReactionType, RequestStatus, UserProfile, UserRef,
};

/// Parse an enum from its wire string, ignoring values this client does not know
pub(crate) fn parse_enum<T: DeserializeOwned>(value: Option<&str>) -> Option<T> {
  value.and_then(|v| serde_json::from_value(serde_json::Value::String(v.to_uppercase())).ok())
}

/// Parse a backend `LocalDateTime` (`2024-05-01T10:20:30.123`) or RFC 3339 timestamp
pub fn parse_date(value: Option<&str>) -> Option<NaiveDateTime> {
  let value = value?.trim();
  NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
    .ok()
    .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.naive_local()))
}

fn reaction_map(counts: HashMap<String, u64>) -> BTreeMap<ReactionType, u64> {
  counts
    .into_iter()
    .filter_map(|(k, v)| parse_enum::<ReactionType>(Some(&k)).map(|r| (r, v)))
    .collect()
}

// ============================================================================
// Paging
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
  #[serde(default = "Vec::new")]
  pub content: Vec<T>,
  #[serde(default)]
  pub total_elements: u64,
  #[serde(default)]
  pub total_pages: u32,
  #[serde(default)]
  pub number: u32,
  pub last: Option<bool>,
}

impl<T> ApiPage<T> {
  pub fn into_page<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    let last = self
      .last
      .unwrap_or(self.number.saturating_add(1) >= self.total_pages);
    Page {
      items: self.content.into_iter().map(f).collect(),
      total_elements: self.total_elements,
      total_pages: self.total_pages,
      number: self.number,
      last,
    }
  }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
  pub id: Option<i64>,
  #[serde(default)]
  pub username: String,
  #[serde(alias = "firstname")]
  pub first_name: Option<String>,
  #[serde(alias = "lastname")]
  pub last_name: Option<String>,
  pub photo_profile: Option<String>,
}

impl ApiUser {
  pub fn into_ref(self) -> UserRef {
    UserRef {
      id: self.id,
      username: self.username,
    }
  }

  pub fn into_profile(self) -> UserProfile {
    UserProfile {
      id: self.id,
      username: self.username,
      first_name: self.first_name,
      last_name: self.last_name,
      photo_profile: self.photo_profile,
    }
  }
}

fn display_name(first: Option<&str>, last: Option<&str>, username: &str) -> String {
  let full = [first, last]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ");
  if full.is_empty() {
    username.to_string()
  } else {
    full
  }
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroup {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  pub description: Option<String>,
  pub privacy_level: Option<String>,
  pub admin_id: Option<i64>,
  pub admin_username: Option<String>,
  pub profile_photo_url: Option<String>,
  pub cover_photo_url: Option<String>,
  #[serde(default)]
  pub members: Vec<ApiUser>,
}

impl ApiGroup {
  pub fn into_group(self) -> Group {
    Group {
      id: self.id,
      name: self.name,
      description: self.description.unwrap_or_default(),
      privacy: parse_enum(self.privacy_level.as_deref()).unwrap_or_default(),
      admin_id: self.admin_id,
      admin_username: self.admin_username,
      profile_photo_url: self.profile_photo_url,
      cover_photo_url: self.cover_photo_url,
      members: self.members.into_iter().map(ApiUser::into_ref).collect(),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroupMember {
  pub user_id: Option<i64>,
  #[serde(default)]
  pub username: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub join_date: Option<String>,
  #[serde(default)]
  pub can_post: bool,
  #[serde(default)]
  pub can_comment: bool,
  pub medal: Option<String>,
}

impl ApiGroupMember {
  pub fn into_member(self) -> GroupMember {
    GroupMember {
      display_name: display_name(
        self.first_name.as_deref(),
        self.last_name.as_deref(),
        &self.username,
      ),
      user_id: self.user_id,
      username: self.username,
      join_date: parse_date(self.join_date.as_deref()),
      can_post: self.can_post,
      can_comment: self.can_comment,
      medal: parse_enum(self.medal.as_deref()),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMemberStats {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub publication_count: u64,
  #[serde(default)]
  pub comment_count: u64,
  #[serde(default)]
  pub reaction_count: u64,
  pub join_date: Option<String>,
  pub last_comment_date: Option<String>,
  pub last_publication_date: Option<String>,
}

impl ApiMemberStats {
  pub fn into_stats(self) -> MemberStats {
    MemberStats {
      username: self.username,
      publication_count: self.publication_count,
      comment_count: self.comment_count,
      reaction_count: self.reaction_count,
      join_date: parse_date(self.join_date.as_deref()),
      last_publication_date: parse_date(self.last_publication_date.as_deref()),
      last_comment_date: parse_date(self.last_comment_date.as_deref()),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMembershipRequest {
  pub id: i64,
  pub user_id: Option<i64>,
  #[serde(default)]
  pub username: String,
  pub group_id: Option<i64>,
  pub status: Option<String>,
  pub request_date: Option<String>,
}

impl ApiMembershipRequest {
  pub fn into_request(self) -> MembershipRequest {
    MembershipRequest {
      id: self.id,
      user_id: self.user_id,
      username: self.username,
      group_id: self.group_id,
      status: parse_enum(self.status.as_deref()).unwrap_or(RequestStatus::Pending),
      request_date: parse_date(self.request_date.as_deref()),
      photo_profile: None,
    }
  }
}

// ============================================================================
// Publications
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPublication {
  pub id: i64,
  #[serde(default)]
  pub content: String,
  pub create_date: Option<String>,
  pub privacy_level: Option<String>,
  pub location: Option<String>,
  pub feeling: Option<String>,
  #[serde(alias = "edited")]
  pub is_edited: Option<bool>,
  pub view_count: Option<u32>,
  pub user: Option<ApiUser>,
  pub target_user: Option<ApiUser>,
  pub group: Option<ApiGroupRef>,
  #[serde(default)]
  pub reaction_counts: HashMap<String, u64>,
  #[serde(default)]
  pub media_items: Vec<ApiMedia>,
}

/// Just enough of an embedded group to label a publication
#[derive(Debug, Deserialize)]
pub struct ApiGroupRef {
  pub id: Option<i64>,
  pub name: Option<String>,
}

impl ApiPublication {
  pub fn into_publication(self) -> Publication {
    let (group_id, group_name) = self
      .group
      .map(|g| (g.id, g.name))
      .unwrap_or((None, None));
    Publication {
      id: self.id,
      content: self.content,
      create_date: parse_date(self.create_date.as_deref()),
      privacy: self.privacy_level,
      location: self.location.filter(|l| !l.is_empty()),
      feeling: self.feeling.filter(|f| !f.is_empty()),
      is_edited: self.is_edited.unwrap_or(false),
      view_count: self.view_count.unwrap_or(0),
      author: self.user.map(ApiUser::into_ref).unwrap_or_default(),
      target_username: self.target_user.map(|u| u.username),
      group_id,
      group_name,
      reaction_counts: reaction_map(self.reaction_counts),
      media: self.media_items.into_iter().map(ApiMedia::into_media).collect(),
    }
  }
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiComment {
  pub id: i64,
  #[serde(default)]
  pub content: String,
  pub user: Option<ApiUser>,
  pub publication_id: Option<i64>,
  pub parent_comment_id: Option<i64>,
  pub create_date: Option<String>,
  #[serde(alias = "edited")]
  pub is_edited: Option<bool>,
  pub reply_count: Option<u64>,
  #[serde(default)]
  pub replies: Vec<serde_json::Value>,
}

impl ApiComment {
  pub fn into_comment(self) -> Comment {
    // Embedded replies only tell us how many exist
    let reply_count = self
      .reply_count
      .or_else(|| (!self.replies.is_empty()).then_some(self.replies.len() as u64));
    Comment {
      id: self.id,
      content: self.content,
      author: self.user.map(ApiUser::into_ref).unwrap_or_default(),
      publication_id: self.publication_id,
      parent_comment_id: self.parent_comment_id,
      create_date: parse_date(self.create_date.as_deref()),
      is_edited: self.is_edited.unwrap_or(false),
      reply_count,
    }
  }
}

// ============================================================================
// Reactions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReaction {
  pub id: i64,
  pub reaction_type: ReactionType,
  pub create_date: Option<String>,
  pub user: Option<ApiUser>,
}

impl ApiReaction {
  pub fn into_reaction(self) -> Reaction {
    Reaction {
      id: self.id,
      reaction_type: self.reaction_type,
      author: self.user.map(ApiUser::into_ref).unwrap_or_default(),
      create_date: parse_date(self.create_date.as_deref()),
    }
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiReactionCounts {
  #[serde(default)]
  pub counts: HashMap<String, u64>,
}

impl ApiReactionCounts {
  pub fn into_counts(self) -> ReactionCounts {
    ReactionCounts {
      counts: reaction_map(self.counts),
    }
  }
}

// ============================================================================
// Media
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiMedia {
  pub id: i64,
  pub media_type: Option<String>,
  #[serde(default)]
  pub file_name: String,
  pub file_download_uri: Option<String>,
  pub file_url: Option<String>,
  pub caption: Option<String>,
  pub display_order: Option<i32>,
  pub thumbnail_url: Option<String>,
  pub upload_date: Option<String>,
}

impl ApiMedia {
  pub fn into_media(self) -> Media {
    Media {
      id: self.id,
      media_type: parse_enum(self.media_type.as_deref()),
      file_name: self.file_name,
      file_url: self.file_download_uri.or(self.file_url),
      caption: self.caption.filter(|c| !c.is_empty()),
      display_order: self.display_order,
      thumbnail_url: self.thumbnail_url,
      upload_date: parse_date(self.upload_date.as_deref()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{GroupPrivacy, Medal, MediaType};
  use chrono::NaiveDate;

  #[test]
  fn test_page_derives_last_when_missing() {
    let page: ApiPage<i64> = serde_json::from_str(
      r#"{"content":[1,2,3],"totalElements":23,"totalPages":5,"number":1}"#,
    )
    .unwrap();
    let page = page.into_page(|n| n * 10);
    assert_eq!(page.items, vec![10, 20, 30]);
    assert!(!page.last);

    let final_page: ApiPage<i64> =
      serde_json::from_str(r#"{"content":[],"totalPages":5,"number":4}"#).unwrap();
    assert!(final_page.into_page(|n| n).last);
  }

  #[test]
  fn test_group_conversion() {
    let group: ApiGroup = serde_json::from_str(
      r#"{
        "id": 4, "name": "Gardeners", "privacyLevel": "PRIVATE",
        "adminId": 1, "adminUsername": "amira",
        "members": [{"id": 2, "username": "bilal", "firstname": "Bilal"}]
      }"#,
    )
    .unwrap();
    let group = group.into_group();
    assert_eq!(group.privacy, GroupPrivacy::Private);
    assert_eq!(group.description, "");
    assert_eq!(group.members[0].username, "bilal");
  }

  #[test]
  fn test_publication_flattens_nested_records() {
    let publication: ApiPublication = serde_json::from_str(
      r#"{
        "id": 12, "content": "Hello", "createDate": "2024-05-01T10:20:30.5",
        "edited": true, "viewCount": 7,
        "user": {"id": 1, "username": "amira"},
        "targetUser": {"username": "bilal"},
        "group": {"id": 4, "name": "Gardeners"},
        "reactionCounts": {"LIKE": 2, "WOW": 1, "SHRUG": 9},
        "mediaItems": [{"id": 3, "mediaType": "image", "fileName": "a.png",
                        "fileUrl": "/images/a.png", "fileDownloadUri": "http://cdn/a.png"}]
      }"#,
    )
    .unwrap();
    let p = publication.into_publication();
    assert!(p.is_edited);
    assert_eq!(p.author.username, "amira");
    assert_eq!(p.target_username.as_deref(), Some("bilal"));
    assert_eq!(p.group_name.as_deref(), Some("Gardeners"));
    assert_eq!(p.total_reactions(), 3);
    assert_eq!(p.media[0].media_type, Some(MediaType::Image));
    assert_eq!(p.media[0].file_url.as_deref(), Some("http://cdn/a.png"));
    assert_eq!(
      p.create_date.map(|d| d.date()),
      NaiveDate::from_ymd_opt(2024, 5, 1)
    );
  }

  #[test]
  fn test_comment_reply_count_from_embedded_replies() {
    let comment: ApiComment = serde_json::from_str(
      r#"{"id": 3, "content": "root", "publicationId": 12,
          "replies": [{"id": 7}, {"id": 8}]}"#,
    )
    .unwrap();
    assert_eq!(comment.into_comment().reply_count, Some(2));

    let bare: ApiComment = serde_json::from_str(r#"{"id": 9, "parentCommentId": 3}"#).unwrap();
    let bare = bare.into_comment();
    assert_eq!(bare.reply_count, None);
    assert_eq!(bare.parent_comment_id, Some(3));
  }

  #[test]
  fn test_member_display_name_and_medal() {
    let member: ApiGroupMember = serde_json::from_str(
      r#"{"userId": 2, "username": "bilal", "firstName": "Bilal", "lastName": "Haddad",
          "canPost": true, "medal": "GOLD"}"#,
    )
    .unwrap();
    let member = member.into_member();
    assert_eq!(member.display_name, "Bilal Haddad");
    assert_eq!(member.medal, Some(Medal::Gold));
    assert!(!member.can_comment);
  }

  #[test]
  fn test_parse_date_formats() {
    assert!(parse_date(Some("2024-05-01T10:20:30")).is_some());
    assert!(parse_date(Some("2024-05-01T10:20:30Z")).is_some());
    assert!(parse_date(Some("yesterday")).is_none());
    assert!(parse_date(None).is_none());
  }
}
