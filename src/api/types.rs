//! Domain types used by views.
//!
//! These are the reshaped forms of the backend DTOs in `api_types`: nested
//! `user`/`group`/`targetUser` objects are flattened and optional fields get
//! display-friendly defaults.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::query::SortField;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub total_elements: u64,
  pub total_pages: u32,
  /// Zero-based index of this page
  pub number: u32,
  /// True when no page follows this one
  pub last: bool,
}

impl<T> Page<T> {
  pub fn empty(number: u32) -> Self {
    Self {
      items: Vec::new(),
      total_elements: 0,
      total_pages: 0,
      number,
      last: true,
    }
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      items: self.items.into_iter().map(f).collect(),
      total_elements: self.total_elements,
      total_pages: self.total_pages,
      number: self.number,
      last: self.last,
    }
  }
}

/// Result of a content-gated listing: either the data or a "restricted" marker
#[derive(Debug, Clone, PartialEq)]
pub enum Gated<T> {
  Allowed(T),
  Restricted,
}

impl<T> Gated<T> {
  pub fn allowed(&self) -> Option<&T> {
    match self {
      Gated::Allowed(data) => Some(data),
      Gated::Restricted => None,
    }
  }

  pub fn is_restricted(&self) -> bool {
    matches!(self, Gated::Restricted)
  }
}

/// Minimal reference to a user embedded in other records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserRef {
  pub id: Option<i64>,
  pub username: String,
}

/// Public profile returned by `/u/{username}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
  pub id: Option<i64>,
  pub username: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub photo_profile: Option<String>,
}

// ============================================================================
// Enumerations shared with the backend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupPrivacy {
  #[default]
  Public,
  Private,
  Secret,
}

impl GroupPrivacy {
  pub fn label(&self) -> &'static str {
    match self {
      GroupPrivacy::Public => "public",
      GroupPrivacy::Private => "private",
      GroupPrivacy::Secret => "secret",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublicationPrivacy {
  #[default]
  Public,
  Friends,
  Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionType {
  Like,
  Love,
  Haha,
  Wow,
  Sad,
  Angry,
}

impl ReactionType {
  pub const ALL: [ReactionType; 6] = [
    ReactionType::Like,
    ReactionType::Love,
    ReactionType::Haha,
    ReactionType::Wow,
    ReactionType::Sad,
    ReactionType::Angry,
  ];

  /// Value of the `reactionType` query parameter
  pub fn as_param(&self) -> &'static str {
    match self {
      ReactionType::Like => "LIKE",
      ReactionType::Love => "LOVE",
      ReactionType::Haha => "HAHA",
      ReactionType::Wow => "WOW",
      ReactionType::Sad => "SAD",
      ReactionType::Angry => "ANGRY",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      ReactionType::Like => "Like",
      ReactionType::Love => "Love",
      ReactionType::Haha => "Haha",
      ReactionType::Wow => "Wow",
      ReactionType::Sad => "Sad",
      ReactionType::Angry => "Angry",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
  Image,
  Video,
  Document,
  Audio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Medal {
  Gold,
  Silver,
  Bronze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
  Pending,
  Approved,
  Rejected,
}

impl RequestStatus {
  pub fn as_param(&self) -> &'static str {
    match self {
      RequestStatus::Pending => "PENDING",
      RequestStatus::Approved => "APPROVED",
      RequestStatus::Rejected => "REJECTED",
    }
  }
}

// ============================================================================
// Sort fields per listing
// ============================================================================

/// Sort fields accepted by `/api/groups`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupSort {
  #[default]
  CreateDate,
}

impl SortField for GroupSort {
  fn param(&self) -> Option<&'static str> {
    Some("createDate")
  }

  fn label(&self) -> &'static str {
    "created"
  }

  fn all() -> &'static [Self] {
    &[GroupSort::CreateDate]
  }
}

/// Sort fields accepted by `/api/publications`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicationSort {
  #[default]
  CreateDate,
  ViewCount,
}

impl SortField for PublicationSort {
  fn param(&self) -> Option<&'static str> {
    Some(match self {
      PublicationSort::CreateDate => "createDate",
      PublicationSort::ViewCount => "viewCount",
    })
  }

  fn label(&self) -> &'static str {
    match self {
      PublicationSort::CreateDate => "date",
      PublicationSort::ViewCount => "views",
    }
  }

  fn all() -> &'static [Self] {
    &[PublicationSort::CreateDate, PublicationSort::ViewCount]
  }
}

/// Sort fields accepted by `/api/groups/{id}/members`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemberSort {
  #[default]
  PublicationCount,
  CommentCount,
  ReactionCount,
  JoinDate,
}

impl SortField for MemberSort {
  fn param(&self) -> Option<&'static str> {
    Some(match self {
      MemberSort::PublicationCount => "publicationCount",
      MemberSort::CommentCount => "commentCount",
      MemberSort::ReactionCount => "reactionCount",
      MemberSort::JoinDate => "joinDate",
    })
  }

  fn label(&self) -> &'static str {
    match self {
      MemberSort::PublicationCount => "posts",
      MemberSort::CommentCount => "comments",
      MemberSort::ReactionCount => "reactions",
      MemberSort::JoinDate => "joined",
    }
  }

  fn all() -> &'static [Self] {
    &[
      MemberSort::PublicationCount,
      MemberSort::CommentCount,
      MemberSort::ReactionCount,
      MemberSort::JoinDate,
    ]
  }
}

// ============================================================================
// Groups
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub privacy: GroupPrivacy,
  pub admin_id: Option<i64>,
  pub admin_username: Option<String>,
  pub profile_photo_url: Option<String>,
  pub cover_photo_url: Option<String>,
  pub members: Vec<UserRef>,
}

impl Group {
  pub fn is_admin(&self, username: Option<&str>) -> bool {
    match (username, self.admin_username.as_deref()) {
      (Some(user), Some(admin)) => user == admin,
      _ => false,
    }
  }

  pub fn is_member(&self, username: Option<&str>) -> bool {
    let Some(user) = username else {
      return false;
    };
    self.is_admin(username) || self.members.iter().any(|m| m.username == user)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMember {
  pub user_id: Option<i64>,
  pub username: String,
  pub display_name: String,
  pub join_date: Option<NaiveDateTime>,
  pub can_post: bool,
  pub can_comment: bool,
  pub medal: Option<Medal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberStats {
  pub username: String,
  pub publication_count: u64,
  pub comment_count: u64,
  pub reaction_count: u64,
  pub join_date: Option<NaiveDateTime>,
  pub last_publication_date: Option<NaiveDateTime>,
  pub last_comment_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MembershipRequest {
  pub id: i64,
  pub user_id: Option<i64>,
  pub username: String,
  pub group_id: Option<i64>,
  pub status: RequestStatus,
  pub request_date: Option<NaiveDateTime>,
  /// Requester's profile photo, filled in for admin listings
  pub photo_profile: Option<String>,
}

/// Outcome of approving or rejecting a membership request
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipDecision {
  pub request_id: i64,
  pub status: RequestStatus,
  pub group_id: Option<i64>,
}

/// Body for creating or updating a group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
  pub name: String,
  pub description: String,
  pub privacy_level: GroupPrivacy,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub profile_photo_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cover_photo_url: Option<String>,
}

/// Per-member posting rights inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSettings {
  pub can_post: bool,
  pub can_comment: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
  Profile,
  Cover,
}

// ============================================================================
// Publications
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
  pub id: i64,
  pub content: String,
  pub create_date: Option<NaiveDateTime>,
  pub privacy: Option<String>,
  pub location: Option<String>,
  pub feeling: Option<String>,
  pub is_edited: bool,
  pub view_count: u32,
  pub author: UserRef,
  pub target_username: Option<String>,
  pub group_id: Option<i64>,
  pub group_name: Option<String>,
  pub reaction_counts: BTreeMap<ReactionType, u64>,
  pub media: Vec<Media>,
}

impl Publication {
  pub fn total_reactions(&self) -> u64 {
    self.reaction_counts.values().sum()
  }

  /// Privacy as sent back on update; unknown values read as public
  pub fn privacy_level(&self) -> PublicationPrivacy {
    match self.privacy.as_deref().map(str::to_uppercase).as_deref() {
      Some("FRIENDS") => PublicationPrivacy::Friends,
      Some("CUSTOM") => PublicationPrivacy::Custom,
      _ => PublicationPrivacy::Public,
    }
  }
}

/// Body for creating or updating a publication
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationDraft {
  pub content: String,
  pub privacy_level: PublicationPrivacy,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub feeling: Option<String>,
}

// ============================================================================
// Comments
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
  pub id: i64,
  pub content: String,
  pub author: UserRef,
  pub publication_id: Option<i64>,
  pub parent_comment_id: Option<i64>,
  pub create_date: Option<NaiveDateTime>,
  pub is_edited: bool,
  pub reply_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommentDraft {
  pub content: String,
}

// ============================================================================
// Reactions
// ============================================================================

/// What a reaction is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionTarget {
  Publication(i64),
  Comment(i64),
}

impl ReactionTarget {
  pub fn id(&self) -> i64 {
    match self {
      ReactionTarget::Publication(id) | ReactionTarget::Comment(id) => *id,
    }
  }

  /// Path segment used by the reactions endpoints
  pub fn segment(&self) -> &'static str {
    match self {
      ReactionTarget::Publication(_) => "publication",
      ReactionTarget::Comment(_) => "comment",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
  pub id: i64,
  pub reaction_type: ReactionType,
  pub author: UserRef,
  pub create_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionCounts {
  pub counts: BTreeMap<ReactionType, u64>,
}

impl ReactionCounts {
  pub fn total(&self) -> u64 {
    self.counts.values().sum()
  }

  pub fn get(&self, reaction: ReactionType) -> u64 {
    self.counts.get(&reaction).copied().unwrap_or(0)
  }
}

// ============================================================================
// Media
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Media {
  pub id: i64,
  pub media_type: Option<MediaType>,
  pub file_name: String,
  pub file_url: Option<String>,
  pub caption: Option<String>,
  pub display_order: Option<i32>,
  pub thumbnail_url: Option<String>,
  pub upload_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub caption: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_order: Option<i32>,
}

/// A file to be sent as a multipart part
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
  pub file_name: String,
  pub mime: String,
  pub bytes: Bytes,
}

impl Upload {
  pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
    let file_name = file_name.into();
    let mime = guess_mime(&file_name).to_string();
    Self {
      file_name,
      mime,
      bytes: bytes.into(),
    }
  }

  /// Read a file from disk into an upload.
  pub async fn read(path: &std::path::Path) -> Result<Self, crate::api::ApiError> {
    let bytes = tokio::fs::read(path)
      .await
      .map_err(|e| crate::api::ApiError::File(format!("{}: {}", path.display(), e)))?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());
    Ok(Self::new(file_name, bytes))
  }
}

fn guess_mime(file_name: &str) -> &'static str {
  let ext = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();
  match ext.as_str() {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "mp4" => "video/mp4",
    "webm" => "video/webm",
    "mp3" => "audio/mpeg",
    "wav" => "audio/wav",
    "pdf" => "application/pdf",
    _ => "application/octet-stream",
  }
}
