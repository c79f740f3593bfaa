//! Group, membership and member endpoints.

use futures::future::join_all;
use tracing::debug;

use super::api_types::{
  parse_enum, ApiGroup, ApiGroupMember, ApiMemberStats, ApiMembershipRequest, ApiPage, ApiPublication, ApiUser,
};
use super::client::{require, ApiClient, FormPart, Request};
use super::error::ApiError;
use super::types::{
  Gated, Group, GroupDraft, GroupMember, GroupSort, MemberSettings, MemberSort, MemberStats,
  MembershipDecision, MembershipRequest, Page, PhotoKind, Publication, PublicationDraft,
  RequestStatus, Upload, UserProfile,
};
use crate::query::{PageWindow, Unsorted};

impl ApiClient {
  pub async fn list_groups(&self, window: &PageWindow<GroupSort>) -> Result<Page<Group>, ApiError> {
    let page: ApiPage<ApiGroup> = self
      .fetch(Request::get("fetch groups", ["api", "groups"]).params(window.query_params()))
      .await?;
    Ok(page.into_page(ApiGroup::into_group))
  }

  pub async fn get_group(&self, id: i64) -> Result<Group, ApiError> {
    let group: ApiGroup = self
      .fetch(Request::get("fetch group", group_path(id)))
      .await?;
    Ok(group.into_group())
  }

  pub async fn groups_by_member(
    &self,
    username: &str,
    window: &PageWindow<Unsorted>,
  ) -> Result<Page<Group>, ApiError> {
    let username = require(username, "username")?;
    let page: ApiPage<ApiGroup> = self
      .fetch(
        Request::get("fetch user groups", ["api", "groups", "member", username])
          .params(window.query_params()),
      )
      .await?;
    Ok(page.into_page(ApiGroup::into_group))
  }

  pub async fn create_group(&self, draft: &GroupDraft) -> Result<Group, ApiError> {
    require(&draft.name, "name")?;
    let group: ApiGroup = self
      .fetch(Request::post("create group", ["api", "groups"]).json(draft)?)
      .await?;
    Ok(group.into_group())
  }

  pub async fn update_group(&self, id: i64, draft: &GroupDraft) -> Result<Group, ApiError> {
    require(&draft.name, "name")?;
    let group: ApiGroup = self
      .fetch(Request::put("update group", group_path(id)).json(draft)?)
      .await?;
    Ok(group.into_group())
  }

  pub async fn delete_group(&self, id: i64) -> Result<(), ApiError> {
    self
      .execute(
        Request::delete("delete group", group_path(id))
          .forbidden("You do not have permission to delete this group"),
      )
      .await
  }

  /// Ask to join a group. The backend may answer with an empty body.
  pub async fn request_membership(
    &self,
    group_id: i64,
  ) -> Result<Option<MembershipRequest>, ApiError> {
    let mut segments = group_path(group_id);
    segments.push("request".into());
    let request: Option<ApiMembershipRequest> = self
      .fetch_or(Request::post("send membership request", segments), None)
      .await?;
    Ok(request.map(ApiMembershipRequest::into_request))
  }

  pub async fn handle_membership_request(
    &self,
    request_id: i64,
    status: RequestStatus,
  ) -> Result<MembershipDecision, ApiError> {
    let response: Option<ApiMembershipRequest> = self
      .fetch_or(
        Request::put(
          "handle membership request",
          ["api".to_string(), "groups".into(), "request".into(), request_id.to_string()],
        )
        .param("status", status.as_param()),
        None,
      )
      .await?;
    Ok(match response {
      Some(r) => MembershipDecision {
        request_id: r.id,
        status: parse_enum(r.status.as_deref()).unwrap_or(status),
        group_id: r.group_id,
      },
      None => MembershipDecision {
        request_id,
        status,
        group_id: None,
      },
    })
  }

  pub async fn remove_member(&self, group_id: i64, username: &str) -> Result<(), ApiError> {
    let username = require(username, "username")?;
    let mut segments = group_path(group_id);
    segments.extend(["member".to_string(), username.to_string()]);
    self
      .execute(
        Request::delete("remove member", segments)
          .forbidden("You do not have permission to remove members from this group"),
      )
      .await
  }

  pub async fn create_group_publication(
    &self,
    group_id: i64,
    draft: &PublicationDraft,
  ) -> Result<Publication, ApiError> {
    require(&draft.content, "content")?;
    let mut segments = group_path(group_id);
    segments.push("publication".into());
    let publication: ApiPublication = self
      .fetch(
        Request::post("create publication", segments)
          .json(draft)?
          .forbidden("You do not have permission to post in this group"),
      )
      .await?;
    Ok(publication.into_publication())
  }

  /// Publications of a group; non-members of closed groups get `Restricted`.
  pub async fn group_publications(
    &self,
    group_id: i64,
    window: &PageWindow<Unsorted>,
  ) -> Result<Gated<Page<Publication>>, ApiError> {
    let mut segments = group_path(group_id);
    segments.push("publications".into());
    let request = Request::get("fetch group publications", segments).params(window.query_params());
    match self.fetch::<ApiPage<ApiPublication>>(request).await {
      Ok(page) => Ok(Gated::Allowed(
        page.into_page(ApiPublication::into_publication),
      )),
      Err(ApiError::Forbidden { .. }) => {
        debug!(group_id, "Group publications are restricted");
        Ok(Gated::Restricted)
      }
      Err(e) => Err(e),
    }
  }

  /// Pending requests for a group, each with the requester's profile photo.
  ///
  /// A failed profile lookup leaves that request's photo empty.
  pub async fn membership_requests(
    &self,
    group_id: i64,
  ) -> Result<Vec<MembershipRequest>, ApiError> {
    let mut segments = group_path(group_id);
    segments.push("requests".into());
    let requests: Vec<ApiMembershipRequest> = self
      .fetch_or(Request::get("fetch membership requests", segments), Vec::new())
      .await?;

    let enriched = requests.into_iter().map(|r| async move {
      let mut request = r.into_request();
      request.photo_profile = match self.user_profile(&request.username).await {
        Ok(profile) => profile.photo_profile,
        Err(e) => {
          debug!(username = %request.username, error = %e, "Could not load requester profile");
          None
        }
      };
      request
    });
    Ok(join_all(enriched).await)
  }

  /// The signed-in user's request for a group, if any.
  ///
  /// 403, 404 and empty responses all mean "no request".
  pub async fn my_membership_request(
    &self,
    group_id: i64,
  ) -> Result<Option<MembershipRequest>, ApiError> {
    let mut segments = group_path(group_id);
    segments.push("my-request".into());
    match self
      .fetch_optional::<ApiMembershipRequest>(Request::get("fetch membership request", segments))
      .await
    {
      Ok(request) => Ok(request.map(ApiMembershipRequest::into_request)),
      Err(ApiError::Forbidden { .. }) => Ok(None),
      Err(e) => Err(e),
    }
  }

  pub async fn upload_group_photo(
    &self,
    group_id: i64,
    kind: PhotoKind,
    upload: Upload,
  ) -> Result<Option<Group>, ApiError> {
    if upload.bytes.is_empty() {
      return Err(ApiError::MissingParameter("file"));
    }
    let (action, segment) = match kind {
      PhotoKind::Profile => ("upload profile photo", "profile-photo"),
      PhotoKind::Cover => ("upload cover photo", "cover-photo"),
    };
    let mut segments = group_path(group_id);
    segments.push(segment.into());
    let group: Option<ApiGroup> = self
      .fetch_or(
        Request::post(action, segments).form(vec![FormPart::File {
          name: "file".into(),
          upload,
        }]),
        None,
      )
      .await?;
    Ok(group.map(ApiGroup::into_group))
  }

  pub async fn top_members(&self, group_id: i64) -> Result<Vec<GroupMember>, ApiError> {
    let mut segments = group_path(group_id);
    segments.extend(["members".to_string(), "top5".to_string()]);
    let members: Vec<ApiGroupMember> = self
      .fetch_or(Request::get("fetch top members", segments), Vec::new())
      .await?;
    Ok(members.into_iter().map(ApiGroupMember::into_member).collect())
  }

  pub async fn group_members(
    &self,
    group_id: i64,
    window: &PageWindow<MemberSort>,
  ) -> Result<Page<GroupMember>, ApiError> {
    let mut segments = group_path(group_id);
    segments.push("members".into());
    let page: ApiPage<ApiGroupMember> = self
      .fetch(Request::get("fetch group members", segments).params(window.query_params()))
      .await?;
    Ok(page.into_page(ApiGroupMember::into_member))
  }

  pub async fn member_stats(&self, group_id: i64, username: &str) -> Result<MemberStats, ApiError> {
    let username = require(username, "username")?;
    let mut segments = group_path(group_id);
    segments.extend([
      "member".to_string(),
      username.to_string(),
      "stats".to_string(),
    ]);
    let stats: ApiMemberStats = self
      .fetch(Request::get("fetch member stats", segments))
      .await?;
    Ok(stats.into_stats())
  }

  pub async fn update_member_settings(
    &self,
    group_id: i64,
    username: &str,
    settings: MemberSettings,
  ) -> Result<(), ApiError> {
    let username = require(username, "username")?;
    let mut segments = group_path(group_id);
    segments.extend([
      "member".to_string(),
      username.to_string(),
      "settings".to_string(),
    ]);
    self
      .execute(
        Request::put("update member settings", segments)
          .json(&settings)?
          .forbidden("You do not have permission to change member settings"),
      )
      .await
  }

  pub async fn user_profile(&self, username: &str) -> Result<UserProfile, ApiError> {
    let username = require(username, "username")?;
    let user: ApiUser = self
      .fetch(Request::get("fetch user", ["u", username]))
      .await?;
    Ok(user.into_profile())
  }
}

fn group_path(id: i64) -> Vec<String> {
  vec!["api".into(), "groups".into(), id.to_string()]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server;
  use crate::query::PageSize;
  use axum::extract::{Path, Query};
  use axum::http::StatusCode;
  use axum::response::IntoResponse;
  use axum::routing::{get, put};
  use axum::{Json, Router};
  use serde_json::json;
  use std::collections::HashMap;

  #[tokio::test]
  async fn test_my_request_404_is_none() {
    let router = Router::new().route(
      "/api/groups/{id}/my-request",
      get(|Path(id): Path<i64>| async move {
        match id {
          1 => StatusCode::NOT_FOUND.into_response(),
          2 => StatusCode::NO_CONTENT.into_response(),
          3 => StatusCode::FORBIDDEN.into_response(),
          _ => Json(json!({"id": 9, "username": "amira", "groupId": id, "status": "PENDING"}))
            .into_response(),
        }
      }),
    );
    let client = test_server::spawn(router).await;

    assert_eq!(client.my_membership_request(1).await.unwrap(), None);
    assert_eq!(client.my_membership_request(2).await.unwrap(), None);
    assert_eq!(client.my_membership_request(3).await.unwrap(), None);

    let pending = client.my_membership_request(4).await.unwrap().unwrap();
    assert_eq!(pending.id, 9);
    assert_eq!(pending.status, RequestStatus::Pending);
  }

  #[tokio::test]
  async fn test_restricted_group_publications() {
    let router = Router::new().route(
      "/api/groups/{id}/publications",
      get(|Path(id): Path<i64>| async move {
        if id == 1 {
          (StatusCode::FORBIDDEN, Json(json!({"restricted": true}))).into_response()
        } else {
          Json(json!({
            "content": [{"id": 12, "content": "Hello", "user": {"username": "amira"}}],
            "totalElements": 1, "totalPages": 1, "number": 0, "last": true
          }))
          .into_response()
        }
      }),
    );
    let client = test_server::spawn(router).await;
    let window = PageWindow::new(PageSize::default());

    assert_eq!(
      client.group_publications(1, &window).await.unwrap(),
      Gated::Restricted
    );
    let open = client.group_publications(2, &window).await.unwrap();
    assert_eq!(open.allowed().map(|p| p.items.len()), Some(1));
  }

  #[tokio::test]
  async fn test_groups_page_sends_window() {
    let router = Router::new().route(
      "/api/groups",
      get(|query: Query<HashMap<String, String>>| async move {
        assert_eq!(query.get("sortBy").map(String::as_str), Some("createDate"));
        assert_eq!(query.get("direction").map(String::as_str), Some("desc"));
        Json(json!({
          "content": [
            {"id": 1, "name": "A"}, {"id": 2, "name": "B"}, {"id": 3, "name": "C"}
          ],
          "totalElements": 23, "totalPages": 5, "number": 0
        }))
      }),
    );
    let client = test_server::spawn(router).await;

    let page = client
      .list_groups(&PageWindow::new(PageSize::default()))
      .await
      .unwrap();
    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total_pages, 5);
    assert!(!page.last);
  }

  #[tokio::test]
  async fn test_membership_requests_enriched_with_photos() {
    let router = Router::new()
      .route(
        "/api/groups/{id}/requests",
        get(|| async {
          Json(json!([
            {"id": 1, "username": "bilal", "status": "PENDING"},
            {"id": 2, "username": "ghost", "status": "PENDING"}
          ]))
        }),
      )
      .route(
        "/u/{username}",
        get(|Path(username): Path<String>| async move {
          if username == "bilal" {
            Json(json!({"username": "bilal", "photoProfile": "bilal.png"})).into_response()
          } else {
            StatusCode::NOT_FOUND.into_response()
          }
        }),
      );
    let client = test_server::spawn(router).await;

    let requests = client.membership_requests(4).await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].photo_profile.as_deref(), Some("bilal.png"));
    assert_eq!(requests[1].photo_profile, None);
  }

  #[tokio::test]
  async fn test_handle_request_empty_body_uses_input() {
    let router = Router::new().route(
      "/api/groups/request/{id}",
      put(|| async { StatusCode::OK }),
    );
    let client = test_server::spawn(router).await;

    let decision = client
      .handle_membership_request(5, RequestStatus::Approved)
      .await
      .unwrap();
    assert_eq!(
      decision,
      MembershipDecision {
        request_id: 5,
        status: RequestStatus::Approved,
        group_id: None
      }
    );
  }

  #[tokio::test]
  async fn test_missing_username_fails_before_network() {
    let client = test_server::anonymous();
    let err = client.member_stats(4, "").await.unwrap_err();
    assert_eq!(err, ApiError::MissingParameter("username"));
  }
}
