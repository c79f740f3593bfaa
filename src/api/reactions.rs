//! Reaction endpoints for publications and comments.

use serde::Deserialize;

use super::api_types::{ApiReaction, ApiReactionCounts};
use super::client::{ApiClient, Request};
use super::error::ApiError;
use super::types::{Reaction, ReactionCounts, ReactionTarget, ReactionType};

/// `GET .../user` answers either with the reaction itself or wrapped in
/// `{exists, reaction}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiUserReaction {
  Wrapped {
    exists: bool,
    reaction: Option<ApiReaction>,
  },
  Bare(ApiReaction),
}

impl ApiUserReaction {
  fn into_reaction(self) -> Option<Reaction> {
    match self {
      ApiUserReaction::Wrapped { exists, reaction } => {
        reaction.filter(|_| exists).map(ApiReaction::into_reaction)
      }
      ApiUserReaction::Bare(reaction) => Some(reaction.into_reaction()),
    }
  }
}

fn target_path(target: ReactionTarget) -> Vec<String> {
  vec![
    "api".into(),
    "reactions".into(),
    target.segment().into(),
    target.id().to_string(),
  ]
}

impl ApiClient {
  /// React to a publication or comment. Reacting again with the same type
  /// is handled by the backend.
  pub async fn react(
    &self,
    target: ReactionTarget,
    reaction: ReactionType,
  ) -> Result<Option<Reaction>, ApiError> {
    let (action, forbidden) = match target {
      ReactionTarget::Publication(_) => (
        "react to publication",
        "You do not have permission to react to this publication",
      ),
      ReactionTarget::Comment(_) => (
        "react to comment",
        "You do not have permission to react to this comment",
      ),
    };
    let created: Option<ApiReaction> = self
      .fetch_or(
        Request::post(action, target_path(target))
          .param("reactionType", reaction.as_param())
          .forbidden(forbidden),
        None,
      )
      .await?;
    Ok(created.map(ApiReaction::into_reaction))
  }

  pub async fn reaction_counts(&self, target: ReactionTarget) -> Result<ReactionCounts, ApiError> {
    let mut segments = target_path(target);
    segments.push("count".into());
    let counts: ApiReactionCounts = self
      .fetch_or(
        Request::get("get reaction counts", segments),
        ApiReactionCounts::default(),
      )
      .await?;
    Ok(counts.into_counts())
  }

  /// The signed-in user's reaction, `None` on 404 or an empty body.
  pub async fn my_reaction(&self, target: ReactionTarget) -> Result<Option<Reaction>, ApiError> {
    let mut segments = target_path(target);
    segments.push("user".into());
    let found: Option<ApiUserReaction> = self
      .fetch_optional(Request::get("get user reaction", segments))
      .await?;
    Ok(found.and_then(ApiUserReaction::into_reaction))
  }

  pub async fn reactions(&self, target: ReactionTarget) -> Result<Vec<Reaction>, ApiError> {
    let action = match target {
      ReactionTarget::Publication(_) => "get publication reactions",
      ReactionTarget::Comment(_) => "get comment reactions",
    };
    let reactions: Vec<ApiReaction> = self
      .fetch_or(Request::get(action, target_path(target)), Vec::new())
      .await?;
    Ok(reactions.into_iter().map(ApiReaction::into_reaction).collect())
  }

  pub async fn delete_reaction(&self, reaction_id: i64) -> Result<(), ApiError> {
    self
      .execute(
        Request::delete(
          "delete reaction",
          ["api".to_string(), "reactions".into(), reaction_id.to_string()],
        )
        .forbidden("You do not have permission to delete this reaction"),
      )
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server;
  use axum::extract::{Path, Query};
  use axum::http::StatusCode;
  use axum::response::IntoResponse;
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::json;
  use std::collections::HashMap;

  #[tokio::test]
  async fn test_my_reaction_shapes() {
    let router = Router::new()
      .route(
        "/api/reactions/publication/{id}/user",
        get(|Path(id): Path<i64>| async move {
          match id {
            1 => Json(json!({"exists": false})).into_response(),
            2 => Json(json!({"exists": true, "reaction": {"id": 5, "reactionType": "LOVE"}}))
              .into_response(),
            _ => StatusCode::OK.into_response(),
          }
        }),
      )
      .route(
        "/api/reactions/comment/{id}/user",
        get(|Path(id): Path<i64>| async move {
          if id == 7 {
            Json(json!({"id": 9, "reactionType": "WOW"})).into_response()
          } else {
            StatusCode::NOT_FOUND.into_response()
          }
        }),
      );
    let client = test_server::spawn(router).await;

    assert_eq!(
      client
        .my_reaction(ReactionTarget::Publication(1))
        .await
        .unwrap(),
      None
    );
    let love = client
      .my_reaction(ReactionTarget::Publication(2))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(love.reaction_type, ReactionType::Love);
    assert_eq!(
      client
        .my_reaction(ReactionTarget::Publication(3))
        .await
        .unwrap(),
      None
    );

    let wow = client
      .my_reaction(ReactionTarget::Comment(7))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(wow.id, 9);
    assert_eq!(
      client.my_reaction(ReactionTarget::Comment(8)).await.unwrap(),
      None
    );
  }

  #[tokio::test]
  async fn test_react_sends_type_param() {
    let router = Router::new().route(
      "/api/reactions/comment/{id}",
      post(|query: Query<HashMap<String, String>>| async move {
        Json(json!({"id": 11, "reactionType": query.get("reactionType")}))
      }),
    );
    let client = test_server::spawn(router).await;

    let reaction = client
      .react(ReactionTarget::Comment(7), ReactionType::Haha)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(reaction.reaction_type, ReactionType::Haha);
  }

  #[tokio::test]
  async fn test_reaction_counts() {
    let router = Router::new().route(
      "/api/reactions/publication/{id}/count",
      get(|| async { Json(json!({"counts": {"LIKE": 4, "SAD": 1}})) }),
    );
    let client = test_server::spawn(router).await;

    let counts = client
      .reaction_counts(ReactionTarget::Publication(12))
      .await
      .unwrap();
    assert_eq!(counts.total(), 5);
    assert_eq!(counts.get(ReactionType::Like), 4);
  }
}
