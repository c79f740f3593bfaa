//! Comment and reply endpoints.

use super::api_types::{ApiComment, ApiPage};
use super::client::{require, ApiClient, Request};
use super::error::ApiError;
use super::types::{Comment, CommentDraft, Page};
use crate::query::{PageWindow, Threaded, Unsorted};

impl Threaded for Comment {
  fn id(&self) -> i64 {
    self.id
  }

  fn parent_id(&self) -> Option<i64> {
    self.parent_comment_id
  }

  fn explicit_reply_count(&self) -> Option<u64> {
    self.reply_count
  }
}

fn comment_path(id: i64) -> Vec<String> {
  vec!["api".into(), "comments".into(), id.to_string()]
}

fn publication_comments_path(publication_id: i64) -> Vec<String> {
  vec![
    "api".into(),
    "comments".into(),
    "publication".into(),
    publication_id.to_string(),
  ]
}

impl ApiClient {
  pub async fn publication_comments(
    &self,
    publication_id: i64,
    window: &PageWindow<Unsorted>,
  ) -> Result<Page<Comment>, ApiError> {
    let page: ApiPage<ApiComment> = self
      .fetch(
        Request::get("fetch comments", publication_comments_path(publication_id))
          .params(window.query_params()),
      )
      .await?;
    Ok(page.into_page(ApiComment::into_comment))
  }

  pub async fn comment_replies(&self, comment_id: i64) -> Result<Vec<Comment>, ApiError> {
    let replies: Vec<ApiComment> = self
      .fetch_or(
        Request::get(
          "fetch comment replies",
          ["api".to_string(), "comments".into(), "replies".into(), comment_id.to_string()],
        ),
        Vec::new(),
      )
      .await?;
    Ok(replies.into_iter().map(ApiComment::into_comment).collect())
  }

  /// Comments plus replies on a publication
  pub async fn comment_count(&self, publication_id: i64) -> Result<u64, ApiError> {
    let mut segments = publication_comments_path(publication_id);
    segments.push("count".into());
    self
      .fetch_or(Request::get("fetch comment count", segments), 0)
      .await
  }

  pub async fn add_comment(
    &self,
    publication_id: i64,
    draft: &CommentDraft,
  ) -> Result<Comment, ApiError> {
    require(&draft.content, "content")?;
    let comment: ApiComment = self
      .fetch(
        Request::post("add comment", publication_comments_path(publication_id))
          .json(draft)?
          .forbidden("You do not have permission to comment on this publication"),
      )
      .await?;
    Ok(comment.into_comment())
  }

  pub async fn reply_to_comment(
    &self,
    parent_id: i64,
    draft: &CommentDraft,
  ) -> Result<Comment, ApiError> {
    require(&draft.content, "content")?;
    let comment: ApiComment = self
      .fetch(
        Request::post(
          "add reply",
          ["api".to_string(), "comments".into(), "reply".into(), parent_id.to_string()],
        )
        .json(draft)?
        .forbidden("You do not have permission to reply to this comment"),
      )
      .await?;
    Ok(comment.into_comment())
  }

  pub async fn update_comment(&self, id: i64, draft: &CommentDraft) -> Result<Comment, ApiError> {
    require(&draft.content, "content")?;
    let comment: ApiComment = self
      .fetch(
        Request::put("update comment", comment_path(id))
          .json(draft)?
          .forbidden("You do not have permission to update this comment"),
      )
      .await?;
    Ok(comment.into_comment())
  }

  pub async fn delete_comment(&self, id: i64) -> Result<(), ApiError> {
    self
      .execute(
        Request::delete("delete comment", comment_path(id))
          .forbidden("You do not have permission to delete this comment"),
      )
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::test_server;
  use crate::query::{tree, PageSize};
  use axum::http::StatusCode;
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::json;

  #[tokio::test]
  async fn test_top_level_comments_exclude_replies() {
    let router = Router::new().route(
      "/api/comments/publication/{id}",
      get(|| async {
        Json(json!({
          "content": [
            {"id": 3, "content": "root", "publicationId": 12, "replies": [{"id": 7}]},
            {"id": 7, "content": "reply", "publicationId": 12, "parentCommentId": 3},
            {"id": 8, "content": "another", "publicationId": 12}
          ],
          "totalElements": 3, "totalPages": 1, "number": 0, "last": true
        }))
      }),
    );
    let client = test_server::spawn(router).await;

    let page = client
      .publication_comments(12, &PageWindow::new(PageSize::default()))
      .await
      .unwrap();
    let roots: Vec<i64> = tree::top_level(&page.items).iter().map(|c| c.id).collect();
    assert_eq!(roots, vec![3, 8]);
    assert_eq!(tree::reply_count(&page.items[0], None), 1);
  }

  #[tokio::test]
  async fn test_comment_forbidden_message() {
    let router = Router::new().route(
      "/api/comments/publication/{id}",
      post(|| async { (StatusCode::FORBIDDEN, Json(json!({"message": "Access Denied"}))) }),
    );
    let client = test_server::spawn(router).await;

    let err = client
      .add_comment(
        12,
        &CommentDraft {
          content: "Nice".into(),
        },
      )
      .await
      .unwrap_err();
    assert_eq!(
      err,
      ApiError::Forbidden {
        message: "You do not have permission to comment on this publication".into()
      }
    );
  }

  #[tokio::test]
  async fn test_comment_count() {
    let router = Router::new().route(
      "/api/comments/publication/{id}/count",
      get(|| async { Json(json!(5)) }),
    );
    let client = test_server::spawn(router).await;
    assert_eq!(client.comment_count(12).await.unwrap(), 5);
  }
}
