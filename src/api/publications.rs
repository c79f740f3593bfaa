//! Publication endpoints.

use super::api_types::{ApiPage, ApiPublication};
use super::client::{require, ApiClient, Request};
use super::error::ApiError;
use super::types::{Page, Publication, PublicationDraft, PublicationSort};
use crate::query::{PageWindow, Unsorted};

fn publication_path(id: i64) -> Vec<String> {
  vec!["api".into(), "publications".into(), id.to_string()]
}

impl ApiClient {
  pub async fn list_publications(
    &self,
    window: &PageWindow<PublicationSort>,
  ) -> Result<Page<Publication>, ApiError> {
    let page: ApiPage<ApiPublication> = self
      .fetch(
        Request::get("fetch publications", ["api", "publications"]).params(window.query_params()),
      )
      .await?;
    Ok(page.into_page(ApiPublication::into_publication))
  }

  pub async fn get_publication(&self, id: i64) -> Result<Publication, ApiError> {
    let publication: ApiPublication = self
      .fetch(Request::get("fetch publication", publication_path(id)))
      .await?;
    Ok(publication.into_publication())
  }

  pub async fn user_publications(
    &self,
    username: &str,
    window: &PageWindow<Unsorted>,
  ) -> Result<Page<Publication>, ApiError> {
    let username = require(username, "username")?;
    let page: ApiPage<ApiPublication> = self
      .fetch(
        Request::get(
          "fetch user publications",
          ["api", "publications", "user", username],
        )
        .params(window.query_params()),
      )
      .await?;
    Ok(page.into_page(ApiPublication::into_publication))
  }

  pub async fn create_publication(&self, draft: &PublicationDraft) -> Result<Publication, ApiError> {
    require(&draft.content, "content")?;
    let publication: ApiPublication = self
      .fetch(Request::post("create publication", ["api", "publications"]).json(draft)?)
      .await?;
    Ok(publication.into_publication())
  }

  pub async fn update_publication(
    &self,
    id: i64,
    draft: &PublicationDraft,
  ) -> Result<Publication, ApiError> {
    require(&draft.content, "content")?;
    let publication: ApiPublication = self
      .fetch(
        Request::put("update publication", publication_path(id))
          .json(draft)?
          .forbidden("You do not have permission to edit this publication"),
      )
      .await?;
    Ok(publication.into_publication())
  }

  /// Delete a publication. The backend answers with no body.
  pub async fn delete_publication(&self, id: i64) -> Result<(), ApiError> {
    self
      .execute(
        Request::delete("delete publication", publication_path(id))
          .forbidden("You do not have permission to delete this publication"),
      )
      .await
  }
}
