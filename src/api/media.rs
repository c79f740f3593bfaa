//! Media attachment endpoints.

use super::api_types::ApiMedia;
use super::client::{ApiClient, FormPart, Request};
use super::error::ApiError;
use super::types::{Media, MediaUpdate, Upload};

fn media_path(id: i64) -> Vec<String> {
  vec!["api".into(), "media".into(), id.to_string()]
}

impl ApiClient {
  pub async fn upload_media(
    &self,
    publication_id: i64,
    upload: Upload,
    caption: Option<String>,
    display_order: Option<i32>,
  ) -> Result<Media, ApiError> {
    if upload.bytes.is_empty() {
      return Err(ApiError::MissingParameter("file"));
    }
    let mut parts = vec![FormPart::File {
      name: "file".into(),
      upload,
    }];
    if let Some(caption) = caption.filter(|c| !c.is_empty()) {
      parts.push(FormPart::Text {
        name: "caption".into(),
        value: caption,
      });
    }
    if let Some(order) = display_order {
      parts.push(FormPart::Text {
        name: "displayOrder".into(),
        value: order.to_string(),
      });
    }

    let media: ApiMedia = self
      .fetch(
        Request::post(
          "upload media",
          [
            "api".to_string(),
            "media".into(),
            "upload".into(),
            "publication".into(),
            publication_id.to_string(),
          ],
        )
        .form(parts),
      )
      .await?;
    Ok(media.into_media())
  }

  /// Upload several files at once. `captions` pairs with `uploads` by index;
  /// empty captions are left out of the form.
  pub async fn upload_media_batch(
    &self,
    publication_id: i64,
    uploads: Vec<Upload>,
    captions: Vec<String>,
  ) -> Result<Vec<Media>, ApiError> {
    if uploads.is_empty() {
      return Err(ApiError::MissingParameter("files"));
    }
    let mut captions = captions.into_iter();
    let mut parts = Vec::with_capacity(uploads.len() * 2);
    for upload in uploads {
      parts.push(FormPart::File {
        name: "files".into(),
        upload,
      });
      if let Some(caption) = captions.next().filter(|c| !c.is_empty()) {
        parts.push(FormPart::Text {
          name: "captions".into(),
          value: caption,
        });
      }
    }

    let media: Vec<ApiMedia> = self
      .fetch_or(
        Request::post(
          "upload multiple media",
          [
            "api".to_string(),
            "media".into(),
            "upload".into(),
            "multiple".into(),
            "publication".into(),
            publication_id.to_string(),
          ],
        )
        .form(parts),
        Vec::new(),
      )
      .await?;
    Ok(media.into_iter().map(ApiMedia::into_media).collect())
  }

  pub async fn publication_media(&self, publication_id: i64) -> Result<Vec<Media>, ApiError> {
    let mut media: Vec<Media> = self
      .fetch_or::<Vec<ApiMedia>>(
        Request::get(
          "get publication media",
          [
            "api".to_string(),
            "media".into(),
            "publication".into(),
            publication_id.to_string(),
          ],
        ),
        Vec::new(),
      )
      .await?
      .into_iter()
      .map(ApiMedia::into_media)
      .collect();
    media.sort_by_key(|m| (m.display_order.unwrap_or(i32::MAX), m.id));
    Ok(media)
  }

  pub async fn update_media(&self, id: i64, update: &MediaUpdate) -> Result<Media, ApiError> {
    let media: ApiMedia = self
      .fetch(Request::put("update media", media_path(id)).json(update)?)
      .await?;
    Ok(media.into_media())
  }

  pub async fn delete_media(&self, id: i64) -> Result<(), ApiError> {
    self
      .execute(Request::delete("delete media", media_path(id)))
      .await
  }
}
