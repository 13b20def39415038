use async_trait::async_trait;
use chrono::Utc;
use google_drive3::api::File;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use super::{object_name_for, FileStore, UploadError};
use crate::workflows::intake::credentials::Credential;
use crate::workflows::intake::domain::{ResumeAsset, UploadReference};
use crate::workflows::intake::wire;

/// Google Drive adapter: creates the file entry, streams the media into it, and
/// returns the `webViewLink` of the result.
#[derive(Debug, Clone)]
pub struct DriveFileStore {
    client: reqwest::Client,
    api_base: String,
    folder_id: Option<String>,
}

impl DriveFileStore {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        folder_id: Option<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            folder_id,
        }
    }

    fn files_url(&self) -> String {
        wire::join_url(&self.api_base, "drive/v3/files")
    }

    fn media_url(&self, file_id: &str) -> String {
        wire::join_url(&self.api_base, &format!("upload/drive/v3/files/{file_id}"))
    }

    async fn create_entry(&self, token: &str, metadata: &File) -> Result<String, UploadError> {
        let response = self
            .client
            .post(self.files_url())
            .query(&[("fields", "id"), ("supportsAllDrives", "true")])
            .bearer_auth(token)
            .json(&metadata_body(metadata)?)
            .send()
            .await
            .map_err(UploadError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::from_response(response).await);
        }

        let created: File = response.json().await.map_err(UploadError::transport)?;
        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| UploadError::Backend {
                status: status.as_u16(),
                detail: "drive did not return a file id".to_string(),
            })
    }

    async fn write_media(
        &self,
        token: &str,
        file_id: &str,
        asset: &ResumeAsset,
    ) -> Result<String, UploadError> {
        let response = self
            .client
            .patch(self.media_url(file_id))
            .query(&[
                ("uploadType", "media"),
                ("fields", "id,webViewLink"),
                ("supportsAllDrives", "true"),
            ])
            .bearer_auth(token)
            .header(CONTENT_TYPE, asset.mime_type.as_str())
            .body(asset.bytes.clone())
            .send()
            .await
            .map_err(UploadError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::from_response(response).await);
        }

        let uploaded: File = response.json().await.map_err(UploadError::transport)?;
        uploaded
            .web_view_link
            .filter(|link| !link.is_empty())
            .ok_or_else(|| UploadError::Backend {
                status: status.as_u16(),
                detail: format!("drive file {file_id} has no webViewLink"),
            })
    }
}

#[async_trait]
impl FileStore for DriveFileStore {
    async fn upload(
        &self,
        asset: &ResumeAsset,
        credential: &Credential,
    ) -> Result<UploadReference, UploadError> {
        let now = Utc::now();
        let token = credential.ensure_valid(now)?;

        let metadata = File {
            name: Some(object_name_for(&asset.filename, now)),
            mime_type: Some(asset.mime_type.clone()),
            parents: self.folder_id.clone().map(|parent| vec![parent]),
            ..File::default()
        };

        let file_id = self.create_entry(token, &metadata).await?;
        tracing::debug!(%file_id, "drive entry created");

        let link = self.write_media(token, &file_id, asset).await?;
        Ok(UploadReference::new(link))
    }
}

// The generated Drive model serializes unset fields as null.
fn metadata_body(metadata: &File) -> Result<Value, UploadError> {
    let mut value = serde_json::to_value(metadata)
        .map_err(|err| UploadError::Transport(format!("unable to encode drive metadata: {err}")))?;
    if let Value::Object(map) = &mut value {
        map.retain(|_, field| !field.is_null());
    }
    Ok(value)
}
