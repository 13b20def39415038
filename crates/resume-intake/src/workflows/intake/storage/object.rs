use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;

use super::{object_name_for, FileStore, UploadError};
use crate::workflows::intake::credentials::Credential;
use crate::workflows::intake::domain::{ResumeAsset, UploadReference};
use crate::workflows::intake::wire;

/// Plain object store: one authenticated PUT of the raw bytes to a pre-authorized prefix.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    upload_base: String,
    public_base: String,
}

impl HttpObjectStore {
    pub fn new(
        client: reqwest::Client,
        upload_base: impl Into<String>,
        public_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            upload_base: upload_base.into(),
            public_base: public_base.into(),
        }
    }
}

#[async_trait]
impl FileStore for HttpObjectStore {
    async fn upload(
        &self,
        asset: &ResumeAsset,
        credential: &Credential,
    ) -> Result<UploadReference, UploadError> {
        let now = Utc::now();
        let token = credential.ensure_valid(now)?;
        let object_name = object_name_for(&asset.filename, now);

        let response = self
            .client
            .put(wire::join_url(&self.upload_base, &object_name))
            .bearer_auth(token)
            .header(CONTENT_TYPE, asset.mime_type.as_str())
            .body(asset.bytes.clone())
            .send()
            .await
            .map_err(UploadError::transport)?;

        if !response.status().is_success() {
            return Err(UploadError::from_response(response).await);
        }

        Ok(UploadReference::new(wire::join_url(
            &self.public_base,
            &object_name,
        )))
    }
}
