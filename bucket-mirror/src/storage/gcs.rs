//! # GCS JSON API client
//!
//! Implements [`Bucket`] against the Cloud Storage JSON API, which the Firebase
//! storage emulator also serves (point the endpoint at `http://127.0.0.1:9199`).
//!
//! - `exists`: `GET /storage/v1/b/{bucket}/o/{key}`; 200 means present, 404 absent.
//! - `upload`: `POST /upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}`,
//!   one request carrying the whole file.
//!
//! Authentication is an optional bearer token; obtaining it is the caller's business.

use async_trait::async_trait;
use bucket_mirror_core::contract::{Bucket, StorageError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::path::Path;

pub struct GcsClient {
    http: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl GcsClient {
    pub fn new(endpoint: String, bearer_token: Option<String>) -> Result<Self, StorageError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bearer_token,
        })
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        )
    }

    fn upload_url(&self, bucket: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.endpoint,
            urlencoding::encode(bucket)
        )
    }

    fn authorise(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {token}")),
            None => req,
        }
    }
}

async fn unexpected(action: &str, key: &str, resp: Response) -> StorageError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("{action} '{key}' returned {status}: {body}").into()
}

#[async_trait]
impl Bucket for GcsClient {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let resp = self
            .authorise(self.http.get(self.object_url(bucket, key)))
            .send()
            .await?;

        match resp.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected("metadata lookup for", key, resp).await),
        }
    }

    async fn upload(&self, bucket: &str, local_path: &Path, key: &str) -> Result<(), StorageError> {
        let content = tokio::fs::read(local_path).await?;
        let content_type = mime_guess::from_path(local_path).first_or_octet_stream();
        tracing::debug!(
            key,
            size = content.len(),
            content_type = %content_type,
            "Sending upload request"
        );

        let resp = self
            .authorise(self.http.post(self.upload_url(bucket)))
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, content_type.to_string())
            .body(content)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(unexpected("upload of", key, resp).await)
        }
    }
}
