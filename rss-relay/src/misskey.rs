//! HTTP client for the Misskey drive and notes endpoints.
//!
//! Every call is a JSON `POST` carrying the token as `i`; the token is also
//! sent as a bearer header.

use crate::media::MatchKey;
use crate::rss_utils;
use crate::traits::{MediaStore, NoteApi};
use crate::types::{PostPayload, RelayError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

const UPLOAD_FROM_URL: &str = "drive/files/upload-from-url";
const FIND_BY_HASH: &str = "drive/files/find-by-hash";
const FIND_BY_NAME: &str = "drive/files/find";
const LIST_FILES: &str = "drive/files";
const CREATE_NOTE: &str = "notes/create";

/// How many recent drive files are scanned when matching by comment.
const DEFAULT_LIST_LIMIT: u32 = 20;

#[derive(Serialize)]
struct UploadFromUrl<'a> {
    i: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

#[derive(Serialize)]
struct FindByHash<'a> {
    i: &'a str,
    md5: &'a str,
}

#[derive(Serialize)]
struct FindByName<'a> {
    i: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct ListFiles<'a> {
    i: &'a str,
    limit: u32,
}

#[derive(Serialize)]
struct CreateNote<'a> {
    i: &'a str,
    #[serde(flatten)]
    payload: &'a PostPayload,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    comment: Option<String>,
}

pub struct MisskeyClient {
    client: Client,
    base: Url,
    token: String,
    list_limit: u32,
}

impl MisskeyClient {
    pub fn new(host: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base = rss_utils::url::api_base(host)?;

        Ok(Self {
            client,
            base,
            token: token.into(),
            list_limit: DEFAULT_LIST_LIMIT,
        })
    }

    pub fn with_list_limit(mut self, limit: u32) -> Self {
        self.list_limit = limit;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    async fn post<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Response> {
        let url = self.base.join(&format!("api/{}", endpoint))?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    async fn drive_files<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Vec<DriveFile>> {
        let response = self.post(endpoint, body).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(RelayError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<Vec<DriveFile>>().await?)
    }
}

#[async_trait]
impl MediaStore for MisskeyClient {
    async fn upload_from_url(&self, url: &str, comment: Option<&str>) -> Result<()> {
        let body = UploadFromUrl {
            i: &self.token,
            url,
            comment,
        };
        let response = self.post(UPLOAD_FROM_URL, &body).await?;

        // The drive accepts the job and ingests it in the background
        if response.status() != StatusCode::NO_CONTENT {
            return Err(RelayError::Upload {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn find(&self, key: &MatchKey) -> Result<Option<String>> {
        let files = match key {
            MatchKey::Md5(md5) => {
                self.drive_files(FIND_BY_HASH, &FindByHash { i: &self.token, md5 })
                    .await?
            }
            MatchKey::Name(name) => {
                self.drive_files(FIND_BY_NAME, &FindByName { i: &self.token, name })
                    .await?
            }
            MatchKey::Comment(tag) => {
                let files = self
                    .drive_files(
                        LIST_FILES,
                        &ListFiles {
                            i: &self.token,
                            limit: self.list_limit,
                        },
                    )
                    .await?;
                files
                    .into_iter()
                    .filter(|file| file.comment.as_deref() == Some(tag.as_str()))
                    .collect()
            }
        };

        Ok(files.into_iter().next().map(|file| file.id))
    }
}

#[async_trait]
impl NoteApi for MisskeyClient {
    async fn create_note(&self, payload: &PostPayload) -> Result<()> {
        let body = CreateNote {
            i: &self.token,
            payload,
        };
        let response = self.post(CREATE_NOTE, &body).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Publish {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
