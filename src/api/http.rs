//! Translation service HTTP wrappers.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header::CONTENT_DISPOSITION, multipart};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Download, RemoteClient, RemoteError, Translated, Uploaded};
use crate::{
    config::ServerCfg,
    jobs::{SourceFile, TranslateOptions},
};

/// Response of `GET /api/languages`.
#[derive(Debug, Deserialize)]
struct LanguagesResp {
    languages: Vec<String>,
}

/// Response of `POST /api/upload` (extra fields ignored).
#[derive(Debug, Deserialize)]
struct UploadResp {
    job_id: String,
    text_preview: String,
}

/// Response of `POST /api/translate/{job_id}`.
#[derive(Debug, Deserialize)]
struct TranslateResp {
    text_preview: String,
}

/// Body of `POST /api/translate/{job_id}`.
#[derive(Debug, Serialize)]
struct TranslateReq<'a> {
    target_language: &'a str,
    preserve_formatting: bool,
    include_original: bool,
}

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ErrorResp {
    detail: serde_json::Value,
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts, connection resets and undecodable bodies all land here.
        RemoteError::Network(e.to_string())
    }
}

/// Remote client talking to the service over HTTP.
pub struct HttpRemoteClient {
    http: Client,
    base_url: String,
}

impl HttpRemoteClient {
    /// Build a client for the configured server; `timeout_secs = 0` disables the timeout.
    pub fn new(cfg: &ServerCfg) -> Result<Self> {
        let mut builder = Client::builder();
        if cfg.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.timeout_secs));
        }
        Ok(Self {
            http: builder.build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn fetch_languages(&self) -> Result<Vec<String>, RemoteError> {
        let resp = self.http.get(self.url("/api/languages")).send().await?;
        // This call only has a network failure mode.
        if !resp.status().is_success() {
            return Err(RemoteError::Network(format!(
                "languages request failed with HTTP {}",
                resp.status()
            )));
        }
        let body = resp.json::<LanguagesResp>().await?;
        Ok(body.languages)
    }

    async fn upload(
        &self,
        file: &SourceFile,
        target_language: &str,
    ) -> Result<Uploaded, RemoteError> {
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(file.content().to_vec())
                    .file_name(file.name().to_string())
                    .mime_str(file.content_type())?,
            )
            .text("target_language", target_language.to_string());

        let resp = self
            .http
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let body = check_status(resp, None).await?.json::<UploadResp>().await?;
        Ok(Uploaded {
            job_id: body.job_id,
            text_preview: body.text_preview,
        })
    }

    async fn translate(
        &self,
        job_id: &str,
        target_language: &str,
        options: TranslateOptions,
    ) -> Result<Translated, RemoteError> {
        let url = self.url(&format!(
            "/api/translate/{}",
            urlencoding::encode(job_id)
        ));
        let req = TranslateReq {
            target_language,
            preserve_formatting: options.preserve_formatting,
            include_original: options.include_original,
        };
        let resp = self.http.post(url).json(&req).send().await?;
        let body = check_status(resp, Some(job_id))
            .await?
            .json::<TranslateResp>()
            .await?;
        Ok(Translated {
            text_preview: body.text_preview,
        })
    }

    async fn download(&self, job_id: &str, target_language: &str) -> Result<Download, RemoteError> {
        let url = self.url(&format!(
            "/api/download/{}?language={}",
            urlencoding::encode(job_id),
            urlencoding::encode(target_language)
        ));
        let resp = check_status(self.http.get(url).send().await?, Some(job_id)).await?;
        let filename = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| format!("translation_{target_language}.txt"));
        let bytes = resp.bytes().await?;
        Ok(Download {
            filename,
            bytes: bytes.to_vec(),
        })
    }
}

/// Map a non-success response onto the remote error taxonomy.
///
/// A 404 on a job-scoped route means the job is gone; anything else is a rejection.
async fn check_status(resp: Response, job_id: Option<&str>) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    match job_id {
        Some(id) if status == StatusCode::NOT_FOUND => Err(RemoteError::JobNotFound(id.to_string())),
        _ => Err(RemoteError::ServerRejected {
            status: status.as_u16(),
            detail: error_detail(&body),
        }),
    }
}

/// Pull the human readable `detail` out of an error body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorResp>(body) {
        Ok(ErrorResp {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorResp { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// File name from a `Content-Disposition: attachment; filename="..."` header.
fn attachment_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        let value = part.strip_prefix("filename=")?.trim_matches('"');
        // Never let the server pick a directory.
        let name = value.rsplit(['/', '\\']).next().unwrap_or_default();
        (!name.is_empty()).then(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_from_json_string() {
        assert_eq!(
            error_detail(r#"{"detail":"File must be a PDF"}"#),
            "File must be a PDF"
        );
    }

    #[test]
    fn test_error_detail_from_structured_json() {
        // Validation errors carry a list instead of a string.
        let detail = error_detail(r#"{"detail":[{"msg":"field required"}]}"#);
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_error_detail_from_plain_text() {
        assert_eq!(error_detail("  Internal Server Error\n"), "Internal Server Error");
    }

    #[test]
    fn test_attachment_filename_quoted() {
        assert_eq!(
            attachment_filename(r#"attachment; filename="translation_French.txt""#),
            Some("translation_French.txt".to_string())
        );
    }

    #[test]
    fn test_attachment_filename_strips_directories() {
        assert_eq!(
            attachment_filename("attachment; filename=../../etc/passwd"),
            Some("passwd".to_string())
        );
        assert_eq!(attachment_filename("attachment"), None);
        assert_eq!(attachment_filename(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let cfg = ServerCfg {
            base_url: "http://localhost:8000/".into(),
            timeout_secs: 0,
        };
        let client = HttpRemoteClient::new(&cfg).unwrap();
        assert_eq!(client.url("/api/languages"), "http://localhost:8000/api/languages");
    }
}
