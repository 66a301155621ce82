//! Amazon Textract OCR engine.
//!
//! Calls `Textract.DetectDocumentText` with an S3 object reference, signed
//! with SigV4 (see [`crate::sigv4`]). Textract reads the image straight from
//! the bucket, so no bytes pass through this process.
//!
//! Failure mapping:
//!
//! | Failure | Kind |
//! |---------|------|
//! | connect / timeout / body read | `OCR_UNAVAILABLE` |
//! | non-2xx status, unparseable body | `OCR_REJECTED` |

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use pagegrep_core::models::BoundingBox;
use pagegrep_core::ocr::{Block, BlockType, OcrEngine, OcrError};

use crate::config::OcrConfig;
use crate::sigv4::{self, AwsCredentials, SignableRequest};

const TARGET: &str = "Textract.DetectDocumentText";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Textract client for `DetectDocumentText`.
pub struct TextractClient {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    region: String,
    credentials: AwsCredentials,
}

impl TextractClient {
    pub fn new(config: &OcrConfig, credentials: AwsCredentials) -> Result<Self> {
        let endpoint = config
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://textract.{}.amazonaws.com", config.region));
        let url = reqwest::Url::parse(&endpoint)
            .with_context(|| format!("Invalid ocr.endpoint_url: {}", endpoint))?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => anyhow::bail!("ocr.endpoint_url has no host: {}", endpoint),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            host,
            region: config.region.clone(),
            credentials,
        })
    }
}

#[async_trait]
impl OcrEngine for TextractClient {
    async fn detect(&self, bucket: &str, key: &str) -> Result<Vec<Block>, OcrError> {
        let context = format!("DetectDocumentText s3://{}/{}", bucket, key);
        let body = serde_json::to_vec(&serde_json::json!({
            "Document": { "S3Object": { "Bucket": bucket, "Name": key } }
        }))
        .map_err(|e| OcrError::rejected(context.clone(), e))?;

        let amz_date = sigv4::amz_date(Utc::now());
        let mut headers = vec![
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), self.host.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
            ("x-amz-target".to_string(), TARGET.to_string()),
        ];
        if let Some(ref token) = self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        let authorization = sigv4::authorization(
            &self.credentials,
            &self.region,
            "textract",
            &amz_date,
            &SignableRequest {
                method: "POST",
                path: "/",
                query: "",
                headers: &headers,
                payload: &body,
            },
        );

        let mut req = self.http.post(&self.endpoint).header("Authorization", authorization);
        for (name, value) in headers.iter().filter(|(n, _)| n != "host") {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req
            .body(body)
            .send()
            .await
            .map_err(|e| OcrError::unavailable(context.clone(), e))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| OcrError::unavailable(context.clone(), e))?;

        if !status.is_success() {
            tracing::warn!(bucket, key, %status, "Textract rejected request");
            return Err(OcrError::rejected(
                context,
                format!("HTTP {}: {}", status, truncate(&text, 512)),
            ));
        }

        let parsed: DetectResponse =
            serde_json::from_str(&text).map_err(|e| OcrError::rejected(context, e))?;
        let blocks = to_blocks(parsed);
        tracing::debug!(bucket, key, blocks = blocks.len(), "Textract response");
        Ok(blocks)
    }
}

/// OCR engine used when `ocr.provider = "disabled"`. Every call is rejected.
pub struct DisabledOcr;

#[async_trait]
impl OcrEngine for DisabledOcr {
    async fn detect(&self, bucket: &str, key: &str) -> Result<Vec<Block>, OcrError> {
        Err(OcrError::rejected(
            format!("OCR s3://{}/{}", bucket, key),
            "OCR provider is disabled",
        ))
    }
}

/// Create the OCR engine selected by `config.provider`.
pub fn build_engine(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    if !config.is_enabled() {
        tracing::info!("OCR disabled; indexing requests will be rejected");
        return Ok(Arc::new(DisabledOcr));
    }
    match config.provider.as_str() {
        "textract" => {
            let credentials = AwsCredentials::from_env()?;
            Ok(Arc::new(TextractClient::new(config, credentials)?))
        }
        other => anyhow::bail!("Unknown OCR provider: {}", other),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

// ============ Response model ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectResponse {
    #[serde(default)]
    blocks: Vec<TextractBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextractBlock {
    block_type: BlockType,
    id: String,
    #[serde(default)]
    page: Option<i64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Geometry {
    bounding_box: Option<TextractBox>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextractBox {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Relationship {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default)]
    ids: Vec<String>,
}

fn to_blocks(resp: DetectResponse) -> Vec<Block> {
    resp.blocks
        .into_iter()
        .map(|b| {
            let children = b
                .relationships
                .into_iter()
                .filter(|r| r.kind == "CHILD")
                .flat_map(|r| r.ids)
                .collect();
            let bounding_box = b.geometry.and_then(|g| g.bounding_box).map(|bb| BoundingBox {
                left: bb.left,
                top: bb.top,
                width: bb.width,
                height: bb.height,
            });
            Block {
                id: b.id,
                block_type: b.block_type,
                page: b.page,
                text: b.text,
                bounding_box,
                children,
            }
        })
        .collect()
}
