//! S3-compatible blob store with hand-rolled SigV4 signing.
//!
//! Keeps the store down to one HTTP client: requests carry an
//! `Authorization` header, presigned URLs carry the signature in the query
//! string. Works against AWS and path-style endpoints (MinIO, localstack).

use super::{BlobStore, ByteStream};
use crate::config::BlobStoreConfig;
use crate::error::BlobError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const SERVICE: &str = "s3";

pub struct S3BlobStore {
    client: Client,
    region: String,
    /// `https://{bucket}.s3.{region}.amazonaws.com` or a path-style
    /// override ending in `/{bucket}`.
    base_url: String,
    host: String,
    /// Path prefix of every object URL: empty for virtual-host style,
    /// `/{bucket}` for path-style.
    path_prefix: String,
    access_key_id: String,
    secret_access_key: String,
}

impl S3BlobStore {
    pub fn new(config: &BlobStoreConfig) -> anyhow::Result<Self> {
        let access_key_id = config
            .access_key_id
            .clone()
            .ok_or_else(|| anyhow::anyhow!("blob store access key is not configured"))?;
        let secret_access_key = config
            .secret_access_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("blob store secret key is not configured"))?;

        let (base_url, host, path_prefix) = match &config.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                let host = endpoint
                    .strip_prefix("https://")
                    .or_else(|| endpoint.strip_prefix("http://"))
                    .unwrap_or(endpoint)
                    .to_owned();
                (
                    format!("{endpoint}/{}", config.bucket),
                    host,
                    format!("/{}", config.bucket),
                )
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", config.bucket, config.region);
                (format!("https://{host}"), host, String::new())
            }
        };

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .build()
                .unwrap_or_else(|_| Client::new()),
            region: config.region.clone(),
            base_url,
            host,
            path_prefix,
            access_key_id,
            secret_access_key,
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, uri_encode(key, false))
    }

    fn canonical_path(&self, key: &str) -> String {
        format!("{}/{}", self.path_prefix, uri_encode(key, false))
    }

    fn signing_key(&self, date: &str) -> Vec<u8> {
        let mut key = hmac_sha256(format!("AWS4{}", self.secret_access_key).as_bytes(), date);
        for part in [self.region.as_str(), SERVICE, "aws4_request"] {
            key = hmac_sha256(&key, part);
        }
        key
    }

    fn credential_scope(&self, date: &str) -> String {
        format!("{date}/{}/{SERVICE}/aws4_request", self.region)
    }

    /// Sign a direct request; returns the `Authorization` header value.
    fn authorization_header(
        &self,
        method: &str,
        key: &str,
        now: DateTime<Utc>,
        content_sha256: &str,
        content_type: Option<&str>,
    ) -> (String, String) {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut headers: Vec<(String, String)> = vec![
            ("host".into(), self.host.clone()),
            ("x-amz-content-sha256".into(), content_sha256.to_owned()),
            ("x-amz-date".into(), amz_date.clone()),
        ];
        if let Some(ct) = content_type {
            headers.push(("content-type".into(), ct.to_owned()));
        }
        headers.sort();

        let signed_headers = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers = headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}\n"))
            .collect::<String>();

        let canonical_request = format!(
            "{method}\n{}\n\n{canonical_headers}\n{signed_headers}\n{content_sha256}",
            self.canonical_path(key),
        );
        let scope = self.credential_scope(&date);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes()),
        );
        let signature = hex::encode(hmac_sha256(&self.signing_key(&date), &string_to_sign));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key_id,
        );
        (authorization, amz_date)
    }

    /// Query-string presign per SigV4: the URL itself authorizes exactly
    /// one `method` on `key` until `ttl` elapses.
    fn presign(&self, method: &str, key: &str, ttl: Duration) -> String {
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = self.credential_scope(&date);

        let mut query: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()),
            (
                "X-Amz-Credential".into(),
                format!("{}/{scope}", self.access_key_id),
            ),
            ("X-Amz-Date".into(), amz_date.clone()),
            ("X-Amz-Expires".into(), ttl.as_secs().max(1).to_string()),
            ("X-Amz-SignedHeaders".into(), "host".into()),
        ];
        query.sort();

        let canonical_query = query
            .iter()
            .map(|(name, value)| {
                format!("{}={}", uri_encode(name, true), uri_encode(value, true))
            })
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{}\n{canonical_query}\nhost:{}\n\nhost\n{UNSIGNED_PAYLOAD}",
            self.canonical_path(key),
            self.host,
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes()),
        );
        let signature = hex::encode(hmac_sha256(&self.signing_key(&date), &string_to_sign));

        format!(
            "{}?{canonical_query}&X-Amz-Signature={signature}",
            self.object_url(key),
        )
    }

    async fn execute_put(
        &self,
        key: &str,
        body: reqwest::Body,
        content_sha256: &str,
        size: Option<u64>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        let (authorization, amz_date) =
            self.authorization_header("PUT", key, Utc::now(), content_sha256, Some(content_type));

        let mut request = self
            .client
            .put(self.object_url(key))
            .header("authorization", authorization)
            .header("x-amz-content-sha256", content_sha256)
            .header("x-amz-date", amz_date)
            .header("content-type", content_type);
        if let Some(size) = size {
            request = request.header("content-length", size);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| BlobError::new("put", key, e.to_string()))?;
        if !response.status().is_success() {
            return Err(BlobError::new(
                "put",
                key,
                format!("unexpected status {}", response.status()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        let content_sha256 = sha256_hex(&bytes);
        let size = bytes.len() as u64;
        self.execute_put(key, bytes.into(), &content_sha256, Some(size), content_type)
            .await
    }

    async fn put_object_stream(
        &self,
        key: &str,
        stream: ByteStream,
        size: u64,
        content_type: &str,
    ) -> Result<(), BlobError> {
        self.execute_put(
            key,
            reqwest::Body::wrap_stream(stream),
            UNSIGNED_PAYLOAD,
            Some(size),
            content_type,
        )
        .await
    }

    async fn head_object(&self, key: &str) -> Result<bool, BlobError> {
        let empty_sha = sha256_hex(b"");
        let (authorization, amz_date) =
            self.authorization_header("HEAD", key, Utc::now(), &empty_sha, None);

        let response = self
            .client
            .head(self.object_url(key))
            .header("authorization", authorization)
            .header("x-amz-content-sha256", empty_sha)
            .header("x-amz-date", amz_date)
            .send()
            .await
            .map_err(|e| BlobError::new("head", key, e.to_string()))?;

        match response.status().as_u16() {
            200 => Ok(true),
            404 | 403 => Ok(false),
            status => Err(BlobError::new("head", key, format!("unexpected status {status}"))),
        }
    }

    async fn delete_object(&self, key: &str) {
        let empty_sha = sha256_hex(b"");
        let (authorization, amz_date) =
            self.authorization_header("DELETE", key, Utc::now(), &empty_sha, None);

        let result = self
            .client
            .delete(self.object_url(key))
            .header("authorization", authorization)
            .header("x-amz-content-sha256", empty_sha)
            .header("x-amz-date", amz_date)
            .send()
            .await;

        // 404 is already the desired end state; anything else is only
        // worth a log line.
        match result {
            Ok(response)
                if !response.status().is_success() && response.status().as_u16() != 404 =>
            {
                tracing::warn!(key, status = %response.status(), "blob delete failed");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(key, error = %err, "blob delete failed"),
        }
    }

    fn presign_get(&self, key: &str, ttl: Duration) -> Result<String, BlobError> {
        Ok(self.presign("GET", key, ttl))
    }

    fn presign_put(
        &self,
        key: &str,
        _content_type: &str,
        ttl: Duration,
    ) -> Result<String, BlobError> {
        // Content type is left unsigned so browsers can set their own
        // boundary-bearing types on direct uploads.
        Ok(self.presign("PUT", key, ttl))
    }
}

// ── SigV4 primitives ─────────────────────────────────────────

fn hmac_sha256(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// RFC 3986 encoding as SigV4 wants it: unreserved characters pass through,
/// `/` passes through in paths but not in query values.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
