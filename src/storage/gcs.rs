//! Google Cloud Storage uploads through the JSON API.

use serde::Deserialize;
use url::Url;

use super::{ObjectStore, StorageError, StoredObject};
use crate::http_client;

/// Public GCS API root.
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
/// Default service account token endpoint on GCE, GKE and Cloud Run.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const MAX_TOKEN_RESPONSE_BYTES: usize = 64 * 1024;
const MAX_UPLOAD_RESPONSE_BYTES: usize = 256 * 1024;
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Where bearer tokens for upload requests come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// A token supplied up front, e.g. from `gcloud auth print-access-token`.
    Static(String),
    /// Fetch a token from the instance metadata server at `url`.
    MetadataServer { url: String },
}

impl TokenSource {
    /// Prefer an explicit token, otherwise fall back to the metadata server.
    pub fn from_token(token: Option<String>) -> Self {
        match token.map(|token| token.trim().to_string()) {
            Some(token) if !token.is_empty() => Self::Static(token),
            _ => Self::MetadataServer {
                url: METADATA_TOKEN_URL.to_string(),
            },
        }
    }

    fn access_token(&self) -> Result<String, StorageError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::MetadataServer { url } => fetch_metadata_token(url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Subset of the GCS object resource returned by a successful upload.
#[derive(Debug, Deserialize)]
struct ObjectResource {
    bucket: String,
    name: String,
    #[serde(default)]
    size: Option<String>,
}

/// Uploads objects into a single GCS bucket.
#[derive(Debug, Clone)]
pub struct GcsStore {
    bucket: String,
    endpoint: String,
    token: TokenSource,
}

impl GcsStore {
    pub fn new(
        bucket: impl Into<String>,
        endpoint: Option<String>,
        token: TokenSource,
    ) -> Result<Self, StorageError> {
        let bucket = bucket.into().trim().to_string();
        if bucket.is_empty() {
            return Err(StorageError::EmptyBucket);
        }
        let store = Self {
            bucket,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            token,
        };
        store.upload_url("probe")?;
        Ok(store)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Media upload URL for `key`; the key travels percent-encoded in the `name` query.
    fn upload_url(&self, key: &str) -> Result<Url, StorageError> {
        let invalid = |reason: String| StorageError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason,
        };
        let mut url = Url::parse(&self.endpoint).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        Ok(url)
    }
}

impl ObjectStore for GcsStore {
    fn store(&self, bytes: &[u8], key: &str) -> Result<StoredObject, StorageError> {
        let url = self.upload_url(key)?;
        let token = self.token.access_token()?;
        tracing::debug!(bucket = %self.bucket, key, size = bytes.len(), "Uploading object");

        let request = http_client::agent()
            .post(url.as_str())
            .set("Authorization", &format!("Bearer {}", token.trim()))
            .set("Content-Type", "application/octet-stream");
        let response = match request.send_bytes(bytes) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = http_client::read_body_lossy(response, MAX_ERROR_BODY_BYTES);
                return Err(map_status_error(code, body, &self.bucket));
            }
            Err(ureq::Error::Transport(err)) => {
                return Err(StorageError::Transport(err.to_string()));
            }
        };

        let body = http_client::read_response_bytes(response, MAX_UPLOAD_RESPONSE_BYTES)
            .map_err(|err| StorageError::InvalidResponse(err.to_string()))?;
        let object: ObjectResource = serde_json::from_slice(&body)
            .map_err(|err| StorageError::InvalidResponse(err.to_string()))?;
        let size = object
            .size
            .as_deref()
            .and_then(|size| size.parse::<u64>().ok())
            .unwrap_or(bytes.len() as u64);
        Ok(StoredObject {
            location: format!("gs://{}/{}", object.bucket, object.name),
            key: object.name,
            size,
        })
    }
}

fn fetch_metadata_token(url: &str) -> Result<String, StorageError> {
    let response = match http_client::agent()
        .get(url)
        .set("Metadata-Flavor", "Google")
        .call()
    {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            let body = http_client::read_body_lossy(response, MAX_ERROR_BODY_BYTES);
            return Err(StorageError::Auth(format!("HTTP {code}: {body}")));
        }
        Err(ureq::Error::Transport(err)) => {
            return Err(StorageError::Auth(format!(
                "metadata server unreachable ({err}); set GOOGLE_OAUTH_ACCESS_TOKEN when running outside Google Cloud"
            )));
        }
    };
    let body = http_client::read_response_bytes(response, MAX_TOKEN_RESPONSE_BYTES)
        .map_err(|err| StorageError::Auth(err.to_string()))?;
    parse_metadata_token(&body)
}

fn parse_metadata_token(body: &[u8]) -> Result<String, StorageError> {
    let token: MetadataToken = serde_json::from_slice(body)
        .map_err(|err| StorageError::Auth(format!("invalid token response: {err}")))?;
    if token.access_token.trim().is_empty() {
        return Err(StorageError::Auth("empty access token".to_string()));
    }
    Ok(token.access_token)
}

fn map_status_error(code: u16, body: String, bucket: &str) -> StorageError {
    match code {
        401 | 403 => StorageError::Unauthorized { code, body },
        404 => StorageError::BucketNotFound {
            bucket: bucket.to_string(),
            body,
        },
        _ => StorageError::Status { code, body },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::test_server::serve_once;

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn upload_url_encodes_object_name() {
        let store = GcsStore::new("my-bucket", None, TokenSource::Static("t".into())).unwrap();
        let url = store
            .upload_url("trained_models/breast_cancer_model_20240101000000.joblib")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/my-bucket/o?uploadType=media&name=trained_models%2Fbreast_cancer_model_20240101000000.joblib"
        );
    }

    #[test]
    fn rejects_empty_bucket_and_bad_endpoint() {
        assert!(matches!(
            GcsStore::new("  ", None, TokenSource::Static("t".into())),
            Err(StorageError::EmptyBucket)
        ));
        assert!(matches!(
            GcsStore::new("b", Some("not a url".into()), TokenSource::Static("t".into())),
            Err(StorageError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn token_source_prefers_explicit_token() {
        assert_eq!(
            TokenSource::from_token(Some(" abc ".into())),
            TokenSource::Static("abc".into())
        );
        assert!(matches!(
            TokenSource::from_token(Some(String::new())),
            TokenSource::MetadataServer { .. }
        ));
        assert!(matches!(
            TokenSource::from_token(None),
            TokenSource::MetadataServer { .. }
        ));
    }

    #[test]
    fn uploads_bytes_with_bearer_token() {
        let (endpoint, requests) = serve_once(http_response(
            "200 OK",
            r#"{"bucket":"models","name":"trained_models/m.joblib","size":"5"}"#,
        ));
        let store =
            GcsStore::new("models", Some(endpoint), TokenSource::Static("secret".into())).unwrap();
        let stored = store.store(b"hello", "trained_models/m.joblib").unwrap();
        assert_eq!(stored.location, "gs://models/trained_models/m.joblib");
        assert_eq!(stored.size, 5);

        let request = requests.recv().unwrap();
        assert!(request.starts_with(
            "POST /upload/storage/v1/b/models/o?uploadType=media&name=trained_models%2Fm.joblib "
        ));
        assert!(request.contains("Authorization: Bearer secret"));
        assert!(request.ends_with("hello"));
    }

    #[test]
    fn maps_auth_and_missing_bucket_statuses() {
        let (endpoint, _) = serve_once(http_response("403 Forbidden", r#"{"error":"denied"}"#));
        let store =
            GcsStore::new("models", Some(endpoint), TokenSource::Static("t".into())).unwrap();
        let err = store.store(b"x", "k").unwrap_err();
        assert!(matches!(err, StorageError::Unauthorized { code: 403, .. }));
        assert!(err.to_string().contains("denied"));

        let body = r#"{"error":{"message":"The specified bucket does not exist."}}"#;
        let (endpoint, _) = serve_once(http_response("404 Not Found", body));
        let store =
            GcsStore::new("missing", Some(endpoint), TokenSource::Static("t".into())).unwrap();
        let err = store.store(b"x", "k").unwrap_err();
        assert!(matches!(err, StorageError::BucketNotFound { ref bucket, .. } if bucket == "missing"));
        assert_eq!(
            err.to_string(),
            format!("Bucket missing does not exist (HTTP 404): {body}")
        );
        assert!(err.to_string().contains("The specified bucket does not exist."));
    }

    #[test]
    fn fetches_token_from_metadata_server() {
        let (base, requests) = serve_once(http_response(
            "200 OK",
            r#"{"access_token":"ya29.token","expires_in":3599,"token_type":"Bearer"}"#,
        ));
        let source = TokenSource::MetadataServer {
            url: format!("{base}/token"),
        };
        assert_eq!(source.access_token().unwrap(), "ya29.token");
        assert!(requests.recv().unwrap().contains("Metadata-Flavor: Google"));
    }

    #[test]
    fn rejects_blank_metadata_token() {
        let err = parse_metadata_token(br#"{"access_token":"  "}"#).unwrap_err();
        assert!(matches!(err, StorageError::Auth(_)));
    }
}
