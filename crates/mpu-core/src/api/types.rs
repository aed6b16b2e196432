//! Wire types for the control-plane JSON endpoints.

use serde::{Deserialize, Serialize};

/// Response of the create-upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUploadResponse {
    /// Multipart transaction id assigned by the object store.
    #[serde(rename = "uploadId")]
    pub upload_id: String,
    /// Object key assigned by the service (e.g. `datasets/<hex>/<filename>`).
    #[serde(rename = "fileKey")]
    pub object_key: String,
}

/// Response of the part-url endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrlResponse {
    /// Pre-authorized PUT target for exactly one part's byte range.
    #[serde(rename = "signedUrl")]
    pub signed_url: String,
}

/// A successfully stored part, as presented to the completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
    /// Integrity token for the stored part, surrounding quotes stripped.
    #[serde(rename = "ETag")]
    pub etag: String,
}

/// Response of the completions endpoint: the provider output wrapped in a
/// `response` field by the service layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteResponse {
    #[serde(default)]
    pub response: FinalizedObject,
}

/// Identity of the finalized object. Fields mirror the provider's completion
/// output; absent or extra fields are tolerated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FinalizedObject {
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Key")]
    pub key: Option<String>,
    #[serde(rename = "Bucket")]
    pub bucket: Option<String>,
    #[serde(rename = "ETag")]
    pub etag: Option<String>,
}

/// Strips the surrounding quote characters the object store wraps entity
/// tags in (`"abc123"` becomes `abc123`). Weak-validator prefixes are kept.
pub fn normalize_etag(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_upload_response_parses() {
        let raw = r#"{"uploadId":"u-123","fileKey":"datasets/ab12/report.csv"}"#;
        let parsed: CreateUploadResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.upload_id, "u-123");
        assert_eq!(parsed.object_key, "datasets/ab12/report.csv");
    }

    #[test]
    fn signed_url_response_parses() {
        let raw = r#"{"signedUrl":"https://bucket.example/part?X-Amz-Signature=abc"}"#;
        let parsed: SignedUrlResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.signed_url.starts_with("https://bucket.example/part"));
    }

    #[test]
    fn completed_part_serializes_with_provider_field_names() {
        let part = CompletedPart {
            part_number: 3,
            etag: "abc".to_string(),
        };
        let json = serde_json::to_string(&part).unwrap();
        assert_eq!(json, r#"{"PartNumber":3,"ETag":"abc"}"#);
    }

    #[test]
    fn complete_response_unwraps_provider_output() {
        let raw = r#"{"response":{"Location":"https://bucket.example/k","Key":"k","Bucket":"bucket","ETag":"\"tag\""}}"#;
        let parsed: CompleteResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.response.key.as_deref(), Some("k"));
        assert_eq!(parsed.response.location.as_deref(), Some("https://bucket.example/k"));
    }

    #[test]
    fn complete_response_tolerates_missing_fields() {
        let parsed: CompleteResponse = serde_json::from_str(r#"{"response":{}}"#).unwrap();
        assert!(parsed.response.location.is_none());
        let empty: CompleteResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.response.key.is_none());
    }

    #[test]
    fn normalize_etag_strips_surrounding_quotes() {
        assert_eq!(normalize_etag("\"9bb58f26\""), "9bb58f26");
        assert_eq!(normalize_etag("9bb58f26"), "9bb58f26");
        assert_eq!(normalize_etag(" \"9bb58f26\" "), "9bb58f26");
        assert_eq!(normalize_etag("\"\""), "");
    }
}
