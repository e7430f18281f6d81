use db::models::qr_generation::Model as CredentialModel;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct IssueCredentialReq {
    #[validate(range(min = 5, max = 3600, message = "validity_seconds must be between 5 and 3600"))]
    pub validity_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PresentCredentialReq {
    #[validate(length(min = 1, max = 128, message = "token is required"))]
    pub token: String,
    #[validate(length(min = 1, max = 128, message = "signature is required"))]
    pub signature: String,
}

/// History row. The signature is never echoed back after issuance.
#[derive(Debug, Serialize)]
pub struct CredentialHistoryItem {
    pub id: i64,
    pub generated_by: i64,
    pub generated_at: String,
    pub expires_at: String,
    pub scanned_count: i64,
    pub is_rotated: bool,
    pub rotation_index: i32,
}

impl From<CredentialModel> for CredentialHistoryItem {
    fn from(m: CredentialModel) -> Self {
        Self {
            id: m.id,
            generated_by: m.generated_by,
            generated_at: m.generated_at.to_rfc3339(),
            expires_at: m.expires_at.to_rfc3339(),
            scanned_count: m.scanned_count,
            is_rotated: m.is_rotated,
            rotation_index: m.rotation_index,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub revoked: u64,
}
