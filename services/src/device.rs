use serde::{Deserialize, Serialize};

/// Identifies the device an action was performed from. Recorded verbatim on
/// audit and verification rows; never interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub device_id: Option<String>,
    pub device_fingerprint: Option<String>,
}

impl DeviceContext {
    pub fn new(device_id: impl Into<String>, device_fingerprint: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            device_fingerprint: Some(device_fingerprint.into()),
        }
    }
}
