use serde::{Deserialize, Serialize};

/// A street-level panorama location from the pre-fetched corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}
