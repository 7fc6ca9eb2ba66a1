use serde::{Deserialize, Serialize};

/// Body of `POST /search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    /// Free-text search query
    #[serde(default)]
    pub query: Option<String>,
}

/// Body of `POST /weather` and `POST /time`.
#[derive(Debug, Default, Deserialize)]
pub struct LocationRequest {
    /// City or region name as spoken by the user
    #[serde(default)]
    pub location: Option<String>,
}

/// Successful tool response read aloud by the voice agent.
#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    /// Natural-language sentence for speech synthesis
    pub results: String,
}

impl ToolResponse {
    pub fn spoken(results: impl Into<String>) -> Self {
        Self {
            success: true,
            results: results.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// One entry in the service description.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    pub requires_api_key: bool,
}

/// Response of `GET /`.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_missing_query() {
        let request: SearchRequest =
            serde_json::from_str("{}").expect("Deserialization should succeed");
        assert!(request.query.is_none());
    }

    #[test]
    fn test_location_request_ignores_unknown_fields() {
        let request: LocationRequest =
            serde_json::from_str(r#"{"location": "Paris", "units": "metric"}"#)
                .expect("Deserialization should succeed");
        assert_eq!(request.location.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_tool_response_serialization() {
        let json = serde_json::to_string(&ToolResponse::spoken("Hello.")).unwrap();
        assert_eq!(json, r#"{"success":true,"results":"Hello."}"#);
    }
}
