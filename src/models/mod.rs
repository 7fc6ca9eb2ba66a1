mod api;

pub use api::{
    EndpointInfo, HealthResponse, LocationRequest, SearchRequest, ServiceInfo, ToolResponse,
};
