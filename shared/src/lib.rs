use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Mood of the walk, as understood by the route agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Exercise,
    Think,
    Refresh,
    Nature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default = "generate_request_id")]
    pub request_id: String,
    pub theme: Theme,
    pub distance_km: f64,
    pub start_location: LatLng,
    pub end_location: LatLng,
    pub round_trip: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    /// Client fields forwarded to the agent untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A generated route. `P` is the path representation: the encoded polyline
/// string as the agent sends it, or decoded points as the client receives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route<P> {
    pub route_id: String,
    pub polyline: P,
    pub distance_km: f64,
    pub duration_min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav_waypoints: Option<Vec<LatLng>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spots: Option<Vec<Spot>>,
    /// Fields the agent added that this proxy does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<P> Route<P> {
    /// Swaps the path representation, keeping every other field untouched.
    pub fn map_polyline<Q>(self, f: impl FnOnce(P) -> Q) -> Route<Q> {
        Route {
            route_id: self.route_id,
            polyline: f(self.polyline),
            distance_km: self.distance_km,
            duration_min: self.duration_min,
            title: self.title,
            summary: self.summary,
            nav_waypoints: self.nav_waypoints,
            spots: self.spots,
            extra: self.extra,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedRoute<P> {
    pub request_id: String,
    pub route: Route<P>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What the agent returns from `/route/generate`.
pub type AgentRouteResponse = GeneratedRoute<String>;

/// What the proxy returns to its client.
pub type RouteResponse = GeneratedRoute<Vec<LatLng>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub request_id: String,
    pub route_id: String,
    pub rating: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub request_id: String,
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Success wrapper returned by the proxy endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub status_code: u16,
    pub status_message: String,
    pub kind: String,
}

pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
