use shared::{AgentRouteResponse, FeedbackAck, FeedbackRequest, RouteRequest, RouteResponse};

use crate::agent::{AgentClient, FEEDBACK_PATH, GENERATE_PATH};
use crate::error::ProxyError;
use crate::polyline;

const RATING_RANGE: std::ops::RangeInclusive<i64> = 1..=5;

/// Forwards a route request to the agent and decodes the returned polyline.
pub async fn generate_route(
    agent: &AgentClient,
    request: &RouteRequest,
) -> Result<RouteResponse, ProxyError> {
    agent.base_url()?;
    validate_route_request(request)?;

    let reply: AgentRouteResponse = agent.post_json(GENERATE_PATH, request).await?;
    let response = decode_route(reply)?;

    tracing::info!(
        request_id = %response.request_id,
        route_id = %response.route.route_id,
        points = response.route.polyline.len(),
        "route generated"
    );
    Ok(response)
}

/// Forwards a rating for a previously generated route.
pub async fn submit_feedback(
    agent: &AgentClient,
    request: &FeedbackRequest,
) -> Result<FeedbackAck, ProxyError> {
    agent.base_url()?;
    validate_feedback(request)?;

    let ack: FeedbackAck = agent.post_json(FEEDBACK_PATH, request).await?;
    tracing::info!(
        request_id = %ack.request_id,
        status = %ack.status,
        "feedback forwarded"
    );
    Ok(ack)
}

/// Replaces the encoded polyline with its points. Fails the whole reply on a
/// malformed string or a route with no points.
pub fn decode_route(reply: AgentRouteResponse) -> Result<RouteResponse, ProxyError> {
    let path = polyline::decode(&reply.route.polyline)?;
    if path.is_empty() {
        return Err(ProxyError::EmptyRoute);
    }
    Ok(RouteResponse {
        request_id: reply.request_id,
        route: reply.route.map_polyline(|_| path),
        meta: reply.meta,
        extra: reply.extra,
    })
}

fn validate_route_request(request: &RouteRequest) -> Result<(), ProxyError> {
    if !(request.distance_km.is_finite() && request.distance_km > 0.0) {
        return Err(ProxyError::InvalidRequest(format!(
            "distance_km must be a positive number, got {}",
            request.distance_km
        )));
    }
    Ok(())
}

fn validate_feedback(request: &FeedbackRequest) -> Result<(), ProxyError> {
    if !RATING_RANGE.contains(&request.rating) {
        return Err(ProxyError::InvalidRequest(format!(
            "rating must be between {} and {}, got {}",
            RATING_RANGE.start(),
            RATING_RANGE.end(),
            request.rating
        )));
    }
    Ok(())
}
