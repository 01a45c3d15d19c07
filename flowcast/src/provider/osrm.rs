//! OSRM-compatible HTTP directions provider.
//!
//! Talks to the `route/v1` service of an OSRM server and converts its JSON
//! response into [`Route`] values.
//!
//! # Error Mapping
//!
//! | Response                         | Result                                |
//! |----------------------------------|---------------------------------------|
//! | HTTP 429                         | `RateLimited { retry_after }`         |
//! | `code: "NoRoute"` / `"NoSegment"`| `NoResult`                            |
//! | other non-2xx / bad JSON / other | `Transport`                           |
//!
//! OSRM has no public-transit profile, so transit requests report `NoResult`.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::http::{HttpClient, ReqwestClient};
use super::types::{
    BoxFuture, DirectionsError, DirectionsProvider, Route, RouteRequest, RouteStep, TransportMode,
};
use crate::coord::Coordinate;

/// Public OSRM demo server.
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Directions provider backed by an OSRM server.
pub struct OsrmDirectionsProvider<C: HttpClient = ReqwestClient> {
    http: C,
    base_url: String,
}

impl OsrmDirectionsProvider<ReqwestClient> {
    /// Create a provider using reqwest with the given timeout.
    pub fn connect(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectionsError> {
        Ok(Self::new(ReqwestClient::with_timeout(timeout)?, base_url))
    }
}

impl<C: HttpClient> OsrmDirectionsProvider<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the `route/v1` URL for a request.
    pub fn build_url(&self, request: &RouteRequest, profile: &str) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?alternatives={}&steps=true&geometries=geojson&overview=false",
            self.base_url,
            profile,
            request.origin.longitude,
            request.origin.latitude,
            request.destination.longitude,
            request.destination.latitude,
            request.alternates_requested,
        )
    }

    async fn fetch(&self, request: &RouteRequest) -> Result<Vec<Route>, DirectionsError> {
        let Some(profile) = profile_for(request.transport_mode) else {
            debug!(mode = %request.transport_mode, "Transport mode not served by OSRM");
            return Err(DirectionsError::NoResult);
        };

        let url = self.build_url(request, profile);
        debug!(url = %url, "Requesting directions");

        let response = self.http.get(&url).await?;
        match response.status {
            429 => {
                warn!(retry_after = ?response.retry_after, "Directions provider rate limited");
                Err(DirectionsError::RateLimited {
                    retry_after: response.retry_after,
                })
            }
            // OSRM answers NoRoute with 400 and a JSON body
            200..=299 | 400 => parse_route_response(&response.body),
            status => Err(DirectionsError::Transport(format!(
                "HTTP {} from directions provider",
                status
            ))),
        }
    }
}

impl<C: HttpClient> DirectionsProvider for OsrmDirectionsProvider<C> {
    fn calculate_routes<'a>(
        &'a self,
        request: &'a RouteRequest,
    ) -> BoxFuture<'a, Result<Vec<Route>, DirectionsError>> {
        Box::pin(self.fetch(request))
    }

    fn name(&self) -> &str {
        "osrm"
    }
}

fn profile_for(mode: TransportMode) -> Option<&'static str> {
    match mode {
        TransportMode::Automobile => Some("driving"),
        TransportMode::Walking => Some("foot"),
        TransportMode::Transit => None,
    }
}

// =============================================================================
// Response decoding
// =============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    #[serde(default)]
    name: String,
    geometry: OsrmGeometry,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: `[lon, lat]`.
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
}

/// Decode an OSRM `route/v1` JSON body.
pub fn parse_route_response(body: &[u8]) -> Result<Vec<Route>, DirectionsError> {
    let response: OsrmResponse = serde_json::from_slice(body)
        .map_err(|e| DirectionsError::Transport(format!("Invalid directions response: {}", e)))?;

    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(DirectionsError::NoResult),
        code => {
            return Err(DirectionsError::Transport(format!(
                "{}: {}",
                code,
                response.message.unwrap_or_default()
            )))
        }
    }

    Ok(response.routes.into_iter().map(convert_route).collect())
}

fn convert_route(route: OsrmRoute) -> Route {
    let steps = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| {
            let instruction =
                instruction_text(&step.maneuver.kind, step.maneuver.modifier.as_deref(), &step.name);
            let geometry = step
                .geometry
                .coordinates
                .iter()
                .map(|[lon, lat]| Coordinate::new(*lat, *lon))
                .collect();
            RouteStep::new(instruction, step.distance, geometry)
        })
        .collect();

    Route::new(
        steps,
        Duration::from_secs_f64(route.duration.max(0.0)),
        route.distance,
    )
}

/// Render an OSRM maneuver as a short English instruction.
pub fn instruction_text(kind: &str, modifier: Option<&str>, road: &str) -> String {
    let onto = if road.is_empty() {
        String::new()
    } else {
        format!(" onto {}", road)
    };

    match (kind, modifier) {
        ("depart", Some(m)) if !road.is_empty() => format!("Head {} on {}", m, road),
        ("depart", _) if !road.is_empty() => format!("Depart on {}", road),
        ("depart", _) => "Depart".to_string(),
        ("arrive", _) => "Arrive at destination".to_string(),
        ("turn", Some("straight")) | ("new name", _) | ("continue", _) => {
            format!("Continue{}", onto)
        }
        ("turn", Some(m)) | ("end of road", Some(m)) | ("fork", Some(m)) => {
            format!("Turn {}{}", m, onto)
        }
        ("merge", _) => format!("Merge{}", onto),
        ("on ramp", _) => format!("Take the ramp{}", onto),
        ("off ramp", _) => format!("Take the exit{}", onto),
        ("roundabout", _) | ("rotary", _) => format!("Enter the roundabout and exit{}", onto),
        (other, Some(m)) => format!("{} {}{}", capitalize(other), m, onto),
        (other, None) => format!("{}{}", capitalize(other), onto),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockHttpClient;
    use crate::provider::http::HttpResponse;

    const TWO_ROUTES: &str = r#"{
        "code": "Ok",
        "routes": [
            {
                "distance": 1200.5,
                "duration": 180.0,
                "legs": [{
                    "steps": [
                        {
                            "distance": 1000.0,
                            "name": "Market Street",
                            "geometry": {"coordinates": [[-122.4194, 37.7749], [-122.41, 37.78]]},
                            "maneuver": {"type": "depart", "modifier": "north"}
                        },
                        {
                            "distance": 200.5,
                            "name": "Main Street",
                            "geometry": {"coordinates": [[-122.41, 37.78], [-122.40, 37.781]]},
                            "maneuver": {"type": "turn", "modifier": "left"}
                        },
                        {
                            "distance": 0.0,
                            "name": "",
                            "geometry": {"coordinates": [[-122.40, 37.781]]},
                            "maneuver": {"type": "arrive"}
                        }
                    ]
                }]
            },
            {
                "distance": 1500.0,
                "duration": 240.0,
                "legs": [{"steps": []}]
            }
        ]
    }"#;

    fn request() -> RouteRequest {
        RouteRequest::new(
            Coordinate::new(37.7749, -122.4194),
            Coordinate::new(37.781, -122.40),
        )
        .with_alternates(true)
    }

    #[test]
    fn test_parse_two_routes() {
        let routes = parse_route_response(TWO_ROUTES.as_bytes()).unwrap();
        assert_eq!(routes.len(), 2);

        let first = &routes[0];
        assert_eq!(first.steps.len(), 3);
        assert_eq!(first.total_duration, Duration::from_secs(180));
        assert_eq!(first.steps[0].instruction, "Head north on Market Street");
        assert_eq!(first.steps[1].instruction, "Turn left onto Main Street");
        assert_eq!(first.steps[2].instruction, "Arrive at destination");
        // GeoJSON lon/lat is swapped into lat/lon
        assert_eq!(first.steps[0].anchor(), Some(Coordinate::new(37.7749, -122.4194)));
    }

    #[test]
    fn test_parse_no_route() {
        let body = br#"{"code": "NoRoute", "message": "Impossible route"}"#;
        assert_eq!(parse_route_response(body), Err(DirectionsError::NoResult));
    }

    #[test]
    fn test_parse_other_code_is_transport() {
        let body = br#"{"code": "InvalidQuery", "message": "bad"}"#;
        assert!(matches!(
            parse_route_response(body),
            Err(DirectionsError::Transport(_))
        ));
        assert!(matches!(
            parse_route_response(b"not json"),
            Err(DirectionsError::Transport(_))
        ));
    }

    #[test]
    fn test_build_url() {
        let provider = OsrmDirectionsProvider::new(MockHttpClient::ok("{}"), "http://osrm.local/");
        let url = provider.build_url(&request(), "driving");
        assert_eq!(
            url,
            "http://osrm.local/route/v1/driving/-122.4194,37.7749;-122.4,37.781?alternatives=true&steps=true&geometries=geojson&overview=false"
        );
    }

    #[tokio::test]
    async fn test_rate_limit_maps_retry_after() {
        let mock = MockHttpClient::new(Ok(HttpResponse {
            status: 429,
            retry_after: Some(Duration::from_secs(2)),
            body: Vec::new(),
        }));
        let provider = OsrmDirectionsProvider::new(mock, "http://osrm.local");
        let result = provider.calculate_routes(&request()).await;
        assert_eq!(
            result,
            Err(DirectionsError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            })
        );
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let mock = MockHttpClient::new(Ok(HttpResponse {
            status: 503,
            retry_after: None,
            body: Vec::new(),
        }));
        let provider = OsrmDirectionsProvider::new(mock, "http://osrm.local");
        assert!(matches!(
            provider.calculate_routes(&request()).await,
            Err(DirectionsError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_success_round_trip_through_mock() {
        let provider = OsrmDirectionsProvider::new(MockHttpClient::ok(TWO_ROUTES), "http://osrm.local");
        let routes = provider.calculate_routes(&request()).await.unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(provider.name(), "osrm");
    }

    #[tokio::test]
    async fn test_transit_has_no_profile() {
        let mock = MockHttpClient::ok(TWO_ROUTES);
        let provider = OsrmDirectionsProvider::new(mock, "http://osrm.local");
        let req = request().with_mode(TransportMode::Transit);
        assert_eq!(
            provider.calculate_routes(&req).await,
            Err(DirectionsError::NoResult)
        );
        assert!(provider.http.urls.lock().is_empty());
    }

    #[test]
    fn test_instruction_text_variants() {
        assert_eq!(instruction_text("depart", None, ""), "Depart");
        assert_eq!(instruction_text("new name", None, "Oak"), "Continue onto Oak");
        assert_eq!(instruction_text("merge", Some("left"), "I-80"), "Merge onto I-80");
        assert_eq!(instruction_text("notification", None, ""), "Notification");
    }
}
