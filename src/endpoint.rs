/// HTTP endpoint for querying climate observations
///
/// Provides a small read-only REST API over the climate dataset.
///
/// Endpoints:
/// - GET /                                   - Route listing (HTML)
/// - GET /about                              - About page
/// - GET /api/v1.0/precipitation             - date -> precipitation
/// - GET /api/v1.0/stations                  - [id, name, id, name, ...]
/// - GET /api/v1.0/tobs                      - date -> temperature, fixed one-year window
/// - GET /api/v1.0/calc_temps/{start}        - Tmin/Tavg/Tmax for date >= start
/// - GET /api/v1.0/calc_temps/{start}/{end}  - Tmin/Tavg/Tmax for start <= date <= end

use crate::config::ServiceConfig;
use crate::db::Store;
use crate::model::interleave_stations;
use crate::queries::{self, QueryError};
use log::{error, info, warn};
use serde::Serialize;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use threadpool::ThreadPool;
use tiny_http::{Header, Method, Response, Server, StatusCode};

const CALC_TEMPS_PREFIX: &str = "/api/v1.0/calc_temps/";

const HOME_PAGE: &str = "Welcome to Climate App!<br/>\
    Available Routes:<br/><br/>\
    /api/v1.0/precipitation<br/>\
    -the dates and precipitation observations from the last year<br/><br/>\
    /api/v1.0/stations<br/>\
    - list of stations from the dataset<br/><br/>\
    /api/v1.0/tobs<br/>\
    - list of Temperature Observations (tobs) for the previous year<br/><br/>\
    /api/v1.0/calc_temps/&lt;start&gt;<br/>\
    - list of `TMIN`, `TAVG`, and `TMAX` for all dates greater than and equal to the start date<br/><br/>\
    /api/v1.0/calc_temps/&lt;start&gt;/&lt;end&gt;<br/>\
    - the `TMIN`, `TAVG`, and `TMAX` for dates between the start and end date inclusive<br/><br/>";

const ABOUT_PAGE: &str = "Welcome to my 'About' page!";

const CONTENT_JSON: &str = "application/json";
const CONTENT_HTML: &str = "text/html; charset=utf-8";

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Failed to start HTTP server on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Failed to serialize response")]
    Serialize(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// A parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    About,
    Precipitation,
    Stations,
    Tobs,
    CalcTemps { start: String, end: Option<String> },
    NotFound,
}

impl Route {
    /// Parses a request URL. The query string is ignored and path segments
    /// are percent-decoded. Dates are not validated here; a malformed date
    /// still routes to `CalcTemps` and fails in the handler.
    pub fn parse(url: &str) -> Route {
        let path = url.split('?').next().unwrap_or_default();

        match path {
            "/" => return Route::Home,
            "/about" => return Route::About,
            "/api/v1.0/precipitation" => return Route::Precipitation,
            "/api/v1.0/stations" => return Route::Stations,
            "/api/v1.0/tobs" => return Route::Tobs,
            _ => {}
        }

        let Some(rest) = path.strip_prefix(CALC_TEMPS_PREFIX) else {
            return Route::NotFound;
        };

        let segments: Vec<String> = rest.split('/').map(decode_segment).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Route::NotFound;
        }

        match segments.as_slice() {
            [start] => Route::CalcTemps { start: start.clone(), end: None },
            [start, end] => Route::CalcTemps { start: start.clone(), end: Some(end.clone()) },
            _ => Route::NotFound,
        }
    }
}

fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// A response ready to be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn html(status: u16, body: &str) -> Self {
        Reply { status, content_type: CONTENT_HTML, body: body.to_string() }
    }

    fn json<T: Serialize>(value: &T) -> Result<Self, EndpointError> {
        Ok(Reply {
            status: 200,
            content_type: CONTENT_JSON,
            body: serde_json::to_string_pretty(value)?,
        })
    }

    fn not_found() -> Self {
        Reply::html(404, "Not Found")
    }

    fn method_not_allowed() -> Self {
        Reply::html(405, "Method Not Allowed")
    }

    fn internal_error() -> Self {
        Reply::html(500, "Internal Server Error")
    }
}

/// Runs the query for `route`. Each call locks the shared connection once.
pub fn handle_route(store: &Store, route: &Route) -> Result<Reply, EndpointError> {
    match route {
        Route::Home => Ok(Reply::html(200, HOME_PAGE)),
        Route::About => Ok(Reply::html(200, ABOUT_PAGE)),
        Route::NotFound => Ok(Reply::not_found()),
        Route::Precipitation => {
            let conn = store.lock();
            Reply::json(&queries::precipitation_by_date(&conn)?)
        }
        Route::Stations => {
            let conn = store.lock();
            let stations = queries::distinct_stations(&conn)?;
            Reply::json(&interleave_stations(&stations))
        }
        Route::Tobs => {
            let conn = store.lock();
            Reply::json(&queries::tobs_by_date(&conn)?)
        }
        Route::CalcTemps { start, end } => {
            let conn = store.lock();
            Reply::json(&queries::temperature_stats(&conn, start, end.as_deref())?)
        }
    }
}

/// Handles one request end to end. Failures become a generic 500 and are
/// logged; the client never sees error details.
pub fn handle_request(store: &Store, method: &Method, url: &str) -> Reply {
    info!("{} {}", method, url);

    let route = Route::parse(url);
    if route == Route::NotFound {
        return Reply::not_found();
    }
    if !matches!(method, Method::Get | Method::Head) {
        return Reply::method_not_allowed();
    }

    match handle_route(store, &route) {
        Ok(reply) => reply,
        Err(e) => {
            error!("{} {} failed: {}", method, url, error_chain(&e));
            Reply::internal_error()
        }
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Create HTTP response from a reply
fn to_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_data(reply.body.into_bytes())
        .with_status_code(StatusCode::from(reply.status));

    match Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(_) => response,
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// A bound listener that has not started serving yet.
pub struct EndpointServer {
    server: Server,
}

impl EndpointServer {
    /// Bind to `addr` (`host:port`). Port 0 picks a free port.
    pub fn bind(addr: &str) -> Result<Self, EndpointError> {
        let server = Server::http(addr).map_err(|e| EndpointError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { server })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve requests until the process exits, dispatching each onto a pool
    /// of `workers` threads.
    pub fn serve(self, store: Arc<Store>, workers: usize) {
        let pool = ThreadPool::new(workers.max(1));

        for request in self.server.incoming_requests() {
            let store = Arc::clone(&store);
            pool.execute(move || {
                let reply = handle_request(&store, request.method(), request.url());
                if let Err(e) = request.respond(to_response(reply)) {
                    warn!("Failed to send response: {}", e);
                }
            });
        }
    }
}

/// Start HTTP endpoint server with the configured address and worker count
pub fn start_endpoint_server(config: &ServiceConfig, store: Arc<Store>) -> Result<(), EndpointError> {
    let server = EndpointServer::bind(&config.listen_addr())?;

    match server.local_addr() {
        Some(addr) => info!("HTTP endpoint listening on http://{}", addr),
        None => info!("HTTP endpoint listening on {}", config.listen_addr()),
    }
    info!("   GET /api/v1.0/precipitation");
    info!("   GET /api/v1.0/stations");
    info!("   GET /api/v1.0/tobs");
    info!("   GET /api/v1.0/calc_temps/{{start}}[/{{end}}]");

    server.serve(store, config.workers);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
