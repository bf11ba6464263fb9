#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the hotspot map.
//!
//! Asks the configured [`HotSpotSource`] for hot-spots on every request,
//! runs them through the decode and classify pipeline, and hands the
//! front-end render-ready markers.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use hotspot_map_hotspot::{MarkerBatch, MarkerStyle};
use hotspot_map_hotspot_models::MapView;
use hotspot_map_query::{HotSpotQuery, HotSpotSource};
use hotspot_map_server_models::{ApiMarkersResponse, ApiRejectedHotSpot};

/// Listen address and request defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Accuracy used when a request does not pass one.
    pub accuracy: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            accuracy: HotSpotQuery::default().accuracy,
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, and `HOTSPOT_MAP_ACCURACY`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`] with `lookup` standing in for the
    /// environment. Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(p) => p.parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT {p:?}");
                defaults.port
            }),
            None => defaults.port,
        };
        let accuracy = match lookup("HOTSPOT_MAP_ACCURACY") {
            Some(a) => match a.parse() {
                Ok(accuracy) if is_valid_accuracy(accuracy) => accuracy,
                _ => {
                    log::warn!("Ignoring invalid HOTSPOT_MAP_ACCURACY {a:?}");
                    defaults.accuracy
                }
            },
            None => defaults.accuracy,
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            accuracy,
        }
    }
}

/// Whether `accuracy` is a usable geohash prefix length.
#[must_use]
pub const fn is_valid_accuracy(accuracy: u32) -> bool {
    accuracy >= 1 && accuracy as usize <= hotspot_map_geohash::MAX_PRECISION
}

/// Shared application state.
pub struct AppState {
    /// Where hot-spots are fetched from on every request.
    pub source: Arc<dyn HotSpotSource>,
    /// Accuracy used when a request does not pass one.
    pub default_accuracy: u32,
    pub style: MarkerStyle,
    pub view: MapView,
}

impl AppState {
    #[must_use]
    pub fn new(source: Arc<dyn HotSpotSource>, config: &ServerConfig) -> Self {
        Self {
            source,
            default_accuracy: config.accuracy,
            style: MarkerStyle::default(),
            view: MapView::default(),
        }
    }
}

/// Converts a pipeline result into the markers response body.
#[must_use]
pub fn markers_response(received: usize, batch: MarkerBatch) -> ApiMarkersResponse {
    ApiMarkersResponse {
        markers: batch.markers,
        received,
        rejected: batch
            .rejected
            .into_iter()
            .map(|r| ApiRejectedHotSpot {
                geo_location: r.hot_spot.geo_location,
                reason: r.error.to_string(),
            })
            .collect(),
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/view", web::get().to(handlers::view))
            .route("/markers", web::get().to(handlers::markers)),
    );
}

/// Starts the hotspot map API server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(
    source: Arc<dyn HotSpotSource>,
    config: ServerConfig,
) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(source, &config));

    log::info!(
        "Starting server on {}:{} (source={}, accuracy={})",
        config.bind_addr,
        config.port,
        state.source.id(),
        config.accuracy
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
