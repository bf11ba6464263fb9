//! HTTP handler functions for the hotspot map API.

use actix_web::{HttpResponse, web};
use hotspot_map_hotspot::build_markers;
use hotspot_map_query::HotSpotQuery;
use hotspot_map_server_models::{ApiError, ApiHealth, MarkersQueryParams};

use crate::{AppState, is_valid_accuracy, markers_response};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/view`
///
/// Returns the initial map center and zoom.
pub async fn view(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(&state.view)
}

/// `GET /api/markers`
///
/// Fetches hot-spots from the configured source and returns them as
/// colored markers. Hot-spots that cannot be decoded are listed under
/// `rejected` instead of failing the request.
pub async fn markers(
    state: web::Data<AppState>,
    params: web::Query<MarkersQueryParams>,
) -> HttpResponse {
    let accuracy = params.accuracy.unwrap_or(state.default_accuracy);
    if !is_valid_accuracy(accuracy) {
        return HttpResponse::BadRequest().json(ApiError {
            error: format!(
                "accuracy must be between 1 and {}",
                hotspot_map_geohash::MAX_PRECISION
            ),
        });
    }
    if params.zones == Some(0) {
        return HttpResponse::BadRequest().json(ApiError {
            error: "zones must be at least 1".to_string(),
        });
    }

    let query = HotSpotQuery {
        accuracy,
        zones: params.zones,
    };

    let hot_spots = match state.source.hot_spots(&query).await {
        Ok(hot_spots) => hot_spots,
        Err(e) => {
            log::error!("Hot-spot query via {} failed: {e}", state.source.id());
            return HttpResponse::BadGateway().json(ApiError {
                error: e.to_string(),
            });
        }
    };

    match build_markers(&hot_spots, &state.style) {
        Ok(batch) => HttpResponse::Ok().json(markers_response(hot_spots.len(), batch)),
        Err(e) => {
            log::error!("Marker pipeline failed: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: e.to_string(),
            })
        }
    }
}
