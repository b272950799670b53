use super::{build_response, ApiState};
use crate::error::ApiError;
use serde_json::Value;
use tracing::warn;
use warp::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use warp::{Filter, Reply};

pub fn routes(
    state: &ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    status(state.clone())
        .or(webcam(state.clone()))
        .or(token(state.clone()))
}

/// GET api/status
///
/// The latest biodome status. Served from the cache while it is fresh,
/// otherwise fetched live. If the upstream is down, a stale cached payload
/// is returned with `"_stale": true`.
fn status(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "status"))
        .and_then(|state: ApiState| async move {
            if let Some(payload) = state.cache.get() {
                return build_response(Ok(payload));
            }

            let resp = match state.upstream.fetch_status().await {
                Ok(payload) => {
                    state.cache.put(payload.clone());
                    Ok(payload)
                }
                Err(e) => match state.cache.get_stale() {
                    Some(stale) => {
                        warn!("Serving stale status: {}", e);
                        Ok(stale)
                    }
                    None => Err(ApiError::upstream("Unable to fetch status", e)),
                },
            };
            build_response::<Value>(resp)
        })
        .boxed()
}

/// GET api/webcam
///
/// Proxies the current webcam image, never cached by clients
fn webcam(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "webcam"))
        .and_then(|state: ApiState| async move {
            match state.upstream.fetch_webcam().await {
                Ok(image) => {
                    let reply = warp::reply::with_header(image.bytes, CONTENT_TYPE, image.content_type);
                    Ok(warp::reply::with_header(reply, CACHE_CONTROL, "no-cache").into_response())
                }
                Err(e) => build_response::<()>(Err(ApiError::upstream("Webcam unavailable", e))),
            }
        })
        .boxed()
}

/// GET api/token
///
/// Live token metrics, passed through as received
fn token(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "token"))
        .and_then(|state: ApiState| async move {
            let resp = state
                .upstream
                .fetch_token()
                .await
                .map_err(|e| ApiError::upstream("Unable to fetch token data", e));
            build_response(resp)
        })
        .boxed()
}
