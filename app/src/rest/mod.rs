use crate::cache::StatusCache;
use crate::error::ApiError;
use crate::upstream::Upstream;
use serde::Serialize;
use sqlx::PgPool;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::{Filter, Reply};

mod history_routes;
mod metric_routes;
mod query;
mod status_routes;

/// Everything a request handler may touch
#[derive(Clone)]
pub struct ApiState {
    pub db_conn: PgPool,
    pub upstream: Arc<dyn Upstream>,
    pub cache: Arc<StatusCache>,
    pub started: Instant,
}

pub fn routes(
    state: &ApiState,
    static_dir: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let cors = warp::cors().allow_any_origin().allow_methods(vec!["GET"]);

    status_routes::routes(state)
        .or(history_routes::routes(state))
        .or(metric_routes::routes(state))
        .or(static_files(static_dir))
        .recover(handle_rejection)
        .with(cors)
}

/// Serves the dashboard itself from `static_dir`
fn static_files(
    static_dir: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let index = warp::get()
        .and(warp::path::end())
        .and(warp::fs::file(static_dir.join("index.html")));
    index.or(warp::get().and(warp::fs::dir(static_dir))).boxed()
}

pub fn build_response<T: Serialize>(
    resp: Result<T, ApiError>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match resp {
        Ok(data) => Ok(warp::reply::json(&data).into_response()),
        Err(err) => Ok(error_response(err)),
    }
}

fn error_response(err: ApiError) -> warp::reply::Response {
    let (status, body) = match err {
        ApiError::Upstream { context, source } => {
            warn!("{}: {}", context, source);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                dto::ErrorResponseDto {
                    error: context.to_owned(),
                    message: None,
                },
            )
        }
        ApiError::Database(err) => {
            error!("Database error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                dto::ErrorResponseDto {
                    error: "Database error".to_owned(),
                    message: Some(err.to_string()),
                },
            )
        }
        ApiError::NotFound(path) => (
            StatusCode::NOT_FOUND,
            dto::ErrorResponseDto {
                error: "Not found".to_owned(),
                message: Some(path),
            },
        ),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn handle_rejection(err: warp::Rejection) -> Result<warp::reply::Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_response(ApiError::NotFound(
            "No such resource".to_owned(),
        )));
    }

    let (status, error) = if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query")
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };
    let body = dto::ErrorResponseDto {
        error: error.to_owned(),
        message: None,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}

/// Serves until `cancel` fires
pub async fn dispatch_server(
    state: ApiState,
    static_dir: PathBuf,
    port: u16,
    cancel: CancellationToken,
) -> Result<(), warp::Error> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let routes = routes(&state, static_dir).with(warp::trace::request());
    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async move { cancel.cancelled().await })?;

    info!("Starting webserver at: {}", addr);
    server.await;
    info!("Webserver stopped");
    Ok(())
}

pub mod dto {
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct ErrorResponseDto {
        pub error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub message: Option<String>,
    }
}
