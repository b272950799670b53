use super::query::WindowQuery;
use super::{build_response, ApiState};
use crate::analytics;
use crate::error::ApiError;
use crate::models::{aggregate, sensor_reading, token_metrics, verdant_output};
use warp::Filter;

const MAX_LIMIT: i64 = 2000;

pub fn routes(
    state: &ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    history(state.clone())
        .or(hourly(state.clone()))
        .or(daily(state.clone()))
        .or(stats(state.clone()))
        .or(token_history(state.clone()))
        .or(token_latest(state.clone()))
        .or(devices_history(state.clone()))
        .or(trends(state.clone()))
        .or(latest(state.clone()))
        .or(latest_verdant(state.clone()))
}

/// GET api/history?hours=24&limit=500&offset=0
///
/// Stored readings of the trailing window, newest first
fn history(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "history"))
        .and(warp::query::<WindowQuery>())
        .and_then(|state: ApiState, query: WindowQuery| async move {
            let hours = query.hours(24);
            let limit = query.limit(500, MAX_LIMIT);
            let resp = sensor_reading::get(&state.db_conn, hours, limit, query.offset())
                .await
                .map(|readings| dto::ReadingsDto {
                    count: readings.len(),
                    hours,
                    readings,
                })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/history/hourly?hours=48
fn hourly(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "history" / "hourly"))
        .and(warp::query::<WindowQuery>())
        .and_then(|state: ApiState, query: WindowQuery| async move {
            let hours = query.hours(48);
            let resp = aggregate::get_hourly(&state.db_conn, hours)
                .await
                .map(|data| dto::HoursDto {
                    count: data.len(),
                    hours,
                    data,
                })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/history/daily?days=30
fn daily(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "history" / "daily"))
        .and(warp::query::<WindowQuery>())
        .and_then(|state: ApiState, query: WindowQuery| async move {
            let days = query.days(30);
            let resp = aggregate::get_daily(&state.db_conn, days)
                .await
                .map(|data| dto::DaysDto {
                    count: data.len(),
                    days,
                    data,
                })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/stats
///
/// Summary of the last 24 hours plus the all-time reading count
fn stats(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "stats"))
        .and_then(|state: ApiState| async move {
            let resp = async {
                let stats = aggregate::get_stats_24h(&state.db_conn).await?;
                let total = sensor_reading::count(&state.db_conn).await?;
                Ok::<_, ApiError>(dto::StatsDto {
                    period: "24h",
                    total_readings_all_time: total,
                    stats,
                })
            }
            .await;
            build_response(resp)
        })
        .boxed()
}

/// GET api/token/history?hours=24
fn token_history(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "token" / "history"))
        .and(warp::query::<WindowQuery>())
        .and_then(|state: ApiState, query: WindowQuery| async move {
            let hours = query.hours(24);
            let resp = token_metrics::get(&state.db_conn, hours)
                .await
                .map(|data| dto::HoursDto {
                    count: data.len(),
                    hours,
                    data,
                })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/token/latest
///
/// The newest stored token metrics, `null` before the first poll
fn token_latest(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "token" / "latest"))
        .and_then(|state: ApiState| async move {
            let resp = token_metrics::get_latest(&state.db_conn)
                .await
                .map(|metrics| dto::LatestTokenDto { metrics })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/devices/history?hours=24
///
/// Actuator states of the trailing window, oldest first
fn devices_history(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "devices" / "history"))
        .and(warp::query::<WindowQuery>())
        .and_then(|state: ApiState, query: WindowQuery| async move {
            let hours = query.hours(24);
            let resp = sensor_reading::get_devices(&state.db_conn, hours)
                .await
                .map(|data| dto::HoursDto {
                    count: data.len(),
                    hours,
                    data,
                })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/analytics/trends?hours=24
///
/// Current value, average and direction of the climate values
fn trends(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "analytics" / "trends"))
        .and(warp::query::<WindowQuery>())
        .and_then(|state: ApiState, query: WindowQuery| async move {
            let hours = query.hours(24);
            let resp = sensor_reading::get_climate(&state.db_conn, hours)
                .await
                .map(|samples| analytics::report(hours, &samples))
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/latest
///
/// The newest stored reading, `null` before the first poll
fn latest(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "latest"))
        .and_then(|state: ApiState| async move {
            let resp = sensor_reading::get_latest(&state.db_conn)
                .await
                .map(|reading| dto::LatestReadingDto { reading })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

/// GET api/verdant/latest
fn latest_verdant(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "verdant" / "latest"))
        .and_then(|state: ApiState| async move {
            let resp = verdant_output::get_latest(&state.db_conn)
                .await
                .map(|output| dto::LatestVerdantDto { output })
                .map_err(ApiError::from);
            build_response(resp)
        })
        .boxed()
}

pub mod dto {
    use crate::models::aggregate::{DailyAverageDao, Stats24hDao};
    use crate::models::sensor_reading::SensorReadingDao;
    use crate::models::token_metrics::TokenMetricsDao;
    use crate::models::verdant_output::VerdantOutputDao;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct ReadingsDto {
        pub count: usize,
        pub hours: i32,
        pub readings: Vec<SensorReadingDao>,
    }

    #[derive(Debug, Serialize)]
    pub struct HoursDto<T> {
        pub count: usize,
        pub hours: i32,
        pub data: Vec<T>,
    }

    #[derive(Debug, Serialize)]
    pub struct DaysDto {
        pub count: usize,
        pub days: i32,
        pub data: Vec<DailyAverageDao>,
    }

    #[derive(Debug, Serialize)]
    pub struct StatsDto {
        pub period: &'static str,
        pub total_readings_all_time: i64,
        #[serde(flatten)]
        pub stats: Stats24hDao,
    }

    #[derive(Debug, Serialize)]
    pub struct LatestReadingDto {
        pub reading: Option<SensorReadingDao>,
    }

    #[derive(Debug, Serialize)]
    pub struct LatestTokenDto {
        pub metrics: Option<TokenMetricsDao>,
    }

    #[derive(Debug, Serialize)]
    pub struct LatestVerdantDto {
        pub output: Option<VerdantOutputDao>,
    }
}
