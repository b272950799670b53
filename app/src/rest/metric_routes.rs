use super::{build_response, ApiState};
use crate::models::{self, sensor_reading};
use warp::Filter;

pub fn routes(
    state: &ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    health(state.clone())
}

/// GET api/health
///
/// Always answers 200, a failing database only marks the service degraded
fn health(
    state: ApiState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || state.clone())
        .and(warp::get())
        .and(warp::path!("api" / "health"))
        .and_then(|state: ApiState| async move {
            let database = models::health_check(&state.db_conn).await;
            let total_readings = if database.ok {
                sensor_reading::count(&state.db_conn).await.unwrap_or(0)
            } else {
                0
            };

            let ret = dto::HealthDto {
                status: if database.ok { "healthy" } else { "degraded" },
                database,
                total_readings,
                uptime: state.started.elapsed().as_secs_f64(),
                cached_status_age: state.cache.age().map(|age| age.as_millis() as u64),
            };
            build_response(Ok(ret))
        })
        .boxed()
}

mod dto {
    use crate::models::DatabaseHealth;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct HealthDto {
        pub status: &'static str,
        pub database: DatabaseHealth,
        pub total_readings: i64,
        /// Seconds since startup
        pub uptime: f64,
        /// Milliseconds since the cached status was fetched
        pub cached_status_age: Option<u64>,
    }
}
