use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DBError;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct HourlyAverageDao {
    pub(crate) hour: DateTime<Utc>,
    pub(crate) avg_temp: Option<f64>,
    pub(crate) avg_humidity: Option<f64>,
    pub(crate) avg_vpd: Option<f64>,
    pub(crate) avg_soil_moisture: Option<f64>,
    pub(crate) avg_co2: Option<f64>,
    pub(crate) avg_leaf_delta: Option<f64>,
    pub(crate) reading_count: i64,
}

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct DailyAverageDao {
    pub(crate) day: DateTime<Utc>,
    pub(crate) sol_day: Option<i32>,
    pub(crate) avg_temp: Option<f64>,
    pub(crate) min_temp: Option<f64>,
    pub(crate) max_temp: Option<f64>,
    pub(crate) avg_humidity: Option<f64>,
    pub(crate) avg_vpd: Option<f64>,
    pub(crate) avg_soil_moisture: Option<f64>,
    pub(crate) avg_co2: Option<f64>,
    pub(crate) reading_count: i64,
}

/// Summary of the trailing 24 hours, every value is null without readings
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Stats24hDao {
    pub(crate) readings_count: i64,
    pub(crate) avg_temp: Option<f64>,
    pub(crate) min_temp: Option<f64>,
    pub(crate) max_temp: Option<f64>,
    pub(crate) avg_humidity: Option<f64>,
    pub(crate) min_humidity: Option<f64>,
    pub(crate) max_humidity: Option<f64>,
    pub(crate) avg_vpd: Option<f64>,
    pub(crate) min_vpd: Option<f64>,
    pub(crate) max_vpd: Option<f64>,
    pub(crate) avg_soil: Option<f64>,
    pub(crate) min_soil: Option<f64>,
    pub(crate) max_soil: Option<f64>,
    pub(crate) avg_co2: Option<f64>,
    pub(crate) min_co2: Option<f64>,
    pub(crate) max_co2: Option<f64>,
}

impl HourlyAverageDao {
    pub fn hour(&self) -> DateTime<Utc> {
        self.hour
    }

    pub fn reading_count(&self) -> i64 {
        self.reading_count
    }
}

impl DailyAverageDao {
    pub fn day(&self) -> DateTime<Utc> {
        self.day
    }

    pub fn reading_count(&self) -> i64 {
        self.reading_count
    }
}

impl Stats24hDao {
    pub fn readings_count(&self) -> i64 {
        self.readings_count
    }
}

pub async fn get_hourly(
    conn: &sqlx::PgPool,
    hours: i32,
) -> Result<Vec<HourlyAverageDao>, DBError> {
    Ok(sql_stmnt!(
        HourlyAverageDao,
        r#"SELECT
                date_trunc('hour', recorded_at) AS hour,
                ROUND(AVG(air_temp)::numeric, 2)::float8 AS avg_temp,
                ROUND(AVG(humidity)::numeric, 2)::float8 AS avg_humidity,
                ROUND(AVG(vpd)::numeric, 4)::float8 AS avg_vpd,
                ROUND(AVG(soil_moisture)::numeric, 2)::float8 AS avg_soil_moisture,
                ROUND(AVG(co2)::numeric, 2)::float8 AS avg_co2,
                ROUND(AVG(leaf_temp_delta)::numeric, 2)::float8 AS avg_leaf_delta,
                COUNT(*) AS reading_count
            FROM sensor_readings
            WHERE recorded_at > NOW() - ($1::int * INTERVAL '1 hour')
            GROUP BY 1
            ORDER BY 1 ASC"#,
        hours
    )
    .fetch_all(conn)
    .await?)
}

pub async fn get_daily(conn: &sqlx::PgPool, days: i32) -> Result<Vec<DailyAverageDao>, DBError> {
    Ok(sql_stmnt!(
        DailyAverageDao,
        r#"SELECT
                date_trunc('day', recorded_at) AS day,
                MAX(sol_day) AS sol_day,
                ROUND(AVG(air_temp)::numeric, 2)::float8 AS avg_temp,
                ROUND(MIN(air_temp)::numeric, 2)::float8 AS min_temp,
                ROUND(MAX(air_temp)::numeric, 2)::float8 AS max_temp,
                ROUND(AVG(humidity)::numeric, 2)::float8 AS avg_humidity,
                ROUND(AVG(vpd)::numeric, 4)::float8 AS avg_vpd,
                ROUND(AVG(soil_moisture)::numeric, 2)::float8 AS avg_soil_moisture,
                ROUND(AVG(co2)::numeric, 2)::float8 AS avg_co2,
                COUNT(*) AS reading_count
            FROM sensor_readings
            WHERE recorded_at > NOW() - ($1::int * INTERVAL '1 day')
            GROUP BY 1
            ORDER BY 1 ASC"#,
        days
    )
    .fetch_all(conn)
    .await?)
}

pub async fn get_stats_24h(conn: &sqlx::PgPool) -> Result<Stats24hDao, DBError> {
    Ok(sql_stmnt!(
        Stats24hDao,
        r#"SELECT
                COUNT(*) AS readings_count,
                ROUND(AVG(air_temp)::numeric, 2)::float8 AS avg_temp,
                ROUND(MIN(air_temp)::numeric, 2)::float8 AS min_temp,
                ROUND(MAX(air_temp)::numeric, 2)::float8 AS max_temp,
                ROUND(AVG(humidity)::numeric, 2)::float8 AS avg_humidity,
                ROUND(MIN(humidity)::numeric, 2)::float8 AS min_humidity,
                ROUND(MAX(humidity)::numeric, 2)::float8 AS max_humidity,
                ROUND(AVG(vpd)::numeric, 4)::float8 AS avg_vpd,
                ROUND(MIN(vpd)::numeric, 4)::float8 AS min_vpd,
                ROUND(MAX(vpd)::numeric, 4)::float8 AS max_vpd,
                ROUND(AVG(soil_moisture)::numeric, 2)::float8 AS avg_soil,
                ROUND(MIN(soil_moisture)::numeric, 2)::float8 AS min_soil,
                ROUND(MAX(soil_moisture)::numeric, 2)::float8 AS max_soil,
                ROUND(AVG(co2)::numeric, 2)::float8 AS avg_co2,
                ROUND(MIN(co2)::numeric, 2)::float8 AS min_co2,
                ROUND(MAX(co2)::numeric, 2)::float8 AS max_co2
            FROM sensor_readings
            WHERE recorded_at > NOW() - INTERVAL '24 hours'"#
    )
    .fetch_one(conn)
    .await?)
}
