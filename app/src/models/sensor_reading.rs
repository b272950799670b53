use biodome_core::StatusMessage;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CountRecord, InsertedRecord};
use crate::error::DBError;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct SensorReadingDao {
    pub(crate) id: i32,
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) source_timestamp: Option<String>,
    pub(crate) sol_day: Option<i32>,
    pub(crate) air_temp: Option<f64>,
    pub(crate) humidity: Option<f64>,
    pub(crate) vpd: Option<f64>,
    pub(crate) soil_moisture: Option<f64>,
    pub(crate) co2: Option<f64>,
    pub(crate) leaf_temp_delta: Option<f64>,
    pub(crate) grow_light: bool,
    pub(crate) heat_mat: bool,
    pub(crate) circulation_fan: bool,
    pub(crate) exhaust_fan: bool,
    pub(crate) water_pump: bool,
    pub(crate) humidifier: bool,
}

/// Actuator states of one reading
#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct DeviceStatesDao {
    pub(crate) recorded_at: DateTime<Utc>,
    pub(crate) grow_light: bool,
    pub(crate) heat_mat: bool,
    pub(crate) circulation_fan: bool,
    pub(crate) exhaust_fan: bool,
    pub(crate) water_pump: bool,
    pub(crate) humidifier: bool,
}

/// The values trends are computed from
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct ClimateSampleDao {
    pub(crate) air_temp: Option<f64>,
    pub(crate) humidity: Option<f64>,
    pub(crate) vpd: Option<f64>,
    pub(crate) soil_moisture: Option<f64>,
}

impl SensorReadingDao {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

pub async fn insert(
    conn: &sqlx::PgPool,
    status: &StatusMessage,
) -> Result<InsertedRecord, DBError> {
    let sensors = &status.sensors;
    let devices = &status.devices;
    Ok(sql_stmnt!(
        InsertedRecord,
        r#"INSERT INTO sensor_readings
            (source_timestamp, sol_day, air_temp, humidity, vpd, soil_moisture, co2, leaf_temp_delta,
             grow_light, heat_mat, circulation_fan, exhaust_fan, water_pump, humidifier)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, recorded_at"#,
        status.timestamp.as_deref(),
        status.sol_day,
        sensors.air_temp,
        sensors.humidity,
        sensors.vpd,
        sensors.soil_moisture,
        sensors.co2,
        sensors.leaf_temp_delta,
        devices.grow_light,
        devices.heat_mat,
        devices.circulation_fan,
        devices.exhaust_fan,
        devices.water_pump,
        devices.humidifier
    )
    .fetch_one(conn)
    .await?)
}

pub async fn get_latest(conn: &sqlx::PgPool) -> Result<Option<SensorReadingDao>, DBError> {
    Ok(sql_stmnt!(
        SensorReadingDao,
        r#"SELECT * FROM sensor_readings
            ORDER BY recorded_at DESC LIMIT 1"#
    )
    .fetch_optional(conn)
    .await?)
}

/// Readings of the trailing `hours`, newest first
pub async fn get(
    conn: &sqlx::PgPool,
    hours: i32,
    limit: i64,
    offset: i64,
) -> Result<Vec<SensorReadingDao>, DBError> {
    Ok(sql_stmnt!(
        SensorReadingDao,
        r#"SELECT * FROM sensor_readings
            WHERE recorded_at > NOW() - ($1::int * INTERVAL '1 hour')
            ORDER BY recorded_at DESC
            LIMIT $2 OFFSET $3"#,
        hours,
        limit,
        offset
    )
    .fetch_all(conn)
    .await?)
}

/// Actuator states of the trailing `hours`, oldest first
pub async fn get_devices(
    conn: &sqlx::PgPool,
    hours: i32,
) -> Result<Vec<DeviceStatesDao>, DBError> {
    Ok(sql_stmnt!(
        DeviceStatesDao,
        r#"SELECT recorded_at, grow_light, heat_mat, circulation_fan, exhaust_fan, water_pump, humidifier
            FROM sensor_readings
            WHERE recorded_at > NOW() - ($1::int * INTERVAL '1 hour')
            ORDER BY recorded_at ASC, id ASC"#,
        hours
    )
    .fetch_all(conn)
    .await?)
}

/// Climate values of the trailing `hours`, oldest first
pub async fn get_climate(
    conn: &sqlx::PgPool,
    hours: i32,
) -> Result<Vec<ClimateSampleDao>, DBError> {
    Ok(sql_stmnt!(
        ClimateSampleDao,
        r#"SELECT air_temp, humidity, vpd, soil_moisture
            FROM sensor_readings
            WHERE recorded_at > NOW() - ($1::int * INTERVAL '1 hour')
            ORDER BY recorded_at ASC, id ASC"#,
        hours
    )
    .fetch_all(conn)
    .await?)
}

pub async fn count(conn: &sqlx::PgPool) -> Result<i64, DBError> {
    Ok(
        sql_stmnt!(CountRecord, "SELECT COUNT(*) AS count FROM sensor_readings")
            .fetch_one(conn)
            .await?
            .count(),
    )
}
