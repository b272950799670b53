use biodome_core::{StatusMessage, TokenMessage};
use chrono::Utc;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;

use super::aggregate;
use super::schema;
use super::sensor_reading;
use super::token_metrics;
use super::verdant_output;
use super::*;

/// A schema of its own per test, so concurrent tests see only their rows
struct TestDb {
    conn: PgPool,
    admin: PgPool,
    search_path: String,
}

impl TestDb {
    async fn cleanup(self) {
        self.conn.close().await;
        sql_stmnt!(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.search_path))
            .execute(&self.admin)
            .await
            .ok();
    }
}

/// Connects to `DATABASE_URL`, tests return early without one
async fn test_db(name: &str) -> Option<TestDb> {
    dotenv::dotenv().ok();
    let url = std::env::var("DATABASE_URL").ok()?;
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();

    let search_path = format!("biodome_test_{}_{}", name, std::process::id());
    sql_stmnt!(&format!("DROP SCHEMA IF EXISTS {} CASCADE", search_path))
        .execute(&admin)
        .await
        .unwrap();
    sql_stmnt!(&format!("CREATE SCHEMA {}", search_path))
        .execute(&admin)
        .await
        .unwrap();

    let options = PgConnectOptions::from_str(&url)
        .unwrap()
        .options([("search_path", search_path.as_str()), ("TimeZone", "UTC")]);
    let conn = PgPoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .unwrap();
    assert_eq!(schema::statements().len(), schema::initialize(&conn).await);

    Some(TestDb {
        conn,
        admin,
        search_path,
    })
}

/// Inserts a reading `units_ago` whole units (`minute`, `hour`, `day`) before
/// the start of the current unit, plus `minute` minutes
async fn insert_at(
    conn: &PgPool,
    unit: &str,
    units_ago: i32,
    minute: i32,
    air_temp: f64,
    grow_light: bool,
) {
    let stmt = format!(
        "INSERT INTO sensor_readings (recorded_at, air_temp, grow_light)
            VALUES (date_trunc('{unit}', NOW()) - ($1::int * INTERVAL '1 {unit}')
                + ($2::int * INTERVAL '1 minute'), $3, $4)"
    );
    sql_stmnt!(&stmt, units_ago, minute, air_temp, grow_light)
        .execute(conn)
        .await
        .unwrap();
}

fn status(air_temp: f64, humidity: f64, vpd: f64) -> StatusMessage {
    StatusMessage::from_value(&serde_json::json!({
        "timestamp": Utc::now().to_rfc3339(),
        "sol_day": 42,
        "sensors": {"air_temp": air_temp, "humidity": humidity, "vpd": vpd},
        "devices": {"grow_light": true}
    }))
    .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let Some(db) = test_db("health").await else {
        return;
    };
    let health = health_check(&db.conn).await;
    assert!(health.ok);
    assert!(health.timestamp.is_some());
    assert!(health.error.is_none());
    db.cleanup().await;
}

#[tokio::test]
async fn test_health_check_unreachable() {
    let conn = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(1))
        .connect_lazy("postgres://biodome@127.0.0.1:1/biodome")
        .unwrap();
    let health = health_check(&conn).await;
    assert!(!health.ok);
    assert!(health.timestamp.is_none());
    assert!(health.error.is_some());
}

#[tokio::test]
async fn test_schema_is_idempotent() {
    let Some(db) = test_db("schema").await else {
        return;
    };
    let expected = schema::statements().len();
    assert_eq!(expected, schema::initialize(&db.conn).await);
    db.cleanup().await;
}

#[tokio::test]
async fn crud_sensor_readings() {
    let Some(db) = test_db("readings").await else {
        return;
    };
    let conn = &db.conn;
    assert!(sensor_reading::get_latest(conn).await.unwrap().is_none());

    // create, missing fields become NULL and false
    let partial = StatusMessage::from_value(&serde_json::json!({
        "sensors": {"air_temp": 22.5, "humidity": 55},
        "devices": {"grow_light": true}
    }))
    .unwrap();
    let inserted = conn.store_sensor_reading(&partial).await.unwrap();

    // read
    let latest = sensor_reading::get_latest(conn).await.unwrap().unwrap();
    assert_eq!(inserted.id, latest.id());
    assert_eq!(inserted.recorded_at, latest.recorded_at());
    assert_eq!(Some(22.5), latest.air_temp);
    assert_eq!(Some(55.0), latest.humidity);
    assert_eq!(None, latest.vpd);
    assert_eq!(None, latest.co2);
    assert_eq!(None, latest.source_timestamp);
    assert_eq!(None, latest.sol_day);
    assert!(latest.grow_light);
    assert!(!latest.heat_mat);
    assert!(!latest.humidifier);

    assert_eq!(1, sensor_reading::count(conn).await.unwrap());
    db.cleanup().await;
}

#[tokio::test]
async fn test_readings_window() {
    let Some(db) = test_db("window").await else {
        return;
    };
    let conn = &db.conn;
    insert_at(conn, "minute", 5, 0, 21.0, false).await;
    insert_at(conn, "minute", 30, 0, 20.0, false).await;
    insert_at(conn, "minute", 180, 0, 19.0, false).await;

    let readings = sensor_reading::get(conn, 1, 2000, 0).await.unwrap();
    let temps: Vec<_> = readings.iter().map(|r| r.air_temp).collect();
    assert_eq!(vec![Some(21.0), Some(20.0)], temps);

    let paged = sensor_reading::get(conn, 1, 1, 1).await.unwrap();
    assert_eq!(1, paged.len());
    assert_eq!(Some(20.0), paged[0].air_temp);

    assert_eq!(3, sensor_reading::get(conn, 4, 2000, 0).await.unwrap().len());
    assert_eq!(3, sensor_reading::count(conn).await.unwrap());
    db.cleanup().await;
}

#[tokio::test]
async fn test_verdant_dedup() {
    let Some(db) = test_db("verdant").await else {
        return;
    };
    let conn = &db.conn;
    let text = "Sol 7: the basil is leaning toward the lamp.";

    let first = conn.store_verdant_output(Some(7), text).await.unwrap();
    assert!(first.is_some());
    let second = conn.store_verdant_output(Some(8), text).await.unwrap();
    assert!(second.is_none());

    let latest = verdant_output::get_latest(conn).await.unwrap().unwrap();
    assert_eq!(first, Some(latest.id));
    assert_eq!(text, latest.output_text());
    assert_eq!(verdant_output::content_hash(text), latest.output_hash);
    assert_eq!(Some(7), latest.sol_day);
    db.cleanup().await;
}

#[tokio::test]
async fn test_hourly_buckets() {
    let Some(db) = test_db("hourly").await else {
        return;
    };
    let conn = &db.conn;
    // 4h ago: 1 reading, 3h ago: 3 readings, 1h ago: 2 readings, 10h ago: outside
    insert_at(conn, "hour", 4, 15, 20.0, false).await;
    for minute in [5, 25, 45] {
        insert_at(conn, "hour", 3, minute, 21.0, false).await;
    }
    insert_at(conn, "hour", 1, 10, 22.0, false).await;
    insert_at(conn, "hour", 1, 50, 23.0, false).await;
    insert_at(conn, "hour", 10, 0, 30.0, false).await;

    let hourly = aggregate::get_hourly(conn, 6).await.unwrap();

    assert_eq!(3, hourly.len());
    let counts: Vec<_> = hourly.iter().map(|b| b.reading_count()).collect();
    assert_eq!(vec![1, 3, 2], counts);
    assert_eq!(
        chrono::Duration::hours(1),
        hourly[1].hour() - hourly[0].hour()
    );
    assert_eq!(
        chrono::Duration::hours(2),
        hourly[2].hour() - hourly[1].hour()
    );
    assert_eq!(Some(20.0), hourly[0].avg_temp);
    assert_eq!(Some(21.0), hourly[1].avg_temp);
    assert_eq!(Some(22.5), hourly[2].avg_temp);
    db.cleanup().await;
}

#[tokio::test]
async fn test_daily_buckets() {
    let Some(db) = test_db("daily").await else {
        return;
    };
    let conn = &db.conn;
    // 3 days ago: 3 readings, 2 days ago: 2, 1 day ago: 1, 40 days ago: outside
    for (days_ago, temps) in [(3, vec![18.0, 19.0, 23.0]), (2, vec![20.0, 21.0]), (1, vec![22.0])]
    {
        for (i, temp) in temps.into_iter().enumerate() {
            insert_at(conn, "day", days_ago, 60 * (i as i32 + 1), temp, false).await;
        }
    }
    insert_at(conn, "day", 40, 60, 30.0, false).await;

    let daily = aggregate::get_daily(conn, 30).await.unwrap();

    assert_eq!(3, daily.len());
    let counts: Vec<_> = daily.iter().map(|b| b.reading_count()).collect();
    assert_eq!(vec![3, 2, 1], counts);
    for pair in daily.windows(2) {
        assert_eq!(chrono::Duration::days(1), pair[1].day() - pair[0].day());
    }
    assert_eq!(Some(20.0), daily[0].avg_temp);
    assert_eq!(Some(18.0), daily[0].min_temp);
    assert_eq!(Some(23.0), daily[0].max_temp);
    db.cleanup().await;
}

#[tokio::test]
async fn test_stats_24h() {
    let Some(db) = test_db("stats").await else {
        return;
    };
    let conn = &db.conn;
    conn.store_sensor_reading(&status(20.004, 60.0, 1.0))
        .await
        .unwrap();
    conn.store_sensor_reading(&status(22.0, 61.0, 1.5))
        .await
        .unwrap();
    conn.store_sensor_reading(&status(24.567, 62.0, 1.12345))
        .await
        .unwrap();
    insert_at(conn, "hour", 30, 0, 99.0, false).await;

    let stats = aggregate::get_stats_24h(conn).await.unwrap();

    assert_eq!(3, stats.readings_count());
    assert_eq!(Some(22.19), stats.avg_temp);
    assert_eq!(Some(20.0), stats.min_temp);
    assert_eq!(Some(24.57), stats.max_temp);
    assert_eq!(Some(61.0), stats.avg_humidity);
    assert_eq!(Some(1.2078), stats.avg_vpd);
    assert_eq!(Some(1.5), stats.max_vpd);
    assert_eq!(None, stats.avg_co2);
    assert_eq!(4, sensor_reading::count(conn).await.unwrap());
    db.cleanup().await;
}

#[tokio::test]
async fn test_device_history() {
    let Some(db) = test_db("devices").await else {
        return;
    };
    let conn = &db.conn;
    insert_at(conn, "minute", 90, 0, 20.0, true).await;
    insert_at(conn, "minute", 30, 0, 21.0, false).await;
    insert_at(conn, "minute", 600, 0, 22.0, true).await;

    let devices = sensor_reading::get_devices(conn, 6).await.unwrap();
    let lights: Vec<_> = devices.iter().map(|d| d.grow_light).collect();
    assert_eq!(vec![true, false], lights);
    assert!(devices[0].recorded_at < devices[1].recorded_at);
    assert!(devices.iter().all(|d| !d.heat_mat && !d.humidifier));

    let climate = sensor_reading::get_climate(conn, 6).await.unwrap();
    let temps: Vec<_> = climate.iter().map(|c| c.air_temp).collect();
    assert_eq!(vec![Some(20.0), Some(21.0)], temps);
    db.cleanup().await;
}

#[tokio::test]
async fn crud_token_metrics() {
    let Some(db) = test_db("token").await else {
        return;
    };
    let conn = &db.conn;
    assert!(token_metrics::get_latest(conn).await.unwrap().is_none());

    let token = TokenMessage {
        market_cap: Some(31.5),
        usd_market_cap: Some(5200.25),
        ath_market_cap: None,
        num_participants: Some(120),
        reply_count: None,
        complete: true,
    };
    let first = conn.store_token_metrics(&token).await.unwrap();
    let second = conn
        .store_token_metrics(&TokenMessage {
            complete: false,
            ..token.clone()
        })
        .await
        .unwrap();

    let history = token_metrics::get(conn, 24).await.unwrap();
    let ids: Vec<_> = history.iter().map(|row| row.id).collect();
    assert_eq!(vec![first.id, second.id], ids);
    let row = &history[0];
    assert_eq!(Some(31.5), row.market_cap_sol);
    assert_eq!(Some(5200.25), row.market_cap_usd);
    assert_eq!(None, row.ath_market_cap);
    assert_eq!(Some(120), row.num_participants);
    assert!(row.is_graduated);

    let latest = token_metrics::get_latest(conn).await.unwrap().unwrap();
    assert_eq!(second.id, latest.id);
    assert!(!latest.is_graduated);
    db.cleanup().await;
}
