use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient;

/// Payload of the biodome status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Timestamp reported by the biodome itself, kept verbatim
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i32")]
    pub sol_day: Option<i32>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub sensors: SensorValues,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub devices: DeviceStates,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub verdant_output: Option<String>,
}

impl StatusMessage {
    /// Decodes a status payload, which must be a JSON object
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        lenient::expect_object(value)?;
        Self::deserialize(value)
    }

    /// The narrative output, if the payload carries a non-empty one
    pub fn verdant_text(&self) -> Option<&str> {
        self.verdant_output.as_deref().filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorValues {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub air_temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub vpd: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub soil_moisture: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub co2: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub leaf_temp_delta: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStates {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub grow_light: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub heat_mat: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub circulation_fan: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub exhaust_fan: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub water_pump: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub humidifier: bool,
}

/// Payload of the token metrics endpoint.
///
/// Market caps are reported in SOL (`market_cap`) and USD (`usd_market_cap`),
/// `complete` flags a token that graduated off the bonding curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMessage {
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub usd_market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub ath_market_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub num_participants: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub reply_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub complete: bool,
}

impl TokenMessage {
    /// Decodes a token payload, which must be a JSON object
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        lenient::expect_object(value)?;
        Self::deserialize(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_status() {
        let value = json!({
            "sensors": { "air_temp": 22.5, "humidity": 55 },
            "devices": { "grow_light": true }
        });

        let status = StatusMessage::from_value(&value).unwrap();

        assert_eq!(Some(22.5), status.sensors.air_temp);
        assert_eq!(Some(55.0), status.sensors.humidity);
        assert_eq!(None, status.sensors.vpd);
        assert_eq!(None, status.sensors.co2);
        assert!(status.devices.grow_light);
        assert!(!status.devices.heat_mat);
        assert!(!status.devices.humidifier);
        assert_eq!(None, status.timestamp);
        assert_eq!(None, status.sol_day);
        assert_eq!(None, status.verdant_text());
    }

    #[test]
    fn test_empty_status() {
        let status = StatusMessage::from_value(&json!({})).unwrap();
        assert_eq!(StatusMessage::default(), status);
    }

    #[test]
    fn test_null_sections() {
        let value = json!({ "sensors": null, "devices": "offline", "sol_day": null });
        let status = StatusMessage::from_value(&value).unwrap();
        assert_eq!(SensorValues::default(), status.sensors);
        assert_eq!(DeviceStates::default(), status.devices);
        assert_eq!(None, status.sol_day);
    }

    #[test]
    fn test_mistyped_fields() {
        let value = json!({
            "timestamp": "2025-01-14T10:00:00Z",
            "sol_day": "12",
            "sensors": { "air_temp": "21.25", "co2": "n/a", "vpd": 0 },
            "devices": { "heat_mat": 1, "exhaust_fan": "on", "water_pump": "off" },
            "verdant_output": ""
        });

        let status = StatusMessage::from_value(&value).unwrap();

        assert_eq!(Some("2025-01-14T10:00:00Z"), status.timestamp.as_deref());
        assert_eq!(Some(12), status.sol_day);
        assert_eq!(Some(21.25), status.sensors.air_temp);
        assert_eq!(None, status.sensors.co2);
        assert_eq!(Some(0.0), status.sensors.vpd);
        assert!(status.devices.heat_mat);
        assert!(status.devices.exhaust_fan);
        assert!(!status.devices.water_pump);
        assert_eq!(None, status.verdant_text());
    }

    #[test]
    fn test_verdant_text() {
        let status = StatusMessage::from_value(&json!({
            "sol_day": 4,
            "verdant_output": "Leaves are turning toward the light."
        }))
        .unwrap();
        assert_eq!(Some("Leaves are turning toward the light."), status.verdant_text());
    }

    #[test]
    fn test_status_rejects_non_object() {
        let positional = json!([
            "2025-01-01T00:00:00Z",
            7,
            {"air_temp": 30.0},
            {"heat_mat": true},
            "hello"
        ]);
        assert!(StatusMessage::from_value(&positional).is_err());
        assert!(StatusMessage::from_value(&json!([1, 2, 3])).is_err());
        assert!(StatusMessage::from_value(&json!("offline")).is_err());
        assert!(StatusMessage::from_value(&Value::Null).is_err());
    }

    #[test]
    fn test_positional_sections_ignored() {
        let value = json!({
            "sensors": [21.5, 40.0],
            "devices": [true, true]
        });
        let status = StatusMessage::from_value(&value).unwrap();
        assert_eq!(SensorValues::default(), status.sensors);
        assert_eq!(DeviceStates::default(), status.devices);
    }

    #[test]
    fn test_token_rejects_non_object() {
        assert!(TokenMessage::from_value(&json!([31.5, 5120.75, 9001.0, 42, 7, true])).is_err());
        assert!(TokenMessage::from_value(&json!(42)).is_err());
    }

    #[test]
    fn test_token_out_of_range_counts() {
        let value = json!({"num_participants": 1e20, "reply_count": -1e19});
        let token = TokenMessage::from_value(&value).unwrap();
        assert_eq!(None, token.num_participants);
        assert_eq!(None, token.reply_count);
    }

    #[test]
    fn test_token_message() {
        let value = json!({
            "mint": "jk1T35eWK41MBMM8AWoYVaNbjHEEQzMDetTsfnqpump",
            "market_cap": 31.5,
            "usd_market_cap": 5120.75,
            "ath_market_cap": 9001.0,
            "num_participants": 42,
            "reply_count": 7.0,
            "complete": false
        });

        let token = TokenMessage::from_value(&value).unwrap();

        assert_eq!(Some(31.5), token.market_cap);
        assert_eq!(Some(5120.75), token.usd_market_cap);
        assert_eq!(Some(9001.0), token.ath_market_cap);
        assert_eq!(Some(42), token.num_participants);
        assert_eq!(Some(7), token.reply_count);
        assert!(!token.complete);
    }
}
