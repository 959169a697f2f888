//! Reservation lifecycle requests as accepted from callers.
//!
//! Field names accept both camelCase and snake_case. Boolean flags accept
//! JSON booleans, numbers or strings; argument lists accept a list or a
//! single scalar.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WakeOptions {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default, alias = "pingTarget")]
    pub ping_target: Option<String>,
    #[serde(default)]
    pub attempts: Option<u32>,
    /// Seconds to wait before each probe
    #[serde(default, alias = "pingTimeout")]
    pub ping_timeout: Option<f64>,
    #[serde(default)]
    pub broadcast: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowerAction {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "flexible::args")]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReservation {
    #[serde(default, alias = "reservation_id")]
    pub reservation_id: String,
    #[serde(default, alias = "hostName")]
    pub host: String,
    #[serde(default, alias = "lab_id")]
    pub lab_id: Option<String>,
    #[serde(default = "enabled", deserialize_with = "flexible::flag")]
    pub wake: bool,
    #[serde(default = "enabled", deserialize_with = "flexible::flag")]
    pub prepare: bool,
    #[serde(default, alias = "guard_grace")]
    pub guard_grace: Option<u32>,
    #[serde(default, alias = "prepare_args", deserialize_with = "flexible::args")]
    pub prepare_args: Option<Vec<String>>,
    #[serde(default, alias = "wake_options")]
    pub wake_options: Option<WakeOptions>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndReservation {
    #[serde(default, alias = "reservation_id")]
    pub reservation_id: String,
    #[serde(default, alias = "hostName")]
    pub host: String,
    #[serde(default, alias = "lab_id")]
    pub lab_id: Option<String>,
    #[serde(default = "enabled", deserialize_with = "flexible::flag")]
    pub release: bool,
    #[serde(default, alias = "release_args", deserialize_with = "flexible::args")]
    pub release_args: Option<Vec<String>>,
    #[serde(default, alias = "power_action")]
    pub power_action: Option<PowerAction>,
}

impl StartReservation {
    pub fn new(reservation_id: &str, host: &str) -> Self {
        Self {
            reservation_id: reservation_id.to_string(),
            host: host.to_string(),
            lab_id: None,
            wake: true,
            prepare: true,
            guard_grace: None,
            prepare_args: None,
            wake_options: None,
        }
    }
}

impl EndReservation {
    pub fn new(reservation_id: &str, host: &str) -> Self {
        Self {
            reservation_id: reservation_id.to_string(),
            host: host.to_string(),
            lab_id: None,
            release: true,
            release_args: None,
            power_action: None,
        }
    }
}

fn enabled() -> bool {
    true
}

pub mod flexible {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// `"false"`, `"0"`, `"no"` and `"off"` (any case) are false; null keeps
    /// the field default of true.
    pub fn parse_flag(value: &Value, default: bool) -> bool {
        match value {
            Value::Null => default,
            Value::Bool(b) => *b,
            Value::String(s) => !matches!(s.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(default),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
        }
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(parse_flag(&value, true))
    }

    pub fn args<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => None,
            Value::Array(items) => Some(items.iter().map(scalar_text).collect()),
            other => Some(vec![scalar_text(&other)]),
        })
    }

    fn scalar_text(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
