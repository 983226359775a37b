//! Shape of one telemetry log line.
//!
//! Missing fields decode to their defaults; only malformed JSON or a value
//! of the wrong type rejects a line.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelemetrySample {
    pub battery: Battery,
    pub gps: Gps,
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Battery {
    pub resp_time: String,
    pub life: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Gps {
    pub resp_time: String,
    pub latitude: String,
    pub longitude: String,
}

/// Radio channel as seen from the logging node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub node: String,
    pub rssi: Rssi,
    pub nbrs: Vec<Neighbor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rssi {
    pub resp_time: String,
    pub rssi: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Neighbor {
    pub hops: Vec<Hop>,
    pub node: i64,
    pub cost: i64,
    pub adj: String,
    pub island: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Hop {
    pub node: String,
    pub cost: String,
}

impl TelemetrySample {
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
