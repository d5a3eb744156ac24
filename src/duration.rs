//! Config durations written as seconds
//!
//! `"reconnect_delay": 2` and `"analysis_timeout": 0.25` are both accepted,
//! as is serde's native `{"secs": 2, "nanos": 0}` form.

use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(f64),
    Parts {
        secs: u64,
        #[serde(default)]
        nanos: u32,
    },
}

/// `deserialize_with` helper for [`Duration`] fields
pub(crate) fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Duration::try_from_secs_f64(secs).map_err(D::Error::custom),
        RawDuration::Parts { secs, nanos } => Ok(Duration::new(secs, nanos)),
    }
}
