//! Time window encodings shared by detectors and charts.

use serde::{Deserialize, Serialize};

use crate::validation::{ms_to_secs, secs_to_ms};

/// `visualizationOptions.time` / `options.time` as the API encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ApiTime {
    /// A trailing window, in milliseconds.
    Relative {
        /// Window length in ms
        range: i64,
    },
    /// A fixed window, epoch milliseconds.
    Absolute {
        /// Start in ms
        start: i64,
        /// End in ms
        end: i64,
    },
}

impl ApiTime {
    /// Builds the API value from second-valued configuration fields.
    ///
    /// A relative range wins when both are set; validation rejects that
    /// combination before this is reached.
    #[must_use]
    pub const fn from_secs(
        time_range: Option<i64>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    ) -> Option<Self> {
        match (time_range, start_time, end_time) {
            (Some(range), _, _) => Some(Self::Relative {
                range: secs_to_ms(range),
            }),
            (None, Some(start), Some(end)) => Some(Self::Absolute {
                start: secs_to_ms(start),
                end: secs_to_ms(end),
            }),
            _ => None,
        }
    }

    /// Splits back into `(time_range, start_time, end_time)` in seconds.
    #[must_use]
    pub const fn to_secs(self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match self {
            Self::Relative { range } => (Some(ms_to_secs(range)), None, None),
            Self::Absolute { start, end } => (None, Some(ms_to_secs(start)), Some(ms_to_secs(end))),
        }
    }
}
