//! Enumerated attribute values and field validators.
//!
//! Every enum here accepts exactly its documented spelling. Parsing an
//! unknown value fails with an error listing the accepted set, and the same
//! check runs when a state document is deserialized.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Declares a closed string enum with `FromStr`, `Display` and serde support.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident($field:literal) {
            $( $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $(
                #[doc = $value]
                $variant
            ),+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Attribute name used in validation errors.
            pub const FIELD: &'static str = $field;

            /// The configuration spelling of this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            /// All accepted spellings.
            #[must_use]
            pub fn allowed() -> Vec<&'static str> {
                Self::ALL.iter().map(|value| value.as_str()).collect()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err(crate::error::Error::validation(
                        $field,
                        format!("'{}' is not one of: {}", other, Self::allowed().join(", ")),
                    )),
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// Detector rule severity.
    pub enum Severity("severity") {
        Critical => "Critical",
        Major => "Major",
        Minor => "Minor",
        Warning => "Warning",
        Info => "Info",
    }
}

string_enum! {
    /// Dashboard chart density.
    pub enum ChartsResolution("charts_resolution") {
        Default => "default",
        Low => "low",
        High => "high",
        Highest => "highest",
    }
}

impl ChartsResolution {
    /// The API's `chartDensity` spelling.
    #[must_use]
    pub const fn api_value(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Low => "LOW",
            Self::High => "HIGH",
            Self::Highest => "HIGHEST",
        }
    }

    /// Parses the API's `chartDensity` spelling.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown densities.
    pub fn from_api(value: &str) -> Result<Self> {
        value.to_ascii_lowercase().parse()
    }
}

impl Default for ChartsResolution {
    fn default() -> Self {
        Self::Default
    }
}

string_enum! {
    /// How a time series is drawn.
    pub enum PlotType("plot_type") {
        LineChart => "LineChart",
        AreaChart => "AreaChart",
        ColumnChart => "ColumnChart",
        Histogram => "Histogram",
    }
}

impl Default for PlotType {
    fn default() -> Self {
        Self::LineChart
    }
}

string_enum! {
    /// Prefix family for value formatting.
    pub enum UnitPrefix("unit_prefix") {
        Metric => "Metric",
        Binary => "Binary",
    }
}

impl Default for UnitPrefix {
    fn default() -> Self {
        Self::Metric
    }
}

string_enum! {
    /// Time chart coloring.
    pub enum ColorBy("color_by") {
        Dimension => "Dimension",
        Metric => "Metric",
    }
}

impl Default for ColorBy {
    fn default() -> Self {
        Self::Dimension
    }
}

string_enum! {
    /// List and single value chart coloring.
    pub enum ScaleColorBy("color_by") {
        Dimension => "Dimension",
        Metric => "Metric",
        Scale => "Scale",
    }
}

impl Default for ScaleColorBy {
    fn default() -> Self {
        Self::Dimension
    }
}

string_enum! {
    /// Secondary visualization on list and single value charts.
    pub enum SecondaryVisualization("secondary_visualization") {
        None => "None",
        Radial => "Radial",
        Linear => "Linear",
        Sparkline => "Sparkline",
    }
}

string_enum! {
    /// Unit of the plotted value.
    pub enum ValueUnit("value_unit") {
        Bit => "Bit",
        Kilobit => "Kilobit",
        Megabit => "Megabit",
        Gigabit => "Gigabit",
        Terabit => "Terabit",
        Petabit => "Petabit",
        Exabit => "Exabit",
        Zettabit => "Zettabit",
        Yottabit => "Yottabit",
        Byte => "Byte",
        Kibibyte => "Kibibyte",
        Mebibyte => "Mebibyte",
        Gibibyte => "Gibibyte",
        Tebibyte => "Tebibyte",
        Pebibyte => "Pebibyte",
        Exbibyte => "Exbibyte",
        Zebibyte => "Zebibyte",
        Yobibyte => "Yobibyte",
        Nanosecond => "Nanosecond",
        Microsecond => "Microsecond",
        Millisecond => "Millisecond",
        Second => "Second",
        Minute => "Minute",
        Hour => "Hour",
        Day => "Day",
        Week => "Week",
    }
}

string_enum! {
    /// Y axis a series is plotted against.
    pub enum Axis("axis") {
        Left => "left",
        Right => "right",
    }
}

impl Axis {
    /// Index used by the API's `yAxis` field.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Inverse of [`Axis::index`]; anything but 1 is the left axis.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        if index == 1 { Self::Right } else { Self::Left }
    }
}

string_enum! {
    /// Opsgenie responder kind.
    pub enum ResponderType("responder_type") {
        User => "User",
        Team => "Team",
        Escalation => "Escalation",
        Schedule => "Schedule",
    }
}

string_enum! {
    /// Event overlay source kind.
    pub enum EventOverlayType("type") {
        EventTimeSeries => "eventTimeSeries",
        DetectorEvents => "detectorEvents",
    }
}

impl Default for EventOverlayType {
    fn default() -> Self {
        Self::EventTimeSeries
    }
}

/// Columns on a dashboard grid.
pub const DASHBOARD_COLUMNS: u32 = 12;

/// Upper bound on detector and chart `max_delay`, in seconds.
pub const MAX_DELAY_SECONDS: i64 = 900;

/// Upper bound on SignalFlow program length.
pub const MAX_PROGRAM_LENGTH: usize = 50_000;

#[allow(clippy::expect_used)]
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[A-Fa-f0-9]{6}$").expect("failed to compile hex color regex"));
#[allow(clippy::expect_used)]
static SORT_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-].+$").expect("failed to compile sort_by regex"));
#[allow(clippy::expect_used)]
static RELATIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-([0-9]+)([smhdw])$").expect("failed to compile relative time regex")
});

/// Checks a `#rrggbb` color.
///
/// # Errors
///
/// Returns a validation error if `value` is not a six-digit hex color.
pub fn validate_hex_color(field: &str, value: &str) -> Result<()> {
    if HEX_COLOR.is_match(value) {
        Ok(())
    } else {
        Err(Error::validation(
            field,
            format!("'{value}' is not a hex color like #ff0000"),
        ))
    }
}

/// Checks a sort expression such as `-value` or `+sf_metric`.
///
/// # Errors
///
/// Returns a validation error unless `value` starts with `+` or `-`.
pub fn validate_sort_by(value: &str) -> Result<()> {
    if SORT_BY.is_match(value) {
        Ok(())
    } else {
        Err(Error::validation(
            "sort_by",
            format!("'{value}' must start with + (ascending) or - (descending)"),
        ))
    }
}

/// Parses a relative time such as `-15m` into milliseconds.
///
/// # Errors
///
/// Returns a validation error unless `value` is `-<n><unit>` with unit in `s m h d w`.
pub fn parse_relative_time(field: &str, value: &str) -> Result<i64> {
    let invalid = || {
        Error::validation(
            field,
            format!("'{value}' is not a relative time like -15m, -1h or -7d"),
        )
    };
    let captures = RELATIVE_TIME.captures(value).ok_or_else(invalid)?;
    let amount: i64 = captures[1].parse().map_err(|_| invalid())?;
    let unit_ms = match &captures[2] {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => 604_800_000,
    };
    amount.checked_mul(unit_ms).ok_or_else(invalid)
}

/// Checks that a relative window and an absolute window are not both set.
///
/// `end_time` needs a `start_time`, and the start must precede the end.
///
/// # Errors
///
/// Returns a validation error describing the conflict.
pub fn validate_time_window<T>(
    time_range: Option<&T>,
    start_time: Option<i64>,
    end_time: Option<i64>,
) -> Result<()> {
    if time_range.is_some() && (start_time.is_some() || end_time.is_some()) {
        return Err(Error::validation(
            "time_range",
            "conflicts with start_time and end_time",
        ));
    }
    match (start_time, end_time) {
        (None, Some(_)) => Err(Error::validation("end_time", "requires start_time")),
        (Some(start), Some(end)) if start >= end => Err(Error::validation(
            "end_time",
            format!("must be after start_time ({end} <= {start})"),
        )),
        _ => Ok(()),
    }
}

/// Checks a non-empty required string.
///
/// # Errors
///
/// Returns a validation error if `value` is blank.
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::validation(field, "is required"))
    } else {
        Ok(())
    }
}

/// Checks a SignalFlow program.
///
/// # Errors
///
/// Returns a validation error if the program is empty or too long.
pub fn validate_program_text(value: &str) -> Result<()> {
    require("program_text", value)?;
    let length = value.chars().count();
    if length > MAX_PROGRAM_LENGTH {
        return Err(Error::validation(
            "program_text",
            format!("is {length} characters; the limit is {MAX_PROGRAM_LENGTH}"),
        ));
    }
    Ok(())
}

/// Checks `max_delay` is within 0..=900 seconds.
///
/// # Errors
///
/// Returns a validation error when out of range.
pub fn validate_max_delay(value: Option<i64>) -> Result<()> {
    match value {
        Some(delay) if !(0..=MAX_DELAY_SECONDS).contains(&delay) => Err(Error::validation(
            "max_delay",
            format!("{delay} is outside 0..={MAX_DELAY_SECONDS} seconds"),
        )),
        _ => Ok(()),
    }
}

/// Checks a dashboard placement fits in the 12-column grid.
///
/// # Errors
///
/// Returns a validation error for zero or oversized widths and overflowing columns.
pub fn validate_layout(field: &str, column: u32, width: u32) -> Result<()> {
    if width == 0 || width > DASHBOARD_COLUMNS {
        return Err(Error::validation(
            field,
            format!("width {width} must be between 1 and {DASHBOARD_COLUMNS}"),
        ));
    }
    if column
        .checked_add(width)
        .is_none_or(|end| end > DASHBOARD_COLUMNS)
    {
        return Err(Error::validation(
            field,
            format!("column {column} with width {width} overflows the {DASHBOARD_COLUMNS}-column grid"),
        ));
    }
    Ok(())
}

/// Seconds to the API's milliseconds.
#[must_use]
pub const fn secs_to_ms(secs: i64) -> i64 {
    secs.saturating_mul(1000)
}

/// The API's milliseconds back to seconds.
#[must_use]
pub const fn ms_to_secs(ms: i64) -> i64 {
    ms / 1000
}
