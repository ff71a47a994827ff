//! Non-fatal data-quality findings recorded during a pipeline run.
//!
//! Every dropped row, coerced value, or zero-filled cell leaves one of
//! these behind so the caller can show the analyst why a number looks the
//! way it does.

use serde::{Deserialize, Serialize};

use crate::CountColumn;

/// A recorded, non-fatal data-quality finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// A source row named a district outside the canonical set.
    UnmatchedName {
        /// Source identifier.
        source_id: String,
        /// The trimmed name that did not match.
        name: String,
        /// How many rows carried this name.
        rows: u64,
    },
    /// A numeric cell could not be parsed and its row was dropped.
    CoercedValue {
        /// Source identifier.
        source_id: String,
        /// 1-based data row number.
        row: u64,
        /// The raw cell content.
        value: String,
    },
    /// A count cell held a negative number and its row was dropped.
    NegativeValue {
        /// Source identifier.
        source_id: String,
        /// 1-based data row number.
        row: u64,
        /// The parsed value.
        value: f64,
    },
    /// A district had no value in a source and was filled with zero.
    ZeroFilled {
        /// Source identifier.
        source_id: String,
        /// The column that was filled.
        column: CountColumn,
        /// The district that was filled.
        district: String,
    },
    /// Point records with missing or unparsable coordinates were dropped.
    MalformedCoordinates {
        /// Source identifier.
        source_id: String,
        /// Number of dropped records.
        dropped: u64,
    },
    /// Points that fell outside every district were dropped.
    PointsOutside {
        /// Source identifier.
        source_id: String,
        /// Number of dropped points.
        dropped: u64,
    },
    /// A canonical district had no usable boundary geometry.
    MissingBoundary {
        /// The district without a boundary.
        district: String,
    },
    /// An optional source failed and its column was zero-filled.
    SourceFailed {
        /// Source identifier.
        source_id: String,
        /// The degraded column.
        column: CountColumn,
        /// The underlying error message.
        message: String,
    },
}

impl DataQualityWarning {
    /// Returns the source this warning came from, if any.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::UnmatchedName { source_id, .. }
            | Self::CoercedValue { source_id, .. }
            | Self::NegativeValue { source_id, .. }
            | Self::ZeroFilled { source_id, .. }
            | Self::MalformedCoordinates { source_id, .. }
            | Self::PointsOutside { source_id, .. }
            | Self::SourceFailed { source_id, .. } => Some(source_id),
            Self::MissingBoundary { .. } => None,
        }
    }
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmatchedName {
                source_id,
                name,
                rows,
            } => write!(
                f,
                "{source_id}: dropped {rows} row(s) with unknown district name '{name}'"
            ),
            Self::CoercedValue {
                source_id,
                row,
                value,
            } => write!(
                f,
                "{source_id}: dropped row {row}, value '{value}' is not a number"
            ),
            Self::NegativeValue {
                source_id,
                row,
                value,
            } => write!(
                f,
                "{source_id}: dropped row {row}, count {value} is negative"
            ),
            Self::ZeroFilled {
                source_id,
                column,
                district,
            } => write!(
                f,
                "{source_id}: {district} has no {column} value, assumed 0"
            ),
            Self::MalformedCoordinates { source_id, dropped } => write!(
                f,
                "{source_id}: dropped {dropped} point(s) with missing or invalid coordinates"
            ),
            Self::PointsOutside { source_id, dropped } => write!(
                f,
                "{source_id}: {dropped} point(s) fell outside every district"
            ),
            Self::MissingBoundary { district } => {
                write!(f, "{district}: no valid boundary geometry found")
            }
            Self::SourceFailed {
                source_id,
                column,
                message,
            } => write!(
                f,
                "{source_id}: source failed, {column} set to 0 for all districts ({message})"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_zero_fill_reason() {
        let warning = DataQualityWarning::ZeroFilled {
            source_id: "population".to_string(),
            column: CountColumn::Population,
            district: "중구".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "population: 중구 has no population value, assumed 0"
        );
        assert_eq!(warning.source_id(), Some("population"));
    }

    #[test]
    fn missing_boundary_has_no_source() {
        let warning = DataQualityWarning::MissingBoundary {
            district: "강남구".to_string(),
        };
        assert!(warning.source_id().is_none());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let warning = DataQualityWarning::PointsOutside {
            source_id: "bus_stops".to_string(),
            dropped: 3,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "points_outside");
        assert_eq!(json["dropped"], 3);
    }
}
