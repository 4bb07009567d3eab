use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
///
/// The string form doubles as the wire name (serde) and the column value
/// (SQLite), so both representations always agree.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Pending => "Pending",
    Submitted => "Submitted",
    InTransit => "InTransit",
    Received => "Received",
    CheckedIn => "CheckedIn",
    InProgress => "InProgress",
    Reported => "Reported",
    ReRunRequired => "ReRunRequired",
    ReCollectRequired => "ReCollectRequired",
    Canceled => "Canceled",
});

impl AppointmentStatus {
    /// Statuses that must carry a test result (and the only ones that may).
    pub fn carries_result(&self) -> bool {
        matches!(
            self,
            Self::Reported | Self::ReRunRequired | Self::ReCollectRequired
        )
    }
}

str_enum!(TestResult {
    Positive => "Positive",
    Negative => "Negative",
    Invalid => "Invalid",
    Pending => "Pending",
    PresumptivePositive => "PresumptivePositive",
    PreliminaryPositive => "PreliminaryPositive",
    Inconclusive => "Inconclusive",
    Indeterminate => "Indeterminate",
});

str_enum!(ResultAction {
    DoNothing => "DoNothing",
    SendNegative => "SendNegative",
    SendPositive => "SendPositive",
    SendInconclusive => "SendInconclusive",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_strings_parse_back() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert_eq!(AppointmentStatus::ALL.len(), 10);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&AppointmentStatus::ReCollectRequired).unwrap();
        assert_eq!(json, "\"ReCollectRequired\"");
        let action: ResultAction = serde_json::from_str("\"SendInconclusive\"").unwrap();
        assert_eq!(action, ResultAction::SendInconclusive);
    }

    #[test]
    fn result_bearing_statuses() {
        let bearing: Vec<_> = AppointmentStatus::ALL
            .iter()
            .filter(|s| s.carries_result())
            .collect();
        assert_eq!(
            bearing,
            vec![
                &AppointmentStatus::Reported,
                &AppointmentStatus::ReRunRequired,
                &AppointmentStatus::ReCollectRequired,
            ]
        );
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(AppointmentStatus::from_str("reported").is_err());
        assert!(TestResult::from_str("").is_err());
        let err = ResultAction::from_str("SendMaybe").unwrap_err();
        assert!(err.to_string().contains("ResultAction"));
    }
}
