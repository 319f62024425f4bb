use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Wire (serde) names match `as_str`.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
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

str_enum!(UserRole {
    Patient => "patient",
    Doctor => "doctor",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    /// `scheduled` may move to any status; `completed` and `cancelled` are final.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self == next || self == AppointmentStatus::Scheduled
    }
}

str_enum!(AlertSeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(AlertType {
    Calibration => "calibration",
    Maintenance => "maintenance",
    Error => "error",
});

str_enum!(UpdateType {
    DoctorFeedback => "doctor_feedback",
    PrescriptionChange => "prescription_change",
    Calibration => "calibration",
    Achievement => "achievement",
});

str_enum!(SupportStatus {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

str_enum!(SupportPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
});
