use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! name_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

name_type!(StationName);
name_type!(ReceiverName);
name_type!(AircraftKey);
name_type!(FlarmId);

impl StationName {
    pub fn matches_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl FlarmId {
    /// Devices that asked not to be identified report `0`.
    pub fn hidden() -> Self {
        Self("hidden".to_string())
    }

    pub fn from_report(value: &str) -> Self {
        if value == "0" {
            Self::hidden()
        } else {
            Self(value.to_string())
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.0 == "hidden"
    }
}
