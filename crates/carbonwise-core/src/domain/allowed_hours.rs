use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::ValidationError;

/// Half-open `[start_hour, end_hour)` range of local civil hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllowedHours {
    start_hour: u8,
    end_hour: u8,
}

impl AllowedHours {
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self, ValidationError> {
        if start_hour < 24 && end_hour < 24 && start_hour < end_hour {
            Ok(Self {
                start_hour,
                end_hour,
            })
        } else {
            Err(ValidationError::InvalidAllowedHours {
                value: format!("{start_hour}-{end_hour}"),
            })
        }
    }

    pub const fn start_hour(self) -> u8 {
        self.start_hour
    }

    pub const fn end_hour(self) -> u8 {
        self.end_hour
    }

    pub const fn contains(self, hour: u8) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

impl FromStr for AllowedHours {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidAllowedHours {
            value: value.to_owned(),
        };

        let (start, end) = value.trim().split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse::<u8>().map_err(|_| invalid())?;
        let end = end.trim().parse::<u8>().map_err(|_| invalid())?;
        Self::new(start, end).map_err(|_| invalid())
    }
}

impl Display for AllowedHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_hour, self.end_hour)
    }
}

impl Serialize for AllowedHours {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
