use serde::{Deserialize, Serialize};
use std::fmt;

/// Local record collections kept on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Jobs,
    Customers,
    Materials,
    TimeEntries,
    Photos,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Jobs,
        Collection::Customers,
        Collection::Materials,
        Collection::TimeEntries,
        Collection::Photos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Jobs => "jobs",
            Collection::Customers => "customers",
            Collection::Materials => "materials",
            Collection::TimeEntries => "time_entries",
            Collection::Photos => "photos",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Collection {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "jobs" => Ok(Collection::Jobs),
            "customers" => Ok(Collection::Customers),
            "materials" => Ok(Collection::Materials),
            "time_entries" => Ok(Collection::TimeEntries),
            "photos" => Ok(Collection::Photos),
            other => Err(format!("Unknown collection: {other}")),
        }
    }
}
