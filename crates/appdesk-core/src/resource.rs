//! Resource collections exposed by the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// A CRUD collection on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Applications,
    Brigades,
    Locations,
    Objects,
    Statuses,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Applications,
        Resource::Brigades,
        Resource::Locations,
        Resource::Objects,
        Resource::Statuses,
    ];

    /// Returns the collection name used in URLs.
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Applications => "applications",
            Resource::Brigades => "brigades",
            Resource::Locations => "locations",
            Resource::Objects => "objects",
            Resource::Statuses => "statuses",
        }
    }

    /// Path of the collection, e.g. `/applications/`.
    pub fn collection_path(&self) -> String {
        format!("/{}/", self.name())
    }

    /// Path of a single item, e.g. `/applications/7/`.
    pub fn item_path(&self, id: u64) -> String {
        format!("/{}/{}/", self.name(), id)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = InvalidInputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| InvalidInputError::Resource {
                value: s.to_string(),
                expected: Resource::ALL
                    .iter()
                    .map(Resource::name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// An application as returned by the server.
///
/// The `*_name` and `brigade_number` fields are read-only projections of
/// the referenced catalogue entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    #[serde(default)]
    pub brigade: Option<u64>,
    #[serde(default)]
    pub brigade_number: Option<i64>,
    pub location: u64,
    #[serde(default)]
    pub location_name: Option<String>,
    pub identifier: String,
    #[serde(default)]
    pub correction: Option<String>,
    pub object_instance: u64,
    #[serde(default)]
    pub object_name: Option<String>,
    pub status: u64,
    #[serde(default)]
    pub status_name: Option<String>,
    pub start_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub end_time: Option<DateTime<FixedOffset>>,
}

/// Writable fields of an application, used for create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInput {
    pub brigade: Option<u64>,
    pub location: u64,
    pub identifier: String,
    pub correction: Option<String>,
    pub object_instance: u64,
    pub status: u64,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: Option<DateTime<FixedOffset>>,
}
