use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::election::ElectionStatus,
    mongodb::{now, Id},
};

/// The user-editable details of an election.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionDetails {
    /// Election title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Election start time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    /// Election end time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
}

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    #[serde(flatten)]
    pub details: ElectionDetails,
    /// The user who created the election.
    pub created_by: Id,
    /// Lifecycle state.
    pub status: ElectionStatus,
    /// Whether results are exposed to non-privileged callers.
    pub results_visible: bool,
    /// Creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Create a new draft election with hidden results.
    pub fn new(details: ElectionDetails, created_by: Id) -> Self {
        Self {
            details,
            created_by,
            status: ElectionStatus::Draft,
            results_visible: false,
            created_at: now(),
        }
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    impl ElectionDetails {
        pub fn example() -> Self {
            let start_date = now();
            Self {
                title: "Board Vote".to_string(),
                description: "Annual election of the board".to_string(),
                start_date,
                end_date: start_date + Duration::days(7),
            }
        }

        pub fn example2() -> Self {
            let start_date = now() + Duration::days(30);
            Self {
                title: "Treasurer".to_string(),
                description: "By-election for the treasurer post".to_string(),
                start_date,
                end_date: start_date + Duration::days(2),
            }
        }
    }
}
