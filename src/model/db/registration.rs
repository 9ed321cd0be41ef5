use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{now, Id};

/// A user's registration for an election. The `(election_id, user_id)` pair is unique.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RegistrationCore {
    pub election_id: Id,
    pub user_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl RegistrationCore {
    /// Register the given user for the given election, now.
    pub fn new(election_id: Id, user_id: Id) -> Self {
        Self {
            election_id,
            user_id,
            created_at: now(),
        }
    }
}

/// A registration without an ID.
pub type NewRegistration = RegistrationCore;

/// A registration from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub registration: RegistrationCore,
}

impl Deref for Registration {
    type Target = RegistrationCore;

    fn deref(&self) -> &Self::Target {
        &self.registration
    }
}
