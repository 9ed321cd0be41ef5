use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::registration::Registration};

/// An API-friendly registration description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDescription {
    pub election_id: ApiId,
    pub user_id: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for RegistrationDescription {
    fn from(registration: Registration) -> Self {
        Self {
            election_id: registration.election_id.into(),
            user_id: registration.user_id.into(),
            created_at: registration.created_at,
        }
    }
}
