use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::ElectionStatus,
    db::election::{Election, ElectionDetails},
};

/// A request to create an election.
#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl From<ElectionSpec> for ElectionDetails {
    fn from(spec: ElectionSpec) -> Self {
        Self {
            title: spec.title,
            description: spec.description,
            start_date: spec.start_date,
            end_date: spec.end_date,
        }
    }
}

/// A partial update to an election's details. Absent fields are left alone.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ElectionPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ElectionPatch {
    /// Apply this patch on top of existing details.
    pub fn apply(self, mut details: ElectionDetails) -> ElectionDetails {
        if let Some(title) = self.title {
            details.title = title;
        }
        if let Some(description) = self.description {
            details.description = description;
        }
        if let Some(start_date) = self.start_date {
            details.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            details.end_date = end_date;
        }
        details
    }
}

/// A request to show or hide an election's results.
#[derive(Debug, Serialize, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub created_by: ApiId,
    pub status: ElectionStatus,
    pub results_visible: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        let core = election.election;
        Self {
            id: election.id.into(),
            title: core.details.title,
            description: core.details.description,
            start_date: core.details.start_date,
            end_date: core.details.end_date,
            created_by: core.created_by.into(),
            status: core.status,
            results_visible: core.results_visible,
            created_at: core.created_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    #[test]
    fn patch_only_touches_given_fields() {
        let details = ElectionDetails::example();
        let new_end = details.end_date + Duration::days(1);
        let patch = ElectionPatch {
            title: Some("Board Vote 2".to_string()),
            end_date: Some(new_end),
            ..Default::default()
        };
        let patched = patch.apply(details.clone());
        assert_eq!(patched.title, "Board Vote 2");
        assert_eq!(patched.description, details.description);
        assert_eq!(patched.start_date, details.start_date);
        assert_eq!(patched.end_date, new_end);
    }
}
