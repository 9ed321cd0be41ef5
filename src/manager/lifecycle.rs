use crate::error::{Error, Result};
use crate::model::{
    api::election::ElectionPatch,
    common::election::ElectionStatus,
    db::election::{Election, ElectionDetails, NewElection},
    mongodb::Id,
};
use crate::store::ElectionStore;

use super::{find_election, invalid_state, require_text};

/// Owns elections and their state machine: draft → launched → published.
pub struct ElectionManager<'s> {
    store: &'s dyn ElectionStore,
}

impl<'s> ElectionManager<'s> {
    pub fn new(store: &'s dyn ElectionStore) -> Self {
        Self { store }
    }

    /// Create a draft election owned by `creator`.
    pub async fn create(&self, details: ElectionDetails, creator: Id) -> Result<Election> {
        validate(&details)?;
        let election = self
            .store
            .insert_election(NewElection::new(details, creator))
            .await?;
        info!("Election {} created by {creator}", election.id);
        Ok(election)
    }

    pub async fn get(&self, id: Id) -> Result<Election> {
        find_election(self.store, id).await
    }

    pub async fn list(&self) -> Result<Vec<Election>> {
        Ok(self.store.list_elections().await?)
    }

    /// Change the election's details. Refused once published.
    pub async fn update(&self, id: Id, patch: ElectionPatch) -> Result<Election> {
        let election = self.get(id).await?;
        if !election.status.is_editable() {
            return Err(invalid_state(&election, "update"));
        }
        let details = patch.apply(election.election.details);
        validate(&details)?;

        match self
            .store
            .update_election_details(
                id,
                &details,
                &ElectionStatus::all_where(ElectionStatus::is_editable),
            )
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(self.refusal(id, "update").await),
        }
    }

    /// Delete the election along with its ballot and registrations.
    pub async fn delete(&self, id: Id) -> Result<()> {
        if !self.store.delete_election(id).await? {
            return Err(Error::not_found(format!("Election {id}")));
        }
        info!("Election {id} deleted");
        Ok(())
    }

    /// Open a draft election. Launching anything but a draft is an error.
    pub async fn launch(&self, id: Id, caller: Id) -> Result<Election> {
        self.advance(id, ElectionStatus::Draft, caller).await
    }

    /// Publish a launched election. Publishing anything but a launched
    /// election is an error.
    pub async fn publish(&self, id: Id, caller: Id) -> Result<Election> {
        self.advance(id, ElectionStatus::Launched, caller).await
    }

    /// Show or hide results. Results can only be shown once launched;
    /// hiding them is always allowed.
    pub async fn set_results_visibility(
        &self,
        id: Id,
        visible: bool,
        caller: Id,
    ) -> Result<Election> {
        let allowed = ElectionStatus::all_where(|status| !visible || status.allows_results());
        match self.store.set_results_visible(id, visible, &allowed).await? {
            Some(election) => {
                info!("Election {id} results_visible={visible} set by {caller}");
                Ok(election)
            }
            None => Err(self.refusal(id, "show results").await),
        }
    }

    /// Move the election one step on from `from`.
    async fn advance(&self, id: Id, from: ElectionStatus, caller: Id) -> Result<Election> {
        let to = from
            .next()
            .ok_or_else(|| Error::Internal(format!("{from} is a terminal state")))?;
        match self.store.transition(id, from, to).await? {
            Some(election) => {
                info!("Election {id} moved from {from} to {to} by {caller}");
                Ok(election)
            }
            None => Err(self.refusal(id, &format!("move to {to}")).await),
        }
    }

    /// Work out why a conditional write matched nothing.
    async fn refusal(&self, id: Id, action: &str) -> Error {
        match self.get(id).await {
            Ok(election) => invalid_state(&election, action),
            Err(e) => e,
        }
    }
}

fn validate(details: &ElectionDetails) -> Result<()> {
    require_text(&details.title, "Election title")?;
    if details.end_date < details.start_date {
        return Err(Error::BadRequest(
            "Election end date must not precede its start date".to_string(),
        ));
    }
    Ok(())
}
