use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::model::{
    db::{
        election::Election,
        registration::{NewRegistration, Registration},
    },
    mongodb::Id,
};
use crate::store::{ElectionStore, StoreError};

use super::find_election;

/// Records which users are registered to vote in which elections.
pub struct RegistrationManager<'s> {
    store: &'s dyn ElectionStore,
}

impl<'s> RegistrationManager<'s> {
    pub fn new(store: &'s dyn ElectionStore) -> Self {
        Self { store }
    }

    /// Register `user_id` for an election. Registering twice is an error.
    pub async fn register(&self, election_id: Id, user_id: Id) -> Result<Registration> {
        match self
            .store
            .insert_registration(NewRegistration::new(election_id, user_id))
            .await
        {
            Ok(Some(registration)) => {
                debug!("User {user_id} registered for election {election_id}");
                Ok(registration)
            }
            Ok(None) => Err(Error::not_found(format!("Election {election_id}"))),
            Err(StoreError::Duplicate) => Err(Error::AlreadyRegistered),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a registration. Removing one that does not exist succeeds.
    pub async fn unregister(&self, election_id: Id, user_id: Id) -> Result<()> {
        find_election(self.store, election_id).await?;

        if self.store.delete_registration(election_id, user_id).await? {
            debug!("User {user_id} unregistered from election {election_id}");
        } else {
            debug!("User {user_id} was not registered for election {election_id}");
        }
        Ok(())
    }

    /// Users registered for an election, in registration order.
    pub async fn list_users(&self, election_id: Id) -> Result<Vec<Id>> {
        find_election(self.store, election_id).await?;

        let registrations = self.store.registrations_for_election(election_id).await?;
        Ok(registrations.into_iter().map(|r| r.user_id).collect())
    }

    /// Elections `user_id` is registered for, in creation order.
    pub async fn list_registered(&self, user_id: Id) -> Result<Vec<Election>> {
        let registered: HashSet<Id> = self
            .store
            .registrations_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.election_id)
            .collect();

        let mut elections = self.store.list_elections().await?;
        elections.retain(|e| registered.contains(&e.id));
        Ok(elections)
    }
}
