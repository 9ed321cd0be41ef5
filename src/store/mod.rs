//! Persistence for elections, ballots and registrations.
//!
//! Managers talk to an [`ElectionStore`] through intent-level operations.
//! Each operation is atomic on its own; transitions and conditional updates
//! are compare-and-set on the election status, so concurrent callers cannot
//! both win.

use std::ops::Deref;
use std::sync::Arc;

use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};
use thiserror::Error;

use crate::model::{
    common::election::ElectionStatus,
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, ElectionDetails, NewElection},
        question::{NewQuestion, Question},
        registration::{NewRegistration, Registration},
    },
    mongodb::Id,
};

mod memory;
mod mongo;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Duplicate entry")]
    Duplicate,
    #[error("Database did not return an ID for the inserted document")]
    MissingId,
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
}

#[rocket::async_trait]
pub trait ElectionStore: Send + Sync {
    // Elections.

    async fn insert_election(&self, election: NewElection) -> StoreResult<Election>;

    async fn find_election(&self, id: Id) -> StoreResult<Option<Election>>;

    /// All elections, in insertion order.
    async fn list_elections(&self) -> StoreResult<Vec<Election>>;

    /// Replace the details of the election, if its status is one of `allowed`.
    async fn update_election_details(
        &self,
        id: Id,
        details: &ElectionDetails,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>>;

    /// Move the election from `from` to `to`. Returns `None` if the election
    /// does not exist or is not currently in `from`.
    async fn transition(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<Option<Election>>;

    /// Set the results flag, if the election's status is one of `allowed`.
    async fn set_results_visible(
        &self,
        id: Id,
        visible: bool,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>>;

    /// Delete the election with all its questions, candidates and registrations.
    /// Returns false if there was no such election.
    async fn delete_election(&self, id: Id) -> StoreResult<bool>;

    // Questions.
    //
    // Ballot writes are conditional on the status of the owning election,
    // checked in the same atomic step as the write itself.

    /// Insert the question, if its election exists with a status in `allowed`.
    async fn insert_question(
        &self,
        question: NewQuestion,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>>;

    async fn find_question(&self, id: Id) -> StoreResult<Option<Question>>;

    /// Questions in insertion order, optionally restricted to one election.
    async fn list_questions(&self, election_id: Option<Id>) -> StoreResult<Vec<Question>>;

    /// Change the text, if the question exists and its election's status is in `allowed`.
    async fn update_question(
        &self,
        id: Id,
        text: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>>;

    /// Delete the question and its candidates, if its election's status is in `allowed`.
    async fn delete_question(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool>;

    // Candidates.

    /// Insert the candidate, if its question exists within `candidate.election_id`
    /// and that election's status is in `allowed`.
    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>>;

    async fn find_candidate(&self, id: Id) -> StoreResult<Option<Candidate>>;

    /// Candidates in insertion order, optionally restricted to one question.
    async fn list_candidates(&self, question_id: Option<Id>) -> StoreResult<Vec<Candidate>>;

    /// Change the name, if the candidate exists and its election's status is in `allowed`.
    async fn update_candidate(
        &self,
        id: Id,
        name: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>>;

    async fn delete_candidate(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool>;

    // Registrations.

    /// Insert the registration, if its election exists. Fails with
    /// [`StoreError::Duplicate`] if the pair is already registered.
    async fn insert_registration(
        &self,
        registration: NewRegistration,
    ) -> StoreResult<Option<Registration>>;

    async fn delete_registration(&self, election_id: Id, user_id: Id) -> StoreResult<bool>;

    /// Registrations for one election, in insertion order.
    async fn registrations_for_election(&self, election_id: Id)
        -> StoreResult<Vec<Registration>>;

    /// Registrations held by one user, in insertion order.
    async fn registrations_for_user(&self, user_id: Id) -> StoreResult<Vec<Registration>>;
}

/// A shared handle on the managed store.
#[derive(Clone)]
pub struct Store(Arc<dyn ElectionStore>);

impl Store {
    pub fn new(store: impl ElectionStore + 'static) -> Self {
        Self(Arc::new(store))
    }
}

impl Deref for Store {
    type Target = dyn ElectionStore;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Store {
    type Error = ();

    /// Get the store from the managed state.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req.rocket().state::<Store>() {
            Some(store) => request::Outcome::Success(store.clone()),
            None => {
                error!("No store is managed");
                request::Outcome::Failure((Status::InternalServerError, ()))
            }
        }
    }
}
