//! A store wrapper for exercising concurrent callers.

use rocket::tokio::{sync::Mutex, task};

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

use super::{ElectionStore, MemoryStore, StoreResult};

/// A change another caller makes to an election.
#[derive(Debug, Clone, Copy)]
pub enum Rival {
    /// Launch if needed, then publish.
    Publish(Id),
    Delete(Id),
}

/// Wraps a [`MemoryStore`], yielding to the scheduler before every operation
/// so that concurrently polled callers interleave between their reads and
/// writes.
///
/// An optional [`Rival`] is applied once, immediately before the first ballot
/// or registration write reaches the inner store.
pub struct ContendedStore {
    inner: MemoryStore,
    rival: Mutex<Option<Rival>>,
}

impl ContendedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            rival: Mutex::new(None),
        }
    }

    pub fn with_rival(inner: MemoryStore, rival: Rival) -> Self {
        Self {
            inner,
            rival: Mutex::new(Some(rival)),
        }
    }

    async fn contend(&self) {
        task::yield_now().await;
    }

    async fn before_write(&self) {
        self.contend().await;
        let rival = self.rival.lock().await.take();
        match rival {
            Some(Rival::Publish(id)) => {
                self.inner
                    .transition(id, ElectionStatus::Draft, ElectionStatus::Launched)
                    .await
                    .unwrap();
                self.inner
                    .transition(id, ElectionStatus::Launched, ElectionStatus::Published)
                    .await
                    .unwrap();
            }
            Some(Rival::Delete(id)) => {
                self.inner.delete_election(id).await.unwrap();
            }
            None => {}
        }
    }
}

#[rocket::async_trait]
impl ElectionStore for ContendedStore {
    async fn insert_election(&self, election: NewElection) -> StoreResult<Election> {
        self.contend().await;
        self.inner.insert_election(election).await
    }

    async fn find_election(&self, id: Id) -> StoreResult<Option<Election>> {
        self.contend().await;
        self.inner.find_election(id).await
    }

    async fn list_elections(&self) -> StoreResult<Vec<Election>> {
        self.contend().await;
        self.inner.list_elections().await
    }

    async fn update_election_details(
        &self,
        id: Id,
        details: &ElectionDetails,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>> {
        self.contend().await;
        self.inner
            .update_election_details(id, details, allowed)
            .await
    }

    async fn transition(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<Option<Election>> {
        self.contend().await;
        self.inner.transition(id, from, to).await
    }

    async fn set_results_visible(
        &self,
        id: Id,
        visible: bool,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>> {
        self.contend().await;
        self.inner.set_results_visible(id, visible, allowed).await
    }

    async fn delete_election(&self, id: Id) -> StoreResult<bool> {
        self.contend().await;
        self.inner.delete_election(id).await
    }

    async fn insert_question(
        &self,
        question: NewQuestion,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        self.before_write().await;
        self.inner.insert_question(question, allowed).await
    }

    async fn find_question(&self, id: Id) -> StoreResult<Option<Question>> {
        self.contend().await;
        self.inner.find_question(id).await
    }

    async fn list_questions(&self, election_id: Option<Id>) -> StoreResult<Vec<Question>> {
        self.contend().await;
        self.inner.list_questions(election_id).await
    }

    async fn update_question(
        &self,
        id: Id,
        text: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        self.before_write().await;
        self.inner.update_question(id, text, allowed).await
    }

    async fn delete_question(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        self.before_write().await;
        self.inner.delete_question(id, allowed).await
    }

    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        self.before_write().await;
        self.inner.insert_candidate(candidate, allowed).await
    }

    async fn find_candidate(&self, id: Id) -> StoreResult<Option<Candidate>> {
        self.contend().await;
        self.inner.find_candidate(id).await
    }

    async fn list_candidates(&self, question_id: Option<Id>) -> StoreResult<Vec<Candidate>> {
        self.contend().await;
        self.inner.list_candidates(question_id).await
    }

    async fn update_candidate(
        &self,
        id: Id,
        name: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        self.before_write().await;
        self.inner.update_candidate(id, name, allowed).await
    }

    async fn delete_candidate(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        self.before_write().await;
        self.inner.delete_candidate(id, allowed).await
    }

    async fn insert_registration(
        &self,
        registration: NewRegistration,
    ) -> StoreResult<Option<Registration>> {
        self.before_write().await;
        self.inner.insert_registration(registration).await
    }

    async fn delete_registration(&self, election_id: Id, user_id: Id) -> StoreResult<bool> {
        self.contend().await;
        self.inner.delete_registration(election_id, user_id).await
    }

    async fn registrations_for_election(
        &self,
        election_id: Id,
    ) -> StoreResult<Vec<Registration>> {
        self.contend().await;
        self.inner.registrations_for_election(election_id).await
    }

    async fn registrations_for_user(&self, user_id: Id) -> StoreResult<Vec<Registration>> {
        self.contend().await;
        self.inner.registrations_for_user(user_id).await
    }
}
