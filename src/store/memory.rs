use std::sync::Arc;

use rocket::tokio::sync::Mutex;

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

use super::{ElectionStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    elections: Vec<Election>,
    questions: Vec<Question>,
    candidates: Vec<Candidate>,
    registrations: Vec<Registration>,
}

impl Tables {
    /// Does the election exist with a status in `allowed`?
    fn election_allows(&self, id: Id, allowed: &[ElectionStatus]) -> bool {
        self.elections
            .iter()
            .any(|e| e.id == id && allowed.contains(&e.status))
    }

    fn question_allows(&self, id: Id, allowed: &[ElectionStatus]) -> bool {
        self.questions
            .iter()
            .any(|q| q.id == id && self.election_allows(q.election_id, allowed))
    }
}

/// An in-process store. Every operation holds a single lock, so each is
/// atomic with respect to all the others.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_by_id<T, F>(rows: &mut [T], id: Id, key: F) -> Option<&mut T>
where
    F: Fn(&T) -> Id,
{
    rows.iter_mut().find(|row| key(row) == id)
}

#[rocket::async_trait]
impl ElectionStore for MemoryStore {
    async fn insert_election(&self, election: NewElection) -> StoreResult<Election> {
        let election = Election {
            id: Id::new(),
            election,
        };
        self.tables.lock().await.elections.push(election.clone());
        Ok(election)
    }

    async fn find_election(&self, id: Id) -> StoreResult<Option<Election>> {
        let tables = self.tables.lock().await;
        Ok(tables.elections.iter().find(|e| e.id == id).cloned())
    }

    async fn list_elections(&self) -> StoreResult<Vec<Election>> {
        Ok(self.tables.lock().await.elections.clone())
    }

    async fn update_election_details(
        &self,
        id: Id,
        details: &ElectionDetails,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>> {
        let mut tables = self.tables.lock().await;
        Ok(find_by_id(&mut tables.elections, id, |e| e.id)
            .filter(|e| allowed.contains(&e.status))
            .map(|e| {
                e.details = details.clone();
                e.clone()
            }))
    }

    async fn transition(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<Option<Election>> {
        let mut tables = self.tables.lock().await;
        Ok(find_by_id(&mut tables.elections, id, |e| e.id)
            .filter(|e| e.status == from)
            .map(|e| {
                e.status = to;
                e.clone()
            }))
    }

    async fn set_results_visible(
        &self,
        id: Id,
        visible: bool,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>> {
        let mut tables = self.tables.lock().await;
        Ok(find_by_id(&mut tables.elections, id, |e| e.id)
            .filter(|e| allowed.contains(&e.status))
            .map(|e| {
                e.results_visible = visible;
                e.clone()
            }))
    }

    async fn delete_election(&self, id: Id) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.elections.len();
        tables.elections.retain(|e| e.id != id);
        if tables.elections.len() == before {
            return Ok(false);
        }
        tables.questions.retain(|q| q.election_id != id);
        tables.candidates.retain(|c| c.election_id != id);
        tables.registrations.retain(|r| r.election_id != id);
        Ok(true)
    }

    async fn insert_question(
        &self,
        question: NewQuestion,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        let mut tables = self.tables.lock().await;
        if !tables.election_allows(question.election_id, allowed) {
            return Ok(None);
        }
        let question = Question {
            id: Id::new(),
            question,
        };
        tables.questions.push(question.clone());
        Ok(Some(question))
    }

    async fn find_question(&self, id: Id) -> StoreResult<Option<Question>> {
        let tables = self.tables.lock().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn list_questions(&self, election_id: Option<Id>) -> StoreResult<Vec<Question>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| election_id.map_or(true, |id| q.election_id == id))
            .cloned()
            .collect())
    }

    async fn update_question(
        &self,
        id: Id,
        text: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        let mut tables = self.tables.lock().await;
        if !tables.question_allows(id, allowed) {
            return Ok(None);
        }
        Ok(find_by_id(&mut tables.questions, id, |q| q.id).map(|q| {
            q.text = text.to_string();
            q.clone()
        }))
    }

    async fn delete_question(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.question_allows(id, allowed) {
            return Ok(false);
        }
        tables.questions.retain(|q| q.id != id);
        tables.candidates.retain(|c| c.question_id != id);
        Ok(true)
    }

    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        let mut tables = self.tables.lock().await;
        let question_in_election = tables
            .questions
            .iter()
            .any(|q| q.id == candidate.question_id && q.election_id == candidate.election_id);
        if !question_in_election || !tables.election_allows(candidate.election_id, allowed) {
            return Ok(None);
        }
        let candidate = Candidate {
            id: Id::new(),
            candidate,
        };
        tables.candidates.push(candidate.clone());
        Ok(Some(candidate))
    }

    async fn find_candidate(&self, id: Id) -> StoreResult<Option<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables.candidates.iter().find(|c| c.id == id).cloned())
    }

    async fn list_candidates(&self, question_id: Option<Id>) -> StoreResult<Vec<Candidate>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .candidates
            .iter()
            .filter(|c| question_id.map_or(true, |id| c.question_id == id))
            .cloned()
            .collect())
    }

    async fn update_candidate(
        &self,
        id: Id,
        name: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        let mut tables = self.tables.lock().await;
        let Some(election_id) = tables
            .candidates
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.election_id)
        else {
            return Ok(None);
        };
        if !tables.election_allows(election_id, allowed) {
            return Ok(None);
        }
        Ok(find_by_id(&mut tables.candidates, id, |c| c.id).map(|c| {
            c.name = name.to_string();
            c.clone()
        }))
    }

    async fn delete_candidate(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(election_id) = tables
            .candidates
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.election_id)
        else {
            return Ok(false);
        };
        if !tables.election_allows(election_id, allowed) {
            return Ok(false);
        }
        tables.candidates.retain(|c| c.id != id);
        Ok(true)
    }

    async fn insert_registration(
        &self,
        registration: NewRegistration,
    ) -> StoreResult<Option<Registration>> {
        let mut tables = self.tables.lock().await;
        if !tables.election_allows(registration.election_id, ElectionStatus::ALL) {
            return Ok(None);
        }
        let exists = tables.registrations.iter().any(|r| {
            r.election_id == registration.election_id && r.user_id == registration.user_id
        });
        if exists {
            return Err(StoreError::Duplicate);
        }
        let registration = Registration {
            id: Id::new(),
            registration,
        };
        tables.registrations.push(registration.clone());
        Ok(Some(registration))
    }

    async fn delete_registration(&self, election_id: Id, user_id: Id) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.registrations.len();
        tables
            .registrations
            .retain(|r| !(r.election_id == election_id && r.user_id == user_id));
        Ok(tables.registrations.len() != before)
    }

    async fn registrations_for_election(
        &self,
        election_id: Id,
    ) -> StoreResult<Vec<Registration>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .iter()
            .filter(|r| r.election_id == election_id)
            .cloned()
            .collect())
    }

    async fn registrations_for_user(&self, user_id: Id) -> StoreResult<Vec<Registration>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}
