use std::future::Future;

use mongodb::{
    bson::{doc, Bson, DateTime as BsonDateTime, Document},
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    results::InsertOneResult,
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::model::{
    common::election::ElectionStatus,
    db::{
        candidate::{Candidate, NewCandidate},
        election::{Election, ElectionDetails, NewElection},
        question::{NewQuestion, Question},
        registration::{NewRegistration, Registration},
    },
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id, MongoCollection},
};

use super::{ElectionStore, StoreError, StoreResult};

/// A store backed by MongoDB. Cascading deletes and guarded ballot writes
/// run in transactions, so the server must be a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    /// Ensure the indexes the store relies on exist, most importantly the
    /// unique index backing registration uniqueness.
    pub async fn ensure_indexes(&self) -> Result<(), DbError> {
        ensure_indexes_exist(&self.db).await
    }

    fn coll<T: MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    /// Sort by ID, i.e. by insertion order.
    fn in_order() -> FindOptions {
        FindOptions::builder().sort(doc! {"_id": 1}).build()
    }

    fn return_after() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    async fn transaction(&self) -> StoreResult<ClientSession> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(session)
    }

    /// Write to the document matching `filter` inside the session's
    /// transaction, so that concurrent writers to it conflict with the
    /// transaction. Returns whether a document matched.
    async fn claim<T>(
        &self,
        filter: Document,
        session: &mut ClientSession,
    ) -> StoreResult<bool>
    where
        T: MongoCollection + Send + Sync,
    {
        let result = self
            .coll::<T>()
            .update_one_with_session(filter, doc! {"$inc": {"revision": 1}}, None, session)
            .await?;
        Ok(result.matched_count == 1)
    }

    /// Claim the election, provided its status is one of `allowed`.
    async fn claim_election(
        &self,
        id: Id,
        allowed: &[ElectionStatus],
        session: &mut ClientSession,
    ) -> StoreResult<bool> {
        let filter = doc! {
            "_id": id,
            "status": any_of(allowed),
        };
        self.claim::<Election>(filter, session).await
    }

    /// Claim the election owning a ballot item, returning the item if both it
    /// and an election with a status in `allowed` exist.
    async fn claim_owner<T>(
        &self,
        id: Id,
        allowed: &[ElectionStatus],
        session: &mut ClientSession,
    ) -> StoreResult<Option<T>>
    where
        T: MongoCollection + Owned + DeserializeOwned + Unpin + Send + Sync,
    {
        let item = match self
            .coll::<T>()
            .find_one_with_session(id.as_doc(), None, session)
            .await?
        {
            Some(item) => item,
            None => return Ok(None),
        };
        if !self.claim::<T>(id.as_doc(), session).await?
            || !self.claim_election(item.election_id(), allowed, session).await?
        {
            return Ok(None);
        }
        Ok(Some(item))
    }

    async fn find_all<T>(&self, filter: Option<Document>) -> StoreResult<Vec<T>>
    where
        T: MongoCollection + DeserializeOwned + Unpin + Send + Sync,
    {
        Ok(self
            .coll::<T>()
            .find(filter, Self::in_order())
            .await?
            .try_collect()
            .await?)
    }
}

fn inserted_id(result: InsertOneResult) -> StoreResult<Id> {
    result
        .inserted_id
        .as_object_id()
        .map(Id::from)
        .ok_or(StoreError::MissingId)
}

fn any_of(statuses: &[ElectionStatus]) -> Document {
    let statuses: Vec<Bson> = statuses.iter().copied().map(Bson::from).collect();
    doc! { "$in": statuses }
}

/// A ballot item belonging to an election.
trait Owned {
    fn election_id(&self) -> Id;
}

impl Owned for Question {
    fn election_id(&self) -> Id {
        self.election_id
    }
}

impl Owned for Candidate {
    fn election_id(&self) -> Id {
        self.election_id
    }
}

/// Run a transactional operation, retrying while the server reports a
/// transient conflict with a concurrent writer.
async fn retry_transient<T, F, Fut>(mut op: F) -> StoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    loop {
        match op().await {
            Err(StoreError::Db(e)) if e.contains_label(TRANSIENT_TRANSACTION_ERROR) => {
                debug!("Retrying transaction: {e}");
            }
            result => return result,
        }
    }
}

#[rocket::async_trait]
impl ElectionStore for MongoStore {
    async fn insert_election(&self, election: NewElection) -> StoreResult<Election> {
        let result = self
            .coll::<NewElection>()
            .insert_one(&election, None)
            .await?;
        let id = inserted_id(result)?;
        Ok(Election { id, election })
    }

    async fn find_election(&self, id: Id) -> StoreResult<Option<Election>> {
        Ok(self
            .coll::<Election>()
            .find_one(id.as_doc(), None)
            .await?)
    }

    async fn list_elections(&self) -> StoreResult<Vec<Election>> {
        self.find_all(None).await
    }

    async fn update_election_details(
        &self,
        id: Id,
        details: &ElectionDetails,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>> {
        let filter = doc! {
            "_id": id,
            "status": any_of(allowed),
        };
        let update = doc! {
            "$set": {
                "title": details.title.as_str(),
                "description": details.description.as_str(),
                "start_date": BsonDateTime::from_chrono(details.start_date),
                "end_date": BsonDateTime::from_chrono(details.end_date),
            }
        };
        Ok(self
            .coll::<Election>()
            .find_one_and_update(filter, update, Self::return_after())
            .await?)
    }

    async fn transition(
        &self,
        id: Id,
        from: ElectionStatus,
        to: ElectionStatus,
    ) -> StoreResult<Option<Election>> {
        let filter = doc! {
            "_id": id,
            "status": from,
        };
        let update = doc! {
            "$set": {
                "status": to,
            }
        };
        Ok(self
            .coll::<Election>()
            .find_one_and_update(filter, update, Self::return_after())
            .await?)
    }

    async fn set_results_visible(
        &self,
        id: Id,
        visible: bool,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Election>> {
        let filter = doc! {
            "_id": id,
            "status": any_of(allowed),
        };
        let update = doc! {
            "$set": {
                "results_visible": visible,
            }
        };
        Ok(self
            .coll::<Election>()
            .find_one_and_update(filter, update, Self::return_after())
            .await?)
    }

    async fn delete_election(&self, id: Id) -> StoreResult<bool> {
        retry_transient(move || self.try_delete_election(id)).await
    }

    async fn insert_question(
        &self,
        question: NewQuestion,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        let question = &question;
        retry_transient(move || self.try_insert_question(question, allowed)).await
    }

    async fn find_question(&self, id: Id) -> StoreResult<Option<Question>> {
        Ok(self
            .coll::<Question>()
            .find_one(id.as_doc(), None)
            .await?)
    }

    async fn list_questions(&self, election_id: Option<Id>) -> StoreResult<Vec<Question>> {
        self.find_all(election_id.map(|id| doc! {"election_id": id}))
            .await
    }

    async fn update_question(
        &self,
        id: Id,
        text: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        retry_transient(move || self.try_update_question(id, text, allowed)).await
    }

    async fn delete_question(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        retry_transient(move || self.try_delete_question(id, allowed)).await
    }

    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        let candidate = &candidate;
        retry_transient(move || self.try_insert_candidate(candidate, allowed)).await
    }

    async fn find_candidate(&self, id: Id) -> StoreResult<Option<Candidate>> {
        Ok(self
            .coll::<Candidate>()
            .find_one(id.as_doc(), None)
            .await?)
    }

    async fn list_candidates(&self, question_id: Option<Id>) -> StoreResult<Vec<Candidate>> {
        self.find_all(question_id.map(|id| doc! {"question_id": id}))
            .await
    }

    async fn update_candidate(
        &self,
        id: Id,
        name: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        retry_transient(move || self.try_update_candidate(id, name, allowed)).await
    }

    async fn delete_candidate(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        retry_transient(move || self.try_delete_candidate(id, allowed)).await
    }

    async fn insert_registration(
        &self,
        registration: NewRegistration,
    ) -> StoreResult<Option<Registration>> {
        let registration = &registration;
        retry_transient(move || self.try_insert_registration(registration)).await
    }

    async fn delete_registration(&self, election_id: Id, user_id: Id) -> StoreResult<bool> {
        let filter = doc! {
            "election_id": election_id,
            "user_id": user_id,
        };
        let result = self
            .coll::<Registration>()
            .delete_one(filter, None)
            .await?;
        Ok(result.deleted_count == 1)
    }

    async fn registrations_for_election(
        &self,
        election_id: Id,
    ) -> StoreResult<Vec<Registration>> {
        self.find_all(Some(doc! {"election_id": election_id}))
            .await
    }

    async fn registrations_for_user(&self, user_id: Id) -> StoreResult<Vec<Registration>> {
        self.find_all(Some(doc! {"user_id": user_id})).await
    }
}

/// Single attempts at the transactional operations. A transient error
/// aborts the transaction when its session is dropped.
impl MongoStore {
    async fn try_delete_election(&self, id: Id) -> StoreResult<bool> {
        let mut session = self.transaction().await?;

        // Delete the election itself.
        let result = self
            .coll::<Election>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if result.deleted_count == 0 {
            session.abort_transaction().await?;
            return Ok(false);
        }

        // Delete everything that hangs off it.
        let filter = doc! {
            "election_id": id,
        };
        self.coll::<Question>()
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.coll::<Candidate>()
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.coll::<Registration>()
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn try_insert_question(
        &self,
        question: &NewQuestion,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        let mut session = self.transaction().await?;
        if !self
            .claim_election(question.election_id, allowed, &mut session)
            .await?
        {
            session.abort_transaction().await?;
            return Ok(None);
        }

        let result = self
            .coll::<NewQuestion>()
            .insert_one_with_session(question, None, &mut session)
            .await?;
        session.commit_transaction().await?;

        let id = inserted_id(result)?;
        Ok(Some(Question {
            id,
            question: question.clone(),
        }))
    }

    async fn try_update_question(
        &self,
        id: Id,
        text: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Question>> {
        let mut session = self.transaction().await?;
        if self
            .claim_owner::<Question>(id, allowed, &mut session)
            .await?
            .is_none()
        {
            session.abort_transaction().await?;
            return Ok(None);
        }

        let update = doc! {
            "$set": {
                "text": text,
            }
        };
        let question = self
            .coll::<Question>()
            .find_one_and_update_with_session(
                id.as_doc(),
                update,
                Self::return_after(),
                &mut session,
            )
            .await?;
        session.commit_transaction().await?;
        Ok(question)
    }

    async fn try_delete_question(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        let mut session = self.transaction().await?;
        if self
            .claim_owner::<Question>(id, allowed, &mut session)
            .await?
            .is_none()
        {
            session.abort_transaction().await?;
            return Ok(false);
        }

        self.coll::<Question>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        self.coll::<Candidate>()
            .delete_many_with_session(doc! {"question_id": id}, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn try_insert_candidate(
        &self,
        candidate: &NewCandidate,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        let mut session = self.transaction().await?;
        let question = self
            .claim_owner::<Question>(candidate.question_id, allowed, &mut session)
            .await?;
        if question.map(|q| q.election_id) != Some(candidate.election_id) {
            session.abort_transaction().await?;
            return Ok(None);
        }

        let result = self
            .coll::<NewCandidate>()
            .insert_one_with_session(candidate, None, &mut session)
            .await?;
        session.commit_transaction().await?;

        let id = inserted_id(result)?;
        Ok(Some(Candidate {
            id,
            candidate: candidate.clone(),
        }))
    }

    async fn try_update_candidate(
        &self,
        id: Id,
        name: &str,
        allowed: &[ElectionStatus],
    ) -> StoreResult<Option<Candidate>> {
        let mut session = self.transaction().await?;
        if self
            .claim_owner::<Candidate>(id, allowed, &mut session)
            .await?
            .is_none()
        {
            session.abort_transaction().await?;
            return Ok(None);
        }

        let update = doc! {
            "$set": {
                "name": name,
            }
        };
        let candidate = self
            .coll::<Candidate>()
            .find_one_and_update_with_session(
                id.as_doc(),
                update,
                Self::return_after(),
                &mut session,
            )
            .await?;
        session.commit_transaction().await?;
        Ok(candidate)
    }

    async fn try_delete_candidate(&self, id: Id, allowed: &[ElectionStatus]) -> StoreResult<bool> {
        let mut session = self.transaction().await?;
        if self
            .claim_owner::<Candidate>(id, allowed, &mut session)
            .await?
            .is_none()
        {
            session.abort_transaction().await?;
            return Ok(false);
        }

        self.coll::<Candidate>()
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        session.commit_transaction().await?;
        Ok(true)
    }

    async fn try_insert_registration(
        &self,
        registration: &NewRegistration,
    ) -> StoreResult<Option<Registration>> {
        let mut session = self.transaction().await?;
        if !self
            .claim_election(registration.election_id, ElectionStatus::ALL, &mut session)
            .await?
        {
            session.abort_transaction().await?;
            return Ok(None);
        }

        // Uniqueness is enforced by the index on (election_id, user_id).
        let result = match self
            .coll::<NewRegistration>()
            .insert_one_with_session(registration, None, &mut session)
            .await
        {
            Ok(result) => result,
            Err(e) if is_duplicate_key_error(&e) => return Err(StoreError::Duplicate),
            Err(e) => return Err(e.into()),
        };
        session.commit_transaction().await?;

        let id = inserted_id(result)?;
        Ok(Some(Registration {
            id,
            registration: registration.clone(),
        }))
    }
}

#[cfg(test)]
impl MongoStore {
    pub(crate) async fn drop_database(&self) -> Result<(), DbError> {
        self.db.drop(None).await
    }
}
