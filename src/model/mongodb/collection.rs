use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    candidate::{Candidate, NewCandidate},
    election::{Election, NewElection},
    question::{NewQuestion, Question},
    registration::{NewRegistration, Registration},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElection {
    const NAME: &'static str = ELECTIONS;
}

// Question collections
const QUESTIONS: &str = "questions";
impl MongoCollection for Question {
    const NAME: &'static str = QUESTIONS;
}
impl MongoCollection for NewQuestion {
    const NAME: &'static str = QUESTIONS;
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Registration collections
const REGISTRATIONS: &str = "registrations";
impl MongoCollection for Registration {
    const NAME: &'static str = REGISTRATIONS;
}
impl MongoCollection for NewRegistration {
    const NAME: &'static str = REGISTRATIONS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Registration collection: one registration per user per election.
    let registration_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "user_id": 1})
        .options(unique)
        .build();
    Coll::<Registration>::from_db(db)
        .create_index(registration_index, None)
        .await?;

    // Question collection.
    let question_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Question>::from_db(db)
        .create_index(question_index, None)
        .await?;

    // Candidate collection.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"question_id": 1})
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    Ok(())
}
