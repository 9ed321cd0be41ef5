use crate::error::{Error, Result};
use crate::model::{
    common::election::ElectionStatus,
    db::{
        candidate::{Candidate, NewCandidate},
        question::{NewQuestion, Question},
    },
    mongodb::Id,
};
use crate::store::ElectionStore;

use super::{find_election, invalid_state, require_text};

/// Owns the questions and candidates of each election's ballot. The ballot
/// is frozen once its election is published.
///
/// Every write is conditional on the owning election still being editable,
/// checked by the store in the same step as the write.
pub struct BallotManager<'s> {
    store: &'s dyn ElectionStore,
    editable: Vec<ElectionStatus>,
}

impl<'s> BallotManager<'s> {
    pub fn new(store: &'s dyn ElectionStore) -> Self {
        Self {
            store,
            editable: ElectionStatus::all_where(ElectionStatus::is_editable),
        }
    }

    /// Work out why a conditional write to `item` matched nothing.
    async fn refusal(&self, election_id: Id, action: &str, item: String) -> Error {
        match find_election(self.store, election_id).await {
            Ok(election) if !election.status.is_editable() => invalid_state(&election, action),
            Ok(_) => Error::not_found(item),
            Err(e) => e,
        }
    }

    pub async fn question(&self, id: Id) -> Result<Question> {
        self.store
            .find_question(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Question {id}")))
    }

    pub async fn candidate(&self, id: Id) -> Result<Candidate> {
        self.store
            .find_candidate(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {id}")))
    }

    pub async fn create_question(&self, election_id: Id, text: String) -> Result<Question> {
        require_text(&text, "Question text")?;

        let question = match self
            .store
            .insert_question(NewQuestion { election_id, text }, &self.editable)
            .await?
        {
            Some(question) => question,
            None => {
                let item = format!("Election {election_id}");
                return Err(self.refusal(election_id, "add questions", item).await);
            }
        };
        info!("Question {} added to election {election_id}", question.id);
        Ok(question)
    }

    pub async fn all_questions(&self) -> Result<Vec<Question>> {
        Ok(self.store.list_questions(None).await?)
    }

    /// Questions of one election, in creation order.
    pub async fn questions_for(&self, election_id: Id) -> Result<Vec<Question>> {
        find_election(self.store, election_id).await?;
        Ok(self.store.list_questions(Some(election_id)).await?)
    }

    pub async fn update_question(&self, id: Id, text: String) -> Result<Question> {
        require_text(&text, "Question text")?;
        let question = self.question(id).await?;

        match self
            .store
            .update_question(id, &text, &self.editable)
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(self
                .refusal(question.election_id, "edit questions", format!("Question {id}"))
                .await),
        }
    }

    /// Delete a question and its candidates.
    pub async fn delete_question(&self, id: Id) -> Result<()> {
        let question = self.question(id).await?;

        if !self.store.delete_question(id, &self.editable).await? {
            return Err(self
                .refusal(question.election_id, "delete questions", format!("Question {id}"))
                .await);
        }
        info!("Question {id} deleted");
        Ok(())
    }

    pub async fn create_candidate(&self, question_id: Id, name: String) -> Result<Candidate> {
        require_text(&name, "Candidate name")?;
        let question = self.question(question_id).await?;

        let new = NewCandidate {
            question_id,
            election_id: question.election_id,
            name,
        };
        let candidate = match self.store.insert_candidate(new, &self.editable).await? {
            Some(candidate) => candidate,
            None => {
                let item = format!("Question {question_id}");
                return Err(self
                    .refusal(question.election_id, "add candidates", item)
                    .await);
            }
        };
        info!(
            "Candidate {} added to question {question_id}",
            candidate.id
        );
        Ok(candidate)
    }

    pub async fn all_candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.store.list_candidates(None).await?)
    }

    /// Candidates of one question, in creation order.
    pub async fn candidates_for(&self, question_id: Id) -> Result<Vec<Candidate>> {
        self.question(question_id).await?;
        Ok(self.store.list_candidates(Some(question_id)).await?)
    }

    pub async fn update_candidate(&self, id: Id, name: String) -> Result<Candidate> {
        require_text(&name, "Candidate name")?;
        let candidate = self.candidate(id).await?;

        match self
            .store
            .update_candidate(id, &name, &self.editable)
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(self
                .refusal(candidate.election_id, "edit candidates", format!("Candidate {id}"))
                .await),
        }
    }

    pub async fn delete_candidate(&self, id: Id) -> Result<()> {
        let candidate = self.candidate(id).await?;

        if !self.store.delete_candidate(id, &self.editable).await? {
            return Err(self
                .refusal(candidate.election_id, "delete candidates", format!("Candidate {id}"))
                .await);
        }
        debug!("Candidate {id} deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::manager::ElectionManager;
    use crate::model::db::election::{Election, ElectionDetails};
    use crate::store::{
        testing::{ContendedStore, Rival},
        MemoryStore,
    };

    async fn draft(store: &MemoryStore) -> Election {
        ElectionManager::new(store)
            .create(ElectionDetails::example(), Id::new())
            .await
            .unwrap()
    }

    #[backend_test]
    async fn candidates_listed_in_creation_order(store: MemoryStore) {
        let ballot = BallotManager::new(&store);
        let election = draft(&store).await;

        let question = ballot
            .create_question(election.id, "Who should chair the board?".to_string())
            .await
            .unwrap();
        assert_eq!(question.election_id, election.id);

        let alice = ballot
            .create_candidate(question.id, "Alice".to_string())
            .await
            .unwrap();
        let bob = ballot
            .create_candidate(question.id, "Bob".to_string())
            .await
            .unwrap();
        assert_eq!(alice.election_id, election.id);

        let names: Vec<String> = ballot
            .candidates_for(question.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(names, vec!["Alice", "Bob"]);

        assert_eq!(
            ballot.questions_for(election.id).await.unwrap(),
            vec![question]
        );
        assert_eq!(ballot.all_candidates().await.unwrap(), vec![alice, bob]);
    }

    #[backend_test]
    async fn ballot_frozen_after_publish(store: MemoryStore) {
        let ballot = BallotManager::new(&store);
        let elections = ElectionManager::new(&store);
        let election = draft(&store).await;
        let caller = election.created_by;

        let question = ballot
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();
        let candidate = ballot
            .create_candidate(question.id, "Alice".to_string())
            .await
            .unwrap();

        // Still editable while launched.
        elections.launch(election.id, caller).await.unwrap();
        ballot
            .update_candidate(candidate.id, "Alice Smith".to_string())
            .await
            .unwrap();

        elections.publish(election.id, caller).await.unwrap();
        assert!(matches!(
            ballot
                .create_question(election.id, "Another".to_string())
                .await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            ballot.create_candidate(question.id, "Bob".to_string()).await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            ballot
                .update_question(question.id, "Changed".to_string())
                .await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            ballot.delete_question(question.id).await,
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            ballot.delete_candidate(candidate.id).await,
            Err(Error::InvalidState(_))
        ));

        // Nothing changed.
        assert_eq!(ballot.question(question.id).await.unwrap(), question);
        assert_eq!(
            ballot.candidate(candidate.id).await.unwrap().name,
            "Alice Smith"
        );
    }

    #[backend_test]
    async fn delete_question_removes_candidates(store: MemoryStore) {
        let ballot = BallotManager::new(&store);
        let election = draft(&store).await;
        let question = ballot
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();
        let candidate = ballot
            .create_candidate(question.id, "Alice".to_string())
            .await
            .unwrap();

        ballot.delete_question(question.id).await.unwrap();
        assert!(matches!(
            ballot.candidate(candidate.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.candidates_for(question.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[backend_test]
    async fn missing_parents(store: MemoryStore) {
        let ballot = BallotManager::new(&store);
        let missing = Id::new();

        assert!(matches!(
            ballot.create_question(missing, "Orphan".to_string()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.create_candidate(missing, "Orphan".to_string()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.questions_for(missing).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.question(missing).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.candidate(missing).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.update_candidate(missing, "X".to_string()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            ballot.delete_candidate(missing).await,
            Err(Error::NotFound(_))
        ));
        assert!(ballot.all_questions().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn empty_text_rejected(store: MemoryStore) {
        let ballot = BallotManager::new(&store);
        let election = draft(&store).await;

        assert!(matches!(
            ballot.create_question(election.id, "".to_string()).await,
            Err(Error::BadRequest(_))
        ));
        let question = ballot
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();
        assert!(matches!(
            ballot.create_candidate(question.id, " ".to_string()).await,
            Err(Error::BadRequest(_))
        ));
    }

    #[backend_test]
    async fn publish_between_check_and_write(store: MemoryStore) {
        let election = draft(&store).await;
        let question = BallotManager::new(&store)
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();

        // The election is published just as the question is written.
        let racing = ContendedStore::with_rival(store.clone(), Rival::Publish(election.id));
        let result = BallotManager::new(&racing)
            .create_question(election.id, "Late".to_string())
            .await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        let election = draft(&store).await;
        let first = BallotManager::new(&store)
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();
        let racing = ContendedStore::with_rival(store.clone(), Rival::Publish(election.id));
        let result = BallotManager::new(&racing)
            .create_candidate(first.id, "Alice".to_string())
            .await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        let election = draft(&store).await;
        let second = BallotManager::new(&store)
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();
        let racing = ContendedStore::with_rival(store.clone(), Rival::Publish(election.id));
        let result = BallotManager::new(&racing)
            .update_question(second.id, "Changed".to_string())
            .await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        // None of the late writes landed.
        let ballot = BallotManager::new(&store);
        assert_eq!(ballot.all_questions().await.unwrap(), vec![question, first, second]);
        assert!(ballot.all_candidates().await.unwrap().is_empty());
    }

    #[backend_test]
    async fn delete_between_check_and_write(store: MemoryStore) {
        let election = draft(&store).await;
        let question = BallotManager::new(&store)
            .create_question(election.id, "Pick one".to_string())
            .await
            .unwrap();

        let racing = ContendedStore::with_rival(store.clone(), Rival::Delete(election.id));
        let result = BallotManager::new(&racing)
            .create_candidate(question.id, "Alice".to_string())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(BallotManager::new(&store)
            .all_candidates()
            .await
            .unwrap()
            .is_empty());
    }
}
