use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::{candidate::Candidate, question::Question},
};

/// A request to add a question to an election.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub election_id: ApiId,
    pub text: String,
}

/// A request to change a question's text.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionPatch {
    pub text: String,
}

/// A request to add a candidate to a question.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub question_id: ApiId,
    pub name: String,
}

/// A request to rename a candidate.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidatePatch {
    pub name: String,
}

/// An API-friendly question description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub text: String,
}

impl From<Question> for QuestionDescription {
    fn from(question: Question) -> Self {
        Self {
            id: question.id.into(),
            election_id: question.question.election_id.into(),
            text: question.question.text,
        }
    }
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub question_id: ApiId,
    pub name: String,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            question_id: candidate.candidate.question_id.into(),
            name: candidate.candidate.name,
        }
    }
}
