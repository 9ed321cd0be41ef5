use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::manager::BallotManager;
use crate::model::{
    api::{
        ballot::{
            CandidateDescription, CandidatePatch, CandidateSpec, QuestionDescription,
            QuestionPatch, QuestionSpec,
        },
        envelope::{Envelope, Reply},
    },
    auth::{Authenticated, Caller, Manage},
};
use crate::store::Store;

use super::{parse_id, IdParam};

pub fn routes() -> Vec<Route> {
    routes![
        create_question,
        create_candidate,
        all_questions,
        questions_for_election,
        all_candidates,
        candidates_for_question,
        update_question,
        update_candidate,
        delete_question,
        delete_candidate,
    ]
}

#[post("/createQuestion", data = "<spec>", format = "json")]
async fn create_question(
    _caller: Caller<Manage>,
    spec: Json<QuestionSpec>,
    store: Store,
) -> Result<Reply<QuestionDescription>> {
    let spec = spec.0;
    let question = BallotManager::new(&*store)
        .create_question(spec.election_id.into(), spec.text)
        .await?;
    Ok(Reply::created(
        Envelope::data(question.into()).with_message("Question created successfully"),
    ))
}

#[post("/createCandidate", data = "<spec>", format = "json")]
async fn create_candidate(
    _caller: Caller<Manage>,
    spec: Json<CandidateSpec>,
    store: Store,
) -> Result<Reply<CandidateDescription>> {
    let spec = spec.0;
    let candidate = BallotManager::new(&*store)
        .create_candidate(spec.question_id.into(), spec.name)
        .await?;
    Ok(Reply::created(
        Envelope::data(candidate.into()).with_message("Candidate created successfully"),
    ))
}

#[get("/getAllQuestions")]
async fn all_questions(
    _caller: Caller<Authenticated>,
    store: Store,
) -> Result<Reply<Vec<QuestionDescription>>> {
    let questions = BallotManager::new(&*store).all_questions().await?;
    Ok(Reply::ok(Envelope::list(
        questions.into_iter().map(QuestionDescription::from).collect(),
    )))
}

#[get("/getAllQuestions/<election_id>", rank = 1)]
async fn questions_for_election(
    _caller: Caller<Authenticated>,
    election_id: IdParam,
    store: Store,
) -> Result<Reply<Vec<QuestionDescription>>> {
    let questions = BallotManager::new(&*store)
        .questions_for(parse_id(election_id)?)
        .await?;
    Ok(Reply::ok(Envelope::list(
        questions.into_iter().map(QuestionDescription::from).collect(),
    )))
}

#[get("/getAllCandidates")]
async fn all_candidates(
    _caller: Caller<Authenticated>,
    store: Store,
) -> Result<Reply<Vec<CandidateDescription>>> {
    let candidates = BallotManager::new(&*store).all_candidates().await?;
    Ok(Reply::ok(Envelope::list(
        candidates
            .into_iter()
            .map(CandidateDescription::from)
            .collect(),
    )))
}

#[get("/getAllCandidates/<question_id>", rank = 1)]
async fn candidates_for_question(
    _caller: Caller<Authenticated>,
    question_id: IdParam,
    store: Store,
) -> Result<Reply<Vec<CandidateDescription>>> {
    let candidates = BallotManager::new(&*store)
        .candidates_for(parse_id(question_id)?)
        .await?;
    Ok(Reply::ok(Envelope::list(
        candidates
            .into_iter()
            .map(CandidateDescription::from)
            .collect(),
    )))
}

#[put("/updateQuestion/<id>", data = "<patch>", format = "json", rank = 1)]
async fn update_question(
    _caller: Caller<Manage>,
    id: IdParam,
    patch: Json<QuestionPatch>,
    store: Store,
) -> Result<Reply<QuestionDescription>> {
    let question = BallotManager::new(&*store)
        .update_question(parse_id(id)?, patch.0.text)
        .await?;
    Ok(Reply::ok(
        Envelope::data(question.into()).with_message("Question updated successfully"),
    ))
}

#[put("/updateCandidate/<id>", data = "<patch>", format = "json", rank = 1)]
async fn update_candidate(
    _caller: Caller<Manage>,
    id: IdParam,
    patch: Json<CandidatePatch>,
    store: Store,
) -> Result<Reply<CandidateDescription>> {
    let candidate = BallotManager::new(&*store)
        .update_candidate(parse_id(id)?, patch.0.name)
        .await?;
    Ok(Reply::ok(
        Envelope::data(candidate.into()).with_message("Candidate updated successfully"),
    ))
}

#[delete("/deleteQuestion/<id>")]
async fn delete_question(_caller: Caller<Manage>, id: IdParam, store: Store) -> Result<Reply<()>> {
    BallotManager::new(&*store)
        .delete_question(parse_id(id)?)
        .await?;
    Ok(Reply::ok(Envelope::message("Question deleted successfully")))
}

#[delete("/deleteCandidate/<id>")]
async fn delete_candidate(
    _caller: Caller<Manage>,
    id: IdParam,
    store: Store,
) -> Result<Reply<()>> {
    BallotManager::new(&*store)
        .delete_candidate(parse_id(id)?)
        .await?;
    Ok(Reply::ok(Envelope::message("Candidate deleted successfully")))
}
