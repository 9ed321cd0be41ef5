use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::manager::ElectionManager;
use crate::model::{
    api::{
        election::{ElectionDescription, ElectionPatch, ElectionSpec, VisibilityRequest},
        envelope::{Envelope, Reply},
    },
    auth::{Authenticated, Caller, Manage},
};
use crate::store::Store;

use super::{parse_id, IdParam};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        list_elections,
        get_election,
        update_election,
        delete_election,
        launch_election,
        publish_election,
        set_results_visibility,
    ]
}

#[post("/createElection", data = "<spec>", format = "json")]
async fn create_election(
    caller: Caller<Authenticated>,
    spec: Json<ElectionSpec>,
    store: Store,
) -> Result<Reply<ElectionDescription>> {
    let election = ElectionManager::new(&*store)
        .create(spec.0.into(), caller.user_id)
        .await?;
    Ok(Reply::created(
        Envelope::data(election.into()).with_message("Election created successfully"),
    ))
}

#[get("/")]
async fn list_elections(
    _caller: Caller<Authenticated>,
    store: Store,
) -> Result<Reply<Vec<ElectionDescription>>> {
    let elections = ElectionManager::new(&*store).list().await?;
    Ok(Reply::ok(Envelope::list(
        elections.into_iter().map(ElectionDescription::from).collect(),
    )))
}

#[get("/<id>")]
async fn get_election(
    _caller: Caller<Authenticated>,
    id: IdParam,
    store: Store,
) -> Result<Reply<ElectionDescription>> {
    let election = ElectionManager::new(&*store).get(parse_id(id)?).await?;
    Ok(Reply::ok(Envelope::data(election.into())))
}

#[put("/<id>", data = "<patch>", format = "json")]
async fn update_election(
    _caller: Caller<Manage>,
    id: IdParam,
    patch: Json<ElectionPatch>,
    store: Store,
) -> Result<Reply<ElectionDescription>> {
    let election = ElectionManager::new(&*store)
        .update(parse_id(id)?, patch.0)
        .await?;
    Ok(Reply::ok(
        Envelope::data(election.into()).with_message("Election updated successfully"),
    ))
}

#[delete("/<id>")]
async fn delete_election(
    _caller: Caller<Manage>,
    id: IdParam,
    store: Store,
) -> Result<Reply<()>> {
    ElectionManager::new(&*store).delete(parse_id(id)?).await?;
    Ok(Reply::ok(Envelope::message("Election deleted successfully")))
}

#[post("/<id>/launch")]
async fn launch_election(
    caller: Caller<Authenticated>,
    id: IdParam,
    store: Store,
) -> Result<Reply<ElectionDescription>> {
    let election = ElectionManager::new(&*store)
        .launch(parse_id(id)?, caller.user_id)
        .await?;
    Ok(Reply::ok(
        Envelope::data(election.into()).with_message("Election launched successfully"),
    ))
}

#[post("/<id>/publish")]
async fn publish_election(
    caller: Caller<Authenticated>,
    id: IdParam,
    store: Store,
) -> Result<Reply<ElectionDescription>> {
    let election = ElectionManager::new(&*store)
        .publish(parse_id(id)?, caller.user_id)
        .await?;
    Ok(Reply::ok(
        Envelope::data(election.into()).with_message("Election published successfully"),
    ))
}

// Ranked below the static `/updateQuestion/<id>` and `/updateCandidate/<id>`.
#[put("/<id>/results-visibility", data = "<request>", format = "json", rank = 2)]
async fn set_results_visibility(
    caller: Caller<Manage>,
    id: IdParam,
    request: Json<VisibilityRequest>,
    store: Store,
) -> Result<Reply<ElectionDescription>> {
    let election = ElectionManager::new(&*store)
        .set_results_visibility(parse_id(id)?, request.visible, caller.user_id)
        .await?;
    Ok(Reply::ok(
        Envelope::data(election.into()).with_message("Results visibility updated"),
    ))
}
