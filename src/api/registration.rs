use rocket::Route;

use crate::error::Result;
use crate::manager::RegistrationManager;
use crate::model::{
    api::{
        election::ElectionDescription,
        envelope::{Envelope, Reply},
        id::ApiId,
        registration::RegistrationDescription,
    },
    auth::{Authenticated, Caller, Oversee},
};
use crate::store::Store;

use super::{parse_id, IdParam};

pub fn routes() -> Vec<Route> {
    routes![registered_elections, election_users, register, unregister]
}

/// Elections the caller is registered for.
#[get("/registered")]
async fn registered_elections(
    caller: Caller<Authenticated>,
    store: Store,
) -> Result<Reply<Vec<ElectionDescription>>> {
    let elections = RegistrationManager::new(&*store)
        .list_registered(caller.user_id)
        .await?;
    Ok(Reply::ok(Envelope::list(
        elections.into_iter().map(ElectionDescription::from).collect(),
    )))
}

// Ranked below the static `/getAllQuestions/<id>` and `/getAllCandidates/<id>`.
#[get("/<id>/users", rank = 2)]
async fn election_users(
    _caller: Caller<Oversee>,
    id: IdParam,
    store: Store,
) -> Result<Reply<Vec<ApiId>>> {
    let users = RegistrationManager::new(&*store)
        .list_users(parse_id(id)?)
        .await?;
    Ok(Reply::ok(Envelope::list(
        users.into_iter().map(ApiId::from).collect(),
    )))
}

#[post("/<id>/register")]
async fn register(
    caller: Caller<Authenticated>,
    id: IdParam,
    store: Store,
) -> Result<Reply<RegistrationDescription>> {
    let registration = RegistrationManager::new(&*store)
        .register(parse_id(id)?, caller.user_id)
        .await?;
    Ok(Reply::created(
        Envelope::data(registration.into()).with_message("User registered successfully"),
    ))
}

#[post("/<id>/unregister")]
async fn unregister(caller: Caller<Authenticated>, id: IdParam, store: Store) -> Result<Reply<()>> {
    RegistrationManager::new(&*store)
        .unregister(parse_id(id)?, caller.user_id)
        .await?;
    Ok(Reply::ok(Envelope::message("User unregistered successfully")))
}
