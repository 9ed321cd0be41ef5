use mongodb::bson::oid;
use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{Error, Result};
use crate::model::{api::envelope::Envelope, mongodb::Id};

mod ballot;
mod election;
mod registration;

/// Where the API is mounted.
pub const MOUNT: &str = "/elections";

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(election::routes());
    routes.extend(ballot::routes());
    routes.extend(registration::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Render failures raised before a handler runs, e.g. by request guards or
/// body parsing, in the same envelope handlers use.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> (Status, Json<Envelope<()>>) {
    let message = status.reason().unwrap_or("Request failed");
    (status, Json(Envelope::failure(message, None)))
}

/// An ID taken from the path. Parsing never fails the route, so malformed
/// IDs surface as 400 rather than falling through to 404.
type IdParam = std::result::Result<Id, oid::Error>;

fn parse_id(id: IdParam) -> Result<Id> {
    id.map_err(|e| Error::BadRequest(format!("Malformed ID: {e}")))
}

/// Routes and helpers for driving the API from tests.
#[cfg(test)]
pub(crate) mod testing {
    use rocket::{
        http::{ContentType, CookieJar, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
        Route, State,
    };
    use serde::{de::DeserializeOwned, Serialize};

    use crate::model::{api::envelope::Envelope, auth::AuthToken};
    use crate::Config;

    use super::*;

    pub fn routes() -> Vec<Route> {
        routes![login_as]
    }

    /// Sign in as the holder of any token. Stands in for the identity service.
    #[post("/test/login", data = "<token>", format = "json")]
    fn login_as(token: Json<AuthToken>, config: &State<Config>, cookies: &CookieJar<'_>) {
        cookies.add(token.0.into_cookie(config));
    }

    /// Replace the client's auth cookie with one for `token`.
    pub async fn login(client: &Client, token: &AuthToken) {
        let response = client
            .post(uri!(login_as))
            .header(ContentType::JSON)
            .body(serde_json::to_string(token).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
    }

    /// Serialise a request body.
    pub fn json(body: &impl Serialize) -> String {
        serde_json::to_string(body).unwrap()
    }

    /// Check the status and return the decoded envelope.
    pub async fn expect<T>(response: LocalResponse<'_>, status: Status) -> Envelope<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        assert_eq!(response.status(), status);
        let envelope: Envelope<T> = response.into_json().await.unwrap();
        assert_eq!(envelope.success, status.class().is_success());
        envelope
    }
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::testing::expect;

    #[backend_test]
    async fn guard_failures_use_envelope(client: Client) {
        // Not signed in.
        let response = client.get("/elections").dispatch().await;
        let envelope = expect::<()>(response, Status::Unauthorized).await;
        assert_eq!(envelope.message.as_deref(), Some("Unauthorized"));

        // No such route.
        let response = client.get("/nowhere").dispatch().await;
        expect::<()>(response, Status::NotFound).await;
    }

    #[backend_test(voter)]
    async fn malformed_id_is_bad_request(client: Client) {
        let response = client.get("/elections/not-an-id").dispatch().await;
        let envelope = expect::<()>(response, Status::BadRequest).await;
        assert!(envelope.message.unwrap().contains("Malformed ID"));
    }
}
