//! Domain rules over the store: the election lifecycle, the ballot, and
//! voter registration.

use crate::error::{Error, Result};
use crate::model::{db::election::Election, mongodb::Id};
use crate::store::ElectionStore;

mod ballot;
mod lifecycle;
mod registration;

pub use ballot::BallotManager;
pub use lifecycle::ElectionManager;
pub use registration::RegistrationManager;

/// Fetch an election or fail with `NotFound`.
async fn find_election(store: &dyn ElectionStore, id: Id) -> Result<Election> {
    store
        .find_election(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election {id}")))
}

/// The error for an operation the election's current status forbids.
fn invalid_state(election: &Election, action: &str) -> Error {
    Error::InvalidState(format!(
        "Election {} is {}; cannot {action}",
        election.id, election.status
    ))
}

/// Reject empty text fields.
fn require_text(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}
