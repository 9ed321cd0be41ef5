//! Types shared between the API and the database representations.

pub mod election;
pub mod role;
