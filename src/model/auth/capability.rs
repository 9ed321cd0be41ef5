use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::role::{Rights, Role},
    mongodb::Id,
};

use super::token::{AuthToken, AUTH_TOKEN_COOKIE};

/// What a caller must hold to perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    /// The caller must hold an admin account.
    pub admin: bool,
    /// The caller must hold at least one of these roles. Empty means any.
    pub roles: &'static [Role],
}

impl Requirement {
    /// Does a caller with the given rights and roles satisfy this requirement?
    pub fn admits(&self, rights: Rights, roles: &[Role]) -> bool {
        if self.admin && rights != Rights::Admin {
            return false;
        }
        self.roles.is_empty() || self.roles.iter().any(|role| roles.contains(role))
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.admin {
            write!(f, "admin")?;
        } else {
            write!(f, "authenticated")?;
        }
        if !self.roles.is_empty() {
            let roles: Vec<String> = self.roles.iter().map(Role::to_string).collect();
            write!(f, " with one of [{}]", roles.join(", "))?;
        }
        Ok(())
    }
}

/// A named requirement, attached to a route through [`Caller`].
pub trait Capability {
    const REQUIRED: Requirement;
}

/// Any signed-in user.
pub struct Authenticated;

impl Capability for Authenticated {
    const REQUIRED: Requirement = Requirement {
        admin: false,
        roles: &[],
    };
}

/// Admins who may edit elections and ballots.
pub struct Manage;

impl Capability for Manage {
    const REQUIRED: Requirement = Requirement {
        admin: true,
        roles: &[Role::SuperAdmin, Role::Commissioner, Role::Admin],
    };
}

/// Admins who may see who is registered for an election.
pub struct Oversee;

impl Capability for Oversee {
    const REQUIRED: Requirement = Requirement {
        admin: true,
        roles: &[Role::SuperAdmin, Role::Commissioner],
    };
}

/// A verified caller, known to satisfy the capability `C`.
///
/// As a request guard this is the single point where authorization is
/// decided, and it always runs before the handler body.
pub struct Caller<C> {
    pub user_id: Id,
    pub rights: Rights,
    pub roles: Vec<Role>,
    phantom: PhantomData<fn() -> C>,
}

#[rocket::async_trait]
impl<'r, C> FromRequest<'r> for Caller<C>
where
    C: Capability + 'static,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and check it against `C::REQUIRED`.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::Internal("Config is not managed".to_string()),
                ))
            }
        };

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::Unauthorized("missing authentication token".to_string()),
                ))
            }
        };

        let token = match AuthToken::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        if !C::REQUIRED.admits(token.rights, &token.roles) {
            debug!("User {} denied: requires {}", token.id, C::REQUIRED);
            return Outcome::Failure((
                Status::Forbidden,
                Error::Forbidden(format!("requires {}", C::REQUIRED)),
            ));
        }

        Outcome::Success(Self {
            user_id: token.id,
            rights: token.rights,
            roles: token.roles,
            phantom: PhantomData,
        })
    }
}
