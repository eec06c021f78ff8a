use std::marker::PhantomData;
use std::ops::Deref;

use log::error;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};

use super::{gate, AuthContext, Permission, SessionAuthenticator};
use crate::error::{Error, ErrorKind};

/// Why a request failed authentication or authorization, kept in the request
/// cache so the catcher and the response log can report it.
#[derive(Debug, Clone)]
pub struct AuthFailure {
    pub kind: ErrorKind,
    pub message: String,
}

/// A request guard yielding the caller's [`AuthContext`] once it has been
/// authenticated and found to hold one of the roles `P` permits.
///
/// Fails with 401 when there is no valid session and 403 when the session is
/// valid but lacks the role.
pub struct Authorized<P> {
    context: AuthContext,
    phantom: PhantomData<P>,
}

impl<P> Authorized<P> {
    pub fn into_context(self) -> AuthContext {
        self.context
    }
}

impl<P> Deref for Authorized<P> {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

fn reject<S>(req: &Request<'_>, err: Error) -> Outcome<S, Error> {
    req.local_cache(|| {
        Some(AuthFailure {
            kind: err.kind(),
            message: err.to_string(),
        })
    });
    Outcome::Failure((err.status(), err))
}

#[rocket::async_trait]
impl<'r, P> FromRequest<'r> for Authorized<P>
where
    P: Permission + Send,
{
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(sessions) = req.rocket().state::<SessionAuthenticator>() else {
            error!("No session authenticator in managed state");
            let err = Error::Unauthenticated("Sessions are unavailable".to_string());
            return Outcome::Failure((Status::InternalServerError, err));
        };

        let header = req.headers().get_one("Authorization");
        let context = match sessions.authenticate_bearer(header).await {
            Ok(context) => context,
            Err(err) => return reject(req, err),
        };

        match gate::require(&context, P::ROLES) {
            Ok(()) => Outcome::Success(Self {
                context,
                phantom: PhantomData,
            }),
            Err(err) => reject(req, err),
        }
    }
}
