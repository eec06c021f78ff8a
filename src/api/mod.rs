use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{ErrorBody, ErrorKind};
use crate::model::auth::AuthFailure;

mod admin;
mod public;
mod voting;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(admin::routes());
    routes.extend(public::routes());
    routes.extend(voting::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![json_error]
}

/// Answer every uncaught failure with the same JSON body route errors use,
/// carrying the reason an auth guard recorded if there was one.
#[catch(default)]
fn json_error(status: Status, req: &Request) -> (Status, Json<ErrorBody>) {
    let (kind, message) = match req.local_cache(|| None::<AuthFailure>) {
        Some(failure) => (failure.kind, failure.message.clone()),
        None => {
            let kind = match status.code {
                400 | 422 => ErrorKind::BadRequest,
                401 => ErrorKind::Unauthenticated,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            };
            (kind, status.reason_lossy().to_string())
        }
    };
    let body = ErrorBody {
        success: false,
        kind,
        message,
    };
    (status, Json(body))
}

#[cfg(test)]
pub(crate) mod test_support {
    use rocket::http::{ContentType, Header, Status};
    use rocket::local::asynchronous::Client;
    use rocket::serde::json::{json, serde_json::Value};

    use crate::harness::Harness;
    use crate::model::auth::Role;

    pub fn bearer(harness: &Harness, principal: &str, role: Role) -> Header<'static> {
        Header::new("Authorization", harness.bearer(principal, role))
    }

    /// Register and enroll `voter` through the API, as the administrator.
    pub async fn register(client: &Client, harness: &Harness, voter: &str) -> Status {
        client
            .post("/api/voter/register")
            .header(ContentType::JSON)
            .header(bearer(harness, "admin", Role::Admin))
            .body(json!({ "voterId": voter }).to_string())
            .dispatch()
            .await
            .status()
    }

    pub async fn body(response: rocket::local::asynchronous::LocalResponse<'_>) -> Value {
        response.into_json().await.unwrap()
    }
}
