use log::info;
use rocket::{http::Status, serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    auth::{AdminOnly, Authorized, Tallier},
    authority::CredentialAuthority,
    identity::PrincipalId,
    ledger::{Candidate, CandidateTally, Chaincode, SeedReport},
};

pub fn routes() -> Vec<Route> {
    routes![register_voter, seed_candidates, results]
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVoterRequest {
    pub voter_id: PrincipalId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterRegistered {
    pub success: bool,
    pub voter_id: PrincipalId,
}

#[post("/voter/register", data = "<request>", format = "json")]
async fn register_voter(
    admin: Authorized<AdminOnly>,
    request: Json<RegisterVoterRequest>,
    authority: &State<CredentialAuthority>,
    chaincode: &State<Chaincode>,
    id: &RequestId,
) -> Result<(Status, Json<VoterRegistered>)> {
    let voter = request.into_inner().voter_id;
    let enrolled = authority.register_voter(&admin, &voter).await;

    // A voter already holding a credential is put on the roll anyway, so a
    // request that failed at the ledger step can be repeated.
    if matches!(enrolled, Ok(_) | Err(Error::AlreadyRegistered(_))) {
        let registrar = authority.admin_credential().await?;
        chaincode.register_voter(&registrar, &voter).await?;
    }
    enrolled?;

    info!("req{id} {} registered voter {voter}", admin.principal);
    Ok((
        Status::Created,
        Json(VoterRegistered {
            success: true,
            voter_id: voter,
        }),
    ))
}

#[post("/candidates/seed")]
async fn seed_candidates(
    _admin: Authorized<AdminOnly>,
    authority: &State<CredentialAuthority>,
    chaincode: &State<Chaincode>,
) -> Result<Json<SeedReport>> {
    let registrar = authority.admin_credential().await?;
    let report = chaincode
        .seed_candidates(&registrar, &Candidate::defaults())
        .await?;
    Ok(Json(report))
}

#[get("/results/<candidate>")]
async fn results(
    _caller: Authorized<Tallier>,
    candidate: &str,
    authority: &State<CredentialAuthority>,
    chaincode: &State<Chaincode>,
) -> Result<Json<CandidateTally>> {
    let registrar = authority.admin_credential().await?;
    Ok(Json(chaincode.results(&registrar, candidate).await?))
}
