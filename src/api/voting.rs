use data_encoding::BASE64;
use log::info;
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::RequestId;
use crate::model::{
    auth::{AnyRole, Authorized, VoterOnly},
    authority::CredentialAuthority,
    ballot::{verify_commitment, Commitment, EncryptedBallot},
    identity::{Credential, PrincipalId},
    ledger::{Candidate, Chaincode},
};

pub fn routes() -> Vec<Route> {
    routes![cast, verify, candidates]
}

/// A ballot sealed by the voter's client under the election key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastRequest {
    /// Base64 ciphertext.
    pub ciphertext: String,
    pub commitment_hash: Commitment,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastReceipt {
    pub success: bool,
    pub voter_id: PrincipalId,
    pub commitment_hash: Commitment,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub verified: bool,
    pub voter_id: PrincipalId,
    pub commitment_hash: Commitment,
}

/// The ledger identity a session principal acts as.
async fn ledger_identity(
    authority: &CredentialAuthority,
    principal: &PrincipalId,
) -> Result<Credential> {
    match authority.credential_for(principal).await {
        Err(Error::NotFound(_)) => Err(Error::Unauthenticated(format!(
            "{principal} has no enrolled identity"
        ))),
        other => other,
    }
}

#[post("/vote/cast", data = "<request>", format = "json")]
async fn cast(
    voter: Authorized<VoterOnly>,
    request: Json<CastRequest>,
    authority: &State<CredentialAuthority>,
    chaincode: &State<Chaincode>,
    id: &RequestId,
) -> Result<Json<CastReceipt>> {
    let request = request.into_inner();
    let ciphertext = BASE64
        .decode(request.ciphertext.as_bytes())
        .map_err(|e| Error::BadRequest(format!("Ciphertext is not base64: {e}")))?;
    if ciphertext.is_empty() {
        return Err(Error::BadRequest("Ciphertext is empty".to_string()));
    }

    // Only the commitment recomputed over the received bytes is ever stored.
    let committed = EncryptedBallot::from_ciphertext(ciphertext).commit();
    committed.matches(&request.commitment_hash).into_result()?;

    let identity = ledger_identity(authority, &voter.principal).await?;
    let ballot = committed.submit_as(voter.principal.clone());
    chaincode.cast_vote(&identity, &ballot).await?;
    info!("req{id} ballot {} cast by {}", ballot.commitment_hash, voter.principal);

    Ok(Json(CastReceipt {
        success: true,
        voter_id: ballot.voter_id,
        commitment_hash: ballot.commitment_hash,
    }))
}

#[get("/vote/verify?<hash>")]
async fn verify(
    voter: Authorized<VoterOnly>,
    hash: &str,
    authority: &State<CredentialAuthority>,
    chaincode: &State<Chaincode>,
) -> Result<Json<VerifyResponse>> {
    let claimed: Commitment = hash.parse()?;
    let identity = ledger_identity(authority, &voter.principal).await?;
    let stored = chaincode.ballot(&identity, &voter.principal).await?;

    stored.verify().into_result()?;
    verify_commitment(&stored.ciphertext, &claimed).into_result()?;

    Ok(Json(VerifyResponse {
        verified: true,
        voter_id: stored.voter_id,
        commitment_hash: claimed,
    }))
}

#[get("/candidates")]
async fn candidates(
    _caller: Authorized<AnyRole>,
    authority: &State<CredentialAuthority>,
    chaincode: &State<Chaincode>,
) -> Result<Json<Vec<Candidate>>> {
    let admin = authority.admin_credential().await?;
    Ok(Json(chaincode.candidates(&admin).await?))
}

#[cfg(test)]
mod tests {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use rocket::serde::json::json;

    use super::*;
    use crate::api::test_support::{bearer, body, register};
    use crate::harness::Harness;
    use crate::model::auth::Role;
    use crate::model::ballot::{encrypt_and_commit, key::examples::PUBLIC_PEM, CommittedBallot};

    fn sealed(candidate: &str) -> CommittedBallot {
        encrypt_and_commit(PUBLIC_PEM, candidate).unwrap()
    }

    fn cast_body(ballot: &CommittedBallot) -> String {
        json!(ballot).to_string()
    }

    async fn cast_as(client: &Client, harness: &Harness, voter: &str, body: String) -> Status {
        client
            .post(uri!("/api", cast()))
            .header(ContentType::JSON)
            .header(bearer(harness, voter, Role::Voter))
            .body(body)
            .dispatch()
            .await
            .status()
    }

    async fn verify_as(client: &Client, harness: &Harness, voter: &str, hash: &str) -> Status {
        client
            .get(uri!("/api", verify(hash)))
            .header(bearer(harness, voter, Role::Voter))
            .dispatch()
            .await
            .status()
    }

    #[backend_test(admin)]
    async fn cast_then_verify(client: Client, harness: Harness) {
        assert_eq!(Status::Created, register(&client, &harness, "V1").await);

        let ballot = sealed("1");
        let hex = ballot.commitment_hash.to_hex();
        let response = client
            .post(uri!("/api", cast()))
            .header(ContentType::JSON)
            .header(bearer(&harness, "V1", Role::Voter))
            .body(cast_body(&ballot))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let receipt: CastReceipt = response.into_json().await.unwrap();
        assert!(receipt.success);
        assert_eq!(hex, receipt.commitment_hash.to_hex());

        assert_eq!(Status::Ok, verify_as(&client, &harness, "V1", &hex).await);
    }

    #[backend_test(admin)]
    async fn second_ballot_is_a_conflict(client: Client, harness: Harness) {
        register(&client, &harness, "V1").await;
        let first = cast_as(&client, &harness, "V1", cast_body(&sealed("1"))).await;
        assert_eq!(Status::Ok, first);

        let second = cast_as(&client, &harness, "V1", cast_body(&sealed("2"))).await;
        assert_eq!(Status::Conflict, second);
    }

    #[backend_test(admin)]
    async fn wrong_commitment_is_rejected_at_cast(client: Client, harness: Harness) {
        register(&client, &harness, "V1").await;
        let mut ballot = sealed("1");
        ballot.commitment_hash = Commitment::of(b"something else");

        let response = client
            .post(uri!("/api", cast()))
            .header(ContentType::JSON)
            .header(bearer(&harness, "V1", Role::Voter))
            .body(cast_body(&ballot))
            .dispatch()
            .await;
        assert_eq!(Status::UnprocessableEntity, response.status());
        assert_eq!("integrity_mismatch", body(response).await["kind"]);

        // Nothing was recorded.
        let hex = Commitment::of(b"something else").to_hex();
        assert_eq!(Status::NotFound, verify_as(&client, &harness, "V1", &hex).await);
    }

    #[backend_test(admin)]
    async fn garbage_ciphertext_is_a_bad_request(client: Client, harness: Harness) {
        register(&client, &harness, "V1").await;
        let payload = json!({
            "ciphertext": "not base64!",
            "commitmentHash": Commitment::of(b"").to_hex(),
        });
        let status = cast_as(&client, &harness, "V1", payload.to_string()).await;
        assert_eq!(Status::BadRequest, status);
    }

    #[backend_test(admin)]
    async fn verify_distinguishes_missing_from_mismatched(client: Client, harness: Harness) {
        register(&client, &harness, "V1").await;
        let ballot = sealed("3");
        let hex = ballot.commitment_hash.to_hex();

        assert_eq!(Status::NotFound, verify_as(&client, &harness, "V1", &hex).await);

        cast_as(&client, &harness, "V1", cast_body(&ballot)).await;
        let other = Commitment::of(b"not my ballot").to_hex();
        assert_eq!(
            Status::UnprocessableEntity,
            verify_as(&client, &harness, "V1", &other).await
        );

        harness.ledger.tamper("V1");
        assert_eq!(
            Status::UnprocessableEntity,
            verify_as(&client, &harness, "V1", &hex).await
        );
    }

    #[backend_test(admin)]
    async fn only_voters_cast(client: Client, harness: Harness) {
        let payload = cast_body(&sealed("1"));

        let anonymous = client
            .post(uri!("/api", cast()))
            .header(ContentType::JSON)
            .body(payload.clone())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, anonymous.status());
        assert_eq!("unauthenticated", body(anonymous).await["kind"]);

        let admin = client
            .post(uri!("/api", cast()))
            .header(ContentType::JSON)
            .header(bearer(&harness, "admin", Role::Admin))
            .body(payload)
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, admin.status());
        assert_eq!("forbidden", body(admin).await["kind"]);
    }

    #[backend_test(admin)]
    async fn unknown_principals_are_unauthenticated(client: Client, harness: Harness) {
        // The token is well formed, but V9 was never enrolled.
        let status = cast_as(&client, &harness, "V9", cast_body(&sealed("1"))).await;
        assert_eq!(Status::Unauthorized, status);
    }

    #[backend_test(admin)]
    async fn any_role_lists_candidates(client: Client, harness: Harness) {
        register(&client, &harness, "V1").await;
        let seed = client
            .post("/api/candidates/seed")
            .header(bearer(&harness, "admin", Role::Admin))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, seed.status());

        let response = client
            .get(uri!("/api", candidates()))
            .header(bearer(&harness, "V1", Role::Voter))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let candidates: Vec<Candidate> = response.into_json().await.unwrap();
        assert_eq!(Candidate::defaults(), candidates);
    }

    #[backend_test(admin)]
    async fn unavailable_ledger_is_reported(client: Client, harness: Harness) {
        harness.ledger.set_available(false);
        let response = client
            .get(uri!("/api", candidates()))
            .header(bearer(&harness, "admin", Role::Admin))
            .dispatch()
            .await;
        assert_eq!(Status::ServiceUnavailable, response.status());
        assert_eq!("ledger_unavailable", body(response).await["kind"]);
    }
}
