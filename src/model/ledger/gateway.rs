use std::time::Duration;

use data_encoding::BASE64;
use reqwest::{Client, StatusCode};
use rocket::serde::json::serde_json;
use serde::{Deserialize, Serialize};

use super::Ledger;
use crate::error::{Error, Result};
use crate::model::identity::Credential;

const MSP_HEADER: &str = "X-Fabric-MSP-ID";
const IDENTITY_HEADER: &str = "X-Fabric-Identity";

/// A [`Ledger`] behind the HTTP gateway for one channel and chaincode.
pub struct GatewayLedger {
    http: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct Invocation<'a> {
    function: &'a str,
    args: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FailureKind {
    AlreadyExists,
    NotFound,
    Chaincode,
}

#[derive(Debug, Deserialize)]
struct Failure {
    kind: FailureKind,
    message: String,
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        match failure.kind {
            FailureKind::AlreadyExists => Error::ChaincodeAlreadyExists(failure.message),
            FailureKind::NotFound => Error::NotFound(failure.message),
            FailureKind::Chaincode => Error::Chaincode(failure.message),
        }
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout("ledger")
    } else {
        Error::LedgerUnavailable(err.to_string())
    }
}

impl GatewayLedger {
    pub fn new(
        ledger_url: &str,
        channel: &str,
        chaincode: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        let endpoint = format!(
            "{}/channels/{channel}/chaincodes/{chaincode}",
            ledger_url.trim_end_matches('/')
        );
        Ok(Self { http, endpoint })
    }

    async fn invoke(
        &self,
        mode: &str,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        let response = self
            .http
            .post(format!("{}/{mode}", self.endpoint))
            .header(MSP_HEADER, identity.organization_id.as_str())
            .header(IDENTITY_HEADER, BASE64.encode(identity.certificate.as_bytes()))
            .json(&Invocation {
                function: name,
                args,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        if status.is_success() {
            return Ok(body.to_vec());
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(Error::LedgerUnavailable(format!("{name}: gateway returned {status}")));
        }
        match serde_json::from_slice::<Failure>(&body) {
            Ok(failure) => Err(failure.into()),
            Err(_) => Err(Error::Chaincode(format!(
                "{name}: {status} {}",
                String::from_utf8_lossy(&body)
            ))),
        }
    }
}

#[rocket::async_trait]
impl Ledger for GatewayLedger {
    async fn submit_transaction(
        &self,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        self.invoke("submit", identity, name, args).await
    }

    async fn evaluate_transaction(
        &self,
        identity: &Credential,
        name: &str,
        args: &[String],
    ) -> Result<Vec<u8>> {
        self.invoke("evaluate", identity, name, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::identity::PrincipalId;

    #[test]
    fn failure_kinds_are_structured() {
        let failure: Failure =
            serde_json::from_str(r#"{"kind":"already_exists","message":"candidate 1"}"#).unwrap();
        assert!(matches!(
            Error::from(failure),
            Error::ChaincodeAlreadyExists(m) if m == "candidate 1"
        ));

        let failure: Failure =
            serde_json::from_str(r#"{"kind":"not_found","message":"ballot V1"}"#).unwrap();
        assert!(matches!(Error::from(failure), Error::NotFound(_)));
    }

    #[rocket::async_test]
    async fn unreachable_gateway_is_unavailable() {
        let ledger =
            GatewayLedger::new("http://127.0.0.1:9/", "mychannel", "voting", Duration::from_secs(2))
                .unwrap();
        assert_eq!(
            "http://127.0.0.1:9/channels/mychannel/chaincodes/voting",
            ledger.endpoint
        );

        let identity = Credential::example(&PrincipalId::example());
        let result = ledger
            .evaluate_transaction(&identity, "GetAllCandidates", &[])
            .await;
        assert!(matches!(
            result,
            Err(Error::LedgerUnavailable(_)) | Err(Error::Timeout(_))
        ));
    }
}
