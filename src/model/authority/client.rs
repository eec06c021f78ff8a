use std::fmt::{Debug, Formatter};
use std::time::Duration;

use data_encoding::BASE64;
use reqwest::{header::AUTHORIZATION, Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::identity::{Credential, PrincipalId};

const PEER: &str = "credential authority";

/// A one-time secret the authority hands out at registration, to be
/// exchanged for a certificate at enrollment.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentSecret(String);

impl EnrollmentSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for EnrollmentSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnrollmentSecret(<redacted>)")
    }
}

/// Certificate and key material returned by a successful enrollment.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCertificate {
    pub certificate: String,
    pub private_key: String,
}

impl Debug for IssuedCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}

/// An attribute embedded in the issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub ecert: bool,
}

/// A request to register a new principal with the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationRequest {
    #[serde(rename = "enrollmentID")]
    pub enrollment_id: PrincipalId,
    pub affiliation: String,
    #[serde(rename = "role")]
    pub identity_type: String,
    pub attrs: Vec<Attribute>,
}

/// The external certificate authority.
#[rocket::async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Register a principal, acting as `registrar`, receiving the one-time
    /// enrollment secret.
    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &Credential,
    ) -> Result<EnrollmentSecret>;

    /// Exchange an enrollment secret for a signed certificate and key pair.
    async fn enroll(
        &self,
        enrollment_id: &PrincipalId,
        secret: &EnrollmentSecret,
    ) -> Result<IssuedCertificate>;
}

/// Talks JSON over HTTP to the CA gateway.
pub struct FabricCaClient {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EnrollRequest<'a> {
    #[serde(rename = "enrollmentID")]
    enrollment_id: &'a str,
    #[serde(rename = "enrollmentSecret")]
    enrollment_secret: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    secret: EnrollmentSecret,
}

impl FabricCaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(PEER)
    } else if err.is_connect() {
        Error::Authority(format!("unreachable: {err}"))
    } else {
        Error::Authority(err.to_string())
    }
}

/// Decode a successful response body, or turn a failure status into an
/// [`Error::Authority`] carrying whatever the authority said.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Authority(format!("{status}: {body}")));
    }
    response
        .json()
        .await
        .map_err(|e| Error::Authority(format!("malformed response: {e}")))
}

#[rocket::async_trait]
impl CertificateAuthority for FabricCaClient {
    async fn register(
        &self,
        request: &RegistrationRequest,
        registrar: &Credential,
    ) -> Result<EnrollmentSecret> {
        let registrar_token = BASE64.encode(registrar.certificate.as_bytes());
        let response = self
            .http
            .post(self.url("register"))
            .header(AUTHORIZATION, format!("Registrar {registrar_token}"))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        let body: RegisterResponse = decode(response).await?;
        Ok(body.secret)
    }

    async fn enroll(
        &self,
        enrollment_id: &PrincipalId,
        secret: &EnrollmentSecret,
    ) -> Result<IssuedCertificate> {
        let request = EnrollRequest {
            enrollment_id: enrollment_id.as_str(),
            enrollment_secret: secret.expose(),
        };
        let response = self
            .http
            .post(self.url("enroll"))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}
