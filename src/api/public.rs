use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{authority::Bootstrap, ballot::ElectionKey};

pub fn routes() -> Vec<Route> {
    routes![health, public_key]
}

#[derive(Debug, Serialize)]
struct Health {
    alive: bool,
    bootstrap: Option<Bootstrap>,
}

#[get("/health")]
fn health(bootstrap: Option<&State<Bootstrap>>) -> Json<Health> {
    Json(Health {
        alive: true,
        bootstrap: bootstrap.map(|b| b.inner().clone()),
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub public_key: String,
    pub bits: usize,
    pub scheme: String,
}

#[get("/election/public-key")]
fn public_key(key: Option<&State<ElectionKey>>) -> Result<Json<PublicKey>> {
    let key = key.ok_or_else(|| Error::NotFound("No election key is published".to_string()))?;
    Ok(Json(PublicKey {
        public_key: key.pem().to_string(),
        bits: key.bits(),
        scheme: "RSA-OAEP-SHA256".to_string(),
    }))
}
