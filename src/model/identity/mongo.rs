use log::debug;
use mongodb::{
    bson::doc,
    error::{Error as DbError, ErrorKind as DbErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, Database, IndexModel,
};

use super::{Credential, IdentityStore, PrincipalId};
use crate::error::{Error, Result};

/// The mongodb crate does not name its server error codes.
const DUPLICATE_KEY: i32 = 11000;

const IDENTITIES: &str = "identities";

/// An identity store backed by a MongoDB collection with a unique index on
/// the principal id.
#[derive(Clone)]
pub struct MongoWallet {
    identities: Collection<Credential>,
}

impl MongoWallet {
    /// Connect to the given deployment and prepare the identity collection.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Self::from_db(&client.database(database)).await
    }

    /// Use the identity collection of `db`, ensuring its index exists.
    ///
    /// This operation is idempotent.
    pub async fn from_db(db: &Database) -> Result<Self> {
        let identities = db.collection::<Credential>(IDENTITIES);
        debug!("Ensuring identity collection index exists");
        let unique = IndexOptions::builder().unique(true).build();
        let index = IndexModel::builder()
            .keys(doc! {"principalId": 1})
            .options(unique)
            .build();
        identities.create_index(index, None).await?;
        Ok(Self { identities })
    }
}

/// Is this the server rejecting a second document for the same key?
fn is_duplicate_key(err: &DbError) -> bool {
    matches!(
        *err.kind,
        DbErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == DUPLICATE_KEY
    )
}

#[rocket::async_trait]
impl IdentityStore for MongoWallet {
    async fn get(&self, principal: &PrincipalId) -> Result<Credential> {
        self.identities
            .find_one(doc! {"principalId": principal.as_str()}, None)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No credential for {principal}")))
    }

    async fn put(&self, credential: Credential) -> Result<()> {
        let principal = credential.principal_id.clone();
        match self.identities.insert_one(&credential, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(Error::AlreadyExists(principal.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
