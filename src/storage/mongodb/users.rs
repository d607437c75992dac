//! MongoDB UserStore implementation.

use async_trait::async_trait;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::{Role, User};
use crate::storage::{Result, UserStore};

use super::{map_duplicate_key, USERS_COLLECTION};

/// Stored shape of a user.
#[derive(Debug, Serialize, Deserialize)]
struct UserDoc {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
}

impl From<&User> for UserDoc {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl TryFrom<UserDoc> for User {
    type Error = crate::storage::StorageError;

    fn try_from(doc: UserDoc) -> Result<Self> {
        Ok(User {
            id: Uuid::parse_str(&doc.id)?,
            name: doc.name,
            email: doc.email,
            password_hash: doc.password_hash,
            role: doc.role,
            created_at: doc.created_at,
        })
    }
}

/// MongoDB implementation of UserStore.
pub struct MongoUserStore {
    users: Collection<UserDoc>,
}

impl MongoUserStore {
    /// Create the store and ensure the unique email index exists.
    pub async fn new(database: &Database) -> Result<Self> {
        let users = database.collection(USERS_COLLECTION);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users.create_index(email_index).await?;

        Ok(Self { users })
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert(&self, user: &User) -> Result<()> {
        self.users
            .insert_one(UserDoc::from(user))
            .await
            .map_err(|e| map_duplicate_key(e, "email"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let doc = self
            .users
            .find_one(doc! { "_id": id.to_string() })
            .await?;
        doc.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let doc = self.users.find_one(doc! { "email": email }).await?;
        doc.map(User::try_from).transpose()
    }
}
