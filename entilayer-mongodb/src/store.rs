use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Document, Bson, doc, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection,
    options::{ClientOptions, ConnectionString, ReturnDocument},
};
use tokio::sync::OnceCell;
use entilayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    query::Query,
};

use crate::query::{find_filter, find_options};


fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// MongoDB storage backend.
///
/// Each entity type maps to the MongoDB collection of the same name in one database.
///
/// The client is created on first use. Resolving a `mongodb+srv://` host needs DNS, so a
/// failed lookup is reported by the operation that triggered it instead of at startup.
#[derive(Debug)]
pub struct MongoDbStore {
    dsn: String,
    database: String,
    client: OnceCell<Client>,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self {
            dsn: String::new(),
            database,
            client: OnceCell::new_with(Some(client)),
        }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    async fn client(&self) -> DocumentStoreResult<&Client> {
        self.client
            .get_or_try_init(|| async {
                let options = ClientOptions::parse(&self.dsn).await.map_err(backend_error)?;
                Client::with_options(options).map_err(backend_error)
            })
            .await
    }

    async fn get_collection(&self, collection_name: &str) -> DocumentStoreResult<MongoCollection<Document>> {
        Ok(self
            .client()
            .await?
            .database(&self.database)
            .collection(collection_name))
    }

    /// Puts `_id` first, the way MongoDB stores it.
    fn prepare_document(&self, id: &ObjectId, document: &Bson) -> DocumentStoreResult<Document> {
        let fields = document
            .as_document()
            .cloned()
            .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?;

        Ok(Document::from_iter(
            std::iter::once((ID_FIELD.to_string(), Bson::ObjectId(*id)))
                .chain(fields.into_iter().filter(|(key, _)| key != ID_FIELD)),
        ))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(ObjectId, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .await?
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<ObjectId>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .await?
                .find(doc! { ID_FIELD: { "$in": ids } })
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(Bson::Document)
                .collect()
        )
    }

    async fn update_document(&self, id: ObjectId, fields: Document, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        Ok(
            self.get_collection(collection)
                .await?
                .find_one_and_update(doc! { ID_FIELD: id }, doc! { "$set": fields })
                .return_document(ReturnDocument::After)
                .await
                .map_err(backend_error)?
                .map(Bson::Document)
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .await?
                .find(find_filter(&query))
                .with_options(find_options(&query))
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(Bson::Document)
                .collect()
        )
    }

    async fn ping(&self) -> DocumentStoreResult<()> {
        self.client()
            .await?
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        if let Some(client) = self.client.get() {
            client.clone().shutdown().await;
        }

        Ok(())
    }
}

/// Builder for [`MongoDbStore`].
///
/// Building only validates the connection string. Host resolution and connecting happen
/// on the first operation, so an unreachable server or a failed SRV lookup surfaces there.
#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        ConnectionString::parse(&self.dsn)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        Ok(MongoDbStore {
            dsn: self.dsn,
            database: self.database,
            client: OnceCell::new(),
        })
    }
}
