//! MongoDB-backed recipe collection access.
//!
//! Every operation builds its own client with a bounded server-selection
//! timeout so an unreachable host fails fast, and shuts the client down before
//! returning.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, CountOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};

use super::{DocumentStore, IndexDescriptor, IndexField, IndexKind, StoreError};
use crate::config::MongoSettings;

const PARSED_FIELD: &str = "parsed_ingredients_details";
const NAMESPACE_NOT_FOUND: i32 = 26;

pub struct MongoStore {
    uri: String,
    database: String,
    collection: String,
    server_selection_timeout: Duration,
}

impl MongoStore {
    pub fn new(settings: &MongoSettings) -> Self {
        Self {
            uri: settings.uri.clone(),
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            server_selection_timeout: Duration::from_millis(settings.server_selection_timeout_ms),
        }
    }

    async fn connect(&self) -> Result<Client, StoreError> {
        let mut options = ClientOptions::parse(&self.uri).await?;
        options.server_selection_timeout = Some(self.server_selection_timeout);
        options.app_name = Some("foodsync".to_string());
        Ok(Client::with_options(options)?)
    }

    fn recipes(&self, client: &Client) -> Collection<Document> {
        client.database(&self.database).collection(&self.collection)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn has_recipes(&self) -> Result<bool, StoreError> {
        let client = self.connect().await?;
        let count = self.recipes(&client).estimated_document_count(None).await;
        client.shutdown().await;
        Ok(count? > 0)
    }

    async fn has_parsed_recipes(&self) -> Result<bool, StoreError> {
        let client = self.connect().await?;
        let filter = doc! { PARSED_FIELD: { "$exists": true, "$ne": [] } };
        let options = CountOptions::builder().limit(1_u64).build();
        let count = self.recipes(&client).count_documents(filter, options).await;
        client.shutdown().await;
        Ok(count? > 0)
    }

    async fn list_indexes(&self) -> Result<Vec<IndexDescriptor>, StoreError> {
        let client = self.connect().await?;
        let result = collect_indexes(&self.recipes(&client)).await;
        client.shutdown().await;

        match result {
            Ok(models) => models.iter().map(descriptor_from_model).collect(),
            Err(e) if is_namespace_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_index(&self, index: &IndexDescriptor) -> Result<(), StoreError> {
        let model = model_from_descriptor(index)?;
        let client = self.connect().await?;
        let result = self.recipes(&client).create_index(model, None).await;
        client.shutdown().await;
        result?;
        Ok(())
    }

    async fn drop_index(&self, name: &str) -> Result<(), StoreError> {
        let client = self.connect().await?;
        let result = self.recipes(&client).drop_index(name, None).await;
        client.shutdown().await;
        Ok(result?)
    }
}

async fn collect_indexes(
    collection: &Collection<Document>,
) -> mongodb::error::Result<Vec<IndexModel>> {
    collection.list_indexes(None).await?.try_collect().await
}

fn is_namespace_not_found(error: &mongodb::error::Error) -> bool {
    matches!(*error.kind, ErrorKind::Command(ref c) if c.code == NAMESPACE_NOT_FOUND)
}

/// MongoDB stores a text index as `{_fts: "text", _ftsx: 1}` and keeps the
/// indexed field names in the `weights` option, so both are read back here.
fn descriptor_from_model(model: &IndexModel) -> Result<IndexDescriptor, StoreError> {
    let options = model.options.as_ref();
    let name = options
        .and_then(|o| o.name.clone())
        .ok_or_else(|| StoreError::InvalidIndex(format!("unnamed index {}", model.keys)))?;

    let mut fields = Vec::new();
    for (key, value) in &model.keys {
        match key.as_str() {
            "_fts" => {
                let weights = options.and_then(|o| o.weights.as_ref()).ok_or_else(|| {
                    StoreError::InvalidIndex(format!("text index {name} has no weights"))
                })?;
                fields.extend(weights.keys().map(|field| IndexField::text(field)));
            }
            "_ftsx" => {}
            _ => fields.push(IndexField {
                name: key.clone(),
                kind: kind_from_bson(value),
            }),
        }
    }

    Ok(IndexDescriptor { name, fields })
}

fn kind_from_bson(value: &Bson) -> IndexKind {
    let numeric = match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    };
    match (numeric, value) {
        (Some(n), _) if n > 0.0 => IndexKind::Ascending,
        (Some(n), _) if n < 0.0 => IndexKind::Descending,
        (_, Bson::String(s)) if s == "text" => IndexKind::Text,
        (_, Bson::String(s)) => IndexKind::Other(s.clone()),
        _ => IndexKind::Other(value.to_string()),
    }
}

fn model_from_descriptor(index: &IndexDescriptor) -> Result<IndexModel, StoreError> {
    if index.fields.is_empty() {
        return Err(StoreError::InvalidIndex(format!(
            "index {} declares no fields",
            index.name
        )));
    }

    let mut keys = Document::new();
    for field in &index.fields {
        let value = match &field.kind {
            IndexKind::Ascending => Bson::Int32(1),
            IndexKind::Descending => Bson::Int32(-1),
            IndexKind::Text => Bson::String("text".to_string()),
            IndexKind::Other(kind) => Bson::String(kind.clone()),
        };
        keys.insert(field.name.clone(), value);
    }

    Ok(IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(index.name.clone()).build())
        .build())
}
