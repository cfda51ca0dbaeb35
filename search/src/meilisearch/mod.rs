//! Meilisearch adapter over its HTTP API.

mod compile;


use compile::Paging;
use reqwest::Method;
use reqwest::blocking::{Client, RequestBuilder};
use scout_core::engine::error::EngineError;
use scout_core::types::{Document, METADATA_PREFIX, MeilisearchConfig, Record, ScoutKey};
use scout_core::{Engine, IndexOptions, Model, QueryDescriptor, RawResults};
use serde_json::Value;
use tracing::{debug, warn};

/// Upper bound of indexes listed by `delete_all_indexes`.
const INDEX_LIST_LIMIT: usize = 1000;

pub struct MeilisearchEngine {
    client: Client,
    host: String,
    key: Option<String>,
}

impl MeilisearchEngine {
    pub const NAME: &'static str = "meilisearch";

    pub fn new(config: &MeilisearchConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .build()
            .map_err(|err| EngineError::Transport(Box::new(err)))?;
        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            key: config.key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.host));
        match &self.key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Sends the request and decodes the JSON response. Non-success statuses
    /// become `EngineError::Api`.
    fn send(&self, builder: RequestBuilder, body: Option<&Value>) -> Result<Value, EngineError> {
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let response = builder.send().map_err(|err| {
            warn!(error = %err, "meilisearch request failed");
            EngineError::Transport(Box::new(err))
        })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|err| EngineError::Transport(Box::new(err)))?;

        if !status.is_success() {
            let err = compile::api_error(status.as_u16(), &text);
            warn!(status = status.as_u16(), error = %err, "meilisearch rejected request");
            return Err(err);
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, EngineError> {
        self.send(self.request(method, path), body)
    }

    fn run(&self, query: &QueryDescriptor, paging: Paging) -> Result<RawResults, EngineError> {
        let request = compile::search_body(query, paging)?;
        let path = format!("/indexes/{}/search", query.index_name());
        let body = self.call(Method::POST, &path, Some(&request))?;
        Ok(RawResults {
            hits: compile::parse_hits(&body, query.model.key_field()),
            body,
        })
    }
}

/// Raw API access for calls the engine contract does not cover.
impl MeilisearchEngine {
    /// `GET /tasks` with the given query parameters.
    pub fn tasks(&self, params: &[(&str, &str)]) -> Result<Value, EngineError> {
        self.send(self.request(Method::GET, "/tasks").query(params), None)
    }

    pub fn index_stats(&self, index: &str) -> Result<Value, EngineError> {
        self.call(Method::GET, &format!("/indexes/{index}/stats"), None)
    }

    pub fn raw(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, EngineError> {
        self.call(method, path, body)
    }
}

impl Engine for MeilisearchEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&self, model: &Model, records: &[Record]) -> Result<(), EngineError> {
        let documents = compile::documents(records);
        if documents.is_empty() {
            return Ok(());
        }
        let path = format!("/indexes/{}/documents", model.index_name());
        let builder = self
            .request(Method::POST, &path)
            .query(&[("primaryKey", model.key_field())]);
        self.send(builder, Some(&Value::Array(documents)))?;
        Ok(())
    }

    fn delete(&self, model: &Model, keys: &[ScoutKey]) -> Result<(), EngineError> {
        if keys.is_empty() {
            return Ok(());
        }
        let index = model.index_name();
        let path = format!("/indexes/{index}/documents/delete-batch");
        let body = Value::Array(keys.iter().map(ScoutKey::to_json).collect());
        match self.call(Method::POST, &path, Some(&body)) {
            Ok(_) => Ok(()),
            Err(err) if err.is_index_not_found() => {
                debug!(index = %index, "delete on a missing index ignored");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn search(&self, query: &QueryDescriptor) -> Result<RawResults, EngineError> {
        self.run(query, Paging::Limit(query.limit))
    }

    fn paginate(
        &self,
        query: &QueryDescriptor,
        per_page: usize,
        page: usize,
    ) -> Result<RawResults, EngineError> {
        self.run(query, Paging::Page { per_page, page })
    }

    fn total_count(&self, raw: &RawResults) -> usize {
        compile::total_hits(&raw.body)
    }

    fn metadata_prefix(&self) -> Option<&str> {
        Some(METADATA_PREFIX)
    }

    fn flush(&self, model: &Model) -> Result<(), EngineError> {
        let path = format!("/indexes/{}/documents", model.index_name());
        self.call(Method::DELETE, &path, None)?;
        Ok(())
    }

    fn create_index(&self, name: &str, options: &IndexOptions) -> Result<(), EngineError> {
        let body = compile::create_index_body(name, options.primary_key.as_deref());
        self.call(Method::POST, "/indexes", Some(&body))?;
        if !options.settings.is_empty() {
            self.update_index_settings(name, &options.settings)?;
        }
        Ok(())
    }

    fn delete_index(&self, name: &str) -> Result<(), EngineError> {
        self.call(Method::DELETE, &format!("/indexes/{name}"), None)?;
        Ok(())
    }

    fn update_index_settings(&self, name: &str, settings: &Document) -> Result<(), EngineError> {
        let body = Value::Object(settings.clone());
        self.call(Method::PATCH, &format!("/indexes/{name}/settings"), Some(&body))?;
        Ok(())
    }

    fn delete_all_indexes(&self) -> Result<(), EngineError> {
        let limit = INDEX_LIST_LIMIT.to_string();
        let builder = self
            .request(Method::GET, "/indexes")
            .query(&[("limit", limit.as_str())]);
        let listed = self.send(builder, None)?;
        for uid in compile::index_uids(&listed) {
            self.delete_index(&uid)?;
        }
        Ok(())
    }
}
