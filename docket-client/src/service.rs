//! Cached access to back-office resources.
//!
//! Reads go through the shared [`RequestCache`], so concurrent screens asking
//! for the same list share one request. Writes pass straight through to the
//! transport and then drop every cached entry of the written resource kind.

use std::sync::Arc;

use docket_cache::{CacheKey, RequestCache};
use docket_core::{DocketResult, RecordId, ResourceKind};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api_client::{ApiTransport, Method};
use crate::envelope::{unwrap_item, unwrap_list, unwrap_page};
use crate::record::{records_from_list, Page, Record};

pub struct ResourceService<T: ApiTransport> {
    transport: Arc<T>,
    cache: RequestCache,
}

impl<T: ApiTransport> Clone for ResourceService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            cache: self.cache.clone(),
        }
    }
}

impl<T: ApiTransport> ResourceService<T> {
    pub fn new(transport: Arc<T>, cache: RequestCache) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Every record of `kind`, cached under `<prefix>:list`.
    pub async fn list(&self, kind: ResourceKind) -> DocketResult<Arc<Vec<Record>>> {
        let transport = Arc::clone(&self.transport);
        self.cache
            .get_default(CacheKey::list(kind), move || async move {
                let body = transport
                    .send(Method::Get, kind.path_segment(), &[], None)
                    .await?;
                let records = records_from_list(unwrap_list(body)?)?;
                DocketResult::Ok(records)
            })
            .await
    }

    /// One page of `kind`, cached under `<prefix>:list:page=<n>`.
    pub async fn list_page(
        &self,
        kind: ResourceKind,
        page: u32,
    ) -> DocketResult<Arc<Page<Record>>> {
        let page = page.max(1);
        let transport = Arc::clone(&self.transport);
        self.cache
            .get_default(CacheKey::page(kind, page), move || async move {
                let query = [("page".to_string(), page.to_string())];
                let body = transport
                    .send(Method::Get, kind.path_segment(), &query, None)
                    .await?;
                let listing = Page::from_paged(unwrap_page(body)?)?;
                DocketResult::Ok(listing)
            })
            .await
    }

    /// A single record, cached under `<prefix>:<id>`.
    pub async fn get(&self, kind: ResourceKind, id: &RecordId) -> DocketResult<Arc<Record>> {
        let transport = Arc::clone(&self.transport);
        let path = item_path(kind, id);
        self.cache
            .get_default(CacheKey::item(kind, id), move || async move {
                let body = transport.send(Method::Get, &path, &[], None).await?;
                let record = Record::from_map(unwrap_item(body)?)?;
                DocketResult::Ok(record)
            })
            .await
    }

    /// Create a record. Returns the created record when the server echoes it.
    pub async fn create(&self, kind: ResourceKind, body: &Value) -> DocketResult<Option<Record>> {
        let response = self
            .transport
            .send(Method::Post, kind.path_segment(), &[], Some(body))
            .await;
        self.after_write(kind, response)
    }

    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        body: &Value,
    ) -> DocketResult<Option<Record>> {
        let response = self
            .transport
            .send(Method::Put, &item_path(kind, id), &[], Some(body))
            .await;
        self.after_write(kind, response)
    }

    pub async fn delete(&self, kind: ResourceKind, id: &RecordId) -> DocketResult<()> {
        let response = self
            .transport
            .send(Method::Delete, &item_path(kind, id), &[], None)
            .await;
        self.after_write(kind, response).map(|_| ())
    }

    /// Drop every cached entry of `kind`. Returns the number removed.
    pub fn refresh(&self, kind: ResourceKind) -> usize {
        let removed = self.cache.invalidate(CacheKey::prefix(kind));
        debug!(resource = %kind, removed, "Resource cache refreshed");
        removed
    }

    // A failed write may still have reached the server, so the kind's
    // entries are dropped either way.
    fn after_write(
        &self,
        kind: ResourceKind,
        response: DocketResult<Value>,
    ) -> DocketResult<Option<Record>> {
        self.refresh(kind);
        let body = match response? {
            Value::Null => return Ok(None),
            body => body,
        };
        match unwrap_item(body).and_then(Record::from_map) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(
                    resource = %kind,
                    error = %err,
                    "Write response did not contain a record"
                );
                Ok(None)
            }
        }
    }
}

fn item_path(kind: ResourceKind, id: &RecordId) -> String {
    format!("{}/{}", kind.path_segment(), id)
}
