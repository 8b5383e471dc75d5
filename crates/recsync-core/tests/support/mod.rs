//! Scripted in-memory record client for container tests.
//!
//! Responses are registered up front. A query is answered by the first
//! registered response whose needle occurs in the query text. Gates hold a
//! matching call until the test fires the returned sender, which is how the
//! tests control completion order.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;
use futures::channel::oneshot;

use recsync_core::condition::Criteria;
use recsync_core::record::{Record, RecordId};
use recsync_core::schema::{
    Layout, ListView, ListViewDescription, ListViews, QueryResult, RecordTypeRef,
    SchemaDescription,
};
use recsync_core::{RecordClient, TransportError};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Default)]
pub struct FakeClient {
    calls: RefCell<Vec<String>>,
    list_views: RefCell<ListViews>,
    descriptions: RefCell<HashMap<String, ListViewDescription>>,
    queries: RefCell<Vec<(String, QueryResult)>>,
    rows: RefCell<HashMap<String, Vec<Record>>>,
    matched_rows: RefCell<Vec<(String, Vec<Record>)>>,
    schema: RefCell<SchemaDescription>,
    layouts: RefCell<HashMap<RecordTypeRef, Layout>>,
    gates: RefCell<Vec<(String, oneshot::Receiver<()>)>>,
    failing: RefCell<Vec<String>>,
    acknowledge: RefCell<Option<Vec<RecordId>>>,
    next_id: Cell<u32>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_views(self, views: Vec<ListView>) -> Self {
        *self.list_views.borrow_mut() = ListViews { list_views: views };
        self
    }

    pub fn with_description(self, description: ListViewDescription) -> Self {
        self.descriptions
            .borrow_mut()
            .insert(description.id.clone(), description);
        self
    }

    pub fn with_query(self, needle: &str, result: QueryResult) -> Self {
        self.queries.borrow_mut().push((needle.to_string(), result));
        self
    }

    pub fn with_rows(self, object_type: &str, rows: Vec<Record>) -> Self {
        self.rows.borrow_mut().insert(object_type.to_string(), rows);
        self
    }

    /// Answer retrieves whose call text contains `needle` with `rows`,
    /// ahead of the per-object-type rows.
    pub fn with_matching_rows(self, needle: &str, rows: Vec<Record>) -> Self {
        self.matched_rows
            .borrow_mut()
            .push((needle.to_string(), rows));
        self
    }

    pub fn with_schema(self, schema: SchemaDescription) -> Self {
        *self.schema.borrow_mut() = schema;
        self
    }

    pub fn with_layout(self, record_type: RecordTypeRef, layout: Layout) -> Self {
        self.layouts.borrow_mut().insert(record_type, layout);
        self
    }

    /// Hold the next call whose description contains `needle`.
    pub fn gate(&self, needle: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().push((needle.to_string(), rx));
        tx
    }

    /// Fail every call to `operation` until [`Self::recover`].
    pub fn fail(&self, operation: &str) {
        self.failing.borrow_mut().push(operation.to_string());
    }

    pub fn recover(&self) {
        self.failing.borrow_mut().clear();
    }

    /// Answer updates and deletes with `ids` instead of echoing the request.
    pub fn acknowledge_with(&self, ids: Vec<RecordId>) {
        *self.acknowledge.borrow_mut() = Some(ids);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    async fn enter(&self, operation: &str, detail: &str) -> Result<(), TransportError> {
        let call = format!("{operation} {detail}");
        self.calls.borrow_mut().push(call.clone());

        let gate = {
            let mut gates = self.gates.borrow_mut();
            gates
                .iter()
                .position(|(needle, _)| call.contains(needle.as_str()))
                .map(|index| gates.remove(index).1)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.failing.borrow().iter().any(|failing| failing == operation) {
            return Err(TransportError::new(format!("{operation} failed")).with_status(503));
        }
        Ok(())
    }

    fn acknowledged(&self, ids: &[RecordId]) -> Vec<RecordId> {
        self.acknowledge
            .borrow()
            .clone()
            .unwrap_or_else(|| ids.to_vec())
    }
}

#[async_trait(?Send)]
impl RecordClient for FakeClient {
    async fn create(&self, object_type: &str, _record: &Record) -> Result<RecordId, TransportError> {
        self.enter("create", object_type).await?;
        let next = self.next_id.get() + 1;
        self.next_id.set(next);
        Ok(RecordId::new(format!("NEW{next}")))
    }

    async fn retrieve(
        &self,
        object_type: &str,
        criteria: &Criteria,
    ) -> Result<Vec<Record>, TransportError> {
        let detail = format!(
            "{object_type} {}",
            serde_json::to_string(criteria).unwrap_or_default()
        );
        self.enter("retrieve", &detail).await?;
        if let Some((_, rows)) = self
            .matched_rows
            .borrow()
            .iter()
            .find(|(needle, _)| detail.contains(needle.as_str()))
        {
            return Ok(rows.clone());
        }
        Ok(self
            .rows
            .borrow()
            .get(object_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn update(
        &self,
        object_type: &str,
        ids: &[RecordId],
        _changes: &Record,
    ) -> Result<Vec<RecordId>, TransportError> {
        self.enter("update", object_type).await?;
        Ok(self.acknowledged(ids))
    }

    async fn delete(
        &self,
        object_type: &str,
        ids: &[RecordId],
    ) -> Result<Vec<RecordId>, TransportError> {
        self.enter("delete", object_type).await?;
        Ok(self.acknowledged(ids))
    }

    async fn describe(&self, object_type: &str) -> Result<SchemaDescription, TransportError> {
        self.enter("describe", object_type).await?;
        Ok(self.schema.borrow().clone())
    }

    async fn query(&self, text: &str) -> Result<QueryResult, TransportError> {
        self.enter("query", text).await?;
        self.queries
            .borrow()
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, result)| result.clone())
            .ok_or_else(|| TransportError::new(format!("no scripted result for {text}")))
    }

    async fn fetch_list_views(&self, object_type: &str) -> Result<ListViews, TransportError> {
        self.enter("list_views", object_type).await?;
        Ok(self.list_views.borrow().clone())
    }

    async fn fetch_list_view_description(
        &self,
        view: &ListView,
    ) -> Result<ListViewDescription, TransportError> {
        self.enter("describe_view", &view.id).await?;
        self.descriptions
            .borrow()
            .get(&view.id)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("unknown list view {}", view.id)).with_status(404))
    }

    async fn fetch_layout(&self, record_type: &RecordTypeRef) -> Result<Layout, TransportError> {
        self.enter("layout", &record_type.to_string()).await?;
        self.layouts
            .borrow()
            .get(record_type)
            .cloned()
            .ok_or_else(|| TransportError::new(format!("no layout for {record_type}")).with_status(404))
    }
}

pub fn list_view(id: &str, object_type: &str) -> ListView {
    ListView {
        id: id.to_string(),
        label: id.to_string(),
        developer_name: id.to_string(),
        sobject_type: object_type.to_string(),
    }
}

pub fn rows(names: &[&str]) -> QueryResult {
    QueryResult {
        total_size: names.len(),
        done: true,
        records: names
            .iter()
            .map(|name| Record::new().with("Id", format!("ID-{name}")).with("Name", *name))
            .collect(),
    }
}

pub fn count(total: usize) -> QueryResult {
    QueryResult {
        total_size: total,
        done: true,
        records: Vec::new(),
    }
}
