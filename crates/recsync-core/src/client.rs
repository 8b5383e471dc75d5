//! Contract of the remote record API client.
//!
//! The client is an external collaborator: containers hold it behind an
//! `Rc<dyn RecordClient>` and only ever call it, never mutate it. Futures are
//! not required to be `Send`; everything runs on one cooperative event loop.

use async_trait::async_trait;

use crate::condition::Criteria;
use crate::error::TransportError;
use crate::record::{Record, RecordId};
use crate::schema::{
    Layout, ListView, ListViewDescription, ListViews, QueryResult, RecordTypeRef,
    SchemaDescription,
};

#[async_trait(?Send)]
pub trait RecordClient {
    /// Create a record, returning its new identity.
    async fn create(&self, object_type: &str, record: &Record) -> Result<RecordId, TransportError>;

    async fn retrieve(
        &self,
        object_type: &str,
        criteria: &Criteria,
    ) -> Result<Vec<Record>, TransportError>;

    /// Apply `changes` to every record in `ids`, returning the identities
    /// the server acknowledged.
    async fn update(
        &self,
        object_type: &str,
        ids: &[RecordId],
        changes: &Record,
    ) -> Result<Vec<RecordId>, TransportError>;

    async fn delete(
        &self,
        object_type: &str,
        ids: &[RecordId],
    ) -> Result<Vec<RecordId>, TransportError>;

    async fn describe(&self, object_type: &str) -> Result<SchemaDescription, TransportError>;

    /// Run a free-text query.
    async fn query(&self, text: &str) -> Result<QueryResult, TransportError>;

    async fn fetch_list_views(&self, object_type: &str) -> Result<ListViews, TransportError>;

    async fn fetch_list_view_description(
        &self,
        view: &ListView,
    ) -> Result<ListViewDescription, TransportError>;

    async fn fetch_layout(&self, record_type: &RecordTypeRef) -> Result<Layout, TransportError>;
}
