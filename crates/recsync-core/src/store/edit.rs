//! Single-record edit workflow over an authoritative in-memory record list.
//!
//! ```text
//! NoDraft -> Creating | Editing -> Saving -> NoDraft        (saved)
//!                                  Saving -> Creating | Editing (failed, draft kept)
//! ```
//!
//! Time shifts (`update_start_end`, `update_end`) are optimistic: the
//! shifted record replaces the original in the list before the update is
//! sent, and the original is put back if the update fails.
//!
//! The get-or-fetch accessors (`get_description`, `get_layout`,
//! `get_reference`) answer synchronously from state and, on a miss, schedule
//! a background fetch on the supplied spawner. Dispatch is memoized so that
//! repeated reads from render passes do not repeat the request.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};

use chrono::Duration;
use futures::FutureExt;
use futures::task::{LocalSpawn, LocalSpawnExt};

use super::ensure_acknowledged;
use super::reference::{ReferenceKey, ReferenceTable};
use crate::action::{AsyncActions, ErrorId, RecordedError};
use crate::client::RecordClient;
use crate::clock::{Clock, SystemClock};
use crate::condition::{Criteria, Where};
use crate::config::{EventConfig, SyncConfig};
use crate::datetime::{parse_wire, to_wire_format};
use crate::error::SyncError;
use crate::memo::{Latest, Memoize, SkipDuplicate};
use crate::query::SelectQuery;
use crate::record::{Record, RecordId};
use crate::schema::{Layout, RecordTypeRef, SchemaDescription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    NoDraft,
    Creating,
    Editing,
    Saving,
}

/// A record the draft points at, resolved eagerly when the draft is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedRecord {
    /// Reference field on the draft, e.g. `WhatId`.
    pub field: String,
    pub object_type: String,
    pub id: RecordId,
}

#[derive(Debug, Default)]
struct EditState {
    records: Vec<Record>,
    draft: Option<Record>,
    /// Bumped whenever the draft is replaced or discarded.
    draft_generation: u64,
    saving: bool,
    description: Option<SchemaDescription>,
    layouts: HashMap<RecordTypeRef, Layout>,
    references: ReferenceTable,
}

struct EditInner {
    client: Rc<dyn RecordClient>,
    spawner: Rc<dyn LocalSpawn>,
    object_type: String,
    fields: EventConfig,
    actions: AsyncActions,
    state: RefCell<EditState>,
    describe_once: SkipDuplicate<(), ()>,
    layout_fetch: Memoize<RecordTypeRef, ()>,
    reference_fetch: Memoize<(String, RecordId), ()>,
    records_latest: Latest<Criteria, Vec<Record>, SyncError>,
}

/// Edit container for one object type. Cloning shares the container.
#[derive(Clone)]
pub struct EditStore {
    inner: Rc<EditInner>,
}

impl EditStore {
    pub fn new(
        client: Rc<dyn RecordClient>,
        spawner: Rc<dyn LocalSpawn>,
        object_type: impl Into<String>,
        config: &SyncConfig,
    ) -> Self {
        Self::with_clock(client, spawner, object_type, config, Rc::new(SystemClock))
    }

    pub fn with_clock(
        client: Rc<dyn RecordClient>,
        spawner: Rc<dyn LocalSpawn>,
        object_type: impl Into<String>,
        config: &SyncConfig,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let object_type = object_type.into();
        let expiration_ms = config.memo.expiration_ms;

        let inner = Rc::new_cyclic(|weak: &Weak<EditInner>| {
            let describe = weak.clone();
            let layout = weak.clone();
            let reference = weak.clone();
            let retrieve_client = Rc::clone(&client);
            let retrieve_type = object_type.clone();

            EditInner {
                describe_once: SkipDuplicate::new(move |_: &()| {
                    if let Some(inner) = describe.upgrade() {
                        inner.spawn_tracked(|inner| async move { inner.load_description().await });
                    }
                }),
                layout_fetch: Memoize::new(
                    move |record_type: &RecordTypeRef| {
                        if let Some(inner) = layout.upgrade() {
                            let record_type = record_type.clone();
                            inner.spawn_tracked(|inner| async move {
                                inner.load_layout(record_type).await
                            });
                        }
                    },
                    Rc::clone(&clock),
                    expiration_ms,
                ),
                reference_fetch: Memoize::new(
                    move |(field, id): &(String, RecordId)| {
                        if let Some(inner) = reference.upgrade() {
                            let (field, id) = (field.clone(), id.clone());
                            inner.spawn_tracked(|inner| async move {
                                inner.load_reference(field, id).await
                            });
                        }
                    },
                    clock,
                    expiration_ms,
                ),
                records_latest: Latest::new(move |criteria: Criteria| {
                    let client = Rc::clone(&retrieve_client);
                    let object_type = retrieve_type.clone();
                    async move {
                        client
                            .retrieve(&object_type, &criteria)
                            .await
                            .map_err(SyncError::from)
                    }
                    .boxed_local()
                }),
                client,
                spawner,
                object_type,
                fields: config.event.clone(),
                actions: AsyncActions::new(),
                state: RefCell::new(EditState::default()),
            }
        });

        Self { inner }
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Replace the record list with the rows matching `criteria`.
    ///
    /// When several fetches overlap, every one of them applies the rows of
    /// the most recently issued fetch.
    pub async fn fetch_records(&self, criteria: Criteria) {
        let inner = &self.inner;
        inner
            .actions
            .run(async {
                let records = inner.records_latest.call(criteria).await?;
                inner.merge(|state| state.records = records);
                Ok(())
            })
            .await;
    }

    /// Start creating (no identity field) or editing (identity present).
    ///
    /// When `related` is given, the record it names is fetched and stored as
    /// the draft's reference for `related.field`, nested data included. The
    /// reference is dropped if the draft is replaced or discarded before the
    /// fetch returns. Rejected while a save is in flight.
    pub async fn set_draft(&self, details: Record, related: Option<RelatedRecord>) {
        self.inner.actions.run(self.inner.set_draft(details, related)).await;
    }

    pub fn discard_draft(&self) {
        self.inner.merge(|state| {
            state.draft = None;
            state.draft_generation += 1;
            state.references.remove(&ReferenceKey::Draft);
        });
    }

    /// Set one field of the current draft. Fails while a save is in flight.
    pub fn set_field(
        &self,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), SyncError> {
        self.inner.merge(|state| {
            if state.saving {
                return Err(save_in_progress());
            }
            match state.draft.as_mut() {
                Some(draft) => {
                    draft.set(field, value);
                    Ok(())
                }
                None => Err(SyncError::Precondition("no draft to edit".to_string())),
            }
        })
    }

    /// Create or update the draft, then fold it into the record list.
    pub async fn save(&self) {
        self.inner.actions.run(self.inner.save()).await;
    }

    /// Shift both start and end of record `id` by `delta`.
    pub async fn update_start_end(&self, id: &RecordId, delta: Duration) {
        let fields = [
            self.inner.fields.start_field.clone(),
            self.inner.fields.end_field.clone(),
        ];
        self.inner.actions.run(self.inner.shift(id, &fields, delta)).await;
    }

    /// Shift only the end of record `id` by `delta`.
    pub async fn update_end(&self, id: &RecordId, delta: Duration) {
        let fields = [self.inner.fields.end_field.clone()];
        self.inner.actions.run(self.inner.shift(id, &fields, delta)).await;
    }

    pub async fn delete_record(&self, id: &RecordId) {
        self.inner.actions.run(self.inner.delete(id)).await;
    }

    /// Fetch the schema description now, bypassing the accessor memo.
    pub async fn refresh_description(&self) {
        self.inner.actions.run(self.inner.load_description()).await;
    }

    // -----------------------------------------------------------------------
    // Get-or-fetch accessors
    // -----------------------------------------------------------------------

    /// Cached schema description; the first miss schedules one fetch.
    ///
    /// The fetch is dispatched once per container. If it fails, this keeps
    /// returning `None` and the failure shows up in [`Self::errors`]; call
    /// [`Self::refresh_description`] to try again.
    #[must_use]
    pub fn get_description(&self) -> Option<SchemaDescription> {
        let cached = self.inner.state.borrow().description.clone();
        if cached.is_none() {
            self.inner.describe_once.call(());
        }
        cached
    }

    #[must_use]
    pub fn get_layout(&self, record_type: &RecordTypeRef) -> Option<Layout> {
        let cached = self.inner.state.borrow().layouts.get(record_type).cloned();
        if cached.is_none() {
            self.inner.layout_fetch.call(record_type.clone());
        }
        cached
    }

    /// Resolved record behind reference `field` of the record at `key`.
    ///
    /// Misses on a saved record schedule a fetch; draft references are only
    /// filled by [`Self::set_draft`].
    #[must_use]
    pub fn get_reference(&self, field: &str, key: &ReferenceKey) -> Option<Record> {
        let cached = self.inner.state.borrow().references.get(key, field).cloned();
        if let (None, ReferenceKey::ById(id)) = (&cached, key) {
            self.inner.reference_fetch.call((field.to_string(), id.clone()));
        }
        cached
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> EditPhase {
        let state = self.inner.state.borrow();
        match (&state.draft, state.saving) {
            (_, true) => EditPhase::Saving,
            (None, false) => EditPhase::NoDraft,
            (Some(draft), false) if draft.id(&self.inner.fields.identity_field).is_some() => {
                EditPhase::Editing
            }
            (Some(_), false) => EditPhase::Creating,
        }
    }

    #[must_use]
    pub fn draft(&self) -> Option<Record> {
        self.inner.state.borrow().draft.clone()
    }

    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.inner.state.borrow().records.clone()
    }

    #[must_use]
    pub fn record(&self, id: &RecordId) -> Option<Record> {
        let identity = &self.inner.fields.identity_field;
        self.inner
            .state
            .borrow()
            .records
            .iter()
            .find(|record| record.id(identity).as_ref() == Some(id))
            .cloned()
    }

    #[must_use]
    pub fn loading(&self) -> usize {
        self.inner.actions.loading()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<SyncError> {
        self.inner.actions.errors()
    }

    #[must_use]
    pub fn recorded_errors(&self) -> Vec<RecordedError> {
        self.inner.actions.snapshot().errors
    }

    pub fn dismiss_error(&self, message: &str) {
        self.inner.actions.dismiss(message);
    }

    pub fn dismiss_error_id(&self, id: ErrorId) {
        self.inner.actions.dismiss_id(id);
    }
}

impl std::fmt::Debug for EditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditStore")
            .field("object_type", &self.inner.object_type)
            .field("state", &self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl EditInner {
    fn merge<R>(&self, f: impl FnOnce(&mut EditState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    fn identity(&self) -> &str {
        &self.fields.identity_field
    }

    /// Run `work` in the background under this container's action tracker.
    fn spawn_tracked<F, Fut>(self: &Rc<Self>, work: F)
    where
        F: FnOnce(Rc<Self>) -> Fut,
        Fut: Future<Output = Result<(), SyncError>> + 'static,
    {
        let inner = Rc::clone(self);
        let task = work(Rc::clone(self));
        tracing::debug!(object_type = %self.object_type, "dispatching background fetch");
        let scheduled = self.spawner.spawn_local(async move {
            inner.actions.run(task).await;
        });
        if let Err(err) = scheduled {
            tracing::warn!(error = %err, "background fetch not scheduled");
        }
    }

    async fn load_description(&self) -> Result<(), SyncError> {
        let description = self.client.describe(&self.object_type).await?;
        self.merge(|state| state.description = Some(description));
        Ok(())
    }

    async fn load_layout(&self, record_type: RecordTypeRef) -> Result<(), SyncError> {
        let layout = self.client.fetch_layout(&record_type).await?;
        self.merge(|state| state.layouts.insert(record_type, layout));
        Ok(())
    }

    async fn load_reference(&self, field: String, id: RecordId) -> Result<(), SyncError> {
        let cached = self.state.borrow().description.clone();
        let description = match cached {
            Some(description) => description,
            None => {
                let description = self.client.describe(&self.object_type).await?;
                self.merge(|state| state.description = Some(description.clone()));
                description
            }
        };

        let relationship = description
            .relationship_name(&field)
            .ok_or_else(|| {
                SyncError::Precondition(format!(
                    "{field} is not a reference field of {}",
                    self.object_type
                ))
            })?
            .to_string();

        let query = SelectQuery::new(self.object_type.clone())
            .fields([
                self.identity().to_string(),
                format!("{relationship}.Id"),
                format!("{relationship}.Name"),
                format!("{relationship}.Type"),
            ])
            .filter(Where::equals(self.identity(), id.as_str()).to_condition())
            .limit(1);
        let result = self.client.query(&query.to_string()).await?;

        let target = result
            .records
            .first()
            .and_then(|record| record.get_record(&relationship));
        match target {
            Some(target) => {
                self.merge(|state| {
                    state
                        .references
                        .insert(ReferenceKey::ById(id), field, target);
                });
            }
            None => tracing::debug!(%id, %field, "reference is empty"),
        }
        Ok(())
    }

    async fn set_draft(
        &self,
        details: Record,
        related: Option<RelatedRecord>,
    ) -> Result<(), SyncError> {
        let generation = self.merge(|state| {
            if state.saving {
                return Err(save_in_progress());
            }
            state.draft = Some(details);
            state.draft_generation += 1;
            state.references.remove(&ReferenceKey::Draft);
            Ok(state.draft_generation)
        })?;

        let Some(related) = related else {
            return Ok(());
        };

        let criteria = Criteria::new()
            .limit(1)
            .filter(Where::equals(self.identity(), related.id.as_str()));
        let rows = self
            .client
            .retrieve(&related.object_type, &criteria)
            .await?;
        let Some(record) = rows.into_iter().next() else {
            return Err(SyncError::RecordNotFound(related.id.to_string()));
        };

        self.merge(|state| {
            if state.draft_generation == generation {
                state
                    .references
                    .insert(ReferenceKey::Draft, related.field, record);
            } else {
                tracing::debug!(id = %related.id, "draft replaced before related record arrived");
            }
        });
        Ok(())
    }

    async fn save(&self) -> Result<(), SyncError> {
        let draft = self.merge(|state| {
            let draft = state.draft.clone();
            if draft.is_some() {
                state.saving = true;
            }
            draft
        });
        let Some(draft) = draft else {
            return Err(SyncError::Precondition("no draft to save".to_string()));
        };

        let outcome = self.persist(&draft).await;
        self.merge(|state| state.saving = false);
        let saved = outcome?;

        let identity = self.identity().to_string();
        let id = saved.id(&identity);
        self.merge(|state| {
            if let Some(id) = &id {
                state
                    .records
                    .retain(|record| record.id(&identity).as_ref() != Some(id));
                state
                    .references
                    .rekey(&ReferenceKey::Draft, ReferenceKey::ById(id.clone()));
            }
            state.records.push(saved);
            state.draft = None;
        });
        tracing::info!(object_type = %self.object_type, id = ?id, "record saved");
        Ok(())
    }

    /// Create or update `draft` remotely, returning the record to keep.
    async fn persist(&self, draft: &Record) -> Result<Record, SyncError> {
        let identity = self.identity();
        match draft.id(identity) {
            Some(id) => {
                let mut changes = draft.clone();
                changes.remove(identity);
                let acknowledged = self
                    .client
                    .update(&self.object_type, std::slice::from_ref(&id), &changes)
                    .await?;
                ensure_acknowledged(&id, &acknowledged)?;
                Ok(draft.clone())
            }
            None => {
                let id = self.client.create(&self.object_type, draft).await?;
                let mut created = draft.clone();
                created.set(identity, id.to_string());
                Ok(created)
            }
        }
    }

    async fn shift(
        &self,
        id: &RecordId,
        fields: &[String],
        delta: Duration,
    ) -> Result<(), SyncError> {
        let identity = self.identity();
        let original = self
            .state
            .borrow()
            .records
            .iter()
            .find(|record| record.id(identity).as_ref() == Some(id))
            .cloned()
            .ok_or_else(|| SyncError::RecordNotFound(id.to_string()))?;

        let mut changes = Record::new();
        for field in fields {
            let raw = original
                .get_str(field)
                .ok_or_else(|| SyncError::InvalidDatetime(format!("{field} is empty")))?;
            let shifted = parse_wire(raw)? + delta;
            changes.set(field.clone(), to_wire_format(&shifted));
        }

        let mut shifted = original.clone();
        shifted.merge(&changes);
        self.replace_record(id, shifted);

        let persisted = async {
            let acknowledged = self
                .client
                .update(&self.object_type, std::slice::from_ref(id), &changes)
                .await?;
            ensure_acknowledged(id, &acknowledged)
        }
        .await;

        if let Err(err) = persisted {
            tracing::warn!(%id, error = %err, "rolling back optimistic time shift");
            self.replace_record(id, original);
            return Err(err);
        }
        Ok(())
    }

    /// Swap the record with identity `id` in place, if it is still listed.
    fn replace_record(&self, id: &RecordId, replacement: Record) {
        let identity = self.identity().to_string();
        self.merge(|state| {
            if let Some(slot) = state
                .records
                .iter_mut()
                .find(|record| record.id(&identity).as_ref() == Some(id))
            {
                *slot = replacement;
            }
        });
    }

    async fn delete(&self, id: &RecordId) -> Result<(), SyncError> {
        let acknowledged = self
            .client
            .delete(&self.object_type, std::slice::from_ref(id))
            .await?;
        ensure_acknowledged(id, &acknowledged)?;

        let identity = self.identity().to_string();
        self.merge(|state| {
            state
                .records
                .retain(|record| record.id(&identity).as_ref() != Some(id));
            state.references.remove(&ReferenceKey::ById(id.clone()));
        });
        Ok(())
    }
}

fn save_in_progress() -> SyncError {
    SyncError::Precondition("a save is in progress".to_string())
}
