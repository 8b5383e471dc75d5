//! Filtered, sorted, paginated view over one remote collection.
//!
//! ```text
//! Idle -> LoadingViews -> ViewSelected -> LoadingRecords -> Ready
//! ```
//!
//! Selecting a view issues the page query and the count query together.
//! Every page request takes a fresh token from `last_request`; a page result
//! is applied only while its token is still current, so a slow query for a
//! view the user already left can never overwrite the newer view's rows.
//! Count results are not token-checked.

use std::cell::RefCell;
use std::rc::Rc;

use crate::action::{AsyncActions, RecordedError};
use crate::client::RecordClient;
use crate::condition::{Filter, OrderBy, WhereCondition, compile_filters, merge_filter, parse_ordering};
use crate::config::{ListConfig, SyncConfig};
use crate::error::SyncError;
use crate::locale::Alphabet;
use crate::query::SelectQuery;
use crate::record::Record;
use crate::schema::{ListView, ListViewDescription, ListViews};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPhase {
    #[default]
    Idle,
    LoadingViews,
    ViewSelected,
    LoadingRecords,
    Ready,
}

/// The active list view and its column/filter description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedView {
    pub view: ListView,
    pub description: ListViewDescription,
}

#[derive(Debug, Clone, Default)]
struct ListState {
    phase: ListPhase,
    list_views: Option<ListViews>,
    selected: Option<SelectedView>,
    records: Vec<Record>,
    count: Option<usize>,
    page: u32,
    filters: Vec<Filter>,
    last_request: u64,
}

pub struct ListStore {
    client: Rc<dyn RecordClient>,
    object_type: String,
    config: ListConfig,
    default_ordering: Vec<OrderBy>,
    alphabet: Alphabet,
    actions: AsyncActions,
    state: RefCell<ListState>,
}

impl ListStore {
    pub fn new(
        client: Rc<dyn RecordClient>,
        object_type: impl Into<String>,
        config: &SyncConfig,
    ) -> Self {
        let default_ordering = parse_ordering(&config.list.default_order_by).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring invalid default ordering");
            Vec::new()
        });
        let mut list = config.list.clone();
        if list.page_size == 0 {
            list.page_size = ListConfig::default().page_size;
            tracing::warn!(page_size = list.page_size, "page size 0 replaced with default");
        }
        Self {
            client,
            object_type: object_type.into(),
            config: list,
            default_ordering,
            alphabet: Alphabet::default(),
            actions: AsyncActions::new(),
            state: RefCell::new(ListState::default()),
        }
    }

    #[must_use]
    pub fn with_alphabet(mut self, alphabet: Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Load the object type's list views and select the first one when
    /// nothing is selected yet.
    pub async fn fetch_list_views(&self) {
        self.actions.run(self.load_list_views()).await;
    }

    /// Select `view` and load its first page and total count.
    pub async fn select_list_view(&self, view: ListView) {
        self.actions.run(self.select(view)).await;
    }

    /// Load page `page` (1-based) of the selected view.
    pub async fn fetch_page(&self, page: u32) {
        self.actions.run(self.load_page(page)).await;
    }

    /// Activate `filter`, replacing any filter of the same kind, and reload
    /// from page 1.
    pub async fn apply_filter(&self, filter: Filter) {
        self.actions.run(self.refilter(Some(filter))).await;
    }

    pub async fn clear_filters(&self) {
        self.actions.run(self.refilter(None)).await;
    }

    /// Re-issue the current page and count.
    pub async fn refresh(&self) {
        self.actions
            .run(async {
                let page = self.selected_page()?;
                self.load(page, true).await
            })
            .await;
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> ListPhase {
        self.state.borrow().phase
    }

    #[must_use]
    pub fn list_views(&self) -> Option<ListViews> {
        self.state.borrow().list_views.clone()
    }

    #[must_use]
    pub fn selected_view(&self) -> Option<SelectedView> {
        self.state.borrow().selected.clone()
    }

    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.state.borrow().records.clone()
    }

    #[must_use]
    pub fn count(&self) -> Option<usize> {
        self.state.borrow().count
    }

    #[must_use]
    pub fn filters(&self) -> Vec<Filter> {
        self.state.borrow().filters.clone()
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.state.borrow().page
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.config.page_size
    }

    /// Number of pages the last count spans; zero before any count.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        let count = self.state.borrow().count.unwrap_or(0);
        let pages = count.div_ceil(self.config.page_size as usize);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.current_page() > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.current_page() < self.page_count()
    }

    #[must_use]
    pub fn loading(&self) -> usize {
        self.actions.loading()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<SyncError> {
        self.actions.errors()
    }

    #[must_use]
    pub fn recorded_errors(&self) -> Vec<RecordedError> {
        self.actions.snapshot().errors
    }

    pub fn dismiss_error(&self, message: &str) {
        self.actions.dismiss(message);
    }

    /// Compiled page query for the current selection, filters, and page.
    pub fn page_query(&self) -> Result<SelectQuery, SyncError> {
        let state = self.state.borrow();
        let selected = state
            .selected
            .as_ref()
            .ok_or_else(|| SyncError::MissingLookup(self.object_type.clone()))?;
        Ok(self.build_query(selected, &state.filters, state.page.max(1)))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn merge<R>(&self, f: impl FnOnce(&mut ListState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    fn next_request(&self) -> u64 {
        self.merge(|state| {
            state.last_request += 1;
            state.last_request
        })
    }

    fn is_current(&self, token: u64) -> bool {
        self.state.borrow().last_request == token
    }

    fn selected_page(&self) -> Result<u32, SyncError> {
        let state = self.state.borrow();
        if state.selected.is_none() {
            return Err(SyncError::Precondition(format!(
                "no list view selected for {}",
                self.object_type
            )));
        }
        Ok(state.page.max(1))
    }

    async fn load_list_views(&self) -> Result<(), SyncError> {
        let nothing_selected = self.merge(|state| {
            if state.selected.is_none() {
                state.phase = ListPhase::LoadingViews;
            }
            state.selected.is_none()
        });

        let views = match self.client.fetch_list_views(&self.object_type).await {
            Ok(views) => views,
            Err(err) => {
                self.merge(|state| {
                    if state.phase == ListPhase::LoadingViews {
                        state.phase = ListPhase::Idle;
                    }
                });
                return Err(err.into());
            }
        };

        let first = views.list_views.first().cloned();
        let select_first = self.merge(|state| {
            state.list_views = Some(views);
            if state.phase == ListPhase::LoadingViews {
                state.phase = ListPhase::Idle;
            }
            nothing_selected && state.selected.is_none()
        });

        match first {
            Some(view) if select_first => self.select(view).await,
            _ => Ok(()),
        }
    }

    async fn select(&self, view: ListView) -> Result<(), SyncError> {
        let token = self.next_request();
        tracing::debug!(view = %view.id, token, "selecting list view");

        let description = self.client.fetch_list_view_description(&view).await?;
        if !self.is_current(token) {
            tracing::debug!(view = %view.id, token, "selection superseded before description");
            return Ok(());
        }

        self.merge(|state| {
            state.selected = Some(SelectedView { view, description });
            state.page = 1;
            state.records.clear();
            state.count = None;
            state.phase = ListPhase::ViewSelected;
        });
        self.query(token, 1, true).await
    }

    async fn load_page(&self, page: u32) -> Result<(), SyncError> {
        self.selected_page()?;
        if page < 1 {
            return Err(SyncError::Precondition(format!(
                "page numbers start at 1, got {page}"
            )));
        }
        self.load(page, false).await
    }

    async fn refilter(&self, filter: Option<Filter>) -> Result<(), SyncError> {
        if self.state.borrow().selected.is_none() {
            return Err(SyncError::MissingLookup(self.object_type.clone()));
        }
        self.merge(|state| {
            state.filters = match filter {
                Some(filter) => merge_filter(&state.filters, filter),
                None => Vec::new(),
            };
        });
        self.load(1, true).await
    }

    async fn load(&self, page: u32, with_count: bool) -> Result<(), SyncError> {
        let token = self.next_request();
        self.query(token, page, with_count).await
    }

    async fn query(&self, token: u64, page: u32, with_count: bool) -> Result<(), SyncError> {
        let query = {
            let state = self.state.borrow();
            let Some(selected) = state.selected.as_ref() else {
                return Err(SyncError::MissingLookup(self.object_type.clone()));
            };
            self.build_query(selected, &state.filters, page)
        };
        self.merge(|state| state.phase = ListPhase::LoadingRecords);

        let page_text = query.to_string();
        let count_text = query.count_text();
        tracing::debug!(token, page, query = %page_text, "querying page");

        let rows = async {
            let result = self.client.query(&page_text).await?;
            self.apply_page(token, page, result.records);
            Ok::<_, SyncError>(())
        };
        let total = async {
            if with_count {
                let result = self.client.query(&count_text).await?;
                self.merge(|state| state.count = Some(result.total_size));
            }
            Ok::<_, SyncError>(())
        };

        let (rows, total) = futures::join!(rows, total);
        if rows.is_err() && self.is_current(token) {
            self.merge(|state| state.phase = ListPhase::ViewSelected);
        }
        rows.and(total)
    }

    fn apply_page(&self, token: u64, page: u32, records: Vec<Record>) {
        self.merge(|state| {
            if state.last_request != token {
                tracing::debug!(
                    token,
                    current = state.last_request,
                    "discarding stale page result"
                );
                return;
            }
            state.records = records;
            state.page = page;
            state.phase = ListPhase::Ready;
        });
    }

    fn build_query(&self, selected: &SelectedView, filters: &[Filter], page: u32) -> SelectQuery {
        let description = &selected.description;

        let mut fields = vec!["Id"];
        fields.extend(description.field_names().into_iter().filter(|f| *f != "Id"));

        let mut conditions = Vec::new();
        if let Some(condition) = &description.where_condition {
            conditions.push(condition.clone());
        }
        conditions.push(compile_filters(
            filters,
            &self.config.filter_field,
            &self.alphabet,
        ));

        let ordering = if description.order_by.is_empty() {
            self.default_ordering.clone()
        } else {
            description.ordering()
        };

        let offset = page.saturating_sub(1).saturating_mul(self.config.page_size);
        SelectQuery::new(description.sobject_type.clone())
            .fields(fields)
            .filter(WhereCondition::and(conditions))
            .order_by(ordering)
            .limit(self.config.page_size)
            .offset(offset)
    }
}

impl std::fmt::Debug for ListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListStore")
            .field("object_type", &self.object_type)
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}
