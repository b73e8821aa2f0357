use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::{
    api::AdminApi,
    errors::AdminError,
    models::{
        rows::{row_to_form_row, FetchArgs, FormRow, ListRowsResponse},
        schema::Relation,
    },
};

use super::{
    classify::find_primary_key_column_index,
    columns::{build_column_defs, CellView, ColumnDef, ThumbnailRef},
    cursors::CursorStore,
    fetch::{fetch_page, FetchedPage},
    mutations::{delete_request, insert_request, update_request, DeleteOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

/// Observable browsing inputs. Every change here warrants a new fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserStore {
    pub selected: Relation,
    pub filter: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub filter: Option<String>,
    pub page_size: usize,
}

/// A fetched page together with what is derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableState {
    pub response: ListRowsResponse,
    pub pk_column_index: Option<usize>,
    pub column_defs: Vec<ColumnDef>,
}

impl TableState {
    pub fn build(relation: &Relation, response: ListRowsResponse) -> Self {
        let pk_column_index = find_primary_key_column_index(&response.columns);
        let column_defs = build_column_defs(
            relation.name(),
            relation.kind(),
            pk_column_index,
            &response.columns,
        );

        Self {
            response,
            pk_column_index,
            column_defs,
        }
    }

    pub fn render_row(&self, row_index: usize) -> Result<Vec<CellView>, AdminError> {
        let row = self
            .response
            .rows
            .get(row_index)
            .ok_or_else(|| AdminError::General(format!("row {} out of range", row_index)))?;
        self.column_defs.iter().map(|def| def.render(row)).collect()
    }

    /// Primary key of a row in the form delete requests expect.
    pub fn pk_value(&self, row_index: usize) -> Option<String> {
        let value = self.response.rows.get(row_index)?.get(self.pk_column_index?)?;
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BrowserStatus {
    Idle,
    Loading,
    Ready(Arc<TableState>),
    /// A fetch failed; `stale` is the last page that loaded, if any.
    Error {
        message: String,
        stale: Option<Arc<TableState>>,
    },
}

/// Identifies the inputs a fetch was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FetchSignature {
    epoch: u64,
    table_name: String,
    filter: Option<String>,
    page_size: usize,
    page_index: usize,
    cursor: Option<String>,
}

impl FetchSignature {
    fn new(epoch: u64, args: &FetchArgs) -> Self {
        Self {
            epoch,
            table_name: args.table_name.clone(),
            filter: args.filter.clone(),
            page_size: args.page_size,
            page_index: args.page_index,
            cursor: args.cursor().map(str::to_string),
        }
    }
}

/// An in-flight fetch started by [`TableBrowserController::begin_fetch`].
#[derive(Debug, Clone)]
pub struct FetchTicket {
    seq: u64,
    signature: FetchSignature,
    args: FetchArgs,
    previous: Option<ListRowsResponse>,
}

impl FetchTicket {
    pub fn args(&self) -> &FetchArgs {
        &self.args
    }

    pub async fn execute(&self, api: &dyn AdminApi) -> Result<FetchedPage, AdminError> {
        fetch_page(api, &self.args, self.previous.as_ref()).await
    }
}

fn normalize_filter(filter: Option<&str>) -> Option<String> {
    filter
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

/// Row browsing state machine for one selected table or view.
pub struct TableBrowserController {
    api: Arc<dyn AdminApi>,
    store: watch::Sender<BrowserStore>,
    observed: watch::Receiver<BrowserStore>,
    // Kept outside the store: recording a cursor must not trigger another fetch.
    cursors: CursorStore,
    status: BrowserStatus,
    last_ready: Option<Arc<TableState>>,
    epoch: u64,
    // Sequence number of the last issued ticket and of the last one applied.
    issued_seq: u64,
    applied_seq: u64,
    refresh_requested: bool,
}

impl TableBrowserController {
    pub fn new(api: Arc<dyn AdminApi>, relation: Relation, options: BrowserOptions) -> Self {
        let (store, observed) = watch::channel(BrowserStore {
            selected: relation,
            filter: normalize_filter(options.filter.as_deref()),
            pagination: Pagination {
                page_index: 0,
                page_size: options.page_size.max(1),
            },
        });

        Self {
            api,
            store,
            observed,
            cursors: CursorStore::new(),
            status: BrowserStatus::Idle,
            last_ready: None,
            epoch: 0,
            issued_seq: 0,
            applied_seq: 0,
            refresh_requested: true,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BrowserStore> {
        self.store.subscribe()
    }

    pub fn store(&self) -> BrowserStore {
        self.store.borrow().clone()
    }

    pub fn selected(&self) -> Relation {
        self.store.borrow().selected.clone()
    }

    pub fn filter(&self) -> Option<String> {
        self.store.borrow().filter.clone()
    }

    pub fn pagination(&self) -> Pagination {
        self.store.borrow().pagination
    }

    pub fn status(&self) -> &BrowserStatus {
        &self.status
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    /// The page to display: the current one, the stale one behind an error, or the
    /// previous one while loading.
    pub fn state(&self) -> Option<Arc<TableState>> {
        match &self.status {
            BrowserStatus::Ready(state) => Some(state.clone()),
            BrowserStatus::Error { stale, .. } => stale.clone(),
            BrowserStatus::Idle | BrowserStatus::Loading => self.last_ready.clone(),
        }
    }

    pub fn fetch_args(&self) -> FetchArgs {
        let store = self.store.borrow();
        FetchArgs {
            table_name: store.selected.name().to_string(),
            filter: store.filter.clone(),
            page_size: store.pagination.page_size,
            page_index: store.pagination.page_index,
            cursors: self.cursors.to_vec(),
        }
    }

    fn signature(&self) -> FetchSignature {
        FetchSignature::new(self.epoch, &self.fetch_args())
    }

    /// Switches to another relation. Filter, pagination and cursors do not carry over.
    ///
    /// Selecting the current relation with changed metadata (e.g. after a schema reload)
    /// swaps it in place and keeps the browsing position.
    pub fn select_table(&mut self, relation: Relation) {
        let (same_name, unchanged) = {
            let store = self.store.borrow();
            (
                store.selected.name() == relation.name(),
                store.selected == relation,
            )
        };
        if unchanged {
            return;
        }
        if same_name {
            debug!("schema of {} changed", relation.name());
            self.store.send_modify(|store| store.selected = relation);
            return;
        }

        info!("browsing {}", relation.name());
        self.cursors.reset();
        self.last_ready = None;
        self.epoch += 1;
        self.status = BrowserStatus::Loading;
        self.store.send_modify(|store| {
            store.selected = relation;
            store.filter = None;
            store.pagination.page_index = 0;
        });
    }

    /// Applies a submitted filter. Re-submitting the current filter refreshes the page.
    pub fn submit_filter(&mut self, filter: &str) {
        let filter = normalize_filter(Some(filter));
        let (current, page_index) = {
            let store = self.store.borrow();
            (store.filter.clone(), store.pagination.page_index)
        };

        if filter == current {
            debug!("filter unchanged, refreshing");
            self.refresh_requested = true;
            return;
        }

        // Boundaries past the current page were computed for the old filter.
        self.cursors.truncate(page_index);
        self.status = BrowserStatus::Loading;
        self.store.send_modify(|store| store.filter = filter);
    }

    pub fn set_page_index(&mut self, page_index: usize) {
        let page_index = match self.page_count() {
            Some(count) if count > 0 => page_index.min(count - 1),
            _ => page_index,
        };

        let changed = self.store.send_if_modified(|store| {
            if store.pagination.page_index == page_index {
                return false;
            }
            store.pagination.page_index = page_index;
            true
        });
        if changed {
            self.status = BrowserStatus::Loading;
        }
    }

    /// Changes the page size. Page boundaries depend on it, so paging starts over.
    pub fn set_page_size(&mut self, page_size: usize) {
        let page_size = page_size.max(1);
        if self.pagination().page_size == page_size {
            return;
        }

        self.cursors.reset();
        self.status = BrowserStatus::Loading;
        self.store.send_modify(|store| {
            store.pagination = Pagination {
                page_index: 0,
                page_size,
            };
        });
    }

    pub fn page_count(&self) -> Option<usize> {
        let state = self.state()?;
        let page_size = self.pagination().page_size;
        Some((state.response.total_row_count as usize).div_ceil(page_size))
    }

    pub fn has_next_page(&self) -> bool {
        match self.page_count() {
            Some(count) => self.pagination().page_index + 1 < count,
            None => false,
        }
    }

    pub fn next_page(&mut self) {
        if self.has_next_page() {
            self.set_page_index(self.pagination().page_index + 1);
        }
    }

    pub fn previous_page(&mut self) {
        let page_index = self.pagination().page_index;
        if page_index > 0 {
            self.set_page_index(page_index - 1);
        }
    }

    /// Asks the next [`sync`](Self::sync) to refetch the current page.
    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    /// Starts a fetch for the current inputs.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.observed.borrow_and_update();
        self.refresh_requested = false;
        self.status = BrowserStatus::Loading;
        self.issued_seq += 1;

        let args = self.fetch_args();
        FetchTicket {
            seq: self.issued_seq,
            signature: FetchSignature::new(self.epoch, &args),
            args,
            previous: self.last_ready.as_ref().map(|state| state.response.clone()),
        }
    }

    /// Applies the result of `ticket`.
    ///
    /// Returns `Ok(false)` if the inputs changed since the ticket was issued, or if a
    /// later ticket or a row mutation already superseded it; the result is then dropped.
    /// A failure without stale data to fall back on is returned.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<FetchedPage, AdminError>,
    ) -> Result<bool, AdminError> {
        if ticket.signature != self.signature() {
            debug!(
                "discarding outdated response for {} page {}",
                ticket.args.table_name, ticket.args.page_index
            );
            return Ok(false);
        }
        if ticket.seq <= self.applied_seq {
            debug!(
                "discarding superseded response for {} page {}",
                ticket.args.table_name, ticket.args.page_index
            );
            return Ok(false);
        }
        self.applied_seq = ticket.seq;

        match result {
            Ok(FetchedPage {
                response,
                stale: None,
            }) => {
                let page_index = ticket.args.page_index;
                if self
                    .cursors
                    .record_success(page_index, response.cursor.as_deref())
                {
                    debug!("recorded cursor for page {}", page_index + 1);
                }

                let state = Arc::new(TableState::build(&self.selected(), response));
                self.last_ready = Some(state.clone());
                self.status = BrowserStatus::Ready(state);
                Ok(true)
            }
            Ok(FetchedPage {
                stale: Some(err), ..
            }) => {
                self.status = BrowserStatus::Error {
                    message: err.to_string(),
                    stale: self.last_ready.clone(),
                };
                Ok(true)
            }
            Err(err) => {
                warn!("failed to fetch rows of {}: {}", ticket.args.table_name, err);
                self.status = BrowserStatus::Error {
                    message: err.to_string(),
                    stale: self.last_ready.clone(),
                };
                Err(err)
            }
        }
    }

    /// Fetches the current page.
    pub async fn load(&mut self) -> Result<(), AdminError> {
        let ticket = self.begin_fetch();
        let result = ticket.execute(self.api.as_ref()).await;
        self.complete_fetch(ticket, result).map(|_| ())
    }

    /// Fetches if the inputs changed or a refresh was requested. Returns whether a fetch
    /// happened.
    pub async fn sync(&mut self) -> Result<bool, AdminError> {
        let changed = self.observed.has_changed().unwrap_or(false);
        if !changed && !self.refresh_requested {
            return Ok(false);
        }

        self.load().await?;
        Ok(true)
    }

    fn mutable_relation(&self) -> Result<Relation, AdminError> {
        let relation = self.selected();
        if !relation.is_mutable() {
            return Err(AdminError::ReadOnly(relation.name().to_string()));
        }
        Ok(relation)
    }

    async fn refetch_after_mutation(&mut self) {
        // Tickets issued before the mutation carry rows it changed.
        self.applied_seq = self.issued_seq;
        if let Err(err) = self.load().await {
            warn!("refetch after mutation failed: {}", err);
        }
    }

    pub async fn insert_row(&mut self, row: FormRow) -> Result<String, AdminError> {
        let relation = self.mutable_relation()?;
        let request = insert_request(row);

        let result = self.api.insert_row(relation.name(), &request).await?;
        info!("inserted row into {}", relation.name());

        self.refetch_after_mutation().await;
        Ok(result)
    }

    pub async fn update_row(&mut self, row: FormRow) -> Result<String, AdminError> {
        let relation = self.mutable_relation()?;
        let request = update_request(relation.columns(), row)?;

        let result = self.api.update_row(relation.name(), &request).await?;
        info!("updated row of {}", relation.name());

        self.refetch_after_mutation().await;
        Ok(result)
    }

    /// Deletes the rows with the given primary key values.
    pub async fn delete_rows(&mut self, values: Vec<String>) -> Result<DeleteOutcome, AdminError> {
        if values.is_empty() {
            return Ok(DeleteOutcome::Noop);
        }

        let relation = self.mutable_relation()?;
        let (columns, pk_index) = match self.state() {
            Some(state) => (state.response.columns.clone(), state.pk_column_index),
            None => (
                relation.columns().to_vec(),
                find_primary_key_column_index(relation.columns()),
            ),
        };
        let Some(request) = delete_request(&columns, pk_index, values)? else {
            return Ok(DeleteOutcome::Noop);
        };

        let result = self.api.delete_rows(relation.name(), &request).await?;
        info!(
            "deleted {} row(s) from {}",
            request.values.len(),
            relation.name()
        );

        // Removed rows may have anchored later page boundaries.
        let page_index = self.pagination().page_index;
        self.cursors.truncate(page_index);

        self.refetch_after_mutation().await;
        Ok(DeleteOutcome::Deleted(result))
    }

    pub async fn fetch_thumbnail(&self, thumbnail: &ThumbnailRef) -> Result<Vec<u8>, AdminError> {
        self.api.fetch_file(&thumbnail.url).await
    }

    /// The displayed row at `row_index` keyed by column name, e.g. to seed an edit.
    pub fn row_as_form(&self, row_index: usize) -> Option<FormRow> {
        let state = self.state()?;
        let row = state.response.rows.get(row_index)?;
        Some(row_to_form_row(&state.response.columns, row))
    }
}
