//! Catalog listing: fetch, annotate, order.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use futures::future::BoxFuture;
use shared::{
    domain::{Book, Review},
    protocol::BookQuery,
};
use tracing::{debug, warn};

use crate::{
    api::{is_admin, BookApi, ConfirmDialog, DeletionTarget, DialogOutcome, IdentityProvider},
    error::Result,
    refresh::{RefreshBus, Subscription},
    sort::{self, FieldValue, SortField, SortState},
};

/// Free-text fields the search index cannot order by.
pub const NOT_SORTABLE_DURING_SEARCH: [&str; 3] = ["title", "author", "description"];

pub const MAX_STARS: usize = 5;

/// A raw record that carries a nested sub-collection and an aggregate over it.
pub trait ListEntity: Clone + Send + Sync + 'static {
    type SubItem: Clone + Send + Sync + 'static;

    fn take_sub_items(&mut self) -> Option<Vec<Self::SubItem>>;
    fn raw_aggregate(&self) -> Option<f64>;
    fn field(&self, predicate: &str) -> Option<FieldValue>;
}

impl ListEntity for Book {
    type SubItem = Review;

    fn take_sub_items(&mut self) -> Option<Vec<Review>> {
        self.reviews.take()
    }

    fn raw_aggregate(&self) -> Option<f64> {
        self.average_rating
    }

    fn field(&self, predicate: &str) -> Option<FieldValue> {
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        match predicate {
            "id" => Some(FieldValue::Number(self.id.0 as f64)),
            "title" => text(&self.title),
            "author" => text(&self.author),
            "description" => text(&self.description),
            "price" => self.price.map(FieldValue::Number),
            "stock" => Some(FieldValue::Number(self.stock() as f64)),
            "available" => self.available.map(FieldValue::Bool),
            "category" | "category.name" => self
                .category
                .as_ref()
                .and_then(|c| c.name.clone())
                .map(FieldValue::Text),
            _ => None,
        }
    }
}

/// A fetched record plus its always-present derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem<E: ListEntity> {
    pub record: E,
    pub sub_items: Vec<E::SubItem>,
    pub aggregate: f64,
}

impl<E: ListEntity> ListItem<E> {
    pub fn annotate(mut record: E) -> Self {
        let sub_items = record.take_sub_items().unwrap_or_default();
        let aggregate = record.raw_aggregate().filter(|v| v.is_finite()).unwrap_or(0.0);
        Self {
            record,
            sub_items,
            aggregate,
        }
    }

    /// Filled flags for the rating widget.
    pub fn stars(&self) -> [bool; MAX_STARS] {
        let filled = self.aggregate.round().clamp(0.0, MAX_STARS as f64) as usize;
        std::array::from_fn(|slot| slot < filled)
    }
}

impl<E: ListEntity> SortField for ListItem<E> {
    fn sort_field(&self, predicate: &str) -> Option<FieldValue> {
        match predicate {
            "averageRating" => Some(FieldValue::Number(self.aggregate)),
            "reviews" => Some(FieldValue::Number(self.sub_items.len() as f64)),
            _ => self.record.field(predicate),
        }
    }
}

pub type BookItem = ListItem<Book>;

/// Result of a load: the items and the sort state actually applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<BookItem>,
    pub sort: SortState,
}

fn is_search(search: Option<&str>) -> bool {
    search.is_some_and(|s| !s.is_empty())
}

/// A free-text predicate cannot be combined with an active search term.
pub fn effective_sort(search: Option<&str>, sort: &SortState, default: &SortState) -> SortState {
    let restricted =
        |state: &SortState| state.predicate().is_some_and(|p| NOT_SORTABLE_DURING_SEARCH.contains(&p));
    if !is_search(search) || !restricted(sort) {
        return sort.clone();
    }
    if restricted(default) {
        SortState::none()
    } else {
        default.clone()
    }
}

pub struct ListQueryPipeline {
    books: Arc<dyn BookApi>,
    default_sort: SortState,
}

impl ListQueryPipeline {
    pub fn new(books: Arc<dyn BookApi>, default_sort: SortState) -> Self {
        Self {
            books,
            default_sort,
        }
    }

    pub fn default_sort(&self) -> &SortState {
        &self.default_sort
    }

    pub async fn load(&self, search: Option<&str>, sort: &SortState) -> Result<ListPage> {
        let sort = effective_sort(search, sort, &self.default_sort);
        let query = BookQuery {
            query: search.filter(|s| !s.is_empty()).map(str::to_string),
            sort: sort::encode(&sort),
            eagerload: true,
        };

        let raw = if is_search(search) {
            debug!(query = ?query.query, "books: search-mode fetch");
            self.books.search_books(&query).await?
        } else {
            debug!("books: browse-mode fetch");
            self.books.query_books(&query).await?
        };

        let mut items: Vec<BookItem> = raw.into_iter().map(ListItem::annotate).collect();
        sort::apply(&mut items, &sort);
        Ok(ListPage { items, sort })
    }
}

/// `search` / `sort` route query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookListState {
    pub search: String,
    pub sort: SortState,
    pub items: Vec<BookItem>,
    pub is_admin: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Book list page: owns search/sort/items and reloads on refresh signals.
#[derive(Clone)]
pub struct BookListView {
    pipeline: Arc<ListQueryPipeline>,
    dialog: Arc<dyn ConfirmDialog>,
    state: Arc<Mutex<BookListState>>,
    generation: Arc<AtomicU64>,
}

impl BookListView {
    pub fn new(pipeline: Arc<ListQueryPipeline>, dialog: Arc<dyn ConfirmDialog>) -> Self {
        Self {
            pipeline,
            dialog,
            state: Arc::new(Mutex::new(BookListState::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BookListState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> BookListState {
        self.lock().clone()
    }

    pub async fn resolve_admin(&self, identity: &dyn IdentityProvider) {
        let admin = is_admin(identity).await;
        self.lock().is_admin = admin;
    }

    /// Adopts route parameters; the sort parameter falls back to the default.
    pub fn apply_params(&self, params: &ListParams) {
        let default = sort::encode(self.pipeline.default_sort());
        let decoded = sort::decode(params.sort.as_deref(), default.as_deref());
        let search = params.search.as_deref().unwrap_or_default().trim().to_string();
        let mut state = self.lock();
        state.sort = effective_sort(Some(search.as_str()), &decoded, self.pipeline.default_sort());
        state.search = search;
    }

    pub fn to_params(&self) -> ListParams {
        let state = self.lock();
        ListParams {
            search: (!state.search.is_empty()).then(|| state.search.clone()),
            sort: sort::encode(&state.sort),
        }
    }

    pub async fn search(&self, query: &str) -> Result<()> {
        {
            let mut state = self.lock();
            state.search = query.trim().to_string();
        }
        self.load().await
    }

    pub async fn sort_by(&self, sort: SortState) -> Result<()> {
        self.lock().sort = sort;
        self.load().await
    }

    pub fn can_add_to_cart(&self, book: &Book) -> bool {
        !self.lock().is_admin && book.in_stock()
    }

    pub fn can_manage(&self) -> bool {
        self.lock().is_admin
    }

    pub async fn delete(&self, book: Book) -> Result<DialogOutcome> {
        let outcome = self.dialog.confirm_delete(DeletionTarget::Book(book)).await;
        if outcome == DialogOutcome::Deleted {
            self.load().await?;
        }
        Ok(outcome)
    }

    pub fn load(&self) -> BoxFuture<'static, Result<()>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (search, sort) = {
            let mut state = self.lock();
            state.is_loading = true;
            (state.search.clone(), state.sort.clone())
        };
        let view = self.clone();
        Box::pin(async move {
            let result = view.pipeline.load(Some(search.as_str()), &sort).await;
            if view.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "books: discarding stale list response");
                return result.map(|_| ());
            }
            let mut state = view.lock();
            state.is_loading = false;
            match result {
                Ok(page) => {
                    state.items = page.items;
                    state.sort = page.sort;
                    state.last_error = None;
                    Ok(())
                }
                Err(err) => {
                    warn!(error = %err, "books: list load failed");
                    state.last_error = Some(err.to_string());
                    Err(err)
                }
            }
        })
    }

    /// Reloads on every signal. Requires a running tokio runtime at notify time.
    pub fn attach(&self, bus: &RefreshBus) -> Subscription {
        let view = self.clone();
        bus.subscribe(move |_| match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let reload = view.load();
                handle.spawn(async move {
                    let _ = reload.await;
                });
            }
            Err(_) => warn!("books: refresh signal outside a runtime; reload skipped"),
        })
    }
}

#[cfg(test)]
#[path = "tests/list_tests.rs"]
mod tests;
