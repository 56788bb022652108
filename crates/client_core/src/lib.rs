//! Client core of the bookstore storefront: the view-state pipelines and
//! the refresh signaling that keeps sibling views consistent with the REST
//! backend.

pub mod api;
pub mod cart;
pub mod config;
pub mod detail;
pub mod dialog;
pub mod error;
pub mod http;
pub mod list;
pub mod mutation;
pub mod refresh;
pub mod sort;

pub use api::{
    Acknowledgment, BookApi, CartApi, ConfirmDialog, DeletionTarget, DialogOutcome,
    IdentityProvider, ReviewApi, Route, UiShell,
};
pub use cart::{CartSnapshot, CartView};
pub use config::{load_settings, ClientSettings};
pub use detail::{DatedReview, DetailPhase, DetailRefreshController, DetailView};
pub use dialog::{Confirmer, DeleteDialog};
pub use error::{ClientError, ValidationFailure};
pub use http::{HttpBookstoreClient, Resource};
pub use list::{BookItem, BookListView, ListItem, ListPage, ListParams, ListQueryPipeline};
pub use mutation::{CartMutationFlow, MutationAction, MutationReceipt};
pub use refresh::{RefreshBus, RefreshSignal, Subscription};
pub use sort::{SortOrder, SortState};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
