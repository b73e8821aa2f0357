//! Row browsing: column classification, render policy, cursor paging and the
//! controller tying them together.

pub mod classify;
pub mod columns;
pub mod controller;
pub mod cursors;
pub mod fetch;
pub mod mutations;

pub use controller::{
    BrowserOptions, BrowserStatus, BrowserStore, FetchTicket, Pagination, TableBrowserController,
    TableState,
};
pub use mutations::DeleteOutcome;
