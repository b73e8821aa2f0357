use log::{debug, warn};

use crate::{
    api::AdminApi,
    errors::AdminError,
    models::rows::{FetchArgs, ListRowsResponse},
};

/// Result of a page fetch.
#[derive(Debug)]
pub struct FetchedPage {
    pub response: ListRowsResponse,
    /// Set when the fetch failed and `response` is the previous page returned as-is.
    pub stale: Option<AdminError>,
}

impl FetchedPage {
    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }
}

/// Fetches one page of rows.
///
/// On failure the `previous` response is handed back unchanged if there is one,
/// otherwise the error is returned.
pub async fn fetch_page(
    api: &dyn AdminApi,
    args: &FetchArgs,
    previous: Option<&ListRowsResponse>,
) -> Result<FetchedPage, AdminError> {
    let query = args.to_query();
    debug!(
        "fetching {} page {} (size {}, cursor {:?}, offset {:?})",
        args.table_name, args.page_index, args.page_size, query.cursor, query.offset
    );

    let result = api
        .list_rows(&args.table_name, &query)
        .await
        .and_then(|response| response.validate().map(|_| response));

    match (result, previous) {
        (Ok(response), _) => Ok(FetchedPage {
            response,
            stale: None,
        }),
        (Err(err), Some(previous)) => {
            warn!(
                "fetching {} page {} failed, keeping previous rows: {}",
                args.table_name, args.page_index, err
            );
            Ok(FetchedPage {
                response: previous.clone(),
                stale: Some(err),
            })
        }
        (Err(err), None) => Err(err),
    }
}
