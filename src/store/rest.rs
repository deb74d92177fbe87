//! PostgREST store.
//!
//! Talks to `{url}/rest/v1/{table}` the way Supabase exposes tables:
//! `apikey` and bearer headers on every request, JSON bodies, filters as
//! query parameters.

use std::future::Future;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use tracing::debug;

use super::{validate_table_name, OrderStore, StoredObject, StoredRow};
use crate::error::{Error, Result};

/// A `wo` value that never occurs in real data.
///
/// PostgREST refuses a DELETE without a filter, so delete-all is expressed
/// as "wo is not this value, or wo is null".
pub const DELETE_ALL_SENTINEL: &str = "___never___";

/// Rows requested per GET. The server may return fewer.
pub const FETCH_PAGE_SIZE: usize = 1000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgREST-backed order book store.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestStore {
    /// Create a store for `table` at `base_url`, authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is not a plain identifier or the
    /// HTTP client cannot be built.
    pub fn new(base_url: String, api_key: String, table: String) -> Result<Self> {
        validate_table_name(&table)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Pass through successful responses; turn anything else into `Error::Store`.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Store {
            status: status.as_u16(),
            message: store_message(&body),
        })
    }

    /// One page of rows starting at `offset`, in id order.
    async fn fetch_page(&self, offset: usize) -> Result<Vec<StoredObject>> {
        let response = self
            .request(Method::GET)
            .query(&[
                ("select", "*".to_string()),
                ("order", "id.asc".to_string()),
                ("limit", FETCH_PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }
}

/// PostgREST errors carry a JSON body with a `message`; fall back to raw text.
fn store_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Fetch pages until one comes back empty.
///
/// The server may cap a page below the requested limit (PostgREST
/// `max-rows`), so a short page does not mean the end of the table.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<StoredObject>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<StoredObject>>>,
{
    let mut rows = Vec::new();
    loop {
        let page = fetch_page(rows.len()).await?;
        if page.is_empty() {
            break;
        }
        debug!(offset = rows.len(), rows = page.len(), "Fetched order book page");
        rows.extend(page);
    }
    Ok(rows)
}

/// Filter that matches every row.
fn delete_all_filter() -> String {
    format!("(wo.neq.{DELETE_ALL_SENTINEL},wo.is.null)")
}

impl OrderStore for RestStore {
    fn describe(&self) -> String {
        format!("postgrest {}", self.table_url())
    }

    async fn fetch_all(&self) -> Result<Vec<StoredObject>> {
        collect_pages(|offset| self.fetch_page(offset)).await
    }

    async fn delete_all(&self) -> Result<()> {
        let response = self
            .request(Method::DELETE)
            .query(&[("or", delete_all_filter())])
            .header("Prefer", "return=minimal")
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn insert(&self, rows: &[StoredRow]) -> Result<()> {
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
