//! Query builder for a single table.

use std::fmt::Display;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{BackendClient, BackendError, parse_body};

/// Sort direction for [`TableQuery::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// A query against one table, built up then consumed by a terminal method.
///
/// Reads: [`fetch`](Self::fetch), [`fetch_optional`](Self::fetch_optional),
/// [`fetch_one`](Self::fetch_one). Writes: [`insert`](Self::insert),
/// [`insert_one`](Self::insert_one), [`insert_only`](Self::insert_only),
/// [`update`](Self::update), [`delete`](Self::delete).
#[must_use = "queries do nothing until a terminal method is awaited"]
pub struct TableQuery<'a> {
    client: &'a BackendClient,
    table: &'a str,
    columns: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl<'a> TableQuery<'a> {
    pub(super) const fn new(client: &'a BackendClient, table: &'a str) -> Self {
        Self {
            client,
            table,
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Columns to return, including embedded relations
    /// (e.g. `*,order_items(*,products(name))`).
    pub fn select(mut self, columns: &str) -> Self {
        // Whitespace is insignificant in the select syntax; strip it so
        // multi-line selects produce compact URLs.
        self.columns = Some(columns.chars().filter(|c| !c.is_whitespace()).collect());
        self
    }

    /// Keep rows where `column = value`.
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Sort by `column`. Multiple calls add tie-breakers.
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_owned(), direction));
        self
    }

    /// Return at most `n` rows.
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn url(&self) -> Result<Url, BackendError> {
        let mut url = self.client.table_url(self.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(columns) = &self.columns {
                pairs.append_pair("select", columns);
            }
            for (column, expr) in &self.filters {
                pairs.append_pair(column, expr);
            }
            if !self.order.is_empty() {
                let order = self
                    .order
                    .iter()
                    .map(|(column, dir)| format!("{column}.{}", dir.as_str()))
                    .collect::<Vec<_>>()
                    .join(",");
                pairs.append_pair("order", &order);
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        // `query_pairs_mut` leaves a bare `?` when nothing was appended
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn require_filter(&self, action: &'static str) -> Result<(), BackendError> {
        if self.filters.is_empty() {
            return Err(BackendError::UnfilteredMutation(action, self.table.to_owned()));
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch all matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or rows cannot be decoded.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let url = self.url()?;
        let body = self.client.send(self.client.inner.client.get(url)).await?;
        let rows: Vec<T> = parse_body(&body)?;
        debug!(rows = rows.len(), "Fetched rows");
        Ok(rows)
    }

    /// Fetch the first matching row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be decoded.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if nothing matched.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, BackendError> {
        let what = self.describe();
        self.fetch_optional()
            .await?
            .ok_or(BackendError::NotFound(what))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert rows and return them as stored (ids, timestamps filled in).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert.
    #[instrument(skip(self, rows), fields(table = %self.table))]
    pub async fn insert<B, T>(self, rows: &[B]) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url()?;
        let request = self
            .client
            .inner
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(rows);
        let body = self.client.send(request).await?;
        let stored: Vec<T> = parse_body(&body)?;
        debug!(rows = stored.len(), "Inserted rows");
        Ok(stored)
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails or the backend returns no row
    /// (e.g. row-level security hides the new row from its creator).
    pub async fn insert_one<B, T>(self, row: &B) -> Result<T, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let table = self.table.to_owned();
        let stored: Vec<T> = self.insert(std::slice::from_ref(row)).await?;
        stored
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{table}: inserted row not returned")))
    }

    /// Insert rows without reading them back.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert.
    #[instrument(skip(self, rows), fields(table = %self.table, count = rows.len()))]
    pub async fn insert_only<B>(self, rows: &[B]) -> Result<(), BackendError>
    where
        B: Serialize + Sync,
    {
        let url = self.url()?;
        let request = self
            .client
            .inner
            .client
            .post(url)
            .header("Prefer", "return=minimal")
            .json(rows);
        self.client.send(request).await?;
        Ok(())
    }

    /// Apply `patch` to every matching row and return the updated rows.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::UnfilteredMutation` if no filter was added, or
    /// an error if the backend rejects the update.
    #[instrument(skip(self, patch), fields(table = %self.table))]
    pub async fn update<B, T>(self, patch: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.require_filter("update")?;
        let url = self.url()?;
        let request = self
            .client
            .inner
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .json(patch);
        let body = self.client.send(request).await?;
        let updated: Vec<T> = parse_body(&body)?;
        debug!(rows = updated.len(), "Updated rows");
        Ok(updated)
    }

    /// Delete every matching row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::UnfilteredMutation` if no filter was added, or
    /// an error if the backend rejects the delete.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(self) -> Result<(), BackendError> {
        self.require_filter("delete")?;
        let url = self.url()?;
        let request = self
            .client
            .inner
            .client
            .delete(url)
            .header("Prefer", "return=minimal");
        self.client.send(request).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        if self.filters.is_empty() {
            return self.table.to_owned();
        }
        let filters = self
            .filters
            .iter()
            .map(|(column, expr)| format!("{column}={expr}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{} where {filters}", self.table)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::BackendConfig;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u32,
        name: String,
    }

    async fn client_for(server: &MockServer) -> BackendClient {
        let config =
            BackendConfig::new(&server.uri(), SecretString::from("anon-test-key")).unwrap();
        BackendClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_building() {
        let config =
            BackendConfig::new("https://abc.example.co", SecretString::from("k")).unwrap();
        let client = BackendClient::new(&config).unwrap();

        let url = client
            .from("orders")
            .select("*,\n  order_items ( * )")
            .eq("user_id", "u1")
            .order("created_at", Direction::Descending)
            .limit(5)
            .url()
            .unwrap();

        assert_eq!(url.path(), "/rest/v1/orders");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_owned(), "*,order_items(*)".to_owned()),
                ("user_id".to_owned(), "eq.u1".to_owned()),
                ("order".to_owned(), "created_at.desc".to_owned()),
                ("limit".to_owned(), "5".to_owned()),
            ]
        );

        let bare = client.from("products").url().unwrap();
        assert_eq!(bare.as_str(), "https://abc.example.co/rest/v1/products");
    }

    #[tokio::test]
    async fn test_fetch_sends_keys_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("select", "*"))
            .and(query_param("name", "eq.Samosa"))
            .and(header("apikey", "anon-test-key"))
            .and(header("authorization", "Bearer anon-test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Samosa"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let rows: Vec<Row> = client
            .from("products")
            .select("*")
            .eq("name", "Samosa")
            .fetch()
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![Row {
                id: 1,
                name: "Samosa".to_owned()
            }]
        );
    }

    #[tokio::test]
    async fn test_user_token_replaces_anon_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/orders"))
            .and(header("apikey", "anon-test-key"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server)
            .await
            .with_access_token(SecretString::from("user-jwt"));
        let rows: Vec<Row> = client.from("orders").fetch().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_one_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/products"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .from("products")
            .eq("id", "x")
            .fetch_one::<Row>()
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(ref what) if what == "products where id=eq.x"));
    }

    #[tokio::test]
    async fn test_insert_one_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/products"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!([{"name": "Kulfi"}])))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{"id": 9, "name": "Kulfi"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let row: Row = client
            .from("products")
            .insert_one(&json!({"name": "Kulfi"}))
            .await
            .unwrap();
        assert_eq!(row.id, 9);
    }

    #[tokio::test]
    async fn test_api_error_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/orders"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "42501",
                "message": "new row violates row-level security policy for table \"orders\"",
                "details": null,
                "hint": null
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .from("orders")
            .insert_only(&[json!({"total_amount": 1})])
            .await
            .unwrap_err();
        match err {
            BackendError::Api {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(code.as_deref(), Some("42501"));
                assert!(message.contains("row-level security"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_as_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.from("products").fetch::<Row>().await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 502, ref message, .. } if message == "Bad Gateway"));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.from("products").fetch::<Row>().await.unwrap_err();
        assert!(matches!(err, BackendError::RateLimited(12)));
    }

    #[tokio::test]
    async fn test_unfiltered_mutations_are_refused() {
        let server = MockServer::start().await;
        // Nothing mounted: any request would 404
        let client = client_for(&server).await;

        let err = client.from("products").delete().await.unwrap_err();
        assert!(matches!(err, BackendError::UnfilteredMutation("delete", _)));

        let err = client
            .from("orders")
            .update::<_, Row>(&json!({"status": "cancelled"}))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnfilteredMutation("update", _)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_use_filters() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/orders"))
            .and(query_param("id", "eq.7"))
            .and(body_json(json!({"status": "confirmed"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": 7, "name": "o"}])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/products"))
            .and(query_param("id", "eq.3"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let updated: Vec<Row> = client
            .from("orders")
            .eq("id", 7)
            .update(&json!({"status": "confirmed"}))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        client.from("products").eq("id", 3).delete().await.unwrap();
    }
}
