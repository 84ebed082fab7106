use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::index::{
    IndexError, IndexQuery, IndexResponse, IndexService, with_required_fields,
};

/// Index client for the big-query endpoint: identifiers are posted as a
/// one-column CSV and applied as a bitset filter.
pub struct BigQueryIndexClient {
    http: reqwest::Client,
    endpoint: Url,
    service_token: Option<String>,
}

impl fmt::Debug for BigQueryIndexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryIndexClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl BigQueryIndexClient {
    pub fn new(
        endpoint: &str,
        service_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| IndexError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            service_token,
        })
    }

    fn request_body(identifiers: &[String]) -> String {
        let mut body = String::from("bibcode");
        for identifier in identifiers {
            body.push('\n');
            body.push_str(identifier);
        }
        body
    }

    /// Query-string parameters for one lookup. Callers' field lists are
    /// widened so the response can always be reconciled.
    fn query_params(query: &IndexQuery) -> [(&'static str, String); 7] {
        [
            ("q", "*:*".to_string()),
            ("wt", "json".to_string()),
            ("fl", with_required_fields(&query.fl)),
            ("start", query.start.to_string()),
            ("rows", query.rows.to_string()),
            ("sort", query.sort.clone()),
            ("fq", "{!bitset}".to_string()),
        ]
    }
}

#[async_trait]
impl IndexService for BigQueryIndexClient {
    async fn lookup(
        &self,
        identifiers: &[String],
        query: &IndexQuery,
    ) -> Result<IndexResponse, IndexError> {
        let params = Self::query_params(query);

        debug!(
            identifiers = identifiers.len(),
            start = query.start,
            rows = query.rows,
            sort = %query.sort,
            "Querying index"
        );

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .query(&params)
            .header(CONTENT_TYPE, "big-query/csv")
            .body(Self::request_body(identifiers));
        if let Some(token) = &self.service_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Index request failed");
            return Err(IndexError::Status(status.as_u16()));
        }

        let raw: Value = response.json().await?;
        IndexResponse::from_value(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_single_column_csv() {
        let body = BigQueryIndexClient::request_body(&[
            "2019A".to_string(),
            "2020B".to_string(),
        ]);
        assert_eq!(body, "bibcode\n2019A\n2020B");
    }

    #[test]
    fn outgoing_field_list_includes_identifier_fields() {
        let query = IndexQuery {
            fl: "title".to_string(),
            start: 0,
            rows: 20,
            sort: "date desc".to_string(),
        };
        let params = BigQueryIndexClient::query_params(&query);
        let fl = params
            .iter()
            .find(|(name, _)| *name == "fl")
            .map(|(_, value)| value.as_str());
        assert_eq!(fl, Some("title,bibcode,alternate_bibcode"));
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let err = BigQueryIndexClient::new("not a url", None, Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidEndpoint(_)));
    }
}
