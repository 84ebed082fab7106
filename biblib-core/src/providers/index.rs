use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Index returned HTTP {0}")]
    Status(u16),

    #[error("Malformed index response: {0}")]
    MalformedResponse(String),

    #[error("Invalid index endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Fields every index lookup must return for reconciliation to work.
pub const REQUIRED_FIELDS: [&str; 2] = ["bibcode", "alternate_bibcode"];

/// Parameters forwarded to the index alongside the identifier list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    pub fl: String,
    pub start: usize,
    pub rows: usize,
    pub sort: String,
}

/// Append any of [`REQUIRED_FIELDS`] missing from a comma separated field
/// list, keeping the caller's fields and their order.
pub fn with_required_fields(fl: &str) -> String {
    let mut fields: Vec<&str> = fl
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect();
    for required in REQUIRED_FIELDS {
        if !fields.contains(&required) {
            fields.push(required);
        }
    }
    fields.join(",")
}

/// One document as reported by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub bibcode: String,
    pub alternate_bibcode: Vec<String>,
}

/// A parsed index response. The raw JSON is kept so it can be handed back to
/// clients verbatim; `records` mirrors `response.docs` one to one.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexResponse {
    raw: Value,
    records: Vec<IndexRecord>,
}

impl IndexResponse {
    /// Validate the `response.docs` shape and extract the identifiers.
    pub fn from_value(raw: Value) -> Result<Self, IndexError> {
        let docs = raw
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                IndexError::MalformedResponse("missing response.docs".into())
            })?;

        let records = docs
            .iter()
            .map(record_from_doc)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { raw, records })
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn bibcodes(&self) -> Vec<String> {
        self.records.iter().map(|r| r.bibcode.clone()).collect()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Reorder `records` and `response.docs` together. `order[i]` is the
    /// current position of the element that should end up at position `i`.
    pub fn reorder(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.records.len());
        self.records = order.iter().map(|&i| self.records[i].clone()).collect();
        if let Some(docs) = self.docs_mut() {
            let reordered: Vec<Value> =
                order.iter().filter_map(|&i| docs.get(i).cloned()).collect();
            *docs = reordered;
        }
    }

    /// Keep only `[start, start + rows)` of the documents.
    pub fn window(&mut self, start: usize, rows: usize) {
        let keep = |len: usize| {
            let from = start.min(len);
            from..from.saturating_add(rows).min(len)
        };
        let range = keep(self.records.len());
        self.records = self.records[range].to_vec();
        if let Some(docs) = self.docs_mut() {
            let range = keep(docs.len());
            *docs = docs[range].to_vec();
        }
    }

    fn docs_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.raw
            .pointer_mut("/response/docs")
            .and_then(Value::as_array_mut)
    }
}

fn record_from_doc(doc: &Value) -> Result<IndexRecord, IndexError> {
    let bibcode = doc
        .get("bibcode")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            IndexError::MalformedResponse(format!("document without bibcode: {doc}"))
        })?
        .to_string();

    let alternate_bibcode = match doc.get("alternate_bibcode") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| {
                value.as_str().map(str::to_string).ok_or_else(|| {
                    IndexError::MalformedResponse(format!(
                        "non-string alternate_bibcode on {bibcode}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(IndexError::MalformedResponse(format!(
                "alternate_bibcode on {bibcode} is not a list: {other}"
            )));
        }
    };

    Ok(IndexRecord {
        bibcode,
        alternate_bibcode,
    })
}

/// Resolves identifiers against the search index.
#[async_trait]
pub trait IndexService: Send + Sync {
    async fn lookup(
        &self,
        identifiers: &[String],
        query: &IndexQuery,
    ) -> Result<IndexResponse, IndexError>;
}
