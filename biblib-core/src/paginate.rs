//! Request parsing and windowing for library document listings.

use biblib_model::DocumentSet;
use serde::Deserialize;
use tracing::warn;

use crate::providers::index::{IndexQuery, IndexResponse, with_required_fields};

pub const DEFAULT_START: usize = 0;
pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_SORT: &str = "date desc";
pub const DEFAULT_FIELDS: &str = "bibcode";

/// Sort keys that are resolved locally from stored timestamps rather than by
/// the index.
const TIME_ASC: &str = "time asc";
const TIME_DESC: &str = "time desc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    /// Passed through to the index untouched.
    Index(String),
    /// Order by the time each identifier was added.
    Added { descending: bool },
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty());
        match raw {
            Some(TIME_ASC) => SortOrder::Added { descending: false },
            Some(TIME_DESC) => SortOrder::Added { descending: true },
            Some(other) => SortOrder::Index(other.to_string()),
            None => SortOrder::Index(DEFAULT_SORT.to_string()),
        }
    }

    /// Sort clause to send to the index.
    pub fn index_sort(&self) -> &str {
        match self {
            SortOrder::Index(sort) => sort,
            SortOrder::Added { .. } => DEFAULT_SORT,
        }
    }

    pub fn is_time_sort(&self) -> bool {
        matches!(self, SortOrder::Added { .. })
    }
}

/// Query-string parameters exactly as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub start: Option<String>,
    pub rows: Option<String>,
    pub sort: Option<String>,
    pub fl: Option<String>,
    pub raw: Option<String>,
}

/// Validated paging parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub start: usize,
    pub rows: usize,
    pub sort: SortOrder,
    pub fl: String,
    pub raw: bool,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            rows: DEFAULT_ROWS,
            sort: SortOrder::parse(None),
            fl: DEFAULT_FIELDS.to_string(),
            raw: false,
        }
    }
}

impl PageRequest {
    /// Parse `params`, capping `rows` at `max_rows`. If any of `start`,
    /// `rows` or `raw` fails to parse, all three fall back to their defaults.
    pub fn from_params(params: &PageParams, max_rows: usize) -> Self {
        let sort = SortOrder::parse(params.sort.as_deref());
        let fl = params
            .fl
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_FIELDS)
            .to_string();

        let parsed = (|| {
            let start = parse_count(params.start.as_deref(), DEFAULT_START)?;
            let rows = parse_count(params.rows.as_deref(), DEFAULT_ROWS)?;
            let raw = match params.raw.as_deref() {
                None => false,
                Some(value) => parse_flag(value)?,
            };
            Some((start, rows, raw))
        })();

        let (start, rows, raw) = parsed.unwrap_or_else(|| {
            warn!(?params, "Unparseable paging parameters, using defaults");
            (DEFAULT_START, DEFAULT_ROWS, false)
        });

        Self {
            start,
            rows: rows.min(max_rows),
            sort,
            fl,
            raw,
        }
    }

    /// Index query for a library holding `total` identifiers. Time sorts are
    /// ordered locally, so they ask for every document. The field list always
    /// carries the identifier fields reconciliation reads.
    pub fn index_query(&self, total: usize) -> IndexQuery {
        let fl = with_required_fields(&self.fl);
        match self.sort {
            SortOrder::Added { .. } => IndexQuery {
                fl,
                start: 0,
                rows: total,
                sort: self.sort.index_sort().to_string(),
            },
            SortOrder::Index(ref sort) => IndexQuery {
                fl,
                start: self.start,
                rows: self.rows,
                sort: sort.clone(),
            },
        }
    }
}

fn parse_count(raw: Option<&str>, default: usize) -> Option<usize> {
    match raw {
        None => Some(default),
        Some(value) => value.trim().parse::<usize>().ok(),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Row cap after applying the caller's rate-limit multiplier. A multiplier
/// that is not a positive finite number leaves the cap unchanged.
pub fn effective_max_rows(max_rows: usize, multiplier: f64) -> usize {
    if multiplier.is_finite() && multiplier > 0.0 {
        (max_rows as f64 * multiplier).floor() as usize
    } else {
        max_rows
    }
}

fn window<T: Clone>(items: &[T], start: usize, rows: usize) -> Vec<T> {
    items.iter().skip(start).take(rows).cloned().collect()
}

/// Orders and windows a library's identifiers for one response.
#[derive(Debug, Clone, Copy)]
pub struct ResultPaginator<'a> {
    documents: &'a DocumentSet,
    default_timestamp: f64,
}

impl<'a> ResultPaginator<'a> {
    /// `default_timestamp` stands in for entries stored without one.
    pub fn new(documents: &'a DocumentSet, default_timestamp: f64) -> Self {
        Self {
            documents,
            default_timestamp,
        }
    }

    /// Order without the index: by time when requested, otherwise
    /// lexicographically.
    pub fn paginate_stored(&self, page: &PageRequest) -> Vec<String> {
        let ordered = match page.sort {
            SortOrder::Added { descending } => self
                .documents
                .ordered_by_time(self.default_timestamp, descending),
            SortOrder::Index(_) => self.documents.identifiers(),
        };
        window(&ordered, page.start, page.rows)
    }

    /// Order using a successful index response, fetched with
    /// [`PageRequest::index_query`]. Time sorts also reorder and window the
    /// response's documents so they line up with the returned identifiers.
    pub fn paginate_indexed(
        &self,
        page: &PageRequest,
        response: &mut IndexResponse,
    ) -> Vec<String> {
        let SortOrder::Added { descending } = page.sort else {
            return response.bibcodes();
        };

        let timestamps: Option<Vec<f64>> = response
            .records()
            .iter()
            .map(|record| self.documents.timestamp_of(&record.bibcode))
            .collect();

        match timestamps {
            Some(timestamps) => {
                let mut order: Vec<usize> = (0..timestamps.len()).collect();
                order.sort_by(|&a, &b| {
                    let by_time = timestamps[a].total_cmp(&timestamps[b]);
                    if descending { by_time.reverse() } else { by_time }
                });
                response.reorder(&order);
            }
            None => {
                warn!(
                    "Index returned identifiers without a stored timestamp; \
                     keeping index order"
                );
            }
        }

        response.window(page.start, page.rows);
        response.bibcodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biblib_model::DocumentEntry;
    use serde_json::json;

    fn params(start: &str, rows: &str) -> PageParams {
        PageParams {
            start: Some(start.into()),
            rows: Some(rows.into()),
            ..PageParams::default()
        }
    }

    fn documents() -> DocumentSet {
        [("A", 1.0), ("B", 3.0), ("C", 2.0)]
            .into_iter()
            .map(|(id, ts)| (id.to_string(), DocumentEntry::at(ts)))
            .collect()
    }

    fn index_response(ids: &[&str]) -> IndexResponse {
        let docs: Vec<_> = ids.iter().map(|id| json!({"bibcode": id})).collect();
        IndexResponse::from_value(json!({"response": {"docs": docs}})).unwrap()
    }

    #[test]
    fn defaults_when_absent() {
        let page = PageRequest::from_params(&PageParams::default(), 100);
        assert_eq!(page, PageRequest::default());
    }

    #[test]
    fn rows_are_capped() {
        let page = PageRequest::from_params(&params("5", "500"), 100);
        assert_eq!(page.start, 5);
        assert_eq!(page.rows, 100);
    }

    #[test]
    fn any_invalid_value_resets_all_paging_fields() {
        for bad in [params("-1", "10"), params("3", "ten")] {
            let page = PageRequest::from_params(&bad, 100);
            assert_eq!((page.start, page.rows, page.raw), (0, 20, false));
        }

        let bad_raw = PageParams {
            start: Some("4".into()),
            raw: Some("maybe".into()),
            ..PageParams::default()
        };
        let page = PageRequest::from_params(&bad_raw, 100);
        assert_eq!((page.start, page.rows, page.raw), (0, 20, false));
    }

    #[test]
    fn raw_flag_is_parsed() {
        let raw = PageParams {
            raw: Some("True".into()),
            ..PageParams::default()
        };
        assert!(PageRequest::from_params(&raw, 100).raw);
    }

    #[test]
    fn multiplier_scales_row_cap() {
        assert_eq!(effective_max_rows(100, 2.5), 250);
        assert_eq!(effective_max_rows(100, 0.333), 33);
        assert_eq!(effective_max_rows(100, 0.0), 100);
        assert_eq!(effective_max_rows(100, f64::NAN), 100);
    }

    #[test]
    fn time_sorts_fetch_everything_from_index() {
        let page = PageRequest {
            start: 10,
            rows: 5,
            sort: SortOrder::parse(Some("time asc")),
            ..PageRequest::default()
        };
        let query = page.index_query(42);
        assert_eq!((query.start, query.rows), (0, 42));
        assert_eq!(query.sort, DEFAULT_SORT);

        let page = PageRequest {
            sort: SortOrder::parse(Some("citation_count desc")),
            ..page
        };
        let query = page.index_query(42);
        assert_eq!((query.start, query.rows), (10, 5));
        assert_eq!(query.sort, "citation_count desc");
    }

    #[test]
    fn index_query_always_requests_identifier_fields() {
        let query = PageRequest::default().index_query(3);
        assert_eq!(query.fl, "bibcode,alternate_bibcode");

        let titles = PageParams {
            fl: Some("title,abstract".into()),
            ..PageParams::default()
        };
        let query = PageRequest::from_params(&titles, 100).index_query(3);
        assert_eq!(query.fl, "title,abstract,bibcode,alternate_bibcode");
    }

    #[test]
    fn stored_order_is_lexicographic_without_time_sort() {
        let docs = documents();
        let page = PageRequest {
            start: 1,
            rows: 5,
            ..PageRequest::default()
        };
        assert_eq!(ResultPaginator::new(&docs, 0.0).paginate_stored(&page), vec!["B", "C"]);
    }

    #[test]
    fn stored_order_honours_time_sort() {
        let docs = documents();
        let page = PageRequest {
            sort: SortOrder::Added { descending: true },
            ..PageRequest::default()
        };
        assert_eq!(
            ResultPaginator::new(&docs, 0.0).paginate_stored(&page),
            vec!["B", "C", "A"]
        );
    }

    #[test]
    fn window_length_is_bounded() {
        let docs = documents();
        let paginator = ResultPaginator::new(&docs, 0.0);
        for start in 0..5 {
            for rows in 0..5 {
                let page = PageRequest {
                    start,
                    rows,
                    ..PageRequest::default()
                };
                let expected = rows.min(docs.len().saturating_sub(start));
                assert_eq!(paginator.paginate_stored(&page).len(), expected);
            }
        }
    }

    #[test]
    fn indexed_time_sort_reorders_and_windows_docs() {
        let docs = documents();
        let mut response = index_response(&["B", "A", "C"]);
        let page = PageRequest {
            start: 1,
            rows: 2,
            sort: SortOrder::Added { descending: false },
            ..PageRequest::default()
        };

        let ids = ResultPaginator::new(&docs, 0.0).paginate_indexed(&page, &mut response);
        assert_eq!(ids, vec!["C", "B"]);
        assert_eq!(response.raw()["response"]["docs"][0]["bibcode"], "C");
    }

    #[test]
    fn indexed_time_sort_keeps_index_order_for_equal_timestamps() {
        let docs: DocumentSet = [("A", 1.0), ("B", 2.0), ("C", 2.0), ("D", 3.0)]
            .into_iter()
            .map(|(id, ts)| (id.to_string(), DocumentEntry::at(ts)))
            .collect();

        for (descending, expected) in [
            (false, vec!["A", "C", "B", "D"]),
            (true, vec!["D", "C", "B", "A"]),
        ] {
            let mut response = index_response(&["C", "D", "B", "A"]);
            let page = PageRequest {
                sort: SortOrder::Added { descending },
                ..PageRequest::default()
            };
            let ids =
                ResultPaginator::new(&docs, 0.0).paginate_indexed(&page, &mut response);
            assert_eq!(ids, expected);
            assert_eq!(
                response.raw()["response"]["docs"][1]["bibcode"],
                expected[1]
            );
        }
    }

    #[test]
    fn indexed_time_desc_reorders_and_windows_docs() {
        let docs = documents();
        let mut response = index_response(&["A", "C", "B"]);
        let page = PageRequest {
            start: 0,
            rows: 2,
            sort: SortOrder::Added { descending: true },
            ..PageRequest::default()
        };

        let ids = ResultPaginator::new(&docs, 0.0).paginate_indexed(&page, &mut response);
        assert_eq!(ids, vec!["B", "C"]);
        assert_eq!(response.records().len(), 2);
    }

    #[test]
    fn indexed_time_sort_keeps_index_order_on_missing_timestamp() {
        let docs = documents();
        let mut response = index_response(&["B", "unknown", "A"]);
        let page = PageRequest {
            sort: SortOrder::Added { descending: true },
            ..PageRequest::default()
        };

        let ids = ResultPaginator::new(&docs, 0.0).paginate_indexed(&page, &mut response);
        assert_eq!(ids, vec!["B", "unknown", "A"]);
    }

    #[test]
    fn indexed_non_time_sort_uses_index_order() {
        let docs = documents();
        let mut response = index_response(&["C", "A"]);
        let page = PageRequest::default();
        let ids = ResultPaginator::new(&docs, 0.0).paginate_indexed(&page, &mut response);
        assert_eq!(ids, vec!["C", "A"]);
    }
}
