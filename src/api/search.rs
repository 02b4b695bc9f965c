//! File search variants over GET /file/search, plus local search history.
//!
//! History never touches the network: it is a JSON array kept in the
//! session's store, most recent first.

use crate::session::store::StoreError;
use crate::session::{write_json, Session};

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::ApiRequest;
use super::types::{FileList, Sort};

pub const SEARCH_HISTORY_KEY: &str = "searchHistory";
pub const SEARCH_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub keyword: String,
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// File category filter, sent as `type`.
    pub category: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub sort: Sort,
}

impl SearchParams {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = vec![("keyword".to_string(), self.keyword.clone())];
        let mut push = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                query.push((key.to_string(), v));
            }
        };
        push("page", self.page.map(|p| p.to_string()));
        push("size", self.size.map(|s| s.to_string()));
        push("type", self.category.clone());
        push("timeRange[start]", self.time_start.clone());
        push("timeRange[end]", self.time_end.clone());
        query.extend(self.sort.query());
        query
    }
}

/// Extra filters for `advanced_search`.
#[derive(Debug, Clone, Default)]
pub struct AdvancedFilters {
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub tags: Vec<String>,
    pub owner: Option<String>,
}

fn search_request(params: &SearchParams) -> ApiRequest {
    ApiRequest::get("/file/search").queries(params.query())
}

/// Match on file names.
pub async fn basic_search(client: &ApiClient, params: &SearchParams) -> Result<FileList, ApiError> {
    client.json(search_request(params)).await
}

/// Match on document contents as well as names.
pub async fn full_text_search(client: &ApiClient, params: &SearchParams) -> Result<FileList, ApiError> {
    client
        .json(search_request(params).query("searchContent", true))
        .await
}

pub async fn image_search(client: &ApiClient, params: &SearchParams) -> Result<FileList, ApiError> {
    client
        .json(search_request(params).query("searchType", "image"))
        .await
}

pub async fn advanced_search(
    client: &ApiClient,
    params: &SearchParams,
    filters: &AdvancedFilters,
) -> Result<FileList, ApiError> {
    let mut req = search_request(params)
        .query_opt("sizeRange[min]", filters.min_size)
        .query_opt("sizeRange[max]", filters.max_size)
        .query_opt("owner", filters.owner.as_deref());
    for tag in &filters.tags {
        req = req.query("tags[]", tag);
    }
    client.json(req).await
}

/// Autocomplete candidates for a partial keyword. GET /file/search/suggestions
pub async fn search_suggestions(client: &ApiClient, keyword: &str) -> Result<Vec<String>, ApiError> {
    if keyword.trim().is_empty() {
        return Ok(Vec::new());
    }
    client
        .json(ApiRequest::get("/file/search/suggestions").query("keyword", keyword))
        .await
}

/// Stored history, most recent first. Missing or unreadable history is empty.
pub fn search_history(session: &Session) -> Result<Vec<String>, StoreError> {
    let raw = match session.store().get(SEARCH_HISTORY_KEY)? {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };
    match serde_json::from_str(&raw) {
        Ok(history) => Ok(history),
        Err(e) => {
            log::warn!("Discarding unreadable search history: {}", e);
            Ok(Vec::new())
        }
    }
}

/// Record `keyword` at the front of the history.
///
/// An earlier occurrence is removed first and the list is capped at
/// `SEARCH_HISTORY_LIMIT`. Blank keywords are ignored.
pub fn save_search_history(session: &Session, keyword: &str) -> Result<(), StoreError> {
    if keyword.trim().is_empty() {
        return Ok(());
    }
    let mut history = search_history(session)?;
    history.retain(|k| k != keyword);
    history.insert(0, keyword.to_string());
    history.truncate(SEARCH_HISTORY_LIMIT);
    write_json(session.store().as_ref(), SEARCH_HISTORY_KEY, &history)
}

pub fn clear_search_history(session: &Session) -> Result<(), StoreError> {
    session.store().remove(SEARCH_HISTORY_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{envelope, harness, Reply};
    use serde_json::json;

    #[test]
    fn test_history_dedup_most_recent_first() {
        let session = Session::in_memory();
        for keyword in ["a", "b", "a", "c"] {
            save_search_history(&session, keyword).unwrap();
        }
        assert_eq!(search_history(&session).unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_history_is_capped() {
        let session = Session::in_memory();
        for i in 0..25 {
            save_search_history(&session, &format!("k{}", i)).unwrap();
        }
        let history = search_history(&session).unwrap();
        assert_eq!(history.len(), SEARCH_HISTORY_LIMIT);
        assert_eq!(history[0], "k24");
        assert_eq!(history[9], "k15");
    }

    #[test]
    fn test_blank_keyword_ignored_and_clear() {
        let session = Session::in_memory();
        save_search_history(&session, "  ").unwrap();
        assert!(search_history(&session).unwrap().is_empty());

        save_search_history(&session, "report").unwrap();
        clear_search_history(&session).unwrap();
        assert!(search_history(&session).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_history_reads_empty() {
        let session = Session::in_memory();
        session.store().set(SEARCH_HISTORY_KEY, "{not json").unwrap();
        assert!(search_history(&session).unwrap().is_empty());
        save_search_history(&session, "x").unwrap();
        assert_eq!(search_history(&session).unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_search_variants_add_flags() {
        let h = harness(vec![Reply::json(envelope(json!({"list": [], "total": 0}))); 4]);
        let params = SearchParams {
            category: Some("image".into()),
            page: Some(2),
            ..SearchParams::keyword("cat")
        };

        basic_search(&h.client, &params).await.unwrap();
        full_text_search(&h.client, &params).await.unwrap();
        image_search(&h.client, &params).await.unwrap();
        advanced_search(
            &h.client,
            &params,
            &AdvancedFilters {
                min_size: Some(10),
                tags: vec!["pets".into(), "2024".into()],
                ..AdvancedFilters::default()
            },
        )
        .await
        .unwrap();

        let sent = h.transport.requests();
        assert!(sent.iter().all(|r| r.path == "/file/search"));
        assert_eq!(sent[0].query_value("keyword"), Some("cat"));
        assert_eq!(sent[0].query_value("type"), Some("image"));
        assert_eq!(sent[0].query_value("page"), Some("2"));
        assert_eq!(sent[0].query_value("searchContent"), None);
        assert_eq!(sent[1].query_value("searchContent"), Some("true"));
        assert_eq!(sent[2].query_value("searchType"), Some("image"));
        assert_eq!(sent[3].query_value("sizeRange[min]"), Some("10"));
        let tags: Vec<&str> = sent[3]
            .query
            .iter()
            .filter(|(k, _)| k == "tags[]")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(tags, ["pets", "2024"]);
    }

    #[tokio::test]
    async fn test_suggestions() {
        let h = harness(vec![Reply::json(envelope(json!(["report", "report-2024"])))]);
        assert!(search_suggestions(&h.client, "").await.unwrap().is_empty());
        assert_eq!(
            search_suggestions(&h.client, "rep").await.unwrap(),
            vec!["report", "report-2024"]
        );
        assert_eq!(h.transport.requests().len(), 1);
    }
}
