//! Share links: creating and managing your own, and visiting someone else's.

use serde_json::{json, Value};

use super::client::ApiClient;
use super::download::DownloadedFile;
use super::error::ApiError;
use super::transport::ApiRequest;
use super::types::{CreateShareRequest, ShareFileList, ShareList, ShareRecord, Sort};

/// Paging and ordering for GET /share/my.
#[derive(Debug, Clone, Default)]
pub struct MySharesParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Sort,
}

/// `{prefix}/{share_id}` with the id percent-encoded as a single segment.
fn share_path(prefix: &str, share_id: &str) -> Result<String, ApiError> {
    if share_id.trim().is_empty() {
        return Err(ApiError::validation("shareId must not be empty"));
    }
    Ok(format!("{}/{}", prefix, urlencoding::encode(share_id)))
}

/// POST /share/create
pub async fn create_share(client: &ApiClient, params: &CreateShareRequest) -> Result<ShareRecord, ApiError> {
    let req = ApiRequest::post("/share/create").json(params)?;
    client.json(req).await
}

/// GET /share/info/{id}?code
pub async fn share_info(client: &ApiClient, share_id: &str, code: Option<&str>) -> Result<ShareRecord, ApiError> {
    let req = ApiRequest::get(share_path("/share/info", share_id)?)
        .query_opt("code", code.filter(|c| !c.is_empty()));
    client.json(req).await
}

/// Check an extraction code. POST /share/verify/{id}
pub async fn verify_share_code(client: &ApiClient, share_id: &str, code: &str) -> Result<Value, ApiError> {
    let req = ApiRequest::post(share_path("/share/verify", share_id)?).json(&json!({ "code": code }))?;
    client.value(req).await
}

/// GET /share/list/{id}?parentId; `parent_id` defaults to the share root.
pub async fn share_file_list(
    client: &ApiClient,
    share_id: &str,
    parent_id: Option<i64>,
) -> Result<ShareFileList, ApiError> {
    let req = ApiRequest::get(share_path("/share/list", share_id)?).query("parentId", parent_id.unwrap_or(0));
    client.json(req).await
}

/// GET /share/my
pub async fn my_shares(client: &ApiClient, params: &MySharesParams) -> Result<ShareList, ApiError> {
    let req = ApiRequest::get("/share/my")
        .query_opt("page", params.page)
        .query_opt("size", params.size)
        .queries(params.sort.query());
    client.json(req).await
}

/// DELETE /share/cancel/{id}
pub async fn cancel_share(client: &ApiClient, share_id: &str) -> Result<(), ApiError> {
    client.unit(ApiRequest::delete(share_path("/share/cancel", share_id)?)).await
}

/// DELETE /share/batch/cancel
pub async fn batch_cancel_shares(client: &ApiClient, share_ids: &[String]) -> Result<(), ApiError> {
    if share_ids.is_empty() {
        return Err(ApiError::validation("shareIds must not be empty"));
    }
    let req = ApiRequest::delete("/share/batch/cancel").json(&json!({ "shareIds": share_ids }))?;
    client.unit(req).await
}

/// Copy shared entries into your own drive. POST /share/save/{id}
///
/// `target_id` defaults to the root folder.
pub async fn save_share_files(
    client: &ApiClient,
    share_id: &str,
    file_ids: &[i64],
    target_id: Option<i64>,
) -> Result<(), ApiError> {
    let path = share_path("/share/save", share_id)?;
    if file_ids.is_empty() {
        return Err(ApiError::validation("fileIds must not be empty"));
    }
    let req = ApiRequest::post(path).json(&json!({
        "fileIds": file_ids,
        "targetId": target_id.unwrap_or(0),
    }))?;
    client.unit(req).await
}

/// PUT /share/views/{id}
pub async fn increase_views(client: &ApiClient, share_id: &str) -> Result<(), ApiError> {
    client.unit(ApiRequest::put(share_path("/share/views", share_id)?)).await
}

/// PUT /share/downloads/{id}
pub async fn increase_downloads(client: &ApiClient, share_id: &str) -> Result<(), ApiError> {
    client.unit(ApiRequest::put(share_path("/share/downloads", share_id)?)).await
}

/// GET /share/download/{shareId}/{userFileId}
pub async fn download_file(
    client: &ApiClient,
    share_id: &str,
    user_file_id: i64,
) -> Result<DownloadedFile, ApiError> {
    let path = format!("{}/{}", share_path("/share/download", share_id)?, user_file_id);
    log::debug!("Downloading {} from share {}", user_file_id, share_id);
    let resp = client.binary(ApiRequest::get(path)).await?;
    Ok(DownloadedFile::from_response(resp, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{envelope, harness, Reply};
    use crate::api::types::{ShareExpiry, ShareStatus};
    use reqwest::Method;

    #[tokio::test]
    async fn test_create_share_body() {
        let h = harness(vec![Reply::json(envelope(json!({
            "id": "abc", "shareCode": "abc", "extractionCode": "x1y2", "status": 0
        })))]);

        let share = create_share(
            &h.client,
            &CreateShareRequest {
                user_file_id: 12,
                expire_type: Some(ShareExpiry::OneDay),
                has_extraction: true,
                extraction_code: None,
                description: Some("holiday".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(share.id, "abc");
        assert_eq!(share.status, ShareStatus::Normal);

        let sent = h.transport.requests();
        assert_eq!(sent[0].path, "/share/create");
        assert_eq!(
            sent[0].json_body().unwrap(),
            &json!({
                "userFileId": 12, "expireType": 1, "hasExtraction": true,
                "extractionCode": null, "description": "holiday"
            })
        );
    }

    #[tokio::test]
    async fn test_share_info_code_is_optional() {
        let h = harness(vec![Reply::json(envelope(json!({"id": "s1"}))); 2]);

        share_info(&h.client, "s1", None).await.unwrap();
        share_info(&h.client, "s1", Some("1234")).await.unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent[0].path, "/share/info/s1");
        assert!(sent[0].query.is_empty());
        assert_eq!(sent[1].query_value("code"), Some("1234"));
    }

    #[tokio::test]
    async fn test_defaults_to_root_folder() {
        let h = harness(vec![
            Reply::json(envelope(json!({"list": []}))),
            Reply::json(envelope(Value::Null)),
        ]);

        share_file_list(&h.client, "s1", None).await.unwrap();
        save_share_files(&h.client, "s1", &[3, 4], None).await.unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent[0].query_value("parentId"), Some("0"));
        assert_eq!(sent[1].method, Method::POST);
        assert_eq!(sent[1].json_body().unwrap(), &json!({"fileIds": [3, 4], "targetId": 0}));
    }

    #[tokio::test]
    async fn test_counters_and_cancel() {
        let h = harness(vec![Reply::json(envelope(Value::Null)); 4]);

        increase_views(&h.client, "s1").await.unwrap();
        increase_downloads(&h.client, "s1").await.unwrap();
        cancel_share(&h.client, "s1").await.unwrap();
        batch_cancel_shares(&h.client, &["s1".to_string(), "s2".to_string()]).await.unwrap();

        let sent = h.transport.requests();
        assert_eq!((sent[0].method.clone(), sent[0].path.as_str()), (Method::PUT, "/share/views/s1"));
        assert_eq!((sent[1].method.clone(), sent[1].path.as_str()), (Method::PUT, "/share/downloads/s1"));
        assert_eq!((sent[2].method.clone(), sent[2].path.as_str()), (Method::DELETE, "/share/cancel/s1"));
        assert_eq!(sent[3].json_body().unwrap(), &json!({"shareIds": ["s1", "s2"]}));
    }

    #[tokio::test]
    async fn test_blank_share_id_rejected() {
        let h = harness(vec![]);
        assert!(matches!(cancel_share(&h.client, " ").await, Err(ApiError::Validation(_))));
        assert!(matches!(batch_cancel_shares(&h.client, &[]).await, Err(ApiError::Validation(_))));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_share_id_is_one_path_segment() {
        let h = harness(vec![Reply::json(envelope(json!({"id": "a/b?c"}))), Reply::raw(200, &[], b"")]);

        share_info(&h.client, "a/b?c", Some("x")).await.unwrap();
        download_file(&h.client, "a#b", 8).await.unwrap();

        let sent = h.transport.requests();
        assert_eq!(sent[0].path, "/share/info/a%2Fb%3Fc");
        assert_eq!(sent[0].query_value("code"), Some("x"));
        assert_eq!(sent[1].path, "/share/download/a%23b/8");
    }

    #[tokio::test]
    async fn test_share_download_carries_token_and_name() {
        let h = harness(vec![Reply::raw(
            200,
            &[("content-disposition", "attachment; filename=notes.txt")],
            b"hi",
        )]);
        h.client.session().set_token("tok").unwrap();

        let file = download_file(&h.client, "s1", 8).await.unwrap();
        assert_eq!(file.file_name.as_deref(), Some("notes.txt"));

        let sent = h.transport.requests();
        assert_eq!(sent[0].path, "/share/download/s1/8");
        assert_eq!(sent[0].headers.get("authorization").unwrap(), "Bearer tok");
    }
}
