//! File and folder operations: listing, mutation, recycle bin, transfer.
//!
//! Each function validates its identifying parameters locally, builds one
//! request and hands it to the `ApiClient`.

use bytes::Bytes;
use serde_json::{json, Value};

use super::client::ApiClient;
use super::download::DownloadedFile;
use super::error::ApiError;
use super::pipeline::Payload;
use super::progress::UploadProgress;
use super::transport::{ApiRequest, MultipartForm};
use super::types::{ChunkCheck, FileEntry, FileList, Sort};

/// Name used for a batch download when the server does not send one.
pub const BATCH_DOWNLOAD_NAME: &str = "download.zip";

/// A file to be uploaded, already read into memory.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub file_name: String,
    pub mime: Option<String>,
    pub data: Bytes,
}

impl UploadSource {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadParams {
    pub file: UploadSource,
    pub parent_id: i64,
    /// Path relative to the upload root when uploading a folder tree.
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChunkParams {
    /// This chunk's bytes.
    pub chunk: UploadSource,
    pub parent_id: i64,
    /// Hash of the whole file, identifying the upload session.
    pub md5: String,
    pub chunk_index: u32,
    pub chunks: u32,
}

/// Extra filters accepted by GET /file/search.
#[derive(Debug, Clone, Default)]
pub struct FileSearchParams {
    pub category: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Sort,
}

fn require_ids(ids: &[i64]) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Err(ApiError::validation("fileIds must not be empty"));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }
    Ok(())
}

/// List a folder. GET /file/list?parentId&orderBy&orderDirection
pub async fn list_files(client: &ApiClient, parent_id: i64, sort: &Sort) -> Result<FileList, ApiError> {
    let req = ApiRequest::get("/file/list")
        .query("parentId", parent_id)
        .queries(sort.query());
    client.json(req).await
}

/// GET /file/detail/{id}
pub async fn file_detail(client: &ApiClient, id: i64) -> Result<FileEntry, ApiError> {
    client.json(ApiRequest::get(format!("/file/detail/{}", id))).await
}

/// Create a folder. POST /file/folder
///
/// Rejects without a request when `parent_id` is absent or `name` is blank.
pub async fn create_folder(
    client: &ApiClient,
    parent_id: Option<i64>,
    name: &str,
) -> Result<FileList, ApiError> {
    let parent_id = parent_id.ok_or_else(|| ApiError::validation("parentId must not be empty"))?;
    require_name(name)?;

    let req = ApiRequest::post("/file/folder").json(&json!({
        "parentId": parent_id,
        "name": name,
    }))?;
    client.json(req).await
}

/// PUT /file/rename/{id}
pub async fn rename_file(client: &ApiClient, id: i64, name: &str) -> Result<(), ApiError> {
    require_name(name)?;
    let req = ApiRequest::put(format!("/file/rename/{}", id)).json(&json!({ "name": name }))?;
    client.unit(req).await
}

/// PUT /file/move
pub async fn move_files(client: &ApiClient, ids: &[i64], target_id: i64) -> Result<(), ApiError> {
    require_ids(ids)?;
    let req = ApiRequest::put("/file/move").json(&json!({
        "fileIds": ids,
        "targetId": target_id,
    }))?;
    client.unit(req).await
}

/// POST /file/copy
pub async fn copy_files(client: &ApiClient, ids: &[i64], target_id: i64) -> Result<(), ApiError> {
    require_ids(ids)?;
    let req = ApiRequest::post("/file/copy").json(&json!({
        "fileIds": ids,
        "targetId": target_id,
    }))?;
    client.unit(req).await
}

/// Move entries to the recycle bin. POST /file/delete
pub async fn delete_files(client: &ApiClient, ids: &[i64]) -> Result<(), ApiError> {
    require_ids(ids)?;
    let req = ApiRequest::post("/file/delete").json(&json!({ "fileIds": ids }))?;
    client.unit(req).await
}

/// Delete entries permanently. DELETE /file/remove
pub async fn remove_files(client: &ApiClient, ids: &[i64]) -> Result<(), ApiError> {
    require_ids(ids)?;
    let req = ApiRequest::delete("/file/remove").json(&json!({ "fileIds": ids }))?;
    client.unit(req).await
}

/// Restore entries from the recycle bin. PUT /file/restore
pub async fn restore_files(client: &ApiClient, ids: &[i64]) -> Result<(), ApiError> {
    require_ids(ids)?;
    let req = ApiRequest::put("/file/restore").json(&json!({ "fileIds": ids }))?;
    client.unit(req).await
}

/// DELETE /file/clear-recycle
pub async fn clear_recycle_bin(client: &ApiClient) -> Result<(), ApiError> {
    client.unit(ApiRequest::delete("/file/clear-recycle")).await
}

/// GET /file/recycle
pub async fn recycle_bin(client: &ApiClient, sort: &Sort) -> Result<FileList, ApiError> {
    let req = ApiRequest::get("/file/recycle").queries(sort.query());
    client.json(req).await
}

/// Contents of a recycled folder. GET /file/recycle/folder/{id}
pub async fn recycle_bin_folder(
    client: &ApiClient,
    folder_id: i64,
    sort: &Sort,
) -> Result<FileList, ApiError> {
    let req = ApiRequest::get(format!("/file/recycle/folder/{}", folder_id)).queries(sort.query());
    client.json(req).await
}

/// GET /file/download/{id}
pub async fn download_file(client: &ApiClient, id: i64) -> Result<DownloadedFile, ApiError> {
    let resp = client.binary(ApiRequest::get(format!("/file/download/{}", id))).await?;
    Ok(DownloadedFile::from_response(resp, None))
}

/// Zip several entries server-side. POST /file/batch/download
pub async fn batch_download(client: &ApiClient, ids: &[i64]) -> Result<DownloadedFile, ApiError> {
    require_ids(ids)?;
    let req = ApiRequest::post("/file/batch/download").json(&json!({ "fileIds": ids }))?;
    let resp = client.binary(req).await?;
    Ok(DownloadedFile::from_response(resp, Some(BATCH_DOWNLOAD_NAME)))
}

/// GET /file/preview/{id}; the payload is whatever preview descriptor the server returns.
pub async fn preview_url(client: &ApiClient, id: i64) -> Result<Value, ApiError> {
    client.value(ApiRequest::get(format!("/file/preview/{}", id))).await
}

/// PUT /file/star/{id}
pub async fn toggle_star(client: &ApiClient, id: i64, star: bool) -> Result<(), ApiError> {
    let req = ApiRequest::put(format!("/file/star/{}", id)).json(&json!({ "star": star }))?;
    client.unit(req).await
}

/// GET /file/starred
pub async fn starred_files(client: &ApiClient, sort: &Sort) -> Result<FileList, ApiError> {
    let req = ApiRequest::get("/file/starred").queries(sort.query());
    client.json(req).await
}

/// Upload a whole file. POST /file/upload (multipart)
///
/// Progress arrives on the returned stream; the payload is the backend's
/// response for the new entry.
pub fn upload_file(client: &ApiClient, params: UploadParams) -> UploadProgress<Value> {
    if params.file.file_name.trim().is_empty() {
        return UploadProgress::ready(Err(ApiError::validation("file name must not be empty")));
    }

    let mut form = MultipartForm::new()
        .file(
            "file",
            &params.file.file_name,
            params.file.mime.as_deref(),
            params.file.data.clone(),
        )
        .text("parentId", params.parent_id);
    if let Some(ref relative_path) = params.relative_path {
        form = form.text("relativePath", relative_path);
    }

    log::debug!(
        "Uploading {} ({} bytes) into folder {}",
        params.file.file_name,
        params.file.data.len(),
        params.parent_id
    );

    let client = client.clone();
    let req = ApiRequest::post("/file/upload").multipart(form);
    UploadProgress::spawn(move |sink| async move {
        match client.execute(req, Some(sink)).await? {
            Payload::Json(value) => Ok(value),
            Payload::Binary(_) => {
                Err(ApiError::Decode("expected JSON, got binary".into()))
            }
        }
    })
}

/// Ask whether a file (by content hash) already exists or is partly uploaded.
/// POST /file/check-md5
pub async fn check_md5(
    client: &ApiClient,
    md5: &str,
    file_name: &str,
    file_size: u64,
) -> Result<ChunkCheck, ApiError> {
    if md5.trim().is_empty() {
        return Err(ApiError::validation("md5 must not be empty"));
    }
    let req = ApiRequest::post("/file/check-md5").json(&json!({
        "md5": md5,
        "fileName": file_name,
        "fileSize": file_size,
    }))?;
    client.json(req).await
}

/// Upload one chunk. POST /file/upload-chunk (multipart)
///
/// Chunks are independent; ordering, concurrency and retry are up to the caller.
pub async fn upload_chunk(client: &ApiClient, params: ChunkParams) -> Result<Value, ApiError> {
    if params.md5.trim().is_empty() {
        return Err(ApiError::validation("md5 must not be empty"));
    }
    if params.chunk_index >= params.chunks {
        return Err(ApiError::validation("chunkIndex must be below chunks"));
    }

    let form = MultipartForm::new()
        .file(
            "file",
            &params.chunk.file_name,
            params.chunk.mime.as_deref(),
            params.chunk.data,
        )
        .text("parentId", params.parent_id)
        .text("md5", &params.md5)
        .text("chunkIndex", params.chunk_index)
        .text("chunks", params.chunks);
    client
        .value(ApiRequest::post("/file/upload-chunk").multipart(form))
        .await
}

/// Ask the backend to reassemble uploaded chunks. POST /file/merge-chunks
pub async fn merge_chunks(
    client: &ApiClient,
    md5: &str,
    file_name: &str,
    parent_id: i64,
    chunks: u32,
) -> Result<Value, ApiError> {
    if md5.trim().is_empty() {
        return Err(ApiError::validation("md5 must not be empty"));
    }
    require_name(file_name)?;
    let req = ApiRequest::post("/file/merge-chunks").json(&json!({
        "md5": md5,
        "fileName": file_name,
        "parentId": parent_id,
        "chunks": chunks,
    }))?;
    client.value(req).await
}

/// GET /file/search?keyword&...
pub async fn search_files(
    client: &ApiClient,
    keyword: &str,
    params: &FileSearchParams,
) -> Result<FileList, ApiError> {
    let req = ApiRequest::get("/file/search")
        .query("keyword", keyword)
        .query_opt("type", params.category.as_deref())
        .query_opt("page", params.page)
        .query_opt("size", params.size)
        .queries(params.sort.query());
    client.json(req).await
}
