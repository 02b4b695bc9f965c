//! Request and response types for the cloud-drive backend API.
//!
//! All structs use camelCase serialization to match the API's JSON format.
//! Response types are lenient: the backend omits fields or sends them as
//! `null` freely, and both read as the default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A backend timestamp: epoch milliseconds or a preformatted string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Millis(ms) => write!(f, "{}", ms),
            Timestamp::Text(s) => f.write_str(s),
        }
    }
}

/// Logical file category assigned by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Folder,
    Image,
    Video,
    Audio,
    Document,
    Pdf,
    Archive,
    Executable,
    Code,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "FileEntryWire")]
pub struct FileEntry {
    pub id: i64,
    pub file_name: String,
    pub file_size: i64,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub file_type: FileCategory,
    pub file_path: Option<String>,
    pub is_dir: bool,
    pub parent_id: Option<i64>,
    pub user_id: Option<i64>,
    pub create_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
    /// Set on recycle-bin entries.
    pub delete_time: Option<Timestamp>,
    pub thumbnail: Option<String>,
    pub md5: Option<String>,
    /// 0 normal, 1 recycled, 2 deleted.
    pub status: Option<i32>,
    pub is_starred: bool,
    pub is_shared: bool,
    pub is_recycled: bool,
    pub download_count: u64,
    pub view_count: u64,
    pub last_view_time: Option<Timestamp>,
    pub extension: Option<String>,
}

/// File entry as it arrives. Listing endpoints use `fileName`/`fileSize`/`filePath`,
/// search and share views sometimes `name`/`size`/`path`, and some send both.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FileEntryWire {
    #[serde(deserialize_with = "null_default")]
    id: i64,
    file_name: Option<String>,
    name: Option<String>,
    file_size: Option<i64>,
    size: Option<i64>,
    #[serde(rename = "type")]
    mime_type: Option<String>,
    #[serde(deserialize_with = "null_default")]
    file_type: FileCategory,
    file_path: Option<String>,
    path: Option<String>,
    #[serde(deserialize_with = "null_default")]
    is_dir: bool,
    parent_id: Option<i64>,
    user_id: Option<i64>,
    create_time: Option<Timestamp>,
    update_time: Option<Timestamp>,
    delete_time: Option<Timestamp>,
    thumbnail: Option<String>,
    md5: Option<String>,
    status: Option<i32>,
    #[serde(deserialize_with = "null_default")]
    is_starred: bool,
    #[serde(deserialize_with = "null_default")]
    is_shared: bool,
    is_recycled: Option<bool>,
    is_deleted: Option<bool>,
    #[serde(deserialize_with = "null_default")]
    download_count: u64,
    #[serde(deserialize_with = "null_default")]
    view_count: u64,
    last_view_time: Option<Timestamp>,
    extension: Option<String>,
}

impl From<FileEntryWire> for FileEntry {
    fn from(wire: FileEntryWire) -> Self {
        Self {
            id: wire.id,
            file_name: wire.file_name.or(wire.name).unwrap_or_default(),
            file_size: wire.file_size.or(wire.size).unwrap_or_default(),
            mime_type: wire.mime_type,
            file_type: wire.file_type,
            file_path: wire.file_path.or(wire.path),
            is_dir: wire.is_dir,
            parent_id: wire.parent_id,
            user_id: wire.user_id,
            create_time: wire.create_time,
            update_time: wire.update_time,
            delete_time: wire.delete_time,
            thumbnail: wire.thumbnail,
            md5: wire.md5,
            status: wire.status,
            is_starred: wire.is_starred,
            is_shared: wire.is_shared,
            is_recycled: wire.is_recycled.or(wire.is_deleted).unwrap_or_default(),
            download_count: wire.download_count,
            view_count: wire.view_count,
            last_view_time: wire.last_view_time,
            extension: wire.extension,
        }
    }
}

impl FileEntry {
    /// Size in bytes; meaningless (and so `None`) for directories.
    pub fn display_size(&self) -> Option<i64> {
        (!self.is_dir).then_some(self.file_size)
    }

    pub fn extension(&self) -> Option<&str> {
        if self.is_dir {
            return None;
        }
        self.extension
            .as_deref()
            .or_else(|| self.file_name.rsplit_once('.').map(|(_, ext)| ext))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breadcrumb {
    #[serde(deserialize_with = "null_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
}

/// Result of any folder listing: entries plus the breadcrumb trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileList {
    #[serde(deserialize_with = "null_default")]
    pub list: Vec<FileEntry>,
    #[serde(deserialize_with = "null_default")]
    pub path: Vec<Breadcrumb>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Optional ordering for listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    pub order_by: Option<String>,
    pub direction: Option<SortDirection>,
}

impl Sort {
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            order_by: Some(field.into()),
            direction: Some(direction),
        }
    }

    pub(crate) fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(ref field) = self.order_by {
            query.push(("orderBy".to_string(), field.clone()));
        }
        if let Some(direction) = self.direction {
            let value = match direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            query.push(("orderDirection".to_string(), value.to_string()));
        }
        query
    }
}

/// Response from POST /file/check-md5.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkCheck {
    /// The file already exists server-side (instant upload).
    #[serde(deserialize_with = "null_default")]
    pub is_exists: bool,
    #[serde(deserialize_with = "null_default")]
    pub uploaded_chunks: Vec<u32>,
    pub file_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ShareStatus {
    #[default]
    Normal,
    Canceled,
    Expired,
}

impl From<i32> for ShareStatus {
    fn from(value: i32) -> Self {
        match value {
            1 => ShareStatus::Canceled,
            2 => ShareStatus::Expired,
            _ => ShareStatus::Normal,
        }
    }
}

impl From<ShareStatus> for i32 {
    fn from(status: ShareStatus) -> Self {
        match status {
            ShareStatus::Normal => 0,
            ShareStatus::Canceled => 1,
            ShareStatus::Expired => 2,
        }
    }
}

impl ShareStatus {
    pub fn label(&self) -> &str {
        match self {
            ShareStatus::Normal => "normal",
            ShareStatus::Canceled => "canceled",
            ShareStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ShareRecordWire")]
pub struct ShareRecord {
    pub id: String,
    pub user_file_id: Option<i64>,
    pub file_id: Option<i64>,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub is_dir: bool,
    pub share_code: Option<String>,
    pub need_extraction: bool,
    pub extraction_code: Option<String>,
    /// `None` means the share never expires.
    pub expire_time: Option<Timestamp>,
    pub view_count: u64,
    pub download_count: u64,
    pub status: ShareStatus,
    pub description: Option<String>,
    pub url: Option<String>,
    pub create_time: Option<Timestamp>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ShareRecordWire {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    user_file_id: Option<i64>,
    file_id: Option<i64>,
    user_id: Option<i64>,
    username: Option<String>,
    file_name: Option<String>,
    file_type: Option<String>,
    file_size: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    is_dir: bool,
    share_code: Option<String>,
    #[serde(deserialize_with = "null_default")]
    need_extraction: bool,
    extraction_code: Option<String>,
    code: Option<String>,
    expire_time: Option<Timestamp>,
    view_count: Option<u64>,
    views: Option<u64>,
    download_count: Option<u64>,
    downloads: Option<u64>,
    #[serde(deserialize_with = "null_default")]
    status: ShareStatus,
    description: Option<String>,
    url: Option<String>,
    create_time: Option<Timestamp>,
}

impl From<ShareRecordWire> for ShareRecord {
    fn from(wire: ShareRecordWire) -> Self {
        Self {
            id: wire.id,
            user_file_id: wire.user_file_id,
            file_id: wire.file_id,
            user_id: wire.user_id,
            username: wire.username,
            file_name: wire.file_name,
            file_type: wire.file_type,
            file_size: wire.file_size,
            is_dir: wire.is_dir,
            share_code: wire.share_code,
            need_extraction: wire.need_extraction,
            extraction_code: wire.extraction_code.or(wire.code),
            expire_time: wire.expire_time,
            view_count: wire.view_count.or(wire.views).unwrap_or_default(),
            download_count: wire.download_count.or(wire.downloads).unwrap_or_default(),
            status: wire.status,
            description: wire.description,
            url: wire.url,
            create_time: wire.create_time,
        }
    }
}

impl ShareRecord {
    pub fn is_permanent(&self) -> bool {
        self.expire_time.is_none()
    }
}

/// Share lifetime accepted by POST /share/create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u32")]
pub enum ShareExpiry {
    Permanent,
    OneDay,
    SevenDays,
    ThirtyDays,
}

impl From<ShareExpiry> for u32 {
    fn from(expiry: ShareExpiry) -> Self {
        match expiry {
            ShareExpiry::Permanent => 0,
            ShareExpiry::OneDay => 1,
            ShareExpiry::SevenDays => 7,
            ShareExpiry::ThirtyDays => 30,
        }
    }
}

impl ShareExpiry {
    /// Parse a day count as used on the command line (0 = permanent).
    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            0 => Some(ShareExpiry::Permanent),
            1 => Some(ShareExpiry::OneDay),
            7 => Some(ShareExpiry::SevenDays),
            30 => Some(ShareExpiry::ThirtyDays),
            _ => None,
        }
    }
}

/// Request body for POST /share/create.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub user_file_id: i64,
    pub expire_type: Option<ShareExpiry>,
    pub has_extraction: bool,
    /// `None` lets the backend generate one when `has_extraction` is set.
    pub extraction_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Listing of a shared folder, as seen by a visitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareFileList {
    #[serde(deserialize_with = "null_default")]
    pub list: Vec<FileEntry>,
    #[serde(deserialize_with = "null_default")]
    pub path: Vec<Breadcrumb>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareList {
    #[serde(deserialize_with = "null_default")]
    pub list: Vec<ShareRecord>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UserInfoWire")]
pub struct UserInfo {
    pub id: Option<i64>,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub total_space: Option<i64>,
    pub used_space: Option<i64>,
    pub created_time: Option<Timestamp>,
    pub last_login_time: Option<Timestamp>,
}

/// The user endpoints report quota as `storageSize`/`usedSize`; the cached
/// copy is written back as `totalSpace`/`usedSpace`.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserInfoWire {
    id: Option<i64>,
    #[serde(deserialize_with = "null_default")]
    username: String,
    email: Option<String>,
    phone: Option<String>,
    nickname: Option<String>,
    avatar: Option<String>,
    total_space: Option<i64>,
    storage_size: Option<i64>,
    used_space: Option<i64>,
    used_size: Option<i64>,
    created_time: Option<Timestamp>,
    create_time: Option<Timestamp>,
    last_login_time: Option<Timestamp>,
}

impl From<UserInfoWire> for UserInfo {
    fn from(wire: UserInfoWire) -> Self {
        Self {
            id: wire.id,
            username: wire.username,
            email: wire.email,
            phone: wire.phone,
            nickname: wire.nickname,
            avatar: wire.avatar,
            total_space: wire.total_space.or(wire.storage_size),
            used_space: wire.used_space.or(wire.used_size),
            created_time: wire.created_time.or(wire.create_time),
            last_login_time: wire.last_login_time,
        }
    }
}

/// Storage-usage summary from GET /user/storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageUsage {
    #[serde(deserialize_with = "null_default")]
    pub total_space: i64,
    #[serde(deserialize_with = "null_default")]
    pub used_space: i64,
    #[serde(deserialize_with = "null_default")]
    pub available_space: i64,
    #[serde(deserialize_with = "null_default")]
    pub usage_percent: f64,
    #[serde(deserialize_with = "null_default")]
    pub type_distribution: BTreeMap<String, i64>,
}

/// Login request body sent to POST /auth/login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me: Option<bool>,
}

/// Login response from POST /auth/login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Verification code from POST /auth/send-code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Partial profile update for PUT /user/info.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeChannel {
    Email,
    Phone,
}

/// Read an explicit `null` as the type's default, like a missing key.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accept ids the backend sends as either JSON numbers or strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
        Raw::Null(()) => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_entry_accepts_both_field_spellings() {
        let entry: FileEntry = serde_json::from_value(json!({
            "id": 7,
            "name": "notes.txt",
            "size": 42,
            "type": "text/plain",
            "fileType": "document",
            "isDir": false,
            "parentId": 0,
            "createTime": 1700000000000i64,
            "updateTime": "2024-01-01 10:00:00"
        }))
        .unwrap();

        assert_eq!(entry.file_name, "notes.txt");
        assert_eq!(entry.file_size, 42);
        assert_eq!(entry.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(entry.file_type, FileCategory::Document);
        assert_eq!(entry.create_time, Some(Timestamp::Millis(1700000000000)));
        assert_eq!(
            entry.update_time,
            Some(Timestamp::Text("2024-01-01 10:00:00".into()))
        );
        assert_eq!(entry.extension(), Some("txt"));
    }

    #[test]
    fn test_directory_size_is_not_meaningful() {
        let entry: FileEntry = serde_json::from_value(json!({
            "id": 1, "fileName": "photos", "fileSize": 4096, "isDir": true,
            "fileType": "folder"
        }))
        .unwrap();
        assert_eq!(entry.display_size(), None);
        assert_eq!(entry.extension(), None);
    }

    #[test]
    fn test_unknown_category_falls_back_to_other() {
        let entry: FileEntry =
            serde_json::from_value(json!({"id": 2, "fileType": "spreadsheet"})).unwrap();
        assert_eq!(entry.file_type, FileCategory::Other);
    }

    #[test]
    fn test_share_record_numeric_id_and_status() {
        let share: ShareRecord = serde_json::from_value(json!({
            "id": 123,
            "userFileId": 9,
            "status": 2,
            "views": 5,
            "expireTime": null
        }))
        .unwrap();
        assert_eq!(share.id, "123");
        assert_eq!(share.status, ShareStatus::Expired);
        assert_eq!(share.view_count, 5);
        assert!(share.is_permanent());
    }

    #[test]
    fn test_create_share_request_serialization() {
        let req = CreateShareRequest {
            user_file_id: 9,
            expire_type: Some(ShareExpiry::SevenDays),
            has_extraction: true,
            extraction_code: None,
            description: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "userFileId": 9,
                "expireType": 7,
                "hasExtraction": true,
                "extractionCode": null
            })
        );
    }

    #[test]
    fn test_sort_query() {
        assert!(Sort::default().query().is_empty());
        assert_eq!(
            Sort::by("updateTime", SortDirection::Desc).query(),
            vec![
                ("orderBy".to_string(), "updateTime".to_string()),
                ("orderDirection".to_string(), "desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_user_info_backend_aliases() {
        let info: UserInfo = serde_json::from_value(json!({
            "id": 1, "username": "alice", "storageSize": 100, "usedSize": 40
        }))
        .unwrap();
        assert_eq!(info.total_space, Some(100));
        assert_eq!(info.used_space, Some(40));
    }

    #[test]
    fn test_user_info_cached_copy_reads_back() {
        let info = UserInfo {
            id: Some(3),
            username: "bob".into(),
            total_space: Some(10),
            created_time: Some(Timestamp::Millis(5)),
            ..Default::default()
        };
        let cached = serde_json::to_value(&info).unwrap();
        assert_eq!(cached["totalSpace"], 10);
        assert_eq!(serde_json::from_value::<UserInfo>(cached).unwrap(), info);
    }

    #[test]
    fn test_user_info_null_username() {
        let info: UserInfo =
            serde_json::from_value(json!({"id": 1, "username": null, "email": null})).unwrap();
        assert_eq!(info.username, "");
        assert_eq!(info.email, None);
    }

    #[test]
    fn test_file_entry_nulls_read_as_defaults() {
        let entry: FileEntry = serde_json::from_value(json!({
            "id": 4,
            "fileName": "docs",
            "isDir": true,
            "parentId": 0,
            "fileSize": null,
            "fileType": null,
            "isStarred": null,
            "downloadCount": null
        }))
        .unwrap();
        assert_eq!(entry.file_name, "docs");
        assert!(entry.is_dir);
        assert_eq!(entry.file_size, 0);
        assert_eq!(entry.file_type, FileCategory::Other);
        assert!(!entry.is_starred);
        assert_eq!(entry.download_count, 0);
    }

    #[test]
    fn test_file_entry_from_listing_row() {
        // Row as serialized by the file listing: every column present, extra
        // computed keys, unset boxed fields as null.
        let entry: FileEntry = serde_json::from_value(json!({
            "id": 31,
            "userId": 2,
            "fileId": 88,
            "fileName": "report.pdf",
            "fileSize": 20480,
            "fileType": "pdf",
            "parentId": 0,
            "isDir": false,
            "delFlag": 1,
            "isStarred": null,
            "deleteTime": 1700000500000i64,
            "downloadCount": 3,
            "createTime": 1700000000000i64,
            "updateTime": null,
            "isDeleted": true,
            "filePath": "/"
        }))
        .unwrap();
        assert_eq!(entry.id, 31);
        assert_eq!(entry.user_id, Some(2));
        assert_eq!(entry.file_type, FileCategory::Pdf);
        assert_eq!(entry.display_size(), Some(20480));
        assert!(entry.is_recycled);
        assert_eq!(entry.delete_time, Some(Timestamp::Millis(1700000500000)));
        assert_eq!(entry.update_time, None);
        assert_eq!(entry.file_path.as_deref(), Some("/"));
        assert_eq!(entry.download_count, 3);
    }

    #[test]
    fn test_file_entry_both_spellings_prefer_canonical() {
        let entry: FileEntry = serde_json::from_value(json!({
            "id": 5,
            "fileName": "a.txt",
            "name": "ignored.txt",
            "fileSize": 12,
            "size": 99,
            "filePath": "/a.txt",
            "path": "/other"
        }))
        .unwrap();
        assert_eq!(entry.file_name, "a.txt");
        assert_eq!(entry.file_size, 12);
        assert_eq!(entry.file_path.as_deref(), Some("/a.txt"));
    }

    #[test]
    fn test_file_list_with_null_page() {
        let list: FileList =
            serde_json::from_value(json!({"list": null, "path": null, "total": null})).unwrap();
        assert!(list.list.is_empty());
        assert!(list.path.is_empty());
        assert_eq!(list.total, None);
    }

    #[test]
    fn test_share_record_nulls_read_as_defaults() {
        let share: ShareRecord = serde_json::from_value(json!({
            "id": 1,
            "needExtraction": null,
            "viewCount": null,
            "status": null,
            "isDir": null
        }))
        .unwrap();
        assert_eq!(share.id, "1");
        assert!(!share.need_extraction);
        assert_eq!(share.view_count, 0);
        assert_eq!(share.status, ShareStatus::Normal);
        assert!(!share.is_dir);
    }

    #[test]
    fn test_share_record_from_share_view() {
        let share: ShareRecord = serde_json::from_value(json!({
            "id": 12,
            "userId": 2,
            "username": "alice",
            "userFileId": 31,
            "fileId": 88,
            "fileName": "report.pdf",
            "fileType": "pdf",
            "fileSize": 20480,
            "isDir": false,
            "shareCode": "Xy7Kp2",
            "needExtraction": true,
            "extractionCode": "ab12",
            "code": "zz99",
            "expireTime": null,
            "viewCount": 4,
            "views": 100,
            "downloadCount": null,
            "status": 1,
            "createTime": 1700000000000i64
        }))
        .unwrap();
        assert_eq!(share.share_code.as_deref(), Some("Xy7Kp2"));
        assert_eq!(share.extraction_code.as_deref(), Some("ab12"));
        assert_eq!(share.view_count, 4);
        assert_eq!(share.download_count, 0);
        assert_eq!(share.status, ShareStatus::Canceled);
        assert!(share.is_permanent());
    }

    #[test]
    fn test_storage_usage_nulls() {
        let usage: StorageUsage = serde_json::from_value(json!({
            "totalSpace": 100,
            "usedSpace": null,
            "usagePercent": null,
            "typeDistribution": null
        }))
        .unwrap();
        assert_eq!(usage.total_space, 100);
        assert_eq!(usage.used_space, 0);
        assert_eq!(usage.usage_percent, 0.0);
        assert!(usage.type_distribution.is_empty());
    }
}
