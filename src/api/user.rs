//! Authentication and account endpoints.
//!
//! Besides issuing requests these keep the `Session` in step: login stores
//! the token, logout clears it, and profile/usage reads refresh the cache.

use serde_json::{json, Value};

use super::client::ApiClient;
use super::error::ApiError;
use super::file::UploadSource;
use super::transport::{ApiRequest, MultipartForm};
use super::types::{
    CodeChannel, LoginRequest, LoginResult, RegisterRequest, StorageUsage, UserInfo, UserInfoUpdate,
};

/// POST /auth/login. On success the token (and profile, if sent) is stored.
pub async fn login(client: &ApiClient, params: &LoginRequest) -> Result<LoginResult, ApiError> {
    if params.username.trim().is_empty() || params.password.is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }

    let req = ApiRequest::post("/auth/login").json(params)?;
    let result: LoginResult = client.json(req).await?;

    let session = client.session();
    session.set_token(&result.token)?;
    if let Some(ref info) = result.user_info {
        session.set_user_info(info.clone())?;
    }
    log::info!("Logged in as {}", params.username);
    Ok(result)
}

/// POST /auth/register
pub async fn register(client: &ApiClient, params: &RegisterRequest) -> Result<Value, ApiError> {
    if params.username.trim().is_empty() || params.password.is_empty() || params.email.trim().is_empty() {
        return Err(ApiError::validation("username, password and email are required"));
    }
    let req = ApiRequest::post("/auth/register").json(params)?;
    client.value(req).await
}

/// End the session.
///
/// The backend is told only when a token is held. The local session is
/// cleared regardless of how that call goes.
pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
    let session = client.session();
    if session.is_logged_in() {
        if let Err(e) = client.unit(ApiRequest::post("/auth/logout")).await {
            log::warn!("Logout request failed: {}", e);
        }
    }
    session.clear()?;
    log::info!("Logged out");
    Ok(())
}

/// GET /user/info; refreshes the cached profile.
pub async fn user_info(client: &ApiClient) -> Result<UserInfo, ApiError> {
    let value = client.value(ApiRequest::get("/user/info")).await?;
    if !value.is_object() {
        return Err(ApiError::Decode("failed to fetch user info".into()));
    }
    let info: UserInfo = serde_json::from_value(value)?;
    client.session().set_user_info(info.clone())?;
    Ok(info)
}

/// PUT /user/info
pub async fn update_user_info(client: &ApiClient, update: &UserInfoUpdate) -> Result<(), ApiError> {
    let req = ApiRequest::put("/user/info").json(update)?;
    client.unit(req).await
}

/// PUT /user/password
pub async fn change_password(client: &ApiClient, old_password: &str, new_password: &str) -> Result<(), ApiError> {
    if old_password.is_empty() || new_password.is_empty() {
        return Err(ApiError::validation("both passwords are required"));
    }
    let req = ApiRequest::put("/user/password").json(&json!({
        "oldPassword": old_password,
        "newPassword": new_password,
    }))?;
    client.unit(req).await
}

/// POST /user/avatar (multipart); returns the new avatar URL.
pub async fn upload_avatar(client: &ApiClient, file: UploadSource) -> Result<String, ApiError> {
    let form = MultipartForm::new().file("file", &file.file_name, file.mime.as_deref(), file.data);
    let value = client
        .value(ApiRequest::post("/user/avatar").multipart(form))
        .await?;
    avatar_url(&value)
}

/// The avatar endpoint answers with a bare string, `{data}` or `{url}`.
fn avatar_url(value: &Value) -> Result<String, ApiError> {
    let url = match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("data")
            .or_else(|| map.get("url"))
            .and_then(Value::as_str),
        _ => None,
    };
    url.map(str::to_string)
        .ok_or_else(|| ApiError::Decode("avatar upload returned no usable URL".into()))
}

/// GET /user/storage; refreshes the cached usage.
///
/// Missing fields read as zero, and a non-object payload as empty usage.
pub async fn storage_info(client: &ApiClient) -> Result<StorageUsage, ApiError> {
    let value = client.value(ApiRequest::get("/user/storage")).await?;
    let usage = if value.is_object() {
        serde_json::from_value(value)?
    } else {
        StorageUsage::default()
    };
    client.session().set_storage_info(usage.clone())?;
    Ok(usage)
}

/// POST /auth/send-code
pub async fn send_verification_code(client: &ApiClient, channel: CodeChannel, target: &str) -> Result<(), ApiError> {
    if target.trim().is_empty() {
        return Err(ApiError::validation("target must not be empty"));
    }
    let req = ApiRequest::post("/auth/send-code").json(&json!({
        "type": channel,
        "target": target,
    }))?;
    client.unit(req).await
}
