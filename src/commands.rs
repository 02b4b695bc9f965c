//! CLI command handlers.
//!
//! Every command first navigates the router to the page it corresponds to,
//! so the same guard that protects the web routes decides whether it may
//! run. Errors come back as display strings; the API layer has already
//! printed a notice for anything the server rejected.

use std::io::Write;
use std::path::Path;

use futures::StreamExt;

use cloud_drive_client::api::file::{self, UploadParams, UploadSource};
use cloud_drive_client::api::types::{
    CreateShareRequest, FileEntry, LoginRequest, ShareExpiry, Sort,
};
use cloud_drive_client::api::{search, share, user, ApiClient, UploadEvent};
use cloud_drive_client::host::{Notice, Notifier};
use cloud_drive_client::router::{Location, Router};

use crate::cli::{Command, ShareCommand};

pub struct Context {
    pub client: ApiClient,
    pub router: Router,
}

/// Prints notices to stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: &Notice) {
        eprintln!("{}", notice_line(notice));
    }
}

fn notice_line(notice: &Notice) -> String {
    format!("[{}] {}", notice.level.label(), notice.message)
}

/// Navigate to `path` and fail unless the guard let us through to it.
fn enter(ctx: &Context, path: &str) -> Result<Location, String> {
    let wanted = ctx
        .router
        .table()
        .resolve(path)
        .and_then(|r| r.name().map(str::to_string));
    let location = ctx.router.navigate(path).map_err(|e| e.to_string())?;

    if location.name != wanted {
        return Err(match location.name.as_deref() {
            Some("Login") => "Not logged in. Run `cloud-drive login` first.".to_string(),
            Some("Home") if wanted.as_deref() == Some("Login") => {
                "Already logged in. Run `cloud-drive logout` first.".to_string()
            }
            _ => format!("Cannot open {} (redirected to {})", path, location.full_path),
        });
    }
    Ok(location)
}

fn folder_path(folder: i64) -> String {
    if folder == 0 {
        "/".to_string()
    } else {
        format!("/folder/{}", folder)
    }
}

pub async fn run(ctx: &Context, command: Command) -> Result<(), String> {
    let client = &ctx.client;
    match command {
        Command::Login { username, password } => {
            enter(ctx, "/login")?;
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let result = user::login(
                client,
                &LoginRequest {
                    username,
                    password,
                    remember_me: Some(true),
                },
            )
            .await
            .map_err(|e| format!("Login failed: {}", e))?;
            let name = result
                .user_info
                .map(|u| u.username)
                .unwrap_or_else(|| "user".to_string());
            println!("Logged in as {}", name);
        }
        Command::Logout => {
            user::logout(client).await.map_err(|e| e.to_string())?;
            println!("Logged out");
        }
        Command::Whoami => {
            enter(ctx, "/settings")?;
            let info = user::user_info(client).await.map_err(|e| e.to_string())?;
            println!("{}", info.username);
            if let Some(email) = info.email {
                println!("  email: {}", email);
            }
            if let Some(nickname) = info.nickname {
                println!("  nickname: {}", nickname);
            }
        }
        Command::Storage => {
            enter(ctx, "/settings")?;
            let usage = user::storage_info(client).await.map_err(|e| e.to_string())?;
            println!(
                "{} of {} used ({:.1}%)",
                format_size(usage.used_space),
                format_size(usage.total_space),
                client.session().storage_percentage()
            );
            for (category, bytes) in &usage.type_distribution {
                println!("  {:<12} {}", category, format_size(*bytes));
            }
        }
        Command::Ls { folder } => {
            enter(ctx, &folder_path(folder))?;
            let listing = file::list_files(client, folder, &Sort::default())
                .await
                .map_err(|e| e.to_string())?;
            if !listing.path.is_empty() {
                let crumbs: Vec<&str> = listing.path.iter().map(|b| b.name.as_str()).collect();
                println!("/{}", crumbs.join("/"));
            }
            print_entries(&listing.list);
        }
        Command::Mkdir { name, parent } => {
            enter(ctx, &folder_path(parent))?;
            file::create_folder(client, Some(parent), &name)
                .await
                .map_err(|e| e.to_string())?;
            println!("Created {}", name);
        }
        Command::Rename { id, name } => {
            enter(ctx, &format!("/detail/{}", id))?;
            file::rename_file(client, id, &name).await.map_err(|e| e.to_string())?;
        }
        Command::Mv { ids, to } => {
            enter(ctx, &folder_path(to))?;
            file::move_files(client, &ids, to).await.map_err(|e| e.to_string())?;
        }
        Command::Cp { ids, to } => {
            enter(ctx, &folder_path(to))?;
            file::copy_files(client, &ids, to).await.map_err(|e| e.to_string())?;
        }
        Command::Rm { ids, permanent } => {
            if permanent {
                enter(ctx, "/recycle")?;
                file::remove_files(client, &ids).await.map_err(|e| e.to_string())?;
            } else {
                enter(ctx, "/")?;
                file::delete_files(client, &ids).await.map_err(|e| e.to_string())?;
            }
        }
        Command::Restore { ids } => {
            enter(ctx, "/recycle")?;
            file::restore_files(client, &ids).await.map_err(|e| e.to_string())?;
        }
        Command::Recycle { folder } => {
            enter(ctx, "/recycle")?;
            let listing = match folder {
                Some(id) => file::recycle_bin_folder(client, id, &Sort::default()).await,
                None => file::recycle_bin(client, &Sort::default()).await,
            }
            .map_err(|e| e.to_string())?;
            print_entries(&listing.list);
        }
        Command::EmptyRecycle => {
            enter(ctx, "/recycle")?;
            file::clear_recycle_bin(client).await.map_err(|e| e.to_string())?;
        }
        Command::Star { id } => {
            enter(ctx, &format!("/detail/{}", id))?;
            file::toggle_star(client, id, true).await.map_err(|e| e.to_string())?;
        }
        Command::Unstar { id } => {
            enter(ctx, &format!("/detail/{}", id))?;
            file::toggle_star(client, id, false).await.map_err(|e| e.to_string())?;
        }
        Command::Starred => {
            enter(ctx, "/starred")?;
            let listing = file::starred_files(client, &Sort::default())
                .await
                .map_err(|e| e.to_string())?;
            print_entries(&listing.list);
        }
        Command::Upload { file: path, parent } => {
            enter(ctx, &folder_path(parent))?;
            upload(client, &path, parent).await?;
        }
        Command::Download { ids, out } => {
            enter(ctx, &format!("/detail/{}", ids[0]))?;
            let downloaded = if ids.len() == 1 {
                file::download_file(client, ids[0]).await
            } else {
                file::batch_download(client, &ids).await
            }
            .map_err(|e| e.to_string())?;

            let dir = out.unwrap_or_else(|| std::path::PathBuf::from("."));
            let saved = downloaded
                .save_into(&dir, &format!("file-{}", ids[0]))
                .map_err(|e| format!("Failed to write download: {}", e))?;
            println!("Saved {} ({})", saved.display(), format_size(downloaded.len() as i64));
        }
        Command::Search { keyword, content } => {
            enter(ctx, &format!("/search?keyword={}", urlencoding::encode(&keyword)))?;
            search::save_search_history(client.session(), &keyword)
                .map_err(|e| format!("Failed to record search: {}", e))?;
            let params = search::SearchParams::keyword(keyword);
            let result = if content {
                search::full_text_search(client, &params).await
            } else {
                search::basic_search(client, &params).await
            }
            .map_err(|e| e.to_string())?;
            print_entries(&result.list);
        }
        Command::History { clear } => {
            enter(ctx, "/search")?;
            if clear {
                search::clear_search_history(client.session()).map_err(|e| e.to_string())?;
                println!("Search history cleared");
            } else {
                for keyword in search::search_history(client.session()).map_err(|e| e.to_string())? {
                    println!("{}", keyword);
                }
            }
        }
        Command::Share(cmd) => run_share(ctx, cmd).await?,
    }
    Ok(())
}

async fn run_share(ctx: &Context, command: ShareCommand) -> Result<(), String> {
    let client = &ctx.client;
    match command {
        ShareCommand::Create {
            id,
            days,
            protect,
            code,
        } => {
            enter(ctx, "/shares")?;
            let expiry = ShareExpiry::from_days(days)
                .ok_or_else(|| format!("Unsupported share lifetime: {} days (use 0, 1, 7 or 30)", days))?;
            let record = share::create_share(
                client,
                &CreateShareRequest {
                    user_file_id: id,
                    expire_type: Some(expiry),
                    has_extraction: protect || code.is_some(),
                    extraction_code: code,
                    description: None,
                },
            )
            .await
            .map_err(|e| e.to_string())?;
            println!("Share {}", record.url.as_deref().unwrap_or(&record.id));
            if let Some(code) = record.extraction_code {
                println!("  code: {}", code);
            }
        }
        ShareCommand::Info { share_id, code } => {
            enter(ctx, &format!("/s/{}", urlencoding::encode(&share_id)))?;
            let info = share::share_info(client, &share_id, code.as_deref())
                .await
                .map_err(|e| e.to_string())?;
            if let Err(e) = share::increase_views(client, &share_id).await {
                log::debug!("View count not updated: {}", e);
            }
            println!(
                "{} ({}) by {}",
                info.file_name.as_deref().unwrap_or("-"),
                info.status.label(),
                info.username.as_deref().unwrap_or("-")
            );
            let listing = share::share_file_list(client, &share_id, None)
                .await
                .map_err(|e| e.to_string())?;
            print_entries(&listing.list);
        }
        ShareCommand::Ls => {
            enter(ctx, "/shares")?;
            let shares = share::my_shares(client, &Default::default())
                .await
                .map_err(|e| e.to_string())?;
            for s in &shares.list {
                println!(
                    "{:<12} {:<9} {:>5} views  {}",
                    s.id,
                    s.status.label(),
                    s.view_count,
                    s.file_name.as_deref().unwrap_or("-")
                );
            }
        }
        ShareCommand::Cancel { share_ids } => {
            enter(ctx, "/shares")?;
            let result = if share_ids.len() == 1 {
                share::cancel_share(client, &share_ids[0]).await
            } else {
                share::batch_cancel_shares(client, &share_ids).await
            };
            result.map_err(|e| e.to_string())?;
            println!("Canceled {} share(s)", share_ids.len());
        }
        ShareCommand::Save { share_id, ids, to } => {
            enter(ctx, &format!("/s/{}", urlencoding::encode(&share_id)))?;
            share::save_share_files(client, &share_id, &ids, to)
                .await
                .map_err(|e| e.to_string())?;
            println!("Saved {} item(s)", ids.len());
        }
    }
    Ok(())
}

async fn upload(client: &ApiClient, path: &Path, parent: i64) -> Result<(), String> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut progress = file::upload_file(
        client,
        UploadParams {
            file: UploadSource::new(file_name.clone(), data),
            parent_id: parent,
            relative_path: None,
        },
    );

    let mut stderr = std::io::stderr();
    while let Some(event) = progress.next().await {
        match event {
            UploadEvent::Progress(pct) => {
                let _ = write!(stderr, "\r{} {}", file_name, progress_bar(pct));
                let _ = stderr.flush();
            }
            UploadEvent::Finished(result) => {
                let _ = writeln!(stderr);
                result.map_err(|e| e.to_string())?;
                println!("Uploaded {}", file_name);
            }
        }
    }
    Ok(())
}

fn progress_bar(pct: u8) -> String {
    const WIDTH: usize = 30;
    let filled = WIDTH * usize::from(pct.min(100)) / 100;
    format!("[{}{}] {:>3}%", "#".repeat(filled), " ".repeat(WIDTH - filled), pct)
}

fn print_entries(entries: &[FileEntry]) {
    if entries.is_empty() {
        println!("(empty)");
        return;
    }
    for entry in entries {
        let size = entry
            .display_size()
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        let marker = if entry.is_dir { "d" } else { "-" };
        let star = if entry.is_starred { "*" } else { " " };
        println!("{:>8} {}{} {:>10}  {}", entry.id, marker, star, size, entry.file_name);
    }
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes.max(0));
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn read_password() -> Result<String, String> {
    eprint!("Password: ");
    let _ = std::io::stderr().flush();
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| format!("Failed to read password: {}", e))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cloud_drive_client::config::DEFAULT_APP_TITLE;
    use cloud_drive_client::host::{LogTitle, NoticeLevel};
    use cloud_drive_client::router::routes;
    use cloud_drive_client::session::Session;
    use cloud_drive_client::ClientConfig;

    fn context() -> Context {
        let session = Session::in_memory();
        let router = Router::new(routes::default_table(), session.clone(), Arc::new(LogTitle), DEFAULT_APP_TITLE);
        let client = ApiClient::new(ClientConfig::default(), session, Default::default());
        Context { client, router }
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5.0 GB");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0), format!("[{}]   0%", " ".repeat(30)));
        assert_eq!(progress_bar(50), format!("[{}{}]  50%", "#".repeat(15), " ".repeat(15)));
        assert_eq!(progress_bar(100), format!("[{}] 100%", "#".repeat(30)));
    }

    #[test]
    fn test_notice_line() {
        let notice = Notice {
            level: NoticeLevel::Warning,
            message: "Disk almost full".into(),
            duration: std::time::Duration::from_secs(3),
        };
        assert_eq!(notice_line(&notice), "[warning] Disk almost full");
    }

    #[test]
    fn test_enter_requires_login_for_drive_pages() {
        let ctx = context();
        let err = enter(&ctx, "/starred").unwrap_err();
        assert!(err.contains("Not logged in"));
        assert!(enter(&ctx, "/login").is_ok());
        assert!(enter(&ctx, "/s/abc").is_ok());
    }

    #[test]
    fn test_enter_rejects_login_when_signed_in() {
        let ctx = context();
        ctx.client.session().set_token("t").unwrap();
        assert!(enter(&ctx, "/login").unwrap_err().contains("Already logged in"));
        assert_eq!(enter(&ctx, "/folder/4").unwrap().param("folderId"), Some("4"));
    }

    #[test]
    fn test_folder_path() {
        assert_eq!(folder_path(0), "/");
        assert_eq!(folder_path(12), "/folder/12");
    }
}
