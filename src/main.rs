mod commands;

use std::sync::Arc;

use cloud_drive_client::api::ApiClient;
use cloud_drive_client::config::ClientConfig;
use cloud_drive_client::host::{LogTitle, Ports};
use cloud_drive_client::router::{routes, Router};
use cloud_drive_client::session::store::{FileStore, KeyValueStore};
use cloud_drive_client::session::Session;

use commands::{Context, StderrNotifier};

mod cli {
    use clap::{Parser, Subcommand};

    #[derive(Parser, Debug)]
    #[command(name = "cloud-drive", about = "Command-line client for the cloud drive")]
    pub struct Args {
        /// API base URL (overrides CLOUD_DRIVE_API_URL / VITE_API_BASE_URL)
        #[arg(long, global = true)]
        pub api_url: Option<String>,

        /// Keep the session in the OS keychain instead of the data directory
        #[cfg(feature = "keychain")]
        #[arg(long, global = true)]
        pub keychain: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Subcommand, Debug)]
    pub enum Command {
        /// Sign in and store the session
        Login {
            username: String,
            /// Read from stdin when omitted
            #[arg(long)]
            password: Option<String>,
        },
        Logout,
        /// Show the signed-in user
        Whoami,
        /// Show storage usage
        Storage,
        /// List a folder (root by default)
        Ls {
            #[arg(default_value_t = 0)]
            folder: i64,
        },
        Mkdir {
            name: String,
            #[arg(long, default_value_t = 0)]
            parent: i64,
        },
        Rename { id: i64, name: String },
        /// Move entries into a folder
        Mv {
            #[arg(required = true, num_args = 1..)]
            ids: Vec<i64>,
            #[arg(long)]
            to: i64,
        },
        /// Copy entries into a folder
        Cp {
            #[arg(required = true, num_args = 1..)]
            ids: Vec<i64>,
            #[arg(long)]
            to: i64,
        },
        /// Move entries to the recycle bin, or delete them for good
        Rm {
            #[arg(required = true, num_args = 1..)]
            ids: Vec<i64>,
            #[arg(long)]
            permanent: bool,
        },
        Restore {
            #[arg(required = true, num_args = 1..)]
            ids: Vec<i64>,
        },
        /// List the recycle bin (or a recycled folder)
        Recycle { folder: Option<i64> },
        EmptyRecycle,
        Star { id: i64 },
        Unstar { id: i64 },
        Starred,
        Upload {
            file: std::path::PathBuf,
            #[arg(long, default_value_t = 0)]
            parent: i64,
        },
        /// Download one entry, or several as a zip
        Download {
            #[arg(required = true, num_args = 1..)]
            ids: Vec<i64>,
            /// Target directory (current directory by default)
            #[arg(long)]
            out: Option<std::path::PathBuf>,
        },
        Search {
            keyword: String,
            /// Search document contents too
            #[arg(long)]
            content: bool,
        },
        /// Show (or clear) recent searches
        History {
            #[arg(long)]
            clear: bool,
        },
        #[command(subcommand)]
        Share(ShareCommand),
    }

    #[derive(Subcommand, Debug)]
    pub enum ShareCommand {
        Create {
            id: i64,
            /// Lifetime in days: 0 (permanent), 1, 7 or 30
            #[arg(long, default_value_t = 7)]
            days: u32,
            /// Require an extraction code (generated unless --code is given)
            #[arg(long)]
            protect: bool,
            #[arg(long)]
            code: Option<String>,
        },
        Info {
            share_id: String,
            #[arg(long)]
            code: Option<String>,
        },
        /// List your shares
        Ls,
        Cancel {
            #[arg(required = true, num_args = 1..)]
            share_ids: Vec<String>,
        },
        /// Save shared entries into your drive
        Save {
            share_id: String,
            #[arg(required = true, num_args = 1..)]
            ids: Vec<i64>,
            #[arg(long)]
            to: Option<i64>,
        },
    }
}

fn open_store(args: &cli::Args, config: &ClientConfig) -> Result<Arc<dyn KeyValueStore>, String> {
    #[cfg(feature = "keychain")]
    if args.keychain {
        use cloud_drive_client::session::store::{KeychainStore, KEYCHAIN_SERVICE};
        let service = format!("{}:{}", KEYCHAIN_SERVICE, config.base_url);
        return Ok(Arc::new(KeychainStore::new(service)));
    }
    #[cfg(not(feature = "keychain"))]
    let _ = args;

    let store = FileStore::for_origin(&config.store_dir, &config.base_url)
        .map_err(|e| format!("Failed to open session store: {}", e))?;
    log::debug!("Session store: {}", store.path().display());
    Ok(Arc::new(store))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = {
        use clap::Parser;
        cli::Args::parse()
    };

    let mut config = ClientConfig::from_env();
    if let Some(ref url) = args.api_url {
        config = config.with_base_url(url);
    }
    log::info!("Using API at {}", config.base_url);

    let store = match open_store(&args, &config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    let session = match Session::restore(store) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: failed to restore session: {}", e);
            std::process::exit(1);
        }
    };

    let router = Router::new(
        routes::default_table(),
        session.clone(),
        Arc::new(LogTitle),
        &config.app_title,
    );
    let ports = Ports::new(Arc::new(StderrNotifier), Arc::new(router.clone()));
    let client = ApiClient::new(config, session, ports);

    let ctx = Context { client, router };
    if let Err(e) = commands::run(&ctx, args.command).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
