mod accounts;
mod auth;
mod catalog;
mod config;
mod db;
mod error;
mod lifecycle;
mod notify;
mod services;
mod state;
mod storage;

use crate::accounts::token::TokenSigner;
use crate::accounts::Accounts;
use crate::catalog::TemplateCatalog;
use crate::config::AppConfig;
use crate::db::Database;
use crate::lifecycle::SubmissionLifecycle;
use crate::notify::{LogMailer, Mailer, Notifier, OutboxMailer};
use crate::state::AppState;
use crate::storage::{LocalDocumentStore, PUBLIC_PREFIX};
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = AppConfig::from_env().map_err(io::Error::other)?;

    let db = Database::open(&config.database_path).map_err(io::Error::other)?;
    let accounts = Accounts::new(db.clone());
    if let Some(admin) = &config.bootstrap_admin {
        if accounts.ensure_admin(admin).map_err(io::Error::other)? {
            info!("Created bootstrap administrator {}", admin.nstin);
        }
    }

    // Start notification dispatcher task
    let (notifier, rx) = Notifier::channel(notify::QUEUE_CAPACITY);
    let mailer: Arc<dyn Mailer> = match &config.outbox_dir {
        Some(dir) => {
            info!("Writing outgoing mail to {}", dir.display());
            Arc::new(OutboxMailer::new(dir.clone()))
        }
        None => Arc::new(LogMailer),
    };
    tokio::spawn(async move {
        notify::start_dispatcher(mailer, rx).await;
    });

    std::fs::create_dir_all(&config.storage_dir)?;
    let documents = Arc::new(LocalDocumentStore::new(
        config.storage_dir.clone(),
        config.public_url.clone(),
    ));

    let lifecycle = SubmissionLifecycle::new(
        db.clone(),
        Arc::new(accounts.clone()),
        documents.clone(),
        notifier,
        config.max_upload_bytes,
    )
    .with_admin_email(config.admin_email.clone());

    let state = web::Data::new(AppState {
        accounts,
        tokens: TokenSigner::new(&config.token_secret, config.token_ttl),
        lifecycle,
        catalog: TemplateCatalog::new(db, documents, config.max_upload_bytes),
        max_upload_bytes: config.max_upload_bytes,
    });

    let storage_dir = config.storage_dir.clone();
    info!("Server running at {}", config.public_url);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(services::configure)
            .service(actix_files::Files::new(PUBLIC_PREFIX, &storage_dir))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
