//! Shared application state.
//!
//! Built once in `main.rs` and handed to every worker as `web::Data<AppState>`. Each
//! service owns its own handles (database, document store, notifier), so handlers only
//! pick the one they need.

use crate::accounts::token::TokenSigner;
use crate::accounts::Accounts;
use crate::catalog::TemplateCatalog;
use crate::lifecycle::SubmissionLifecycle;

pub struct AppState {
    pub accounts: Accounts,
    pub tokens: TokenSigner,
    pub lifecycle: SubmissionLifecycle,
    pub catalog: TemplateCatalog,
    /// Per-file ceiling applied while reading multipart bodies.
    pub max_upload_bytes: usize,
}
