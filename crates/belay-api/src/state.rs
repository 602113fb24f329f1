use std::sync::Arc;

use tracing::error;

use belay_db::Database;
use belay_types::BelayError;

use crate::channels::ChannelDirectory;
use crate::credentials::CredentialStore;
use crate::messages::MessageLedger;
use crate::replies::ReplyLedger;
use crate::timeline::QueryFacade;
use crate::tokens::TokenIssuer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub credentials: CredentialStore,
    pub tokens: TokenIssuer,
    pub channels: ChannelDirectory,
    pub messages: MessageLedger,
    pub replies: ReplyLedger,
    pub timeline: QueryFacade,
}

impl AppStateInner {
    pub fn new(db: Database, tokens: TokenIssuer) -> AppState {
        let db = Arc::new(db);
        let messages = MessageLedger::new(db.clone());
        let replies = ReplyLedger::new(db.clone());
        let channels = ChannelDirectory::new(db.clone());

        Arc::new(Self {
            credentials: CredentialStore::new(db),
            tokens,
            timeline: QueryFacade::new(channels.clone(), messages.clone(), replies.clone()),
            channels,
            messages,
            replies,
        })
    }

    /// Run blocking store work off the async runtime. The store enforces the
    /// operation deadline; no second timeout is layered on here.
    pub async fn run_blocking<F, T>(&self, f: F) -> Result<T, BelayError>
    where
        F: FnOnce() -> Result<T, BelayError> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.unwrap_or_else(|e| {
            error!("spawn_blocking join error: {}", e);
            Err(BelayError::StoreUnavailable)
        })
    }
}
