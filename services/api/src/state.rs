//! Application state shared across handlers

use std::sync::Arc;

use common::session::SessionService;

use crate::{conversation::ConversationService, repositories::UserDirectory};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub users: Arc<dyn UserDirectory>,
    pub conversations: ConversationService,
}
