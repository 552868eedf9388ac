use std::sync::Arc;

use axum::extract::FromRef;
use radiobot_radio::{Radio, SqliteDatabase};

use crate::sse::ServerSentEvents;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub radio: Arc<Radio<SqliteDatabase>>,
    pub sse: Arc<ServerSentEvents>,
}
