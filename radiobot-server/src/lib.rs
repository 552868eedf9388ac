mod context;
mod docs;
mod errors;
mod radios;
mod schemas;
mod serialized;
mod sse;
mod stations;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::routing::get;
use log::{info, warn};
use radiobot_radio::{Radio, SqliteDatabase};
use tokio::{net::TcpListener, sync::broadcast::error::RecvError};
use tower_http::cors::{Any, CorsLayer};

pub use context::ServerContext;
pub use sse::{ServerEvent, ServerSentEvents};

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9050;

pub type Router = axum::Router<ServerContext>;

/// Starts the control API, serving until the listener fails
pub async fn run_server(radio: Arc<Radio<SqliteDatabase>>, port: u16) -> std::io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let context = ServerContext {
        sse: ServerSentEvents::new(),
        radio,
    };

    tokio::spawn(forward_events(context.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/radios", radios::router())
        .nest("/stations", stations::router())
        .nest("/events", sse::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, root_router.into_make_service()).await
}

/// Relays radio events to the connected event streams
async fn forward_events(context: ServerContext) {
    let mut receiver = context.radio.subscribe();

    loop {
        match receiver.recv().await {
            Ok(event) => context.sse.broadcast(event.into()),
            Err(RecvError::Lagged(skipped)) => warn!("Dropped {} radio events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
