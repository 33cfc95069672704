use std::sync::Arc;

use axum::Router;
use karat_auth::{
    AuthOptions, DirectoryClient, FileSlot, MemorySlot, SessionContext, SessionSlot, SessionState,
    SessionStore, SlotKind,
};
use karat_catalog::{Catalog, ImageOptions, Scope};
use karat_core::{Clock, DocumentStore, SystemClock, TenantConnectionRegistry, TenantConnector};
use karat_firestore::FirestoreConnector;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ConsoleSettings;
use crate::routes;
use crate::ConsoleState;

/// The moving parts behind the console. Production wires Firestore and a
/// file slot; tests swap in memory-backed ones.
pub struct ConsoleParts {
    pub connector: Arc<dyn TenantConnector>,
    /// Store holding the shop directory.
    pub master: Arc<dyn DocumentStore>,
    pub slot: Arc<dyn SessionSlot>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct ConsoleApp {
    pub state: ConsoleState,
    pub router: Router<()>,
}

impl ConsoleApp {
    /// Assemble the session, catalog and router, then pick up any saved
    /// session.
    pub fn new(parts: ConsoleParts, auth: &AuthOptions, images: ImageOptions) -> Self {
        let registry = Arc::new(TenantConnectionRegistry::new(parts.connector));
        let directory = Arc::new(DirectoryClient::new(
            parts.master,
            auth.credentials.verifier(),
            auth.directory_collection.clone(),
        ));
        let store = SessionStore::new(parts.slot, Arc::clone(&parts.clock), auth.session_window);
        let session = Arc::new(SessionContext::new(store, Arc::clone(&registry), directory));
        let catalog = Arc::new(Catalog::new(Scope::new(registry, parts.clock), images));

        match session.restore() {
            Ok(SessionState::Authenticated(params)) => {
                info!(shop = %params.shop_name, "restored saved session");
            }
            Ok(SessionState::Unauthenticated) => {}
            Err(err) => warn!(error = %err, "saved session could not be restored"),
        }

        let state = ConsoleState::new(session, catalog);
        let router = routes::router(state.clone())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Self { state, router }
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Production wiring: Firestore for the directory and tenants.
pub fn build(settings: &ConsoleSettings) -> anyhow::Result<ConsoleApp> {
    let connector = FirestoreConnector::new(settings.firestore_base_url.clone(), settings.firestore_timeout)?;
    let master: Arc<dyn DocumentStore> = Arc::new(connector.open(&settings.master)?);

    let slot: Arc<dyn SessionSlot> = match settings.auth.session_slot {
        SlotKind::File => Arc::new(FileSlot::new(&settings.auth.session_dir, &settings.auth.session_key)),
        SlotKind::Memory => Arc::new(MemorySlot::new()),
    };

    let parts = ConsoleParts {
        connector: Arc::new(connector),
        master,
        slot,
        clock: Arc::new(SystemClock),
    };
    Ok(ConsoleApp::new(parts, &settings.auth, settings.images.clone()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
