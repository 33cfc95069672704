//! The authentication state machine shared by every feature surface.
//!
//! ```text
//! Unauthenticated --login--> Authenticated --logout--> Unauthenticated
//! ```
//!
//! A login persists the session and binds the tenant registry; restore
//! replays the persisted session once at startup. Logout cancels every
//! request started under the old session.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use karat_core::{ConnectionParams, KaratError, TenantConnectionRegistry, TenantHandle};
use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::directory::DirectoryClient;
use crate::error::{AuthError, AuthResult};
use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(ConnectionParams),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn params(&self) -> Option<&ConnectionParams> {
        match self {
            SessionState::Authenticated(p) => Some(p),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Where the operator is sent after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Login,
    Dashboard,
}

impl Navigation {
    pub fn path(self) -> &'static str {
        match self {
            Navigation::Login => "/login",
            Navigation::Dashboard => "/dashboard",
        }
    }
}

pub struct SessionContext {
    store: SessionStore,
    registry: Arc<TenantConnectionRegistry>,
    directory: Arc<DirectoryClient>,
    state: RwLock<SessionState>,
    cancel: Mutex<CancellationToken>,
    signing_in: AtomicBool,
    restored: AtomicBool,
}

impl SessionContext {
    pub fn new(
        store: SessionStore,
        registry: Arc<TenantConnectionRegistry>,
        directory: Arc<DirectoryClient>,
    ) -> Self {
        Self {
            store,
            registry,
            directory,
            state: RwLock::new(SessionState::Unauthenticated),
            cancel: Mutex::new(CancellationToken::new()),
            signing_in: AtomicBool::new(false),
            restored: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<TenantConnectionRegistry> {
        &self.registry
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn current_params(&self) -> Option<ConnectionParams> {
        self.state.read().params().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    /// Decide the initial state from the persisted session. Runs once;
    /// later calls return the current state.
    ///
    /// A live session re-binds the registry. If that fails the session
    /// is discarded and the context stays unauthenticated.
    pub fn restore(&self) -> AuthResult<SessionState> {
        if self.restored.swap(true, Ordering::AcqRel) {
            return Ok(self.state());
        }

        let Some(params) = self.store.load() else {
            info!("no saved session");
            return Ok(SessionState::Unauthenticated);
        };

        let mut state = self.state.write();
        if let Err(source) = self.registry.resolve(&params) {
            warn!(tenant = %params.project_id, error = %source, "saved session cannot connect");
            drop(state);
            self.store.clear()?;
            return Err(AuthError::Connection { source });
        }

        info!(tenant = %params.project_id, "session restored");
        *state = SessionState::Authenticated(params);
        Ok((*state).clone())
    }

    /// Enter the authenticated state with already verified parameters.
    pub fn login(&self, params: ConnectionParams) -> AuthResult<TenantHandle> {
        self.login_unless_cancelled(params, None)
    }

    fn login_unless_cancelled(
        &self,
        params: ConnectionParams,
        token: Option<&CancellationToken>,
    ) -> AuthResult<TenantHandle> {
        let mut state = self.state.write();
        if token.is_some_and(CancellationToken::is_cancelled) {
            return Err(AuthError::Superseded);
        }
        if state.is_authenticated() {
            return Err(AuthError::AlreadyAuthenticated);
        }

        self.store.save(&params)?;
        let handle = match self.registry.resolve(&params) {
            Ok(handle) => handle,
            Err(source) => {
                warn!(tenant = %params.project_id, error = %source, "login cannot connect");
                self.store.clear()?;
                return Err(AuthError::Connection { source });
            }
        };

        info!(tenant = %params.project_id, shop = %params.shop_name, "logged in");
        *state = SessionState::Authenticated(params);
        Ok(handle)
    }

    /// Check credentials against the directory and log in.
    ///
    /// The shop id is looked up exactly as typed. Only one attempt runs at
    /// a time. A logout while the lookup is in flight makes the attempt
    /// fail with `Superseded`.
    pub async fn sign_in(&self, shop_id: &str, password: &str) -> AuthResult<ConnectionParams> {
        if shop_id.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let _flight = InFlight::acquire(&self.signing_in).ok_or(AuthError::LoginInProgress)?;
        if self.is_authenticated() {
            return Err(AuthError::AlreadyAuthenticated);
        }

        let token = self.cancel.lock().clone();
        let params = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(AuthError::Superseded),
            found = self.directory.authenticate(shop_id, password) => found?,
        };

        self.login_unless_cancelled(params.clone(), Some(&token))?;
        Ok(params)
    }

    /// Drop the session and send the operator back to the login screen.
    ///
    /// The tenant registry keeps its binding.
    pub fn logout(&self) -> AuthResult<Navigation> {
        let mut state = self.state.write();
        {
            let mut cancel = self.cancel.lock();
            cancel.cancel();
            *cancel = CancellationToken::new();
        }
        let cleared = self.store.clear();
        if let SessionState::Authenticated(params) = &*state {
            info!(tenant = %params.project_id, "logged out");
        }
        *state = SessionState::Unauthenticated;
        cleared?;
        Ok(Navigation::Login)
    }

    /// A guard tied to the current session.
    pub fn guard(&self) -> RequestGuard {
        RequestGuard {
            token: self.cancel.lock().clone(),
        }
    }
}

/// Discards the result of work that outlives its session.
#[derive(Debug, Clone)]
pub struct RequestGuard {
    token: CancellationToken,
}

impl RequestGuard {
    pub fn is_superseded(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `work` unless the session ends first.
    pub async fn run<F, T>(&self, work: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        let out = tokio::select! {
            biased;
            _ = self.token.cancelled() => return Err(superseded()),
            out = work => out,
        };
        if self.token.is_cancelled() {
            return Err(superseded());
        }
        out
    }
}

fn superseded() -> anyhow::Error {
    KaratError::from(AuthError::Superseded).into_anyhow()
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
