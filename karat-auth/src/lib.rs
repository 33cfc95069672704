// Shop authentication and session lifecycle.

pub mod context;
pub mod directory;
pub mod error;
pub mod options;
pub mod session;
pub mod verifier;

pub use context::{Navigation, RequestGuard, SessionContext, SessionState};
pub use directory::DirectoryClient;
pub use error::{AuthError, AuthResult};
pub use options::{AuthOptions, SlotKind};
pub use session::{FileSlot, MemorySlot, PersistedSession, SessionSlot, SessionStore};
pub use verifier::{BcryptVerifier, CredentialScheme, CredentialVerifier, PlaintextVerifier};
