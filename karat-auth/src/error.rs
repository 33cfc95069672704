use karat_core::errors::KaratError;
use karat_core::store::StoreError;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failures of login, session persistence and tenant resolution.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Enter credentials")]
    MissingCredentials,

    #[error("Shop not found")]
    ShopNotFound { shop_id: String },

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Login failed")]
    DirectoryLookupFailed {
        #[source]
        source: StoreError,
    },

    #[error("A login is already in progress")]
    LoginInProgress,

    #[error("Already signed in to a shop")]
    AlreadyAuthenticated,

    #[error("Session was superseded by a logout")]
    Superseded,

    #[error("Tenant connection failed: {source}")]
    Connection {
        #[source]
        source: StoreError,
    },

    #[error("Credential check failed: {message}")]
    Verifier { message: String },

    #[error("Session storage failed: {source}")]
    SessionIo {
        #[from]
        source: std::io::Error,
    },

    #[error("Session encoding failed: {source}")]
    SessionEncoding {
        #[from]
        source: serde_json::Error,
    },
}

impl From<AuthError> for KaratError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::MissingCredentials => KaratError::bad_request(message),
            AuthError::ShopNotFound { shop_id } => {
                KaratError::not_found(message).with_data(serde_json::json!({ "shopId": shop_id }))
            }
            AuthError::InvalidCredentials => KaratError::not_authenticated(message),
            AuthError::DirectoryLookupFailed { source } => {
                KaratError::bad_gateway(message).with_source(anyhow::Error::new(source))
            }
            AuthError::LoginInProgress | AuthError::AlreadyAuthenticated | AuthError::Superseded => {
                KaratError::conflict(message)
            }
            AuthError::Connection { source } => KaratError::from(source),
            AuthError::Verifier { .. } => KaratError::general_error(message),
            AuthError::SessionIo { source } => {
                KaratError::general_error(message).with_source(anyhow::Error::new(source))
            }
            AuthError::SessionEncoding { source } => {
                KaratError::general_error(message).with_source(anyhow::Error::new(source))
            }
        }
    }
}
