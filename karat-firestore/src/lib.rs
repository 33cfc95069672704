//! karat-firestore: Firestore REST integration for Karat.
//!
//! [`FirestoreStore`] implements [`karat_core::DocumentStore`] over the
//! v1 `documents` API, authenticating requests with the project's web
//! API key. [`FirestoreConnector`] builds one from tenant
//! [`karat_core::ConnectionParams`].

mod adapter;
mod connector;
pub mod value;

pub use adapter::FirestoreStore;
pub use connector::{FirestoreConnector, DEFAULT_BASE_URL};
