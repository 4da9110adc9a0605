//! # `missao-sync-firebase`: Firebase Backends
//!
//! This crate connects the `missao-sync` pipeline to Firebase: a
//! [`FirestoreStore`] for production Firestore and the Firestore emulator, and
//! an [`AuthEmulatorSeeder`] that creates the operator login in the Auth
//! emulator.

pub mod auth;
pub mod store;
pub mod value;

pub use auth::AuthEmulatorSeeder;
pub use store::FirestoreStore;
