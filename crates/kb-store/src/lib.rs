//! # kb-store
//!
//! Persistent player records for kubinka.
//!
//! A [`PlayerRecord`] says "this member holds the role until `expires_at`".
//! The lifecycle layer reads the set of ids once at startup (to re-grant the
//! role after a restart) and runs [`PlayerStore::watch_expirations`] in the
//! background to revoke the role as records expire.
//!
//! [`JsonPlayerStore`] keeps one JSON file per member under
//! `<path>/<bucket>/`, which keeps records isolated and easy to inspect.

pub mod error;
pub mod record;
pub mod store;
pub mod watcher;

pub use error::StoreError;
pub use record::PlayerRecord;
pub use store::{JsonPlayerStore, PlayerStore};
pub use watcher::{SweepOutcome, WatchTarget};
