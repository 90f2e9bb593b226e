//! Real-time reservation synchronization and notification core for the
//! Washbook carwash booking app.
//!
//! The crate keeps every signed-in device's view of reservation state
//! consistent as bookings are created and decided, classifies which
//! transitions deserve a user-visible notification, and works around the
//! document store's membership-filter cap (10 values per query) by
//! chunked batching when an owner manages more carwashes than one query
//! can cover.
//!
//! Screens, navigation, authentication, and the hosted store stay
//! outside; the store is consumed through [`store::DocumentStore`] and
//! the platform contributes one primitive,
//! [`notify::MessagePresenter::show_transient_message`].
//!
//! Typical wiring, once per signed-in user:
//!
//! ```no_run
//! use std::sync::Arc;
//! use washbook_sync::model::Role;
//! use washbook_sync::notify::MessagePresenter;
//! use washbook_sync::store::MemoryDocumentStore;
//! use washbook_sync::sync::Session;
//!
//! struct Toast;
//! impl MessagePresenter for Toast {
//!     fn show_transient_message(&self, title: &str, message: &str) {
//!         println!("{title}: {message}");
//!     }
//! }
//!
//! # async fn run() -> washbook_sync::SyncResult<()> {
//! let store = Arc::new(MemoryDocumentStore::new());
//! let session = Session::new(store, Arc::new(Toast), "owner-1", Role::Owner);
//! let _global = session.start_global_notification_watcher().await?;
//! let reservations = session.start_reservation_watcher().await?;
//! reservations.on_update(|list| println!("{} reservations", list.len()));
//! // ... on sign-out:
//! session.end();
//! # Ok(())
//! # }
//! ```

pub mod badge;
pub mod error;
pub mod model;
pub mod notify;
pub mod ops;
pub mod store;
pub mod sync;

pub use error::{SyncError, SyncErrorCode, SyncResult};
