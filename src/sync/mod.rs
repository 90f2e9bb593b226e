//! Reservation view synchronization.
//!
//! A watcher is one live subscription plus its classification state,
//! scoped to a screen or to the whole session. This module holds the
//! watcher lifecycle, the role-dependent view it maintains, the change
//! classifier feeding the notification dispatcher, the fan-out batcher
//! for owners above the membership-filter cap, and the session context
//! that owns every watcher of a signed-in user.

pub mod batcher;
pub mod classifier;
pub mod session;
pub mod view;
pub mod watcher;

pub use batcher::query_by_id_set;
pub use classifier::{ChangeClassifier, ReservationEvent, WatcherPhase};
pub use session::Session;
pub use view::ReservationView;
pub use watcher::ReservationWatcher;
