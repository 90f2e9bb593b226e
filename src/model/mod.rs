//! Domain records synchronized by the core: reservations and the carwashes
//! they reference, plus the viewer roles that select filters and
//! notification rules.

pub mod carwash;
pub mod reservation;
pub mod role;

pub use carwash::Carwash;
pub use reservation::{NewReservation, Reservation, ReservationStatus};
pub use role::Role;

/// Collection holding one document per booking.
pub const RESERVATIONS_COLLECTION: &str = "reservations";

/// Collection holding one document per owned carwash.
pub const CARWASHES_COLLECTION: &str = "carwashes";
