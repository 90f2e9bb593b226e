//! Navigation badge derivation.
//!
//! Badges are recomputed from the synchronized view on every update; the
//! count is `None` when zero so callers suppress the badge instead of
//! rendering a literal 0.

use std::num::NonZeroUsize;

use crate::model::{Reservation, ReservationStatus, Role};

/// Owner/Admin: reservations still awaiting a decision. Client: status
/// changes the client has not acknowledged yet.
pub fn badge_count(role: Role, reservations: &[Reservation]) -> Option<NonZeroUsize> {
    let count = if role.is_manager() {
        reservations
            .iter()
            .filter(|reservation| reservation.status == ReservationStatus::Pending)
            .count()
    } else {
        reservations
            .iter()
            .filter(|reservation| reservation.has_unseen_update())
            .count()
    };
    NonZeroUsize::new(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Document;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn reservation(status: &str, seen: bool) -> Reservation {
        let mut fields = BTreeMap::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("isSeenByClient".to_string(), json!(seen));
        Reservation::from_document(&Document::new("res", fields))
    }

    #[test]
    fn owner_badge_counts_pending() {
        let reservations = vec![
            reservation("pending", false),
            reservation("confirmed", false),
            reservation("pending", true),
        ];
        assert_eq!(
            badge_count(Role::Owner, &reservations).map(NonZeroUsize::get),
            Some(2)
        );
        assert_eq!(
            badge_count(Role::Admin, &reservations).map(NonZeroUsize::get),
            Some(2)
        );
    }

    #[test]
    fn owner_badge_absent_when_nothing_pending() {
        let reservations = vec![reservation("confirmed", false), reservation("canceled", true)];
        assert_eq!(badge_count(Role::Owner, &reservations), None);
    }

    #[test]
    fn client_badge_counts_unseen_terminal_updates() {
        let reservations = vec![
            reservation("confirmed", false),
            reservation("canceled", false),
            reservation("confirmed", true),
            reservation("pending", false),
        ];
        assert_eq!(
            badge_count(Role::Client, &reservations).map(NonZeroUsize::get),
            Some(2)
        );
    }

    #[test]
    fn client_badge_absent_when_all_seen() {
        let reservations = vec![reservation("confirmed", true), reservation("pending", false)];
        assert_eq!(badge_count(Role::Client, &reservations), None);
    }

    #[test]
    fn empty_view_has_no_badge() {
        assert_eq!(badge_count(Role::Owner, &[]), None);
        assert_eq!(badge_count(Role::Client, &[]), None);
    }
}
