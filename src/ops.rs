//! Reservation write operations.
//!
//! Status writes never update the view optimistically: the list only
//! moves once the store's own change feed confirms the write, so a failed
//! write leaves every watcher untouched and the error goes straight back
//! to the initiating caller.

use chrono::{NaiveDate, NaiveTime};

use crate::error::{failed_precondition, invalid_argument, not_found, SyncResult};
use crate::model::reservation::fields;
use crate::model::{
    Carwash, NewReservation, Reservation, ReservationStatus, CARWASHES_COLLECTION,
    RESERVATIONS_COLLECTION,
};
use crate::store::{server_timestamp, DocumentStore, WriteData};

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M";

/// Creates a pending booking and returns its id.
///
/// The owner id is copied from the referenced carwash here, at creation
/// time; it is denormalized for query efficiency and never re-validated
/// afterwards.
pub async fn create_reservation(
    store: &dyn DocumentStore,
    reservation: &NewReservation,
) -> SyncResult<String> {
    if reservation.client_id.is_empty() {
        return Err(invalid_argument("reservation requires a client id"));
    }
    if reservation.price < 0.0 || !reservation.price.is_finite() {
        return Err(invalid_argument("price must be a non-negative number"));
    }
    NaiveDate::parse_from_str(&reservation.date, DATE_FORMAT)
        .map_err(|_| invalid_argument(format!("date must be DD/MM/YYYY, got {:?}", reservation.date)))?;
    NaiveTime::parse_from_str(&reservation.time, TIME_FORMAT)
        .map_err(|_| invalid_argument(format!("time must be HH:MM, got {:?}", reservation.time)))?;

    let carwash = store
        .get(CARWASHES_COLLECTION, &reservation.carwash_id)
        .await?
        .ok_or_else(|| not_found(format!("carwash {} does not exist", reservation.carwash_id)))?;
    let carwash = Carwash::from_document(&carwash);

    let mut data = WriteData::new()
        .set(fields::CLIENT_ID, reservation.client_id.as_str())
        .set(fields::OWNER_ID, carwash.owner_id.as_str())
        .set(fields::CARWASH_ID, reservation.carwash_id.as_str())
        .set(fields::CARWASH_NAME, carwash.name.as_str())
        .set(fields::SERVICE_ID, reservation.service_id.as_str())
        .set(fields::SERVICE_NAME, reservation.service_name.as_str())
        .set(fields::PRICE, reservation.price)
        .set(fields::DATE, reservation.date.as_str())
        .set(fields::TIME, reservation.time.as_str())
        .set(fields::CLIENT_PHONE, reservation.client_phone.as_str())
        .set(fields::CLIENT_ADDRESS, reservation.client_address.as_str())
        .set(fields::STATUS, ReservationStatus::Pending.as_str())
        .set(fields::IS_SEEN_BY_CLIENT, false)
        .set(fields::CREATED_AT, server_timestamp());
    if let Some(latitude) = reservation.client_latitude {
        data = data.set(fields::CLIENT_LATITUDE, latitude);
    }
    if let Some(longitude) = reservation.client_longitude {
        data = data.set(fields::CLIENT_LONGITUDE, longitude);
    }

    store.create(RESERVATIONS_COLLECTION, data).await
}

/// Moves a pending reservation to a terminal status.
///
/// Transitions are one-directional: the target can never be pending, and
/// a reservation already confirmed or canceled cannot move again. The
/// seen flag resets so the client is notified of the change.
pub async fn set_reservation_status(
    store: &dyn DocumentStore,
    reservation_id: &str,
    status: ReservationStatus,
) -> SyncResult<()> {
    if status == ReservationStatus::Pending {
        return Err(invalid_argument(
            "a reservation cannot move back to pending",
        ));
    }

    let document = store
        .get(RESERVATIONS_COLLECTION, reservation_id)
        .await?
        .ok_or_else(|| not_found(format!("reservation {reservation_id} does not exist")))?;
    let current = Reservation::from_document(&document);
    if current.status.is_terminal() {
        return Err(failed_precondition(format!(
            "reservation {reservation_id} is already {}",
            current.status
        )));
    }

    store
        .update(
            RESERVATIONS_COLLECTION,
            reservation_id,
            WriteData::new()
                .set(fields::STATUS, status.as_str())
                .set(fields::IS_SEEN_BY_CLIENT, false)
                .set(fields::UPDATED_AT, server_timestamp()),
        )
        .await
}

/// Records that the client has viewed a status change; clears the entry
/// from the client badge.
pub async fn mark_seen_by_client(
    store: &dyn DocumentStore,
    reservation_id: &str,
) -> SyncResult<()> {
    store
        .update(
            RESERVATIONS_COLLECTION,
            reservation_id,
            WriteData::new().set(fields::IS_SEEN_BY_CLIENT, true),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorCode;
    use crate::model::carwash;
    use crate::store::MemoryDocumentStore;

    fn new_reservation(carwash_id: &str) -> NewReservation {
        NewReservation {
            client_id: "user-1".to_string(),
            carwash_id: carwash_id.to_string(),
            service_id: "svc-1".to_string(),
            service_name: "Lavage complet".to_string(),
            price: 1500.0,
            date: "12/01/2026".to_string(),
            time: "14:30".to_string(),
            client_phone: "0550 00 00 00".to_string(),
            client_address: "12 rue Didouche".to_string(),
            client_latitude: Some(36.75),
            client_longitude: Some(3.06),
        }
    }

    async fn seed_carwash(store: &MemoryDocumentStore) -> String {
        store
            .create(
                CARWASHES_COLLECTION,
                WriteData::new()
                    .set(carwash::fields::OWNER_ID, "owner-1")
                    .set(carwash::fields::NAME, "Lavage Hydra"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_denormalizes_owner_and_forces_pending() {
        let store = MemoryDocumentStore::new();
        let carwash_id = seed_carwash(&store).await;

        let id = create_reservation(&store, &new_reservation(&carwash_id))
            .await
            .unwrap();

        let document = store.get(RESERVATIONS_COLLECTION, &id).await.unwrap().unwrap();
        let reservation = Reservation::from_document(&document);
        assert_eq!(reservation.owner_id, "owner-1");
        assert_eq!(reservation.carwash_name, "Lavage Hydra");
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert!(!reservation.is_seen_by_client);
        assert!(reservation.created_at.is_some());
        assert!(reservation.updated_at.is_none());
    }

    #[tokio::test]
    async fn create_rejects_unknown_carwash() {
        let store = MemoryDocumentStore::new();
        let err = create_reservation(&store, &new_reservation("cw-missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code, SyncErrorCode::NotFound);
    }

    #[tokio::test]
    async fn create_validates_schedule_strings() {
        let store = MemoryDocumentStore::new();
        let carwash_id = seed_carwash(&store).await;

        let mut bad_date = new_reservation(&carwash_id);
        bad_date.date = "2026-01-12".to_string();
        let err = create_reservation(&store, &bad_date).await.unwrap_err();
        assert_eq!(err.code, SyncErrorCode::InvalidArgument);

        let mut bad_time = new_reservation(&carwash_id);
        bad_time.time = "2pm".to_string();
        let err = create_reservation(&store, &bad_time).await.unwrap_err();
        assert_eq!(err.code, SyncErrorCode::InvalidArgument);

        let mut bad_price = new_reservation(&carwash_id);
        bad_price.price = -5.0;
        let err = create_reservation(&store, &bad_price).await.unwrap_err();
        assert_eq!(err.code, SyncErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn status_change_bumps_updated_at_and_resets_seen_flag() {
        let store = MemoryDocumentStore::new();
        let carwash_id = seed_carwash(&store).await;
        let id = create_reservation(&store, &new_reservation(&carwash_id))
            .await
            .unwrap();

        set_reservation_status(&store, &id, ReservationStatus::Confirmed)
            .await
            .unwrap();

        let document = store.get(RESERVATIONS_COLLECTION, &id).await.unwrap().unwrap();
        let reservation = Reservation::from_document(&document);
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert!(reservation.updated_at.is_some());
        assert!(!reservation.is_seen_by_client);
        assert!(reservation.has_unseen_update());
    }

    #[tokio::test]
    async fn terminal_statuses_cannot_move_again() {
        let store = MemoryDocumentStore::new();
        let carwash_id = seed_carwash(&store).await;
        let id = create_reservation(&store, &new_reservation(&carwash_id))
            .await
            .unwrap();

        set_reservation_status(&store, &id, ReservationStatus::Canceled)
            .await
            .unwrap();
        let err = set_reservation_status(&store, &id, ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert_eq!(err.code, SyncErrorCode::FailedPrecondition);

        let err = set_reservation_status(&store, &id, ReservationStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code, SyncErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn mark_seen_clears_the_unseen_flag() {
        let store = MemoryDocumentStore::new();
        let carwash_id = seed_carwash(&store).await;
        let id = create_reservation(&store, &new_reservation(&carwash_id))
            .await
            .unwrap();
        set_reservation_status(&store, &id, ReservationStatus::Confirmed)
            .await
            .unwrap();

        mark_seen_by_client(&store, &id).await.unwrap();

        let document = store.get(RESERVATIONS_COLLECTION, &id).await.unwrap().unwrap();
        let reservation = Reservation::from_document(&document);
        assert!(reservation.is_seen_by_client);
        assert!(!reservation.has_unseen_update());
    }
}
