use std::fmt;

use crate::store::{Document, Timestamp};

/// Wire field names of a reservation document.
pub(crate) mod fields {
    pub const CLIENT_ID: &str = "clientId";
    pub const OWNER_ID: &str = "ownerId";
    pub const CARWASH_ID: &str = "carwashId";
    pub const CARWASH_NAME: &str = "carwashName";
    pub const SERVICE_ID: &str = "serviceId";
    pub const SERVICE_NAME: &str = "serviceName";
    pub const PRICE: &str = "price";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const CLIENT_PHONE: &str = "clientPhone";
    pub const CLIENT_ADDRESS: &str = "clientAddress";
    pub const CLIENT_LATITUDE: &str = "clientLatitude";
    pub const CLIENT_LONGITUDE: &str = "clientLongitude";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const IS_SEEN_BY_CLIENT: &str = "isSeenByClient";
}

/// Booking lifecycle. Transitions are one-directional: pending may move to
/// confirmed or canceled; both of those are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Canceled => "canceled",
        }
    }

    /// Decodes a stored status string. Unknown or missing values read as
    /// pending, matching how the views treat partially written documents.
    pub fn parse(value: &str) -> Self {
        match value {
            "confirmed" => ReservationStatus::Confirmed,
            "canceled" => ReservationStatus::Canceled,
            _ => ReservationStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking record as the views consume it.
///
/// Decoding from a store document is lenient by design: a reservation with
/// missing denormalized fields still renders in the list (with placeholder
/// labels) rather than failing the whole view.
#[derive(Clone, Debug, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub client_id: String,
    pub owner_id: String,
    pub carwash_id: String,
    pub carwash_name: String,
    pub service_id: String,
    pub service_name: String,
    pub price: f64,
    pub date: String,
    pub time: String,
    pub client_phone: String,
    pub client_address: String,
    pub client_latitude: Option<f64>,
    pub client_longitude: Option<f64>,
    pub status: ReservationStatus,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
    pub is_seen_by_client: bool,
}

impl Reservation {
    pub fn from_document(document: &Document) -> Self {
        let text = |field: &str| document.str_field(field).unwrap_or_default().to_string();
        Self {
            id: document.id().to_string(),
            client_id: text(fields::CLIENT_ID),
            owner_id: text(fields::OWNER_ID),
            carwash_id: text(fields::CARWASH_ID),
            carwash_name: text(fields::CARWASH_NAME),
            service_id: text(fields::SERVICE_ID),
            service_name: text(fields::SERVICE_NAME),
            price: document.f64_field(fields::PRICE).unwrap_or(0.0).max(0.0),
            date: text(fields::DATE),
            time: text(fields::TIME),
            client_phone: text(fields::CLIENT_PHONE),
            client_address: text(fields::CLIENT_ADDRESS),
            client_latitude: document.f64_field(fields::CLIENT_LATITUDE),
            client_longitude: document.f64_field(fields::CLIENT_LONGITUDE),
            status: ReservationStatus::parse(
                document.str_field(fields::STATUS).unwrap_or_default(),
            ),
            created_at: document.timestamp_field(fields::CREATED_AT),
            updated_at: document.timestamp_field(fields::UPDATED_AT),
            is_seen_by_client: document.bool_field(fields::IS_SEEN_BY_CLIENT).unwrap_or(false),
        }
    }

    /// Carwash display label, falling back to the raw id and then a
    /// placeholder for partially written documents.
    pub fn carwash_label(&self) -> &str {
        if !self.carwash_name.is_empty() {
            &self.carwash_name
        } else if !self.carwash_id.is_empty() {
            &self.carwash_id
        } else {
            "Carwash"
        }
    }

    pub fn service_label(&self) -> &str {
        if !self.service_name.is_empty() {
            &self.service_name
        } else if !self.service_id.is_empty() {
            &self.service_id
        } else {
            "Service"
        }
    }

    /// "{date} à {time}" with placeholders for missing pieces.
    pub fn schedule_label(&self) -> String {
        let date = if self.date.is_empty() { "??/??/????" } else { &self.date };
        let time = if self.time.is_empty() { "--:--" } else { &self.time };
        format!("{date} à {time}")
    }

    pub fn phone_label(&self) -> &str {
        if self.client_phone.is_empty() {
            "N/A"
        } else {
            &self.client_phone
        }
    }

    /// A status change the client has not acknowledged yet; drives the
    /// client badge.
    pub fn has_unseen_update(&self) -> bool {
        self.status.is_terminal() && !self.is_seen_by_client
    }
}

/// Client-supplied payload for creating a booking. The owner id is not
/// part of it: it is copied from the referenced carwash at creation time.
#[derive(Clone, Debug)]
pub struct NewReservation {
    pub client_id: String,
    pub carwash_id: String,
    pub service_id: String,
    pub service_name: String,
    pub price: f64,
    pub date: String,
    pub time: String,
    pub client_phone: String,
    pub client_address: String,
    pub client_latitude: Option<f64>,
    pub client_longitude: Option<f64>,
}
