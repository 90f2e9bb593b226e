use crate::store::{Document, Timestamp};

/// Wire field names of a carwash document.
pub(crate) mod fields {
    pub const OWNER_ID: &str = "ownerId";
    pub const NAME: &str = "name";
    pub const ADDRESS: &str = "address";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// An owned resource. One owner may manage any number of carwashes; the
/// size of that set decides whether their reservation view can be live.
#[derive(Clone, Debug, PartialEq)]
pub struct Carwash {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

impl Carwash {
    pub fn from_document(document: &Document) -> Self {
        let text = |field: &str| document.str_field(field).unwrap_or_default().to_string();
        Self {
            id: document.id().to_string(),
            owner_id: text(fields::OWNER_ID),
            name: text(fields::NAME),
            address: text(fields::ADDRESS),
            latitude: document.f64_field(fields::LATITUDE),
            longitude: document.f64_field(fields::LONGITUDE),
            created_at: document.timestamp_field(fields::CREATED_AT),
            updated_at: document.timestamp_field(fields::UPDATED_AT),
        }
    }
}
