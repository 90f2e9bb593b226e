use std::collections::HashMap;

use crate::model::{Reservation, ReservationStatus};
use crate::store::{ChangeKind, SnapshotEvent};

/// Watcher lifecycle. The first feed event after subscribing is the
/// baseline snapshot and never produces notifications; only events
/// observed while `Live` do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherPhase {
    Created,
    AwaitingInitial,
    Live,
    Stopped,
}

/// A transition worth evaluating for a user-visible notification.
#[derive(Clone, Debug)]
pub enum ReservationEvent {
    /// A booking appeared after the baseline; announced to manager-role
    /// watchers.
    BookingCreated(Reservation),
    /// The status field genuinely changed; announced to client-role
    /// watchers when the new status is terminal.
    StatusChanged {
        reservation: Reservation,
        previous: ReservationStatus,
    },
}

/// Turns raw feed events into classified transitions.
///
/// Tracks the last-known status per document so a modification that only
/// touches unrelated fields (an address correction, a seen-flag flip) is
/// never mistaken for a status transition.
#[derive(Debug)]
pub struct ChangeClassifier {
    phase: WatcherPhase,
    last_status: HashMap<String, ReservationStatus>,
}

impl Default for ChangeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeClassifier {
    pub fn new() -> Self {
        Self {
            phase: WatcherPhase::Created,
            last_status: HashMap::new(),
        }
    }

    pub fn phase(&self) -> WatcherPhase {
        self.phase
    }

    /// Marks the subscription as opened; the next event is the baseline.
    pub fn mark_subscribed(&mut self) {
        if self.phase == WatcherPhase::Created {
            self.phase = WatcherPhase::AwaitingInitial;
        }
    }

    /// Terminal; a stopped classifier ignores every further event.
    pub fn stop(&mut self) {
        self.phase = WatcherPhase::Stopped;
    }

    /// Consumes one feed event and returns the genuine transitions it
    /// contains. The baseline event returns nothing regardless of size.
    pub fn classify(&mut self, event: &SnapshotEvent) -> Vec<ReservationEvent> {
        match self.phase {
            WatcherPhase::Created | WatcherPhase::Stopped => Vec::new(),
            WatcherPhase::AwaitingInitial => {
                for document in &event.documents {
                    let reservation = Reservation::from_document(document);
                    self.last_status.insert(reservation.id, reservation.status);
                }
                self.phase = WatcherPhase::Live;
                Vec::new()
            }
            WatcherPhase::Live => {
                let mut events = Vec::new();
                for change in &event.changes {
                    let reservation = Reservation::from_document(&change.document);
                    match change.kind {
                        ChangeKind::Added => {
                            self.last_status
                                .insert(reservation.id.clone(), reservation.status);
                            events.push(ReservationEvent::BookingCreated(reservation));
                        }
                        ChangeKind::Modified => {
                            let previous = self
                                .last_status
                                .insert(reservation.id.clone(), reservation.status);
                            match previous {
                                // First sighting of the document; there is
                                // no known prior status to transition from.
                                None => {}
                                Some(previous) if previous == reservation.status => {}
                                Some(previous) => events.push(ReservationEvent::StatusChanged {
                                    reservation,
                                    previous,
                                }),
                            }
                        }
                        ChangeKind::Removed => {
                            self.last_status.remove(&reservation.id);
                        }
                    }
                }
                events
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Document, DocumentChange};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn reservation_doc(id: &str, status: &str) -> Document {
        let mut fields = BTreeMap::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("clientAddress".to_string(), json!("12 rue Didouche"));
        Document::new(id, fields)
    }

    fn event(documents: Vec<Document>, changes: Vec<(ChangeKind, Document)>) -> SnapshotEvent {
        SnapshotEvent {
            documents,
            changes: changes
                .into_iter()
                .map(|(kind, document)| DocumentChange { kind, document })
                .collect(),
        }
    }

    fn live_classifier_with(docs: &[Document]) -> ChangeClassifier {
        let mut classifier = ChangeClassifier::new();
        classifier.mark_subscribed();
        let baseline = event(
            docs.to_vec(),
            docs.iter()
                .map(|d| (ChangeKind::Added, d.clone()))
                .collect(),
        );
        assert!(classifier.classify(&baseline).is_empty());
        classifier
    }

    #[test]
    fn initial_snapshot_is_suppressed() {
        let mut classifier = ChangeClassifier::new();
        classifier.mark_subscribed();
        assert_eq!(classifier.phase(), WatcherPhase::AwaitingInitial);

        let docs: Vec<Document> = (0..25)
            .map(|i| reservation_doc(&format!("res-{i}"), "pending"))
            .collect();
        let baseline = event(
            docs.clone(),
            docs.iter()
                .map(|d| (ChangeKind::Added, d.clone()))
                .collect(),
        );

        assert!(classifier.classify(&baseline).is_empty());
        assert_eq!(classifier.phase(), WatcherPhase::Live);
    }

    #[test]
    fn live_addition_is_a_new_booking() {
        let mut classifier = live_classifier_with(&[reservation_doc("res-1", "pending")]);

        let added = reservation_doc("res-2", "pending");
        let events = classifier.classify(&event(
            vec![reservation_doc("res-1", "pending"), added.clone()],
            vec![(ChangeKind::Added, added)],
        ));

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ReservationEvent::BookingCreated(reservation) if reservation.id == "res-2"
        ));
    }

    #[test]
    fn status_transition_is_detected_exactly_once() {
        let mut classifier = live_classifier_with(&[reservation_doc("res-1", "pending")]);

        let confirmed = reservation_doc("res-1", "confirmed");
        let events = classifier.classify(&event(
            vec![confirmed.clone()],
            vec![(ChangeKind::Modified, confirmed.clone())],
        ));
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ReservationEvent::StatusChanged { reservation, previous: ReservationStatus::Pending }
                if reservation.status == ReservationStatus::Confirmed
        ));

        // Re-delivering the same status is not a transition.
        let repeat = classifier.classify(&event(
            vec![confirmed.clone()],
            vec![(ChangeKind::Modified, confirmed)],
        ));
        assert!(repeat.is_empty());
    }

    #[test]
    fn unrelated_field_modification_is_silent() {
        let mut classifier = live_classifier_with(&[reservation_doc("res-1", "pending")]);

        let mut fields = BTreeMap::new();
        fields.insert("status".to_string(), json!("pending"));
        fields.insert("clientAddress".to_string(), json!("7 rue Larbi Ben M'hidi"));
        let edited = Document::new("res-1", fields);

        let events = classifier.classify(&event(
            vec![edited.clone()],
            vec![(ChangeKind::Modified, edited)],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn removal_is_not_a_transition() {
        let mut classifier = live_classifier_with(&[reservation_doc("res-1", "pending")]);

        let removed = reservation_doc("res-1", "pending");
        let events = classifier.classify(&event(vec![], vec![(ChangeKind::Removed, removed)]));
        assert!(events.is_empty());

        // The id is forgotten; a later re-add reads as a new booking.
        let re_added = reservation_doc("res-1", "pending");
        let events = classifier.classify(&event(
            vec![re_added.clone()],
            vec![(ChangeKind::Added, re_added)],
        ));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn stopped_classifier_ignores_events() {
        let mut classifier = live_classifier_with(&[reservation_doc("res-1", "pending")]);
        classifier.stop();

        let confirmed = reservation_doc("res-1", "confirmed");
        let events = classifier.classify(&event(
            vec![confirmed.clone()],
            vec![(ChangeKind::Modified, confirmed)],
        ));
        assert!(events.is_empty());
        assert_eq!(classifier.phase(), WatcherPhase::Stopped);
    }
}
