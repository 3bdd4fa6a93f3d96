use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// The structured input describing one reservation, used to populate the confirmation document.
/// Every field is plain text handed to the layout verbatim: no numeric or temporal parsing is
/// performed on any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    /// The name of the person the confirmation is addressed to.
    pub point_of_contact: String,
    /// The booked date range as display text.
    pub booking_dates: String,
    /// The ordered descriptions of the selected items.
    pub selections: Vec<String>,
    /// How the selected items reach the event.
    pub collection_method: String,
    pub event_name: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub department: String,
    pub contact_number: String,
    pub remarks: String,
}

impl BookingRecord {
    /// Parses a booking record from its JSON representation.
    pub fn from_json(record_content: &str) -> Result<BookingRecord, ContextError> {
        serde_json::from_str(record_content).map_err(|error| {
            ContextError::with_error("Unable to parse the booking record", &error)
        })
    }

    /// The fixed sample reservation the HTTP routes render.
    pub fn sample() -> BookingRecord {
        BookingRecord {
            point_of_contact: "Rachel Lim".into(),
            booking_dates: "14 September 2024 to 15 September 2024".into(),
            selections: vec![
                "Tropical Jungle Bouncy Castle".into(),
                "Under the Sea Obstacle Course".into(),
            ],
            collection_method: "Delivery and setup by the vendor".into(),
            event_name: "Family Day Carnival".into(),
            start_time: "9:00 AM".into(),
            end_time: "6:00 PM".into(),
            location: "Bishan-Ang Mo Kio Park, Lawn B".into(),
            department: "Community Engagement Division".into(),
            contact_number: "+65 9123 4567".into(),
            remarks: "Setup must be completed by 8:30 AM.".into(),
        }
    }

    /// The label/value rows of the "Key Event Details" section, in the order they are drawn.
    pub fn detail_rows(&self) -> [(&'static str, &str); 8] {
        [
            ("Event: ", self.event_name.as_str()),
            ("Start Time: ", self.start_time.as_str()),
            ("End Time: ", self.end_time.as_str()),
            ("Location: ", self.location.as_str()),
            ("Department: ", self.department.as_str()),
            ("Point of Contact: ", self.point_of_contact.as_str()),
            ("Contact Number: ", self.contact_number.as_str()),
            ("Remarks: ", self.remarks.as_str()),
        ]
    }
}

/// The fixed lines of the "Notes" section, in drawing order.
pub const NOTE_LINES: [&str; 6] = [
    "A confirmation has been sent to your email address.",
    "Please allow for the following lead times:",
    "2 working days for self-collection",
    "5 working days for delivery and setup",
    "24 hours of notice for cancellations or amendments",
    "Contact the events office if any of the details above are incorrect.",
];

/// A note line whose text starts with a digit renders as an indented sub-item of the preceding
/// non-indented line. The nesting is inferred from this lexical pattern alone, no explicit depth
/// is stored in the data.
pub fn note_is_nested(note_line: &str) -> bool {
    note_line
        .chars()
        .next()
        .map_or(false, |character| character.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_digit_prefix_rule_partitions_the_note_lines() {
        let nested_count = NOTE_LINES
            .iter()
            .filter(|note_line| note_is_nested(note_line))
            .count();
        assert_eq!(nested_count, 3);
        assert_eq!(NOTE_LINES.len(), 6);

        assert!(note_is_nested("2 working days for self-collection"));
        assert!(!note_is_nested(
            "A confirmation has been sent to your email address."
        ));
    }

    #[test]
    fn the_nested_notes_group_under_a_single_parent() {
        // Walk the list attributing each nested line to the closest preceding plain line
        let mut children_per_parent = Vec::new();
        for note_line in NOTE_LINES {
            if note_is_nested(note_line) {
                let last: &mut usize = children_per_parent
                    .last_mut()
                    .expect("a nested note must follow a plain one");
                *last += 1;
            } else {
                children_per_parent.push(0);
            }
        }

        assert_eq!(children_per_parent, vec![0, 3, 0]);
    }

    #[test]
    fn the_sample_record_round_trips_through_json() {
        let sample_record = BookingRecord::sample();
        let serialized = serde_json::to_string(&sample_record).unwrap();
        assert!(serialized.contains("\"pointOfContact\""));

        let parsed_record = BookingRecord::from_json(&serialized).unwrap();
        assert_eq!(parsed_record.event_name, sample_record.event_name);
        assert_eq!(parsed_record.detail_rows().len(), 8);
    }
}
