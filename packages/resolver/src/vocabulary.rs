//! Street labels too generic to identify a place on their own.
//!
//! The police API snaps incidents to anonymised map points, and many of
//! those points are named after the kind of place rather than the place
//! ("On or near Parking Area"). A street matches the vocabulary when it
//! contains any label as a substring.

/// Generic labels used by the police API.
pub const DEFAULT_GENERIC_LABELS: &[&str] = &[
    "Sports/Recreation Area",
    "Parking Area",
    "Park/Open Space",
    "Supermarket",
    "Petrol Station",
    "Pedestrian Subway",
    "Shopping Area",
    "Further/Higher Education Building",
    "Police Station",
    "Hospital",
    "Nightclub",
    "Bus/Coach Station",
    "Theatre/Concert Hall",
    "Conference/Exhibition Centre",
    "Airport/Airfield",
    "Added by Police Force",
    "Ferry Terminal",
    "Theme/Adventure Park",
    "Prison",
    "Race Track",
    "Motorway Service Area",
];

/// Set of generic street labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    labels: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_GENERIC_LABELS.iter().map(|s| (*s).to_string()))
    }
}

impl Vocabulary {
    /// Builds a vocabulary from custom labels. Empty labels are ignored,
    /// since they would match every street.
    pub fn new(labels: impl IntoIterator<Item = String>) -> Self {
        Self {
            labels: labels.into_iter().filter(|l| !l.is_empty()).collect(),
        }
    }

    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether `street` contains any generic label.
    #[must_use]
    pub fn is_generic(&self, street: &str) -> bool {
        self.labels.iter().any(|label| street.contains(label.as_str()))
    }
}
