//! Message timestamps and relative age formatting.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Creation time of a message. Display only: the server's page order is the
/// ordering authority, timestamps are never used to sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Formats the age of this timestamp relative to `now`.
    ///
    /// Future timestamps (clock skew between client and server) read as
    /// "just now". Anything older than 30 days is shown as a calendar date.
    #[must_use]
    pub fn relative_to(&self, now: DateTime<Utc>) -> String {
        let age = now.signed_duration_since(self.0);
        if age < Duration::minutes(1) {
            "just now".to_string()
        } else if age < Duration::hours(1) {
            format!("{}m ago", age.num_minutes())
        } else if age < Duration::days(1) {
            format!("{}h ago", age.num_hours())
        } else if age <= Duration::days(30) {
            format!("{}d ago", age.num_days())
        } else {
            self.0.format("%Y-%m-%d").to_string()
        }
    }

    /// Shorthand for [`Timestamp::relative_to`] against the wall clock.
    #[must_use]
    pub fn relative(&self) -> String {
        self.relative_to(Utc::now())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}
