/// Identifies one processed prompt across attempts, events and results.
pub type RequestId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh, time-ordered request identifier.
pub fn new_request_id() -> RequestId {
    uuid::Uuid::now_v7()
}
