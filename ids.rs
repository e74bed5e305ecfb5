use chrono::Utc;
use uuid::Uuid;

/// Generates a fresh opaque identifier for a new entity.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Next `updatedAt` value for a record last touched at `previous`.
/// Never moves backwards, even if the wall clock does.
pub fn touch(previous: i64) -> i64 {
    now_millis().max(previous)
}
