use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

// Mocking out time so that it is possible to run tests that depend on time.
pub trait ISys: Send + Sync {
    /// The current timestamp in millis
    fn get_timestamp_millis(&self) -> i64;
}

/// System that gets the real time and is used when not testing
pub struct RealSys {}
impl ISys for RealSys {
    fn get_timestamp_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when it is told to. Lets tests wait for a
/// `Reminder` to become due without sleeping.
pub struct ControlledSys {
    now: AtomicI64,
}

impl ControlledSys {
    pub fn new(timestamp_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(timestamp_millis),
        }
    }

    pub fn set(&self, timestamp_millis: i64) {
        self.now.store(timestamp_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl ISys for ControlledSys {
    fn get_timestamp_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
