// Outgoing cookie queue

use parking_lot::Mutex;

/// A cookie to set or expire on the response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCookie {
    pub name: String,
    pub value: String,
    /// Expire the cookie instead of setting it
    pub forget: bool,
}

/// Collects cookies for the host to write on the response
pub trait CookieJar: Send + Sync {
    fn queue(&self, cookie: QueuedCookie);

    /// Queue the expiry of a cookie
    fn forget(&self, name: &str) {
        self.queue(QueuedCookie {
            name: name.to_string(),
            value: String::new(),
            forget: true,
        });
    }
}

/// Cookie jar that keeps queued cookies in memory
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    queued: Mutex<Vec<QueuedCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued cookie
    pub fn drain(&self) -> Vec<QueuedCookie> {
        std::mem::take(&mut *self.queued.lock())
    }
}

impl CookieJar for MemoryCookieJar {
    fn queue(&self, cookie: QueuedCookie) {
        self.queued.lock().push(cookie);
    }
}
