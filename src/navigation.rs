//! Access to the current navigation's URI.
//!
//! A sign-in round trip returns to the application with its response encoded
//! in the URI fragment. The resolver reads that fragment and clears it once the
//! response has been consumed.

use std::sync::{Mutex, PoisonError};

/// The current location as seen by the application.
pub trait Navigation: Send + Sync {
    /// Non-empty fragment of the current URI, if any.
    fn fragment(&self) -> Option<String>;

    /// Navigate to an empty target, dropping the fragment.
    fn clear_location(&self);

    /// Reset the fragment in place without navigating away.
    fn clear_fragment(&self);
}

/// Non-empty text between the first and second `#` of `href`.
pub fn fragment_of(href: &str) -> Option<&str> {
    href.split('#').nth(1).filter(|fragment| !fragment.is_empty())
}

fn without_fragment(href: &str) -> &str {
    href.split('#').next().unwrap_or_default()
}

/// Navigation state kept in memory, for hosts that hand the href over.
#[derive(Debug, Default)]
pub struct MemoryNavigation {
    href: Mutex<String>,
}

impl MemoryNavigation {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Mutex::new(href.into()),
        }
    }

    pub fn href(&self) -> String {
        self.href
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_href(&self, href: impl Into<String>) {
        *self.href.lock().unwrap_or_else(PoisonError::into_inner) = href.into();
    }
}

impl Navigation for MemoryNavigation {
    fn fragment(&self) -> Option<String> {
        let href = self.href.lock().unwrap_or_else(PoisonError::into_inner);
        fragment_of(&href).map(str::to_string)
    }

    fn clear_location(&self) {
        let mut href = self.href.lock().unwrap_or_else(PoisonError::into_inner);
        let base = without_fragment(&href).to_string();
        *href = base;
    }

    fn clear_fragment(&self) {
        let mut href = self.href.lock().unwrap_or_else(PoisonError::into_inner);
        // Assigning an empty hash leaves the bare `#` behind.
        let base = format!("{}#", without_fragment(&href));
        *href = base;
    }
}
