use std::sync::Mutex;

/// Where the user is and how to send them somewhere else.
///
/// The gateway uses this when a session cannot be recovered: it remembers
/// the current location and forces a navigation to the login page.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> Option<String>;
    fn navigate(&self, location: &str);
}

/// Navigator for contexts with nowhere to go.
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn current_location(&self) -> Option<String> {
        None
    }

    fn navigate(&self, _location: &str) {}
}

/// Keeps the current location in memory and records every navigation.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    location: Mutex<Option<String>>,
    history: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(Some(location.into())),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.lock().unwrap_or_else(|e| e.into_inner()) = Some(location.into());
    }

    /// Every location navigated to, oldest first.
    pub fn navigations(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> Option<String> {
        self.location.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn navigate(&self, location: &str) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(location.to_string());
        self.set_location(location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_navigator() {
        let nav = RecordingNavigator::at("/dashboard/transaction");
        assert_eq!(nav.current_location().as_deref(), Some("/dashboard/transaction"));

        nav.navigate("/auth/v1/login");
        assert_eq!(nav.current_location().as_deref(), Some("/auth/v1/login"));
        assert_eq!(nav.navigations(), vec!["/auth/v1/login".to_string()]);
    }
}
