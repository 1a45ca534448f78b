//! Main/popup window bookkeeping.
//!
//! Handles are compared by equality only. A second non-main window is an
//! error rather than something to iterate over.

use crate::result::{PayError, PayResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque browser window identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowHandle(String);

impl WindowHandle {
    /// Wrap a driver-provided id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The main window plus at most one popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSet {
    main: WindowHandle,
    popup: Option<WindowHandle>,
}

impl WindowSet {
    /// Start tracking with only the main window
    #[must_use]
    pub const fn new(main: WindowHandle) -> Self {
        Self { main, popup: None }
    }

    /// Main window handle
    #[must_use]
    pub const fn main(&self) -> &WindowHandle {
        &self.main
    }

    /// Popup handle, if one is open
    #[must_use]
    pub const fn popup(&self) -> Option<&WindowHandle> {
        self.popup.as_ref()
    }

    /// Handles from `open` that are neither main nor the tracked popup
    #[must_use]
    pub fn untracked<'a>(&self, open: &'a [WindowHandle]) -> Vec<&'a WindowHandle> {
        open.iter()
            .filter(|h| **h != self.main && Some(*h) != self.popup.as_ref())
            .collect()
    }

    /// Adopt the single new window among `open` as the popup.
    ///
    /// Fails if a popup is already tracked, if nothing new is open, or if more
    /// than one new window appeared.
    pub fn adopt_popup(&mut self, open: &[WindowHandle]) -> PayResult<&WindowHandle> {
        if let Some(existing) = &self.popup {
            return Err(PayError::unknown(format!(
                "popup {existing} is already open"
            )));
        }
        let candidates = self.untracked(open);
        let popup = match candidates.as_slice() {
            [only] => (*only).clone(),
            [] => return Err(PayError::unknown("no popup window appeared")),
            many => {
                return Err(PayError::unknown(format!(
                    "expected one popup window, found {}",
                    many.len()
                )))
            }
        };
        Ok(&*self.popup.insert(popup))
    }

    /// Stop tracking the popup, returning it if there was one
    pub fn release_popup(&mut self) -> Option<WindowHandle> {
        self.popup.take()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn handles(ids: &[&str]) -> Vec<WindowHandle> {
        ids.iter().map(|id| WindowHandle::new(*id)).collect()
    }

    #[test]
    fn test_adopt_single_popup() {
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        let popup = windows.adopt_popup(&handles(&["main", "popup-1"])).unwrap();
        assert_eq!(popup.as_str(), "popup-1");
        assert_eq!(windows.popup(), Some(&WindowHandle::new("popup-1")));
    }

    #[test]
    fn test_equality_not_substring() {
        // "main-2" contains "main" but is a different window
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        let popup = windows.adopt_popup(&handles(&["main-2", "main"])).unwrap();
        assert_eq!(popup.as_str(), "main-2");
    }

    #[test]
    fn test_no_popup_is_error() {
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        assert!(windows.adopt_popup(&handles(&["main"])).is_err());
        assert!(windows.popup().is_none());
    }

    #[test]
    fn test_two_popups_is_unknown_failure() {
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        let err = windows
            .adopt_popup(&handles(&["main", "a", "b"]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::FailureKind::Unknown);
        assert!(err.to_string().contains("found 2"));
        assert!(windows.popup().is_none());
    }

    #[test]
    fn test_second_adopt_rejected() {
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        windows.adopt_popup(&handles(&["main", "a"])).unwrap();
        assert!(windows.adopt_popup(&handles(&["main", "a", "b"])).is_err());
    }

    #[test]
    fn test_release_popup() {
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        windows.adopt_popup(&handles(&["main", "a"])).unwrap();
        assert_eq!(windows.release_popup(), Some(WindowHandle::new("a")));
        assert_eq!(windows.release_popup(), None);
        assert_eq!(windows.main().as_str(), "main");
    }

    #[test]
    fn test_untracked_excludes_main_and_popup() {
        let mut windows = WindowSet::new(WindowHandle::new("main"));
        windows.adopt_popup(&handles(&["main", "a"])).unwrap();
        let open = handles(&["main", "a", "b"]);
        let untracked = windows.untracked(&open);
        assert_eq!(untracked, vec![&WindowHandle::new("b")]);
    }
}
