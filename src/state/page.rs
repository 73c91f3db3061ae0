//! Page State - Readiness tiers as a state machine.
//!
//! ```text
//!            all attached
//! Loading ───────────────▶ Loaded
//!                            │ instance created
//!                            ▼
//!                       AwaitingMore ◀──────────┐
//!                            │ all attached     │ instance created
//!                            ▼                  │
//!                       NewlyLoaded ────────────┘
//! ```
//!
//! The first completion is the `FirstLoad` tier; every later one is
//! `NewContent`. Only the registry's all-attached event drives completion,
//! so each tier is raised once per episode.

use spark_signals::{Signal, signal};

/// Page readiness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageState {
    /// Waiting for the first full attach.
    #[default]
    Loading,
    /// First full attach happened; nothing new since.
    Loaded,
    /// Content was added after a completion and has not fully attached yet.
    AwaitingMore,
    /// Content added after the first load has fully attached.
    NewlyLoaded,
}

/// Which completion signal a transition raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessTier {
    FirstLoad,
    NewContent,
}

impl PageState {
    /// A new component instance was created.
    pub fn on_instance_created(self) -> PageState {
        match self {
            PageState::Loaded | PageState::NewlyLoaded => PageState::AwaitingMore,
            other => other,
        }
    }

    /// Every created instance has attached.
    ///
    /// Returns the next state and the tier to raise, if any.
    pub fn on_all_attached(self) -> (PageState, Option<ReadinessTier>) {
        match self {
            PageState::Loading => (PageState::Loaded, Some(ReadinessTier::FirstLoad)),
            PageState::AwaitingMore => (PageState::NewlyLoaded, Some(ReadinessTier::NewContent)),
            settled => (settled, None),
        }
    }

    pub fn is_loading(self) -> bool {
        self == PageState::Loading
    }
}

// =============================================================================
// Reactive Page Status
// =============================================================================

/// Observable page status.
///
/// `loading` mirrors `state == Loading` for presentation layers that only
/// care about the first paint.
#[derive(Clone)]
pub struct PageStatus {
    state: Signal<PageState>,
    loading: Signal<bool>,
    loading_message: Signal<String>,
}

impl PageStatus {
    pub fn new(loading_message: impl Into<String>) -> Self {
        Self {
            state: signal(PageState::Loading),
            loading: signal(true),
            loading_message: signal(loading_message.into()),
        }
    }

    pub fn state(&self) -> PageState {
        self.state.get()
    }

    pub fn state_signal(&self) -> Signal<PageState> {
        self.state.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn loading_signal(&self) -> Signal<bool> {
        self.loading.clone()
    }

    pub fn loading_message(&self) -> String {
        self.loading_message.get()
    }

    pub fn set_loading_message(&self, message: impl Into<String>) {
        self.loading_message.set(message.into());
    }

    /// Apply an instance-created transition.
    pub fn instance_created(&self) {
        let current = self.state.get();
        let next = current.on_instance_created();
        if next != current {
            tracing::debug!(from = ?current, to = ?next, "page state");
            self.state.set(next);
        }
    }

    /// Apply an all-attached transition and return the tier to raise.
    pub fn all_attached(&self) -> Option<ReadinessTier> {
        let current = self.state.get();
        let (next, tier) = current.on_all_attached();
        if next != current {
            tracing::debug!(from = ?current, to = ?next, "page state");
            self.state.set(next);
        }
        if tier == Some(ReadinessTier::FirstLoad) {
            // Visible before any loaded callback runs
            self.loading.set(false);
        }
        tier
    }
}

impl Default for PageStatus {
    fn default() -> Self {
        Self::new("Loading...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_load_then_new_content() {
        let state = PageState::Loading;
        assert_eq!(state.on_instance_created(), PageState::Loading);

        let (state, tier) = state.on_all_attached();
        assert_eq!(state, PageState::Loaded);
        assert_eq!(tier, Some(ReadinessTier::FirstLoad));

        let state = state.on_instance_created();
        assert_eq!(state, PageState::AwaitingMore);

        let (state, tier) = state.on_all_attached();
        assert_eq!(state, PageState::NewlyLoaded);
        assert_eq!(tier, Some(ReadinessTier::NewContent));

        // Re-arms for the next batch
        let state = state.on_instance_created();
        let (_, tier) = state.on_all_attached();
        assert_eq!(tier, Some(ReadinessTier::NewContent));
    }

    #[test]
    fn test_settled_state_raises_nothing() {
        assert_eq!(
            PageState::Loaded.on_all_attached(),
            (PageState::Loaded, None)
        );
        assert_eq!(
            PageState::NewlyLoaded.on_all_attached(),
            (PageState::NewlyLoaded, None)
        );
    }

    #[test]
    fn test_status_signals() {
        let status = PageStatus::default();
        assert!(status.is_loading());
        assert_eq!(status.loading_message(), "Loading...");

        assert_eq!(status.all_attached(), Some(ReadinessTier::FirstLoad));
        assert!(!status.is_loading());
        assert_eq!(status.state(), PageState::Loaded);

        status.instance_created();
        assert_eq!(status.state(), PageState::AwaitingMore);
        assert!(!status.is_loading());
    }
}
