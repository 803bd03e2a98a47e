// crates/server/src/state.rs
//! Application state for the axum server.

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use triage_console_core::SessionStore;

use crate::settings::DashboardSettings;
use crate::tracker::Tracker;

/// Shared application state accessible from all route handlers.
///
/// Everything here is read-only after startup except `agent_verified`,
/// which latches once the agent CLI has answered a probe.
pub struct AppState {
    /// Server start time for uptime reporting.
    pub start_time: Instant,
    /// Settings as loaded at startup; saved changes apply on restart.
    pub settings: DashboardSettings,
    /// Where `POST /api/config` persists settings.
    pub settings_path: PathBuf,
    /// Resolved transcript store; resolution happens once at startup.
    pub store: SessionStore,
    /// Issue tracker, real or demo.
    pub tracker: Arc<dyn Tracker>,
    /// True when running with canned tracker data.
    pub demo: bool,
    /// Latched once the agent CLI probe succeeds.
    pub agent_verified: AtomicBool,
}

impl AppState {
    pub fn new(
        settings: DashboardSettings,
        settings_path: PathBuf,
        store: SessionStore,
        tracker: Arc<dyn Tracker>,
        demo: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            settings,
            settings_path,
            store,
            tracker,
            demo,
            agent_verified: AtomicBool::new(false),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
