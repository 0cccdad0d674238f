use std::{sync::Arc, time::Duration};

use crate::browser::{media::MediaPolicy, Sandbox, SandboxError};
use crate::config::AppConfig;
use crate::tracker::RequestTracker;

/// The shared application state.
///
/// Everything except the request tracker is immutable after startup. The
/// tracker carries its own lock, so cloning the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Containment rules for every client path.
    pub sandbox: Arc<Sandbox>,
    /// Extension allow-lists for streamed media.
    pub media: Arc<MediaPolicy>,
    /// In-flight request registry backing `/health` and `/debug/active-requests`.
    pub tracker: RequestTracker,
}

impl AppState {
    /// Creates a new `AppState` from a validated configuration.
    ///
    /// Fails only if the sandbox root cannot be made absolute.
    pub fn new(config: AppConfig) -> Result<Self, SandboxError> {
        let sandbox = Sandbox::new(&config.sandbox.root, config.sandbox.mode)?;
        let media = MediaPolicy::from_config(&config.media);
        let tracker = RequestTracker::new(
            Duration::from_secs(config.limits.slow_request_secs),
            Duration::from_secs(config.limits.long_request_secs),
        );

        Ok(Self {
            config: Arc::new(config),
            sandbox: Arc::new(sandbox),
            media: Arc::new(media),
            tracker,
        })
    }
}
