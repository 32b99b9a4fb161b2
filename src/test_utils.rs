//! Test utilities.
//!
//! Shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Constructors for an isolated flush host plus root zone pair
//!
//! # Example
//! ```
//! use zonal::test_utils::{init_test_logging, test_root};
//!
//! init_test_logging();
//! let (host, root) = test_root();
//! root.run(|| {
//!     // code scheduling into `host`
//! });
//! host.flush().expect("flush");
//! ```

use std::sync::{Arc, Once};

use crate::host::{FlushHost, HostConfig};
use crate::zone::Zone;

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Creates an isolated flush host and a root zone backed by it.
///
/// Every call returns a fresh pair, so parallel tests never share a
/// queue or an uncaught log.
#[must_use]
pub fn test_root() -> (Arc<FlushHost>, Zone) {
    test_root_with_config(HostConfig::new())
}

/// Creates an isolated flush host with an explicit configuration.
#[must_use]
pub fn test_root_with_config(config: HostConfig) -> (Arc<FlushHost>, Zone) {
    let host = Arc::new(FlushHost::with_config(config));
    let root = Zone::root_with_host(host.clone());
    (host, root)
}
