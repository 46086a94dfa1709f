use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Install the tracing subscriber once. `ESCOUADE_LOG` overrides the default
/// filter (`info` for our target, `warn` elsewhere).
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("ESCOUADE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn,escouade=info"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init()
            .ok();
    });
}
