use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(filter)
            .try_init();
    });
}

/// Write a one-device /proc/diskstats fixture and return its path
#[allow(dead_code)]
pub fn diskstats_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("diskstats");
    std::fs::write(
        &path,
        "   8       0 sda 1000 50 1000000 4000 500 20 500000 3000 0 6000 7000\n",
    )
    .expect("write diskstats fixture");
    path
}
