mod counted;
pub(crate) use counted::Counted;

pub(crate) mod future;
pub(crate) use future::{Gate, YieldOnce};

mod mocks;
pub(crate) use mocks::mock_waker;

/// Installs a `tracing` subscriber printing through the test harness. Filter
/// with `RUST_LOG`, e.g. `RUST_LOG=corolo=trace`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
