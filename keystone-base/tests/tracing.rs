use keystone_base::{Config, Tracing, TracingConfig};
use tracing_subscriber::util::SubscriberInitExt as _;

#[test]
fn test_init_with_foreign_subscriber() {
    let config = Config::new().with("tracing", TracingConfig::default());
    tracing_subscriber::registry().try_init().unwrap();

    assert!(!Tracing::init(&config).unwrap());
    assert!(!Tracing::is_initialized());

    // Still not installed on a second attempt.
    assert!(!Tracing::init(&config).unwrap());
    assert!(!Tracing::is_initialized());
}
