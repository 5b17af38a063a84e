/// Install a formatting subscriber for test output. Safe to call from every test.
pub fn try_init_tracing() {
    // Another test in the same binary may already have installed one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_test_writer()
        .try_init();
}
