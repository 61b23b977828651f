use hk_telemetry::logging;

#[test]
fn repeated_init_is_a_no_op() {
    logging::init_logging("hawker-test", "debug");
    logging::init_logging("hawker-test", "info");
    // The global subscriber is already installed by now, so the json
    // variant silently backs off instead of panicking.
    logging::init_logging_json("hawker-test", "info");

    tracing::info!(key = "value", "log line after repeated init");
}

#[test]
fn missing_rust_log_falls_back_to_default() {
    std::env::remove_var("RUST_LOG");
    logging::init_logging("hawker-fallback", "warn");
}
