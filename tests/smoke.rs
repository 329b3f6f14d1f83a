//! Basic smoke test to verify crate compiles.

#[test]
fn crate_compiles() {
    // If this test runs, the crate skeleton is valid.
    let _ = std::any::type_name::<sentrygate::GateConfig>();
    let _ = std::any::type_name::<sentrygate::SecurityError>();
    let _ = std::any::type_name::<sentrygate::SecurityGate>();
}
