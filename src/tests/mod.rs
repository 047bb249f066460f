mod timer;

#[test]
fn test_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/owned_and_external.rs");
    t.pass("tests/ui/locked_timer.rs");
    t.pass("tests/ui/interrupt_timer.rs");
}
