/// Evaluates `$expr`, logs how long it took under `$label`, and returns its value.
#[allow(unused_macros)]
macro_rules! time_test {
    ($expr:expr, $label:expr) => {{
        let start = std::time::Instant::now();
        let value = $expr;
        log::info!("{}: {:?}", $label, start.elapsed());
        value
    }};
}

#[allow(unused_imports)]
pub(crate) use time_test;

#[test]
fn time_test_returns_value() {
    let value = time_test!((1..=10).sum::<i32>(), "sum");
    assert_eq!(value, 55);
}
