//! Shared `test!`/`error!` macros for the integration tests, grounded on
//! the teacher's own `tests/macros.rs` convention of one macro per
//! expected outcome rather than hand-writing `#[test] fn` boilerplate
//! per case.

#[allow(unused_macros)]
macro_rules! test {
    ($(#[$attr:meta])* $func:ident, $input:expr, $output:expr) => {
        $(#[$attr])*
        #[test]
        fn $func() {
            let mut sheet = grass::Sheet::new($input, grass::Options::new());
            assert_eq!($output, sheet.css().expect("expected successful compilation"));
        }
    };
}

#[allow(unused_macros)]
macro_rules! error {
    ($(#[$attr:meta])* $func:ident, $input:expr, $err:expr) => {
        $(#[$attr])*
        #[test]
        fn $func() {
            let mut sheet = grass::Sheet::new($input, grass::Options::new());
            let err = sheet.css().expect_err("expected compilation to fail");
            assert_eq!($err, err.to_string_line());
        }
    };
}
