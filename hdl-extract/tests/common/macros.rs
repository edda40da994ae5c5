#[macro_export]
macro_rules! module_name_tests {
    ($($name:ident => $path:expr, $module:expr),+ $(,)?) => {
        $(
            #[test]
            fn $name() {
                let _ = $crate::common::assert_fixture_module($path, $module);
            }
        )+
    };
}
