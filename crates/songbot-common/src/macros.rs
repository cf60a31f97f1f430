/// Log an error together with every error in its cause chain.
#[macro_export]
macro_rules! log_error {
    ($e:expr, $fmt:expr $(, $($arg:tt)*)?) => {
        $crate::log_base!(error, $e, $fmt $(, $($arg)*)*)
    };
}

/// Log a warning together with every error in its cause chain.
#[macro_export]
macro_rules! log_warn {
    ($e:expr, $fmt:expr $(, $($arg:tt)*)?) => {
        $crate::log_base!(warn, $e, $fmt $(, $($arg)*)*)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_base {
    ($level:tt, $e:expr, $fmt:expr $(, $($arg:tt)*)?) => {{
        let e = anyhow::Error::from($e);

        ::tracing::$level!($fmt $(, $($arg)*)*);

        for cause in e.chain() {
            ::tracing::$level!("Caused by: {}", cause);
        }
    }};
}
