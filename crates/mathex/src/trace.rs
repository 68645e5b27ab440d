//! Opt-in diagnostics on stderr, switched on with `MATHEX_TRACE=1`

use std::sync::OnceLock;

/// Whether tracing is enabled, read from the environment once
pub fn enabled() -> bool {
    static TRACE: OnceLock<bool> = OnceLock::new();
    *TRACE.get_or_init(|| {
        std::env::var("MATHEX_TRACE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

macro_rules! trace {
    ($($arg:tt)*) => {
        if $crate::trace::enabled() {
            eprintln!("[mathex] {}", format_args!($($arg)*));
        }
    };
}

pub(crate) use trace;
