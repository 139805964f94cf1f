use std::io::{self, Write};

/// Logs the error of a `Result` without otherwise handling it.
macro_rules! log_if_err {
    ($result:expr, $fmt:expr) => {{
        if let Err(ref e) = $result {
            error!("{}: {}", $fmt, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)+) => {{
        if let Err(ref e) = $result {
            error!("{}: {}", format_args!($fmt, $($arg)+), e);
        }
    }};
}

/// Flushes stdout, logging any failure.
pub fn flush_stdout() {
    let temp_result = io::stdout().flush();
    log_if_err!(temp_result, "failed to flush stdout");
}
