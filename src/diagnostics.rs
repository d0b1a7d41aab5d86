//! Fail-fast diagnostics.
//!
//! Every precondition violation in this crate terminates the process with a
//! formatted diagnostic rather than returning an error code. This mirrors
//! the `anvil-memory` C library's `INVARIANT`/`log_and_crash` pair: the
//! macro records what failed, where, and why, then the process aborts.
//! There is no rollback path and no retry.

use std::fs::OpenOptions;
use std::io::Write;

/// Environment variable naming the append-only diagnostic sink file.
///
/// When unset (or when the file can't be opened), diagnostics fall back to
/// `stderr`, mirroring the original C library's `#ifdef LOG_FILE` /
/// `fprintf(stderr, ...)` split.
pub const LOG_FILE_VAR: &str = "ARENALLOC_LOG_FILE";

/// Asserts an invariant; on failure, logs a diagnostic record and aborts the
/// process.
///
/// This is the sole error-reporting path for every programmer-error
/// condition in this crate (non-power-of-two alignment, null/zero-sized
/// requests, out-of-order stack unwinds, backing-allocator exhaustion...).
/// None of these are recoverable, so none of them are modeled as `Result`.
macro_rules! invariant {
    ($cond:expr, $($fmt:tt)*) => {
        if !($cond) {
            $crate::diagnostics::log_and_crash(stringify!($cond), file!(), line!(), format!($($fmt)*))
        }
    };
}

pub(crate) use invariant;

/// Writes a timestamped diagnostic record to the sink and aborts.
///
/// # Record format
/// ```text
/// [<timestamp>] INVARIANT failed: <expr> at <file>:<line>
/// <message>
///
/// ```
#[cold]
#[inline(never)]
pub(crate) fn log_and_crash(expr: &str, file: &str, line: u32, message: String) -> ! {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    let record = format!(
        "[{timestamp}] INVARIANT failed: {expr} at {file}:{line}\n{message}\n\n"
    );

    if !write_to_sink(&record) {
        let _ = std::io::stderr().write_all(record.as_bytes());
        let _ = std::io::stderr().flush();
    }

    std::process::abort()
}

/// Attempts to append `record` to the file named by [`LOG_FILE_VAR`].
/// Returns `false` (so the caller falls back to stderr) if the variable is
/// unset or the file can't be opened for appending.
fn write_to_sink(record: &str) -> bool {
    let Ok(path) = std::env::var(LOG_FILE_VAR) else {
        return false;
    };

    let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) else {
        return false;
    };

    file.write_all(record.as_bytes()).is_ok() && file.flush().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sink_writes_to_named_file() {
        let path = std::env::temp_dir().join(format!("arenalloc-diag-test-{}.log", std::process::id()));
        std::env::set_var(LOG_FILE_VAR, &path);

        let wrote = write_to_sink("[ts] INVARIANT failed: 1 == 2 at x.rs:1\nboom\n\n");
        assert!(wrote);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("boom"));

        std::env::remove_var(LOG_FILE_VAR);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_sink_falls_back_when_unset() {
        std::env::remove_var(LOG_FILE_VAR);
        assert!(!write_to_sink("unused"));
    }
}
