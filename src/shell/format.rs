//! Command-output formatter (spec §2's "Command-output formatter"
//! component): turns the outcome of a foreground shell run into the
//! user-facing string the agent sees, distinguishing cancellation, timeout,
//! and nonzero exit from a clean run.

use std::time::Duration;

/// How a foreground command run concluded.
pub enum Outcome {
    /// The outer (caller-supplied) cancellation token fired first.
    Cancelled,
    /// The inner deadline fired before the outer token and before exit.
    TimedOut(Duration),
    /// The child exited with a nonzero status (or status could not be read).
    ProcessError(String),
    /// The child exited zero.
    Exited,
}

/// Render `outcome` against the raw (merged stdout+stderr) bytes captured so
/// far. Does not apply the 30K output limiter -- callers pass the result
/// through [`crate::limiter::limit_output`] themselves.
pub fn format_outcome(outcome: Outcome, raw: &[u8]) -> String {
    let raw_str = String::from_utf8_lossy(raw);
    match outcome {
        Outcome::Cancelled => "Command cancelled".to_string(),
        Outcome::TimedOut(d) => format!("Command timed out after {}\nOutput: {}", format_duration(d), raw_str),
        Outcome::ProcessError(err) => format!("Error executing command: {err}\nOutput: {raw_str}"),
        Outcome::Exited => {
            let trimmed = raw_str.trim();
            if trimmed.is_empty() {
                "<no output>".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Format a duration the way the literal scenarios in the spec expect
/// (`"1s"` for a one-second timeout): whole seconds render bare, otherwise
/// fall back to a fractional-seconds rendering.
fn format_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_renders_fixed_message() {
        assert_eq!(format_outcome(Outcome::Cancelled, b"whatever"), "Command cancelled");
    }

    #[test]
    fn timed_out_renders_whole_second_duration() {
        let msg = format_outcome(Outcome::TimedOut(Duration::from_secs(1)), b"partial output");
        assert_eq!(msg, "Command timed out after 1s\nOutput: partial output");
    }

    #[test]
    fn process_error_includes_error_and_output() {
        let msg = format_outcome(Outcome::ProcessError("exit status: 1".to_string()), b"stderr text");
        assert_eq!(msg, "Error executing command: exit status: 1\nOutput: stderr text");
    }

    #[test]
    fn exited_trims_and_returns_raw_output() {
        let msg = format_outcome(Outcome::Exited, b"  hello\n");
        assert_eq!(msg, "hello");
    }

    #[test]
    fn exited_with_empty_output_renders_no_output_marker() {
        let msg = format_outcome(Outcome::Exited, b"   \n");
        assert_eq!(msg, "<no output>");
    }
}
