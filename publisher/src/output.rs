//! Progress and summary lines written by the publisher.
//!
//! Progress goes to stderr so that stdout carries only the published URL.

use boxpub::manifest::ProviderChange;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress; a closed stderr must not fail the publish.
    }
}

/// The closing summary shown after a successful publish.
///
/// # Examples
///
/// ```
/// use boxpub::manifest::ProviderChange;
/// use boxpub_publisher::output::success_message;
///
/// let text = success_message("virtualbox", "1.0.0", ProviderChange::Added { new_version: true });
/// assert_eq!(text, "Published virtualbox box as new version 1.0.0");
/// ```
#[must_use]
pub fn success_message(provider: &str, version: &str, change: ProviderChange) -> String {
    match change {
        ProviderChange::Added { new_version: true } => {
            format!("Published {provider} box as new version {version}")
        }
        ProviderChange::Added { new_version: false } => {
            format!("Published {provider} box to existing version {version}")
        }
        ProviderChange::Replaced => {
            format!("Replaced {provider} box in version {version}")
        }
    }
}

/// Render a byte count with a binary unit for progress lines.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes;
    let mut remainder = 0;
    let mut unit = "B";
    for candidate in UNITS {
        if value < 1024 {
            break;
        }
        remainder = value % 1024;
        value /= 1024;
        unit = candidate;
    }
    let tenths = remainder * 10 / 1024;
    format!("{value}.{tenths} {unit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "0 B")]
    #[case(1023, "1023 B")]
    #[case(1024, "1.0 KiB")]
    #[case(1536, "1.5 KiB")]
    #[case(4 * 1024 * 1024, "4.0 MiB")]
    #[case(3 * 1024 * 1024 * 1024 + 512 * 1024 * 1024, "3.5 GiB")]
    fn human_size_formats(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(human_size(bytes), expected);
    }

    #[rstest]
    #[case(ProviderChange::Added { new_version: false }, "Published vmware_desktop box to existing version 1.0.0")]
    #[case(ProviderChange::Replaced, "Replaced vmware_desktop box in version 1.0.0")]
    fn success_message_describes_change(#[case] change: ProviderChange, #[case] expected: &str) {
        assert_eq!(success_message("vmware_desktop", "1.0.0", change), expected);
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }
}
