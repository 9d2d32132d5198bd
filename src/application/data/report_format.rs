use colored::{ColoredString, Colorize};
use fsnap::snapshot::{Lookup, Metadata};
use supports_color::Stream;

use crate::executor::ProbeReport;
use crate::ext::SystemTimeExt;

/// Disables colors when stdout cannot render them.
pub fn configure_colors() {
    if supports_color::on(Stream::Stdout).is_none() {
        colored::control::set_override(false);
    }
}

/// One line per report: pass, where the answer came from, path and what is known about it.
pub fn format_report(report: &ProbeReport) -> String {
    let source = if report.from_cache {
        "cached".green()
    } else {
        "probed".yellow()
    };

    let description = match &report.failure {
        Some(failure) => format!("failed: {failure}").red(),
        None => describe(&report.lookup),
    };

    format!(
        "[pass {}] {} {} {}",
        report.pass,
        source,
        report.path.to_string().bold(),
        description
    )
}

fn describe(lookup: &Lookup) -> ColoredString {
    match lookup {
        Lookup::Complete(Metadata::RegularFile {
            size,
            last_modified,
            fingerprint,
        }) => format!(
            "file, {} bytes, modified at {} ms, fingerprint {}",
            size,
            last_modified.to_unix_millis(),
            fingerprint
        )
        .normal(),
        Lookup::Complete(Metadata::Directory) => "directory, fully listed".cyan(),
        Lookup::Complete(Metadata::Missing) => "missing".red(),
        Lookup::PartialDirectory => "directory".cyan(),
        Lookup::Unknown => "unknown".dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use fsnap::snapshot::RelativePath;
    use rstest::*;

    fn report(lookup: Lookup, from_cache: bool) -> ProbeReport {
        ProbeReport {
            pass: 2,
            path: RelativePath::parse("src/lib.rs").unwrap(),
            lookup,
            from_cache,
            failure: None,
        }
    }

    #[rstest]
    #[case(Lookup::Complete(Metadata::Missing), true, "[pass 2] cached src/lib.rs missing")]
    #[case(Lookup::PartialDirectory, false, "[pass 2] probed src/lib.rs directory")]
    #[case(
        Lookup::Complete(Metadata::Directory),
        true,
        "[pass 2] cached src/lib.rs directory, fully listed"
    )]
    #[case(Lookup::Unknown, false, "[pass 2] probed src/lib.rs unknown")]
    fn formats_plain_reports(
        #[case] lookup: Lookup,
        #[case] from_cache: bool,
        #[case] expected: &str,
    ) {
        colored::control::set_override(false);
        assert_eq!(format_report(&report(lookup, from_cache)), expected);
    }

    #[test]
    fn regular_files_show_their_metadata() {
        colored::control::set_override(false);
        let metadata = Metadata::regular_file(
            42,
            SystemTime::UNIX_EPOCH + Duration::from_millis(1234),
            0xabc_u64,
        );

        assert_eq!(
            format_report(&report(Lookup::Complete(metadata), false)),
            "[pass 2] probed src/lib.rs file, 42 bytes, modified at 1234 ms, fingerprint 0000000000000abc"
        );
    }

    #[test]
    fn failures_replace_the_description() {
        colored::control::set_override(false);
        let failed = ProbeReport {
            failure: Some("unsupported entry".to_string()),
            ..report(Lookup::Unknown, false)
        };

        assert_eq!(
            format_report(&failed),
            "[pass 2] probed src/lib.rs failed: unsupported entry"
        );
    }
}
