//! Restriction-mapper external collaborator (§4.D, §6): invokes the `remap`
//! EMBOSS binary over a hypothetical allele sequence and parses the
//! "# Enzymes that cut" section of its report.
//!
//! Grounded on `original_source/biolib/src/biolib/snv/snv.py::_remap_run`/
//! `_parse_remap_output`.

use std::io::Write as _;
use std::process::Command;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::err::ToolError;

/// The 23 common enzymes used unless `all_enzymes` is requested (§4.D).
pub static COMMON_ENZYMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "ecori", "smai", "bamhi", "alui", "bglii", "sali", "bgli", "clai", "bsteii", "taqi",
        "psti", "pvuii", "hindiii", "ecorv", "xbai", "haeiii", "xhoi", "kpni", "scai", "banii",
        "hinfi", "drai", "apai", "asp718",
    ]
});

/// Minimum recognition-site length passed to `remap` (matches the original's
/// `sitelen` constant).
const SITE_LEN: u32 = 4;

/// Runs `remap` over `sequence` and returns the set of enzymes that cut it.
///
/// Each call uses its own temporary directory so concurrent invocations
/// never collide (§5).
pub fn cutting_enzymes(sequence: &str, all_enzymes: bool) -> Result<Vec<String>, ToolError> {
    let tmp = tempfile::tempdir().map_err(|e| ToolError {
        tool: "remap",
        exit_code: None,
        stderr: format!("failed to create temp dir: {e}"),
    })?;
    let seq_path = tmp.path().join("query.fasta");
    {
        let mut f = std::fs::File::create(&seq_path).map_err(|e| ToolError {
            tool: "remap",
            exit_code: None,
            stderr: format!("failed to write temp fasta: {e}"),
        })?;
        writeln!(f, ">query\n{sequence}").map_err(|e| ToolError {
            tool: "remap",
            exit_code: None,
            stderr: format!("failed to write temp fasta: {e}"),
        })?;
    }

    let enzymes_arg = if all_enzymes {
        "all".to_owned()
    } else {
        COMMON_ENZYMES.join(",")
    };

    let output = Command::new("remap")
        .arg("-sequence")
        .arg(&seq_path)
        .arg("-enzymes")
        .arg(&enzymes_arg)
        .arg("-sitelen")
        .arg(SITE_LEN.to_string())
        .arg("-outfile")
        .arg("stdout")
        .output()
        .map_err(|e| {
            warn!(error = %e, "could not execute remap binary (is it on PATH?)");
            ToolError {
                tool: "remap",
                exit_code: None,
                stderr: format!("could not execute remap binary (is it on PATH?): {e}"),
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        warn!(exit_code = ?output.status.code(), stderr = %stderr, "remap exited with an error");
        return Err(ToolError {
            tool: "remap",
            exit_code: output.status.code(),
            stderr,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_remap_output(&stdout))
}

/// Parses the `# Enzymes that cut` section of a `remap` report.
fn parse_remap_output(report: &str) -> Vec<String> {
    let mut in_cut_section = false;
    let mut enzymes = Vec::new();
    for line in report.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if in_cut_section {
            if line.starts_with('#') {
                in_cut_section = false;
            } else if let Some(name) = line.split_whitespace().next() {
                enzymes.push(name.to_owned());
            }
        }
        if line.starts_with("# Enzymes that cut") {
            in_cut_section = true;
        }
    }
    enzymes
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_enzymes_that_cut_section() {
        let report = "\
Some header
# Enzymes that cut
HinfI        4 6  5'   G^ANTC  3'
TscAI        4 4  5'   CASTG   3'
# Enzymes that do not cut
EcoRI
";
        let enzymes = parse_remap_output(report);
        assert_eq!(enzymes, vec!["HinfI".to_owned(), "TscAI".to_owned()]);
    }

    #[test]
    fn empty_report_yields_no_enzymes() {
        assert!(parse_remap_output("").is_empty());
    }

    #[test]
    fn common_enzyme_list_has_23_entries() {
        assert_eq!(COMMON_ENZYMES.len(), 23);
    }

    #[test]
    fn cutting_enzymes_reports_tool_error_when_remap_is_unavailable() {
        // Installs a real subscriber for the duration of this test so the
        // warn! on the spawn-failure path below runs through an actual
        // formatting layer rather than the global default-no-op subscriber.
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::fmt().with_test_writer().finish(),
        );
        let err = cutting_enzymes("acgtacgtacgt", false).unwrap_err();
        assert_eq!(err.tool, "remap");
    }
}
