//! Pure parsers for probe command output
//!
//! The data contract with a remote host is free-form text, so every parser
//! here is a plain `text -> structured` function, unit-tested against
//! captured command output. A miss leaves the field at its documented
//! default instead of failing the snapshot.

/// Delimiter used by the combined engine probe command line
pub(crate) const PROBE_DELIMITER: char = '|';

/// Default shown when the engine version cannot be read
pub(crate) const UNKNOWN_VERSION: &str = "Unknown";

/// Default shown when uptime cannot be read
pub(crate) const UNKNOWN_UPTIME: &str = "N/A";

/// Parsed result of the combined engine/uptime probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EngineReport {
    pub docker_version: String,
    pub running_containers: u32,
    pub total_containers: u32,
    pub uptime_text: String,
}

impl Default for EngineReport {
    fn default() -> Self {
        Self {
            docker_version: UNKNOWN_VERSION.to_string(),
            running_containers: 0,
            total_containers: 0,
            uptime_text: UNKNOWN_UPTIME.to_string(),
        }
    }
}

/// Parse the two-line engine probe output:
/// line 1: `<version>|<running>|<total>`, line 2: uptime text.
///
/// Every field degrades independently; a half-parsable line still yields
/// whatever it carried.
pub(crate) fn parse_engine_report(text: &str) -> EngineReport {
    let mut report = EngineReport::default();

    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if let Some(probe_line) = lines.next() {
        let mut fields = probe_line.split(PROBE_DELIMITER);

        if let Some(version) = fields.next() {
            let version = version.trim();
            if !version.is_empty() {
                report.docker_version = version.to_string();
            }
        }
        if let Some(running) = fields.next() {
            report.running_containers = running.trim().parse().unwrap_or(0);
        }
        if let Some(total) = fields.next() {
            report.total_containers = total.trim().parse().unwrap_or(0);
        }
    }

    if let Some(uptime) = lines.next() {
        report.uptime_text = uptime.trim_start_matches("up ").trim().to_string();
    }

    report
}

/// Parse a single numeric percentage line (cpu / memory probes).
/// Out-of-range values are clamped to 0..100, since `top`/`free` arithmetic
/// on busy hosts can momentarily overshoot; 0.0 when nothing parseable is
/// present.
pub(crate) fn parse_percent(text: &str) -> f64 {
    text.lines()
        .map(|l| l.trim().trim_end_matches('%'))
        .find_map(|l| l.parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_engine_report() {
        let out = "24.0.7|3|5\nup 2 weeks, 3 days, 4 hours\n";
        let report = parse_engine_report(out);
        assert_eq!(report.docker_version, "24.0.7");
        assert_eq!(report.running_containers, 3);
        assert_eq!(report.total_containers, 5);
        assert_eq!(report.uptime_text, "2 weeks, 3 days, 4 hours");
    }

    #[test]
    fn missing_docker_degrades_version_only() {
        // docker not installed: the subshell expands to nothing
        let out = "|0|0\n1 day\n";
        let report = parse_engine_report(out);
        assert_eq!(report.docker_version, "Unknown");
        assert_eq!(report.running_containers, 0);
        assert_eq!(report.uptime_text, "1 day");
    }

    #[test]
    fn garbage_counts_default_to_zero() {
        let report = parse_engine_report("25.0|three|\nup 5 minutes");
        assert_eq!(report.docker_version, "25.0");
        assert_eq!(report.running_containers, 0);
        assert_eq!(report.total_containers, 0);
    }

    #[test]
    fn empty_output_yields_all_defaults() {
        let report = parse_engine_report("");
        assert_eq!(report, EngineReport::default());
        assert_eq!(report.uptime_text, "N/A");
    }

    #[test]
    fn classic_uptime_line_is_kept_verbatim() {
        let out = "24.0.7|1|1\n 14:12:01 up 3 days,  2:11,  1 user,  load average: 0.00, 0.01, 0.05";
        let report = parse_engine_report(out);
        assert!(report.uptime_text.starts_with("14:12:01"));
    }

    #[test]
    fn percent_parses_plain_number() {
        assert_eq!(parse_percent("42.5\n"), 42.5);
        assert_eq!(parse_percent("  7 "), 7.0);
        assert_eq!(parse_percent("63.2%"), 63.2);
    }

    #[test]
    fn percent_defaults_to_zero_on_garbage() {
        assert_eq!(parse_percent(""), 0.0);
        assert_eq!(parse_percent("awk: not found"), 0.0);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(parse_percent("104.2"), 100.0);
        assert_eq!(parse_percent("-3"), 0.0);
    }
}
