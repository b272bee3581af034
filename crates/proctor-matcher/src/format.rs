use std::fmt::Write;

use proctor_core::Expectation;

use crate::report::Difference;

/// Render differences as an indented block, empty when there are none.
pub fn format_differences(diffs: &[Difference]) -> String {
    if diffs.is_empty() {
        return String::new();
    }
    let mut out = String::from("Differences:\n");
    for d in diffs {
        let _ = writeln!(out, "  [{}] {}:", d.phase, d.path);
        let _ = writeln!(out, "    expected: {}", d.expected);
        let _ = writeln!(out, "    actual:   {}", d.actual);
    }
    out
}

pub fn format_unmatched(unmatched: &[Expectation]) -> String {
    if unmatched.is_empty() {
        return String::new();
    }
    let mut out = String::from("Unmatched expectations:\n");
    for exp in unmatched {
        let _ = writeln!(out, "  - Phase: {}", exp.phase);
        let _ = writeln!(out, "    Type: {}", exp.response.kind_name());
    }
    out
}
