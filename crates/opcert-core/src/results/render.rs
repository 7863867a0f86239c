use crate::TOOL_NAME;
use crate::results::model::{CheckResult, Results};

pub fn render_text(results: &Results) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, results.test_library.version));
    out.push_str(&format!("Image: {}\n", results.image));
    out.push_str(&format!(
        "Result: {}\n",
        if results.passed { "PASSED" } else { "FAILED" }
    ));

    section(&mut out, "Passed", &results.results.passed);
    section(&mut out, "Failed", &results.results.failed);
    section(&mut out, "Errors", &results.results.errors);
    out
}

fn section(out: &mut String, title: &str, checks: &[CheckResult]) {
    if checks.is_empty() {
        return;
    }
    out.push_str(&format!("{title}:\n"));
    for c in checks {
        out.push_str(&format!("  - {} ({} ms)\n", c.name, c.elapsed_ms));
        if let Some(err) = &c.error {
            out.push_str(&format!("      error: {err}\n"));
        }
        if let Some(help) = &c.help {
            out.push_str(&format!("      {}\n", help.message));
            out.push_str(&format!("      suggestion: {}\n", help.suggestion));
        }
    }
}
