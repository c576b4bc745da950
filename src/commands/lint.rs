use anyhow::{Result, bail};
use log::debug;
use std::io::Write;
use std::path::Path;

use crate::manifest;
use crate::runtime::Runtime;

/// Lints a manifest, printing every issue. Fails when any issue is an error.
#[tracing::instrument(skip(runtime, out))]
pub fn lint<R: Runtime, W: Write>(runtime: &R, path: &Path, list: bool, out: &mut W) -> Result<()> {
    let content = runtime.read_to_string(path)?;
    let report = manifest::lint(&content);
    debug!(
        "Linted {} requirement(s) from {:?}",
        report.requirements.len(),
        path
    );

    if list {
        for requirement in &report.requirements {
            writeln!(out, "{}", requirement)?;
        }
    }

    for issue in &report.issues {
        writeln!(out, "{}:{}", path.display(), issue)?;
    }

    writeln!(
        out,
        "{} requirement(s), {} error(s), {} warning(s)",
        report.requirements.len(),
        report.error_count(),
        report.warning_count()
    )?;

    if !report.is_ok() {
        bail!("{} has {} error(s)", path.display(), report.error_count());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    fn runtime_with(content: &'static str) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(content.to_string()));
        runtime
    }

    #[test]
    fn test_lint_clean_manifest_with_list() {
        let runtime = runtime_with("pandas==2.2.2\nxgboost==2.0.3 # ml model\n");
        let mut out = Vec::new();
        lint(&runtime, Path::new("requirements.txt"), true, &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "pandas==2.2.2\nxgboost==2.0.3\n2 requirement(s), 0 error(s), 0 warning(s)\n"
        );
    }

    #[test]
    fn test_lint_reports_issues_and_fails_on_errors() {
        let runtime = runtime_with("pandas==2.2.2\npandas==2.2.1\n");
        let mut out = Vec::new();
        let err = lint(&runtime, Path::new("requirements.txt"), false, &mut out).unwrap_err();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("requirements.txt:line 2: error:"));
        assert!(err.to_string().contains("1 error(s)"));
    }

    #[test]
    fn test_lint_warnings_do_not_fail() {
        let runtime = runtime_with("huggingface_hub == 0.23.4\n");
        let mut out = Vec::new();
        assert!(lint(&runtime, Path::new("r.txt"), false, &mut out).is_ok());
        assert!(String::from_utf8(out).unwrap().contains("1 warning(s)"));
    }
}
