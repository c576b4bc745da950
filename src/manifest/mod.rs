//! Linting for `requirements`-style dependency manifests.
//!
//! One requirement per line, `<name>[extras]<op><version>[,<op><version>...]`,
//! optionally followed by `; marker` and a trailing `# comment`. Blank and
//! comment-only lines are skipped.

mod version;

use std::collections::HashMap;
use std::fmt;

pub use version::{Version, parse_version};

/// Version comparison operators, longest spelling first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    ArbitraryEqual,
    Equal,
    NotEqual,
    LessEqual,
    GreaterEqual,
    Compatible,
    Less,
    Greater,
}

impl Operator {
    const ALL: [Operator; 8] = [
        Operator::ArbitraryEqual,
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessEqual,
        Operator::GreaterEqual,
        Operator::Compatible,
        Operator::Less,
        Operator::Greater,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::ArbitraryEqual => "===",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Compatible => "~=",
            Operator::Less => "<",
            Operator::Greater => ">",
        }
    }

    /// Splits a leading operator off `s`.
    fn split_prefix(s: &str) -> Option<(Operator, &str)> {
        Self::ALL
            .iter()
            .find(|op| s.starts_with(op.as_str()))
            .map(|op| (*op, &s[op.as_str().len()..]))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpec {
    pub operator: Operator,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specs: Vec<VersionSpec>,
    pub marker: Option<String>,
    pub comment: Option<String>,
    /// 1-based line number.
    pub line: usize,
}

impl Requirement {
    /// True for a single exact `==` pin without wildcard.
    pub fn is_pinned(&self) -> bool {
        matches!(self.specs.as_slice(), [spec] if spec.operator == Operator::Equal && !spec.version.ends_with(".*"))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        let specs: Vec<String> = self
            .specs
            .iter()
            .map(|s| format!("{}{}", s.operator, s.version))
            .collect();
        write!(f, "{}", specs.join(","))?;
        if let Some(marker) = &self.marker {
            write!(f, "; {}", marker)?;
        }
        Ok(())
    }
}

/// PEP 503 normalised project name: lowercase, runs of `-`, `_` and `.` folded to `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            in_separator = true;
        } else {
            if in_separator && !out.is_empty() {
                out.push('-');
            }
            in_separator = false;
            out.push(ch.to_ascii_lowercase());
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Syntax,
    DuplicateName,
    InvalidVersion,
    Unpinned,
    Spacing,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::Syntax | IssueKind::DuplicateName | IssueKind::InvalidVersion => {
                Severity::Error
            }
            IssueKind::Unpinned | IssueKind::Spacing => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub line: usize,
    pub kind: IssueKind,
    pub message: String,
}

impl LintIssue {
    fn new(line: usize, kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.severity(), self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub requirements: Vec<Requirement>,
}

impl Manifest {
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let wanted = normalize_name(name);
        self.requirements
            .iter()
            .find(|r| normalize_name(&r.name) == wanted)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LintReport {
    pub requirements: Vec<Requirement>,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    /// True when no issue is an error. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }
}

/// Parses a manifest, failing with every error found. Warnings are dropped.
pub fn parse(text: &str) -> Result<Manifest, Vec<LintIssue>> {
    let report = lint(text);
    if report.is_ok() {
        Ok(Manifest {
            requirements: report.requirements,
        })
    } else {
        Err(report
            .issues
            .into_iter()
            .filter(|i| i.severity() == Severity::Error)
            .collect())
    }
}

/// Checks every line and collects all issues, in line order.
pub fn lint(text: &str) -> LintReport {
    let mut report = LintReport::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let Some(requirement) = parse_line(line, raw, &mut report.issues) else {
            continue;
        };

        let key = normalize_name(&requirement.name);
        if let Some(first) = seen.get(&key) {
            report.issues.push(LintIssue::new(
                line,
                IssueKind::DuplicateName,
                format!(
                    "'{}' is already required on line {}",
                    requirement.name, first
                ),
            ));
            continue;
        }
        seen.insert(key, line);
        report.requirements.push(requirement);
    }

    report
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Parses one line. Returns None for blank, comment-only and broken lines.
fn parse_line(line: usize, raw: &str, issues: &mut Vec<LintIssue>) -> Option<Requirement> {
    let (content, comment) = match raw.find('#') {
        Some(i) => (&raw[..i], Some(raw[i + 1..].trim().to_string())),
        None => (raw, None),
    };
    let content = content.trim();
    if content.is_empty() {
        return None;
    }

    let mut syntax = |message: String| {
        issues.push(LintIssue::new(line, IssueKind::Syntax, message));
        None
    };

    if content.starts_with('-') {
        return syntax(format!("installer option '{}' is not a requirement", content));
    }

    let (content, marker) = match content.split_once(';') {
        Some((req, marker)) => (req.trim_end(), Some(marker.trim().to_string())),
        None => (content, None),
    };

    let name_len = content.find(|c: char| !is_name_char(c)).unwrap_or(content.len());
    let name = &content[..name_len];
    let valid_edges = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());
    if name.is_empty() || !valid_edges {
        return syntax(format!("'{}' does not start with a valid package name", content));
    }

    let mut rest = &content[name_len..];
    let mut extras = Vec::new();
    if let Some(after) = rest.trim_start().strip_prefix('[') {
        let Some((inner, tail)) = after.split_once(']') else {
            return syntax(format!("unclosed extras in '{}'", content));
        };
        for extra in inner.split(',').map(str::trim) {
            if extra.is_empty() || !extra.chars().all(is_name_char) {
                return syntax(format!("invalid extra '{}' for '{}'", extra, name));
            }
            extras.push(extra.to_string());
        }
        rest = tail;
    }

    let mut requirement = Requirement {
        name: name.to_string(),
        extras,
        specs: Vec::new(),
        marker,
        comment,
        line,
    };

    if rest.trim().is_empty() {
        issues.push(LintIssue::new(
            line,
            IssueKind::Unpinned,
            format!("'{}' has no version constraint", name),
        ));
        return Some(requirement);
    }

    let mut spaced = false;
    // Whitespace before any operator counts, including after a comma.
    for part in rest.split(',') {
        let trimmed = part.trim_start();
        if trimmed.len() != part.len() {
            spaced = true;
        }

        let Some((operator, after_op)) = Operator::split_prefix(trimmed) else {
            issues.push(LintIssue::new(
                line,
                IssueKind::Syntax,
                format!("expected a version operator in '{}'", part.trim()),
            ));
            return None;
        };
        if after_op.starts_with(char::is_whitespace) {
            spaced = true;
        }

        let version = after_op.trim();
        if version.is_empty() || version.contains(char::is_whitespace) {
            issues.push(LintIssue::new(
                line,
                IssueKind::Syntax,
                format!("missing or malformed version after '{}'", operator),
            ));
            return None;
        }

        if let Some(message) = check_version(operator, version) {
            issues.push(LintIssue::new(line, IssueKind::InvalidVersion, message));
        }

        requirement.specs.push(VersionSpec {
            operator,
            version: version.to_string(),
        });
    }

    if spaced {
        issues.push(LintIssue::new(
            line,
            IssueKind::Spacing,
            format!("whitespace around the version operator of '{}'", name),
        ));
    }

    Some(requirement)
}

/// Returns a message when `version` is not acceptable for `operator`.
fn check_version(operator: Operator, version: &str) -> Option<String> {
    // `===` compares strings verbatim.
    if operator == Operator::ArbitraryEqual {
        return None;
    }
    let allow_wildcard = matches!(operator, Operator::Equal | Operator::NotEqual);
    match parse_version(version, allow_wildcard) {
        None => Some(format!("'{}' is not a valid PEP 440 version", version)),
        Some(v) if operator == Operator::Compatible && v.release.len() < 2 => Some(format!(
            "'~={}' needs at least two release segments",
            version
        )),
        Some(_) => None,
    }
}
