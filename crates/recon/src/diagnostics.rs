//! Data-quality diagnostics: everything non-fatal an operator should be able to audit.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    FileSkipped,
    ScoreCoerced,
    PercentCoerced,
    QuestionListToken,
    UnrecognizedClass,
    MissingFromResponses,
    MissingFromTotals,
    PossibleDuplicate,
    DuplicateStudent,
    SkillOverlap,
    ResponsesWithoutTotals,
    SkillsWithoutTotals,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileSkipped => "file_skipped",
            Self::ScoreCoerced => "score_coerced",
            Self::PercentCoerced => "percent_coerced",
            Self::QuestionListToken => "question_list_token",
            Self::UnrecognizedClass => "unrecognized_class",
            Self::MissingFromResponses => "missing_from_responses",
            Self::MissingFromTotals => "missing_from_totals",
            Self::PossibleDuplicate => "possible_duplicate",
            Self::DuplicateStudent => "duplicate_student",
            Self::SkillOverlap => "skill_overlap",
            Self::ResponsesWithoutTotals => "responses_without_totals",
            Self::SkillsWithoutTotals => "skills_without_totals",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            class_section: None,
            subject: None,
            file: None,
            message: message.into(),
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            ..Self::warning(kind, message)
        }
    }

    pub fn in_pair(mut self, class_section: &str, subject: &str) -> Self {
        self.class_section = Some(class_section.to_string());
        self.subject = Some(subject.to_string());
        self
    }

    pub fn in_class(mut self, class_section: &str) -> Self {
        self.class_section = Some(class_section.to_string());
        self
    }

    pub fn in_file(mut self, file: &str) -> Self {
        self.file = Some(file.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.kind)?;
        match (&self.class_section, &self.subject) {
            (Some(c), Some(s)) => write!(f, " {c} {s}")?,
            (Some(c), None) => write!(f, " {c}")?,
            _ => {}
        }
        if let Some(ref file) = self.file {
            write!(f, " ({file})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered collection of diagnostics from one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub entries: Vec<Diagnostic>,
}

impl DiagnosticReport {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.extend(diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn counts_by_kind(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "no data-quality issues");
        }
        let warnings = self.warnings().count();
        writeln!(
            f,
            "{} issue(s): {} warning(s), {} info",
            self.entries.len(),
            warnings,
            self.entries.len() - warnings
        )?;
        for d in &self.entries {
            writeln!(f, "  {d}")?;
        }
        Ok(())
    }
}
