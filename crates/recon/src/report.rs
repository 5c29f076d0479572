use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::matcher::{NameIndex, NameOverrides};
use crate::model::{
    ClassReport, GradeSummary, ResponseRow, SchoolAggregate, SchoolInfo, SchoolStatistics,
    SkillPerformance, SkillRow, StudentResult, SubjectSummary,
};
use crate::normalize::{normalize_name, sort_class_sections};
use crate::stats::{describe, percentage, Statistics};

/// One authoritative score row, joined to its sheet's question count.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentScore {
    pub name: String,
    pub score: i64,
    pub total_questions: u32,
}

/// Every source row that reconciles to one canonical (class, subject).
#[derive(Debug, Clone, Default)]
pub struct PairData {
    pub class_section: String,
    pub subject: String,
    pub students: Vec<StudentScore>,
    pub responses: Vec<ResponseRow>,
    /// Skills with overlaps already resolved.
    pub skills: Vec<SkillRow>,
}

impl PairData {
    pub fn new(class_section: &str, subject: &str) -> Self {
        Self {
            class_section: class_section.to_string(),
            subject: subject.to_string(),
            ..Self::default()
        }
    }

    pub fn name_index(&self, overrides: &NameOverrides) -> NameIndex {
        NameIndex::build(
            &self.class_section,
            &self.subject,
            self.students.iter().map(|s| s.name.as_str()),
            overrides,
        )
    }
}

pub type PairKey = (String, String);

/// Build the report for one pair. `None` when it has no student rows.
pub fn build_class_report(
    pair: &PairData,
    overrides: &NameOverrides,
    threshold: f64,
) -> Option<ClassReport> {
    let first = pair.students.first()?;

    // Every totals row looks up its own key, so repeated rows share one response row.
    let mut responses_by_key: HashMap<String, &[u8]> = HashMap::new();
    for row in &pair.responses {
        responses_by_key
            .entry(normalize_name(&row.name))
            .or_insert(&row.responses);
    }

    let students: Vec<StudentResult> = pair
        .students
        .iter()
        .map(|s| {
            let key = overrides.responses_key(&pair.class_section, &pair.subject, &s.name);
            let mut question_responses = responses_by_key
                .get(&key)
                .map(|r| r.to_vec())
                .unwrap_or_default();
            question_responses.truncate(s.total_questions as usize);
            let skill_performance = crate::skills::derive_skill_performance(
                &question_responses,
                &pair.skills,
                s.total_questions,
            );
            StudentResult {
                name: s.name.clone(),
                score: s.score,
                total_questions: s.total_questions,
                percentage: percentage(s.score, s.total_questions),
                question_responses,
                skill_performance,
            }
        })
        .collect();

    let percentages: Vec<f64> = students.iter().map(|s| s.percentage).collect();
    let statistics = describe(&percentages, threshold)?;

    let skills = pair
        .skills
        .iter()
        .map(|s| SkillPerformance {
            skill_name: s.name.clone(),
            questions: s.questions.clone(),
            section_performance: s.section_performance,
            school_performance: s.school_performance,
        })
        .collect();

    Some(ClassReport {
        class_section: pair.class_section.clone(),
        subject: pair.subject.clone(),
        total_students: students.len(),
        total_questions: first.total_questions,
        class_average: statistics.average,
        class_median: statistics.median,
        statistics,
        students,
        skills,
    })
}

/// Assemble the school aggregate from every reconciled pair.
///
/// Classes are ordered by (grade, section) and subjects lexically; reports
/// follow class order, then subject order.
pub fn build_school(
    info: SchoolInfo,
    pairs: &BTreeMap<PairKey, PairData>,
    overrides: &NameOverrides,
    threshold: f64,
) -> SchoolAggregate {
    let present: Vec<&PairData> = pairs.values().filter(|p| !p.students.is_empty()).collect();

    let mut classes: Vec<String> = present
        .iter()
        .map(|p| p.class_section.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    sort_class_sections(&mut classes);

    let subjects: Vec<String> = present
        .iter()
        .map(|p| p.subject.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut reports = Vec::new();
    for class_section in &classes {
        for subject in &subjects {
            let key = (class_section.clone(), subject.clone());
            let Some(pair) = pairs.get(&key) else {
                continue;
            };
            if let Some(report) = build_class_report(pair, overrides, threshold) {
                tracing::info!(
                    class_section = %report.class_section,
                    subject = %report.subject,
                    students = report.total_students,
                    median = report.class_median,
                    average = report.class_average,
                    "built class report"
                );
                reports.push(report);
            }
        }
    }

    let grade_medians = build_grade_summaries(&classes, &reports, threshold);
    let school_statistics = build_school_statistics(&reports, threshold);

    SchoolAggregate {
        school_info: info,
        classes,
        subjects,
        reports,
        grade_medians,
        school_statistics,
    }
}

/// Per-class roll-up over all subjects, plus per-subject median/average.
pub fn build_grade_summaries(
    classes: &[String],
    reports: &[ClassReport],
    threshold: f64,
) -> BTreeMap<String, GradeSummary> {
    let mut out = BTreeMap::new();
    for class_section in classes {
        let class_reports: Vec<&ClassReport> = reports
            .iter()
            .filter(|r| &r.class_section == class_section)
            .collect();
        let all: Vec<f64> = class_reports
            .iter()
            .flat_map(|r| r.students.iter().map(|s| s.percentage))
            .collect();
        let Some(overall) = describe(&all, threshold) else {
            continue;
        };
        let by_subject = class_reports
            .iter()
            .map(|r| {
                (
                    r.subject.clone(),
                    SubjectSummary {
                        median: r.class_median,
                        average: r.class_average,
                    },
                )
            })
            .collect();
        out.insert(
            class_section.clone(),
            GradeSummary {
                overall_median: overall.median,
                overall_average: overall.average,
                by_subject,
            },
        );
    }
    out
}

/// School-wide statistics. Unique students are distinct names per class,
/// summed over classes.
pub fn build_school_statistics(reports: &[ClassReport], threshold: f64) -> SchoolStatistics {
    let all: Vec<f64> = reports
        .iter()
        .flat_map(|r| r.students.iter().map(|s| s.percentage))
        .collect();

    let mut names_by_class: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for r in reports {
        let names = names_by_class.entry(r.class_section.as_str()).or_default();
        for s in &r.students {
            names.insert(s.name.as_str());
        }
    }

    let (median, average) = match describe(&all, threshold) {
        Some(Statistics { median, average, .. }) => (median, average),
        None => (0.0, 0.0),
    };

    SchoolStatistics {
        median,
        average,
        total_students: names_by_class.values().map(BTreeSet::len).sum(),
        total_assessments: all.len(),
    }
}
