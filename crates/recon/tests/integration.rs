use std::collections::{BTreeSet, HashMap};

use asset_recon::config::{ReconConfig, SkillOverlapPolicy};
use asset_recon::engine::{run, run_with_overrides};
use asset_recon::fidelity::audit;
use asset_recon::model::{
    ReconInput, ResponseRow, ResponseSheet, SkillRow, SkillSheet, TotalsRow, TotalsSheet,
};
use asset_recon::normalize::normalize_class_section;
use asset_recon::stats::median;
use asset_recon::{DiagnosticKind, NameOverrides, ReconError};

fn totals(file: &str, class: &str, subject: &str, total: u32, rows: &[(&str, i64)]) -> TotalsSheet {
    TotalsSheet {
        file: file.into(),
        raw_class: class.into(),
        raw_subject: subject.into(),
        total_questions: total,
        rows: rows
            .iter()
            .map(|(n, s)| TotalsRow {
                name: n.to_string(),
                score: *s,
            })
            .collect(),
    }
}

fn skill(name: &str, questions: &[u32], section: f64) -> SkillRow {
    SkillRow {
        name: name.into(),
        questions: questions.to_vec(),
        section_performance: section,
        school_performance: section - 5.0,
    }
}

/// A small school: two classes, inconsistent labels, one padded response matrix.
fn school_input() -> ReconInput {
    ReconInput {
        totals: vec![
            totals(
                "3A_English.csv",
                "3 A",
                "English",
                35,
                &[("ADIL S GUPTA", 35), ("RIYA SEN", 21), ("MEERA NAIR", 28)],
            ),
            totals(
                "3A_Maths.csv",
                "3-A A",
                "Math",
                2,
                &[("ADIL S GUPTA", 1), ("RIYA SEN", 2), ("MEERA NAIR", 0)],
            ),
            totals(
                "4A_English.csv",
                "4 A",
                "English",
                20,
                &[("KAVYA IYER", 9), ("ARJUN MENON", 17), ("SOHAM DAS", 11), ("ISHA ROY", 15)],
            ),
            totals("4A_Science.csv", "4 A", "Science", 30, &[]),
        ],
        skills: vec![
            SkillSheet {
                file: "3A_Maths_skills.csv".into(),
                raw_class: "3 A".into(),
                raw_subject: "Maths".into(),
                skills: vec![skill("Number sense", &[1, 2, 3], 55.0)],
            },
            SkillSheet {
                file: "4A_English_skills.csv".into(),
                raw_class: "4 A".into(),
                raw_subject: "English".into(),
                skills: vec![
                    skill("Reading", &(1..=10).collect::<Vec<_>>(), 62.0),
                    skill("Grammar", &(11..=20).collect::<Vec<_>>(), 48.0),
                ],
            },
        ],
        responses: vec![
            ResponseSheet {
                file: "3-A_Maths.csv".into(),
                raw_class: "3-A".into(),
                raw_subject: "Maths".into(),
                width: 5,
                rows: vec![
                    ResponseRow { name: "Adil S. Gupta".into(), responses: vec![1, 0, 1, 1, 1] },
                    ResponseRow { name: "RIYA SEN".into(), responses: vec![1, 1, 0, 0, 0] },
                    ResponseRow { name: "MEERA NAIR".into(), responses: vec![0, 0, 0, 0, 0] },
                ],
            },
            ResponseSheet {
                file: "4-A_English.csv".into(),
                raw_class: "4-A".into(),
                raw_subject: "English".into(),
                width: 20,
                rows: vec![
                    ResponseRow { name: "KAVYA IYER".into(), responses: [vec![1; 7], vec![0; 13]].concat() },
                    ResponseRow { name: "ARJUN MENON".into(), responses: vec![1; 20] },
                    ResponseRow { name: "SOHUM DAS".into(), responses: vec![0; 20] },
                ],
            },
        ],
        diagnostics: Vec::new(),
    }
}

// -------------------------------------------------------------------------
// Testable properties
// -------------------------------------------------------------------------

#[test]
fn round_trip_score_fidelity() {
    let input = school_input();
    let result = run(&ReconConfig::default(), &input).unwrap();

    for sheet in &input.totals {
        let class_section = normalize_class_section(&sheet.raw_class);
        let subject = asset_recon::normalize::normalize_subject(&sheet.raw_subject);
        for row in &sheet.rows {
            let report = result.school.report(&class_section, &subject).unwrap();
            let s = report.students.iter().find(|s| s.name == row.name).unwrap();
            assert_eq!(s.score, row.score);
            assert_eq!(s.total_questions, sheet.total_questions);
            let expected = (row.score as f64 / sheet.total_questions as f64 * 1000.0).round() / 10.0;
            assert!((s.percentage - expected).abs() <= 0.1);
        }
    }
}

#[test]
fn medians_match_independent_computation() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    for report in &result.school.reports {
        let pcts: Vec<f64> = report.students.iter().map(|s| s.percentage).collect();
        let expected = median(&pcts).unwrap();
        assert!((report.class_median - expected).abs() <= 0.1, "{}", report.class_section);
    }
}

#[test]
fn counts_and_coverage_are_conserved() {
    let input = school_input();
    let result = run(&ReconConfig::default(), &input).unwrap();

    let source_rows: usize = input.totals.iter().map(|t| t.rows.len()).sum();
    let output_rows: usize = result.school.reports.iter().map(|r| r.students.len()).sum();
    assert_eq!(output_rows, source_rows);
    assert_eq!(result.school.school_statistics.total_assessments, source_rows);

    let pairs: BTreeSet<(String, String)> = result
        .school
        .reports
        .iter()
        .map(|r| (r.class_section.clone(), r.subject.clone()))
        .collect();
    let expected: BTreeSet<(String, String)> = [
        ("3-A", "English"),
        ("3-A", "Maths"),
        ("4-A", "English"),
    ]
    .iter()
    .map(|(c, s)| (c.to_string(), s.to_string()))
    .collect();
    assert_eq!(pairs, expected);

    let fidelity = audit(&ReconConfig::default(), &input, &result.school);
    assert!(fidelity.passed(), "{fidelity}");
}

#[test]
fn adil_scores_full_marks_once() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    let hits: Vec<_> = result
        .school
        .reports
        .iter()
        .filter(|r| r.subject == "English")
        .flat_map(|r| r.students.iter().map(move |s| (r, s)))
        .filter(|(_, s)| s.name == "ADIL S GUPTA")
        .collect();
    assert_eq!(hits.len(), 1);
    let (report, adil) = hits[0];
    assert_eq!(report.class_section, "3-A");
    assert_eq!(adil.score, 35);
    assert_eq!(adil.percentage, 100.0);
}

#[test]
fn skill_derivation_ignores_padding_questions() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    let maths = result.school.report("3-A", "Maths").unwrap();

    let adil = maths.students.iter().find(|s| s.name == "ADIL S GUPTA").unwrap();
    assert_eq!(adil.question_responses, vec![1, 0]);
    assert_eq!(adil.skill_performance["Number sense"], 50.0);

    let riya = maths.students.iter().find(|s| s.name == "RIYA SEN").unwrap();
    assert_eq!(riya.skill_performance["Number sense"], 100.0);

    for s in &maths.students {
        assert!(s.question_responses.len() <= maths.total_questions as usize);
    }
}

#[test]
fn empty_pair_emits_no_report() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    assert!(result.school.report("4-A", "Science").is_none());
    assert!(!result.school.subjects.contains(&"Science".to_string()));
}

// -------------------------------------------------------------------------
// Cross-source behaviour
// -------------------------------------------------------------------------

#[test]
fn unmatched_names_degrade_skill_coverage() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    let english = result.school.report("4-A", "English").unwrap();
    let by_name: HashMap<&str, _> = english.students.iter().map(|s| (s.name.as_str(), s)).collect();

    assert_eq!(by_name["KAVYA IYER"].skill_performance["Reading"], 70.0);
    assert_eq!(by_name["KAVYA IYER"].skill_performance["Grammar"], 0.0);
    assert!(by_name["SOHAM DAS"].skill_performance.is_empty());
    assert!(by_name["ISHA ROY"].skill_performance.is_empty());

    let missing_resp: Vec<_> = result
        .diagnostics
        .of_kind(DiagnosticKind::MissingFromResponses)
        .map(|d| d.message.clone())
        .collect();
    assert_eq!(missing_resp.len(), 2);
    assert_eq!(result.diagnostics.of_kind(DiagnosticKind::MissingFromTotals).count(), 1);
}

#[test]
fn injected_override_restores_join() {
    let mut overrides = NameOverrides::new();
    overrides.insert("4-A", "English", "SOHAM DAS", "SOHUM DAS");

    let result = run_with_overrides(&ReconConfig::default(), &school_input(), &overrides).unwrap();
    let english = result.school.report("4-A", "English").unwrap();
    let soham = english.students.iter().find(|s| s.name == "SOHAM DAS").unwrap();
    assert_eq!(soham.skill_performance["Reading"], 0.0);
    assert_eq!(result.diagnostics.of_kind(DiagnosticKind::MissingFromTotals).count(), 0);
}

#[test]
fn grade_and_school_rollups() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    let school = &result.school;

    assert_eq!(school.classes, vec!["3-A", "4-A"]);
    assert_eq!(school.subjects, vec!["English", "Maths"]);
    // 3 students in 3-A (two subjects each) + 4 in 4-A.
    assert_eq!(school.school_statistics.total_students, 7);

    let grade = &school.grade_medians["3-A"];
    assert_eq!(grade.by_subject.len(), 2);
    assert_eq!(grade.by_subject["Maths"].median, 50.0);
}

#[test]
fn overlap_policy_reject_fails_run() {
    let mut input = school_input();
    input.skills[1].skills.push(skill("Vocabulary", &[10], 50.0));
    let config = ReconConfig {
        skill_overlap: SkillOverlapPolicy::Reject,
        ..ReconConfig::default()
    };
    let err = run(&config, &input).unwrap_err();
    assert!(matches!(err, ReconError::SkillOverlap { question: 10, .. }));

    let lenient = run(&ReconConfig::default(), &input).unwrap();
    assert_eq!(lenient.diagnostics.of_kind(DiagnosticKind::SkillOverlap).count(), 1);
    let english = lenient.school.report("4-A", "English").unwrap();
    assert_eq!(english.skills[0].questions.len(), 9);
    assert_eq!(english.skills[2].questions, vec![10]);
}

#[test]
fn output_serializes_with_contract_field_names() {
    let result = run(&ReconConfig::default(), &school_input()).unwrap();
    let json = serde_json::to_value(&result.school).unwrap();
    for field in ["school_info", "classes", "subjects", "reports", "grade_medians", "school_statistics"] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    let student = &json["reports"][0]["students"][0];
    assert!(student.get("question_responses").is_some());
    assert!(student.get("skill_performance").is_some());
    assert!(json["reports"][0].get("class_median").is_some());

    let back: asset_recon::SchoolAggregate = serde_json::from_value(json).unwrap();
    assert_eq!(back.classes, result.school.classes);
    assert_eq!(back.reports.len(), result.school.reports.len());
    assert_eq!(back.reports[0].students, result.school.reports[0].students);
}
