//! Derived analyses layered on top of a built [`SchoolAggregate`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::groups::{member_label, SavedGroup};
use crate::model::{ClassReport, SchoolAggregate, SkillPerformance};
use crate::normalize::compare_classes;
use crate::report::{build_grade_summaries, build_school_statistics};
use crate::stats::round1;

/// Cutoffs used by the class skill-gap view.
pub const STRUGGLING_BELOW: f64 = 65.0;
pub const FAILING_BELOW: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectBelow {
    pub subject: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskStudent {
    pub class_section: String,
    pub name: String,
    pub subjects_below: Vec<SubjectBelow>,
}

impl AtRiskStudent {
    pub fn count(&self) -> usize {
        self.subjects_below.len()
    }
}

/// Students below `threshold` in at least `min_subjects` subjects.
///
/// Sorted by number of subjects below (descending), then class, then name.
pub fn at_risk_students(
    school: &SchoolAggregate,
    threshold: f64,
    min_subjects: usize,
) -> Vec<AtRiskStudent> {
    let mut by_student: BTreeMap<(String, String), Vec<SubjectBelow>> = BTreeMap::new();
    for report in &school.reports {
        for s in &report.students {
            let entry = by_student
                .entry((report.class_section.clone(), s.name.clone()))
                .or_default();
            if s.percentage < threshold {
                entry.push(SubjectBelow {
                    subject: report.subject.clone(),
                    percentage: s.percentage,
                });
            }
        }
    }

    let mut out: Vec<AtRiskStudent> = by_student
        .into_iter()
        .filter(|(_, below)| below.len() >= min_subjects.max(1))
        .map(|((class_section, name), subjects_below)| AtRiskStudent {
            class_section,
            name,
            subjects_below,
        })
        .collect();

    out.sort_by(|a, b| {
        b.count()
            .cmp(&a.count())
            .then_with(|| compare_classes(&a.class_section, &b.class_section))
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillGap {
    pub skill_name: String,
    pub class_performance: f64,
    pub students_below_65: usize,
    pub students_below_50: usize,
    pub pct_struggling: f64,
    pub questions: Vec<u32>,
}

/// Skills the class struggles with most, from per-student skill performance.
/// Skills no student has a value for are left out.
pub fn class_skill_gaps(report: &ClassReport) -> Vec<SkillGap> {
    let mut gaps: Vec<SkillGap> = report
        .skills
        .iter()
        .filter_map(|skill| skill_gap(report, skill))
        .collect();
    gaps.sort_by(|a, b| b.pct_struggling.total_cmp(&a.pct_struggling));
    gaps
}

fn skill_gap(report: &ClassReport, skill: &SkillPerformance) -> Option<SkillGap> {
    let perfs: Vec<f64> = report
        .students
        .iter()
        .filter_map(|s| s.skill_performance.get(&skill.skill_name).copied())
        .collect();
    if perfs.is_empty() {
        return None;
    }
    let below_65 = perfs.iter().filter(|&&p| p < STRUGGLING_BELOW).count();
    let below_50 = perfs.iter().filter(|&&p| p < FAILING_BELOW).count();
    Some(SkillGap {
        skill_name: skill.skill_name.clone(),
        class_performance: skill.section_performance,
        students_below_65: below_65,
        students_below_50: below_50,
        pct_struggling: below_65 as f64 / perfs.len() as f64 * 100.0,
        questions: skill.questions.clone(),
    })
}

/// One subject record of a student, with the class context beside it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRecord {
    pub subject: String,
    pub score: i64,
    pub total_questions: u32,
    pub percentage: f64,
    pub class_median: f64,
    pub class_average: f64,
    pub question_responses: Vec<u8>,
    pub skill_performance: BTreeMap<String, f64>,
}

/// Every subject record for one student of one class, in report order.
pub fn student_profile(school: &SchoolAggregate, class_section: &str, name: &str) -> Vec<SubjectRecord> {
    school
        .reports
        .iter()
        .filter(|r| r.class_section == class_section)
        .flat_map(|r| {
            r.students.iter().filter(|s| s.name == name).map(move |s| SubjectRecord {
                subject: r.subject.clone(),
                score: s.score,
                total_questions: s.total_questions,
                percentage: s.percentage,
                class_median: r.class_median,
                class_average: r.class_average,
                question_responses: s.question_responses.clone(),
                skill_performance: s.skill_performance.clone(),
            })
        })
        .collect()
}

/// Sorted distinct student names of one class.
pub fn class_students(school: &SchoolAggregate, class_section: &str) -> Vec<String> {
    school
        .reports
        .iter()
        .filter(|r| r.class_section == class_section)
        .flat_map(|r| r.students.iter().map(|s| s.name.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Copy of `school` limited to `allowed` classes, with school-wide
/// statistics recomputed from the remaining reports.
pub fn restrict_to_classes(
    school: &SchoolAggregate,
    allowed: &[String],
    threshold: f64,
) -> SchoolAggregate {
    let allowed: BTreeSet<&str> = allowed.iter().map(String::as_str).collect();
    let classes: Vec<String> = school
        .classes
        .iter()
        .filter(|c| allowed.contains(c.as_str()))
        .cloned()
        .collect();
    let reports: Vec<ClassReport> = school
        .reports
        .iter()
        .filter(|r| allowed.contains(r.class_section.as_str()))
        .cloned()
        .collect();

    SchoolAggregate {
        school_info: school.school_info.clone(),
        grade_medians: build_grade_summaries(&classes, &reports, threshold),
        school_statistics: build_school_statistics(&reports, threshold),
        classes,
        subjects: school.subjects.clone(),
        reports,
    }
}

// ---------------------------------------------------------------------------
// Cross-class groups
// ---------------------------------------------------------------------------

/// A student's record in one subject, tagged with the class it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStudent {
    pub name: String,
    pub class_section: String,
    /// Group label, `"NAME (class)"`.
    pub display: String,
    pub score: i64,
    pub total_questions: u32,
    pub percentage: f64,
    pub question_responses: Vec<u8>,
    pub skill_performance: BTreeMap<String, f64>,
}

/// Every student of every class that sat `subject`, in report order.
pub fn students_for_subject(school: &SchoolAggregate, subject: &str) -> Vec<SubjectStudent> {
    school
        .reports
        .iter()
        .filter(|r| r.subject == subject)
        .flat_map(|r| {
            r.students.iter().map(move |s| SubjectStudent {
                name: s.name.clone(),
                class_section: r.class_section.clone(),
                display: member_label(&s.name, &r.class_section),
                score: s.score,
                total_questions: s.total_questions,
                percentage: s.percentage,
                question_responses: s.question_responses.clone(),
                skill_performance: s.skill_performance.clone(),
            })
        })
        .collect()
}

/// Members of a saved group that still exist in the aggregate.
pub fn group_members(school: &SchoolAggregate, group: &SavedGroup) -> Vec<SubjectStudent> {
    let wanted: BTreeSet<&str> = group.students.iter().map(String::as_str).collect();
    students_for_subject(school, &group.subject)
        .into_iter()
        .filter(|s| wanted.contains(s.display.as_str()))
        .collect()
}

/// Skill taxonomy per class for `subject`. Classes without skills are left out.
pub fn skills_by_class(school: &SchoolAggregate, subject: &str) -> BTreeMap<String, Vec<SkillPerformance>> {
    school
        .reports
        .iter()
        .filter(|r| r.subject == subject && !r.skills.is_empty())
        .map(|r| (r.class_section.clone(), r.skills.clone()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossGradeSkills {
    /// Classes represented in the group, in class order.
    pub grades_in_group: Vec<String>,
    /// Skills every represented class was tested on, as listed by the first class.
    pub common_skills: Vec<SkillPerformance>,
    /// Skills only some classes were tested on, per class.
    pub grade_specific_skills: BTreeMap<String, Vec<SkillPerformance>>,
    pub all_skills_by_grade: BTreeMap<String, Vec<SkillPerformance>>,
}

/// Split the skills of a mixed-class group into shared and class-specific ones.
///
/// A single-class group treats all of that class's skills as common. A class
/// with no taxonomy contributes an empty skill set, so nothing is common.
pub fn cross_grade_skills(
    students: &[SubjectStudent],
    skills_by_class: &BTreeMap<String, Vec<SkillPerformance>>,
) -> CrossGradeSkills {
    let mut grades: Vec<String> = students
        .iter()
        .map(|s| s.class_section.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    grades.sort_by(|a, b| compare_classes(a, b));

    if grades.len() <= 1 {
        let Some(skills) = grades.first().and_then(|g| skills_by_class.get(g)) else {
            return CrossGradeSkills {
                grades_in_group: grades,
                ..CrossGradeSkills::default()
            };
        };
        return CrossGradeSkills {
            common_skills: skills.clone(),
            all_skills_by_grade: BTreeMap::from([(grades[0].clone(), skills.clone())]),
            grades_in_group: grades,
            grade_specific_skills: BTreeMap::new(),
        };
    }

    let all_skills_by_grade: BTreeMap<String, Vec<SkillPerformance>> = grades
        .iter()
        .map(|g| (g.clone(), skills_by_class.get(g).cloned().unwrap_or_default()))
        .collect();
    let mut common = skill_names(all_skills_by_grade.get(&grades[0]));
    for g in &grades[1..] {
        let other = skill_names(all_skills_by_grade.get(g));
        common.retain(|n| other.contains(n));
    }

    let common_skills: Vec<SkillPerformance> = all_skills_by_grade
        .get(&grades[0])
        .map(|skills| {
            skills
                .iter()
                .filter(|s| common.contains(s.skill_name.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let mut grade_specific_skills = BTreeMap::new();
    for g in &grades {
        let specific: Vec<SkillPerformance> = all_skills_by_grade
            .get(g)
            .map(|skills| {
                skills
                    .iter()
                    .filter(|s| !common.contains(s.skill_name.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if !specific.is_empty() {
            grade_specific_skills.insert(g.clone(), specific);
        }
    }

    CrossGradeSkills {
        grades_in_group: grades,
        common_skills,
        grade_specific_skills,
        all_skills_by_grade,
    }
}

fn skill_names(skills: Option<&Vec<SkillPerformance>>) -> BTreeSet<&str> {
    skills
        .map(|skills| skills.iter().map(|s| s.skill_name.as_str()).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSkillGap {
    pub skill_name: String,
    pub group_average: f64,
    pub students_below_65: usize,
    pub students_below_50: usize,
    /// Whole-number percentage of assessed members below 65.
    pub pct_struggling: f64,
    /// Labels of the members below 65, in member order.
    pub needs_help: Vec<String>,
    pub questions: Vec<u32>,
}

/// Skill gaps across a group of students, optionally limited to some classes.
///
/// An empty or absent `target_classes` keeps every member. Skills no member
/// has a value for are left out. Sorted by percentage struggling, descending.
pub fn group_skill_gaps(
    students: &[SubjectStudent],
    skills: &[SkillPerformance],
    target_classes: Option<&[String]>,
) -> Vec<GroupSkillGap> {
    let members: Vec<&SubjectStudent> = match target_classes {
        Some(classes) if !classes.is_empty() => students
            .iter()
            .filter(|s| classes.contains(&s.class_section))
            .collect(),
        _ => students.iter().collect(),
    };

    let mut gaps: Vec<GroupSkillGap> = skills
        .iter()
        .filter_map(|skill| {
            let perfs: Vec<(&SubjectStudent, f64)> = members
                .iter()
                .filter_map(|s| s.skill_performance.get(&skill.skill_name).map(|&p| (*s, p)))
                .collect();
            if perfs.is_empty() {
                return None;
            }
            let needs_help: Vec<String> = perfs
                .iter()
                .filter(|(_, p)| *p < STRUGGLING_BELOW)
                .map(|(s, _)| s.display.clone())
                .collect();
            let below_50 = perfs.iter().filter(|(_, p)| *p < FAILING_BELOW).count();
            let n = perfs.len() as f64;
            Some(GroupSkillGap {
                skill_name: skill.skill_name.clone(),
                group_average: round1(perfs.iter().map(|(_, p)| p).sum::<f64>() / n),
                students_below_65: needs_help.len(),
                students_below_50: below_50,
                pct_struggling: (needs_help.len() as f64 * 100.0 / n).round(),
                needs_help,
                questions: skill.questions.clone(),
            })
        })
        .collect();
    gaps.sort_by(|a, b| b.pct_struggling.total_cmp(&a.pct_struggling));
    gaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SchoolInfo, StudentResult};
    use crate::stats::describe;

    fn student(name: &str, pct: f64, skills: &[(&str, f64)]) -> StudentResult {
        StudentResult {
            name: name.into(),
            score: pct as i64,
            total_questions: 100,
            percentage: pct,
            question_responses: Vec::new(),
            skill_performance: skills.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn report(class_section: &str, subject: &str, students: Vec<StudentResult>) -> ClassReport {
        let pcts: Vec<f64> = students.iter().map(|s| s.percentage).collect();
        let statistics = describe(&pcts, 60.0).unwrap();
        ClassReport {
            class_section: class_section.into(),
            subject: subject.into(),
            total_students: students.len(),
            total_questions: 100,
            class_average: statistics.average,
            class_median: statistics.median,
            statistics,
            students,
            skills: vec![
                SkillPerformance {
                    skill_name: "Reading".into(),
                    questions: vec![1, 2],
                    section_performance: 55.0,
                    school_performance: 60.0,
                },
                SkillPerformance {
                    skill_name: "Writing".into(),
                    questions: vec![3],
                    section_performance: 80.0,
                    school_performance: 70.0,
                },
                SkillPerformance {
                    skill_name: "Listening".into(),
                    questions: vec![4],
                    section_performance: 0.0,
                    school_performance: 0.0,
                },
            ],
        }
    }

    fn school() -> SchoolAggregate {
        let reports = vec![
            report("3-A", "English", vec![student("ADIL", 40.0, &[]), student("RIYA", 90.0, &[])]),
            report("3-A", "Maths", vec![student("ADIL", 55.0, &[]), student("RIYA", 50.0, &[])]),
            report("4-A", "English", vec![student("KAVYA", 30.0, &[])]),
            report("4-A", "Maths", vec![student("KAVYA", 20.0, &[])]),
        ];
        let classes = vec!["3-A".to_string(), "4-A".to_string()];
        SchoolAggregate {
            school_info: SchoolInfo {
                school_name: "T".into(),
                school_code: String::new(),
                assessment_date: String::new(),
                assessment_name: String::new(),
            },
            grade_medians: build_grade_summaries(&classes, &reports, 60.0),
            school_statistics: build_school_statistics(&reports, 60.0),
            classes,
            subjects: vec!["English".into(), "Maths".into()],
            reports,
        }
    }

    #[test]
    fn at_risk_needs_two_subjects() {
        let at_risk = at_risk_students(&school(), 60.0, 2);
        let names: Vec<&str> = at_risk.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["ADIL", "KAVYA"]);
        assert_eq!(at_risk[0].count(), 2);
        assert_eq!(at_risk[0].subjects_below[0].subject, "English");
    }

    #[test]
    fn skill_gaps_sorted_by_struggle() {
        let r = report(
            "3-A",
            "English",
            vec![
                student("A", 50.0, &[("Reading", 40.0), ("Writing", 100.0)]),
                student("B", 70.0, &[("Reading", 60.0), ("Writing", 50.0)]),
            ],
        );
        let gaps = class_skill_gaps(&r);
        assert_eq!(gaps.len(), 2, "Listening has no student values");
        assert_eq!(gaps[0].skill_name, "Reading");
        assert_eq!(gaps[0].students_below_65, 2);
        assert_eq!(gaps[0].students_below_50, 1);
        assert_eq!(gaps[0].pct_struggling, 100.0);
        assert_eq!(gaps[1].pct_struggling, 50.0);
    }

    #[test]
    fn profile_collects_every_subject() {
        let profile = student_profile(&school(), "3-A", "RIYA");
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].subject, "English");
        assert_eq!(profile[0].class_median, 65.0);
        assert_eq!(class_students(&school(), "3-A"), vec!["ADIL", "RIYA"]);
    }

    #[test]
    fn restriction_recomputes_statistics() {
        let limited = restrict_to_classes(&school(), &["4-A".to_string()], 60.0);
        assert_eq!(limited.classes, vec!["4-A"]);
        assert_eq!(limited.reports.len(), 2);
        assert_eq!(limited.school_statistics.total_students, 1);
        assert_eq!(limited.school_statistics.total_assessments, 2);
        assert_eq!(limited.school_statistics.median, 25.0);
        assert!(!limited.grade_medians.contains_key("3-A"));
    }

    fn skill(name: &str, questions: &[u32]) -> SkillPerformance {
        SkillPerformance {
            skill_name: name.into(),
            questions: questions.to_vec(),
            section_performance: 50.0,
            school_performance: 50.0,
        }
    }

    fn mixed_school() -> SchoolAggregate {
        let mut s = school();
        s.reports[0].students[0].skill_performance = [("Reading".to_string(), 40.0)].into();
        s.reports[0].students[1].skill_performance = [("Reading".to_string(), 80.0), ("Writing".to_string(), 60.0)].into();
        s.reports[2].students[0].skill_performance = [("Reading".to_string(), 60.0)].into();
        s.reports[2].skills = vec![skill("Reading", &[1, 2]), skill("Phonics", &[5])];
        s
    }

    #[test]
    fn subject_students_span_classes() {
        let school = mixed_school();
        let english = students_for_subject(&school, "English");
        let labels: Vec<&str> = english.iter().map(|s| s.display.as_str()).collect();
        assert_eq!(labels, vec!["ADIL (3-A)", "RIYA (3-A)", "KAVYA (4-A)"]);
        assert_eq!(english[2].percentage, 30.0);
        assert!(students_for_subject(&school, "Science").is_empty());

        let by_class = skills_by_class(&school, "English");
        assert_eq!(by_class.len(), 2);
        assert_eq!(by_class["4-A"][1].skill_name, "Phonics");
    }

    #[test]
    fn saved_group_resolves_to_members() {
        let group = SavedGroup {
            subject: "English".into(),
            students: vec!["KAVYA (4-A)".into(), "ADIL (3-A)".into(), "GONE (5-A)".into()],
        };
        let members = group_members(&mixed_school(), &group);
        let names: Vec<&str> = members.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ADIL", "KAVYA"]);
    }

    #[test]
    fn cross_grade_skills_split_common_from_specific() {
        let school = mixed_school();
        let students = students_for_subject(&school, "English");
        let split = cross_grade_skills(&students, &skills_by_class(&school, "English"));

        assert_eq!(split.grades_in_group, vec!["3-A", "4-A"]);
        let common: Vec<&str> = split.common_skills.iter().map(|s| s.skill_name.as_str()).collect();
        assert_eq!(common, vec!["Reading"]);
        assert_eq!(split.common_skills[0].section_performance, 55.0, "first class's entry");
        let only_3a: Vec<&str> = split.grade_specific_skills["3-A"].iter().map(|s| s.skill_name.as_str()).collect();
        assert_eq!(only_3a, vec!["Writing", "Listening"]);
        assert_eq!(split.grade_specific_skills["4-A"][0].skill_name, "Phonics");
        assert_eq!(split.all_skills_by_grade["4-A"].len(), 2);
    }

    #[test]
    fn single_class_group_has_only_common_skills() {
        let school = mixed_school();
        let students: Vec<SubjectStudent> = students_for_subject(&school, "English")
            .into_iter()
            .filter(|s| s.class_section == "3-A")
            .collect();
        let split = cross_grade_skills(&students, &skills_by_class(&school, "English"));
        assert_eq!(split.grades_in_group, vec!["3-A"]);
        assert_eq!(split.common_skills.len(), 3);
        assert!(split.grade_specific_skills.is_empty());

        let none = cross_grade_skills(&[], &skills_by_class(&school, "English"));
        assert!(none.grades_in_group.is_empty());
        assert!(none.common_skills.is_empty());
    }

    #[test]
    fn class_without_taxonomy_leaves_nothing_common() {
        let school = mixed_school();
        let students = students_for_subject(&school, "English");
        let mut by_class = skills_by_class(&school, "English");
        by_class.remove("4-A");
        let split = cross_grade_skills(&students, &by_class);
        assert!(split.common_skills.is_empty());
        assert!(split.all_skills_by_grade["4-A"].is_empty());
        assert_eq!(split.grade_specific_skills["3-A"].len(), 3);
    }

    #[test]
    fn group_gaps_label_members_and_round() {
        let school = mixed_school();
        let students = students_for_subject(&school, "English");
        let skills = vec![skill("Writing", &[3]), skill("Reading", &[1, 2]), skill("Listening", &[4])];

        let gaps = group_skill_gaps(&students, &skills, None);
        assert_eq!(gaps.len(), 2, "no member has Listening");
        assert_eq!(gaps[0].skill_name, "Writing");
        assert_eq!(gaps[0].pct_struggling, 100.0);
        assert_eq!(gaps[0].needs_help, vec!["RIYA (3-A)"]);

        let reading = &gaps[1];
        assert_eq!(reading.skill_name, "Reading");
        assert_eq!(reading.group_average, 60.0);
        assert_eq!(reading.students_below_65, 2);
        assert_eq!(reading.students_below_50, 1);
        assert_eq!(reading.pct_struggling, 67.0);
        assert_eq!(reading.needs_help, vec!["ADIL (3-A)", "KAVYA (4-A)"]);
        assert_eq!(reading.questions, vec![1, 2]);

        let grade_4a = vec!["4-A".to_string()];
        let only_4a = group_skill_gaps(&students, &skills, Some(grade_4a.as_slice()));
        assert_eq!(only_4a.len(), 1);
        assert_eq!(only_4a[0].needs_help, vec!["KAVYA (4-A)"]);
        assert_eq!(only_4a[0].group_average, 60.0);

        let no_filter: &[String] = &[];
        assert_eq!(group_skill_gaps(&students, &skills, Some(no_filter)).len(), 2);
        assert!(group_skill_gaps(&[], &skills, None).is_empty());
    }
}
