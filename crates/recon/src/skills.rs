use std::collections::{BTreeMap, HashMap};

use crate::config::SkillOverlapPolicy;
use crate::error::ReconError;
use crate::model::SkillRow;
use crate::stats::round1;

/// A question number that two skills of one report both claimed.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillOverlap {
    pub question: u32,
    /// Skill that keeps the question.
    pub kept_by: String,
    /// Skill the question was removed from.
    pub dropped_from: String,
}

/// Give every question to at most one skill, per `policy`.
///
/// `LastWins` keeps the question in the skill that appears later in `skills`;
/// `FirstWins` in the earlier one. `Reject` fails on the first overlap.
/// Repeats of a question inside a single skill are collapsed silently.
pub fn resolve_overlaps(
    class_section: &str,
    subject: &str,
    skills: &[SkillRow],
    policy: SkillOverlapPolicy,
) -> Result<(Vec<SkillRow>, Vec<SkillOverlap>), ReconError> {
    let mut owner: HashMap<u32, usize> = HashMap::new();
    let mut overlaps = Vec::new();

    for (si, skill) in skills.iter().enumerate() {
        for &q in &skill.questions {
            match owner.get(&q).copied() {
                None => {
                    owner.insert(q, si);
                }
                Some(prev) if prev == si => {}
                Some(prev) => match policy {
                    SkillOverlapPolicy::Reject => {
                        return Err(ReconError::SkillOverlap {
                            class_section: class_section.to_string(),
                            subject: subject.to_string(),
                            question: q,
                            first: skills[prev].name.clone(),
                            second: skill.name.clone(),
                        });
                    }
                    SkillOverlapPolicy::LastWins => {
                        owner.insert(q, si);
                        overlaps.push(SkillOverlap {
                            question: q,
                            kept_by: skill.name.clone(),
                            dropped_from: skills[prev].name.clone(),
                        });
                    }
                    SkillOverlapPolicy::FirstWins => {
                        overlaps.push(SkillOverlap {
                            question: q,
                            kept_by: skills[prev].name.clone(),
                            dropped_from: skill.name.clone(),
                        });
                    }
                },
            }
        }
    }

    let resolved = skills
        .iter()
        .enumerate()
        .map(|(si, skill)| {
            let mut seen = Vec::new();
            for &q in &skill.questions {
                if owner.get(&q) == Some(&si) && !seen.contains(&q) {
                    seen.push(q);
                }
            }
            SkillRow {
                questions: seen,
                ..skill.clone()
            }
        })
        .collect();

    Ok((resolved, overlaps))
}

/// Per-skill percentage for one student.
///
/// Questions beyond `total_questions` are padding and never count. A skill
/// left with no in-range question is omitted. Missing positions count as wrong.
pub fn derive_skill_performance(
    responses: &[u8],
    skills: &[SkillRow],
    total_questions: u32,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    if responses.is_empty() {
        return out;
    }

    for skill in skills {
        let in_range: Vec<u32> = skill
            .questions
            .iter()
            .copied()
            .filter(|&q| q >= 1 && q <= total_questions)
            .collect();
        if in_range.is_empty() {
            continue;
        }
        let correct = in_range
            .iter()
            .filter(|&&q| responses.get(q as usize - 1).copied() == Some(1))
            .count();
        let pct = round1(correct as f64 / in_range.len() as f64 * 100.0);
        out.insert(skill.name.clone(), pct);
    }

    out
}
