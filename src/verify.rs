// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! Static checks of a project before it's played.

use std::collections::{BTreeMap, HashSet};

use crate::{
    config::Project,
    sequencer::transport::{MAX_BARS, MAX_BPM, MIN_BARS, MIN_BPM},
};

/// Severity level for a verification issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single verification issue found during checking.
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub category: &'static str,
    /// What the issue is about: a pad id, or "transport"/"pattern".
    pub subject: String,
    pub message: String,
}

impl Issue {
    fn warning(category: &'static str, subject: &str, message: String) -> Issue {
        Issue {
            severity: Severity::Warning,
            category,
            subject: subject.to_string(),
            message,
        }
    }

    fn error(category: &'static str, subject: &str, message: String) -> Issue {
        Issue {
            severity: Severity::Error,
            category,
            subject: subject.to_string(),
            message,
        }
    }
}

/// Result of verifying a project.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub issues: Vec<Issue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: VerificationReport) {
        self.issues.extend(other.issues);
    }
}

/// Checks that the transport is playable. Out of range values are clamped when played.
pub fn check_transport(project: &Project) -> Vec<Issue> {
    let transport = project.transport();
    let mut issues = Vec::new();
    if transport.bpm.is_nan() || transport.bpm < MIN_BPM || transport.bpm > MAX_BPM {
        issues.push(Issue::warning(
            "transport",
            "transport",
            format!(
                "bpm {} is outside {}-{} and will be clamped",
                transport.bpm, MIN_BPM, MAX_BPM
            ),
        ));
    }
    if transport.bars < MIN_BARS || transport.bars > MAX_BARS {
        issues.push(Issue::warning(
            "transport",
            "transport",
            format!(
                "{} bars is outside {}-{} and will be clamped",
                transport.bars, MIN_BARS, MAX_BARS
            ),
        ));
    }
    if transport.steps_per_bar == 0 {
        issues.push(Issue::error(
            "transport",
            "transport",
            "steps per bar is zero, nothing will play".to_string(),
        ));
    }
    issues
}

/// Checks the pattern against the pads and the transport.
pub fn check_pattern(project: &Project) -> Vec<Issue> {
    let Some(pattern) = project.pattern() else {
        return Vec::new();
    };
    let pad_ids: HashSet<&str> = project.pads().iter().map(|pad| pad.id.as_str()).collect();
    let length = project.transport().clamped().pattern_length();
    let mut issues = Vec::new();

    if pattern.length() != length {
        issues.push(Issue::warning(
            "pattern",
            "pattern",
            format!(
                "pattern length {} doesn't match the transport ({} steps)",
                pattern.length(),
                length
            ),
        ));
    }

    let mut unknown: BTreeMap<&str, usize> = BTreeMap::new();
    let mut beyond = 0;
    for (step, pads) in pattern.iter() {
        if step >= length {
            beyond += 1;
        }
        for id in pads.iter().filter(|id| !pad_ids.contains(id.as_str())) {
            *unknown.entry(id.as_str()).or_default() += 1;
        }
    }
    if beyond > 0 {
        issues.push(Issue::warning(
            "pattern",
            "pattern",
            format!("{} step(s) are beyond the end of the pattern and won't play", beyond),
        ));
    }
    for (id, count) in unknown {
        issues.push(Issue::warning(
            "pattern",
            id,
            format!("pattern triggers unknown pad {} at {} step(s)", id, count),
        ));
    }
    issues
}

/// Checks the sample assignments: every sample names a pad, every file exists and every pad
/// the pattern plays has a sample.
pub fn check_samples(project: &Project) -> Vec<Issue> {
    let pad_ids: HashSet<&str> = project.pads().iter().map(|pad| pad.id.as_str()).collect();
    let samples = project.sample_paths();
    let mut issues = Vec::new();

    for (pad_id, path) in &samples {
        if !pad_ids.contains(pad_id.as_str()) {
            issues.push(Issue::error(
                "samples",
                pad_id,
                format!("sample {} is assigned to an unknown pad", path.display()),
            ));
        }
        if !path.is_file() {
            issues.push(Issue::error(
                "samples",
                pad_id,
                format!("sample file {} doesn't exist", path.display()),
            ));
        }
    }

    let with_samples: HashSet<&str> = samples.iter().map(|(id, _)| id.as_str()).collect();
    let played: HashSet<&str> = project
        .pattern()
        .map(|pattern| {
            pattern
                .active_steps()
                .flat_map(|(_, pads)| pads.iter().map(String::as_str))
                .collect()
        })
        .unwrap_or_default();
    let mut silent: Vec<&str> = played
        .into_iter()
        .filter(|id| pad_ids.contains(id) && !with_samples.contains(id))
        .collect();
    silent.sort_unstable();
    for id in silent {
        issues.push(Issue::warning(
            "samples",
            id,
            "pad is in the pattern but has no sample, it will be silent".to_string(),
        ));
    }
    issues
}

/// Runs every check against the project.
pub fn check_project(project: &Project) -> VerificationReport {
    let mut report = VerificationReport::default();
    report.issues.extend(check_transport(project));
    report.issues.extend(check_pattern(project));
    report.issues.extend(check_samples(project));
    report
}

/// Prints a verification report grouped by subject.
pub fn print_report(report: &VerificationReport, project: &Project) {
    if report.is_clean() {
        println!("\u{2705} {} passed verification.", project.name());
        return;
    }

    let mut by_subject: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
    for issue in &report.issues {
        by_subject.entry(&issue.subject).or_default().push(issue);
    }

    println!("{}", project.name());
    for (subject, issues) in &by_subject {
        let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
        let icon = if has_errors {
            "\u{274c}"
        } else {
            "\u{26a0}\u{fe0f} "
        };
        println!("{} {}", icon, subject);
        for issue in issues {
            let severity_icon = match issue.severity {
                Severity::Warning => "\u{26a0}\u{fe0f} ",
                Severity::Error => "\u{274c}",
            };
            println!(
                "   {} [{}] {}",
                severity_icon, issue.category, issue.message
            );
        }
    }

    println!(
        "\nSummary: {} issue(s) found across {} subject(s).",
        report.issues.len(),
        by_subject.len()
    );
}

#[cfg(test)]
mod test {
    use std::{fs, path::Path};

    use super::*;

    fn load(dir: &Path, yaml: &str) -> Project {
        let path = dir.join("project.yaml");
        fs::write(&path, yaml).unwrap();
        Project::load(&path).unwrap()
    }

    #[test]
    fn test_clean_project() {
        let tempdir = tempfile::tempdir().unwrap();
        fs::write(tempdir.path().join("kick.wav"), b"RIFF").unwrap();
        let project = load(
            tempdir.path(),
            "name: Clean\npattern: {length: 16, steps: {0: [pad-0]}}\nsamples: {pad-0: kick.wav}\n",
        );
        let report = check_project(&project);
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_transport_issues() {
        let tempdir = tempfile::tempdir().unwrap();
        let project = load(
            tempdir.path(),
            "name: Fast\ntransport: {bpm: 300, stepsPerBar: 0, bars: 9}\n",
        );
        let issues = check_transport(&project);
        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].message.contains("300"));
        assert_eq!(issues[2].severity, Severity::Error);
    }

    #[test]
    fn test_clamped_transport() {
        let tempdir = tempfile::tempdir().unwrap();
        let project = load(
            tempdir.path(),
            "name: Huge\ntransport: {bpm: 30, stepsPerBar: 16, bars: 18446744073709551615}\npattern: {length: 128, steps: {0: [pad-0]}}\n",
        );
        let issues = check_transport(&project);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|issue| issue.severity == Severity::Warning));
        assert!(issues[0].message.contains("bpm 30"));
        assert!(issues[1].message.contains("will be clamped"));

        // The pattern is checked against the clamped length of 8 bars.
        assert!(check_pattern(&project).is_empty());
        assert!(!check_project(&project).has_errors());
    }

    #[test]
    fn test_pattern_length_uses_clamped_bars() {
        let tempdir = tempfile::tempdir().unwrap();
        let project = load(
            tempdir.path(),
            "name: Long\ntransport: {bpm: 120, stepsPerBar: 16, bars: 12}\npattern: {length: 192, steps: {130: [pad-0]}}\n",
        );
        let issues = check_pattern(&project);
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("(128 steps)"));
        assert!(issues[1].message.contains("1 step(s)"));
    }

    #[test]
    fn test_pattern_issues() {
        let tempdir = tempfile::tempdir().unwrap();
        let project = load(
            tempdir.path(),
            "name: Odd\npattern: {length: 32, steps: {2: [pad-0, ghost], 20: [ghost]}}\n",
        );
        let issues = check_pattern(&project);
        assert_eq!(issues.len(), 3);
        assert!(issues[0].message.contains("length 32"));
        assert!(issues[1].message.contains("1 step(s)"));
        assert_eq!(issues[2].subject, "ghost");
        assert!(issues[2].message.contains("2 step(s)"));
        assert!(!check_project(&project).has_errors());
    }

    #[test]
    fn test_sample_issues() {
        let tempdir = tempfile::tempdir().unwrap();
        let project = load(
            tempdir.path(),
            "name: Missing\npattern: {length: 16, steps: {0: [pad-1], 4: [pad-2]}}\nsamples: {pad-1: snare.wav, pad-99: hat.wav}\n",
        );
        let issues = check_samples(&project);
        let errors: Vec<&Issue> = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .collect();
        // Both files are missing and pad-99 doesn't exist.
        assert_eq!(errors.len(), 3);
        let warnings: Vec<&Issue> = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].subject, "pad-2");
        assert!(check_project(&project).has_errors());
    }

    #[test]
    fn test_verification_report_merge() {
        let mut report_a = VerificationReport::default();
        report_a
            .issues
            .push(Issue::warning("a", "pad-0", "issue a".to_string()));
        let mut report_b = VerificationReport::default();
        report_b
            .issues
            .push(Issue::error("b", "pad-0", "issue b".to_string()));
        assert!(!report_a.has_errors());
        report_a.merge(report_b);
        assert_eq!(report_a.issues.len(), 2);
        assert!(report_a.has_errors());
    }
}
