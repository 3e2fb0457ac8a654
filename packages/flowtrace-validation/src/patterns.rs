//! Architectural-pattern matcher. A trace's ordered technology list
//! is scored against a small fixed catalogue of known layer
//! sequences; the best match above the threshold contributes
//! missing-layer issues, and a trace matching nothing is itself an
//! issue.

use flowtrace_model::{BusinessRuleTrace, IssueType, Severity, ValidationIssue};

/// A named, fixed sequence of expected technologies.
#[derive(Debug, Clone, Copy)]
pub struct ArchitecturalPattern {
    pub name: &'static str,
    pub technologies: &'static [&'static str],
}

/// Catalogue order matters: on tied scores the earlier pattern wins.
pub const PATTERN_CATALOGUE: [ArchitecturalPattern; 4] = [
    ArchitecturalPattern {
        name: "web_mvc",
        technologies: &["JSP", "Struts Action", "Java", "Database"],
    },
    ArchitecturalPattern {
        name: "service_oriented",
        technologies: &["Servlet", "Java Service", "Database"],
    },
    ArchitecturalPattern {
        name: "corba_integration",
        technologies: &["CORBA", "Java Implementation", "Database"],
    },
    ArchitecturalPattern {
        name: "layered_architecture",
        technologies: &["JSP", "Java", "Database"],
    },
];

/// Minimum score for a pattern to be considered a match.
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Best-scoring catalogue pattern for the given technologies, with
/// its score. Score = matched pattern layers / pattern length, where
/// a layer matches if any trace technology shares a case-insensitive
/// substring with it.
pub fn best_match(technologies: &[&str]) -> Option<(&'static ArchitecturalPattern, f64)> {
    let mut best: Option<(&'static ArchitecturalPattern, f64)> = None;
    for pattern in &PATTERN_CATALOGUE {
        let matched = pattern
            .technologies
            .iter()
            .filter(|layer| technology_present(technologies, layer))
            .count();
        let score = matched as f64 / pattern.technologies.len() as f64;

        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((pattern, score));
        }
    }
    best
}

/// Pattern check for one trace: either the selected pattern's missing
/// layers (HIGH missing-link each) or, if nothing scores above the
/// threshold, a single technology-gap issue for the whole trace.
pub fn check_pattern(trace: &BusinessRuleTrace) -> Vec<ValidationIssue> {
    if trace.flow_steps.is_empty() {
        // The empty trace is already critical; no pattern noise on top.
        return vec![];
    }

    let technologies = trace.technologies();
    match best_match(&technologies) {
        Some((pattern, score)) if score > MATCH_THRESHOLD => pattern
            .technologies
            .iter()
            .filter(|layer| !technology_present(&technologies, layer))
            .map(|layer| {
                ValidationIssue::new(
                    IssueType::MissingLink,
                    Severity::High,
                    format!(
                        "trace matches pattern '{}' ({:.0}%) but lacks a '{}' layer",
                        pattern.name,
                        score * 100.0,
                        layer
                    ),
                )
                .with_fix(format!("Extract the '{layer}' hop for this flow"))
                .with_impact(-0.2)
            })
            .collect(),
        _ => vec![ValidationIssue::new(
            IssueType::TechnologyGap,
            Severity::Medium,
            "trace matches no known architectural pattern",
        )
        .with_fix("Verify the extracted layers form a coherent request path")
        .with_impact(-0.1)],
    }
}

fn technology_present(technologies: &[&str], layer: &str) -> bool {
    let layer_lower = layer.to_lowercase();
    technologies.iter().any(|t| {
        let t_lower = t.to_lowercase();
        t_lower.contains(&layer_lower) || layer_lower.contains(&t_lower)
    })
}
