//! The rule battery. Each rule is independent, reads an immutable
//! trace snapshot, and returns zero or more issues. A rule that fails
//! is converted by the engine into a HIGH incomplete-trace issue
//! naming it, so one bad rule never hides the others.

use crate::error::Result;
use flowtrace_model::{BusinessRuleTrace, IssueType, Severity, ValidationIssue};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

pub type RuleFn = fn(&BusinessRuleTrace) -> Result<Vec<ValidationIssue>>;

/// Named rules, in execution order.
pub fn all_rules() -> &'static [(&'static str, RuleFn)] {
    &[
        ("step_sequence", check_step_sequence),
        ("dependency_consistency", check_dependency_consistency),
        ("confidence_thresholds", check_confidence_thresholds),
        ("technology_transitions", check_technology_transitions),
        ("file_path_sanity", check_file_paths),
        ("business_logic_completeness", check_business_logic),
        ("circular_dependency", check_circular_dependencies),
        ("duplicate_steps", check_duplicate_steps),
    ]
}

/// Valid next-technologies for a flow hop. A transition outside this
/// table is flagged unless the two technology names share a
/// case-insensitive substring.
static TECHNOLOGY_TRANSITIONS: Lazy<HashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert("JSP", &["Struts Action", "Java", "Servlet"]);
        m.insert("Struts Action", &["Java", "Java Service", "EJB"]);
        m.insert("Java", &["Database", "SQL", "Java", "CORBA", "Web Service"]);
        m.insert("Java Service", &["Database", "Java"]);
        m.insert("Servlet", &["Java", "JSP", "Database"]);
        m.insert("CORBA", &["Java Implementation", "Java"]);
        m.insert("Angular", &["REST API", "Java"]);
        m
    });

/// Empty trace is critical; any non-contiguous step order is a gap.
fn check_step_sequence(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    if trace.flow_steps.is_empty() {
        return Ok(vec![ValidationIssue::new(
            IssueType::IncompleteTrace,
            Severity::Critical,
            "trace contains no flow steps",
        )
        .with_fix("Re-run extraction for this business rule")
        .with_impact(-1.0)]);
    }

    let mut issues = Vec::new();
    for pair in trace.flow_steps.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if b.step_order != a.step_order + 1 {
            issues.push(
                ValidationIssue::new(
                    IssueType::MissingLink,
                    Severity::High,
                    format!(
                        "step order gap between {} ({}) and {} ({})",
                        a.step_order, a.component_name, b.step_order, b.component_name
                    ),
                )
                .affecting(vec![a.step_order, b.step_order])
                .with_fix("Extract the intermediate step or renumber the trace")
                .with_impact(-0.1),
            );
        }
    }
    Ok(issues)
}

/// Every declared dependency must appear in the component name of
/// some earlier step.
fn check_dependency_consistency(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for (i, step) in trace.flow_steps.iter().enumerate() {
        for dep in &step.dependencies {
            let satisfied = trace.flow_steps[..i]
                .iter()
                .any(|earlier| earlier.component_name.contains(dep.as_str()));
            if !satisfied {
                issues.push(
                    ValidationIssue::new(
                        IssueType::BrokenDependency,
                        Severity::Medium,
                        format!(
                            "step {} ({}) depends on '{}' which no earlier step provides",
                            step.step_order, step.component_name, dep
                        ),
                    )
                    .affecting(vec![step.step_order])
                    .with_fix(format!("Add a step providing '{dep}' before step {}", step.step_order))
                    .with_impact(-0.1),
                );
            }
        }
    }
    Ok(issues)
}

/// Steps below the 0.3 confidence floor; below 0.1 is critical.
fn check_confidence_thresholds(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for step in &trace.flow_steps {
        if step.confidence_score < 0.3 {
            let severity = if step.confidence_score < 0.1 {
                Severity::Critical
            } else {
                Severity::High
            };
            issues.push(
                ValidationIssue::new(
                    IssueType::LowConfidence,
                    severity,
                    format!(
                        "step {} ({}) extracted with confidence {:.2}",
                        step.step_order, step.component_name, step.confidence_score
                    ),
                )
                .affecting(vec![step.step_order])
                .with_fix("Review the source file manually")
                .with_impact(-0.2),
            );
        }
    }
    Ok(issues)
}

/// Consecutive technologies must be on the allow-list or share a
/// case-insensitive substring.
fn check_technology_transitions(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for pair in trace.flow_steps.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if transition_allowed(&a.technology, &b.technology) {
            continue;
        }
        issues.push(
            ValidationIssue::new(
                IssueType::TechnologyGap,
                Severity::Medium,
                format!(
                    "unusual transition from '{}' (step {}) to '{}' (step {})",
                    a.technology, a.step_order, b.technology, b.step_order
                ),
            )
            .affecting(vec![a.step_order, b.step_order])
            .with_fix("Verify no intermediate layer was dropped during extraction")
            .with_impact(-0.05),
        );
    }
    Ok(issues)
}

fn transition_allowed(from: &str, to: &str) -> bool {
    if let Some(allowed) = TECHNOLOGY_TRANSITIONS.get(from) {
        if allowed.iter().any(|t| t.eq_ignore_ascii_case(to)) {
            return true;
        }
    }
    // Related technologies often embed each other's names
    // ("Java" / "Java Service").
    let from_lower = from.to_lowercase();
    let to_lower = to.to_lowercase();
    from_lower.contains(&to_lower) || to_lower.contains(&from_lower)
}

const CONFIG_KEYWORDS: [&str; 4] = ["xml", "properties", "yml", "conf"];

/// Missing file paths are medium; implausibly short ones are low.
fn check_file_paths(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for step in &trace.flow_steps {
        let path = step.file_path.trim();
        if path.is_empty() {
            issues.push(
                ValidationIssue::new(
                    IssueType::IncompleteTrace,
                    Severity::Medium,
                    format!("step {} ({}) has no file path", step.step_order, step.component_name),
                )
                .affecting(vec![step.step_order])
                .with_fix("Record the source file during extraction")
                .with_impact(-0.1),
            );
        } else if path.len() < 3
            && !path.contains('.')
            && !CONFIG_KEYWORDS.iter().any(|k| path.contains(k))
        {
            issues.push(
                ValidationIssue::new(
                    IssueType::IncompleteTrace,
                    Severity::Low,
                    format!(
                        "step {} has an implausible file path '{}'",
                        step.step_order, path
                    ),
                )
                .affecting(vec![step.step_order])
                .with_impact(-0.05),
            );
        }
    }
    Ok(issues)
}

/// Business logic text is expected to carry at least a sentence
/// fragment.
fn check_business_logic(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    for step in &trace.flow_steps {
        if step.business_logic.trim().len() < 10 {
            issues.push(
                ValidationIssue::new(
                    IssueType::IncompleteTrace,
                    Severity::Low,
                    format!(
                        "step {} ({}) has missing or trivial business logic text",
                        step.step_order, step.component_name
                    ),
                )
                .affecting(vec![step.step_order])
                .with_fix("Enrich the extraction for this component")
                .with_impact(-0.02),
            );
        }
    }
    Ok(issues)
}

/// DFS with a recursion stack over the component dependency graph;
/// the first cycle found is reported once, naming every participating
/// step.
fn check_circular_dependencies(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let graph: HashMap<&str, Vec<&str>> = trace
        .flow_steps
        .iter()
        .map(|s| {
            (
                s.component_name.as_str(),
                s.dependencies.iter().map(String::as_str).collect(),
            )
        })
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    for &start in graph.keys() {
        if visited.contains(start) {
            continue;
        }
        let mut stack: Vec<&str> = Vec::new();
        if let Some(cycle) = dfs_cycle(start, &graph, &mut visited, &mut stack) {
            let members: HashSet<&str> = cycle.iter().copied().collect();
            let affected: Vec<usize> = trace
                .flow_steps
                .iter()
                .filter(|s| members.contains(s.component_name.as_str()))
                .map(|s| s.step_order)
                .collect();

            return Ok(vec![ValidationIssue::new(
                IssueType::CircularReference,
                Severity::High,
                format!("circular dependency: {}", cycle.join(" -> ")),
            )
            .affecting(affected)
            .with_fix("Break the cycle or merge the mutually dependent components")
            .with_impact(-0.1)]);
        }
    }
    Ok(vec![])
}

fn dfs_cycle<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<&'a str>> {
    if let Some(pos) = stack.iter().position(|n| *n == node) {
        let mut cycle: Vec<&str> = stack[pos..].to_vec();
        cycle.push(node);
        return Some(cycle);
    }
    if visited.contains(node) {
        return None;
    }
    visited.insert(node);
    stack.push(node);

    if let Some(deps) = graph.get(node) {
        for &dep in deps {
            // Only components present in the trace form graph nodes.
            if graph.contains_key(dep) {
                if let Some(cycle) = dfs_cycle(dep, graph, visited, stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    None
}

/// Identical (technology, component, file) keys mark duplicated
/// extraction work.
fn check_duplicate_steps(trace: &BusinessRuleTrace) -> Result<Vec<ValidationIssue>> {
    let mut seen: HashMap<(&str, &str, &str), usize> = HashMap::new();
    let mut issues = Vec::new();

    for step in &trace.flow_steps {
        let key = (
            step.technology.as_str(),
            step.component_name.as_str(),
            step.file_path.as_str(),
        );
        match seen.get(&key) {
            Some(&first_order) => {
                issues.push(
                    ValidationIssue::new(
                        IssueType::DuplicateStep,
                        Severity::Medium,
                        format!(
                            "steps {} and {} duplicate component '{}' ({})",
                            first_order, step.step_order, step.component_name, step.technology
                        ),
                    )
                    .affecting(vec![first_order, step.step_order])
                    .with_fix("Deduplicate the trace assembly for this component")
                    .with_impact(-0.05),
                );
            }
            None => {
                seen.insert(key, step.step_order);
            }
        }
    }
    Ok(issues)
}
