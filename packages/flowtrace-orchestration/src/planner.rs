use crate::registry::{ParserDescriptor, ParserRegistry, ParserType};
use std::collections::HashSet;
use tracing::warn;

/// Ordered phase list for one repository analysis. Immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Parser descriptors grouped into phases; every descriptor in
    /// phase N has its dependencies scheduled in phases < N (unless
    /// `forced_phase` is set).
    pub phases: Vec<Vec<ParserDescriptor>>,
    pub total_parsers: usize,
    /// True when a dependency cycle forced the final phase, discarding
    /// ordering guarantees for the parsers in it.
    pub forced_phase: bool,
}

impl ExecutionPlan {
    /// Human-readable plan, one line per phase (for logging).
    pub fn describe(&self) -> String {
        self.phases
            .iter()
            .enumerate()
            .map(|(i, phase)| {
                let names: Vec<_> = phase.iter().map(|d| d.parser_type.as_str()).collect();
                if phase.len() > 1 {
                    format!("Phase {}: {} (parallel)", i + 1, names.join(", "))
                } else {
                    format!("Phase {}: {}", i + 1, names[0])
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Build the phase plan for the parser types that have discovered
/// files.
///
/// Iterative frontier computation: each round schedules every
/// candidate whose dependencies are already scheduled or absent from
/// the candidate set (a dependency with no matching files is trivially
/// satisfied). Within a phase, descriptors are ordered by priority,
/// then by parser type for a deterministic tie-break.
///
/// If a round schedules nothing while candidates remain, the
/// remaining types form a true cycle; they are force-scheduled into
/// one final phase so the analysis stays live, at the cost of
/// dependency ordering for those parsers.
pub fn build_plan(registry: &ParserRegistry, candidates: &HashSet<ParserType>) -> ExecutionPlan {
    let mut scheduled: HashSet<ParserType> = HashSet::new();
    let mut phases: Vec<Vec<ParserDescriptor>> = Vec::new();
    let mut forced_phase = false;

    // Only types the registry actually knows about can be scheduled.
    let known: Vec<&ParserDescriptor> = candidates
        .iter()
        .filter_map(|t| registry.get(*t))
        .collect();
    let candidate_set: HashSet<ParserType> = known.iter().map(|d| d.parser_type).collect();

    while scheduled.len() < candidate_set.len() {
        let mut ready: Vec<&ParserDescriptor> = known
            .iter()
            .filter(|d| !scheduled.contains(&d.parser_type))
            .filter(|d| {
                d.depends_on
                    .iter()
                    .all(|dep| scheduled.contains(dep) || !candidate_set.contains(dep))
            })
            .copied()
            .collect();

        if ready.is_empty() {
            // True cycle among the remaining types. Force them into a
            // single phase rather than failing the whole analysis.
            let mut remaining: Vec<&ParserDescriptor> = known
                .iter()
                .filter(|d| !scheduled.contains(&d.parser_type))
                .copied()
                .collect();
            remaining.sort_by_key(|d| (d.priority, d.parser_type));

            warn!(
                "Dependency cycle among parsers [{}]; forcing them into one phase",
                remaining
                    .iter()
                    .map(|d| d.parser_type.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            for d in &remaining {
                scheduled.insert(d.parser_type);
            }
            phases.push(remaining.into_iter().cloned().collect());
            forced_phase = true;
            break;
        }

        ready.sort_by_key(|d| (d.priority, d.parser_type));
        for d in &ready {
            scheduled.insert(d.parser_type);
        }
        phases.push(ready.into_iter().cloned().collect());
    }

    ExecutionPlan {
        total_parsers: candidate_set.len(),
        phases,
        forced_phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Priority;

    fn descriptor(
        parser_type: ParserType,
        depends_on: Vec<ParserType>,
        priority: Priority,
    ) -> ParserDescriptor {
        ParserDescriptor::new(parser_type, vec!["*"], depends_on, priority, 30, 1)
    }

    fn candidates(types: &[ParserType]) -> HashSet<ParserType> {
        types.iter().copied().collect()
    }

    #[test]
    fn test_dependencies_always_in_earlier_phases() {
        let registry = ParserRegistry::default_registry();
        let all = candidates(&ParserType::ALL);
        let plan = build_plan(&registry, &all);

        assert!(!plan.forced_phase);
        assert_eq!(plan.total_parsers, ParserType::ALL.len());

        let mut seen: HashSet<ParserType> = HashSet::new();
        for phase in &plan.phases {
            for d in phase {
                for dep in &d.depends_on {
                    assert!(
                        seen.contains(dep) || !all.contains(dep),
                        "{} scheduled before its dependency {dep}",
                        d.parser_type
                    );
                }
            }
            for d in phase {
                seen.insert(d.parser_type);
            }
        }
    }

    #[test]
    fn test_absent_dependency_is_trivially_satisfied() {
        let registry = ParserRegistry::default_registry();
        // Struts depends on Java and Jsp, but neither has files.
        let plan = build_plan(&registry, &candidates(&[ParserType::Struts]));

        assert_eq!(plan.phases.len(), 1);
        assert_eq!(plan.phases[0][0].parser_type, ParserType::Struts);
    }

    #[test]
    fn test_priority_orders_within_phase() {
        let registry = ParserRegistry::from_descriptors(vec![
            descriptor(ParserType::Sql, vec![], Priority::Low),
            descriptor(ParserType::Jsp, vec![], Priority::High),
            descriptor(ParserType::Angular, vec![], Priority::Medium),
        ]);
        let plan = build_plan(
            &registry,
            &candidates(&[ParserType::Sql, ParserType::Jsp, ParserType::Angular]),
        );

        assert_eq!(plan.phases.len(), 1);
        let order: Vec<ParserType> = plan.phases[0].iter().map(|d| d.parser_type).collect();
        assert_eq!(
            order,
            vec![ParserType::Jsp, ParserType::Angular, ParserType::Sql]
        );
    }

    #[test]
    fn test_cycle_forces_single_final_phase() {
        let registry = ParserRegistry::from_descriptors(vec![
            descriptor(ParserType::Java, vec![ParserType::Corba], Priority::High),
            descriptor(ParserType::Corba, vec![ParserType::Java], Priority::Medium),
            descriptor(ParserType::Sql, vec![], Priority::Low),
        ]);
        let plan = build_plan(
            &registry,
            &candidates(&[ParserType::Java, ParserType::Corba, ParserType::Sql]),
        );

        assert!(plan.forced_phase);
        assert_eq!(plan.phases.len(), 2);
        assert_eq!(plan.phases[0][0].parser_type, ParserType::Sql);
        assert_eq!(plan.phases[1].len(), 2);
    }

    #[test]
    fn test_unregistered_candidates_are_ignored() {
        let registry =
            ParserRegistry::from_descriptors(vec![descriptor(ParserType::Jsp, vec![], Priority::High)]);
        let plan = build_plan(&registry, &candidates(&[ParserType::Jsp, ParserType::Sql]));

        assert_eq!(plan.total_parsers, 1);
        assert_eq!(plan.phases.len(), 1);
    }

    #[test]
    fn test_empty_candidates_yield_empty_plan() {
        let registry = ParserRegistry::default_registry();
        let plan = build_plan(&registry, &HashSet::new());

        assert!(plan.phases.is_empty());
        assert_eq!(plan.total_parsers, 0);
        assert!(!plan.forced_phase);
    }

    #[test]
    fn test_describe_lists_phases() {
        let registry = ParserRegistry::default_registry();
        let plan = build_plan(
            &registry,
            &candidates(&[ParserType::Java, ParserType::Jsp, ParserType::Struts]),
        );

        let text = plan.describe();
        assert!(text.contains("Phase 1:"));
        assert!(text.contains("parallel"));
        assert!(text.contains("struts"));
    }
}
