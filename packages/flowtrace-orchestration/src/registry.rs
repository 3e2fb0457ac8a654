use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Technology a parser plugin understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserType {
    Jsp,
    Java,
    Struts,
    Corba,
    Angular,
    Sql,
    WebXml,
}

impl ParserType {
    pub const ALL: [ParserType; 7] = [
        ParserType::Jsp,
        ParserType::Java,
        ParserType::Struts,
        ParserType::Corba,
        ParserType::Angular,
        ParserType::Sql,
        ParserType::WebXml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParserType::Jsp => "jsp",
            ParserType::Java => "java",
            ParserType::Struts => "struts",
            ParserType::Corba => "corba",
            ParserType::Angular => "angular",
            ParserType::Sql => "sql",
            ParserType::WebXml => "web_xml",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "jsp" => Ok(ParserType::Jsp),
            "java" => Ok(ParserType::Java),
            "struts" => Ok(ParserType::Struts),
            "corba" => Ok(ParserType::Corba),
            "angular" => Ok(ParserType::Angular),
            "sql" => Ok(ParserType::Sql),
            "web_xml" => Ok(ParserType::WebXml),
            _ => Err(OrchestratorError::UnknownParserType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ParserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduling priority within a phase. `High` runs listed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Immutable description of one parser plugin: which files it applies
/// to, which other parsers must run before it, and its execution
/// budget. Defined once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserDescriptor {
    pub parser_type: ParserType,
    /// Exact filenames (e.g. `struts.xml`) or glob patterns
    /// (e.g. `*.jsp`).
    pub file_patterns: Vec<String>,
    pub depends_on: Vec<ParserType>,
    pub priority: Priority,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl ParserDescriptor {
    pub fn new(
        parser_type: ParserType,
        file_patterns: Vec<&str>,
        depends_on: Vec<ParserType>,
        priority: Priority,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Self {
        Self {
            parser_type,
            file_patterns: file_patterns.into_iter().map(String::from).collect(),
            depends_on,
            priority,
            timeout_secs,
            max_retries,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Static table of parser descriptors.
#[derive(Debug, Clone)]
pub struct ParserRegistry {
    descriptors: HashMap<ParserType, ParserDescriptor>,
}

impl ParserRegistry {
    /// Build a registry from explicit descriptors. Later descriptors
    /// for the same type replace earlier ones.
    pub fn from_descriptors(descriptors: Vec<ParserDescriptor>) -> Self {
        let mut map = HashMap::new();
        for descriptor in descriptors {
            map.insert(descriptor.parser_type, descriptor);
        }
        Self { descriptors: map }
    }

    /// The default descriptor table for legacy Java-era codebases.
    pub fn default_registry() -> Self {
        Self::from_descriptors(vec![
            ParserDescriptor::new(
                ParserType::Java,
                vec!["*.java"],
                vec![],
                Priority::High,
                60,
                2,
            ),
            ParserDescriptor::new(
                ParserType::Jsp,
                vec!["*.jsp", "*.jspf"],
                vec![],
                Priority::High,
                30,
                2,
            ),
            ParserDescriptor::new(
                ParserType::Struts,
                vec!["struts.xml", "struts-config.xml"],
                vec![ParserType::Java, ParserType::Jsp],
                Priority::Medium,
                30,
                2,
            ),
            ParserDescriptor::new(
                ParserType::Corba,
                vec!["*.idl"],
                vec![ParserType::Java],
                Priority::Medium,
                45,
                2,
            ),
            ParserDescriptor::new(
                ParserType::WebXml,
                vec!["web.xml"],
                vec![ParserType::Java],
                Priority::Medium,
                30,
                1,
            ),
            ParserDescriptor::new(
                ParserType::Angular,
                vec!["*.component.ts", "*.service.ts", "*.module.ts"],
                vec![],
                Priority::Medium,
                30,
                2,
            ),
            ParserDescriptor::new(
                ParserType::Sql,
                vec!["*.sql"],
                vec![],
                Priority::Low,
                30,
                1,
            ),
        ])
    }

    pub fn get(&self, parser_type: ParserType) -> Option<&ParserDescriptor> {
        self.descriptors.get(&parser_type)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ParserDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::default_registry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_type_roundtrip() {
        for parser_type in &ParserType::ALL {
            let s = parser_type.as_str();
            let parsed = ParserType::from_str(s).unwrap();
            assert_eq!(*parser_type, parsed);
        }
    }

    #[test]
    fn test_parser_type_invalid() {
        assert!(ParserType::from_str("cobol").is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
    }

    #[test]
    fn test_default_registry_covers_all_types() {
        let registry = ParserRegistry::default_registry();
        for parser_type in &ParserType::ALL {
            assert!(
                registry.get(*parser_type).is_some(),
                "missing descriptor for {parser_type}"
            );
        }
    }

    #[test]
    fn test_default_registry_dependencies_exist() {
        let registry = ParserRegistry::default_registry();
        for descriptor in registry.descriptors() {
            for dep in &descriptor.depends_on {
                assert!(
                    registry.get(*dep).is_some(),
                    "{} depends on unregistered {dep}",
                    descriptor.parser_type
                );
            }
        }
    }

    #[test]
    fn test_from_descriptors_replaces_duplicates() {
        let registry = ParserRegistry::from_descriptors(vec![
            ParserDescriptor::new(ParserType::Sql, vec!["*.sql"], vec![], Priority::Low, 30, 1),
            ParserDescriptor::new(ParserType::Sql, vec!["*.ddl"], vec![], Priority::High, 10, 0),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(ParserType::Sql).unwrap().file_patterns, vec!["*.ddl"]);
    }
}
