use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One hop of a reconstructed execution path through a single
/// architectural layer (e.g. a JSP page, a Struts action, a service
/// class, a database table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStep {
    /// 1-based position in the trace. Well-formed traces have
    /// contiguous orders; gaps are surfaced by validation, not
    /// prevented structurally.
    pub step_order: usize,
    /// Kind of hop (e.g. "view", "controller", "service", "data").
    pub step_type: String,
    /// Technology of the layer (e.g. "JSP", "Struts Action", "Java").
    pub technology: String,
    /// Name of the component implementing this hop.
    pub component_name: String,
    /// Source file the component was extracted from.
    pub file_path: String,
    /// Component names this step depends on. Each entry is expected to
    /// appear in the component name of an earlier step.
    pub dependencies: Vec<String>,
    /// Extracted description of the business logic at this hop.
    pub business_logic: String,
    /// Extraction confidence for this step, in [0, 1].
    pub confidence_score: f64,
}

impl FlowStep {
    pub fn new(
        step_order: usize,
        step_type: impl Into<String>,
        technology: impl Into<String>,
        component_name: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            step_order,
            step_type: step_type.into(),
            technology: technology.into(),
            component_name: component_name.into(),
            file_path: file_path.into(),
            dependencies: Vec::new(),
            business_logic: String::new(),
            confidence_score: 0.5,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_business_logic(mut self, business_logic: impl Into<String>) -> Self {
        self.business_logic = business_logic.into();
        self
    }

    pub fn with_confidence(mut self, confidence_score: f64) -> Self {
        self.confidence_score = confidence_score;
        self
    }
}

/// An ordered sequence of flow steps describing one end-to-end request
/// path across architectural layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRuleTrace {
    pub trace_id: String,
    pub rule_name: String,
    pub business_domain: String,
    /// Where the request enters the system (e.g. a URL or JSP page).
    pub entry_point: String,
    pub flow_steps: Vec<FlowStep>,
    /// Confidence of the upstream extraction that assembled this trace.
    pub extraction_confidence: f64,
}

impl BusinessRuleTrace {
    /// Create an empty trace with a generated id.
    pub fn new(
        rule_name: impl Into<String>,
        business_domain: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            rule_name: rule_name.into(),
            business_domain: business_domain.into(),
            entry_point: entry_point.into(),
            flow_steps: Vec::new(),
            extraction_confidence: 1.0,
        }
    }

    pub fn with_steps(mut self, flow_steps: Vec<FlowStep>) -> Self {
        self.flow_steps = flow_steps;
        self
    }

    pub fn with_extraction_confidence(mut self, extraction_confidence: f64) -> Self {
        self.extraction_confidence = extraction_confidence;
        self
    }

    /// Technologies in step order.
    pub fn technologies(&self) -> Vec<&str> {
        self.flow_steps
            .iter()
            .map(|s| s.technology.as_str())
            .collect()
    }
}
