//! Instance validation against resolved schemas.
//!
//! Every keyword with a rule is checked in registry order. Failures are
//! reported as they are found, each with the JSON Pointer of the offending
//! instance value, and collected into a [`ValidationResult`].

mod rules;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ValidationMode;
use crate::types::{SchemaNode, determine_type};
use crate::utils::join_path;

const DEFAULT_MAX_DEPTH: usize = 256;

/// One failed keyword check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// JSON Pointer into the instance, `""` for the root.
    pub path: String,
    pub keyword: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub failures: Vec<ValidationFailure>,
}

impl ValidationResult {
    pub fn failures_for(&self, keyword: &str) -> impl Iterator<Item = &ValidationFailure> {
        self.failures.iter().filter(move |failure| failure.keyword == keyword)
    }

    pub fn has_failure(&self, path: &str, keyword: &str) -> bool {
        self.failures
            .iter()
            .any(|failure| failure.path == path && failure.keyword == keyword)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path} [{}]: {}", self.keyword, self.message)
    }
}

/// Validates instance data against [`SchemaNode`]s.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    mode: ValidationMode,
    max_depth: usize,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            mode: ValidationMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Limit on nested schema evaluations for one instance value chain.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn validate(&self, schema: &Arc<SchemaNode>, data: &Value) -> ValidationResult {
        self.validate_optional(schema, Some(data))
    }

    /// Validate possibly absent data; `None` is an undefined value.
    pub fn validate_optional(&self, schema: &Arc<SchemaNode>, data: Option<&Value>) -> ValidationResult {
        let mut failures = Vec::new();
        let is_valid = self.validate_with_reporter(schema, data, &mut |failure| {
            failures.push(failure.clone());
        });
        ValidationResult { is_valid, failures }
    }

    /// Validate and hand every failure to `reporter` as it is found.
    pub fn validate_with_reporter(
        &self,
        schema: &Arc<SchemaNode>,
        data: Option<&Value>,
        reporter: &mut dyn FnMut(&ValidationFailure),
    ) -> bool {
        let mut ctx = ValidationContext::new(self.mode, self.max_depth, reporter);
        let valid = validate_node(&mut ctx, schema, data);
        tracing::trace!(id = %schema.id(), valid, failures = ctx.failures, "validated instance");
        valid
    }
}

impl SchemaNode {
    /// Whether `data` satisfies this schema.
    pub fn is_valid(self: &Arc<Self>, data: &Value) -> bool {
        SchemaValidator::new()
            .with_mode(ValidationMode::FailFast)
            .validate_with_reporter(self, Some(data), &mut |_| {})
    }
}

/// State carried through one validation run.
pub(crate) struct ValidationContext<'r> {
    current_path: String,
    path_stack: Vec<String>,
    depth: usize,
    max_depth: usize,
    mode: ValidationMode,
    failures: usize,
    reporter: &'r mut dyn FnMut(&ValidationFailure),
}

impl<'r> ValidationContext<'r> {
    fn new(mode: ValidationMode, max_depth: usize, reporter: &'r mut dyn FnMut(&ValidationFailure)) -> Self {
        Self {
            current_path: String::new(),
            path_stack: Vec::new(),
            depth: 0,
            max_depth,
            mode,
            failures: 0,
            reporter,
        }
    }

    pub fn push_path(&mut self, segment: &str) {
        let next = join_path(&self.current_path, segment);
        self.path_stack
            .push(std::mem::replace(&mut self.current_path, next));
    }

    pub fn pop_path(&mut self) {
        if let Some(previous) = self.path_stack.pop() {
            self.current_path = previous;
        }
    }

    pub fn fail(&mut self, keyword: &str, message: impl Into<String>) {
        self.failures += 1;
        let failure = ValidationFailure {
            path: self.current_path.clone(),
            keyword: keyword.to_string(),
            message: message.into(),
        };
        (self.reporter)(&failure);
    }

    fn should_stop(&self) -> bool {
        self.mode == ValidationMode::FailFast && self.failures > 0
    }

    /// Validate `schema` at `segment` below the current path.
    pub fn nested(&mut self, segment: &str, schema: &Arc<SchemaNode>, data: Option<&Value>) -> bool {
        self.push_path(segment);
        let valid = validate_node(self, schema, data);
        self.pop_path();
        valid
    }

    /// Silent evaluation; only the outcome matters to the caller.
    pub fn probe(&self, schema: &Arc<SchemaNode>, data: Option<&Value>) -> bool {
        let mut discard = |_: &ValidationFailure| {};
        let mut inner = ValidationContext::new(ValidationMode::FailFast, self.max_depth, &mut discard);
        inner.current_path = self.current_path.clone();
        inner.depth = self.depth;
        validate_node(&mut inner, schema, data)
    }
}

pub(crate) fn validate_node(ctx: &mut ValidationContext<'_>, schema: &Arc<SchemaNode>, data: Option<&Value>) -> bool {
    let Some(node) = schema.follow() else {
        ctx.fail("$ref", format!("schema {} is no longer available", schema.id()));
        return false;
    };

    if ctx.depth >= ctx.max_depth {
        ctx.fail("$ref", format!("schema nesting deeper than {} levels", ctx.max_depth));
        return false;
    }
    ctx.depth += 1;

    let data = data.or_else(|| node.default_value());
    let actual = determine_type(data);
    let mut valid = true;

    for (keyword, value) in node.keywords() {
        if ctx.should_stop() {
            break;
        }
        if !keyword.spec().validates {
            continue;
        }
        if !rules::check(ctx, &node, keyword, value, data, actual) {
            valid = false;
        }
    }

    ctx.depth -= 1;
    valid
}
