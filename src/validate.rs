//! Consistency checks over a parsed model.
//!
//! Any Error finding gates code generation; Warning findings are reported
//! and generation continues. Per class, the checks run in a fixed order:
//! primitive types against the known vocabulary, class references (including
//! list elements and the parent chain), then initial-value targets.

use crate::model::{AttributeKind, Model, PrimitiveType, ProtocolClass};
use std::fmt;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single message with the class it concerns.
#[derive(Debug, Clone)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    pub class_name: Option<String>,
}

impl Finding {
    fn error(message: String, class_name: &str) -> Finding {
        Finding {
            severity: Severity::Error,
            message,
            class_name: Some(class_name.to_string()),
        }
    }

    fn warning(message: String, class_name: &str) -> Finding {
        Finding {
            severity: Severity::Warning,
            message,
            class_name: Some(class_name.to_string()),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.class_name {
            Some(class) => write!(f, "{}: {} (class `{}`)", severity, self.message, class),
            None => write!(f, "{}: {}", severity, self.message),
        }
    }
}

/// True when any finding is an Error. No artifacts may be produced then.
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}

/// Check the model for consistency. Findings come back in class declaration
/// order; the model itself is never modified.
pub fn validate(model: &Model) -> Vec<Finding> {
    let mut findings = Vec::new();
    for class in model.classes() {
        check_attribute_types(model, class, &mut findings);
        check_parent_chain(model, class, &mut findings);
        check_initial_values(model, class, &mut findings);
    }
    findings
}

fn check_attribute_types(model: &Model, class: &ProtocolClass, findings: &mut Vec<Finding>) {
    for attribute in &class.attributes {
        if let AttributeKind::Primitive { type_name } = &attribute.kind {
            if PrimitiveType::parse(type_name).is_none() {
                findings.push(Finding::error(
                    format!(
                        "cannot find a primitive type of `{}` for attribute `{}`",
                        type_name, attribute.name
                    ),
                    &class.name,
                ));
            }
        }
        if let Some(target) = attribute.kind.target_class_name() {
            if model.get_class(target).is_none() {
                findings.push(Finding::error(
                    format!(
                        "attribute `{}` references class `{}`, but no class of that name is declared",
                        attribute.name, target
                    ),
                    &class.name,
                ));
            }
        }
    }
}

/// The parent chain must resolve all the way up and terminate; ordering and
/// attribute flattening both assume it does.
fn check_parent_chain(model: &Model, class: &ProtocolClass, findings: &mut Vec<Finding>) {
    let mut current = class;
    let mut hops = 0;
    while let Some(parent_name) = current.parent.as_deref() {
        match model.get_class(parent_name) {
            None => {
                findings.push(Finding::error(
                    format!("inherits from undeclared class `{}`", parent_name),
                    &class.name,
                ));
                return;
            }
            Some(parent) => {
                hops += 1;
                if hops > model.classes().len() {
                    findings.push(Finding::error(
                        "inheritance cycle in parent chain".to_string(),
                        &class.name,
                    ));
                    return;
                }
                current = parent;
            }
        }
    }
}

fn check_initial_values(model: &Model, class: &ProtocolClass, findings: &mut Vec<Finding>) {
    for init in &class.initial_values {
        let mut found = false;
        let mut current = Some(class);
        let mut hops = 0;
        while let Some(level) = current {
            if level
                .attributes
                .iter()
                .any(|a| a.name == init.attribute_name)
            {
                found = true;
                break;
            }
            hops += 1;
            if hops > model.classes().len() {
                break;
            }
            current = model.parent_of(level);
        }
        if !found {
            findings.push(Finding::warning(
                format!(
                    "initial value `{}` does not match any attribute here or in an ancestor",
                    init.attribute_name
                ),
                &class.name,
            ));
        }
    }
}
