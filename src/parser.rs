//! Parse protocol descriptions into the model using PEST.
//!
//! Each class declaration is accumulated in a builder and attached to the
//! document when it closes; each attribute declaration is accumulated in its
//! own builder and attached to the enclosing class builder when it closes.
//! All builder state is local to the parse call.

use crate::model::*;
use crate::validate::{Finding, Severity};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct DescriptionParser;

/// Malformed input that aborts before validation.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String),
    #[error("class declaration is missing a name")]
    MissingClassName,
    #[error("attribute in class `{0}` is missing a name")]
    MissingAttributeName(String),
    #[error("duplicate class name `{0}`")]
    DuplicateClass(String),
}

/// A parsed description plus any non-fatal findings recorded along the way.
#[derive(Debug)]
pub struct Parsed {
    pub model: Model,
    pub warnings: Vec<Finding>,
}

/// Parse description source into a frozen model.
pub fn parse(source: &str) -> Result<Parsed, ParseError> {
    let pairs = DescriptionParser::parse(Rule::document, source)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;
    let document = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::Syntax("empty parse".to_string()))?;

    let mut classes = Vec::new();
    let mut targets = Vec::new();
    let mut warnings = Vec::new();

    for item in document.into_inner() {
        match item.as_rule() {
            Rule::target_block => targets.push(build_target(item)),
            Rule::class_decl => classes.push(build_class(item, &mut warnings)?),
            _ => {}
        }
    }

    let model = Model::from_parts(classes, targets).map_err(ParseError::DuplicateClass)?;
    Ok(Parsed { model, warnings })
}

fn build_target(pair: Pair<Rule>) -> TargetConfig {
    let mut config = TargetConfig::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => config.name = inner.as_str().to_string(),
            Rule::target_entry => {
                let mut key = String::new();
                let mut value = String::new();
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::ident => key = part.as_str().to_string(),
                        Rule::string => value = unquote(part.as_str()),
                        _ => {}
                    }
                }
                config.properties.push((key, value));
            }
            _ => {}
        }
    }
    config
}

struct ClassBuilder {
    name: Option<String>,
    parent: Option<String>,
    comment: Option<String>,
    top_level: bool,
    attributes: Vec<Attribute>,
    initial_values: Vec<InitialValue>,
}

impl ClassBuilder {
    fn new() -> ClassBuilder {
        ClassBuilder {
            name: None,
            parent: None,
            comment: None,
            top_level: false,
            attributes: Vec::new(),
            initial_values: Vec::new(),
        }
    }

    fn finish(self) -> Result<ProtocolClass, ParseError> {
        let name = self.name.ok_or(ParseError::MissingClassName)?;
        Ok(ProtocolClass {
            name,
            parent: self.parent,
            comment: self.comment,
            top_level: self.top_level,
            attributes: self.attributes,
            initial_values: self.initial_values,
        })
    }
}

fn build_class(pair: Pair<Rule>, warnings: &mut Vec<Finding>) -> Result<ProtocolClass, ParseError> {
    let mut builder = ClassBuilder::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => builder.name = Some(inner.as_str().to_string()),
            Rule::parent_clause => {
                builder.parent = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::ident)
                    .map(|p| p.as_str().to_string());
            }
            Rule::string => builder.comment = Some(unquote(inner.as_str())),
            Rule::toplevel_flag => builder.top_level = true,
            Rule::initial_decl => {
                let mut attribute_name = String::new();
                let mut value = String::new();
                for part in inner.into_inner() {
                    match part.as_rule() {
                        Rule::ident => attribute_name = part.as_str().to_string(),
                        Rule::literal => value = part.as_str().to_string(),
                        _ => {}
                    }
                }
                builder.initial_values.push(InitialValue {
                    attribute_name,
                    value,
                });
            }
            Rule::attribute_decl => {
                let class_name = builder
                    .name
                    .clone()
                    .unwrap_or_else(|| "<anonymous>".to_string());
                builder
                    .attributes
                    .push(build_attribute(inner, &class_name, warnings)?);
            }
            _ => {}
        }
    }
    builder.finish()
}

/// A list wrapper recorded before its element declaration is seen. The
/// wrapper decides the attribute kind; the element only supplies the item
/// type, so a nested primitive or classref can never overwrite it.
enum Wrapper {
    Fixed { length: usize },
    Variable { count_field: String },
}

struct AttributeBuilder {
    name: Option<String>,
    comment: Option<String>,
    serialize: bool,
    bit_fields: Vec<BitField>,
    wrapper: Option<Wrapper>,
    element: Option<ElementType>,
    default_value: Option<String>,
}

impl AttributeBuilder {
    fn new() -> AttributeBuilder {
        AttributeBuilder {
            name: None,
            comment: None,
            serialize: true,
            bit_fields: Vec::new(),
            wrapper: None,
            element: None,
            default_value: None,
        }
    }

    fn finish(self, class_name: &str) -> Result<Attribute, ParseError> {
        let name = self
            .name
            .ok_or_else(|| ParseError::MissingAttributeName(class_name.to_string()))?;
        let element = match self.element {
            Some(element) => element,
            None => {
                return Err(ParseError::Syntax(format!(
                    "attribute `{}` in class `{}` has no type declaration",
                    name, class_name
                )))
            }
        };
        let kind = match self.wrapper {
            None => match element {
                ElementType::Primitive { type_name } => AttributeKind::Primitive { type_name },
                ElementType::ClassRef { class_name } => AttributeKind::ClassRef { class_name },
            },
            Some(Wrapper::Fixed { length }) => AttributeKind::FixedList { element, length },
            Some(Wrapper::Variable { count_field }) => {
                AttributeKind::VariableList {
                    element,
                    count_field,
                }
            }
        };
        Ok(Attribute {
            name,
            comment: self.comment,
            kind,
            serialize: self.serialize,
            bit_fields: self.bit_fields,
            default_value: self.default_value,
        })
    }
}

fn build_attribute(
    pair: Pair<Rule>,
    class_name: &str,
    warnings: &mut Vec<Finding>,
) -> Result<Attribute, ParseError> {
    let mut builder = AttributeBuilder::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => builder.name = Some(inner.as_str().to_string()),
            Rule::string => builder.comment = Some(unquote(inner.as_str())),
            Rule::serialize_clause => {
                for part in inner.into_inner() {
                    if part.as_rule() == Rule::bool_lit && part.as_str() == "false" {
                        builder.serialize = false;
                    }
                }
            }
            Rule::flag_decl => builder.bit_fields.push(build_flag(inner)),
            Rule::primitive_decl => apply_primitive(&mut builder, inner),
            Rule::classref_decl => apply_classref(&mut builder, inner),
            Rule::fixedlist_decl => apply_fixedlist(&mut builder, inner, class_name, warnings),
            Rule::variablelist_decl => apply_variablelist(&mut builder, inner),
            _ => {}
        }
    }
    builder.finish(class_name)
}

fn build_flag(pair: Pair<Rule>) -> BitField {
    let mut name = String::new();
    let mut mask = String::from("0");
    let mut comment = None;
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => name = part.as_str().to_string(),
            Rule::mask_literal => mask = part.as_str().to_string(),
            Rule::string => comment = Some(unquote(part.as_str())),
            _ => {}
        }
    }
    BitField {
        name,
        comment,
        mask,
    }
}

fn apply_primitive(builder: &mut AttributeBuilder, pair: Pair<Rule>) {
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::prim_type => {
                builder.element = Some(ElementType::Primitive {
                    type_name: normalize_type_name(part.as_str()),
                });
            }
            Rule::default_clause => {
                builder.default_value = part
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::literal)
                    .map(|p| p.as_str().to_string());
            }
            _ => {}
        }
    }
}

fn apply_classref(builder: &mut AttributeBuilder, pair: Pair<Rule>) {
    for part in pair.into_inner() {
        if part.as_rule() == Rule::ident {
            builder.element = Some(ElementType::ClassRef {
                class_name: part.as_str().to_string(),
            });
        }
    }
}

fn apply_fixedlist(
    builder: &mut AttributeBuilder,
    pair: Pair<Rule>,
    class_name: &str,
    warnings: &mut Vec<Finding>,
) {
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::list_length => {
                let text = part.as_str();
                let length = match text.parse::<usize>() {
                    Ok(n) => n,
                    Err(_) => {
                        // Tolerated: a bad length degrades to an empty array
                        // rather than aborting the whole description.
                        warnings.push(Finding {
                            severity: Severity::Warning,
                            message: format!(
                                "invalid fixed list length `{}`, using 0",
                                text
                            ),
                            class_name: Some(class_name.to_string()),
                        });
                        0
                    }
                };
                builder.wrapper = Some(Wrapper::Fixed { length });
            }
            Rule::primitive_decl => apply_primitive(builder, part),
            Rule::classref_decl => apply_classref(builder, part),
            _ => {}
        }
    }
}

fn apply_variablelist(builder: &mut AttributeBuilder, pair: Pair<Rule>) {
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::ident => {
                builder.wrapper = Some(Wrapper::Variable {
                    count_field: part.as_str().to_string(),
                });
            }
            Rule::primitive_decl => apply_primitive(builder, part),
            Rule::classref_decl => apply_classref(builder, part),
            _ => {}
        }
    }
}

fn normalize_type_name(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unquote(s: &str) -> String {
    let inner = s.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(s);
    inner
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"")
}
