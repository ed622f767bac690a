//! Flatten inheritance into the wire-order attribute list and bind dynamic
//! list length fields.

use crate::model::{Attribute, AttributeKind, Model, ProtocolClass};

/// One attribute in a class's fully resolved attribute list.
#[derive(Debug, Clone)]
pub struct ResolvedAttribute {
    pub attribute: Attribute,
    /// When this attribute carries the runtime length of a variable list,
    /// the index of that list within the same resolved slice.
    pub counts_list: Option<usize>,
}

impl ResolvedAttribute {
    /// True for the primitive field named by some variable list's count
    /// field. Emitters write the current list length at this slot instead
    /// of the stored value.
    pub fn is_dynamic_list_length_field(&self) -> bool {
        self.counts_list.is_some()
    }
}

/// All attributes of `class`, ancestors first: the most ancestral level
/// comes first, each level keeps its declared order, and the class's own
/// attributes come last. This is the wire-format field order, identical for
/// every target language.
pub fn resolve_attributes(model: &Model, class: &ProtocolClass) -> Vec<ResolvedAttribute> {
    let mut chain = vec![class];
    let mut current = class;
    let mut hops = 0;
    while let Some(parent) = model.parent_of(current) {
        hops += 1;
        if hops > model.classes().len() {
            break; // cycles are rejected by validation before we get here
        }
        chain.push(parent);
        current = parent;
    }

    let mut resolved: Vec<ResolvedAttribute> = Vec::new();
    for level in chain.iter().rev() {
        for attribute in &level.attributes {
            resolved.push(ResolvedAttribute {
                attribute: attribute.clone(),
                counts_list: None,
            });
        }
    }

    bind_count_fields(&mut resolved);
    resolved
}

/// For each variable list, find the primitive attribute its count field
/// names (a sibling or an inherited field) and mark it as the length slot
/// for that list. The link is an index, not a reference, so the model keeps
/// single ownership.
fn bind_count_fields(resolved: &mut [ResolvedAttribute]) {
    let mut bindings = Vec::new();
    for (list_index, entry) in resolved.iter().enumerate() {
        if let AttributeKind::VariableList { count_field, .. } = &entry.attribute.kind {
            let slot = resolved.iter().position(|candidate| {
                matches!(candidate.attribute.kind, AttributeKind::Primitive { .. })
                    && candidate.attribute.name == *count_field
            });
            if let Some(count_index) = slot {
                bindings.push((count_index, list_index));
            }
        }
    }
    for (count_index, list_index) in bindings {
        resolved[count_index].counts_list = Some(list_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const CHAIN: &str = r#"
class Base {
	attribute one { primitive byte; }
	attribute two { primitive byte; }
}
class Middle : Base {
	attribute three { primitive byte; }
}
class Leaf : Middle {
	attribute four { primitive byte; }
}
"#;

    #[test]
    fn ancestors_come_first_in_declared_order() {
        let model = parse(CHAIN).expect("parse").model;
        let leaf = model.get_class("Leaf").expect("Leaf");
        let resolved = resolve_attributes(&model, leaf);
        let names: Vec<&str> = resolved
            .iter()
            .map(|r| r.attribute.name.as_str())
            .collect();
        assert_eq!(names, ["one", "two", "three", "four"]);
    }

    #[test]
    fn resolving_twice_is_identical() {
        let model = parse(CHAIN).expect("parse").model;
        let leaf = model.get_class("Leaf").expect("Leaf");
        let a: Vec<String> = resolve_attributes(&model, leaf)
            .iter()
            .map(|r| r.attribute.name.clone())
            .collect();
        let b: Vec<String> = resolve_attributes(&model, leaf)
            .iter()
            .map(|r| r.attribute.name.clone())
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn count_field_binds_to_its_list() {
        let src = r#"
class Record {
	attribute value { primitive unsigned int; }
}
class Pdu {
	attribute numberOfRecords { primitive unsigned byte; }
	attribute records {
		variablelist numberOfRecords { classref Record; }
	}
}
"#;
        let model = parse(src).expect("parse").model;
        let pdu = model.get_class("Pdu").expect("Pdu");
        let resolved = resolve_attributes(&model, pdu);
        assert!(resolved[0].is_dynamic_list_length_field());
        assert_eq!(resolved[0].counts_list, Some(1));
        assert!(!resolved[1].is_dynamic_list_length_field());
    }

    #[test]
    fn count_field_may_live_in_an_ancestor() {
        let src = r#"
class Header {
	attribute itemCount { primitive unsigned short; }
}
class Body : Header {
	attribute items {
		variablelist itemCount { primitive unsigned int; }
	}
}
"#;
        let model = parse(src).expect("parse").model;
        let body = model.get_class("Body").expect("Body");
        let resolved = resolve_attributes(&model, body);
        assert_eq!(resolved[0].attribute.name, "itemCount");
        assert_eq!(resolved[0].counts_list, Some(1));
    }
}
