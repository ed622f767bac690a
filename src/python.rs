//! Python emitter: renders every protocol class into one importable module.
//!
//! Classes are written parent-first (Python cannot forward-reference a
//! superclass), each with an `__init__` that applies defaults and initial
//! values, `serialize`/`parse` methods over the DataOutputStream /
//! DataInputStream runtime, and accessor pairs for declared bit flags.

use crate::bitfield;
use crate::emit::{initial_cap, Artifact, EmitError, Emitter};
use crate::model::{AttributeKind, ElementType, Model, PrimitiveType, ProtocolClass};
use crate::order::order_classes;
use crate::resolve::resolve_attributes;
use std::path::PathBuf;

const INDENT: &str = "    ";

pub struct PythonEmitter;

impl Emitter for PythonEmitter {
    fn target_name(&self) -> &'static str {
        "python"
    }

    fn emit(&self, model: &Model) -> Result<Vec<Artifact>, EmitError> {
        let filename = model
            .target("python")
            .and_then(|t| t.get("filename"))
            .ok_or_else(|| EmitError::MissingProperty {
                target: "python".to_string(),
                key: "filename".to_string(),
            })?
            .to_string();

        let mut out = String::new();
        write_header(&mut out);
        for class in order_classes(model) {
            write_class(&mut out, model, class);
        }
        Ok(vec![Artifact {
            path: PathBuf::from(filename),
            contents: out,
        }])
    }
}

/// Stream method suffix for a primitive type: `write_<suffix>` on output,
/// `read_<suffix>` on input.
fn marshal_suffix(type_name: &str) -> Option<&'static str> {
    PrimitiveType::parse(type_name).map(|ty| match ty {
        PrimitiveType::Byte => "byte",
        PrimitiveType::UnsignedByte => "unsigned_byte",
        PrimitiveType::Short => "short",
        PrimitiveType::UnsignedShort => "unsigned_short",
        PrimitiveType::Int => "int",
        PrimitiveType::UnsignedInt => "unsigned_int",
        PrimitiveType::Long => "long",
        PrimitiveType::UnsignedLong => "unsigned_long",
        PrimitiveType::Float => "float",
        PrimitiveType::Double => "double",
    })
}

fn write_header(out: &mut String) {
    out.push_str("#\n");
    out.push_str("# Generated protocol classes. Do not edit by hand.\n");
    out.push_str("#\n");
    out.push('\n');
    out.push_str("import DataInputStream\n");
    out.push_str("import DataOutputStream\n");
}

fn write_class(out: &mut String, model: &Model, class: &ProtocolClass) {
    out.push('\n');
    let parent = class.parent.as_deref().unwrap_or("object");
    out.push_str(&format!("class {}( {} ):\n", class.name, parent));
    if let Some(comment) = &class.comment {
        out.push_str(&format!("{INDENT}\"\"\"{comment}\"\"\"\n"));
    }
    out.push('\n');
    write_init(out, model, class);
    write_serialize(out, model, class);
    write_parse(out, class);
    write_flag_methods(out, class);
    out.push('\n');
}

fn write_init(out: &mut String, model: &Model, class: &ProtocolClass) {
    out.push_str(&format!("{INDENT}def __init__(self):\n"));
    out.push_str(&format!(
        "{INDENT}{INDENT}\"\"\" Initializer for {}\"\"\"\n",
        class.name
    ));
    if class.parent.is_some() {
        out.push_str(&format!(
            "{INDENT}{INDENT}super({}, self).__init__()\n",
            class.name
        ));
    }

    for attribute in &class.attributes {
        match &attribute.kind {
            AttributeKind::Primitive { .. } => {
                let default = attribute.default_value.as_deref().unwrap_or("0");
                out.push_str(&format!(
                    "{INDENT}{INDENT}self.{} = {}\n",
                    attribute.name, default
                ));
            }
            AttributeKind::ClassRef { class_name } => {
                out.push_str(&format!(
                    "{INDENT}{INDENT}self.{} = {}()\n",
                    attribute.name, class_name
                ));
            }
            AttributeKind::FixedList { element, length } => {
                let fill = match element {
                    ElementType::Primitive { .. } => "0".to_string(),
                    ElementType::ClassRef { class_name } => format!("{}()", class_name),
                };
                let items = vec![fill; *length].join(", ");
                out.push_str(&format!(
                    "{INDENT}{INDENT}self.{} = [{}]\n",
                    attribute.name, items
                ));
            }
            AttributeKind::VariableList { .. } => {
                out.push_str(&format!("{INDENT}{INDENT}self.{} = []\n", attribute.name));
            }
        }
        if let Some(comment) = &attribute.comment {
            out.push_str(&format!("{INDENT}{INDENT}\"\"\" {}\"\"\"\n", comment));
        }
    }

    // Initial values may target an inherited attribute; unresolved ones were
    // already reported by validation and are skipped here.
    let resolved = resolve_attributes(model, class);
    for init in &class.initial_values {
        if resolved
            .iter()
            .any(|entry| entry.attribute.name == init.attribute_name)
        {
            out.push_str(&format!(
                "{INDENT}{INDENT}self.{} = {}\n",
                init.attribute_name, init.value
            ));
        }
    }
    out.push('\n');
}

fn write_serialize(out: &mut String, model: &Model, class: &ProtocolClass) {
    out.push_str(&format!("{INDENT}def serialize(self, outputStream):\n"));
    out.push_str(&format!(
        "{INDENT}{INDENT}\"\"\"serialize the class \"\"\"\n"
    ));
    if class.parent.is_some() {
        out.push_str(&format!(
            "{INDENT}{INDENT}super({}, self).serialize(outputStream)\n",
            class.name
        ));
    }

    // The resolved view supplies count-field bindings; this class writes
    // only its own slots, the super call covers inherited ones.
    let resolved = resolve_attributes(model, class);
    let own_start = resolved.len() - class.attributes.len();
    for entry in &resolved[own_start..] {
        let attribute = &entry.attribute;
        if !attribute.serialize {
            continue;
        }
        match &attribute.kind {
            AttributeKind::Primitive { type_name } => {
                if let Some(suffix) = marshal_suffix(type_name) {
                    if let Some(list_index) = entry.counts_list {
                        // A length field always reflects the list it counts.
                        out.push_str(&format!(
                            "{INDENT}{INDENT}outputStream.write_{}( len(self.{}))\n",
                            suffix, resolved[list_index].attribute.name
                        ));
                    } else {
                        out.push_str(&format!(
                            "{INDENT}{INDENT}outputStream.write_{}(self.{})\n",
                            suffix, attribute.name
                        ));
                    }
                }
            }
            AttributeKind::ClassRef { .. } => {
                out.push_str(&format!(
                    "{INDENT}{INDENT}self.{}.serialize(outputStream)\n",
                    attribute.name
                ));
            }
            AttributeKind::FixedList { element, length } => {
                out.push_str(&format!(
                    "{INDENT}{INDENT}for idx in range(0, {}):\n",
                    length
                ));
                match element {
                    ElementType::Primitive { type_name } => {
                        if let Some(suffix) = marshal_suffix(type_name) {
                            out.push_str(&format!(
                                "{INDENT}{INDENT}{INDENT}outputStream.write_{}( self.{}[ idx ] )\n",
                                suffix, attribute.name
                            ));
                        }
                    }
                    ElementType::ClassRef { .. } => {
                        out.push_str(&format!(
                            "{INDENT}{INDENT}{INDENT}self.{}[ idx ].serialize(outputStream)\n",
                            attribute.name
                        ));
                    }
                }
            }
            AttributeKind::VariableList { element, .. } => {
                out.push_str(&format!(
                    "{INDENT}{INDENT}for anObj in self.{}:\n",
                    attribute.name
                ));
                match element {
                    ElementType::Primitive { type_name } => {
                        if let Some(suffix) = marshal_suffix(type_name) {
                            out.push_str(&format!(
                                "{INDENT}{INDENT}{INDENT}outputStream.write_{}( anObj )\n",
                                suffix
                            ));
                        }
                    }
                    ElementType::ClassRef { .. } => {
                        out.push_str(&format!(
                            "{INDENT}{INDENT}{INDENT}anObj.serialize(outputStream)\n"
                        ));
                    }
                }
            }
        }
    }
    out.push('\n');
}

fn write_parse(out: &mut String, class: &ProtocolClass) {
    out.push_str(&format!("{INDENT}def parse(self, inputStream):\n"));
    out.push_str(&format!(
        "{INDENT}{INDENT}\"\"\"Parse a message. This may recursively call embedded objects.\"\"\"\n"
    ));
    if class.parent.is_some() {
        out.push_str(&format!(
            "{INDENT}{INDENT}super({}, self).parse(inputStream)\n",
            class.name
        ));
    }

    for attribute in &class.attributes {
        if !attribute.serialize {
            continue;
        }
        match &attribute.kind {
            AttributeKind::Primitive { type_name } => {
                if let Some(suffix) = marshal_suffix(type_name) {
                    out.push_str(&format!(
                        "{INDENT}{INDENT}self.{} = inputStream.read_{}()\n",
                        attribute.name, suffix
                    ));
                }
            }
            AttributeKind::ClassRef { .. } => {
                out.push_str(&format!(
                    "{INDENT}{INDENT}self.{}.parse(inputStream)\n",
                    attribute.name
                ));
            }
            AttributeKind::FixedList { element, length } => match element {
                ElementType::Primitive { type_name } => {
                    if let Some(suffix) = marshal_suffix(type_name) {
                        out.push_str(&format!(
                            "{INDENT}{INDENT}self.{} = [0]*{}\n",
                            attribute.name, length
                        ));
                        out.push_str(&format!(
                            "{INDENT}{INDENT}for idx in range(0, {}):\n",
                            length
                        ));
                        out.push_str(&format!(
                            "{INDENT}{INDENT}{INDENT}self.{}[ idx ] = inputStream.read_{}()\n",
                            attribute.name, suffix
                        ));
                    }
                }
                ElementType::ClassRef { class_name } => {
                    out.push_str(&format!("{INDENT}{INDENT}self.{} = []\n", attribute.name));
                    out.push_str(&format!(
                        "{INDENT}{INDENT}for idx in range(0, {}):\n",
                        length
                    ));
                    out.push_str(&format!(
                        "{INDENT}{INDENT}{INDENT}element = {}()\n",
                        class_name
                    ));
                    out.push_str(&format!(
                        "{INDENT}{INDENT}{INDENT}element.parse(inputStream)\n"
                    ));
                    out.push_str(&format!(
                        "{INDENT}{INDENT}{INDENT}self.{}.append(element)\n",
                        attribute.name
                    ));
                }
            },
            AttributeKind::VariableList {
                element,
                count_field,
            } => {
                out.push_str(&format!(
                    "{INDENT}{INDENT}for idx in range(0, self.{}):\n",
                    count_field
                ));
                match element {
                    ElementType::Primitive { type_name } => {
                        if let Some(suffix) = marshal_suffix(type_name) {
                            out.push_str(&format!(
                                "{INDENT}{INDENT}{INDENT}self.{}.append(inputStream.read_{}())\n",
                                attribute.name, suffix
                            ));
                        }
                    }
                    ElementType::ClassRef { class_name } => {
                        out.push_str(&format!(
                            "{INDENT}{INDENT}{INDENT}element = {}()\n",
                            class_name
                        ));
                        out.push_str(&format!(
                            "{INDENT}{INDENT}{INDENT}element.parse(inputStream)\n"
                        ));
                        out.push_str(&format!(
                            "{INDENT}{INDENT}{INDENT}self.{}.append(element)\n",
                            attribute.name
                        ));
                    }
                }
            }
        }
    }
    out.push('\n');
}

/// Accessor pairs for declared bit flags. Flags on anything but a primitive
/// attribute have no bit storage and are skipped.
fn write_flag_methods(out: &mut String, class: &ProtocolClass) {
    for attribute in &class.attributes {
        let type_name = match &attribute.kind {
            AttributeKind::Primitive { type_name } => type_name,
            _ => continue,
        };
        let ty = match PrimitiveType::parse(type_name) {
            Some(ty) => ty,
            None => continue,
        };
        for flag in &attribute.bit_fields {
            let shift = bitfield::shift_for(ty, &flag.mask);
            let method = format!("{}_{}", initial_cap(&attribute.name), flag.name);

            out.push('\n');
            out.push_str(&format!("{INDENT}def get{}(self):\n", method));
            if let Some(comment) = &flag.comment {
                out.push_str(&format!("{INDENT}{INDENT}\"\"\"{}\"\"\"\n", comment));
            }
            out.push_str(&format!(
                "{INDENT}{INDENT}val = self.{} & {}\n",
                attribute.name, flag.mask
            ));
            out.push_str(&format!("{INDENT}{INDENT}return val >> {}\n", shift));

            out.push('\n');
            out.push_str(&format!("{INDENT}def set{}(self, val):\n", method));
            if let Some(comment) = &flag.comment {
                out.push_str(&format!("{INDENT}{INDENT}\"\"\"{}\"\"\"\n", comment));
            }
            out.push_str(&format!(
                "{INDENT}{INDENT}self.{} &= ~{}\n",
                attribute.name, flag.mask
            ));
            out.push_str(&format!(
                "{INDENT}{INDENT}val = (val << {}) & {}\n",
                shift, flag.mask
            ));
            out.push_str(&format!(
                "{INDENT}{INDENT}self.{} = self.{} | val\n",
                attribute.name, attribute.name
            ));
        }
    }
}
