//! In-memory model of a protocol description: classes, attributes, bit fields.
//!
//! The model is populated once by the parser and read-only afterwards; the
//! validator and all downstream views take `&Model`.

use std::collections::HashMap;

/// The fixed scalar wire types a primitive attribute may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 10] = [
        PrimitiveType::Byte,
        PrimitiveType::UnsignedByte,
        PrimitiveType::Short,
        PrimitiveType::UnsignedShort,
        PrimitiveType::Int,
        PrimitiveType::UnsignedInt,
        PrimitiveType::Long,
        PrimitiveType::UnsignedLong,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Parse a type name as written in a description ("byte", "unsigned short", ...).
    /// Interior whitespace is collapsed, so "unsigned   int" still resolves.
    pub fn parse(name: &str) -> Option<PrimitiveType> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.as_str() {
            "byte" => Some(PrimitiveType::Byte),
            "unsigned byte" => Some(PrimitiveType::UnsignedByte),
            "short" => Some(PrimitiveType::Short),
            "unsigned short" => Some(PrimitiveType::UnsignedShort),
            "int" => Some(PrimitiveType::Int),
            "unsigned int" => Some(PrimitiveType::UnsignedInt),
            "long" => Some(PrimitiveType::Long),
            "unsigned long" => Some(PrimitiveType::UnsignedLong),
            "float" => Some(PrimitiveType::Float),
            "double" => Some(PrimitiveType::Double),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Byte => "byte",
            PrimitiveType::UnsignedByte => "unsigned byte",
            PrimitiveType::Short => "short",
            PrimitiveType::UnsignedShort => "unsigned short",
            PrimitiveType::Int => "int",
            PrimitiveType::UnsignedInt => "unsigned int",
            PrimitiveType::Long => "long",
            PrimitiveType::UnsignedLong => "unsigned long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Width in bits. Bit flags may be declared on float and double fields,
    /// which count as 32 and 64.
    pub fn bit_width(self) -> u32 {
        match self {
            PrimitiveType::Byte | PrimitiveType::UnsignedByte => 8,
            PrimitiveType::Short | PrimitiveType::UnsignedShort => 16,
            PrimitiveType::Int | PrimitiveType::UnsignedInt | PrimitiveType::Float => 32,
            PrimitiveType::Long | PrimitiveType::UnsignedLong | PrimitiveType::Double => 64,
        }
    }

    /// Marshalled size in bytes.
    pub fn size_bytes(self) -> usize {
        (self.bit_width() / 8) as usize
    }
}

/// The element type of a list attribute: either a scalar or a nested class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Primitive { type_name: String },
    ClassRef { class_name: String },
}

/// What an attribute holds. Set exactly once, when the attribute declaration
/// (bare or list-wrapped) is fully parsed; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Primitive { type_name: String },
    ClassRef { class_name: String },
    FixedList { element: ElementType, length: usize },
    VariableList { element: ElementType, count_field: String },
}

impl AttributeKind {
    /// The scalar type carried directly or as a list element, if any.
    pub fn primitive_type_name(&self) -> Option<&str> {
        match self {
            AttributeKind::Primitive { type_name } => Some(type_name),
            AttributeKind::FixedList { element: ElementType::Primitive { type_name }, .. }
            | AttributeKind::VariableList { element: ElementType::Primitive { type_name }, .. } => {
                Some(type_name)
            }
            _ => None,
        }
    }

    /// The class referenced directly or as a list element, if any.
    pub fn target_class_name(&self) -> Option<&str> {
        match self {
            AttributeKind::ClassRef { class_name } => Some(class_name),
            AttributeKind::FixedList { element: ElementType::ClassRef { class_name }, .. }
            | AttributeKind::VariableList { element: ElementType::ClassRef { class_name }, .. } => {
                Some(class_name)
            }
            _ => None,
        }
    }

    pub fn underlying_is_primitive(&self) -> bool {
        self.primitive_type_name().is_some()
    }
}

/// A named sub-range of bits within a primitive attribute.
#[derive(Debug, Clone)]
pub struct BitField {
    pub name: String,
    pub comment: Option<String>,
    /// Textual mask literal as written, decimal or hex ("31", "0x1F").
    pub mask: String,
}

/// An initializer recorded on a class: attribute name and the literal to
/// assign, kept verbatim for emitters.
#[derive(Debug, Clone)]
pub struct InitialValue {
    pub attribute_name: String,
    pub value: String,
}

/// One field of a protocol unit.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub comment: Option<String>,
    pub kind: AttributeKind,
    /// false = kept in the model but excluded from wire-format generation.
    pub serialize: bool,
    pub bit_fields: Vec<BitField>,
    /// Default literal from the declaration, verbatim.
    pub default_value: Option<String>,
}

/// One protocol unit (message type).
#[derive(Debug, Clone)]
pub struct ProtocolClass {
    pub name: String,
    /// None = this class roots an inheritance tree.
    pub parent: Option<String>,
    pub comment: Option<String>,
    /// Marks a unit that stands alone as a complete message.
    pub top_level: bool,
    pub attributes: Vec<Attribute>,
    pub initial_values: Vec<InitialValue>,
}

/// Opaque key/value bag for one target language, handed verbatim to the
/// emitter registered under the same name.
#[derive(Debug, Clone, Default)]
pub struct TargetConfig {
    pub name: String,
    pub properties: Vec<(String, String)>,
}

impl TargetConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// All classes declared by a description, in declaration order, plus any
/// target configuration blocks.
#[derive(Debug, Clone)]
pub struct Model {
    classes: Vec<ProtocolClass>,
    by_name: HashMap<String, usize>,
    targets: Vec<TargetConfig>,
}

impl Model {
    /// Build the lookup index over the parsed classes. Fails with the
    /// offending name when two classes share one.
    pub fn from_parts(
        classes: Vec<ProtocolClass>,
        targets: Vec<TargetConfig>,
    ) -> Result<Model, String> {
        let mut by_name = HashMap::new();
        for (i, class) in classes.iter().enumerate() {
            if by_name.insert(class.name.clone(), i).is_some() {
                return Err(class.name.clone());
            }
        }
        Ok(Model {
            classes,
            by_name,
            targets,
        })
    }

    pub fn classes(&self) -> &[ProtocolClass] {
        &self.classes
    }

    pub fn get_class(&self, name: &str) -> Option<&ProtocolClass> {
        self.by_name.get(name).map(|&i| &self.classes[i])
    }

    /// The declared parent of `class`, if it names a known class.
    pub fn parent_of(&self, class: &ProtocolClass) -> Option<&ProtocolClass> {
        class.parent.as_deref().and_then(|p| self.get_class(p))
    }

    pub fn targets(&self) -> &[TargetConfig] {
        &self.targets
    }

    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }
}
