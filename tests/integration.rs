//! Integration tests: parse a description, validate it, derive the flattened
//! attribute and class orders, and emit Python source.

use pdugen::bitfield::{extract, insert, shift_for};
use pdugen::emit::{emitter_for, write_artifacts};
use pdugen::{
    has_errors, order_classes, parse, resolve_attributes, validate, Model, PrimitiveType, Severity,
};

const ENTITY_PROTO: &str = r#"
target python {
	filename = "entities.py";
}

class EntityID "Unique designation of an entity" {
	attribute siteID { primitive unsigned short; }
	attribute applicationID { primitive unsigned short; }
	attribute entityNumber { primitive unsigned short; }
}

class Pdu "Base of all protocol units" {
	initial protocolVersion = 6;
	attribute protocolVersion { primitive unsigned byte; }
	attribute pduType {
		primitive unsigned byte;
		flag kind mask 0x0F "low nibble selects the kind";
		flag family mask 0xF0;
	}
}

class EntityStatePdu : Pdu "Position and state of one entity" toplevel {
	attribute entityID { classref EntityID; }
	attribute numberOfRecords { primitive unsigned byte; }
	attribute records {
		variablelist numberOfRecords { classref EntityID; }
	}
	attribute marking { fixedlist 4 { primitive byte; } }
	attribute padding serialize = false { primitive short; }
}
"#;

fn entity_model() -> Model {
    parse(ENTITY_PROTO).expect("parse").model
}

// ==================== Validation ====================

#[test]
fn cross_referencing_classes_validate_clean() {
    let src = r#"
class EntityID {
	attribute siteID { primitive unsigned short; }
}
class Pdu {
	attribute entityID { classref EntityID; }
}
"#;
    let model = parse(src).expect("parse").model;
    let findings = validate(&model);
    assert!(
        findings.is_empty(),
        "expected no findings, got {:?}",
        findings
    );
}

#[test]
fn unresolved_classref_is_an_error_naming_both_classes() {
    let src = r#"
class Bad {
	attribute ghost { classref Missing; }
}
"#;
    let model = parse(src).expect("parse").model;
    let findings = validate(&model);
    assert!(has_errors(&findings));
    let finding = &findings[0];
    assert_eq!(finding.severity, Severity::Error);
    assert_eq!(finding.class_name.as_deref(), Some("Bad"));
    assert!(finding.message.contains("Missing"));
}

#[test]
fn warnings_alone_do_not_block_generation() {
    let src = r#"
target python {
	filename = "w.py";
}
class Pdu {
	initial nonexistent = 1;
	attribute x { primitive byte; }
}
"#;
    let model = parse(src).expect("parse").model;
    let findings = validate(&model);
    assert_eq!(findings.len(), 1);
    assert!(!has_errors(&findings));
    let emitter = emitter_for("python").expect("python emitter");
    assert!(emitter.emit(&model).is_ok());
}

#[test]
fn full_description_validates_clean() {
    let model = entity_model();
    let findings = validate(&model);
    assert!(findings.is_empty(), "unexpected findings: {:?}", findings);
}

// ==================== Class ordering ====================

#[test]
fn parents_are_ordered_before_subclasses() {
    let src = r#"
class B : A { attribute b { primitive byte; } }
class C : A { attribute c { primitive byte; } }
class A { attribute a { primitive byte; } }
"#;
    let model = parse(src).expect("parse").model;
    let names: Vec<&str> = order_classes(&model)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    let pos = |n: &str| names.iter().position(|&x| x == n).expect("class placed");
    assert_eq!(names.len(), 3);
    assert!(pos("A") < pos("B"));
    assert!(pos("A") < pos("C"));
}

#[test]
fn ordering_covers_every_declared_class() {
    let model = entity_model();
    let names: Vec<&str> = order_classes(&model)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names.len(), model.classes().len());
    let pos = |n: &str| names.iter().position(|&x| x == n).expect("class placed");
    assert!(pos("Pdu") < pos("EntityStatePdu"));
}

// ==================== Attribute resolution ====================

#[test]
fn resolution_lists_ancestor_attributes_first() {
    let model = entity_model();
    let esp = model.get_class("EntityStatePdu").expect("EntityStatePdu");
    let resolved = resolve_attributes(&model, esp);
    let names: Vec<&str> = resolved.iter().map(|r| r.attribute.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "protocolVersion",
            "pduType",
            "entityID",
            "numberOfRecords",
            "records",
            "marking",
            "padding"
        ]
    );
    // Stable across calls.
    let again: Vec<String> = resolve_attributes(&model, esp)
        .iter()
        .map(|r| r.attribute.name.clone())
        .collect();
    assert_eq!(names, again.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn count_field_is_bound_to_its_variable_list() {
    let model = entity_model();
    let esp = model.get_class("EntityStatePdu").expect("EntityStatePdu");
    let resolved = resolve_attributes(&model, esp);
    let count = resolved
        .iter()
        .find(|r| r.attribute.name == "numberOfRecords")
        .expect("count field");
    assert!(count.is_dynamic_list_length_field());
    let list_index = count.counts_list.expect("bound");
    assert_eq!(resolved[list_index].attribute.name, "records");
}

// ==================== Bit flags ====================

#[test]
fn shift_amounts_follow_the_lowest_set_bit() {
    assert_eq!(shift_for(PrimitiveType::UnsignedShort, "0x0F0"), 4);
    assert_eq!(shift_for(PrimitiveType::UnsignedByte, "0x1"), 0);
    assert_eq!(shift_for(PrimitiveType::UnsignedShort, "0x8000"), 15);
    assert_eq!(shift_for(PrimitiveType::Double, "0"), 0);
}

#[test]
fn setter_then_getter_round_trips_and_preserves_neighbours() {
    let ty = PrimitiveType::UnsignedByte;
    for storage in 0..=255u64 {
        for value in 0..4u64 {
            let updated = insert(ty, "0x0C", storage, value);
            assert_eq!(extract(ty, "0x0C", updated), value);
            assert_eq!(updated & !0x0C, storage & !0x0C);
        }
    }
}

// ==================== Python emission ====================

#[test]
fn python_emitter_renders_the_whole_model() {
    let model = entity_model();
    assert!(!has_errors(&validate(&model)));

    let emitter = emitter_for("python").expect("python emitter");
    let artifacts = emitter.emit(&model).expect("emit");
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].path.to_str(), Some("entities.py"));
    let py = &artifacts[0].contents;

    // Parent-first class definitions with inheritance.
    let pdu_pos = py.find("class Pdu( object ):").expect("Pdu class");
    let esp_pos = py
        .find("class EntityStatePdu( Pdu ):")
        .expect("EntityStatePdu class");
    assert!(pdu_pos < esp_pos);

    // Subclass methods chain to the superclass.
    assert!(py.contains("super(EntityStatePdu, self).__init__()"));
    assert!(py.contains("super(EntityStatePdu, self).serialize(outputStream)"));
    assert!(py.contains("super(EntityStatePdu, self).parse(inputStream)"));

    // Initial value applied in the constructor.
    assert!(py.contains("self.protocolVersion = 6"));

    // The count field serializes the live list length, not the stored value.
    assert!(py.contains("outputStream.write_unsigned_byte( len(self.records))"));

    // Variable list round trip drives off the count field.
    assert!(py.contains("for idx in range(0, self.numberOfRecords):"));
    assert!(py.contains("element = EntityID()"));

    // Fixed list of four primitives.
    assert!(py.contains("self.marking = [0, 0, 0, 0]"));
    assert!(py.contains("for idx in range(0, 4):"));

    // Non-serialized attributes are initialized but never marshalled.
    assert!(py.contains("self.padding = 0"));
    assert!(!py.contains("write_short(self.padding)"));

    // Flag accessors with mask and shift.
    assert!(py.contains("def getPduType_kind(self):"));
    assert!(py.contains("val = self.pduType & 0x0F"));
    assert!(py.contains("return val >> 0"));
    assert!(py.contains("def setPduType_family(self, val):"));
    assert!(py.contains("val = (val << 4) & 0xF0"));
}

#[test]
fn python_emitter_requires_a_filename() {
    let src = r#"
class Lonely {
	attribute x { primitive byte; }
}
"#;
    let model = parse(src).expect("parse").model;
    let emitter = emitter_for("python").expect("python emitter");
    let err = emitter.emit(&model).expect_err("missing filename");
    assert!(err.to_string().contains("filename"));
}

#[test]
fn artifacts_are_written_to_disk() {
    let model = entity_model();
    let emitter = emitter_for("python").expect("python emitter");
    let artifacts = emitter.emit(&model).expect("emit");

    let dir = tempfile::tempdir().expect("tempdir");
    write_artifacts(dir.path(), &artifacts).expect("write");
    let written = std::fs::read_to_string(dir.path().join("entities.py")).expect("read back");
    assert_eq!(written, artifacts[0].contents);
}

#[test]
fn unknown_targets_have_no_emitter() {
    assert!(emitter_for("fortran").is_none());
}
