//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Verifies that no model data is lost when converting DSL text →
//! `Workspace` → DSL text.

use pretty_assertions::assert_eq;
use structo_core::emitter::emit_document;
use structo_core::id::Id;
use structo_core::model::*;
use structo_core::parser::parse_document;
use structo_core::validate::validate_workspace;
use std::collections::HashSet;

// ─── Helpers ─────────────────────────────────────────────────────────────

/// Element shape independent of identities: (name, kind, parent name).
fn element_shape(ws: &Workspace) -> Vec<(String, ElementKind, Option<String>)> {
    ws.elements
        .iter()
        .map(|e| {
            let parent = e
                .parent
                .and_then(|p| ws.element(p))
                .map(|p| p.name.clone());
            (e.name.clone(), e.kind, parent)
        })
        .collect()
}

/// Relationship shape: (source name, target name, description).
fn relationship_shape(ws: &Workspace) -> Vec<(String, String, String)> {
    let name = |id: Id| ws.element(id).map(|e| e.name.clone()).unwrap_or_default();
    ws.relationships
        .iter()
        .map(|r| (name(r.source), name(r.target), r.description.clone()))
        .collect()
}

/// Positions of every element that gets position metadata in some view.
/// Components only appear in component views, which synthesis doesn't add.
fn position_shape(ws: &Workspace) -> Vec<(String, Position)> {
    ws.elements
        .iter()
        .filter(|e| e.kind != ElementKind::Component)
        .map(|e| (e.name.clone(), e.position))
        .collect()
}

fn assert_roundtrip_preserves(input: &str) {
    let first = parse_document(input).expect("first parse failed");
    let emitted = emit_document(&first);
    let second = parse_document(&emitted).expect("re-parse failed");

    assert_eq!(
        element_shape(&first),
        element_shape(&second),
        "elements changed after round-trip.\nEmitted:\n{emitted}"
    );
    assert_eq!(relationship_shape(&first), relationship_shape(&second));
    assert_eq!(
        position_shape(&first),
        position_shape(&second),
        "positions changed after round-trip.\nEmitted:\n{emitted}"
    );
    let keys = |ws: &Workspace| ws.views.iter().map(|v| v.key.clone()).collect::<HashSet<_>>();
    assert!(
        keys(&first).is_subset(&keys(&second)),
        "views lost after round-trip"
    );
}

// ─── Fixtures ────────────────────────────────────────────────────────────

#[test]
fn roundtrip_minimal() {
    assert_roundtrip_preserves(include_str!("fixtures/minimal.dsl"));
}

#[test]
fn roundtrip_hand_written() {
    assert_roundtrip_preserves(include_str!("fixtures/hand_written.dsl"));
}

#[test]
fn roundtrip_internet_banking() {
    assert_roundtrip_preserves(include_str!("fixtures/internet_banking.dsl"));
}

#[test]
fn roundtrip_canvas() {
    assert_roundtrip_preserves(include_str!("fixtures/canvas.dsl"));
}

#[test]
fn fractional_and_large_positions_are_exact() {
    let first = parse_document(include_str!("fixtures/canvas.dsl")).unwrap();
    let position = |ws: &Workspace, name: &str| {
        ws.elements
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.position)
            .unwrap_or_else(|| panic!("element {name} not found"))
    };
    assert_eq!(first.elements.len(), 3);
    assert_eq!(first.relationships.len(), 1);
    assert_eq!(position(&first, "User"), Position::new(10.125, 33.333));
    assert_eq!(position(&first, "Shop"), Position::new(3_000_000_000.0, -2500.75));
    assert_eq!(position(&first, "API"), Position::new(0.1, 999.5));

    let emitted = emit_document(&first);
    assert!(emitted.contains("// element UserPerson 10.125 33.333"));
    let second = parse_document(&emitted).unwrap();
    assert_eq!(first, second);
}

#[test]
fn internet_banking_roundtrip_is_exact() {
    let first = parse_document(include_str!("fixtures/internet_banking.dsl")).unwrap();
    let second = parse_document(&emit_document(&first)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn emit_is_a_fixed_point_after_one_pass() {
    let first = parse_document(include_str!("fixtures/hand_written.dsl")).unwrap();
    let text1 = emit_document(&first);
    let text2 = emit_document(&parse_document(&text1).unwrap());
    assert_eq!(text1, text2);
}

// ─── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn minimal_scenario() {
    let ws = parse_document(include_str!("fixtures/minimal.dsl")).unwrap();
    assert_eq!(ws.elements.len(), 1);
    assert_eq!(ws.elements[0].kind, ElementKind::Person);
    assert_eq!(ws.elements[0].name, "User");
    assert!(ws.relationships.is_empty());

    let text = emit_document(&ws);
    let model = text
        .split("views {")
        .next()
        .expect("model section");
    assert_eq!(model.matches("= person").count(), 1);
    assert!(model.contains("\"User\""));
    assert_eq!(text.matches("systemLandscape").count(), 1);
}

#[test]
fn internet_banking_contents() {
    let ws = parse_document(include_str!("fixtures/internet_banking.dsl")).unwrap();
    assert_eq!(ws.name, "Big Bank");
    assert_eq!(ws.description, "Internet banking \"core\" platform");
    assert_eq!(ws.elements.len(), 12);
    assert_eq!(ws.relationships.len(), 8);

    let group = ws.element(Id::intern("BigBankPlcGroup")).unwrap();
    assert_eq!(group.kind, ElementKind::Group);
    assert_eq!(
        group.size,
        Some(Size {
            width: 600.0,
            height: 300.0
        })
    );

    let mainframe = ws.element(Id::intern("MainframeBankingSystemSystem")).unwrap();
    assert!(mainframe.external);
    assert_eq!(mainframe.parent, Some(group.id));

    let email = ws.element(Id::intern("EMailSystemSystem")).unwrap();
    assert_eq!(email.description, "Microsoft Exchange");
    assert_eq!(email.position, Position::new(320.0, 300.0));

    let db = ws.element(Id::intern("DatabaseContainer")).unwrap();
    assert_eq!(db.technology.as_deref(), Some("PostgreSQL"));
    assert_eq!(db.tags.as_slice(), ["Storage".to_string()]);

    // Implicit-source relationship from inside the SPA block.
    let spa = Id::intern("SinglePageApplicationContainer");
    let web = Id::intern("WebApplicationContainer");
    assert!(
        ws.relationships
            .iter()
            .any(|r| r.source == spa && r.target == web && r.description == "Loads from")
    );

    let context = ws.view_by_key("banking-context").unwrap();
    assert_eq!(context.name, "Internet Banking - Context");
    assert_eq!(context.anchor, Some(Id::intern("InternetBankingSystemSystem")));

    let deployment = ws.view_by_key("live-deployment").unwrap();
    assert_eq!(deployment.kind, ViewKind::Deployment);
    assert_eq!(deployment.name, "Live");

    // Systems without a containers view get one; the deployment node is
    // already covered by "Live".
    assert!(ws.view_by_key("MainframeBankingSystemSystem-containers").is_some());
    assert!(ws.view_by_key("EMailSystemSystem-containers").is_some());
    assert!(ws.view_by_key("deployment-LiveNode").is_none());
    assert_eq!(ws.views.len(), 6);

    assert_eq!(validate_workspace(&ws), Vec::new());
}

#[test]
fn nested_reference_is_not_a_self_loop() {
    let input = r#"workspace {
    model {
        a = softwareSystem "A"
        a = softwareSystem "A2" {
        }
    }
}"#;
    // Re-declared identifiers keep their first bare binding.
    let ws = parse_document(input).unwrap();
    assert_eq!(ws.elements.len(), 2);

    let input = r#"workspace {
    model {
        a = softwareSystem "A" {
            w = container "W"
        }
        a.w -> a "Uses"
    }
}"#;
    let ws = parse_document(input).unwrap();
    let rel = &ws.relationships[0];
    assert_ne!(rel.source, rel.target);
    assert_eq!(ws.element(rel.source).unwrap().name, "W");
    assert_eq!(ws.element(rel.target).unwrap().name, "A");
}

#[test]
fn emitted_identifiers_are_unique() {
    let mut ws = Workspace::default();
    ws.add_element(ElementKind::Person, "User", None);
    ws.add_element(ElementKind::Person, "User", None);
    ws.elements.push(Element::new(
        Id::intern("4c1d-e0"),
        ElementKind::Person,
        "User",
    ));
    let text = emit_document(&ws);
    let idents: Vec<&str> = text
        .lines()
        .filter_map(|l| l.trim().split_once(" = person"))
        .map(|(ident, _)| ident)
        .collect();
    assert_eq!(idents.len(), 3);
    let unique: HashSet<_> = idents.iter().collect();
    assert_eq!(unique.len(), 3, "duplicate identifiers: {idents:?}");

    let back = parse_document(&text).unwrap();
    let ids: HashSet<Id> = back.elements.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 3);
}

#[test]
fn special_characters_survive() {
    let mut ws = Workspace::new("Q\"uotes", "multi\nline");
    let id = ws.add_element(ElementKind::SoftwareSystem, "Платёжный шлюз", None);
    if let Some(e) = ws.element_mut(id) {
        e.description = "Says \"hello\"\nthen leaves".into();
        e.technology = Some(r"C:\Program Files\Shop".into());
    }
    let back = parse_document(&emit_document(&ws)).unwrap();
    assert_eq!(back.name, "Q\"uotes");
    assert_eq!(back.description, "multi\nline");
    let e = back.element(id).expect("same readable identity");
    assert_eq!(e.name, "Платёжный шлюз");
    assert_eq!(e.description, "Says \"hello\"\nthen leaves");
    assert_eq!(e.technology.as_deref(), Some(r"C:\Program Files\Shop"));
}
