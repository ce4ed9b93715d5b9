//! Integration tests: undo/redo command stack (structo-editor).
//!
//! Tests the CommandStack + SyncEngine interaction, verifying that
//! mutations can be undone and redone correctly across crate boundaries.

use structo_core::id::Id;
use structo_core::model::*;
use structo_editor::commands::CommandStack;
use structo_editor::sync::{SyncEngine, WorkspaceMutation};

fn make_engine() -> SyncEngine {
    SyncEngine::from_text(include_str!("fixtures/payments.dsl")).unwrap()
}

fn position(engine: &SyncEngine, id: &str) -> Position {
    engine.workspace.element(Id::intern(id)).unwrap().position
}

// ─── Basic undo/redo ─────────────────────────────────────────────────────

#[test]
fn undo_restores_previous_position() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);

    stack
        .execute(
            &mut engine,
            WorkspaceMutation::MoveElement {
                id: Id::intern("MerchantPerson"),
                dx: 50.0,
                dy: 25.0,
            },
            "Move merchant",
        )
        .unwrap();
    assert_eq!(position(&engine, "MerchantPerson"), Position::new(150.0, 125.0));

    let desc = stack.undo(&mut engine).unwrap();
    assert_eq!(desc.as_deref(), Some("Move merchant"));
    assert_eq!(position(&engine, "MerchantPerson"), Position::new(100.0, 100.0));

    let desc = stack.redo(&mut engine).unwrap();
    assert_eq!(desc.as_deref(), Some("Move merchant"));
    assert_eq!(position(&engine, "MerchantPerson"), Position::new(150.0, 125.0));
}

#[test]
fn undo_remove_restores_cascade() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    let before = engine.workspace.clone();

    stack
        .execute(
            &mut engine,
            WorkspaceMutation::RemoveElement {
                id: Id::intern("PaymentGatewaySystem"),
            },
            "Delete gateway",
        )
        .unwrap();
    assert_eq!(engine.workspace.relationships.len(), 0);

    stack.undo(&mut engine).unwrap();
    assert_eq!(engine.workspace, before);
    assert!(engine.current_text().contains("Records transactions"));
}

#[test]
fn undo_rename_restores_identity() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    let new = stack
        .execute(
            &mut engine,
            WorkspaceMutation::RenameElement {
                id: Id::intern("CardIssuerSystem"),
                name: "Card Network".into(),
            },
            "Rename issuer",
        )
        .unwrap()
        .unwrap();
    assert_eq!(new, Id::intern("CardNetworkSystem"));

    stack.undo(&mut engine).unwrap();
    assert!(engine.workspace.element(Id::intern("CardIssuerSystem")).is_some());
    assert!(engine.workspace.element(new).is_none());

    stack.redo(&mut engine).unwrap();
    assert!(engine.workspace.element(new).is_some());
}

#[test]
fn new_action_clears_redo() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    let merchant = Id::intern("MerchantPerson");
    let nudge = |dx| WorkspaceMutation::MoveElement {
        id: merchant,
        dx,
        dy: 0.0,
    };

    stack.execute(&mut engine, nudge(10.0), "a").unwrap();
    stack.undo(&mut engine).unwrap();
    assert!(stack.can_redo());
    stack.execute(&mut engine, nudge(20.0), "b").unwrap();
    assert!(!stack.can_redo());
    assert_eq!(stack.redo(&mut engine).unwrap(), None);
}

#[test]
fn set_description_inverse() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    let merchant = Id::intern("MerchantPerson");
    stack
        .execute(
            &mut engine,
            WorkspaceMutation::SetDescription {
                id: merchant,
                description: "Sells things".into(),
            },
            "Describe",
        )
        .unwrap();
    stack.undo(&mut engine).unwrap();
    assert_eq!(
        engine.workspace.element(merchant).unwrap().description,
        "Accepts card payments"
    );
}

// ─── Batching ────────────────────────────────────────────────────────────

#[test]
fn drag_gesture_is_one_undo_step() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    let api = Id::intern("GatewayApiContainer");

    stack.begin_batch(&engine).unwrap();
    for _ in 0..10 {
        stack
            .execute(
                &mut engine,
                WorkspaceMutation::MoveElement {
                    id: api,
                    dx: 5.0,
                    dy: 5.0,
                },
                "drag",
            )
            .unwrap();
    }
    stack.end_batch(&mut engine, "Drag API").unwrap();
    assert_eq!(position(&engine, "GatewayApiContainer"), Position::new(450.0, 350.0));
    assert!(engine.current_text().contains("// element GatewayApiContainer 450 350"));

    assert_eq!(stack.undo_len(), 1);
    assert_eq!(stack.undo(&mut engine).unwrap().as_deref(), Some("Drag API"));
    assert_eq!(position(&engine, "GatewayApiContainer"), Position::new(400.0, 300.0));
    assert!(engine.current_text().contains("// element GatewayApiContainer 400 300"));
}

#[test]
fn nested_batches_collapse() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    stack.begin_batch(&engine).unwrap();
    stack.begin_batch(&engine).unwrap();
    stack
        .execute(
            &mut engine,
            WorkspaceMutation::SetExternal {
                id: Id::intern("MerchantPerson"),
                external: true,
            },
            "inner",
        )
        .unwrap();
    stack.end_batch(&mut engine, "inner").unwrap();
    assert_eq!(stack.undo_len(), 0, "inner end_batch must not commit");
    stack.end_batch(&mut engine, "outer").unwrap();
    assert_eq!(stack.undo_len(), 1);
}

#[test]
fn empty_batch_records_nothing() {
    let mut engine = make_engine();
    let mut stack = CommandStack::new(100);
    stack.begin_batch(&engine).unwrap();
    stack.end_batch(&mut engine, "noop").unwrap();
    assert!(!stack.can_undo());
}
