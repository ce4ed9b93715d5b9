//! Model-invariant validation.
//!
//! Optional strict layer: the parser recovers from imperfect text, so
//! callers that need guarantees (hand-built models, imported JSON) run
//! [`validate_workspace`] or [`ensure_valid`] before accepting a model.

use crate::id::Id;
use crate::model::{ElementKind, Workspace};
use petgraph::algo::is_cyclic_directed;
use std::collections::HashSet;

// ─── Error type ──────────────────────────────────────────────────────────

/// A single violated model invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("element #{index} has an empty identity")]
    MissingIdentity { index: usize },
    #[error("element `{id}` has an empty name")]
    MissingName { id: Id },
    #[error("unknown element kind `{kind}`")]
    UnknownKind { kind: String },
    #[error("identity `{id}` is used more than once")]
    DuplicateIdentity { id: Id },
    #[error("element `{id}` has parent `{parent}`, which does not exist")]
    DanglingParent { id: Id, parent: Id },
    #[error("the element hierarchy contains a cycle")]
    ParentCycle,
    #[error("relationship `{id}` has unknown source `{source_id}`")]
    DanglingSource { id: Id, source_id: Id },
    #[error("relationship `{id}` has unknown target `{target}`")]
    DanglingTarget { id: Id, target: Id },
    #[error("relationship `{id}` connects `{element}` to itself")]
    SelfRelationship { id: Id, element: Id },
    #[error("view `{key}` is anchored on unknown element `{anchor}`")]
    DanglingAnchor { key: String, anchor: Id },
    #[error("view `{key}` must be anchored on a {expected}, found {found}")]
    WrongAnchorKind {
        key: String,
        expected: ElementKind,
        found: ElementKind,
    },
}

// ─── Public API ──────────────────────────────────────────────────────────

/// Collect every invariant violation in `workspace`.
#[must_use]
pub fn validate_workspace(workspace: &Workspace) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_elements(workspace, &mut errors);
    check_relationships(workspace, &mut errors);
    check_views(workspace, &mut errors);
    errors
}

/// Fail on the first violation.
///
/// # Errors
/// The first [`ValidationError`] found, in element → relationship → view order.
pub fn ensure_valid(workspace: &Workspace) -> Result<(), ValidationError> {
    match validate_workspace(workspace).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ─── Rules ───────────────────────────────────────────────────────────────

fn check_elements(workspace: &Workspace, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<Id> = HashSet::with_capacity(workspace.elements.len());
    for (index, element) in workspace.elements.iter().enumerate() {
        if element.id.as_str().is_empty() {
            errors.push(ValidationError::MissingIdentity { index });
            continue;
        }
        if element.name.trim().is_empty() {
            errors.push(ValidationError::MissingName { id: element.id });
        }
        if !seen.insert(element.id) {
            errors.push(ValidationError::DuplicateIdentity { id: element.id });
        }
    }

    for element in &workspace.elements {
        if let Some(parent) = element.parent
            && !seen.contains(&parent)
        {
            errors.push(ValidationError::DanglingParent {
                id: element.id,
                parent,
            });
        }
    }

    let (graph, _) = workspace.hierarchy();
    if is_cyclic_directed(&graph) {
        errors.push(ValidationError::ParentCycle);
    }
}

fn check_relationships(workspace: &Workspace, errors: &mut Vec<ValidationError>) {
    let known: HashSet<Id> = workspace.elements.iter().map(|e| e.id).collect();
    let mut seen = HashSet::with_capacity(workspace.relationships.len());
    for rel in &workspace.relationships {
        if !seen.insert(rel.id) || known.contains(&rel.id) {
            errors.push(ValidationError::DuplicateIdentity { id: rel.id });
        }
        if !known.contains(&rel.source) {
            errors.push(ValidationError::DanglingSource {
                id: rel.id,
                source_id: rel.source,
            });
        }
        if !known.contains(&rel.target) {
            errors.push(ValidationError::DanglingTarget {
                id: rel.id,
                target: rel.target,
            });
        }
        if rel.source == rel.target {
            errors.push(ValidationError::SelfRelationship {
                id: rel.id,
                element: rel.source,
            });
        }
    }
}

fn check_views(workspace: &Workspace, errors: &mut Vec<ValidationError>) {
    for view in &workspace.views {
        let Some(anchor) = view.anchor else {
            continue;
        };
        let Some(element) = workspace.element(anchor) else {
            errors.push(ValidationError::DanglingAnchor {
                key: view.key.clone(),
                anchor,
            });
            continue;
        };
        if let Some(expected) = view.kind.anchor_kind()
            && element.kind != expected
        {
            errors.push(ValidationError::WrongAnchorKind {
                key: view.key.clone(),
                expected,
                found: element.kind,
            });
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────
