//! Sync engine: workspace ↔ DSL text.
//!
//! The engine is the caller-owned state container for one open workspace:
//!
//! - **Model → Text**: canvas-side mutations update the in-memory
//!   `Workspace` and mark the text dirty. The text is re-emitted on
//!   `flush_to_text`, typically once at the end of a gesture.
//!
//! - **Text → Model**: `set_text` replaces the workspace wholesale;
//!   `import_text` additionally re-associates known positions with
//!   elements the text carried no position metadata for (matched by
//!   name + kind).

use serde::{Deserialize, Serialize};
use structo_core::emitter::emit_document;
use structo_core::id::Id;
use structo_core::model::*;
use structo_core::parser::{
    ParseError, ParseOptions, ParseWarning, parse_with_report, preflight,
};
use structo_core::transform::rename_element;
use structo_core::validate::{ValidationError, ensure_valid};

// ─── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("invalid DSL text: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid workspace: {0}")]
    Invalid(#[from] ValidationError),
    #[error("unknown element `{id}`")]
    UnknownElement { id: Id },
    #[error("unknown relationship `{id}`")]
    UnknownRelationship { id: Id },
    #[error("element `{id}` is not a group")]
    NotAGroup { id: Id },
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("corrupt snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── Mutations ───────────────────────────────────────────────────────────

/// A model mutation coming from the editing surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkspaceMutation {
    AddElement {
        kind: ElementKind,
        name: String,
        parent: Option<Id>,
        position: Position,
    },
    /// Remove an element with its subtree, relationships, and views.
    RemoveElement {
        id: Id,
    },
    MoveElement {
        id: Id,
        dx: f32,
        dy: f32,
    },
    ResizeGroup {
        id: Id,
        width: f32,
        height: f32,
    },
    /// Rename and re-key in one atomic step.
    RenameElement {
        id: Id,
        name: String,
    },
    SetDescription {
        id: Id,
        description: String,
    },
    SetTechnology {
        id: Id,
        technology: Option<String>,
    },
    SetExternal {
        id: Id,
        external: bool,
    },
    Connect {
        source: Id,
        target: Id,
        description: String,
    },
    Disconnect {
        id: Id,
    },
}

// ─── Engine ──────────────────────────────────────────────────────────────

/// Holds the authoritative workspace and keeps its text form in sync.
#[derive(Debug)]
pub struct SyncEngine {
    /// The current workspace (single source of truth).
    pub workspace: Workspace,

    /// The current text representation.
    pub text: String,

    /// Warnings from the last parse.
    pub warnings: Vec<ParseWarning>,

    /// Set when the workspace changed and text needs re-emit.
    text_dirty: bool,
}

impl SyncEngine {
    /// Create an engine from DSL source text. The stored text is the
    /// canonical emitted form.
    pub fn from_text(text: &str) -> Result<Self, EditorError> {
        let report = parse_with_report(text, &ParseOptions::default())?;
        let text = emit_document(&report.workspace);
        Ok(Self {
            workspace: report.workspace,
            text,
            warnings: report.warnings,
            text_dirty: false,
        })
    }

    /// Create an engine holding an empty workspace.
    pub fn new(name: &str) -> Self {
        let workspace = Workspace::new(name, "");
        let text = emit_document(&workspace);
        Self {
            workspace,
            text,
            warnings: Vec::new(),
            text_dirty: false,
        }
    }

    // ─── Model → Text direction ──────────────────────────────────────────

    /// Apply a mutation to the workspace and mark the text dirty.
    ///
    /// Returns the identity created (add, connect) or re-keyed (rename).
    pub fn apply_mutation(&mut self, mutation: WorkspaceMutation) -> Result<Option<Id>, EditorError> {
        let ws = &mut self.workspace;
        let created = match mutation {
            WorkspaceMutation::AddElement {
                kind,
                name,
                parent,
                position,
            } => {
                if let Some(parent) = parent
                    && ws.element(parent).is_none()
                {
                    return Err(EditorError::UnknownElement { id: parent });
                }
                let id = ws.add_element(kind, &name, parent);
                if let Some(element) = ws.element_mut(id) {
                    element.position = position;
                }
                Some(id)
            }
            WorkspaceMutation::RemoveElement { id } => {
                if ws.remove_element(id) == 0 {
                    return Err(EditorError::UnknownElement { id });
                }
                None
            }
            WorkspaceMutation::MoveElement { id, dx, dy } => {
                let element = ws
                    .element_mut(id)
                    .ok_or(EditorError::UnknownElement { id })?;
                element.position.x += dx;
                element.position.y += dy;
                None
            }
            WorkspaceMutation::ResizeGroup { id, width, height } => {
                let element = ws
                    .element_mut(id)
                    .ok_or(EditorError::UnknownElement { id })?;
                if element.kind != ElementKind::Group {
                    return Err(EditorError::NotAGroup { id });
                }
                element.size = Some(Size { width, height });
                None
            }
            WorkspaceMutation::RenameElement { id, name } => {
                let (renamed, new_id) =
                    rename_element(ws, id, &name).ok_or(EditorError::UnknownElement { id })?;
                *ws = renamed;
                Some(new_id)
            }
            WorkspaceMutation::SetDescription { id, description } => {
                ws.element_mut(id)
                    .ok_or(EditorError::UnknownElement { id })?
                    .description = description;
                None
            }
            WorkspaceMutation::SetTechnology { id, technology } => {
                ws.element_mut(id)
                    .ok_or(EditorError::UnknownElement { id })?
                    .technology = technology.filter(|t| !t.is_empty());
                None
            }
            WorkspaceMutation::SetExternal { id, external } => {
                ws.element_mut(id)
                    .ok_or(EditorError::UnknownElement { id })?
                    .external = external;
                None
            }
            WorkspaceMutation::Connect {
                source,
                target,
                description,
            } => {
                let missing = if ws.element(source).is_none() {
                    source
                } else {
                    target
                };
                Some(
                    ws.add_relationship(source, target, &description)
                        .ok_or(EditorError::UnknownElement { id: missing })?,
                )
            }
            WorkspaceMutation::Disconnect { id } => {
                ws.remove_relationship(id)
                    .ok_or(EditorError::UnknownRelationship { id })?;
                None
            }
        };

        self.text_dirty = true;
        Ok(created)
    }

    /// Re-emit the text from the current workspace, if it changed.
    /// Called after a batch of mutations (e.g. at end of drag gesture).
    pub fn flush_to_text(&mut self) {
        if self.text_dirty {
            self.text = emit_document(&self.workspace);
            self.text_dirty = false;
        }
    }

    // ─── Text → Model direction ──────────────────────────────────────────

    /// Replace the whole workspace from text. The text is kept verbatim.
    pub fn set_text(&mut self, new_text: &str) -> Result<(), EditorError> {
        let report = parse_with_report(new_text, &ParseOptions::default())?;
        self.workspace = report.workspace;
        self.warnings = report.warnings;
        self.text = new_text.to_string();
        self.text_dirty = false;
        Ok(())
    }

    /// Import untrusted text, keeping known positions.
    ///
    /// Runs the preflight gate, parses, then gives every element whose
    /// position came from the grid fallback the position of the current
    /// element with the same name and kind, if there is one. Returns the
    /// number of positions carried over.
    pub fn import_text(&mut self, new_text: &str) -> Result<usize, EditorError> {
        preflight(new_text)?;
        let report = parse_with_report(new_text, &ParseOptions::default())?;
        let mut workspace = report.workspace;

        let mut merged = 0;
        for id in &report.fallback_positioned {
            let Some(element) = workspace.element_mut(*id) else {
                continue;
            };
            let Some(known) = self
                .workspace
                .elements
                .iter()
                .find(|e| e.name == element.name && e.kind == element.kind)
            else {
                continue;
            };
            element.position = known.position;
            if element.size.is_none() {
                element.size = known.size;
            }
            merged += 1;
        }
        log::debug!("import carried over {merged} positions");

        self.workspace = workspace;
        self.warnings = report.warnings;
        self.text = new_text.to_string();
        // Carried-over positions only exist in the model until re-emitted.
        self.text_dirty = merged > 0;
        Ok(merged)
    }

    // ─── Snapshots & exchange ────────────────────────────────────────────

    /// Compact binary snapshot of the workspace (for undo history).
    pub fn snapshot(&self) -> Result<Vec<u8>, EditorError> {
        Ok(rmp_serde::to_vec(&self.workspace)?)
    }

    /// Restore a snapshot taken with [`SyncEngine::snapshot`].
    pub fn restore(&mut self, snapshot: &[u8]) -> Result<(), EditorError> {
        self.workspace = rmp_serde::from_slice(snapshot)?;
        self.text_dirty = true;
        Ok(())
    }

    /// Export the workspace as JSON for external collaborators.
    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(&self.workspace)?)
    }

    /// Load a workspace from JSON. The model must pass validation.
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        let workspace: Workspace = serde_json::from_str(json)?;
        ensure_valid(&workspace)?;
        let text = emit_document(&workspace);
        Ok(Self {
            workspace,
            text,
            warnings: Vec::new(),
            text_dirty: false,
        })
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Get current text (synced).
    pub fn current_text(&mut self) -> &str {
        self.flush_to_text();
        &self.text
    }

    pub fn is_text_dirty(&self) -> bool {
        self.text_dirty
    }

    /// Look up an element by display name and kind.
    pub fn find(&self, name: &str, kind: ElementKind) -> Option<&Element> {
        self.workspace
            .elements
            .iter()
            .find(|e| e.name == name && e.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"workspace "Shop" {
    model {
        u = person "User"
        s = softwareSystem "Store" {
            api = container "API"
        }
        u -> s.api "Orders"
    }
}"#;

    #[test]
    fn from_text_stores_canonical_text() {
        let engine = SyncEngine::from_text(SHOP).unwrap();
        assert_eq!(engine.workspace.elements.len(), 3);
        assert!(engine.text.contains("UserPerson -> ApiContainer \"Orders\""));
        assert!(!engine.is_text_dirty());
    }

    #[test]
    fn mutation_marks_dirty_until_flush() {
        let mut engine = SyncEngine::from_text(SHOP).unwrap();
        engine
            .apply_mutation(WorkspaceMutation::MoveElement {
                id: Id::intern("UserPerson"),
                dx: 15.0,
                dy: -5.0,
            })
            .unwrap();
        assert!(engine.is_text_dirty());
        let text = engine.current_text().to_string();
        assert!(text.contains("// element UserPerson 55 35"));
        assert!(!engine.is_text_dirty());
    }

    #[test]
    fn unknown_targets_are_errors() {
        let mut engine = SyncEngine::new("Empty");
        let ghost = Id::intern("GhostPerson");
        assert!(matches!(
            engine.apply_mutation(WorkspaceMutation::RemoveElement { id: ghost }),
            Err(EditorError::UnknownElement { .. })
        ));
        assert!(matches!(
            engine.apply_mutation(WorkspaceMutation::Disconnect { id: ghost }),
            Err(EditorError::UnknownRelationship { .. })
        ));
        assert!(!engine.is_text_dirty());
    }

    #[test]
    fn resize_requires_group() {
        let mut engine = SyncEngine::from_text(SHOP).unwrap();
        let err = engine
            .apply_mutation(WorkspaceMutation::ResizeGroup {
                id: Id::intern("UserPerson"),
                width: 10.0,
                height: 10.0,
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "element `UserPerson` is not a group");
    }

    #[test]
    fn mutation_from_json() {
        let json = r#"{"op":"move_element","id":"UserPerson","dx":5.0,"dy":0.0}"#;
        let mutation: WorkspaceMutation = serde_json::from_str(json).unwrap();
        let mut engine = SyncEngine::from_text(SHOP).unwrap();
        engine.apply_mutation(mutation).unwrap();
        assert_eq!(
            engine.workspace.element(Id::intern("UserPerson")).unwrap().position,
            Position::new(45.0, 40.0)
        );
    }

    #[test]
    fn snapshot_restore() {
        let mut engine = SyncEngine::from_text(SHOP).unwrap();
        let snapshot = engine.snapshot().unwrap();
        engine
            .apply_mutation(WorkspaceMutation::RemoveElement {
                id: Id::intern("StoreSystem"),
            })
            .unwrap();
        assert_eq!(engine.workspace.elements.len(), 1);
        engine.restore(&snapshot).unwrap();
        assert_eq!(engine.workspace.elements.len(), 3);
        assert!(matches!(
            engine.restore(&[0xc1]),
            Err(EditorError::Decode(_))
        ));
    }
}
