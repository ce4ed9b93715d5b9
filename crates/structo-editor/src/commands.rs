//! Undo/Redo command stack.
//!
//! Cheap, exactly invertible mutations (move, resize, description) are
//! stored as a forward/inverse pair. Everything else, and every drag
//! gesture, is stored as a pair of `rmp-serde` workspace snapshots taken
//! before and after, so undo/redo restores the whole model in one step.

use crate::sync::{EditorError, SyncEngine, WorkspaceMutation};
use structo_core::id::Id;

/// One undoable step.
#[derive(Debug, Clone)]
pub enum Command {
    /// Single mutation with its inverse.
    Single {
        forward: Box<WorkspaceMutation>,
        inverse: Box<WorkspaceMutation>,
        description: String,
    },
    /// Workspace snapshots taken before and after the step.
    Snapshot {
        before: Vec<u8>,
        after: Vec<u8>,
        description: String,
    },
}

impl Command {
    pub fn description(&self) -> &str {
        match self {
            Command::Single { description, .. } | Command::Snapshot { description, .. } => {
                description
            }
        }
    }
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of a batch.
    batch_snapshot: Option<Vec<u8>>,
    /// Whether any mutations occurred during the current batch.
    batch_dirty: bool,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_dirty: false,
        }
    }

    /// Start a batch group. All mutations until the matching `end_batch()`
    /// are applied live but undone as one step.
    pub fn begin_batch(&mut self, engine: &SyncEngine) -> Result<(), EditorError> {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(engine.snapshot()?);
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
        Ok(())
    }

    /// End a batch group. When the outermost batch closes and the
    /// workspace changed, push one snapshot command.
    pub fn end_batch(&mut self, engine: &mut SyncEngine, description: &str) -> Result<(), EditorError> {
        if self.batch_depth == 0 {
            return Ok(());
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return Ok(());
        }

        let before = self.batch_snapshot.take().unwrap_or_default();
        if self.batch_dirty {
            engine.flush_to_text();
            let after = engine.snapshot()?;
            if before != after {
                self.push(Command::Snapshot {
                    before,
                    after,
                    description: description.to_string(),
                });
            }
        }
        self.batch_dirty = false;
        Ok(())
    }

    /// Apply a mutation through the engine and record it for undo.
    pub fn execute(
        &mut self,
        engine: &mut SyncEngine,
        mutation: WorkspaceMutation,
        description: &str,
    ) -> Result<Option<Id>, EditorError> {
        if self.batch_depth > 0 {
            // Captured by the snapshot at end_batch().
            let created = engine.apply_mutation(mutation)?;
            self.batch_dirty = true;
            return Ok(created);
        }

        let (command, created) = match compute_inverse(engine, &mutation) {
            Some(inverse) => {
                let created = engine.apply_mutation(mutation.clone())?;
                let command = Command::Single {
                    forward: Box::new(mutation),
                    inverse: Box::new(inverse),
                    description: description.to_string(),
                };
                (command, created)
            }
            None => {
                let before = engine.snapshot()?;
                let created = engine.apply_mutation(mutation)?;
                let command = Command::Snapshot {
                    before,
                    after: engine.snapshot()?,
                    description: description.to_string(),
                };
                (command, created)
            }
        };
        self.push(command);
        Ok(created)
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, engine: &mut SyncEngine) -> Result<Option<String>, EditorError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        let applied = match &cmd {
            Command::Single { inverse, .. } => engine.apply_mutation(*inverse.clone()).map(drop),
            Command::Snapshot { before, .. } => engine.restore(before),
        };
        if let Err(err) = applied {
            self.undo_stack.push(cmd);
            return Err(err);
        }
        let description = cmd.description().to_string();
        self.redo_stack.push(cmd);
        Ok(Some(description))
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, engine: &mut SyncEngine) -> Result<Option<String>, EditorError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        let applied = match &cmd {
            Command::Single { forward, .. } => engine.apply_mutation(*forward.clone()).map(drop),
            Command::Snapshot { after, .. } => engine.restore(after),
        };
        if let Err(err) = applied {
            self.redo_stack.push(cmd);
            return Err(err);
        }
        let description = cmd.description().to_string();
        self.undo_stack.push(cmd);
        Ok(Some(description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    fn push(&mut self, command: Command) {
        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // A new action invalidates the redo history.
        self.redo_stack.clear();
    }
}

/// Inverse of `mutation` against the engine's current state, for the
/// mutations that have a cheap exact inverse. `None` means "snapshot it".
fn compute_inverse(engine: &SyncEngine, mutation: &WorkspaceMutation) -> Option<WorkspaceMutation> {
    let ws = &engine.workspace;
    match mutation {
        WorkspaceMutation::MoveElement { id, dx, dy } => {
            ws.element(*id)?;
            Some(WorkspaceMutation::MoveElement {
                id: *id,
                dx: -dx,
                dy: -dy,
            })
        }
        WorkspaceMutation::ResizeGroup { id, .. } => {
            let size = ws.element(*id)?.size?;
            Some(WorkspaceMutation::ResizeGroup {
                id: *id,
                width: size.width,
                height: size.height,
            })
        }
        WorkspaceMutation::SetDescription { id, .. } => Some(WorkspaceMutation::SetDescription {
            id: *id,
            description: ws.element(*id)?.description.clone(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structo_core::model::{ElementKind, Position};

    fn engine() -> SyncEngine {
        SyncEngine::from_text(
            r#"workspace {
    model {
        u = person "User"
    }
}"#,
        )
        .unwrap()
    }

    #[test]
    fn move_is_recorded_as_single() {
        let mut engine = engine();
        let mut stack = CommandStack::new(10);
        stack
            .execute(
                &mut engine,
                WorkspaceMutation::MoveElement {
                    id: Id::intern("UserPerson"),
                    dx: 10.0,
                    dy: 0.0,
                },
                "Move",
            )
            .unwrap();
        assert!(matches!(stack.undo_stack[0], Command::Single { .. }));
    }

    #[test]
    fn failed_mutation_is_not_recorded() {
        let mut engine = engine();
        let mut stack = CommandStack::new(10);
        let result = stack.execute(
            &mut engine,
            WorkspaceMutation::RemoveElement {
                id: Id::intern("NobodyPerson"),
            },
            "Remove",
        );
        assert!(result.is_err());
        assert!(!stack.can_undo());
    }

    #[test]
    fn max_depth_drops_oldest() {
        let mut engine = engine();
        let mut stack = CommandStack::new(2);
        for i in 0..3 {
            stack
                .execute(
                    &mut engine,
                    WorkspaceMutation::AddElement {
                        kind: ElementKind::Person,
                        name: format!("P{i}"),
                        parent: None,
                        position: Position::default(),
                    },
                    &format!("Add {i}"),
                )
                .unwrap();
        }
        assert_eq!(stack.undo_len(), 2);
        assert_eq!(stack.undo(&mut engine).unwrap().as_deref(), Some("Add 2"));
        assert_eq!(stack.undo(&mut engine).unwrap().as_deref(), Some("Add 1"));
        assert_eq!(stack.undo(&mut engine).unwrap(), None);
        // "Add 0" could not be undone.
        assert!(engine.find("P0", ElementKind::Person).is_some());
        assert!(engine.find("P1", ElementKind::Person).is_none());
    }
}
