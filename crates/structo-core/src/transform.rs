//! Whole-workspace passes: view synthesis and identity re-keying.
//!
//! `synthesize_views` runs in place and is idempotent. Re-key and rename
//! never mutate their input: they return a rewritten copy, so no caller
//! can observe a workspace with a mix of old and new identities.

use crate::id::Id;
use crate::model::*;
use crate::resolve::readable_id;

// ─── View synthesis ──────────────────────────────────────────────────────

/// Guarantee the structural view set:
/// - exactly one landscape view (injected first if missing; extras dropped),
/// - a containers view anchored on every software system,
/// - a deployment view for every deployment node.
///
/// Returns the number of views added. Running it twice adds nothing.
pub fn synthesize_views(workspace: &mut Workspace) -> usize {
    let mut added = 0;

    let mut seen_landscape = false;
    workspace.views.retain(|v| {
        if v.kind != ViewKind::SystemLandscape {
            return true;
        }
        if seen_landscape {
            log::warn!("dropping extra landscape view `{}`", v.key);
            return false;
        }
        seen_landscape = true;
        true
    });
    if !seen_landscape {
        let mut landscape = View::landscape();
        if workspace.contains_id(landscape.id) {
            landscape.id = workspace.fresh_id("view");
        }
        log::debug!("synthesized landscape view");
        workspace.views.insert(0, landscape);
        added += 1;
    }

    let mut pending = Vec::new();
    for element in &workspace.elements {
        let covered = match element.kind {
            ElementKind::SoftwareSystem => workspace
                .views
                .iter()
                .any(|v| v.kind == ViewKind::Container && v.anchor == Some(element.id)),
            ElementKind::DeploymentNode => {
                let key = deployment_view_key(element.id);
                workspace.views.iter().any(|v| {
                    v.kind == ViewKind::Deployment
                        && (v.key == key
                            || v.anchor == Some(element.id)
                            || (!element.name.is_empty() && v.name.contains(&element.name)))
                })
            }
            _ => true,
        };
        if !covered {
            pending.push(match element.kind {
                ElementKind::SoftwareSystem => View::containers_of(element),
                _ => View::deployment_of(element),
            });
        }
    }

    for view in pending {
        log::debug!("synthesized {} view `{}`", view.kind.keyword(), view.key);
        push_unique(workspace, view);
        added += 1;
    }
    added
}

/// Append a view, disambiguating its key and identity if already taken.
fn push_unique(workspace: &mut Workspace, mut view: View) {
    if workspace.view_by_key(&view.key).is_some() || workspace.contains_id(view.id) {
        let base = view.key.clone();
        let mut n = 2;
        loop {
            let key = format!("{base}-{n}");
            let id = Id::intern(&format!("view-{key}"));
            if workspace.view_by_key(&key).is_none() && !workspace.contains_id(id) {
                view.key = key;
                view.id = id;
                break;
            }
            n += 1;
        }
    }
    workspace.views.push(view);
}

// ─── Re-key & rename ─────────────────────────────────────────────────────

/// Recompute `old`'s readable identity from its current kind and name and
/// return a copy of the workspace with every reference substituted:
/// the element itself, children's parent links, relationship endpoints,
/// view anchors, and the derived keys of its auto-created views.
///
/// Returns `None` if `old` is not an element. The new identity equals
/// `old` when the name still maps to it.
#[must_use]
pub fn rekey_element(workspace: &Workspace, old: Id) -> Option<(Workspace, Id)> {
    let element = workspace.element(old)?;
    let new = readable_id(element.kind, &element.name, |c| {
        c != old && workspace.contains_id(c)
    });
    let mut out = workspace.clone();
    if new == old {
        return Some((out, old));
    }

    let swap = |id: &mut Id| {
        if *id == old {
            *id = new;
        }
    };
    for element in &mut out.elements {
        swap(&mut element.id);
        if let Some(parent) = element.parent.as_mut() {
            swap(parent);
        }
    }
    for rel in &mut out.relationships {
        swap(&mut rel.source);
        swap(&mut rel.target);
    }

    let derived = [
        (container_view_key(old), container_view_key(new)),
        (component_view_key(old), component_view_key(new)),
        (deployment_view_key(old), deployment_view_key(new)),
    ];
    for view in &mut out.views {
        if let Some(anchor) = view.anchor.as_mut() {
            swap(anchor);
        }
        if let Some((_, key)) = derived.iter().find(|(from, _)| *from == view.key) {
            let id = Id::intern(&format!("view-{key}"));
            if !workspace.contains_id(id) {
                view.key = key.clone();
                view.id = id;
            }
        }
    }
    log::debug!("re-keyed {old} -> {new}");
    Some((out, new))
}

/// Rename an element and re-key it to match its new name, in one step.
///
/// Names of views derived from the old name (`"{name} - Containers"`, or a
/// deployment view named after a node) follow the rename.
#[must_use]
pub fn rename_element(workspace: &Workspace, id: Id, name: &str) -> Option<(Workspace, Id)> {
    let element = workspace.element(id)?;
    let old_name = element.name.clone();
    let kind = element.kind;

    let mut renamed = workspace.clone();
    if let Some(element) = renamed.element_mut(id) {
        element.name = name.to_string();
    }
    for view in &mut renamed.views {
        let anchored = view.anchor == Some(id);
        let deployment = kind == ElementKind::DeploymentNode
            && view.kind == ViewKind::Deployment
            && view.key == deployment_view_key(id);
        if (anchored || deployment)
            && let Some(rest) = view.name.strip_prefix(old_name.as_str())
        {
            view.name = format!("{name}{rest}");
        }
    }
    rekey_element(&renamed, id)
}
