//! Emitter: `Workspace` → Structo DSL text.
//!
//! Output is deterministic and round-trips through the parser: element
//! positions ride along as `// element ident x y` comments inside each
//! view so strict external tooling still accepts the document.

use crate::id::Id;
use crate::model::*;
use crate::resolve::{DslNames, sanitize_key};
use std::fmt::Write;

// ─── Config ──────────────────────────────────────────────────────────────

/// Direction of the `autoLayout` directive written into each view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoLayout {
    #[default]
    LeftRight,
    TopBottom,
    RightLeft,
    BottomTop,
    /// Don't emit an `autoLayout` line.
    Off,
}

impl AutoLayout {
    fn keyword(self) -> Option<&'static str> {
        match self {
            AutoLayout::LeftRight => Some("lr"),
            AutoLayout::TopBottom => Some("tb"),
            AutoLayout::RightLeft => Some("rl"),
            AutoLayout::BottomTop => Some("bt"),
            AutoLayout::Off => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// Spaces per nesting level. Default: **4**.
    pub indent: usize,
    /// Write position metadata comments into views. Default: **true**.
    pub positions: bool,
    /// Write the conventional `styles` block. Default: **true**.
    pub styles: bool,
    pub auto_layout: AutoLayout,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            positions: true,
            styles: true,
            auto_layout: AutoLayout::LeftRight,
        }
    }
}

/// Background / foreground / shape per implicit tag.
const KIND_STYLES: [(ElementKind, &str, &str, Option<&str>); 7] = [
    (ElementKind::Person, "#08427b", "#ffffff", Some("Person")),
    (ElementKind::SoftwareSystem, "#1168bd", "#ffffff", None),
    (ElementKind::Container, "#438dd5", "#ffffff", None),
    (ElementKind::Component, "#85bbf0", "#000000", None),
    (ElementKind::DeploymentNode, "#ffffff", "#000000", None),
    (ElementKind::InfrastructureNode, "#dddddd", "#000000", None),
    (ElementKind::Group, "#ffffff", "#444444", None),
];

// ─── Public API ──────────────────────────────────────────────────────────

/// Emit a `Workspace` as DSL text with the default configuration.
#[must_use]
pub fn emit_document(workspace: &Workspace) -> String {
    emit_document_with(workspace, &EmitConfig::default())
}

#[must_use]
pub fn emit_document_with(workspace: &Workspace, config: &EmitConfig) -> String {
    let names = DslNames::for_workspace(workspace);
    let mut em = Emitter {
        out: String::with_capacity(256 + workspace.elements.len() * 96),
        ws: workspace,
        names: &names,
        config,
    };
    em.document();
    em.out
}

/// Escape a string for a DSL quoted literal: `"` and newline, nothing else.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

// ─── Emitter ─────────────────────────────────────────────────────────────

struct Emitter<'a> {
    out: String,
    ws: &'a Workspace,
    names: &'a DslNames,
    config: &'a EmitConfig,
}

impl<'a> Emitter<'a> {
    fn indent(&mut self, depth: usize) {
        for _ in 0..depth * self.config.indent {
            self.out.push(' ');
        }
    }

    fn document(&mut self) {
        let _ = writeln!(
            self.out,
            "workspace \"{}\" \"{}\" {{",
            escape(&self.ws.name),
            escape(&self.ws.description)
        );
        self.out.push('\n');
        self.model();
        self.out.push('\n');
        self.views();
        self.out.push_str("}\n");
    }

    fn model(&mut self) {
        self.indent(1);
        self.out.push_str("model {\n");
        let ws = self.ws;
        for element in ws.roots() {
            self.element(element, 2);
        }

        let mut wrote_gap = false;
        for rel in &ws.relationships {
            let (Some(source), Some(target)) = (self.ident(rel.source), self.ident(rel.target))
            else {
                log::debug!("omitting relationship {} with dangling endpoint", rel.id);
                continue;
            };
            if !wrote_gap {
                self.out.push('\n');
                wrote_gap = true;
            }
            self.indent(2);
            let _ = write!(
                self.out,
                "{source} -> {target} \"{}\"",
                escape(&rel.description)
            );
            let tags = rel.tags.join(",");
            if rel.technology.is_some() || !tags.is_empty() {
                let tech = rel.technology.as_deref().unwrap_or_default();
                let _ = write!(self.out, " \"{}\"", escape(tech));
            }
            if !tags.is_empty() {
                let _ = write!(self.out, " \"{}\"", escape(&tags));
            }
            self.out.push('\n');
        }
        self.indent(1);
        self.out.push_str("}\n");
    }

    /// Depth-first pre-order: the element, then its children, then the
    /// next sibling.
    fn element(&mut self, element: &Element, depth: usize) {
        let ws = self.ws;
        let children: Vec<&Element> = ws.children(element.id).collect();
        self.indent(depth);
        if element.kind == ElementKind::Group {
            let _ = write!(self.out, "group \"{}\"", escape(&element.name));
        } else {
            let ident = self.ident(element.id).unwrap_or_default();
            let _ = write!(
                self.out,
                "{ident} = {} \"{}\" \"{}\"",
                element.kind.keyword(),
                escape(&element.name),
                escape(&element.description)
            );
            let mut tags: Vec<&str> = element.tags.iter().map(String::as_str).collect();
            if element.external && !tags.contains(&EXTERNAL_TAG) {
                tags.push(EXTERNAL_TAG);
            }
            let tags = tags.join(",");
            if element.technology.is_some() || !tags.is_empty() {
                let tech = element.technology.as_deref().unwrap_or_default();
                let _ = write!(self.out, " \"{}\"", escape(tech));
            }
            if !tags.is_empty() {
                let _ = write!(self.out, " \"{}\"", escape(&tags));
            }
        }

        if children.is_empty() && element.kind != ElementKind::Group {
            self.out.push('\n');
            return;
        }
        self.out.push_str(" {\n");
        for child in children {
            self.element(child, depth + 1);
        }
        self.indent(depth);
        self.out.push_str("}\n");
    }

    fn views(&mut self) {
        self.indent(1);
        self.out.push_str("views {\n");
        let ws = self.ws;
        for view in &ws.views {
            self.view(view);
        }
        if self.config.styles {
            self.styles();
        }
        self.indent(1);
        self.out.push_str("}\n");
    }

    fn view(&mut self, view: &View) {
        let key = sanitize_key(&view.key);
        let anchor = view.anchor.and_then(|a| self.ident(a)).unwrap_or("*");
        self.indent(2);
        match view.kind {
            ViewKind::SystemLandscape => {
                let _ = write!(self.out, "systemLandscape \"{key}\"");
            }
            ViewKind::SystemContext | ViewKind::Container | ViewKind::Component => {
                let _ = write!(self.out, "{} {anchor} \"{key}\"", view.kind.keyword());
            }
            ViewKind::Deployment => {
                let _ = write!(
                    self.out,
                    "deployment {anchor} \"{}\" \"{key}\"",
                    escape(&view.name)
                );
            }
        }
        let _ = writeln!(self.out, " \"{}\" {{", escape(&view.description));

        self.indent(3);
        let _ = writeln!(self.out, "title \"{}\"", escape(&view.name));
        self.indent(3);
        self.out.push_str("include *\n");

        if self.config.positions {
            let ws = self.ws;
            for element in &ws.elements {
                if !view.kind.accepts(element.kind) {
                    continue;
                }
                self.position_comment(element);
            }
        }

        if let Some(direction) = self.config.auto_layout.keyword() {
            self.indent(3);
            let _ = writeln!(self.out, "autoLayout {direction}");
        }
        self.indent(2);
        self.out.push_str("}\n");
    }

    fn position_comment(&mut self, element: &Element) {
        let Position { x, y } = element.position;
        if element.kind == ElementKind::Group {
            self.indent(3);
            let _ = write!(
                self.out,
                "// group \"{}\" {} {}",
                escape(&element.name),
                format_num(x),
                format_num(y)
            );
            if let Some(size) = element.size {
                let _ = write!(
                    self.out,
                    " {} {}",
                    format_num(size.width),
                    format_num(size.height)
                );
            }
            self.out.push('\n');
        } else if let Some(ident) = self.ident(element.id) {
            self.indent(3);
            let _ = writeln!(
                self.out,
                "// element {ident} {} {}",
                format_num(x),
                format_num(y)
            );
        }
    }

    fn styles(&mut self) {
        self.indent(2);
        self.out.push_str("styles {\n");
        for (kind, background, color, shape) in KIND_STYLES {
            self.style_block(kind.tag(), background, color, shape);
        }
        self.style_block(EXTERNAL_TAG, "#999999", "#ffffff", None);
        self.indent(2);
        self.out.push_str("}\n");
    }

    fn style_block(&mut self, tag: &str, background: &str, color: &str, shape: Option<&str>) {
        self.indent(3);
        let _ = writeln!(self.out, "element \"{tag}\" {{");
        self.indent(4);
        let _ = writeln!(self.out, "background {background}");
        self.indent(4);
        let _ = writeln!(self.out, "color {color}");
        if let Some(shape) = shape {
            self.indent(4);
            let _ = writeln!(self.out, "shape {shape}");
        }
        self.indent(3);
        self.out.push_str("}\n");
    }

    fn ident(&self, id: Id) -> Option<&'a str> {
        self.names.get(id)
    }
}

/// Format a coordinate in its shortest exact form (`40`, `10.125`).
fn format_num(n: f32) -> String {
    format!("{n}")
}
