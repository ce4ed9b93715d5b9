//! Parser for the Structo DSL → `Workspace`.
//!
//! Built on `winnow` 0.7 for the per-statement grammar. The document is
//! first normalized into statements (continuations joined, block comments
//! stripped, split on braces outside quoted strings), then walked with an
//! explicit scope stack. Relationships and view anchors are resolved only
//! after the whole text has been scanned, so forward references work.

use crate::id::Id;
use crate::layout::{GridLayout, GroupPlacement, PositionStore};
use crate::model::*;
use crate::resolve::{IdentifierTable, readable_id, sanitize_key};
use crate::transform::synthesize_views;
use smallvec::SmallVec;
use std::collections::HashSet;
use winnow::ascii::space1;
use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take_while;

// ─── Errors & diagnostics ────────────────────────────────────────────────

/// Structural invalidity. Raised before any structural parsing happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("document is empty")]
    Empty,
    #[error("no `workspace` declaration found")]
    MissingWorkspace,
    #[error("unbalanced braces: {open} opening vs {close} closing")]
    UnbalancedBraces { open: usize, close: usize },
}

/// Recoverable problems. The offending item is dropped; parsing continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseWarning {
    #[error("relationship `{from} -> {to}` dropped: `{missing}` is not declared")]
    UnresolvedRelationship {
        from: String,
        to: String,
        missing: String,
    },
    #[error("view `{key}` dropped: anchor `{anchor}` is not declared")]
    UnresolvedAnchor { key: String, anchor: String },
}

// ─── Options & results ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Grid used for elements without recoverable position metadata.
    pub grid: GridLayout,
    /// Run view synthesis after resolution. Default: **true**.
    pub synthesize_views: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            grid: GridLayout::default(),
            synthesize_views: true,
        }
    }
}

/// Everything a parse produced, including what it had to recover from.
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub workspace: Workspace,
    pub warnings: Vec<ParseWarning>,
    /// Elements whose position came from the grid fallback.
    pub fallback_positioned: Vec<Id>,
}

/// Parse a DSL document into a `Workspace`.
///
/// # Errors
/// Only [`ParseError::UnbalancedBraces`]; everything else is recovered.
#[must_use = "parsing result should be used"]
pub fn parse_document(input: &str) -> Result<Workspace, ParseError> {
    parse_with_report(input, &ParseOptions::default()).map(|report| report.workspace)
}

/// Parse with explicit options, returning warnings and fallback info.
///
/// # Errors
/// Only [`ParseError::UnbalancedBraces`].
pub fn parse_with_report(input: &str, options: &ParseOptions) -> Result<ParseReport, ParseError> {
    check_braces(input)?;

    let mut builder = Builder::new();
    for stmt in normalize(input) {
        builder.statement(stmt);
    }
    Ok(builder.finish(options))
}

/// Fast validity gate for untrusted text: non-empty, has a `workspace`
/// keyword, and braces balance.
///
/// # Errors
/// The first structural problem found.
pub fn preflight(input: &str) -> Result<(), ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let has_workspace = input
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| word == "workspace");
    if !has_workspace {
        return Err(ParseError::MissingWorkspace);
    }
    check_braces(input)
}

/// Compare total `{` and `}` counts across the whole text.
pub fn check_braces(input: &str) -> Result<(), ParseError> {
    let open = input.matches('{').count();
    let close = input.matches('}').count();
    if open == close {
        Ok(())
    } else {
        Err(ParseError::UnbalancedBraces { open, close })
    }
}

// ─── Normalization ───────────────────────────────────────────────────────

/// One logical statement of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stmt {
    /// Statement text that ended in `{` (brace removed, trimmed).
    Open(String),
    Close,
    Line(String),
    /// Body of a `//` or `#` line comment.
    Comment(String),
}

fn normalize(input: &str) -> Vec<Stmt> {
    let stripped = strip_block_comments(input);

    let mut logical: Vec<String> = Vec::new();
    let mut pending = String::new();
    for raw in stripped.lines() {
        let line = raw.trim_end();
        if let Some(head) = line.strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(line);
        logical.push(std::mem::take(&mut pending));
    }
    if !pending.is_empty() {
        logical.push(pending);
    }

    let mut out = Vec::with_capacity(logical.len());
    for line in &logical {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(body) = line.strip_prefix("//").or_else(|| line.strip_prefix('#')) {
            out.push(Stmt::Comment(body.trim().to_string()));
            continue;
        }
        if line.starts_with('!') {
            log::trace!("skipping directive: {line}");
            continue;
        }
        split_braces(line, &mut out);
    }
    out
}

/// Remove `/* ... */` comments outside quoted strings and line comments.
///
/// Line comments (`//` anywhere, `#` at line start) are copied through to
/// the end of the line untouched, so a `/*` inside one opens nothing.
fn strip_block_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_quote = false;
    let mut line_start = true;
    while let Some(c) = chars.next() {
        if in_quote {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_quote = false,
                '\n' => {
                    in_quote = false;
                    line_start = true;
                }
                _ => {}
            }
            continue;
        }
        if (c == '/' && chars.peek() == Some(&'/')) || (c == '#' && line_start) {
            out.push(c);
            for inner in chars.by_ref() {
                out.push(inner);
                if inner == '\n' {
                    break;
                }
            }
            line_start = true;
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            let mut prev = '\0';
            for inner in chars.by_ref() {
                if inner == '\n' {
                    out.push('\n');
                }
                if prev == '*' && inner == '/' {
                    break;
                }
                prev = inner;
            }
            continue;
        }
        if c == '"' {
            in_quote = true;
        }
        if c == '\n' {
            line_start = true;
        } else if !c.is_whitespace() {
            line_start = false;
        }
        out.push(c);
    }
    out
}

/// Split one line on `{` / `}` outside quoted strings.
fn split_braces(line: &str, out: &mut Vec<Stmt>) {
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if in_quote {
            current.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            } else if c == '"' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_quote = true;
                current.push(c);
            }
            '{' => out.push(Stmt::Open(std::mem::take(&mut current).trim().to_string())),
            '}' => {
                let rest = std::mem::take(&mut current);
                if !rest.trim().is_empty() {
                    out.push(Stmt::Line(rest.trim().to_string()));
                }
                out.push(Stmt::Close);
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(Stmt::Line(current.trim().to_string()));
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────

/// An open brace scope.
#[derive(Debug, Clone)]
enum Scope {
    Workspace,
    Model,
    Views,
    Styles,
    /// An element (or group) block. Groups have no DSL identifier.
    Element { id: Id, ident: Option<String> },
    View(usize),
    /// `element <ident> { position x y }` inside a view.
    ElementPosition(String),
    /// Any block we don't interpret; only tracked so `}` pops correctly.
    Other,
}

#[derive(Debug)]
struct PendingElement {
    element: Element,
    /// Scope-qualified DSL identifier, if the declaration had one.
    qualified: Option<String>,
}

#[derive(Debug)]
enum Endpoint {
    Named(String),
    /// Implicit source (`-> target` inside an element block).
    Enclosing(Id),
}

#[derive(Debug)]
struct PendingRelationship {
    from: Endpoint,
    to: String,
    scope: Vec<String>,
    description: String,
    technology: Option<String>,
    tags: SmallVec<[String; 2]>,
}

#[derive(Debug)]
struct PendingView {
    view: View,
    anchor_ref: Option<String>,
    title: Option<String>,
    environment: Option<String>,
}

struct Builder {
    scopes: Vec<Scope>,
    table: IdentifierTable,
    positions: PositionStore,
    header: Option<(String, String)>,
    elements: Vec<PendingElement>,
    taken: HashSet<Id>,
    relationships: Vec<PendingRelationship>,
    views: Vec<PendingView>,
}

impl Builder {
    fn new() -> Self {
        Self {
            scopes: Vec::new(),
            table: IdentifierTable::new(),
            positions: PositionStore::new(),
            header: None,
            elements: Vec::new(),
            taken: HashSet::new(),
            relationships: Vec::new(),
            views: Vec::new(),
        }
    }

    fn in_views(&self) -> bool {
        self.scopes.iter().any(|s| matches!(s, Scope::Views))
    }

    fn in_styles(&self) -> bool {
        self.scopes.iter().any(|s| matches!(s, Scope::Styles))
    }

    /// Nearest enclosing element (or group) block.
    fn enclosing_element(&self) -> Option<Id> {
        self.scopes.iter().rev().find_map(|s| match s {
            Scope::Element { id, .. } => Some(*id),
            _ => None,
        })
    }

    /// DSL identifiers of the enclosing element blocks, outermost first.
    fn scope_path(&self) -> Vec<String> {
        self.scopes
            .iter()
            .filter_map(|s| match s {
                Scope::Element {
                    ident: Some(ident), ..
                } => Some(ident.clone()),
                _ => None,
            })
            .collect()
    }

    fn statement(&mut self, stmt: Stmt) {
        match stmt {
            Stmt::Open(head) => {
                let scope = self.open(&head);
                self.scopes.push(scope);
            }
            Stmt::Close => {
                self.scopes.pop();
            }
            Stmt::Line(line) => self.line(&line),
            Stmt::Comment(body) => {
                // Position metadata rides in comments to stay compatible
                // with strict external tooling.
                if self.in_views()
                    && matches!(self.scopes.last(), Some(Scope::View(_)))
                    && let Ok(placement) = parse_placement.parse_next(&mut body.as_str())
                {
                    self.place(placement);
                }
            }
        }
    }

    fn open(&mut self, head: &str) -> Scope {
        if self.in_styles() {
            return Scope::Other;
        }
        match head {
            "model" => return Scope::Model,
            "views" => return Scope::Views,
            "styles" => return Scope::Styles,
            _ => {}
        }
        if self.scopes.is_empty()
            && let Ok(header) = parse_workspace_header.parse_next(&mut &*head)
        {
            self.header = Some(header);
            return Scope::Workspace;
        }

        if self.in_views() {
            if let Ok(decl) = parse_view_decl.parse_next(&mut &*head) {
                return Scope::View(self.add_view(decl));
            }
            if let Ok(ident) = parse_element_scope.parse_next(&mut &*head) {
                return Scope::ElementPosition(ident.to_string());
            }
            log::trace!("skipping view block: {head}");
            return Scope::Other;
        }

        if let Ok(decl) = parse_element_decl.parse_next(&mut &*head) {
            let ident = decl.ident.clone();
            let id = self.add_element(decl);
            return Scope::Element { id, ident };
        }
        if let Ok(name) = parse_group_decl.parse_next(&mut &*head) {
            let id = self.add_group(name);
            return Scope::Element { id, ident: None };
        }
        log::trace!("skipping block: {head}");
        Scope::Other
    }

    fn line(&mut self, line: &str) {
        if self.in_styles() {
            return;
        }
        if self.in_views() {
            self.view_line(line);
            return;
        }
        if let Ok(decl) = parse_relationship.parse_next(&mut &*line) {
            self.add_relationship(decl);
        } else if let Ok(decl) = parse_element_decl.parse_next(&mut &*line) {
            self.add_element(decl);
        } else if let Ok(name) = parse_group_decl.parse_next(&mut &*line) {
            self.add_group(name);
        } else {
            log::trace!("skipping line: {line}");
        }
    }

    fn view_line(&mut self, line: &str) {
        match self.scopes.last().cloned() {
            Some(Scope::ElementPosition(ident)) => {
                if let Ok(position) = parse_position_line.parse_next(&mut &*line) {
                    self.positions.record(&ident, position);
                }
            }
            Some(Scope::View(idx)) => {
                if let Ok(placement) = parse_placement.parse_next(&mut &*line) {
                    self.place(placement);
                } else if let Ok((keyword, value)) = parse_view_property.parse_next(&mut &*line) {
                    match keyword {
                        "title" => self.views[idx].title = Some(value),
                        _ => self.views[idx].view.description = value,
                    }
                }
            }
            Some(Scope::Views) => {
                // View declared without a block.
                if let Ok(decl) = parse_view_decl.parse_next(&mut &*line) {
                    self.add_view(decl);
                }
            }
            _ => {}
        }
    }

    fn place(&mut self, placement: Placement) {
        match placement {
            Placement::Element { ident, position } => self.positions.record(&ident, position),
            Placement::Group { name, placement } => self.positions.record_group(&name, placement),
        }
    }

    fn add_element(&mut self, decl: ElementDecl) -> Id {
        let mut args = decl.args.into_iter();
        let name = args.next().unwrap_or_default();
        let id = readable_id(decl.kind, &name, |c| self.taken.contains(&c));
        self.taken.insert(id);

        let mut element = Element::new(id, decl.kind, name);
        element.parent = self.enclosing_element();
        element.description = args.next().unwrap_or_default();
        element.technology = args.next().filter(|t| !t.is_empty());
        if let Some(tags) = args.next() {
            for tag in tags.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if tag == EXTERNAL_TAG {
                    element.external = true;
                } else {
                    element.tags.push(tag.to_string());
                }
            }
        }

        let qualified = decl.ident.as_deref().map(|ident| {
            let scope = self.scope_path();
            self.table.register(&scope, ident, id);
            IdentifierTable::qualify(&scope, ident)
        });
        self.elements.push(PendingElement { element, qualified });
        id
    }

    fn add_group(&mut self, name: String) -> Id {
        let id = readable_id(ElementKind::Group, &name, |c| self.taken.contains(&c));
        self.taken.insert(id);
        let mut element = Element::new(id, ElementKind::Group, name);
        element.parent = self.enclosing_element();
        self.elements.push(PendingElement {
            element,
            qualified: None,
        });
        id
    }

    fn add_relationship(&mut self, decl: RelationshipDecl) {
        let from = match decl.from {
            Some(name) => Endpoint::Named(name),
            None => match self.enclosing_element() {
                Some(id) => Endpoint::Enclosing(id),
                None => {
                    log::trace!("implicit-source relationship outside any element");
                    return;
                }
            },
        };
        let mut args = decl.args.into_iter();
        let description = args.next().unwrap_or_default();
        let technology = args.next().filter(|t| !t.is_empty());
        let tags = args
            .next()
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        self.relationships.push(PendingRelationship {
            from,
            to: decl.to,
            scope: self.scope_path(),
            description,
            technology,
            tags,
        });
    }

    /// Create or merge (by key) a view declaration. Returns its index.
    fn add_view(&mut self, decl: ViewDecl) -> usize {
        let key = sanitize_key(&decl.key.unwrap_or_else(|| match &decl.anchor {
            Some(anchor) => format!("{}-{anchor}", decl.kind.keyword()),
            None => match &decl.environment {
                Some(env) => format!("deployment-{env}"),
                None => LANDSCAPE_VIEW_KEY.to_string(),
            },
        }));

        if let Some(idx) = self.views.iter().position(|p| p.view.key == key) {
            let pending = &mut self.views[idx];
            pending.view.kind = decl.kind;
            pending.anchor_ref = decl.anchor;
            if decl.environment.is_some() {
                pending.environment = decl.environment;
            }
            if let Some(description) = decl.description {
                pending.view.description = description;
            }
            return idx;
        }

        let landscape_taken = self
            .views
            .iter()
            .any(|p| p.view.id == Id::intern(LANDSCAPE_VIEW_KEY));
        let id = if decl.kind == ViewKind::SystemLandscape && !landscape_taken {
            Id::intern(LANDSCAPE_VIEW_KEY)
        } else {
            Id::intern(&format!("view-{key}"))
        };
        self.views.push(PendingView {
            view: View {
                id,
                key,
                kind: decl.kind,
                anchor: None,
                name: String::new(),
                description: decl.description.unwrap_or_default(),
            },
            anchor_ref: decl.anchor,
            title: None,
            environment: decl.environment,
        });
        self.views.len() - 1
    }

    fn finish(self, options: &ParseOptions) -> ParseReport {
        let Builder {
            table,
            positions,
            header,
            elements,
            relationships,
            views,
            ..
        } = self;
        let mut warnings = Vec::new();

        let (name, description) =
            header.unwrap_or_else(|| ("Untitled Workspace".to_string(), String::new()));
        let mut workspace = Workspace {
            name,
            description,
            elements: Vec::with_capacity(elements.len()),
            relationships: Vec::with_capacity(relationships.len()),
            views: Vec::with_capacity(views.len() + 1),
        };

        // Positions: recovered metadata first, grid fallback otherwise.
        let mut fallback_positioned = Vec::new();
        for (index, pending) in elements.into_iter().enumerate() {
            let mut element = pending.element;
            let recovered = if element.kind == ElementKind::Group {
                positions.group(&element.name).map(|g| {
                    element.size = g.size;
                    g.position
                })
            } else {
                pending
                    .qualified
                    .as_deref()
                    .and_then(|q| positions.lookup(q))
            };
            element.position = match recovered {
                Some(p) => p,
                None => {
                    log::debug!("grid fallback position for {}", element.id);
                    fallback_positioned.push(element.id);
                    options.grid.position_for(index)
                }
            };
            workspace.elements.push(element);
        }

        // Deferred relationship resolution.
        for pending in relationships {
            let source = match &pending.from {
                Endpoint::Enclosing(id) => Some(*id),
                Endpoint::Named(name) => table.resolve(name, &pending.scope),
            };
            let target = table.resolve(&pending.to, &pending.scope);
            let from_text = match &pending.from {
                Endpoint::Named(name) => name.clone(),
                Endpoint::Enclosing(id) => id.to_string(),
            };
            match (source, target) {
                (Some(source), Some(target)) => {
                    let id = Id::intern(&format!("rel_{}", workspace.relationships.len() + 1));
                    let mut rel = Relationship::new(id, source, target, pending.description);
                    rel.technology = pending.technology;
                    rel.tags = pending.tags;
                    workspace.relationships.push(rel);
                }
                (source, _) => {
                    let missing = if source.is_none() {
                        from_text.clone()
                    } else {
                        pending.to.clone()
                    };
                    let warning = ParseWarning::UnresolvedRelationship {
                        from: from_text,
                        to: pending.to,
                        missing,
                    };
                    log::warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }

        // View anchors and display names.
        for pending in views {
            let mut view = pending.view;
            if let Some(anchor) = &pending.anchor_ref {
                match table.resolve(anchor, &[]) {
                    Some(id) => view.anchor = Some(id),
                    None => {
                        let warning = ParseWarning::UnresolvedAnchor {
                            key: view.key.clone(),
                            anchor: anchor.clone(),
                        };
                        log::warn!("{warning}");
                        warnings.push(warning);
                        continue;
                    }
                }
            }
            let anchor_name = view
                .anchor
                .and_then(|a| workspace.element(a))
                .map(|e| e.name.clone())
                .unwrap_or_default();
            view.name = match pending.title {
                Some(title) => title,
                None => match view.kind {
                    ViewKind::SystemLandscape => "System Landscape".to_string(),
                    ViewKind::SystemContext => format!("{anchor_name} - System Context"),
                    ViewKind::Container => format!("{anchor_name} - Containers"),
                    ViewKind::Component => format!("{anchor_name} - Components"),
                    ViewKind::Deployment => pending.environment.unwrap_or_default(),
                },
            };
            workspace.views.push(view);
        }

        if options.synthesize_views {
            synthesize_views(&mut workspace);
        }

        ParseReport {
            workspace,
            warnings,
            fallback_positioned,
        }
    }
}

// ─── Statement grammar ───────────────────────────────────────────────────

#[derive(Debug)]
struct ElementDecl {
    ident: Option<String>,
    kind: ElementKind,
    /// name, description, technology, tags, in that order, as present.
    args: Vec<String>,
}

#[derive(Debug)]
struct RelationshipDecl {
    from: Option<String>,
    to: String,
    args: Vec<String>,
}

#[derive(Debug)]
struct ViewDecl {
    kind: ViewKind,
    anchor: Option<String>,
    environment: Option<String>,
    key: Option<String>,
    description: Option<String>,
}

#[derive(Debug, PartialEq)]
enum Placement {
    Element { ident: String, position: Position },
    Group { name: String, placement: GroupPlacement },
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    use winnow::ascii::space0;
    let _: Result<&str, ErrMode<ContextError>> = space0.parse_next(input);
}

/// Keyword-style identifier: letters, digits, `_`.
fn parse_identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_').parse_next(input)
}

/// DSL element identifier, optionally dotted: `shop.api`.
fn parse_dsl_identifier<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '.').parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f32> {
    let start = *input;
    if input.starts_with('-') {
        *input = &input[1..];
    }
    let _ = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ =
            take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    let matched = &start[..start.len() - input.len()];
    matched.parse::<f32>().map_err(|_| backtrack())
}

/// Quoted string with `\"` and `\n` escapes. Any other backslash is kept as is.
fn parse_quoted(input: &mut &str) -> ModalResult<String> {
    let text: &str = input;
    let body = text.strip_prefix('"').ok_or_else(backtrack)?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                *input = &body[i + 1..];
                return Ok(out);
            }
            '\\' => match chars.next() {
                Some((_, '"')) => out.push('"'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    Err(backtrack())
}

/// Zero or more quoted arguments.
fn parse_quoted_args(input: &mut &str) -> ModalResult<Vec<String>> {
    let mut args = Vec::new();
    loop {
        skip_space(input);
        if !input.starts_with('"') {
            return Ok(args);
        }
        args.push(parse_quoted(input)?);
    }
}

/// Zero or more arguments, quoted or bare tokens.
fn parse_loose_args(input: &mut &str) -> ModalResult<Vec<String>> {
    let mut args = Vec::new();
    loop {
        skip_space(input);
        if input.is_empty() {
            return Ok(args);
        }
        if input.starts_with('"') {
            args.push(parse_quoted(input)?);
        } else {
            let token: &str =
                take_while(1.., |c: char| !c.is_whitespace() && c != '"').parse_next(input)?;
            args.push(token.to_string());
        }
    }
}

/// `workspace ["name"] ["description"]`
fn parse_workspace_header(input: &mut &str) -> ModalResult<(String, String)> {
    let _ = "workspace".parse_next(input)?;
    if !input.is_empty() && !input.starts_with(char::is_whitespace) {
        return Err(backtrack());
    }
    let mut args = parse_quoted_args(input)?.into_iter();
    let name = args
        .next()
        .unwrap_or_else(|| "Untitled Workspace".to_string());
    Ok((name, args.next().unwrap_or_default()))
}

fn parse_assignment<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let ident = parse_dsl_identifier.parse_next(input)?;
    skip_space(input);
    let _ = '='.parse_next(input)?;
    skip_space(input);
    Ok(ident)
}

/// `[ident =] kind "name" ["description"] ["technology"] ["tags"]`
fn parse_element_decl(input: &mut &str) -> ModalResult<ElementDecl> {
    let checkpoint = *input;
    let ident = match parse_assignment.parse_next(input) {
        Ok(ident) => Some(ident.to_string()),
        Err(_) => {
            *input = checkpoint;
            None
        }
    };
    let keyword = parse_identifier.parse_next(input)?;
    let kind = ElementKind::from_keyword(keyword).ok_or_else(backtrack)?;
    let args = parse_quoted_args.parse_next(input)?;
    if args.is_empty() {
        return Err(backtrack());
    }
    Ok(ElementDecl { ident, kind, args })
}

/// `group "name"`
fn parse_group_decl(input: &mut &str) -> ModalResult<String> {
    let _ = "group".parse_next(input)?;
    skip_space(input);
    parse_quoted.parse_next(input)
}

/// `[source] -> target ["description"] ["technology"] ["tags"]`
fn parse_relationship(input: &mut &str) -> ModalResult<RelationshipDecl> {
    let from = if input.starts_with("->") {
        None
    } else {
        let ident = parse_dsl_identifier.parse_next(input)?;
        skip_space(input);
        Some(ident.to_string())
    };
    let _ = "->".parse_next(input)?;
    skip_space(input);
    let to = parse_dsl_identifier.parse_next(input)?.to_string();
    let args = parse_quoted_args.parse_next(input)?;
    Ok(RelationshipDecl { from, to, args })
}

/// `systemLandscape ["key"] ["description"]`
/// `systemContext|container|component <anchor|*> ["key"] ["description"]`
/// `deployment <anchor|*> "environment" ["key"] ["description"]`
fn parse_view_decl(input: &mut &str) -> ModalResult<ViewDecl> {
    let keyword = parse_identifier.parse_next(input)?;
    let kind = ViewKind::from_keyword(keyword).ok_or_else(backtrack)?;
    let mut anchor = None;
    if kind != ViewKind::SystemLandscape {
        let _ = space1.parse_next(input)?;
        let target: &str = alt(("*", parse_dsl_identifier)).parse_next(input)?;
        if target != "*" {
            anchor = Some(target.to_string());
        }
    }
    let mut args = parse_loose_args.parse_next(input)?.into_iter();
    let environment = if kind == ViewKind::Deployment {
        Some(args.next().ok_or_else(backtrack)?)
    } else {
        None
    };
    Ok(ViewDecl {
        kind,
        anchor,
        environment,
        key: args.next(),
        description: args.next(),
    })
}

/// `title "…"` / `description "…"` inside a view block.
fn parse_view_property<'a>(input: &mut &'a str) -> ModalResult<(&'a str, String)> {
    let keyword = alt(("title", "description")).parse_next(input)?;
    skip_space(input);
    let value = parse_quoted.parse_next(input)?;
    Ok((keyword, value))
}

/// `element <ident> <x> <y>`
fn parse_element_placement(input: &mut &str) -> ModalResult<Placement> {
    let _ = "element".parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let ident = parse_dsl_identifier.parse_next(input)?.to_string();
    let _ = space1.parse_next(input)?;
    let x = parse_number.parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let y = parse_number.parse_next(input)?;
    Ok(Placement::Element {
        ident,
        position: Position { x, y },
    })
}

/// `group "Name" <x> <y> [<width> <height>]`
fn parse_group_placement(input: &mut &str) -> ModalResult<Placement> {
    let name = parse_group_decl.parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let x = parse_number.parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let y = parse_number.parse_next(input)?;
    skip_space(input);
    let size = if input.is_empty() {
        None
    } else {
        let width = parse_number.parse_next(input)?;
        let _ = space1.parse_next(input)?;
        let height = parse_number.parse_next(input)?;
        Some(Size { width, height })
    };
    Ok(Placement::Group {
        name,
        placement: GroupPlacement {
            position: Position { x, y },
            size,
        },
    })
}

fn parse_placement(input: &mut &str) -> ModalResult<Placement> {
    alt((parse_element_placement, parse_group_placement)).parse_next(input)
}

/// `element <ident>` (block form opener).
fn parse_element_scope<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let _ = "element".parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let ident = parse_dsl_identifier.parse_next(input)?;
    skip_space(input);
    if input.is_empty() { Ok(ident) } else { Err(backtrack()) }
}

/// `position <x> <y>` inside an element block.
fn parse_position_line(input: &mut &str) -> ModalResult<Position> {
    let _ = "position".parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let x = parse_number.parse_next(input)?;
    let _ = space1.parse_next(input)?;
    let y = parse_number.parse_next(input)?;
    Ok(Position { x, y })
}
