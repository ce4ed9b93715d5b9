//! Identifier resolver: DSL identifiers ↔ internal identities.
//!
//! Two directions:
//! - **Parse**: [`IdentifierTable`] maps scoped DSL identifiers (`a`, `a.w`)
//!   to the identities assigned while building the model.
//! - **Generate**: [`DslNames`] picks one unique, grammar-safe DSL identifier
//!   per element.
//!
//! Readable identities (`UserPerson`, `OnlineShopSystem`) come from
//! [`readable_id`], shared by both directions and by rename.

use crate::id::{Id, is_identifier};
use crate::model::{Element, ElementKind, Workspace};
use std::collections::{HashMap, HashSet};

// ─── Readable identities ─────────────────────────────────────────────────

/// Latin phonetic equivalent for Cyrillic letters and common diacritics.
fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' | 'ґ' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'є' => "ye",
        'ж' => "zh",
        'з' => "z",
        'и' | 'і' => "i",
        'ї' => "yi",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'œ' => "oe",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        _ => return None,
    };
    Some(s)
}

/// Transliterate, split on anything that isn't an ASCII letter or digit,
/// title-case each fragment, and concatenate.
///
/// `"online shop"` → `"OnlineShop"`, `"Платёж"` → `"Platyozh"`.
pub fn title_slug(name: &str) -> String {
    let mut latin = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii() {
            latin.push(c);
            continue;
        }
        let lower: String = c.to_lowercase().collect();
        let mut mapped = false;
        if let Some(first) = lower.chars().next()
            && let Some(t) = transliterate(first)
        {
            latin.push_str(t);
            mapped = true;
        }
        if !mapped {
            latin.push(' ');
        }
    }

    let mut out = String::with_capacity(latin.len());
    for fragment in latin.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = fragment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.extend(chars.map(|c| c.to_ascii_lowercase()));
        }
    }
    out
}

/// Readable identity for an element: title slug + kind suffix, with a
/// numeric suffix (starting at 2) on collision.
pub fn readable_id(kind: ElementKind, name: &str, taken: impl Fn(Id) -> bool) -> Id {
    let mut base = title_slug(name);
    if base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert(0, 'E');
    }
    base.push_str(kind.type_suffix());

    let first = Id::intern(&base);
    if !taken(first) {
        return first;
    }
    let mut n = 2u32;
    loop {
        let candidate = Id::intern(&format!("{base}{n}"));
        if !taken(candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Restrict a view key to `[A-Za-z0-9_-]`. Whitespace becomes `_`; other
/// characters are dropped.
pub fn sanitize_key(raw: &str) -> String {
    let key: String = raw
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    if key.is_empty() { "view".to_string() } else { key }
}

// ─── Parse direction ─────────────────────────────────────────────────────

/// Scope-qualified identifier table built while parsing.
///
/// Each declaration is stored under its fully qualified form
/// (`parent.child`) and, if not already taken, its bare form (`child`).
#[derive(Debug, Default)]
pub struct IdentifierTable {
    entries: HashMap<String, Id>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a scope path and a local identifier: `["a"], "w"` → `"a.w"`.
    pub fn qualify(scope: &[String], ident: &str) -> String {
        if scope.is_empty() {
            ident.to_string()
        } else {
            format!("{}.{ident}", scope.join("."))
        }
    }

    /// Register a declaration made inside `scope`.
    pub fn register(&mut self, scope: &[String], ident: &str, id: Id) {
        let qualified = Self::qualify(scope, ident);
        self.entries.entry(ident.to_string()).or_insert(id);
        self.entries.insert(qualified, id);
    }

    /// Resolve a reference written inside `scope`.
    ///
    /// Tries, in order: the reference qualified by each enclosing scope from
    /// innermost outward, the reference as written, and its last dotted
    /// segment.
    pub fn resolve(&self, reference: &str, scope: &[String]) -> Option<Id> {
        for depth in (1..=scope.len()).rev() {
            let key = Self::qualify(&scope[..depth], reference);
            if let Some(&id) = self.entries.get(&key) {
                return Some(id);
            }
        }
        if let Some(&id) = self.entries.get(reference) {
            return Some(id);
        }
        let tail = reference.rsplit('.').next()?;
        self.entries.get(tail).copied()
    }
}

// ─── Generate direction ──────────────────────────────────────────────────

/// One unique DSL identifier per element, chosen for a generate pass.
#[derive(Debug, Default)]
pub struct DslNames {
    names: HashMap<Id, String>,
}

impl DslNames {
    /// Assign identifiers in element collection order.
    ///
    /// Identities that already satisfy the identifier grammar are reused
    /// verbatim; others get `{NameSlug}_{first six id chars}`. Any clash
    /// is broken with a numeric suffix.
    pub fn for_workspace(workspace: &Workspace) -> Self {
        let mut used: HashSet<String> = HashSet::with_capacity(workspace.elements.len());
        let mut names = HashMap::with_capacity(workspace.elements.len());
        for element in &workspace.elements {
            let base = if element.id.is_dsl_safe() {
                element.id.as_str().to_string()
            } else {
                fallback_identifier(element)
            };
            let mut name = base.clone();
            let mut n = 2u32;
            while used.contains(&name) {
                name = format!("{base}{n}");
                n += 1;
            }
            used.insert(name.clone());
            names.insert(element.id, name);
        }
        Self { names }
    }

    pub fn get(&self, id: Id) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}

/// Synthesized identifier for elements whose identity isn't grammar-safe.
pub fn fallback_identifier(element: &Element) -> String {
    let mut base = title_slug(&element.name);
    if base.is_empty() {
        base.push_str("Element");
    }
    if !base.starts_with(|c: char| c.is_ascii_alphabetic()) {
        base.insert(0, 'E');
    }
    let short: String = element
        .id
        .as_str()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(6)
        .collect();
    let ident = if short.is_empty() {
        base
    } else {
        format!("{base}_{short}")
    };
    debug_assert!(is_identifier(&ident));
    ident
}
