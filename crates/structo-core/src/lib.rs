pub mod emitter;
pub mod format;
pub mod id;
pub mod layout;
pub mod model;
pub mod parser;
pub mod resolve;
pub mod transform;
pub mod validate;

pub use emitter::{AutoLayout, EmitConfig, emit_document, emit_document_with};
pub use format::{FormatConfig, format_document};
pub use id::Id;
pub use layout::{GridLayout, GroupPlacement, PositionStore};
pub use model::*;
pub use parser::{
    ParseError, ParseOptions, ParseReport, ParseWarning, parse_document, parse_with_report,
    preflight,
};
pub use transform::{rekey_element, rename_element, synthesize_views};
pub use validate::{ValidationError, ensure_valid, validate_workspace};
