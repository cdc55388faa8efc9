use std::path::PathBuf;

use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("invalid UTF-8 in document: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("missing <{element}> in <{parent}>")]
    MissingElement {
        parent: &'static str,
        element: &'static str,
    },

    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("invalid value '{value}' in <{element}>")]
    InvalidValue {
        element: &'static str,
        value: String,
    },

    #[error("invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("unsupported document: root element <{root}> is neither GPX nor TCX")]
    UnsupportedDocument { root: String },
}

impl From<quick_xml::events::attributes::AttrError> for ExtractError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(e.into())
    }
}

impl From<ExtractError> for JsValue {
    fn from(e: ExtractError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}
