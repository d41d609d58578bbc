//! Multipart form building.
//!
//! # Design
//! Nested form data is flattened into a flat list of named parts: an object
//! or array value under `name` expands to `name[key]`, recursively. Files
//! given by path are opened here, before anything reaches the transport;
//! readers supplied by the caller pass through and are consumed once, when
//! the body is encoded.
//!
//! The same bracket flattening backs `application/x-www-form-urlencoded`
//! bodies and query strings (`flatten_pairs`).

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use uuid::Uuid;

/// Body of one multipart part.
pub enum Contents {
    Bytes(Vec<u8>),
    Stream(Box<dyn Read + Send + Sync>),
}

impl fmt::Debug for Contents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contents::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Contents::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for Contents {
    fn from(bytes: Vec<u8>) -> Self {
        Contents::Bytes(bytes)
    }
}

impl From<String> for Contents {
    fn from(text: String) -> Self {
        Contents::Bytes(text.into_bytes())
    }
}

impl From<&str> for Contents {
    fn from(text: &str) -> Self {
        Contents::Bytes(text.as_bytes().to_vec())
    }
}

/// A file to upload: a path still to be opened, or an open reader.
pub enum FileInput {
    Path(PathBuf),
    Reader {
        reader: Box<dyn Read + Send + Sync>,
        filename: Option<String>,
    },
}

impl FileInput {
    pub fn reader(reader: impl Read + Send + Sync + 'static, filename: Option<&str>) -> Self {
        FileInput::Reader {
            reader: Box::new(reader),
            filename: filename.map(str::to_string),
        }
    }
}

impl fmt::Debug for FileInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileInput::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FileInput::Reader { filename, .. } => {
                f.debug_struct("Reader").field("filename", filename).finish_non_exhaustive()
            }
        }
    }
}

impl From<&str> for FileInput {
    fn from(path: &str) -> Self {
        FileInput::Path(PathBuf::from(path))
    }
}

impl From<String> for FileInput {
    fn from(path: String) -> Self {
        FileInput::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for FileInput {
    fn from(path: PathBuf) -> Self {
        FileInput::Path(path)
    }
}

impl From<&Path> for FileInput {
    fn from(path: &Path) -> Self {
        FileInput::Path(path.to_path_buf())
    }
}

/// One named part of a multipart body.
#[derive(Debug)]
pub struct MultipartField {
    pub name: String,
    pub contents: Contents,
    pub filename: Option<String>,
}

impl MultipartField {
    pub fn new(name: impl Into<String>, contents: impl Into<Contents>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
            filename: None,
        }
    }

    /// Part for a file upload. Paths are opened as readable streams.
    pub fn from_file(name: impl Into<String>, input: FileInput) -> io::Result<Self> {
        let (reader, filename): (Box<dyn Read + Send + Sync>, Option<String>) = match input {
            FileInput::Path(path) => {
                let file = File::open(&path)?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                (Box::new(file), filename)
            }
            FileInput::Reader { reader, filename } => (reader, filename),
        };
        Ok(Self {
            name: name.into(),
            contents: Contents::Stream(reader),
            filename,
        })
    }

    /// In-memory contents, `None` for streams.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.contents {
            Contents::Bytes(bytes) => Some(bytes),
            Contents::Stream(_) => None,
        }
    }
}

/// Flatten `contents` into parts named after `name`.
///
/// Scalars produce one part; objects and arrays produce one part per leaf,
/// named `name[key]` (`name[key][inner]` for deeper levels).
pub fn normalize(name: &str, contents: &Value) -> Vec<MultipartField> {
    let mut fields = Vec::new();
    walk(name.to_string(), contents, &mut |name, text| {
        fields.push(MultipartField::new(name, text));
    });
    fields
}

/// Flatten a form map into `(name, value)` pairs using the same bracket
/// naming as `normalize`.
pub fn flatten_pairs(form: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in form {
        walk(key.clone(), value, &mut |name, text| pairs.push((name, text)));
    }
    pairs
}

fn walk(name: String, value: &Value, emit: &mut dyn FnMut(String, String)) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                walk(format!("{name}[{key}]"), inner, emit);
            }
        }
        Value::Array(items) => {
            for (index, inner) in items.iter().enumerate() {
                walk(format!("{name}[{index}]"), inner, emit);
            }
        }
        scalar => emit(name, scalar_text(scalar)),
    }
}

/// Text form of a scalar; booleans follow form-encoding convention.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Render `fields` as a `multipart/form-data` body.
///
/// Returns the content type (with its boundary) and the body. Streams are
/// read to the end here.
pub fn encode(fields: Vec<MultipartField>) -> io::Result<(String, Vec<u8>)> {
    let boundary = Uuid::new_v4().simple().to_string();
    let mut body = Vec::new();
    for field in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", quote(&field.name));
        if let Some(filename) = &field.filename {
            disposition.push_str(&format!("; filename=\"{}\"", quote(filename)));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if field.filename.is_some() {
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
        }
        body.extend_from_slice(b"\r\n");
        match field.contents {
            Contents::Bytes(bytes) => body.extend_from_slice(&bytes),
            Contents::Stream(mut reader) => {
                reader.read_to_end(&mut body)?;
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    Ok((format!("multipart/form-data; boundary={boundary}"), body))
}

fn quote(value: &str) -> String {
    value.replace('"', "%22").replace(['\r', '\n'], " ")
}
