//! Saving response bodies to disk.

use std::fs;
use std::ops::Deref;
use std::path::Path;

use md5::{Digest, Md5};
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::HttpResponse;

/// A response whose body is meant to be written to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamResponse {
    inner: HttpResponse,
}

impl StreamResponse {
    pub fn new(inner: HttpResponse) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> HttpResponse {
        self.inner
    }

    /// Write the body into `directory` and return the file name used.
    ///
    /// The directory is created when missing. Without an explicit
    /// `filename`, the name comes from `Content-Disposition`'s
    /// `filename="..."`, else from the md5 of the body. A name without an
    /// extension gets one guessed from the body's magic bytes, if any.
    pub fn save(&self, directory: impl AsRef<Path>, filename: Option<&str>) -> Result<String> {
        let directory = directory.as_ref();
        if !directory.is_dir() {
            fs::create_dir_all(directory)?;
        }
        if let Err(e) = tempfile::tempfile_in(directory) {
            debug!(directory = %directory.display(), error = %e, "write check failed");
            return Err(Error::InvalidArgument(format!(
                "'{}' is not writable.",
                directory.display()
            )));
        }

        let contents = self.inner.body_contents();
        let mut filename = match filename.filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => disposition_filename(&self.inner.header_line("Content-Disposition"))
                .unwrap_or_else(|| hex::encode(Md5::digest(contents))),
        };
        if Path::new(&filename).extension().is_none() {
            filename.push_str(&stream_extension(contents));
        }

        let path = directory.join(&filename);
        fs::write(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "response body saved");
        Ok(filename)
    }

    pub fn save_as(&self, directory: impl AsRef<Path>, filename: &str) -> Result<String> {
        self.save(directory, Some(filename))
    }
}

impl From<HttpResponse> for StreamResponse {
    fn from(inner: HttpResponse) -> Self {
        Self::new(inner)
    }
}

impl Deref for StreamResponse {
    type Target = HttpResponse;

    fn deref(&self) -> &HttpResponse {
        &self.inner
    }
}

/// The `filename="..."` capture of a `Content-Disposition` value, reduced to
/// its last path component.
fn disposition_filename(header: &str) -> Option<String> {
    const MARKER: &str = "filename=\"";
    let start = header.find(MARKER)? + MARKER.len();
    let rest = &header[start..];
    let name = &rest[..rest.find('"')?];
    Path::new(name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

/// `.ext` guessed from magic bytes, or an empty string.
fn stream_extension(contents: &[u8]) -> String {
    infer::get(contents)
        .map(|kind| format!(".{}", kind.extension()))
        .unwrap_or_default()
}
