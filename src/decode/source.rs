//! Where the opaque audio bytes come from: a local file or a remote preview URL

use crate::error::SourceError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Location of an audio stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Local file
    File(PathBuf),

    /// Remote preview URL (http/https)
    Url(String),
}

/// Raw container bytes plus an optional format hint
#[derive(Debug, Clone)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,

    /// File extension used as a probing hint (e.g. "mp3")
    pub extension: Option<String>,
}

impl AudioSource {
    /// Interpret a command-line argument. `http://` and `https://` are URLs,
    /// anything else is a path with `~` expanded.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            AudioSource::Url(trimmed.to_string())
        } else {
            let expanded = shellexpand::tilde(trimmed);
            AudioSource::File(PathBuf::from(expanded.as_ref()))
        }
    }

    /// File extension of the path or of the URL's last segment
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            AudioSource::File(path) => path.file_name()?.to_str()?.to_string(),
            AudioSource::Url(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                without_query.rsplit('/').next()?.to_string()
            }
        };

        Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Read the whole stream into memory
    pub fn read(&self) -> Result<EncodedAudio, SourceError> {
        let bytes = match self {
            AudioSource::File(path) => std::fs::read(path).map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?,
            AudioSource::Url(url) => fetch(url)?,
        };

        log::debug!("Read {} bytes from {}", bytes.len(), self);

        Ok(EncodedAudio {
            bytes,
            extension: self.extension(),
        })
    }
}

fn fetch(url: &str) -> Result<Vec<u8>, SourceError> {
    let http_err = |source| SourceError::Http {
        url: url.to_string(),
        source,
    };

    let response = reqwest::blocking::get(url).map_err(http_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().map_err(http_err)?;
    Ok(bytes.to_vec())
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::File(path) => write!(f, "{}", path.display()),
            AudioSource::Url(url) => f.write_str(url),
        }
    }
}
