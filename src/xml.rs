//! Documentation XML Loading
//!
//! Loads a compiler-emitted documentation file and checks it is well formed.
//! The contents are kept verbatim; interpreting the comment syntax is the
//! engine's business.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected second root element <{0}>")]
    MultipleRoots(String),

    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// A documentation file held in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct XmlDocument {
    pub path: PathBuf,
    /// Local name of the root element, `doc` for compiler output.
    pub root: String,
    /// Number of `<member>` elements.
    pub member_count: usize,
    pub contents: String,
}

impl XmlDocument {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(path, contents)
    }

    pub fn parse(path: &Path, contents: String) -> Result<Self, LoadError> {
        let (root, member_count) = scan(&contents)?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
            member_count,
            contents,
        })
    }
}

fn scan(xml: &str) -> Result<(String, usize), LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<String> = None;
    let mut open: Vec<String> = vec![];
    let mut members = 0;

    loop {
        let event = reader.read_event().map_err(|source| LoadError::Xml {
            position: reader.error_position(),
            source,
        })?;

        match event {
            Event::Start(e) | Event::Empty(e) if open.is_empty() && root.is_some() => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                return Err(LoadError::MultipleRoots(name));
            }
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "member" {
                    members += 1;
                }
                if root.is_none() {
                    root = Some(name.clone());
                }
                open.push(name);
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "member" {
                    members += 1;
                }
                if root.is_none() {
                    root = Some(name);
                }
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(name) = open.pop() {
        return Err(LoadError::Unclosed(name));
    }
    root.map(|r| (r, members)).ok_or(LoadError::MissingRoot)
}
