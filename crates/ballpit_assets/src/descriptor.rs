//! Structured data descriptors (item definitions, ball templates and such)
//!
//! Descriptors are JSON documents. The resource layer doesn't interpret them, it keeps the
//! parsed JSON around and lets consumers deserialize it into whatever they need.

use crate::ResourceError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    id: String,
    path: PathBuf,
    value: Value,
}

impl Descriptor {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Deserializes the descriptor into a concrete type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ResourceError> {
        serde_json::from_value(self.value.clone()).map_err(|err| ResourceError::JsonDeserialize {
            path: self.path.clone(),
            detail: err.to_string(),
        })
    }
}

/// Reads a descriptor file and checks that it's valid JSON.
pub fn read_descriptor(id: &str, path: &Path) -> Result<Descriptor, ResourceError> {
    let text = fs::read(path).map_err(|err| ResourceError::file_open(path, err))?;
    let value = serde_json::from_slice(&text).map_err(|err| ResourceError::JsonDeserialize {
        path: path.into(),
        detail: err.to_string(),
    })?;

    Ok(Descriptor {
        id: id.to_string(),
        path: path.into(),
        value,
    })
}
