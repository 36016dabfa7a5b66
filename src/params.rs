//! Named parameter arrays and their JSON form.
//!
//! Acquiring trained weights is out of scope; this store is the interchange point. A network
//! exports its parameters by name, and any store with the same names and shapes can be loaded
//! back into it.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{NetError, NetResult};

/// One flat, row-major parameter array.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamArray {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ParamArray {
    /// Fails when `data` does not hold exactly `shape.iter().product()` values.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> NetResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(NetError::params(format!(
                "shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Parameter arrays keyed by dotted name, in name order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamStore {
    arrays: BTreeMap<String, ParamArray>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `name`.
    pub fn insert(&mut self, name: impl Into<String>, array: ParamArray) -> Option<ParamArray> {
        self.arrays.insert(name.into(), array)
    }

    pub fn get(&self, name: &str) -> Option<&ParamArray> {
        self.arrays.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.arrays.contains_key(name)
    }

    /// Number of named arrays.
    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Total scalar count across all arrays.
    pub fn scalar_count(&self) -> usize {
        self.arrays.values().map(ParamArray::len).sum()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamArray)> {
        self.arrays.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse and check every array's shape against its data length.
    pub fn from_json_reader<R: std::io::Read>(r: R) -> NetResult<Self> {
        let store: Self = serde_json::from_reader(r)
            .map_err(|e| NetError::serde(format!("parse parameter JSON: {e}")))?;
        for (name, array) in &store.arrays {
            let expected: usize = array.shape.iter().product();
            if expected != array.data.len() {
                return Err(NetError::params(format!(
                    "'{name}': shape {:?} needs {expected} values, got {}",
                    array.shape,
                    array.data.len()
                )));
            }
        }
        Ok(store)
    }

    pub fn from_path(path: impl AsRef<Path>) -> NetResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            NetError::params(format!("open parameter file '{}': {e}", path.display()))
        })?;
        Self::from_json_reader(BufReader::new(f))
    }

    pub fn to_json_writer<W: Write>(&self, w: W) -> NetResult<()> {
        serde_json::to_writer(w, self)
            .map_err(|e| NetError::serde(format!("write parameter JSON: {e}")))
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> NetResult<()> {
        let path = path.as_ref();
        let f = File::create(path).map_err(|e| {
            NetError::params(format!("create parameter file '{}': {e}", path.display()))
        })?;
        let mut w = BufWriter::new(f);
        self.to_json_writer(&mut w)?;
        w.flush()
            .map_err(|e| NetError::params(format!("flush '{}': {e}", path.display())))
    }
}

#[cfg(test)]
#[path = "../tests/unit/params.rs"]
mod tests;
