use crate::hasher::ContentHasher;
use crate::{ArtsyncError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Top-level keys every manifest document must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["server", "dir", "files"];

/// Scalar value attached to an entry next to its hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => Ok(()),
            PropValue::Bool(v) => write!(f, "{}", v),
            PropValue::Int(v) => write!(f, "{}", v),
            PropValue::Float(v) => write!(f, "{}", v),
            PropValue::Str(v) => f.write_str(v),
        }
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

pub type Properties = BTreeMap<String, PropValue>;

/// One tracked artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Content hash, also the remote directory name
    #[serde(deserialize_with = "scalar_string")]
    pub hash: String,
    /// Caller supplied metadata (size, notes, ...)
    #[serde(flatten)]
    pub properties: Properties,
}

// An all-digit hex digest is read back by YAML as an integer. Any other
// non-string scalar cannot be turned back into the digest it was written as.
fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match PropValue::deserialize(deserializer)? {
        PropValue::Str(hash) => Ok(hash),
        PropValue::Int(hash) if hash >= 0 => Ok(hash.to_string()),
        other => Err(D::Error::custom(format!("hash must be a string, got {:?}", other))),
    }
}

/// The synchronization state kept in the manifest document.
///
/// `files` is keyed by logical path. It is `None` when the document says
/// `files: null`, which is how a freshly created manifest looks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub server: String,
    #[serde(rename = "dir")]
    pub store_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub files: Option<BTreeMap<String, Entry>>,
    /// Any other top-level keys, kept so `save` does not drop them.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn new(server: impl Into<String>, store_dir: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            store_dir: store_dir.into(),
            user: None,
            files: None,
            extra: BTreeMap::new(),
        }
    }

    /// Read and validate a manifest document.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ArtsyncError::file(path, e))?;
        let manifest = Self::from_yaml(&content)
            .map_err(|e| match e {
                ArtsyncError::Config(msg) => ArtsyncError::Config(format!("{:?}: {}", path, msg)),
                other => other,
            })?;
        tracing::debug!("Loaded manifest {:?} with {} entries", path, manifest.len());
        Ok(manifest)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let mapping = value
            .as_mapping()
            .ok_or_else(|| ArtsyncError::Config("manifest must be a mapping".into()))?;

        for field in REQUIRED_FIELDS {
            if !mapping.contains_key(field) {
                return Err(ArtsyncError::Config(format!("missing required field '{}'", field)));
            }
        }

        match mapping.get("files") {
            Some(Value::Null) | Some(Value::Mapping(_)) => {}
            _ => return Err(ArtsyncError::Config("'files' must be a mapping or null".into())),
        }

        serde_yaml::from_value(value).map_err(|e| ArtsyncError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the whole manifest to `path`, replacing its previous content.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_yaml()?;
        std::fs::write(path, content).map_err(|e| ArtsyncError::file(path, e))?;
        tracing::debug!("Saved manifest {:?}", path);
        Ok(())
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.files.as_ref().and_then(|files| files.get(key))
    }

    /// Iterate `(logical path, entry)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.files.iter().flat_map(|files| files.iter())
    }

    pub fn len(&self) -> usize {
        self.files.as_ref().map_or(0, |files| files.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record `source` under `store_path` (or under `source` itself).
    ///
    /// An existing entry at that key is replaced as a whole. The hash comes
    /// from `properties["hash"]` when present, otherwise from the current
    /// content of `source`.
    pub fn append_file(
        &mut self,
        hasher: &dyn ContentHasher,
        source: &Path,
        store_path: Option<&str>,
        mut properties: Properties,
    ) -> Result<&Entry> {
        let key = match store_path {
            Some(key) => key.to_string(),
            None => source.to_string_lossy().replace('\\', "/"),
        };

        let hash = match properties.remove("hash") {
            Some(PropValue::Null) | None => hasher.hash_file(source)?,
            Some(value) => value.to_string(),
        };

        let files = self.files.get_or_insert_with(BTreeMap::new);
        files.insert(key.clone(), Entry { hash, properties });
        Ok(&files[&key])
    }
}
