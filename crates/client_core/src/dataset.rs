use std::{fmt, fs, io, path::Path, sync::Arc};

use serde::{ser::SerializeStruct, Serialize, Serializer};

/// User-selected CSV file: display name plus raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    name: String,
    content: Arc<[u8]>,
}

impl DatasetHandle {
    pub fn new(name: impl Into<String>, content: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        let content = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::new(name, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("name", &self.name)
            .field("size_bytes", &self.content.len())
            .finish()
    }
}

// Snapshots carry the name and size only; the content stays in memory.
impl Serialize for DatasetHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DatasetHandle", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("size_bytes", &self.content.len())?;
        state.end()
    }
}
