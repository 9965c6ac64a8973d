use crate::error::AppError;
use std::path::Path;

/// Class index to label lookup; the index of a label is its line number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    labels: Vec<String>,
}

impl LabelMap {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::Labels {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        Self::new(text.lines().map(|line| line.trim().to_string()).collect())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Looks up a class index as emitted by a model (a float tensor value).
    pub fn resolve(&self, class: f32) -> Option<&str> {
        if !class.is_finite() || class < 0.0 {
            return None;
        }
        self.get(class as usize)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
