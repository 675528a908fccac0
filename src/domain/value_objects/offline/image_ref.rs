use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// File name of a locally stored capture image, relative to the image directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(value: String) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Content-addressed reference for the given image bytes.
    pub fn for_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(format!("{hex}.jpg"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("Image reference cannot be empty".to_string());
        }
        if value.contains('/') || value.contains('\\') || value.starts_with('.') {
            return Err(format!("Image reference must be a plain file name: {value}"));
        }
        Ok(())
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ImageRef> for String {
    fn from(value: ImageRef) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_bytes_is_stable() {
        let a = ImageRef::for_bytes(b"cow");
        let b = ImageRef::for_bytes(b"cow");
        assert_eq!(a, b);
        assert_ne!(a, ImageRef::for_bytes(b"buffalo"));
        assert!(a.as_str().ends_with(".jpg"));
        assert_eq!(a.as_str().len(), 64 + 4);
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert!(ImageRef::new("../etc/passwd".into()).is_err());
        assert!(ImageRef::new("a/b.jpg".into()).is_err());
        assert!(ImageRef::new("".into()).is_err());
        assert!(ImageRef::new("abc.jpg".into()).is_ok());
    }
}
