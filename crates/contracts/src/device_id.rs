//! DeviceId - camera identifier carried by every frame

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Identifier of one registered camera device.
///
/// Backed by `Arc<str>`: each captured frame clones the id of its source
/// device, so a clone is a reference-count bump.
///
/// ```
/// use contracts::DeviceId;
///
/// let id: DeviceId = "cam1".into();
/// assert_eq!(id, "cam1");
/// assert!(id.is_label_safe());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Arc<str>);

impl DeviceId {
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the id is usable as a metric label and a log field without
    /// escaping: non-empty ASCII alphanumerics, `_` and `-`.
    pub fn is_label_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl Deref for DeviceId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl PartialEq<str> for DeviceId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for DeviceId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({:?})", &*self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_shares_allocation() {
        let left: DeviceId = "left_cam".into();
        let copy = left.clone();
        assert_eq!(left.as_str().as_ptr(), copy.as_str().as_ptr());
    }

    #[test]
    fn test_lookup_by_str() {
        let mut queues: HashMap<DeviceId, usize> = HashMap::new();
        queues.insert("cam1".into(), 3);
        assert_eq!(queues.get("cam1"), Some(&3));
    }

    #[test]
    fn test_label_safety() {
        assert!(DeviceId::from("cam-1_left").is_label_safe());
        assert!(!DeviceId::from("cam 1").is_label_safe());
        assert!(!DeviceId::from("../cam").is_label_safe());
        assert!(!DeviceId::default().is_label_safe());
    }

    #[test]
    fn test_serde_transparent() {
        let id: DeviceId = "cam2".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cam2\"");
        let parsed: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
