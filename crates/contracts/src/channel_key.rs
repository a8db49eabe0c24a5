//! ChannelKey - Cheap-to-clone host channel key
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Reserved key prefix marking a host channel as a data channel.
pub const DATA_CHANNEL_PREFIX: &str = "DATACHANNEL_";

/// Stable identity of a channel in the host registry.
///
/// Data channels carry `DATACHANNEL_<name>`; any other key (drift, debug)
/// belongs to a diagnostic channel and is never touched by reconciliation.
///
/// # Examples
/// ```
/// use contracts::ChannelKey;
///
/// let key = ChannelKey::data("U1");
/// assert_eq!(key.as_str(), "DATACHANNEL_U1");
/// assert_eq!(key.data_channel_name(), Some("U1"));
/// assert_eq!(ChannelKey::from("DEBUG_DRIFT").data_channel_name(), None);
/// ```
#[derive(Clone, Default)]
pub struct ChannelKey(Arc<str>);

impl ChannelKey {
    /// Create a new key from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Build the data channel key for a metadata channel name.
    pub fn data(channel_name: &str) -> Self {
        Self(Arc::from(format!("{DATA_CHANNEL_PREFIX}{channel_name}")))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Metadata channel name if this is a data channel key.
    #[inline]
    pub fn data_channel_name(&self) -> Option<&str> {
        self.0.strip_prefix(DATA_CHANNEL_PREFIX)
    }

    /// Whether the key carries the data channel prefix.
    #[inline]
    pub fn is_data_channel(&self) -> bool {
        self.data_channel_name().is_some()
    }
}

impl Deref for ChannelKey {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ChannelKey {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ChannelKey {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChannelKey {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for ChannelKey {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelKey({:?})", self.0)
    }
}

impl PartialEq for ChannelKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ChannelKey {}

impl PartialEq<str> for ChannelKey {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ChannelKey {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Hash must match Borrow<str> so map lookups by &str work
impl Hash for ChannelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for ChannelKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChannelKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Serialize for ChannelKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChannelKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
