//! In-memory channel registry
//!
//! Slab-backed, with injectable failures for error-path tests.

use slab::Slab;
use tracing::{instrument, trace};

use contracts::{ChannelConfig, ChannelHandle, ChannelKey, ChannelRegistry, ContractError};

/// Keys whose registry operations should fail
#[derive(Debug, Default, Clone)]
pub struct RegistryFailures {
    pub fail_create: Vec<String>,
    pub fail_configure: Vec<String>,
    pub fail_remove: Vec<String>,
}

#[derive(Debug, Clone)]
struct ChannelRecord {
    key: ChannelKey,
    config: ChannelConfig,
    /// Number of `configure` calls since creation
    reconfigured: u32,
}

/// Registry operation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub created: u32,
    pub configured: u32,
    pub removed: u32,
}

/// In-memory host channel registry
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    failures: RegistryFailures,
    channels: Slab<ChannelRecord>,
    stats: RegistryStats,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with injected failures
    pub fn with_failures(failures: RegistryFailures) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .channels
            .iter()
            .map(|(_, record)| record.key.to_string())
            .collect();
        keys.sort();
        keys
    }

    /// Current configuration of a channel
    pub fn config_of(&self, key: &str) -> Option<&ChannelConfig> {
        self.find(key).map(|(_, record)| &record.config)
    }

    /// `configure` calls a channel received since creation
    pub fn reconfigured(&self, key: &str) -> Option<u32> {
        self.find(key).map(|(_, record)| record.reconfigured)
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    fn find(&self, key: &str) -> Option<(usize, &ChannelRecord)> {
        self.channels
            .iter()
            .find(|(_, record)| record.key.as_str() == key)
    }

    fn handle(id: usize, record: &ChannelRecord) -> ChannelHandle {
        ChannelHandle::new(id as u32, record.key.clone())
    }

    fn record_mut(&mut self, handle: &ChannelHandle) -> Result<&mut ChannelRecord, ContractError> {
        match self.channels.get_mut(handle.id() as usize) {
            Some(record) if record.key == *handle.key() => Ok(record),
            _ => Err(ContractError::registry(handle.key().as_str(), "unknown channel handle")),
        }
    }
}

impl ChannelRegistry for MemoryRegistry {
    fn lookup(&self, key: &ChannelKey) -> Option<ChannelHandle> {
        self.find(key).map(|(id, record)| Self::handle(id, record))
    }

    #[instrument(name = "mock_registry_create", skip(self, config), fields(key = %key))]
    fn create(
        &mut self,
        key: ChannelKey,
        config: &ChannelConfig,
    ) -> Result<ChannelHandle, ContractError> {
        if self.failures.fail_create.iter().any(|k| k == key.as_str()) {
            return Err(ContractError::registry(key.as_str(), "mock create failure"));
        }
        if self.find(&key).is_some() {
            return Err(ContractError::registry(key.as_str(), "channel already exists"));
        }

        let record = ChannelRecord {
            key,
            config: config.clone(),
            reconfigured: 0,
        };
        let handle_key = record.key.clone();
        let id = self.channels.insert(record);
        self.stats.created += 1;
        trace!(id, "channel created");
        Ok(ChannelHandle::new(id as u32, handle_key))
    }

    fn configure(
        &mut self,
        handle: &ChannelHandle,
        config: &ChannelConfig,
    ) -> Result<(), ContractError> {
        if self.failures.fail_configure.iter().any(|k| k == handle.key().as_str()) {
            return Err(ContractError::registry(handle.key().as_str(), "mock configure failure"));
        }

        let record = self.record_mut(handle)?;
        // display name and format are fixed at creation
        record.config.samplerate = config.samplerate;
        record.config.range = config.range;
        record.config.unit = config.unit.clone();
        record.reconfigured += 1;
        self.stats.configured += 1;
        Ok(())
    }

    #[instrument(name = "mock_registry_remove", skip(self), fields(handle = %handle))]
    fn remove(&mut self, handle: &ChannelHandle) -> Result<(), ContractError> {
        if self.failures.fail_remove.iter().any(|k| k == handle.key().as_str()) {
            return Err(ContractError::registry(handle.key().as_str(), "mock remove failure"));
        }

        self.record_mut(handle)?;
        self.channels.remove(handle.id() as usize);
        self.stats.removed += 1;
        Ok(())
    }

    fn list(&self) -> Vec<ChannelHandle> {
        self.channels
            .iter()
            .map(|(id, record)| Self::handle(id, record))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SampleFormat, ValueRange};

    fn config(unit: &str) -> ChannelConfig {
        ChannelConfig {
            default_name: "U1".to_string(),
            format: SampleFormat::SYNC_SCALAR_F32,
            samplerate: Some(1000.0),
            range: Some(ValueRange { min: -1.0, max: 1.0 }),
            unit: unit.to_string(),
            deletable: true,
        }
    }

    #[test]
    fn test_create_lookup_remove() {
        let mut registry = MemoryRegistry::new();
        let key = ChannelKey::data("U1");

        let handle = registry.create(key.clone(), &config("V")).unwrap();
        assert_eq!(registry.lookup(&key), Some(handle.clone()));
        assert_eq!(registry.list().len(), 1);

        registry.remove(&handle).unwrap();
        assert!(registry.lookup(&key).is_none());
        assert!(registry.is_empty());
        assert!(registry.remove(&handle).is_err());
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let mut registry = MemoryRegistry::new();
        registry.create(ChannelKey::data("U1"), &config("V")).unwrap();
        assert!(registry.create(ChannelKey::data("U1"), &config("V")).is_err());
    }

    #[test]
    fn test_configure_keeps_name() {
        let mut registry = MemoryRegistry::new();
        let handle = registry.create(ChannelKey::data("U1"), &config("V")).unwrap();

        let mut update = config("mV");
        update.default_name = "renamed".to_string();
        registry.configure(&handle, &update).unwrap();

        let stored = registry.config_of("DATACHANNEL_U1").unwrap();
        assert_eq!(stored.unit, "mV");
        assert_eq!(stored.default_name, "U1");
        assert_eq!(registry.reconfigured("DATACHANNEL_U1"), Some(1));
    }

    #[test]
    fn test_injected_failure() {
        let mut registry = MemoryRegistry::with_failures(RegistryFailures {
            fail_create: vec!["DATACHANNEL_bad".to_string()],
            ..Default::default()
        });
        let err = registry.create(ChannelKey::data("bad"), &config("V")).unwrap_err();
        assert!(matches!(err, ContractError::Registry { .. }));
        assert_eq!(registry.stats().created, 0);
    }
}
