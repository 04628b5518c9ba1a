//! Manager configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Result, VkoreError};

/// Name of the default resource grouping. Not interpreted by the manager itself.
pub const DEFAULT_SESSION: &str = "DEFAULT";

/// Configuration for [`Manager`](crate::Manager) construction.
///
/// Every field has a default, so a JSON file only needs the keys it overrides:
///
/// ```json
/// { "physical_device_index": 1, "queue_family_indices": [0, 2] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Index into the instance's physical-device enumeration.
    pub physical_device_index: u32,

    /// Queue families to open. Empty selects the first compute-capable family.
    pub queue_family_indices: Vec<u32>,

    /// Device extensions that must be supported and are enabled on the device.
    pub desired_extensions: Vec<String>,

    /// Track created resources so that `clear()` / `destroy()` can reclaim them.
    pub manage_resources: bool,

    /// Enable the validation layer and a debug messenger when the loader offers them.
    /// Missing debug support is logged and skipped.
    pub debug_layers: bool,

    /// Instance layers that must be available and are always enabled.
    pub instance_layers: Vec<String>,

    /// Instance extensions that must be available and are always enabled.
    pub instance_extensions: Vec<String>,

    /// Application name reported to the driver at instance creation.
    pub application_name: String,

    /// Session label carried by the manager.
    pub session: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            physical_device_index: 0,
            queue_family_indices: Vec::new(),
            desired_extensions: Vec::new(),
            manage_resources: true,
            debug_layers: cfg!(debug_assertions),
            instance_layers: Vec::new(),
            instance_extensions: Vec::new(),
            application_name: "vkore".to_string(),
            session: DEFAULT_SESSION.to_string(),
        }
    }
}

impl ManagerConfig {
    pub fn with_physical_device(mut self, index: u32) -> Self {
        self.physical_device_index = index;
        self
    }

    pub fn with_queue_families(mut self, families: impl Into<Vec<u32>>) -> Self {
        self.queue_family_indices = families.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.desired_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_manage_resources(mut self, manage: bool) -> Self {
        self.manage_resources = manage;
        self
    }

    pub fn with_debug_layers(mut self, enabled: bool) -> Self {
        self.debug_layers = enabled;
        self
    }

    pub fn with_instance_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_instance_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| VkoreError::InvalidConfig(e.to_string()))
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| VkoreError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| VkoreError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.physical_device_index, 0);
        assert!(config.queue_family_indices.is_empty());
        assert!(config.manage_resources);
        assert_eq!(config.debug_layers, cfg!(debug_assertions));
        assert!(config.instance_layers.is_empty());
        assert_eq!(config.session, DEFAULT_SESSION);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ManagerConfig::from_json(r#"{ "physical_device_index": 1, "queue_family_indices": [0, 2] }"#)
                .unwrap();
        assert_eq!(config.physical_device_index, 1);
        assert_eq!(config.queue_family_indices, vec![0, 2]);
        assert!(config.manage_resources);
        assert_eq!(config.application_name, "vkore");
    }

    #[test]
    fn test_invalid_json() {
        let err = ManagerConfig::from_json("{ physical_device_index: }").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let config = ManagerConfig::default()
            .with_physical_device(2)
            .with_extensions(["VK_KHR_shader_non_semantic_info"])
            .with_manage_resources(false)
            .with_debug_layers(true)
            .with_instance_extensions(["VK_KHR_get_physical_device_properties2"])
            .with_session("batch");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();
        let loaded = ManagerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let err = ManagerConfig::from_json_file(Path::new("/nonexistent/vkore.json")).unwrap_err();
        assert!(matches!(err, VkoreError::InvalidConfig(_)));
    }
}
