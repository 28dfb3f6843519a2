//! Serializer configuration types and builder.

/// Default upper bound on decoded element and entry counts.
const DEFAULT_MAX_COLLECTION_LEN: usize = 16 * 1024 * 1024;

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Which members of a composite type are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config-file", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-file", serde(rename_all = "kebab-case"))]
pub enum ExtractorKind {
    /// Members with both a getter and a setter, whatever their accessibility.
    #[default]
    AccessorPairs,
    /// Only storage-slot members, never computed accessors.
    Fields,
}

/// Serializer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerConfig {
    extractor: ExtractorKind,
    omit_absent_members: bool,
    max_collection_len: usize,
    verify_custom_sizes: bool,
}

impl SerializerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SerializerConfigBuilder {
        SerializerConfigBuilder::new()
    }

    /// Returns the member extraction strategy.
    pub fn extractor(&self) -> ExtractorKind {
        self.extractor
    }

    /// Returns whether absent optionals and null dynamic values are left out
    /// of composite encodings.
    pub fn omit_absent_members(&self) -> bool {
        self.omit_absent_members
    }

    /// Returns the largest element or entry count accepted on read.
    pub fn max_collection_len(&self) -> usize {
        self.max_collection_len
    }

    /// Returns whether custom writers must match their sizers exactly.
    pub fn verify_custom_sizes(&self) -> bool {
        self.verify_custom_sizes
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::default(),
            omit_absent_members: true,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            verify_custom_sizes: true,
        }
    }
}

/// Builder for `SerializerConfig`.
#[derive(Debug, Clone, Default)]
pub struct SerializerConfigBuilder {
    extractor: Option<ExtractorKind>,
    omit_absent_members: Option<bool>,
    max_collection_len: Option<usize>,
    verify_custom_sizes: Option<bool>,
}

impl SerializerConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the member extraction strategy.
    pub fn extractor(mut self, kind: ExtractorKind) -> Self {
        self.extractor = Some(kind);
        self
    }

    /// Sets whether absent members are left out of composite encodings.
    pub fn omit_absent_members(mut self, omit: bool) -> Self {
        self.omit_absent_members = Some(omit);
        self
    }

    /// Sets the largest element or entry count accepted on read.
    pub fn max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = Some(len);
        self
    }

    /// Sets whether custom writers must match their sizers exactly.
    pub fn verify_custom_sizes(mut self, verify: bool) -> Self {
        self.verify_custom_sizes = Some(verify);
        self
    }

    /// Builds the configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `max_collection_len` is zero or does not fit
    /// the `u32` count prefix used on the wire.
    pub fn build(self) -> Result<SerializerConfig, ConfigError> {
        let defaults = SerializerConfig::default();
        let max_collection_len = self
            .max_collection_len
            .unwrap_or(defaults.max_collection_len);

        if max_collection_len == 0 {
            return Err(ConfigError::new("max_collection_len must be greater than zero"));
        }
        if max_collection_len > u32::MAX as usize {
            return Err(ConfigError::new(format!(
                "max_collection_len must not exceed {}",
                u32::MAX
            )));
        }

        Ok(SerializerConfig {
            extractor: self.extractor.unwrap_or(defaults.extractor),
            omit_absent_members: self
                .omit_absent_members
                .unwrap_or(defaults.omit_absent_members),
            max_collection_len,
            verify_custom_sizes: self
                .verify_custom_sizes
                .unwrap_or(defaults.verify_custom_sizes),
        })
    }
}

#[cfg(feature = "config-file")]
mod file {
    use serde::Deserialize;

    use super::{ConfigError, ExtractorKind, SerializerConfig};

    /// File form of [`SerializerConfig`]; every key is optional.
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "kebab-case", default)]
    struct FileConfig {
        extractor: Option<ExtractorKind>,
        omit_absent_members: Option<bool>,
        max_collection_len: Option<usize>,
        verify_custom_sizes: Option<bool>,
    }

    impl FileConfig {
        fn into_config(self) -> Result<SerializerConfig, ConfigError> {
            let mut builder = SerializerConfig::builder();
            if let Some(kind) = self.extractor {
                builder = builder.extractor(kind);
            }
            if let Some(omit) = self.omit_absent_members {
                builder = builder.omit_absent_members(omit);
            }
            if let Some(len) = self.max_collection_len {
                builder = builder.max_collection_len(len);
            }
            if let Some(verify) = self.verify_custom_sizes {
                builder = builder.verify_custom_sizes(verify);
            }
            builder.build()
        }
    }

    impl SerializerConfig {
        /// Parses a configuration from TOML text.
        ///
        /// ```toml
        /// extractor = "fields"
        /// omit-absent-members = false
        /// max-collection-len = 65536
        /// ```
        pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
            let file: FileConfig = toml::from_str(content)
                .map_err(|e| ConfigError::new(format!("failed to parse TOML config: {e}")))?;
            file.into_config()
        }

        /// Loads a configuration from a TOML file.
        pub fn from_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
            let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
                ConfigError::new(format!("failed to read TOML config file: {e}"))
            })?;
            Self::from_toml_str(&content)
        }
    }

}
