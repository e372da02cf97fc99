//! Input source descriptors
//!
//! A descriptor is a list of `key:value` pairs separated by commas, e.g.
//! `engine:evdev,path:/dev/input/event3,code:312`. The `engine` key selects
//! the backend; every other key is backend specific.

use std::collections::HashMap;

use crate::error::{ExtraHidError, Result};

/// Parsed input source descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamPackage {
    params: HashMap<String, String>,
}

impl ParamPackage {
    /// Parse a descriptor string
    ///
    /// Whitespace around keys and values is trimmed and empty segments are
    /// skipped. Values may contain `:` (only the first one separates).
    ///
    /// # Errors
    ///
    /// Returns `Input` error if a segment has no `:` separator or an empty key
    ///
    /// # Examples
    ///
    /// ```
    /// use extra_hid::input::param::ParamPackage;
    ///
    /// let params = ParamPackage::parse("engine:virtual,name:zl")?;
    /// assert_eq!(params.engine(), Some("virtual"));
    /// assert_eq!(params.get("name"), Some("zl"));
    /// # Ok::<(), extra_hid::error::ExtraHidError>(())
    /// ```
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut params = HashMap::new();

        for segment in descriptor.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment.split_once(':').ok_or_else(|| {
                ExtraHidError::Input(format!("Missing ':' in descriptor segment '{}'", segment))
            })?;

            let key = key.trim();
            if key.is_empty() {
                return Err(ExtraHidError::Input(
                    format!("Empty key in descriptor segment '{}'", segment)
                ));
            }

            params.insert(key.to_string(), value.trim().to_string());
        }

        Ok(Self { params })
    }

    pub fn engine(&self) -> Option<&str> {
        self.get("engine")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Required string parameter
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ExtraHidError::Input(format!("Missing '{}' parameter", key)))
    }

    /// Required unsigned 16-bit parameter (decimal or `0x` hex)
    pub fn require_u16(&self, key: &str) -> Result<u16> {
        let raw = self.require(key)?;
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => raw.parse::<u16>(),
        };

        parsed.map_err(|_| {
            ExtraHidError::Input(format!("Parameter '{}' is not a valid code: '{}'", key, raw))
        })
    }

    /// Optional boolean parameter, `default` if absent
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => matches!(value, "true" | "1" | "yes"),
            None => default,
        }
    }
}
