//! Configuration for texture uploads

/// What an in-place update does when its format differs from the allocation's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FormatChangePolicy {
    /// Refuse the upload with [`TextureError::FormatMismatch`](crate::TextureError::FormatMismatch)
    #[default]
    Reject,
    /// Reallocate the image in the new format
    Recreate,
}

/// Upload behaviour shared by every texture of a [`TextureManager`](crate::TextureManager)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureConfig {
    /// Handling of format changes on an existing allocation (default: reject)
    pub format_change: FormatChangePolicy,
    /// Once a texture has been reallocated, keep every later allocation
    /// CPU-writable so same-size updates can go in place (default: true)
    pub upgrade_to_dynamic: bool,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            format_change: FormatChangePolicy::Reject,
            upgrade_to_dynamic: true,
        }
    }
}

impl TextureConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the format change policy
    pub fn with_format_change(mut self, policy: FormatChangePolicy) -> Self {
        self.format_change = policy;
        self
    }

    /// Enable or disable the upgrade to CPU-writable memory on reallocation
    pub fn with_upgrade_to_dynamic(mut self, enabled: bool) -> Self {
        self.upgrade_to_dynamic = enabled;
        self
    }
}
