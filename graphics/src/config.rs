//! Device configuration.

/// Backend selection for [`create_device`](crate::backend::create_device).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Vulkan when available, dummy otherwise.
    #[default]
    Auto,
    /// Vulkan via ash, failing if unavailable.
    Vulkan,
    /// No-op backend for tests and tooling.
    Dummy,
}

/// Configuration for creating a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParameters {
    /// Which backend to use.
    pub backend: BackendPreference,
    /// Enable API validation layers when available.
    pub validation: bool,
    /// Application name reported to the driver.
    pub application_name: String,
}

impl Default for DeviceParameters {
    fn default() -> Self {
        Self {
            backend: BackendPreference::Auto,
            validation: cfg!(debug_assertions),
            application_name: "respool".to_string(),
        }
    }
}

impl DeviceParameters {
    /// Create default device parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend preference.
    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}
