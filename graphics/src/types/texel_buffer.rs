//! Texel buffer descriptors and format feature validation.

use bitflags::bitflags;

use super::{BufferDescriptor, BufferUsage, ImageFormat};
use crate::error::GraphicsError;

bitflags! {
    /// Buffer features a device supports for a format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatFeatures: u32 {
        /// Format can back a uniform texel buffer.
        const UNIFORM_TEXEL_BUFFER = 1 << 0;
        /// Format can back a storage texel buffer.
        const STORAGE_TEXEL_BUFFER = 1 << 1;
        /// Format supports atomic operations in storage texel buffers.
        const STORAGE_TEXEL_BUFFER_ATOMIC = 1 << 2;
    }
}

impl Default for FormatFeatures {
    fn default() -> Self {
        Self::empty()
    }
}

/// Shape of a pooled texel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexelBufferDescriptor {
    /// Underlying buffer shape.
    pub buffer: BufferDescriptor,
    /// Format of the texel view.
    pub format: ImageFormat,
    /// Whether shaders perform atomics on the view.
    pub support_atomics: bool,
}

impl TexelBufferDescriptor {
    /// Create a texel buffer descriptor without atomics.
    pub fn new(buffer: BufferDescriptor, format: ImageFormat) -> Self {
        Self {
            buffer,
            format,
            support_atomics: false,
        }
    }

    /// Require atomics support on the view.
    pub fn with_atomics(mut self, support_atomics: bool) -> Self {
        self.support_atomics = support_atomics;
        self
    }

    /// Format features the device must support for this descriptor.
    pub fn required_features(&self) -> FormatFeatures {
        let mut features = FormatFeatures::empty();
        if self.buffer.usage.contains(BufferUsage::STORAGE_TEXEL) {
            features |= FormatFeatures::STORAGE_TEXEL_BUFFER;
        }
        if self.buffer.usage.contains(BufferUsage::UNIFORM_TEXEL) {
            features |= FormatFeatures::UNIFORM_TEXEL_BUFFER;
        }
        if self.support_atomics {
            features |= FormatFeatures::STORAGE_TEXEL_BUFFER_ATOMIC;
        }
        features
    }

    /// Check the descriptor against the features a device reports for its format.
    pub fn validate(&self, supported: FormatFeatures) -> Result<(), GraphicsError> {
        let required = self.required_features();

        if required.contains(FormatFeatures::STORAGE_TEXEL_BUFFER)
            && !supported.contains(FormatFeatures::STORAGE_TEXEL_BUFFER)
        {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "{:?} doesn't support storage texel buffers",
                self.format
            )));
        }
        if required.contains(FormatFeatures::UNIFORM_TEXEL_BUFFER)
            && !supported.contains(FormatFeatures::UNIFORM_TEXEL_BUFFER)
        {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "{:?} doesn't support uniform texel buffers",
                self.format
            )));
        }
        if required.contains(FormatFeatures::STORAGE_TEXEL_BUFFER_ATOMIC)
            && !supported.contains(FormatFeatures::STORAGE_TEXEL_BUFFER_ATOMIC)
        {
            return Err(GraphicsError::FeatureNotSupported(format!(
                "{:?} doesn't support texel buffer atomics",
                self.format
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_desc() -> TexelBufferDescriptor {
        TexelBufferDescriptor::new(
            BufferDescriptor::new(1024, BufferUsage::STORAGE_TEXEL),
            ImageFormat::R32Uint,
        )
    }

    #[test]
    fn test_required_features() {
        assert_eq!(
            storage_desc().required_features(),
            FormatFeatures::STORAGE_TEXEL_BUFFER
        );
        assert_eq!(
            storage_desc().with_atomics(true).required_features(),
            FormatFeatures::STORAGE_TEXEL_BUFFER | FormatFeatures::STORAGE_TEXEL_BUFFER_ATOMIC
        );
    }

    #[test]
    fn test_validate_atomics() {
        let desc = storage_desc().with_atomics(true);
        assert!(desc.validate(FormatFeatures::STORAGE_TEXEL_BUFFER).is_err());
        assert!(desc.validate(FormatFeatures::all()).is_ok());
    }

    #[test]
    fn test_validate_uniform() {
        let desc = TexelBufferDescriptor::new(
            BufferDescriptor::new(1024, BufferUsage::UNIFORM_TEXEL),
            ImageFormat::Rgba8Unorm,
        );
        let err = desc.validate(FormatFeatures::STORAGE_TEXEL_BUFFER).unwrap_err();
        assert!(matches!(err, GraphicsError::FeatureNotSupported(_)));
    }

    #[test]
    fn test_atomics_flag_affects_equality() {
        assert_ne!(storage_desc(), storage_desc().with_atomics(true));
    }
}
