//! Resource usage states and their pipeline stage, access and layout masks.
//!
//! A state is a bitmask combining the pipeline stages a resource is used in
//! with the kinds of access performed there. The empty state means unknown,
//! which is where every freshly created resource starts.

use bitflags::bitflags;

bitflags! {
    /// Pipeline stages a barrier waits on or blocks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const FRAGMENT_SHADER = 1 << 0;
        const EARLY_FRAGMENT_TESTS = 1 << 1;
        const LATE_FRAGMENT_TESTS = 1 << 2;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 3;
        const COMPUTE_SHADER = 1 << 4;
        const RAY_TRACING_SHADER = 1 << 5;
        const TRANSFER = 1 << 6;
    }
}

impl Default for PipelineStages {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Memory accesses made visible or available by a barrier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const COLOR_ATTACHMENT_READ = 1 << 2;
        const COLOR_ATTACHMENT_WRITE = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 5;
        const TRANSFER_READ = 1 << 6;
        const TRANSFER_WRITE = 1 << 7;
    }
}

impl Default for AccessFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl AccessFlags {
    /// Returns true if any access writes memory.
    pub fn has_writes(&self) -> bool {
        self.intersects(
            Self::SHADER_WRITE
                | Self::COLOR_ATTACHMENT_WRITE
                | Self::DEPTH_STENCIL_ATTACHMENT_WRITE
                | Self::TRANSFER_WRITE,
        )
    }
}

/// Layout an image is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents are undefined.
    #[default]
    Undefined,
    /// Any access, used for shader reads and writes.
    General,
    /// Color attachment.
    ColorAttachmentOptimal,
    /// Writable depth attachment.
    DepthAttachmentOptimal,
    /// Read-only depth attachment.
    DepthReadOnlyOptimal,
    /// Source of a transfer.
    TransferSrcOptimal,
    /// Destination of a transfer.
    TransferDstOptimal,
}

bitflags! {
    /// Usage state of a buffer or texel buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferState: u32 {
        // Stages
        const STAGE_FRAGMENT_SHADER = 0x1;
        const STAGE_COMPUTE_SHADER = 0x2;
        /// Covers copy, blit, resolve and clear.
        const STAGE_TRANSFER = 0x4;

        // Access
        /// Covers sampled and storage reads.
        const ACCESS_SHADER_READ = 0x8;
        const ACCESS_SHADER_WRITE = 0x10;
        const ACCESS_TRANSFER_READ = 0x20;
        const ACCESS_TRANSFER_WRITE = 0x40;

        // Combined masks
        const FRAGMENT_SHADER_READ = Self::STAGE_FRAGMENT_SHADER.bits() | Self::ACCESS_SHADER_READ.bits();
        const COMPUTE_SHADER_READ = Self::STAGE_COMPUTE_SHADER.bits() | Self::ACCESS_SHADER_READ.bits();
        const COMPUTE_SHADER_WRITE = Self::STAGE_COMPUTE_SHADER.bits() | Self::ACCESS_SHADER_WRITE.bits();
        const COMPUTE_SHADER_READ_WRITE = Self::COMPUTE_SHADER_READ.bits() | Self::COMPUTE_SHADER_WRITE.bits();
        const TRANSFER_SRC = Self::STAGE_TRANSFER.bits() | Self::ACCESS_TRANSFER_READ.bits();
        const TRANSFER_DST = Self::STAGE_TRANSFER.bits() | Self::ACCESS_TRANSFER_WRITE.bits();
    }
}

impl Default for BufferState {
    fn default() -> Self {
        Self::empty()
    }
}

impl BufferState {
    /// Pipeline stages the state is used in.
    pub fn stages(&self) -> PipelineStages {
        let mut stages = PipelineStages::empty();
        if self.contains(Self::STAGE_FRAGMENT_SHADER) {
            stages |= PipelineStages::FRAGMENT_SHADER;
        }
        if self.contains(Self::STAGE_COMPUTE_SHADER) {
            stages |= PipelineStages::COMPUTE_SHADER;
        }
        if self.contains(Self::STAGE_TRANSFER) {
            stages |= PipelineStages::TRANSFER;
        }
        stages
    }

    /// Memory accesses the state performs.
    pub fn access(&self) -> AccessFlags {
        let mut access = AccessFlags::empty();
        if self.contains(Self::ACCESS_SHADER_READ) {
            access |= AccessFlags::SHADER_READ;
        }
        if self.contains(Self::ACCESS_SHADER_WRITE) {
            access |= AccessFlags::SHADER_WRITE;
        }
        if self.contains(Self::ACCESS_TRANSFER_READ) {
            access |= AccessFlags::TRANSFER_READ;
        }
        if self.contains(Self::ACCESS_TRANSFER_WRITE) {
            access |= AccessFlags::TRANSFER_WRITE;
        }
        access
    }

    /// Returns true if the state writes memory.
    pub fn has_writes(&self) -> bool {
        self.access().has_writes()
    }
}

bitflags! {
    /// Usage state of an image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageState: u32 {
        // Stages
        const STAGE_FRAGMENT_SHADER = 0x1;
        const STAGE_EARLY_FRAGMENT_TESTS = 0x2;
        const STAGE_LATE_FRAGMENT_TESTS = 0x4;
        const STAGE_COLOR_ATTACHMENT_OUTPUT = 0x8;
        const STAGE_COMPUTE_SHADER = 0x10;
        const STAGE_RAY_TRACING_SHADER = 0x20;
        /// Covers copy, blit, resolve and clear.
        const STAGE_TRANSFER = 0x40;

        // Access
        /// Covers sampled and storage reads.
        const ACCESS_SHADER_READ = 0x80;
        const ACCESS_SHADER_WRITE = 0x100;
        const ACCESS_COLOR_ATTACHMENT_READ = 0x200;
        const ACCESS_COLOR_ATTACHMENT_WRITE = 0x400;
        const ACCESS_DEPTH_ATTACHMENT_READ = 0x800;
        const ACCESS_DEPTH_ATTACHMENT_WRITE = 0x1000;
        const ACCESS_TRANSFER_READ = 0x2000;
        const ACCESS_TRANSFER_WRITE = 0x4000;

        // Combined masks
        const COLOR_ATTACHMENT_WRITE =
            Self::STAGE_COLOR_ATTACHMENT_OUTPUT.bits() | Self::ACCESS_COLOR_ATTACHMENT_WRITE.bits();
        const COLOR_ATTACHMENT_READ_WRITE = Self::STAGE_COLOR_ATTACHMENT_OUTPUT.bits()
            | Self::ACCESS_COLOR_ATTACHMENT_READ.bits()
            | Self::ACCESS_COLOR_ATTACHMENT_WRITE.bits();
        const DEPTH_ATTACHMENT_READ =
            Self::STAGE_EARLY_FRAGMENT_TESTS.bits() | Self::ACCESS_DEPTH_ATTACHMENT_READ.bits();
        const DEPTH_ATTACHMENT_WRITE =
            Self::STAGE_LATE_FRAGMENT_TESTS.bits() | Self::ACCESS_DEPTH_ATTACHMENT_WRITE.bits();
        const DEPTH_ATTACHMENT_READ_WRITE =
            Self::DEPTH_ATTACHMENT_READ.bits() | Self::DEPTH_ATTACHMENT_WRITE.bits();
        const FRAGMENT_SHADER_READ = Self::STAGE_FRAGMENT_SHADER.bits() | Self::ACCESS_SHADER_READ.bits();
        const COMPUTE_SHADER_READ = Self::STAGE_COMPUTE_SHADER.bits() | Self::ACCESS_SHADER_READ.bits();
        const COMPUTE_SHADER_WRITE = Self::STAGE_COMPUTE_SHADER.bits() | Self::ACCESS_SHADER_WRITE.bits();
        const COMPUTE_SHADER_READ_WRITE = Self::COMPUTE_SHADER_READ.bits() | Self::COMPUTE_SHADER_WRITE.bits();
        const RAY_TRACING_READ = Self::STAGE_RAY_TRACING_SHADER.bits() | Self::ACCESS_SHADER_READ.bits();
        const RAY_TRACING_WRITE = Self::STAGE_RAY_TRACING_SHADER.bits() | Self::ACCESS_SHADER_WRITE.bits();
        const RAY_TRACING_READ_WRITE = Self::RAY_TRACING_READ.bits() | Self::RAY_TRACING_WRITE.bits();
        const TRANSFER_SRC = Self::STAGE_TRANSFER.bits() | Self::ACCESS_TRANSFER_READ.bits();
        const TRANSFER_DST = Self::STAGE_TRANSFER.bits() | Self::ACCESS_TRANSFER_WRITE.bits();
    }
}

impl Default for ImageState {
    fn default() -> Self {
        Self::empty()
    }
}

impl ImageState {
    /// Pipeline stages the state is used in.
    pub fn stages(&self) -> PipelineStages {
        let mut stages = PipelineStages::empty();
        if self.contains(Self::STAGE_FRAGMENT_SHADER) {
            stages |= PipelineStages::FRAGMENT_SHADER;
        }
        if self.contains(Self::STAGE_EARLY_FRAGMENT_TESTS) {
            stages |= PipelineStages::EARLY_FRAGMENT_TESTS;
        }
        if self.contains(Self::STAGE_LATE_FRAGMENT_TESTS) {
            stages |= PipelineStages::LATE_FRAGMENT_TESTS;
        }
        if self.contains(Self::STAGE_COLOR_ATTACHMENT_OUTPUT) {
            stages |= PipelineStages::COLOR_ATTACHMENT_OUTPUT;
        }
        if self.contains(Self::STAGE_COMPUTE_SHADER) {
            stages |= PipelineStages::COMPUTE_SHADER;
        }
        if self.contains(Self::STAGE_RAY_TRACING_SHADER) {
            stages |= PipelineStages::RAY_TRACING_SHADER;
        }
        if self.contains(Self::STAGE_TRANSFER) {
            stages |= PipelineStages::TRANSFER;
        }
        stages
    }

    /// Memory accesses the state performs.
    pub fn access(&self) -> AccessFlags {
        let mut access = AccessFlags::empty();
        if self.contains(Self::ACCESS_SHADER_READ) {
            access |= AccessFlags::SHADER_READ;
        }
        if self.contains(Self::ACCESS_SHADER_WRITE) {
            access |= AccessFlags::SHADER_WRITE;
        }
        if self.contains(Self::ACCESS_COLOR_ATTACHMENT_READ) {
            access |= AccessFlags::COLOR_ATTACHMENT_READ;
        }
        if self.contains(Self::ACCESS_COLOR_ATTACHMENT_WRITE) {
            access |= AccessFlags::COLOR_ATTACHMENT_WRITE;
        }
        if self.contains(Self::ACCESS_DEPTH_ATTACHMENT_READ) {
            access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ;
        }
        if self.contains(Self::ACCESS_DEPTH_ATTACHMENT_WRITE) {
            access |= AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;
        }
        if self.contains(Self::ACCESS_TRANSFER_READ) {
            access |= AccessFlags::TRANSFER_READ;
        }
        if self.contains(Self::ACCESS_TRANSFER_WRITE) {
            access |= AccessFlags::TRANSFER_WRITE;
        }
        access
    }

    /// Returns true if the state writes memory.
    pub fn has_writes(&self) -> bool {
        self.access().has_writes()
    }

    /// Layout the image has to be in for this state.
    ///
    /// The first matching rule wins, so shader access forces `General` even
    /// when combined with attachment bits.
    pub fn layout(&self) -> ImageLayout {
        if self.intersects(Self::ACCESS_SHADER_READ | Self::ACCESS_SHADER_WRITE) {
            ImageLayout::General
        } else if self.contains(Self::STAGE_COLOR_ATTACHMENT_OUTPUT) {
            ImageLayout::ColorAttachmentOptimal
        } else if self.contains(Self::ACCESS_DEPTH_ATTACHMENT_WRITE) {
            ImageLayout::DepthAttachmentOptimal
        } else if self.contains(Self::ACCESS_DEPTH_ATTACHMENT_READ) {
            ImageLayout::DepthReadOnlyOptimal
        } else if self.contains(Self::ACCESS_TRANSFER_READ) {
            ImageLayout::TransferSrcOptimal
        } else if self.contains(Self::ACCESS_TRANSFER_WRITE) {
            ImageLayout::TransferDstOptimal
        } else {
            debug_assert!(self.is_empty(), "No layout rule for {:?}", self);
            ImageLayout::Undefined
        }
    }
}
