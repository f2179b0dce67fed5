//! The process-wide slicing device.
//!
//! One device and queue serve every [`SlicingEngine`](crate::SlicingEngine)
//! in the process. It is created on first use from an adapter that can
//! render into the slicer's colour and depth formats. Without such an
//! adapter the context stays empty and engines fail with
//! [`GpuError::NotAvailable`].
//!
//! The power preference can be forced with the `PRINT_GPU_POWER`
//! environment variable (`high` or `low`).
//!
//! ```no_run
//! use print_gpu::GpuContext;
//!
//! match GpuContext::get() {
//!     Some(ctx) => println!("slicing on {}", ctx.adapter.name),
//!     None => println!("no usable GPU"),
//! }
//! ```

use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::error::{GpuError, GpuResult};
use crate::targets::{DEPTH_FORMAT, TARGET_FORMAT};

static SLICING_DEVICE: OnceLock<Option<GpuContext>> = OnceLock::new();

/// Environment variable overriding [`AdapterPreference::Auto`].
pub const POWER_ENV: &str = "PRINT_GPU_POWER";

/// Which kind of adapter to ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdapterPreference {
    /// Read [`POWER_ENV`], falling back to high performance.
    #[default]
    Auto,
    /// Discrete GPU if present.
    HighPerformance,
    /// Integrated GPU if present.
    LowPower,
}

impl AdapterPreference {
    /// Parse a [`POWER_ENV`] value. Unknown values mean `Auto`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "discrete" => Self::HighPerformance,
            "low" | "integrated" => Self::LowPower,
            _ => Self::Auto,
        }
    }

    fn power(self) -> wgpu::PowerPreference {
        let resolved = match self {
            Self::Auto => std::env::var(POWER_ENV).map_or(Self::Auto, |v| Self::parse(&v)),
            other => other,
        };
        match resolved {
            Self::LowPower => wgpu::PowerPreference::LowPower,
            Self::Auto | Self::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// What the slicer reports about its adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSummary {
    /// Adapter name.
    pub name: String,
    /// Device type as reported by the driver.
    pub device_type: String,
    /// Graphics API in use.
    pub backend: String,
    /// Whether this is a CPU rasteriser.
    pub software: bool,
}

impl From<wgpu::AdapterInfo> for AdapterSummary {
    fn from(info: wgpu::AdapterInfo) -> Self {
        Self {
            software: info.device_type == wgpu::DeviceType::Cpu,
            name: info.name,
            device_type: format!("{:?}", info.device_type),
            backend: format!("{:?}", info.backend),
        }
    }
}

/// Device and queue shared by all slicing engines.
pub struct GpuContext {
    /// Creates targets, buffers and pipelines.
    pub device: wgpu::Device,
    /// Receives every slicing pass.
    pub queue: wgpu::Queue,
    /// The adapter behind `device`.
    pub adapter: AdapterSummary,
    limits: wgpu::Limits,
}

impl GpuContext {
    /// The shared device, created on first call.
    #[must_use]
    pub fn get() -> Option<&'static Self> {
        SLICING_DEVICE
            .get_or_init(|| {
                pollster::block_on(Self::open(AdapterPreference::Auto))
                    .inspect(|ctx| {
                        info!(
                            adapter = %ctx.adapter.name,
                            backend = %ctx.adapter.backend,
                            software = ctx.adapter.software,
                            max_target = ctx.max_texture_dimension(),
                            "slicing device ready"
                        );
                    })
                    .map_err(|e| warn!(error = %e, "no slicing device"))
                    .ok()
            })
            .as_ref()
    }

    /// The shared device or [`GpuError::NotAvailable`].
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::NotAvailable`] when no usable adapter exists.
    pub fn try_get() -> GpuResult<&'static Self> {
        Self::get().ok_or(GpuError::NotAvailable)
    }

    /// Whether slicing on the GPU is possible.
    #[must_use]
    pub fn is_available() -> bool {
        Self::get().is_some()
    }

    async fn open(preference: AdapterPreference) -> GpuResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: preference.power(),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or(GpuError::NotAvailable)?;

        let summary = AdapterSummary::from(adapter.get_info());
        debug!(name = %summary.name, device_type = %summary.device_type, "adapter found");

        for format in [TARGET_FORMAT, DEPTH_FORMAT] {
            let usages = adapter.get_texture_format_features(format).allowed_usages;
            if !usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
                warn!(adapter = %summary.name, ?format, "cannot render to slice format");
                return Err(GpuError::NotAvailable);
            }
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("print-gpu"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| GpuError::Execution(format!("device request failed: {e}")))?;

        Ok(Self {
            limits: device.limits(),
            device,
            queue,
            adapter: summary,
        })
    }

    /// Largest target width or height.
    #[must_use]
    pub const fn max_texture_dimension(&self) -> u32 {
        self.limits.max_texture_dimension_2d
    }

    /// Rough memory ceiling quoted in out-of-memory errors. wgpu exposes no
    /// real figure, so this is the largest allowed buffer.
    #[must_use]
    pub const fn estimate_available_memory(&self) -> u64 {
        self.limits.max_buffer_size
    }

    /// Reject target sizes that are empty or beyond the device limit.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::InvalidSize`].
    pub fn check_target_size(&self, width: u32, height: u32) -> GpuResult<()> {
        let max = self.max_texture_dimension();
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GpuError::InvalidSize { width, height });
        }
        Ok(())
    }
}

/// Bytes held by one target of `width` x `height`, colour plus depth.
#[must_use]
pub fn target_bytes(width: u32, height: u32) -> u64 {
    let texel = TARGET_FORMAT.block_copy_size(None).unwrap_or(4)
        + DEPTH_FORMAT.block_copy_size(None).unwrap_or(4);
    u64::from(width) * u64::from(height) * u64::from(texel)
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter)
            .field("max_texture_dimension", &self.limits.max_texture_dimension_2d)
            .finish_non_exhaustive()
    }
}
