//! Program descriptors and per-engine material instances.
//!
//! A [`ProgramDescriptor`] is a plain value: fragment source plus fixed
//! pipeline state. Each engine builds its own [`Materials`] from the
//! descriptors, so pipelines, uniform buffers and uniform values are never
//! shared between engines.

use std::time::Instant;

use print_scene::ProgramKind;
use tracing::{debug, info};

use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};
use crate::targets::{DEPTH_FORMAT, GpuTarget, RenderTargets, TARGET_FORMAT, TargetKey};
use crate::uniforms::{
    BoolUniforms, CopyUniforms, DepthUniforms, ErodeDilateUniforms, FlatUniforms,
    IntersectionUniforms, ProgramUniforms, SliceUniforms, ViewSize,
};

const VERTEX_SHADER: &str = include_str!("shaders/vertex.wgsl");

/// Fixed description of a program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDescriptor {
    /// Program identity.
    pub kind: ProgramKind,
    /// WGSL fragment stage, compiled after the shared vertex stage.
    pub fragment_source: &'static str,
    /// Color blending, `None` to replace.
    pub blend: Option<wgpu::BlendState>,
    /// Whether fragments write depth.
    pub depth_write: bool,
    /// Depth comparison.
    pub depth_compare: wgpu::CompareFunction,
    /// Number of sampled textures.
    pub texture_count: usize,
}

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

impl ProgramDescriptor {
    /// Descriptor of `kind`.
    #[must_use]
    pub const fn of(kind: ProgramKind) -> Self {
        let (fragment_source, blend, depth_write, depth_compare, texture_count) = match kind {
            ProgramKind::Flat => (
                include_str!("shaders/flat.wgsl"),
                None,
                false,
                wgpu::CompareFunction::Always,
                0,
            ),
            ProgramKind::Depth => (
                include_str!("shaders/depth.wgsl"),
                None,
                true,
                wgpu::CompareFunction::Less,
                0,
            ),
            ProgramKind::Intersection => (
                include_str!("shaders/intersection.wgsl"),
                Some(ADDITIVE),
                false,
                wgpu::CompareFunction::Always,
                0,
            ),
            ProgramKind::Slice => (
                include_str!("shaders/slice.wgsl"),
                None,
                true,
                wgpu::CompareFunction::Less,
                1,
            ),
            ProgramKind::ErodeDilate => (
                include_str!("shaders/erode_dilate.wgsl"),
                None,
                false,
                wgpu::CompareFunction::Always,
                1,
            ),
            ProgramKind::Copy => (
                include_str!("shaders/copy.wgsl"),
                None,
                false,
                wgpu::CompareFunction::Always,
                1,
            ),
            ProgramKind::BoolCombine => (
                include_str!("shaders/bool_op.wgsl"),
                Some(ADDITIVE),
                false,
                wgpu::CompareFunction::Always,
                2,
            ),
        };
        Self {
            kind,
            fragment_source,
            blend,
            depth_write,
            depth_compare,
            texture_count,
        }
    }

    /// Full WGSL source: shared vertex stage then the fragment stage.
    #[must_use]
    pub fn shader_source(&self) -> String {
        format!("{VERTEX_SHADER}\n{}", self.fragment_source)
    }
}

/// Vertex layout shared by scene geometry and the background quad.
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

/// Bind group layout of the camera uniform (group 0).
#[must_use]
pub fn camera_bind_group_layout(ctx: &GpuContext) -> wgpu::BindGroupLayout {
    ctx.device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
}

/// A compiled program with its own uniform buffer and typed uniforms.
#[derive(Debug)]
pub struct Material<U: ProgramUniforms> {
    /// Current uniform values, uploaded at bind time.
    pub uniforms: U,
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

impl<U: ProgramUniforms> Material<U> {
    /// Compile the program for `U`.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ShaderCompilation`] if the shader or pipeline
    /// fails validation.
    pub fn new(
        ctx: &GpuContext,
        camera_layout: &wgpu::BindGroupLayout,
        uniforms: U,
    ) -> GpuResult<Self> {
        let descriptor = ProgramDescriptor::of(U::KIND);
        let label = U::KIND.label();
        debug!(program = label, "creating render pipeline");

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(descriptor.shader_source().into()),
            });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        for binding in 1..=descriptor.texture_count {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: binding_index(binding),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label}_bind_group_layout")),
                entries: &entries,
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{label}_pipeline_layout")),
                bind_group_layouts: &[camera_layout, &layout],
                push_constant_ranges: &[],
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{label}_pipeline")),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: descriptor.depth_write,
                    depth_compare: descriptor.depth_compare,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: descriptor.blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(GpuError::ShaderCompilation(format!("{label}: {err}")));
        }

        let uniform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}_uniforms")),
            size: std::mem::size_of::<U::Gpu>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            uniforms,
            pipeline,
            layout,
            uniform_buffer,
        })
    }

    /// Upload the current uniforms and resolve sampled targets by key.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::Execution`] if the uniforms name a different
    /// number of textures than the program samples.
    pub fn bind(
        &self,
        ctx: &GpuContext,
        targets: &RenderTargets<GpuTarget>,
    ) -> GpuResult<wgpu::BindGroup> {
        let sources = self.uniforms.sources();
        let expected = ProgramDescriptor::of(U::KIND).texture_count;
        if sources.len() != expected {
            return Err(GpuError::Execution(format!(
                "{} samples {expected} textures, {} bound",
                U::KIND,
                sources.len()
            )));
        }

        ctx.queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.uniforms.to_gpu()),
        );

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        }];
        for (i, key) in sources.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: binding_index(i + 1),
                resource: wgpu::BindingResource::TextureView(&targets.get(*key).view),
            });
        }

        Ok(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}_bind_group", U::KIND.label())),
            layout: &self.layout,
            entries: &entries,
        }))
    }

    /// Compiled pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

#[allow(clippy::cast_possible_truncation)]
// At most two textures per program.
const fn binding_index(i: usize) -> u32 {
    i as u32
}

/// Every program, compiled for one engine.
#[derive(Debug)]
pub struct Materials {
    /// White silhouette.
    pub flat: Material<FlatUniforms>,
    /// Packed depth.
    pub depth: Material<DepthUniforms>,
    /// Face parity.
    pub intersection: Material<IntersectionUniforms>,
    /// Slice mask.
    pub slice: Material<SliceUniforms>,
    /// Morphology.
    pub erode_dilate: Material<ErodeDilateUniforms>,
    /// Blit.
    pub copy: Material<CopyUniforms>,
    /// Boolean combine.
    pub bool_combine: Material<BoolUniforms>,
}

/// A bound program ready to draw.
#[derive(Debug)]
pub struct BoundProgram<'m> {
    /// Pipeline to set.
    pub pipeline: &'m wgpu::RenderPipeline,
    /// Group 1 bind group.
    pub bind_group: wgpu::BindGroup,
    /// Targets read by the pass.
    pub sources: Vec<TargetKey>,
}

impl Materials {
    /// Compile every program.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ShaderCompilation`] if any program fails.
    pub fn new(ctx: &GpuContext, camera_layout: &wgpu::BindGroupLayout) -> GpuResult<Self> {
        let start = Instant::now();
        let materials = Self {
            flat: Material::new(ctx, camera_layout, FlatUniforms::default())?,
            depth: Material::new(ctx, camera_layout, DepthUniforms::default())?,
            intersection: Material::new(ctx, camera_layout, IntersectionUniforms::default())?,
            slice: Material::new(ctx, camera_layout, SliceUniforms::default())?,
            erode_dilate: Material::new(ctx, camera_layout, ErodeDilateUniforms::default())?,
            copy: Material::new(ctx, camera_layout, CopyUniforms::default())?,
            bool_combine: Material::new(ctx, camera_layout, BoolUniforms::default())?,
        };
        info!(
            programs = ProgramKind::ALL.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "slicer programs compiled"
        );
        Ok(materials)
    }

    /// Push a new raster size into every program that reads texels.
    pub fn set_view(&mut self, view: ViewSize) {
        self.flat.uniforms.set_view(view);
        self.depth.uniforms.set_view(view);
        self.intersection.uniforms.set_view(view);
        self.slice.uniforms.set_view(view);
        self.erode_dilate.uniforms.set_view(view);
        self.copy.uniforms.set_view(view);
        self.bool_combine.uniforms.set_view(view);
    }

    /// Bind the program `kind` with its current uniforms.
    ///
    /// # Errors
    ///
    /// See [`Material::bind`].
    pub fn bind(
        &self,
        kind: ProgramKind,
        ctx: &GpuContext,
        targets: &RenderTargets<GpuTarget>,
    ) -> GpuResult<BoundProgram<'_>> {
        fn bound<'m, U: ProgramUniforms>(
            material: &'m Material<U>,
            ctx: &GpuContext,
            targets: &RenderTargets<GpuTarget>,
        ) -> GpuResult<BoundProgram<'m>> {
            Ok(BoundProgram {
                pipeline: material.pipeline(),
                bind_group: material.bind(ctx, targets)?,
                sources: material.uniforms.sources(),
            })
        }

        match kind {
            ProgramKind::Flat => bound(&self.flat, ctx, targets),
            ProgramKind::Depth => bound(&self.depth, ctx, targets),
            ProgramKind::Intersection => bound(&self.intersection, ctx, targets),
            ProgramKind::Slice => bound(&self.slice, ctx, targets),
            ProgramKind::ErodeDilate => bound(&self.erode_dilate, ctx, targets),
            ProgramKind::Copy => bound(&self.copy, ctx, targets),
            ProgramKind::BoolCombine => bound(&self.bool_combine, ctx, targets),
        }
    }
}
