//! The slicing engine: multi-pass rendering of one layer mask.
//!
//! Every layer starts with a dirty check against the output size, then takes
//! one of two paths:
//!
//! - at or below the raft thickness, the silhouette of every object is
//!   dilated by the raft outset;
//! - above it, a face-parity pass and a slice pass produce the solid mask,
//!   optionally hollowed to a shell.
//!
//! The scene's visibility and override program are changed while rendering
//! and restored before returning, also when a pass fails.

use std::time::Instant;

use print_scene::{ProgramKind, Scene};
use tracing::{debug, info};

use crate::buffers::{GeometryBuffers, SceneGeometry, background_quad};
use crate::camera::{CameraUniform, OrthoCamera, fit_frustum, slice_cutoff};
use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};
use crate::geometry::{PixelGeometry, pass_radii};
use crate::materials::{Materials, camera_bind_group_layout};
use crate::readback::{DepthMap, SliceImage, read_target};
use crate::targets::{GpuTarget, RenderTargets, TargetKey};
use crate::uniforms::{BoolOp, ViewSize};

/// Where a pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dest {
    Target(TargetKey),
    Output,
}

/// Renders slice masks of a borrowed [`Scene`].
///
/// # Example
///
/// ```no_run
/// use nalgebra::Vector3;
/// use print_gpu::SlicingEngine;
/// use print_scene::{PrintObject, PrintVolume, Scene, TriangleMesh};
///
/// let mut scene = Scene::new(PrintVolume::new(36.0, 24.0, 50.0)?);
/// scene.add_object(
///     PrintObject::new("ball", TriangleMesh::uv_sphere(10.0, 64, 32)).at(Vector3::new(0.0, 0.0, 20.0)),
/// );
///
/// let mut engine = SlicingEngine::new(&scene, 0.1, 0.1, 1.5, 1.0, 0.0)?;
/// engine.set_size(360, 240)?;
/// let png = engine.slice_at_to_image(25.0)?;
/// assert!(!png.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SlicingEngine<'a> {
    ctx: &'static GpuContext,
    scene: &'a Scene,
    raft_thickness_mm: f64,
    raft_outset_mm: f64,
    shell_inset_mm: f64,
    z_shell: bool,
    lattice: bool,
    geometry: PixelGeometry,
    last_size: Option<(u32, u32)>,
    output: GpuTarget,
    targets: Option<RenderTargets<GpuTarget>>,
    half_extents: (f64, f64),
    slice_camera: OrthoCamera,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    materials: Materials,
    scene_buffers: Option<GeometryBuffers>,
    quad: GeometryBuffers,
}

impl<'a> SlicingEngine<'a> {
    /// Create an engine for `scene`.
    ///
    /// `pixel_width_mm` and `pixel_height_mm` are nominal; they are
    /// recomputed from the output size on the first render. A non-positive
    /// `shell_inset_mm` disables shelling.
    ///
    /// The engine starts with a 1x1 output; call
    /// [`SlicingEngine::set_size`] before slicing.
    ///
    /// # Errors
    ///
    /// [`GpuError::NotAvailable`] without a GPU,
    /// [`GpuError::ShaderCompilation`] if a program fails to build.
    pub fn new(
        scene: &'a Scene,
        pixel_width_mm: f64,
        pixel_height_mm: f64,
        raft_thickness_mm: f64,
        raft_outset_mm: f64,
        shell_inset_mm: f64,
    ) -> GpuResult<Self> {
        let start = Instant::now();
        let ctx = GpuContext::try_get()?;

        let camera_layout = camera_bind_group_layout(ctx);
        let camera_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_uniforms"),
            size: std::mem::size_of::<CameraUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let materials = Materials::new(ctx, &camera_layout)?;
        let scene_geometry = SceneGeometry::collect(scene)?;
        let scene_buffers = scene_geometry.upload(ctx, "scene")?;
        let quad = background_quad()
            .upload(ctx, "background")?
            .ok_or_else(|| GpuError::Execution("background quad is empty".into()))?;
        let output = GpuTarget::new(ctx, "output", 1, 1)?;

        let volume = scene.volume();
        let half_extents = fit_frustum(volume.width(), volume.depth(), 1, 1);
        let slice_camera = OrthoCamera::slice(half_extents.0, half_extents.1, volume.height());

        info!(
            objects = scene.objects().len(),
            triangles = scene_geometry.triangle_count(),
            raft_thickness_mm,
            raft_outset_mm,
            shell_inset_mm,
            elapsed_ms = start.elapsed().as_millis(),
            "slicing engine created"
        );

        Ok(Self {
            ctx,
            scene,
            raft_thickness_mm,
            raft_outset_mm,
            shell_inset_mm,
            z_shell: false,
            lattice: false,
            geometry: PixelGeometry::nominal(pixel_width_mm, pixel_height_mm),
            last_size: None,
            output,
            targets: None,
            half_extents,
            slice_camera,
            camera_buffer,
            camera_bind_group,
            materials,
            scene_buffers,
            quad,
        })
    }

    /// Also shell surfaces facing up or down, by rendering a band of
    /// `shell_inset_mm` above and below each slice.
    #[must_use]
    pub fn with_z_shell(mut self, enabled: bool) -> Self {
        self.z_shell = enabled;
        self
    }

    /// Draw the grey lattice overlay inside solids. Preview only.
    #[must_use]
    pub fn with_lattice(mut self, enabled: bool) -> Self {
        self.lattice = enabled;
        self
    }

    /// Resize the output raster. A no-op when the size is unchanged.
    ///
    /// # Errors
    ///
    /// [`GpuError::InvalidSize`] for zero or over-limit sizes.
    pub fn set_size(&mut self, width: u32, height: u32) -> GpuResult<()> {
        if self.output_size() == (width, height) {
            return Ok(());
        }
        self.output = GpuTarget::new(self.ctx, "output", width, height)?;
        debug!(width, height, "output resized");
        Ok(())
    }

    /// Current output raster size.
    #[must_use]
    pub const fn output_size(&self) -> (u32, u32) {
        (self.output.width, self.output.height)
    }

    /// Size of the working targets, `None` before the first render.
    #[must_use]
    pub fn target_size(&self) -> Option<(u32, u32)> {
        self.targets.as_ref().map(RenderTargets::size)
    }

    /// Raft thickness in mm.
    #[must_use]
    pub const fn raft_thickness_mm(&self) -> f64 {
        self.raft_thickness_mm
    }

    /// Pixel pitch along X in mm.
    #[must_use]
    pub const fn pixel_width_mm(&self) -> f64 {
        self.geometry.pixel_width_mm
    }

    /// Pixel pitch along Y in mm.
    #[must_use]
    pub const fn pixel_height_mm(&self) -> f64 {
        self.geometry.pixel_height_mm
    }

    /// Raft dilation radius at the current resolution.
    #[must_use]
    pub const fn raft_dilate_pixels(&self) -> u32 {
        self.geometry.raft_dilate_px
    }

    /// Shell erosion radius at the current resolution.
    #[must_use]
    pub const fn shell_erode_pixels(&self) -> u32 {
        self.geometry.shell_erode_px
    }

    /// Render the layer at height `z` mm into the output target.
    ///
    /// # Errors
    ///
    /// Any GPU failure. The scene flags are restored either way.
    pub fn slice_at(&mut self, z: f64) -> GpuResult<()> {
        let start = Instant::now();
        with_slicing_state(self.scene, || {
            self.prepare_render()?;
            if z <= self.raft_thickness_mm {
                self.render_raft_slice()
            } else {
                self.render_slice(z)
            }
        })?;

        debug!(z, elapsed_us = start.elapsed().as_micros(), "layer rendered");
        Ok(())
    }

    /// Render the layer at `z` and read it back.
    ///
    /// # Errors
    ///
    /// See [`SlicingEngine::slice_at`]; also [`GpuError::BufferMapping`].
    pub fn slice_at_to_mask(&mut self, z: f64) -> GpuResult<SliceImage> {
        self.slice_at(z)?;
        let rgba = read_target(self.ctx, &self.output)?;
        Ok(SliceImage::from_rgba(self.output.width, self.output.height, &rgba))
    }

    /// Render the layer at `z` and encode it as PNG.
    ///
    /// # Errors
    ///
    /// See [`SlicingEngine::slice_at_to_mask`]; also
    /// [`GpuError::ImageEncode`].
    pub fn slice_at_to_image(&mut self, z: f64) -> GpuResult<Vec<u8>> {
        self.slice_at_to_mask(z)?.to_png()
    }

    /// Render the top surface height of every pixel.
    ///
    /// # Errors
    ///
    /// Any GPU failure. The scene flags are restored either way.
    pub fn render_depth_map(&mut self) -> GpuResult<DepthMap> {
        let scene = self.scene;
        let rgba = with_slicing_state(scene, || {
            self.prepare_render()?;
            scene.show_print_objects();
            scene.set_override_program(Some(ProgramKind::Depth));
            self.run_pass(Dest::Output, &self.slice_camera, wgpu::Color::WHITE)?;
            read_target(self.ctx, &self.output)
        })?;

        Ok(DepthMap::decode(
            self.output.width,
            self.output.height,
            &rgba,
            f64::from(self.materials.depth.uniforms.to_fixed),
            scene.volume().height(),
        ))
    }

    fn prepare_render(&mut self) -> GpuResult<()> {
        let size = self.output_size();
        if self.last_size == Some(size) && self.targets.is_some() {
            return Ok(());
        }
        let (width, height) = size;
        let volume = self.scene.volume();

        self.geometry = PixelGeometry::derive(
            volume.width(),
            volume.depth(),
            width,
            height,
            self.raft_outset_mm,
            self.shell_inset_mm,
        );

        // Release the old set before allocating the new one.
        self.targets = None;
        self.targets = Some(GpuTarget::allocate_set(self.ctx, width, height)?);

        self.half_extents = fit_frustum(volume.width(), volume.depth(), width, height);
        self.slice_camera =
            OrthoCamera::slice(self.half_extents.0, self.half_extents.1, volume.height());
        self.materials.set_view(ViewSize::new(width, height));
        self.last_size = Some(size);

        info!(
            width,
            height,
            pixel_width_mm = self.geometry.pixel_width_mm,
            pixel_height_mm = self.geometry.pixel_height_mm,
            raft_dilate_px = self.geometry.raft_dilate_px,
            shell_erode_px = self.geometry.shell_erode_px,
            "slicer resolution changed"
        );
        Ok(())
    }

    fn render_raft_slice(&mut self) -> GpuResult<()> {
        let scene = self.scene;
        scene.show_print_objects();
        scene.set_override_program(Some(ProgramKind::Flat));
        self.materials.flat.uniforms.facing_only = false;
        self.run_pass(
            Dest::Target(TargetKey::Temp1),
            &self.slice_camera,
            wgpu::Color::BLACK,
        )?;

        let pixels = self.geometry.raft_dilate_px;
        if pixels > 0 {
            self.erode_or_dilate(TargetKey::Temp1, pixels, true)?;
        }
        self.copy_to(TargetKey::Temp1, Dest::Output)
    }

    fn render_slice(&mut self, z: f64) -> GpuResult<()> {
        let scene = self.scene;
        #[allow(clippy::cast_possible_truncation)]
        let cutoff = slice_cutoff(z, scene.volume().height()) as f32;

        scene.show_print_objects();
        scene.set_override_program(Some(ProgramKind::Intersection));
        self.materials.intersection.uniforms.cutoff = cutoff;
        self.run_pass(
            Dest::Target(TargetKey::Scratch),
            &self.slice_camera,
            wgpu::Color::TRANSPARENT,
        )?;

        scene.set_override_program(Some(ProgramKind::Slice));
        let slice = &mut self.materials.slice.uniforms;
        slice.cutoff = cutoff;
        slice.parity = TargetKey::Scratch;
        slice.lattice = self.lattice;
        self.run_pass(
            Dest::Target(TargetKey::Mask),
            &self.slice_camera,
            wgpu::Color::BLACK,
        )?;

        let last = if self.geometry.shell_erode_px > 0 {
            self.render_shell(z)?
        } else {
            TargetKey::Mask
        };
        self.copy_to(last, Dest::Output)
    }

    /// Hollow `Mask` to a shell. Returns the key holding the result.
    fn render_shell(&mut self, z: f64) -> GpuResult<TargetKey> {
        self.copy_to(TargetKey::Mask, Dest::Target(TargetKey::Temp1))?;
        self.erode_or_dilate(TargetKey::Temp1, self.geometry.shell_erode_px, false)?;
        self.combine(BoolOp::Xor, TargetKey::Mask, TargetKey::Temp1, TargetKey::Temp2)?;
        if !self.z_shell {
            return Ok(TargetKey::Temp2);
        }

        let scene = self.scene;
        let (half_width, half_height) = self.half_extents;
        let height = scene.volume().height();
        let above =
            OrthoCamera::band_from_above(half_width, half_height, height, z, self.shell_inset_mm);
        let below = OrthoCamera::band_from_below(half_width, half_height, z, self.shell_inset_mm);

        scene.show_print_objects();
        scene.set_override_program(Some(ProgramKind::Flat));
        self.materials.flat.uniforms.facing_only = true;
        self.run_pass(Dest::Target(TargetKey::Temp1), &above, wgpu::Color::BLACK)?;
        self.run_pass(Dest::Target(TargetKey::Temp3), &below, wgpu::Color::BLACK)?;

        self.combine(BoolOp::Or, TargetKey::Temp1, TargetKey::Temp3, TargetKey::Scratch)?;
        self.combine(BoolOp::And, TargetKey::Scratch, TargetKey::Mask, TargetKey::Temp1)?;
        self.combine(BoolOp::Or, TargetKey::Temp2, TargetKey::Temp1, TargetKey::Temp3)?;
        Ok(TargetKey::Temp3)
    }

    /// Filter `target` in place by `pixels`, in passes of bounded radius
    /// ping-ponged through `Scratch`.
    fn erode_or_dilate(&mut self, target: TargetKey, pixels: u32, dilate: bool) -> GpuResult<()> {
        let scene = self.scene;
        scene.hide_print_objects();
        scene.set_override_program(Some(ProgramKind::ErodeDilate));

        for radius in pass_radii(pixels) {
            let uniforms = &mut self.materials.erode_dilate.uniforms;
            uniforms.dilate = dilate;
            uniforms.pixel_radius = radius;
            uniforms.source = target;
            self.run_pass(
                Dest::Target(TargetKey::Scratch),
                &self.slice_camera,
                wgpu::Color::BLACK,
            )?;
            self.targets_mut()?.swap(target, TargetKey::Scratch);
        }
        Ok(())
    }

    fn combine(
        &mut self,
        op: BoolOp,
        first: TargetKey,
        second: TargetKey,
        dest: TargetKey,
    ) -> GpuResult<()> {
        let scene = self.scene;
        scene.hide_print_objects();
        scene.set_override_program(Some(ProgramKind::BoolCombine));
        let uniforms = &mut self.materials.bool_combine.uniforms;
        uniforms.op = op;
        uniforms.first = first;
        uniforms.second = second;
        self.run_pass(
            Dest::Target(dest),
            &self.slice_camera,
            wgpu::Color::TRANSPARENT,
        )
    }

    fn copy_to(&mut self, source: TargetKey, dest: Dest) -> GpuResult<()> {
        let scene = self.scene;
        scene.hide_print_objects();
        scene.set_override_program(Some(ProgramKind::Copy));
        self.materials.copy.uniforms.source = source;
        self.run_pass(dest, &self.slice_camera, wgpu::Color::BLACK)
    }

    fn targets(&self) -> GpuResult<&RenderTargets<GpuTarget>> {
        self.targets
            .as_ref()
            .ok_or_else(|| GpuError::Execution("render targets not allocated".into()))
    }

    fn targets_mut(&mut self) -> GpuResult<&mut RenderTargets<GpuTarget>> {
        self.targets
            .as_mut()
            .ok_or_else(|| GpuError::Execution("render targets not allocated".into()))
    }

    /// Draw the scene's current override program into `dest`.
    ///
    /// Object programs draw the scene geometry when objects are visible;
    /// image programs draw the background quad. Sampled targets are
    /// resolved by key here, never earlier.
    fn run_pass(&self, dest: Dest, camera: &OrthoCamera, clear: wgpu::Color) -> GpuResult<()> {
        let kind = self
            .scene
            .override_program()
            .ok_or_else(|| GpuError::Execution("no override program set".into()))?;
        let targets = self.targets()?;
        let bound = self.materials.bind(kind, self.ctx, targets)?;

        if let Dest::Target(key) = dest {
            if bound.sources.contains(&key) {
                return Err(GpuError::Execution(format!(
                    "{kind} pass reads and writes {}",
                    key.label()
                )));
            }
        }
        let target = match dest {
            Dest::Target(key) => targets.get(key),
            Dest::Output => &self.output,
        };

        let geometry = if kind.draws_objects() {
            if self.scene.objects_visible() {
                self.scene_buffers.as_ref()
            } else {
                None
            }
        } else {
            Some(&self.quad)
        };

        self.ctx.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(camera)),
        );

        self.ctx
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kind.label()),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(kind.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(geometry) = geometry {
                pass.set_pipeline(bound.pipeline);
                pass.set_bind_group(0, &self.camera_bind_group, &[]);
                pass.set_bind_group(1, &bound.bind_group, &[]);
                pass.set_vertex_buffer(0, geometry.vertices.slice(..));
                pass.set_index_buffer(geometry.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..geometry.index_count, 0, 0..1);
            }
        }
        self.ctx.queue.submit([encoder.finish()]);

        if let Some(err) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            return Err(GpuError::Execution(format!("{kind} pass failed: {err}")));
        }
        Ok(())
    }
}

/// Run `render` with the print volume hidden, restoring every scene flag
/// afterwards whether or not it succeeds.
fn with_slicing_state<T>(scene: &Scene, render: impl FnOnce() -> GpuResult<T>) -> GpuResult<T> {
    let _guard = scene.begin_override();
    scene.set_volume_visible(false);
    render()
}

impl std::fmt::Debug for SlicingEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlicingEngine")
            .field("output_size", &self.output_size())
            .field("raft_thickness_mm", &self.raft_thickness_mm)
            .field("raft_outset_mm", &self.raft_outset_mm)
            .field("shell_inset_mm", &self.shell_inset_mm)
            .field("z_shell", &self.z_shell)
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}
