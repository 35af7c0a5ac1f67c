use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use workshop_camera::{Camera, CameraError};
use workshop_render::DebugDraw;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct LineVertex {
    position: [f32; 2],
    color: [f32; 4],
}

/// Flatten debug lines into a line-list vertex stream.
fn line_vertices(draw: &DebugDraw) -> Vec<LineVertex> {
    let mut verts = Vec::with_capacity(draw.len() * 2);
    for line in draw.lines() {
        verts.push(LineVertex {
            position: line.a.to_array(),
            color: line.color,
        });
        verts.push(LineVertex {
            position: line.b.to_array(),
            color: line.color,
        });
    }
    verts
}

/// wgpu-based debug-draw renderer.
pub struct WgpuRenderer {
    line_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: u64,
}

impl WgpuRenderer {
    const INITIAL_VERTEX_CAPACITY: u64 = 4096;
    const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("line_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::LINE_SHADER.into()),
        });

        let line_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("line_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &line_shader,
                entry_point: Some("vs_line"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x2,
                        1 => Float32x4,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &line_shader,
                entry_point: Some("fs_line"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let vertex_capacity = Self::INITIAL_VERTEX_CAPACITY;
        let vertex_buffer = Self::create_vertex_buffer(device, vertex_capacity);

        Self {
            line_pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer,
            vertex_capacity,
        }
    }

    /// Clear the target and draw `draw` as seen through `camera`.
    ///
    /// With a degenerate camera the target is only cleared and the error is
    /// returned so the caller can skip the rest of the frame's view work.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        camera: &Camera,
        draw: &DebugDraw,
    ) -> Result<(), CameraError> {
        let projection = camera.projection_matrix(0.0);
        let vertices = match projection {
            Ok(vp) => {
                queue.write_buffer(
                    &self.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&Uniforms {
                        view_proj: vp.to_cols_array_2d(),
                    }),
                );
                line_vertices(draw)
            }
            Err(_) => Vec::new(),
        };

        if !vertices.is_empty() {
            self.ensure_capacity(device, vertices.len() as u64);
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(Self::CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            if !vertices.is_empty() {
                pass.set_pipeline(&self.line_pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                pass.draw(0..vertices.len() as u32, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        projection.map(|_| ())
    }

    fn ensure_capacity(&mut self, device: &wgpu::Device, needed: u64) {
        if needed <= self.vertex_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        tracing::debug!(
            old = self.vertex_capacity,
            new = capacity,
            "growing line vertex buffer"
        );
        self.vertex_buffer = Self::create_vertex_buffer(device, capacity);
        self.vertex_capacity = capacity;
    }

    fn create_vertex_buffer(device: &wgpu::Device, capacity: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("line_vertex_buffer"),
            size: capacity * std::mem::size_of::<LineVertex>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn two_vertices_per_line() {
        let mut draw = DebugDraw::new();
        draw.segment(Vec2::ZERO, Vec2::new(1.0, 2.0), DebugDraw::AWAKE);
        draw.segment(Vec2::ONE, Vec2::new(-3.0, 0.5), DebugDraw::STATIC);
        let verts = line_vertices(&draw);
        assert_eq!(verts.len(), 4);
        assert_eq!(verts[1].position, [1.0, 2.0]);
        assert_eq!(verts[2].color, DebugDraw::STATIC);
    }

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<LineVertex>(), 24);
    }
}
