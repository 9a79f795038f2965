//! Translation of GL-style program and vertex array state into wgpu objects.

use std::num::NonZeroU64;

use crate::renderer::backend::state::VertexBinding;
use crate::renderer::backend::ScalarType;
use crate::renderer::shader::compile::{LinkedProgram, UniformDecl};

/// Minimum uniform buffer size; also the rounding granularity.
const UNIFORM_ALIGN: u64 = 16;

/// wgpu format for one attribute slot.
pub(crate) fn vertex_format(scalar: ScalarType, components: u32) -> Option<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;

    match (scalar, components) {
        (ScalarType::Float32, 1) => Some(F::Float32),
        (ScalarType::Float32, 2) => Some(F::Float32x2),
        (ScalarType::Float32, 3) => Some(F::Float32x3),
        (ScalarType::Float32, 4) => Some(F::Float32x4),
        (ScalarType::Int32, 1) => Some(F::Sint32),
        (ScalarType::Int32, 2) => Some(F::Sint32x2),
        (ScalarType::Int32, 3) => Some(F::Sint32x3),
        (ScalarType::Int32, 4) => Some(F::Sint32x4),
        _ => None,
    }
}

/// Uniform buffer size for `decl`: at least 16 bytes, rounded up to 16.
pub(crate) fn uniform_buffer_size(decl: &UniformDecl) -> u64 {
    decl.ty.buffer_size().div_ceil(UNIFORM_ALIGN).max(1) * UNIFORM_ALIGN
}

/// Owned vertex buffer layouts for one pipeline.
pub(crate) struct VertexLayouts {
    strides: Vec<u64>,
    attributes: Vec<Vec<wgpu::VertexAttribute>>,
}

impl VertexLayouts {
    pub fn new(bindings: &[VertexBinding]) -> Result<Self, String> {
        let mut strides = Vec::with_capacity(bindings.len());
        let mut attributes = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let mut attrs = Vec::with_capacity(binding.attributes.len());
            for attr in &binding.attributes {
                let format = vertex_format(attr.scalar, attr.components).ok_or_else(|| {
                    format!(
                        "attribute slot {} has no vertex format for {} x {:?}",
                        attr.slot, attr.components, attr.scalar
                    )
                })?;
                attrs.push(wgpu::VertexAttribute {
                    format,
                    offset: attr.offset as u64,
                    shader_location: attr.slot,
                });
            }
            strides.push(binding.stride as u64);
            attributes.push(attrs);
        }

        Ok(Self {
            strides,
            attributes,
        })
    }

    pub fn layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.strides
            .iter()
            .zip(&self.attributes)
            .map(|(stride, attrs)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect()
    }
}

/// GPU objects owned by one linked program.
pub(crate) struct ProgramResources {
    pub vertex_module: wgpu::ShaderModule,
    pub vertex_entry: String,
    pub fragment_module: wgpu::ShaderModule,
    pub fragment_entry: String,
    pub pipeline_layout: wgpu::PipelineLayout,
    /// One per `LinkedProgram::uniforms` entry.
    pub uniform_buffers: Vec<wgpu::Buffer>,
    /// Indexed by group number; gaps get an empty group.
    pub bind_groups: Vec<wgpu::BindGroup>,
}

impl ProgramResources {
    pub fn new(device: &wgpu::Device, linked: &LinkedProgram) -> Self {
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orrery vertex stage"),
            source: wgpu::ShaderSource::Wgsl(linked.vertex.source.as_str().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("orrery fragment stage"),
            source: wgpu::ShaderSource::Wgsl(linked.fragment.source.as_str().into()),
        });

        let uniform_buffers: Vec<wgpu::Buffer> = linked
            .uniforms
            .iter()
            .map(|decl| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(decl.name.as_str()),
                    size: uniform_buffer_size(decl),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let group_count = linked
            .uniforms
            .iter()
            .map(|u| u.group + 1)
            .max()
            .unwrap_or(0);

        let mut layouts = Vec::with_capacity(group_count as usize);
        let mut bind_groups = Vec::with_capacity(group_count as usize);

        for group in 0..group_count {
            let members: Vec<usize> = (0..linked.uniforms.len())
                .filter(|&i| linked.uniforms[i].group == group)
                .collect();

            let entries: Vec<wgpu::BindGroupLayoutEntry> = members
                .iter()
                .map(|&i| {
                    let decl = &linked.uniforms[i];
                    wgpu::BindGroupLayoutEntry {
                        binding: decl.binding,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: NonZeroU64::new(uniform_buffer_size(decl)),
                        },
                        count: None,
                    }
                })
                .collect();

            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("orrery uniform bgl"),
                entries: &entries,
            });

            let bind_entries: Vec<wgpu::BindGroupEntry> = members
                .iter()
                .map(|&i| wgpu::BindGroupEntry {
                    binding: linked.uniforms[i].binding,
                    resource: uniform_buffers[i].as_entire_binding(),
                })
                .collect();

            bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("orrery uniform bind group"),
                layout: &layout,
                entries: &bind_entries,
            }));
            layouts.push(layout);
        }

        let layout_refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("orrery pipeline layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        Self {
            vertex_module,
            vertex_entry: linked.vertex.entry_point.clone(),
            fragment_module,
            fragment_entry: linked.fragment.entry_point.clone(),
            pipeline_layout,
            uniform_buffers,
            bind_groups,
        }
    }

    pub fn create_pipeline(
        &self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        vertex: &VertexLayouts,
    ) -> wgpu::RenderPipeline {
        let buffers = vertex.layouts();
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("orrery pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.vertex_module,
                entry_point: Some(self.vertex_entry.as_str()),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.fragment_module,
                entry_point: Some(self.fragment_entry.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::VertexAttribute;
    use crate::renderer::backend::BufferId;
    use crate::renderer::shader::UniformType;

    fn decl(ty: UniformType) -> UniformDecl {
        UniformDecl {
            name: "u".to_owned(),
            ty,
            group: 0,
            binding: 0,
        }
    }

    #[test]
    fn formats_cover_every_component_count() {
        assert_eq!(vertex_format(ScalarType::Float32, 3), Some(wgpu::VertexFormat::Float32x3));
        assert_eq!(vertex_format(ScalarType::Int32, 1), Some(wgpu::VertexFormat::Sint32));
        assert_eq!(vertex_format(ScalarType::Float32, 5), None);
    }

    #[test]
    fn uniform_buffers_are_padded_to_sixteen() {
        assert_eq!(uniform_buffer_size(&decl(UniformType::Float)), 16);
        assert_eq!(uniform_buffer_size(&decl(UniformType::Float3)), 16);
        assert_eq!(uniform_buffer_size(&decl(UniformType::Mat3)), 48);
        assert_eq!(uniform_buffer_size(&decl(UniformType::Mat4)), 64);
    }

    #[test]
    fn layouts_follow_bindings() {
        let attr = |slot, offset| VertexAttribute {
            slot,
            scalar: ScalarType::Float32,
            components: 4,
            normalized: false,
            stride: 28,
            offset,
        };
        let bindings = [VertexBinding {
            buffer: BufferId(1),
            stride: 28,
            attributes: vec![attr(0, 0), attr(1, 12)],
        }];
        let layouts = VertexLayouts::new(&bindings).unwrap();
        let built = layouts.layouts();
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].array_stride, 28);
        assert_eq!(built[0].attributes[1].shader_location, 1);
        assert_eq!(built[0].attributes[1].offset, 12);
    }
}
