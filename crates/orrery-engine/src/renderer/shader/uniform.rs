use std::fmt;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

/// Declared type of a shader uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformType {
    Int,
    Float,
    Float2,
    Float3,
    Float4,
    Mat3,
    Mat4,
}

impl UniformType {
    /// Byte size in a uniform buffer, including column padding.
    pub fn buffer_size(self) -> u64 {
        match self {
            UniformType::Int | UniformType::Float => 4,
            UniformType::Float2 => 8,
            UniformType::Float3 => 12,
            UniformType::Float4 => 16,
            UniformType::Mat3 => 48,
            UniformType::Mat4 => 64,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UniformType::Int => "i32",
            UniformType::Float => "f32",
            UniformType::Float2 => "vec2<f32>",
            UniformType::Float3 => "vec3<f32>",
            UniformType::Float4 => "vec4<f32>",
            UniformType::Mat3 => "mat3x3<f32>",
            UniformType::Mat4 => "mat4x4<f32>",
        };
        f.write_str(s)
    }
}

/// A value uploaded to a uniform. Matrices are column-major.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Float2(_) => UniformType::Float2,
            UniformValue::Float3(_) => UniformType::Float3,
            UniformValue::Float4(_) => UniformType::Float4,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Bytes in uniform-buffer layout. `mat3x3` columns are padded to 16 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            UniformValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float2(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float3(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Float4(v) => bytemuck::bytes_of(v).to_vec(),
            UniformValue::Mat3(m) => {
                let cols = [m.x_axis.extend(0.0), m.y_axis.extend(0.0), m.z_axis.extend(0.0)];
                bytemuck::cast_slice(&cols).to_vec()
            }
            UniformValue::Mat4(m) => bytemuck::bytes_of(m).to_vec(),
        }
    }
}
