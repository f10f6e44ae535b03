// Copyright (c) 2021, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Canonical tables for shader input definitions. Items are stored in flat
//! vectors and cross-reference each other through 32-bit indices, so the
//! tree stays free of reference cycles and serializes as-is.

use std::{collections::BTreeMap, path::PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaderStage
{
    Vertex,
    Geometry,
    Pixel,
    Compute,
    RayTracing
}

impl ShaderStage
{
    pub fn from_keyword(name: &str) -> Option<ShaderStage>
    {
        match name {
            "vertex" => Some(ShaderStage::Vertex),
            "geometry" => Some(ShaderStage::Geometry),
            "fragment" | "pixel" => Some(ShaderStage::Pixel),
            "compute" => Some(ShaderStage::Compute),
            "rt" | "raytracing" => Some(ShaderStage::RayTracing),
            _ => None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicType
{
    pub hlsl_type: String
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructInstance
{
    pub struct_index: u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInstance
{
    pub group_index: u32
}

/// Element type of a (RW)StructuredBuffer. Restricted to basic types and
/// struct instances once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuredType
{
    Basic(BasicType),
    Struct(StructInstance),
    Unresolved(String)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType
{
    /// Type reference by name, replaced during AST construction.
    Unresolved(String),
    Basic(BasicType),
    Struct(StructInstance),
    Group(GroupInstance),
    Texture2D(String),
    RwTexture2D(String),
    ByteAddressBuffer,
    RwByteAddressBuffer,
    StructuredBuffer(StructuredType),
    RwStructuredBuffer(StructuredType),
    RaytracingAccelerationStructure,
    /// Synthetic marker for the constant buffer slot injected into shader
    /// input groups that declare basic/struct constants.
    ConstantBuffer
}

impl VariableType
{
    /// Basic/struct values end up in the injected constant buffer instead of
    /// consuming their own descriptor.
    pub fn is_standard_constant(&self) -> bool
    {
        matches!(self, VariableType::Basic(_) | VariableType::Struct(_))
    }

    pub fn is_group_instance(&self) -> bool
    {
        matches!(self, VariableType::Group(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable
{
    pub name: String,
    pub vtype: VariableType,
    /// 0 = scalar, otherwise the fixed element count, or [`Variable::UNBOUNDED`]
    /// for a runtime-sized array.
    pub array_count: u32
}

impl Variable
{
    pub const UNBOUNDED: u32 = u32::MAX;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Struct
{
    pub name: String,
    pub variables: Vec<Variable>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group
{
    pub name: String,
    pub variables: Vec<Variable>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindPoint
{
    pub name: String,
    /// Indices of the shader input groups targeting this bind point, in
    /// declaration order.
    pub shader_input_groups: Vec<u32>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderInputGroup
{
    pub name: String,
    pub bind_point_name: String,
    pub bind_point_index: u32,
    pub variables: Vec<Variable>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindPointReference
{
    /// Name local to the containing layout.
    pub name: String,
    pub bind_point_name: String,
    pub bind_point_index: u32,
    pub shader_stages: Vec<ShaderStage>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConstant
{
    pub name: String,
    pub shader_stages: Vec<ShaderStage>,
    pub num_32bit_values: u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConstantBufferView
{
    pub name: String,
    pub shader_stages: Vec<ShaderStage>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSampler
{
    pub name: String,
    pub options: BTreeMap<String, String>
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderInputLayoutOptions
{
    pub local_root_signature: bool
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderInputLayout
{
    pub name: String,
    pub options: ShaderInputLayoutOptions,
    pub bind_points: Vec<BindPointReference>,
    pub root_constants: Vec<RootConstant>,
    pub root_constant_buffer_views: Vec<RootConstantBufferView>,
    pub static_samplers: Vec<StaticSampler>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constant
{
    pub name: String,
    pub value: i64
}

/// Per-item output information inherited from the file the item was parsed
/// from. `should_export` is only true for items of the root input file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata
{
    pub should_export: bool,
    pub cpp_folder: PathBuf,
    pub shader_folder: PathBuf
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithMetadata<T>
{
    pub metadata: Metadata,
    pub item: T
}

impl<T> WithMetadata<T>
{
    pub fn new(metadata: Metadata, item: T) -> WithMetadata<T>
    {
        WithMetadata { metadata, item }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractSyntaxTree
{
    pub bind_points: Vec<WithMetadata<BindPoint>>,
    pub shader_input_layouts: Vec<WithMetadata<ShaderInputLayout>>,
    pub structs: Vec<WithMetadata<Struct>>,
    pub groups: Vec<WithMetadata<Group>>,
    pub shader_input_groups: Vec<WithMetadata<ShaderInputGroup>>,
    pub constants: Vec<WithMetadata<Constant>>
}
