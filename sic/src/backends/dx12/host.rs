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

//! Host side of the generated code: C++ headers that mirror the shader
//! declarations, populate descriptor tables at run time and build the root
//! signature described by each layout.

use std::path::{Path, PathBuf};

use log::warn;
use phf::phf_map;
use sil::ast::tree::{
    AbstractSyntaxTree,
    BindPoint,
    Constant,
    Group,
    Metadata,
    ShaderInputGroup,
    ShaderInputLayout,
    ShaderStage,
    Struct,
    Variable,
    VariableType,
    WithMetadata
};

use crate::backends::dx12::allocation::{
    mangled_group_variable_name,
    BindPointBindings,
    ResourceBindingInfo,
    ShaderInputGroupBindings,
    ShaderInputLayoutBindings
};
use crate::backends::dx12::register::{register_type, RegisterType};
use crate::error::Error;
use crate::strings::title;
use crate::write::{relative_path, FileUpdate};

static REGULAR_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "bool" => "uint32_t",
    "half2" => "DirectX::PackedVector::XMHALF2",
    "float" => "float",
    "float2" => "glm::vec2",
    "float3" => "glm::vec3",
    "float4" => "glm::vec4",
    "float3x3" => "glm::mat3",
    "float4x4" => "glm::mat4",
    "int" => "int32_t",
    "int32_t" => "int32_t",
    "int64_t" => "int64_t",
    "int2" => "glm::ivec2",
    "int3" => "glm::ivec3",
    "int4" => "glm::ivec4",
    "uint" => "uint32_t",
    "uint8_t" => "uint8_t",
    "uint16_t" => "uint16_t",
    "uint32_t" => "uint32_t",
    "uint64_t" => "uint64_t",
    "uint2" => "glm::uvec2",
    "uint3" => "glm::uvec3",
    "uint4" => "glm::uvec4"
};

// Some variables are stored differently inside a constant buffer (float3x3
// is stored as float3x4).
static CONSTANT_TYPES: phf::Map<&'static str, &'static str> = phf_map! {
    "bool" => "uint32_t",
    "float3x3" => "glm::mat3x4"
};

// https://learn.microsoft.com/en-us/windows/win32/direct3dhlsl/dx-graphics-hlsl-packing-rules
// Minimum element size inside a constant buffer is 4 bytes.
static CONSTANT_SIZES: phf::Map<&'static str, usize> = phf_map! {
    "bool" => 4usize,
    "half2" => 4usize,
    "float" => 4usize,
    "float2" => 8usize,
    "float3" => 12usize,
    "float4" => 16usize,
    "float3x3" => 48usize,
    "float4x4" => 64usize,
    "int" => 4usize,
    "int32_t" => 4usize,
    "int64_t" => 8usize,
    "int2" => 8usize,
    "int3" => 12usize,
    "int4" => 16usize,
    "uint" => 4usize,
    "uint8_t" => 4usize,
    "uint16_t" => 4usize,
    "uint32_t" => 4usize,
    "uint64_t" => 8usize,
    "uint2" => 8usize,
    "uint3" => 12usize,
    "uint4" => 16usize
};

static CONSTANT_ALIGNMENTS: phf::Map<&'static str, usize> = phf_map! {
    "bool" => 4usize,
    "half2" => 4usize,
    "float" => 4usize,
    "float2" => 4usize,
    "float3" => 4usize,
    "float4" => 4usize,
    "float3x3" => 16usize,
    "float4x4" => 16usize,
    "int" => 4usize,
    "int32_t" => 4usize,
    "int64_t" => 8usize,
    "int2" => 4usize,
    "int3" => 4usize,
    "int4" => 4usize,
    "uint" => 4usize,
    "uint8_t" => 4usize,
    "uint16_t" => 4usize,
    "uint32_t" => 4usize,
    "uint64_t" => 8usize,
    "uint2" => 4usize,
    "uint3" => 4usize,
    "uint4" => 4usize
};

fn regular_type_cpp(hlsl_type: &str) -> Result<&'static str, Error>
{
    REGULAR_TYPES
        .get(hlsl_type)
        .copied()
        .ok_or_else(|| Error::UnknownHostType(hlsl_type.into()))
}

fn constant_type_cpp(hlsl_type: &str) -> Result<&'static str, Error>
{
    match CONSTANT_TYPES.get(hlsl_type) {
        Some(name) => Ok(name),
        None => regular_type_cpp(hlsl_type)
    }
}

fn size_of_constant_type(hlsl_type: &str) -> Result<usize, Error>
{
    CONSTANT_SIZES
        .get(hlsl_type)
        .copied()
        .ok_or_else(|| Error::UnknownHostType(hlsl_type.into()))
}

fn alignment_of_constant_type(hlsl_type: &str) -> Result<usize, Error>
{
    CONSTANT_ALIGNMENTS
        .get(hlsl_type)
        .copied()
        .ok_or_else(|| Error::UnknownHostType(hlsl_type.into()))
}

fn constants_file_path(metadata: &Metadata) -> PathBuf
{
    metadata.cpp_folder.join("constants.h")
}

fn struct_file_path(shader_struct: &WithMetadata<Struct>) -> PathBuf
{
    shader_struct
        .metadata
        .cpp_folder
        .join("structs")
        .join(format!("{}.h", shader_struct.item.name))
}

fn group_file_path(group: &WithMetadata<Group>) -> PathBuf
{
    group.metadata.cpp_folder.join("groups").join(format!("{}.h", group.item.name))
}

fn input_group_file_path(input_group: &WithMetadata<ShaderInputGroup>) -> PathBuf
{
    input_group
        .metadata
        .cpp_folder
        .join("inputgroups")
        .join(format!("{}.h", input_group.item.name))
}

fn bind_point_file_path(bind_point: &WithMetadata<BindPoint>) -> PathBuf
{
    bind_point
        .metadata
        .cpp_folder
        .join("bindpoints")
        .join(format!("{}.h", bind_point.item.name))
}

fn layout_file_path(layout: &WithMetadata<ShaderInputLayout>) -> PathBuf
{
    layout
        .metadata
        .cpp_folder
        .join("inputlayouts")
        .join(format!("{}.h", layout.item.name))
}

fn shader_visibility(stage: ShaderStage) -> &'static str
{
    // Compute and ray tracing only expose a single stage.
    match stage {
        ShaderStage::Vertex => "D3D12_SHADER_VISIBILITY_VERTEX",
        ShaderStage::Geometry => "D3D12_SHADER_VISIBILITY_GEOMETRY",
        ShaderStage::Pixel => "D3D12_SHADER_VISIBILITY_PIXEL",
        ShaderStage::Compute => "D3D12_SHADER_VISIBILITY_ALL",
        ShaderStage::RayTracing => "D3D12_SHADER_VISIBILITY_ALL"
    }
}

/// Visibility for a root parameter used by the given stages; mixed stages
/// fall back to ALL. Also reports whether any raster stage is present.
fn visibility_for_stages(stages: &[ShaderStage]) -> (&'static str, bool)
{
    let raster = stages
        .iter()
        .any(|&stage| stage != ShaderStage::Compute && stage != ShaderStage::RayTracing);
    match stages.split_first() {
        Some((&first, rest)) if rest.iter().all(|&stage| stage == first) => (shader_visibility(first), raster),
        _ => ("D3D12_SHADER_VISIBILITY_ALL", raster)
    }
}

fn add_include(vtype: &VariableType, tree: &AbstractSyntaxTree, base_path: &Path, out: &mut String)
{
    match vtype {
        VariableType::Struct(instance) => {
            let path = struct_file_path(&tree.structs[instance.struct_index as usize]);
            out.push_str(&format!("#include \"{}\"\n", relative_path(&path, base_path)));
        },
        VariableType::Group(instance) => {
            let path = group_file_path(&tree.groups[instance.group_index as usize]);
            out.push_str(&format!("#include \"{}\"\n", relative_path(&path, base_path)));
        },
        _ => ()
    }
}

/// C++ spelling of a variable type; resources map to view descriptions.
fn type_name(vtype: &VariableType, tree: &AbstractSyntaxTree, prefer_constant: bool) -> Result<String, Error>
{
    match vtype {
        VariableType::Basic(basic) => {
            let name = if prefer_constant {
                constant_type_cpp(&basic.hlsl_type)?
            } else {
                regular_type_cpp(&basic.hlsl_type)?
            };
            Ok(name.into())
        },
        VariableType::Struct(instance) => Ok(tree.structs[instance.struct_index as usize].item.name.clone()),
        VariableType::Group(instance) => Ok(tree.groups[instance.group_index as usize].item.name.clone()),
        VariableType::Texture2D(_)
        | VariableType::ByteAddressBuffer
        | VariableType::StructuredBuffer(_)
        | VariableType::RaytracingAccelerationStructure => Ok("RenderAPI::SRVDesc".into()),
        VariableType::RwTexture2D(_) | VariableType::RwByteAddressBuffer | VariableType::RwStructuredBuffer(_) => {
            Ok("RenderAPI::UAVDesc".into())
        },
        VariableType::Unresolved(name) => Err(Error::Internal(format!("unresolved type `{}`", name))),
        VariableType::ConstantBuffer => Err(Error::Internal("constant buffer marker has no type name".into()))
    }
}

fn commit(path: PathBuf, contents: String) -> Result<(), Error>
{
    let mut file = FileUpdate::new(path);
    file.push(&contents);
    file.commit()?;
    Ok(())
}

fn generate_constants(constants: &[Constant]) -> String
{
    let mut out = String::from("#pragma once\n");
    for constant in constants {
        out.push_str(&format!("#define {} {}\n", constant.name, constant.value));
    }
    out
}

fn generate_struct(shader_struct: &Struct, tree: &AbstractSyntaxTree, file_path: &Path) -> Result<String, Error>
{
    let mut out = String::from("#pragma once\n");
    out.push_str("#include <glm/vec2.hpp>\n#include <glm/vec3.hpp>\n#include <glm/vec4.hpp>\n");
    out.push_str("#include <DirectXPackedVector.h>\n");
    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    for variable in &shader_struct.variables {
        add_include(&variable.vtype, tree, base_path, &mut out);
    }
    out.push_str("namespace ShaderInputs {\n");
    // Two renditions: one with constant-buffer friendly storage, one with
    // the regular in-memory types.
    for constant_packing in [true, false] {
        let prefix = if constant_packing { "C" } else { "" };
        out.push_str(&format!("struct {}{} {{\n", prefix, shader_struct.name));
        for variable in &shader_struct.variables {
            let member_type = match &variable.vtype {
                VariableType::Struct(instance) => {
                    format!("{}{}", prefix, tree.structs[instance.struct_index as usize].item.name)
                },
                vtype => type_name(vtype, tree, constant_packing)?
            };
            out.push_str(&format!("\t{} {}", member_type, variable.name));
            if variable.array_count != 0 {
                out.push_str(&format!("[{}]", variable.array_count));
            }
            out.push_str(";\n");
        }
        out.push_str("};\n");
    }
    out.push_str("}\n");
    Ok(out)
}

fn generate_group(group: &Group, tree: &AbstractSyntaxTree, file_path: &Path) -> Result<String, Error>
{
    let mut out = String::from("#pragma once\n");
    out.push_str("#include <glm/vec2.hpp>\n#include <glm/vec3.hpp>\n#include <glm/vec4.hpp>\n");
    out.push_str("#include \"Engine/RenderAPI/ShaderInput.h\"\n");
    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    for variable in &group.variables {
        add_include(&variable.vtype, tree, base_path, &mut out);
    }
    out.push_str("namespace ShaderInputs {\n");
    out.push_str(&format!("struct {} {{\n", group.name));
    for variable in &group.variables {
        out.push_str(&format!("\t{} {}", type_name(&variable.vtype, tree, true)?, variable.name));
        if variable.array_count != 0 {
            out.push_str(&format!("[{}]", variable.array_count));
        }
        out.push_str(";\n");
    }
    out.push_str("};\n}\n");
    Ok(out)
}

/// Emits the packed `Constants` struct member by member, inserting padding
/// so the CPU layout matches HLSL cbuffer packing: items may not straddle a
/// 16-byte boundary, arrays and structs are 16-byte aligned.
struct ConstantsPacker<'a>
{
    out: &'a mut String,
    cursor: usize
}

impl ConstantsPacker<'_>
{
    fn add_padding(&mut self, num_bytes: usize)
    {
        self.out
            .push_str(&format!("\t\tuint8_t __padding{}[{}];\n", self.cursor, num_bytes));
        self.cursor += num_bytes;
    }

    fn align(&mut self, size: usize, alignment: usize)
    {
        let off_alignment = self.cursor % alignment;
        if off_alignment != 0 {
            self.add_padding(alignment - off_alignment);
        }
        let spans_boundary = size > 0 && ((self.cursor ^ (self.cursor + size - 1)) >> 4) != 0;
        if self.cursor % 16 != 0 && spans_boundary {
            self.add_padding(16 - self.cursor % 16);
        }
    }

    fn add_members(&mut self, variable: &Variable, prefix: &str, tree: &AbstractSyntaxTree) -> Result<(), Error>
    {
        match &variable.vtype {
            VariableType::Basic(basic) => {
                let item_size = size_of_constant_type(&basic.hlsl_type)?;
                let item_alignment = alignment_of_constant_type(&basic.hlsl_type)?;
                if variable.array_count == 0 {
                    self.align(item_size, item_alignment);
                    self.cursor += item_size;
                    self.out.push_str(&format!(
                        "\t\t{} {}{};\n",
                        constant_type_cpp(&basic.hlsl_type)?,
                        prefix,
                        variable.name
                    ));
                } else {
                    // Array items are always 16-byte aligned.
                    for i in 0..variable.array_count {
                        self.align(1, 16);
                        self.cursor += item_size;
                        self.out.push_str(&format!(
                            "\t\t{} {}{}{};\n",
                            constant_type_cpp(&basic.hlsl_type)?,
                            prefix,
                            variable.name,
                            i
                        ));
                    }
                }
            },
            VariableType::Struct(instance) => {
                let shader_struct = &tree.structs[instance.struct_index as usize].item;
                if variable.array_count == 0 {
                    self.align(1, 16);
                    for child in &shader_struct.variables {
                        self.add_members(child, &format!("{}{}_", prefix, variable.name), tree)?;
                    }
                } else {
                    for i in 0..variable.array_count {
                        self.align(1, 16);
                        for child in &shader_struct.variables {
                            self.add_members(child, &format!("{}{}{}_", prefix, variable.name, i), tree)?;
                        }
                    }
                }
            },
            _ => ()
        }
        Ok(())
    }
}

fn generate_setter_constants(
    out: &mut String,
    variable: &Variable,
    prefix_member: &str,
    prefix_value: &str,
    tree: &AbstractSyntaxTree
)
{
    if !variable.vtype.is_standard_constant() {
        return;
    }
    if variable.array_count == 0 {
        match &variable.vtype {
            VariableType::Basic(_) => {
                out.push_str(&format!(
                    "\t\tm_constants.{}{} = {}{};\n",
                    prefix_member, variable.name, prefix_value, variable.name
                ));
            },
            VariableType::Struct(instance) => {
                let shader_struct = &tree.structs[instance.struct_index as usize].item;
                for child in &shader_struct.variables {
                    generate_setter_constants(
                        out,
                        child,
                        &format!("{}{}_", prefix_member, variable.name),
                        &format!("{}{}.", prefix_value, variable.name),
                        tree
                    );
                }
            },
            _ => ()
        }
    } else {
        for i in 0..variable.array_count {
            match &variable.vtype {
                VariableType::Basic(_) => {
                    out.push_str(&format!(
                        "\t\tm_constants.{}{}{} = {}{}[{}];\n",
                        prefix_member, variable.name, i, prefix_value, variable.name, i
                    ));
                },
                VariableType::Struct(instance) => {
                    let shader_struct = &tree.structs[instance.struct_index as usize].item;
                    for child in &shader_struct.variables {
                        generate_setter_constants(
                            out,
                            child,
                            &format!("{}{}{}_", prefix_member, variable.name, i),
                            &format!("{}{}[{}].", prefix_value, variable.name, i),
                            tree
                        );
                    }
                },
                _ => ()
            }
        }
    }
}

fn generate_bindings_code(
    out: &mut String,
    input_group: &ShaderInputGroup,
    bindings: &ShaderInputGroupBindings,
    transient: bool
) -> Result<(), Error>
{
    let mode = if transient { "Transient" } else { "Persistent" };
    out.push_str(&format!(
        "\tinline {} generate{}Bindings(Render::RenderContext& renderContext) const {{\n",
        input_group.bind_point_name, mode
    ));
    out.push_str(&format!("\t\t{} out {{}};\n", input_group.bind_point_name));
    let allocator = if transient {
        "renderContext.getCurrentCbvSrvUavDescriptorTransientAllocator()"
    } else {
        "renderContext.cbvSrvUavDescriptorStaticAllocator"
    };

    for root_parameter in &bindings.root_parameters {
        let table = &root_parameter.descriptor_table;
        out.push_str("\t\t{\n");
        out.push_str(&format!(
            "\t\t\tauto descriptorAllocation = {}.allocate({}",
            allocator, table.num_known_descriptors
        ));
        if let Some(unbounded_idx) = table.unbounded_variable_idx {
            out.push_str(&format!(
                " + (uint32_t)m_{}.size()",
                input_group.variables[unbounded_idx as usize].name
            ));
        }
        out.push_str(");\n");
        out.push_str("\t\t\tconst auto descriptorIncrementSize = renderContext.pCbvSrvUavDescriptorBaseAllocatorCPU->descriptorIncrementSize;\n");

        for descriptor in &table.descriptors {
            let variable = &input_group.variables[descriptor.variable_idx as usize];
            let class = register_type(&variable.vtype)
                .ok_or_else(|| Error::Internal(format!("no register class for `{}`", variable.name)))?;
            if class == RegisterType::ConstantBuffer {
                out.push_str("\t\t\t{\n");
            } else if variable.array_count == 0 {
                out.push_str(&format!("\t\t\tif (m_{}) {{\n", variable.name));
            } else {
                out.push_str(&format!("\t\t\tif (!m_{}.empty()) {{\n", variable.name));
            }
            out.push_str("\t\t\t\tCD3DX12_CPU_DESCRIPTOR_HANDLE descriptor;\n");
            out.push_str(&format!(
                "\t\t\t\tdescriptor.InitOffsetted(descriptorAllocation.firstCPUDescriptor, {}, descriptorIncrementSize);\n",
                descriptor.descriptor_offset
            ));
            match class {
                RegisterType::ConstantBuffer => {
                    if transient {
                        out.push_str("\t\t\t\tauto& allocator = renderContext.singleFrameBufferAllocator;\n");
                        out.push_str("\t\t\t\tconst auto desc = allocator.allocateCBV(m_constants);\n");
                    } else {
                        out.push_str("\t\t\t\tout.pConstantBuffer = renderContext.createBufferWithData(m_constants, D3D12_RESOURCE_FLAG_NONE, D3D12_RESOURCE_STATE_VERTEX_AND_CONSTANT_BUFFER, D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT);\n");
                        out.push_str("\t\t\t\tD3D12_CONSTANT_BUFFER_VIEW_DESC desc { .BufferLocation = out.pConstantBuffer->GetGPUVirtualAddress(), .SizeInBytes = (UINT)Util::roundUpToClosestMultiplePowerOf2(sizeof(m_constants), D3D12_CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT) };\n");
                    }
                    out.push_str("\t\t\t\trenderContext.pDevice->CreateConstantBufferView(&desc, descriptor);\n");
                },
                RegisterType::ShaderResource | RegisterType::UnorderedAccess => {
                    let create_view = if class == RegisterType::UnorderedAccess {
                        "CreateUnorderedAccessView"
                    } else {
                        "CreateShaderResourceView"
                    };
                    let extra_arg = if class == RegisterType::UnorderedAccess { ", nullptr" } else { "" };
                    if variable.array_count == 0 {
                        out.push_str(&format!(
                            "\t\t\t\trenderContext.pDevice->{0}(m_{1}->pResource{2}, &m_{1}->desc, descriptor);\n",
                            create_view, variable.name, extra_arg
                        ));
                    } else {
                        out.push_str("\t\t\t\tfor (size_t i = 0; i < ");
                        if variable.array_count == Variable::UNBOUNDED {
                            out.push_str(&format!("m_{}.size()", variable.name));
                        } else {
                            out.push_str(&format!("{}", variable.array_count));
                        }
                        out.push_str("; ++i) {\n");
                        out.push_str(&format!(
                            "\t\t\t\t\trenderContext.pDevice->{0}(m_{1}[i].pResource{2}, &m_{1}[i].desc, descriptor);\n",
                            create_view, variable.name, extra_arg
                        ));
                        out.push_str("\t\t\t\t\tdescriptor = descriptor.Offset(1, descriptorIncrementSize);\n");
                        out.push_str("\t\t\t\t}\n");
                    }
                },
                RegisterType::Sampler => {
                    return Err(Error::Internal(format!("sampler descriptor for `{}`", variable.name)))
                }
            }
            out.push_str("\t\t\t}\n");
        }
        out.push_str(&format!(
            "\t\t\tout.rootParameter{} = descriptorAllocation;\n",
            root_parameter.root_parameter_offset
        ));
        out.push_str("\t\t}\n");
    }
    if !transient {
        out.push_str("\t\tout.pParent = &renderContext;\n");
    }
    out.push_str("\t\treturn out;\n\t}\n");
    Ok(())
}

fn generate_shader_input_group(
    input_group: &ShaderInputGroup,
    bindings: &ShaderInputGroupBindings,
    tree: &AbstractSyntaxTree,
    bind_point: &WithMetadata<BindPoint>,
    file_path: &Path
) -> Result<String, Error>
{
    let mut out = String::from("#pragma once\n");
    out.push_str("#include \"Engine/RenderAPI/ShaderInput.h\"\n");
    out.push_str("#include \"Engine/Render/RenderContext.h\"\n");
    out.push_str("#include <tbx/move_only.h>\n\n");

    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    out.push_str(&format!(
        "#include \"{}\"\n",
        relative_path(&bind_point_file_path(bind_point), base_path)
    ));
    for variable in &input_group.variables {
        add_include(&variable.vtype, tree, base_path, &mut out);
    }

    out.push_str("namespace ShaderInputs {\n");
    out.push_str(&format!("struct {} {{\n", input_group.name));

    generate_bindings_code(&mut out, input_group, bindings, true)?;
    generate_bindings_code(&mut out, input_group, bindings, false)?;

    // Setters.
    out.push_str("public:\n");
    for variable in &input_group.variables {
        // The injected constant buffer slot is not user visible.
        if variable.vtype == VariableType::ConstantBuffer {
            continue;
        }
        out.push_str(&format!("\tinline void set{}(", title(&variable.name)));
        if variable.array_count > 0 {
            out.push_str(&format!(
                "std::span<const {}> {}",
                type_name(&variable.vtype, tree, true)?,
                variable.name
            ));
        } else if matches!(variable.vtype, VariableType::Basic(_)) {
            out.push_str(&format!("{} {}", type_name(&variable.vtype, tree, true)?, variable.name));
        } else {
            out.push_str(&format!("const {}& {}", type_name(&variable.vtype, tree, false)?, variable.name));
        }
        out.push_str(") {\n");
        match &variable.vtype {
            VariableType::Basic(_) | VariableType::Struct(_) => {
                generate_setter_constants(&mut out, variable, "", "", tree);
            },
            VariableType::Group(instance) => {
                let group = &tree.groups[instance.group_index as usize].item;
                for group_variable in &group.variables {
                    let mangled = mangled_group_variable_name(&variable.name, &group_variable.name);
                    out.push_str(&format!(
                        "\t\tset{}({}.{});\n",
                        title(&mangled),
                        variable.name,
                        group_variable.name
                    ));
                }
            },
            _ => {
                // m_{name} is also a std::span so no copy is needed.
                out.push_str(&format!("\t\tm_{0} = {0};\n", variable.name));
            }
        }
        out.push_str("\t}\n");
    }

    // Member declarations for the bound resources.
    out.push_str("private:\n");
    for variable in &input_group.variables {
        if variable.vtype == VariableType::ConstantBuffer
            || variable.vtype.is_standard_constant()
            || variable.vtype.is_group_instance()
        {
            continue;
        }
        if variable.array_count == 0 {
            out.push_str(&format!(
                "\tstd::optional<{}> m_{};\n",
                type_name(&variable.vtype, tree, false)?,
                variable.name
            ));
        } else {
            out.push_str(&format!("\tstd::span<const {}", type_name(&variable.vtype, tree, false)?));
            if variable.array_count != Variable::UNBOUNDED {
                out.push_str(&format!(", {}", variable.array_count));
            }
            out.push_str(&format!("> m_{};\n", variable.name));
        }
    }

    // CPU copy of the constant buffer, packed like the HLSL cbuffer.
    out.push_str("\tstruct Constants {\n");
    let mut packer = ConstantsPacker {
        out: &mut out,
        cursor: 0
    };
    for variable in &input_group.variables {
        packer.add_members(variable, "", tree)?;
    }
    out.push_str("\t};\n\tConstants m_constants;\n");

    out.push_str("};\n}\n");
    Ok(out)
}

fn generate_bind_point(bind_point: &BindPoint, bindings: &BindPointBindings) -> String
{
    let mut out = String::from("#pragma once\n");
    out.push_str("#include \"Engine/RenderAPI/Descriptor/DescriptorAllocation.h\"\n");
    out.push_str("#include \"Engine/RenderAPI/MaResource.h\"\n");
    out.push_str("#include \"Engine/Render/RenderContext.h\"\n");
    out.push_str("#include <tbx/move_only.h>\n\n");
    out.push_str("namespace ShaderInputs {\n");
    out.push_str(&format!("struct {} {{\n", bind_point.name));
    for root_parameter in &bindings.root_parameters {
        out.push_str(&format!(
            "\tRenderAPI::DescriptorAllocation rootParameter{};\n",
            root_parameter.root_parameter_offset
        ));
    }
    out.push_str("\tRenderAPI::D3D12MAResource pConstantBuffer;\n");
    out.push_str(&format!("\n\t{}() = default;\n", bind_point.name));
    out.push_str(&format!("\t~{}() {{\n\t\tif (pParent) {{\n", bind_point.name));
    for root_parameter in &bindings.root_parameters {
        out.push_str(&format!(
            "\t\t\tpParent->cbvSrvUavDescriptorStaticAllocator.release(rootParameter{});\n",
            root_parameter.root_parameter_offset
        ));
    }
    out.push_str("\t\t}\n\t}\n");
    out.push_str(&format!("\tNO_COPY({});\n", bind_point.name));
    out.push_str(&format!("\tDEFAULT_MOVE({});\n", bind_point.name));
    out.push_str("\n\tTbx::MovePointer<Render::RenderContext> pParent;\n");
    out.push_str("};\n}\n");
    out
}

fn generate_shader_input_layout(
    layout: &ShaderInputLayout,
    layout_bindings: &ShaderInputLayoutBindings,
    tree: &AbstractSyntaxTree,
    bindings: &ResourceBindingInfo,
    file_path: &Path
) -> String
{
    let local_offset: u32 = if layout.options.local_root_signature { 500 } else { 0 };
    let mut out = String::from("#pragma once\n");
    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    for reference in &layout.bind_points {
        let bind_point = &tree.bind_points[reference.bind_point_index as usize];
        out.push_str(&format!(
            "#include \"{}\"\n",
            relative_path(&bind_point_file_path(bind_point), base_path)
        ));
    }
    out.push_str("namespace ShaderInputs {\n");
    out.push_str(&format!("struct {} {{\n", layout.name));

    // Descriptor table binding helpers for graphics and compute submission.
    for (reference, root_parameter_start) in layout
        .bind_points
        .iter()
        .zip(&layout_bindings.bind_points_root_parameter_indices)
    {
        let bind_point = &tree.bind_points[reference.bind_point_index as usize];
        let bind_point_bindings = &bindings.bind_points[reference.bind_point_index as usize];
        for mode in ["Graphics", "Compute"] {
            out.push_str(&format!(
                "\tstatic inline void bind{}{}(ID3D12GraphicsCommandList* pCommandList, const {}& shaderInputGroup) {{\n",
                title(&reference.name),
                mode,
                bind_point.item.name
            ));
            for root_parameter in &bind_point_bindings.root_parameters {
                let root_parameter_index = root_parameter_start + root_parameter.root_parameter_offset;
                out.push_str(&format!(
                    "\t\tif (shaderInputGroup.rootParameter{}.numDescriptors > 0) {{\n",
                    root_parameter.root_parameter_offset
                ));
                out.push_str(&format!(
                    "\t\t\tpCommandList->Set{}RootDescriptorTable({}, shaderInputGroup.rootParameter{}.firstGPUDescriptor);\n",
                    mode, root_parameter_index, root_parameter.root_parameter_offset
                ));
                out.push_str("\t\t}\n");
            }
            out.push_str("\t}\n");
        }
    }

    for (root_constant, root_parameter_index) in layout
        .root_constants
        .iter()
        .zip(&layout_bindings.constant_root_parameter_indices)
    {
        out.push_str(&format!(
            "\tstatic inline uint32_t get{}RootParameterIndex() {{\n\t\treturn {};\n\t}}\n",
            title(&root_constant.name),
            root_parameter_index
        ));
    }
    for (root_cbv, root_parameter_index) in layout
        .root_constant_buffer_views
        .iter()
        .zip(&layout_bindings.cbv_root_parameter_indices)
    {
        out.push_str(&format!(
            "\tstatic inline uint32_t get{}RootParameterIndex() {{\n\t\treturn {};\n\t}}\n",
            title(&root_cbv.name),
            root_parameter_index
        ));
    }

    // For local root signatures the shader binding table entries are handed
    // out in root parameter order.
    if layout.options.local_root_signature {
        let mut shader_inputs: Vec<Option<(usize, u32)>> = Vec::new();
        for (bind_point_idx, (reference, root_parameter_start)) in layout
            .bind_points
            .iter()
            .zip(&layout_bindings.bind_points_root_parameter_indices)
            .enumerate()
        {
            let bind_point_bindings = &bindings.bind_points[reference.bind_point_index as usize];
            for root_parameter in &bind_point_bindings.root_parameters {
                let root_parameter_index = (root_parameter_start + root_parameter.root_parameter_offset) as usize;
                if root_parameter_index >= shader_inputs.len() {
                    shader_inputs.resize(root_parameter_index + 1, None);
                }
                shader_inputs[root_parameter_index] = Some((bind_point_idx, root_parameter.root_parameter_offset));
            }
        }
        out.push_str(&format!(
            "\n\tstatic std::array<CD3DX12_GPU_DESCRIPTOR_HANDLE, {}> getShaderBindings(",
            shader_inputs.len()
        ));
        for (bind_point_idx, reference) in layout.bind_points.iter().enumerate() {
            let bind_point = &tree.bind_points[reference.bind_point_index as usize];
            out.push_str(&format!("const {}& shaderInputGroup{}", bind_point.item.name, bind_point_idx));
            if bind_point_idx != layout.bind_points.len() - 1 {
                out.push_str(", ");
            }
        }
        out.push_str(") {\n\t\treturn {\n");
        for shader_input in &shader_inputs {
            match shader_input {
                Some((bind_point_idx, root_parameter_offset)) => out.push_str(&format!(
                    "\t\t\tshaderInputGroup{}.rootParameter{}.firstGPUDescriptor,\n",
                    bind_point_idx, root_parameter_offset
                )),
                None => out.push_str("\t\t\t0,\n")
            }
        }
        out.push_str("\t\t};\n\t}\n");
    }

    // Root signature construction.
    out.push_str("\tstatic inline WRL::ComPtr<ID3D12RootSignature> getRootSignature(ID3D12Device* pDevice) {\n");
    out.push_str("\t\tusing namespace RenderAPI;\n");
    out.push_str("\t\tstatic WRL::ComPtr<ID3D12RootSignature> s_pRootSignature = nullptr;\n");
    out.push_str("\t\tif (!s_pRootSignature) {\n");

    let mut num_descriptor_ranges = 0usize;
    let mut num_root_parameters = 0u32;
    for (reference, root_parameter_start) in layout
        .bind_points
        .iter()
        .zip(&layout_bindings.bind_points_root_parameter_indices)
    {
        let bind_point_bindings = &bindings.bind_points[reference.bind_point_index as usize];
        for root_parameter in &bind_point_bindings.root_parameters {
            num_descriptor_ranges += root_parameter.descriptor_table_layout.ranges.len();
            let root_parameter_index = root_parameter_start + root_parameter.root_parameter_offset;
            num_root_parameters = num_root_parameters.max(root_parameter_index + 1);
        }
    }
    for &root_parameter_index in &layout_bindings.constant_root_parameter_indices {
        num_root_parameters = num_root_parameters.max(root_parameter_index + 1);
    }
    for &root_parameter_index in &layout_bindings.cbv_root_parameter_indices {
        num_root_parameters = num_root_parameters.max(root_parameter_index + 1);
    }
    out.push_str(&format!(
        "\t\t\tstd::array<D3D12_ROOT_PARAMETER, {}> rootParameters;\n",
        num_root_parameters
    ));
    out.push_str(&format!(
        "\t\t\tstd::array<D3D12_DESCRIPTOR_RANGE, {}> descriptorRanges;\n\n",
        num_descriptor_ranges
    ));

    let mut requires_input_assembler = false;
    let mut current_range = 0usize;
    for (reference, root_parameter_start) in layout
        .bind_points
        .iter()
        .zip(&layout_bindings.bind_points_root_parameter_indices)
    {
        let bind_point_bindings = &bindings.bind_points[reference.bind_point_index as usize];
        let (visibility, raster) = visibility_for_stages(&reference.shader_stages);
        requires_input_assembler |= raster;
        for root_parameter in &bind_point_bindings.root_parameters {
            let root_parameter_index = root_parameter_start + root_parameter.root_parameter_offset;
            let register_space = root_parameter_index + local_offset;
            let first_range = current_range;
            for range in &root_parameter.descriptor_table_layout.ranges {
                out.push_str(&format!(
                    "\t\t\tdescriptorRanges[{}].BaseShaderRegister = {};\n",
                    current_range, range.base_descriptor_offset
                ));
                out.push_str(&format!(
                    "\t\t\tdescriptorRanges[{}].RegisterSpace = {};\n",
                    current_range, register_space
                ));
                out.push_str(&format!(
                    "\t\t\tdescriptorRanges[{}].RangeType = {};\n",
                    current_range,
                    range.register_type.range_type_name()
                ));
                out.push_str(&format!(
                    "\t\t\tdescriptorRanges[{}].NumDescriptors = {};\n",
                    current_range, range.num_descriptors
                ));
                out.push_str(&format!(
                    "\t\t\tdescriptorRanges[{}].OffsetInDescriptorsFromTableStart = {};\n",
                    current_range, range.base_descriptor_offset
                ));
                current_range += 1;
            }
            out.push_str(&format!(
                "\t\t\trootParameters[{}].ParameterType = D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE;\n",
                root_parameter_index
            ));
            out.push_str(&format!(
                "\t\t\trootParameters[{}].ShaderVisibility = {};\n",
                root_parameter_index, visibility
            ));
            out.push_str(&format!(
                "\t\t\trootParameters[{}].DescriptorTable.pDescriptorRanges = &descriptorRanges[{}];\n",
                root_parameter_index, first_range
            ));
            out.push_str(&format!(
                "\t\t\trootParameters[{}].DescriptorTable.NumDescriptorRanges = {};\n\n",
                root_parameter_index,
                root_parameter.descriptor_table_layout.ranges.len()
            ));
        }
    }

    // Static samplers with defaulted D3D12 state.
    // https://docs.microsoft.com/en-us/windows/win32/api/d3d12/ns-d3d12-d3d12_sampler_desc
    let sampler_space = 500 + local_offset;
    if !layout.static_samplers.is_empty() {
        out.push_str(&format!(
            "\t\t\tstd::array<D3D12_STATIC_SAMPLER_DESC, {}> staticSamplers;\n",
            layout.static_samplers.len()
        ));
        for (sampler_idx, sampler) in layout.static_samplers.iter().enumerate() {
            let mut options = sampler.options.clone();
            let mut set_option = |name: &str, default: &str| {
                let value = options.remove(name).unwrap_or_else(|| default.into());
                out.push_str(&format!("\t\t\tstaticSamplers[{}].{} = {};\n", sampler_idx, name, value));
            };
            set_option("Filter", "D3D12_FILTER_MIN_MAG_MIP_POINT");
            set_option("AddressU", "D3D12_TEXTURE_ADDRESS_MODE_WRAP");
            set_option("AddressV", "D3D12_TEXTURE_ADDRESS_MODE_WRAP");
            set_option("AddressW", "D3D12_TEXTURE_ADDRESS_MODE_WRAP");
            set_option("MipLODBias", "0.0f");
            set_option("MaxAnisotropy", "1");
            set_option("ComparisonFunc", "(D3D12_COMPARISON_FUNC)0");
            set_option("BorderColor", "D3D12_STATIC_BORDER_COLOR_TRANSPARENT_BLACK");
            set_option("MinLOD", "0.0f");
            set_option("MaxLOD", "1000.0f");
            out.push_str(&format!(
                "\t\t\tstaticSamplers[{}].ShaderRegister = {};\n",
                sampler_idx, sampler_idx
            ));
            out.push_str(&format!(
                "\t\t\tstaticSamplers[{}].RegisterSpace = {};\n",
                sampler_idx, sampler_space
            ));
            out.push_str(&format!(
                "\t\t\tstaticSamplers[{}].ShaderVisibility = D3D12_SHADER_VISIBILITY_ALL;\n",
                sampler_idx
            ));
            for key in options.keys() {
                warn!("Unrecognized StaticSampler argument: {}", key);
            }
        }
    }

    let constant_space = 501 + local_offset;
    for (root_constant, root_parameter_index) in layout
        .root_constants
        .iter()
        .zip(&layout_bindings.constant_root_parameter_indices)
    {
        let (visibility, raster) = visibility_for_stages(&root_constant.shader_stages);
        requires_input_assembler |= raster;
        out.push_str(&format!(
            "\t\t\trootParameters[{}].ParameterType = D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS;\n",
            root_parameter_index
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].ShaderVisibility = {};\n",
            root_parameter_index, visibility
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].Constants.ShaderRegister = {};\n",
            root_parameter_index, root_parameter_index
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].Constants.RegisterSpace = {};\n",
            root_parameter_index, constant_space
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].Constants.Num32BitValues = {};\n",
            root_parameter_index, root_constant.num_32bit_values
        ));
    }

    let cbv_space = 502 + local_offset;
    for (root_cbv, root_parameter_index) in layout
        .root_constant_buffer_views
        .iter()
        .zip(&layout_bindings.cbv_root_parameter_indices)
    {
        let (visibility, raster) = visibility_for_stages(&root_cbv.shader_stages);
        requires_input_assembler |= raster;
        out.push_str(&format!(
            "\t\t\trootParameters[{}].ParameterType = D3D12_ROOT_PARAMETER_TYPE_CBV;\n",
            root_parameter_index
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].ShaderVisibility = {};\n",
            root_parameter_index, visibility
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].Descriptor.ShaderRegister = {};\n",
            root_parameter_index, root_parameter_index
        ));
        out.push_str(&format!(
            "\t\t\trootParameters[{}].Descriptor.RegisterSpace = {};\n",
            root_parameter_index, cbv_space
        ));
    }

    out.push_str("\t\t\tCD3DX12_VERSIONED_ROOT_SIGNATURE_DESC rootSignatureDesc {};\n");
    out.push_str("\t\t\tD3D12_ROOT_SIGNATURE_FLAGS rootSignatureFlags = D3D12_ROOT_SIGNATURE_FLAG_NONE;\n");
    if layout.options.local_root_signature {
        out.push_str("\t\t\trootSignatureFlags |= D3D12_ROOT_SIGNATURE_FLAG_LOCAL_ROOT_SIGNATURE;\n");
    }
    if requires_input_assembler {
        out.push_str("\t\t\trootSignatureFlags |= D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT;\n");
    }
    if layout.static_samplers.is_empty() {
        out.push_str("\t\t\trootSignatureDesc.Init_1_0(UINT(rootParameters.size()), rootParameters.data(), 0, nullptr, rootSignatureFlags);\n");
    } else {
        out.push_str("\t\t\trootSignatureDesc.Init_1_0(UINT(rootParameters.size()), rootParameters.data(), UINT(staticSamplers.size()), staticSamplers.data(), rootSignatureFlags);\n");
    }
    out.push_str("\t\t\tWRL::ComPtr<ID3DBlob> pRootSignatureBlob, pErrorBlob;\n");
    out.push_str("\t\t\tRenderAPI::ThrowIfFailed(D3DX12SerializeVersionedRootSignature(&rootSignatureDesc, D3D_ROOT_SIGNATURE_VERSION_1_1, &pRootSignatureBlob, &pErrorBlob));\n");
    out.push_str("\t\t\tRenderAPI::ThrowIfFailed(pDevice->CreateRootSignature(0, pRootSignatureBlob->GetBufferPointer(), pRootSignatureBlob->GetBufferSize(), IID_PPV_ARGS(&s_pRootSignature)));\n");
    out.push_str("\t\t}\n\t\treturn s_pRootSignature;\n\t}\n");
    out.push_str("};\n}\n");
    out
}

pub fn generate_host_code(tree: &AbstractSyntaxTree, bindings: &ResourceBindingInfo) -> Result<(), Error>
{
    if !tree.constants.is_empty() {
        let mut sorted = tree.constants.clone();
        sorted.sort_by(|lhs, rhs| lhs.metadata.cpp_folder.cmp(&rhs.metadata.cpp_folder));
        let mut first = 0;
        for last in 0..=sorted.len() {
            if last == sorted.len() || sorted[last].metadata.cpp_folder != sorted[first].metadata.cpp_folder {
                if sorted[first].metadata.should_export {
                    let cluster: Vec<Constant> =
                        sorted[first..last].iter().map(|constant| constant.item.clone()).collect();
                    commit(constants_file_path(&sorted[first].metadata), generate_constants(&cluster))?;
                }
                first = last;
            }
        }
    }

    for shader_struct in &tree.structs {
        if shader_struct.metadata.should_export {
            let file_path = struct_file_path(shader_struct);
            let contents = generate_struct(&shader_struct.item, tree, &file_path)?;
            commit(file_path, contents)?;
        }
    }

    for group in &tree.groups {
        if group.metadata.should_export {
            let file_path = group_file_path(group);
            let contents = generate_group(&group.item, tree, &file_path)?;
            commit(file_path, contents)?;
        }
    }

    for (bind_point, bind_point_bindings) in tree.bind_points.iter().zip(&bindings.bind_points) {
        for (&input_group_idx, input_group_bindings) in bind_point
            .item
            .shader_input_groups
            .iter()
            .zip(&bind_point_bindings.shader_input_groups)
        {
            let input_group = &tree.shader_input_groups[input_group_idx as usize];
            if input_group.metadata.should_export {
                let file_path = input_group_file_path(input_group);
                let contents = generate_shader_input_group(
                    &input_group.item,
                    input_group_bindings,
                    tree,
                    bind_point,
                    &file_path
                )?;
                commit(file_path, contents)?;
            }
        }

        if bind_point.metadata.should_export {
            commit(
                bind_point_file_path(bind_point),
                generate_bind_point(&bind_point.item, bind_point_bindings)
            )?;
        }
    }

    for (layout, layout_bindings) in tree.shader_input_layouts.iter().zip(&bindings.shader_input_layouts) {
        if layout.metadata.should_export {
            let file_path = layout_file_path(layout);
            let contents = generate_shader_input_layout(&layout.item, layout_bindings, tree, bindings, &file_path);
            commit(file_path, contents)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use sil::ast::build_ast;
    use sil::parser::{tree::ParseTree, Context, Parser};
    use sil::Lexer;

    use super::*;
    use crate::backends::dx12::allocation::allocate_registers;

    fn compile(source_code: &[u8]) -> (AbstractSyntaxTree, ResourceBindingInfo)
    {
        let mut lexer = Lexer::new();
        lexer.process(source_code).unwrap();
        let mut parser = Parser::new(lexer);
        let mut ctx = Context::new();
        let statements = parser.parse(&mut ctx).unwrap();
        let mut tree = build_ast(ParseTree {
            output: Metadata::default(),
            statements
        })
        .unwrap();
        let bindings = allocate_registers(&mut tree).unwrap();
        (tree, bindings)
    }

    #[test]
    fn constant_packing_pads_straddles()
    {
        let (tree, _) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                float3 a;
                float4 b;
                float c;
            };
        "
        );
        let mut out = String::new();
        let mut packer = ConstantsPacker {
            out: &mut out,
            cursor: 0
        };
        for variable in &tree.shader_input_groups[0].item.variables {
            packer.add_members(variable, "", &tree).unwrap();
        }
        // float3 at 0..12; float4 would straddle 16 so it is pushed to 16;
        // float lands right after at 32.
        assert_eq!(packer.cursor, 36);
        assert!(out.contains("glm::vec3 a;"));
        assert!(out.contains("uint8_t __padding12[4];"));
        assert!(out.contains("glm::vec4 b;"));
        assert!(out.contains("float c;"));
    }

    #[test]
    fn matrices_are_stored_as_mat3x4()
    {
        let (tree, _) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                float3x3 rotation;
            };
        "
        );
        let mut out = String::new();
        let mut packer = ConstantsPacker {
            out: &mut out,
            cursor: 0
        };
        for variable in &tree.shader_input_groups[0].item.variables {
            packer.add_members(variable, "", &tree).unwrap();
        }
        assert!(out.contains("glm::mat3x4 rotation;"));
    }

    #[test]
    fn input_group_setters_and_members()
    {
        let (tree, bindings) = compile(
            b"
            struct Light { float3 position; float intensity; };
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> albedo;
                StructuredBuffer<Light> lights[];
                Light hero;
                float exposure;
            };
        "
        );
        let contents = generate_shader_input_group(
            &tree.shader_input_groups[0].item,
            &bindings.bind_points[0].shader_input_groups[0],
            &tree,
            &tree.bind_points[0],
            Path::new("/out/inputgroups/G.h")
        )
        .unwrap();
        assert!(contents.contains("struct G {"));
        assert!(contents.contains("\tinline void setAlbedo(const RenderAPI::SRVDesc& albedo) {"));
        assert!(contents.contains("\t\tm_albedo = albedo;"));
        assert!(contents.contains("\tinline void setLights(std::span<const RenderAPI::SRVDesc> lights) {"));
        assert!(contents.contains("\tinline void setHero(const Light& hero) {"));
        assert!(contents.contains("\t\tm_constants.hero_position = hero.position;"));
        assert!(contents.contains("\tinline void setExposure(float exposure) {"));
        assert!(contents.contains("\tstd::optional<RenderAPI::SRVDesc> m_albedo;"));
        assert!(contents.contains("\tstd::span<const RenderAPI::SRVDesc> m_lights;"));
        assert!(contents.contains("\tConstants m_constants;"));
        // Unbounded span feeds the descriptor allocation size.
        assert!(contents.contains("+ (uint32_t)m_lights.size()"));
    }

    #[test]
    fn group_setter_forwards_to_mangled_setters()
    {
        let (tree, bindings) = compile(
            b"
            Group Shadows
            {
                Texture2D<float> map;
                float bias;
            };
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Shadows shadows;
            };
        "
        );
        let contents = generate_shader_input_group(
            &tree.shader_input_groups[0].item,
            &bindings.bind_points[0].shader_input_groups[0],
            &tree,
            &tree.bind_points[0],
            Path::new("/out/inputgroups/G.h")
        )
        .unwrap();
        assert!(contents.contains("\tinline void setShadows(const Shadows& shadows) {"));
        assert!(contents.contains("\t\tset__shadows_map(shadows.map);"));
        assert!(contents.contains("\t\tset__shadows_bias(shadows.bias);"));
    }

    #[test]
    fn bind_point_holder_releases_root_parameters()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> t;
            };
        "
        );
        let contents = generate_bind_point(&tree.bind_points[0].item, &bindings.bind_points[0]);
        assert!(contents.contains("struct B {"));
        assert!(contents.contains("\tRenderAPI::DescriptorAllocation rootParameter0;"));
        assert!(contents.contains("cbvSrvUavDescriptorStaticAllocator.release(rootParameter0);"));
    }

    #[test]
    fn root_signature_description()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> t;
                float exposure;
            };
            ShaderInputLayout L
            {
                StaticSampler linear { .Filter = \"D3D12_FILTER_MIN_MAG_MIP_LINEAR\" };
                RootConstant push { .shaderStages = [vertex], .num32BitValues = 4 };
                RootCBV view { .shaderStages = [compute] };
                b B { .shaderStages = [pixel] };
            };
        "
        );
        let contents = generate_shader_input_layout(
            &tree.shader_input_layouts[0].item,
            &bindings.shader_input_layouts[0],
            &tree,
            &bindings,
            Path::new("/out/inputlayouts/L.h")
        );
        // 1 constant + 1 CBV + 1 table.
        assert!(contents.contains("std::array<D3D12_ROOT_PARAMETER, 3> rootParameters;"));
        // CBV range + SRV range in the table.
        assert!(contents.contains("std::array<D3D12_DESCRIPTOR_RANGE, 2> descriptorRanges;"));
        assert!(contents.contains("rootParameters[2].ParameterType = D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE;"));
        assert!(contents.contains("rootParameters[2].ShaderVisibility = D3D12_SHADER_VISIBILITY_PIXEL;"));
        assert!(contents.contains("rootParameters[0].ParameterType = D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS;"));
        assert!(contents.contains("rootParameters[0].Constants.Num32BitValues = 4;"));
        assert!(contents.contains("rootParameters[0].ShaderVisibility = D3D12_SHADER_VISIBILITY_VERTEX;"));
        assert!(contents.contains("rootParameters[1].ParameterType = D3D12_ROOT_PARAMETER_TYPE_CBV;"));
        assert!(contents.contains("rootParameters[1].ShaderVisibility = D3D12_SHADER_VISIBILITY_ALL;"));
        assert!(contents.contains("staticSamplers[0].Filter = D3D12_FILTER_MIN_MAG_MIP_LINEAR;"));
        assert!(contents.contains("staticSamplers[0].AddressU = D3D12_TEXTURE_ADDRESS_MODE_WRAP;"));
        assert!(contents.contains("D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT"));
        assert!(contents.contains("bindBGraphics(ID3D12GraphicsCommandList* pCommandList, const B& shaderInputGroup)"));
        assert!(contents.contains("pCommandList->SetGraphicsRootDescriptorTable(2, shaderInputGroup.rootParameter0.firstGPUDescriptor);"));
        assert!(contents.contains("bindBCompute"));
        assert!(contents.contains("getPushRootParameterIndex()"));
        assert!(contents.contains("getViewRootParameterIndex()"));
    }

    #[test]
    fn local_layout_gets_flag_and_bindings_table()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint H {};
            ShaderInputGroup G<BindTo=H>
            {
                Texture2D<float4> t;
            };
            ShaderInputLayout L<Local>
            {
                hit H { .shaderStages = [rt] };
            };
        "
        );
        let contents = generate_shader_input_layout(
            &tree.shader_input_layouts[0].item,
            &bindings.shader_input_layouts[0],
            &tree,
            &bindings,
            Path::new("/out/inputlayouts/L.h")
        );
        assert!(contents.contains("D3D12_ROOT_SIGNATURE_FLAG_LOCAL_ROOT_SIGNATURE"));
        assert!(contents.contains("descriptorRanges[0].RegisterSpace = 500;"));
        assert!(contents.contains("getShaderBindings(const H& shaderInputGroup0)"));
        assert!(!contents.contains("D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT"));
    }
}
