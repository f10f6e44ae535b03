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

//! HLSL side of the generated code: declarations for structs, groups,
//! shader input groups (with their register assignments) and layouts.

use std::path::{Path, PathBuf};

use sil::ast::tree::{
    AbstractSyntaxTree,
    Constant,
    Group,
    Metadata,
    ShaderInputGroup,
    ShaderInputLayout,
    Struct,
    StructuredType,
    Variable,
    VariableType,
    WithMetadata
};

use crate::backends::dx12::allocation::{
    mangled_group_variable_name,
    ResourceBindingInfo,
    ShaderInputGroupBindings,
    ShaderInputLayoutBindings
};
use crate::backends::dx12::register::{register_type, RegisterType};
use crate::error::Error;
use crate::strings::{not_title, title, to_upper};
use crate::write::{relative_path, FileUpdate};

const LOCAL_ROOT_SIGNATURE_SPACE_OFFSET: u32 = 500;

fn constants_file_path(metadata: &Metadata) -> PathBuf
{
    metadata.shader_folder.join("constants.hlsl")
}

fn struct_file_path(shader_struct: &WithMetadata<Struct>) -> PathBuf
{
    shader_struct
        .metadata
        .shader_folder
        .join("structs")
        .join(format!("{}.hlsl", shader_struct.item.name))
}

fn group_file_path(group: &WithMetadata<Group>) -> PathBuf
{
    group
        .metadata
        .shader_folder
        .join("groups")
        .join(format!("{}.hlsl", group.item.name))
}

fn input_group_file_path(
    input_group: &WithMetadata<ShaderInputGroup>,
    layout: &WithMetadata<ShaderInputLayout>
) -> PathBuf
{
    layout
        .metadata
        .shader_folder
        .join("inputgroups")
        .join(&layout.item.name)
        .join(format!("{}.hlsl", input_group.item.name))
}

fn layout_file_path(layout: &WithMetadata<ShaderInputLayout>) -> PathBuf
{
    layout
        .metadata
        .shader_folder
        .join("inputlayouts")
        .join(format!("{}.hlsl", layout.item.name))
}

fn include_guard_name(name: &str) -> String
{
    format!("__{}__", name.replace('.', "_"))
}

fn guard_start(name: &str, out: &mut String)
{
    let guard = include_guard_name(name);
    out.push_str(&format!("#ifndef {}\n#define {}\n", guard, guard));
}

fn guard_end(out: &mut String)
{
    out.push_str("#endif\n");
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
        VariableType::StructuredBuffer(StructuredType::Struct(instance))
        | VariableType::RwStructuredBuffer(StructuredType::Struct(instance)) => {
            let path = struct_file_path(&tree.structs[instance.struct_index as usize]);
            out.push_str(&format!("#include \"{}\"\n", relative_path(&path, base_path)));
        },
        _ => ()
    }
}

fn structured_type_name(data_type: &StructuredType, tree: &AbstractSyntaxTree) -> Result<String, Error>
{
    match data_type {
        StructuredType::Basic(basic) => Ok(basic.hlsl_type.clone()),
        StructuredType::Struct(instance) => Ok(tree.structs[instance.struct_index as usize].item.name.clone()),
        StructuredType::Unresolved(name) => Err(Error::Internal(format!("unresolved type `{}`", name)))
    }
}

fn type_name(vtype: &VariableType, tree: &AbstractSyntaxTree) -> Result<String, Error>
{
    match vtype {
        VariableType::Basic(basic) => Ok(basic.hlsl_type.clone()),
        VariableType::Struct(instance) => Ok(tree.structs[instance.struct_index as usize].item.name.clone()),
        VariableType::Group(instance) => Ok(tree.groups[instance.group_index as usize].item.name.clone()),
        VariableType::Texture2D(element) => Ok(format!("Texture2D<{}>", element)),
        VariableType::RwTexture2D(element) => Ok(format!("RWTexture2D<{}>", element)),
        VariableType::ByteAddressBuffer => Ok("ByteAddressBuffer".into()),
        VariableType::RwByteAddressBuffer => Ok("RWByteAddressBuffer".into()),
        VariableType::StructuredBuffer(data_type) => {
            Ok(format!("StructuredBuffer<{}>", structured_type_name(data_type, tree)?))
        },
        VariableType::RwStructuredBuffer(data_type) => {
            Ok(format!("RWStructuredBuffer<{}>", structured_type_name(data_type, tree)?))
        },
        VariableType::RaytracingAccelerationStructure => Ok("RaytracingAccelerationStructure".into()),
        VariableType::Unresolved(name) => Err(Error::Internal(format!("unresolved type `{}`", name))),
        VariableType::ConstantBuffer => Err(Error::Internal("constant buffer marker has no type name".into()))
    }
}

fn register_letter(vtype: &VariableType) -> Result<char, Error>
{
    match register_type(vtype) {
        Some(class) if class != RegisterType::ConstantBuffer => Ok(class.register_char()),
        _ => Err(Error::Internal("variable does not bind a shader register".into()))
    }
}

fn commit(path: PathBuf, contents: String) -> Result<(), Error>
{
    let mut file = FileUpdate::new(path);
    file.push(&contents);
    file.commit()?;
    Ok(())
}

fn generate_constants(constants: &[Constant], name: &str) -> String
{
    let mut out = String::new();
    guard_start(name, &mut out);
    for constant in constants {
        out.push_str(&format!("#define {} {}\n", constant.name, constant.value));
    }
    guard_end(&mut out);
    out
}

fn generate_struct(shader_struct: &Struct, tree: &AbstractSyntaxTree, file_path: &Path) -> Result<String, Error>
{
    let mut out = String::new();
    guard_start(&shader_struct.name, &mut out);
    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    for variable in &shader_struct.variables {
        add_include(&variable.vtype, tree, base_path, &mut out);
    }
    out.push_str(&format!("struct {} {{\n", shader_struct.name));
    for variable in &shader_struct.variables {
        out.push_str(&format!("\t{} {}", type_name(&variable.vtype, tree)?, variable.name));
        if variable.array_count != 0 {
            out.push_str(&format!("[{}]", variable.array_count));
        }
        out.push_str(";\n");
    }
    out.push_str("};\n");
    guard_end(&mut out);
    Ok(out)
}

fn generate_group(group: &Group, tree: &AbstractSyntaxTree, file_path: &Path) -> Result<String, Error>
{
    let mut out = String::new();
    guard_start(&group.name, &mut out);
    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    for variable in &group.variables {
        add_include(&variable.vtype, tree, base_path, &mut out);
    }
    out.push_str(&format!("struct {} {{\n", group.name));
    for variable in &group.variables {
        out.push_str(&format!("\t{} {}", type_name(&variable.vtype, tree)?, variable.name));
        if variable.array_count > 0 {
            out.push_str(&format!("[{}]", variable.array_count));
        }
        out.push_str(";\n");
    }
    out.push_str("};\n");
    guard_end(&mut out);
    Ok(out)
}

fn generate_shader_input_group(
    input_group: &ShaderInputGroup,
    bindings: &ShaderInputGroupBindings,
    layout: &ShaderInputLayout,
    root_parameter_start: u32,
    tree: &AbstractSyntaxTree,
    file_path: &Path
) -> Result<String, Error>
{
    let mut out = String::new();
    guard_start(&input_group.name, &mut out);
    let base_path = file_path.parent().unwrap_or_else(|| Path::new(""));
    for variable in &input_group.variables {
        add_include(&variable.vtype, tree, base_path, &mut out);
    }

    // Resource declarations with explicit registers. Each root parameter
    // gets its own register space so descriptor offsets can double as base
    // registers.
    for root_parameter in &bindings.root_parameters {
        let root_parameter_index = root_parameter_start + root_parameter.root_parameter_offset;
        let mut register_space = root_parameter_index;
        if layout.options.local_root_signature {
            register_space += LOCAL_ROOT_SIGNATURE_SPACE_OFFSET;
        }
        for descriptor in &root_parameter.descriptor_table.descriptors {
            let base_register = descriptor.descriptor_offset;
            let variable = &input_group.variables[descriptor.variable_idx as usize];
            if variable.vtype == VariableType::ConstantBuffer {
                out.push_str(&format!(
                    "cbuffer CONSTANT_DATA : register(b{}, space{}) {{\n",
                    base_register, register_space
                ));
                for constant in &input_group.variables {
                    if constant.vtype.is_standard_constant() {
                        out.push_str(&format!("\t{} _{}", type_name(&constant.vtype, tree)?, constant.name));
                        if constant.array_count != 0 {
                            out.push_str(&format!("[{}]", constant.array_count));
                        }
                        out.push_str(";\n");
                    }
                }
                out.push_str("};\n");
            } else {
                out.push_str(&format!("{} _{}", type_name(&variable.vtype, tree)?, variable.name));
                if variable.array_count == Variable::UNBOUNDED {
                    out.push_str("[]");
                } else if variable.array_count != 0 {
                    out.push_str(&format!("[{}]", variable.array_count));
                }
                out.push_str(&format!(
                    " : register({}{}, space{});\n",
                    register_letter(&variable.vtype)?,
                    base_register,
                    register_space
                ));
            }
        }
    }

    // Wrapper class exposing getters over the raw declarations.
    out.push_str(&format!("class {} {{\n", input_group.name));
    for variable in &input_group.variables {
        if variable.vtype == VariableType::ConstantBuffer {
            continue;
        }
        if let VariableType::Group(instance) = &variable.vtype {
            let group = &tree.groups[instance.group_index as usize].item;
            out.push_str(&format!(
                "\t{} get{}() {{\n\t\t{} outGroup;\n",
                type_name(&variable.vtype, tree)?,
                title(&variable.name),
                group.name
            ));
            for group_variable in &group.variables {
                let mangled = mangled_group_variable_name(&variable.name, &group_variable.name);
                out.push_str(&format!(
                    "\t\toutGroup.{} = get{}();\n",
                    group_variable.name,
                    title(&mangled)
                ));
            }
            out.push_str("\t\treturn outGroup;\n\t}\n");
            continue;
        }
        out.push_str(&format!("\t{} get{}(", type_name(&variable.vtype, tree)?, title(&variable.name)));
        if variable.array_count != 0 {
            out.push_str("int idx");
        }
        out.push_str(&format!(") {{\n\t\treturn _{}", variable.name));
        if variable.array_count != 0 {
            out.push_str("[idx]");
        }
        out.push_str(";\n\t}\n");
    }
    out.push_str("};\n");
    out.push_str(&format!("{} g_{};\n", input_group.name, not_title(&input_group.name)));

    guard_end(&mut out);
    Ok(out)
}

fn generate_shader_input_layout(layout: &ShaderInputLayout, bindings: &ShaderInputLayoutBindings) -> String
{
    let local_offset = if layout.options.local_root_signature {
        LOCAL_ROOT_SIGNATURE_SPACE_OFFSET
    } else {
        0
    };
    let mut out = String::new();
    guard_start(&layout.name, &mut out);

    // Static samplers live in their own register space, after the spaces
    // claimed by descriptor tables.
    let sampler_space = 500 + local_offset;
    for (register, sampler) in layout.static_samplers.iter().enumerate() {
        let guard = format!("_sampler_{}", sampler.name);
        out.push_str(&format!("#ifndef {}\n#define {}\n", guard, guard));
        out.push_str(&format!(
            "SamplerState g_{} : register(s{}, space{});\n",
            sampler.name, register, sampler_space
        ));
        out.push_str(&format!("#endif // {}\n", guard));
    }
    out.push('\n');

    let constant_space = 501 + local_offset;
    for (root_constant, root_parameter_index) in layout
        .root_constants
        .iter()
        .zip(&bindings.constant_root_parameter_indices)
    {
        let guard = format!("_rootConstant_{}", root_constant.name);
        out.push_str(&format!("#ifndef {}\n#define {}\n", guard, guard));
        out.push_str(&format!(
            "#define ROOT_CONSTANT_{} register(b{}, space{})\n",
            to_upper(&root_constant.name),
            root_parameter_index,
            constant_space
        ));
        out.push_str(&format!("#endif // {}\n", guard));
    }
    out.push('\n');

    let cbv_space = 502 + local_offset;
    for (root_cbv, root_parameter_index) in layout
        .root_constant_buffer_views
        .iter()
        .zip(&bindings.cbv_root_parameter_indices)
    {
        let guard = format!("_rootCBV_{}", root_cbv.name);
        out.push_str(&format!("#ifndef {}\n#define {}\n", guard, guard));
        out.push_str(&format!(
            "#define ROOT_CBV_{} register(b{}, space{})\n",
            root_cbv.name, root_parameter_index, cbv_space
        ));
        out.push_str(&format!("#endif // {}\n", guard));
    }
    out.push('\n');

    guard_end(&mut out);
    out
}

pub fn generate_device_code(tree: &AbstractSyntaxTree, bindings: &ResourceBindingInfo) -> Result<(), Error>
{
    // Constants are clustered into one file per output folder.
    if !tree.constants.is_empty() {
        let mut sorted = tree.constants.clone();
        sorted.sort_by(|lhs, rhs| lhs.metadata.shader_folder.cmp(&rhs.metadata.shader_folder));
        let mut first = 0;
        for last in 0..=sorted.len() {
            if last == sorted.len() || sorted[last].metadata.shader_folder != sorted[first].metadata.shader_folder {
                if sorted[first].metadata.should_export {
                    let cluster: Vec<Constant> =
                        sorted[first..last].iter().map(|constant| constant.item.clone()).collect();
                    commit(
                        constants_file_path(&sorted[first].metadata),
                        generate_constants(&cluster, "CONSTANTS")
                    )?;
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

    for (layout, layout_bindings) in tree.shader_input_layouts.iter().zip(&bindings.shader_input_layouts) {
        for (reference, root_parameter_start) in layout
            .item
            .bind_points
            .iter()
            .zip(&layout_bindings.bind_points_root_parameter_indices)
        {
            let bind_point = &tree.bind_points[reference.bind_point_index as usize];
            let bind_point_bindings = &bindings.bind_points[reference.bind_point_index as usize];
            for (&input_group_idx, input_group_bindings) in bind_point
                .item
                .shader_input_groups
                .iter()
                .zip(&bind_point_bindings.shader_input_groups)
            {
                let input_group = &tree.shader_input_groups[input_group_idx as usize];
                if input_group.metadata.should_export {
                    let file_path = input_group_file_path(input_group, layout);
                    let contents = generate_shader_input_group(
                        &input_group.item,
                        input_group_bindings,
                        &layout.item,
                        *root_parameter_start,
                        tree,
                        &file_path
                    )?;
                    commit(file_path, contents)?;
                }
            }
        }

        if layout.metadata.should_export {
            commit(
                layout_file_path(layout),
                generate_shader_input_layout(&layout.item, layout_bindings)
            )?;
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
    fn include_guards_replace_dots()
    {
        assert_eq!(include_guard_name("Lighting.Sun"), "__Lighting_Sun__");
    }

    #[test]
    fn input_group_declarations()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> albedo;
                float exposure;
            };
            ShaderInputLayout L
            {
                b B { .shaderStages = [pixel] };
            };
        "
        );
        let contents = generate_shader_input_group(
            &tree.shader_input_groups[0].item,
            &bindings.bind_points[0].shader_input_groups[0],
            &tree.shader_input_layouts[0].item,
            0,
            &tree,
            Path::new("/out/inputgroups/L/G.hlsl")
        )
        .unwrap();
        assert!(contents.contains("#ifndef __G__"));
        assert!(contents.contains("cbuffer CONSTANT_DATA : register(b0, space0) {"));
        assert!(contents.contains("\tfloat _exposure;"));
        assert!(contents.contains("Texture2D<float4> _albedo : register(t1, space0);"));
        assert!(contents.contains("class G {"));
        assert!(contents.contains("\tfloat4 getAlbedo() {"));
        assert!(contents.contains("G g_g;"));
    }

    #[test]
    fn local_layout_shifts_register_spaces()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> albedo;
            };
            ShaderInputLayout L<Local>
            {
                b B { .shaderStages = [rt] };
            };
        "
        );
        let contents = generate_shader_input_group(
            &tree.shader_input_groups[0].item,
            &bindings.bind_points[0].shader_input_groups[0],
            &tree.shader_input_layouts[0].item,
            0,
            &tree,
            Path::new("/out/inputgroups/L/G.hlsl")
        )
        .unwrap();
        assert!(contents.contains("register(t0, space500)"));

        let layout_contents =
            generate_shader_input_layout(&tree.shader_input_layouts[0].item, &bindings.shader_input_layouts[0]);
        assert!(layout_contents.contains("#ifndef __L__"));
    }

    #[test]
    fn unbounded_array_declared_without_size()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> textures[];
            };
            ShaderInputLayout L
            {
                b B { .shaderStages = [pixel] };
            };
        "
        );
        let contents = generate_shader_input_group(
            &tree.shader_input_groups[0].item,
            &bindings.bind_points[0].shader_input_groups[0],
            &tree.shader_input_layouts[0].item,
            0,
            &tree,
            Path::new("/out/inputgroups/L/G.hlsl")
        )
        .unwrap();
        assert!(contents.contains("Texture2D<float4> _textures[] : register(t0, space0);"));
        assert!(contents.contains("\tfloat4 getTextures(int idx) {"));
    }

    #[test]
    fn group_getter_reassembles_struct()
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
            ShaderInputLayout L
            {
                b B { .shaderStages = [pixel] };
            };
        "
        );
        let contents = generate_shader_input_group(
            &tree.shader_input_groups[0].item,
            &bindings.bind_points[0].shader_input_groups[0],
            &tree.shader_input_layouts[0].item,
            0,
            &tree,
            Path::new("/out/inputgroups/L/G.hlsl")
        )
        .unwrap();
        assert!(contents.contains("\tShadows getShadows() {"));
        assert!(contents.contains("\t\toutGroup.map = get__shadows_map();"));
        assert!(contents.contains("\t\toutGroup.bias = get__shadows_bias();"));
        assert!(contents.contains("Texture2D<float> ___shadows_map : register("));
    }

    #[test]
    fn layout_file_declares_samplers_and_roots()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> t;
            };
            ShaderInputLayout L
            {
                StaticSampler linear { .Filter = \"D3D12_FILTER_MIN_MAG_MIP_LINEAR\" };
                RootConstant push { .shaderStages = [vertex], .num32BitValues = 4 };
                RootCBV view { .shaderStages = [vertex] };
                b B { .shaderStages = [pixel] };
            };
        "
        );
        let contents =
            generate_shader_input_layout(&tree.shader_input_layouts[0].item, &bindings.shader_input_layouts[0]);
        assert!(contents.contains("SamplerState g_linear : register(s0, space500);"));
        assert!(contents.contains("#define ROOT_CONSTANT_PUSH register(b0, space501)"));
        assert!(contents.contains("#define ROOT_CBV_view register(b1, space502)"));
    }

    #[test]
    fn struct_includes_referenced_structs()
    {
        let (tree, _) = compile(
            b"
            struct Inner { float4 color; };
            struct Outer { Inner inner; float4 extra[2]; };
        "
        );
        // Give both structs an export folder so paths resolve.
        let mut tree = tree;
        for shader_struct in &mut tree.structs {
            shader_struct.metadata.shader_folder = PathBuf::from("/out");
        }
        let file_path = struct_file_path(&tree.structs[1]);
        let contents = generate_struct(&tree.structs[1].item, &tree, &file_path).unwrap();
        assert!(contents.contains("#include \"Inner.hlsl\""));
        assert!(contents.contains("struct Outer {"));
        assert!(contents.contains("\tInner inner;"));
        assert!(contents.contains("\tfloat4 extra[2];"));
    }
}
