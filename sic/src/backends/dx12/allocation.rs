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

//! Register planning: flattens group instances into their containing shader
//! input groups, injects the synthetic constant buffer slot, then assigns
//! every descriptor-consuming variable to a descriptor table per bind point
//! and lays out root parameter indices per shader input layout.

use sil::ast::tree::{AbstractSyntaxTree, Variable, VariableType};

use crate::backends::dx12::{
    register::{register_type, RegisterType, NUM_REGISTER_TYPES},
    table::{DescriptorTable, DescriptorTableAllocator, DescriptorTableLayout}
};
use crate::error::Error;

/// Name of the synthetic variable standing in for the constant buffer of a
/// shader input group.
pub const CONSTANT_BUFFER_VARIABLE: &str = "Internal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootParameterBinding
{
    pub root_parameter_offset: u32,
    pub descriptor_table: DescriptorTable
}

/// Root parameters one shader input group populates on its bind point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInputGroupBindings
{
    pub root_parameters: Vec<RootParameterBinding>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootParameterLayout
{
    pub root_parameter_offset: u32,
    pub descriptor_table_layout: DescriptorTableLayout
}

/// Per-bind-point plan: the group-independent root parameter layout plus the
/// populated tables of every input group bound to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindPointBindings
{
    pub root_parameters: Vec<RootParameterLayout>,
    pub shader_input_groups: Vec<ShaderInputGroupBindings>
}

/// Root parameter indices assigned to a shader input layout: all root
/// constants first, then all root CBVs, then the tables of each referenced
/// bind point in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInputLayoutBindings
{
    pub constant_root_parameter_indices: Vec<u32>,
    pub cbv_root_parameter_indices: Vec<u32>,
    pub bind_points_root_parameter_indices: Vec<u32>
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceBindingInfo
{
    pub bind_points: Vec<BindPointBindings>,
    pub shader_input_layouts: Vec<ShaderInputLayoutBindings>
}

pub fn mangled_group_variable_name(group_instance_name: &str, variable_name: &str) -> String
{
    format!("__{}_{}", group_instance_name, variable_name)
}

/// Inline the members of instantiated groups into their containing shader
/// input groups under mangled names. The group instance variable itself
/// stays in place; later passes skip it.
fn flatten_input_groups(tree: &mut AbstractSyntaxTree) -> Result<(), Error>
{
    for input_group_idx in 0..tree.shader_input_groups.len() {
        // Only loop over the original variables; not the ones added while
        // flattening.
        let num_variables = tree.shader_input_groups[input_group_idx].item.variables.len();
        for variable_idx in 0..num_variables {
            let variable = tree.shader_input_groups[input_group_idx].item.variables[variable_idx].clone();
            let group_index = match variable.vtype {
                VariableType::Group(instance) => instance.group_index,
                _ => continue
            };
            let input_group_name = tree.shader_input_groups[input_group_idx].item.name.clone();
            if variable.array_count != 0 {
                return Err(Error::GroupInstanceArray {
                    variable: variable.name,
                    input_group: input_group_name
                });
            }

            let group = tree.groups[group_index as usize].item.clone();
            for group_variable in group.variables {
                if group_variable.vtype.is_group_instance() {
                    return Err(Error::NestedGroup {
                        group: group.name,
                        input_group: input_group_name
                    });
                }
                tree.shader_input_groups[input_group_idx].item.variables.push(Variable {
                    name: mangled_group_variable_name(&variable.name, &group_variable.name),
                    vtype: group_variable.vtype,
                    array_count: group_variable.array_count
                });
            }
        }
    }
    Ok(())
}

/// Combine all basic/struct constants of each input group into a single
/// constant buffer, represented by one synthetic marker variable.
fn inject_constant_buffers(tree: &mut AbstractSyntaxTree)
{
    for input_group in &mut tree.shader_input_groups {
        let has_constants = input_group
            .item
            .variables
            .iter()
            .any(|variable| variable.vtype.is_standard_constant());
        if has_constants {
            input_group.item.variables.push(Variable {
                name: CONSTANT_BUFFER_VARIABLE.into(),
                vtype: VariableType::ConstantBuffer,
                array_count: 0
            });
        }
    }
}

fn descriptor_class(variable: &Variable, input_group_name: &str) -> Result<RegisterType, Error>
{
    register_type(&variable.vtype).ok_or_else(|| {
        Error::Internal(format!(
            "no register class for variable `{}` of ShaderInputGroup `{}`",
            variable.name, input_group_name
        ))
    })
}

pub fn allocate_registers(tree: &mut AbstractSyntaxTree) -> Result<ResourceBindingInfo, Error>
{
    flatten_input_groups(tree)?;
    inject_constant_buffers(tree);

    let mut out = ResourceBindingInfo::default();
    for bind_point in &tree.bind_points {
        // Maximum register requirements (per register class) over the input
        // groups bound here.
        let mut num_bounded = [0u32; NUM_REGISTER_TYPES];
        let mut num_unbounded = [0u32; NUM_REGISTER_TYPES];
        for &input_group_idx in &bind_point.item.shader_input_groups {
            let input_group = &tree.shader_input_groups[input_group_idx as usize].item;
            let mut group_bounded = [0u32; NUM_REGISTER_TYPES];
            let mut group_unbounded = [0u32; NUM_REGISTER_TYPES];
            for variable in &input_group.variables {
                // Constants are allocated through the injected constant
                // buffer; group instances through their flattened copies.
                if variable.vtype.is_standard_constant() || variable.vtype.is_group_instance() {
                    continue;
                }
                let class = descriptor_class(variable, &input_group.name)?;
                if variable.array_count == Variable::UNBOUNDED {
                    group_unbounded[class.index()] += 1;
                } else {
                    group_bounded[class.index()] += variable.array_count.max(1);
                }
            }
            if group_unbounded.iter().any(|&count| count > 1) {
                return Err(Error::MultipleUnbounded(input_group.name.clone()));
            }
            for i in 0..NUM_REGISTER_TYPES {
                num_bounded[i] = num_bounded[i].max(group_bounded[i]);
                num_unbounded[i] = num_unbounded[i].max(group_unbounded[i]);
            }
        }

        // One table per unbounded range. The first table also takes every
        // bounded descriptor; the remaining ones hold only their unbounded
        // range. A final table picks up bounded leftovers if no unbounded
        // table consumed them.
        let mut allocators = Vec::new();
        for class_idx in 0..NUM_REGISTER_TYPES {
            for _ in 0..num_unbounded[class_idx] {
                let mut descriptors = num_bounded;
                descriptors[class_idx] = Variable::UNBOUNDED;
                num_bounded = [0u32; NUM_REGISTER_TYPES];
                allocators.push(DescriptorTableAllocator::new(&descriptors));
            }
        }
        if num_bounded.iter().sum::<u32>() > 0 {
            allocators.push(DescriptorTableAllocator::new(&num_bounded));
        }

        let mut bind_point_bindings = BindPointBindings::default();
        for &input_group_idx in &bind_point.item.shader_input_groups {
            for allocator in &mut allocators {
                allocator.begin_input_group();
            }

            let input_group = &tree.shader_input_groups[input_group_idx as usize].item;
            // Allocate in ascending arrayCount order so bounded variables
            // always land before the unbounded one in their range.
            let variables = &input_group.variables;
            let mut variable_indices: Vec<u32> = (0..variables.len() as u32).collect();
            variable_indices.sort_by_key(|&idx| variables[idx as usize].array_count);
            for variable_idx in variable_indices {
                let variable = &variables[variable_idx as usize];
                if variable.vtype.is_standard_constant() || variable.vtype.is_group_instance() {
                    continue;
                }
                let class = descriptor_class(variable, &input_group.name)?;
                let placed = allocators
                    .iter_mut()
                    .any(|allocator| allocator.try_allocate(class, variable.array_count, variable_idx));
                if !placed {
                    return Err(Error::NoTableFits {
                        variable: variable.name.clone(),
                        input_group: input_group.name.clone()
                    });
                }
            }

            let mut input_group_bindings = ShaderInputGroupBindings::default();
            for (root_parameter_offset, allocator) in allocators.iter().enumerate() {
                if let Some(descriptor_table) = allocator.table() {
                    input_group_bindings.root_parameters.push(RootParameterBinding {
                        root_parameter_offset: root_parameter_offset as u32,
                        descriptor_table
                    });
                }
            }
            bind_point_bindings.shader_input_groups.push(input_group_bindings);
        }

        for (root_parameter_offset, allocator) in allocators.iter().enumerate() {
            bind_point_bindings.root_parameters.push(RootParameterLayout {
                root_parameter_offset: root_parameter_offset as u32,
                descriptor_table_layout: allocator.layout()
            });
        }
        out.bind_points.push(bind_point_bindings);
    }

    for layout in &tree.shader_input_layouts {
        let mut root_parameter_index = 0u32;
        let mut layout_bindings = ShaderInputLayoutBindings::default();
        for _ in &layout.item.root_constants {
            layout_bindings.constant_root_parameter_indices.push(root_parameter_index);
            root_parameter_index += 1;
        }
        for _ in &layout.item.root_constant_buffer_views {
            layout_bindings.cbv_root_parameter_indices.push(root_parameter_index);
            root_parameter_index += 1;
        }
        for reference in &layout.item.bind_points {
            layout_bindings
                .bind_points_root_parameter_indices
                .push(root_parameter_index);
            root_parameter_index += out.bind_points[reference.bind_point_index as usize].root_parameters.len() as u32;
        }
        out.shader_input_layouts.push(layout_bindings);
    }

    Ok(out)
}

#[cfg(test)]
mod tests
{
    use sil::ast::build_ast;
    use sil::ast::tree::Metadata;
    use sil::parser::{tree::ParseTree, Context, Parser};
    use sil::Lexer;

    use super::*;

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
    fn single_srv_gets_one_table()
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
        assert_eq!(tree.bind_points[0].item.name, "B");
        assert_eq!(tree.shader_input_groups[0].item.bind_point_index, 0);

        let bind_point = &bindings.bind_points[0];
        assert_eq!(bind_point.root_parameters.len(), 1);
        let layout = &bind_point.root_parameters[0].descriptor_table_layout;
        assert_eq!(layout.ranges.len(), 1);
        assert_eq!(layout.ranges[0].register_type, RegisterType::ShaderResource);
        assert_eq!(layout.ranges[0].num_descriptors, 1);
        assert_eq!(layout.ranges[0].base_descriptor_offset, 0);

        let table = &bind_point.shader_input_groups[0].root_parameters[0].descriptor_table;
        assert_eq!(table.descriptors.len(), 1);
        assert_eq!(table.descriptors[0].descriptor_offset, 0);
        assert_eq!(table.descriptors[0].num_descriptors, 1);
        assert_eq!(table.num_known_descriptors, 1);
    }

    #[test]
    fn unbounded_after_bounded()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> a;
                Texture2D<float4> b[];
            };
        "
        );
        let bind_point = &bindings.bind_points[0];
        assert_eq!(bind_point.root_parameters.len(), 1);

        let variables = &tree.shader_input_groups[0].item.variables;
        let table = &bind_point.shader_input_groups[0].root_parameters[0].descriptor_table;
        assert_eq!(table.num_known_descriptors, 1);
        let b_idx = table.unbounded_variable_idx.unwrap();
        assert_eq!(variables[b_idx as usize].name, "b");

        let a_binding = table
            .descriptors
            .iter()
            .find(|binding| variables[binding.variable_idx as usize].name == "a")
            .unwrap();
        let b_binding = table
            .descriptors
            .iter()
            .find(|binding| variables[binding.variable_idx as usize].name == "b")
            .unwrap();
        assert_eq!(a_binding.descriptor_offset, 0);
        assert_eq!(a_binding.num_descriptors, 1);
        assert_eq!(b_binding.descriptor_offset, 1);
        assert_eq!(b_binding.num_descriptors, Variable::UNBOUNDED);
    }

    #[test]
    fn two_groups_with_different_unbounded_classes()
    {
        let (_, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup X<BindTo=B>
            {
                Texture2D<float4> textures[];
            };
            ShaderInputGroup Y<BindTo=B>
            {
                RWTexture2D<float4> outputs[];
            };
        "
        );
        let bind_point = &bindings.bind_points[0];
        // One table per unbounded class; the layout is shared by both groups.
        assert_eq!(bind_point.root_parameters.len(), 2);
        let srv_layout = &bind_point.root_parameters[0].descriptor_table_layout;
        let uav_layout = &bind_point.root_parameters[1].descriptor_table_layout;
        assert_eq!(srv_layout.ranges.len(), 1);
        assert_eq!(srv_layout.ranges[0].register_type, RegisterType::ShaderResource);
        assert_eq!(uav_layout.ranges.len(), 1);
        assert_eq!(uav_layout.ranges[0].register_type, RegisterType::UnorderedAccess);

        // Each group populates exactly the table of its class.
        let x_bindings = &bind_point.shader_input_groups[0];
        assert_eq!(x_bindings.root_parameters.len(), 1);
        assert_eq!(x_bindings.root_parameters[0].root_parameter_offset, 0);
        let y_bindings = &bind_point.shader_input_groups[1];
        assert_eq!(y_bindings.root_parameters.len(), 1);
        assert_eq!(y_bindings.root_parameters[0].root_parameter_offset, 1);
    }

    #[test]
    fn constant_buffer_injection()
    {
        let (tree, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                float4 color;
            };
        "
        );
        let variables = &tree.shader_input_groups[0].item.variables;
        assert_eq!(variables.len(), 2);
        assert_eq!(variables[0].name, "color");
        assert_eq!(variables[1].name, CONSTANT_BUFFER_VARIABLE);
        assert_eq!(variables[1].vtype, VariableType::ConstantBuffer);

        let bind_point = &bindings.bind_points[0];
        assert_eq!(bind_point.root_parameters.len(), 1);
        let layout = &bind_point.root_parameters[0].descriptor_table_layout;
        assert_eq!(layout.ranges.len(), 1);
        assert_eq!(layout.ranges[0].register_type, RegisterType::ConstantBuffer);
        assert_eq!(layout.ranges[0].num_descriptors, 1);

        let table = &bind_point.shader_input_groups[0].root_parameters[0].descriptor_table;
        assert_eq!(table.descriptors.len(), 1);
        assert_eq!(table.descriptors[0].variable_idx, 1);
    }

    #[test]
    fn group_flattening_mangles_names()
    {
        let (tree, bindings) = compile(
            b"
            Group Shadows
            {
                Texture2D<float> cascades[4];
                float bias;
            };
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Shadows shadows;
            };
        "
        );
        let variables = &tree.shader_input_groups[0].item.variables;
        let names: Vec<&str> = variables.iter().map(|variable| &*variable.name).collect();
        assert_eq!(names, vec!["shadows", "__shadows_cascades", "__shadows_bias", "Internal"]);
        // The group instance itself is skipped by the allocator.
        let table = &bindings.bind_points[0].shader_input_groups[0].root_parameters[0].descriptor_table;
        for binding in &table.descriptors {
            assert_ne!(binding.variable_idx, 0);
        }
    }

    #[test]
    fn layout_root_parameter_ordering()
    {
        let (_, bindings) = compile(
            b"
            BindPoint First {};
            BindPoint Second {};
            ShaderInputGroup A<BindTo=First>
            {
                Texture2D<float4> textures[];
                RWTexture2D<float4> outputs[];
            };
            ShaderInputGroup C<BindTo=Second>
            {
                Texture2D<float4> t;
            };
            ShaderInputLayout L
            {
                RootConstant push { .shaderStages = [vertex], .num32BitValues = 4 };
                RootCBV view { .shaderStages = [vertex, pixel] };
                first First { .shaderStages = [pixel] };
                second Second { .shaderStages = [pixel] };
            };
        "
        );
        // First needs two tables (two unbounded classes), Second one.
        assert_eq!(bindings.bind_points[0].root_parameters.len(), 2);
        assert_eq!(bindings.bind_points[1].root_parameters.len(), 1);

        let layout = &bindings.shader_input_layouts[0];
        assert_eq!(layout.constant_root_parameter_indices, vec![0]);
        assert_eq!(layout.cbv_root_parameter_indices, vec![1]);
        assert_eq!(layout.bind_points_root_parameter_indices, vec![2, 4]);
    }

    #[test]
    fn bounded_order_independence()
    {
        let forward = b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> a;
                Texture2D<float4> b[3];
                ByteAddressBuffer c;
            };
        ";
        let backward = b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                ByteAddressBuffer c;
                Texture2D<float4> b[3];
                Texture2D<float4> a;
            };
        ";
        let (_, bindings_fwd) = compile(forward);
        let (_, bindings_bwd) = compile(backward);
        let layout_fwd = &bindings_fwd.bind_points[0].root_parameters[0].descriptor_table_layout;
        let layout_bwd = &bindings_bwd.bind_points[0].root_parameters[0].descriptor_table_layout;
        assert_eq!(layout_fwd, layout_bwd);
        let table_fwd = &bindings_fwd.bind_points[0].shader_input_groups[0].root_parameters[0].descriptor_table;
        let table_bwd = &bindings_bwd.bind_points[0].shader_input_groups[0].root_parameters[0].descriptor_table;
        assert_eq!(table_fwd.num_known_descriptors, table_bwd.num_known_descriptors);
    }

    #[test]
    fn no_overlapping_descriptors()
    {
        let (_, bindings) = compile(
            b"
            struct Light { float3 position; float intensity; };
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> albedo;
                Texture2D<float4> normals[2];
                RWByteAddressBuffer scratch;
                StructuredBuffer<Light> lights[];
                float exposure;
            };
        "
        );
        for root_parameter in &bindings.bind_points[0].shader_input_groups[0].root_parameters {
            let table = &root_parameter.descriptor_table;
            let mut intervals: Vec<(u64, u64)> = table
                .descriptors
                .iter()
                .map(|binding| {
                    let start = binding.descriptor_offset as u64;
                    let count = if binding.num_descriptors == Variable::UNBOUNDED {
                        1
                    } else {
                        binding.num_descriptors as u64
                    };
                    (start, start + count)
                })
                .collect();
            intervals.sort();
            for pair in intervals.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlapping descriptors: {:?}", intervals);
            }
        }
    }

    #[test]
    fn layout_is_group_independent()
    {
        let (_, bindings) = compile(
            b"
            BindPoint B {};
            ShaderInputGroup X<BindTo=B>
            {
                Texture2D<float4> a;
                Texture2D<float4> b;
            };
            ShaderInputGroup Y<BindTo=B>
            {
                ByteAddressBuffer raw;
            };
        "
        );
        let bind_point = &bindings.bind_points[0];
        // Both groups observe the same root parameter count and ranges.
        assert_eq!(bind_point.shader_input_groups.len(), 2);
        assert_eq!(bind_point.root_parameters.len(), 1);
        assert_eq!(
            bind_point.root_parameters[0].descriptor_table_layout.ranges[0].num_descriptors,
            2
        );
    }

    #[test]
    fn nested_group_fails()
    {
        let mut lexer = Lexer::new();
        lexer
            .process(
                b"
            Group Inner { float4 color; };
            Group Outer { Inner inner; };
            BindPoint B {};
            ShaderInputGroup G<BindTo=B> { Outer outer; };
        "
            )
            .unwrap();
        let mut parser = Parser::new(lexer);
        let mut ctx = Context::new();
        let statements = parser.parse(&mut ctx).unwrap();
        let mut tree = build_ast(ParseTree {
            output: Metadata::default(),
            statements
        })
        .unwrap();
        let err = allocate_registers(&mut tree).unwrap_err();
        assert!(matches!(err, Error::NestedGroup { .. }));
    }

    #[test]
    fn two_unbounded_same_class_fails()
    {
        let mut lexer = Lexer::new();
        lexer
            .process(
                b"
            BindPoint B {};
            ShaderInputGroup G<BindTo=B>
            {
                Texture2D<float4> a[];
                Texture2D<float4> b[];
            };
        "
            )
            .unwrap();
        let mut parser = Parser::new(lexer);
        let mut ctx = Context::new();
        let statements = parser.parse(&mut ctx).unwrap();
        let mut tree = build_ast(ParseTree {
            output: Metadata::default(),
            statements
        })
        .unwrap();
        let err = allocate_registers(&mut tree).unwrap_err();
        assert!(matches!(err, Error::MultipleUnbounded(_)));
    }
}
