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

use std::collections::{HashMap, HashSet};
use std::mem;

use crate::{
    ast::{
        error::Error,
        tree::{
            AbstractSyntaxTree,
            BasicType,
            BindPoint,
            Constant,
            Group,
            GroupInstance,
            Metadata,
            ShaderInputGroup,
            ShaderInputLayout,
            Struct,
            StructInstance,
            StructuredType,
            Variable,
            VariableType,
            WithMetadata
        }
    },
    parser::tree::{ParseTree, Statement}
};

/// HLSL spellings accepted as leaf types without any prior declaration.
const BASIC_TYPES: [&str; 22] = [
    "bool", "half2", "float", "float2", "float3", "float4", "float3x3", "float4x4", "int", "int32_t", "int64_t",
    "int2", "int3", "int4", "uint", "uint8_t", "uint16_t", "uint32_t", "uint64_t", "uint2", "uint3", "uint4"
];

/// Build the flat AST tables from a parse tree, inlining included sub-trees
/// in source order.
pub fn build_ast(parse_tree: ParseTree) -> Result<AbstractSyntaxTree, Error>
{
    let mut builder = AstBuilder::new();
    builder.import(parse_tree)?;
    Ok(builder.into_tree())
}

pub struct AstBuilder
{
    ast: AbstractSyntaxTree,
    metadata: Metadata,
    types: HashMap<String, VariableType>,
    bind_points: HashMap<String, u32>,
    shader_input_layouts: HashSet<String>,
    shader_input_groups: HashSet<String>,
    groups: HashSet<String>
}

impl Default for AstBuilder
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl AstBuilder
{
    pub fn new() -> AstBuilder
    {
        let mut types = HashMap::new();
        for name in BASIC_TYPES {
            types.insert(
                name.into(),
                VariableType::Basic(BasicType {
                    hlsl_type: name.into()
                })
            );
        }
        AstBuilder {
            ast: AbstractSyntaxTree::default(),
            metadata: Metadata::default(),
            types,
            bind_points: HashMap::new(),
            shader_input_layouts: HashSet::new(),
            shader_input_groups: HashSet::new(),
            groups: HashSet::new()
        }
    }

    pub fn import(&mut self, parse_tree: ParseTree) -> Result<(), Error>
    {
        let old_metadata = mem::replace(&mut self.metadata, parse_tree.output);
        for statement in parse_tree.statements {
            match statement {
                Statement::Include(sub_tree) => self.import(*sub_tree)?,
                Statement::BindPoint(bind_point) => self.add_bind_point(bind_point)?,
                Statement::ShaderInputLayout(layout) => self.add_shader_input_layout(layout)?,
                Statement::Group(group) => self.add_group(group)?,
                Statement::ShaderInputGroup(input_group) => self.add_shader_input_group(input_group)?,
                Statement::Struct(shader_struct) => self.add_struct(shader_struct)?,
                Statement::Constant(constant) => self.add_constant(constant)
            }
        }
        self.metadata = old_metadata;
        Ok(())
    }

    pub fn into_tree(self) -> AbstractSyntaxTree
    {
        self.ast
    }

    fn add_bind_point(&mut self, bind_point: BindPoint) -> Result<(), Error>
    {
        if self.bind_points.contains_key(&bind_point.name) {
            return Err(Error::DuplicateBindPoint(bind_point.name));
        }
        self.bind_points
            .insert(bind_point.name.clone(), self.ast.bind_points.len() as u32);
        self.ast
            .bind_points
            .push(WithMetadata::new(self.metadata.clone(), bind_point));
        Ok(())
    }

    fn add_shader_input_layout(&mut self, mut layout: ShaderInputLayout) -> Result<(), Error>
    {
        let mut names = HashSet::new();
        for reference in &mut layout.bind_points {
            if !names.insert(reference.name.clone()) {
                return Err(Error::DuplicateBindPointReference {
                    layout: layout.name,
                    name: reference.name.clone()
                });
            }
            match self.bind_points.get(&reference.bind_point_name) {
                Some(&index) => reference.bind_point_index = index,
                None => return Err(Error::UnknownBindPoint(reference.bind_point_name.clone()))
            }
        }
        if !self.shader_input_layouts.insert(layout.name.clone()) {
            return Err(Error::DuplicateShaderInputLayout(layout.name));
        }
        self.ast
            .shader_input_layouts
            .push(WithMetadata::new(self.metadata.clone(), layout));
        Ok(())
    }

    fn add_struct(&mut self, mut shader_struct: Struct) -> Result<(), Error>
    {
        for variable in &mut shader_struct.variables {
            self.resolve_type(variable)?;
            if !variable.vtype.is_standard_constant() {
                return Err(Error::BadStructMember {
                    structure: shader_struct.name,
                    member: variable.name.clone()
                });
            }
            if variable.array_count == Variable::UNBOUNDED {
                return Err(Error::UnboundedArray {
                    owner: shader_struct.name,
                    member: variable.name.clone()
                });
            }
        }
        self.add_type(
            shader_struct.name.clone(),
            VariableType::Struct(StructInstance {
                struct_index: self.ast.structs.len() as u32
            })
        )?;
        self.ast
            .structs
            .push(WithMetadata::new(self.metadata.clone(), shader_struct));
        Ok(())
    }

    fn add_group(&mut self, mut group: Group) -> Result<(), Error>
    {
        for variable in &mut group.variables {
            self.resolve_type(variable)?;
            if variable.array_count == Variable::UNBOUNDED {
                return Err(Error::UnboundedArray {
                    owner: group.name,
                    member: variable.name.clone()
                });
            }
        }
        if !self.groups.insert(group.name.clone()) {
            return Err(Error::DuplicateGroup(group.name));
        }
        self.add_type(
            group.name.clone(),
            VariableType::Group(GroupInstance {
                group_index: self.ast.groups.len() as u32
            })
        )?;
        self.ast.groups.push(WithMetadata::new(self.metadata.clone(), group));
        Ok(())
    }

    fn add_shader_input_group(&mut self, mut input_group: ShaderInputGroup) -> Result<(), Error>
    {
        for variable in &mut input_group.variables {
            self.resolve_type(variable)?;
        }
        if !self.shader_input_groups.insert(input_group.name.clone()) {
            return Err(Error::DuplicateShaderInputGroup(input_group.name));
        }
        match self.bind_points.get(&input_group.bind_point_name) {
            Some(&index) => {
                input_group.bind_point_index = index;
                self.ast.bind_points[index as usize]
                    .item
                    .shader_input_groups
                    .push(self.ast.shader_input_groups.len() as u32);
                self.ast
                    .shader_input_groups
                    .push(WithMetadata::new(self.metadata.clone(), input_group));
                Ok(())
            },
            None => Err(Error::UnknownBindPoint(input_group.bind_point_name))
        }
    }

    fn add_constant(&mut self, constant: Constant)
    {
        self.ast
            .constants
            .push(WithMetadata::new(self.metadata.clone(), constant));
    }

    fn add_type(&mut self, name: String, vtype: VariableType) -> Result<(), Error>
    {
        if self.types.contains_key(&name) {
            return Err(Error::TypeRedefinition(name));
        }
        self.types.insert(name, vtype);
        Ok(())
    }

    fn resolve_structured(&self, data_type: &mut StructuredType) -> Result<(), Error>
    {
        if let StructuredType::Unresolved(name) = &*data_type {
            let resolved = match self.types.get(name) {
                Some(VariableType::Basic(basic)) => StructuredType::Basic(basic.clone()),
                Some(VariableType::Struct(instance)) => StructuredType::Struct(*instance),
                Some(_) => return Err(Error::BadStructuredType(name.clone())),
                None => return Err(Error::UnknownType(name.clone()))
            };
            *data_type = resolved;
        }
        Ok(())
    }

    fn resolve_type(&self, variable: &mut Variable) -> Result<(), Error>
    {
        if let VariableType::Unresolved(name) = &variable.vtype {
            let vtype = self
                .types
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownType(name.clone()))?;
            variable.vtype = vtype;
            return Ok(());
        }
        match &mut variable.vtype {
            VariableType::StructuredBuffer(data_type) | VariableType::RwStructuredBuffer(data_type) => {
                self.resolve_structured(data_type)
            },
            _ => Ok(())
        }
    }
}
