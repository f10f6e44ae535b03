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

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    path::{Path, PathBuf}
};

use crate::{
    ast::tree as ast,
    lexer::{
        token::{Token, Type as TokenType},
        Lexer,
        TokenEntry
    },
    parser::{
        error::{Error, Type},
        tree
    }
};

struct FileScope
{
    output: ast::Metadata,
    parent_path: PathBuf
}

/// Parse-time state shared by a whole compile: the include stack carrying
/// the current file's parent directory and output metadata, and the
/// `#constant` table readable by later array sizes. Lives for one call tree
/// rooted at [`parse_file`].
pub struct Context
{
    stack: Vec<FileScope>,
    constants: HashMap<String, i64>
}

impl Default for Context
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Context
{
    pub fn new() -> Context
    {
        Context {
            stack: Vec::new(),
            constants: HashMap::new()
        }
    }

    pub fn constant(&self, name: &str) -> Option<i64>
    {
        self.constants.get(name).copied()
    }

    fn parent_path(&self) -> PathBuf
    {
        self.stack
            .last()
            .map(|scope| scope.parent_path.clone())
            .unwrap_or_default()
    }

    fn set_output(&mut self, cpp_rel: &str, shader_rel: &str)
    {
        let is_root = self.stack.len() == 1;
        if let Some(scope) = self.stack.last_mut() {
            scope.output.cpp_folder = absolute_path(scope.parent_path.join(cpp_rel));
            scope.output.shader_folder = absolute_path(scope.parent_path.join(shader_rel));
            scope.output.should_export = is_root;
        }
    }
}

fn absolute_path(path: PathBuf) -> PathBuf
{
    std::path::absolute(&path).unwrap_or(path)
}

/// Parse a `.si` file, recursing into its `#include`s. The same file may be
/// included more than once; cycles are not detected.
pub fn parse_file(path: &Path, ctx: &mut Context) -> Result<tree::ParseTree, Error>
{
    let code = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let parent_path = path.parent().unwrap_or_else(|| Path::new(".")).to_owned();
    let scope = match ctx.stack.last() {
        None => FileScope {
            output: ast::Metadata {
                should_export: true,
                ..Default::default()
            },
            parent_path
        },
        // Included files inherit the active output folders but never the
        // export flag; only root items have code generated for them.
        Some(top) => FileScope {
            output: ast::Metadata {
                should_export: false,
                ..top.output.clone()
            },
            parent_path
        }
    };
    ctx.stack.push(scope);
    let result = parse_buffer(&code, ctx);
    // Pop unconditionally so a failed include leaves the stack balanced.
    let scope = ctx.stack.pop();
    let statements = result.map_err(|e| e.with_file(path))?;
    let output = scope.map(|s| s.output).unwrap_or_default();
    Ok(tree::ParseTree { output, statements })
}

fn parse_buffer(code: &[u8], ctx: &mut Context) -> Result<Vec<tree::Statement>, Error>
{
    let mut lexer = Lexer::new();
    lexer.process(code)?;
    let mut parser = Parser::new(lexer);
    parser.parse(ctx)
}

pub struct Parser
{
    tokens: VecDeque<TokenEntry>,
    cur_line: usize,
    cur_column: usize
}

impl Parser
{
    pub fn new(lexer: Lexer) -> Parser
    {
        Parser {
            tokens: lexer.into_tokens(),
            cur_line: 0,
            cur_column: 0
        }
    }

    fn pop(&mut self) -> Result<Token, Error>
    {
        if let Some(entry) = self.tokens.pop_front() {
            self.cur_line = entry.line;
            self.cur_column = entry.col;
            Ok(entry.token)
        } else {
            Err(Error::new(self.cur_line, self.cur_column, Type::Eof))
        }
    }

    fn pop_expect(&mut self, ttype: TokenType) -> Result<Token, Error>
    {
        let token = self.pop()?;
        if token.get_type() != ttype {
            Err(Error::new(
                self.cur_line,
                self.cur_column,
                Type::UnexpectedToken {
                    expected: ttype,
                    actual: token
                }
            ))
        } else {
            Ok(token)
        }
    }

    fn unexpected<T, E: AsRef<[TokenType]>>(&self, expected: E, actual: Token) -> Result<T, Error>
    {
        Err(Error::new(
            self.cur_line,
            self.cur_column,
            Type::UnexpectedToken {
                expected: TokenType::combined(expected),
                actual
            }
        ))
    }

    fn check_block_end(&mut self) -> Result<bool, Error>
    {
        if let Some(TokenEntry { token, .. }) = self.tokens.front() {
            if token == &Token::BlockEnd {
                self.pop()?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn front_is(&self, ttype: TokenType) -> bool
    {
        self.tokens
            .front()
            .map(|entry| entry.token.get_type() == ttype)
            .unwrap_or(false)
    }

    fn parse_directive(&mut self, name: String, ctx: &mut Context) -> Result<Option<tree::Statement>, Error>
    {
        match &*name {
            "include" => {
                let token = self.pop_expect(TokenType::Str)?;
                let file_name = token.string().unwrap(); // SAFETY: we have tested for string in pop_expect so no panic possible here!
                let path = ctx.parent_path().join(file_name);
                let sub_tree = parse_file(&path, ctx)?;
                Ok(Some(tree::Statement::Include(Box::new(sub_tree))))
            },
            "output" => {
                let cpp_rel = self.pop_expect(TokenType::Str)?.string().unwrap(); // SAFETY: see above
                let shader_rel = self.pop_expect(TokenType::Str)?.string().unwrap(); // SAFETY: see above
                ctx.set_output(&cpp_rel, &shader_rel);
                Ok(None)
            },
            "constant" => {
                let token = self.pop_expect(TokenType::Identifier)?;
                let name = token.identifier().unwrap(); // SAFETY: see above
                let value = self.pop_expect(TokenType::Int)?.int().unwrap(); // SAFETY: see above
                // Redefinition overwrites.
                ctx.constants.insert(name.clone(), value);
                Ok(Some(tree::Statement::Constant(ast::Constant { name, value })))
            },
            _ => Err(Error::new(self.cur_line, self.cur_column, Type::UnknownDirective(name)))
        }
    }

    fn parse_bind_point(&mut self) -> Result<ast::BindPoint, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        self.pop_expect(TokenType::BlockEnd)?;
        self.pop_expect(TokenType::Break)?;
        Ok(ast::BindPoint {
            name,
            shader_input_groups: Vec::new()
        })
    }

    fn parse_shader_stages(&mut self) -> Result<Vec<ast::ShaderStage>, Error>
    {
        self.pop_expect(TokenType::Dot)?;
        let token = self.pop_expect(TokenType::Identifier)?;
        let field = token.identifier().unwrap(); // SAFETY: see above
        if field != "shaderStages" {
            return Err(Error::new(self.cur_line, self.cur_column, Type::UnknownOption(field)));
        }
        self.pop_expect(TokenType::Eq)?;
        self.pop_expect(TokenType::ArrayStart)?;
        let mut stages = Vec::new();
        loop {
            let token = self.pop_expect(TokenType::Identifier)?;
            let name = token.identifier().unwrap(); // SAFETY: see above
            match ast::ShaderStage::from_keyword(&name) {
                Some(stage) => stages.push(stage),
                None => return Err(Error::new(self.cur_line, self.cur_column, Type::UnknownShaderStage(name)))
            }
            match self.pop()? {
                Token::Comma => (),
                Token::ArrayEnd => break,
                token => return self.unexpected([TokenType::Comma, TokenType::ArrayEnd], token)
            }
        }
        Ok(stages)
    }

    fn parse_static_sampler(&mut self) -> Result<ast::StaticSampler, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        let mut options = BTreeMap::new();
        loop {
            self.pop_expect(TokenType::Dot)?;
            let key = self.pop_expect(TokenType::Identifier)?.identifier().unwrap(); // SAFETY: see above
            self.pop_expect(TokenType::Eq)?;
            let value = self.pop_expect(TokenType::Str)?.string().unwrap(); // SAFETY: see above
            options.insert(key, value);
            match self.pop()? {
                Token::Comma => (),
                Token::BlockEnd => break,
                token => return self.unexpected([TokenType::Comma, TokenType::BlockEnd], token)
            }
        }
        self.pop_expect(TokenType::Break)?;
        Ok(ast::StaticSampler { name, options })
    }

    fn parse_root_constant(&mut self) -> Result<ast::RootConstant, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        let shader_stages = self.parse_shader_stages()?;
        self.pop_expect(TokenType::Comma)?;
        self.pop_expect(TokenType::Dot)?;
        let field = self.pop_expect(TokenType::Identifier)?.identifier().unwrap(); // SAFETY: see above
        if field != "num32BitValues" {
            return Err(Error::new(self.cur_line, self.cur_column, Type::UnknownOption(field)));
        }
        self.pop_expect(TokenType::Eq)?;
        let value = self.pop_expect(TokenType::Int)?.int().unwrap(); // SAFETY: see above
        let num_32bit_values = u32::try_from(value)
            .map_err(|_| Error::new(self.cur_line, self.cur_column, Type::IntegerOutOfRange(value)))?;
        self.pop_expect(TokenType::BlockEnd)?;
        self.pop_expect(TokenType::Break)?;
        Ok(ast::RootConstant {
            name,
            shader_stages,
            num_32bit_values
        })
    }

    fn parse_root_cbv(&mut self) -> Result<ast::RootConstantBufferView, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        let shader_stages = self.parse_shader_stages()?;
        self.pop_expect(TokenType::BlockEnd)?;
        self.pop_expect(TokenType::Break)?;
        Ok(ast::RootConstantBufferView { name, shader_stages })
    }

    // The first identifier is the layout-local name, the second the name of
    // the bind point it references.
    fn parse_bind_point_reference(&mut self, name: String) -> Result<ast::BindPointReference, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let bind_point_name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        let shader_stages = self.parse_shader_stages()?;
        self.pop_expect(TokenType::BlockEnd)?;
        self.pop_expect(TokenType::Break)?;
        Ok(ast::BindPointReference {
            name,
            bind_point_name,
            bind_point_index: 0,
            shader_stages
        })
    }

    fn parse_shader_input_layout(&mut self) -> Result<ast::ShaderInputLayout, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        let mut options = ast::ShaderInputLayoutOptions::default();
        if self.front_is(TokenType::Lt) {
            self.pop()?;
            self.pop_expect(TokenType::Local)?;
            self.pop_expect(TokenType::Gt)?;
            options.local_root_signature = true;
        }
        self.pop_expect(TokenType::BlockStart)?;
        let mut bind_points = Vec::new();
        let mut root_constants = Vec::new();
        let mut root_constant_buffer_views = Vec::new();
        let mut static_samplers = Vec::new();
        loop {
            match self.pop()? {
                Token::BlockEnd => break,
                Token::StaticSampler => static_samplers.push(self.parse_static_sampler()?),
                Token::RootConstant => root_constants.push(self.parse_root_constant()?),
                Token::RootCbv => root_constant_buffer_views.push(self.parse_root_cbv()?),
                Token::Identifier(local_name) => bind_points.push(self.parse_bind_point_reference(local_name)?),
                token => {
                    return self.unexpected(
                        [
                            TokenType::StaticSampler,
                            TokenType::RootConstant,
                            TokenType::RootCbv,
                            TokenType::Identifier,
                            TokenType::BlockEnd
                        ],
                        token
                    )
                }
            }
        }
        self.pop_expect(TokenType::Break)?;
        Ok(ast::ShaderInputLayout {
            name,
            options,
            bind_points,
            root_constants,
            root_constant_buffer_views,
            static_samplers
        })
    }

    fn parse_array_count(&mut self, ctx: &Context) -> Result<u32, Error>
    {
        if !self.front_is(TokenType::ArrayStart) {
            return Ok(0);
        }
        self.pop()?;
        if self.front_is(TokenType::ArrayEnd) {
            self.pop()?;
            return Ok(ast::Variable::UNBOUNDED);
        }
        let value = match self.pop()? {
            Token::Int(value) => value,
            Token::Identifier(name) => match ctx.constant(&name) {
                Some(value) => value,
                None => return Err(Error::new(self.cur_line, self.cur_column, Type::UnknownConstant(name)))
            },
            token => return self.unexpected([TokenType::Int, TokenType::Identifier], token)
        };
        let count = u32::try_from(value)
            .ok()
            .filter(|&count| count != ast::Variable::UNBOUNDED)
            .ok_or_else(|| Error::new(self.cur_line, self.cur_column, Type::IntegerOutOfRange(value)))?;
        self.pop_expect(TokenType::ArrayEnd)?;
        Ok(count)
    }

    fn parse_variable(&mut self, ctx: &Context) -> Result<ast::Variable, Error>
    {
        let vtype = match self.pop()? {
            Token::Texture2D => ast::VariableType::Texture2D(self.parse_type_argument()?),
            Token::RwTexture2D => ast::VariableType::RwTexture2D(self.parse_type_argument()?),
            Token::ByteAddressBuffer => ast::VariableType::ByteAddressBuffer,
            Token::RwByteAddressBuffer => ast::VariableType::RwByteAddressBuffer,
            Token::StructuredBuffer => {
                ast::VariableType::StructuredBuffer(ast::StructuredType::Unresolved(self.parse_type_argument()?))
            },
            Token::RwStructuredBuffer => {
                ast::VariableType::RwStructuredBuffer(ast::StructuredType::Unresolved(self.parse_type_argument()?))
            },
            Token::RaytracingAccelerationStructure => ast::VariableType::RaytracingAccelerationStructure,
            Token::Identifier(type_name) => ast::VariableType::Unresolved(type_name),
            token => {
                return self.unexpected(
                    [
                        TokenType::Texture2D,
                        TokenType::RwTexture2D,
                        TokenType::ByteAddressBuffer,
                        TokenType::RwByteAddressBuffer,
                        TokenType::StructuredBuffer,
                        TokenType::RwStructuredBuffer,
                        TokenType::RaytracingAccelerationStructure,
                        TokenType::Identifier
                    ],
                    token
                )
            }
        };
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        let array_count = self.parse_array_count(ctx)?;
        self.pop_expect(TokenType::Break)?;
        Ok(ast::Variable {
            name,
            vtype,
            array_count
        })
    }

    fn parse_type_argument(&mut self) -> Result<String, Error>
    {
        self.pop_expect(TokenType::Lt)?;
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::Gt)?;
        Ok(name)
    }

    fn parse_group(&mut self, ctx: &Context) -> Result<ast::Group, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        let mut variables = Vec::new();
        while !self.check_block_end()? {
            variables.push(self.parse_variable(ctx)?);
        }
        self.pop_expect(TokenType::Break)?;
        Ok(ast::Group { name, variables })
    }

    fn parse_shader_input_group(&mut self, ctx: &Context) -> Result<ast::ShaderInputGroup, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::Lt)?;
        self.pop_expect(TokenType::BindTo)?;
        self.pop_expect(TokenType::Eq)?;
        let token = self.pop_expect(TokenType::Identifier)?;
        let bind_point_name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::Gt)?;
        self.pop_expect(TokenType::BlockStart)?;
        let mut variables = Vec::new();
        while !self.check_block_end()? {
            variables.push(self.parse_variable(ctx)?);
        }
        self.pop_expect(TokenType::Break)?;
        Ok(ast::ShaderInputGroup {
            name,
            bind_point_name,
            bind_point_index: 0,
            variables
        })
    }

    // Struct members only name basic types or other structs, so the type is
    // a plain identifier here.
    fn parse_struct_variable(&mut self, ctx: &Context) -> Result<ast::Variable, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let type_name = token.identifier().unwrap(); // SAFETY: see above
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        let array_count = self.parse_array_count(ctx)?;
        self.pop_expect(TokenType::Break)?;
        Ok(ast::Variable {
            name,
            vtype: ast::VariableType::Unresolved(type_name),
            array_count
        })
    }

    fn parse_struct(&mut self, ctx: &Context) -> Result<ast::Struct, Error>
    {
        let token = self.pop_expect(TokenType::Identifier)?;
        let name = token.identifier().unwrap(); // SAFETY: see above
        self.pop_expect(TokenType::BlockStart)?;
        let mut variables = Vec::new();
        while !self.check_block_end()? {
            variables.push(self.parse_struct_variable(ctx)?);
        }
        self.pop_expect(TokenType::Break)?;
        Ok(ast::Struct { name, variables })
    }

    pub fn parse(&mut self, ctx: &mut Context) -> Result<Vec<tree::Statement>, Error>
    {
        let mut statements = Vec::new();
        while let Some(entry) = self.tokens.pop_front() {
            self.cur_line = entry.line;
            self.cur_column = entry.col;
            let statement = match entry.token {
                Token::Directive(name) => self.parse_directive(name, ctx)?,
                Token::BindPoint => Some(tree::Statement::BindPoint(self.parse_bind_point()?)),
                Token::ShaderInputLayout => {
                    Some(tree::Statement::ShaderInputLayout(self.parse_shader_input_layout()?))
                },
                Token::Group => Some(tree::Statement::Group(self.parse_group(ctx)?)),
                Token::ShaderInputGroup => {
                    Some(tree::Statement::ShaderInputGroup(self.parse_shader_input_group(ctx)?))
                },
                Token::Struct => Some(tree::Statement::Struct(self.parse_struct(ctx)?)),
                token => return Err(Error::new(entry.line, entry.col, Type::UnknownToken(token)))
            };
            if let Some(statement) = statement {
                statements.push(statement);
            }
        }
        Ok(statements)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::ast::tree::{
        BindPoint,
        BindPointReference,
        Constant,
        Group,
        RootConstant,
        RootConstantBufferView,
        ShaderInputGroup,
        ShaderInputLayout,
        ShaderInputLayoutOptions,
        ShaderStage,
        StaticSampler,
        StructuredType,
        Variable,
        VariableType
    };
    use crate::parser::tree::Statement;

    fn parse(source_code: &[u8]) -> Vec<Statement>
    {
        let mut ctx = Context::new();
        parse_with(source_code, &mut ctx)
    }

    fn parse_with(source_code: &[u8], ctx: &mut Context) -> Vec<Statement>
    {
        let mut lexer = Lexer::new();
        lexer.process(source_code).unwrap();
        let mut parser = Parser::new(lexer);
        parser.parse(ctx).unwrap()
    }

    #[test]
    fn basic_bind_point()
    {
        let statements = parse(b"BindPoint PerFrame {};");
        assert_eq!(
            statements,
            vec![Statement::BindPoint(BindPoint {
                name: "PerFrame".into(),
                shader_input_groups: vec![]
            })]
        );
    }

    #[test]
    fn basic_input_group()
    {
        let statements = parse(
            b"
            ShaderInputGroup Lighting<BindTo=PerFrame>
            {
                Texture2D<float4> shadowMap;
                StructuredBuffer<PointLight> lights[];
                float3 sunDirection;
            };
        "
        );
        assert_eq!(
            statements,
            vec![Statement::ShaderInputGroup(ShaderInputGroup {
                name: "Lighting".into(),
                bind_point_name: "PerFrame".into(),
                bind_point_index: 0,
                variables: vec![
                    Variable {
                        name: "shadowMap".into(),
                        vtype: VariableType::Texture2D("float4".into()),
                        array_count: 0
                    },
                    Variable {
                        name: "lights".into(),
                        vtype: VariableType::StructuredBuffer(StructuredType::Unresolved("PointLight".into())),
                        array_count: Variable::UNBOUNDED
                    },
                    Variable {
                        name: "sunDirection".into(),
                        vtype: VariableType::Unresolved("float3".into()),
                        array_count: 0
                    },
                ]
            })]
        );
    }

    #[test]
    fn basic_layout()
    {
        let statements = parse(
            b"
            ShaderInputLayout Forward
            {
                StaticSampler linearClamp { .Filter = \"D3D12_FILTER_MIN_MAG_MIP_LINEAR\", .AddressU = \"D3D12_TEXTURE_ADDRESS_MODE_CLAMP\" };
                RootConstant drawId { .shaderStages = [vertex], .num32BitValues = 2 };
                RootCBV viewData { .shaderStages = [vertex, pixel] };
                frame PerFrame { .shaderStages = [pixel] };
            };
        "
        );
        let expected = ShaderInputLayout {
            name: "Forward".into(),
            options: ShaderInputLayoutOptions::default(),
            bind_points: vec![BindPointReference {
                name: "frame".into(),
                bind_point_name: "PerFrame".into(),
                bind_point_index: 0,
                shader_stages: vec![ShaderStage::Pixel]
            }],
            root_constants: vec![RootConstant {
                name: "drawId".into(),
                shader_stages: vec![ShaderStage::Vertex],
                num_32bit_values: 2
            }],
            root_constant_buffer_views: vec![RootConstantBufferView {
                name: "viewData".into(),
                shader_stages: vec![ShaderStage::Vertex, ShaderStage::Pixel]
            }],
            static_samplers: vec![StaticSampler {
                name: "linearClamp".into(),
                options: [
                    ("Filter".to_string(), "D3D12_FILTER_MIN_MAG_MIP_LINEAR".to_string()),
                    ("AddressU".to_string(), "D3D12_TEXTURE_ADDRESS_MODE_CLAMP".to_string())
                ]
                .into_iter()
                .collect()
            }]
        };
        assert_eq!(statements, vec![Statement::ShaderInputLayout(expected)]);
    }

    #[test]
    fn local_layout_option()
    {
        let statements = parse(b"ShaderInputLayout RtHit<Local> { hit HitData { .shaderStages = [rt] }; };");
        match &statements[0] {
            Statement::ShaderInputLayout(layout) => {
                assert!(layout.options.local_root_signature);
                assert_eq!(layout.bind_points[0].shader_stages, vec![ShaderStage::RayTracing]);
            },
            other => panic!("expected layout, got {:?}", other)
        }
    }

    #[test]
    fn group_and_struct()
    {
        let statements = parse(
            b"
            struct PointLight
            {
                float3 position;
                float intensity;
            };
            Group Shadows
            {
                Texture2D<float> cascades[4];
            };
        "
        );
        assert_eq!(
            statements,
            vec![
                Statement::Struct(crate::ast::tree::Struct {
                    name: "PointLight".into(),
                    variables: vec![
                        Variable {
                            name: "position".into(),
                            vtype: VariableType::Unresolved("float3".into()),
                            array_count: 0
                        },
                        Variable {
                            name: "intensity".into(),
                            vtype: VariableType::Unresolved("float".into()),
                            array_count: 0
                        },
                    ]
                }),
                Statement::Group(Group {
                    name: "Shadows".into(),
                    variables: vec![Variable {
                        name: "cascades".into(),
                        vtype: VariableType::Texture2D("float".into()),
                        array_count: 4
                    }]
                }),
            ]
        );
    }

    #[test]
    fn constants_resolve_in_array_sizes()
    {
        let mut ctx = Context::new();
        let statements = parse_with(
            b"
            #constant MAX_LIGHTS 32
            Group Lights
            {
                StructuredBuffer<float4> lights[MAX_LIGHTS];
            };
        ",
            &mut ctx
        );
        assert_eq!(ctx.constant("MAX_LIGHTS"), Some(32));
        assert_eq!(
            statements[0],
            Statement::Constant(Constant {
                name: "MAX_LIGHTS".into(),
                value: 32
            })
        );
        match &statements[1] {
            Statement::Group(group) => assert_eq!(group.variables[0].array_count, 32),
            other => panic!("expected group, got {:?}", other)
        }
    }

    #[test]
    fn constant_redefinition_overwrites()
    {
        let mut ctx = Context::new();
        parse_with(b"#constant N 4\n#constant N 8", &mut ctx);
        assert_eq!(ctx.constant("N"), Some(8));
    }

    #[test]
    fn unknown_constant_fails()
    {
        let mut lexer = Lexer::new();
        lexer.process(b"Group G { float4 data[NOPE]; };").unwrap();
        let mut parser = Parser::new(lexer);
        let mut ctx = Context::new();
        let err = parser.parse(&mut ctx).unwrap_err();
        assert_eq!(err.etype, Type::UnknownConstant("NOPE".into()));
    }

    #[test]
    fn negative_array_size_fails()
    {
        let mut lexer = Lexer::new();
        lexer.process(b"Group G { float4 data[-3]; };").unwrap();
        let mut parser = Parser::new(lexer);
        let mut ctx = Context::new();
        let err = parser.parse(&mut ctx).unwrap_err();
        assert_eq!(err.etype, Type::IntegerOutOfRange(-3));
    }

    #[test]
    fn missing_break_fails()
    {
        let mut lexer = Lexer::new();
        lexer.process(b"BindPoint P {}").unwrap();
        let mut parser = Parser::new(lexer);
        let mut ctx = Context::new();
        assert!(parser.parse(&mut ctx).is_err());
    }
}
