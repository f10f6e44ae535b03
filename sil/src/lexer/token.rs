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

use std::fmt::{Display, Formatter};

use phf::phf_map;

pub const CHR_BLOCK_START: u8 = b'{';
pub const CHR_BLOCK_END: u8 = b'}';
pub const CHR_ARRAY_START: u8 = b'[';
pub const CHR_ARRAY_END: u8 = b']';
pub const CHR_LT: u8 = b'<';
pub const CHR_GT: u8 = b'>';
pub const CHR_COMMA: u8 = b',';
pub const CHR_BREAK: u8 = b';';
pub const CHR_EQ: u8 = b'=';
pub const CHR_DOT: u8 = b'.';
pub const CHR_QUOTE: u8 = b'"';
pub const CHR_DIRECTIVE: u8 = b'#';
pub const CHR_SLASH: u8 = b'/';
pub const CHR_NL: u8 = b'\n';

pub static KEYWORDS: phf::Map<&'static str, Token> = phf_map! {
    "struct" => Token::Struct,
    "BindPoint" => Token::BindPoint,
    "ShaderInputLayout" => Token::ShaderInputLayout,
    "RootConstant" => Token::RootConstant,
    "RootCBV" => Token::RootCbv,
    "StaticSampler" => Token::StaticSampler,
    "Group" => Token::Group,
    "ShaderInputGroup" => Token::ShaderInputGroup,
    "Texture2D" => Token::Texture2D,
    "RWTexture2D" => Token::RwTexture2D,
    "ByteAddressBuffer" => Token::ByteAddressBuffer,
    "RWByteAddressBuffer" => Token::RwByteAddressBuffer,
    "StructuredBuffer" => Token::StructuredBuffer,
    "RWStructuredBuffer" => Token::RwStructuredBuffer,
    "RaytracingAccelerationStructure" => Token::RaytracingAccelerationStructure,
    "Local" => Token::Local,
    "BindTo" => Token::BindTo
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type
{
    Struct,
    BindPoint,
    ShaderInputLayout,
    RootConstant,
    RootCbv,
    StaticSampler,
    Group,
    ShaderInputGroup,
    Texture2D,
    RwTexture2D,
    ByteAddressBuffer,
    RwByteAddressBuffer,
    StructuredBuffer,
    RwStructuredBuffer,
    RaytracingAccelerationStructure,
    Local,
    BindTo,
    Identifier,
    Int,
    Str,
    Directive,
    BlockStart,
    BlockEnd,
    ArrayStart,
    ArrayEnd,
    Lt,
    Gt,
    Comma,
    Break,
    Eq,
    Dot,
    Combined(Vec<Type>)
}

impl Type
{
    pub fn name(&self) -> &'static str
    {
        match self {
            Type::Struct => "struct",
            Type::BindPoint => "BindPoint",
            Type::ShaderInputLayout => "ShaderInputLayout",
            Type::RootConstant => "RootConstant",
            Type::RootCbv => "RootCBV",
            Type::StaticSampler => "StaticSampler",
            Type::Group => "Group",
            Type::ShaderInputGroup => "ShaderInputGroup",
            Type::Texture2D => "Texture2D",
            Type::RwTexture2D => "RWTexture2D",
            Type::ByteAddressBuffer => "ByteAddressBuffer",
            Type::RwByteAddressBuffer => "RWByteAddressBuffer",
            Type::StructuredBuffer => "StructuredBuffer",
            Type::RwStructuredBuffer => "RWStructuredBuffer",
            Type::RaytracingAccelerationStructure => "RaytracingAccelerationStructure",
            Type::Local => "Local",
            Type::BindTo => "BindTo",
            Type::Identifier => "identifier",
            Type::Int => "integer",
            Type::Str => "string",
            Type::Directive => "directive",
            Type::BlockStart => "'{'",
            Type::BlockEnd => "'}'",
            Type::ArrayStart => "'['",
            Type::ArrayEnd => "']'",
            Type::Lt => "'<'",
            Type::Gt => "'>'",
            Type::Comma => "','",
            Type::Break => "';'",
            Type::Eq => "'='",
            Type::Dot => "'.'",
            Type::Combined(_) => "combined"
        }
    }

    pub fn combined<T: AsRef<[Type]>>(t: T) -> Self
    {
        Self::Combined(t.as_ref().into())
    }
}

impl Display for Type
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        if let Type::Combined(v) = self {
            for (i, t) in v.iter().enumerate() {
                f.write_str(t.name())?;
                if i != v.len() - 1 {
                    f.write_str(" or ")?;
                }
            }
            Ok(())
        } else {
            f.write_str(self.name())
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Token
{
    Struct,
    BindPoint,
    ShaderInputLayout,
    RootConstant,
    RootCbv,
    StaticSampler,
    Group,
    ShaderInputGroup,
    Texture2D,
    RwTexture2D,
    ByteAddressBuffer,
    RwByteAddressBuffer,
    StructuredBuffer,
    RwStructuredBuffer,
    RaytracingAccelerationStructure,
    Local,
    BindTo,
    Identifier(String),
    Int(i64),
    Str(String),
    Directive(String),
    BlockStart,
    BlockEnd,
    ArrayStart,
    ArrayEnd,
    Lt,
    Gt,
    Comma,
    Break,
    Eq,
    Dot
}

impl Token
{
    pub fn get_type(&self) -> Type
    {
        match self {
            Token::Struct => Type::Struct,
            Token::BindPoint => Type::BindPoint,
            Token::ShaderInputLayout => Type::ShaderInputLayout,
            Token::RootConstant => Type::RootConstant,
            Token::RootCbv => Type::RootCbv,
            Token::StaticSampler => Type::StaticSampler,
            Token::Group => Type::Group,
            Token::ShaderInputGroup => Type::ShaderInputGroup,
            Token::Texture2D => Type::Texture2D,
            Token::RwTexture2D => Type::RwTexture2D,
            Token::ByteAddressBuffer => Type::ByteAddressBuffer,
            Token::RwByteAddressBuffer => Type::RwByteAddressBuffer,
            Token::StructuredBuffer => Type::StructuredBuffer,
            Token::RwStructuredBuffer => Type::RwStructuredBuffer,
            Token::RaytracingAccelerationStructure => Type::RaytracingAccelerationStructure,
            Token::Local => Type::Local,
            Token::BindTo => Type::BindTo,
            Token::Identifier(_) => Type::Identifier,
            Token::Int(_) => Type::Int,
            Token::Str(_) => Type::Str,
            Token::Directive(_) => Type::Directive,
            Token::BlockStart => Type::BlockStart,
            Token::BlockEnd => Type::BlockEnd,
            Token::ArrayStart => Type::ArrayStart,
            Token::ArrayEnd => Type::ArrayEnd,
            Token::Lt => Type::Lt,
            Token::Gt => Type::Gt,
            Token::Comma => Type::Comma,
            Token::Break => Type::Break,
            Token::Eq => Type::Eq,
            Token::Dot => Type::Dot
        }
    }

    pub fn identifier(self) -> Option<String>
    {
        if let Token::Identifier(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn int(self) -> Option<i64>
    {
        if let Token::Int(i) = self {
            Some(i)
        } else {
            None
        }
    }

    pub fn string(self) -> Option<String>
    {
        if let Token::Str(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn directive(self) -> Option<String>
    {
        if let Token::Directive(s) = self {
            Some(s)
        } else {
            None
        }
    }
}

impl Display for Token
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error>
    {
        match self {
            Token::Identifier(s) => write!(formatter, "identifier({})", s),
            Token::Int(i) => write!(formatter, "integer({})", i),
            Token::Str(s) => write!(formatter, "string(\"{}\")", s),
            Token::Directive(s) => write!(formatter, "#{}", s),
            _ => formatter.write_str(self.get_type().name())
        }
    }
}
