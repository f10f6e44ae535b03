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

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{
    DuplicateBindPoint(String),
    DuplicateShaderInputLayout(String),
    DuplicateGroup(String),
    DuplicateShaderInputGroup(String),
    DuplicateBindPointReference
    {
        layout: String,
        name: String
    },
    TypeRedefinition(String),
    UnknownType(String),
    UnknownBindPoint(String),
    BadStructuredType(String),
    BadStructMember
    {
        structure: String,
        member: String
    },
    UnboundedArray
    {
        owner: String,
        member: String
    }
}

impl Display for Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self {
            Error::DuplicateBindPoint(name) => write!(f, "BindPoint with name `{}` already exists", name),
            Error::DuplicateShaderInputLayout(name) => {
                write!(f, "ShaderInputLayout with name `{}` already exists", name)
            },
            Error::DuplicateGroup(name) => write!(f, "Group with name `{}` already exists", name),
            Error::DuplicateShaderInputGroup(name) => {
                write!(f, "ShaderInputGroup with name `{}` already exists", name)
            },
            Error::DuplicateBindPointReference { layout, name } => {
                write!(f, "bind point name `{}` already exists in ShaderInputLayout `{}`", name, layout)
            },
            Error::TypeRedefinition(name) => write!(f, "redefinition of `{}`", name),
            Error::UnknownType(name) => write!(f, "unknown type name `{}`", name),
            Error::UnknownBindPoint(name) => write!(f, "no such bind point `{}`", name),
            Error::BadStructuredType(name) => {
                write!(f, "unsupported type `{}` in (RW)StructuredBuffer", name)
            },
            Error::BadStructMember { structure, member } => {
                write!(f, "member `{}` of struct `{}` must be of a basic or struct type", member, structure)
            },
            Error::UnboundedArray { owner, member } => {
                write!(f, "unbounded array `{}` in `{}` is not allowed", member, owner)
            }
        }
    }
}

impl std::error::Error for Error {}
