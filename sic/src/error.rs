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

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error
{
    #[error("{0}")]
    Parser(#[from] sil::parser::error::Error),

    #[error("{0}")]
    Ast(#[from] sil::ast::error::Error),

    #[error("no #output specified in file {0:?}")]
    MissingOutput(PathBuf),

    #[error("nested Group `{group}` inside ShaderInputGroup `{input_group}` is not allowed")]
    NestedGroup
    {
        group: String,
        input_group: String
    },

    #[error("Group instance `{variable}` in ShaderInputGroup `{input_group}` may not be an array")]
    GroupInstanceArray
    {
        variable: String,
        input_group: String
    },

    #[error("multiple unbounded arrays of the same register class in ShaderInputGroup `{0}`")]
    MultipleUnbounded(String),

    #[error("no descriptor table admits variable `{variable}` of ShaderInputGroup `{input_group}`")]
    NoTableFits
    {
        variable: String,
        input_group: String
    },

    #[error("unknown type `{0}` encountered during code generation")]
    UnknownHostType(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error)
}
