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
use std::path::{Path, PathBuf};

use crate::lexer::token::{Token, Type as TokenType};

#[derive(Debug, Clone, PartialEq)]
pub enum Type
{
    UnexpectedToken
    {
        actual: Token,
        expected: TokenType
    },
    UnknownToken(Token),
    UnknownDirective(String),
    UnknownOption(String),
    UnknownShaderStage(String),
    UnknownConstant(String),
    IntegerOutOfRange(i64),
    Lexer(crate::lexer::error::Type),
    Io(String),
    Eof
}

impl Display for Type
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self {
            Type::UnexpectedToken { actual, expected } => write!(f, "unexpected token (expected {}, got {})", expected, actual),
            Type::UnknownToken(token) => write!(f, "unknown token ({})", token),
            Type::UnknownDirective(name) => write!(f, "unknown directive (#{})", name),
            Type::UnknownOption(name) => write!(f, "unknown option (.{})", name),
            Type::UnknownShaderStage(name) => write!(f, "unknown shader stage ({})", name),
            Type::UnknownConstant(name) => write!(f, "undefined constant ({})", name),
            Type::IntegerOutOfRange(value) => write!(f, "integer out of range ({})", value),
            Type::Lexer(e) => write!(f, "{:?}", e),
            Type::Io(msg) => write!(f, "io error ({})", msg),
            Type::Eof => f.write_str("unexpected EOF")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error
{
    pub file: Option<PathBuf>,
    pub line: usize,
    pub col: usize,
    pub etype: Type
}

impl Error
{
    pub fn new(line: usize, col: usize, etype: Type) -> Self
    {
        Self {
            file: None,
            line,
            col,
            etype
        }
    }

    pub fn io(file: &Path, e: std::io::Error) -> Self
    {
        Self {
            file: Some(file.into()),
            line: 0,
            col: 0,
            etype: Type::Io(e.to_string())
        }
    }

    /// Attach the offending file path, keeping the innermost one on nested
    /// include errors.
    pub fn with_file(mut self, file: &Path) -> Self
    {
        if self.file.is_none() {
            self.file = Some(file.into());
        }
        self
    }
}

impl From<crate::lexer::error::Error> for Error
{
    fn from(e: crate::lexer::error::Error) -> Self
    {
        Self::new(e.line, e.col, Type::Lexer(e.etype))
    }
}

impl Display for Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{} {}", file.display(), self.line, self.col, self.etype),
            None => write!(f, "{}:{} {}", self.line, self.col, self.etype)
        }
    }
}

impl std::error::Error for Error {}
