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

use std::fmt::{Debug, Display, Formatter};

#[derive(Clone, PartialEq, Eq)]
pub enum Type
{
    UnidentifiedToken(Vec<u8>),
    UnterminatedString,
    EmptyDirective
}

impl Debug for Type
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match self {
            Type::UnidentifiedToken(v) => write!(f, "UnidentifiedToken({})", String::from_utf8_lossy(v).as_ref()),
            Type::UnterminatedString => f.write_str("UnterminatedString"),
            Type::EmptyDirective => f.write_str("EmptyDirective")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error
{
    pub line: usize,
    pub col: usize,
    pub etype: Type
}

impl Error
{
    pub fn unidentified_token(line: usize, col: usize, token: &[u8]) -> Self
    {
        Self {
            line,
            col,
            etype: Type::UnidentifiedToken(token.into())
        }
    }

    pub fn unterminated_string(line: usize, col: usize) -> Self
    {
        Self {
            line,
            col,
            etype: Type::UnterminatedString
        }
    }

    pub fn empty_directive(line: usize, col: usize) -> Self
    {
        Self {
            line,
            col,
            etype: Type::EmptyDirective
        }
    }
}

impl Display for Error
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{}:{}: {:?}", self.line, self.col, self.etype)
    }
}

impl std::error::Error for Error {}
