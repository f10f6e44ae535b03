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

use std::{collections::VecDeque, str::from_utf8_unchecked};

use regex::bytes::Regex;

use crate::lexer::{
    error::Error,
    token::{
        Token,
        CHR_ARRAY_END,
        CHR_ARRAY_START,
        CHR_BLOCK_END,
        CHR_BLOCK_START,
        CHR_BREAK,
        CHR_COMMA,
        CHR_DIRECTIVE,
        CHR_DOT,
        CHR_EQ,
        CHR_GT,
        CHR_LT,
        CHR_NL,
        CHR_QUOTE,
        CHR_SLASH,
        KEYWORDS
    }
};

pub struct TokenEntry
{
    pub line: usize,
    pub col: usize,
    pub token: Token
}

fn check_punct(chr: u8) -> Option<Token>
{
    match chr {
        CHR_BLOCK_START => Some(Token::BlockStart),
        CHR_BLOCK_END => Some(Token::BlockEnd),
        CHR_ARRAY_START => Some(Token::ArrayStart),
        CHR_ARRAY_END => Some(Token::ArrayEnd),
        CHR_LT => Some(Token::Lt),
        CHR_GT => Some(Token::Gt),
        CHR_COMMA => Some(Token::Comma),
        CHR_BREAK => Some(Token::Break),
        CHR_EQ => Some(Token::Eq),
        CHR_DOT => Some(Token::Dot),
        _ => None
    }
}

fn check_keyword(substr: &[u8]) -> Option<Token>
{
    let word = std::str::from_utf8(substr).ok()?;
    KEYWORDS.get(word).cloned()
}

fn check_literal(substr: &[u8]) -> Option<Token>
{
    let int = Regex::new(r"^-?\d+$").unwrap();
    if int.is_match(substr) {
        //SAFETY: If we get there and that we don't have a valid int well then regex crate is broken!
        unsafe {
            return from_utf8_unchecked(substr).parse().ok().map(Token::Int);
        }
    }
    None
}

fn check_identifier(substr: &[u8]) -> Option<Token>
{
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    if re.is_match(substr) {
        //SAFETY: If we get there but substr is not valid UTF8 well then regex crate is broken!
        unsafe {
            return Some(Token::Identifier(from_utf8_unchecked(substr).into()));
        }
    }
    None
}

fn is_whitespace(chr: u8) -> bool
{
    matches!(chr, b'\t' | b' ' | b'\r' | CHR_NL)
}

fn is_directive_char(chr: u8) -> bool
{
    chr.is_ascii_alphanumeric() || chr == b'_'
}

pub struct Lexer
{
    tokens: VecDeque<TokenEntry>,
    cur_line: usize,
    cur_column: usize
}

impl Default for Lexer
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl Lexer
{
    pub fn new() -> Lexer
    {
        Lexer {
            tokens: VecDeque::new(),
            cur_line: 1,
            cur_column: 0
        }
    }

    fn push(&mut self, token: Token)
    {
        self.tokens.push_back(TokenEntry {
            token,
            line: self.cur_line,
            col: self.cur_column
        });
    }

    fn parse_word(&mut self, word: &[u8]) -> Result<(), Error>
    {
        if word.is_empty() {
            return Ok(());
        }
        if let Some(tok) = check_keyword(word) {
            self.push(tok);
        } else if let Some(tok) = check_literal(word) {
            self.push(tok);
        }
        //At this point it has to be an identifier otherwise it's a bad unexpected token
        else if let Some(tok) = check_identifier(word) {
            self.push(tok);
        } else {
            return Err(Error::unidentified_token(self.cur_line, self.cur_column, word));
        }
        Ok(())
    }

    pub fn process(&mut self, code: &[u8]) -> Result<(), Error>
    {
        let mut pos = 0;
        let mut word_start = 0;
        while pos < code.len() {
            let chr = code[pos];
            self.cur_column += 1;
            if chr == CHR_SLASH && code.get(pos + 1) == Some(&CHR_SLASH) {
                self.parse_word(&code[word_start..pos])?;
                while pos < code.len() && code[pos] != CHR_NL {
                    pos += 1;
                }
                word_start = pos;
                continue;
            }
            if chr == CHR_QUOTE {
                self.parse_word(&code[word_start..pos])?;
                let start = pos + 1;
                let mut end = start;
                while end < code.len() && code[end] != CHR_QUOTE && code[end] != CHR_NL {
                    end += 1;
                }
                if end >= code.len() || code[end] != CHR_QUOTE {
                    return Err(Error::unterminated_string(self.cur_line, self.cur_column));
                }
                self.push(Token::Str(String::from_utf8_lossy(&code[start..end]).into_owned()));
                self.cur_column += end - pos;
                pos = end + 1;
                word_start = pos;
                continue;
            }
            if chr == CHR_DIRECTIVE {
                self.parse_word(&code[word_start..pos])?;
                let start = pos + 1;
                let mut end = start;
                while end < code.len() && is_directive_char(code[end]) {
                    end += 1;
                }
                if end == start {
                    return Err(Error::empty_directive(self.cur_line, self.cur_column));
                }
                //SAFETY: is_directive_char only accepts ASCII.
                let name = unsafe { from_utf8_unchecked(&code[start..end]) };
                self.push(Token::Directive(name.into()));
                self.cur_column += end - pos;
                pos = end;
                word_start = pos;
                continue;
            }
            if is_whitespace(chr) {
                self.parse_word(&code[word_start..pos])?;
                if chr == CHR_NL {
                    self.cur_line += 1;
                    self.cur_column = 0;
                }
                word_start = pos + 1;
            } else if let Some(tok) = check_punct(chr) {
                self.parse_word(&code[word_start..pos])?;
                self.push(tok);
                word_start = pos + 1;
            }
            pos += 1;
        }
        self.parse_word(&code[word_start..])?;
        Ok(())
    }

    pub fn into_tokens(self) -> VecDeque<TokenEntry>
    {
        self.tokens
    }
}

#[cfg(test)]
mod test
{
    use proptest::prelude::*;

    use super::*;

    fn lex(source_code: &[u8]) -> Vec<Token>
    {
        let mut lexer = Lexer::new();
        lexer.process(source_code).unwrap();
        lexer
            .into_tokens()
            .iter()
            .map(|TokenEntry { token, .. }| token.clone())
            .collect()
    }

    #[test]
    fn basic_lexer()
    {
        let toks = lex(b"
            BindPoint PerFrame {};
            ShaderInputGroup Lighting<BindTo=PerFrame>
            {
                Texture2D<float4> shadowMap;
                float3 sunDirection;
            };
        ");
        assert_eq!(
            toks,
            vec![
                Token::BindPoint,
                Token::Identifier("PerFrame".into()),
                Token::BlockStart,
                Token::BlockEnd,
                Token::Break,
                Token::ShaderInputGroup,
                Token::Identifier("Lighting".into()),
                Token::Lt,
                Token::BindTo,
                Token::Eq,
                Token::Identifier("PerFrame".into()),
                Token::Gt,
                Token::BlockStart,
                Token::Texture2D,
                Token::Lt,
                Token::Identifier("float4".into()),
                Token::Gt,
                Token::Identifier("shadowMap".into()),
                Token::Break,
                Token::Identifier("float3".into()),
                Token::Identifier("sunDirection".into()),
                Token::Break,
                Token::BlockEnd,
                Token::Break
            ]
        );
    }

    #[test]
    fn lexer_comments()
    {
        let toks = lex(b"
            // a bind point
            BindPoint PerFrame {}; // trailing comment
        ");
        assert_eq!(
            toks,
            vec![
                Token::BindPoint,
                Token::Identifier("PerFrame".into()),
                Token::BlockStart,
                Token::BlockEnd,
                Token::Break
            ]
        );
    }

    #[test]
    fn lexer_directives()
    {
        let toks = lex(b"
            #output \"generated/cpp\" \"generated/shaders\"
            #include \"common.si\"
            #constant MAX_LIGHTS 32
        ");
        assert_eq!(
            toks,
            vec![
                Token::Directive("output".into()),
                Token::Str("generated/cpp".into()),
                Token::Str("generated/shaders".into()),
                Token::Directive("include".into()),
                Token::Str("common.si".into()),
                Token::Directive("constant".into()),
                Token::Identifier("MAX_LIGHTS".into()),
                Token::Int(32)
            ]
        );
    }

    #[test]
    fn lexer_arrays_and_options()
    {
        let toks = lex(b"Texture2D<float4> textures[]; float weights[8]; .shaderStages = [vertex, pixel]");
        assert_eq!(
            toks,
            vec![
                Token::Texture2D,
                Token::Lt,
                Token::Identifier("float4".into()),
                Token::Gt,
                Token::Identifier("textures".into()),
                Token::ArrayStart,
                Token::ArrayEnd,
                Token::Break,
                Token::Identifier("float".into()),
                Token::Identifier("weights".into()),
                Token::ArrayStart,
                Token::Int(8),
                Token::ArrayEnd,
                Token::Break,
                Token::Dot,
                Token::Identifier("shaderStages".into()),
                Token::Eq,
                Token::ArrayStart,
                Token::Identifier("vertex".into()),
                Token::Comma,
                Token::Identifier("pixel".into()),
                Token::ArrayEnd
            ]
        );
    }

    #[test]
    fn lexer_negative_int()
    {
        let toks = lex(b"#constant BIAS -4");
        assert_eq!(
            toks,
            vec![
                Token::Directive("constant".into()),
                Token::Identifier("BIAS".into()),
                Token::Int(-4)
            ]
        );
    }

    #[test]
    fn lexer_bad_token()
    {
        let mut lexer = Lexer::new();
        let err = lexer.process(b"float4 @color;").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn lexer_unterminated_string()
    {
        let mut lexer = Lexer::new();
        assert!(lexer.process(b"#include \"common.si\n").is_err());
    }

    proptest! {
        #[test]
        fn identifiers_lex_to_single_token(name in "[a-zA-Z_][a-zA-Z0-9_]{0,30}")
        {
            prop_assume!(!KEYWORDS.contains_key(&*name));
            let mut lexer = Lexer::new();
            lexer.process(name.as_bytes()).unwrap();
            let toks: Vec<Token> = lexer
                .into_tokens()
                .iter()
                .map(|TokenEntry { token, .. }| token.clone())
                .collect();
            prop_assert_eq!(toks, vec![Token::Identifier(name)]);
        }
    }
}
