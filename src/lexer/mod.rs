use lexem::errors::err::LexemErr;
use logos::{Logos, Span};
use crate::lexer::tok::Tok;

pub mod tok;

pub type Lexeme<'a> = (Tok, &'a str, Span);

/// wrapper for logos' lexer that supports peek
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, Tok>,
    buffer: Option<Lexeme<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            logos: Tok::lexer(input),
            buffer: None,
        }
    }

    fn inner_next(&mut self) -> Result<Option<Lexeme<'a>>, LexemErr> {
        let maybe_tok = self.logos.next()
            .transpose()
            .map_err(|_| LexemErr::lexical("invalid token", &self.logos.span()))?;

        Ok(maybe_tok.map(|tok| (tok, self.logos.slice(), self.logos.span())))
    }

    pub fn next(&mut self) -> Result<Option<Lexeme<'a>>, LexemErr> {
        if let Some(buf) = self.buffer.take() {
            return Ok(Some(buf));
        }
        self.inner_next()
    }

    pub fn peek(&mut self) -> Result<Option<&Lexeme<'a>>, LexemErr> {
        if self.buffer.is_none() {
            self.buffer = self.inner_next()?
        }
        Ok(self.buffer.as_ref())
    }

    /// span just past the last token, for errors about missing input.
    pub fn end(&self) -> Span {
        let end = self.logos.source().len();
        end..end
    }
}
