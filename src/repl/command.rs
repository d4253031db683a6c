use crate::lexer::tok::Tok;
use crate::lexer::{Lexeme, Lexer};
use lexem::errors::err::LexemErr;
use logos::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    List(Vec<Literal>),
    /// the current value bound to a name.
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Let { name: String, value: Literal },
    Set { name: String, value: Literal },
    Drop(String),
    Get(String),
    Open,
    Close,
    Freeze,
    Rollback,
    Restore(u64),
    Gc { force: bool },
    Clear,
    Dump,
    Help,
    Exit,
}

struct CommandParser<'a> {
    lexer: Lexer<'a>,
}

// macro to avoid double mut borrow
macro_rules! next {
    ($self:expr, $expected:expr) => {{
        let end = $self.lexer.end();
        $self.lexer.next()?.ok_or_else(|| LexemErr::syntax(&format!("expected {}", $expected), &end))?
    }};
}

impl<'a> CommandParser<'a> {
    fn expect(&mut self, tok: Tok) -> Result<Lexeme<'a>, LexemErr> {
        let lexeme = next!(self, format!("{tok:?}"));
        if lexeme.0 != tok {
            return Err(LexemErr::syntax(&format!("expected {tok:?}, found '{}'", lexeme.1), &lexeme.2));
        }
        Ok(lexeme)
    }

    fn name(&mut self) -> Result<String, LexemErr> {
        self.expect(Tok::Identifier).map(|(_, slice, _)| slice.to_string())
    }

    fn binding(&mut self) -> Result<(String, Literal), LexemErr> {
        let name = self.name()?;
        self.expect(Tok::Assign)?;
        Ok((name, self.literal()?))
    }

    fn literal(&mut self) -> Result<Literal, LexemErr> {
        let (tok, slice, span) = next!(self, "a value");
        let literal = match tok {
            Tok::Nil => Literal::Nil,
            Tok::Bool => Literal::Bool(slice == "true"),
            Tok::Int => Literal::Int(parse_number(slice, &span)?),
            Tok::Float => Literal::Float(parse_number(slice, &span)?),
            Tok::Char => Literal::Char(slice.chars().nth(1).unwrap_or_default()),
            Tok::Str => Literal::Str(unescape(&slice[1..slice.len() - 1])),
            Tok::Identifier => Literal::Name(slice.to_string()),
            Tok::LBracket => Literal::List(self.list_items()?),
            _ => return Err(LexemErr::syntax(&format!("expected a value, found '{slice}'"), &span)),
        };
        Ok(literal)
    }

    fn list_items(&mut self) -> Result<Vec<Literal>, LexemErr> {
        let mut items = Vec::new();
        if matches!(self.lexer.peek()?, Some((Tok::RBracket, _, _))) {
            self.lexer.next()?;
            return Ok(items);
        }
        loop {
            items.push(self.literal()?);
            let (tok, slice, span) = next!(self, "',' or ']'");
            match tok {
                Tok::Comma => continue,
                Tok::RBracket => return Ok(items),
                _ => return Err(LexemErr::syntax(&format!("expected ',' or ']', found '{slice}'"), &span)),
            }
        }
    }

    fn command(&mut self) -> Result<Option<Command>, LexemErr> {
        let Some((tok, slice, span)) = self.lexer.next()? else {
            return Ok(None);
        };
        let command = match tok {
            Tok::Let => {
                let (name, value) = self.binding()?;
                Command::Let { name, value }
            }
            Tok::Set => {
                let (name, value) = self.binding()?;
                Command::Set { name, value }
            }
            Tok::Drop => Command::Drop(self.name()?),
            Tok::Get => Command::Get(self.name()?),
            Tok::Open => Command::Open,
            Tok::Close => Command::Close,
            Tok::Freeze => Command::Freeze,
            Tok::Rollback => Command::Rollback,
            Tok::Restore => {
                let (_, id, span) = self.expect(Tok::NodeId)?;
                Command::Restore(parse_number(&id[1..], &span)?)
            }
            Tok::Gc => {
                let force = matches!(self.lexer.peek()?, Some((Tok::Force, _, _)));
                if force {
                    self.lexer.next()?;
                }
                Command::Gc { force }
            }
            Tok::Clear => Command::Clear,
            Tok::Dump => Command::Dump,
            Tok::Help => Command::Help,
            Tok::Exit => Command::Exit,
            _ => return Err(LexemErr::syntax(&format!("'{slice}' is not a command"), &span)),
        };
        if let Some((_, slice, span)) = self.lexer.next()? {
            return Err(LexemErr::syntax(&format!("unexpected '{slice}' after the command"), &span));
        }
        Ok(Some(command))
    }
}

fn parse_number<T: std::str::FromStr>(slice: &str, span: &Span) -> Result<T, LexemErr> {
    slice
        .parse()
        .map_err(|_| LexemErr::syntax(&format!("'{slice}' is out of range"), span))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// parses one shell line. blank lines and comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, LexemErr> {
    CommandParser { lexer: Lexer::new(line) }.command()
}
