use logos::Logos;

#[derive(Debug, Clone, Copy, PartialEq, Logos)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
pub enum Tok {
    // like the values, tokens carry no payload: the command parser reads it from the slice.

    // punctuation
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Assign,

    // bindings
    #[token("let")]
    Let,
    #[token("set")]
    Set,
    #[token("drop")]
    Drop,
    #[token("get")]
    Get,
    #[token("open")]
    Open,
    #[token("close")]
    Close,

    // snapshots
    #[token("freeze")]
    Freeze,
    #[token("rollback")]
    Rollback,
    #[token("restore")]
    Restore,
    #[token("clear")]
    Clear,

    // heap
    #[token("gc")]
    Gc,
    #[token("force")]
    Force,

    // session
    #[token("dump")]
    Dump,
    #[token("help")]
    Help,
    #[token("exit")]
    Exit,

    // values
    #[token("true")]
    #[token("false")]
    Bool,
    #[token("nil")]
    Nil,
    #[regex(r"-?\d+")]
    Int,
    #[regex(r"-?\d+\.\d+")]
    Float,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,
    #[regex(r"'[^'\\]'")]
    Char,
    #[regex(r"#\d+")]
    NodeId,

    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
}
