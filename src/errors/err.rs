use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use logos::Span;
use num_derive::{FromPrimitive, ToPrimitive};
use paste::paste;
use std::fmt::{Display, Formatter};

/// every failure the engine can report. all of the memory kinds are fatal for the current
/// analysis run: they signal a broken host invariant, never an ordinary backtrack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum ErrorKind {
    HeapOutOfRange = 10,
    FreedMemoryAccess,
    CrossSnapshotAllocation,
    ReferencedCellFreed,
    ReferenceCountUnderflow,
    StackNameNotFound,
    RootRollback,
    RestoreTargetNotInChain,
    InvalidValue,

    // shell
    Lexical = 40,
    Syntax,
}

#[derive(Debug)]
pub struct LexemErr {
    kind: ErrorKind,
    diagnostic: Diagnostic<()>,
}

macro_rules! unlocated_errors {
    ($($kind:ident),* $(,)?) => { paste! {
        impl LexemErr {
            $(
                pub fn [<$kind:snake>](msg: impl AsRef<str>) -> Self {
                    Self::new(ErrorKind::$kind, msg.as_ref(), 0..0)
                }
            )*
        }
    }};
}

unlocated_errors! {
    HeapOutOfRange,
    FreedMemoryAccess,
    CrossSnapshotAllocation,
    ReferencedCellFreed,
    ReferenceCountUnderflow,
    StackNameNotFound,
    RootRollback,
    RestoreTargetNotInChain,
    InvalidValue,
}

impl LexemErr {
    fn new(kind: ErrorKind, msg: &str, span: Span) -> Self {
        Self {
            kind,
            diagnostic: Diagnostic::error()
                .with_message(format!("{kind:?} - {msg}"))
                .with_labels(vec![Label::primary((), span)]),
        }
    }

    pub fn lexical(msg: &str, span: &Span) -> Self {
        Self::new(ErrorKind::Lexical, msg, span.clone())
    }

    pub fn syntax(msg: &str, span: &Span) -> Self {
        Self::new(ErrorKind::Syntax, msg, span.clone())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.diagnostic.message
    }

    pub fn emit(&self, file: &SimpleFile<&str, &String>) {
        let writer = StandardStream::stderr(ColorChoice::Always);
        let config = codespan_reporting::term::Config::default();
        term::emit(&mut writer.lock(), &config, file, &self.diagnostic)
            .expect("failed to write diagnostic");
    }
}

impl Display for LexemErr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.diagnostic.message)
    }
}

impl std::error::Error for LexemErr {}
