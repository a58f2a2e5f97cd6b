use std::{error, fmt};

#[derive(Debug, Eq, PartialEq)]
pub enum InnerLexError {
    UnexpectedChar(char),
    BadConstantSuffix(char),
}

/// A lexical error with the position it was raised at.
#[derive(Debug, Eq, PartialEq)]
pub struct LexError {
    inner: InnerLexError,
    line: u32,
    col: u32,
}

impl LexError {
    pub fn position(&self) -> (u32, u32) {
        (self.line, self.col)
    }

    pub fn inner(&self) -> &InnerLexError {
        &self.inner
    }
}

impl InnerLexError {
    pub(super) fn set_position(self, line: u32, col: u32) -> LexError {
        LexError {
            inner: self,
            line,
            col,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LexError: {} at line {}, col {}",
            self.inner, self.line, self.col
        )
    }
}

impl fmt::Display for InnerLexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            Self::BadConstantSuffix(c) => write!(f, "bad constant suffix '{c}'"),
        }
    }
}

impl error::Error for LexError {}
impl error::Error for InnerLexError {}
