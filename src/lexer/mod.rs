mod cursor;
mod lexer_error;
mod token;

use cursor::Cursor;
pub use lexer_error::{InnerLexError, LexError};
pub use token::{Token, TokenKind};

pub type Tokens = Vec<Token>;

fn lex_mcharop2(first: char, second: char) -> Option<TokenKind> {
    match (first, second) {
        ('+', '+') => Some(TokenKind::Increment),
        ('-', '-') => Some(TokenKind::Decrement),
        ('=', '=') => Some(TokenKind::IsEqual),
        ('!', '=') => Some(TokenKind::IsNotEqual),
        ('<', '=') => Some(TokenKind::IsLessThanOrEqual),
        ('>', '=') => Some(TokenKind::IsGreaterThanOrEqual),
        ('&', '&') => Some(TokenKind::LogicalAnd),
        ('|', '|') => Some(TokenKind::LogicalOr),
        _ => None,
    }
}

/// Longest match: try the two-char operator before the one-char fallback.
/// `&` and `|` have no one-char meaning in NanoC, so a lone one is an error.
fn lex_operator(cursor: &mut Cursor) -> Result<(TokenKind, String), InnerLexError> {
    let first = cursor.take().expect("is always Some");
    let second = cursor.peek();

    if let Some(second) = second {
        if let Some(kind) = lex_mcharop2(first, second) {
            cursor.take();
            return Ok((kind, format!("{first}{second}")));
        }
    }

    let kind = TokenKind::try_from(first)?;
    Ok((kind, first.to_string()))
}

/// Base-10 digits; leading zeros allowed, never octal. A digit run followed
/// by `.digits` is a float literal (kept out of lowering by later passes).
fn lex_constant(cursor: &mut Cursor) -> Result<(TokenKind, String), InnerLexError> {
    let start = cursor.as_str();
    let mut len = 0;

    while cursor.skip_if(|c| c.is_ascii_digit()) {
        len += 1;
    }

    let mut kind = TokenKind::IntLiteral;
    let is_float = cursor.peek() == Some('.') && cursor.peek_2nd().filter(char::is_ascii_digit).is_some();
    if is_float {
        cursor.take();
        len += 1;
        while cursor.skip_if(|c| c.is_ascii_digit()) {
            len += 1;
        }
        kind = TokenKind::FloatLiteral;
    }

    let is_bad = |c: &char| c.is_ascii_alphabetic() || *c == '_';
    if let Some(bad_suffix) = cursor.peek().filter(is_bad) {
        return Err(InnerLexError::BadConstantSuffix(bad_suffix));
    }

    Ok((kind, start[..len].to_owned()))
}

fn lex_word(cursor: &mut Cursor) -> (TokenKind, String) {
    let start = cursor.as_str();
    let mut len = 0;

    while cursor.skip_if(|c| c.is_ascii_alphanumeric() || c == '_') {
        len += 1;
    }

    let word = &start[..len];
    (TokenKind::from(word), word.to_owned())
}

/// Scan `input` into a token sequence terminated by [`TokenKind::Eof`].
pub fn lex(input: &str) -> Result<Tokens, LexError> {
    let mut tokens = Tokens::new();
    let mut cursor = Cursor::new(input);
    cursor.skip_trivia();

    while let Some(peek) = cursor.peek() {
        let (line, col) = cursor.position();
        let result = match peek {
            '_' | 'a'..='z' | 'A'..='Z' => Ok(lex_word(&mut cursor)),
            '0'..='9' => lex_constant(&mut cursor),
            _ => lex_operator(&mut cursor),
        };
        let (kind, lexeme) = result.map_err(|err| err.set_position(line, col))?;
        tokens.push(Token::new(kind, lexeme, line, col));
        cursor.skip_trivia();
    }

    let (line, col) = cursor.position();
    tokens.push(Token::new(TokenKind::Eof, "", line, col));

    Ok(tokens)
}
