//! The lexer.

use derive_more::Display;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub kind: TokenKind,
    /// What part of the input this token carries.
    pub text: &'src str,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, Debug)]
pub enum TokenKind {
    #[display("id")]
    Id,
    #[display("num")]
    Num,
    #[display(":=")]
    Assign,
    #[display("true")]
    True,
    #[display("false")]
    False,
    #[display("not")]
    Not,
    #[display("and")]
    And,
    #[display("or")]
    Or,
    #[display("print")]
    Print,
    #[display("input_int")]
    InputInt,
    #[display("len")]
    Len,
    #[display("if")]
    If,
    #[display("else")]
    Else,
    #[display("while")]
    While,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
    #[display(",")]
    Comma,
    #[display(";")]
    Semicolon,
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("==")]
    EqEq,
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,
}

#[derive(Clone, Copy)]
pub struct LexError(pub usize, pub char);

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl fmt::Debug for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

/// Matchers listed in priority order: keywords before the general
/// identifier pattern, multi-character operators before their
/// single-character prefixes (`==` before... there is no bare `=`, but
/// `<=`/`>=` must still precede `<`/`>`).
fn matchers() -> &'static Vec<(Regex, TokenKind)> {
    static MATCHERS: OnceLock<Vec<(Regex, TokenKind)>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        use TokenKind::*;
        let specs: &[(&str, TokenKind)] = &[
            (r"\Atrue\b", True),
            (r"\Afalse\b", False),
            (r"\Anot\b", Not),
            (r"\Aand\b", And),
            (r"\Aor\b", Or),
            (r"\Aprint\b", Print),
            (r"\Ainput_int\b", InputInt),
            (r"\Alen\b", Len),
            (r"\Aif\b", If),
            (r"\Aelse\b", Else),
            (r"\Awhile\b", While),
            (r"\A[A-Za-z_][A-Za-z0-9_]*", Id),
            (r"\A[0-9]+", Num),
            (r"\A:=", Assign),
            (r"\A\{", LBrace),
            (r"\A\}", RBrace),
            (r"\A\(", LParen),
            (r"\A\)", RParen),
            (r"\A\[", LBracket),
            (r"\A\]", RBracket),
            (r"\A,", Comma),
            (r"\A;", Semicolon),
            (r"\A\+", Plus),
            (r"\A-", Minus),
            (r"\A==", EqEq),
            (r"\A<=", Le),
            (r"\A>=", Ge),
            (r"\A<", Lt),
            (r"\A>", Gt),
        ];
        specs
            .iter()
            .map(|(re, kind)| (Regex::new(re).unwrap(), *kind))
            .collect()
    })
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Lexer {
            input,
            pos: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v]|(?://.*))*").unwrap(),
            matchers: matchers().clone(),
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.skip_whitespace_peek() == self.input.len()
    }

    fn skip_whitespace_peek(&self) -> usize {
        match self.whitespace.find(&self.input[self.pos..]) {
            Some(m) => self.pos + m.end(),
            None => self.pos,
        }
    }

    // Skip comments and whitespace
    fn skip_whitespace(&mut self) {
        self.pos = self.skip_whitespace_peek();
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            return Ok(None);
        }
        let rest = &self.input[self.pos..];
        // Keywords are listed before the identifier pattern in `matchers`,
        // so the first match wins and `ifx` still lexes as one `Id`.
        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(rest) {
                let text = m.as_str();
                let tok = Token { kind: *kind, text };
                self.pos += text.len();
                return Ok(Some(tok));
            }
        }
        let bad = rest.chars().next().unwrap();
        Err(LexError(self.pos, bad))
    }
}

/// Tokenize the entire input, matching [`crate::front::parse::parse`]'s
/// expectations. Used both by the parser and by the `smolc --out tokens`
/// CLI dump.
pub fn lex_all(input: &str) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut out = Vec::new();
    while let Some(tok) = lexer.next()? {
        out.push(tok);
    }
    Ok(out)
}
