//! Hand-rolled lexer feeding the default recursive-descent parser
//! (spec.md treats lexing/parsing as an external collaborator; this is the
//! one concrete implementation shipped so `EvalString` works unaided).

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    String(String),
    Ident(String),
    // keywords
    If,
    Else,
    While,
    For,
    Of,
    Break,
    Continue,
    Return,
    Tool,
    Model,
    Agent,
    Mcp,
    True,
    False,
    Null,
    And,
    Or,
    Not,
    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Question,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    EqEq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Eof,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Tokenizes the whole source up front. Returns `(token, byte_position)`
    /// pairs so parse errors can report a position.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, (usize, String)> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let Some((pos, c)) = self.chars.peek().copied() else {
                out.push((Token::Eof, self.src.len()));
                break;
            };
            let tok = if c.is_ascii_digit() {
                self.lex_number(pos)
            } else if c == '"' || c == '\'' {
                self.lex_string(pos)?
            } else if is_ident_start(c) {
                self.lex_ident()
            } else {
                self.lex_punct(pos)?
            };
            out.push((tok, pos));
        }
        Ok(out)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    if clone.peek().map(|(_, c)| *c) == Some('/') {
                        self.chars.next();
                        self.chars.next();
                        for (_, c) in self.chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        let mut end = start;
        while let Some((i, c)) = self.chars.peek().copied() {
            if c.is_ascii_digit() || c == '.' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.src[start..end];
        Token::Number(text.parse().unwrap_or(0.0))
    }

    fn lex_string(&mut self, _start: usize) -> Result<Token, (usize, String)> {
        let (_, quote) = self.chars.next().expect("checked by caller");
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, 'r')) => s.push('\r'),
                    Some((_, c)) => s.push(c),
                    None => return Err((self.src.len(), "unterminated string escape".into())),
                },
                Some((_, c)) => s.push(c),
                None => return Err((self.src.len(), "unterminated string literal".into())),
            }
        }
        Ok(Token::String(s))
    }

    fn lex_ident(&mut self) -> Token {
        let start = self.chars.peek().map(|(i, _)| *i).unwrap_or(0);
        let mut end = start;
        while let Some((i, c)) = self.chars.peek().copied() {
            if is_ident_continue(c) {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.src[start..end];
        match text {
            "if" => Token::If,
            "else" => Token::Else,
            "while" => Token::While,
            "for" => Token::For,
            "of" => Token::Of,
            "break" => Token::Break,
            "continue" => Token::Continue,
            "return" => Token::Return,
            "tool" => Token::Tool,
            "model" => Token::Model,
            "agent" => Token::Agent,
            "mcp" => Token::Mcp,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(text.to_string()),
        }
    }

    fn lex_punct(&mut self, pos: usize) -> Result<Token, (usize, String)> {
        let (_, c) = self.chars.next().expect("checked by caller");
        macro_rules! two_char {
            ($second:expr, $then:expr, $else_:expr) => {{
                if self.peek_char() == Some($second) {
                    self.chars.next();
                    $then
                } else {
                    $else_
                }
            }};
        }
        Ok(match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '.' => Token::Dot,
            '?' => Token::Question,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '%' => Token::Percent,
            '/' => Token::Slash,
            '=' => two_char!('=', Token::EqEq, Token::Eq),
            '!' => two_char!('=', Token::NotEq, Token::Not),
            '<' => two_char!('=', Token::Lte, Token::Lt),
            '>' => two_char!('=', Token::Gte, Token::Gt),
            '&' => {
                if self.peek_char() == Some('&') {
                    self.chars.next();
                    Token::And
                } else {
                    return Err((pos, "unexpected '&'".into()));
                }
            }
            '|' => {
                if self.peek_char() == Some('|') {
                    self.chars.next();
                    Token::Or
                } else {
                    return Err((pos, "unexpected '|'".into()));
                }
            }
            other => return Err((pos, format!("unexpected character '{other}'"))),
        })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
