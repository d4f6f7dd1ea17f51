use super::error::{QueryErr, Result};
use std::collections::VecDeque;
use std::fmt;

/// `USE`, `SHOW`, `TABLES`, `DATABASES`, `ASC`, `DESC` and `KEY` are not
/// reserved: they lex as identifiers and the parser matches them by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Null,
    Bool(bool),
    Num(String),
    Text(String),
    // 식별자
    Ident(String),
    // 키워드
    Create,     // CREATE
    Table,      // TABLE
    Database,   // DATABASE
    Insert,     // INSERT
    Into,       // INTO
    Values,     // VALUES
    Select,     // SELECT
    From,       // FROM
    Where,      // WHERE
    Update,     // UPDATE
    Set,        // SET
    Delete,     // DELETE
    Drop,       // DROP
    Join,       // JOIN
    Inner,      // INNER
    Left,       // LEFT
    Full,       // FULL
    Outer,      // OUTER
    On,         // ON
    As,         // AS
    Group,      // GROUP
    Order,      // ORDER
    By,         // BY
    Having,     // HAVING
    Primary,    // PRIMARY
    Foreign,    // FOREIGN
    References, // REFERENCES
    // 구분자
    Dot,       // .
    Comma,     // ,
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    // 연산자
    Not, // NOT
    And, // AND
    Or,  // OR
    Eq,  // =
    Ne,  // != or <>
    Gt,  // >
    Lt,  // <
    Ge,  // >=
    Le,  // <=
    Sub, // -
    Mul, // *
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Null => "NULL",
            Token::Bool(true) => "TRUE",
            Token::Bool(false) => "FALSE",
            Token::Num(num) => return write!(f, "number {num}"),
            Token::Text(text) => return write!(f, "text '{text}'"),
            Token::Ident(ident) => return write!(f, "identifier '{ident}'"),
            Token::Create => "CREATE",
            Token::Table => "TABLE",
            Token::Database => "DATABASE",
            Token::Insert => "INSERT",
            Token::Into => "INTO",
            Token::Values => "VALUES",
            Token::Select => "SELECT",
            Token::From => "FROM",
            Token::Where => "WHERE",
            Token::Update => "UPDATE",
            Token::Set => "SET",
            Token::Delete => "DELETE",
            Token::Drop => "DROP",
            Token::Join => "JOIN",
            Token::Inner => "INNER",
            Token::Left => "LEFT",
            Token::Full => "FULL",
            Token::Outer => "OUTER",
            Token::On => "ON",
            Token::As => "AS",
            Token::Group => "GROUP",
            Token::Order => "ORDER",
            Token::By => "BY",
            Token::Having => "HAVING",
            Token::Primary => "PRIMARY",
            Token::Foreign => "FOREIGN",
            Token::References => "REFERENCES",
            Token::Dot => "'.'",
            Token::Comma => "','",
            Token::Semicolon => "';'",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::Not => "NOT",
            Token::And => "AND",
            Token::Or => "OR",
            Token::Eq => "'='",
            Token::Ne => "'!='",
            Token::Gt => "'>'",
            Token::Lt => "'<'",
            Token::Ge => "'>='",
            Token::Le => "'<='",
            Token::Sub => "'-'",
            Token::Mul => "'*'",
        };
        f.write_str(text)
    }
}

pub struct Lexer {
    src: VecDeque<char>,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
        }
    }

    fn is_letter(ch: char) -> bool {
        ch.is_alphabetic() || ch == '_'
    }

    fn is_digit(ch: char) -> bool {
        ch.is_ascii_digit()
    }

    pub fn finished(&self) -> bool {
        self.src.is_empty()
    }

    fn curr(&self) -> Option<char> {
        self.src.front().copied()
    }

    fn peek(&self, step: usize) -> String {
        self.src.iter().take(step).collect()
    }

    fn walk(&mut self) -> Option<char> {
        self.src.pop_front()
    }

    /// Skips whitespace and `--` line comments.
    fn skip_ws(&mut self) {
        loop {
            while let Some(ch) = self.curr()
                && ch.is_whitespace()
            {
                self.walk();
            }
            if self.peek(2) != "--" {
                break;
            }
            while let Some(ch) = self.walk()
                && ch != '\n'
            {}
        }
    }

    /// Lexes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws();
            if self.finished() {
                return Ok(tokens);
            }
            tokens.push(self.next()?);
        }
    }

    /// Lexes the input one `;`-terminated statement at a time. A lexing
    /// error fails only its own statement; lexing resumes after the next `;`.
    pub fn tokenize_each(mut self) -> Vec<Result<Vec<Token>>> {
        let mut out = Vec::new();
        let mut tokens = Vec::new();
        loop {
            self.skip_ws();
            if self.finished() {
                if !tokens.is_empty() {
                    out.push(Ok(tokens));
                }
                return out;
            }
            match self.next() {
                Ok(Token::Semicolon) => {
                    if !tokens.is_empty() {
                        out.push(Ok(std::mem::take(&mut tokens)));
                    }
                }
                Ok(token) => tokens.push(token),
                Err(e) => {
                    tokens.clear();
                    while let Some(ch) = self.walk()
                        && ch != ';'
                    {}
                    out.push(Err(e));
                }
            }
        }
    }

    pub fn next(&mut self) -> Result<Token> {
        self.skip_ws();
        let ch = self.walk().ok_or(QueryErr::UnexpectedEof)?;
        Ok(match ch {
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '=' => Token::Eq,
            '!' => {
                if self.curr() == Some('=') {
                    self.walk();
                    Token::Ne
                } else {
                    return Err(QueryErr::InvalidToken(ch));
                }
            }
            '>' => {
                if self.curr() == Some('=') {
                    self.walk();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '<' => match self.curr() {
                Some('=') => {
                    self.walk();
                    Token::Le
                }
                Some('>') => {
                    self.walk();
                    Token::Ne
                }
                _ => Token::Lt,
            },
            '-' => Token::Sub,
            '*' => Token::Mul,
            '\'' | '"' => self.lex_text(ch)?,
            _ if Self::is_digit(ch) => self.lex_num(ch)?,
            _ if Self::is_letter(ch) => self.lex_keyword(ch),
            _ => return Err(QueryErr::InvalidToken(ch)),
        })
    }

    fn lex_num(&mut self, start: char) -> Result<Token> {
        let mut float = false;
        let mut out = String::from(start);
        while let Some(ch) = self.curr() {
            if Self::is_digit(ch) {
                out.push(ch);
                self.walk();
            } else if ch == '.' && !float {
                float = true;
                out.push(ch);
                self.walk();
            } else {
                break;
            }
        }
        if let Some(ch) = self.curr()
            && Self::is_letter(ch)
        {
            out.push(ch);
            return Err(QueryErr::InvalidNum(out));
        }
        if float && out.ends_with('.') {
            out.push('0');
        }
        Ok(Token::Num(out))
    }

    fn lex_text(&mut self, quote: char) -> Result<Token> {
        let mut out = String::new();
        while let Some(ch) = self.walk() {
            if ch == quote {
                return Ok(Token::Text(out));
            } else if ch == '\\' {
                let esc = self.walk().ok_or(QueryErr::UnterminatedText)?;
                match esc {
                    '\\' => out.push('\\'),
                    '\'' => out.push('\''),
                    '"' => out.push('"'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    _ => {
                        out.push(ch);
                        out.push(esc);
                    }
                }
            } else {
                out.push(ch);
            }
        }
        Err(QueryErr::UnterminatedText)
    }

    fn lex_keyword(&mut self, start: char) -> Token {
        let mut out = String::from(start);
        while let Some(ch) = self.curr()
            && (Self::is_letter(ch) || Self::is_digit(ch))
        {
            out.push(ch);
            self.walk();
        }
        // 키워드 매칭
        match out.to_uppercase().as_str() {
            "NULL" => Token::Null,
            "TRUE" => Token::Bool(true),
            "FALSE" => Token::Bool(false),
            "CREATE" => Token::Create,
            "TABLE" => Token::Table,
            "DATABASE" => Token::Database,
            "INSERT" => Token::Insert,
            "INTO" => Token::Into,
            "VALUES" => Token::Values,
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "UPDATE" => Token::Update,
            "SET" => Token::Set,
            "DELETE" => Token::Delete,
            "DROP" => Token::Drop,
            "JOIN" => Token::Join,
            "INNER" => Token::Inner,
            "LEFT" => Token::Left,
            "FULL" => Token::Full,
            "OUTER" => Token::Outer,
            "ON" => Token::On,
            "AS" => Token::As,
            "GROUP" => Token::Group,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "HAVING" => Token::Having,
            "PRIMARY" => Token::Primary,
            "FOREIGN" => Token::Foreign,
            "REFERENCES" => Token::References,
            "NOT" => Token::Not,
            "AND" => Token::And,
            "OR" => Token::Or,
            _ => Token::Ident(out),
        }
    }
}
