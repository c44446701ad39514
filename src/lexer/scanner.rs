use crate::{core::Loc, errors, LoxError};

use super::Token;

#[derive(Debug)]
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    line: usize,
    line_start: usize,
}

#[allow(clippy::while_let_on_iterator)]
impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            line_start: 0,
        }
    }

    fn location(&self, offset: usize) -> Loc {
        Loc::new(self.line, offset - self.line_start + 1)
    }

    fn newline(&mut self, offset: usize) {
        self.line += 1;
        self.line_start = offset + 1;
    }

    fn match_char(&mut self, next: char) -> bool {
        if self.chars.next_if(|(_, c)| *c == next).is_some() {
            return true;
        }

        false
    }

    /// Consumes characters while `f` holds, returning the byte offset just past
    /// the last consumed character (or `end` if nothing was consumed).
    fn advance_while<F: Fn(char) -> bool>(&mut self, mut end: usize, f: F) -> usize {
        while let Some((offset, c)) = self.chars.next_if(|(_, c)| f(*c)) {
            end = offset + c.len_utf8();
        }

        end
    }

    fn read_token(&mut self) -> Option<Result<Token, LoxError>> {
        while let Some((offset, char)) = self.chars.next() {
            let location = self.location(offset);

            match char {
                ' ' | '\r' | '\t' => continue,
                '\n' => self.newline(offset),
                '(' => return Some(Ok(Token::LeftParen(location))),
                ')' => return Some(Ok(Token::RightParen(location))),
                '{' => return Some(Ok(Token::LeftBrace(location))),
                '}' => return Some(Ok(Token::RightBrace(location))),
                ':' => return Some(Ok(Token::Colon(location))),
                ',' => return Some(Ok(Token::Comma(location))),
                '.' => return Some(Ok(Token::Dot(location))),
                '-' => return Some(Ok(Token::Minus(location))),
                '+' => return Some(Ok(Token::Plus(location))),
                '?' => return Some(Ok(Token::Question(location))),
                ';' => return Some(Ok(Token::Semicolon(location))),
                '*' => return Some(Ok(Token::Star(location))),

                '!' if self.match_char('=') => return Some(Ok(Token::BangEqual(location))),
                '!' => return Some(Ok(Token::Bang(location))),
                '=' if self.match_char('=') => return Some(Ok(Token::EqualEqual(location))),
                '=' => return Some(Ok(Token::Equal(location))),
                '>' if self.match_char('=') => return Some(Ok(Token::GreaterEqual(location))),
                '>' => return Some(Ok(Token::Greater(location))),
                '<' if self.match_char('=') => return Some(Ok(Token::LessEqual(location))),
                '<' => return Some(Ok(Token::Less(location))),

                '/' if self.match_char('/') => {
                    // The newline itself is left for the main loop so that line tracking stays in one place.
                    while self.chars.next_if(|(_, c)| *c != '\n').is_some() {}
                },
                '/' if self.match_char('*') => {
                    let mut depth = 1;
                    while let Some((offset, c)) = self.chars.next() {
                        match c {
                            '\n' => self.newline(offset),
                            '/' if self.match_char('*') => depth += 1,
                            '*' if self.match_char('/') => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            },
                            _ => {}
                        }
                    }
                },
                '/' => return Some(Ok(Token::Slash(location))),

                '"' => return Some(self.read_string(offset, location)),

                c if c.is_ascii_digit() => return Some(Ok(self.read_number(offset, location))),
                c if c.is_alphabetic() || c == '_' => return Some(Ok(self.read_identifier(offset, location))),

                c => return Some(Err(errors::user(
                    format!("We found an unexpected character '{}' at {} where we were expecting one of: [whitespace, parenthesis, brace, operator, identifier, number, string, comment]", c, location),
                    "Make sure you have entered valid Lox code and have not accidentally closed a string.",
                ))),
            }
        }

        None
    }

    fn read_string(&mut self, start: usize, location: Loc) -> Result<Token, LoxError> {
        while let Some((offset, c)) = self.chars.next() {
            match c {
                '\n' => self.newline(offset),
                '"' => return Ok(Token::String(location, self.source[start..offset + 1].to_string())),
                _ => {}
            }
        }

        Err(errors::user(
            format!("Reached the end of the file while reading the string which starts at {}.", location),
            "Make sure that you have closed the string with a matching `\"`.",
        ))
    }

    fn read_number(&mut self, start: usize, location: Loc) -> Token {
        let mut end = self.advance_while(start + 1, |c| c.is_ascii_digit());

        // A fractional part needs at least one digit after the dot, so `12.` scans as `12` followed by `.`
        let has_fraction = self.source[end..].starts_with('.')
            && self.source[end + 1..].starts_with(|c: char| c.is_ascii_digit());
        if has_fraction {
            self.chars.next();
            end = self.advance_while(end + 1, |c| c.is_ascii_digit());
        }

        Token::Number(location, self.source[start..end].to_string())
    }

    fn read_identifier(&mut self, start: usize, location: Loc) -> Token {
        let first = self.source[start..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        let end = self.advance_while(start + first, |c| c.is_alphanumeric() || c == '_');

        match &self.source[start..end] {
            "and" => Token::And(location),
            "break" => Token::Break(location),
            "class" => Token::Class(location),
            "continue" => Token::Continue(location),
            "else" => Token::Else(location),
            "false" => Token::False(location),
            "for" => Token::For(location),
            "fun" => Token::Fun(location),
            "if" => Token::If(location),
            "nil" => Token::Nil(location),
            "or" => Token::Or(location),
            "print" => Token::Print(location),
            "return" => Token::Return(location),
            "this" => Token::This(location),
            "true" => Token::True(location),
            "var" => Token::Var(location),
            "while" => Token::While(location),
            lexeme => Token::Identifier(location, lexeme.to_string()),
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, LoxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_token()
    }
}
