use crate::core::Loc;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftParen(Loc),
    RightParen(Loc),
    LeftBrace(Loc),
    RightBrace(Loc),
    Colon(Loc),
    Comma(Loc),
    Dot(Loc),
    Minus(Loc),
    Plus(Loc),
    Question(Loc),
    Semicolon(Loc),
    Slash(Loc),
    Star(Loc),

    Bang(Loc),
    BangEqual(Loc),
    Equal(Loc),
    EqualEqual(Loc),
    Greater(Loc),
    GreaterEqual(Loc),
    Less(Loc),
    LessEqual(Loc),

    Identifier(Loc, String),
    /// A string literal, including its surrounding quotes.
    String(Loc, String),
    Number(Loc, String),

    And(Loc),
    Break(Loc),
    Class(Loc),
    Continue(Loc),
    Else(Loc),
    False(Loc),
    For(Loc),
    Fun(Loc),
    If(Loc),
    Nil(Loc),
    Or(Loc),
    Print(Loc),
    Return(Loc),
    This(Loc),
    True(Loc),
    Var(Loc),
    While(Loc),
}

impl Token {
    pub fn lexeme(&self) -> &str {
        match self {
            Token::LeftParen(_) => "(",
            Token::RightParen(_) => ")",
            Token::LeftBrace(_) => "{",
            Token::RightBrace(_) => "}",
            Token::Colon(_) => ":",
            Token::Comma(_) => ",",
            Token::Dot(_) => ".",
            Token::Minus(_) => "-",
            Token::Plus(_) => "+",
            Token::Question(_) => "?",
            Token::Semicolon(_) => ";",
            Token::Slash(_) => "/",
            Token::Star(_) => "*",
            Token::Bang(_) => "!",
            Token::BangEqual(_) => "!=",
            Token::Equal(_) => "=",
            Token::EqualEqual(_) => "==",
            Token::Greater(_) => ">",
            Token::GreaterEqual(_) => ">=",
            Token::Less(_) => "<",
            Token::LessEqual(_) => "<=",
            Token::Identifier(_, lexeme) | Token::String(_, lexeme) | Token::Number(_, lexeme) => lexeme,
            Token::And(_) => "and",
            Token::Break(_) => "break",
            Token::Class(_) => "class",
            Token::Continue(_) => "continue",
            Token::Else(_) => "else",
            Token::False(_) => "false",
            Token::For(_) => "for",
            Token::Fun(_) => "fun",
            Token::If(_) => "if",
            Token::Nil(_) => "nil",
            Token::Or(_) => "or",
            Token::Print(_) => "print",
            Token::Return(_) => "return",
            Token::This(_) => "this",
            Token::True(_) => "true",
            Token::Var(_) => "var",
            Token::While(_) => "while",
        }
    }

    pub fn location(&self) -> Loc {
        match self {
            Token::LeftParen(loc)
            | Token::RightParen(loc)
            | Token::LeftBrace(loc)
            | Token::RightBrace(loc)
            | Token::Colon(loc)
            | Token::Comma(loc)
            | Token::Dot(loc)
            | Token::Minus(loc)
            | Token::Plus(loc)
            | Token::Question(loc)
            | Token::Semicolon(loc)
            | Token::Slash(loc)
            | Token::Star(loc)
            | Token::Bang(loc)
            | Token::BangEqual(loc)
            | Token::Equal(loc)
            | Token::EqualEqual(loc)
            | Token::Greater(loc)
            | Token::GreaterEqual(loc)
            | Token::Less(loc)
            | Token::LessEqual(loc)
            | Token::Identifier(loc, _)
            | Token::String(loc, _)
            | Token::Number(loc, _)
            | Token::And(loc)
            | Token::Break(loc)
            | Token::Class(loc)
            | Token::Continue(loc)
            | Token::Else(loc)
            | Token::False(loc)
            | Token::For(loc)
            | Token::Fun(loc)
            | Token::If(loc)
            | Token::Nil(loc)
            | Token::Or(loc)
            | Token::Print(loc)
            | Token::Return(loc)
            | Token::This(loc)
            | Token::True(loc)
            | Token::Var(loc)
            | Token::While(loc) => *loc,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "'{}' at {}", self.lexeme(), self.location())
    }
}
