use std::{iter::Peekable, rc::Rc};

use crate::{errors, lexer::Token, LoxError};

use super::{Expr, FunDecl, Literal, Stmt};

/// Functions and calls are limited to this many parameters and arguments.
const MAX_ARITY: usize = 255;

pub struct Parser;

// Macros which make it easier to implement certain common parts of the parser.
macro_rules! rd_term {
    ($name:ident := $token_id:ident => $ret:ty : $body:expr) => {
        fn $name<T: Iterator<Item = Token>>(
            $token_id: &mut Peekable<T>,
        ) -> Result<$ret, LoxError> {
            $body
        }
    };

    ($name:ident := $next:ident ( $($token:ident)|+ ) => binary) => {
        rd_term!($name := tokens => Expr : {
            let mut left = Self::$next(tokens)?;

            while let Some(op) = rd_matches!(tokens, $($token)|+) {
                let right = Self::$next(tokens)?;
                left = Expr::Binary(Box::new(left), op, Box::new(right));
            }

            Ok(left)
        });
    };

    ($name:ident := $next:ident ( $($token:ident)|+ ) => logical) => {
        rd_term!($name := tokens => Expr : {
            let mut left = Self::$next(tokens)?;

            while let Some(op) = rd_matches!(tokens, $($token)|+) {
                let right = Self::$next(tokens)?;
                left = Expr::Logical(Box::new(left), op, Box::new(right));
            }

            Ok(left)
        });
    };
}

macro_rules! rd_matches {
    ($tokens:ident, $($token:ident)|+) => {
        if matches!($tokens.peek(), Some($(Token::$token(..))|+)) {
            $tokens.next()
        } else {
            None
        }
    };
}

macro_rules! rd_consume {
    ($tokens:ident, $($id:ident@$token:ident)|+ => $ok:expr, $msg:expr, $advice:expr) => {
        match $tokens.next() {
            Some($($id@Token::$token(..))|+) => $ok,
            Some(other) => return Err(errors::user(
                format!("{}, but got {} instead.", $msg, other),
                $advice
            )),
            None => return Err(errors::user(
                format!("{}, but reached the end of the file instead.", $msg),
                $advice
            )),
        }
    };

    ($tokens:ident, $($token:ident)|+ => $ok:expr, $msg:expr, $advice:expr) => {
        match $tokens.next() {
            Some($(Token::$token(..))|+) => $ok,
            Some(other) => return Err(errors::user(
                format!("{}, but got {} instead.", $msg, other),
                $advice
            )),
            None => return Err(errors::user(
                format!("{}, but reached the end of the file instead.", $msg),
                $advice
            )),
        }
    };

    ($tokens:ident, $($token:ident)|+, $msg:expr, $advice:expr) => {
        rd_consume!($tokens, $($token)|+ => {}, $msg, $advice)
    };
}

impl Parser {
    pub fn parse<T: Iterator<Item = Token>>(
        tokens: &mut T,
    ) -> (Vec<Stmt>, Vec<LoxError>) {
        let mut tokens = tokens.peekable();
        let mut stmts = Vec::new();
        let mut errs = Vec::new();

        while tokens.peek().is_some() {
            match Self::declaration(&mut tokens) {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    Self::synchronize(&mut tokens);
                    errs.push(err);
                },
            }
        }

        (stmts, errs)
    }

    pub fn parse_expr<T: Iterator<Item = Token>>(
        tokens: &mut T,
    ) -> Result<Expr, LoxError> {
        let mut tokens = tokens.peekable();
        Self::expression(&mut tokens)
    }

    rd_term!(declaration := tokens => Stmt : {
        match tokens.peek() {
            Some(Token::Class(_)) => {
                tokens.next();
                Self::class_declaration(tokens)
            },
            Some(Token::Fun(_)) => {
                tokens.next();
                Ok(Stmt::Fun(Self::function(tokens)?))
            },
            Some(Token::Var(_)) => {
                tokens.next();
                Self::var_declaration(tokens)
            },
            _ => Self::statement(tokens),
        }
    });

    rd_term!(class_declaration := tokens => Stmt : {
        let name = rd_consume!(tokens, ident@Identifier => ident, "Expected a class name after the `class` keyword", "Provide a name for your class after the `class` keyword.");

        rd_consume!(tokens, LeftBrace, "Expected an opening brace `{` before the class body", "Make sure you have an opening brace `{` after the class name.");

        let mut methods = Vec::new();
        while !matches!(tokens.peek(), Some(Token::RightBrace(_)) | None) {
            methods.push(Self::function(tokens)?);
        }

        rd_consume!(tokens, RightBrace => Ok(Stmt::Class(name, methods)), "Expected a closing brace `}` after the class body", "Make sure you have a closing brace `}` after the class body.")
    });

    rd_term!(function := tokens => Rc<FunDecl> : {
        let name = rd_consume!(tokens, ident@Identifier => ident, "Expected a function name", "Provide a name for your function, or use an anonymous `fun (...) { ... }` expression.");
        let loc = name.location();
        let (params, body) = Self::function_body(tokens)?;

        Ok(Rc::new(FunDecl { loc, name: Some(name), params, body }))
    });

    rd_term!(function_body := tokens => (Vec<Token>, Vec<Stmt>) : {
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` before the function's parameters", "Make sure you have an opening parenthesis `(` before the parameter list.");

        let mut params = Vec::new();
        if rd_matches!(tokens, RightParen).is_none() {
            loop {
                if params.len() >= MAX_ARITY {
                    return Err(errors::user(
                        format!("Functions cannot have more than {} parameters.", MAX_ARITY),
                        "Try grouping some of the parameters into an object.",
                    ));
                }

                params.push(rd_consume!(tokens, ident@Identifier => ident, "Expected a parameter name", "Make sure every parameter is a valid identifier."));

                if rd_matches!(tokens, Comma).is_none() {
                    break;
                }
            }

            rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the function's parameters", "Make sure you have a closing parenthesis `)` after the parameter list.");
        }

        rd_consume!(tokens, LeftBrace, "Expected an opening brace `{` before the function body", "Make sure you have an opening brace `{` after the parameter list.");

        let body = Self::block(tokens)?;
        Ok((params, body))
    });

    rd_term!(var_declaration := tokens => Stmt : {
        rd_consume!(tokens, ident@Identifier => {
            let init = if rd_matches!(tokens, Equal).is_some() {
                Some(Self::expression(tokens)?)
            } else {
                None
            };

            rd_consume!(
                tokens,
                Semicolon => Ok(Stmt::Var(ident, init)),
                "Expected ';' after variable declaration",
                "Make sure that you have a semicolon after the variable declaration.")
            },
            "Expected an identifier to be provided after 'var'",
            "Provide a variable name after the `var` keyword.")
    });

    rd_term!(statement := tokens => Stmt : {
        let stmt = match tokens.peek() {
            Some(Token::For(_)) => {
                tokens.next();
                return Self::for_statement(tokens)
            },
            Some(Token::If(_)) => {
                tokens.next();
                return Self::if_statement(tokens)
            },
            Some(Token::LeftBrace(_)) => {
                tokens.next();
                return Ok(Stmt::Block(Self::block(tokens)?))
            },
            Some(Token::While(_)) => {
                tokens.next();
                return Self::while_statement(tokens)
            },
            Some(Token::Print(_)) => {
                tokens.next();
                let expr = Self::expression(tokens)?;
                Stmt::Print(expr)
            },
            Some(Token::Return(_)) => {
                let keyword = rd_consume!(tokens, keyword@Return => keyword, "Expected a `return` keyword", "Start the statement with `return`.");
                let value = if matches!(tokens.peek(), Some(Token::Semicolon(_))) {
                    None
                } else {
                    Some(Self::expression(tokens)?)
                };
                Stmt::Return(keyword, value)
            },
            Some(Token::Break(_)) => {
                Stmt::Break(rd_consume!(tokens, keyword@Break => keyword, "Expected a `break` keyword", "Start the statement with `break`."))
            },
            Some(Token::Continue(_)) => {
                Stmt::Continue(rd_consume!(tokens, keyword@Continue => keyword, "Expected a `continue` keyword", "Start the statement with `continue`."))
            },
            _ => {
                let expr = Self::expression(tokens)?;
                Stmt::Expression(expr)
            }
        };

        rd_consume!(tokens, Semicolon => Ok(stmt), "Expected ';' after statement", "Make sure that you have a semicolon at the end of your previous statement.")
    });

    rd_term!(if_statement := tokens => Stmt : {
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` after the `if` keyword", "Make sure you have an opening parenthesis `(` after the `if` keyword.");

        let condition = Self::expression(tokens)?;

        rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the `if` keyword's condition", "Make sure you have a closing parenthesis `)` after the `if` keyword's condition.");

        let then_branch = Self::statement(tokens)?;

        Ok(Stmt::If(
            condition,
            Box::new(then_branch),
            if rd_matches!(tokens, Else).is_some() {
                let else_branch = Self::statement(tokens)?;
                Some(Box::new(else_branch))
            } else {
                None
            }
        ))
    });

    rd_term!(for_statement := tokens => Stmt : {
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` after the `for` keyword", "Make sure you have an opening parenthesis `(` after the `for` keyword.");

        let init = match tokens.peek() {
            Some(Token::Semicolon(_)) => {
                tokens.next();
                None
            },
            Some(Token::Var(_)) => {
                tokens.next();
                Some(Box::new(Self::var_declaration(tokens)?))
            },
            _ => {
                let expr = Stmt::Expression(Self::expression(tokens)?);
                rd_consume!(tokens, Semicolon, "Expected a semicolon after the initializer", "Make sure you have a semicolon after the initializer.");
                Some(Box::new(expr))
            }
        };

        let cond = if rd_matches!(tokens, Semicolon).is_some() {
            None
        } else {
            let cond = Self::expression(tokens)?;
            rd_consume!(tokens, Semicolon, "Expected a semicolon after the condition", "Make sure you have a semicolon after the condition.");
            Some(cond)
        };

        let incr = if rd_matches!(tokens, RightParen).is_some() {
            None
        } else {
            let incr = Self::expression(tokens)?;
            rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the `for` loop's clauses", "Make sure you have a closing parenthesis `)` after the `for` loop's increment.");
            Some(incr)
        };

        let body = Self::statement(tokens)?;

        Ok(Stmt::For(init, cond, incr, Box::new(body)))
    });

    rd_term!(while_statement := tokens => Stmt : {
        rd_consume!(tokens, LeftParen, "Expected an opening parenthesis `(` after the `while` keyword", "Make sure you have an opening parenthesis `(` after the `while` keyword.");

        let condition = Self::expression(tokens)?;

        rd_consume!(tokens, RightParen, "Expected a closing parenthesis `)` after the `while` keyword's condition", "Make sure you have a closing parenthesis `)` after the `while` keyword's condition.");

        let body = Self::statement(tokens)?;

        Ok(Stmt::While(condition, Box::new(body)))
    });

    rd_term!(block := tokens => Vec<Stmt> : {
        let mut stmts = Vec::new();

        while !matches!(tokens.peek(), Some(Token::RightBrace(_)) | None) {
            match Self::declaration(tokens) {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    Self::synchronize(tokens);
                    return Err(err)
                },
            }
        }

        rd_consume!(tokens, RightBrace => Ok(stmts), "Expected a closing brace `}` after the block", "Make sure you have a closing brace `}` after the block.")
    });

    rd_term!(expression := tokens => Expr : Self::comma(tokens));

    rd_term!(comma := tokens => Expr : {
        let mut left = Self::assignment(tokens)?;

        while rd_matches!(tokens, Comma).is_some() {
            let right = Self::assignment(tokens)?;
            left = Expr::Comma(Box::new(left), Box::new(right));
        }

        Ok(left)
    });

    rd_term!(assignment := tokens => Expr : {
        let expr = Self::ternary(tokens)?;

        if let Some(equals) = rd_matches!(tokens, Equal) {
            let value = Self::assignment(tokens)?;

            match expr {
                Expr::Var(name, _) => Ok(Expr::Assign(name, Box::new(value), Default::default())),
                Expr::Get(obj, name) => Ok(Expr::Set(obj, name, Box::new(value))),
                _ => Err(errors::user(
                    format!("Invalid assignment target for {}.", equals),
                    "Make sure that you provide the name of a variable or a property to assign to."
                )),
            }
        } else {
            Ok(expr)
        }
    });

    rd_term!(ternary := tokens => Expr : {
        let cond = Self::or(tokens)?;

        if rd_matches!(tokens, Question).is_none() {
            return Ok(cond);
        }

        let then_value = Self::assignment(tokens)?;
        rd_consume!(tokens, Colon, "Expected a `:` between the branches of the conditional expression", "Make sure your conditional expression looks like `condition ? a : b`.");
        let else_value = Self::ternary(tokens)?;

        Ok(Expr::Ternary(Box::new(cond), Box::new(then_value), Box::new(else_value)))
    });

    rd_term!(or := and (Or) => logical);

    rd_term!(and := equality (And) => logical);

    rd_term!(equality := comparison (BangEqual | EqualEqual) => binary);

    rd_term!(comparison := term (Greater | GreaterEqual | Less | LessEqual) => binary);

    rd_term!(term := factor (Minus | Plus) => binary);

    rd_term!(factor := unary (Star | Slash) => binary);

    rd_term!(unary := tokens => Expr : {
        if let Some(op) = rd_matches!(tokens, Bang | Minus) {
            let right = Self::unary(tokens)?;
            return Ok(Expr::Unary(op, Box::new(right)));
        }

        Self::call(tokens)
    });

    rd_term!(call := tokens => Expr : {
        let mut expr = Self::primary(tokens)?;

        loop {
            if rd_matches!(tokens, LeftParen).is_some() {
                let mut args = Vec::new();
                if !matches!(tokens.peek(), Some(Token::RightParen(_))) {
                    loop {
                        if args.len() >= MAX_ARITY {
                            return Err(errors::user(
                                format!("Function calls cannot have more than {} arguments.", MAX_ARITY),
                                "Try grouping some of the arguments into an object.",
                            ));
                        }

                        args.push(Self::assignment(tokens)?);

                        if rd_matches!(tokens, Comma).is_none() {
                            break;
                        }
                    }
                }

                let close = rd_consume!(tokens, paren@RightParen => paren, "Expected a closing parenthesis `)` after the call's arguments", "Make sure you have a closing parenthesis `)` after the arguments.");
                expr = Expr::Call(Box::new(expr), args, close);
            } else if rd_matches!(tokens, Dot).is_some() {
                let name = rd_consume!(tokens, ident@Identifier => ident, "Expected a property name after `.`", "Make sure you provide the name of the property you want to access.");
                expr = Expr::Get(Box::new(expr), name);
            } else {
                break;
            }
        }

        Ok(expr)
    });

    rd_term!(primary := tokens => Expr : {
        match tokens.next() {
            Some(Token::False(loc)) => Ok(Expr::Literal(loc, Literal::Bool(false))),
            Some(Token::True(loc)) => Ok(Expr::Literal(loc, Literal::Bool(true))),
            Some(Token::Nil(loc)) => Ok(Expr::Literal(loc, Literal::Nil)),

            Some(Token::Number(loc, lexeme)) => {
                let value = lexeme.parse().map_err(|_| errors::user(
                    format!("Unable to parse number '{}' at {}.", lexeme, loc),
                    "Make sure you have provided a valid number within the bounds of a 64-bit floating point number.",
                ))?;
                Ok(Expr::Literal(loc, Literal::Number(value)))
            },
            Some(Token::String(loc, lexeme)) => {
                let value = lexeme[1..lexeme.len() - 1].to_string();
                Ok(Expr::Literal(loc, Literal::String(value)))
            },
            Some(Token::LeftParen(_)) => {
                let expr = Self::expression(tokens)?;
                rd_consume!(tokens, RightParen => Ok(Expr::Grouping(Box::new(expr))), "Expected a closing parenthesis `)` after the expression", "Make sure you have a closing parenthesis `)` after the expression.")
            },
            Some(Token::Fun(loc)) => {
                let (params, body) = Self::function_body(tokens)?;
                Ok(Expr::Fun(Rc::new(FunDecl { loc, name: None, params, body })))
            },
            Some(this @ Token::This(_)) => Ok(Expr::This(this, Default::default())),
            Some(var @ Token::Identifier(..)) => Ok(Expr::Var(var, Default::default())),
            Some(t) => Err(errors::user(
                format!("Encountered an unexpected {} while waiting for one of ['true', 'false', 'nil', 'this', 'fun', number, string, identifier, '('].", t),
                "Make sure that you are providing a primary value at this location.",
            )),
            None => Err(errors::user(
                "Reached the end of the input while waiting for one of ['true', 'false', 'nil', 'this', 'fun', number, string, identifier, '('].",
                "Make sure that you have provided a valid expression."))
        }
    });

    fn synchronize<T: Iterator<Item = Token>>(tokens: &mut Peekable<T>) {
        while let Some(token) = tokens.next() {
            match (token, tokens.peek()) {
                // If we reach a semicolon, we can stop because the next token will be the start of a new statement
                (Token::Semicolon(_), _) => break,
                // If the next token is the start of a new statement, we can stop
                (
                    _,
                    Some(
                        Token::Class(_)
                        | Token::Fun(_)
                        | Token::Var(_)
                        | Token::For(_)
                        | Token::If(_)
                        | Token::While(_)
                        | Token::Print(_)
                        | Token::Return(_),
                    ),
                ) => break,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{printer::AstPrinter, StmtVisitor, ExprVisitor},
        lexer::Scanner,
    };

    use super::Parser;

    fn test_parse_expr(source: &str, expected: &str) {
        let lexer = Scanner::new(source);
        let expr = Parser::parse_expr(&mut lexer.filter_map(|x| x.ok())).expect("no errors");
        assert_eq!(
            AstPrinter {}.visit_expr(&expr),
            expected,
            "the expression should be parsed correctly"
        );
    }

    fn test_parse(source: &str, expected: &str) {
        let lexer = Scanner::new(source);
        let (tree, errs) = Parser::parse(&mut lexer.filter_map(|x| x.ok()));
        assert!(errs.is_empty(), "no errors should be returned, got {:?}", errs);

        assert_eq!(
            AstPrinter {}.visit_stmt(tree.first().expect("a statement")),
            expected,
            "the statement should be parsed correctly"
        );
    }

    #[test]
    fn parse_basic_expression() {
        test_parse_expr("1 + 2", "(+ 1 2)");
        test_parse_expr("10 - 5 / (2 * 3)", "(- 10 (/ 5 (group (* 2 3))))");
    }

    #[test]
    fn parse_left_associative() {
        test_parse_expr("1 - 2 - 3", "(- (- 1 2) 3)");
        test_parse_expr("a or b or c", "(or (or a b) c)");
    }

    #[test]
    fn parse_ternary_and_comma() {
        test_parse_expr("a ? b : c ? d : e", "(?: a b (?: c d e))");
        test_parse_expr("a = 1, b", "(, (= a 1) b)");
    }

    #[test]
    fn parse_calls_and_properties() {
        test_parse_expr("a.b(1, 2).c = 3", "(set (call a.b 1 2).c 3)");
    }

    #[test]
    fn parse_block() {
        test_parse("{ 10; 20; 30; }", "(block (10) (20) (30))");
    }

    #[test]
    fn parse_var_def() {
        test_parse("var a = 10;", "(var a 10)");
        test_parse("var a;", "(var a)");
    }

    #[test]
    fn parse_if() {
        test_parse("if (x > 5) { 10; } else { 20; }", "(if (> x 5) (block (10)) (block (20)))");
    }

    #[test]
    fn parse_while() {
        test_parse("while (x > 5) { 10; }", "(while (> x 5) (block (10)))");
    }

    #[test]
    fn parse_for() {
        test_parse("for (var i = 0; i < 10; i = i + 1) { 10; }", "(for (var i 0) (< i 10) (= i (+ i 1)) (block (10)))");
        test_parse("for (;;) break;", "(for _ _ _ (break))");
    }

    #[test]
    fn parse_functions() {
        test_parse("fun add(a, b) { return a + b; }", "(fun add a b (block (return (+ a b))))");
        test_parse("var f = fun (x) { return x; };", "(var f (fun @anonymous x (block (return x))))");
    }

    #[test]
    fn parse_class() {
        test_parse("class A { get() { return this.x; } }", "(class A (fun get (block (return this.x))))");
    }

    #[test]
    fn parse_invalid_assignment() {
        let (_, errs) = Parser::parse(&mut Scanner::new("1 = 2;").filter_map(|x| x.ok()));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].description(), "Invalid assignment target for '=' at line 1, column 3.");
    }

    #[test]
    fn parse_recovers_after_errors() {
        let (tree, errs) = Parser::parse(&mut Scanner::new("var = 1; print 2;").filter_map(|x| x.ok()));
        assert_eq!(errs.len(), 1);
        assert_eq!(tree.len(), 1, "the print statement should still be parsed");
    }
}
