use std::{io::Write, rc::Rc};

use fnv::FnvHashMap;
use tracing::debug;

use crate::{ast::{Expr, ExprVisitor, FunDecl, Literal, Resolution, Resolved, Stmt, StmtVisitor}, errors, lexer::Token, Loc, LoxError};

use super::{Class, Flow, Fun, Instance, Interpreter, Value};

impl Interpreter {
    fn lookup(&self, name: &Token, resolved: &Resolution) -> Result<Value, LoxError> {
        match resolved.get() {
            Some(Resolved { depth, slot }) => self.env.read_at(depth, slot, name),
            None => self.env.read_named(name),
        }
    }

    fn numbers(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64), LoxError> {
        match (left, right) {
            (Value::Number(left), Value::Number(right)) => Ok((*left, *right)),
            (left, right) => Err(errors::runtime(
                op.location(),
                "Operands must be numbers.",
                format!("The '{}' operator needs a number on both sides, but got a {} and a {}.", op.lexeme(), left.type_name(), right.type_name()),
            )),
        }
    }

    fn evaluate_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, LoxError> {
        args.iter().map(|arg| self.visit_expr(arg)).collect()
    }

    fn check_arity(expected: usize, got: usize, close: &Token) -> Result<(), LoxError> {
        if expected == got {
            return Ok(());
        }

        Err(errors::runtime(
            close.location(),
            format!("Expected {} arguments but got {}.", expected, got),
            "Make sure that you are passing the same number of arguments as the function declares parameters.",
        ))
    }

    /// Binds the next slot of the current frame. Only globals and function
    /// declarations are visible to the name lookup of unresolved references.
    fn declare<S: Into<String>>(&mut self, name: S, value: Option<Value>) {
        if self.env == self.globals {
            self.env.declare_named(name, value);
        } else {
            self.env.declare_slot(value);
        }
    }

    fn run_loop<F: FnMut(&mut Self) -> Result<bool, LoxError>>(&mut self, mut cond: F, body: &Stmt, incr: Option<&Expr>) -> Result<(), Flow> {
        while cond(self)? {
            match self.visit_stmt(body) {
                Ok(()) | Err(Flow::Continue) => {},
                Err(Flow::Break) => break,
                Err(flow) => return Err(flow),
            }

            if let Some(incr) = incr {
                self.visit_expr(incr)?;
            }
        }

        Ok(())
    }
}

impl ExprVisitor<Result<Value, LoxError>> for Interpreter {
    fn visit_assign(&mut self, ident: &Token, value: &Expr, resolved: &Resolution) -> Result<Value, LoxError> {
        let value = self.visit_expr(value)?;

        match resolved.get() {
            Some(Resolved { depth, slot }) => self.env.write_at(depth, slot, ident, value.clone())?,
            None => self.env.assign_named(ident, value.clone())?,
        }

        Ok(value)
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, LoxError> {
        let left = self.visit_expr(left)?;
        let right = self.visit_expr(right)?;

        match op {
            Token::EqualEqual(_) => Ok(Value::Bool(left == right)),
            Token::BangEqual(_) => Ok(Value::Bool(left != right)),
            Token::Greater(_) => Self::numbers(op, &left, &right).map(|(l, r)| Value::Bool(l > r)),
            Token::GreaterEqual(_) => Self::numbers(op, &left, &right).map(|(l, r)| Value::Bool(l >= r)),
            Token::Less(_) => Self::numbers(op, &left, &right).map(|(l, r)| Value::Bool(l < r)),
            Token::LessEqual(_) => Self::numbers(op, &left, &right).map(|(l, r)| Value::Bool(l <= r)),
            Token::Minus(_) => Self::numbers(op, &left, &right).map(|(l, r)| Value::Number(l - r)),
            Token::Star(_) => Self::numbers(op, &left, &right).map(|(l, r)| Value::Number(l * r)),
            Token::Slash(_) => {
                let (l, r) = Self::numbers(op, &left, &right)?;
                if r == 0.0 {
                    return Err(errors::runtime(
                        op.location(),
                        "Cannot divide by zero.",
                        "Check that the divisor is not zero before dividing by it.",
                    ));
                }

                Ok(Value::Number(l / r))
            },
            Token::Plus(_) => match (left, right) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(l), Value::String(r)) => Ok(Value::from(format!("{}{}", l, r))),
                (Value::String(l), Value::Number(r)) => Ok(Value::from(format!("{}{}", l, r))),
                (Value::Number(l), Value::String(r)) => Ok(Value::from(format!("{}{}", l, r))),
                (left, right) => Err(errors::runtime(
                    op.location(),
                    "Operands must be two numbers or a string and a number.",
                    format!("Only numbers are converted to strings when concatenating, but got a {} and a {}.", left.type_name(), right.type_name()),
                )),
            },
            _ => Err(errors::system(
                format!("Received an unexpected binary operator {}.", op),
                "This is a bug in the parser, please report it with example code.",
            )),
        }
    }

    fn visit_call(&mut self, callee: &Expr, args: &[Expr], close: &Token) -> Result<Value, LoxError> {
        let fun = match self.visit_expr(callee)? {
            Value::Function(fun) => fun,
            Value::Class(class) => {
                let args = self.evaluate_args(args)?;
                Self::check_arity(0, args.len(), close)?;

                debug!(class = class.name(), "created instance");
                return Ok(Value::Instance(Instance::new(class)));
            },
            other => return Err(errors::runtime(
                close.location(),
                "Can only call functions and classes.",
                format!("A {} value cannot be called, make sure you are calling the right variable.", other.type_name()),
            )),
        };

        let args = self.evaluate_args(args)?;
        Self::check_arity(fun.arity(), args.len(), close)?;

        if self.depth >= self.max_depth {
            return Err(errors::runtime(
                close.location(),
                "Stack overflow.",
                format!("Calls may only be nested {} deep, check for unbounded recursion in '{}'.", self.max_depth, fun.name()),
            ));
        }

        self.depth += 1;
        let result = fun.call(self, args);
        self.depth -= 1;

        result
    }

    fn visit_comma(&mut self, left: &Expr, right: &Expr) -> Result<Value, LoxError> {
        self.visit_expr(left)?;
        self.visit_expr(right)
    }

    fn visit_fun_expr(&mut self, decl: &Rc<FunDecl>) -> Result<Value, LoxError> {
        Ok(Value::Function(Fun::closure(decl.clone(), self.env.clone())))
    }

    fn visit_get(&mut self, obj: &Expr, property: &Token) -> Result<Value, LoxError> {
        match self.visit_expr(obj)? {
            Value::Instance(instance) => instance.get(property),
            other => Err(errors::runtime(
                property.location(),
                "Only instances have properties.",
                format!("Tried to read '{}' from a {} value, which has no properties.", property.lexeme(), other.type_name()),
            )),
        }
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Result<Value, LoxError> {
        self.visit_expr(expr)
    }

    fn visit_literal(&mut self, _loc: &Loc, value: &Literal) -> Result<Value, LoxError> {
        Ok(value.into())
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, LoxError> {
        let left = self.visit_expr(left)?;

        match op {
            Token::And(_) if left.is_truthy() => self.visit_expr(right),
            Token::Or(_) if !left.is_truthy() => self.visit_expr(right),
            _ => Ok(left)
        }
    }

    fn visit_set(&mut self, obj: &Expr, property: &Token, value: &Expr) -> Result<Value, LoxError> {
        let instance = match self.visit_expr(obj)? {
            Value::Instance(instance) => instance,
            other => return Err(errors::runtime(
                property.location(),
                "Only instances have fields.",
                format!("Tried to set '{}' on a {} value, which has no fields.", property.lexeme(), other.type_name()),
            )),
        };

        let value = self.visit_expr(value)?;
        instance.set(property, value.clone());
        Ok(value)
    }

    fn visit_ternary(&mut self, cond: &Expr, then_value: &Expr, else_value: &Expr) -> Result<Value, LoxError> {
        if self.visit_expr(cond)?.is_truthy() {
            self.visit_expr(then_value)
        } else {
            self.visit_expr(else_value)
        }
    }

    fn visit_this(&mut self, keyword: &Token, resolved: &Resolution) -> Result<Value, LoxError> {
        self.lookup(keyword, resolved)
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value, LoxError> {
        let right = self.visit_expr(expr)?;

        match op {
            Token::Minus(_) => match right {
                Value::Number(num) => Ok(Value::Number(-num)),
                other => Err(errors::runtime(
                    op.location(),
                    "Operand must be a number.",
                    format!("Only numbers can be negated, but got a {}.", other.type_name()),
                )),
            },
            Token::Bang(_) => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(errors::system(
                format!("Received an unexpected unary operator {}.", op),
                "This is a bug in the parser, please report it with example code.",
            )),
        }
    }

    fn visit_var_ref(&mut self, name: &Token, resolved: &Resolution) -> Result<Value, LoxError> {
        self.lookup(name, resolved)
    }
}

impl StmtVisitor<Result<(), Flow>> for Interpreter {
    fn visit_block(&mut self, stmts: &[Stmt]) -> Result<(), Flow> {
        let env = self.env.branch();
        self.execute_block(stmts, env)
    }

    fn visit_break(&mut self, _keyword: &Token) -> Result<(), Flow> {
        Err(Flow::Break)
    }

    fn visit_class(&mut self, name: &Token, methods: &[Rc<FunDecl>]) -> Result<(), Flow> {
        let methods: FnvHashMap<String, Fun> = methods.iter()
            .map(|method| (method.name().to_string(), Fun::closure(method.clone(), self.env.clone())))
            .collect();

        debug!(class = name.lexeme(), methods = methods.len(), "defined class");

        let class = Class::new(name.lexeme(), methods);
        self.declare(name.lexeme(), Some(Value::Class(Rc::new(class))));
        Ok(())
    }

    fn visit_continue(&mut self, _keyword: &Token) -> Result<(), Flow> {
        Err(Flow::Continue)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Result<(), Flow> {
        self.visit_expr(expr)?;
        Ok(())
    }

    fn visit_for(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, incr: Option<&Expr>, body: &Stmt) -> Result<(), Flow> {
        let env = self.env.branch();
        self.scoped(env, |interpreter: &mut Self| -> Result<(), Flow> {
            if let Some(init) = init {
                interpreter.visit_stmt(init)?;
            }

            interpreter.run_loop(
                |interpreter| match cond {
                    Some(cond) => interpreter.visit_expr(cond).map(|v| v.is_truthy()),
                    None => Ok(true),
                },
                body,
                incr,
            )
        })
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> Result<(), Flow> {
        let fun = Fun::closure(decl.clone(), self.env.clone());
        self.env.declare_named(decl.name(), Some(Value::Function(fun)));
        Ok(())
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Result<(), Flow> {
        if self.visit_expr(cond)?.is_truthy() {
            self.visit_stmt(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.visit_stmt(else_branch)
        } else {
            Ok(())
        }
    }

    fn visit_print(&mut self, expr: &Expr) -> Result<(), Flow> {
        let value = self.visit_expr(expr)?;
        writeln!(self.output, "{}", value).map_err(LoxError::from)?;
        Ok(())
    }

    fn visit_return(&mut self, _keyword: &Token, expr: Option<&Expr>) -> Result<(), Flow> {
        let value = match expr {
            Some(expr) => self.visit_expr(expr)?,
            None => Value::Nil,
        };

        Err(Flow::Return(value))
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> Result<(), Flow> {
        let value = match init {
            Some(init) => Some(self.visit_expr(init)?),
            None => None,
        };

        self.declare(name.lexeme(), value);
        Ok(())
    }

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> Result<(), Flow> {
        self.run_loop(|interpreter| interpreter.visit_expr(cond).map(|v| v.is_truthy()), body, None)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{analysis, ast::Parser, lexer::Scanner, CaptureOutput, LoxError};

    use crate::interpreter::{Interpreter, MAX_CALL_DEPTH, STACK_SIZE};

    fn run(source: &str) -> Result<String, LoxError> {
        run_with_depth(source, MAX_CALL_DEPTH)
    }

    fn run_with_depth(source: &str, max_depth: usize) -> Result<String, LoxError> {
        let source = source.to_string();
        let handle = std::thread::Builder::new()
            .stack_size(STACK_SIZE)
            .spawn(move || -> Result<String, LoxError> {
                let (tree, errs) = Parser::parse(&mut Scanner::new(&source).filter_map(|t| t.ok()));
                assert!(errs.is_empty(), "no parsing errors, got {:?}", errs);

                let diagnostics = analysis::resolve(&tree);
                assert!(!diagnostics.iter().any(|d| d.is_fatal()), "no static errors, got {:?}", diagnostics);

                let output = CaptureOutput::default();
                let mut interpreter = Interpreter::default()
                    .with_output(Box::new(output.clone()))
                    .with_max_depth(max_depth);
                interpreter.interpret(&tree)?;

                Ok(output.to_string())
            })
            .expect("the interpreter thread should start");

        match handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    fn runtime_error(source: &str) -> String {
        let err = run(source).expect_err("expected a runtime error");
        assert!(err.is_runtime(), "expected a runtime error, got {}", err);
        err.description().to_string()
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(run("print 1 + 2;").unwrap(), "3\n");
        assert_eq!(run("print 1 + \"2\";").unwrap(), "12\n");
        assert_eq!(run("print \"a\" + 1;").unwrap(), "a1\n");
        assert_eq!(run("print \"a\" + \"b\";").unwrap(), "ab\n");
        assert_eq!(run("print 2.5 * 2 - -1;").unwrap(), "6\n");
        assert_eq!(run("print 7 / 2;").unwrap(), "3.5\n");
    }

    #[test]
    fn operand_type_errors() {
        assert_eq!(runtime_error("print \"a\" + true;"), "Operands must be two numbers or a string and a number.");
        assert_eq!(runtime_error("print nil + 1;"), "Operands must be two numbers or a string and a number.");
        assert_eq!(runtime_error("print 1 < \"2\";"), "Operands must be numbers.");
        assert_eq!(runtime_error("print -\"a\";"), "Operand must be a number.");
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(runtime_error("print 1 / 0;"), "Cannot divide by zero.");
    }

    #[test]
    fn equality_and_truthiness() {
        assert_eq!(run("print nil == nil; print 1 == \"1\"; print !0; print !nil;").unwrap(), "true\nfalse\nfalse\ntrue\n");
        assert_eq!(run("print nil or \"x\"; print 1 and 2; print false and undefined;").unwrap(), "x\n2\nfalse\n");
    }

    #[test]
    fn shadowing() {
        let source = r#"
            var a = "global";
            {
                var a = "inner";
                print a;
            }
            print a;
        "#;

        assert_eq!(run(source).unwrap(), "inner\nglobal\n");
    }

    #[test]
    fn closures_share_captured_frames() {
        let source = r#"
            var get;
            var set;
            {
                var value = 1;
                fun getter() { return value; }
                fun setter(v) { value = v; }
                get = getter;
                set = setter;
            }

            print get();
            set(42);
            print get();
        "#;

        assert_eq!(run(source).unwrap(), "1\n42\n");
    }

    #[test]
    fn counters_keep_their_own_state() {
        let source = r#"
            fun counter() {
                var count = 0;
                return fun () {
                    count = count + 1;
                    return count;
                };
            }

            var a = counter();
            var b = counter();
            a();
            print a();
            print b();
        "#;

        assert_eq!(run(source).unwrap(), "2\n1\n");
    }

    #[test]
    fn uninitialized_reads() {
        assert_eq!(runtime_error("var x; print x;"), "Variable 'x' referenced before assignment.");
        assert_eq!(run("var x; x = 3; print x;").unwrap(), "3\n");
    }

    #[test]
    fn loops_and_control_flow() {
        let source = r#"
            for (var i = 0; i < 3; i = i + 1) {
                if (i == 1) continue;
                print i;
            }

            var n = 0;
            while (true) {
                n = n + 1;
                if (n > 4) break;
            }
            print n;
        "#;

        assert_eq!(run(source).unwrap(), "0\n2\n5\n");
    }

    #[test]
    fn return_unwinds_through_loops() {
        let source = r#"
            fun find() {
                for (var i = 0; ; i = i + 1) {
                    while (true) {
                        if (i == 3) return i;
                        break;
                    }
                }
            }

            print find();
        "#;

        assert_eq!(run(source).unwrap(), "3\n");
    }

    #[test]
    fn functions_and_arity() {
        let source = r#"
            fun add(a, b) { return a + b; }
            fun nothing() {}
            print add(1, 2);
            print nothing();
            print add;
            print fun () {};
            print clock;
        "#;

        assert_eq!(run(source).unwrap(), "3\nnil\n<fn add>\n<fn anonymous>\n<native fn>\n");
        assert_eq!(runtime_error("fun f(a) {} f(1, 2);"), "Expected 1 arguments but got 2.");
        assert_eq!(runtime_error("var x = 1; x();"), "Can only call functions and classes.");
    }

    #[test]
    fn recursion_and_forward_references() {
        let source = r#"
            fun fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
            fun first() { return second(); }
            fun second() { return "second"; }
            print fib(10);
            print first();
        "#;

        assert_eq!(run(source).unwrap(), "55\nsecond\n");
    }

    #[test]
    fn unbounded_recursion() {
        assert_eq!(runtime_error("fun f() { return f(); } f();"), "Stack overflow.");
    }

    #[test]
    fn deep_recursion() {
        let source = r#"
            fun sum(n) {
                if (n == 0) return 0;
                return n + sum(n - 1);
            }

            print sum(200);
        "#;

        assert_eq!(run(source).unwrap(), "20100\n");
    }

    #[test]
    fn call_depth_is_configurable() {
        let source = "fun down(n) { if (n > 0) down(n - 1); } down(20);";
        assert!(run_with_depth(source, 21).is_ok());

        let err = run_with_depth(source, 20).expect_err("expected a runtime error");
        assert_eq!(err.description(), "Stack overflow.");
    }

    #[test]
    fn unresolved_names_skip_locals() {
        let source = r#"
            {
                fun f() { return later; }
                var later = "local";
                print f();
            }
        "#;

        assert_eq!(runtime_error(source), "Undefined variable 'later'.");
        assert_eq!(run("fun f() { return later; } var later = \"global\"; print f();").unwrap(), "global\n");
    }

    #[test]
    fn ternary_and_comma() {
        assert_eq!(run("print true ? 1 : 2; print nil ? 1 : false ? 2 : 3; print (1, 2);").unwrap(), "1\n3\n2\n");
        assert_eq!(run("var a = 0; true ? a = 1 : (a = 2); print a;").unwrap(), "1\n");
    }

    #[test]
    fn classes_and_instances() {
        let source = r#"
            class Counter {
                increment() {
                    this.count = this.count + 1;
                    return this;
                }
            }

            var a = Counter();
            var b = Counter();
            a.count = 0;
            b.count = 10;
            a.increment().increment();
            b.increment();

            print a.count;
            print b.count;
            print Counter;
            print a;
        "#;

        assert_eq!(run(source).unwrap(), "2\n11\nCounter\nCounter instance\n");
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let source = r#"
            class Person {
                name() { return this.first; }
            }

            var alice = Person();
            alice.first = "Alice";
            var bob = Person();
            bob.first = "Bob";

            var method = alice.name;
            bob.name = method;
            print bob.name();
            print bob.first;
        "#;

        assert_eq!(run(source).unwrap(), "Alice\nBob\n");
    }

    #[test]
    fn property_errors() {
        assert_eq!(runtime_error("class A {} print A().missing;"), "Undefined property 'missing'.");
        assert_eq!(runtime_error("var a = 1; print a.b;"), "Only instances have properties.");
        assert_eq!(runtime_error("var a = \"s\"; a.b = 1;"), "Only instances have fields.");
        assert_eq!(runtime_error("class A {} A(1);"), "Expected 0 arguments but got 1.");
    }

    #[test]
    fn runtime_errors_carry_locations() {
        let err = run("var a = 1;\nprint a / 0;").expect_err("expected a runtime error");
        assert_eq!(err.location(), Some(crate::Loc::new(2, 9)));
    }

    #[test]
    fn interpreter_state_persists_between_runs() {
        let mut resolver = analysis::Resolver::default();
        let output = CaptureOutput::default();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));

        for line in ["var a = 1;", "print a / 0; var b = 2;", "var c = 3;", "print a + c;"] {
            let (tree, errs) = Parser::parse(&mut Scanner::new(line).filter_map(|t| t.ok()));
            assert!(errs.is_empty());

            let slots = resolver.global_slots();
            assert!(resolver.resolve(&tree).is_empty());

            interpreter.ensure_global_slots(slots);
            let _ = interpreter.interpret(&tree);
        }

        assert_eq!(output.to_string(), "4\n");
    }
}
