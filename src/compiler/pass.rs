//! The compile pass: expands every macro invocation and splices the result
//! back into the tree.
//!
//! Declarations are removed. An invocation in statement position is replaced
//! by all statements of its expansion; one in expression position must
//! expand to exactly one expression statement. Each expansion is compiled
//! before it is spliced, so invocations produced by an expansion are expanded
//! too.

use tracing::debug;

use crate::ast::{
    ArrowBody, ArrowFunction, Block, CatchClause, Expr, ForHead, ForInit, Function, MacroInvocation,
    MemberProperty, Program, Property, PropertyKey, Stmt, SwitchCase, VariableDeclaration, VariableDeclarator,
};
use crate::macros::Expander;
use crate::syntax::render_tokens;
use crate::{err_ctx, expansion_err, MacroJsError};

use super::session::{ExpansionStep, Session};

pub struct CompilePass<'s> {
    session: &'s mut Session,
    record_trace: bool,
}

impl<'s> CompilePass<'s> {
    pub fn new(session: &'s mut Session, record_trace: bool) -> Self {
        Self { session, record_trace }
    }

    pub fn run(&mut self, program: Program) -> Result<Program, MacroJsError> {
        Ok(Program {
            body: self.compile_statements(program.body)?,
            span: program.span,
        })
    }

    // ------------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------------

    /// Expands `invocation` and compiles the expansion.
    fn expand(&mut self, invocation: &MacroInvocation) -> Result<Program, MacroJsError> {
        let step = if self.record_trace {
            Some(self.session.begin_step(ExpansionStep {
                macro_name: invocation.name.name.clone(),
                span: invocation.span,
                input: render_tokens(&invocation.tokens),
                color: None,
                expansion: None,
            }))
        } else {
            None
        };

        let expansion = Expander::new(&mut *self.session, invocation).expand()?;
        let program = self.run(expansion.program)?;
        if let Some(index) = step {
            self.session.finish_step(index, expansion.color, &program);
        }
        Ok(program)
    }

    fn expand_expression(&mut self, invocation: &MacroInvocation) -> Result<Expr, MacroJsError> {
        let name = &invocation.name.name;
        let mut body = self.expand(invocation)?.body;
        if body.len() > 1 {
            return Err(expansion_err!(
                name,
                invocation.span,
                "macro attempted to expand multiple statements into expression position"
            ));
        }
        match body.pop() {
            None => Err(expansion_err!(
                name,
                invocation.span,
                "macro expansion yielded no expressions or statements"
            )),
            Some(Stmt::Expression { expression, .. }) => {
                debug!(macro_name = %name, line = invocation.span.line, "spliced expansion into expression position");
                Ok(expression)
            }
            Some(_) => Err(expansion_err!(
                name,
                invocation.span,
                "macro attempted to expand statement into expression position"
            )),
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn compile_statements(&mut self, statements: Vec<Stmt>) -> Result<Vec<Stmt>, MacroJsError> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            self.compile_statement_into(stmt, &mut out)?;
        }
        Ok(out)
    }

    /// Compiles one statement, pushing zero or more statements onto `out`.
    fn compile_statement_into(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) -> Result<(), MacroJsError> {
        match stmt {
            Stmt::MacroDeclaration(_) => Ok(()),
            Stmt::Expression {
                expression: Expr::MacroInvocation(invocation),
                ..
            } => {
                let program = self.expand(&invocation)?;
                debug!(
                    macro_name = %invocation.name.name,
                    statements = program.body.len(),
                    line = invocation.span.line,
                    "spliced expansion into statement position"
                );
                out.extend(program.body);
                Ok(())
            }
            other => {
                out.push(self.compile_statement(other)?);
                Ok(())
            }
        }
    }

    /// Compiles the body of an `if`, loop or similar single-statement slot.
    fn compile_body(&mut self, stmt: Stmt) -> Result<Box<Stmt>, MacroJsError> {
        let span = stmt.span();
        let mut out = Vec::new();
        self.compile_statement_into(stmt, &mut out)?;
        let stmt = if out.len() > 1 {
            Stmt::Block(Block { body: out, span })
        } else {
            out.pop().unwrap_or(Stmt::Empty { span })
        };
        Ok(Box::new(stmt))
    }

    fn compile_block(&mut self, block: Block) -> Result<Block, MacroJsError> {
        Ok(Block {
            body: self.compile_statements(block.body)?,
            span: block.span,
        })
    }

    fn compile_statement(&mut self, stmt: Stmt) -> Result<Stmt, MacroJsError> {
        let stmt = match stmt {
            Stmt::Expression { expression, span } => Stmt::Expression {
                expression: self.compile_expression(expression)?,
                span,
            },
            Stmt::Variable(decl) => Stmt::Variable(self.compile_variable(decl)?),
            Stmt::Function(function) => Stmt::Function(self.compile_function(function)?),
            Stmt::Return { argument, span } => Stmt::Return {
                argument: self.compile_optional(argument)?,
                span,
            },
            Stmt::If {
                test,
                consequent,
                alternate,
                span,
            } => Stmt::If {
                test: self.compile_expression(test)?,
                consequent: self.compile_body(*consequent)?,
                alternate: match alternate {
                    Some(alternate) => Some(self.compile_body(*alternate)?),
                    None => None,
                },
                span,
            },
            Stmt::For {
                init,
                test,
                update,
                body,
                span,
            } => Stmt::For {
                init: match init {
                    Some(ForInit::Variable(decl)) => Some(ForInit::Variable(self.compile_variable(decl)?)),
                    Some(ForInit::Expression(expr)) => Some(ForInit::Expression(self.compile_expression(expr)?)),
                    None => None,
                },
                test: self.compile_optional(test)?,
                update: self.compile_optional(update)?,
                body: self.compile_body(*body)?,
                span,
            },
            Stmt::ForEach {
                kind,
                left,
                right,
                body,
                span,
            } => Stmt::ForEach {
                kind,
                left: match left {
                    ForHead::Target(target) => ForHead::Target(self.compile_expression(target)?),
                    variable => variable,
                },
                right: self.compile_expression(right)?,
                body: self.compile_body(*body)?,
                span,
            },
            Stmt::While { test, body, span } => Stmt::While {
                test: self.compile_expression(test)?,
                body: self.compile_body(*body)?,
                span,
            },
            Stmt::DoWhile { body, test, span } => Stmt::DoWhile {
                body: self.compile_body(*body)?,
                test: self.compile_expression(test)?,
                span,
            },
            Stmt::Throw { argument, span } => Stmt::Throw {
                argument: self.compile_expression(argument)?,
                span,
            },
            Stmt::Try {
                block,
                handler,
                finalizer,
                span,
            } => Stmt::Try {
                block: self.compile_block(block)?,
                handler: match handler {
                    Some(handler) => Some(CatchClause {
                        param: handler.param,
                        body: self.compile_block(handler.body)?,
                        span: handler.span,
                    }),
                    None => None,
                },
                finalizer: match finalizer {
                    Some(finalizer) => Some(self.compile_block(finalizer)?),
                    None => None,
                },
                span,
            },
            Stmt::Switch {
                discriminant,
                cases,
                span,
            } => Stmt::Switch {
                discriminant: self.compile_expression(discriminant)?,
                cases: cases
                    .into_iter()
                    .map(|case| {
                        Ok(SwitchCase {
                            test: self.compile_optional(case.test)?,
                            consequent: self.compile_statements(case.consequent)?,
                            span: case.span,
                        })
                    })
                    .collect::<Result<_, MacroJsError>>()?,
                span,
            },
            Stmt::Block(block) => Stmt::Block(self.compile_block(block)?),
            Stmt::MacroDeclaration(decl) => {
                return Err(err_ctx!(
                    Internal,
                    decl.span,
                    "macro declaration {} reached statement compilation",
                    decl.name.name
                ))
            }
            stmt @ (Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Empty { .. }) => stmt,
        };
        Ok(stmt)
    }

    fn compile_variable(&mut self, decl: VariableDeclaration) -> Result<VariableDeclaration, MacroJsError> {
        let declarations = decl
            .declarations
            .into_iter()
            .map(|declarator| {
                Ok(VariableDeclarator {
                    init: self.compile_optional(declarator.init)?,
                    ..declarator
                })
            })
            .collect::<Result<_, MacroJsError>>()?;
        Ok(VariableDeclaration { declarations, ..decl })
    }

    fn compile_function(&mut self, function: Function) -> Result<Function, MacroJsError> {
        Ok(Function {
            body: self.compile_block(function.body)?,
            ..function
        })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn compile_optional(&mut self, expr: Option<Expr>) -> Result<Option<Expr>, MacroJsError> {
        expr.map(|expr| self.compile_expression(expr)).transpose()
    }

    fn compile_boxed(&mut self, expr: Box<Expr>) -> Result<Box<Expr>, MacroJsError> {
        Ok(Box::new(self.compile_expression(*expr)?))
    }

    fn compile_list(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>, MacroJsError> {
        exprs.into_iter().map(|expr| self.compile_expression(expr)).collect()
    }

    fn compile_expression(&mut self, expr: Expr) -> Result<Expr, MacroJsError> {
        let expr = match expr {
            Expr::MacroInvocation(invocation) => self.expand_expression(&invocation)?,
            Expr::Array { elements, span } => Expr::Array {
                elements: self.compile_list(elements)?,
                span,
            },
            Expr::Object { properties, span } => Expr::Object {
                properties: properties
                    .into_iter()
                    .map(|property| self.compile_property(property))
                    .collect::<Result<_, MacroJsError>>()?,
                span,
            },
            Expr::Function(function) => Expr::Function(Box::new(self.compile_function(*function)?)),
            Expr::Arrow(arrow) => {
                let ArrowFunction { params, body, span } = *arrow;
                let body = match body {
                    ArrowBody::Expression(expr) => ArrowBody::Expression(self.compile_expression(expr)?),
                    ArrowBody::Block(block) => ArrowBody::Block(self.compile_block(block)?),
                };
                Expr::Arrow(Box::new(ArrowFunction { params, body, span }))
            }
            Expr::Unary {
                operator,
                argument,
                span,
            } => Expr::Unary {
                operator,
                argument: self.compile_boxed(argument)?,
                span,
            },
            Expr::Update {
                operator,
                prefix,
                argument,
                span,
            } => Expr::Update {
                operator,
                prefix,
                argument: self.compile_boxed(argument)?,
                span,
            },
            Expr::Binary {
                operator,
                left,
                right,
                span,
            } => Expr::Binary {
                operator,
                left: self.compile_boxed(left)?,
                right: self.compile_boxed(right)?,
                span,
            },
            Expr::Assign {
                operator,
                target,
                value,
                span,
            } => Expr::Assign {
                operator,
                target: self.compile_boxed(target)?,
                value: self.compile_boxed(value)?,
                span,
            },
            Expr::Conditional {
                test,
                consequent,
                alternate,
                span,
            } => Expr::Conditional {
                test: self.compile_boxed(test)?,
                consequent: self.compile_boxed(consequent)?,
                alternate: self.compile_boxed(alternate)?,
                span,
            },
            Expr::Call {
                callee,
                arguments,
                optional,
                span,
            } => Expr::Call {
                callee: self.compile_boxed(callee)?,
                arguments: self.compile_list(arguments)?,
                optional,
                span,
            },
            Expr::New {
                callee,
                arguments,
                span,
            } => Expr::New {
                callee: self.compile_boxed(callee)?,
                arguments: self.compile_list(arguments)?,
                span,
            },
            Expr::Member {
                object,
                property,
                optional,
                span,
            } => Expr::Member {
                object: self.compile_boxed(object)?,
                property: match property {
                    MemberProperty::Computed(expr) => MemberProperty::Computed(self.compile_boxed(expr)?),
                    named => named,
                },
                optional,
                span,
            },
            Expr::Sequence { expressions, span } => Expr::Sequence {
                expressions: self.compile_list(expressions)?,
                span,
            },
            leaf @ (Expr::Identifier(_) | Expr::Literal(_) | Expr::This { .. }) => leaf,
        };
        Ok(expr)
    }

    fn compile_property(&mut self, property: Property) -> Result<Property, MacroJsError> {
        let key = match property.key {
            PropertyKey::Computed(expr) => PropertyKey::Computed(self.compile_boxed(expr)?),
            key => key,
        };
        Ok(Property {
            key,
            value: self.compile_expression(property.value)?,
            ..property
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::MacroParser;
    use crate::syntax::tokenize;
    use crate::ErrorType;

    #[test]
    fn declarations_never_reach_statement_compilation() {
        let mut session = Session::new();
        let tokens = tokenize("macro m { () => { 1 } }").unwrap();
        let mut program = MacroParser::new(&mut session, tokens).parse_program().unwrap();
        let declaration = program.body.remove(0);
        assert!(matches!(declaration, Stmt::MacroDeclaration(_)));

        let mut pass = CompilePass::new(&mut session, false);
        let err = pass.compile_statement(declaration.clone()).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Internal);

        let mut out = Vec::new();
        pass.compile_statement_into(declaration, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
