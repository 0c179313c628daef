use crate::ast::{
    ArrowBody, ArrowFunction, BinaryOp, Block, Expr, ForHead, ForInit, Function, Identifier, LiteralKind,
    MemberProperty, Program, Property, PropertyKey, Span, Stmt, UnaryOp, UpdateOp, VariableDeclaration,
};
use crate::{err_ctx, MacroJsError};

use super::sourcemap::SourceMapBuilder;

const INDENT: &str = "    ";

// Binding strength of each expression form; a child printed in a slot that
// requires more than it has is parenthesized.
const SEQUENCE: u8 = 1;
const ASSIGNMENT: u8 = 2;
const CONDITIONAL: u8 = 3;
const BINARY_BASE: u8 = 4;
const PREFIX: u8 = 16;
const POSTFIX: u8 = 17;
const CALL: u8 = 18;
const PRIMARY: u8 = 19;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence { .. } => SEQUENCE,
        Expr::Assign { .. } | Expr::Arrow(_) => ASSIGNMENT,
        Expr::Conditional { .. } => CONDITIONAL,
        Expr::Binary { operator, .. } => BINARY_BASE + operator.precedence(),
        Expr::Unary { .. } => PREFIX,
        Expr::Update { prefix: true, .. } => PREFIX,
        Expr::Update { prefix: false, .. } => POSTFIX,
        Expr::Call { .. } | Expr::New { .. } | Expr::Member { .. } => CALL,
        Expr::Identifier(_)
        | Expr::Literal(_)
        | Expr::This { .. }
        | Expr::Array { .. }
        | Expr::Object { .. }
        | Expr::Function(_)
        | Expr::MacroInvocation(_) => PRIMARY,
    }
}

/// `??` cannot share an operand with `||` or `&&` unless one side is parenthesized.
fn mixes_nullish(parent: BinaryOp, child: &Expr) -> bool {
    match child {
        Expr::Binary { operator, .. } if operator.is_logical() => {
            (parent == BinaryOp::Nullish) != (*operator == BinaryOp::Nullish)
        }
        _ => false,
    }
}

/// Whether printing `expr` at the start of a statement would begin with `{`
/// or `function`, which would be read as a block or a declaration.
fn starts_ambiguously(expr: &Expr) -> bool {
    match expr {
        Expr::Object { .. } | Expr::Function(_) => true,
        Expr::Binary { left, .. } => starts_ambiguously(left),
        Expr::Assign { target, .. } => starts_ambiguously(target),
        Expr::Conditional { test, .. } => starts_ambiguously(test),
        Expr::Call { callee, .. } => starts_ambiguously(callee),
        Expr::Member { object, .. } => starts_ambiguously(object),
        Expr::Update {
            prefix: false, argument, ..
        } => starts_ambiguously(argument),
        Expr::Sequence { expressions, .. } => expressions.first().is_some_and(starts_ambiguously),
        _ => false,
    }
}

/// `new a.b()()` would call the wrong thing: a callee containing a call needs parentheses.
fn contains_call(expr: &Expr) -> bool {
    match expr {
        Expr::Call { .. } => true,
        Expr::Member { object, .. } => contains_call(object),
        _ => false,
    }
}

pub(crate) struct Printer {
    out: String,
    indent: usize,
    line: u32,
    column: u32,
    map: Option<SourceMapBuilder>,
}

impl Printer {
    pub fn new(map: Option<SourceMapBuilder>) -> Self {
        Self {
            out: String::new(),
            indent: 0,
            line: 0,
            column: 0,
            map,
        }
    }

    pub fn finish(self) -> (String, Option<SourceMapBuilder>) {
        (self.out, self.map)
    }

    pub fn print_program(&mut self, program: &Program) -> Result<(), MacroJsError> {
        for stmt in &program.body {
            self.print_statement(stmt)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    fn write(&mut self, text: &str) {
        self.out.push_str(text);
        self.column += text.chars().count() as u32;
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.line += 1;
        self.column = 0;
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.write(INDENT);
        }
    }

    fn mark(&mut self, span: Span, name: Option<&str>) {
        if let Some(map) = self.map.as_mut() {
            map.add(self.line, self.column, span, name);
        }
    }

    fn write_identifier(&mut self, id: &Identifier) {
        self.mark(id.span, Some(id.original_name()));
        self.write(&id.name);
    }

    fn write_list<T>(
        &mut self,
        items: &[T],
        mut print: impl FnMut(&mut Self, &T) -> Result<(), MacroJsError>,
    ) -> Result<(), MacroJsError> {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.write(", ");
            }
            print(self, item)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn print_statement(&mut self, stmt: &Stmt) -> Result<(), MacroJsError> {
        self.write_indent();
        self.print_statement_inline(stmt)?;
        self.newline();
        Ok(())
    }

    /// Prints `stmt` at the current position without indentation or a trailing newline.
    fn print_statement_inline(&mut self, stmt: &Stmt) -> Result<(), MacroJsError> {
        self.mark(stmt.span(), None);
        match stmt {
            Stmt::Expression { expression, .. } => {
                if starts_ambiguously(expression) {
                    self.write("(");
                    self.print_expression(expression, SEQUENCE)?;
                    self.write(")");
                } else {
                    self.print_expression(expression, SEQUENCE)?;
                }
                self.write(";");
            }
            Stmt::Variable(decl) => {
                self.print_variable(decl)?;
                self.write(";");
            }
            Stmt::Function(function) => self.print_function(function)?,
            Stmt::Return { argument, .. } => {
                self.write("return");
                if let Some(argument) = argument {
                    self.write(" ");
                    self.print_expression(argument, SEQUENCE)?;
                }
                self.write(";");
            }
            Stmt::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.write("if (");
                self.print_expression(test, SEQUENCE)?;
                self.write(")");
                self.print_body(consequent)?;
                if let Some(alternate) = alternate {
                    self.write(" else");
                    if matches!(**alternate, Stmt::If { .. }) {
                        self.write(" ");
                        self.print_statement_inline(alternate)?;
                    } else {
                        self.print_body(alternate)?;
                    }
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                self.write("for (");
                match init {
                    Some(ForInit::Variable(decl)) => self.print_variable(decl)?,
                    Some(ForInit::Expression(expr)) => self.print_expression(expr, SEQUENCE)?,
                    None => {}
                }
                self.write(";");
                if let Some(test) = test {
                    self.write(" ");
                    self.print_expression(test, SEQUENCE)?;
                }
                self.write(";");
                if let Some(update) = update {
                    self.write(" ");
                    self.print_expression(update, SEQUENCE)?;
                }
                self.write(")");
                self.print_body(body)?;
            }
            Stmt::ForEach {
                kind,
                left,
                right,
                body,
                ..
            } => {
                self.write("for (");
                match left {
                    ForHead::Variable { kind, id } => {
                        self.write(kind.as_str());
                        self.write(" ");
                        self.write_identifier(id);
                    }
                    ForHead::Target(target) => self.print_expression(target, CALL)?,
                }
                self.write(" ");
                self.write(kind.as_str());
                self.write(" ");
                self.print_expression(right, ASSIGNMENT)?;
                self.write(")");
                self.print_body(body)?;
            }
            Stmt::While { test, body, .. } => {
                self.write("while (");
                self.print_expression(test, SEQUENCE)?;
                self.write(")");
                self.print_body(body)?;
            }
            Stmt::DoWhile { body, test, .. } => {
                self.write("do");
                self.print_body(body)?;
                self.write(" while (");
                self.print_expression(test, SEQUENCE)?;
                self.write(");");
            }
            Stmt::Break { .. } => self.write("break;"),
            Stmt::Continue { .. } => self.write("continue;"),
            Stmt::Throw { argument, .. } => {
                self.write("throw ");
                self.print_expression(argument, SEQUENCE)?;
                self.write(";");
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.write("try ");
                self.print_block(block)?;
                if let Some(handler) = handler {
                    self.write(" catch ");
                    if let Some(param) = &handler.param {
                        self.write("(");
                        self.write_identifier(param);
                        self.write(") ");
                    }
                    self.print_block(&handler.body)?;
                }
                if let Some(finalizer) = finalizer {
                    self.write(" finally ");
                    self.print_block(finalizer)?;
                }
            }
            Stmt::Switch {
                discriminant, cases, ..
            } => {
                self.write("switch (");
                self.print_expression(discriminant, SEQUENCE)?;
                self.write(") {");
                self.newline();
                self.indent += 1;
                for case in cases {
                    self.write_indent();
                    match &case.test {
                        Some(test) => {
                            self.write("case ");
                            self.print_expression(test, SEQUENCE)?;
                            self.write(":");
                        }
                        None => self.write("default:"),
                    }
                    self.newline();
                    self.indent += 1;
                    for stmt in &case.consequent {
                        self.print_statement(stmt)?;
                    }
                    self.indent -= 1;
                }
                self.indent -= 1;
                self.write_indent();
                self.write("}");
            }
            Stmt::Block(block) => self.print_block(block)?,
            Stmt::Empty { .. } => self.write(";"),
            Stmt::MacroDeclaration(decl) => {
                return Err(err_ctx!(
                    Internal,
                    decl.span,
                    "macro declaration {} reached code generation",
                    decl.name.name
                ));
            }
        }
        Ok(())
    }

    /// The body of an `if`, loop or `do`: blocks open on the same line, other
    /// statements follow inline.
    fn print_body(&mut self, body: &Stmt) -> Result<(), MacroJsError> {
        match body {
            Stmt::Empty { .. } => {
                self.write(";");
                Ok(())
            }
            _ => {
                self.write(" ");
                self.print_statement_inline(body)
            }
        }
    }

    fn print_block(&mut self, block: &Block) -> Result<(), MacroJsError> {
        self.mark(block.span, None);
        if block.body.is_empty() {
            self.write("{}");
            return Ok(());
        }
        self.write("{");
        self.newline();
        self.indent += 1;
        for stmt in &block.body {
            self.print_statement(stmt)?;
        }
        self.indent -= 1;
        self.write_indent();
        self.write("}");
        Ok(())
    }

    fn print_variable(&mut self, decl: &VariableDeclaration) -> Result<(), MacroJsError> {
        self.write(decl.kind.as_str());
        self.write(" ");
        self.write_list(&decl.declarations, |printer, declarator| {
            printer.write_identifier(&declarator.id);
            if let Some(init) = &declarator.init {
                printer.write(" = ");
                printer.print_expression(init, ASSIGNMENT)?;
            }
            Ok(())
        })
    }

    fn print_function(&mut self, function: &Function) -> Result<(), MacroJsError> {
        self.write("function");
        if let Some(id) = &function.id {
            self.write(" ");
            self.write_identifier(id);
        }
        self.write("(");
        self.write_list(&function.params, |printer, param| {
            printer.write_identifier(param);
            Ok(())
        })?;
        self.write(") ");
        self.print_block(&function.body)
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Prints `expr`, parenthesized if it binds looser than `required`.
    fn print_expression(&mut self, expr: &Expr, required: u8) -> Result<(), MacroJsError> {
        if precedence(expr) < required {
            self.write("(");
            self.print_expression_bare(expr)?;
            self.write(")");
            Ok(())
        } else {
            self.print_expression_bare(expr)
        }
    }

    fn print_expression_bare(&mut self, expr: &Expr) -> Result<(), MacroJsError> {
        self.mark(expr.span(), None);
        match expr {
            Expr::Identifier(id) => self.write_identifier(id),
            Expr::Literal(literal) => self.write(&literal.raw),
            Expr::This { .. } => self.write("this"),
            Expr::Array { elements, .. } => {
                self.write("[");
                self.write_list(elements, |printer, element| printer.print_expression(element, ASSIGNMENT))?;
                self.write("]");
            }
            Expr::Object { properties, .. } => {
                if properties.is_empty() {
                    self.write("{}");
                } else {
                    self.write("{ ");
                    self.write_list(properties, Self::print_property)?;
                    self.write(" }");
                }
            }
            Expr::Function(function) => self.print_function(function)?,
            Expr::Arrow(arrow) => self.print_arrow(arrow)?,
            Expr::Unary {
                operator, argument, ..
            } => {
                self.write(operator.as_str());
                let needs_space = operator.is_keyword()
                    || match (operator, &**argument) {
                        (UnaryOp::Minus, Expr::Unary { operator: UnaryOp::Minus, .. })
                        | (UnaryOp::Plus, Expr::Unary { operator: UnaryOp::Plus, .. }) => true,
                        (
                            UnaryOp::Minus,
                            Expr::Update {
                                operator: UpdateOp::Decrement,
                                prefix: true,
                                ..
                            },
                        )
                        | (
                            UnaryOp::Plus,
                            Expr::Update {
                                operator: UpdateOp::Increment,
                                prefix: true,
                                ..
                            },
                        ) => true,
                        _ => false,
                    };
                if needs_space {
                    self.write(" ");
                }
                self.print_expression(argument, PREFIX)?;
            }
            Expr::Update {
                operator,
                prefix,
                argument,
                ..
            } => {
                if *prefix {
                    self.write(operator.as_str());
                    self.print_expression(argument, POSTFIX)?;
                } else {
                    self.print_expression(argument, CALL)?;
                    self.write(operator.as_str());
                }
            }
            Expr::Binary {
                operator,
                left,
                right,
                ..
            } => {
                let own = BINARY_BASE + operator.precedence();
                let (left_required, right_required) = if operator.is_right_associative() {
                    // A unary operand on the left of `**` is a syntax error without parentheses.
                    (POSTFIX, own)
                } else {
                    (own, own + 1)
                };
                self.print_operand(*operator, left, left_required)?;
                self.write(" ");
                self.write(operator.as_str());
                self.write(" ");
                self.print_operand(*operator, right, right_required)?;
            }
            Expr::Assign {
                operator,
                target,
                value,
                ..
            } => {
                self.print_expression(target, CALL)?;
                self.write(" ");
                self.write(operator.as_str());
                self.write(" ");
                self.print_expression(value, ASSIGNMENT)?;
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.print_expression(test, CONDITIONAL + 1)?;
                self.write(" ? ");
                self.print_expression(consequent, ASSIGNMENT)?;
                self.write(" : ");
                self.print_expression(alternate, ASSIGNMENT)?;
            }
            Expr::Call {
                callee,
                arguments,
                optional,
                ..
            } => {
                self.print_expression(callee, CALL)?;
                self.write(if *optional { "?.(" } else { "(" });
                self.write_list(arguments, |printer, argument| printer.print_expression(argument, ASSIGNMENT))?;
                self.write(")");
            }
            Expr::New { callee, arguments, .. } => {
                self.write("new ");
                if contains_call(callee) {
                    self.write("(");
                    self.print_expression(callee, SEQUENCE)?;
                    self.write(")");
                } else {
                    self.print_expression(callee, CALL)?;
                }
                self.write("(");
                self.write_list(arguments, |printer, argument| printer.print_expression(argument, ASSIGNMENT))?;
                self.write(")");
            }
            Expr::Member {
                object,
                property,
                optional,
                ..
            } => {
                let bare_integer = matches!(
                    &**object,
                    Expr::Literal(literal)
                        if literal.kind == LiteralKind::Number && literal.raw.chars().all(|c| c.is_ascii_digit())
                );
                if bare_integer {
                    self.write("(");
                    self.print_expression_bare(object)?;
                    self.write(")");
                } else {
                    self.print_expression(object, CALL)?;
                }
                match property {
                    MemberProperty::Named(name) => {
                        self.write(if *optional { "?." } else { "." });
                        self.write(name);
                    }
                    MemberProperty::Computed(expr) => {
                        self.write(if *optional { "?.[" } else { "[" });
                        self.print_expression(expr, SEQUENCE)?;
                        self.write("]");
                    }
                }
            }
            Expr::Sequence { expressions, .. } => {
                self.write_list(expressions, |printer, expr| printer.print_expression(expr, ASSIGNMENT))?;
            }
            Expr::MacroInvocation(invocation) => {
                return Err(err_ctx!(
                    Internal,
                    invocation.span,
                    "macro invocation {} reached code generation",
                    invocation.name.name
                ));
            }
        }
        Ok(())
    }

    fn print_operand(&mut self, parent: BinaryOp, operand: &Expr, required: u8) -> Result<(), MacroJsError> {
        if mixes_nullish(parent, operand) {
            self.write("(");
            self.print_expression_bare(operand)?;
            self.write(")");
            Ok(())
        } else {
            self.print_expression(operand, required)
        }
    }

    fn print_property(&mut self, property: &Property) -> Result<(), MacroJsError> {
        self.mark(property.span, None);
        if property.shorthand {
            if let (PropertyKey::Identifier(key), Expr::Identifier(value)) = (&property.key, &property.value) {
                if *key == value.name {
                    self.write_identifier(value);
                    return Ok(());
                }
            }
        }
        match &property.key {
            PropertyKey::Identifier(name) | PropertyKey::String(name) | PropertyKey::Number(name) => self.write(name),
            PropertyKey::Computed(expr) => {
                self.write("[");
                self.print_expression(expr, ASSIGNMENT)?;
                self.write("]");
            }
        }
        self.write(": ");
        self.print_expression(&property.value, ASSIGNMENT)
    }

    fn print_arrow(&mut self, arrow: &ArrowFunction) -> Result<(), MacroJsError> {
        match arrow.params.as_slice() {
            [param] => self.write_identifier(param),
            params => {
                self.write("(");
                self.write_list(params, |printer, param| {
                    printer.write_identifier(param);
                    Ok(())
                })?;
                self.write(")");
            }
        }
        self.write(" => ");
        match &arrow.body {
            ArrowBody::Block(block) => self.print_block(block),
            ArrowBody::Expression(body) if starts_ambiguously(body) => {
                self.write("(");
                self.print_expression(body, SEQUENCE)?;
                self.write(")");
                Ok(())
            }
            ArrowBody::Expression(body) => self.print_expression(body, ASSIGNMENT),
        }
    }
}
