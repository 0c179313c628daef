//! Statement rules of the host grammar.

use crate::ast::{
    Block, CatchClause, ForEachKind, ForHead, ForInit, Function, Span, Stmt, SwitchCase, VarKind,
    VariableDeclaration, VariableDeclarator,
};
use crate::MacroJsError;

use super::grammar::{
    consume_semicolon, expect_keyword, expect_punct, finish_span, parse_binding_identifier,
    unexpected, Grammar,
};
use super::token::TokenKind;

pub fn parse_statement<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let token = p.cursor().peek().clone();
    match token.kind {
        TokenKind::Punct if token.value == "{" => Ok(Stmt::Block(parse_block(p)?)),
        TokenKind::Punct if token.value == ";" => {
            p.cursor_mut().advance();
            Ok(Stmt::Empty { span: token.span })
        }
        TokenKind::Keyword => match token.value.as_str() {
            "var" | "const" => parse_variable_statement(p),
            "function" => Ok(Stmt::Function(parse_function(p, true)?)),
            "return" => parse_return(p),
            "if" => parse_if(p),
            "for" => parse_for(p),
            "while" => parse_while(p),
            "do" => parse_do_while(p),
            "break" | "continue" => parse_jump(p),
            "throw" => parse_throw(p),
            "try" => parse_try(p),
            "switch" => parse_switch(p),
            _ => parse_expression_statement(p),
        },
        TokenKind::Name if is_let_declaration(p) => parse_variable_statement(p),
        _ => parse_expression_statement(p),
    }
}

/// `let` starts a declaration only when a binding name follows.
fn is_let_declaration<G: Grammar + ?Sized>(p: &G) -> bool {
    p.cursor().peek().is_word("let") && p.cursor().peek_nth(1).is_name()
}

fn parse_expression_statement<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor().peek().span;
    let expression = p.parse_expression()?;
    consume_semicolon(p)?;
    Ok(Stmt::Expression {
        expression,
        span: finish_span(p, start),
    })
}

pub fn parse_block<G: Grammar + ?Sized>(p: &mut G) -> Result<Block, MacroJsError> {
    p.enter_scope();
    let block = parse_block_body(p);
    p.exit_scope();
    block
}

/// `{ statements }` without opening a scope of its own.
pub fn parse_block_body<G: Grammar + ?Sized>(p: &mut G) -> Result<Block, MacroJsError> {
    let start = expect_punct(p, "{")?.span;
    let mut body = Vec::new();
    while !p.cursor().check_punct("}") {
        if p.cursor().peek().is_eof() {
            return Err(unexpected(p));
        }
        body.push(p.parse_statement()?);
    }
    p.cursor_mut().advance();
    Ok(Block {
        body,
        span: finish_span(p, start),
    })
}

fn parse_variable_statement<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let declaration = parse_variable_declaration(p)?;
    consume_semicolon(p)?;
    Ok(Stmt::Variable(VariableDeclaration {
        span: finish_span(p, declaration.span),
        ..declaration
    }))
}

pub fn parse_variable_declaration<G: Grammar + ?Sized>(
    p: &mut G,
) -> Result<VariableDeclaration, MacroJsError> {
    let keyword = p.cursor_mut().advance();
    let kind = VarKind::from_keyword(&keyword.value)
        .ok_or_else(|| p.raise_at(keyword.span, &format!("Unexpected token {}", keyword)))?;
    let mut declarations = Vec::new();
    loop {
        let start = p.cursor().peek().span;
        let id = parse_binding_identifier(p)?;
        let init = if p.cursor_mut().eat_punct("=") {
            Some(p.parse_assignment()?)
        } else {
            None
        };
        declarations.push(VariableDeclarator {
            id,
            init,
            span: finish_span(p, start),
        });
        if !p.cursor_mut().eat_punct(",") {
            break;
        }
    }
    Ok(VariableDeclaration {
        kind,
        declarations,
        span: finish_span(p, keyword.span),
    })
}

/// `function name(params) { body }`. Statement functions bind their name in
/// the enclosing scope; expression functions bind it inside their own.
pub fn parse_function<G: Grammar + ?Sized>(
    p: &mut G,
    is_statement: bool,
) -> Result<Function, MacroJsError> {
    let start = expect_keyword(p, "function")?.span;
    let named = p.cursor().peek().is_name();
    let mut id = None;
    if is_statement {
        id = Some(parse_binding_identifier(p)?);
    }
    p.enter_scope();
    let result = (|| -> Result<_, MacroJsError> {
        if !is_statement && named {
            id = Some(parse_binding_identifier(p)?);
        }
        let params = parse_params(p)?;
        let body = parse_block_body(p)?;
        Ok((params, body))
    })();
    p.exit_scope();
    let (params, body) = result?;
    Ok(Function {
        id,
        params,
        body,
        span: finish_span(p, start),
    })
}

/// `( name, name, ... )`, each declared as a parameter.
pub fn parse_params<G: Grammar + ?Sized>(p: &mut G) -> Result<Vec<crate::ast::Identifier>, MacroJsError> {
    expect_punct(p, "(")?;
    let mut params = Vec::new();
    while !p.cursor().check_punct(")") {
        params.push(parse_binding_identifier(p)?);
        if !p.cursor_mut().eat_punct(",") {
            break;
        }
    }
    expect_punct(p, ")")?;
    Ok(params)
}

fn parse_return<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let next = p.cursor().peek();
    let argument = if next.is_punct(";") || next.is_punct("}") || next.is_eof() || next.newline_before {
        None
    } else {
        Some(p.parse_expression()?)
    };
    consume_semicolon(p)?;
    Ok(Stmt::Return {
        argument,
        span: finish_span(p, start),
    })
}

fn parse_jump<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let keyword = p.cursor_mut().advance();
    consume_semicolon(p)?;
    let span = finish_span(p, keyword.span);
    if keyword.value == "break" {
        Ok(Stmt::Break { span })
    } else {
        Ok(Stmt::Continue { span })
    }
}

fn parse_throw<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    if p.cursor().peek().newline_before {
        return Err(p.raise_at(p.cursor().peek().span, "Illegal newline after throw"));
    }
    let argument = p.parse_expression()?;
    consume_semicolon(p)?;
    Ok(Stmt::Throw {
        argument,
        span: finish_span(p, start),
    })
}

fn parse_parenthesized<G: Grammar + ?Sized>(p: &mut G) -> Result<crate::ast::Expr, MacroJsError> {
    expect_punct(p, "(")?;
    let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
    let expr = p.parse_expression();
    p.cursor_mut().allow_in = allow_in;
    let expr = expr?;
    expect_punct(p, ")")?;
    Ok(expr)
}

fn parse_if<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let test = parse_parenthesized(p)?;
    let consequent = Box::new(p.parse_statement()?);
    let alternate = if p.cursor_mut().eat_keyword("else") {
        Some(Box::new(p.parse_statement()?))
    } else {
        None
    };
    Ok(Stmt::If {
        test,
        consequent,
        alternate,
        span: finish_span(p, start),
    })
}

fn parse_while<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let test = parse_parenthesized(p)?;
    let body = Box::new(p.parse_statement()?);
    Ok(Stmt::While {
        test,
        body,
        span: finish_span(p, start),
    })
}

fn parse_do_while<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let body = Box::new(p.parse_statement()?);
    expect_keyword(p, "while")?;
    let test = parse_parenthesized(p)?;
    p.cursor_mut().eat_punct(";");
    Ok(Stmt::DoWhile {
        body,
        test,
        span: finish_span(p, start),
    })
}

fn parse_for<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    expect_punct(p, "(")?;
    p.enter_scope();
    let result = parse_for_rest(p, start);
    p.exit_scope();
    result
}

fn for_each_kind<G: Grammar + ?Sized>(p: &G, offset: usize) -> Option<ForEachKind> {
    let token = p.cursor().peek_nth(offset);
    if token.is_keyword("in") {
        Some(ForEachKind::In)
    } else if token.is_word("of") {
        Some(ForEachKind::Of)
    } else {
        None
    }
}

fn parse_for_rest<G: Grammar + ?Sized>(p: &mut G, start: Span) -> Result<Stmt, MacroJsError> {
    let head = p.cursor().peek().clone();
    let is_declaration = head.is_keyword("var")
        || head.is_keyword("const")
        || (head.is_word("let") && p.cursor().peek_nth(1).is_name());

    let init = if p.cursor().check_punct(";") {
        None
    } else if is_declaration {
        if p.cursor().peek_nth(1).is_name() {
            if let Some(kind) = for_each_kind(p, 2) {
                let var_kind = VarKind::from_keyword(&head.value)
                    .ok_or_else(|| p.raise_at(head.span, &format!("Unexpected token {}", head)))?;
                p.cursor_mut().advance();
                let id = parse_binding_identifier(p)?;
                let left = ForHead::Variable { kind: var_kind, id };
                return parse_for_each(p, start, kind, left);
            }
        }
        p.cursor_mut().allow_in = false;
        let declaration = parse_variable_declaration(p);
        p.cursor_mut().allow_in = true;
        Some(ForInit::Variable(declaration?))
    } else {
        p.cursor_mut().allow_in = false;
        let expression = p.parse_expression();
        p.cursor_mut().allow_in = true;
        let expression = expression?;
        if let Some(kind) = for_each_kind(p, 0) {
            if !expression.is_assignment_target() {
                return Err(p.raise_at(expression.span(), "Invalid left-hand side in for loop"));
            }
            return parse_for_each(p, start, kind, ForHead::Target(expression));
        }
        Some(ForInit::Expression(expression))
    };

    expect_punct(p, ";")?;
    let test = if p.cursor().check_punct(";") {
        None
    } else {
        Some(p.parse_expression()?)
    };
    expect_punct(p, ";")?;
    let update = if p.cursor().check_punct(")") {
        None
    } else {
        Some(p.parse_expression()?)
    };
    expect_punct(p, ")")?;
    let body = Box::new(p.parse_statement()?);
    Ok(Stmt::For {
        init,
        test,
        update,
        body,
        span: finish_span(p, start),
    })
}

fn parse_for_each<G: Grammar + ?Sized>(
    p: &mut G,
    start: Span,
    kind: ForEachKind,
    left: ForHead,
) -> Result<Stmt, MacroJsError> {
    p.cursor_mut().advance();
    let right = match kind {
        ForEachKind::In => p.parse_expression()?,
        ForEachKind::Of => p.parse_assignment()?,
    };
    expect_punct(p, ")")?;
    let body = Box::new(p.parse_statement()?);
    Ok(Stmt::ForEach {
        kind,
        left,
        right,
        body,
        span: finish_span(p, start),
    })
}

fn parse_try<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let block = parse_block(p)?;

    let handler = if p.cursor().check_keyword("catch") {
        let catch_start = p.cursor_mut().advance().span;
        p.enter_scope();
        let clause = (|| -> Result<_, MacroJsError> {
            let param = if p.cursor_mut().eat_punct("(") {
                let param = parse_binding_identifier(p)?;
                expect_punct(p, ")")?;
                Some(param)
            } else {
                None
            };
            let body = parse_block_body(p)?;
            Ok(CatchClause {
                param,
                body,
                span: finish_span(p, catch_start),
            })
        })();
        p.exit_scope();
        Some(clause?)
    } else {
        None
    };

    let finalizer = if p.cursor_mut().eat_keyword("finally") {
        Some(parse_block(p)?)
    } else {
        None
    };

    if handler.is_none() && finalizer.is_none() {
        return Err(p.raise_at(p.cursor().peek().span, "Missing catch or finally after try"));
    }
    Ok(Stmt::Try {
        block,
        handler,
        finalizer,
        span: finish_span(p, start),
    })
}

fn parse_switch<G: Grammar + ?Sized>(p: &mut G) -> Result<Stmt, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let discriminant = parse_parenthesized(p)?;
    expect_punct(p, "{")?;
    p.enter_scope();
    let cases = parse_switch_cases(p);
    p.exit_scope();
    let cases = cases?;
    expect_punct(p, "}")?;
    Ok(Stmt::Switch {
        discriminant,
        cases,
        span: finish_span(p, start),
    })
}

fn parse_switch_cases<G: Grammar + ?Sized>(p: &mut G) -> Result<Vec<SwitchCase>, MacroJsError> {
    let mut cases = Vec::new();
    let mut seen_default = false;
    while !p.cursor().check_punct("}") {
        let case_start = p.cursor().peek().span;
        let test = if p.cursor_mut().eat_keyword("case") {
            Some(p.parse_expression()?)
        } else if p.cursor().check_keyword("default") {
            if seen_default {
                return Err(p.raise_at(case_start, "Multiple default clauses"));
            }
            seen_default = true;
            p.cursor_mut().advance();
            None
        } else {
            return Err(unexpected(p));
        };
        expect_punct(p, ":")?;
        let mut consequent = Vec::new();
        while !(p.cursor().check_punct("}")
            || p.cursor().check_keyword("case")
            || p.cursor().check_keyword("default"))
        {
            if p.cursor().peek().is_eof() {
                return Err(unexpected(p));
            }
            consequent.push(p.parse_statement()?);
        }
        cases.push(SwitchCase {
            test,
            consequent,
            span: finish_span(p, case_start),
        });
    }
    Ok(cases)
}
