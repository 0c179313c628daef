//! Expression rules of the host grammar, by increasing binding strength.

use crate::ast::{
    ArrowBody, ArrowFunction, AssignOp, BinaryOp, Expr, Literal, LiteralKind, MemberProperty,
    Property, PropertyKey, Span, UnaryOp, UpdateOp,
};
use crate::MacroJsError;

use super::grammar::{expect_identifier, expect_punct, finish_span, parse_binding_identifier, unexpected, Grammar};
use super::statement::{parse_block_body, parse_function, parse_params};
use super::token::TokenKind;

pub fn parse_expression<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let start = p.cursor().peek().span;
    let first = p.parse_assignment()?;
    if !p.cursor().check_punct(",") {
        return Ok(first);
    }
    let mut expressions = vec![first];
    while p.cursor_mut().eat_punct(",") {
        expressions.push(p.parse_assignment()?);
    }
    Ok(Expr::Sequence {
        expressions,
        span: finish_span(p, start),
    })
}

pub fn parse_assignment<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    if let Some(arrow) = try_parse_arrow(p)? {
        return Ok(arrow);
    }
    let start = p.cursor().peek().span;
    let target = parse_conditional(p)?;
    let Some(operator) = AssignOp::from_token(p.cursor().peek()) else {
        return Ok(target);
    };
    if !target.is_assignment_target() {
        return Err(p.raise_at(target.span(), "Invalid assignment target"));
    }
    p.cursor_mut().advance();
    let value = p.parse_assignment()?;
    Ok(Expr::Assign {
        operator,
        target: Box::new(target),
        value: Box::new(value),
        span: finish_span(p, start),
    })
}

/// Arrow functions are recognized by looking ahead for `=>` after a single
/// name or after a balanced parameter list.
fn try_parse_arrow<G: Grammar + ?Sized>(p: &mut G) -> Result<Option<Expr>, MacroJsError> {
    let cursor = p.cursor();
    let token = cursor.peek();
    let arrow_follows = |index: usize| {
        let next = cursor.token_at(index);
        next.is_punct("=>") && !next.newline_before
    };
    let parenthesized = if token.is_name() && arrow_follows(cursor.index() + 1) {
        false
    } else if token.is_punct("(") {
        match cursor.matching_close(cursor.index()) {
            Some(close) if arrow_follows(close + 1) => true,
            _ => return Ok(None),
        }
    } else {
        return Ok(None);
    };

    let start = token.span;
    p.enter_scope();
    let arrow = parse_arrow_rest(p, start, parenthesized);
    p.exit_scope();
    arrow.map(Some)
}

fn parse_arrow_rest<G: Grammar + ?Sized>(
    p: &mut G,
    start: Span,
    parenthesized: bool,
) -> Result<Expr, MacroJsError> {
    let params = if parenthesized {
        parse_params(p)?
    } else {
        vec![parse_binding_identifier(p)?]
    };
    expect_punct(p, "=>")?;
    let body = if p.cursor().check_punct("{") {
        ArrowBody::Block(parse_block_body(p)?)
    } else {
        ArrowBody::Expression(p.parse_assignment()?)
    };
    Ok(Expr::Arrow(Box::new(ArrowFunction {
        params,
        body,
        span: finish_span(p, start),
    })))
}

fn parse_conditional<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let start = p.cursor().peek().span;
    let test = parse_binary(p, 1)?;
    if !p.cursor_mut().eat_punct("?") {
        return Ok(test);
    }
    let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
    let consequent = p.parse_assignment();
    p.cursor_mut().allow_in = allow_in;
    let consequent = consequent?;
    expect_punct(p, ":")?;
    let alternate = p.parse_assignment()?;
    Ok(Expr::Conditional {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
        span: finish_span(p, start),
    })
}

/// Precedence climbing over [`BinaryOp::precedence`].
fn parse_binary<G: Grammar + ?Sized>(p: &mut G, min_precedence: u8) -> Result<Expr, MacroJsError> {
    let start = p.cursor().peek().span;
    let mut left = parse_unary(p)?;
    loop {
        let Some(operator) = BinaryOp::from_token(p.cursor().peek()) else {
            break;
        };
        if operator == BinaryOp::In && !p.cursor().allow_in {
            break;
        }
        let precedence = operator.precedence();
        if precedence < min_precedence {
            break;
        }
        p.cursor_mut().advance();
        let next_min = if operator.is_right_associative() {
            precedence
        } else {
            precedence + 1
        };
        let right = parse_binary(p, next_min)?;
        left = Expr::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span: finish_span(p, start),
        };
    }
    Ok(left)
}

fn parse_unary<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let start = p.cursor().peek().span;
    if let Some(operator) = UnaryOp::from_token(p.cursor().peek()) {
        p.cursor_mut().advance();
        let argument = parse_unary(p)?;
        return Ok(Expr::Unary {
            operator,
            argument: Box::new(argument),
            span: finish_span(p, start),
        });
    }
    if let Some(operator) = UpdateOp::from_token(p.cursor().peek()) {
        p.cursor_mut().advance();
        let argument = parse_unary(p)?;
        if !argument.is_assignment_target() {
            return Err(p.raise_at(argument.span(), "Invalid update target"));
        }
        return Ok(Expr::Update {
            operator,
            prefix: true,
            argument: Box::new(argument),
            span: finish_span(p, start),
        });
    }

    let expr = parse_left_hand_side(p)?;
    let next = p.cursor().peek();
    if let Some(operator) = UpdateOp::from_token(next) {
        if !next.newline_before {
            if !expr.is_assignment_target() {
                return Err(p.raise_at(expr.span(), "Invalid update target"));
            }
            p.cursor_mut().advance();
            return Ok(Expr::Update {
                operator,
                prefix: false,
                argument: Box::new(expr),
                span: finish_span(p, start),
            });
        }
    }
    Ok(expr)
}

fn parse_left_hand_side<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let base = if p.cursor().check_keyword("new") {
        parse_new(p)?
    } else {
        parse_primary(p)?
    };
    parse_subscripts(p, base, true)
}

fn parse_new<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let start = p.cursor_mut().advance().span;
    let callee = if p.cursor().check_keyword("new") {
        parse_new(p)?
    } else {
        parse_primary(p)?
    };
    let callee = parse_subscripts(p, callee, false)?;
    let arguments = if p.cursor().check_punct("(") {
        parse_arguments(p)?
    } else {
        Vec::new()
    };
    Ok(Expr::New {
        callee: Box::new(callee),
        arguments,
        span: finish_span(p, start),
    })
}

/// Member accesses and (when `calls` is set) call suffixes.
fn parse_subscripts<G: Grammar + ?Sized>(
    p: &mut G,
    mut base: Expr,
    calls: bool,
) -> Result<Expr, MacroJsError> {
    let start = base.span();
    loop {
        if p.cursor_mut().eat_punct(".") {
            let name = parse_property_name(p)?;
            base = Expr::Member {
                object: Box::new(base),
                property: MemberProperty::Named(name),
                optional: false,
                span: finish_span(p, start),
            };
        } else if p.cursor().check_punct("?.") && calls {
            p.cursor_mut().advance();
            if p.cursor().check_punct("(") {
                let arguments = parse_arguments(p)?;
                base = Expr::Call {
                    callee: Box::new(base),
                    arguments,
                    optional: true,
                    span: finish_span(p, start),
                };
            } else if p.cursor_mut().eat_punct("[") {
                let property = parse_computed_property(p)?;
                base = Expr::Member {
                    object: Box::new(base),
                    property,
                    optional: true,
                    span: finish_span(p, start),
                };
            } else {
                let name = parse_property_name(p)?;
                base = Expr::Member {
                    object: Box::new(base),
                    property: MemberProperty::Named(name),
                    optional: true,
                    span: finish_span(p, start),
                };
            }
        } else if p.cursor_mut().eat_punct("[") {
            let property = parse_computed_property(p)?;
            base = Expr::Member {
                object: Box::new(base),
                property,
                optional: false,
                span: finish_span(p, start),
            };
        } else if calls && p.cursor().check_punct("(") {
            let arguments = parse_arguments(p)?;
            base = Expr::Call {
                callee: Box::new(base),
                arguments,
                optional: false,
                span: finish_span(p, start),
            };
        } else {
            return Ok(base);
        }
    }
}

/// Property names after `.` may be any word, keywords included.
fn parse_property_name<G: Grammar + ?Sized>(p: &mut G) -> Result<String, MacroJsError> {
    let token = p.cursor().peek();
    if matches!(token.kind, TokenKind::Name | TokenKind::Keyword) {
        Ok(p.cursor_mut().advance().value)
    } else {
        Err(unexpected(p))
    }
}

fn parse_computed_property<G: Grammar + ?Sized>(p: &mut G) -> Result<MemberProperty, MacroJsError> {
    let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
    let property = p.parse_expression();
    p.cursor_mut().allow_in = allow_in;
    let property = property?;
    expect_punct(p, "]")?;
    Ok(MemberProperty::Computed(Box::new(property)))
}

pub fn parse_arguments<G: Grammar + ?Sized>(p: &mut G) -> Result<Vec<Expr>, MacroJsError> {
    expect_punct(p, "(")?;
    let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
    let arguments = parse_list_items(p, ")");
    p.cursor_mut().allow_in = allow_in;
    let arguments = arguments?;
    expect_punct(p, ")")?;
    Ok(arguments)
}

/// Comma-separated assignment expressions up to `close`, trailing comma allowed.
fn parse_list_items<G: Grammar + ?Sized>(p: &mut G, close: &str) -> Result<Vec<Expr>, MacroJsError> {
    let mut items = Vec::new();
    while !p.cursor().check_punct(close) {
        items.push(p.parse_assignment()?);
        if !p.cursor_mut().eat_punct(",") {
            break;
        }
    }
    Ok(items)
}

fn literal<G: Grammar + ?Sized>(p: &mut G, kind: LiteralKind) -> Expr {
    let token = p.cursor_mut().advance();
    Expr::Literal(Literal {
        kind,
        raw: token.value,
        span: token.span,
    })
}

fn parse_primary<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let token = p.cursor().peek().clone();
    match token.kind {
        TokenKind::Name => p.parse_identifier_expression(),
        TokenKind::Num => Ok(literal(p, LiteralKind::Number)),
        TokenKind::BigInt => Ok(literal(p, LiteralKind::BigInt)),
        TokenKind::String => Ok(literal(p, LiteralKind::String)),
        TokenKind::Regex => Ok(literal(p, LiteralKind::Regex)),
        TokenKind::Keyword => match token.value.as_str() {
            "true" | "false" => Ok(literal(p, LiteralKind::Boolean)),
            "null" => Ok(literal(p, LiteralKind::Null)),
            "this" => {
                p.cursor_mut().advance();
                Ok(Expr::This { span: token.span })
            }
            "function" => Ok(Expr::Function(Box::new(parse_function(p, false)?))),
            _ => Err(unexpected(p)),
        },
        TokenKind::Punct => match token.value.as_str() {
            "(" => {
                p.cursor_mut().advance();
                let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
                let inner = p.parse_expression();
                p.cursor_mut().allow_in = allow_in;
                let inner = inner?;
                expect_punct(p, ")")?;
                Ok(inner)
            }
            "[" => {
                p.cursor_mut().advance();
                let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
                let elements = parse_list_items(p, "]");
                p.cursor_mut().allow_in = allow_in;
                let elements = elements?;
                expect_punct(p, "]")?;
                Ok(Expr::Array {
                    elements,
                    span: finish_span(p, token.span),
                })
            }
            "{" => parse_object(p),
            _ => Err(unexpected(p)),
        },
        TokenKind::Eof => Err(unexpected(p)),
    }
}

fn parse_object<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let start = expect_punct(p, "{")?.span;
    let allow_in = std::mem::replace(&mut p.cursor_mut().allow_in, true);
    let properties = parse_properties(p);
    p.cursor_mut().allow_in = allow_in;
    let properties = properties?;
    expect_punct(p, "}")?;
    Ok(Expr::Object {
        properties,
        span: finish_span(p, start),
    })
}

fn parse_properties<G: Grammar + ?Sized>(p: &mut G) -> Result<Vec<Property>, MacroJsError> {
    let mut properties = Vec::new();
    while !p.cursor().check_punct("}") {
        let token = p.cursor().peek().clone();
        let index = p.cursor().index();
        let shorthand = token.is_name()
            && (p.cursor().peek_nth(1).is_punct(",") || p.cursor().peek_nth(1).is_punct("}"));
        let property = if shorthand {
            let mut id = expect_identifier(p)?;
            p.resolve_reference(&mut id, index)?;
            Property {
                key: PropertyKey::Identifier(token.value.clone()),
                value: Expr::Identifier(id),
                shorthand: true,
                span: token.span,
            }
        } else {
            let key = match token.kind {
                TokenKind::Name | TokenKind::Keyword => {
                    PropertyKey::Identifier(p.cursor_mut().advance().value)
                }
                TokenKind::String => PropertyKey::String(p.cursor_mut().advance().value),
                TokenKind::Num => PropertyKey::Number(p.cursor_mut().advance().value),
                TokenKind::Punct if token.value == "[" => {
                    p.cursor_mut().advance();
                    let key = p.parse_assignment()?;
                    expect_punct(p, "]")?;
                    PropertyKey::Computed(Box::new(key))
                }
                _ => return Err(unexpected(p)),
            };
            expect_punct(p, ":")?;
            let value = p.parse_assignment()?;
            Property {
                key,
                value,
                shorthand: false,
                span: finish_span(p, token.span),
            }
        };
        properties.push(property);
        if !p.cursor_mut().eat_punct(",") {
            break;
        }
    }
    Ok(properties)
}

/// Default identifier-expression rule: a plain reference.
pub fn parse_identifier_reference<G: Grammar + ?Sized>(p: &mut G) -> Result<Expr, MacroJsError> {
    let index = p.cursor().index();
    let mut id = expect_identifier(p)?;
    p.resolve_reference(&mut id, index)?;
    Ok(Expr::Identifier(id))
}
