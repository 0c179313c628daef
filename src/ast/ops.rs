//! Operator tables for the host grammar.
//!
//! Precedence numbers grow with binding strength. They are shared by the
//! parser (precedence climbing) and the printer (minimal parenthesization).

use serde::Serialize;

use crate::syntax::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Nullish,
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    InstanceOf,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
}

impl BinaryOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        let op = match (token.kind, token.value.as_str()) {
            (TokenKind::Punct, "??") => Self::Nullish,
            (TokenKind::Punct, "||") => Self::Or,
            (TokenKind::Punct, "&&") => Self::And,
            (TokenKind::Punct, "|") => Self::BitOr,
            (TokenKind::Punct, "^") => Self::BitXor,
            (TokenKind::Punct, "&") => Self::BitAnd,
            (TokenKind::Punct, "==") => Self::Eq,
            (TokenKind::Punct, "!=") => Self::NotEq,
            (TokenKind::Punct, "===") => Self::StrictEq,
            (TokenKind::Punct, "!==") => Self::StrictNotEq,
            (TokenKind::Punct, "<") => Self::Lt,
            (TokenKind::Punct, ">") => Self::Gt,
            (TokenKind::Punct, "<=") => Self::LtEq,
            (TokenKind::Punct, ">=") => Self::GtEq,
            (TokenKind::Keyword, "in") => Self::In,
            (TokenKind::Keyword, "instanceof") => Self::InstanceOf,
            (TokenKind::Punct, "<<") => Self::Shl,
            (TokenKind::Punct, ">>") => Self::Shr,
            (TokenKind::Punct, ">>>") => Self::UShr,
            (TokenKind::Punct, "+") => Self::Add,
            (TokenKind::Punct, "-") => Self::Sub,
            (TokenKind::Punct, "*") => Self::Mul,
            (TokenKind::Punct, "/") => Self::Div,
            (TokenKind::Punct, "%") => Self::Rem,
            (TokenKind::Punct, "**") => Self::Exp,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nullish => "??",
            Self::Or => "||",
            Self::And => "&&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::In => "in",
            Self::InstanceOf => "instanceof",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Exp => "**",
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Self::Nullish | Self::Or => 1,
            Self::And => 2,
            Self::BitOr => 3,
            Self::BitXor => 4,
            Self::BitAnd => 5,
            Self::Eq | Self::NotEq | Self::StrictEq | Self::StrictNotEq => 6,
            Self::Lt | Self::Gt | Self::LtEq | Self::GtEq | Self::In | Self::InstanceOf => 7,
            Self::Shl | Self::Shr | Self::UShr => 8,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::Div | Self::Rem => 10,
            Self::Exp => 11,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        matches!(self, Self::Exp)
    }

    /// `??` may not be mixed with `||` or `&&` without parentheses.
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::Nullish | Self::Or | Self::And)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Not,
    BitNot,
    Plus,
    Minus,
    TypeOf,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        let op = match (token.kind, token.value.as_str()) {
            (TokenKind::Punct, "!") => Self::Not,
            (TokenKind::Punct, "~") => Self::BitNot,
            (TokenKind::Punct, "+") => Self::Plus,
            (TokenKind::Punct, "-") => Self::Minus,
            (TokenKind::Keyword, "typeof") => Self::TypeOf,
            (TokenKind::Keyword, "void") => Self::Void,
            (TokenKind::Keyword, "delete") => Self::Delete,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::TypeOf => "typeof",
            Self::Void => "void",
            Self::Delete => "delete",
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Self::TypeOf | Self::Void | Self::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        match (token.kind, token.value.as_str()) {
            (TokenKind::Punct, "++") => Some(Self::Increment),
            (TokenKind::Punct, "--") => Some(Self::Decrement),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Nullish,
}

impl AssignOp {
    pub fn from_token(token: &Token) -> Option<Self> {
        if token.kind != TokenKind::Punct {
            return None;
        }
        let op = match token.value.as_str() {
            "=" => Self::Assign,
            "+=" => Self::Add,
            "-=" => Self::Sub,
            "*=" => Self::Mul,
            "/=" => Self::Div,
            "%=" => Self::Rem,
            "**=" => Self::Exp,
            "<<=" => Self::Shl,
            ">>=" => Self::Shr,
            ">>>=" => Self::UShr,
            "&=" => Self::BitAnd,
            "|=" => Self::BitOr,
            "^=" => Self::BitXor,
            "&&=" => Self::And,
            "||=" => Self::Or,
            "??=" => Self::Nullish,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "=",
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::Rem => "%=",
            Self::Exp => "**=",
            Self::Shl => "<<=",
            Self::Shr => ">>=",
            Self::UShr => ">>>=",
            Self::BitAnd => "&=",
            Self::BitOr => "|=",
            Self::BitXor => "^=",
            Self::And => "&&=",
            Self::Or => "||=",
            Self::Nullish => "??=",
        }
    }
}
