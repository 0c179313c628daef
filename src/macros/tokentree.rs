use crate::syntax::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenTreeError {
    /// A closing bracket that does not close the innermost open one.
    Mismatched(Token),
    /// Input ran out before the tree was closed.
    UnexpectedEnd,
}

/// Reads tokens from `next` until the bracket `end` closes at depth zero.
///
/// Nested `()`, `[]` and `{}` must balance. The closing `end` token is
/// consumed but not returned. No token is interpreted beyond its bracket role.
pub fn consume_token_tree<F>(end: &'static str, mut next: F) -> Result<Vec<Token>, TokenTreeError>
where
    F: FnMut() -> Option<Token>,
{
    let mut tokens = Vec::new();
    let mut stack = vec![end];
    loop {
        let token = match next() {
            Some(token) if !token.is_eof() => token,
            _ => return Err(TokenTreeError::UnexpectedEnd),
        };
        let expected = stack.last().copied().unwrap_or(end);
        if token.is_punct(expected) {
            stack.pop();
            if stack.is_empty() {
                return Ok(tokens);
            }
        } else if let Some(close) = token.closing_bracket() {
            stack.push(close);
        } else if token.is_closing_bracket() {
            return Err(TokenTreeError::Mismatched(token));
        }
        tokens.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize;

    fn read(source: &str, end: &'static str) -> Result<Vec<String>, TokenTreeError> {
        let mut tokens = tokenize(source).unwrap().into_iter();
        consume_token_tree(end, || tokens.next()).map(|tree| tree.into_iter().map(|t| t.value).collect())
    }

    #[test]
    fn stops_at_the_balancing_bracket() {
        let tree = read("a, (b, [c]), { d } ) rest", ")").unwrap();
        assert_eq!(tree.join(" "), "a , ( b , [ c ] ) , { d }");
    }

    #[test]
    fn empty_tree() {
        assert_eq!(read(") x", ")").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn mismatched_closer_is_rejected() {
        match read("a ( b ] )", ")") {
            Err(TokenTreeError::Mismatched(token)) => assert_eq!(token.value, "]"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn running_out_is_rejected() {
        assert_eq!(read("a ( b )", ")"), Err(TokenTreeError::UnexpectedEnd));
    }
}
