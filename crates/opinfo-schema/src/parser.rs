//! Signature text parser
//!
//! Accepts the operator declaration format:
//!
//! ```text
//! ns::name.overload(Tensor(a!) self, Tensor other, *, Scalar alpha=1) -> Tensor(a!)
//! ```
//!
//! Alias annotations follow the base type and precede list/optional suffixes.
//! Default values are kept as raw text; they are never evaluated.

use crate::alias::{AliasAnnotation, WILDCARD_SET};
use crate::error::SchemaError;
use crate::schema::{Argument, FunctionSchema, OperatorName};

/// Base types whose parentheses hold type parameters rather than an alias
const PARAMETERIZED_TYPES: &[&str] = &["Dict", "Future", "RRef", "Tuple", "Union", "Await"];

pub fn parse_schema(text: &str) -> Result<FunctionSchema, SchemaError> {
    let mut parser = Parser::new(text);
    let schema = parser.schema()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(schema)
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::parse(message, self.pos)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), SchemaError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{token}`")))
        }
    }

    fn ident(&mut self) -> Result<&'s str, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn peek_ident_start(&mut self) -> bool {
        self.skip_ws();
        self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    }

    fn schema(&mut self) -> Result<FunctionSchema, SchemaError> {
        let name = self.operator_name()?;
        let arguments = self.arguments()?;
        self.expect("->")?;
        let returns = self.returns()?;
        FunctionSchema::new(name, arguments, returns)
    }

    fn operator_name(&mut self) -> Result<OperatorName, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        self.ident()?;
        while self.rest().starts_with("::") {
            self.pos += 2;
            self.ident()?;
        }
        let name = self.src[start..self.pos].to_string();
        let overload = if self.peek() == Some('.') {
            self.bump();
            self.ident()?.to_string()
        } else {
            String::new()
        };
        Ok(OperatorName::new(name, overload))
    }

    fn arguments(&mut self) -> Result<Vec<Argument>, SchemaError> {
        self.expect("(")?;
        let mut arguments = Vec::new();
        if self.eat(")") {
            return Ok(arguments);
        }
        let mut kwarg_only = false;
        loop {
            if self.eat("*") {
                kwarg_only = true;
            } else {
                let mut arg = self.argument(false)?;
                arg.kwarg_only = kwarg_only;
                arguments.push(arg);
            }
            if self.eat(")") {
                return Ok(arguments);
            }
            self.expect(",")?;
        }
    }

    fn returns(&mut self) -> Result<Vec<Argument>, SchemaError> {
        self.skip_ws();
        if !self.eat("(") {
            return Ok(vec![self.argument(true)?]);
        }
        let mut returns = Vec::new();
        if self.eat(")") {
            return Ok(returns);
        }
        loop {
            returns.push(self.argument(true)?);
            if self.eat(")") {
                return Ok(returns);
            }
            self.expect(",")?;
        }
    }

    fn argument(&mut self, is_return: bool) -> Result<Argument, SchemaError> {
        let (ty, alias) = self.type_with_alias()?;
        let name = if is_return {
            if self.peek_ident_start() {
                self.ident()?.to_string()
            } else {
                String::new()
            }
        } else {
            self.ident()?.to_string()
        };
        let default_value = if !is_return && self.eat("=") {
            Some(self.default_value()?)
        } else {
            None
        };
        Ok(Argument {
            name,
            ty,
            default_value,
            kwarg_only: false,
            alias,
        })
    }

    fn type_with_alias(&mut self) -> Result<(String, Option<AliasAnnotation>), SchemaError> {
        let base = self.ident()?;
        let mut ty = base.to_string();
        let mut alias = None;

        if self.peek() == Some('(') {
            if PARAMETERIZED_TYPES.contains(&base) {
                ty.push_str(self.balanced('(', ')')?);
            } else {
                self.bump();
                alias = Some(self.alias_annotation()?);
                self.expect(")")?;
            }
        }

        loop {
            if self.rest().starts_with('?') {
                self.bump();
                ty.push('?');
            } else if self.rest().starts_with('[') {
                ty.push_str(self.balanced('[', ']')?);
            } else if alias.is_none() && self.rest().starts_with('(') {
                // list element annotation written after the suffix: `t[](a!)`
                self.bump();
                alias = Some(self.alias_annotation()?);
                self.expect(")")?;
            } else {
                break;
            }
        }
        Ok((ty, alias))
    }

    fn alias_annotation(&mut self) -> Result<AliasAnnotation, SchemaError> {
        let before = self.alias_sets()?;
        let is_write = self.eat("!");
        let after = if self.eat("->") {
            self.alias_sets()?
        } else {
            Vec::new()
        };
        Ok(AliasAnnotation::new(before, is_write).with_after_sets(after))
    }

    fn alias_sets(&mut self) -> Result<Vec<String>, SchemaError> {
        let mut sets = Vec::new();
        loop {
            if self.eat(WILDCARD_SET) {
                sets.push(WILDCARD_SET.to_string());
            } else {
                sets.push(self.ident()?.to_string());
            }
            if !self.eat("|") {
                return Ok(sets);
            }
        }
    }

    /// Consumes a bracketed region, returning it verbatim
    fn balanced(&mut self, open: char, close: char) -> Result<&'s str, SchemaError> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(&self.src[start..self.pos]);
                }
            }
        }
        Err(SchemaError::parse(format!("unclosed `{open}`"), start))
    }

    /// Raw default text up to the next top-level `,` or `)`
    fn default_value(&mut self) -> Result<String, SchemaError> {
        self.skip_ws();
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        while let Some(c) = self.peek() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), '\\') => {
                    self.bump();
                }
                (Some(_), _) => {}
                (None, '\'' | '"') => quote = Some(c),
                (None, '[' | '(') => depth += 1,
                (None, ']') => depth = depth.saturating_sub(1),
                (None, ',' | ')') if depth == 0 => break,
                (None, ')') => depth -= 1,
                (None, _) => {}
            }
            self.bump();
        }
        if quote.is_some() {
            return Err(SchemaError::parse("unterminated string default", start));
        }
        let text = self.src[start..self.pos].trim_end();
        if text.is_empty() {
            return Err(self.error("expected default value"));
        }
        Ok(text.to_string())
    }
}
