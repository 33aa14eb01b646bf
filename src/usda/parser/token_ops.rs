use anyhow::{anyhow, ensure, Context, Result};

use crate::usda::token::Token;

type LexResult<'source> = std::result::Result<Token<'source>, ()>;

/// Token stream operations.
impl<'a> super::Parser<'a> {
    /// Fetch the next token from the stream and update the last span.
    #[inline]
    pub(super) fn fetch_next(&mut self) -> Result<Token<'a>> {
        let (token, span) = self.iter.next().context("Unexpected end of tokens")?;
        self.last_span = Some(span);
        token.map_err(|e| anyhow!("Logos error: {e:?}"))
    }

    /// Peek at the next token without consuming it.
    #[inline]
    pub(super) fn peek_next(&mut self) -> Option<&LexResult<'a>> {
        self.iter.peek().map(|(token, _)| token)
    }

    /// Peek at the next token, failing at end of input or on a lexer error.
    pub(super) fn peek_token(&mut self) -> Result<Token<'a>> {
        match self.iter.peek() {
            Some((Ok(token), _)) => Ok(*token),
            Some((Err(e), span)) => {
                self.last_span = Some(span.clone());
                Err(anyhow!("Logos error: {e:?}"))
            }
            None => Err(anyhow!("Unexpected end of tokens")),
        }
    }

    /// Check if the next token matches the expected token.
    #[inline]
    pub(super) fn is_next(&mut self, expected: Token) -> bool {
        matches!(self.peek_next(), Some(Ok(t)) if *t == expected)
    }

    /// Ensure the next token matches the expected token and consume it.
    pub(super) fn ensure_next(&mut self, expected_token: Token) -> Result<()> {
        let token = self.fetch_next()?;
        ensure!(
            token == expected_token,
            "Unexpected token (want: {expected_token:?}, got {token:?})"
        );
        Ok(())
    }

    /// Ensure the next token is a specific punctuation character.
    #[inline]
    pub(super) fn ensure_pun(&mut self, value: char) -> Result<()> {
        self.ensure_next(Token::Punctuation(value))
            .with_context(|| format!("'{value}' expected"))
    }

    /// Fetch the next token and ensure it's a string. Escapes are resolved.
    pub(super) fn fetch_str(&mut self) -> Result<String> {
        let token = self.fetch_next()?;
        token
            .try_as_string()
            .map(unescape)
            .ok_or_else(|| anyhow!("Unexpected token {token:?} (want String)"))
    }
}

/// Resolve `\"`, `\\`, `\n` and `\t`. Any other escaped character stands for itself.
pub(super) fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
