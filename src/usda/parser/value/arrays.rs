use anyhow::{bail, ensure, Context, Result};

use crate::usda::token::Token;

/// Array and tuple parsing functions.
impl<'a> super::super::Parser<'a> {
    /// Generic array parser that delegates element parsing while handling delimiters.
    pub(in crate::usda::parser) fn parse_array_fn(
        &mut self,
        mut read_elements: impl FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.ensure_pun('[').context("Array must start with [")?;

        let mut index = 0;
        loop {
            if self.is_next(Token::Punctuation(']')) {
                self.fetch_next()?;
                break;
            }

            read_elements(self).with_context(|| format!("Unable to read array element {index}"))?;
            index += 1;

            match self.fetch_next()? {
                Token::Punctuation(',') => continue,
                Token::Punctuation(']') => break,
                t => bail!("Either comma or closing bracket expected after value, got: {t:?}"),
            }
        }
        Ok(())
    }

    /// Parse delimiter-separated sequences like `(a, b, c)`.
    pub(in crate::usda::parser) fn parse_seq_fn(
        &mut self,
        delim: char,
        mut read_element: impl FnMut(&mut Self, usize) -> Result<()>,
    ) -> Result<usize> {
        self.ensure_pun('(').context("Open parenthesis expected")?;

        let mut index = 0;
        loop {
            if self.is_next(Token::Punctuation(')')) {
                self.fetch_next()?;
                break;
            }

            read_element(self, index).with_context(|| format!("Unable to read element {index}"))?;
            index += 1;

            match self.fetch_next()? {
                Token::Punctuation(')') => break,
                Token::Punctuation(d) if d == delim => continue,
                t => bail!("Unexpected token between (): {t:?}"),
            }
        }
        Ok(index)
    }

    /// Parse `[a, b, ...]`, reading each element with `read`.
    pub(in crate::usda::parser) fn parse_array<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.parse_array_fn(|this| {
            out.push(read(this)?);
            Ok(())
        })?;
        Ok(out)
    }

    /// Parse a `(x, y, z)` triple of 32-bit floats.
    pub(in crate::usda::parser) fn parse_vec3f(&mut self) -> Result<[f32; 3]> {
        let mut out = [0.0_f32; 3];
        let count = self.parse_seq_fn(',', |this, i| {
            ensure!(i < 3, "3D points need exactly 3 components, got more");
            out[i] = this.parse_f32()?;
            Ok(())
        })?;
        ensure!(count == 3, "3D points need exactly 3 components, got {count}");
        Ok(out)
    }
}
