use anyhow::{anyhow, bail, Result};
use std::{any::type_name, str::FromStr};

use crate::sdf::ValueKind;
use crate::usda::token::Token;

/// Primitive value parsing functions.
impl<'a> super::super::Parser<'a> {
    /// Resolve a declared attribute type such as `int64[]` or `point3f[]`.
    pub(in crate::usda::parser) fn parse_data_type(ty: &str) -> Result<ValueKind> {
        ValueKind::from_tag(ty).ok_or_else(|| anyhow!("Unsupported data type: {ty}"))
    }

    /// Parse single token as `T` which can be deserialized from string (such as `int`, `float`, etc).
    pub(in crate::usda::parser) fn parse_token<T: FromStr>(&mut self) -> Result<T>
    where
        <T as FromStr>::Err: std::fmt::Debug,
    {
        let token = self.fetch_next()?;
        let value_str = match token {
            Token::Number(s) | Token::Identifier(s) => s,
            _ => bail!("Expected a number or identifier, got {token:?}"),
        };
        let value = T::from_str(value_str)
            .map_err(|err| anyhow!("Failed to parse {} from '{}': {:?}", type_name::<T>(), value_str, err))?;

        Ok(value)
    }

    /// Parse a double, accepting `inf`, `-inf` and `nan`.
    pub(in crate::usda::parser) fn parse_f64(&mut self) -> Result<f64> {
        if self.is_next(Token::Punctuation('-')) {
            self.fetch_next()?;
            let next = self.fetch_next()?;
            return match next {
                Token::Identifier("inf") => Ok(f64::NEG_INFINITY),
                _ => bail!("Expected inf after '-', got {next:?}"),
            };
        }
        self.parse_token::<f64>()
    }

    /// Parse a float component; same literal rules as [`Self::parse_f64`].
    pub(in crate::usda::parser) fn parse_f32(&mut self) -> Result<f32> {
        if self.is_next(Token::Punctuation('-')) {
            return self.parse_f64().map(|v| v as f32);
        }
        self.parse_token::<f32>()
    }
}
