use anyhow::{anyhow, bail, Context, Result};

use crate::layer::PrimSpec;
use crate::sdf;
use crate::usda::token::Token;

/// Variant bookkeeping read from a prim's `( ... )` block.
#[derive(Debug, Default)]
pub(super) struct PrimMetadata {
    variant_sets: Vec<String>,
    selections: Vec<(String, String)>,
}

impl PrimMetadata {
    /// Declare the listed variant sets on `spec` and apply the selections.
    pub(super) fn apply(self, prim_path: &sdf::Path, spec: &mut PrimSpec) {
        for name in self.variant_sets {
            spec.variant_sets.entry(name).or_default();
        }
        for (set, variant) in self.selections {
            spec.variant_sets.entry(set).or_default().select(prim_path, &variant);
        }
    }
}

/// Metadata parsing functions.
impl<'a> super::Parser<'a> {
    /// Parse the metadata block of a prim: `variants` selections and the
    /// `variantSets` list.
    pub(super) fn read_prim_metadata(&mut self) -> Result<PrimMetadata> {
        self.ensure_pun('(')?;
        let mut metadata = PrimMetadata::default();

        loop {
            let next = self.fetch_next().context("Unable to fetch next prim metadata entry")?;
            match next {
                Token::Punctuation(')') => break,
                Token::Variants => {
                    self.ensure_pun('=')?;
                    metadata.selections = self
                        .parse_variant_selection_map()
                        .context("Unable to parse variant selections")?;
                }
                Token::Prepend => {
                    self.ensure_next(Token::VariantSets)
                        .context("Only variantSets may be prepended")?;
                    self.ensure_pun('=')?;
                    metadata.variant_sets = self.parse_array(|this| this.fetch_str())?;
                }
                Token::VariantSets => {
                    self.ensure_pun('=')?;
                    metadata.variant_sets = self.parse_array(|this| this.fetch_str())?;
                }
                other => bail!("Unsupported prim metadata {other:?}"),
            }
        }

        Ok(metadata)
    }

    /// Parse a variant selection map `{ string variantName = "selectedVariant" }`.
    pub(super) fn parse_variant_selection_map(&mut self) -> Result<Vec<(String, String)>> {
        self.ensure_pun('{').context("Variant selection must start with {")?;

        let mut selections = Vec::new();

        loop {
            if self.is_next(Token::Punctuation('}')) {
                self.fetch_next()?;
                break;
            }

            // Expect "string" type hint
            let type_token = self.fetch_next()?;
            match type_token {
                Token::Identifier("string") => {}
                other => bail!("Expected 'string' type in variant selection, got: {other:?}"),
            }

            let name_token = self.fetch_next()?;
            let name = name_token
                .try_as_name()
                .ok_or_else(|| anyhow!("Expected variant set name identifier, got: {name_token:?}"))?
                .to_owned();

            self.ensure_pun('=')?;
            let value = self.fetch_str().context("Expected variant selection value")?;
            selections.push((name, value));
        }

        Ok(selections)
    }

    /// Parse `( typeName = "T" )` on a variant and return the type opinion.
    pub(super) fn read_variant_metadata(&mut self) -> Result<String> {
        self.ensure_pun('(')?;
        let mut type_name = String::new();

        loop {
            match self.fetch_next()? {
                Token::Punctuation(')') => break,
                Token::Identifier("typeName") => {
                    self.ensure_pun('=')?;
                    type_name = self.fetch_str()?;
                }
                other => bail!("Unsupported variant metadata {other:?}"),
            }
        }

        Ok(type_name)
    }
}
