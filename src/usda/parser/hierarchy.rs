use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::trace;

use crate::layer::{Overlay, SpecTree};
use crate::sdf;
use crate::usda::token::Token;

use super::metadata::PrimMetadata;

/// Hierarchy parsing functions for prims, attributes, and variant sets.
impl<'a> super::Parser<'a> {
    /// Parse tokens to a prim tree rooted at the pseudo-root.
    pub fn parse(&mut self) -> Result<SpecTree> {
        let root = sdf::Path::abs_root();
        let mut tree = SpecTree::new(root.clone());

        self.read_pseudo_root().context("Unable to parse pseudo root")?;

        while self.peek_next().is_some() {
            self.read_prim(&root, &mut tree, true)?;
        }

        Ok(tree)
    }

    /// Check the `#usda 1.0` header and skip the optional layer metadata block.
    pub(super) fn read_pseudo_root(&mut self) -> Result<()> {
        let next = self.fetch_next()?;
        let version = next
            .try_as_magic()
            .ok_or_else(|| anyhow!("Text file must start with magic token, got {next:?}"))?;
        ensure!(version == "1.0", "File must start with '#usda 1.0', got: {version:?}");

        if !self.is_next(Token::Punctuation('(')) {
            return Ok(());
        }
        self.ensure_pun('(')?;

        loop {
            match self.fetch_next().context("Unable to fetch next pseudo root property")? {
                Token::Punctuation(')') => break,
                // Layer documentation string, either bare or as `doc = "..."`.
                Token::String(_) => {}
                Token::Identifier("doc") => {
                    self.ensure_pun('=')?;
                    self.fetch_str()?;
                }
                other => bail!("Unsupported layer metadata {other:?}"),
            }
        }

        Ok(())
    }

    /// Parse a prim declaration and recursively traverse nested prims and attributes.
    ///
    /// `allow_variants` is false inside a variant body; variant sets do not nest.
    pub(super) fn read_prim(&mut self, parent: &sdf::Path, tree: &mut SpecTree, allow_variants: bool) -> Result<()> {
        let specifier = self.fetch_next().context("Unable to read prim specifier")?;
        match specifier {
            Token::Def | Token::Over => {}
            Token::Class => bail!("Class prims are not supported"),
            _ => bail!("Unexpected prim specifier: {specifier:?}"),
        }

        // Check for optional type specifier; a keyword is a valid type tag.
        let mut type_name = "";
        let mut name_token = self.fetch_next()?;
        if let Some(prim_type) = name_token.try_as_name() {
            type_name = prim_type;
            name_token = self.fetch_next()?;
        }

        let name = name_token
            .try_as_string()
            .ok_or_else(|| anyhow!("Unexpected token {name_token:?} (want String)"))?;
        let prim_path = parent.append_path(name)?;
        ensure!(!tree.contains(&prim_path), "Prim <{prim_path}> is declared twice");

        let root = tree.root().clone();
        tree.ensure(&prim_path)
            .ok_or_else(|| anyhow!("Prim <{prim_path}> is outside <{root}>"))?
            .type_name = type_name.to_owned();
        trace!(prim = %prim_path, type_name, "read prim");

        let metadata = if self.is_next(Token::Punctuation('(')) {
            ensure!(allow_variants, "Prim metadata is not supported inside a variant");
            self.read_prim_metadata().context("Unable to parse prim metadata")?
        } else {
            PrimMetadata::default()
        };

        self.ensure_pun('{').context("Prim body must start with {")?;
        self.read_prim_body(&prim_path, tree, allow_variants)
            .with_context(|| format!("Unable to read body of <{prim_path}>"))?;

        if let Some(spec) = tree.get_mut(&prim_path) {
            metadata.apply(&prim_path, spec);
        }
        Ok(())
    }

    /// Read attributes, child prims and variant sets up to the closing brace.
    fn read_prim_body(&mut self, prim_path: &sdf::Path, tree: &mut SpecTree, allow_variants: bool) -> Result<()> {
        loop {
            match self.peek_token().context("Unexpected end of prim body")? {
                Token::Punctuation('}') => {
                    self.fetch_next()?;
                    break;
                }
                Token::Def | Token::Over | Token::Class => {
                    self.read_prim(prim_path, tree, allow_variants)
                        .context("Unable to read nested primitive")?;
                }
                Token::VariantSet => {
                    ensure!(allow_variants, "Variant sets cannot be nested inside a variant");
                    self.fetch_next()?;
                    self.read_variant_set(prim_path, tree)
                        .context("Unable to read variant set")?;
                }
                _ => {
                    self.read_attribute(prim_path, tree).context("Unable to read attribute")?;
                }
            }
        }
        Ok(())
    }

    /// Parse an attribute declaration and its default value.
    pub(super) fn read_attribute(&mut self, prim_path: &sdf::Path, tree: &mut SpecTree) -> Result<()> {
        if self.is_next(Token::Custom) {
            self.fetch_next()?;
        }
        if self.is_next(Token::Uniform) {
            self.fetch_next()?;
        }

        let type_token = self.fetch_next()?;
        let type_name = match type_token {
            Token::Identifier(s) => s,
            other => bail!("Unexpected token type for attribute type, expected Identifier, got {other:?}"),
        };
        let kind = Self::parse_data_type(type_name)?;

        let name_token = self.fetch_next()?;
        let name = name_token
            .try_as_name()
            .ok_or_else(|| anyhow!("Unexpected token type for attribute name: {name_token:?}"))?;
        ensure!(sdf::is_property_name(name), "Invalid attribute name {name:?}");

        // A declaration without a value carries no opinion.
        if !self.is_next(Token::Punctuation('=')) {
            trace!(prim = %prim_path, attribute = name, "skip attribute without value");
            return Ok(());
        }
        self.ensure_pun('=')?;

        let value = self
            .parse_value(kind)
            .with_context(|| format!("Unable to parse {type_name} value for {name}"))?;

        let spec = tree
            .get_mut(prim_path)
            .ok_or_else(|| anyhow!("No prim spec for <{prim_path}>"))?;
        spec.attributes.insert(name.to_owned(), value);
        Ok(())
    }

    /// Parse a variantSet block within a prim.
    ///
    /// Syntax: `variantSet "name" = { "variant1" { ... } "variant2" ( typeName = "T" ) { ... } }`
    pub(super) fn read_variant_set(&mut self, prim_path: &sdf::Path, tree: &mut SpecTree) -> Result<()> {
        let set_name = self.fetch_str().context("Expected variant set name")?;

        self.ensure_pun('=').context("Expected '=' after variant set name")?;
        self.ensure_pun('{').context("Expected '{' to start variant set block")?;

        loop {
            if self.is_next(Token::Punctuation('}')) {
                self.fetch_next()?;
                break;
            }

            let variant_name = self.fetch_str().context("Expected variant name")?;
            let mut overlay = Overlay::new(prim_path.clone());

            if self.is_next(Token::Punctuation('(')) {
                let type_name = self.read_variant_metadata().context("Unable to parse variant metadata")?;
                if let Some(spec) = overlay.tree_mut().get_mut(prim_path) {
                    spec.type_name = type_name;
                }
            }

            self.ensure_pun('{').context("Expected '{' to start variant body")?;
            self.read_prim_body(prim_path, overlay.tree_mut(), false)
                .with_context(|| format!("Unable to read variant {set_name}={variant_name}"))?;

            let spec = tree
                .get_mut(prim_path)
                .ok_or_else(|| anyhow!("No prim spec for <{prim_path}>"))?;
            spec.variant_sets
                .entry(set_name.clone())
                .or_default()
                .insert_overlay(variant_name, overlay);
        }

        // A variant set with no variants still exists.
        tree.get_mut(prim_path)
            .ok_or_else(|| anyhow!("No prim spec for <{prim_path}>"))?
            .variant_sets
            .entry(set_name)
            .or_default();

        Ok(())
    }
}
