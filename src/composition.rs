//! Layer composition.
//!
//! Composition merges a base layer and an ordered list of overlay layers into
//! one effective layer. Strength follows list order: the base is weakest, each
//! later overlay is stronger than the ones before it.
//!
//! Every input is first flattened on its own: the selected variant of each
//! variant set is baked into the prim tree *under* the prim's local opinions
//! (in LIVRPS order, **L**ocal beats **V**ariantSets). The flattened trees are
//! then folded weakest to strongest, attribute by attribute. Because each
//! input is flattened before the fold, `compose([A, B, C])` and
//! `compose([A, compose([B, C])])` give the same result.

use rayon::prelude::*;
use tracing::debug;

use crate::layer::{Layer, LayerId, Overlay, SpecTree};
use crate::sdf::Path;

/// The result of composing layers.
#[derive(Debug, Clone)]
pub struct ComposedLayer {
    /// The effective layer, registered under the output identifier.
    pub layer: Layer,
    /// Identifiers of the inputs, weakest first.
    pub composed_layers: Vec<LayerId>,
}

/// Compose `base` with `overlays` (weakest first) into a new layer named `output`.
///
/// Inputs are not modified.
pub fn compose(base: &Layer, overlays: &[&Layer], output: LayerId) -> ComposedLayer {
    let inputs: Vec<&Layer> = std::iter::once(base).chain(overlays.iter().copied()).collect();

    // Flattening is independent per layer; only the fold is ordered.
    let flattened: Vec<SpecTree> = inputs.par_iter().map(|layer| flatten_tree(layer.tree())).collect();

    let mut trees = flattened.into_iter();
    let mut composed = trees.next().unwrap_or_else(|| SpecTree::new(Path::abs_root()));
    for stronger in trees {
        merge_tree(&mut composed, &stronger);
    }

    let composed_layers: Vec<LayerId> = inputs.iter().map(|layer| layer.identifier().clone()).collect();
    debug!(output = %output, inputs = composed_layers.len(), prims = composed.len() - 1, "composed layers");

    let mut layer = Layer::from_tree(output, composed);
    layer.mark_dirty();

    ComposedLayer { layer, composed_layers }
}

/// Bake the selected variants of `layer` into a new layer named `output`.
pub fn flatten(layer: &Layer, output: LayerId) -> Layer {
    let mut flattened = Layer::from_tree(output, flatten_tree(layer.tree()));
    flattened.mark_dirty();
    flattened
}

/// Apply every selected variant overlay beneath local opinions, then drop the
/// variant sets.
fn flatten_tree(tree: &SpecTree) -> SpecTree {
    let mut out = tree.clone();

    for path in tree.walk() {
        let Some(spec) = tree.get(&path) else {
            continue;
        };
        // Variant sets are visited in name order; an earlier set's opinion
        // wins over a later one's.
        for set in spec.variant_sets.values() {
            if let Some(overlay) = set.selected_overlay() {
                apply_overlay(&mut out, overlay);
            }
        }
    }

    for (_, spec) in out.iter_mut() {
        spec.variant_sets.clear();
    }
    out
}

/// Merge overlay opinions as weaker than whatever `out` already holds.
fn apply_overlay(out: &mut SpecTree, overlay: &Overlay) {
    for path in overlay.paths() {
        let Some(opinion) = overlay.get(&path) else {
            continue;
        };
        let Some(spec) = out.ensure(&path) else {
            continue;
        };

        if spec.type_name.is_empty() {
            spec.type_name.clone_from(&opinion.type_name);
        }
        for (name, value) in &opinion.attributes {
            spec.attributes
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// Fold `stronger` over `composed`.
///
/// Prims present only in `stronger` are added, attributes are replaced by
/// name, and a non-empty type tag replaces the weaker one. Children lists are
/// unioned in first-seen order.
fn merge_tree(composed: &mut SpecTree, stronger: &SpecTree) {
    for path in stronger.walk() {
        let Some(opinion) = stronger.get(&path) else {
            continue;
        };
        let Some(spec) = composed.ensure(&path) else {
            continue;
        };

        if !opinion.type_name.is_empty() {
            spec.type_name.clone_from(&opinion.type_name);
        }
        for (name, value) in &opinion.attributes {
            spec.attributes.insert(name.clone(), value.clone());
        }
    }
}
