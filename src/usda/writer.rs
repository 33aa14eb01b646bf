//! `.usda` text writer.
//!
//! Output is deterministic: children keep authoring order, attributes,
//! variant sets and variants are written sorted by name.

use std::fmt::Write;

use crate::layer::{Overlay, PrimSpec, SpecTree};
use crate::sdf::{Path, Value};

const INDENT: &str = "    ";

/// Serialize a layer's prim tree.
pub fn write_tree(tree: &SpecTree) -> String {
    let mut out = String::from("#usda 1.0\n");
    let root = tree.root().clone();

    if let Some(spec) = tree.get(&root) {
        for name in &spec.children {
            if let Ok(child) = root.append_path(name) {
                out.push('\n');
                write_prim(&mut out, tree, &child, "def", 0);
            }
        }
    }
    out
}

fn write_prim(out: &mut String, tree: &SpecTree, path: &Path, specifier: &str, depth: usize) {
    let Some(spec) = tree.get(path) else {
        return;
    };
    let pad = INDENT.repeat(depth);
    let name = path.name().unwrap_or_default();

    let _ = write!(out, "{pad}{specifier} ");
    if !spec.type_name.is_empty() {
        let _ = write!(out, "{} ", spec.type_name);
    }
    let _ = write!(out, "\"{}\"", escape(name));

    if !spec.variant_sets.is_empty() {
        write_variant_metadata(out, spec, depth);
    }
    let _ = writeln!(out, "\n{pad}{{");

    write_body(out, tree, path, spec, depth + 1, specifier);

    let _ = writeln!(out, "{pad}}}");
}

/// Attributes, then child prims, then variant sets.
fn write_body(out: &mut String, tree: &SpecTree, path: &Path, spec: &PrimSpec, depth: usize, child_specifier: &str) {
    let pad = INDENT.repeat(depth);

    for (name, value) in &spec.attributes {
        let _ = writeln!(out, "{pad}{} {name} = {}", value.kind().usda_type(), format_value(value));
    }

    for child_name in &spec.children {
        if let Ok(child) = path.append_path(child_name) {
            out.push('\n');
            write_prim(out, tree, &child, child_specifier, depth);
        }
    }

    for (set_name, set) in &spec.variant_sets {
        out.push('\n');
        let _ = writeln!(out, "{pad}variantSet \"{}\" = {{", escape(set_name));
        for variant_name in set.variant_names() {
            if let Some(overlay) = set.overlay(&variant_name) {
                write_variant(out, overlay, &variant_name, depth + 1);
            }
        }
        let _ = writeln!(out, "{pad}}}");
    }
}

fn write_variant_metadata(out: &mut String, spec: &PrimSpec, depth: usize) {
    let pad = INDENT.repeat(depth);
    let inner = INDENT.repeat(depth + 1);

    let _ = writeln!(out, " (");

    let selections: Vec<_> = spec
        .variant_sets
        .iter()
        .filter_map(|(name, set)| set.selection().map(|sel| (name, sel)))
        .collect();
    if !selections.is_empty() {
        let _ = writeln!(out, "{inner}variants = {{");
        for (name, selection) in selections {
            let _ = writeln!(out, "{inner}{INDENT}string {name} = \"{}\"", escape(selection));
        }
        let _ = writeln!(out, "{inner}}}");
    }

    let names: Vec<String> = spec
        .variant_sets
        .keys()
        .map(|name| format!("\"{}\"", escape(name)))
        .collect();
    let _ = writeln!(out, "{inner}prepend variantSets = [{}]", names.join(", "));
    let _ = write!(out, "{pad})");
}

fn write_variant(out: &mut String, overlay: &Overlay, name: &str, depth: usize) {
    let pad = INDENT.repeat(depth);
    let owner = overlay.owner();

    let _ = write!(out, "{pad}\"{}\"", escape(name));
    let Some(spec) = overlay.get(owner) else {
        let _ = writeln!(out, " {{\n{pad}}}");
        return;
    };

    if !spec.type_name.is_empty() {
        let _ = write!(out, " (\n{pad}{INDENT}typeName = \"{}\"\n{pad})", escape(&spec.type_name));
    }
    let _ = writeln!(out, " {{");

    write_body(out, overlay.tree(), owner, spec, depth + 1, "over");

    let _ = writeln!(out, "{pad}}}");
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", escape(s)),
        Value::Int(v) => v.to_string(),
        Value::Float(v) => format_f64(*v),
        Value::IntArray(items) => {
            let items: Vec<_> = items.iter().map(i64::to_string).collect();
            format!("[{}]", items.join(", "))
        }
        Value::FloatArray(items) => {
            let items: Vec<_> = items.iter().copied().map(format_f64).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Vec3fArray(items) => {
            let items: Vec<_> = items
                .iter()
                .map(|[x, y, z]| format!("({}, {}, {})", format_f32(*x), format_f32(*y), format_f32(*z)))
                .collect();
            format!("[{}]", items.join(", "))
        }
    }
}

/// Shortest text that parses back to the same bits.
fn format_f64(v: f64) -> String {
    if v.is_nan() {
        "nan".to_owned()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else {
        format!("{v:?}")
    }
}

fn format_f32(v: f32) -> String {
    if v.is_finite() {
        format!("{v:?}")
    } else {
        format_f64(f64::from(v))
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
