mod error;
mod hierarchy;
mod metadata;
mod token_ops;
mod value;

use logos::Logos;
use std::iter::Peekable;
use std::ops::Range;

use crate::usda::token::Token;

pub use error::ErrorHighlight;

/// Parser translates a list of tokens into a prim tree.
pub struct Parser<'a> {
    iter: Peekable<logos::SpannedIter<'a, Token<'a>>>,
    source: &'a str,
    last_span: Option<Range<usize>>,
}

impl<'a> Parser<'a> {
    /// Create a new parser from source text.
    pub fn new(data: &'a str) -> Self {
        Self {
            iter: Token::lexer(data).spanned().peekable(),
            source: data,
            last_span: None,
        }
    }

    /// Returns a highlight for the most recent token span processed by the parser.
    pub fn last_error_highlight(&self) -> Option<ErrorHighlight> {
        self.last_span
            .clone()
            .and_then(|span| ErrorHighlight::from_span(self.source, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::{self, Value};

    const SAMPLE: &str = r#"#usda 1.0

def Xform "Root" (
    variants = {
        string look = "red"
    }
    prepend variantSets = ["look", "size"]
)
{
    string label = "say \"hi\""
    int64 size = 5
    double scale = -1.5
    int64[] indices = [0, 1, 2]
    double[] weights = []
    float3[] points = [(0, 0, 0), (1, 2.5, -3)]

    def Mesh "Child"
    {
    }

    def "Untyped"
    {
    }

    variantSet "look" = {
        "blue" {
        }
        "red" (
            typeName = "Mesh"
        ) {
            string label = "red"

            over "Child"
            {
                double gloss = 0.5
            }
        }
    }
}
"#;

    #[test]
    fn parse_layer() {
        let tree = Parser::new(SAMPLE).parse().unwrap();
        let root = sdf::path("/Root").unwrap();
        let spec = tree.get(&root).unwrap();

        assert_eq!(spec.type_name, "Xform");
        assert_eq!(spec.children, vec!["Child", "Untyped"]);
        assert_eq!(spec.attributes.get("label"), Some(&Value::from("say \"hi\"")));
        assert_eq!(spec.attributes.get("size"), Some(&Value::Int(5)));
        assert_eq!(spec.attributes.get("scale"), Some(&Value::Float(-1.5)));
        assert_eq!(spec.attributes.get("indices"), Some(&Value::IntArray(vec![0, 1, 2])));
        assert_eq!(spec.attributes.get("weights"), Some(&Value::FloatArray(vec![])));
        assert_eq!(
            spec.attributes.get("points"),
            Some(&Value::Vec3fArray(vec![[0.0, 0.0, 0.0], [1.0, 2.5, -3.0]]))
        );

        assert_eq!(tree.get(&sdf::path("/Root/Untyped").unwrap()).unwrap().type_name, "");
    }

    #[test]
    fn parse_variant_sets() {
        let tree = Parser::new(SAMPLE).parse().unwrap();
        let root = sdf::path("/Root").unwrap();
        let spec = tree.get(&root).unwrap();

        let look = spec.variant_sets.get("look").unwrap();
        assert_eq!(look.selection(), Some("red"));
        assert_eq!(look.variant_names(), vec!["blue", "red"]);

        let red = look.overlay("red").unwrap();
        assert_eq!(red.get(&root).unwrap().type_name, "Mesh");
        assert_eq!(red.get(&root).unwrap().attributes.get("label"), Some(&Value::from("red")));
        let child = red.get(&sdf::path("/Root/Child").unwrap()).unwrap();
        assert_eq!(child.attributes.get("gloss"), Some(&Value::Float(0.5)));
        assert!(look.overlay("blue").unwrap().is_empty());

        let size = spec.variant_sets.get("size").unwrap();
        assert!(size.variant_names().is_empty());
        assert_eq!(size.selection(), None);
    }

    #[test]
    fn parse_empty_layer() {
        let tree = Parser::new("#usda 1.0\n").parse().unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn parse_special_floats() {
        let tree = Parser::new("#usda 1.0\ndef \"A\" {\n double[] v = [inf, -inf, nan, 1e-7]\n}\n")
            .parse()
            .unwrap();
        let v = tree
            .get(&sdf::path("/A").unwrap())
            .and_then(|s| s.attributes.get("v"))
            .cloned();
        let Some(Value::FloatArray(v)) = v else {
            panic!("expected float array, got {v:?}");
        };
        assert_eq!(v[0], f64::INFINITY);
        assert_eq!(v[1], f64::NEG_INFINITY);
        assert!(v[2].is_nan());
        assert_eq!(v[3], 1e-7);
    }

    #[test]
    fn reject_missing_magic() {
        assert!(Parser::new("def \"A\" {}").parse().is_err());
        assert!(Parser::new("#usda 2.0\n").parse().is_err());
    }

    #[test]
    fn reject_vec3_with_two_components() {
        let mut parser = Parser::new("#usda 1.0\ndef \"A\" {\n    float3[] p = [(1, 2)]\n}\n");
        let err = parser.parse().unwrap_err();
        assert!(format!("{err:#}").contains("points"), "{err:#}");

        let highlight = parser.last_error_highlight().unwrap();
        assert_eq!(highlight.line, 3);
    }

    #[test]
    fn reject_unknown_type() {
        let err = Parser::new("#usda 1.0\ndef \"A\" {\n    matrix4d m = 1\n}\n")
            .parse()
            .unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported data type"), "{err:#}");
    }
}
