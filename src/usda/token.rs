use logos::Logos;

/// Lexical tokens of the `.usda` text format.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token<'a> {
    #[regex(r"#usda[ \t]+[^\n]*", |lex| lex.slice()[5..].trim(), priority = 10)]
    Magic(&'a str),

    #[regex(r"#[^\n]*", logos::skip, priority = 1)]
    Comment,

    #[token("def")]
    Def,
    #[token("over")]
    Over,
    #[token("class")]
    Class,
    #[token("custom")]
    Custom,
    #[token("uniform")]
    Uniform,
    #[token("prepend")]
    Prepend,
    #[token("variantSet")]
    VariantSet,
    #[token("variantSets")]
    VariantSets,
    #[token("variants")]
    Variants,

    #[regex(r"[(){}\[\]=,;:\-]", |lex| lex.slice().chars().next())]
    Punctuation(char),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\[\])?")]
    Identifier(&'a str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(:[A-Za-z_][A-Za-z0-9_]*)+")]
    NamespacedIdentifier(&'a str),

    #[regex(r"[-+]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][-+]?[0-9]+)?")]
    Number(&'a str),

    /// Quoted string with escapes left in place.
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    String(&'a str),
}

impl<'a> Token<'a> {
    pub fn try_as_magic(self) -> Option<&'a str> {
        match self {
            Token::Magic(version) => Some(version),
            _ => None,
        }
    }

    pub fn try_as_string(self) -> Option<&'a str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    /// Identifier-shaped token in a name position. Keywords come back as their lexeme.
    pub fn try_as_name(self) -> Option<&'a str> {
        match self {
            Token::Identifier(s) | Token::NamespacedIdentifier(s) => Some(s),
            Token::Def => Some("def"),
            Token::Over => Some("over"),
            Token::Class => Some("class"),
            Token::Custom => Some("custom"),
            Token::Uniform => Some("uniform"),
            Token::Prepend => Some("prepend"),
            Token::VariantSet => Some("variantSet"),
            Token::VariantSets => Some("variantSets"),
            Token::Variants => Some("variants"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token<'_>> {
        Token::lexer(source).collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn header_and_comments() {
        let tokens = lex("#usda 1.0\n# a comment\ndef Xform \"Root\" {}");
        assert_eq!(
            tokens,
            vec![
                Token::Magic("1.0"),
                Token::Def,
                Token::Identifier("Xform"),
                Token::String("Root"),
                Token::Punctuation('{'),
                Token::Punctuation('}'),
            ]
        );
    }

    #[test]
    fn attribute_declarations() {
        let tokens = lex("float3[] xformOp:translate = [(1, -2.5, 3e2)]");
        assert_eq!(
            &tokens[..3],
            &[
                Token::Identifier("float3[]"),
                Token::NamespacedIdentifier("xformOp:translate"),
                Token::Punctuation('='),
            ]
        );
        assert!(tokens.contains(&Token::Number("-2.5")));
        assert!(tokens.contains(&Token::Number("3e2")));
    }

    #[test]
    fn keywords_do_not_swallow_identifiers() {
        assert_eq!(lex("define"), vec![Token::Identifier("define")]);
        assert_eq!(lex("variantSets"), vec![Token::VariantSets]);
        assert_eq!(lex("-inf"), vec![Token::Punctuation('-'), Token::Identifier("inf")]);
    }

    #[test]
    fn keywords_read_back_as_names() {
        let names = lex("over custom variants def xformOp:over")
            .into_iter()
            .map(Token::try_as_name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![Some("over"), Some("custom"), Some("variants"), Some("def"), Some("xformOp:over")]
        );
        assert_eq!(Token::String("over").try_as_name(), None);
        assert_eq!(Token::Punctuation('=').try_as_name(), None);
    }

    #[test]
    fn strings_keep_escapes() {
        assert_eq!(lex(r#""say \"hi\"""#), vec![Token::String(r#"say \"hi\""#)]);
    }
}
