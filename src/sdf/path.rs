//! Absolute prim paths.

use std::fmt;

use crate::error::{Error, Result};

/// An absolute, slash-delimited prim path such as `/World/Geom/Mesh`.
///
/// Parent/child relations are derived from the path text, so prims never hold
/// references to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(String);

impl Default for Path {
    fn default() -> Self {
        Self::abs_root()
    }
}

impl Path {
    /// The pseudo-root path `/`.
    pub fn abs_root() -> Self {
        Path("/".to_owned())
    }

    /// Parse and validate an absolute prim path.
    pub fn new(path: &str) -> Result<Self> {
        if path == "/" {
            return Ok(Self::abs_root());
        }

        let Some(rest) = path.strip_prefix('/') else {
            return Err(Error::invalid_path(path, "prim paths must be absolute"));
        };

        for name in rest.split('/') {
            if !is_identifier(name) {
                return Err(Error::invalid_path(path, format!("'{name}' is not a valid prim name")));
            }
        }

        Ok(Path(path.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_abs_root(&self) -> bool {
        self.0 == "/"
    }

    /// Append a child prim name.
    pub fn append_path(&self, name: &str) -> Result<Self> {
        if !is_identifier(name) {
            return Err(Error::invalid_path(
                format!("{}/{}", self.0.trim_end_matches('/'), name),
                format!("'{name}' is not a valid prim name"),
            ));
        }

        let mut joined = String::with_capacity(self.0.len() + name.len() + 1);
        if !self.is_abs_root() {
            joined.push_str(&self.0);
        }
        joined.push('/');
        joined.push_str(name);
        Ok(Path(joined))
    }

    /// Last path component, or `None` for the pseudo-root.
    pub fn name(&self) -> Option<&str> {
        if self.is_abs_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Parent path, or `None` for the pseudo-root.
    pub fn parent(&self) -> Option<Path> {
        if self.is_abs_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::abs_root()),
            Some(idx) => Some(Path(self.0[..idx].to_owned())),
        }
    }

    /// Ancestors from the nearest parent up to and including the pseudo-root.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> {
        std::iter::successors(self.parent(), |p| p.parent())
    }

    /// Number of components; the pseudo-root has depth 0.
    pub fn depth(&self) -> usize {
        if self.is_abs_root() {
            0
        } else {
            self.0.matches('/').count()
        }
    }

    /// True if `self` is `other` or lies beneath it.
    pub fn has_prefix(&self, other: &Path) -> bool {
        if other.is_abs_root() || self == other {
            return true;
        }
        self.0
            .strip_prefix(other.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Path {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Path {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Path::new(value)
    }
}

/// Shorthand for [`Path::new`].
pub fn path(path: &str) -> Result<Path> {
    Path::new(path)
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Attribute names are identifiers optionally namespaced with `:`.
pub fn is_property_name(name: &str) -> bool {
    !name.is_empty() && name.split(':').all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_navigate() {
        let p = path("/World/Geom/Mesh").unwrap();
        assert_eq!(p.name(), Some("Mesh"));
        assert_eq!(p.parent().unwrap().as_str(), "/World/Geom");
        assert_eq!(p.depth(), 3);

        let ancestors: Vec<_> = p.ancestors().map(|a| a.to_string()).collect();
        assert_eq!(ancestors, vec!["/World/Geom", "/World", "/"]);
    }

    #[test]
    fn root_has_no_parent() {
        let root = Path::abs_root();
        assert!(root.parent().is_none());
        assert!(root.name().is_none());
        assert_eq!(root.depth(), 0);
        assert_eq!(path("/World").unwrap().parent(), Some(root));
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", "World", "/World/", "//World", "/World/1abc", "/Wo rld", "/a.b"] {
            let err = Path::new(bad).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidPath, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn append_child() {
        let root = Path::abs_root();
        let world = root.append_path("World").unwrap();
        assert_eq!(world.as_str(), "/World");
        assert_eq!(world.append_path("Cube").unwrap().as_str(), "/World/Cube");
        assert!(world.append_path("bad/name").is_err());
    }

    #[test]
    fn prefix_matching_respects_component_boundaries() {
        let a = path("/World/Geo").unwrap();
        assert!(path("/World/Geo/Mesh").unwrap().has_prefix(&a));
        assert!(a.has_prefix(&a));
        assert!(!path("/World/Geometry").unwrap().has_prefix(&a));
        assert!(a.has_prefix(&Path::abs_root()));
    }

    #[test]
    fn property_names_allow_namespaces() {
        assert!(is_property_name("xformOp:translate"));
        assert!(is_property_name("size"));
        assert!(!is_property_name("xformOp:"));
        assert!(!is_property_name(""));
    }
}
