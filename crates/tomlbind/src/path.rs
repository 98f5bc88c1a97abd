//! # Path Addressing
//!
//! A [`FieldPath`] is an ordered sequence of table keys naming one location
//! in both a model and its TOML document. [`resolve`] reads at a path and
//! never fails; [`assign`] writes at a path and refuses to invent structure:
//!
//! - an intermediate key that does not exist is [`PathError::MissingKey`];
//! - an intermediate value that is not a table (a scalar, an array, an array
//!   of tables) is [`PathError::NotAContainer`], and is left untouched.
//!
//! Both work on any tree implementing [`Node`]/[`NodeMut`]: `toml_edit::Item`
//! (standard and inline tables) and `serde_json::Value` (objects).

use std::fmt;
use std::ops::Deref;

use thiserror::Error;
use toml_edit::Item;

/// An ordered sequence of keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Build a path from a key sequence.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// The empty path (the root).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Split a dotted location such as `"project.name"` into keys.
    ///
    /// Keys that themselves contain dots need [`FieldPath::new`].
    pub fn dotted(location: &str) -> Self {
        Self(location.split('.').map(str::to_string).collect())
    }

    /// The keys of this path.
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// This path extended by one key.
    pub fn join(&self, key: impl Into<String>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for FieldPath {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for FieldPath {
    fn from(key: &str) -> Self {
        Self(vec![key.to_string()])
    }
}

impl From<String> for FieldPath {
    fn from(key: String) -> Self {
        Self(vec![key])
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<Vec<&str>> for FieldPath {
    fn from(keys: Vec<&str>) -> Self {
        Self::new(keys)
    }
}

impl From<&[&str]> for FieldPath {
    fn from(keys: &[&str]) -> Self {
        Self::new(keys.iter().copied())
    }
}

impl From<&[String]> for FieldPath {
    fn from(keys: &[String]) -> Self {
        Self(keys.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(keys: [&str; N]) -> Self {
        Self::new(keys)
    }
}

impl From<&FieldPath> for FieldPath {
    fn from(path: &FieldPath) -> Self {
        path.clone()
    }
}

/// Failure to assign at a path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path has no keys.
    #[error("cannot assign at an empty path")]
    Empty,

    /// An intermediate key does not exist.
    #[error("key '{at}' does not exist")]
    MissingKey {
        /// The path up to and including the missing key.
        at: FieldPath,
    },

    /// An intermediate value is not a table.
    #[error("attempting to set a field inside a non-table at '{at}'")]
    NotAContainer {
        /// The path of the non-table value (empty for the root).
        at: FieldPath,
    },
}

/// A tree whose table-like nodes can be read by key.
pub trait Node {
    /// The child at `key`, if this node is table-like and has it.
    fn child(&self, key: &str) -> Option<&Self>;
}

/// A tree whose table-like nodes can be written by key.
pub trait NodeMut: Node + Sized {
    /// Whether this node is table-like.
    fn is_container(&self) -> bool;

    /// The child at `key`, mutably.
    fn child_mut(&mut self, key: &str) -> Option<&mut Self>;

    /// Insert or replace the child at `key`. Only called on containers.
    fn put(&mut self, key: &str, value: Self);
}

impl Node for Item {
    fn child(&self, key: &str) -> Option<&Self> {
        self.as_table_like()?.get(key).filter(|item| !item.is_none())
    }
}

impl NodeMut for Item {
    fn is_container(&self) -> bool {
        self.is_table_like()
    }

    fn child_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.as_table_like_mut()?
            .get_mut(key)
            .filter(|item| !item.is_none())
    }

    fn put(&mut self, key: &str, value: Self) {
        let Some(table) = self.as_table_like_mut() else {
            return;
        };
        match table.get_mut(key) {
            Some(slot) => replace_item(slot, value),
            None => {
                table.insert(key, value);
            }
        }
    }
}

impl Node for serde_json::Value {
    fn child(&self, key: &str) -> Option<&Self> {
        self.as_object()?.get(key)
    }
}

impl NodeMut for serde_json::Value {
    fn is_container(&self) -> bool {
        self.is_object()
    }

    fn child_mut(&mut self, key: &str) -> Option<&mut Self> {
        self.as_object_mut()?.get_mut(key)
    }

    fn put(&mut self, key: &str, value: Self) {
        if let Some(map) = self.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }
}

/// Replace `slot` with `value`, keeping the old value's decor (surrounding
/// whitespace and trailing comment) when both are plain values.
pub(crate) fn replace_item(slot: &mut Item, mut value: Item) {
    if let (Item::Value(old), Item::Value(new)) = (&*slot, &mut value) {
        *new.decor_mut() = old.decor().clone();
    }
    *slot = value;
}

/// The node at `path`, or `None` if any key along it is absent.
pub fn resolve<'a, N: Node>(root: &'a N, path: impl Into<FieldPath>) -> Option<&'a N> {
    let path: FieldPath = path.into();
    path.iter().try_fold(root, |node, key| node.child(key))
}

/// The node at `path`, or `default` if any key along it is absent.
pub fn resolve_or<'a, N: Node>(root: &'a N, path: impl Into<FieldPath>, default: &'a N) -> &'a N {
    resolve(root, path).unwrap_or(default)
}

/// Write `value` at `path`.
///
/// The terminal key is inserted if its parent exists; nothing else is
/// created.
///
/// # Errors
///
/// Returns [`PathError::NotAContainer`] if the root or an intermediate node
/// is not table-like, [`PathError::MissingKey`] if an intermediate key is
/// absent, and [`PathError::Empty`] for the empty path.
pub fn assign<N: NodeMut>(root: &mut N, path: impl Into<FieldPath>, value: N) -> Result<(), PathError> {
    let path: FieldPath = path.into();
    let Some((last, parents)) = path.split_last() else {
        return Err(PathError::Empty);
    };

    let mut node = root;
    for (depth, key) in parents.iter().enumerate() {
        if !node.is_container() {
            return Err(PathError::NotAContainer {
                at: FieldPath::from(&parents[..depth]),
            });
        }
        node = match node.child_mut(key) {
            Some(child) => child,
            None => {
                return Err(PathError::MissingKey {
                    at: FieldPath::from(&parents[..=depth]),
                })
            }
        };
    }

    if !node.is_container() {
        return Err(PathError::NotAContainer {
            at: FieldPath::from(parents),
        });
    }
    node.put(last, value);
    Ok(())
}
