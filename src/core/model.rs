use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Source position of a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File the declaration was extracted from
    pub file: PathBuf,

    /// Line of the declaration's first token
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Opaque reconstructed source text; never re-parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expr {
    pub text: String,
}

impl Expr {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A single decorator applied to a function or class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decorator {
    /// Dotted decorator name, without the `@`
    pub name: String,

    /// Parenthesized call text, if the decorator was invoked
    pub args: Option<Expr>,
}

/// How a parameter may be supplied at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArgumentKind {
    Positional,
    PositionalRemainder,
    KeywordOnly,
    KeywordRemainder,
}

/// One parameter of a function signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Parameter name, without any star markers
    pub name: String,

    /// Annotation expression, if present
    pub annotation: Option<Expr>,

    /// Default expression, if present
    pub default: Option<Expr>,

    /// Call-site kind
    pub kind: ArgumentKind,
}

/// One source file's documentation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub location: Location,

    /// Dotted path of the enclosing scope; diagnostics only
    pub parent: Option<String>,

    pub name: String,

    /// Normalized docstring text
    pub docstring: Option<String>,

    /// Child declarations in source order
    pub members: Vec<Member>,
}

/// A class declaration with bases, metaclass and members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub location: Location,

    /// Dotted path of the enclosing scope; diagnostics only
    pub parent: Option<String>,

    pub name: String,

    pub docstring: Option<String>,

    /// Base-class expressions in declaration order
    pub bases: Vec<Expr>,

    /// Metaclass from a `metaclass=` keyword or an implicit
    /// `__metaclass__` assignment
    pub metaclass: Option<Expr>,

    pub decorators: Vec<Decorator>,

    /// Child declarations in source order
    pub members: Vec<Member>,
}

/// A function or method declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub location: Location,

    /// Dotted path of the enclosing scope; diagnostics only
    pub parent: Option<String>,

    pub name: String,

    pub docstring: Option<String>,

    pub is_async: bool,

    pub decorators: Vec<Decorator>,

    /// Parameters in declaration order
    pub args: Vec<Argument>,

    /// Return-type expression after the arrow, if present
    pub return_type: Option<Expr>,
}

/// A documented assignment at module or class level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub location: Location,

    /// Dotted path of the enclosing scope; diagnostics only
    pub parent: Option<String>,

    pub name: String,

    pub docstring: Option<String>,

    /// Reconstructed right-hand-side text
    pub expr: Option<Expr>,
}

/// A declaration in a module or class body.
///
/// The `Module` variant never results from a single-file walk; it exists
/// so downstream consumers can assemble packages out of extracted
/// modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    Module(Module),
    Class(Class),
    Function(Function),
    Data(Data),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Module(m) => &m.name,
            Member::Class(c) => &c.name,
            Member::Function(f) => &f.name,
            Member::Data(d) => &d.name,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Member::Module(m) => &m.location,
            Member::Class(c) => &c.location,
            Member::Function(f) => &f.location,
            Member::Data(d) => &d.location,
        }
    }
}
