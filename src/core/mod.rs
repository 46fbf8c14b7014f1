mod cst;
mod docstring;
mod engine;
mod model;
mod scanner;
mod source;
mod walker;

pub use cst::{CstNode, NodeId, NodeKind, Symbol, SyntaxTree, TokenKind, TreeBuilder};
pub use docstring::DocstringExtractor;
pub use model::{
    Argument, ArgumentKind, Class, Data, Decorator, Expr, Function, Location, Member, Module,
};
pub use scanner::Cursor;
pub use source::{node_text, span_text};
pub use walker::Walker;

// Export the main engine
pub use engine::{Engine, ExtractedFile};
