use serde::{Deserialize, Serialize};

/// Grammar-production tags for interior nodes.
///
/// This is the closed set the external grammar parser is required to emit;
/// anything the walker does not recognize falls through dispatch and
/// produces no documentation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    FileInput,
    SimpleStmt,
    ExprStmt,
    AnnAssign,
    ImportName,
    ImportFrom,
    FuncDef,
    ClassDef,
    AsyncStmt,
    AsyncFuncDef,
    Decorated,
    Decorators,
    Decorator,
    Parameters,
    TypedArgsList,
    Tname,
    ArgList,
    Argument,
    Suite,
    DottedName,
    // Generic expression productions; the walker treats these purely as
    // text to be reconstructed.
    Atom,
    Power,
    Trailer,
    Term,
    ArithExpr,
    Comparison,
    Testlist,
    ExprList,
}

/// Leaf-token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Name,
    Number,
    String,
    Star,
    DoubleStar,
    Comma,
    Colon,
    Equal,
    RArrow,
    At,
    Dot,
    LPar,
    RPar,
    LSqb,
    RSqb,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

/// Kind of a tree node: an interior grammar production or a leaf token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Symbol(Symbol),
    Token(TokenKind),
}

/// The nested exchange form the external grammar parser emits.
///
/// Leaves carry their literal text and the trivia (whitespace and
/// comments) that precedes them in the source, so any slice of the tree
/// reconstructs its original text exactly. Two shape guarantees are part
/// of the contract: class base lists always arrive wrapped in an
/// [`Symbol::ArgList`] production (even a single base), and parameter
/// lists may collapse to a degenerate single-name form with no
/// [`Symbol::TypedArgsList`] inside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CstNode {
    Node {
        kind: Symbol,
        children: Vec<CstNode>,
    },
    Leaf {
        token: TokenKind,
        prefix: String,
        value: String,
    },
}

/// Index of a node within its [`SyntaxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    /// Trivia preceding the token; empty for interior nodes.
    prefix: String,
    /// Literal token text; empty for interior nodes.
    value: String,
    /// Line of the node's first token, assigned at build time.
    line: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed syntax tree with parent/sibling navigation.
///
/// Parent links are arena indices, never owning pointers; the tree is
/// owned top-down by the arena itself. The tree is read-only after
/// construction.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

/// Bottom-up tree construction.
///
/// Children are created before their parent and handed over by id;
/// [`TreeBuilder::finish`] wires parent links and assigns line numbers by
/// scanning leaves in source order. A token's line is the line its literal
/// starts on, after any newlines inside its preceding trivia.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, token: TokenKind, prefix: &str, value: &str) -> NodeId {
        self.push(NodeData {
            kind: NodeKind::Token(token),
            prefix: prefix.to_string(),
            value: value.to_string(),
            line: 0,
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn node(&mut self, symbol: Symbol, children: Vec<NodeId>) -> NodeId {
        self.push(NodeData {
            kind: NodeKind::Symbol(symbol),
            prefix: String::new(),
            value: String::new(),
            line: 0,
            parent: None,
            children,
        })
    }

    pub fn finish(mut self, root: NodeId) -> SyntaxTree {
        assign_parents(&mut self.nodes, root);
        let mut line = 1;
        assign_lines(&mut self.nodes, root, &mut line);
        SyntaxTree {
            nodes: self.nodes,
            root,
        }
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }
}

fn assign_parents(nodes: &mut [NodeData], id: NodeId) {
    let children = nodes[id.0 as usize].children.clone();
    for child in children {
        nodes[child.0 as usize].parent = Some(id);
        assign_parents(nodes, child);
    }
}

/// Returns the line of the first token at or under `id`.
fn assign_lines(nodes: &mut [NodeData], id: NodeId, line: &mut u32) -> u32 {
    let idx = id.0 as usize;
    if let NodeKind::Token(_) = nodes[idx].kind {
        *line += count_newlines(&nodes[idx].prefix);
        nodes[idx].line = *line;
        let at = *line;
        *line += count_newlines(&nodes[idx].value);
        return at;
    }
    let children = nodes[idx].children.clone();
    let mut first = None;
    for child in children {
        let child_line = assign_lines(nodes, child, line);
        first.get_or_insert(child_line);
    }
    nodes[idx].line = first.unwrap_or(*line);
    nodes[idx].line
}

fn count_newlines(text: &str) -> u32 {
    text.bytes().filter(|&b| b == b'\n').count() as u32
}

impl SyntaxTree {
    /// Builds a tree from the parser's nested exchange form.
    pub fn from_cst(root: CstNode) -> Self {
        let mut builder = TreeBuilder::new();
        let root_id = insert(&mut builder, root);
        builder.finish(root_id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind
    }

    /// Production tag, or `None` for a leaf.
    pub fn symbol(&self, id: NodeId) -> Option<Symbol> {
        match self.data(id).kind {
            NodeKind::Symbol(symbol) => Some(symbol),
            NodeKind::Token(_) => None,
        }
    }

    /// Token kind, or `None` for an interior node.
    pub fn token(&self, id: NodeId) -> Option<TokenKind> {
        match self.data(id).kind {
            NodeKind::Token(token) => Some(token),
            NodeKind::Symbol(_) => None,
        }
    }

    pub fn is_interior(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Symbol(_))
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        !self.is_interior(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Literal token text; empty for interior nodes.
    pub fn value(&self, id: NodeId) -> &str {
        &self.data(id).value
    }

    /// The node's own stored trivia; empty for interior nodes.
    pub fn own_prefix(&self, id: NodeId) -> &str {
        &self.data(id).prefix
    }

    /// The trivia preceding the node's first token, descending through
    /// interior nodes.
    pub fn prefix(&self, id: NodeId) -> &str {
        let mut current = id;
        while self.is_interior(current) {
            match self.children(current).first() {
                Some(&first) => current = first,
                None => return "",
            }
        }
        self.own_prefix(current)
    }

    /// Line of the node's first token.
    pub fn line(&self, id: NodeId) -> u32 {
        self.data(id).line
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }
}

fn insert(builder: &mut TreeBuilder, node: CstNode) -> NodeId {
    match node {
        CstNode::Leaf {
            token,
            prefix,
            value,
        } => builder.leaf(token, &prefix, &value),
        CstNode::Node { kind, children } => {
            let child_ids = children
                .into_iter()
                .map(|child| insert(builder, child))
                .collect();
            builder.node(kind, child_ids)
        }
    }
}
