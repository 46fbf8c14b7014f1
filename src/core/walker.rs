use std::path::PathBuf;

use tracing::debug;

use super::cst::{NodeId, Symbol, SyntaxTree, TokenKind};
use super::docstring::DocstringExtractor;
use super::model::{
    Argument, ArgumentKind, Class, Data, Decorator, Expr, Function, Location, Member, Module,
};
use super::scanner::Cursor;
use super::source::{node_text, span_text};
use crate::error::{DocsmithError, Result};

/// Reserved attribute that declares a metaclass from inside a class body.
const METACLASS_ATTR: &str = "__metaclass__";

/// Recursive-descent walk from a syntax tree to the documentation model.
///
/// One walker handles one source file; independent files get independent
/// walkers. The walk is pure and synchronous: it either runs to
/// completion or aborts with a structural error naming the offending
/// location. Recognized-but-unhandled constructs (imports, async
/// non-function statements) produce no node and never abort.
pub struct Walker {
    file: PathBuf,
    docstrings: DocstringExtractor,
    scope: Vec<String>,
}

impl Walker {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            docstrings: DocstringExtractor::new(),
            scope: Vec::new(),
        }
    }

    /// Produces one [`Module`] with one member per declaration in source
    /// order.
    pub fn walk_module(&mut self, tree: &SyntaxTree, module_name: &str) -> Result<Module> {
        let root = tree.root();
        let docstring = if tree.children(root).is_empty() {
            None
        } else {
            self.docstrings.from_first_statement(tree, root)
        };
        let mut module = Module {
            location: self.location(tree, root),
            parent: None,
            name: module_name.to_string(),
            docstring,
            members: Vec::new(),
        };
        self.scope.push(module_name.to_string());
        for &child in tree.children(root) {
            let members = self.parse_declaration(tree, child, Vec::new())?;
            module.members.extend(members);
        }
        self.scope.pop();
        Ok(module)
    }

    /// Dispatch by grammar-production tag. Returns the declarations the
    /// node contributes; an empty vector means the construct is ignored
    /// by design.
    fn parse_declaration(
        &mut self,
        tree: &SyntaxTree,
        node: NodeId,
        decorators: Vec<Decorator>,
    ) -> Result<Vec<Member>> {
        match tree.symbol(node) {
            Some(Symbol::SimpleStmt) => {
                if !decorators.is_empty() {
                    return Err(self.structural(tree, node, "decorators on a simple statement"));
                }
                let stmt = *tree
                    .children(node)
                    .first()
                    .ok_or_else(|| self.structural(tree, node, "empty simple statement"))?;
                match tree.symbol(stmt) {
                    Some(Symbol::ImportName) | Some(Symbol::ImportFrom) => {
                        debug!(file = %self.file.display(), "skipping import statement");
                        Ok(Vec::new())
                    }
                    Some(Symbol::ExprStmt) => self.parse_statement(tree, stmt),
                    _ => Ok(Vec::new()),
                }
            }
            Some(Symbol::FuncDef) => Ok(vec![Member::Function(self.parse_funcdef(
                tree, node, false, decorators,
            )?)]),
            Some(Symbol::ClassDef) => Ok(vec![Member::Class(
                self.parse_classdef(tree, node, decorators)?,
            )]),
            Some(Symbol::AsyncStmt) | Some(Symbol::AsyncFuncDef) => {
                let inner = *tree.children(node).get(1).ok_or_else(|| {
                    self.structural(tree, node, "async statement missing its inner statement")
                })?;
                if tree.symbol(inner) == Some(Symbol::FuncDef) {
                    Ok(vec![Member::Function(self.parse_funcdef(
                        tree, inner, true, decorators,
                    )?)])
                } else {
                    debug!(file = %self.file.display(), "skipping async non-function statement");
                    Ok(Vec::new())
                }
            }
            Some(Symbol::Decorated) => {
                let children = tree.children(node);
                if children.len() != 2 {
                    return Err(self.structural(tree, node, "malformed decorated declaration"));
                }
                let head = children[0];
                let decorator_nodes: Vec<NodeId> = match tree.symbol(head) {
                    Some(Symbol::Decorator) => vec![head],
                    Some(Symbol::Decorators) => tree.children(head).to_vec(),
                    _ => {
                        return Err(self.structural(
                            tree,
                            node,
                            "decorated declaration without decorators",
                        ))
                    }
                };
                let mut decorators = Vec::new();
                for decorator in decorator_nodes {
                    if tree.symbol(decorator) != Some(Symbol::Decorator) {
                        return Err(self.structural(
                            tree,
                            decorator,
                            "unexpected node in decorator list",
                        ));
                    }
                    decorators.push(self.parse_decorator(tree, decorator)?);
                }
                self.parse_declaration(tree, children[1], decorators)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Assignment statements become one Data per left-hand target, all
    /// sharing the reconstructed right-hand expression and one docstring
    /// lookup. Statements without an assignment operator are dropped.
    fn parse_statement(&mut self, tree: &SyntaxTree, stmt: NodeId) -> Result<Vec<Member>> {
        let mut targets: Vec<Vec<NodeId>> = Vec::new();
        let mut current: Vec<NodeId> = Vec::new();
        let mut is_assignment = false;
        for &child in tree.children(stmt) {
            if tree.token(child) == Some(TokenKind::Equal) {
                is_assignment = true;
                targets.push(std::mem::take(&mut current));
            } else {
                current.push(child);
            }
        }
        if !is_assignment {
            return Ok(Vec::new());
        }
        let docstring = self.docstrings.for_assignment(tree, stmt);
        let expr = Expr::new(span_text(tree, &current, true));
        let mut members = Vec::new();
        for target in targets {
            if target.is_empty() {
                return Err(self.structural(tree, stmt, "assignment operator without a target"));
            }
            members.push(Member::Data(Data {
                location: self.location(tree, stmt),
                parent: self.parent_ref(),
                name: span_text(tree, &target, true),
                docstring: docstring.clone(),
                expr: Some(expr.clone()),
            }));
        }
        Ok(members)
    }

    /// One stacked decorator: `@` + dotted name + optional call text.
    fn parse_decorator(&self, tree: &SyntaxTree, node: NodeId) -> Result<Decorator> {
        let children = tree.children(node);
        let at = *children
            .first()
            .ok_or_else(|| self.structural(tree, node, "empty decorator"))?;
        if tree.token(at) != Some(TokenKind::At) {
            return Err(self.structural(tree, node, "decorator does not start with @"));
        }
        let name_node = *children
            .get(1)
            .ok_or_else(|| self.structural(tree, node, "decorator missing its name"))?;
        let name = self.dotted_name(tree, name_node);
        let call = span_text(tree, &children[2..], true);
        let call = call.trim();
        Ok(Decorator {
            name,
            args: (!call.is_empty()).then(|| Expr::new(call)),
        })
    }

    fn parse_funcdef(
        &mut self,
        tree: &SyntaxTree,
        node: NodeId,
        is_async: bool,
        decorators: Vec<Decorator>,
    ) -> Result<Function> {
        let children = tree.children(node);
        let parameters = children
            .iter()
            .copied()
            .find(|&c| tree.symbol(c) == Some(Symbol::Parameters))
            .ok_or_else(|| {
                self.structural(tree, node, "function definition missing its parameter list")
            })?;
        let suite = children
            .iter()
            .copied()
            .find(|&c| tree.symbol(c) == Some(Symbol::Suite))
            .ok_or_else(|| self.structural(tree, node, "function definition missing its body"))?;
        let name_node = *children
            .get(1)
            .filter(|&&c| tree.is_leaf(c))
            .ok_or_else(|| self.structural(tree, node, "function definition missing its name"))?;
        let name = tree.value(name_node).to_string();
        let docstring = self.docstrings.from_first_statement(tree, suite);
        let args = self.parse_parameters(tree, parameters)?;
        let return_type = self.return_annotation(tree, node);
        Ok(Function {
            location: self.location(tree, node),
            parent: self.parent_ref(),
            name,
            docstring,
            is_async,
            decorators,
            args,
            return_type,
        })
    }

    /// Left-to-right scan of the parameter production with a running
    /// kind. Every outer iteration must advance the cursor.
    fn parse_parameters(&self, tree: &SyntaxTree, parameters: NodeId) -> Result<Vec<Argument>> {
        let children = tree.children(parameters);
        let arglist = children
            .iter()
            .copied()
            .find(|&c| tree.symbol(c) == Some(Symbol::TypedArgsList));
        let Some(arglist) = arglist else {
            // Degenerate list: just parens, or parens around a bare name.
            return match children.len() {
                2 => Ok(Vec::new()),
                3 => Ok(vec![Argument {
                    name: tree.value(children[1]).to_string(),
                    annotation: None,
                    default: None,
                    kind: ArgumentKind::Positional,
                }]),
                _ => Err(self.structural(tree, parameters, "unexpected parameter list shape")),
            };
        };

        let items = tree.children(arglist);
        let mut cursor = Cursor::new(items);
        let mut args = Vec::new();
        let mut kind = ArgumentKind::Positional;
        while cursor.has_more() {
            let anchor = cursor.pos();
            let Some(node) = cursor.current() else {
                break;
            };
            match tree.token(node) {
                Some(TokenKind::Star) => {
                    cursor.advance();
                    match cursor.current() {
                        Some(next) if tree.token(next) != Some(TokenKind::Comma) => {
                            args.push(self.consume_arg(
                                tree,
                                &mut cursor,
                                ArgumentKind::PositionalRemainder,
                                arglist,
                            )?);
                        }
                        Some(_) => {
                            cursor.advance();
                        }
                        None => {}
                    }
                    kind = ArgumentKind::KeywordOnly;
                }
                Some(TokenKind::DoubleStar) => {
                    cursor.advance();
                    args.push(self.consume_arg(
                        tree,
                        &mut cursor,
                        ArgumentKind::KeywordRemainder,
                        arglist,
                    )?);
                }
                Some(TokenKind::Comma) => {
                    cursor.advance();
                }
                _ => {
                    args.push(self.consume_arg(tree, &mut cursor, kind, arglist)?);
                }
            }
            cursor.ensure_advanced(anchor).map_err(|_| {
                self.structural(tree, arglist, "parameter scan failed to advance")
            })?;
        }
        Ok(args)
    }

    /// One `name[: annotation][= default]`, from either a typed-name
    /// subtree or flat tokens. Leaves the cursor past everything
    /// consumed.
    fn consume_arg(
        &self,
        tree: &SyntaxTree,
        cursor: &mut Cursor<NodeId>,
        kind: ArgumentKind,
        context: NodeId,
    ) -> Result<Argument> {
        let node = cursor
            .current()
            .ok_or_else(|| self.structural(tree, context, "expected a parameter name"))?;
        let name;
        let mut annotation = None;
        if tree.symbol(node) == Some(Symbol::Tname) {
            let inner = tree.children(node);
            let name_node = *inner.first().ok_or_else(|| {
                self.structural(tree, node, "annotated parameter missing its name")
            })?;
            name = tree.value(name_node).to_string();
            if inner.len() >= 3 && tree.token(inner[1]) == Some(TokenKind::Colon) {
                annotation = Some(Expr::new(span_text(tree, &inner[2..], true)));
            }
            cursor.advance();
        } else {
            if tree.is_interior(node) {
                return Err(self.structural(tree, node, "expected a parameter name"));
            }
            name = tree.value(node).to_string();
            cursor.advance();
            if let Some(next) = cursor.current() {
                if tree.token(next) == Some(TokenKind::Colon) {
                    let value = cursor.advance().ok_or_else(|| {
                        self.structural(tree, context, "annotation missing its expression")
                    })?;
                    annotation = Some(Expr::new(node_text(tree, value, true)));
                    cursor.advance();
                }
            }
        }
        let mut default = None;
        if let Some(next) = cursor.current() {
            if tree.token(next) == Some(TokenKind::Equal) {
                let value = cursor.advance().ok_or_else(|| {
                    self.structural(tree, context, "default missing its expression")
                })?;
                default = Some(Expr::new(node_text(tree, value, true)));
                cursor.advance();
            }
        }
        Ok(Argument {
            name,
            annotation,
            default,
            kind,
        })
    }

    fn parse_classdef(
        &mut self,
        tree: &SyntaxTree,
        node: NodeId,
        decorators: Vec<Decorator>,
    ) -> Result<Class> {
        let children = tree.children(node);
        let name_node = *children
            .get(1)
            .filter(|&&c| tree.is_leaf(c))
            .ok_or_else(|| self.structural(tree, node, "class definition missing its name"))?;
        let name = tree.value(name_node).to_string();

        let mut bases = Vec::new();
        let mut metaclass = None;
        let arglist = children
            .iter()
            .copied()
            .find(|&c| tree.symbol(c) == Some(Symbol::ArgList));
        if let Some(arglist) = arglist {
            for &entry in tree.children(arglist) {
                if tree.token(entry) == Some(TokenKind::Comma) {
                    continue;
                }
                if tree.symbol(entry) == Some(Symbol::Argument) {
                    let parts = tree.children(entry);
                    if parts.len() < 3 {
                        return Err(self.structural(
                            tree,
                            entry,
                            "malformed class keyword argument",
                        ));
                    }
                    let key = tree.value(parts[0]);
                    if key == "metaclass" {
                        metaclass = Some(Expr::new(span_text(tree, &parts[2..], true)));
                    } else {
                        debug!(
                            file = %self.file.display(),
                            key, "ignoring class keyword argument"
                        );
                    }
                } else {
                    bases.push(Expr::new(node_text(tree, entry, true)));
                }
            }
        }

        let suite = children
            .iter()
            .copied()
            .find(|&c| tree.symbol(c) == Some(Symbol::Suite))
            .ok_or_else(|| self.structural(tree, node, "class body missing its block"))?;
        let docstring = self.docstrings.from_first_statement(tree, suite);
        let location = self.location(tree, node);
        let parent = self.parent_ref();

        self.scope.push(name.clone());
        let mut members = Vec::new();
        for &child in tree.children(suite) {
            if tree.is_interior(child) {
                let parsed = self.parse_declaration(tree, child, Vec::new());
                match parsed {
                    Ok(new_members) => members.extend(new_members),
                    Err(err) => {
                        self.scope.pop();
                        return Err(err);
                    }
                }
            }
        }
        self.scope.pop();

        // Implicit metaclass: capture the first __metaclass__ assignment
        // and filter it out of the final member list.
        if metaclass.is_none() {
            let found = members
                .iter()
                .position(|m| matches!(m, Member::Data(d) if d.name == METACLASS_ATTR));
            if let Some(index) = found {
                if let Member::Data(data) = members.remove(index) {
                    metaclass = data.expr;
                }
            }
        }

        Ok(Class {
            location,
            parent,
            name,
            docstring,
            bases,
            metaclass,
            decorators,
            members,
        })
    }

    fn return_annotation(&self, tree: &SyntaxTree, node: NodeId) -> Option<Expr> {
        let rarrow = tree
            .children(node)
            .iter()
            .copied()
            .find(|&c| tree.token(c) == Some(TokenKind::RArrow))?;
        let value = tree.next_sibling(rarrow)?;
        Some(Expr::new(node_text(tree, value, true)))
    }

    fn dotted_name(&self, tree: &SyntaxTree, node: NodeId) -> String {
        if tree.symbol(node) == Some(Symbol::DottedName) {
            tree.children(node)
                .iter()
                .map(|&c| tree.value(c))
                .collect()
        } else {
            tree.value(node).to_string()
        }
    }

    fn parent_ref(&self) -> Option<String> {
        if self.scope.is_empty() {
            None
        } else {
            Some(self.scope.join("."))
        }
    }

    fn location(&self, tree: &SyntaxTree, node: NodeId) -> Location {
        Location {
            file: self.file.clone(),
            line: tree.line(node),
        }
    }

    fn structural(&self, tree: &SyntaxTree, node: NodeId, message: &str) -> DocsmithError {
        DocsmithError::Structural {
            file: self.file.clone(),
            line: tree.line(node),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cst::TreeBuilder;

    fn walker() -> Walker {
        Walker::new(PathBuf::from("test.py"))
    }

    /// `NEWLINE INDENT <stmt> DEDENT` with a `pass` body; `indent_prefix`
    /// is the trivia carried by the INDENT token (comments between the
    /// colon line and the first statement).
    fn pass_suite(b: &mut TreeBuilder, indent_prefix: &str) -> NodeId {
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let indent = b.leaf(TokenKind::Indent, indent_prefix, "    ");
        let pass = b.leaf(TokenKind::Name, "", "pass");
        let pass_nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![pass, pass_nl]);
        let dedent = b.leaf(TokenKind::Dedent, "", "");
        b.node(Symbol::Suite, vec![nl, indent, stmt, dedent])
    }

    fn docstring_suite(b: &mut TreeBuilder, raw: &str) -> NodeId {
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let indent = b.leaf(TokenKind::Indent, "", "    ");
        let string = b.leaf(TokenKind::String, "", raw);
        let string_nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![string, string_nl]);
        let dedent = b.leaf(TokenKind::Dedent, "", "");
        b.node(Symbol::Suite, vec![nl, indent, stmt, dedent])
    }

    fn funcdef(b: &mut TreeBuilder, name: &str, parameters: NodeId, suite: NodeId) -> NodeId {
        let def = b.leaf(TokenKind::Name, "", "def");
        let name = b.leaf(TokenKind::Name, " ", name);
        let colon = b.leaf(TokenKind::Colon, "", ":");
        b.node(Symbol::FuncDef, vec![def, name, parameters, colon, suite])
    }

    fn file(b: TreeBuilder, members: Vec<NodeId>) -> SyntaxTree {
        let mut b = b;
        let end = b.leaf(TokenKind::EndMarker, "", "");
        let mut children = members;
        children.push(end);
        let root = b.node(Symbol::FileInput, children);
        b.finish(root)
    }

    fn walk(tree: &SyntaxTree) -> Module {
        walker().walk_module(tree, "test").unwrap()
    }

    fn function(module: &Module) -> &Function {
        match &module.members[0] {
            Member::Function(f) => f,
            other => panic!("expected a function, got {other:?}"),
        }
    }

    fn class(module: &Module) -> &Class {
        match &module.members[0] {
            Member::Class(c) => c,
            other => panic!("expected a class, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_yields_empty_module() {
        let mut b = TreeBuilder::new();
        let end = b.leaf(TokenKind::EndMarker, "", "");
        let root = b.node(Symbol::FileInput, vec![end]);
        let tree = b.finish(root);
        let module = walk(&tree);
        assert!(module.members.is_empty());
        assert_eq!(module.docstring, None);
        assert_eq!(module.name, "test");
    }

    #[test]
    fn module_docstring_without_declarations() {
        let mut b = TreeBuilder::new();
        let string = b.leaf(TokenKind::String, "", "\"\"\"Module doc.\"\"\"");
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![string, nl]);
        let tree = file(b, vec![stmt]);
        let module = walk(&tree);
        assert!(module.members.is_empty());
        assert_eq!(module.docstring.as_deref(), Some("Module doc."));
    }

    #[test]
    fn full_signature_yields_five_arguments_in_order() {
        // def f(a, b=1, *args, c, **kw): pass
        let mut b = TreeBuilder::new();
        let a = b.leaf(TokenKind::Name, "", "a");
        let c1 = b.leaf(TokenKind::Comma, "", ",");
        let bb = b.leaf(TokenKind::Name, " ", "b");
        let eq = b.leaf(TokenKind::Equal, "", "=");
        let one = b.leaf(TokenKind::Number, "", "1");
        let c2 = b.leaf(TokenKind::Comma, "", ",");
        let star = b.leaf(TokenKind::Star, " ", "*");
        let args_name = b.leaf(TokenKind::Name, "", "args");
        let c3 = b.leaf(TokenKind::Comma, "", ",");
        let c_name = b.leaf(TokenKind::Name, " ", "c");
        let c4 = b.leaf(TokenKind::Comma, "", ",");
        let dstar = b.leaf(TokenKind::DoubleStar, " ", "**");
        let kw_name = b.leaf(TokenKind::Name, "", "kw");
        let arglist = b.node(
            Symbol::TypedArgsList,
            vec![
                a, c1, bb, eq, one, c2, star, args_name, c3, c_name, c4, dstar, kw_name,
            ],
        );
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, arglist, rpar]);
        let suite = pass_suite(&mut b, "");
        let func = funcdef(&mut b, "f", parameters, suite);
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        let f = function(&module);
        assert_eq!(f.args.len(), 5);

        assert_eq!(f.args[0].name, "a");
        assert_eq!(f.args[0].kind, ArgumentKind::Positional);
        assert_eq!(f.args[0].default, None);

        assert_eq!(f.args[1].name, "b");
        assert_eq!(f.args[1].kind, ArgumentKind::Positional);
        assert_eq!(f.args[1].default, Some(Expr::new("1")));

        assert_eq!(f.args[2].name, "args");
        assert_eq!(f.args[2].kind, ArgumentKind::PositionalRemainder);

        assert_eq!(f.args[3].name, "c");
        assert_eq!(f.args[3].kind, ArgumentKind::KeywordOnly);

        assert_eq!(f.args[4].name, "kw");
        assert_eq!(f.args[4].kind, ArgumentKind::KeywordRemainder);
    }

    #[test]
    fn bare_star_emits_nothing_and_switches_kind() {
        // def f(*, a): pass
        let mut b = TreeBuilder::new();
        let star = b.leaf(TokenKind::Star, "", "*");
        let comma = b.leaf(TokenKind::Comma, "", ",");
        let a = b.leaf(TokenKind::Name, " ", "a");
        let arglist = b.node(Symbol::TypedArgsList, vec![star, comma, a]);
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, arglist, rpar]);
        let suite = pass_suite(&mut b, "");
        let func = funcdef(&mut b, "f", parameters, suite);
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        let f = function(&module);
        assert_eq!(f.args.len(), 1);
        assert_eq!(f.args[0].name, "a");
        assert_eq!(f.args[0].kind, ArgumentKind::KeywordOnly);
    }

    #[test]
    fn degenerate_single_name_list() {
        // def f(self): pass
        let mut b = TreeBuilder::new();
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let this = b.leaf(TokenKind::Name, "", "self");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, this, rpar]);
        let suite = pass_suite(&mut b, "");
        let func = funcdef(&mut b, "f", parameters, suite);
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        let f = function(&module);
        assert_eq!(f.args.len(), 1);
        assert_eq!(f.args[0].name, "self");
        assert_eq!(f.args[0].kind, ArgumentKind::Positional);
    }

    #[test]
    fn annotated_default_captures_both() {
        // def f(x: int = 5): pass
        // The annotation lives in a typed-name subtree, the default
        // operator stays in the outer list.
        let mut b = TreeBuilder::new();
        let x = b.leaf(TokenKind::Name, "", "x");
        let colon = b.leaf(TokenKind::Colon, "", ":");
        let int = b.leaf(TokenKind::Name, " ", "int");
        let tname = b.node(Symbol::Tname, vec![x, colon, int]);
        let eq = b.leaf(TokenKind::Equal, " ", "=");
        let five = b.leaf(TokenKind::Number, " ", "5");
        let arglist = b.node(Symbol::TypedArgsList, vec![tname, eq, five]);
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, arglist, rpar]);
        let suite = pass_suite(&mut b, "");
        let func = funcdef(&mut b, "f", parameters, suite);
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        let f = function(&module);
        assert_eq!(f.args.len(), 1);
        assert_eq!(f.args[0].annotation, Some(Expr::new("int")));
        assert_eq!(f.args[0].default, Some(Expr::new("5")));
    }

    #[test]
    fn return_annotation_follows_the_arrow() {
        // def f() -> int: pass
        let mut b = TreeBuilder::new();
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, rpar]);
        let def = b.leaf(TokenKind::Name, "", "def");
        let name = b.leaf(TokenKind::Name, " ", "f");
        let arrow = b.leaf(TokenKind::RArrow, " ", "->");
        let int = b.leaf(TokenKind::Name, " ", "int");
        let colon = b.leaf(TokenKind::Colon, "", ":");
        let suite = pass_suite(&mut b, "");
        let func = b.node(
            Symbol::FuncDef,
            vec![def, name, parameters, arrow, int, colon, suite],
        );
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        let f = function(&module);
        assert!(f.args.is_empty());
        assert_eq!(f.return_type, Some(Expr::new("int")));
    }

    #[test]
    fn async_wrapper_carries_the_flag_through() {
        let mut b = TreeBuilder::new();
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, rpar]);
        let suite = pass_suite(&mut b, "");
        let func = funcdef(&mut b, "fetch", parameters, suite);
        let async_kw = b.leaf(TokenKind::Name, "", "async");
        let wrapper = b.node(Symbol::AsyncStmt, vec![async_kw, func]);
        let tree = file(b, vec![wrapper]);
        let module = walk(&tree);
        let f = function(&module);
        assert_eq!(f.name, "fetch");
        assert!(f.is_async);
    }

    #[test]
    fn stacked_decorators_attach_in_order() {
        // @app.route("/x")
        // @cached
        // def f(): pass
        let mut b = TreeBuilder::new();
        let at1 = b.leaf(TokenKind::At, "", "@");
        let app = b.leaf(TokenKind::Name, "", "app");
        let dot = b.leaf(TokenKind::Dot, "", ".");
        let route = b.leaf(TokenKind::Name, "", "route");
        let dotted = b.node(Symbol::DottedName, vec![app, dot, route]);
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let arg = b.leaf(TokenKind::String, "", "\"/x\"");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let nl1 = b.leaf(TokenKind::Newline, "", "\n");
        let first = b.node(Symbol::Decorator, vec![at1, dotted, lpar, arg, rpar, nl1]);

        let at2 = b.leaf(TokenKind::At, "", "@");
        let cached = b.leaf(TokenKind::Name, "", "cached");
        let nl2 = b.leaf(TokenKind::Newline, "", "\n");
        let second = b.node(Symbol::Decorator, vec![at2, cached, nl2]);

        let decorators = b.node(Symbol::Decorators, vec![first, second]);
        let flp = b.leaf(TokenKind::LPar, "", "(");
        let frp = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![flp, frp]);
        let suite = pass_suite(&mut b, "");
        let func = funcdef(&mut b, "f", parameters, suite);
        let decorated = b.node(Symbol::Decorated, vec![decorators, func]);
        let tree = file(b, vec![decorated]);
        let module = walk(&tree);
        let f = function(&module);
        assert_eq!(f.decorators.len(), 2);
        assert_eq!(f.decorators[0].name, "app.route");
        assert_eq!(f.decorators[0].args, Some(Expr::new("(\"/x\")")));
        assert_eq!(f.decorators[1].name, "cached");
        assert_eq!(f.decorators[1].args, None);
    }

    #[test]
    fn class_docstring_is_normalized() {
        let mut b = TreeBuilder::new();
        let class_kw = b.leaf(TokenKind::Name, "", "class");
        let name = b.leaf(TokenKind::Name, " ", "A");
        let colon = b.leaf(TokenKind::Colon, "", ":");
        let suite = docstring_suite(&mut b, "\"\"\"Doc.\"\"\"");
        let class_def = b.node(Symbol::ClassDef, vec![class_kw, name, colon, suite]);
        let tree = file(b, vec![class_def]);
        let module = walk(&tree);
        let c = class(&module);
        assert_eq!(c.docstring.as_deref(), Some("Doc."));
        assert!(c.members.is_empty());
    }

    #[test]
    fn explicit_metaclass_keyword_and_bases() {
        // class A(B, metaclass=Meta): ...
        let mut b = TreeBuilder::new();
        let class_kw = b.leaf(TokenKind::Name, "", "class");
        let name = b.leaf(TokenKind::Name, " ", "A");
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let base = b.leaf(TokenKind::Name, "", "B");
        let comma = b.leaf(TokenKind::Comma, "", ",");
        let key = b.leaf(TokenKind::Name, " ", "metaclass");
        let eq = b.leaf(TokenKind::Equal, "", "=");
        let meta = b.leaf(TokenKind::Name, "", "Meta");
        let kwarg = b.node(Symbol::Argument, vec![key, eq, meta]);
        let arglist = b.node(Symbol::ArgList, vec![base, comma, kwarg]);
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let colon = b.leaf(TokenKind::Colon, "", ":");
        let suite = pass_suite(&mut b, "");
        let class_def = b.node(
            Symbol::ClassDef,
            vec![class_kw, name, lpar, arglist, rpar, colon, suite],
        );
        let tree = file(b, vec![class_def]);
        let module = walk(&tree);
        let c = class(&module);
        assert_eq!(c.bases, vec![Expr::new("B")]);
        assert_eq!(c.metaclass, Some(Expr::new("Meta")));
    }

    fn metaclass_assignment_class(b: &mut TreeBuilder) -> NodeId {
        // class A:
        //     __metaclass__ = Meta
        //     x = 1
        let class_kw = b.leaf(TokenKind::Name, "", "class");
        let name = b.leaf(TokenKind::Name, " ", "A");
        let colon = b.leaf(TokenKind::Colon, "", ":");

        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let indent = b.leaf(TokenKind::Indent, "", "    ");

        let attr = b.leaf(TokenKind::Name, "", "__metaclass__");
        let eq1 = b.leaf(TokenKind::Equal, " ", "=");
        let meta = b.leaf(TokenKind::Name, " ", "Meta");
        let expr1 = b.node(Symbol::ExprStmt, vec![attr, eq1, meta]);
        let nl1 = b.leaf(TokenKind::Newline, "", "\n");
        let stmt1 = b.node(Symbol::SimpleStmt, vec![expr1, nl1]);

        let x = b.leaf(TokenKind::Name, "    ", "x");
        let eq2 = b.leaf(TokenKind::Equal, " ", "=");
        let one = b.leaf(TokenKind::Number, " ", "1");
        let expr2 = b.node(Symbol::ExprStmt, vec![x, eq2, one]);
        let nl2 = b.leaf(TokenKind::Newline, "", "\n");
        let stmt2 = b.node(Symbol::SimpleStmt, vec![expr2, nl2]);

        let dedent = b.leaf(TokenKind::Dedent, "", "");
        let suite = b.node(Symbol::Suite, vec![nl, indent, stmt1, stmt2, dedent]);
        b.node(Symbol::ClassDef, vec![class_kw, name, colon, suite])
    }

    #[test]
    fn implicit_metaclass_is_captured_and_filtered() {
        let mut b = TreeBuilder::new();
        let class_def = metaclass_assignment_class(&mut b);
        let tree = file(b, vec![class_def]);
        let module = walk(&tree);
        let c = class(&module);
        assert_eq!(c.metaclass, Some(Expr::new("Meta")));
        assert_eq!(c.members.len(), 1);
        assert_eq!(c.members[0].name(), "x");
        assert!(c.members.iter().all(|m| m.name() != "__metaclass__"));
    }

    #[test]
    fn comment_block_docstring_requires_adjacency() {
        // Two comment lines directly above the first body statement.
        let mut b = TreeBuilder::new();
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, rpar]);
        let suite = pass_suite(&mut b, "    # First line\n    # Second line\n");
        let func = funcdef(&mut b, "f", parameters, suite);
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        assert_eq!(
            function(&module).docstring.as_deref(),
            Some("First line\nSecond line")
        );

        // The same lines separated from the statement by a blank line.
        let mut b = TreeBuilder::new();
        let lpar = b.leaf(TokenKind::LPar, "", "(");
        let rpar = b.leaf(TokenKind::RPar, "", ")");
        let parameters = b.node(Symbol::Parameters, vec![lpar, rpar]);
        let suite = pass_suite(&mut b, "    # First line\n    # Second line\n\n");
        let func = funcdef(&mut b, "f", parameters, suite);
        let tree = file(b, vec![func]);
        let module = walk(&tree);
        assert_eq!(function(&module).docstring, None);
    }

    #[test]
    fn chained_assignment_yields_one_data_per_target() {
        // a = b = 5
        let mut b = TreeBuilder::new();
        let a = b.leaf(TokenKind::Name, "", "a");
        let eq1 = b.leaf(TokenKind::Equal, " ", "=");
        let bb = b.leaf(TokenKind::Name, " ", "b");
        let eq2 = b.leaf(TokenKind::Equal, " ", "=");
        let five = b.leaf(TokenKind::Number, " ", "5");
        let expr = b.node(Symbol::ExprStmt, vec![a, eq1, bb, eq2, five]);
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![expr, nl]);
        let tree = file(b, vec![stmt]);
        let module = walk(&tree);
        assert_eq!(module.members.len(), 2);
        for (member, name) in module.members.iter().zip(["a", "b"]) {
            let Member::Data(data) = member else {
                panic!("expected data member");
            };
            assert_eq!(data.name, name);
            assert_eq!(data.expr, Some(Expr::new("5")));
        }
    }

    #[test]
    fn expression_statements_without_assignment_are_dropped() {
        let mut b = TreeBuilder::new();
        let call = b.leaf(TokenKind::Name, "", "configure");
        let expr = b.node(Symbol::ExprStmt, vec![call]);
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![expr, nl]);
        let tree = file(b, vec![stmt]);
        let module = walk(&tree);
        assert!(module.members.is_empty());
    }

    #[test]
    fn imports_are_ignored_by_design() {
        let mut b = TreeBuilder::new();
        let import = b.leaf(TokenKind::Name, "", "import");
        let os = b.leaf(TokenKind::Name, " ", "os");
        let name = b.node(Symbol::ImportName, vec![import, os]);
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![name, nl]);
        let tree = file(b, vec![stmt]);
        let module = walk(&tree);
        assert!(module.members.is_empty());
    }

    #[test]
    fn missing_class_body_is_a_structural_error() {
        let mut b = TreeBuilder::new();
        let class_kw = b.leaf(TokenKind::Name, "", "class");
        let name = b.leaf(TokenKind::Name, " ", "A");
        let colon = b.leaf(TokenKind::Colon, "", ":");
        let class_def = b.node(Symbol::ClassDef, vec![class_kw, name, colon]);
        let tree = file(b, vec![class_def]);
        let err = walker().walk_module(&tree, "test").unwrap_err();
        assert!(matches!(err, DocsmithError::Structural { .. }));
        assert!(err.to_string().contains("class body missing its block"));
    }

    #[test]
    fn decorated_simple_statement_is_a_structural_error() {
        let mut b = TreeBuilder::new();
        let at = b.leaf(TokenKind::At, "", "@");
        let name = b.leaf(TokenKind::Name, "", "marker");
        let nl = b.leaf(TokenKind::Newline, "", "\n");
        let decorator = b.node(Symbol::Decorator, vec![at, name, nl]);
        let x = b.leaf(TokenKind::Name, "", "x");
        let eq = b.leaf(TokenKind::Equal, " ", "=");
        let one = b.leaf(TokenKind::Number, " ", "1");
        let expr = b.node(Symbol::ExprStmt, vec![x, eq, one]);
        let stmt_nl = b.leaf(TokenKind::Newline, "", "\n");
        let stmt = b.node(Symbol::SimpleStmt, vec![expr, stmt_nl]);
        let decorated = b.node(Symbol::Decorated, vec![decorator, stmt]);
        let tree = file(b, vec![decorated]);
        let err = walker().walk_module(&tree, "test").unwrap_err();
        assert!(matches!(err, DocsmithError::Structural { .. }));
    }

    #[test]
    fn scope_paths_flow_into_parent_references() {
        let mut b = TreeBuilder::new();
        let class_def = metaclass_assignment_class(&mut b);
        let tree = file(b, vec![class_def]);
        let module = walk(&tree);
        let c = class(&module);
        assert_eq!(c.parent.as_deref(), Some("test"));
        let Member::Data(data) = &c.members[0] else {
            panic!("expected data member");
        };
        assert_eq!(data.parent.as_deref(), Some("test.A"));
    }
}
