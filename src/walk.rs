//! Read-only queries over a [`SyntaxTree`].
//!
//! The tree has no parent pointers, so every context question ("which
//! declaration contains this offset") is answered by a fresh top-down pass
//! that carries the path as it descends.

use crate::span::Span;
use crate::syntax::{Element, NodeId, NodeKind, SyntaxNode, SyntaxTree};

/// Entering or leaving a node during [`preorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent<'t> {
    Enter(SyntaxNode<'t>),
    Leave(SyntaxNode<'t>),
}

/// Depth-first iterator returned by [`preorder`].
pub struct Preorder<'t> {
    start: Option<SyntaxNode<'t>>,
    /// Open nodes and the index of the next child to look at.
    stack: Vec<(SyntaxNode<'t>, usize)>,
}

impl<'t> Iterator for Preorder<'t> {
    type Item = WalkEvent<'t>;

    fn next(&mut self) -> Option<WalkEvent<'t>> {
        if let Some(node) = self.start.take() {
            self.stack.push((node, 0));
            return Some(WalkEvent::Enter(node));
        }
        loop {
            let (node, index) = self.stack.last_mut()?;
            let node = *node;
            let Some(child) = node.children().get(*index) else {
                self.stack.pop();
                return Some(WalkEvent::Leave(node));
            };
            *index += 1;
            if let Element::Node(id) = child {
                let child = node.tree().node(*id);
                self.stack.push((child, 0));
                return Some(WalkEvent::Enter(child));
            }
        }
    }
}

/// Every node under `node` (itself included), entered before its children
/// and left after them.
#[must_use]
pub fn preorder(node: SyntaxNode<'_>) -> Preorder<'_> {
    Preorder {
        start: Some(node),
        stack: Vec::new(),
    }
}

/// The path from the root down to `target`, both ends included. Empty if
/// `target` is not in `tree`.
#[must_use]
pub fn ancestors(tree: &SyntaxTree, target: NodeId) -> Vec<SyntaxNode<'_>> {
    let mut path = Vec::new();
    for event in preorder(tree.root()) {
        match event {
            WalkEvent::Enter(node) => {
                path.push(node);
                if node.id() == target {
                    return path;
                }
            }
            WalkEvent::Leave(_) => {
                path.pop();
            }
        }
    }
    Vec::new()
}

/// Nodes whose span contains `offset`, outermost first. The root is always
/// included.
fn covering_path(tree: &SyntaxTree, offset: usize) -> Vec<SyntaxNode<'_>> {
    let mut path = vec![tree.root()];
    let mut current = tree.root();
    while let Some(child) = current
        .child_nodes()
        .find(|child| !child.span().is_empty() && child.span().contains(offset))
    {
        path.push(child);
        current = child;
    }
    path
}

/// The innermost `module` or `function` declaration covering `offset`.
#[must_use]
pub fn enclosing_declaration(tree: &SyntaxTree, offset: usize) -> Option<SyntaxNode<'_>> {
    covering_path(tree, offset)
        .into_iter()
        .rev()
        .find(|node| node.kind().is_declaration())
}

/// Declared name of a `ModuleDecl`/`FunctionDecl` node.
#[must_use]
pub fn declaration_name(node: SyntaxNode<'_>) -> Option<SyntaxNode<'_>> {
    node.kind()
        .is_declaration()
        .then(|| node.first_child_of(NodeKind::Name))
        .flatten()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Module,
    Function,
}

/// One entry of a structure view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    pub name_span: Span,
    /// Parameter list as written, parentheses included.
    pub params: String,
    pub span: Span,
}

/// Every named declaration in source order, nested ones included.
#[must_use]
pub fn outline(tree: &SyntaxTree) -> Vec<Declaration> {
    preorder(tree.root())
        .filter_map(|event| match event {
            WalkEvent::Enter(node) => Some(node),
            WalkEvent::Leave(_) => None,
        })
        .filter_map(|node| {
            let kind = match node.kind() {
                NodeKind::ModuleDecl => DeclarationKind::Module,
                NodeKind::FunctionDecl => DeclarationKind::Function,
                _ => return None,
            };
            let name = declaration_name(node)?;
            Some(Declaration {
                kind,
                name: name.text().to_string(),
                name_span: name.span(),
                params: node
                    .first_child_of(NodeKind::ParamList)
                    .map(|params| params.text().to_string())
                    .unwrap_or_default(),
                span: node.span(),
            })
        })
        .collect()
}

/// An identifier under a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
    /// Name of the innermost declaration containing the identifier.
    pub declaration: Option<String>,
}

/// The declared or referenced name at `offset`, if any.
#[must_use]
pub fn identifier_at(tree: &SyntaxTree, offset: usize) -> Option<Identifier> {
    let path = covering_path(tree, offset);
    let name = path
        .iter()
        .rev()
        .find(|node| matches!(node.kind(), NodeKind::Name | NodeKind::NameRef))?;
    let declaration = path
        .iter()
        .rev()
        .find_map(|node| declaration_name(*node))
        .map(|name| name.text().to_string());
    Some(Identifier {
        name: name.text().to_string(),
        span: name.span(),
        declaration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const SOURCE: &str = "module outer(size = 1) {\n    function inner(x) = x * size;\n    cube(inner(2));\n}\nfunction 2Dshape() = 1;\n";

    #[test]
    fn test_preorder_balances_enter_and_leave() {
        let result = parse(SOURCE);
        let events: Vec<_> = preorder(result.root()).collect();
        let enters = events
            .iter()
            .filter(|e| matches!(e, WalkEvent::Enter(_)))
            .count();
        assert_eq!(enters * 2, events.len());
        assert_eq!(enters, result.tree().node_count());
        assert_eq!(events.first(), Some(&WalkEvent::Enter(result.root())));
        assert_eq!(events.last(), Some(&WalkEvent::Leave(result.root())));
    }

    #[test]
    fn test_ancestors_run_from_root_to_target() {
        let result = parse("module m() { cube(1); }");
        let call = preorder(result.root())
            .find_map(|event| match event {
                WalkEvent::Enter(node) if node.kind() == NodeKind::ModuleInstantiation => {
                    Some(node)
                }
                _ => None,
            })
            .unwrap();
        let kinds: Vec<_> = ancestors(result.tree(), call.id())
            .into_iter()
            .map(SyntaxNode::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::SourceFile,
                NodeKind::ModuleDecl,
                NodeKind::Block,
                NodeKind::ModuleInstantiation
            ]
        );
    }

    #[test]
    fn test_enclosing_declaration_is_innermost() {
        let result = parse(SOURCE);
        let x_offset = SOURCE.find("x * size").unwrap();
        let decl = enclosing_declaration(result.tree(), x_offset).unwrap();
        assert_eq!(declaration_name(decl).unwrap().text(), "inner");

        let cube_offset = SOURCE.find("cube").unwrap();
        let decl = enclosing_declaration(result.tree(), cube_offset).unwrap();
        assert_eq!(declaration_name(decl).unwrap().text(), "outer");

        assert!(enclosing_declaration(result.tree(), SOURCE.len()).is_none());
    }

    #[test]
    fn test_outline_lists_nested_declarations() {
        let result = parse(SOURCE);
        let outline = outline(result.tree());
        let names: Vec<_> = outline.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner", "2Dshape"]);
        assert_eq!(outline[0].kind, DeclarationKind::Module);
        assert_eq!(outline[0].params, "(size = 1)");
        assert_eq!(outline[1].kind, DeclarationKind::Function);
        assert_eq!(outline[1].params, "(x)");
        let start = SOURCE.find("2Dshape").unwrap();
        assert_eq!(outline[2].name_span, Span::new(start, start + "2Dshape".len()));
    }

    #[test]
    fn test_outline_skips_nameless_declarations() {
        let result = parse("module () {}\nmodule ok() {}");
        let names: Vec<_> = outline(result.tree()).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[test]
    fn test_identifier_at_reports_span_and_declaration() {
        let result = parse(SOURCE);
        let offset = SOURCE.find("size;").unwrap() + 2;
        let ident = identifier_at(result.tree(), offset).unwrap();
        assert_eq!(ident.name, "size");
        let start = SOURCE.find("size;").unwrap();
        assert_eq!(ident.span, Span::new(start, start + 4));
        assert_eq!(ident.declaration.as_deref(), Some("inner"));
    }

    #[test]
    fn test_identifier_at_declared_name() {
        let result = parse(SOURCE);
        let offset = SOURCE.find("outer").unwrap();
        let ident = identifier_at(result.tree(), offset).unwrap();
        assert_eq!(ident.name, "outer");
        assert_eq!(ident.declaration.as_deref(), Some("outer"));
    }

    #[test]
    fn test_identifier_at_punctuation_is_none() {
        let result = parse("x = 1 + 2;");
        assert!(identifier_at(result.tree(), 6).is_none());
    }
}
