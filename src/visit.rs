//! Visitor trait for traversing the typed `OpenSCAD` AST.
//!
//! Implement this trait to walk the AST without modifying it.
//! Each method has a default implementation that recurses into children;
//! the `walk_*` helpers are what those defaults call, so an override can
//! still continue into the children.
use crate::ast::{Argument, Expr, ExprKind, Parameter, SourceFile, Statement};

/// A visitor that traverses the AST by reference.
pub trait Visitor {
    fn visit_file(&mut self, file: &SourceFile) {
        for stmt in &file.statements {
            self.visit_statement(stmt);
        }
    }

    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt);
    }

    fn visit_argument(&mut self, arg: &Argument) {
        self.visit_expr(&arg.value);
    }

    fn visit_parameter(&mut self, param: &Parameter) {
        if let Some(default) = &param.default {
            self.visit_expr(default);
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visit every child of `stmt`.
pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Include { .. }
        | Statement::Use { .. }
        | Statement::Empty { .. }
        | Statement::Error { .. } => {}
        Statement::Assignment { expr, .. } => visitor.visit_expr(expr),
        Statement::ModuleDefinition { params, body, .. } => {
            for param in params {
                visitor.visit_parameter(param);
            }
            for stmt in body {
                visitor.visit_statement(stmt);
            }
        }
        Statement::FunctionDefinition { params, body, .. } => {
            for param in params {
                visitor.visit_parameter(param);
            }
            visitor.visit_expr(body);
        }
        Statement::ModuleInstantiation { args, children, .. }
        | Statement::Assert { args, children, .. }
        | Statement::Echo { args, children, .. } => {
            for arg in args {
                visitor.visit_argument(arg);
            }
            for child in children {
                visitor.visit_statement(child);
            }
        }
        Statement::IfElse {
            condition,
            then_body,
            else_body,
            ..
        } => {
            visitor.visit_expr(condition);
            for stmt in then_body {
                visitor.visit_statement(stmt);
            }
            if let Some(else_stmts) = else_body {
                for stmt in else_stmts {
                    visitor.visit_statement(stmt);
                }
            }
        }
        Statement::For {
            assignments, body, ..
        }
        | Statement::Let {
            assignments, body, ..
        } => {
            for arg in assignments {
                visitor.visit_argument(arg);
            }
            for stmt in body {
                visitor.visit_statement(stmt);
            }
        }
        Statement::Modified { body, .. } => visitor.visit_statement(body),
        Statement::Block { body, .. } => {
            for stmt in body {
                visitor.visit_statement(stmt);
            }
        }
    }
}

/// Visit every child of `expr`.
pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Number(_)
        | ExprKind::String(_)
        | ExprKind::BoolTrue
        | ExprKind::BoolFalse
        | ExprKind::Undef
        | ExprKind::Identifier(_)
        | ExprKind::Error => {}
        ExprKind::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        ExprKind::BinaryOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then_expr);
            visitor.visit_expr(else_expr);
        }
        ExprKind::FunctionCall { callee, args } => {
            visitor.visit_expr(callee);
            for arg in args {
                visitor.visit_argument(arg);
            }
        }
        ExprKind::Index { object, index } => {
            visitor.visit_expr(object);
            visitor.visit_expr(index);
        }
        ExprKind::Slice {
            object,
            start,
            step,
            end,
        } => {
            visitor.visit_expr(object);
            visitor.visit_expr(start);
            if let Some(s) = step {
                visitor.visit_expr(s);
            }
            visitor.visit_expr(end);
        }
        ExprKind::MemberAccess { object, .. } => visitor.visit_expr(object),
        ExprKind::Vector(elements) => {
            for elem in elements {
                visitor.visit_expr(elem);
            }
        }
        ExprKind::Range { start, step, end } => {
            visitor.visit_expr(start);
            if let Some(s) = step {
                visitor.visit_expr(s);
            }
            visitor.visit_expr(end);
        }
        ExprKind::Let { assignments, body }
        | ExprKind::LcLet { assignments, body }
        | ExprKind::LcFor { assignments, body } => {
            for arg in assignments {
                visitor.visit_argument(arg);
            }
            visitor.visit_expr(body);
        }
        ExprKind::Assert { args, body } | ExprKind::Echo { args, body } => {
            for arg in args {
                visitor.visit_argument(arg);
            }
            if let Some(b) = body {
                visitor.visit_expr(b);
            }
        }
        ExprKind::AnonymousFunction { params, body } => {
            for param in params {
                visitor.visit_parameter(param);
            }
            visitor.visit_expr(body);
        }
        ExprKind::LcForC {
            init,
            condition,
            update,
            body,
        } => {
            for arg in init {
                visitor.visit_argument(arg);
            }
            visitor.visit_expr(condition);
            for arg in update {
                visitor.visit_argument(arg);
            }
            visitor.visit_expr(body);
        }
        ExprKind::LcIf {
            condition,
            then_expr,
            else_expr,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then_expr);
            if let Some(e) = else_expr {
                visitor.visit_expr(e);
            }
        }
        ExprKind::LcEach { body } => visitor.visit_expr(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[derive(Default)]
    struct Names {
        identifiers: Vec<String>,
        calls: Vec<String>,
    }

    impl Visitor for Names {
        fn visit_statement(&mut self, stmt: &Statement) {
            if let Statement::ModuleInstantiation { name, .. } = stmt {
                self.calls.push(name.clone());
            }
            walk_statement(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Expr) {
            if let ExprKind::Identifier(name) = &expr.kind {
                self.identifiers.push(name.clone());
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn collects_names_in_order() {
        let source = "module m(r = base) { %{ sphere(r); } }\nfor (i = [0:n]) translate([i, 0]) cube(size);\nv = [for (j = w) each f(j)];";
        let file = parse(source).to_ast();
        let mut names = Names::default();
        names.visit_file(&file);
        assert_eq!(names.calls, vec!["sphere", "translate", "cube"]);
        assert_eq!(
            names.identifiers,
            vec!["base", "r", "n", "i", "size", "w", "f", "j"]
        );
    }

    #[test]
    fn error_nodes_are_leaves() {
        let file = parse("x = ;").to_ast();
        let mut names = Names::default();
        names.visit_file(&file);
        assert!(names.identifiers.is_empty());
    }
}
