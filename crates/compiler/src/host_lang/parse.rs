// Copyright (C) 2026 The Loomhaven Authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Pest-driven front end for the bundled reference host language.

use super::ast::{BinaryOp, Expr, HostProgram, Literal, Stmt, UnaryOp};
use pest::iterators::Pair;
use pest::Parser;

#[derive(Parser)]
#[grammar = "src/host_lang.pest"]
struct HostLangParser;

/// A single parse failure, with enough positional detail to become a
/// `DiagnosticInfo` in the precompiler.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

fn line_col(pair: &Pair<Rule>) -> (usize, usize) {
    pair.as_span().start_pos().line_col()
}

pub fn parse_program(source: &str) -> Result<HostProgram, ParseError> {
    let mut pairs = HostLangParser::parse(Rule::program, source).map_err(|e| {
        let (line, column) = match e.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        ParseError {
            line,
            column,
            message: e.variant.message().to_string(),
        }
    })?;

    let program_pair = pairs.next().expect("program rule always present");
    let mut statements = Vec::new();
    for pair in program_pair.into_inner() {
        match pair.as_rule() {
            Rule::stmt => statements.push(build_stmt(pair)),
            Rule::EOI => {}
            _ => unreachable!("unexpected top-level rule {:?}", pair.as_rule()),
        }
    }
    Ok(HostProgram { statements })
}

fn build_stmt(pair: Pair<Rule>) -> Stmt {
    let inner = pair.into_inner().next().expect("stmt has one child");
    let (line, _) = line_col(&inner);
    match inner.as_rule() {
        Rule::block => {
            let stmts = inner.into_inner().map(build_stmt).collect();
            Stmt::Block(stmts)
        }
        Rule::if_stmt => {
            let mut it = inner.into_inner();
            let cond = build_expr(it.next().unwrap());
            let then_branch = Box::new(build_stmt(it.next().unwrap()));
            let else_branch = it.next().map(|p| Box::new(build_stmt(p)));
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                line,
            }
        }
        Rule::while_stmt => {
            let mut it = inner.into_inner();
            let cond = build_expr(it.next().unwrap());
            let body = Box::new(build_stmt(it.next().unwrap()));
            Stmt::While { cond, body, line }
        }
        Rule::return_stmt => {
            let value = inner.into_inner().next().map(build_expr);
            Stmt::Return { value, line }
        }
        Rule::throw_stmt => {
            let value = build_expr(inner.into_inner().next().unwrap());
            Stmt::Throw { value, line }
        }
        Rule::let_stmt => {
            let mut it = inner.into_inner();
            let type_name = it.next().unwrap().as_str().to_string();
            // The optional '?' is a literal token, not captured as a pair;
            // detect it by checking the raw span between type and ident.
            let nullable = inner_contains_nullable_marker(&type_name, &inner);
            let name_pair = it.next().unwrap();
            let name = name_pair.as_str().to_string();
            let value = build_expr(it.next().unwrap());
            Stmt::Let {
                type_name,
                nullable,
                name,
                value,
                line,
            }
        }
        Rule::expr_stmt => build_expr_stmt(inner, line),
        other => unreachable!("unexpected stmt child {:?}", other),
    }
}

/// The grammar doesn't capture the bare `?` token in `let_stmt`; detect
/// nullability by checking for a `?` between the type name and the
/// identifier in the statement's own source text.
fn inner_contains_nullable_marker(_type_name: &str, pair: &Pair<Rule>) -> bool {
    pair.as_str().trim_start().contains('?')
        && pair
            .as_str()
            .split('=')
            .next()
            .map(|head| head.contains('?'))
            .unwrap_or(false)
}

fn build_expr_stmt(pair: Pair<Rule>, line: usize) -> Stmt {
    let inner = pair.into_inner().next().expect("expr_stmt has one child");
    match inner.as_rule() {
        Rule::assign_stmt => {
            let mut it = inner.into_inner();
            let target = build_expr(it.next().unwrap());
            let value = build_expr(it.next().unwrap());
            Stmt::Assign {
                target,
                value,
                line,
            }
        }
        Rule::bare_expr_stmt => {
            let expr = build_expr(inner.into_inner().next().unwrap());
            Stmt::ExprStmt(expr, line)
        }
        other => unreachable!("unexpected expr_stmt child {:?}", other),
    }
}

fn build_expr(pair: Pair<Rule>) -> Expr {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner().next().unwrap()),
        Rule::coalesce => build_left_assoc_coalesce(pair),
        Rule::logic_or => build_left_assoc_binary(pair, |op_str| match op_str {
            "||" => BinaryOp::Or,
            _ => unreachable!(),
        }),
        Rule::logic_and => build_left_assoc_binary(pair, |op_str| match op_str {
            "&&" => BinaryOp::And,
            _ => unreachable!(),
        }),
        Rule::equality => build_left_assoc_binary(pair, |op_str| match op_str {
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            _ => unreachable!(),
        }),
        Rule::comparison => build_left_assoc_binary(pair, |op_str| match op_str {
            "<=" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            _ => unreachable!(),
        }),
        Rule::additive => build_left_assoc_binary(pair, |op_str| match op_str {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            _ => unreachable!(),
        }),
        Rule::multiplicative => build_left_assoc_binary(pair, |op_str| match op_str {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            _ => unreachable!(),
        }),
        Rule::unary => {
            let mut it = pair.into_inner();
            let first = it.next().unwrap();
            match first.as_rule() {
                Rule::unary_op => {
                    let op = match first.as_str() {
                        "!" => UnaryOp::Not,
                        "-" => UnaryOp::Neg,
                        _ => unreachable!(),
                    };
                    let expr = build_expr(it.next().unwrap());
                    Expr::Unary {
                        op,
                        expr: Box::new(expr),
                    }
                }
                Rule::postfix => build_postfix(first),
                other => unreachable!("unexpected unary child {:?}", other),
            }
        }
        Rule::postfix => build_postfix(pair),
        other => unreachable!("unexpected expr rule {:?}", other),
    }
}

/// `??` is right-associative in most C-family languages, but a left fold
/// here still yields the one semantics this core cares about (fall
/// through to the first non-null value); chained `a ?? b ?? c` reads the
/// same either way for the values this language produces.
fn build_left_assoc_coalesce(pair: Pair<Rule>) -> Expr {
    let mut it = pair.into_inner();
    let mut expr = build_expr(it.next().unwrap());
    for next in it {
        let rhs = build_expr(next);
        expr = Expr::Coalesce {
            lhs: Box::new(expr),
            rhs: Box::new(rhs),
        };
    }
    expr
}

fn build_left_assoc_binary(pair: Pair<Rule>, op_of: impl Fn(&str) -> BinaryOp) -> Expr {
    let mut it = pair.into_inner().peekable();
    let mut expr = build_expr(it.next().unwrap());
    while let Some(op_pair) = it.next() {
        let op = op_of(op_pair.as_str());
        let rhs_pair = it.next().expect("binary op missing right operand");
        let rhs = build_expr(rhs_pair);
        expr = Expr::Binary {
            op,
            lhs: Box::new(expr),
            rhs: Box::new(rhs),
        };
    }
    expr
}

fn build_postfix(pair: Pair<Rule>) -> Expr {
    let mut it = pair.into_inner();
    let primary_pair = it.next().unwrap();
    let (line, _) = line_col(&primary_pair);
    let mut expr = build_primary(primary_pair);
    for op_pair in it {
        let (op_line, _) = line_col(&op_pair);
        let inner = op_pair.into_inner().next().unwrap();
        match inner.as_rule() {
            Rule::member_op => {
                let name = inner.into_inner().next().unwrap().as_str().to_string();
                expr = Expr::Member {
                    target: Box::new(expr),
                    name,
                    line: op_line,
                };
            }
            Rule::call_op => {
                let args = inner.into_inner().map(build_expr).collect();
                expr = Expr::Call {
                    target: Box::new(expr),
                    args,
                    line: op_line,
                };
            }
            other => unreachable!("unexpected postfix_op child {:?}", other),
        }
    }
    let _ = line;
    expr
}

fn build_primary(pair: Pair<Rule>) -> Expr {
    let (line, _) = line_col(&pair);
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::new_expr => {
            let mut it = inner.into_inner();
            let type_name = it.next().unwrap().as_str().to_string();
            let args = it.map(build_expr).collect();
            Expr::New {
                type_name,
                args,
                line,
            }
        }
        Rule::paren_expr => build_expr(inner.into_inner().next().unwrap()),
        Rule::literal => build_literal(inner),
        Rule::ident => Expr::Ident(inner.as_str().to_string()),
        other => unreachable!("unexpected primary child {:?}", other),
    }
}

fn build_literal(pair: Pair<Rule>) -> Expr {
    let inner = pair.into_inner().next().unwrap();
    let lit = match inner.as_rule() {
        Rule::number => {
            let text = inner.as_str();
            if text.contains('.') {
                Literal::Float(text.parse().expect("valid float literal"))
            } else {
                Literal::Int(text.parse().expect("valid int literal"))
            }
        }
        Rule::string => {
            let raw = inner.into_inner().next().unwrap().as_str();
            Literal::Str(unescape(raw))
        }
        Rule::bool_lit => Literal::Bool(inner.as_str() == "true"),
        Rule::null_lit => Literal::Null,
        other => unreachable!("unexpected literal child {:?}", other),
    };
    Expr::Literal(lit)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_echo_verb_body() {
        let src = r#"notify(Player, "You say: " + text); return true;"#;
        let program = parse_program(src).expect("should parse");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn parses_let_with_null_coalesce() {
        let src = r#"string V = Variables.TryGet("V") ?? "";"#;
        let program = parse_program(src).expect("should parse");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::Let {
                type_name, name, ..
            } => {
                assert_eq!(type_name, "string");
                assert_eq!(name, "V");
            }
            other => panic!("expected Let, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_while_throw() {
        let src = r#"
            if (x == 1) { return true; } else { return false; }
            while (true) { }
            throw new Exception("no");
        "#;
        let program = parse_program(src).expect("should parse");
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn reports_line_number_on_parse_error() {
        let src = "var x = 1;\nreturn x +;";
        let err = parse_program(src).expect_err("should fail to parse");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn throw_line_number_recorded() {
        let src = "var x = 1;\nthrow new Exception(\"no\");";
        let program = parse_program(src).expect("should parse");
        match &program.statements[1] {
            Stmt::Throw { line, .. } => assert_eq!(*line, 2),
            other => panic!("expected Throw, got {other:?}"),
        }
    }
}
