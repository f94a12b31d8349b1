//! Query-string parsing for the in-memory session
//!
//! Supported statements:
//!
//! ```text
//! [select count(*) | select alias | select *] from Entity [[as] alias]
//!     [where condition] [order by path [asc|desc] (, path [asc|desc])*]
//! delete from Entity [[as] alias] [where condition]
//! ```
//!
//! Conditions combine `and`, `or`, `not` and parentheses over
//! `path (=|!=|<>|<|<=|>|>=) value`, `path [not] like value`,
//! `path is [not] null` and `path [not] in (value, ...)`. A value is a
//! positional `?` parameter, a quoted string, a number, `true`, `false` or
//! `null`.
//!
//! Parsing is done by `sqlparser`; this module converts its AST into
//! restrictions and sort keys. `?` markers are numbered `$1`, `$2`, ... before
//! parsing, so parameters bind in the order the markers appear.

use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use sqlparser::ast as sql_ast;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::{RepoError, RepoResult};
use crate::query::{Order, Restriction};

/// A parsed statement with its parameters bound
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select {
        entity: String,
        count: bool,
        restrictions: Vec<Restriction>,
        orders: Vec<Order>,
    },
    Delete {
        entity: String,
        restrictions: Vec<Restriction>,
    },
}

fn leading_from() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*from\b").expect("static pattern"))
}

/// Rewrite `?` markers outside string literals as numbered placeholders
fn number_parameters(input: &str) -> (String, usize) {
    let mut output = String::with_capacity(input.len() + 8);
    let mut in_literal = false;
    let mut markers = 0;

    for c in input.chars() {
        match c {
            // A doubled quote toggles twice and stays inside the literal
            '\'' => {
                in_literal = !in_literal;
                output.push(c);
            }
            '?' if !in_literal => {
                markers += 1;
                output.push('$');
                output.push_str(&markers.to_string());
            }
            _ => output.push(c),
        }
    }

    (output, markers)
}

struct Converter<'a> {
    input: &'a str,
    params: &'a [Value],
    alias: Option<String>,
}

impl Converter<'_> {
    fn error(&self, message: impl Display) -> RepoError {
        RepoError::Query(format!("{} in: {}", message, self.input))
    }

    fn statement(&mut self, statement: sql_ast::Statement) -> RepoResult<Statement> {
        match statement {
            sql_ast::Statement::Query(query) => self.select(*query),
            sql_ast::Statement::Delete(delete) => self.delete(delete),
            _ => Err(self.error("Only select and delete statements are supported")),
        }
    }

    fn select(&mut self, query: sql_ast::Query) -> RepoResult<Statement> {
        if query.limit_clause.is_some() {
            return Err(self.error("Limit clauses are not supported, page the query instead"));
        }
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(self.error("Only plain select queries are supported"));
        };
        let select = *select;

        let entity = self.range(select.from)?;

        let [item] = select.projection.as_slice() else {
            return Err(self.error("Select exactly one item"));
        };
        let count = match item {
            sql_ast::SelectItem::Wildcard(_) => false,
            sql_ast::SelectItem::UnnamedExpr(sql_ast::Expr::Identifier(ident))
                if self.alias.as_deref() == Some(ident.value.as_str()) =>
            {
                false
            }
            sql_ast::SelectItem::UnnamedExpr(sql_ast::Expr::Function(function))
                if function.name.to_string().eq_ignore_ascii_case("count") =>
            {
                true
            }
            _ => return Err(self.error("Only the range alias or count(*) can be selected")),
        };

        let restrictions = self.where_clause(select.selection)?;
        let orders = self.order_by(query.order_by)?;

        Ok(Statement::Select {
            entity,
            count,
            restrictions,
            orders,
        })
    }

    fn delete(&mut self, delete: sql_ast::Delete) -> RepoResult<Statement> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables)
            | sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let entity = self.range(tables)?;
        let restrictions = self.where_clause(delete.selection)?;

        Ok(Statement::Delete {
            entity,
            restrictions,
        })
    }

    /// Entity name of the single range, remembering its alias
    fn range(&mut self, from: Vec<sql_ast::TableWithJoins>) -> RepoResult<String> {
        let [table] = from.as_slice() else {
            return Err(self.error("Expected exactly one entity in the from clause"));
        };
        if !table.joins.is_empty() {
            return Err(self.error("Joins are not supported"));
        }

        match &table.relation {
            sql_ast::TableFactor::Table { name, alias, .. } => {
                self.alias = alias.as_ref().map(|alias| alias.name.value.clone());
                name.0
                    .last()
                    .map(|part| part.to_string())
                    .ok_or_else(|| self.error("Missing entity name"))
            }
            _ => Err(self.error("Only entity names can appear in the from clause")),
        }
    }

    fn where_clause(&self, selection: Option<sql_ast::Expr>) -> RepoResult<Vec<Restriction>> {
        let Some(expr) = selection else {
            return Ok(Vec::new());
        };
        match self.restriction(expr)? {
            Restriction::And(all) => Ok(all),
            other => Ok(vec![other]),
        }
    }

    fn restriction(&self, expr: sql_ast::Expr) -> RepoResult<Restriction> {
        match expr {
            sql_ast::Expr::Nested(inner) => self.restriction(*inner),
            sql_ast::Expr::UnaryOp {
                op: sql_ast::UnaryOperator::Not,
                expr,
            } => Ok(Restriction::not(self.restriction(*expr)?)),
            sql_ast::Expr::BinaryOp { left, op, right } => match op {
                sql_ast::BinaryOperator::And => {
                    let left = self.restriction(*left)?;
                    let right = self.restriction(*right)?;
                    Ok(match left {
                        Restriction::And(mut all) => {
                            all.push(right);
                            Restriction::And(all)
                        }
                        other => Restriction::And(vec![other, right]),
                    })
                }
                sql_ast::BinaryOperator::Or => {
                    let left = self.restriction(*left)?;
                    let right = self.restriction(*right)?;
                    Ok(match left {
                        Restriction::Or(mut any) => {
                            any.push(right);
                            Restriction::Or(any)
                        }
                        other => Restriction::Or(vec![other, right]),
                    })
                }
                op => self.comparison(*left, op, *right),
            },
            sql_ast::Expr::IsNull(inner) => Ok(Restriction::IsNull(self.path(*inner)?)),
            sql_ast::Expr::IsNotNull(inner) => Ok(Restriction::IsNotNull(self.path(*inner)?)),
            sql_ast::Expr::Like {
                negated,
                expr,
                pattern,
                escape_char,
                ..
            } => {
                if escape_char.is_some() {
                    return Err(self.error("Like escape characters are not supported"));
                }
                let path = self.path(*expr)?;
                let Value::String(pattern) = self.value(*pattern)? else {
                    return Err(self.error("Like pattern must be a string"));
                };
                Ok(negate(Restriction::Like(path, pattern), negated))
            }
            sql_ast::Expr::InList {
                expr,
                list,
                negated,
            } => {
                let path = self.path(*expr)?;
                let values = list
                    .into_iter()
                    .map(|item| self.value(item))
                    .collect::<RepoResult<Vec<_>>>()?;
                Ok(negate(Restriction::In(path, values), negated))
            }
            other => Err(self.error(format!("Unsupported condition '{}'", other))),
        }
    }

    fn comparison(
        &self,
        left: sql_ast::Expr,
        op: sql_ast::BinaryOperator,
        right: sql_ast::Expr,
    ) -> RepoResult<Restriction> {
        let path = self.path(left)?;
        let value = self.value(right)?;
        Ok(match op {
            sql_ast::BinaryOperator::Eq => Restriction::Eq(path, value),
            sql_ast::BinaryOperator::NotEq => Restriction::Ne(path, value),
            sql_ast::BinaryOperator::Lt => Restriction::Lt(path, value),
            sql_ast::BinaryOperator::LtEq => Restriction::Le(path, value),
            sql_ast::BinaryOperator::Gt => Restriction::Gt(path, value),
            sql_ast::BinaryOperator::GtEq => Restriction::Ge(path, value),
            other => return Err(self.error(format!("Unsupported operator '{}'", other))),
        })
    }

    /// Field path with the range alias stripped
    fn path(&self, expr: sql_ast::Expr) -> RepoResult<String> {
        let mut parts: Vec<String> = match expr {
            sql_ast::Expr::Identifier(ident) => vec![ident.value],
            sql_ast::Expr::CompoundIdentifier(idents) => {
                idents.into_iter().map(|ident| ident.value).collect()
            }
            other => return Err(self.error(format!("Expected a field path, found '{}'", other))),
        };
        if parts.len() > 1 && self.alias.as_deref() == Some(parts[0].as_str()) {
            parts.remove(0);
        }
        Ok(parts.join("."))
    }

    fn value(&self, expr: sql_ast::Expr) -> RepoResult<Value> {
        match expr {
            sql_ast::Expr::Value(value) => self.literal(value.value),
            sql_ast::Expr::UnaryOp {
                op: sql_ast::UnaryOperator::Minus,
                expr,
            } => match self.value(*expr)? {
                Value::Number(n) if n.is_i64() => Ok(Value::from(-n.as_i64().unwrap_or_default())),
                Value::Number(n) => Ok(Value::from(-n.as_f64().unwrap_or_default())),
                _ => Err(self.error("Only numbers can be negated")),
            },
            other => Err(self.error(format!("Expected a value, found '{}'", other))),
        }
    }

    fn literal(&self, value: sql_ast::Value) -> RepoResult<Value> {
        match value {
            sql_ast::Value::Number(n, _) => n
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| n.parse::<f64>().map(Value::from))
                .map_err(|_| self.error(format!("Invalid number '{}'", n))),
            sql_ast::Value::SingleQuotedString(text) => Ok(Value::String(text)),
            sql_ast::Value::Boolean(b) => Ok(Value::Bool(b)),
            sql_ast::Value::Null => Ok(Value::Null),
            sql_ast::Value::Placeholder(marker) => marker
                .strip_prefix('$')
                .and_then(|n| n.parse::<usize>().ok())
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| self.params.get(index))
                .cloned()
                .ok_or_else(|| self.error(format!("Unbound parameter '{}'", marker))),
            other => Err(self.error(format!("Unsupported literal {}", other))),
        }
    }

    fn order_by(&self, order_by: Option<sql_ast::OrderBy>) -> RepoResult<Vec<Order>> {
        let Some(order_by) = order_by else {
            return Ok(Vec::new());
        };
        let sql_ast::OrderByKind::Expressions(exprs) = order_by.kind else {
            return Err(self.error("Order by all is not supported"));
        };
        exprs
            .into_iter()
            .map(|order| {
                let ascending = order.options.asc.unwrap_or(true);
                Ok(Order::new(self.path(order.expr)?, ascending))
            })
            .collect()
    }
}

fn negate(restriction: Restriction, negated: bool) -> Restriction {
    if negated {
        Restriction::not(restriction)
    } else {
        restriction
    }
}

/// Parse a statement, binding positional parameters in order
pub fn parse(input: &str, params: &[Value]) -> RepoResult<Statement> {
    let (numbered, markers) = number_parameters(input);
    if markers != params.len() {
        return Err(RepoError::Query(format!(
            "Query uses {} parameters but {} were supplied: {}",
            markers,
            params.len(),
            input
        )));
    }

    let sql = if leading_from().is_match(&numbered) {
        format!("select * {}", numbered.trim_start())
    } else {
        numbered
    };

    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, &sql)
        .map_err(|e| RepoError::Query(format!("{} in: {}", e, input)))?;
    if statements.len() != 1 {
        return Err(RepoError::Query(format!("Expected a single statement: {}", input)));
    }
    let Some(statement) = statements.pop() else {
        return Err(RepoError::Query(format!("Empty statement: {}", input)));
    };

    Converter {
        input,
        params,
        alias: None,
    }
    .statement(statement)
}
