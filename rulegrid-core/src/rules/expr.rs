//! The rule expression tree and its textual form.
//!
//! Grammar (emitted and re-parseable verbatim):
//!
//! ```text
//! RuleSet    := Rule (';' Rule)* ';'?
//! Rule       := BoolExpr 'Excludes' BoolExpr | BoolExpr
//! BoolExpr   := ('AllTrue' | 'AnyTrue') '(' Operand (',' Operand)* ')'
//! Operand    := BoolExpr | QuotedPath
//! QuotedPath := "'" Segment "'" ('.' "'" Segment "'")*
//! ```
//!
//! Rules are immutable once emitted and built only from normalized
//! identifiers (plus the configured namespace prefix, carried verbatim).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A quoted dotted path like `'KEY-GR'.'valve_size'.'050'`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path {
    pub segments: Vec<String>,
}

impl Path {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "'{segment}'")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Expr(BoolExpr),
    Path(Path),
}

/// A boolean combinator over one or more operands. Never empty: the
/// synthesizer refuses to build an `AllTrue()`/`AnyTrue()` with no operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoolExpr {
    AllTrue(Vec<Operand>),
    AnyTrue(Vec<Operand>),
}

impl BoolExpr {
    pub fn any_true_paths<I>(paths: I) -> Option<Self>
    where
        I: IntoIterator<Item = Path>,
    {
        let operands: Vec<Operand> = paths.into_iter().map(Operand::Path).collect();
        if operands.is_empty() {
            None
        } else {
            Some(BoolExpr::AnyTrue(operands))
        }
    }

    pub fn all_true(operands: Vec<Operand>) -> Option<Self> {
        if operands.is_empty() {
            None
        } else {
            Some(BoolExpr::AllTrue(operands))
        }
    }

    /// All quoted paths reachable from this expression, in rendering order.
    pub fn paths(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a Path>) {
        let (BoolExpr::AllTrue(operands) | BoolExpr::AnyTrue(operands)) = self;
        for operand in operands {
            match operand {
                Operand::Path(p) => out.push(p),
                Operand::Expr(e) => e.collect_paths(out),
            }
        }
    }
}

impl fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, operands) = match self {
            BoolExpr::AllTrue(ops) => ("AllTrue", ops),
            BoolExpr::AnyTrue(ops) => ("AnyTrue", ops),
        };
        write!(f, "{name}(")?;
        for (i, operand) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match operand {
                Operand::Path(p) => write!(f, "{p}")?,
                Operand::Expr(e) => write!(f, "{e}")?,
            }
        }
        f.write_str(")")
    }
}

/// One synthesized rule: a boolean expression, optionally excluding another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub left: BoolExpr,
    pub excludes: Option<BoolExpr>,
}

impl Rule {
    pub fn plain(left: BoolExpr) -> Self {
        Self {
            left,
            excludes: None,
        }
    }

    pub fn excludes(left: BoolExpr, right: BoolExpr) -> Self {
        Self {
            left,
            excludes: Some(right),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.left)?;
        if let Some(right) = &self.excludes {
            write!(f, " Excludes {right}")?;
        }
        Ok(())
    }
}

/// Render rules as the output artifact: one line per rule, each terminated
/// by `;`.
pub fn render_lines(rules: &[Rule]) -> Vec<String> {
    rules.iter().map(|rule| format!("{rule};")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Path {
        Path::new(segments.iter().copied())
    }

    #[test]
    fn paths_render_quoted_and_dotted() {
        let p = path(&["KEY-GR", "valve_size", "050"]);
        assert_eq!(p.to_string(), "'KEY-GR'.'valve_size'.'050'");
    }

    #[test]
    fn excludes_rule_renders_both_sides() {
        let rule = Rule::excludes(
            BoolExpr::any_true_paths([path(&["KEY-GR", "valve_size", "1"])]).unwrap(),
            BoolExpr::any_true_paths([path(&["KEY-GR", "flanged", "flanged"])]).unwrap(),
        );
        assert_eq!(
            rule.to_string(),
            "AnyTrue('KEY-GR'.'valve_size'.'1') Excludes AnyTrue('KEY-GR'.'flanged'.'flanged')"
        );
    }

    #[test]
    fn nested_all_true_renders_inner_expressions() {
        let inner_a = BoolExpr::any_true_paths([path(&["p", "size", "1"]), path(&["p", "size", "2"])]).unwrap();
        let inner_b = BoolExpr::any_true_paths([path(&["p", "bore", "full"])]).unwrap();
        let expr = BoolExpr::all_true(vec![Operand::Expr(inner_a), Operand::Expr(inner_b)]).unwrap();
        assert_eq!(
            expr.to_string(),
            "AllTrue(AnyTrue('p'.'size'.'1', 'p'.'size'.'2'), AnyTrue('p'.'bore'.'full'))"
        );
    }

    #[test]
    fn empty_expressions_are_never_constructed() {
        assert!(BoolExpr::any_true_paths(std::iter::empty::<Path>()).is_none());
        assert!(BoolExpr::all_true(vec![]).is_none());
    }

    #[test]
    fn lines_end_with_semicolons() {
        let rule = Rule::plain(BoolExpr::any_true_paths([path(&["p", "a", "b"])]).unwrap());
        let lines = render_lines(&[rule]);
        assert_eq!(lines, vec!["AnyTrue('p'.'a'.'b');"]);
    }
}
