// Rule synthesis: the boolean-expression artifact of the pipeline.
//
// expr:        the AST and its textual rendering
// parse:       recursive-descent parser for emitted rule text
// synthesizer: classified table → rules, under either strategy

pub mod expr;
pub mod parse;
pub mod synthesizer;

pub use expr::{render_lines, BoolExpr, Operand, Path, Rule};
pub use parse::{parse_ruleset, RuleParseError};
pub use synthesizer::synthesize;
