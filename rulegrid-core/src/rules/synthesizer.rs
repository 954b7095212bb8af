//! Rule synthesis: turn a classified table into boolean rules under the
//! configured strategy.

use crate::config::{SynthesisConfig, SynthesisStrategy};
use crate::normalize::{extract_size_token, normalize, normalize_with_case};
use crate::rules::expr::{BoolExpr, Operand, Path, Rule};
use crate::types::ClassifiedTable;
use std::collections::BTreeSet;

/// Synthesize rules for one classified table. Deterministic: for the same
/// table and config the output is byte-identical across runs.
pub fn synthesize(table: &ClassifiedTable, config: &SynthesisConfig) -> Vec<Rule> {
    match config.synthesis_strategy {
        SynthesisStrategy::ExcludesPerAttribute => excludes_per_attribute(table, config),
        SynthesisStrategy::AllTrueAggregate => all_true_aggregate(table, config),
    }
}

/// The key column's domain segment: configured override, else the normalized
/// column name.
fn key_domain(table: &ClassifiedTable, config: &SynthesisConfig) -> String {
    config
        .key_domain_name
        .clone()
        .unwrap_or_else(|| normalize(&table.key_column().name))
}

fn key_value_segment(raw: &str, config: &SynthesisConfig) -> String {
    let token = if config.size_token_extraction {
        extract_size_token(raw)
    } else {
        raw.to_string()
    };
    normalize_with_case(&token, config.output_value_case)
}

/// One `Excludes` rule per attribute column: the key values marked `N` for
/// that attribute exclude the attribute itself. Attributes with no `N` rows
/// (or whose `N` rows carry no key value) produce no rule.
fn excludes_per_attribute(table: &ClassifiedTable, config: &SynthesisConfig) -> Vec<Rule> {
    let prefix = config.namespace_prefix.as_str();
    let domain = key_domain(table, config);
    let key = table.key;

    let mut rules = Vec::new();
    for attr in table.attribute_indexes() {
        // Distinct raw key values, sorted before normalization so the
        // output order never depends on row order.
        let raw_values: BTreeSet<&str> = table
            .rows
            .iter()
            .filter(|row| row[attr].eq_ignore_ascii_case("n"))
            .map(|row| row[key].as_str())
            .filter(|v| !v.is_empty())
            .collect();

        let paths: Vec<Path> = raw_values
            .iter()
            .map(|raw| Path::new([prefix.to_string(), domain.clone(), key_value_segment(raw, config)]))
            .collect();

        let Some(left) = BoolExpr::any_true_paths(paths) else {
            continue;
        };
        let attr_name = normalize(&table.columns[attr].name);
        let right = BoolExpr::AnyTrue(vec![Operand::Path(Path::new([
            prefix.to_string(),
            attr_name.clone(),
            attr_name,
        ]))]);
        rules.push(Rule::excludes(left, right));
    }
    rules
}

/// One aggregate rule per table: for every retained column, an `AnyTrue`
/// clause over its distinct values (empty and `N` values drop out), all
/// wrapped in a single `AllTrue`.
fn all_true_aggregate(table: &ClassifiedTable, config: &SynthesisConfig) -> Vec<Rule> {
    let prefix = config.namespace_prefix.as_str();

    let mut clauses = Vec::new();
    for column in &table.columns {
        let raw_values: BTreeSet<&str> = table
            .rows
            .iter()
            .map(|row| row[column.index].as_str())
            .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("n"))
            .collect();

        let is_key = column.index == table.key;
        let domain = if is_key {
            key_domain(table, config)
        } else {
            normalize(&column.name)
        };
        let paths: Vec<Path> = raw_values
            .iter()
            .map(|raw| {
                let value = if is_key {
                    key_value_segment(raw, config)
                } else {
                    normalize_with_case(raw, config.output_value_case)
                };
                Path::new([prefix.to_string(), domain.clone(), value])
            })
            .collect();

        if let Some(clause) = BoolExpr::any_true_paths(paths) {
            clauses.push(Operand::Expr(clause));
        }
    }

    match BoolExpr::all_true(clauses) {
        Some(expr) => vec![Rule::plain(expr)],
        None => Vec::new(),
    }
}
