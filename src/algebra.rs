//! Formula algebra for equipment fusion.
//!
//! Forging one composite item out of several sources pools their
//! modifiers. Modifiers that target the same statistic and stage and
//! carry no condition or toggle are merged symbolically: each value
//! string is split into a constant, `(coefficient, variable)` pairs
//! recognized from the literal shapes `number * identifier` and
//! `identifier * number`, and opaque leftovers kept verbatim. Constants
//! and per-variable coefficients sum; the merged formula evaluates, for
//! every context, to the sum of evaluating the sources separately.
//!
//! A small set of capacity-style statistics merges by maximum across
//! sources instead of summing.

use crate::catalog::Modifier;
use crate::context::EvalContext;
use crate::expr;
use crate::key::StatKey;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

/// A formula split into constant + linear terms + opaque leftovers.
///
/// # Examples
///
/// ```rust
/// use buildstat::algebra::LinearForm;
///
/// let mut form = LinearForm::parse("10 + 5 * level");
/// form.merge(LinearForm::parse("3 * level + 2"));
/// assert_eq!(form.to_formula(), "12 + 8*level");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearForm {
    pub constant: f64,
    /// Summed coefficient per distinct variable, in stable name order.
    pub coefficients: BTreeMap<String, f64>,
    /// Terms that matched no recognized shape, kept verbatim.
    pub leftovers: Vec<String>,
}

impl LinearForm {
    /// Split a formula on top-level `+`/`-` and sort each term.
    ///
    /// Recognized shapes: bare `number`, `number * identifier`,
    /// `identifier * number`, bare `identifier` (coefficient 1).
    /// Anything else becomes a leftover.
    pub fn parse(text: &str) -> Self {
        let mut form = Self::default();
        for (term, negative) in split_terms(text) {
            let sign = if negative { -1.0 } else { 1.0 };
            match classify_term(&term) {
                Term::Constant(value) => form.constant += sign * value,
                Term::Scaled(coefficient, variable) => {
                    *form.coefficients.entry(variable).or_insert(0.0) += sign * coefficient;
                }
                Term::Opaque => {
                    if negative {
                        form.leftovers.push(format!("-({term})"));
                    } else {
                        form.leftovers.push(term);
                    }
                }
            }
        }
        form
    }

    /// Fold another form into this one: constants sum, coefficients sum
    /// per variable, leftovers concatenate.
    pub fn merge(&mut self, other: LinearForm) {
        self.constant += other.constant;
        for (variable, coefficient) in other.coefficients {
            *self.coefficients.entry(variable).or_insert(0.0) += coefficient;
        }
        self.leftovers.extend(other.leftovers);
    }

    /// Re-serialize as `constant + c1*v1 + c2*v2 + … + leftovers`.
    ///
    /// Zero-coefficient terms are dropped; the constant is kept only
    /// when non-zero or when it is the whole formula.
    pub fn to_formula(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.constant != 0.0 {
            parts.push(fmt_num(self.constant));
        }
        for (variable, coefficient) in &self.coefficients {
            if *coefficient != 0.0 {
                let mut term = fmt_num(*coefficient);
                let _ = write!(term, "*{variable}");
                parts.push(term);
            }
        }
        parts.extend(self.leftovers.iter().cloned());
        if parts.is_empty() {
            return "0".into();
        }
        parts.join(" + ")
    }
}

enum Term {
    Constant(f64),
    Scaled(f64, String),
    Opaque,
}

/// Split on top-level `+` and `-`, respecting parentheses. Returns each
/// term with its sign. A `+`/`-` right after another operator is a unary
/// sign inside the term (`2 * -level`), not a separator.
fn split_terms(text: &str) -> Vec<(String, bool)> {
    let mut terms = Vec::new();
    let mut depth = 0u32;
    let mut current = String::new();
    let mut negative = false;
    let mut prev = None::<char>;
    let ends_operand =
        |c: char| c.is_ascii_alphanumeric() || c == '_' || c == ')' || c == '.';
    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '+' | '-' if depth == 0 && prev.is_some_and(ends_operand) => {
                terms.push((current.trim().to_owned(), negative));
                current = String::new();
                negative = c == '-';
            }
            '-' if depth == 0 && current.trim().is_empty() => {
                // leading sign of the first term
                negative = !negative;
            }
            _ => current.push(c),
        }
        if !c.is_whitespace() {
            prev = Some(c);
        }
    }
    if !current.trim().is_empty() {
        terms.push((current.trim().to_owned(), negative));
    }
    terms
}

fn classify_term(term: &str) -> Term {
    if let Ok(value) = term.parse::<f64>() {
        return Term::Constant(value);
    }
    if is_identifier(term) {
        return Term::Scaled(1.0, term.to_owned());
    }
    // exactly one top-level `*` between a number and an identifier
    let pieces: Vec<&str> = term.split('*').map(str::trim).collect();
    if let [lhs, rhs] = pieces.as_slice() {
        if let Ok(value) = lhs.parse::<f64>() {
            if is_identifier(rhs) {
                return Term::Scaled(value, (*rhs).to_owned());
            }
        }
        if let Ok(value) = rhs.parse::<f64>() {
            if is_identifier(lhs) {
                return Term::Scaled(value, (*lhs).to_owned());
            }
        }
    }
    Term::Opaque
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn fmt_num(value: f64) -> String {
    format!("{value}")
}

/// Merge a fused item's pooled modifiers.
///
/// Modifiers sharing (target, stage, per-turn flag) with no condition and
/// no toggle collapse into one; conditioned or toggled modifiers copy
/// through verbatim. Statistics listed in `max_merged` (capacity-style
/// values) keep the single source formula with the greatest value under
/// an empty context instead of summing.
pub fn merge_modifiers(modifiers: &[Modifier], max_merged: &[StatKey]) -> Vec<Modifier> {
    #[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
    struct GroupKey(StatKey, u8, bool);

    enum Slot {
        Verbatim(Modifier),
        Group(GroupKey),
    }

    let stage_rank = |modifier: &Modifier| modifier.stage as u8;

    let empty_vars = HashMap::new();
    let empty_ctx = EvalContext::new(&empty_vars);

    let mut order: Vec<Slot> = Vec::new();
    let mut sums: BTreeMap<GroupKey, (Modifier, LinearForm)> = BTreeMap::new();
    let mut maxes: BTreeMap<GroupKey, (Modifier, f64)> = BTreeMap::new();

    for modifier in modifiers {
        if modifier.condition.is_some() || modifier.toggle.is_some() {
            order.push(Slot::Verbatim(modifier.clone()));
            continue;
        }
        let key = GroupKey(
            modifier.target.clone(),
            stage_rank(modifier),
            modifier.per_turn,
        );
        if max_merged.contains(&modifier.target) {
            let value = expr::evaluate(&modifier.value, &empty_ctx);
            match maxes.get_mut(&key) {
                Some((best, best_value)) => {
                    if value > *best_value {
                        *best = modifier.clone();
                        *best_value = value;
                    }
                }
                None => {
                    order.push(Slot::Group(key.clone()));
                    maxes.insert(key, (modifier.clone(), value));
                }
            }
        } else {
            let form = LinearForm::parse(&modifier.value);
            match sums.get_mut(&key) {
                Some((_, merged)) => merged.merge(form),
                None => {
                    order.push(Slot::Group(key.clone()));
                    sums.insert(key, (modifier.clone(), form));
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Verbatim(modifier) => Some(modifier),
            Slot::Group(key) => {
                if let Some((template, form)) = sums.remove(&key) {
                    Some(Modifier {
                        value: form.to_formula(),
                        ..template
                    })
                } else {
                    maxes.remove(&key).map(|(best, _)| best)
                }
            }
        })
        .collect()
}
