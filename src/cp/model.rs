//! CP model definition.

use super::variables::{BoolVar, IntVar};
use std::collections::{HashMap, HashSet};

/// Comparison used by [`Constraint::Linear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `sum == rhs`
    Eq,
    /// `sum <= rhs`
    Le,
    /// `sum >= rhs`
    Ge,
}

impl Relation {
    /// Whether `value` satisfies the relation against `rhs`.
    pub fn holds(self, value: i64, rhs: i64) -> bool {
        match self {
            Relation::Eq => value == rhs,
            Relation::Le => value <= rhs,
            Relation::Ge => value >= rhs,
        }
    }
}

/// Upper bound of an [`Constraint::AbsDiffAtMost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Limit {
    Constant(i64),
    /// Name of an integer variable.
    Var(String),
}

/// A constraint in the CP model.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Pseudo-boolean linear constraint: `sum(coef * b) <relation> rhs`,
    /// where each `b` is a boolean variable counted as 0 or 1.
    Linear {
        /// (bool variable name, coefficient) pairs.
        terms: Vec<(String, i64)>,
        relation: Relation,
        rhs: i64,
    },

    /// `target = floor(sum(coef * b) / divisor)`.
    ///
    /// When `cardinality` is set, exactly that many of the boolean terms
    /// are known to be true in any solution (enforced elsewhere in the
    /// model); the solver uses it to tighten the bounds of partial sums.
    Quotient {
        /// Integer variable receiving the quotient.
        target: String,
        /// (bool variable name, coefficient) pairs.
        terms: Vec<(String, i64)>,
        /// Positive divisor.
        divisor: i64,
        cardinality: Option<i64>,
    },

    /// `|left - right| <= limit` over integer variables.
    AbsDiffAtMost {
        left: String,
        right: String,
        limit: Limit,
    },
}

/// Objective function for the CP model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    /// Minimize a free integer variable.
    Minimize { var: String },
}

/// A constraint programming model over boolean decisions and integer
/// quantities derived from them.
///
/// Boolean variables are branched on in insertion order.
///
/// # Examples
///
/// ```
/// use u_teambalance::cp::{BoolVar, CpModel, Relation};
///
/// let mut model = CpModel::new("pick-one");
/// model.add_bool_var(BoolVar::new("a"));
/// model.add_bool_var(BoolVar::new("b"));
/// model.add_linear(vec![("a".into(), 1), ("b".into(), 1)], Relation::Eq, 1);
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Boolean variables, in branching order.
    pub bool_vars: Vec<BoolVar>,
    /// Integer variables.
    pub int_vars: Vec<IntVar>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
    /// Suggested values for boolean variables, tried before the search.
    pub hints: HashMap<String, bool>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bool_vars: Vec::new(),
            int_vars: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            hints: HashMap::new(),
        }
    }

    /// Adds a boolean variable.
    pub fn add_bool_var(&mut self, var: BoolVar) {
        self.bool_vars.push(var);
    }

    /// Adds an integer variable.
    pub fn add_int_var(&mut self, var: IntVar) {
        self.int_vars.push(var);
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Convenience: add a linear constraint.
    pub fn add_linear(&mut self, terms: Vec<(String, i64)>, relation: Relation, rhs: i64) {
        self.constraints.push(Constraint::Linear {
            terms,
            relation,
            rhs,
        });
    }

    /// Convenience: add `|left - right| <= limit`.
    pub fn add_abs_diff_at_most(&mut self, left: String, right: String, limit: Limit) {
        self.constraints.push(Constraint::AbsDiffAtMost { left, right, limit });
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Suggests a value for a boolean variable.
    pub fn add_hint(&mut self, name: impl Into<String>, value: bool) {
        self.hints.insert(name.into(), value);
    }

    /// Validates the model for consistency.
    ///
    /// Checks name uniqueness, that all referenced names exist with the
    /// right kind, domains and divisors. Each integer variable is either
    /// derived (the target of exactly one quotient) or free; differences
    /// compare derived variables and are bounded by constants or free
    /// variables.
    pub fn validate(&self) -> Result<(), String> {
        let mut bools = HashSet::new();
        for var in &self.bool_vars {
            if !bools.insert(var.name.as_str()) {
                return Err(format!("duplicate variable: {}", var.name));
            }
        }
        let mut ints = HashSet::new();
        for var in &self.int_vars {
            if bools.contains(var.name.as_str()) || !ints.insert(var.name.as_str()) {
                return Err(format!("duplicate variable: {}", var.name));
            }
            if var.is_empty() {
                return Err(format!(
                    "empty domain for {}: [{}, {}]",
                    var.name, var.min, var.max
                ));
            }
        }

        let check_bool_terms = |terms: &[(String, i64)]| -> Result<(), String> {
            for (name, _) in terms {
                if !bools.contains(name.as_str()) {
                    return Err(format!("undefined bool variable: {name}"));
                }
            }
            Ok(())
        };
        let check_int = |name: &str| -> Result<(), String> {
            if ints.contains(name) {
                Ok(())
            } else {
                Err(format!("undefined int variable: {name}"))
            }
        };

        let mut targets = HashSet::new();
        for constraint in &self.constraints {
            if let Constraint::Quotient { target, .. } = constraint {
                if !targets.insert(target.as_str()) {
                    return Err(format!("{target} is the target of several quotients"));
                }
            }
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Linear { terms, .. } => check_bool_terms(terms)?,
                Constraint::Quotient {
                    target,
                    terms,
                    divisor,
                    cardinality,
                } => {
                    check_int(target)?;
                    check_bool_terms(terms)?;
                    if *divisor <= 0 {
                        return Err(format!("quotient {target}: divisor must be positive"));
                    }
                    if let Some(k) = cardinality {
                        if *k < 0 || *k as usize > terms.len() {
                            return Err(format!("quotient {target}: cardinality out of range"));
                        }
                    }
                }
                Constraint::AbsDiffAtMost { left, right, limit } => {
                    check_int(left)?;
                    check_int(right)?;
                    for operand in [left, right] {
                        if !targets.contains(operand.as_str()) {
                            return Err(format!("{operand} must be the target of a quotient"));
                        }
                    }
                    match limit {
                        Limit::Constant(c) if *c < 0 => {
                            return Err(format!("negative limit for |{left} - {right}|"));
                        }
                        Limit::Var(name) => {
                            check_int(name)?;
                            if targets.contains(name.as_str()) {
                                return Err(format!("limit {name} must be a free variable"));
                            }
                        }
                        Limit::Constant(_) => {}
                    }
                }
            }
        }

        if let Some(Objective::Minimize { var }) = &self.objective {
            check_int(var)?;
            if targets.contains(var.as_str()) {
                return Err(format!("objective {var} must be a free variable"));
            }
        }

        for name in self.hints.keys() {
            if !bools.contains(name.as_str()) {
                return Err(format!("hint for undefined bool variable: {name}"));
            }
        }
        Ok(())
    }

    /// Returns the number of boolean variables.
    pub fn bool_var_count(&self) -> usize {
        self.bool_vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }
}
