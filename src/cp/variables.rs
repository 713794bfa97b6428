//! CP variable types.

/// Integer variable over the closed range `[min, max]`.
///
/// Either derived (the target of a
/// [`Constraint::Quotient`](super::Constraint::Quotient)) or free, in which
/// case the solver gives it the smallest value its constraints allow.
#[derive(Debug, Clone)]
pub struct IntVar {
    pub name: String,
    pub min: i64,
    pub max: i64,
}

impl IntVar {
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

/// Boolean decision variable, optionally pinned to a value.
#[derive(Debug, Clone)]
pub struct BoolVar {
    pub name: String,
    pub fixed: Option<bool>,
}

impl BoolVar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed: None,
        }
    }

    pub fn pinned(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            fixed: Some(value),
        }
    }
}
