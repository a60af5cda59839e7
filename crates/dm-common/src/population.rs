//! Population identity.
//!
//! The engine only ever distinguishes two populations. They are tagged `A`
//! and `B` internally; the user-facing group labels (e.g. `F` / `M`) are
//! bound once through [`GroupLabels`].

use serde::{Deserialize, Serialize};

/// One of the two compared populations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Population {
    A,
    B,
}

impl Population {
    pub const BOTH: [Population; 2] = [Population::A, Population::B];

    /// The opposite population.
    pub fn other(self) -> Self {
        match self {
            Population::A => Population::B,
            Population::B => Population::A,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Population::A => "A",
            Population::B => "B",
        }
    }
}

impl std::fmt::Display for Population {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Group labels as they appear in the source data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLabels {
    pub a: String,
    pub b: String,
}

impl Default for GroupLabels {
    fn default() -> Self {
        GroupLabels {
            a: "A".to_string(),
            b: "B".to_string(),
        }
    }
}

impl GroupLabels {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        GroupLabels {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Label for a population.
    pub fn label(&self, population: Population) -> &str {
        match population {
            Population::A => &self.a,
            Population::B => &self.b,
        }
    }

    /// Population a raw group value belongs to, if any.
    ///
    /// Surrounding whitespace is ignored; matching is otherwise exact.
    pub fn population_of(&self, group: &str) -> Option<Population> {
        let group = group.trim();
        if group == self.a {
            Some(Population::A)
        } else if group == self.b {
            Some(Population::B)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_is_involution() {
        for p in Population::BOTH {
            assert_ne!(p.other(), p);
            assert_eq!(p.other().other(), p);
        }
    }

    #[test]
    fn labels_round_trip() {
        let labels = GroupLabels::new("F", "M");
        assert_eq!(labels.label(Population::A), "F");
        assert_eq!(labels.label(Population::B), "M");
        assert_eq!(labels.population_of(" M "), Some(Population::B));
        assert_eq!(labels.population_of("F"), Some(Population::A));
        assert_eq!(labels.population_of("X"), None);
    }

    #[test]
    fn display_uses_tag() {
        assert_eq!(Population::A.to_string(), "A");
        assert_eq!(Population::B.to_string(), "B");
    }
}
