use crate::error::Result;
use crate::query::{CmpOp, ColumnRef, Operand, Predicate};

/// Maps a column reference to its position in the rows being filtered.
pub trait ColumnResolver {
    fn resolve(&self, column: &ColumnRef) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq)]
enum Bound {
    Literal(String),
    Column(usize),
}

impl Bound {
    fn value<'a>(&'a self, row: &'a [String]) -> &'a str {
        match self {
            Bound::Literal(lit) => lit,
            Bound::Column(pos) => row.get(*pos).map_or("", String::as_str),
        }
    }
}

/// A predicate whose column references have been resolved to positions.
///
/// Comparisons are plain text comparisons whatever the column types, so
/// `'9' > '10'` holds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundPredicate {
    terms: Vec<(Bound, CmpOp, Bound)>,
}

impl BoundPredicate {
    pub fn bind(predicate: &Predicate, resolver: &impl ColumnResolver) -> Result<Self> {
        let bind = |operand: &Operand| -> Result<Bound> {
            Ok(match operand {
                Operand::Literal(lit) => Bound::Literal(lit.clone()),
                Operand::Column(column) => Bound::Column(resolver.resolve(column)?),
            })
        };
        let terms = predicate
            .terms
            .iter()
            .map(|term| -> Result<_> { Ok((bind(&term.left)?, term.op, bind(&term.right)?)) })
            .collect::<Result<_>>()?;
        Ok(Self { terms })
    }

    /// Binds an optional predicate; `None` matches every row.
    pub fn bind_opt(
        predicate: Option<&Predicate>,
        resolver: &impl ColumnResolver,
    ) -> Result<Option<Self>> {
        predicate.map(|p| Self::bind(p, resolver)).transpose()
    }

    pub fn matches(&self, row: &[String]) -> bool {
        self.terms
            .iter()
            .all(|(left, op, right)| op.holds(left.value(row).cmp(right.value(row))))
    }

    /// Column pairs compared with `=`, if that is all the predicate does.
    pub fn equi_columns(&self) -> Option<Vec<(usize, usize)>> {
        self.terms
            .iter()
            .map(|term| match term {
                (Bound::Column(left), CmpOp::Eq, Bound::Column(right)) => Some((*left, *right)),
                _ => None,
            })
            .collect()
    }
}

/// Shorthand for an optional bound predicate.
pub fn matches(predicate: Option<&BoundPredicate>, row: &[String]) -> bool {
    predicate.is_none_or(|p| p.matches(row))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::DbError;
    use crate::query::{Comparison, Stmt, parse};

    struct Names(Vec<&'static str>);

    impl ColumnResolver for Names {
        fn resolve(&self, column: &ColumnRef) -> Result<usize> {
            self.0
                .iter()
                .position(|name| **name == *column.name)
                .ok_or_else(|| DbError::ColumnNotFound(column.name.to_string()))
        }
    }

    fn predicate(cond: &str) -> Predicate {
        match parse(&format!("DELETE FROM t WHERE {cond}")).unwrap() {
            Stmt::Delete {
                filter: Some(filter),
                ..
            } => filter,
            _ => unreachable!(),
        }
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_conjunction() {
        let names = Names(vec!["a", "b"]);
        let both = BoundPredicate::bind(&predicate("a = '1' AND b = '2'"), &names).unwrap();
        let swapped = BoundPredicate::bind(&predicate("b = '2' AND a = '1'"), &names).unwrap();
        for values in [["1", "2"], ["1", "3"], ["0", "2"]] {
            let row = row(&values);
            assert_eq!(both.matches(&row), swapped.matches(&row));
        }
        assert!(both.matches(&row(&["1", "2"])));
        assert!(!both.matches(&row(&["1", "3"])));
    }

    #[test]
    fn test_comparison_is_textual() {
        let names = Names(vec!["n"]);
        let gt = BoundPredicate::bind(&predicate("n > 5"), &names).unwrap();
        assert!(gt.matches(&row(&["9"])));
        assert!(!gt.matches(&row(&["40"])));
    }

    #[test]
    fn test_column_to_column() {
        let names = Names(vec!["a", "b"]);
        let pred = BoundPredicate::bind(&predicate("a <= b"), &names).unwrap();
        assert!(pred.matches(&row(&["abc", "abd"])));
        assert!(!pred.matches(&row(&["b", "a"])));
        assert_eq!(pred.equi_columns(), None);
    }

    #[test]
    fn test_equi_columns() {
        let pred = BoundPredicate {
            terms: vec![(Bound::Column(0), CmpOp::Eq, Bound::Column(3))],
        };
        assert_eq!(pred.equi_columns(), Some(vec![(0, 3)]));
    }

    #[test]
    fn test_unknown_column() {
        let names = Names(vec!["a"]);
        let pred = Predicate {
            terms: vec![Comparison {
                left: Operand::Column(ColumnRef::bare("zz")),
                op: CmpOp::Eq,
                right: Operand::Literal("1".to_string()),
            }],
        };
        assert!(matches!(
            BoundPredicate::bind(&pred, &names),
            Err(DbError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_null_literal() {
        let names = Names(vec!["a"]);
        let pred = BoundPredicate::bind(&predicate("a = NULL"), &names).unwrap();
        assert!(pred.matches(&row(&[""])));
        assert!(matches(None, &row(&["x"])));
    }
}
