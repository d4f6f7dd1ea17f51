use super::Row;
use crate::error::{DbError, Result};
use crate::query::{AggregateFunc, CmpOp};
use std::cmp::Ordering;

const EPSILON: f64 = 1e-10;

/// Computes `func` over `rows`. `column` is `None` for `COUNT(*)`.
///
/// Empty values are nulls and are skipped by every function except
/// `COUNT(*)`. Over no values COUNT and SUM give `0`, the rest give null.
pub fn evaluate(func: AggregateFunc, column: Option<usize>, rows: &[&Row]) -> String {
    let Some(column) = column else {
        return rows.len().to_string();
    };
    let values: Vec<&str> = rows
        .iter()
        .filter_map(|row| row.get(column))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .collect();

    match func {
        AggregateFunc::Count => values.len().to_string(),
        AggregateFunc::Sum => format_number(numbers(&values).sum()),
        AggregateFunc::Avg => {
            let nums: Vec<f64> = numbers(&values).collect();
            if nums.is_empty() {
                String::new()
            } else {
                format_number(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        AggregateFunc::Min => extreme(&values, Ordering::Less),
        AggregateFunc::Max => extreme(&values, Ordering::Greater),
    }
}

fn numbers<'a>(values: &'a [&'a str]) -> impl Iterator<Item = f64> + 'a {
    values.iter().filter_map(|value| value.trim().parse::<f64>().ok())
}

/// MIN/MAX: numeric when every value is a number, textual otherwise.
fn extreme(values: &[&str], wanted: Ordering) -> String {
    let numeric = values.iter().all(|v| v.trim().parse::<f64>().is_ok());
    let cmp = |a: &&str, b: &&str| -> Ordering {
        if numeric {
            let (a, b) = (a.trim().parse::<f64>(), b.trim().parse::<f64>());
            match (a, b) {
                (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        } else {
            a.cmp(b)
        }
    };
    let best = values.iter().copied().reduce(|best, value| {
        if cmp(&value, &best) == wanted {
            value
        } else {
            best
        }
    });
    best.map(str::to_string).unwrap_or_default()
}

/// Renders integral results without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Compares an aggregate result with a HAVING literal numerically.
/// A null result never satisfies the condition.
pub fn having_holds(result: &str, op: CmpOp, literal: &str) -> Result<bool> {
    let expected = literal.trim().parse::<f64>().map_err(|_| {
        DbError::Condition(format!("HAVING value '{literal}' is not a number"))
    })?;
    let Ok(actual) = result.trim().parse::<f64>() else {
        return Ok(false);
    };
    let ord = if (actual - expected).abs() < EPSILON {
        Ordering::Equal
    } else if actual < expected {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    Ok(op.holds(ord))
}

#[cfg(test)]
mod test {
    use super::*;

    fn rows(values: &[&str]) -> Vec<Row> {
        values.iter().map(|v| vec![v.to_string()]).collect()
    }

    fn eval(func: AggregateFunc, values: &[&str]) -> String {
        let rows = rows(values);
        let refs: Vec<&Row> = rows.iter().collect();
        evaluate(func, Some(0), &refs)
    }

    #[test]
    fn test_count() {
        let rows = rows(&["a", "", "b"]);
        let refs: Vec<&Row> = rows.iter().collect();
        assert_eq!(evaluate(AggregateFunc::Count, None, &refs), "3");
        assert_eq!(evaluate(AggregateFunc::Count, Some(0), &refs), "2");
    }

    #[test]
    fn test_sum_avg() {
        assert_eq!(eval(AggregateFunc::Sum, &["80", "90", ""]), "170");
        assert_eq!(eval(AggregateFunc::Avg, &["80", "90"]), "85");
        assert_eq!(eval(AggregateFunc::Avg, &["1", "2"]), "1.5");
        assert_eq!(eval(AggregateFunc::Sum, &["1", "x", "2"]), "3");
    }

    #[test]
    fn test_min_max() {
        assert_eq!(eval(AggregateFunc::Max, &["9", "10", "2"]), "10");
        assert_eq!(eval(AggregateFunc::Min, &["9", "10", "2"]), "2");
        assert_eq!(eval(AggregateFunc::Max, &["b", "10", "a"]), "b");
        assert_eq!(eval(AggregateFunc::Min, &["b", "", "a"]), "a");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(eval(AggregateFunc::Count, &[]), "0");
        assert_eq!(eval(AggregateFunc::Sum, &[""]), "0");
        assert_eq!(eval(AggregateFunc::Avg, &[]), "");
        assert_eq!(eval(AggregateFunc::Min, &[]), "");
    }

    #[test]
    fn test_having() {
        assert!(having_holds("85", CmpOp::Gt, "75").unwrap());
        assert!(!having_holds("70", CmpOp::Gt, "75").unwrap());
        assert!(having_holds("0.30000000000000004", CmpOp::Eq, "0.3").unwrap());
        assert!(!having_holds("", CmpOp::Ne, "1").unwrap());
        assert!(matches!(
            having_holds("1", CmpOp::Eq, "abc"),
            Err(DbError::Condition(_))
        ));
    }
}
