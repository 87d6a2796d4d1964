//! Linear secret sharing over `Z_p`: share generation and reconstruction coefficients.

use alloc::vec;
use alloc::vec::Vec;

use crate::curve::CurveScalar;

/// Computes the shares `lambda = M * v`.
pub(crate) fn shares(matrix: &[Vec<CurveScalar>], v: &[CurveScalar]) -> Vec<CurveScalar> {
    matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(v.iter())
                .fold(CurveScalar::zero(), |acc, (m, x)| &acc + &(m * x))
        })
        .collect()
}

/// Finds `alpha` such that `sum_i alpha_i * rows[i] = (1, 0, ..., 0)`,
/// i.e. solves `rows^T * alpha = e_1` by Gauss-Jordan elimination mod `p`.
///
/// Free variables are set to zero. Returns `None` if the target vector
/// is not in the span of `rows`, or if `rows` is empty.
pub fn reconstruction_coefficients(
    rows: &[&[CurveScalar]],
    cols: usize,
) -> Option<Vec<CurveScalar>> {
    let unknowns = rows.len();
    if unknowns == 0 || cols == 0 {
        return None;
    }

    // Augmented system: one equation per column of the policy matrix.
    let mut system: Vec<Vec<CurveScalar>> = (0..cols)
        .map(|j| {
            let mut equation: Vec<CurveScalar> = rows
                .iter()
                .map(|row| row.get(j).copied().unwrap_or_default())
                .collect();
            equation.push(if j == 0 {
                CurveScalar::one()
            } else {
                CurveScalar::zero()
            });
            equation
        })
        .collect();

    let mut pivot_columns = Vec::with_capacity(unknowns.min(cols));
    let mut rank = 0;
    for column in 0..unknowns {
        if rank == cols {
            break;
        }
        let pivot = match (rank..cols).find(|&i| !system[i][column].is_zero()) {
            Some(pivot) => pivot,
            None => continue,
        };
        system.swap(rank, pivot);

        let inverse = system[rank][column].invert()?;
        for entry in system[rank].iter_mut() {
            *entry = &*entry * &inverse;
        }

        let pivot_row = system[rank].clone();
        for (i, equation) in system.iter_mut().enumerate() {
            if i == rank || equation[column].is_zero() {
                continue;
            }
            let factor = equation[column];
            for (entry, pivot_entry) in equation.iter_mut().zip(pivot_row.iter()) {
                *entry = &*entry - &(&factor * pivot_entry);
            }
        }

        pivot_columns.push(column);
        rank += 1;
    }

    // Remaining equations have all-zero coefficients; a non-zero right side means no solution.
    if system[rank..].iter().any(|equation| !equation[unknowns].is_zero()) {
        return None;
    }

    let mut alpha = vec![CurveScalar::zero(); unknowns];
    for (equation, &column) in system.iter().zip(pivot_columns.iter()) {
        alpha[column] = equation[unknowns];
    }
    Some(alpha)
}

#[cfg(test)]
mod tests {

    use alloc::vec;
    use alloc::vec::Vec;

    use super::{reconstruction_coefficients, shares};
    use crate::curve::CurveScalar;

    fn matrix(rows: &[&[i64]]) -> Vec<Vec<CurveScalar>> {
        rows.iter()
            .map(|row| row.iter().map(|&x| CurveScalar::from_i64(x)).collect())
            .collect()
    }

    fn solve(m: &[Vec<CurveScalar>], cols: usize) -> Option<Vec<CurveScalar>> {
        let rows: Vec<&[CurveScalar]> = m.iter().map(|row| row.as_slice()).collect();
        reconstruction_coefficients(&rows, cols)
    }

    fn check(m: &[Vec<CurveScalar>], alpha: &[CurveScalar], cols: usize) {
        for j in 0..cols {
            let sum = m
                .iter()
                .zip(alpha.iter())
                .fold(CurveScalar::zero(), |acc, (row, a)| &acc + &(&row[j] * a));
            let expected = if j == 0 {
                CurveScalar::one()
            } else {
                CurveScalar::zero()
            };
            assert_eq!(sum, expected);
        }
    }

    #[test]
    fn and_gate() {
        // A AND B
        let m = matrix(&[&[1, 1], &[0, -1]]);
        let alpha = solve(&m, 2).unwrap();
        check(&m, &alpha, 2);
        assert_eq!(alpha, vec![CurveScalar::one(), CurveScalar::one()]);

        // Only A
        assert!(solve(&m[..1], 2).is_none());
        // Only B
        assert!(solve(&m[1..], 2).is_none());
    }

    #[test]
    fn or_gate() {
        // A OR B
        let m = matrix(&[&[1], &[1]]);
        let alpha = solve(&m[1..], 1).unwrap();
        check(&m[1..], &alpha, 1);

        // Both rows: one coefficient is free and set to zero.
        let alpha = solve(&m, 1).unwrap();
        check(&m, &alpha, 1);
        assert_eq!(alpha[1], CurveScalar::zero());
    }

    #[test]
    fn nested_policy() {
        // (A AND B) OR (C AND D)
        let m = matrix(&[&[1, 1, 0], &[0, -1, 0], &[1, 0, 1], &[0, 0, -1]]);

        let cd: Vec<_> = m[2..].to_vec();
        let alpha = solve(&cd, 3).unwrap();
        check(&cd, &alpha, 3);

        let ac = vec![m[0].clone(), m[2].clone()];
        assert!(solve(&ac, 3).is_none());

        let alpha = solve(&m, 3).unwrap();
        check(&m, &alpha, 3);
    }

    #[test]
    fn empty_input() {
        assert!(solve(&[], 2).is_none());
    }

    #[test]
    fn shares_reconstruct_secret() {
        let m = matrix(&[&[1, 1, 0], &[0, -1, 1], &[0, 0, -1]]);
        let v = vec![
            CurveScalar::from_i64(11),
            CurveScalar::from_i64(22),
            CurveScalar::from_i64(33),
        ];
        let lambda = shares(&m, &v);
        let alpha = solve(&m, 3).unwrap();
        let secret = lambda
            .iter()
            .zip(alpha.iter())
            .fold(CurveScalar::zero(), |acc, (l, a)| &acc + &(l * a));
        assert_eq!(secret, v[0]);
    }
}
