//! Berlekamp-Welch decoding over GF(2^8).
//!
//! Column by column, the shards of an [`ErasureCodec`](crate::ErasureCodec)
//! are evaluations of one polynomial of degree `< k` at `x = shard index`.
//! Given `m` such points of which at most `(m - k) / 2` are wrong,
//! [`decode`] recovers the polynomial without knowing which ones.

use reed_solomon_erasure::galois_8::{add, div, mul};

/// Evaluate `poly` (lowest degree first) at `x`.
pub fn evaluate(poly: &[u8], x: u8) -> u8 {
    poly.iter().rev().fold(0, |acc, coefficient| add(mul(acc, x), *coefficient))
}

/// The polynomial of degree `< k` through all but at most
/// `(points.len() - k) / 2` of `points`, lowest degree first.
///
/// Returns `None` when the points are too far from any such polynomial.
/// The `x` coordinates must be distinct.
pub fn decode(points: &[(u8, u8)], k: usize) -> Option<Vec<u8>> {
    if k == 0 || points.len() < k {
        return None;
    }
    let errors = (points.len() - k) / 2;
    let q_len = errors + k;
    let unknowns = q_len + errors;

    // Q(x) = y * E(x) with E monic of degree `errors`. In characteristic 2
    // the E terms move to the left without a sign change:
    // sum q_j x^j + sum y e_j x^j = y x^errors.
    let mut rows: Vec<Vec<u8>> = points
        .iter()
        .map(|&(x, y)| {
            let mut row = Vec::with_capacity(unknowns + 1);
            let mut power = 1u8;
            for _ in 0..q_len {
                row.push(power);
                power = mul(power, x);
            }
            let mut power = 1u8;
            for _ in 0..errors {
                row.push(mul(y, power));
                power = mul(power, x);
            }
            row.push(mul(y, power));
            row
        })
        .collect();

    let solution = solve(&mut rows, unknowns)?;
    let mut locator = solution[q_len..].to_vec();
    locator.push(1);
    let (quotient, remainder) = divide_monic(&solution[..q_len], &locator);
    if remainder.iter().any(|c| *c != 0) {
        return None;
    }
    Some(quotient)
}

/// Gauss-Jordan elimination on an augmented matrix. Free variables are
/// set to zero.
fn solve(rows: &mut [Vec<u8>], unknowns: usize) -> Option<Vec<u8>> {
    let mut pivots = Vec::with_capacity(unknowns);
    let mut rank = 0;
    for column in 0..unknowns {
        if rank == rows.len() {
            break;
        }
        let Some(found) = (rank..rows.len()).find(|&r| rows[r][column] != 0) else {
            continue;
        };
        rows.swap(rank, found);
        let inverse = div(1, rows[rank][column]);
        for value in rows[rank][column..].iter_mut() {
            *value = mul(*value, inverse);
        }
        let pivot = rows[rank].clone();
        for (r, row) in rows.iter_mut().enumerate() {
            let factor = row[column];
            if r == rank || factor == 0 {
                continue;
            }
            for (value, p) in row[column..].iter_mut().zip(&pivot[column..]) {
                *value = add(*value, mul(factor, *p));
            }
        }
        pivots.push(column);
        rank += 1;
    }

    if rows[rank..].iter().any(|row| row[unknowns] != 0) {
        return None;
    }
    let mut solution = vec![0u8; unknowns];
    for (row, column) in pivots.into_iter().enumerate() {
        solution[column] = rows[row][unknowns];
    }
    Some(solution)
}

/// Long division by a monic `divisor`.
fn divide_monic(dividend: &[u8], divisor: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let degree = divisor.len().saturating_sub(1);
    let mut remainder = dividend.to_vec();
    if remainder.len() <= degree {
        return (Vec::new(), remainder);
    }
    let mut quotient = vec![0u8; remainder.len() - degree];
    for i in (0..quotient.len()).rev() {
        let coefficient = remainder[i + degree];
        quotient[i] = coefficient;
        if coefficient != 0 {
            for (j, d) in divisor.iter().enumerate() {
                remainder[i + j] = add(remainder[i + j], mul(coefficient, *d));
            }
        }
    }
    remainder.truncate(degree);
    (quotient, remainder)
}
