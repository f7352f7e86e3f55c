//! Exact minimum-cost bipartite matching (Hungarian / Kuhn-Munkres).
//!
//! Integer rework of the classic scipy `linear_sum_assignment` routine:
//! costs are widened to `i64` so all reductions and comparisons are exact,
//! with no epsilon tests. The caller guarantees N <= M; every row receives
//! a column.

use nalgebra::DMatrix;

use super::AssignmentSolution;
use crate::distance::CostScalar;

/// Solve the assignment problem exactly, minimizing total cost.
///
/// Returns the bijection from all rows to a size-N subset of columns with
/// minimum total cost. `src_indices` is `0..N` in order. Deterministic.
pub(super) fn solve<T: CostScalar>(d: &DMatrix<T>) -> AssignmentSolution {
    let n_rows = d.nrows();
    let n_cols = d.ncols();
    if n_rows == 0 {
        return AssignmentSolution {
            src_indices: Vec::new(),
            tgt_indices: Vec::new(),
        };
    }

    // Pad to square. Dummy rows carry zero cost everywhere, so they absorb
    // the surplus columns without affecting which columns the real rows get.
    let n = n_rows.max(n_cols);
    let mut cost = vec![vec![0i64; n]; n];
    for i in 0..n_rows {
        for j in 0..n_cols {
            cost[i][j] = d[(i, j)].to_i64();
        }
    }

    // Step 1: subtract the row minimum from each row.
    for row in cost.iter_mut() {
        let row_min = row.iter().copied().min().unwrap_or(0);
        for v in row.iter_mut() {
            *v -= row_min;
        }
    }

    // Step 2: subtract the column minimum from each column.
    for j in 0..n {
        let col_min = (0..n).map(|i| cost[i][j]).min().unwrap_or(0);
        if col_min > 0 {
            for row in cost.iter_mut() {
                row[j] -= col_min;
            }
        }
    }

    let mut row_match: Vec<Option<usize>> = vec![None; n];
    let mut col_match: Vec<Option<usize>> = vec![None; n];

    // Seed the matching with independent zeros.
    for i in 0..n {
        for j in 0..n {
            if cost[i][j] == 0 && row_match[i].is_none() && col_match[j].is_none() {
                row_match[i] = Some(j);
                col_match[j] = Some(i);
            }
        }
    }

    loop {
        let unmatched_rows: Vec<usize> = (0..n).filter(|&i| row_match[i].is_none()).collect();
        if unmatched_rows.is_empty() {
            break;
        }

        // BFS over zero edges for an augmenting path.
        let mut found_augmenting = false;
        for &start_row in &unmatched_rows {
            let mut parent_col: Vec<Option<usize>> = vec![None; n];
            let mut visited_col = vec![false; n];
            let mut queue = std::collections::VecDeque::from([start_row]);
            let mut found_col: Option<usize> = None;

            'bfs: while let Some(row) = queue.pop_front() {
                for col in 0..n {
                    if !visited_col[col] && cost[row][col] == 0 {
                        visited_col[col] = true;
                        parent_col[col] = Some(row);

                        match col_match[col] {
                            None => {
                                found_col = Some(col);
                                break 'bfs;
                            }
                            Some(next_row) => queue.push_back(next_row),
                        }
                    }
                }
            }

            if let Some(mut col) = found_col {
                // Flip the alternating path to grow the matching by one.
                loop {
                    let row = parent_col[col].expect("augmenting path is rooted");
                    let prev_col = row_match[row];

                    row_match[row] = Some(col);
                    col_match[col] = Some(row);

                    match prev_col {
                        Some(pc) => col = pc,
                        None => break,
                    }
                }
                found_augmenting = true;
                break;
            }
        }

        if !found_augmenting {
            // No augmenting path: create new zeros. Cover the rows reachable
            // from unmatched rows through alternating paths and the columns
            // their zeros touch, then shift the minimum uncovered cost.
            let mut row_covered = vec![false; n];
            let mut col_covered = vec![false; n];

            for &start_row in &unmatched_rows {
                let mut stack = vec![start_row];
                while let Some(row) = stack.pop() {
                    if row_covered[row] {
                        continue;
                    }
                    row_covered[row] = true;

                    for col in 0..n {
                        if cost[row][col] == 0 && !col_covered[col] {
                            col_covered[col] = true;
                            if let Some(matched_row) = col_match[col] {
                                stack.push(matched_row);
                            }
                        }
                    }
                }
            }

            let mut min_val = i64::MAX;
            for i in 0..n {
                if row_covered[i] {
                    for j in 0..n {
                        if !col_covered[j] && cost[i][j] < min_val {
                            min_val = cost[i][j];
                        }
                    }
                }
            }

            // With integer costs and a square matrix there is always an
            // uncovered positive entry while rows remain unmatched.
            debug_assert!(min_val > 0 && min_val < i64::MAX);

            for i in 0..n {
                for j in 0..n {
                    if row_covered[i] && !col_covered[j] {
                        cost[i][j] -= min_val;
                    } else if !row_covered[i] && col_covered[j] {
                        cost[i][j] += min_val;
                    }
                }
            }
        }
    }

    let tgt_indices: Vec<usize> = row_match
        .iter()
        .take(n_rows)
        .map(|m| m.expect("square matrix assignment is total"))
        .collect();

    AssignmentSolution {
        src_indices: (0..n_rows).collect(),
        tgt_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_cost(d: &DMatrix<u8>, tgt: &[usize]) -> i64 {
        tgt.iter()
            .enumerate()
            .map(|(i, &j)| d[(i, j)] as i64)
            .sum()
    }

    /// Enumerate every injective row -> column mapping and return the best
    /// total cost. Only usable for tiny matrices.
    fn brute_force_best(d: &DMatrix<u8>) -> i64 {
        fn recurse(d: &DMatrix<u8>, row: usize, used: &mut Vec<bool>, acc: i64, best: &mut i64) {
            if row == d.nrows() {
                *best = (*best).min(acc);
                return;
            }
            for j in 0..d.ncols() {
                if !used[j] {
                    used[j] = true;
                    recurse(d, row + 1, used, acc + d[(row, j)] as i64, best);
                    used[j] = false;
                }
            }
        }

        let mut best = i64::MAX;
        recurse(d, 0, &mut vec![false; d.ncols()], 0, &mut best);
        best
    }

    fn assert_valid_bijection(sol: &AssignmentSolution, n: usize, m: usize) {
        assert_eq!(sol.src_indices, (0..n).collect::<Vec<_>>());
        assert_eq!(sol.tgt_indices.len(), n);
        let mut seen = vec![false; m];
        for &j in &sol.tgt_indices {
            assert!(j < m, "column index {} out of range", j);
            assert!(!seen[j], "column index {} assigned twice", j);
            seen[j] = true;
        }
    }

    // ===== Known-answer tests =====

    #[test]
    fn test_basic_square() {
        let d = DMatrix::from_row_slice(3, 3, &[4, 1, 3, 2, 0, 5, 3, 2, 2]);
        let sol = solve(&d);

        assert_valid_bijection(&sol, 3, 3);
        // Optimal: (0,1)=1 + (1,0)=2 + (2,2)=2 = 5
        assert_eq!(total_cost(&d, &sol.tgt_indices), 5);
    }

    #[test]
    fn test_greedy_trap() {
        // Row-by-row greedy would take (0,0)=1 then pay 4 + 9 = 14; the
        // optimum takes the anti-diagonal for 10.
        let d = DMatrix::from_row_slice(3, 3, &[1, 2, 3, 2, 4, 6, 3, 6, 9]);
        let sol = solve(&d);

        assert_eq!(total_cost(&d, &sol.tgt_indices), brute_force_best(&d));
    }

    #[test]
    fn test_single_element() {
        let d = DMatrix::from_row_slice(1, 1, &[3u8]);
        let sol = solve(&d);
        assert_eq!(sol.src_indices, vec![0]);
        assert_eq!(sol.tgt_indices, vec![0]);
    }

    #[test]
    fn test_empty() {
        let d = DMatrix::<u8>::zeros(0, 0);
        let sol = solve(&d);
        assert!(sol.is_empty());
    }

    #[test]
    fn test_all_zero_costs() {
        let d = DMatrix::<u8>::zeros(3, 3);
        let sol = solve(&d);
        assert_valid_bijection(&sol, 3, 3);
        assert_eq!(total_cost(&d, &sol.tgt_indices), 0);
    }

    // ===== Rectangular matrices (N < M) =====

    #[test]
    fn test_rectangular_picks_cheap_columns() {
        let d = DMatrix::from_row_slice(2, 4, &[9u8, 9, 1, 9, 9, 9, 9, 2]);
        let sol = solve(&d);

        assert_valid_bijection(&sol, 2, 4);
        assert_eq!(sol.tgt_indices, vec![2, 3]);
    }

    #[test]
    fn test_u16_costs() {
        let d = DMatrix::from_row_slice(2, 2, &[1000u16, 2u16, 2u16, 1000u16]);
        let sol = solve(&d);
        assert_eq!(sol.tgt_indices, vec![1, 0]);
    }

    // ===== Brute-force cross-checks =====

    #[test]
    fn test_optimal_against_brute_force_square() {
        // Deterministic pseudo-random costs; N = 5 keeps 5! enumeration fast.
        let d = DMatrix::from_fn(5, 5, |i, j| ((i * 37 + j * 91 + 13) % 101) as u8);
        let sol = solve(&d);

        assert_valid_bijection(&sol, 5, 5);
        assert_eq!(total_cost(&d, &sol.tgt_indices), brute_force_best(&d));
    }

    #[test]
    fn test_optimal_against_brute_force_rectangular() {
        let d = DMatrix::from_fn(4, 6, |i, j| ((i * 53 + j * 29 + 7) % 97) as u8);
        let sol = solve(&d);

        assert_valid_bijection(&sol, 4, 6);
        assert_eq!(total_cost(&d, &sol.tgt_indices), brute_force_best(&d));
    }
}
