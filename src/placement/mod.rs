//! Placement Resolution
//!
//! Pure functions deciding where data lives:
//!
//! - **`shard_index`**: maps a file path to the shard column that owns it
//!   within every replication group.
//! - **`assign_grid`**: carves a replication x distribution grid out of the
//!   pool of live node addresses.
//!
//! Both must be deterministic given their inputs; `shard_index` additionally
//! has to agree across processes and restarts, which is why it hashes with
//! blake3 instead of the runtime-seeded std hasher.

use crate::error::{Result, StoreError};
use std::collections::BTreeSet;

/// Resolves the shard column `[0, distribution)` owning `path`.
///
/// An explicit target (the `target` query parameter of a write) bypasses the
/// hash after range validation. Otherwise the low 128 bits of blake3(path)
/// are reduced modulo the distribution factor.
pub fn shard_index(path: &str, distribution: usize, explicit: Option<usize>) -> Result<usize> {
    if distribution == 0 {
        return Err(StoreError::NotAcceptable(
            "distribution factor must be at least 1".to_string(),
        ));
    }

    if let Some(target) = explicit {
        if target >= distribution {
            return Err(StoreError::NotAcceptable(format!(
                "shard target {} out of range 0..{}",
                target, distribution
            )));
        }
        return Ok(target);
    }

    let digest = blake3::hash(path.as_bytes());
    let mut low = [0u8; 16];
    low.copy_from_slice(&digest.as_bytes()[..16]);
    let hash = u128::from_le_bytes(low);

    Ok((hash % distribution as u128) as usize)
}

/// Assigns an `replication x distribution` grid from the live node pool.
///
/// Every candidate address is ranked by a hash seeded with a single random
/// salt drawn per call, then the grid is filled row-major in rank order, so
/// no address is used twice. The ranking is *not* a consistent-hashing ring:
/// a later call over a changed pool may reshuffle everything. Grids are
/// immutable once assigned, so that is acceptable.
pub fn assign_grid(
    live_nodes: &[String],
    replication: usize,
    distribution: usize,
) -> Result<Vec<Vec<String>>> {
    if replication == 0 || distribution == 0 {
        return Err(StoreError::NotAcceptable(
            "replication and distribution factors must be at least 1".to_string(),
        ));
    }

    let distinct: BTreeSet<&String> = live_nodes.iter().collect();
    let needed = replication * distribution;
    if distinct.len() < needed {
        return Err(StoreError::NotAcceptable(format!(
            "need {} live nodes for a {}x{} grid, have {}",
            needed,
            replication,
            distribution,
            distinct.len()
        )));
    }

    let salt: u64 = rand::random();
    let mut ranked: Vec<(u128, &String)> = distinct
        .into_iter()
        .map(|addr| (salted_rank(salt, addr), addr))
        .collect();
    ranked.sort();

    let mut consumed = ranked.iter().map(|(_, addr)| (*addr).clone());
    let grid = (0..replication)
        .map(|_| (0..distribution).filter_map(|_| consumed.next()).collect())
        .collect();

    Ok(grid)
}

fn salted_rank(salt: u64, addr: &str) -> u128 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&salt.to_le_bytes());
    hasher.update(addr.as_bytes());
    let digest = hasher.finalize();
    let mut low = [0u8; 16];
    low.copy_from_slice(&digest.as_bytes()[..16]);
    u128::from_le_bytes(low)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("10.0.0.{}:9000", i)).collect()
    }

    #[test]
    fn shard_index_is_deterministic_and_in_range() {
        for d in 1..=16 {
            for i in 0..200 {
                let path = format!("dir/sub/file_{}.bin", i);
                let first = shard_index(&path, d, None).unwrap();
                let second = shard_index(&path, d, None).unwrap();
                assert_eq!(first, second, "same path must map to the same shard");
                assert!(first < d, "shard {} out of range 0..{}", first, d);
            }
        }
    }

    #[test]
    fn shard_index_spreads_paths_across_shards() {
        let d = 8;
        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            seen.insert(shard_index(&format!("f{}", i), d, None).unwrap());
        }
        assert_eq!(seen.len(), d, "1000 paths should hit all {} shards", d);
    }

    #[test]
    fn explicit_target_wins_when_valid() {
        assert_eq!(shard_index("whatever", 4, Some(2)).unwrap(), 2);
    }

    #[test]
    fn explicit_target_out_of_range_is_rejected() {
        let err = shard_index("whatever", 4, Some(4)).unwrap_err();
        assert!(matches!(err, StoreError::NotAcceptable(_)));
    }

    #[test]
    fn assign_grid_uses_every_address_at_most_once() {
        let pool = addrs(10);
        let grid = assign_grid(&pool, 2, 3).unwrap();

        assert_eq!(grid.len(), 2);
        let mut seen = std::collections::HashSet::new();
        for row in &grid {
            assert_eq!(row.len(), 3);
            for addr in row {
                assert!(pool.contains(addr));
                assert!(seen.insert(addr.clone()), "{} assigned twice", addr);
            }
        }
    }

    #[test]
    fn assign_grid_exact_pool_size() {
        let grid = assign_grid(&addrs(4), 2, 2).unwrap();
        let total: usize = grid.iter().map(|row| row.len()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn assign_grid_fails_with_too_few_nodes() {
        let err = assign_grid(&addrs(3), 2, 2).unwrap_err();
        assert!(matches!(err, StoreError::NotAcceptable(_)));
    }

    #[test]
    fn assign_grid_ignores_duplicate_addresses_in_pool() {
        let mut pool = addrs(2);
        pool.push(pool[0].clone());
        // 3 entries but only 2 distinct addresses: a 2x2 grid cannot fit.
        let err = assign_grid(&pool, 2, 2).unwrap_err();
        assert!(matches!(err, StoreError::NotAcceptable(_)));
    }
}
