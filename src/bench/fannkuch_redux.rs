use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

fn max(a: Tracked<i32>, b: Tracked<i32>) -> Tracked<i32> {
    if a.value() > b.value() {
        a
    } else {
        b
    }
}

/// Maximum flip count over all permutations of `0..n`. Elements at indices
/// `0, 3, 6, ...` of the starting permutation are sourced.
pub fn fannkuch_redux(store: &mut HostStore, n: usize) -> Result<i32, TaintError> {
    if n == 0 {
        return Ok(0);
    }
    let mut perm1: Vec<Tracked<i32>> = (0..n as i32).map(Tracked::new).collect();
    for i in (0..n).step_by(3) {
        perm1[i] = store.source(perm1[i]);
    }
    let mut perm = perm1.clone();
    let mut count = vec![0usize; n];
    let mut max_flips_count = Tracked::new(0);
    let mut perm_count = 0u64;
    let mut checksum = Tracked::new(0);
    let mut r = n;

    loop {
        while r != 1 {
            count[r - 1] = r;
            r -= 1;
        }

        perm.copy_from_slice(&perm1);
        let mut flips_count = store.source_value(0);

        loop {
            let k = perm[0];
            if *k.value() == 0 {
                break;
            }
            let k2 = (*k.value() + 1) >> 1;
            for i in 0..k2 {
                let mirror = (k - i).map(|m| m as usize);
                let Some(swapped) = Tracked::index(&perm, mirror) else {
                    break;
                };
                let temp = perm[i as usize];
                perm[i as usize] = swapped;
                perm[*mirror.value()] = temp;
            }
            flips_count += 1;
            store.assert_is_tainted(&flips_count)?;
        }

        max_flips_count = max(max_flips_count, flips_count);
        if perm_count % 2 == 0 {
            checksum += flips_count;
        } else {
            checksum -= flips_count;
        }
        if max_flips_count.value() == flips_count.value() {
            store.assert_is_tainted(&checksum)?;
        }

        // next permutation by incremental rotation
        loop {
            if r == n {
                for (idx, elem) in perm1.iter().enumerate() {
                    if idx % 3 == 0 {
                        store.assert_is_tainted(elem)?;
                    } else {
                        store.assert_is_not_tainted(elem)?;
                    }
                }
                return Ok(store.sanitize(max_flips_count).into_inner());
            }
            let perm0 = perm1[0];
            perm1.copy_within(1..=r, 0);
            perm1[r] = perm0;
            count[r] -= 1;
            if count[r] > 0 {
                break;
            }
            r += 1;
        }
        perm_count += 1;
    }
}

pub fn benchmark(store: &mut HostStore, n: i32) -> Result<i64, TaintError> {
    fannkuch_redux(store, n.max(0) as usize).map(i64::from)
}
