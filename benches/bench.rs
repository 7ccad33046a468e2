#![feature(test)]

extern crate test;

#[cfg(test)]
mod bench_tests {
    use rand::{self, Rng};
    use ranktree::RbTree;
    use std::collections::BTreeSet;
    use test::Bencher;

    #[bench]
    fn bench_std_btree_set_insert_1000_u64(b: &mut Bencher) {
        let mut rng = rand::thread_rng();
        let mut s = BTreeSet::new();
        b.iter(|| {
            for _ in 0..1000 {
                s.insert(rng.gen::<u64>());
            }
        })
    }

    #[bench]
    fn bench_ranktree_insert_1000_u64(b: &mut Bencher) {
        let mut rng = rand::thread_rng();
        let mut t = RbTree::new();
        b.iter(|| {
            for _ in 0..1000 {
                t.insert(rng.gen::<u64>());
            }
        })
    }

    #[bench]
    fn bench_ranktree_insert_multi_1000_u64(b: &mut Bencher) {
        let mut rng = rand::thread_rng();
        let mut t = RbTree::new();
        b.iter(|| {
            for _ in 0..1000 {
                t.insert_multi(rng.gen_range(0, 64u64));
            }
        })
    }

    #[bench]
    fn bench_std_btree_set_nth_1000_u64(b: &mut Bencher) {
        let mut rng = rand::thread_rng();
        let s = (0..1000).map(|_| rng.gen::<u64>()).collect::<BTreeSet<_>>();
        let len = s.len();
        b.iter(|| {
            let mut acc = 0u64;
            for i in (0..len).step_by(7) {
                acc ^= *s.iter().nth(i).unwrap();
            }
            acc
        })
    }

    #[bench]
    fn bench_ranktree_get_by_rank_1000_u64(b: &mut Bencher) {
        let mut rng = rand::thread_rng();
        let t = (0..1000)
            .map(|_| rng.gen::<u64>())
            .collect::<RbTree<_>>();
        let len = t.len();
        b.iter(|| {
            let mut acc = 0u64;
            for i in (0..len).step_by(7) {
                acc ^= *t.get(i as isize).unwrap();
            }
            acc
        })
    }

    #[bench]
    fn bench_ranktree_insert_remove_1000_u64(b: &mut Bencher) {
        let mut rng = rand::thread_rng();
        let mut t = RbTree::new();
        b.iter(|| {
            let keys = (0..1000).map(|_| rng.gen::<u64>()).collect::<Vec<_>>();
            for k in keys.iter() {
                t.insert(*k);
            }
            for k in keys.iter() {
                let _ = t.remove(k);
            }
        })
    }
}
