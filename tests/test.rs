use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::{self, Rng};
use ranktree::{RbMap, RbTree};
use std::collections::BTreeMap;

const NUM_OPS: usize = 2000;

fn simulate(multiset: bool) {
    let mut rng = rand::thread_rng();
    let mut tree = RbTree::new();
    let mut shadow: Vec<i64> = vec![];
    for _ in 0..NUM_OPS {
        let sample = rng.gen::<f64>();
        if shadow.is_empty() || sample < 0.5 {
            let value = rng.gen_range(0, 64i64);
            if multiset {
                tree.insert_multi(value);
                shadow.push(value);
            } else {
                let displaced = tree.insert(value);
                assert_eq!(displaced.is_some(), shadow.contains(&value));
                if displaced.is_none() {
                    shadow.push(value);
                }
            }
            shadow.sort_unstable();
        } else if sample < 0.75 {
            let j = rng.gen_range(0, shadow.len());
            let value = shadow.remove(j);
            assert_eq!(tree.remove(&value), Ok(value));
        } else {
            let j = rng.gen_range(0, shadow.len());
            assert_eq!(tree.pop(j as isize), Ok(shadow.remove(j)));
        }
        tree.check().unwrap();
        assert_eq!(tree.len(), shadow.len());
        assert!(tree.iter().copied().eq(shadow.iter().copied()));
        if !shadow.is_empty() {
            let j = rng.gen_range(0, shadow.len());
            let value = shadow[j];
            assert_eq!(*tree.get(j as isize).unwrap(), value);
            let first = shadow.iter().position(|&x| x == value).unwrap();
            assert_eq!(tree.index_of(&value), Ok(first));
            assert!(tree.contains(&value));
        }
        assert!(!tree.contains(&-1));
    }
    // Drain what is left through the rank path
    while !tree.is_empty() {
        let j = rng.gen_range(0, shadow.len());
        assert_eq!(tree.pop(j as isize), Ok(shadow.remove(j)));
        tree.check().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simulate_sorted_set() {
    simulate(false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simulate_sorted_multiset() {
    simulate(true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simulate_sorted_map() {
    let mut rng = rand::thread_rng();
    let mut map = RbMap::new();
    let mut shadow = BTreeMap::new();
    let mut keys: Vec<u64> = vec![];
    for _ in 0..NUM_OPS {
        let sample = rng.gen::<f64>();
        if keys.is_empty() || sample < 0.4 {
            let key = rng.gen_range(0, 64u64);
            let value = rng.gen::<u64>();
            assert_eq!(map.insert(key, value), shadow.insert(key, value));
            if !keys.contains(&key) {
                keys.push(key);
            }
        } else if sample < 0.6 {
            let j = rng.gen_range(0, keys.len());
            let key = keys.swap_remove(j);
            assert_eq!(map.remove(&key).ok(), shadow.remove(&key));
        } else {
            let j = rng.gen_range(0, keys.len());
            let key = keys[j];
            let value = rng.gen::<u64>();
            *map.get_mut(&key).unwrap() = value;
            shadow.insert(key, value);
        }
        map.check().unwrap();
        assert_eq!(map.len(), shadow.len());
        assert!(map.iter().eq(shadow.iter()));
        assert!(map.keys().eq(shadow.keys()));
        assert!(map.values().eq(shadow.values()));
        if !shadow.is_empty() {
            let j = rng.gen_range(0, shadow.len());
            let (key, value) = shadow.iter().nth(j).unwrap();
            assert_eq!(map.get_index(j as isize), Ok((key, value)));
            assert_eq!(map.index_of_key(key), Ok(j));
            assert_eq!(map.get(key), Some(value));
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_simulate_cursor_delete() {
    let mut rng = rand::thread_rng();
    for _ in 0..20 {
        let mut values = (0..200i64)
            .map(|_| rng.gen_range(0, 100))
            .collect::<Vec<_>>();
        let mut tree = RbTree::new();
        tree.extend_multi(values.iter().copied());
        values.sort_unstable();
        assert!(tree.iter().copied().eq(values.iter().copied()));

        // Delete a random subset while walking the tree in order
        let keep = rng.gen_range(0, 100i64);
        let mut cursor = tree.cursor();
        while let Some(&value) = cursor.next() {
            if value >= keep {
                assert_eq!(cursor.delete(), Some(value));
            }
        }
        tree.check().unwrap();
        values.retain(|&value| value < keep);
        assert!(tree.iter().copied().eq(values.iter().copied()));

        // A full drain leaves the tree empty
        let mut cursor = tree.cursor();
        while cursor.next().is_some() {
            cursor.delete();
        }
        assert!(tree.is_empty());
        tree.check().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_random_shuffles_agree_on_order_and_hash() {
    let mut rng = rand::thread_rng();
    let mut values = (0..500u64).map(|_| rng.gen_range(0, 100)).collect::<Vec<_>>();
    let first: RbTree<u64> = values.iter().copied().collect();
    values.shuffle(&mut rng);
    let second: RbTree<u64> = values.iter().copied().collect();

    assert_eq!(first, second);
    assert_eq!(first.hash_value(), second.hash_value());
    assert!(first
        .iter()
        .copied()
        .eq(values.iter().copied().unique().sorted()));
    first.check().unwrap();
    second.check().unwrap();
}
