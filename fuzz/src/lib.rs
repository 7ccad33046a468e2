use arbitrary::Arbitrary;
use rand::thread_rng;
use rand::Rng;
use ranktree::RbTree;
use std::fmt::Debug;

#[derive(Debug, Arbitrary, Clone, Copy)]
pub enum TreeAction<T: Copy> {
    Insert { value: T },
    InsertMulti { value: T },
    Remove,
    Pop,
    Find { value: T },
    Rank,
    Iter,
    CursorDelete,
}

pub fn perform_action<T: Copy + Ord + Debug>(
    tree: &mut RbTree<T>,
    shadow: &mut Vec<T>,
    action: TreeAction<T>,
) {
    let mut rng = thread_rng();
    match action {
        TreeAction::Insert { value } => {
            let displaced = tree.insert(value);
            assert_eq!(displaced.is_some(), shadow.contains(&value));
            if displaced.is_none() {
                shadow.push(value);
                shadow.sort_unstable();
            }
        }
        TreeAction::InsertMulti { value } => {
            tree.insert_multi(value);
            shadow.push(value);
            shadow.sort_unstable();
        }
        TreeAction::Remove => {
            if shadow.is_empty() {
                return;
            }
            let j = rng.gen_range(0, shadow.len());
            let value = shadow.remove(j);
            assert_eq!(tree.remove(&value).unwrap(), value);
        }
        TreeAction::Pop => {
            if shadow.is_empty() {
                return;
            }
            let j = rng.gen_range(0, shadow.len());
            assert_eq!(tree.pop(j as isize).unwrap(), shadow.remove(j));
        }
        TreeAction::Find { value } => {
            assert_eq!(tree.find(&value).is_some(), shadow.contains(&value));
        }
        TreeAction::Rank => {
            if shadow.is_empty() {
                return;
            }
            let j = rng.gen_range(0, shadow.len());
            let value = shadow[j];
            assert_eq!(*tree.get(j as isize).unwrap(), value);
            let first = shadow.iter().position(|&x| x == value).unwrap();
            assert_eq!(tree.index_of(&value).unwrap(), first);
        }
        TreeAction::Iter => {
            assert!(tree.iter().copied().eq(shadow.iter().copied()));
        }
        TreeAction::CursorDelete => {
            if shadow.is_empty() {
                return;
            }
            let j = rng.gen_range(0, shadow.len());
            let mut cursor = tree.cursor();
            for _ in 0..=j {
                cursor.next();
            }
            assert_eq!(cursor.delete(), Some(shadow.remove(j)));
        }
    }
}
