#![no_main]
use libfuzzer_sys::fuzz_target;
use ranktree::RbTree;
use ranktree_fuzz::{perform_action, TreeAction};

fuzz_target!(|actions: Vec<TreeAction<u64>>| {
    let mut tree = RbTree::<u64>::default();
    let mut shadow = Vec::new();
    for action in actions {
        perform_action(&mut tree, &mut shadow, action);
        tree.check().unwrap();
    }
});
