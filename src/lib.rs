pub mod error;
pub mod node_allocator;
pub mod rb_tree;
pub mod sorted_map;

pub use error::TreeError;
pub use error::TreeResult;
pub use node_allocator::NodeAllocator;
pub use node_allocator::SENTINEL;

pub use rb_tree::Color;
pub use rb_tree::Cursor;
pub use rb_tree::RbTree;
pub use sorted_map::MapEntry;
pub use sorted_map::RbMap;
