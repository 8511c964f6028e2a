pub mod invoice;
pub mod ldk;
pub mod node;
