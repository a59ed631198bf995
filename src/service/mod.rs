pub mod progress;
pub mod reorder;
pub mod unlock;

#[cfg(test)]
pub(crate) mod mock;
