//! Client session scoping

pub mod group;

pub use group::Group;
