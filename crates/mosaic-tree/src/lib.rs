//! Mosaic component tree model
//!
//! A page is a forest of nested, parameterized component instances: roots
//! live in named regions, children hang off named slots, and every input
//! value is declared through a typed prop source.
//!
//! # Core Concepts
//!
//! - [`ComponentTree`]: UUID-addressed forest plus its prop-source model map
//! - [`TreeMutation`]: validated insert / move / duplicate / delete /
//!   reorder / shift operations that never partially apply
//! - [`PropSource`]: closed sum of `Static` / `Dynamic` / `Adapted` input
//!   origins
//! - [`ComponentRegistry`]: slot declarations mutations are validated
//!   against
//! - [`TreePath`]: `(slot, index)` segments addressing nodes and insertion
//!   points
//! - [`WireNode`]: the flat ordered array exchanged with clients
//!
//! # Example
//!
//! ```rust
//! use mosaic_tree::{
//!     ComponentDefinition, ComponentRegistry, ComponentTree, NodeTemplate,
//!     TreeMutation, TreePath,
//! };
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register(ComponentDefinition::new("hero", "1.0.0"));
//!
//! let mut tree = ComponentTree::new();
//! let uuid = TreeMutation::Insert {
//!     template: NodeTemplate::new("hero", "1.0.0"),
//!     at: TreePath::region("content", 0),
//!     pinned_uuid: None,
//! }
//! .apply(&mut tree, &registry)
//! .unwrap()
//! .unwrap();
//!
//! assert!(tree.contains(uuid));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod mutation;
mod path;
mod registry;
mod source;
mod tree;
mod wire;

pub use error::TreeError;
pub use mutation::{NodeTemplate, TreeMutation};
pub use path::{PathSegment, ShiftDirection, TreePath};
pub use registry::{ComponentDefinition, ComponentRegistry};
pub use source::{canonical_default, cast_scalar, PropSource, MAX_SOURCE_DEPTH};
pub use tree::{ComponentTree, ParentRef, TreeNode};
pub use wire::WireNode;
