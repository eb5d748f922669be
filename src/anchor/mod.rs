//! Anchor encoding and resolution
//!
//! # Overview
//!
//! A highlight is stored as an [`Anchor`]: the selected text, some context,
//! and [`StructuralAddress`]es of the nodes around it. The pieces:
//!
//! - [`PathCodec`] converts nodes to addresses relative to the content root
//!   and back.
//! - [`TextLocator`] finds nodes by their text or by surrounding context.
//! - [`AnchorBuilder`] turns a selection into an anchor and wraps it.
//! - [`AnchorResolver`] finds a stored anchor again and re-creates its marker.
//! - [`HighlightSet`] tracks what is materialized so re-applying is a no-op.
//!
//! All tree walks go through [`crate::dom::DocumentTree`]; only wrapping and
//! clearing need the mutable [`crate::dom::Document`].

mod builder;
mod error;
mod highlight_set;
mod kind;
mod locate;
mod path;
mod resolver;
mod types;

pub use builder::AnchorBuilder;
pub use error::AnchorError;
pub use highlight_set::{HighlightSet, Materialized};
pub use kind::{AnchorKind, KindOps};
pub use locate::{find_loose, ContextBand, TextLocator};
pub use path::PathCodec;
pub use resolver::{AnchorFailure, AnchorResolver, Resolution, ResolveReport, Strategy};
pub use types::{AddressStep, Anchor, StructuralAddress};
