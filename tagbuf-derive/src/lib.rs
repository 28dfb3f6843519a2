//! Derive macro for tagbuf type descriptors.
//!
//! `#[derive(Described)]` implements `tagbuf_core::Described` for structs
//! with named fields and for enums with only unit variants. Enums also get
//! `tagbuf_core::DescribedEnum`.
//!
//! # Example
//!
//! ```ignore
//! use tagbuf_derive::Described;
//!
//! #[derive(Default, Described)]
//! #[tagbuf(name = "Person")]
//! struct Person {
//!     name: String,
//!     age: i32,
//!     #[tagbuf(rename = "emailAddress")]
//!     email: Option<String>,
//!     #[tagbuf(skip)]
//!     cached_len: usize,
//! }
//! ```

extern crate proc_macro;

mod described;

use proc_macro::TokenStream;

/// Derives `Described` for a struct or a fieldless enum.
///
/// # Attributes
///
/// ## Type-level
/// - `#[tagbuf(name = "...")]` sets the type name used for dynamic values
///   (defaults to the Rust identifier, or the full type name for generic
///   types).
/// - `#[tagbuf(custom)]` serializes the type with its own
///   `CustomSerializer<Self>` implementation.
/// - `#[tagbuf(custom = "path::Helper")]` serializes the type with
///   `Helper`'s `CustomSerializer<Self>` implementation.
///
/// ## Field-level
/// - `#[tagbuf(rename = "...")]` overrides the member name.
/// - `#[tagbuf(readonly)]` exposes the field without a setter.
/// - `#[tagbuf(skip)]` leaves the field out of the descriptor.
///
/// Every field type and type parameter must implement `Described`, and the
/// type itself must implement `Default`.
#[proc_macro_derive(Described, attributes(tagbuf))]
pub fn derive_described(input: TokenStream) -> TokenStream {
    described::derive_described_impl(input)
}
