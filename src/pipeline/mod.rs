//! Pipeline stages for roster-to-QR-sheet generation.
//!
//! Each submodule implements exactly one step. The two rendering
//! capabilities sit behind traits ([`encode::SymbolEncoder`],
//! [`layout::DocumentBuilder`]) so the layout engine can be exercised with
//! recording fakes and the backends swapped without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ tree ──▶ extract ──▶ capabilities ──▶ layout ──▶ filename
//! (path/URL) (html5ever) (selectors)  (join-load)  (encode+render)
//! ```
//!
//! 1. [`input`]  : read a saved page or download it
//! 2. [`tree`]   : parse markup into a queryable [`tree::DocumentTree`]
//! 3. [`extract`]: first-match selector chain, filter, dedup, sort
//! 4. [`capabilities`]: prepare encoder and builder concurrently
//! 5. [`layout`] : place one symbol and two labels per grid cell; drives
//!    [`encode`] (QR rasterisation in `spawn_blocking`) and [`render`]
//!    (PDF assembly)
//! 6. [`filename`]: derive the output file stem from title and date

pub mod capabilities;
pub mod encode;
pub mod extract;
pub mod filename;
pub mod input;
pub mod layout;
pub mod render;
pub mod tree;
