//! Pure text and URL helpers
//!
//! Small stateless transforms shared by the extraction, rendering and
//! template layers: HTML escaping, tag stripping, entity decoding and
//! URL joining.

mod html;
mod url;

pub use html::*;
pub use url::*;
