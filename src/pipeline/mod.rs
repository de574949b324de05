//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one step. Only the exporter needs a
//! browser; everything before it is plain text processing and is testable
//! without one.
//!
//! ## Data Flow
//!
//! ```text
//! path ──▶ load ──▶ render ──▶ inject ──▶ export ──▶ file.pdf
//!          (fs)    (markdown)  (script)   (engine)
//! ```
//!
//! 1. [`load`]   — read the source file; the only filesystem read
//! 2. [`render`] — markdown → HTML page with stylesheet and heading ids;
//!    diagram blocks stay code blocks
//! 3. [`inject`] — the script that turns those blocks into diagrams inside
//!    the page and raises the completion signal
//! 4. [`export`] — load the page in the engine, wait for the signal (bounded),
//!    paginate, and write the PDF atomically

pub mod export;
pub mod inject;
pub mod load;
pub mod render;
