//! # Passport Photo
//!
//! Turns a front-facing portrait into a compliant passport photo: a square
//! canvas with the head scaled into the allowed height range, the eye line
//! inside its band, a white background, plus a printable sheet of copies.
//!
//! # Architecture: Downstream-Only Pipeline
//!
//! Every stage consumes the previous stage's immutable output:
//!
//! ```text
//! photo + landmarks ─► measure ─► normalize ─► compose ─┬─► overlay
//!                                                       ├─► compliance
//!                                                       └─► sheet
//! ```
//!
//! Measurement and placement are pure arithmetic on landmark coordinates, so
//! most of the crate is testable without decoding a single image. Pixels are
//! only touched by the compositor and the stages after it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`target`] | Physical requirements (`TargetSpec`) and the `PhotoVariant` tag |
//! | [`landmarks`] | Contract to the external face detector, JSON sidecar adapter |
//! | [`measure`] | Head height, eye line, chin and crown from landmarks |
//! | [`normalize`] | Scale and translation onto the canvas, `PlacementPolicy` strategies |
//! | [`compositor`] | Resampling onto the white canvas |
//! | [`overlay`] | Guide lines and millimeter labels on a preview copy |
//! | [`compliance`] | Advisory warnings about the finished composite |
//! | [`sheet`] | Copies of the composite on a 6x4 in print sheet |
//! | [`pipeline`] | One photo end to end, plus exports and JSON reports |
//! | [`batch`] | Every photo under a directory, in parallel |
//! | [`config`] | `config.toml` loading, validation and merging over stock defaults |
//! | [`types`] | `RunReport`, the JSON record of one run |
//! | [`imaging`] | Pure-Rust image I/O, resampling and raster helpers |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Landmarks From Outside
//!
//! Face detection is not part of this crate. Any detector that emits a
//! 468-point face mesh can feed it through the [`landmarks::LandmarkSource`]
//! trait; the CLI reads a JSON sidecar next to each photo. Given correct
//! landmarks, every result here is deterministic.
//!
//! ## Head Height Wins
//!
//! When head height and eye line cannot both be satisfied, the default
//! [`normalize::HeadHeightFirst`] policy keeps the head size and reports the
//! eye line as a warning. The choice is a strategy trait so a different
//! trade-off is a config change, not a code change.
//!
//! ## Warnings, Not Errors
//!
//! Only an unusable input (no face, broken landmarks, unreadable file) stops
//! a run. Everything about the photo itself, from clipped frames to white
//! shirts, is a [`compliance::Warning`] alongside a finished image.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, bicubic warping and encoding use the `image` and `imageproc`
//! crates. No system libraries, so the binary runs anywhere it compiles.

pub mod batch;
pub mod compliance;
pub mod compositor;
pub mod config;
pub mod imaging;
pub mod landmarks;
pub mod measure;
pub mod normalize;
pub mod output;
pub mod overlay;
pub mod pipeline;
pub mod sheet;
pub mod target;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
