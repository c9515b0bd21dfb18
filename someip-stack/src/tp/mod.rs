//! SOME/IP transport protocol: segmentation of oversize messages and their
//! reassembly on the receiving side

mod reassembly;
mod segmenter;

pub use reassembly::{ReassemblyKey, Reassembler};
pub use segmenter::{needs_segmentation, segment, Segmenter};
