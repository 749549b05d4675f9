//! SIMD-vectorized alignment of short-read batches to variant graphs.
//!
//! varlign aligns groups of equal-length nucleotide reads against a directed
//! acyclic sequence graph (a reference augmented with variant alternatives).
//! Reads are interleaved across SIMD lanes so one dynamic-programming sweep
//! scores a whole group at once; the graph is walked in topological order and
//! the final matrix column of every node is carried into its successors.
//!
//! ## Architecture
//!
//! - [`simd_abstraction`]: portable SIMD layer. 128-bit engines (SSE on
//!   x86_64, NEON on aarch64) and AVX2 engines (x86_64), for 8-bit and
//!   16-bit score lanes.
//! - [`align`]: the aligner itself — read packaging, seed propagation, the
//!   DP kernel, and best/second-best tracking.
//! - [`graph`]: the in-memory node container the aligner consumes.
//! - [`scoring`]: score profiles and the results record.
//!
//! ## Usage
//!
//! ```
//! use varlign::align::Aligner;
//! use varlign::graph::Graph;
//! use varlign::scoring::ScoreProfile;
//!
//! let mut g = Graph::new();
//! let a = g.add_node(3, "AAA");
//! let b = g.add_node(7, "CGTT");
//! g.add_edge(a, b);
//! g.seal();
//!
//! let mut aligner = Aligner::new(4, ScoreProfile::new(2, 2, 3, 1)).unwrap();
//! let reads = ["AACG", "ACGT"];
//! let res = aligner.align(&reads, &g).unwrap();
//! assert_eq!(res.max_score[1], 8);
//! ```
//!
//! Alignment is local (Smith-Waterman) or end-to-end depending on the
//! aligner type; see the aliases in [`align`]. Scores in end-to-end mode are
//! biased internally to fit the narrow lanes and reported relative to zero.

pub mod align;
pub mod base;
pub mod error;
pub mod graph;
pub mod scoring;
pub mod simd_abstraction;

pub use align::{Aligner, AlignerEte, WordAligner, WordAlignerEte};
pub use base::Base;
pub use error::AlignError;
pub use graph::{Graph, Node};
pub use scoring::{Results, ScoreProfile};
