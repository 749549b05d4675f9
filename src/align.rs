//! The SIMD graph aligner.
//!
//! Reads are grouped into batches of [`SimdEngine::LANES`] and interleaved so
//! that lane `i` of every vector belongs to read `i`; one sweep of the
//! dynamic-programming kernel then scores the whole group. The graph is
//! walked in topological order: each node's final score column and
//! read-insertion column (a seed) are stored under the node's id, and a
//! successor starts from the lane-wise max over its predecessors' seeds.
//! Nodes where all paths converge flush the seed store, bounding memory by
//! the number of branches in flight.
//!
//! Local (Smith-Waterman) and end-to-end alignment share the kernel; the
//! mode is a compile-time flag so the per-cell path carries no branch. In
//! end-to-end mode scores are biased upward so the narrow lanes cover both
//! the most negative and most positive attainable values; reported scores
//! have the bias removed.
//!
//! All working buffers live on the aligner and are reused across groups and
//! calls. An aligner is cheap to reuse but not shareable; for thread-level
//! parallelism give each thread its own instance, or use
//! [`align_groups_parallel`].

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::base::Base;
use crate::error::AlignError;
use crate::graph::{Graph, Node};
use crate::scoring::{Results, ScoreProfile, DEFAULT_TOL_FACTOR, TARGET_SCORE_UNDEFINED};
use crate::simd_abstraction::{Engine128B, Engine128W, LaneScalar, SimdEngine};

#[cfg(target_arch = "x86_64")]
use crate::simd_abstraction::{Engine256B, Engine256W};

/// One-shot latch for the end-to-end saturation warning.
static SATURATION_WARNED: AtomicBool = AtomicBool::new(false);

/// A packaged batch of reads.
///
/// `vector(p)` holds base `p` of every read in the group: lane `i` is read
/// `i`'s base at offset `p`. Groups smaller than the lane count are padded
/// with [`Base::N`], which pays the ambiguity penalty everywhere and is
/// sliced off the results.
pub struct AlignmentGroup<E: SimdEngine> {
    read_len: usize,
    packaged: Vec<E::Vec>,
    scratch: Vec<E::Lane>,
}

impl<E: SimdEngine> AlignmentGroup<E> {
    pub fn new(read_len: usize) -> AlignmentGroup<E> {
        let n = unsafe { E::splat(lane_code::<E>(Base::N)) };
        AlignmentGroup {
            read_len,
            packaged: vec![n; read_len],
            scratch: vec![E::Lane::ZERO; E::LANES],
        }
    }

    /// Interleave up to `E::LANES` reads. Unused lanes are padded with `N`.
    pub fn load_reads<S: AsRef<str>>(&mut self, reads: &[S]) {
        debug_assert!(reads.len() <= E::LANES);
        let bytes: Vec<&[u8]> = reads.iter().map(|r| r.as_ref().as_bytes()).collect();
        for b in &bytes {
            debug_assert_eq!(
                b.len(),
                self.read_len,
                "all reads in a batch must have the same length"
            );
        }
        for p in 0..self.read_len {
            for lane in 0..E::LANES {
                let base = match bytes.get(lane) {
                    Some(b) => Base::from_ascii(b[p]),
                    None => Base::N,
                };
                self.scratch[lane] = lane_code::<E>(base);
            }
            self.packaged[p] = unsafe { E::loadu(self.scratch.as_ptr()) };
        }
    }

    /// The vector of every read's base at offset `p`.
    #[inline]
    pub fn vector(&self, p: usize) -> E::Vec {
        self.packaged[p]
    }

    /// Number of reads the group holds at once.
    pub fn group_size() -> usize {
        E::LANES
    }
}

#[inline]
fn lane_code<E: SimdEngine>(base: Base) -> E::Lane {
    E::Lane::saturate_from(base.code() as i32)
}

/// Ending columns of a node's score matrix, carried into its successors.
struct Seed<E: SimdEngine> {
    s_col: Vec<E::Vec>,
    i_col: Vec<E::Vec>,
}

impl<E: SimdEngine> Seed<E> {
    fn new(read_len: usize, fill: E::Vec) -> Seed<E> {
        Seed {
            s_col: vec![fill; read_len + 1],
            i_col: vec![fill; read_len + 1],
        }
    }
}

/// One outstanding target position for the current group.
#[derive(Clone, Copy)]
struct TargetSlot {
    idx: usize,
    pos: u32,
    score: i32,
}

const TARGET_SENTINEL: u32 = u32::MAX;

/// SIMD graph aligner over lane engine `E`.
///
/// `END_TO_END` selects the alignment mode at compile time: `false` is local
/// (Smith-Waterman) alignment of the best read substring, `true` requires
/// the whole read to be consumed and may report negative scores. See the
/// [`Aligner`], [`WordAligner`], [`AlignerEte`] and [`WordAlignerEte`]
/// aliases (plus the `Wide*` AVX2 variants on x86_64).
///
/// The aligner owns all hot buffers; construction is the only allocation
/// point, and one instance can align any number of batches of the promised
/// read length.
pub struct AlignerT<E: SimdEngine, const END_TO_END: bool> {
    read_len: usize,
    prof: ScoreProfile,
    bias: i32,

    bias_vec: E::Vec,
    match_vec: E::Vec,
    mismatch_vec: E::Vec,
    ambig_vec: E::Vec,
    gap_open_extend_read: E::Vec,
    gap_extend_read: E::Vec,
    gap_open_extend_ref: E::Vec,
    gap_extend_ref: E::Vec,
    base_vec: [E::Vec; 5],

    group: AlignmentGroup<E>,
    s: Vec<E::Vec>,
    dc: Vec<E::Vec>,
    ic: Vec<E::Vec>,
    seed_map: FxHashMap<u64, Seed<E>>,

    max_score: E::Vec,
    sub_score: E::Vec,
    max_pos: Vec<u32>,
    sub_pos: Vec<u32>,
    max_count: Vec<u32>,
    sub_count: Vec<u32>,
    cor_flag: Vec<u8>,
    targets_lower: Vec<u32>,
    targets_upper: Vec<u32>,
    target_slots: Vec<TargetSlot>,

    mask_buf: Vec<E::Lane>,
    val_buf: Vec<E::Lane>,
    old_max_buf: Vec<E::Lane>,
    sub_buf: Vec<E::Lane>,
}

impl<E: SimdEngine, const END_TO_END: bool> AlignerT<E, END_TO_END> {
    /// Build an aligner for reads of length `read_len`.
    ///
    /// Fails with [`AlignError::InsufficientLaneWidth`] when
    /// `read_len * match_score` does not fit the lane type. The correctness
    /// tolerance defaults to `read_len / 4` regardless of the profile's
    /// `tol`; call [`set_correctness_tolerance`](Self::set_correctness_tolerance)
    /// to override.
    pub fn new(read_len: usize, prof: ScoreProfile) -> Result<Self, AlignError> {
        let zero = unsafe { E::splat(E::Lane::ZERO) };
        let mut aligner = AlignerT {
            read_len,
            prof: prof.clone(),
            bias: 0,
            bias_vec: zero,
            match_vec: zero,
            mismatch_vec: zero,
            ambig_vec: zero,
            gap_open_extend_read: zero,
            gap_extend_read: zero,
            gap_open_extend_ref: zero,
            gap_extend_ref: zero,
            base_vec: [zero; 5],
            group: AlignmentGroup::new(read_len),
            s: vec![zero; read_len + 1],
            dc: vec![zero; read_len + 1],
            ic: vec![zero; read_len + 1],
            seed_map: FxHashMap::default(),
            max_score: zero,
            sub_score: zero,
            max_pos: vec![0; E::LANES],
            sub_pos: vec![0; E::LANES],
            max_count: vec![0; E::LANES],
            sub_count: vec![0; E::LANES],
            cor_flag: vec![0; E::LANES],
            targets_lower: vec![TARGET_SENTINEL; E::LANES],
            targets_upper: vec![0; E::LANES],
            target_slots: Vec::with_capacity(E::LANES + 1),
            mask_buf: vec![E::Lane::ZERO; E::LANES],
            val_buf: vec![E::Lane::ZERO; E::LANES],
            old_max_buf: vec![E::Lane::ZERO; E::LANES],
            sub_buf: vec![E::Lane::ZERO; E::LANES],
        };
        aligner.set_scores(prof)?;
        aligner.set_correctness_tolerance(read_len as u32 / DEFAULT_TOL_FACTOR);
        Ok(aligner)
    }

    /// Replace the scoring parameters, recomputing the bias.
    pub fn set_scores(&mut self, prof: ScoreProfile) -> Result<(), AlignError> {
        let bias = Self::compute_bias(self.read_len, &prof)?;
        self.bias = bias;
        self.prof = prof;
        self.prof.end_to_end = END_TO_END;
        unsafe {
            self.bias_vec = E::splat(E::Lane::saturate_from(bias));
            self.match_vec = E::splat(E::Lane::saturate_from(self.prof.match_score as i32));
            self.mismatch_vec = E::splat(E::Lane::saturate_from(-(self.prof.mismatch as i32)));
            self.ambig_vec = E::splat(E::Lane::saturate_from(-(self.prof.ambig as i32)));
            self.gap_open_extend_read = E::splat(E::Lane::saturate_from(
                self.prof.read_gopen as i32 + self.prof.read_gext as i32,
            ));
            self.gap_extend_read = E::splat(E::Lane::saturate_from(self.prof.read_gext as i32));
            self.gap_open_extend_ref = E::splat(E::Lane::saturate_from(
                self.prof.ref_gopen as i32 + self.prof.ref_gext as i32,
            ));
            self.gap_extend_ref = E::splat(E::Lane::saturate_from(self.prof.ref_gext as i32));
            for (code, v) in self.base_vec.iter_mut().enumerate() {
                *v = E::splat(E::Lane::saturate_from(code as i32));
            }
        }
        Ok(())
    }

    /// A best (or second-best) position within `tol` of the read's target
    /// sets the correctness flag.
    pub fn set_correctness_tolerance(&mut self, tol: u32) {
        self.prof.tol = tol;
    }

    pub fn tolerance(&self) -> u32 {
        self.prof.tol
    }

    pub fn read_len(&self) -> usize {
        self.read_len
    }

    /// Maximum number of reads aligned in one sweep.
    pub fn read_capacity() -> usize {
        E::LANES
    }

    /// Align a batch with no target positions.
    pub fn align<S: AsRef<str>>(
        &mut self,
        reads: &[S],
        graph: &Graph,
    ) -> Result<Results, AlignError> {
        let targets = vec![0u32; reads.len()];
        self.align_targeted(reads, &targets, graph)
    }

    /// Align a batch; `targets[i]` is read `i`'s expected 1-based position
    /// (0 for none), used for the correctness flag and target-score capture.
    pub fn align_targeted<S: AsRef<str>>(
        &mut self,
        reads: &[S],
        targets: &[u32],
        graph: &Graph,
    ) -> Result<Results, AlignError> {
        let mut res = Results::new();
        self.align_into(reads, targets, graph.nodes(), &mut res)?;
        Ok(res)
    }

    /// Align into a caller-owned results record, reusing its buffers.
    pub fn align_into<S: AsRef<str>>(
        &mut self,
        reads: &[S],
        targets: &[u32],
        nodes: &[Node],
        res: &mut Results,
    ) -> Result<(), AlignError> {
        debug_assert_eq!(targets.len(), reads.len());

        let capacity = E::LANES;
        let n_reads = reads.len();
        if n_reads == 0 {
            res.resize(0);
            res.profile = self.prof.clone();
            return Ok(());
        }

        let num_groups = 1 + (n_reads - 1) / capacity;
        res.resize(num_groups * capacity);
        log::debug!(
            "aligning {} reads in {} groups of {} against {} nodes",
            n_reads,
            num_groups,
            capacity,
            nodes.len()
        );

        let mut seed = Seed::new(self.read_len, self.bias_vec);

        for group in 0..num_groups {
            let beg = group * capacity;
            let end = ((group + 1) * capacity).min(n_reads);
            let len = end - beg;

            self.group.load_reads(&reads[beg..end]);
            self.reset_tracker(&targets[beg..end]);
            self.seed_map.clear();

            for node in nodes {
                if node.incoming().is_empty() {
                    self.init_seed(&mut seed);
                } else {
                    self.merge_seed(node, &mut seed)?;
                }
                if node.is_pinched() {
                    self.seed_map.clear();
                }
                let mut out = Seed::new(self.read_len, self.bias_vec);
                self.fill_node(node, &seed, &mut out);
                self.seed_map.insert(node.id(), out);
            }

            for i in 0..len {
                unsafe {
                    res.max_score[beg + i] = E::extract(self.max_score, i).to_i32() - self.bias;
                    res.sub_score[beg + i] = E::extract(self.sub_score, i).to_i32() - self.bias;
                }
                res.max_pos[beg + i] = self.max_pos[i];
                res.sub_pos[beg + i] = self.sub_pos[i];
                res.max_count[beg + i] = self.max_count[i];
                res.sub_count[beg + i] = self.sub_count[i];
                res.correct[beg + i] = self.cor_flag[i];
            }
            for slot in &self.target_slots[..len] {
                res.target_score[beg + slot.idx] = if slot.score == i32::MIN {
                    TARGET_SCORE_UNDEFINED
                } else {
                    slot.score - self.bias
                };
            }
        }

        res.resize(n_reads);
        res.profile = self.prof.clone();
        Ok(())
    }

    /// Lane minimum for scores, zeroed counts, per-lane target windows, and
    /// the position-sorted target slot list for one group.
    fn reset_tracker(&mut self, targets: &[u32]) {
        unsafe {
            self.max_score = E::splat(E::Lane::MIN);
            self.sub_score = E::splat(E::Lane::MIN);
        }
        self.max_pos.fill(0);
        self.sub_pos.fill(0);
        self.max_count.fill(0);
        self.sub_count.fill(0);
        self.cor_flag.fill(0);

        let tol = self.prof.tol;
        for i in 0..E::LANES {
            let target = targets.get(i).copied().unwrap_or(0);
            if target == 0 {
                self.targets_lower[i] = TARGET_SENTINEL;
                self.targets_upper[i] = 0;
            } else {
                self.targets_lower[i] = target.saturating_sub(tol).max(1);
                self.targets_upper[i] = target.saturating_add(tol);
            }
        }

        self.target_slots.clear();
        for (idx, &pos) in targets.iter().enumerate() {
            self.target_slots.push(TargetSlot {
                idx,
                pos,
                score: i32::MIN,
            });
        }
        for _ in targets.len()..E::LANES + 1 {
            self.target_slots.push(TargetSlot {
                idx: 0,
                pos: TARGET_SENTINEL,
                score: i32::MIN,
            });
        }
        self.target_slots.sort_unstable_by_key(|t| t.pos);
    }

    /// Fresh seed for a node without predecessors. End-to-end mode charges
    /// the cost of gapping through the first rows before any reference base
    /// is consumed.
    fn init_seed(&self, seed: &mut Seed<E>) {
        for v in &mut seed.s_col {
            *v = self.bias_vec;
        }
        if END_TO_END {
            for i in 0..self.read_len {
                let cost = self.bias
                    - self.prof.read_gopen as i32
                    - i as i32 * self.prof.read_gext as i32;
                seed.s_col[i + 1] = unsafe { E::splat(E::Lane::saturate_from(cost)) };
            }
        }
        seed.i_col.copy_from_slice(&seed.s_col);
    }

    /// Lane-wise max over the predecessors' stored seeds. Every predecessor
    /// must already be in the store; anything else means the node iterator
    /// is not topologically ordered.
    fn merge_seed(&self, node: &Node, seed: &mut Seed<E>) -> Result<(), AlignError> {
        let mut preds = Vec::with_capacity(node.incoming().len());
        for &id in node.incoming() {
            let prev = self
                .seed_map
                .get(&id)
                .ok_or(AlignError::InvalidNodeOrdering {
                    node: node.id(),
                    missing: id,
                })?;
            preds.push(prev);
        }
        seed.s_col[0] = self.bias_vec;
        seed.i_col[0] = self.bias_vec;
        unsafe {
            for r in 1..=self.read_len {
                let mut s = self.bias_vec;
                let mut ic = self.bias_vec;
                for prev in &preds {
                    s = E::max(s, prev.s_col[r]);
                    ic = E::max(ic, prev.i_col[r]);
                }
                seed.s_col[r] = s;
                seed.i_col[r] = ic;
            }
        }
        Ok(())
    }

    /// Sweep the matrix across one node's sequence, committing scores to the
    /// tracker and leaving the final columns in `out`.
    fn fill_node(&mut self, node: &Node, seed: &Seed<E>, out: &mut Seed<E>) {
        let seq = node.seq();
        if seq.is_empty() {
            // deletion edge: the seed passes through unchanged
            out.s_col.copy_from_slice(&seed.s_col);
            out.i_col.copy_from_slice(&seed.i_col);
            return;
        }

        debug_assert!(node.end_pos() as usize >= seq.len());
        let start = node.end_pos() - seq.len() as u32 + 1;
        let read_len = self.read_len;

        let mut csp = 0;
        while self.target_slots[csp].pos < start {
            csp += 1;
        }

        self.s.copy_from_slice(&seed.s_col);
        self.ic.copy_from_slice(&seed.i_col);
        for v in &mut self.dc {
            *v = self.bias_vec;
        }

        let n_vec = self.base_vec[Base::N.code() as usize];
        let match_vec = self.match_vec;
        let mismatch_vec = self.mismatch_vec;
        let ambig_vec = self.ambig_vec;
        let goe_read = self.gap_open_extend_read;
        let ge_read = self.gap_extend_read;
        let goe_ref = self.gap_open_extend_ref;
        let ge_ref = self.gap_extend_ref;

        let mut pos = start;
        for &ref_base in seq {
            let ref_vec = self.base_vec[ref_base.code() as usize];
            let ref_is_n = ref_base == Base::N;
            let mut sd = self.bias_vec;

            unsafe {
                for r in 1..=read_len {
                    let d = E::max(
                        E::subs(self.dc[r - 1], ge_ref),
                        E::subs(self.s[r - 1], goe_ref),
                    );
                    self.dc[r] = d;
                    let ins = E::max(
                        E::subs(self.ic[r], ge_read),
                        E::subs(self.s[r], goe_read),
                    );
                    self.ic[r] = ins;

                    let read = self.group.vector(r - 1);
                    let sr = if ref_is_n {
                        E::adds(sd, ambig_vec)
                    } else {
                        let contrib = E::blend(
                            E::blend(mismatch_vec, match_vec, E::cmpeq(read, ref_vec)),
                            ambig_vec,
                            E::cmpeq(read, n_vec),
                        );
                        E::adds(sd, contrib)
                    };

                    sd = self.s[r];
                    let val = E::max(ins, E::max(d, sr));
                    self.s[r] = val;
                    if !END_TO_END {
                        self.commit(val, pos);
                    }
                }
                if END_TO_END {
                    // only a fully consumed read may score
                    let val = self.s[read_len];
                    self.commit(val, pos);
                }

                while self.target_slots[csp].pos == pos {
                    let TargetSlot { idx, score, .. } = self.target_slots[csp];
                    let first_row = if END_TO_END { read_len } else { 1 };
                    let mut best = score;
                    for q in first_row..=read_len {
                        best = best.max(E::extract(self.s[q], idx).to_i32());
                    }
                    self.target_slots[csp].score = best;
                    csp += 1;
                }
            }
            pos += 1;
        }

        out.s_col.copy_from_slice(&self.s);
        out.i_col.copy_from_slice(&self.ic);
    }

    /// Fold one row vector at reference position `pos` into the per-lane
    /// best/second-best state.
    ///
    /// Branch order matters and is part of the reported semantics: a score
    /// equal to the current best moves the best position forward (the later
    /// column wins), a strictly greater score demotes a non-overlapping old
    /// best to second-best, and only then are second-best repeats and
    /// improvements considered.
    unsafe fn commit(&mut self, s: E::Vec, pos: u32) {
        let read_len = self.read_len as u32;

        let eq_max = E::cmpeq(s, self.max_score);
        if E::any(eq_max) {
            E::storeu(self.mask_buf.as_mut_ptr(), eq_max);
            for i in 0..E::LANES {
                if self.mask_buf[i] != E::Lane::ZERO {
                    if pos > self.max_pos[i].saturating_add(read_len) {
                        self.max_count[i] += 1;
                    }
                    self.max_pos[i] = pos;
                    if self.in_target_window(i, pos) {
                        self.cor_flag[i] = 1;
                    }
                }
            }
        }

        let gt_max = E::cmpgt(s, self.max_score);
        if E::any(gt_max) {
            E::storeu(self.old_max_buf.as_mut_ptr(), self.max_score);
            self.max_score = E::max(s, self.max_score);
            E::storeu(self.mask_buf.as_mut_ptr(), gt_max);
            E::storeu(self.sub_buf.as_mut_ptr(), self.sub_score);
            let mut demoted = false;
            for i in 0..E::LANES {
                if self.mask_buf[i] != E::Lane::ZERO {
                    if pos > self.max_pos[i].saturating_add(read_len) {
                        // old best does not overlap the new hit: demote it
                        self.sub_buf[i] = self.old_max_buf[i];
                        demoted = true;
                        self.sub_pos[i] = self.max_pos[i];
                        self.sub_count[i] = self.max_count[i];
                        self.cor_flag[i] = if self.cor_flag[i] == 1 { 2 } else { 0 };
                    }
                    self.max_count[i] = 1;
                    self.max_pos[i] = pos;
                    if self.in_target_window(i, pos) {
                        self.cor_flag[i] = 1;
                    } else if self.cor_flag[i] == 1 {
                        self.cor_flag[i] = 0;
                    }
                }
            }
            if demoted {
                self.sub_score = E::loadu(self.sub_buf.as_ptr());
            }
        }

        let eq_sub = E::cmpeq(s, self.sub_score);
        if E::any(eq_sub) {
            E::storeu(self.mask_buf.as_mut_ptr(), eq_sub);
            for i in 0..E::LANES {
                if self.mask_buf[i] != E::Lane::ZERO
                    && pos > self.max_pos[i].saturating_add(read_len)
                {
                    // count only repeats that do not overlap the previous one
                    self.sub_count[i] += (pos > self.sub_pos[i].saturating_add(read_len)) as u32;
                    self.sub_pos[i] = pos;
                    if self.in_target_window(i, pos) {
                        self.cor_flag[i] = 2;
                    }
                }
            }
        }

        let between = E::and(E::cmpgt(s, self.sub_score), E::cmpgt(self.max_score, s));
        if E::any(between) {
            E::storeu(self.mask_buf.as_mut_ptr(), between);
            E::storeu(self.val_buf.as_mut_ptr(), s);
            E::storeu(self.sub_buf.as_mut_ptr(), self.sub_score);
            let mut changed = false;
            for i in 0..E::LANES {
                if self.mask_buf[i] != E::Lane::ZERO
                    && pos > self.max_pos[i].saturating_add(read_len)
                {
                    self.sub_buf[i] = self.val_buf[i];
                    changed = true;
                    self.sub_count[i] = 1;
                    self.sub_pos[i] = pos;
                    self.cor_flag[i] = if self.in_target_window(i, pos) {
                        2
                    } else {
                        (self.cor_flag[i] == 1) as u8
                    };
                }
            }
            if changed {
                self.sub_score = E::loadu(self.sub_buf.as_ptr());
            }
        }
    }

    #[inline]
    fn in_target_window(&self, lane: usize, pos: u32) -> bool {
        self.targets_lower[lane] <= pos && pos <= self.targets_upper[lane]
    }

    /// Lane-type bias. Local mode sits at the lane minimum, which the
    /// saturating arithmetic turns into the zero floor of Smith-Waterman.
    /// End-to-end mode shifts scores so the best attainable value exactly
    /// saturates the lane.
    fn compute_bias(read_len: usize, prof: &ScoreProfile) -> Result<i32, AlignError> {
        let lane_span = E::Lane::MAX.to_i32() - E::Lane::MIN.to_i32();
        if read_len as i64 * prof.match_score as i64 > lane_span as i64 {
            return Err(AlignError::InsufficientLaneWidth {
                read_len,
                match_score: prof.match_score,
                lane_span,
            });
        }
        if !END_TO_END {
            return Ok(E::Lane::MIN.to_i32());
        }

        let bias = E::Lane::MAX.to_i32() - read_len as i32 * prof.match_score as i32;
        let worst_gap = prof.read_gopen as i32 + prof.read_gext as i32 * (read_len as i32 - 1);
        let worst_mismatch = read_len as i32 * prof.mismatch as i32;
        if (worst_gap > bias || worst_mismatch > bias)
            && !SATURATION_WARNED.swap(true, Ordering::Relaxed)
        {
            log::warn!(
                "possible score saturation in end-to-end mode: lane max {}, bias {}",
                E::Lane::MAX.to_i32(),
                bias
            );
        }
        Ok(bias)
    }
}

/// Local aligner, 8-bit scores, 16 reads per group.
pub type Aligner = AlignerT<Engine128B, false>;
/// Local aligner, 16-bit scores, 8 reads per group.
pub type WordAligner = AlignerT<Engine128W, false>;
/// End-to-end aligner, 8-bit scores, 16 reads per group.
pub type AlignerEte = AlignerT<Engine128B, true>;
/// End-to-end aligner, 16-bit scores, 8 reads per group.
pub type WordAlignerEte = AlignerT<Engine128W, true>;

/// Local aligner, 8-bit scores, 32 reads per group. Requires AVX2; gate on
/// [`avx2_available`](crate::simd_abstraction::avx2_available).
#[cfg(target_arch = "x86_64")]
pub type WideAligner = AlignerT<Engine256B, false>;
/// Local aligner, 16-bit scores, 16 reads per group (AVX2).
#[cfg(target_arch = "x86_64")]
pub type WideWordAligner = AlignerT<Engine256W, false>;
/// End-to-end aligner, 8-bit scores, 32 reads per group (AVX2).
#[cfg(target_arch = "x86_64")]
pub type WideAlignerEte = AlignerT<Engine256B, true>;
/// End-to-end aligner, 16-bit scores, 16 reads per group (AVX2).
#[cfg(target_arch = "x86_64")]
pub type WideWordAlignerEte = AlignerT<Engine256W, true>;

/// Align read groups on the rayon pool, one independent aligner per group.
///
/// The engine itself is strictly single-threaded; this expresses the
/// documented parallelism model (one aligner per thread) and stitches the
/// per-group records back together in input order. `targets` may be empty
/// for "no targets".
pub fn align_groups_parallel<E, const END_TO_END: bool, S>(
    read_len: usize,
    prof: &ScoreProfile,
    reads: &[S],
    targets: &[u32],
    graph: &Graph,
) -> Result<Results, AlignError>
where
    E: SimdEngine,
    S: AsRef<str> + Sync,
{
    let zeros;
    let targets = if targets.is_empty() && !reads.is_empty() {
        zeros = vec![0u32; reads.len()];
        &zeros
    } else {
        targets
    };
    debug_assert_eq!(targets.len(), reads.len());

    let capacity = E::LANES;
    let groups: Result<Vec<Results>, AlignError> = reads
        .par_chunks(capacity)
        .zip(targets.par_chunks(capacity))
        .map(|(read_chunk, target_chunk)| {
            let mut aligner = AlignerT::<E, END_TO_END>::new(read_len, prof.clone())?;
            aligner.align_targeted(read_chunk, target_chunk, graph)
        })
        .collect();

    let mut out = Results::new();
    for group in groups? {
        out.append(group);
    }
    if reads.is_empty() {
        out.profile = prof.clone();
        out.profile.end_to_end = END_TO_END;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simd_abstraction::Engine128B;

    #[test]
    fn packager_interleaves_and_pads() {
        let mut group = AlignmentGroup::<Engine128B>::new(4);
        group.load_reads(&["ACGT", "TTTT", "NAGC"]);
        unsafe {
            // lane i of vector p is read i's base p
            assert_eq!(Engine128B::extract(group.vector(0), 0), Base::A.code() as i8);
            assert_eq!(Engine128B::extract(group.vector(3), 0), Base::T.code() as i8);
            assert_eq!(Engine128B::extract(group.vector(2), 1), Base::T.code() as i8);
            assert_eq!(Engine128B::extract(group.vector(0), 2), Base::N.code() as i8);
            assert_eq!(Engine128B::extract(group.vector(3), 2), Base::C.code() as i8);
            // unused lanes hold N at every position
            for p in 0..4 {
                for lane in 3..Engine128B::LANES {
                    assert_eq!(
                        Engine128B::extract(group.vector(p), lane),
                        Base::N.code() as i8
                    );
                }
            }
        }
    }

    #[test]
    fn packager_normalizes_case_and_unknowns() {
        let mut group = AlignmentGroup::<Engine128B>::new(3);
        group.load_reads(&["acg", "xyz"]);
        unsafe {
            assert_eq!(Engine128B::extract(group.vector(0), 0), Base::A.code() as i8);
            assert_eq!(Engine128B::extract(group.vector(0), 1), Base::N.code() as i8);
            assert_eq!(Engine128B::extract(group.vector(2), 1), Base::N.code() as i8);
        }
    }

    #[test]
    fn byte_lane_width_bound() {
        // 128 * 2 = 256 exceeds the 8-bit span of 255
        let prof = ScoreProfile::new(2, 2, 3, 1);
        assert!(matches!(
            Aligner::new(128, prof.clone()),
            Err(AlignError::InsufficientLaneWidth { .. })
        ));
        // 127 * 2 = 254 just fits
        assert!(Aligner::new(127, prof.clone()).is_ok());
        // the 16-bit lane takes it easily
        assert!(WordAligner::new(128, prof).is_ok());
    }

    #[test]
    fn default_tolerance_is_quarter_read_len() {
        let aligner = Aligner::new(12, ScoreProfile::new(2, 2, 3, 1)).unwrap();
        assert_eq!(aligner.tolerance(), 3);
        let aligner = Aligner::new(4, ScoreProfile::new(2, 2, 3, 1)).unwrap();
        assert_eq!(aligner.tolerance(), 1);
    }

    #[test]
    fn capacities_follow_engines() {
        assert_eq!(Aligner::read_capacity(), 16);
        assert_eq!(WordAligner::read_capacity(), 8);
    }

    #[test]
    fn aligner_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Aligner>();
        assert_send::<WordAlignerEte>();
    }

    #[test]
    fn empty_batch_yields_empty_results() {
        let mut g = Graph::new();
        g.add_node(3, "AAA");
        g.seal();
        let mut aligner = Aligner::new(4, ScoreProfile::default()).unwrap();
        let res = aligner.align(&Vec::<&str>::new(), &g).unwrap();
        assert!(res.is_empty());
    }
}
