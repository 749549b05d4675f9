//! Alignment scenarios over small hand-built graphs.
//!
//! The diamond graph used by most tests:
//!
//! ```text
//!      GGG
//!     /   \
//!  AAA     TTTA        positions 1-3, 4-6, 4-6, 7-10
//!     \   /
//!      CCC
//! ```

use varlign::align::{Aligner, AlignerEte, WordAligner, WordAlignerEte};
use varlign::error::AlignError;
use varlign::graph::Graph;
use varlign::scoring::ScoreProfile;

fn diamond() -> Graph {
    let mut g = Graph::new();
    let root = g.add_node(3, "AAA");
    let refb = g.add_node(6, "CCC");
    let alt = g.add_node(6, "GGG");
    let tail = g.add_node(10, "TTTA");
    g.add_edge(root, refb);
    g.add_edge(root, alt);
    g.add_edge(refb, tail);
    g.add_edge(alt, tail);
    g.seal();
    g
}

#[test]
fn graph_alignment() {
    let reads = [
        "NNNCCTT", "NNNGGTT", "NNNAAGG", "NNNAACC", "NNAGGGT", "NNNNNGG", "AAATTTA", "AAAGCCC",
    ];
    let targets = [8, 8, 5, 5, 7, 6, 10, 6];
    let expected = [
        (8, 8),
        (8, 8),
        (8, 5),
        (8, 5),
        (10, 7),
        (4, 6),
        (8, 10),
        (8, 4),
    ];

    let g = diamond();
    let mut aligner = Aligner::new(7, ScoreProfile::new(2, 2, 3, 1)).unwrap();
    let res = aligner.align_targeted(&reads, &targets, &g).unwrap();

    assert_eq!(res.len(), reads.len());
    for (i, &(score, pos)) in expected.iter().enumerate() {
        assert_eq!(res.max_score[i], score, "read {i} score");
        assert_eq!(res.max_pos[i], pos, "read {i} position");
        assert_eq!(res.correct[i], 1, "read {i} correctness flag");
        // the best hit matched the target, so the captured score is the max
        assert_eq!(res.target_score[i], res.max_score[i], "read {i} target score");
    }
}

#[test]
fn graph_alignment_word_lanes() {
    let reads = [
        "NNNCCTT", "NNNGGTT", "NNNAAGG", "NNNAACC", "NNAGGGT", "NNNNNGG", "AAATTTA", "AAAGCCC",
    ];
    let targets = [8, 8, 5, 5, 7, 6, 10, 6];
    let expected = [
        (8, 8),
        (8, 8),
        (8, 5),
        (8, 5),
        (10, 7),
        (4, 6),
        (8, 10),
        (8, 4),
    ];

    let g = diamond();
    let mut aligner = WordAligner::new(7, ScoreProfile::new(2, 2, 3, 1)).unwrap();
    let res = aligner.align_targeted(&reads, &targets, &g).unwrap();

    for (i, &(score, pos)) in expected.iter().enumerate() {
        assert_eq!(res.max_score[i], score, "read {i} score");
        assert_eq!(res.max_pos[i], pos, "read {i} position");
        assert_eq!(res.correct[i], 1, "read {i} correctness flag");
        assert_eq!(res.target_score[i], res.max_score[i], "read {i} target score");
    }
}

#[test]
fn hisat_like_scoring_scheme() {
    let reads = [
        "NNNNNNCCTT",
        "NNNNNNGGTT",
        "NNNNNNAAGG",
        "NNNNNNAACC",
        "NNNNNAGGGT",
        "NNNNNNNNGG",
        "NNNAAATTTA",
        "NNNAAAGCCC",
        "AAAGAGTTTA",
        "AAAGAATTTA",
    ];
    let targets = [8, 8, 5, 5, 7, 6, 10, 4, 10, 10];
    let expected = [
        (8, 8),
        (8, 8),
        (8, 5),
        (8, 5),
        (10, 7),
        (4, 6),
        (8, 10),
        (8, 4),
        (12, 10),
        (8, 10),
    ];

    let g = diamond();
    let mut aligner = Aligner::new(10, ScoreProfile::new(2, 6, 5, 3)).unwrap();
    let res = aligner.align_targeted(&reads, &targets, &g).unwrap();

    for (i, &(score, pos)) in expected.iter().enumerate() {
        assert_eq!(res.max_score[i], score, "read {i} score");
        assert_eq!(res.max_pos[i], pos, "read {i} position");
        assert_eq!(res.correct[i], 1, "read {i} correctness flag");
        assert_eq!(res.target_score[i], res.max_score[i], "read {i} target score");
    }
}

#[test]
fn hisat_like_scoring_scheme_word_lanes() {
    let reads = [
        "NNNNNNCCTT",
        "NNNNNNGGTT",
        "NNNNNNAAGG",
        "NNNNNNAACC",
        "NNNNNAGGGT",
        "NNNNNNNNGG",
        "NNNAAATTTA",
        "NNNAAAGCCC",
        "AAAGAGTTTA",
        "AAAGAATTTA",
    ];
    let targets = [8, 8, 5, 5, 7, 6, 10, 4, 10, 10];
    let expected = [
        (8, 8),
        (8, 8),
        (8, 5),
        (8, 5),
        (10, 7),
        (4, 6),
        (8, 10),
        (8, 4),
        (12, 10),
        (8, 10),
    ];

    let g = diamond();
    let mut aligner = WordAligner::new(10, ScoreProfile::new(2, 6, 5, 3)).unwrap();
    let res = aligner.align_targeted(&reads, &targets, &g).unwrap();

    for (i, &(score, pos)) in expected.iter().enumerate() {
        assert_eq!(res.max_score[i], score, "read {i} score");
        assert_eq!(res.max_pos[i], pos, "read {i} position");
        assert_eq!(res.correct[i], 1, "read {i} correctness flag");
    }
}

#[test]
fn ambiguity_penalty() {
    let reads = ["AAANGGTTTA", "AANNGGTTTA", "AAANNNTTTA"];

    let mut prof = ScoreProfile::new(2, 2, 3, 1);
    prof.ambig = 1;
    let g = diamond();
    let mut aligner = Aligner::new(10, prof).unwrap();
    let res = aligner.align(&reads, &g).unwrap();

    assert_eq!(res.max_score[0], 17);
    assert_eq!(res.max_pos[0], 10);
    assert_eq!(res.max_score[1], 14);
    assert_eq!(res.max_pos[1], 10);
    assert_eq!(res.max_score[2], 11);
    assert_eq!(res.max_pos[2], 10);
}

fn indel_graph() -> Graph {
    let mut g = Graph::new();
    let a = g.add_node(25, "ACTGCTNCAGTCAGTGNANACNCAC");
    let b = g.add_node(68, "ACGATCGTACGCNAGCTAGCCACAGTGCCCCCCTATATACGAN");
    g.add_edge(a, b);
    g.seal();
    g
}

const INDEL_READS: [&str; 10] = [
    "ACTGCTNCAGTC", // exact, pos 1
    "ACTGCTACAGTC", // exact except under the reference N
    "CCACAGCCCCCC", // two ref bases skipped
    "ACNCACACGATC", // exact across the edge
    "ACNCAACGATCG", // one ref base skipped across the edge
    "ACNCACCACGAT", // one extra read base across the edge
    "ACTTGCTNCAGT", // one extra read base
    "ACNCACCGATCG",
    "NACNCAACGATC",
    "AGCCTTACAGTG", // two extra read bases
];

#[test]
fn indels_symmetric_gaps() {
    let expected = [
        (22, 12),
        (22, 12),
        (19, 58),
        (22, 31),
        (18, 32),
        (16, 30),
        (16, 11),
        (18, 32),
        (16, 31),
        (15, 52),
    ];

    let g = indel_graph();
    let mut aligner = Aligner::new(12, ScoreProfile::new(2, 6, 3, 1)).unwrap();
    let res = aligner.align(&INDEL_READS, &g).unwrap();

    assert_eq!(res.len(), 10);
    for (i, &(score, pos)) in expected.iter().enumerate() {
        assert_eq!(res.max_score[i], score, "read {i} score");
        assert_eq!(res.max_pos[i], pos, "read {i} position");
    }
}

#[test]
fn indels_asymmetric_gaps() {
    let expected = [
        (22, 12),
        (22, 12),
        (18, 58),
        (22, 31),
        (17, 32),
        (17, 30),
        (17, 11),
        (17, 32),
        (15, 31),
        (16, 52),
    ];

    let g = indel_graph();
    let prof = ScoreProfile::with_gaps(2, 6, 4, 1, 2, 1);
    let mut aligner = Aligner::new(12, prof).unwrap();
    let res = aligner.align(&INDEL_READS, &g).unwrap();

    assert_eq!(res.len(), 10);
    for (i, &(score, pos)) in expected.iter().enumerate() {
        assert_eq!(res.max_score[i], score, "read {i} score");
        assert_eq!(res.max_pos[i], pos, "read {i} position");
    }
}

#[test]
fn local_alignment_clips_read_ends() {
    // read:      ACGGTTGCGTTAA-TCCGCCACG
    //                ||||||||| ||||||
    // reference: TAACTTGCGTTAAATCCGCCTGG
    let read = "ACGGTTGCGTTAATCCGCCACG";
    let reference = "TAACTTGCGTTAAATCCGCCTGG";

    let mut g = Graph::new();
    g.add_node(reference.len() as u32, reference);
    g.seal();

    let mut aligner = Aligner::new(read.len(), ScoreProfile::new(2, 6, 5, 3)).unwrap();
    let res = aligner.align(&[read], &g).unwrap();
    assert_eq!(res.len(), 1);
    assert_eq!(res.max_score[0], 22);
    assert_eq!(res.max_pos[0], 20);
}

#[test]
fn end_to_end_alignment() {
    // read:      GACTGGGCGATCTCGACTTCG
    //            |||||  |||||||||| |||
    // reference: GACTG--CGATCTCGACATCG
    let read = "GACTGGGCGATCTCGACTTCG";
    let reference = "GACTGCGATCTCGACATCG";

    let mut g = Graph::new();
    g.add_node(reference.len() as u32, reference);
    g.seal();

    let mut aligner = AlignerEte::new(read.len(), ScoreProfile::new(0, 6, 5, 3)).unwrap();
    let res = aligner.align(&[read], &g).unwrap();
    assert_eq!(res.len(), 1);
    assert_eq!(res.max_pos[0], 19);
    assert_eq!(res.max_score[0], -17);

    let mut aligner = WordAlignerEte::new(read.len(), ScoreProfile::new(0, 6, 5, 3)).unwrap();
    let res = aligner.align(&[read], &g).unwrap();
    assert_eq!(res.len(), 1);
    assert_eq!(res.max_pos[0], 19);
    assert_eq!(res.max_score[0], -17);
}

#[test]
fn end_to_end_bound_check() {
    // 100 * 3 exceeds the 8-bit span
    assert!(matches!(
        AlignerEte::new(100, ScoreProfile::new(3, 2, 2, 2)),
        Err(AlignError::InsufficientLaneWidth { .. })
    ));
    // the word aligner accepts the same parameters
    assert!(WordAlignerEte::new(100, ScoreProfile::new(3, 2, 2, 2)).is_ok());
}

#[test]
fn target_score_capture() {
    let mut g = Graph::new();
    g.add_node(19, "AAAACCCCCCCCCCCCAAA");
    g.seal();

    let mut aligner = Aligner::new(4, ScoreProfile::new(2, 2, 3, 1)).unwrap();
    let res = aligner.align_targeted(&["AAAA"], &[19], &g).unwrap();

    assert_eq!(res.len(), 1);
    assert_eq!(res.max_score[0], 8);
    assert_eq!(res.max_pos[0], 4);
    assert_eq!(res.sub_score[0], 6);
    assert_eq!(res.sub_pos[0], 19);
    assert_eq!(res.correct[0], 2);
    assert_eq!(res.target_score[0], 6);
}

#[test]
fn results_echo_profile() {
    let g = diamond();
    let prof = ScoreProfile::new(2, 6, 5, 3);
    let mut aligner = Aligner::new(7, prof.clone()).unwrap();
    let res = aligner.align(&["NNNCCTT"], &g).unwrap();
    assert_eq!(res.profile.match_score, prof.match_score);
    assert_eq!(res.profile.mismatch, prof.mismatch);
    assert!(!res.profile.end_to_end);
    // the aligner's default tolerance is read_len / 4
    assert_eq!(res.profile.tol, 1);

    let mut ete = AlignerEte::new(7, ScoreProfile::new(2, 6, 5, 3)).unwrap();
    let res = ete.align(&["NNNCCTT"], &g).unwrap();
    assert!(res.profile.end_to_end);
}
