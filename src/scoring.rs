//! Score profiles and alignment results.
//!
//! A [`ScoreProfile`] holds the match reward and the penalty magnitudes for
//! mismatches, ambiguous bases and gaps. Gap costs are split between the
//! read side (an insertion in the read) and the reference side (a deletion
//! in the read), so the two may be penalized differently. All values are
//! positive; whether one is added or subtracted is implied by the operation.
//!
//! Profiles round-trip through a compact `K=V` string and can be extracted
//! from the command lines of common aligners, so benchmark runs can mirror
//! another tool's parameters.

use std::fmt;
use std::str::FromStr;

use crate::error::ProfileParseError;

/// Divisor applied to the read length for the default correctness
/// tolerance: a hit within `read_len / DEFAULT_TOL_FACTOR` of the target
/// counts as correct.
pub const DEFAULT_TOL_FACTOR: u32 = 4;

/// Scoring parameters for an alignment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreProfile {
    /// Match reward.
    pub match_score: u8,
    /// Mismatch penalty.
    pub mismatch: u8,
    /// Gap-open penalty for gaps in the read (read insertion).
    pub read_gopen: u8,
    /// Gap-extend penalty for gaps in the read.
    pub read_gext: u8,
    /// Gap-open penalty for gaps in the reference.
    pub ref_gopen: u8,
    /// Gap-extend penalty for gaps in the reference.
    pub ref_gext: u8,
    /// Penalty for an ambiguous base on either side.
    pub ambig: u8,
    /// End-to-end mode flag; echoed into results by the aligner.
    pub end_to_end: bool,
    /// Correctness tolerance in reference coordinates.
    pub tol: u32,
}

impl Default for ScoreProfile {
    fn default() -> ScoreProfile {
        ScoreProfile::new(2, 2, 3, 1)
    }
}

impl ScoreProfile {
    /// Symmetric gap costs on both sides.
    pub fn new(match_score: u8, mismatch: u8, gopen: u8, gext: u8) -> ScoreProfile {
        ScoreProfile {
            match_score,
            mismatch,
            read_gopen: gopen,
            read_gext: gext,
            ref_gopen: gopen,
            ref_gext: gext,
            ambig: 0,
            end_to_end: false,
            tol: DEFAULT_TOL_FACTOR,
        }
    }

    /// Distinct gap costs for the read and reference sides.
    pub fn with_gaps(
        match_score: u8,
        mismatch: u8,
        read_gopen: u8,
        read_gext: u8,
        ref_gopen: u8,
        ref_gext: u8,
    ) -> ScoreProfile {
        ScoreProfile {
            match_score,
            mismatch,
            read_gopen,
            read_gext,
            ref_gopen,
            ref_gext,
            ambig: 0,
            end_to_end: false,
            tol: DEFAULT_TOL_FACTOR,
        }
    }
}

impl fmt::Display for ScoreProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M={},MM={},GOD={},GED={},GOF={},GEF={},AMB={},ETE={},TOL={}",
            self.match_score,
            self.mismatch,
            self.read_gopen,
            self.read_gext,
            self.ref_gopen,
            self.ref_gext,
            self.ambig,
            self.end_to_end as u8,
            self.tol
        )
    }
}

impl FromStr for ScoreProfile {
    type Err = ProfileParseError;

    /// Parse the `K=V` comma string produced by `Display`. Keys may appear
    /// in any order and any subset; missing keys keep their defaults.
    fn from_str(s: &str) -> Result<ScoreProfile, ProfileParseError> {
        let mut prof = ScoreProfile::default();
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        for tok in compact.split(',').filter(|t| !t.is_empty()) {
            let (k, v) = tok
                .split_once('=')
                .ok_or_else(|| ProfileParseError::InvalidToken(tok.to_string()))?;
            let invalid = || ProfileParseError::InvalidValue {
                key: k.to_string(),
                value: v.to_string(),
            };
            match k {
                "M" => prof.match_score = v.parse().map_err(|_| invalid())?,
                "MM" => prof.mismatch = v.parse().map_err(|_| invalid())?,
                "GOD" => prof.read_gopen = v.parse().map_err(|_| invalid())?,
                "GED" => prof.read_gext = v.parse().map_err(|_| invalid())?,
                "GOF" => prof.ref_gopen = v.parse().map_err(|_| invalid())?,
                "GEF" => prof.ref_gext = v.parse().map_err(|_| invalid())?,
                "ETE" => prof.end_to_end = v == "1",
                "TOL" => prof.tol = v.parse().map_err(|_| invalid())?,
                "AMB" => prof.ambig = v.parse().map_err(|_| invalid())?,
                _ => return Err(ProfileParseError::InvalidToken(tok.to_string())),
            }
        }
        Ok(prof)
    }
}

/// Split a command line into flag and value tokens, collapsing repeated
/// dashes so `--ma` and `-ma` compare equal.
fn tokenize_command_line(cl: &str) -> Vec<String> {
    cl.split(|c: char| c.is_whitespace() || c == '=')
        .filter(|t| !t.is_empty())
        .map(|t| {
            let mut t = t;
            while t.starts_with("--") {
                t = &t[1..];
            }
            t.to_string()
        })
        .collect()
}

fn flag_value<'a>(tokens: &'a [String], flag: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| t == flag)
        .and_then(|i| tokens.get(i + 1))
        .map(String::as_str)
}

fn parse_num<T: FromStr>(flag: &'static str, v: &str) -> Result<T, ProfileParseError> {
    v.parse().map_err(|_| ProfileParseError::InvalidValue {
        key: flag.to_string(),
        value: v.to_string(),
    })
}

/// Extract a profile from a bowtie2 / HISAT2 command line.
fn bowtie2_profile(cl: &str) -> Result<ScoreProfile, ProfileParseError> {
    let tokens = tokenize_command_line(cl);
    if !tokens.iter().any(|t| t == "-U") {
        return Err(ProfileParseError::MissingFlag {
            program: "bowtie2/hisat2",
            flag: "-U",
        });
    }

    let mut prof = ScoreProfile::default();
    prof.end_to_end = !tokens.iter().any(|t| t == "-local");

    prof.ambig = match flag_value(&tokens, "-np") {
        Some(v) => parse_num("-np", v)?,
        None => 1,
    };

    // match reward is fixed at zero in end-to-end mode
    prof.match_score = if prof.end_to_end {
        0
    } else {
        match flag_value(&tokens, "-ma") {
            Some(v) => parse_num("-ma", v)?,
            None => 2,
        }
    };

    prof.mismatch = match flag_value(&tokens, "-mp") {
        Some(v) => parse_num("-mp", v)?,
        None => 6,
    };

    let gap_pair = |flag: &'static str| -> Result<(u8, u8), ProfileParseError> {
        match flag_value(&tokens, flag) {
            Some(v) => {
                let (o, e) = v.split_once(',').ok_or(ProfileParseError::InvalidValue {
                    key: flag.to_string(),
                    value: v.to_string(),
                })?;
                Ok((parse_num(flag, o)?, parse_num(flag, e)?))
            }
            None => Ok((5, 3)),
        }
    };
    (prof.ref_gopen, prof.ref_gext) = gap_pair("-rfg")?;
    (prof.read_gopen, prof.read_gext) = gap_pair("-rdg")?;

    Ok(prof)
}

/// Extract a profile from a `bwa mem` command line.
fn bwa_mem_profile(cl: &str) -> Result<ScoreProfile, ProfileParseError> {
    let tokens = tokenize_command_line(cl);
    let mut prof = ScoreProfile::default();
    prof.end_to_end = false;
    prof.ambig = 0;

    prof.match_score = match flag_value(&tokens, "-A") {
        Some(v) => parse_num("-A", v)?,
        None => 1,
    };
    prof.mismatch = match flag_value(&tokens, "-B") {
        Some(v) => parse_num("-B", v)?,
        None => 4,
    };
    prof.read_gopen = match flag_value(&tokens, "-O") {
        Some(v) => parse_num("-O", v)?,
        None => 6,
    };
    prof.read_gext = match flag_value(&tokens, "-E") {
        Some(v) => parse_num("-E", v)?,
        None => 1,
    };
    prof.ref_gopen = prof.read_gopen;
    prof.ref_gext = prof.read_gext;

    Ok(prof)
}

/// Derive a profile from another aligner's command line, so a benchmark can
/// score reads the way that tool would.
pub fn profile_from_command_line(cl: &str) -> Result<ScoreProfile, ProfileParseError> {
    if cl.contains("bowtie2") || cl.contains("hisat2") {
        bowtie2_profile(cl)
    } else if cl.contains("bwa mem") {
        bwa_mem_profile(cl)
    } else {
        Err(ProfileParseError::UnsupportedProgram(cl.to_string()))
    }
}

/// Score reported for a read whose target position was 0 (no target).
pub const TARGET_SCORE_UNDEFINED: i32 = i32::MIN;

/// Per-read alignment results, in input order.
///
/// Scores are post-bias: local scores are non-negative, end-to-end scores
/// are centred on zero. Positions are 1-based reference coordinates of the
/// cell that produced the score. `correct` is 0 when neither reported hit
/// matched the read's target window, 1 when the best hit did, 2 when the
/// second-best did.
#[derive(Debug, Clone, Default)]
pub struct Results {
    pub max_score: Vec<i32>,
    pub max_pos: Vec<u32>,
    pub max_count: Vec<u32>,
    pub sub_score: Vec<i32>,
    pub sub_pos: Vec<u32>,
    pub sub_count: Vec<u32>,
    pub correct: Vec<u8>,
    /// Best score observed at the read's target position, or
    /// [`TARGET_SCORE_UNDEFINED`] when no target was given.
    pub target_score: Vec<i32>,
    /// The profile the scores were produced with.
    pub profile: ScoreProfile,
}

impl Results {
    pub fn new() -> Results {
        Results::default()
    }

    pub fn resize(&mut self, len: usize) {
        self.max_score.resize(len, 0);
        self.max_pos.resize(len, 0);
        self.max_count.resize(len, 0);
        self.sub_score.resize(len, 0);
        self.sub_pos.resize(len, 0);
        self.sub_count.resize(len, 0);
        self.correct.resize(len, 0);
        self.target_score.resize(len, TARGET_SCORE_UNDEFINED);
    }

    pub fn len(&self) -> usize {
        self.max_score.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_score.is_empty()
    }

    /// Recompute the `correct` flags from reported positions: 1 when the
    /// best position is within `profile.tol` of the read's target, 2 when
    /// the second-best is, 0 otherwise. Reads with target 0 are skipped.
    pub fn finalize(&mut self, targets: &[u32]) {
        debug_assert_eq!(targets.len(), self.correct.len());
        let tol = self.profile.tol;
        for (i, &target) in targets.iter().enumerate() {
            self.correct[i] = if target == 0 {
                0
            } else if in_tolerance(self.max_pos[i], target, tol) {
                1
            } else if in_tolerance(self.sub_pos[i], target, tol) {
                2
            } else {
                0
            };
        }
    }

    /// Concatenate another record. The profiles must match; used when groups
    /// are aligned independently and stitched back in input order.
    pub fn append(&mut self, mut other: Results) {
        self.max_score.append(&mut other.max_score);
        self.max_pos.append(&mut other.max_pos);
        self.max_count.append(&mut other.max_count);
        self.sub_score.append(&mut other.sub_score);
        self.sub_pos.append(&mut other.sub_pos);
        self.sub_count.append(&mut other.sub_count);
        self.correct.append(&mut other.correct);
        self.target_score.append(&mut other.target_score);
        self.profile = other.profile;
    }
}

#[inline]
fn in_tolerance(pos: u32, target: u32, tol: u32) -> bool {
    target >= pos.saturating_sub(tol) && target <= pos.saturating_add(tol)
}
