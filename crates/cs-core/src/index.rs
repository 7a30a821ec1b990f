//! Index ranges and index blocks.
//!
//! An [`IndexBlock`] is a named, possibly disjoint subset of one model
//! dimension's index space, built from range expressions like
//! `"[1962:2000;2005;-1:1959]"`. It exposes a forward enumeration (block
//! position to model index) and a reverse lookup (model index to block
//! position). A negative literal in a range expression is the "open"
//! sentinel, substituted by the context-supplied model minimum or maximum at
//! resolution time.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// One end of an [`IndexRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Open: resolves to the model minimum (lower end) or maximum (upper end).
    Open,
    /// A specific index.
    At(i32),
}

/// A closed integer interval with optionally-open ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// Lower end.
    pub lo: Bound,
    /// Upper end.
    pub hi: Bound,
}

impl IndexRange {
    /// Closed range `[lo, hi]`.
    pub fn new(lo: i32, hi: i32) -> Self {
        Self { lo: Bound::At(lo), hi: Bound::At(hi) }
    }

    /// Single index.
    pub fn single(at: i32) -> Self {
        Self::new(at, at)
    }

    /// Fully open range (the whole model domain).
    pub fn open() -> Self {
        Self { lo: Bound::Open, hi: Bound::Open }
    }

    /// Parse `"x:y"` or `"x"`; a negative literal means "open" at that end.
    pub fn parse(s: &str) -> Result<Self> {
        let parse_end = |t: &str| -> Result<Bound> {
            let v: i32 = t
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("bad index range component '{t}'")))?;
            Ok(if v < 0 { Bound::Open } else { Bound::At(v) })
        };
        match s.split_once(':') {
            Some((a, b)) => Ok(Self { lo: parse_end(a)?, hi: parse_end(b)? }),
            None => {
                let b = parse_end(s)?;
                Ok(Self { lo: b, hi: b })
            }
        }
    }

    /// Substitute open ends and check the `lo <= hi` invariant.
    pub fn resolve(&self, model_min: i32, model_max: i32) -> Result<(i32, i32)> {
        let lo = match self.lo {
            Bound::Open => model_min,
            Bound::At(v) => v,
        };
        let hi = match self.hi {
            Bound::Open => model_max,
            Bound::At(v) => v,
        };
        if lo > hi {
            return Err(Error::Config(format!(
                "index range resolves to empty interval {lo}:{hi}"
            )));
        }
        Ok((lo, hi))
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = |b: &Bound| match b {
            Bound::Open => "-1".to_string(),
            Bound::At(v) => v.to_string(),
        };
        if self.lo == self.hi {
            write!(f, "{}", end(&self.lo))
        } else {
            write!(f, "{}:{}", end(&self.lo), end(&self.hi))
        }
    }
}

/// An ordered list of resolved index ranges over one dimension, with forward
/// and reverse index vectors. Built once at configuration time; immutable.
#[derive(Debug, Clone)]
pub struct IndexBlock {
    ranges: Vec<(i32, i32)>,
    fwd: Vec<i32>,
    rev: HashMap<i32, usize>,
}

impl IndexBlock {
    /// Build a block from ranges, resolving open ends against the model domain.
    pub fn from_ranges(
        ranges: &[IndexRange],
        model_min: i32,
        model_max: i32,
    ) -> Result<Self> {
        if ranges.is_empty() {
            return Err(Error::Config("index block has no ranges".into()));
        }
        let mut resolved = Vec::with_capacity(ranges.len());
        let mut fwd = Vec::new();
        let mut rev = HashMap::new();
        for r in ranges {
            let (lo, hi) = r.resolve(model_min, model_max)?;
            resolved.push((lo, hi));
            for i in lo..=hi {
                rev.entry(i).or_insert(fwd.len());
                fwd.push(i);
            }
        }
        Ok(Self { ranges: resolved, fwd, rev })
    }

    /// Parse the original `"[a:b;c;-1:d]"` notation.
    pub fn parse(s: &str, model_min: i32, model_max: i32) -> Result<Self> {
        let inner = s
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| {
                Error::Config(format!("index block '{s}' must be bracketed as [..]"))
            })?;
        let ranges: Vec<IndexRange> =
            inner.split(';').map(IndexRange::parse).collect::<Result<_>>()?;
        Self::from_ranges(&ranges, model_min, model_max)
    }

    /// Block covering `lo..=hi`.
    pub fn span(lo: i32, hi: i32) -> Result<Self> {
        Self::from_ranges(&[IndexRange::new(lo, hi)], lo, hi)
    }

    /// Number of model indices in the block.
    pub fn len(&self) -> usize {
        self.fwd.len()
    }

    /// Whether the block is empty (never true for a validly built block).
    pub fn is_empty(&self) -> bool {
        self.fwd.is_empty()
    }

    /// Forward enumeration: model indices in block order.
    pub fn indices(&self) -> &[i32] {
        &self.fwd
    }

    /// Whether the block covers model index `i`.
    pub fn contains(&self, i: i32) -> bool {
        self.rev.contains_key(&i)
    }

    /// Reverse lookup: block position of model index `i`, or None.
    pub fn position(&self, i: i32) -> Option<usize> {
        self.rev.get(&i).copied()
    }

    /// Smallest covered model index.
    pub fn min(&self) -> i32 {
        self.fwd.iter().copied().min().unwrap_or(0)
    }

    /// Largest covered model index.
    pub fn max(&self) -> i32 {
        self.fwd.iter().copied().max().unwrap_or(0)
    }
}

impl fmt::Display for IndexBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (k, (lo, hi)) in self.ranges.iter().enumerate() {
            if k > 0 {
                write!(f, ";")?;
            }
            if lo == hi {
                write!(f, "{lo}")?;
            } else {
                write!(f, "{lo}:{hi}")?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_parse_and_resolve() {
        let r = IndexRange::parse("1982:1990").unwrap();
        assert_eq!(r.resolve(1980, 2000).unwrap(), (1982, 1990));

        let open = IndexRange::parse("-1:1990").unwrap();
        assert_eq!(open.resolve(1980, 2000).unwrap(), (1980, 1990));

        let single = IndexRange::parse("1985").unwrap();
        assert_eq!(single.resolve(1980, 2000).unwrap(), (1985, 1985));
    }

    #[test]
    fn test_range_empty_after_resolution_is_error() {
        let r = IndexRange::new(1990, 1982);
        assert!(r.resolve(1980, 2000).is_err());
    }

    #[test]
    fn test_block_forward_and_reverse() {
        let b = IndexBlock::parse("[1982:1984;1990]", 1980, 2000).unwrap();
        assert_eq!(b.len(), 4);
        assert_eq!(b.indices(), &[1982, 1983, 1984, 1990]);
        assert_eq!(b.position(1983), Some(1));
        assert_eq!(b.position(1990), Some(3));
        assert_eq!(b.position(1985), None);
        assert!(!b.contains(1981));
        assert_eq!(b.min(), 1982);
        assert_eq!(b.max(), 1990);
    }

    #[test]
    fn test_block_open_sentinel() {
        let b = IndexBlock::parse("[-1:1982;1995:-1]", 1980, 1997).unwrap();
        assert_eq!(b.indices(), &[1980, 1981, 1982, 1995, 1996, 1997]);
    }

    #[test]
    fn test_block_rejects_malformed() {
        assert!(IndexBlock::parse("1982:1984", 1980, 2000).is_err());
        assert!(IndexBlock::parse("[1982:x]", 1980, 2000).is_err());
    }

    #[test]
    fn test_block_display_round_trip() {
        let b = IndexBlock::parse("[1982:1984;1990]", 1980, 2000).unwrap();
        let shown = b.to_string();
        let again = IndexBlock::parse(&shown, 1980, 2000).unwrap();
        assert_eq!(again.indices(), b.indices());
    }
}
