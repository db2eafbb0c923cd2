//! Version range bindings.

use shared_types::AppVersion;

use crate::error::{MultiplexerError, MultiplexerResult};

/// Inclusive range of app versions served by one state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub from: AppVersion,
    pub to: AppVersion,
}

impl VersionRange {
    pub fn new(from: AppVersion, to: AppVersion) -> MultiplexerResult<Self> {
        if from == 0 || from > to {
            return Err(MultiplexerError::InvalidVersionRange { from, to });
        }
        Ok(Self { from, to })
    }

    pub fn single(version: AppVersion) -> MultiplexerResult<Self> {
        Self::new(version, version)
    }

    pub fn contains(&self, version: AppVersion) -> bool {
        (self.from..=self.to).contains(&version)
    }
}

/// Ordered, non-overlapping bindings from version ranges to values.
#[derive(Debug, Clone)]
pub struct Versions<T> {
    entries: Vec<(VersionRange, T)>,
}

impl<T> Versions<T> {
    /// Sort by range start and reject empty input or overlaps.
    pub fn new(mut entries: Vec<(VersionRange, T)>) -> MultiplexerResult<Self> {
        if entries.is_empty() {
            return Err(MultiplexerError::NoBindings);
        }
        entries.sort_by_key(|(range, _)| range.from);
        for pair in entries.windows(2) {
            let (previous, next) = (pair[0].0, pair[1].0);
            if next.from <= previous.to {
                return Err(MultiplexerError::OverlappingRanges { version: next.from });
            }
        }
        Ok(Self { entries })
    }

    /// The value whose range contains `version`.
    pub fn get(&self, version: AppVersion) -> Option<&T> {
        self.entries
            .iter()
            .find(|(range, _)| range.contains(version))
            .map(|(_, value)| value)
    }

    pub fn range_of(&self, version: AppVersion) -> Option<VersionRange> {
        self.entries
            .iter()
            .map(|(range, _)| *range)
            .find(|range| range.contains(version))
    }

    pub fn contains(&self, version: AppVersion) -> bool {
        self.range_of(version).is_some()
    }

    pub fn first_version(&self) -> AppVersion {
        self.entries.first().map_or(0, |(range, _)| range.from)
    }

    pub fn last_version(&self) -> AppVersion {
        self.entries.last().map_or(0, |(range, _)| range.to)
    }

    pub fn ranges(&self) -> impl Iterator<Item = VersionRange> + '_ {
        self.entries.iter().map(|(range, _)| *range)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
