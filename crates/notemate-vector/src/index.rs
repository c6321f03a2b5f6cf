//! Exact nearest-neighbor index under squared Euclidean distance.
//!
//! Vectors are stored row-major in one flat buffer; position *i* is the
//! *i*-th vector ever added. The index is append-only.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;
use tracing::debug;

use notemate_core::error::{Error, Result};
use notemate_core::types::{Embedding, Position};

const INDEX_MAGIC: u32 = 0x5846_4d4e; // "NMFX"
const INDEX_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4 + 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("blob too short ({0} bytes)")]
    TooShort(usize),
    #[error("invalid magic {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u16),
    #[error("zero dimension")]
    ZeroDimension,
    #[error("expected {expected} data bytes, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::invalid_config("index dimension must be positive"));
        }
        Ok(Self { dimension, data: Vec::new() })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn vector(&self, position: Position) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    /// Append `vectors`; the first lands at position `self.len()`.
    ///
    /// Every vector is checked before anything is appended, so a dimension
    /// mismatch leaves the index untouched.
    pub fn add(&mut self, vectors: &[Embedding]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        debug!(added = vectors.len(), total = self.len(), "index append");
        Ok(())
    }

    /// Up to `k` `(position, squared distance)` pairs, nearest first.
    /// Equal distances are ordered by position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Position, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // max-heap holding the k best candidates seen so far
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (position, row) in self.data.chunks_exact(self.dimension).enumerate() {
            heap.push(Candidate { distance: squared_l2(query, row), position });
            if heap.len() > k {
                heap.pop();
            }
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (c.position, c.distance))
            .collect())
    }

    /// Encode as `magic | version | dimension | count | f32 data`, little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        buffer.extend_from_slice(&INDEX_MAGIC.to_le_bytes());
        buffer.extend_from_slice(&INDEX_VERSION.to_le_bytes());
        buffer.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        buffer
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::TooShort(bytes.len()));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if magic != INDEX_MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != INDEX_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let dimension =
            u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
        if dimension == 0 {
            return Err(DecodeError::ZeroDimension);
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&header[10..18]);
        let count = u64::from_le_bytes(count) as usize;

        let expected = count.saturating_mul(dimension).saturating_mul(4);
        if body.len() != expected {
            return Err(DecodeError::LengthMismatch { expected, actual: body.len() });
        }
        let data = body
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(Self { dimension, data })
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    position: Position,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}
