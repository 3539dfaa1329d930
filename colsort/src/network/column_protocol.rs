// Column frame protocol for the distribute/collect rounds

use crate::errors::{Result, SortError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a frame within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Root → owner: unsorted column block
    Distribute,
    /// Owner → root: sorted column block
    Collect,
}

/// One column block in flight between two participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFrame {
    /// Run this frame belongs to, shared by the whole process group
    pub run_id: Uuid,
    /// Distribute or collect
    pub kind: FrameKind,
    /// Round (group index) this block belongs to
    pub round: u32,
    /// Rank of the sender
    pub source_rank: u32,
    /// Number of columns in the block
    pub group_width: u32,
    /// Values per column
    pub rows: u32,
    /// Column after column, each column contiguous
    pub values: Vec<f64>,
}

/// What a receiver expects the next frame to look like
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameExpectation {
    pub run_id: Uuid,
    pub kind: FrameKind,
    pub round: u32,
    /// Rank that must have sent the frame
    pub source_rank: u32,
    pub group_width: u32,
    pub rows: u32,
}

impl ColumnFrame {
    pub fn new(
        run_id: Uuid,
        kind: FrameKind,
        round: u32,
        source_rank: u32,
        group_width: u32,
        rows: u32,
        values: Vec<f64>,
    ) -> Self {
        Self {
            run_id,
            kind,
            round,
            source_rank,
            group_width,
            rows,
            values,
        }
    }

    /// Number of values the header announces
    pub fn expected_len(&self) -> usize {
        self.group_width as usize * self.rows as usize
    }

    /// Approximate size of this frame in bytes.
    ///
    /// Raw field sizes, not the CBOR-encoded size.
    pub fn size_bytes(&self) -> usize {
        // UUID (16) + kind (1) + round (4) + source_rank (4) + width (4) + rows (4)
        let fixed_size = 16 + 1 + 4 + 4 + 4 + 4;
        fixed_size + self.values.len() * std::mem::size_of::<f64>()
    }

    /// Check this frame against what the receiver derived from its own layout
    ///
    /// # Errors
    /// Returns `ProtocolMismatch` on any difference, including a payload whose
    /// length disagrees with `group_width * rows`.
    pub fn validate(&self, expected: &FrameExpectation) -> Result<()> {
        if self.run_id != expected.run_id {
            return Err(SortError::ProtocolMismatch(format!(
                "frame from run {} received in run {}",
                self.run_id, expected.run_id
            )));
        }
        if self.kind != expected.kind {
            return Err(SortError::ProtocolMismatch(format!(
                "expected {:?} frame, got {:?} from rank {}",
                expected.kind, self.kind, self.source_rank
            )));
        }
        if self.round != expected.round {
            return Err(SortError::ProtocolMismatch(format!(
                "expected round {}, got round {} from rank {}",
                expected.round, self.round, self.source_rank
            )));
        }
        if self.source_rank != expected.source_rank {
            return Err(SortError::ProtocolMismatch(format!(
                "round {} {:?} frame must come from rank {}, got rank {}",
                expected.round, expected.kind, expected.source_rank, self.source_rank
            )));
        }
        if self.group_width != expected.group_width || self.rows != expected.rows {
            return Err(SortError::ProtocolMismatch(format!(
                "expected {}x{} block, got {}x{} from rank {}",
                expected.group_width, expected.rows, self.group_width, self.rows, self.source_rank
            )));
        }
        let expected_len = expected.group_width as usize * expected.rows as usize;
        if self.values.len() != expected_len {
            return Err(SortError::ProtocolMismatch(format!(
                "expected {} values, got {} from rank {}",
                expected_len,
                self.values.len(),
                self.source_rank
            )));
        }
        Ok(())
    }

    /// Serialize to CBOR bytes
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| SortError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| SortError::Serialization(e.to_string()))
    }
}
