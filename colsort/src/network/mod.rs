//! Transport for the column sort collective
//!
//! - `column_protocol`: the CBOR frame carried between participants
//! - `process_group`: in-process participants, inboxes, barrier and group abort

pub mod column_protocol;
pub mod process_group;

pub use column_protocol::{ColumnFrame, FrameExpectation, FrameKind};
pub use process_group::{
    Communicator, GroupOptions, ParticipantContext, ProcessGroup, ROOT_RANK,
};
