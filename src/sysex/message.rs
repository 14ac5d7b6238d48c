//! Sysex Message Builder
//!
//! Wraps remapped programs in DW-8000 data dump messages, optionally followed by
//! a write request that stores the edit buffer into the matching memory slot.
//! Payloads exclude the `F0`/`F7` framing, which the container adds.

use log::{debug, warn};

use crate::config::DecodeConfig;
use crate::sysex::mapping::{SysexParameterSet, SYSEX_PARAM_COUNT};
use crate::tape::{DEVICE_ID, MANUFACTURER_ID, PATCH_COUNT};

/// Status nibble of the format byte (`0x3n`, n = MIDI channel)
pub const FORMAT_STATUS: u8 = 0x30;

/// Function code of a program data dump
pub const DATA_DUMP: u8 = 0x40;

/// Function code of a write (store to slot) request
pub const WRITE_REQUEST: u8 = 0x11;

/// Length of a dump payload: four header bytes plus the parameters
pub const DUMP_PAYLOAD_LEN: usize = 4 + SYSEX_PARAM_COUNT;

/// One DW-8000 system exclusive message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysexMessage {
    /// Program parameters for the edit buffer
    ProgramDump {
        channel: u8,
        params: SysexParameterSet,
    },
    /// Store the edit buffer into memory slot `slot` (0-63)
    Store { channel: u8, slot: u8 },
}

impl SysexMessage {
    /// Payload bytes, without `F0`/`F7`
    pub fn payload(&self) -> Vec<u8> {
        match self {
            SysexMessage::ProgramDump { channel, params } => {
                let mut payload = Vec::with_capacity(DUMP_PAYLOAD_LEN);
                payload.extend_from_slice(&header(*channel, DATA_DUMP));
                payload.extend_from_slice(params);
                payload
            }
            SysexMessage::Store { channel, slot } => {
                let mut payload = header(*channel, WRITE_REQUEST).to_vec();
                payload.push(*slot);
                payload
            }
        }
    }

    /// Recognise a payload produced by this module
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 4
            || payload[0] != MANUFACTURER_ID
            || payload[1] & 0xF0 != FORMAT_STATUS
            || payload[2] != DEVICE_ID
        {
            return None;
        }
        let channel = payload[1] & 0x0F;
        match payload[3] {
            DATA_DUMP if payload.len() == DUMP_PAYLOAD_LEN => {
                let mut params = [0u8; SYSEX_PARAM_COUNT];
                params.copy_from_slice(&payload[4..]);
                Some(SysexMessage::ProgramDump { channel, params })
            }
            WRITE_REQUEST if payload.len() == 5 => Some(SysexMessage::Store {
                channel,
                slot: payload[4],
            }),
            _ => None,
        }
    }

    /// Parameters if this is a program dump
    pub fn params(&self) -> Option<&SysexParameterSet> {
        match self {
            SysexMessage::ProgramDump { params, .. } => Some(params),
            SysexMessage::Store { .. } => None,
        }
    }
}

fn header(channel: u8, function: u8) -> [u8; 4] {
    [
        MANUFACTURER_ID,
        FORMAT_STATUS | (channel & 0x0F),
        DEVICE_ID,
        function,
    ]
}

/// True if `payload` is a well-formed DW-8000 program dump on any channel
pub fn is_program_dump(payload: &[u8]) -> bool {
    matches!(
        SysexMessage::parse(payload),
        Some(SysexMessage::ProgramDump { .. })
    )
}

/// Messages built from a sequence of programs
#[derive(Debug, Clone, Default)]
pub struct SysexBuild {
    /// Messages in output order
    pub messages: Vec<SysexMessage>,
    /// Program indices that got no store message because no slot exists for them
    pub unslotted: Vec<usize>,
}

impl SysexBuild {
    /// False if any program could not be given a store slot
    pub fn success(&self) -> bool {
        self.unslotted.is_empty()
    }

    /// All payloads in order
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.messages.iter().map(SysexMessage::payload).collect()
    }
}

/// Build dump (and optionally store) messages for every program
pub fn build_messages(programs: &[SysexParameterSet], config: &DecodeConfig) -> SysexBuild {
    let channel = config.midi_channel & 0x0F;
    let mut build = SysexBuild::default();

    for (index, params) in programs.iter().enumerate() {
        build.messages.push(SysexMessage::ProgramDump {
            channel,
            params: *params,
        });

        if config.store {
            if index < PATCH_COUNT {
                build.messages.push(SysexMessage::Store {
                    channel,
                    slot: index as u8,
                });
            } else {
                warn!("Too many patches: no store slot for patch {}", index);
                build.unslotted.push(index);
            }
        }
    }

    debug!(
        "Built {} sysex message(s) for {} program(s)",
        build.messages.len(),
        programs.len()
    );
    build
}
