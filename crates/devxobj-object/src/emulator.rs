use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use devxobj_transport::{CommandTransport, TransportError};
use devxobj_wire::bitfield::{set_u32, set_u8};
use devxobj_wire::general::{opcode_name, output};
use devxobj_wire::{
    EncodingError, HEADER_SIZE, OBJ_TYPE_TLP_EMU_CHANNEL, OPCODE_CREATE, OPCODE_DESTROY,
    OPCODE_QUERY,
};
use tracing::debug;

use crate::body::ObjectBody;
use crate::builder::decode_input_header;
use crate::channel::ChannelConfig;
use crate::region::MemoryRegion;
use crate::syndrome::{code, CommandStatus};

/// Emulator limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Live objects before CREATE fails with a resource allocation syndrome.
    /// Default: 64.
    pub max_objects: usize,
    /// Fail CREATE with an address translation syndrome unless the queue
    /// lies inside a region registered under the same memory key.
    /// Default: `false`.
    pub enforce_registered_regions: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            max_objects: 64,
            enforce_registered_regions: false,
        }
    }
}

#[derive(Debug)]
struct State {
    next_id: u32,
    objects: BTreeMap<u32, ChannelConfig>,
    regions: Vec<MemoryRegion>,
    injected: HashMap<u16, (u8, u32)>,
    submissions: usize,
}

/// In-process [`CommandTransport`] that answers generic-object commands for
/// channel objects the way device firmware does.
///
/// CREATE checks run in firmware order: object type, protocol mode, queue
/// size, queue address, memory key, address translation, capacity. The
/// first failing check decides the syndrome.
#[derive(Debug)]
pub struct EmulatedFirmware {
    config: EmulatorConfig,
    state: Mutex<State>,
}

impl Default for EmulatedFirmware {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatedFirmware {
    pub fn new() -> Self {
        Self::with_config(EmulatorConfig::default())
    }

    pub fn with_config(config: EmulatorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                next_id: 1,
                objects: BTreeMap::new(),
                regions: Vec::new(),
                injected: HashMap::new(),
                submissions: 0,
            }),
        }
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// Make a memory range translatable under `key`.
    pub fn register_region(&self, address: u64, size: u32, key: u32) {
        self.lock().regions.push(MemoryRegion::new(address, size, key));
    }

    /// Fail the next command with `opcode` with the given status and
    /// syndrome, before any other check.
    pub fn inject_failure(&self, opcode: u16, status: u8, syndrome: u32) {
        self.lock().injected.insert(opcode, (status, syndrome));
    }

    pub fn live_objects(&self) -> usize {
        self.lock().objects.len()
    }

    /// Commands received so far, including rejected ones.
    pub fn submissions(&self) -> usize {
        self.lock().submissions
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(
        &self,
        state: &mut State,
        input: &[u8],
        out_capacity: usize,
    ) -> Result<Vec<u8>, EncodingError> {
        let Ok(header) = decode_input_header(input) else {
            return failure(CommandStatus::BAD_INPUT_LEN, 0);
        };
        if !matches!(header.opcode, OPCODE_CREATE | OPCODE_QUERY | OPCODE_DESTROY) {
            return failure(CommandStatus::BAD_OP, 0);
        }
        if let Some((status, syndrome)) = state.injected.remove(&header.opcode) {
            return failure(status, syndrome);
        }
        if header.obj_type != OBJ_TYPE_TLP_EMU_CHANNEL {
            return failure(CommandStatus::BAD_PARAM, code::OBJECT_TYPE_UNSUPPORTED);
        }

        match header.opcode {
            OPCODE_CREATE => self.create(state, input),
            OPCODE_QUERY => match state.objects.get(&header.obj_id) {
                None => failure(CommandStatus::BAD_PARAM, code::INVALID_OBJECT_ID),
                Some(_) if out_capacity < HEADER_SIZE + ChannelConfig::LAYOUT.size() => {
                    failure(CommandStatus::BAD_OUTPUT_LEN, 0)
                }
                Some(config) => {
                    let mut out = success(header.obj_id, ChannelConfig::LAYOUT.size())?;
                    config.encode(&mut out[HEADER_SIZE..])?;
                    Ok(out)
                }
            },
            _ => match state.objects.remove(&header.obj_id) {
                Some(_) => success(header.obj_id, 0),
                None => failure(CommandStatus::BAD_PARAM, code::INVALID_OBJECT_ID),
            },
        }
    }

    fn create(&self, state: &mut State, input: &[u8]) -> Result<Vec<u8>, EncodingError> {
        let Some(body) = input.get(HEADER_SIZE..HEADER_SIZE + ChannelConfig::LAYOUT.size())
        else {
            return failure(CommandStatus::BAD_INPUT_LEN, 0);
        };
        // Decoding through the typed config drops any reserved bits.
        let config = ChannelConfig::decode(body)?;

        if config.protocol_mode != ChannelConfig::SUPPORTED_PROTOCOL_MODE {
            return failure(CommandStatus::BAD_PARAM, code::INVALID_PROTOCOL_MODE);
        }
        if config.queue_size == 0 || config.queue_size > ChannelConfig::MAX_QUEUE_SIZE {
            return failure(CommandStatus::BAD_PARAM, code::INVALID_QUEUE_SIZE);
        }
        if config.queue_address == 0 {
            return failure(CommandStatus::BAD_PARAM, code::INVALID_QUEUE_ADDRESS);
        }
        if config.memory_key == 0 {
            return failure(CommandStatus::BAD_PARAM, code::INVALID_MEMORY_KEY);
        }
        if self.config.enforce_registered_regions
            && !state.regions.iter().any(|region| {
                region.key() == config.memory_key
                    && region.contains(config.queue_address, config.queue_size)
            })
        {
            return failure(CommandStatus::BAD_RESOURCE, code::ADDRESS_TRANSLATION_FAILED);
        }
        if state.objects.len() >= self.config.max_objects {
            return failure(CommandStatus::NO_RESOURCES, code::RESOURCE_ALLOCATION_FAILED);
        }

        let object_id = allocate_id(state);
        state.objects.insert(object_id, config);
        success(object_id, 0)
    }
}

impl CommandTransport for EmulatedFirmware {
    fn submit(&self, input: &[u8], out_capacity: usize) -> devxobj_transport::Result<Vec<u8>> {
        let mut state = self.lock();
        state.submissions += 1;

        let out = self
            .execute(&mut state, input, out_capacity)
            .map_err(|err| TransportError::Remote(format!("emulated firmware fault: {err}")))?;
        debug!(
            opcode = decode_input_header(input).map(|h| opcode_name(h.opcode)).unwrap_or("?"),
            status = out[0],
            out_len = out.len(),
            live = state.objects.len(),
            "emulated command"
        );

        if out.len() > out_capacity {
            return Err(TransportError::ResponseTooLarge {
                size: out.len(),
                capacity: out_capacity,
            });
        }
        Ok(out)
    }

    fn transport_name(&self) -> &'static str {
        "emulated-firmware"
    }
}

fn allocate_id(state: &mut State) -> u32 {
    loop {
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1).max(1);
        if !state.objects.contains_key(&id) {
            return id;
        }
    }
}

fn success(object_id: u32, body_len: usize) -> Result<Vec<u8>, EncodingError> {
    let mut out = vec![0u8; HEADER_SIZE + body_len];
    set_u32(&mut out, &output::OBJ_ID, object_id)?;
    Ok(out)
}

fn failure(status: u8, syndrome: u32) -> Result<Vec<u8>, EncodingError> {
    let mut out = vec![0u8; HEADER_SIZE];
    set_u8(&mut out, &output::STATUS, status)?;
    set_u32(&mut out, &output::SYNDROME, syndrome)?;
    Ok(out)
}
