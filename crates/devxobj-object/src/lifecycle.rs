use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use devxobj_transport::CommandTransport;
use devxobj_wire::general::opcode_name;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::body::ObjectBody;
use crate::builder::{
    build_create, build_destroy, build_query, parse_create_response, parse_destroy_response,
    parse_query_response, CommandBuffer,
};
use crate::channel::ChannelConfig;
use crate::error::{LifecycleError, Result, ValidationError};
use crate::region::MemoryRegion;
use crate::syndrome::Syndrome;

/// Lifecycle policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Reject unsupported protocol modes locally instead of letting firmware
    /// answer with a syndrome. Default: `false`.
    pub strict_protocol_mode: bool,
    /// Largest accepted queue size in bytes. Default: 64 KiB. Values above
    /// [`ChannelConfig::MAX_QUEUE_SIZE`] do not raise the limit.
    pub max_queue_size: u32,
    /// Require the queue to lie inside the handle's region and the memory key
    /// to match the region key. Default: `true`.
    pub check_region: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            strict_protocol_mode: false,
            max_queue_size: ChannelConfig::MAX_QUEUE_SIZE,
            check_region: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleState {
    Uncreated,
    Created,
    Destroyed,
}

impl HandleState {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleState::Uncreated => "uncreated",
            HandleState::Created => "created",
            HandleState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local view of one firmware object of body type `B`.
///
/// The handle holds the memory region it will bind. While the handle is
/// `Created` the region is bound to the firmware object and cannot be
/// released; otherwise [`ObjectHandle::release_region`] hands it back.
#[derive(Debug)]
pub struct ObjectHandle<B: ObjectBody> {
    state: HandleState,
    object_id: Option<u32>,
    region: Option<MemoryRegion>,
    _body: PhantomData<fn() -> B>,
}

impl<B: ObjectBody> ObjectHandle<B> {
    pub fn new(region: MemoryRegion) -> Self {
        Self {
            state: HandleState::Uncreated,
            object_id: None,
            region: Some(region),
            _body: PhantomData,
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Firmware-assigned id; set once CREATE succeeds and kept after DESTROY
    /// for diagnostics.
    pub fn object_id(&self) -> Option<u32> {
        self.object_id
    }

    pub fn object_type(&self) -> u16 {
        B::OBJ_TYPE
    }

    pub fn region(&self) -> Option<&MemoryRegion> {
        self.region.as_ref()
    }

    /// Whether the region is currently bound to a live firmware object.
    pub fn is_bound(&self) -> bool {
        self.state == HandleState::Created
    }

    /// Take the memory region back. Refused while the object is live.
    pub fn release_region(&mut self) -> Result<MemoryRegion> {
        if self.state == HandleState::Created {
            return Err(LifecycleError::InvalidState {
                operation: "release the region of",
                state: self.state,
            });
        }
        self.region.take().ok_or(LifecycleError::RegionReleased)
    }

    fn require(&self, operation: &'static str, state: HandleState) -> Result<()> {
        if self.state != state {
            return Err(LifecycleError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl<B: ObjectBody> Drop for ObjectHandle<B> {
    fn drop(&mut self) {
        if self.state == HandleState::Created {
            warn!(
                object_id = ?self.object_id,
                obj_type = B::OBJ_TYPE,
                "object handle dropped while created; firmware object leaked"
            );
        }
    }
}

/// Outcome of [`ObjectLifecycleManager::probe_support`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    /// A probe object was created and destroyed again.
    Supported { object_id: u32 },
    /// Firmware refused to create the probe object.
    Unsupported(Syndrome),
}

/// Drives CREATE, QUERY and DESTROY for object handles.
///
/// The manager holds no per-handle state. It does track which memory keys
/// are bound to live objects so that one region never backs two objects.
#[derive(Debug, Default)]
pub struct ObjectLifecycleManager {
    config: LifecycleConfig,
    bound_keys: Mutex<HashSet<u32>>,
}

impl ObjectLifecycleManager {
    /// Queue size used by [`Self::probe_support`].
    pub const PROBE_QUEUE_SIZE: u32 = 512;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LifecycleConfig) -> Self {
        Self {
            config,
            bound_keys: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Create the firmware object described by `body` and bind the handle's
    /// region to it.
    ///
    /// Local validation, encoding and state errors return before anything
    /// is submitted. On any failure the handle stays `Uncreated`.
    pub fn create<B, T>(
        &self,
        transport: &T,
        handle: &mut ObjectHandle<B>,
        body: &B,
    ) -> Result<u32>
    where
        B: ObjectBody,
        T: CommandTransport + ?Sized,
    {
        handle.require("create", HandleState::Uncreated)?;
        let region = handle.region.as_ref().ok_or(LifecycleError::RegionReleased)?;

        body.validate(&self.config)?;
        if self.config.check_region {
            body.check_region(region)?;
        }
        let cmd = build_create(body)?;

        let key = region.key();
        if !self.keys().insert(key) {
            return Err(ValidationError::RegionInUse(key).into());
        }

        let object_id = match submit(transport, &cmd, None).and_then(|out| {
            parse_create_response(&out).map_err(|err| rejected(&cmd, None, err.into()))
        }) {
            Ok(object_id) => object_id,
            Err(err) => {
                self.keys().remove(&key);
                return Err(err);
            }
        };

        handle.state = HandleState::Created;
        handle.object_id = Some(object_id);
        info!(object_id, obj_type = B::OBJ_TYPE, mkey = key, "object created");
        Ok(object_id)
    }

    /// Read back the configuration firmware holds for a live object.
    pub fn query<B, T>(&self, transport: &T, handle: &ObjectHandle<B>) -> Result<B>
    where
        B: ObjectBody,
        T: CommandTransport + ?Sized,
    {
        handle.require("query", HandleState::Created)?;
        let object_id = live_id(handle)?;

        let cmd = build_query::<B>(object_id)?;
        let out = submit(transport, &cmd, Some(object_id))?;
        parse_query_response(&out).map_err(|err| rejected(&cmd, Some(object_id), err.into()))
    }

    /// Destroy a live object and release the region binding.
    ///
    /// On failure the handle stays `Created`.
    pub fn destroy<B, T>(&self, transport: &T, handle: &mut ObjectHandle<B>) -> Result<()>
    where
        B: ObjectBody,
        T: CommandTransport + ?Sized,
    {
        handle.require("destroy", HandleState::Created)?;
        let object_id = live_id(handle)?;

        let cmd = build_destroy::<B>(object_id)?;
        let out = submit(transport, &cmd, Some(object_id))?;
        parse_destroy_response(&out).map_err(|err| rejected(&cmd, Some(object_id), err.into()))?;

        handle.state = HandleState::Destroyed;
        if let Some(region) = handle.region.as_ref() {
            self.keys().remove(&region.key());
        }
        info!(object_id, obj_type = B::OBJ_TYPE, "object destroyed");
        Ok(())
    }

    /// Check whether firmware supports channel objects by creating a minimal
    /// one (512-byte queue at the start of the region, stride 1) and
    /// destroying it again.
    ///
    /// On `Supported` the handle ends `Destroyed`; on `Unsupported` it stays
    /// `Uncreated`. Either way the region can then be released.
    pub fn probe_support<T>(
        &self,
        transport: &T,
        handle: &mut ObjectHandle<ChannelConfig>,
    ) -> Result<Support>
    where
        T: CommandTransport + ?Sized,
    {
        let region = handle.region().ok_or(LifecycleError::RegionReleased)?;
        if region.size() < Self::PROBE_QUEUE_SIZE {
            return Err(ValidationError::RegionTooSmall {
                size: region.size(),
                required: Self::PROBE_QUEUE_SIZE,
            }
            .into());
        }
        let probe = ChannelConfig::new(region.address(), Self::PROBE_QUEUE_SIZE, region.key())
            .with_stride_index(1);

        let object_id = match self.create(transport, handle, &probe) {
            Ok(object_id) => object_id,
            Err(LifecycleError::Firmware(syndrome)) => {
                info!(%syndrome, "channel objects not supported");
                return Ok(Support::Unsupported(syndrome));
            }
            Err(err) => return Err(err),
        };
        self.destroy(transport, handle)?;
        Ok(Support::Supported { object_id })
    }

    fn keys(&self) -> std::sync::MutexGuard<'_, HashSet<u32>> {
        self.bound_keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn live_id<B: ObjectBody>(handle: &ObjectHandle<B>) -> Result<u32> {
    handle.object_id.ok_or(LifecycleError::InvalidState {
        operation: "address",
        state: handle.state,
    })
}

fn submit<T>(transport: &T, cmd: &CommandBuffer, object_id: Option<u32>) -> Result<Vec<u8>>
where
    T: CommandTransport + ?Sized,
{
    debug!(
        opcode = opcode_name(cmd.opcode()),
        obj_type = cmd.obj_type(),
        ?object_id,
        in_len = cmd.len(),
        out_capacity = cmd.out_capacity(),
        transport = transport.transport_name(),
        "submitting command"
    );
    Ok(transport.submit(cmd.as_bytes(), cmd.out_capacity())?)
}

fn rejected(cmd: &CommandBuffer, object_id: Option<u32>, err: LifecycleError) -> LifecycleError {
    if let Some(syndrome) = err.syndrome() {
        if syndrome.is_known() {
            warn!(
                opcode = opcode_name(cmd.opcode()),
                ?object_id,
                syndrome = %syndrome,
                "firmware rejected command"
            );
        } else {
            warn!(
                opcode = opcode_name(cmd.opcode()),
                ?object_id,
                raw_code = syndrome.raw_code,
                status = syndrome.status.as_byte(),
                "firmware rejected command with unknown syndrome"
            );
        }
    }
    err
}
