//! Mesh stack adapter: OpenThread behind the network, registration and
//! request ports.
//!
//! - **`target_os = "espidf"`**: drives the OpenThread instance that
//!   ESP-IDF runs on its own task.  Every call takes the stack lock for its
//!   own duration only; stack callbacks push [`Event`]s and never call back
//!   into the engine.
//! - **`not(target_os = "espidf")`**: records every call in a
//!   [`SimStack`] so the engine can be exercised on the host.

use core::net::Ipv6Addr;

use log::info;

use crate::app::model::{DeviceRole, LinkMode};
use crate::app::ports::{NetworkStatusPort, RequestPort, ServiceRegistrationPort};
use crate::app::registration::ServiceDescription;
use crate::app::wire::{OutboundRequest, RequestToken};
use crate::error::{NetworkError, RegistrationError, TransportError};
use crate::identity::NodeIdentity;

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

/// Pre-shared device key presented to the commissioner.
pub const JOINER_PSKD: &str = "J01NME";

/// Poll interval while waiting for a bounded stack operation.
#[cfg(target_os = "espidf")]
const WAIT_STEP_MS: u32 = 50;

// ── Simulation state ──────────────────────────────────────────

/// A request captured by the simulated stack.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub method: crate::app::wire::Method,
    pub destination: crate::app::wire::Destination,
    pub resource: &'static str,
    pub payload: Vec<u8>,
    pub reply: Option<crate::app::wire::ReplyKind>,
}

/// Everything the simulated stack was asked to do.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimStack {
    pub role: DeviceRole,
    pub link_mode: LinkMode,
    pub poll_period_ms: u32,
    pub joiner_starts: u32,
    pub factory_resets: u32,
    pub sent: Vec<SentRequest>,
    pub responses: Vec<(RequestToken, Vec<u8>)>,
    pub host_name: Option<String>,
    pub host_address: Option<Ipv6Addr>,
    pub services: Vec<ServiceDescription>,
    pub autostart: bool,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimStack {
    fn default() -> Self {
        Self {
            role: DeviceRole::Disabled,
            link_mode: LinkMode {
                rx_on_when_idle: false,
                full_thread_device: false,
                full_network_data: false,
            },
            poll_period_ms: 3_000,
            joiner_starts: 0,
            factory_resets: 0,
            sent: Vec::new(),
            responses: Vec::new(),
            host_name: None,
            host_address: None,
            services: Vec::new(),
            autostart: false,
        }
    }
}

// ── SRP records (espidf) ──────────────────────────────────────

/// Storage the SRP client points into.  Boxed so addresses stay stable
/// for as long as the client holds them.
#[cfg(target_os = "espidf")]
struct SrpRecords {
    host_name: std::ffi::CString,
    host_address: esp_idf_svc::sys::otIp6Address,
    instance: std::ffi::CString,
    service_type: std::ffi::CString,
    txt_data: Vec<u8>,
    txt: esp_idf_svc::sys::otDnsTxtEntry,
    service: esp_idf_svc::sys::otSrpClientService,
    service_added: bool,
}

/// Concrete adapter over the mesh stack.
pub struct ThreadAdapter {
    #[cfg(target_os = "espidf")]
    srp: Box<SrpRecords>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimStack,
}

#[cfg(not(target_os = "espidf"))]
impl Default for ThreadAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl ThreadAdapter {
    pub fn new() -> Self {
        info!("Thread(sim): stack ready");
        Self {
            sim: SimStack::default(),
        }
    }

    pub fn sim(&self) -> &SimStack {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut SimStack {
        &mut self.sim
    }
}

#[cfg(not(target_os = "espidf"))]
impl NetworkStatusPort for ThreadAdapter {
    fn role(&self) -> DeviceRole {
        self.sim.role
    }

    fn link_mode(&self) -> LinkMode {
        self.sim.link_mode
    }

    fn set_link_mode(&mut self, mode: LinkMode) -> Result<(), NetworkError> {
        self.sim.link_mode = mode;
        Ok(())
    }

    fn poll_period_ms(&self) -> u32 {
        self.sim.poll_period_ms
    }

    fn set_poll_period_ms(&mut self, period_ms: u32) -> Result<(), NetworkError> {
        self.sim.poll_period_ms = period_ms;
        Ok(())
    }

    fn identity(&self) -> NodeIdentity {
        let mut stack_version = heapless::String::new();
        let _ = stack_version.push_str("sim");
        NodeIdentity {
            eui64: crate::identity::read_factory_eui64(),
            ext_address: [0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0],
            rloc16: 0x4401,
            mesh_local_eid: Ipv6Addr::new(0xfd00, 0xdb8, 0, 0, 0, 0, 0, 0x1),
            slaac_address: None,
            stack_version,
            thread_version: 4,
        }
    }

    fn start_joiner(&mut self) -> Result<(), NetworkError> {
        if self.sim.role.is_attached() {
            return Err(NetworkError::InvalidState);
        }
        self.sim.joiner_starts += 1;
        info!("Thread(sim): joiner started (pskd={})", JOINER_PSKD);
        Ok(())
    }

    fn factory_reset(&mut self) {
        self.sim.factory_resets += 1;
        self.sim.role = DeviceRole::Disabled;
        info!("Thread(sim): factory reset");
    }
}

#[cfg(not(target_os = "espidf"))]
impl ServiceRegistrationPort for ThreadAdapter {
    fn set_host_name(&mut self, name: &str) -> Result<(), RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::InvalidName);
        }
        self.sim.host_name = Some(name.to_owned());
        Ok(())
    }

    fn set_host_address(&mut self, address: Ipv6Addr) -> Result<(), RegistrationError> {
        self.sim.host_address = Some(address);
        Ok(())
    }

    fn add_service(&mut self, service: &ServiceDescription) -> Result<(), RegistrationError> {
        if self.sim.services.iter().any(|s| s.instance == service.instance) {
            return Ok(());
        }
        self.sim.services.push(service.clone());
        Ok(())
    }

    fn enable_autostart(&mut self) -> Result<(), RegistrationError> {
        self.sim.autostart = true;
        Ok(())
    }

    fn remove_all(&mut self, _timeout_ms: u32) -> Result<(), RegistrationError> {
        self.sim.host_name = None;
        self.sim.host_address = None;
        self.sim.services.clear();
        self.sim.autostart = false;
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl RequestPort for ThreadAdapter {
    fn send(&mut self, request: &OutboundRequest<'_>) -> Result<(), TransportError> {
        self.sim.sent.push(SentRequest {
            method: request.method,
            destination: request.destination,
            resource: request.resource,
            payload: request.payload.to_vec(),
            reply: request.reply,
        });
        Ok(())
    }

    fn respond(&mut self, token: RequestToken, payload: &[u8]) -> Result<(), TransportError> {
        self.sim.responses.push((token, payload.to_vec()));
        Ok(())
    }
}

// ── OpenThread (espidf) ───────────────────────────────────────

#[cfg(target_os = "espidf")]
mod ot_glue {
    use core::ffi::c_void;

    use esp_idf_svc::sys::*;
    use log::warn;

    use super::{push_event, Event};
    use crate::app::model::{DeviceRole, JoinerState};
    use crate::app::registration::RegistrationOutcome;
    use crate::error::{NetworkError, RegistrationError};

    /// Scoped OpenThread API lock.
    pub struct OtLock;

    impl OtLock {
        pub fn acquire() -> Self {
            // SAFETY: blocks until the stack task releases the lock.
            unsafe { esp_openthread_lock_acquire(esp_idf_hal::delay::BLOCK) };
            Self
        }
    }

    impl Drop for OtLock {
        fn drop(&mut self) {
            // SAFETY: paired with the acquire above.
            unsafe { esp_openthread_lock_release() };
        }
    }

    pub fn instance() -> *mut otInstance {
        // SAFETY: the instance is created once at start-up and never freed.
        unsafe { esp_openthread_get_instance() }
    }

    pub fn network_error(err: otError) -> NetworkError {
        if err == otError_OT_ERROR_INVALID_ARGS {
            NetworkError::InvalidArgs
        } else if err == otError_OT_ERROR_INVALID_STATE {
            NetworkError::InvalidState
        } else {
            NetworkError::Failed
        }
    }

    pub fn registration_error(err: otError) -> RegistrationError {
        if err == otError_OT_ERROR_INVALID_ARGS {
            RegistrationError::InvalidName
        } else if err == otError_OT_ERROR_NO_BUFS {
            RegistrationError::NoSlots
        } else if err == otError_OT_ERROR_RESPONSE_TIMEOUT {
            RegistrationError::Timeout
        } else {
            RegistrationError::Rejected
        }
    }

    pub fn role_from(role: otDeviceRole) -> DeviceRole {
        if role == otDeviceRole_OT_DEVICE_ROLE_CHILD {
            DeviceRole::Child
        } else if role == otDeviceRole_OT_DEVICE_ROLE_ROUTER {
            DeviceRole::Router
        } else if role == otDeviceRole_OT_DEVICE_ROLE_LEADER {
            DeviceRole::Leader
        } else if role == otDeviceRole_OT_DEVICE_ROLE_DETACHED {
            DeviceRole::Detached
        } else {
            DeviceRole::Disabled
        }
    }

    pub unsafe extern "C" fn state_changed(flags: otChangedFlags, _context: *mut c_void) {
        if flags & OT_CHANGED_THREAD_ROLE == 0 {
            return;
        }
        // Runs on the stack task, which already holds the lock.
        let role = role_from(unsafe { otThreadGetDeviceRole(instance()) });
        if !push_event(Event::RoleChanged(role)) {
            warn!("Thread: event queue full, role change dropped");
        }
    }

    pub unsafe extern "C" fn joiner_callback(error: otError, _context: *mut c_void) {
        let state = if error == otError_OT_ERROR_NONE {
            // Commissioned: bring the interface up so the node attaches.
            let ret = unsafe { otThreadSetEnabled(instance(), true) };
            if ret != otError_OT_ERROR_NONE {
                warn!("Thread: enable after join failed (err={})", ret);
            }
            JoinerState::Joined
        } else {
            warn!("Thread: joiner attempt ended (err={})", error);
            JoinerState::Idle
        };
        if !push_event(Event::JoinerStateChanged(state)) {
            warn!("Thread: event queue full, joiner state dropped");
        }
    }

    pub unsafe extern "C" fn srp_callback(
        error: otError,
        host: *const otSrpClientHostInfo,
        _services: *const otSrpClientService,
        _removed: *const otSrpClientService,
        _context: *mut c_void,
    ) {
        let outcome = if error != otError_OT_ERROR_NONE {
            RegistrationOutcome::Failed(registration_error(error))
        } else if !host.is_null()
            && unsafe { (*host).mState } == otSrpClientItemState_OT_SRP_CLIENT_ITEM_STATE_REMOVED
        {
            RegistrationOutcome::Removed
        } else {
            RegistrationOutcome::Registered
        };
        if !push_event(Event::RegistrationCompleted(outcome)) {
            warn!("SRP: event queue full, outcome dropped");
        }
    }

    /// True once the registrar confirmed removal (or nothing was registered).
    pub fn host_removed() -> bool {
        let _lock = OtLock::acquire();
        // SAFETY: lock held; the host info lives inside the instance.
        let host = unsafe { otSrpClientGetHostInfo(instance()) };
        host.is_null()
            || unsafe { (*host).mState } == otSrpClientItemState_OT_SRP_CLIENT_ITEM_STATE_REMOVED
    }
}

#[cfg(target_os = "espidf")]
impl ThreadAdapter {
    /// Initialise OpenThread, launch its task, and hook up the callbacks.
    pub fn start() -> anyhow::Result<Self> {
        use esp_idf_svc::sys::*;

        let config = esp_openthread_platform_config_t {
            radio_config: esp_openthread_radio_config_t {
                radio_mode: esp_openthread_radio_mode_t_RADIO_MODE_NATIVE,
                ..Default::default()
            },
            host_config: esp_openthread_host_connection_config_t {
                host_connection_mode:
                    esp_openthread_host_connection_mode_t_HOST_CONNECTION_MODE_NONE,
                ..Default::default()
            },
            port_config: esp_openthread_port_config_t {
                storage_partition_name: c"nvs".as_ptr(),
                netif_queue_size: 10,
                task_queue_size: 10,
            },
        };
        // SAFETY: called once at boot before any other stack use.
        esp!(unsafe { esp_openthread_init(&config) })?;

        std::thread::Builder::new()
            .name("ot-main".into())
            .stack_size(8 * 1024)
            .spawn(|| {
                // SAFETY: runs the stack loop on its own task; never returns.
                let ret = unsafe { esp_openthread_launch_mainloop() };
                log::error!("Thread: mainloop exited (rc={})", ret);
            })?;

        {
            let _lock = ot_glue::OtLock::acquire();
            let instance = ot_glue::instance();
            // SAFETY: lock held.
            unsafe {
                otSetStateChangedCallback(
                    instance,
                    Some(ot_glue::state_changed),
                    core::ptr::null_mut(),
                );
                otSrpClientSetCallback(instance, Some(ot_glue::srp_callback), core::ptr::null_mut());
                otIp6SetEnabled(instance, true);
                // A stored dataset lets the node reattach without commissioning.
                if otDatasetIsCommissioned(instance) {
                    otThreadSetEnabled(instance, true);
                }
                super::coap::ot::start(instance)
                    .map_err(|e| anyhow::anyhow!("CoAP start failed: {e}"))?;
            }
        }
        info!("Thread: stack started");

        // SAFETY: zeroed OpenThread records are the documented empty state.
        let srp = Box::new(SrpRecords {
            host_name: std::ffi::CString::default(),
            host_address: unsafe { core::mem::zeroed() },
            instance: std::ffi::CString::default(),
            service_type: std::ffi::CString::default(),
            txt_data: Vec::new(),
            txt: unsafe { core::mem::zeroed() },
            service: unsafe { core::mem::zeroed() },
            service_added: false,
        });
        Ok(Self { srp })
    }
}

#[cfg(target_os = "espidf")]
fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(target_os = "espidf")]
impl NetworkStatusPort for ThreadAdapter {
    fn role(&self) -> DeviceRole {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        ot_glue::role_from(unsafe { esp_idf_svc::sys::otThreadGetDeviceRole(ot_glue::instance()) })
    }

    fn link_mode(&self) -> LinkMode {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        let mode = unsafe { esp_idf_svc::sys::otThreadGetLinkMode(ot_glue::instance()) };
        LinkMode {
            rx_on_when_idle: mode.mRxOnWhenIdle(),
            full_thread_device: mode.mDeviceType(),
            full_network_data: mode.mNetworkData(),
        }
    }

    fn set_link_mode(&mut self, mode: LinkMode) -> Result<(), NetworkError> {
        use esp_idf_svc::sys::*;

        let mut config: otLinkModeConfig = Default::default();
        config.set_mRxOnWhenIdle(mode.rx_on_when_idle);
        config.set_mDeviceType(mode.full_thread_device);
        config.set_mNetworkData(mode.full_network_data);
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        let err = unsafe { otThreadSetLinkMode(ot_glue::instance(), config) };
        if err == otError_OT_ERROR_NONE {
            Ok(())
        } else {
            Err(ot_glue::network_error(err))
        }
    }

    fn poll_period_ms(&self) -> u32 {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        unsafe { esp_idf_svc::sys::otLinkGetPollPeriod(ot_glue::instance()) }
    }

    fn set_poll_period_ms(&mut self, period_ms: u32) -> Result<(), NetworkError> {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        let err = unsafe { esp_idf_svc::sys::otLinkSetPollPeriod(ot_glue::instance(), period_ms) };
        if err == esp_idf_svc::sys::otError_OT_ERROR_NONE {
            Ok(())
        } else {
            Err(ot_glue::network_error(err))
        }
    }

    fn identity(&self) -> NodeIdentity {
        use esp_idf_svc::sys::*;

        let _lock = ot_glue::OtLock::acquire();
        let instance = ot_glue::instance();
        // SAFETY: lock held; every returned pointer refers to instance state.
        unsafe {
            let mut eui = otExtAddress { m8: [0; 8] };
            otLinkGetFactoryAssignedIeeeEui64(instance, &mut eui);
            let ext_address = (*otLinkGetExtendedAddress(instance)).m8;
            let mesh_local_eid = Ipv6Addr::from((*otThreadGetMeshLocalEid(instance)).mFields.m8);

            let mut slaac_address = None;
            let mut addr = otIp6GetUnicastAddresses(instance);
            while !addr.is_null() {
                if u32::from((*addr).mAddressOrigin()) == OT_ADDRESS_ORIGIN_SLAAC {
                    slaac_address = Some(Ipv6Addr::from((*addr).mAddress.mFields.m8));
                    break;
                }
                addr = (*addr).mNext;
            }

            let version = core::ffi::CStr::from_ptr(otGetVersionString())
                .to_str()
                .unwrap_or("");
            NodeIdentity {
                eui64: eui.m8,
                ext_address,
                rloc16: otThreadGetRloc16(instance),
                mesh_local_eid,
                slaac_address,
                stack_version: truncated(version),
                thread_version: otThreadGetVersion(),
            }
        }
    }

    fn start_joiner(&mut self) -> Result<(), NetworkError> {
        use esp_idf_svc::sys::*;

        let pskd = std::ffi::CString::new(JOINER_PSKD).map_err(|_| NetworkError::InvalidArgs)?;
        let _lock = ot_glue::OtLock::acquire();
        let instance = ot_glue::instance();
        // SAFETY: lock held; the stack copies the PSKd before returning.
        let err = unsafe {
            otIp6SetEnabled(instance, true);
            otJoinerStart(
                instance,
                pskd.as_ptr(),
                core::ptr::null(),
                c"meshnode".as_ptr(),
                c"esp32c6".as_ptr(),
                c"0.1.0".as_ptr(),
                core::ptr::null(),
                Some(ot_glue::joiner_callback),
                core::ptr::null_mut(),
            )
        };
        if err == otError_OT_ERROR_NONE {
            info!("Thread: joiner started");
            Ok(())
        } else {
            Err(ot_glue::network_error(err))
        }
    }

    fn factory_reset(&mut self) {
        let _lock = ot_glue::OtLock::acquire();
        info!("Thread: factory reset");
        // SAFETY: lock held; the SoC restarts inside this call.
        unsafe { esp_idf_svc::sys::otInstanceFactoryReset(ot_glue::instance()) };
    }
}

#[cfg(target_os = "espidf")]
impl ServiceRegistrationPort for ThreadAdapter {
    fn set_host_name(&mut self, name: &str) -> Result<(), RegistrationError> {
        let name = std::ffi::CString::new(name).map_err(|_| RegistrationError::InvalidName)?;
        if name == self.srp.host_name {
            return Ok(());
        }
        self.srp.host_name = name;
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held; the string lives in the boxed records.
        let err = unsafe {
            esp_idf_svc::sys::otSrpClientSetHostName(
                ot_glue::instance(),
                self.srp.host_name.as_ptr(),
            )
        };
        if err == esp_idf_svc::sys::otError_OT_ERROR_NONE {
            Ok(())
        } else {
            Err(ot_glue::registration_error(err))
        }
    }

    fn set_host_address(&mut self, address: Ipv6Addr) -> Result<(), RegistrationError> {
        self.srp.host_address.mFields.m8 = address.octets();
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held; the address lives in the boxed records.
        let err = unsafe {
            esp_idf_svc::sys::otSrpClientSetHostAddresses(
                ot_glue::instance(),
                &self.srp.host_address,
                1,
            )
        };
        if err == esp_idf_svc::sys::otError_OT_ERROR_NONE {
            Ok(())
        } else {
            Err(ot_glue::registration_error(err))
        }
    }

    fn add_service(&mut self, service: &ServiceDescription) -> Result<(), RegistrationError> {
        use esp_idf_svc::sys::*;

        if self.srp.service_added {
            return Ok(());
        }
        let srp = &mut *self.srp;
        srp.instance =
            std::ffi::CString::new(service.instance.as_str()).map_err(|_| RegistrationError::InvalidName)?;
        srp.service_type =
            std::ffi::CString::new(service.service_type).map_err(|_| RegistrationError::InvalidName)?;

        // Pre-encoded TXT data: length-prefixed `key=value` strings.
        srp.txt_data.clear();
        for entry in &service.txt {
            let len = u8::try_from(entry.len()).map_err(|_| RegistrationError::InvalidName)?;
            srp.txt_data.push(len);
            srp.txt_data.extend_from_slice(entry.as_bytes());
        }
        srp.txt.mKey = core::ptr::null();
        srp.txt.mValue = srp.txt_data.as_ptr();
        srp.txt.mValueLength =
            u16::try_from(srp.txt_data.len()).map_err(|_| RegistrationError::NoSlots)?;

        srp.service.mName = srp.service_type.as_ptr();
        srp.service.mInstanceName = srp.instance.as_ptr();
        srp.service.mTxtEntries = &srp.txt;
        srp.service.mNumTxtEntries = 1;
        srp.service.mPort = service.port;

        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held; the service record lives in the boxed records.
        let err = unsafe { otSrpClientAddService(ot_glue::instance(), &mut srp.service) };
        if err == otError_OT_ERROR_NONE {
            srp.service_added = true;
            Ok(())
        } else {
            Err(ot_glue::registration_error(err))
        }
    }

    fn enable_autostart(&mut self) -> Result<(), RegistrationError> {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        unsafe {
            esp_idf_svc::sys::otSrpClientEnableAutoStartMode(
                ot_glue::instance(),
                None,
                core::ptr::null_mut(),
            );
        }
        Ok(())
    }

    fn remove_all(&mut self, timeout_ms: u32) -> Result<(), RegistrationError> {
        {
            let _lock = ot_glue::OtLock::acquire();
            // SAFETY: lock held.
            let err = unsafe {
                esp_idf_svc::sys::otSrpClientRemoveHostAndServices(ot_glue::instance(), false, true)
            };
            if err != esp_idf_svc::sys::otError_OT_ERROR_NONE
                && err != esp_idf_svc::sys::otError_OT_ERROR_ALREADY
            {
                return Err(ot_glue::registration_error(err));
            }
        }
        let mut waited = 0;
        while waited < timeout_ms {
            if ot_glue::host_removed() {
                self.srp.service_added = false;
                return Ok(());
            }
            esp_idf_hal::delay::FreeRtos::delay_ms(WAIT_STEP_MS);
            waited += WAIT_STEP_MS;
        }
        log::warn!("SRP: removal not confirmed within {} ms", timeout_ms);
        Err(RegistrationError::Timeout)
    }
}

#[cfg(target_os = "espidf")]
impl RequestPort for ThreadAdapter {
    fn send(&mut self, request: &OutboundRequest<'_>) -> Result<(), TransportError> {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        unsafe { super::coap::ot::send(ot_glue::instance(), request) }
    }

    fn respond(&mut self, token: RequestToken, payload: &[u8]) -> Result<(), TransportError> {
        let _lock = ot_glue::OtLock::acquire();
        // SAFETY: lock held.
        unsafe { super::coap::ot::respond(ot_glue::instance(), token, payload) }
    }
}
