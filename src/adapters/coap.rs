//! CoAP plumbing for the mesh adapter.
//!
//! Inbound requests on the command resource are parked in a small pending
//! table until the engine answers them through
//! [`RequestPort::respond`](crate::app::ports::RequestPort::respond).  The
//! table is keyed by [`RequestToken`] so the engine never sees CoAP
//! message ids or tokens.
//!
//! Outbound requests are always non-confirmable.  When a reply is wanted,
//! the [`ReplyKind`] rides along as the handler context and the reply is
//! pushed to the event queue as [`Event::Reply`](crate::events::Event::Reply).

use core::cell::RefCell;
use core::net::Ipv6Addr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::warn;

use crate::app::wire::{ReplyKind, RequestToken};

/// Inbound requests that may await an answer at the same time.
pub const PENDING_CAP: usize = 4;

/// What is needed to address a response to an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub token: heapless::Vec<u8, 8>,
    pub message_id: u16,
    pub confirmable: bool,
    pub peer: Ipv6Addr,
    pub port: u16,
}

/// Bounded FIFO of requests awaiting a response.  When full, the oldest
/// entry is dropped to make room.
pub struct PendingTable<T, const N: usize> {
    next: u32,
    slots: heapless::Deque<(RequestToken, T), N>,
}

impl<T, const N: usize> Default for PendingTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> PendingTable<T, N> {
    pub const fn new() -> Self {
        Self {
            next: 1,
            slots: heapless::Deque::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> RequestToken {
        let token = RequestToken(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        if self.slots.is_full() {
            if let Some((stale, _)) = self.slots.pop_front() {
                warn!("CoAP: request {:?} never answered, dropped", stale);
            }
        }
        let _ = self.slots.push_back((token, item));
        token
    }

    /// Remove and return the entry for `token`, keeping the others in order.
    pub fn take(&mut self, token: RequestToken) -> Option<T> {
        let mut found = None;
        for _ in 0..self.slots.len() {
            let Some((t, item)) = self.slots.pop_front() else {
                break;
            };
            if t == token && found.is_none() {
                found = Some(item);
            } else {
                let _ = self.slots.push_back((t, item));
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Requests parked by the stack callback, answered from the main loop.
pub static PENDING: Mutex<
    CriticalSectionRawMutex,
    RefCell<PendingTable<PendingRequest, PENDING_CAP>>,
> = Mutex::new(RefCell::new(PendingTable::new()));

/// Encode a reply kind as an opaque handler context.
pub fn reply_context(kind: ReplyKind) -> usize {
    match kind {
        ReplyKind::Provisioning => 1,
        ReplyKind::Status => 2,
        ReplyKind::Trigger => 3,
    }
}

pub fn reply_kind(context: usize) -> Option<ReplyKind> {
    match context {
        1 => Some(ReplyKind::Provisioning),
        2 => Some(ReplyKind::Status),
        3 => Some(ReplyKind::Trigger),
        _ => None,
    }
}

// ── OpenThread CoAP (espidf) ──────────────────────────────────

#[cfg(target_os = "espidf")]
pub(crate) mod ot {
    use core::ffi::c_void;
    use core::net::Ipv6Addr;

    use esp_idf_svc::sys::*;
    use log::{debug, warn};

    use super::{reply_context, reply_kind, PendingRequest, PENDING};
    use crate::app::wire::{self, Method, OutboundRequest, RequestToken};
    use crate::error::TransportError;
    use crate::events::{push_event, Event};

    fn check(err: otError, on_fail: TransportError) -> Result<(), TransportError> {
        if err == otError_OT_ERROR_NONE {
            Ok(())
        } else {
            Err(on_fail)
        }
    }

    /// Start the CoAP service and serve the command resource.
    ///
    /// # Safety
    /// Caller holds the OpenThread lock.
    pub unsafe fn start(instance: *mut otInstance) -> Result<(), TransportError> {
        check(
            unsafe { otCoapStart(instance, wire::COAP_PORT) },
            TransportError::SendFailed,
        )?;
        // The stack keeps a pointer to the resource for as long as it runs.
        let resource = Box::leak(Box::new(unsafe {
            otCoapResource {
                mUriPath: c"cmd".as_ptr(),
                mHandler: Some(command_handler),
                ..core::mem::zeroed()
            }
        }));
        unsafe { otCoapAddResource(instance, resource) };
        Ok(())
    }

    unsafe fn read_payload(message: *const otMessage) -> Vec<u8> {
        let offset = unsafe { otMessageGetOffset(message) };
        let len = unsafe { otMessageGetLength(message) }.saturating_sub(offset);
        let mut buf = vec![0u8; usize::from(len)];
        let read = unsafe { otMessageRead(message, offset, buf.as_mut_ptr().cast(), len) };
        buf.truncate(usize::from(read));
        buf
    }

    unsafe extern "C" fn command_handler(
        _context: *mut c_void,
        message: *mut otMessage,
        info: *const otMessageInfo,
    ) {
        let code = unsafe { otCoapMessageGetCode(message) };
        let method = if code == otCoapCode_OT_COAP_CODE_PUT {
            Method::Put
        } else if code == otCoapCode_OT_COAP_CODE_POST {
            Method::Post
        } else {
            Method::Get
        };

        let token_len = usize::from(unsafe { otCoapMessageGetTokenLength(message) }).min(8);
        let token_ptr = unsafe { otCoapMessageGetToken(message) };
        let token_bytes = unsafe { core::slice::from_raw_parts(token_ptr, token_len) };
        let pending = PendingRequest {
            token: heapless::Vec::from_slice(token_bytes).unwrap_or_default(),
            message_id: unsafe { otCoapMessageGetMessageId(message) },
            confirmable: unsafe { otCoapMessageGetType(message) }
                == otCoapType_OT_COAP_TYPE_CONFIRMABLE,
            peer: Ipv6Addr::from(unsafe { (*info).mPeerAddr.mFields.m8 }),
            port: unsafe { (*info).mPeerPort },
        };
        let payload = unsafe { read_payload(message) };

        let token = PENDING.lock(|table| table.borrow_mut().insert(pending));
        debug!("CoAP: cmd request {:?} ({} bytes)", token, payload.len());
        if !push_event(Event::CommandReceived(crate::app::wire::InboundRequest {
            token,
            method,
            payload,
        })) {
            warn!("CoAP: event queue full, cmd request dropped");
        }
    }

    unsafe extern "C" fn reply_handler(
        context: *mut c_void,
        message: *mut otMessage,
        _info: *const otMessageInfo,
        error: otError,
    ) {
        let Some(kind) = reply_kind(context as usize) else {
            return;
        };
        if error != otError_OT_ERROR_NONE || message.is_null() {
            warn!("CoAP: {:?} reply failed (err={})", kind, error);
            if !push_event(Event::ReplyTimedOut(kind)) {
                warn!("CoAP: event queue full, {:?} timeout dropped", kind);
            }
            return;
        }
        let payload = unsafe { read_payload(message) };
        if !push_event(Event::Reply { kind, payload }) {
            warn!("CoAP: event queue full, {:?} reply dropped", kind);
        }
    }

    unsafe fn append_payload(message: *mut otMessage, payload: &[u8]) -> Result<(), TransportError> {
        if payload.is_empty() {
            return Ok(());
        }
        let len = u16::try_from(payload.len()).map_err(|_| TransportError::PayloadTooLarge)?;
        check(
            unsafe { otCoapMessageSetPayloadMarker(message) },
            TransportError::NoBufs,
        )?;
        check(
            unsafe { otMessageAppend(message, payload.as_ptr().cast(), len) },
            TransportError::PayloadTooLarge,
        )
    }

    fn message_info(peer: Ipv6Addr, port: u16) -> otMessageInfo {
        // SAFETY: otMessageInfo is plain data; all-zero is "unspecified".
        let mut info: otMessageInfo = unsafe { core::mem::zeroed() };
        info.mPeerAddr.mFields.m8 = peer.octets();
        info.mPeerPort = port;
        info
    }

    /// # Safety
    /// Caller holds the OpenThread lock.
    pub unsafe fn send(
        instance: *mut otInstance,
        request: &OutboundRequest<'_>,
    ) -> Result<(), TransportError> {
        let message = unsafe { otCoapNewMessage(instance, core::ptr::null()) };
        if message.is_null() {
            return Err(TransportError::NoBufs);
        }
        let result = unsafe { fill_and_send(instance, message, request) };
        if result.is_err() {
            unsafe { otMessageFree(message) };
        }
        result
    }

    unsafe fn fill_and_send(
        instance: *mut otInstance,
        message: *mut otMessage,
        request: &OutboundRequest<'_>,
    ) -> Result<(), TransportError> {
        let code = match request.method {
            Method::Get => otCoapCode_OT_COAP_CODE_GET,
            Method::Put => otCoapCode_OT_COAP_CODE_PUT,
            Method::Post => otCoapCode_OT_COAP_CODE_POST,
        };
        unsafe {
            otCoapMessageInit(message, otCoapType_OT_COAP_TYPE_NON_CONFIRMABLE, code);
            otCoapMessageGenerateToken(message, OT_COAP_DEFAULT_TOKEN_LENGTH as u8);
        }
        let path =
            std::ffi::CString::new(request.resource).map_err(|_| TransportError::SendFailed)?;
        check(
            unsafe { otCoapMessageAppendUriPathOptions(message, path.as_ptr()) },
            TransportError::NoBufs,
        )?;
        unsafe { append_payload(message, request.payload) }?;

        let info = message_info(request.destination.address(), wire::COAP_PORT);
        let handler: otCoapResponseHandler = match request.reply {
            Some(_) => Some(reply_handler),
            None => None,
        };
        let context = request.reply.map_or(0, reply_context) as *mut c_void;
        check(
            unsafe {
                otCoapSendRequestWithParameters(
                    instance,
                    message,
                    &info,
                    handler,
                    context,
                    core::ptr::null(),
                )
            },
            TransportError::SendFailed,
        )
    }

    /// # Safety
    /// Caller holds the OpenThread lock.
    pub unsafe fn respond(
        instance: *mut otInstance,
        token: RequestToken,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let Some(pending) = PENDING.lock(|table| table.borrow_mut().take(token)) else {
            warn!("CoAP: no pending request for {:?}", token);
            return Err(TransportError::SendFailed);
        };
        let message = unsafe { otCoapNewMessage(instance, core::ptr::null()) };
        if message.is_null() {
            return Err(TransportError::NoBufs);
        }
        let result = unsafe { fill_response(instance, message, &pending, payload) };
        if result.is_err() {
            unsafe { otMessageFree(message) };
        }
        result
    }

    unsafe fn fill_response(
        instance: *mut otInstance,
        message: *mut otMessage,
        pending: &PendingRequest,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let ty = if pending.confirmable {
            otCoapType_OT_COAP_TYPE_ACKNOWLEDGMENT
        } else {
            otCoapType_OT_COAP_TYPE_NON_CONFIRMABLE
        };
        unsafe {
            otCoapMessageInit(message, ty, otCoapCode_OT_COAP_CODE_CHANGED);
            if pending.confirmable {
                otCoapMessageSetMessageId(message, pending.message_id);
            }
        }
        check(
            unsafe {
                otCoapMessageSetToken(message, pending.token.as_ptr(), pending.token.len() as u8)
            },
            TransportError::NoBufs,
        )?;
        unsafe { append_payload(message, payload) }?;

        let info = message_info(pending.peer, pending.port);
        check(
            unsafe {
                otCoapSendResponseWithParameters(instance, message, &info, core::ptr::null())
            },
            TransportError::SendFailed,
        )
    }
}
