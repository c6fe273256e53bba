//! Unified error types for the mesh node firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! service layer can use `?` across port boundaries.  All variants are
//! `Copy` so they can be passed through the work queue and logged
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be sampled.
    Sensor(SensorError),
    /// An actuator (LED strip, GPIO) command failed.
    Actuator(ActuatorError),
    /// The mesh stack rejected a request.
    Network(NetworkError),
    /// A request could not be handed to the transport.
    Transport(TransportError),
    /// Service registration failed.
    Registration(RegistrationError),
    /// Provisioning could not produce a peer address.
    Provisioning(ProvisioningError),
    /// An inbound command was rejected.
    Command(CommandError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Registration(e) => write!(f, "registration: {e}"),
            Self::Provisioning(e) => write!(f, "provisioning: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transaction failed or timed out.
    BusFailed,
    /// The sensor has not produced a sample yet.
    NotReady,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFailed => write!(f, "bus transaction failed"),
            Self::NotReady => write!(f, "no sample available"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// No GPIO pin is registered under the requested name.
    UnknownPin,
    /// GPIO write or read failed.
    GpioFailed,
    /// The LED strip refused the pixel update.
    StripUpdateFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPin => write!(f, "unknown pin"),
            Self::GpioFailed => write!(f, "GPIO access failed"),
            Self::StripUpdateFailed => write!(f, "LED strip update failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Network (mesh stack) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// The stack rejected the arguments (e.g. unsupported link mode).
    InvalidArgs,
    /// The operation is not allowed in the current stack state.
    InvalidState,
    /// The stack reported some other failure.
    Failed,
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgs => write!(f, "invalid arguments"),
            Self::InvalidState => write!(f, "invalid state"),
            Self::Failed => write!(f, "stack failure"),
        }
    }
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No message buffer was available.
    NoBufs,
    /// The payload did not fit in a single message.
    PayloadTooLarge,
    /// The stack refused to send.
    SendFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBufs => write!(f, "no message buffers"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
            Self::SendFailed => write!(f, "send failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Service registration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    /// Host name or service instance rejected by the client.
    InvalidName,
    /// The client has no free service slots.
    NoSlots,
    /// The registrar answered with an error or never answered.
    Rejected,
    /// Removal did not complete within the bounded wait.
    Timeout,
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName => write!(f, "invalid name"),
            Self::NoSlots => write!(f, "no service slots"),
            Self::Rejected => write!(f, "rejected by registrar"),
            Self::Timeout => write!(f, "timed out"),
        }
    }
}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        Self::Registration(e)
    }
}

// ---------------------------------------------------------------------------
// Provisioning errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningError {
    /// The operation needs a peer address and none is known yet.
    PeerUnknown,
    /// The reply payload was not exactly one address long.
    InvalidReply { len: usize },
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerUnknown => write!(f, "peer address unknown"),
            Self::InvalidReply { len } => write!(f, "invalid reply ({len} bytes)"),
        }
    }
}

impl From<ProvisioningError> for Error {
    fn from(e: ProvisioningError) -> Self {
        Self::Provisioning(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Rejections produced by the command dispatcher.  These never leave the
/// node as transport failures; they become an `err_code` in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// A field is missing, has the wrong type, or is out of range.
    InvalidParameter(&'static str),
    /// `obj` does not name a known light group or pin.
    InvalidObject,
    /// `cmd` is not in the command table.
    UnknownCommand,
    /// Out of buffers while building the response.
    ResourceExhausted,
    /// The actuator refused the operation.
    ActuatorFailure(ActuatorError),
    /// The network stack failed for a reason other than bad arguments.
    Failed,
}

impl CommandError {
    pub const ERR_NONE: i32 = 0;
    pub const ERR_INVALID_PARAMETER: i32 = -1;
    pub const ERR_NO_BUFS: i32 = -2;
    pub const ERR_UNKNOWN: i32 = -3;

    /// Numeric code carried in the `err_code` field of a response.
    pub const fn err_code(self) -> i32 {
        match self {
            Self::InvalidParameter(_) | Self::InvalidObject => Self::ERR_INVALID_PARAMETER,
            Self::ResourceExhausted => Self::ERR_NO_BUFS,
            Self::UnknownCommand | Self::ActuatorFailure(_) | Self::Failed => Self::ERR_UNKNOWN,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter(field) => write!(f, "invalid parameter '{field}'"),
            Self::InvalidObject => write!(f, "invalid object"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::ResourceExhausted => write!(f, "resource exhausted"),
            Self::ActuatorFailure(e) => write!(f, "actuator failure: {e}"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<ActuatorError> for CommandError {
    fn from(e: ActuatorError) -> Self {
        match e {
            ActuatorError::UnknownPin => Self::InvalidObject,
            other => Self::ActuatorFailure(other),
        }
    }
}

impl From<NetworkError> for CommandError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::InvalidArgs => Self::InvalidParameter("val"),
            NetworkError::InvalidState | NetworkError::Failed => Self::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
