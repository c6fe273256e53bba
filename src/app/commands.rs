//! Inbound command envelope and command table.
//!
//! Requests on the `cmd` resource carry a JSON object:
//!
//! ```json
//! {"cmd": "change_color", "obj": "led_left", "r": 255, "g": 0, "b": 64}
//! ```
//!
//! Parsing is strict about shape (object, string `cmd`, string `obj`) and
//! lenient about booleans (`true`/`false` or integers).

use serde_json::{Map, Value};

use crate::error::CommandError;

/// Every command the node understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    OnOff,
    ChangeColor,
    SetGpio,
    GetLedStatus,
    GetGpioStatus,
    SetReportInterval,
    SetLinkMode,
    Upgrade,
    FactoryReset,
    Reboot,
}

/// Wire name → command.  Aliases map to the same id.
const COMMAND_TABLE: &[(&str, CommandId)] = &[
    ("onoff", CommandId::OnOff),
    ("on_off", CommandId::OnOff),
    ("change_color", CommandId::ChangeColor),
    ("set_gpio", CommandId::SetGpio),
    ("get_led_status", CommandId::GetLedStatus),
    ("get_gpio_status", CommandId::GetGpioStatus),
    ("set_report_interval", CommandId::SetReportInterval),
    ("set_ot_mode", CommandId::SetLinkMode),
    ("upgrade", CommandId::Upgrade),
    ("factoryreset", CommandId::FactoryReset),
    ("factory_reset", CommandId::FactoryReset),
    ("reboot", CommandId::Reboot),
];

impl CommandId {
    pub fn lookup(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| *id)
    }

    /// Canonical wire name.
    pub fn name(self) -> &'static str {
        COMMAND_TABLE
            .iter()
            .find(|(_, id)| *id == self)
            .map_or("?", |(n, _)| *n)
    }
}

/// A parsed inbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEnvelope {
    pub cmd: String,
    pub obj: Option<String>,
    pub fields: Map<String, Value>,
}

impl CommandEnvelope {
    /// Parse a request body.  A trailing NUL terminator is tolerated.
    pub fn parse(raw: &[u8]) -> Result<Self, CommandError> {
        let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        let value: Value = serde_json::from_slice(&raw[..end])
            .map_err(|_| CommandError::InvalidParameter("body"))?;

        let Value::Object(mut fields) = value else {
            return Err(CommandError::InvalidParameter("body"));
        };

        let cmd = match fields.remove("cmd") {
            Some(Value::String(cmd)) => cmd,
            _ => return Err(CommandError::InvalidParameter("cmd")),
        };

        let obj = match fields.remove("obj") {
            None => None,
            Some(Value::String(obj)) => Some(obj),
            Some(_) => return Err(CommandError::InvalidParameter("obj")),
        };

        Ok(Self { cmd, obj, fields })
    }

    /// `obj`, required.
    pub fn object(&self) -> Result<&str, CommandError> {
        self.obj.as_deref().ok_or(CommandError::InvalidObject)
    }

    /// Required integer field.
    pub fn int(&self, key: &'static str) -> Result<i64, CommandError> {
        self.optional_int(key)?
            .ok_or(CommandError::InvalidParameter(key))
    }

    /// Integer field that may be absent.  Present but non-integer is an error.
    pub fn optional_int(&self, key: &'static str) -> Result<Option<i64>, CommandError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or(CommandError::InvalidParameter(key)),
        }
    }

    /// Required boolean field; integers are accepted (0 = false).
    pub fn boolean(&self, key: &'static str) -> Result<bool, CommandError> {
        match self.fields.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(v) => v
                .as_i64()
                .map(|n| n != 0)
                .ok_or(CommandError::InvalidParameter(key)),
            None => Err(CommandError::InvalidParameter(key)),
        }
    }

    /// Required 8-bit colour channel.
    pub fn channel(&self, key: &'static str) -> Result<u8, CommandError> {
        u8::try_from(self.int(key)?).map_err(|_| CommandError::InvalidParameter(key))
    }

    /// Required string field.
    pub fn string(&self, key: &'static str) -> Result<&str, CommandError> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .ok_or(CommandError::InvalidParameter(key))
    }
}
