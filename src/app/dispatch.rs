//! Command dispatcher.
//!
//! | Command               | Fields                         | Effect                              |
//! |-----------------------|--------------------------------|-------------------------------------|
//! | `onoff`               | obj, val, delay?               | group power, optional delayed off   |
//! | `change_color`        | obj, r, g, b                   | group colour                        |
//! | `set_gpio`            | obj (pin), val                 | drive pin                           |
//! | `get_led_status`      | —                              | `led_strip_status` array            |
//! | `get_gpio_status`     | —                              | `gpio_status` array                 |
//! | `set_report_interval` | val (> 0)                      | store, re-arm running report timer  |
//! | `set_ot_mode`         | val (`r`/`d`/`n` flags)        | apply link mode                     |
//! | `upgrade`             | —                              | ack, then start image management    |
//! | `factoryreset`        | —                              | ack, then deregister + wipe         |
//! | `reboot`              | —                              | ack, then restart                   |
//!
//! Every failure becomes an `err_code` in the response; nothing is
//! reported as a transport error.  Fields are validated before the first
//! actuator call, so a rejected command has no effect.

use log::{info, warn};
use serde_json::{Map, Value, json};

use crate::config::NodeConfig;
use crate::error::CommandError;
use crate::fsm::context::Session;
use crate::scheduler::TimerId;

use super::commands::{CommandEnvelope, CommandId};
use super::model::{LightGroup, LinkMode, Rgb};
use super::ports::{ActuatorPort, NetworkStatusPort, SchedulerPort};
use super::report::ReportInterval;
use super::work::Work;

/// Fallback body when the response cannot be serialized.
const NO_BUFS_RESPONSE: &[u8] = br#"{"err_code":-2}"#;

/// Outcome of one inbound command.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// `None` if the envelope was malformed or the name unknown.
    pub command: Option<CommandId>,
    pub err_code: i32,
    /// Response object, `err_code` included.
    pub response: Map<String, Value>,
    /// Deferred action to run after the response is sent.
    pub follow_up: Option<Work>,
}

impl Dispatched {
    fn ok(command: CommandId, mut response: Map<String, Value>, follow_up: Option<Work>) -> Self {
        response.insert("err_code".into(), CommandError::ERR_NONE.into());
        Self {
            command: Some(command),
            err_code: CommandError::ERR_NONE,
            response,
            follow_up,
        }
    }

    fn rejected(command: Option<CommandId>, error: CommandError) -> Self {
        let err_code = error.err_code();
        let mut response = Map::new();
        response.insert("err_code".into(), err_code.into());
        Self {
            command,
            err_code,
            response,
            follow_up: None,
        }
    }

    /// Serialized response body.
    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(&self.response).unwrap_or_else(|_| NO_BUFS_RESPONSE.to_vec())
    }
}

/// Parse, validate and execute one command body.
pub fn dispatch<N, B, S>(
    raw: &[u8],
    session: &mut Session,
    config: &NodeConfig,
    net: &mut N,
    board: &mut B,
    sched: &mut S,
) -> Dispatched
where
    N: NetworkStatusPort,
    B: ActuatorPort,
    S: SchedulerPort,
{
    let envelope = match CommandEnvelope::parse(raw) {
        Ok(env) => env,
        Err(e) => {
            warn!("Cmd: rejected body: {}", e);
            return Dispatched::rejected(None, e);
        }
    };

    let Some(id) = CommandId::lookup(&envelope.cmd) else {
        warn!("Cmd: unknown command '{}'", envelope.cmd);
        return Dispatched::rejected(None, CommandError::UnknownCommand);
    };

    info!("Cmd: {}", id.name());

    let result = match id {
        CommandId::OnOff => on_off(&envelope, board, sched).map(|()| (Map::new(), None)),
        CommandId::ChangeColor => change_color(&envelope, board).map(|()| (Map::new(), None)),
        CommandId::SetGpio => set_gpio(&envelope, board).map(|()| (Map::new(), None)),
        CommandId::GetLedStatus => led_status(board).map(|m| (m, None)),
        CommandId::GetGpioStatus => Ok((gpio_status(board), None)),
        CommandId::SetReportInterval => {
            set_report_interval(&envelope, session, config, sched).map(|()| (Map::new(), None))
        }
        CommandId::SetLinkMode => set_link_mode(&envelope, net).map(|()| (Map::new(), None)),
        CommandId::Upgrade => Ok((Map::new(), Some(Work::StartManagement))),
        CommandId::FactoryReset => Ok((
            Map::new(),
            Some(Work::FactoryReset {
                grace_ms: config.reset_grace_ms,
            }),
        )),
        CommandId::Reboot => Ok((
            Map::new(),
            Some(Work::Reboot {
                grace_ms: config.reboot_grace_ms,
            }),
        )),
    };

    match result {
        Ok((response, follow_up)) => Dispatched::ok(id, response, follow_up),
        Err(e) => {
            warn!("Cmd: {} failed: {}", id.name(), e);
            Dispatched::rejected(Some(id), e)
        }
    }
}

// ── Lights ────────────────────────────────────────────────────

fn light_group(envelope: &CommandEnvelope) -> Result<LightGroup, CommandError> {
    LightGroup::from_name(envelope.object()?).ok_or(CommandError::InvalidObject)
}

fn on_off(
    envelope: &CommandEnvelope,
    board: &mut impl ActuatorPort,
    sched: &mut impl SchedulerPort,
) -> Result<(), CommandError> {
    let group = light_group(envelope)?;
    let on = envelope.boolean("val")?;
    let delay_secs = envelope.optional_int("delay")?.unwrap_or(0);
    let delay_secs = u32::try_from(delay_secs).map_err(|_| CommandError::InvalidParameter("delay"))?;

    board.set_group_power(group, on)?;

    let timer = TimerId::LightOff(group);
    if delay_secs > 0 {
        sched.start_one_shot(timer, delay_secs.saturating_mul(1000));
    } else {
        sched.stop(timer);
    }
    Ok(())
}

fn change_color(
    envelope: &CommandEnvelope,
    board: &mut impl ActuatorPort,
) -> Result<(), CommandError> {
    let group = light_group(envelope)?;
    let color = Rgb::new(
        envelope.channel("r")?,
        envelope.channel("g")?,
        envelope.channel("b")?,
    );
    board.set_group_color(group, color)?;
    Ok(())
}

fn led_status(board: &impl ActuatorPort) -> Result<Map<String, Value>, CommandError> {
    let mut nodes = Vec::with_capacity(LightGroup::NODES.len());
    for group in LightGroup::NODES {
        let status = board.group_status(group)?;
        nodes.push(json!({
            "obj": group.name(),
            "on_off": u8::from(status.on),
            "r": status.color.r,
            "g": status.color.g,
            "b": status.color.b,
        }));
    }
    let mut out = Map::new();
    out.insert("led_strip_status".into(), Value::Array(nodes));
    Ok(out)
}

// ── GPIO ──────────────────────────────────────────────────────

fn set_gpio(envelope: &CommandEnvelope, board: &mut impl ActuatorPort) -> Result<(), CommandError> {
    let pin = envelope.object()?;
    let high = envelope.boolean("val")?;
    board.set_pin(pin, high)?;
    Ok(())
}

fn gpio_status(board: &impl ActuatorPort) -> Map<String, Value> {
    let pins: Vec<Value> = board
        .pins()
        .iter()
        .map(|p| json!({ "obj": p.name, "val": u8::from(p.high) }))
        .collect();
    let mut out = Map::new();
    out.insert("gpio_status".into(), Value::Array(pins));
    out
}

// ── Session settings ──────────────────────────────────────────

fn set_report_interval(
    envelope: &CommandEnvelope,
    session: &mut Session,
    config: &NodeConfig,
    sched: &mut impl SchedulerPort,
) -> Result<(), CommandError> {
    let interval = ReportInterval::try_from(envelope.int("val")?)?;
    session.report_interval = interval;

    if sched.is_running(TimerId::Report) {
        sched.stop(TimerId::Report);
        sched.start_periodic(
            TimerId::Report,
            config.report_initial_delay_ms,
            interval.period_ms(),
        );
    }
    info!("Cmd: report interval {} s", interval.secs());
    Ok(())
}

fn set_link_mode(envelope: &CommandEnvelope, net: &mut impl NetworkStatusPort) -> Result<(), CommandError> {
    let mode = LinkMode::from_flags(envelope.string("val")?)
        .ok_or(CommandError::InvalidParameter("val"))?;
    net.set_link_mode(mode)?;
    info!("Cmd: link mode {}", mode);
    Ok(())
}
