//! Binary encode/decode for the command log format.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32` length. No compression, no alignment
//! padding, no self-describing schema — the same tradeoffs as the rest
//! of this workspace's hand-rolled wire formats.

use std::io::{Read, Write};

use accrete_core::command::{Command, CommandPayload, Priority};
use accrete_core::id::StepId;
use accrete_core::resource::{GeneratorDef, GeneratorFlow, ResourceDef};
use accrete_resources::SerializedResourceState;

use crate::error::CodecError;
use crate::types::{CommandLog, LogMetadata, StartState};
use crate::{FORMAT_VERSION, MAGIC};

const PAYLOAD_SET_RESOURCE_AMOUNT: u8 = 0;
const PAYLOAD_ADJUST_GENERATOR_OWNED: u8 = 1;
const PAYLOAD_SET_GENERATOR_ENABLED: u8 = 2;
const PAYLOAD_SET_PARAMETER: u8 = 3;
const PAYLOAD_CUSTOM: u8 = 4;

// ── Primitive writers ───────────────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CodecError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_bool(w: &mut dyn Write, v: bool) -> Result<(), CodecError> {
    write_u8(w, v as u8)
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_i64_le(w: &mut dyn Write, v: i64) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), CodecError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), CodecError> {
    write_u32_le(w, b.len() as u32)?;
    w.write_all(b)?;
    Ok(())
}

fn write_opt_str(w: &mut dyn Write, s: &Option<String>) -> Result<(), CodecError> {
    match s {
        Some(s) => {
            write_u8(w, 1)?;
            write_str(w, s)?;
        }
        None => write_u8(w, 0)?,
    }
    Ok(())
}

fn write_opt_f64(w: &mut dyn Write, v: &Option<f64>) -> Result<(), CodecError> {
    match v {
        Some(v) => {
            write_u8(w, 1)?;
            write_f64_le(w, *v)?;
        }
        None => write_u8(w, 0)?,
    }
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

fn read_u8(r: &mut dyn Read) -> Result<u8, CodecError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_bool(r: &mut dyn Read) -> Result<bool, CodecError> {
    Ok(read_u8(r)? != 0)
}

fn read_u32_le(r: &mut dyn Read) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read) -> Result<u64, CodecError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64_le(r: &mut dyn Read) -> Result<i64, CodecError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_f64_le(r: &mut dyn Read) -> Result<f64, CodecError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_str(r: &mut dyn Read) -> Result<String, CodecError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| CodecError::MalformedLog {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

fn read_bytes(r: &mut dyn Read) -> Result<Vec<u8>, CodecError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_opt_str(r: &mut dyn Read) -> Result<Option<String>, CodecError> {
    match read_u8(r)? {
        0 => Ok(None),
        1 => Ok(Some(read_str(r)?)),
        flag => Err(CodecError::MalformedLog {
            detail: format!("invalid optional-string presence flag: {flag}"),
        }),
    }
}

fn read_opt_f64(r: &mut dyn Read) -> Result<Option<f64>, CodecError> {
    match read_u8(r)? {
        0 => Ok(None),
        1 => Ok(Some(read_f64_le(r)?)),
        flag => Err(CodecError::MalformedLog {
            detail: format!("invalid optional-f64 presence flag: {flag}"),
        }),
    }
}

fn priority_tag(p: Priority) -> u8 {
    p as u8
}

fn priority_from_tag(tag: u8) -> Result<Priority, CodecError> {
    match tag {
        0 => Ok(Priority::System),
        1 => Ok(Priority::Player),
        2 => Ok(Priority::Automation),
        tag => Err(CodecError::MalformedLog {
            detail: format!("invalid priority tag {tag}"),
        }),
    }
}

// ── Command encode/decode ───────────────────────────────────────

fn encode_command(w: &mut dyn Write, cmd: &Command) -> Result<(), CodecError> {
    write_str(w, &cmd.command_type)?;

    match &cmd.payload {
        CommandPayload::SetResourceAmount { resource_id, amount } => {
            write_u8(w, PAYLOAD_SET_RESOURCE_AMOUNT)?;
            write_str(w, resource_id)?;
            write_f64_le(w, *amount)?;
        }
        CommandPayload::AdjustGeneratorOwned { generator_id, delta } => {
            write_u8(w, PAYLOAD_ADJUST_GENERATOR_OWNED)?;
            write_str(w, generator_id)?;
            write_i64_le(w, *delta)?;
        }
        CommandPayload::SetGeneratorEnabled { generator_id, enabled } => {
            write_u8(w, PAYLOAD_SET_GENERATOR_ENABLED)?;
            write_str(w, generator_id)?;
            write_bool(w, *enabled)?;
        }
        CommandPayload::SetParameter { key, value } => {
            write_u8(w, PAYLOAD_SET_PARAMETER)?;
            write_str(w, key)?;
            write_f64_le(w, *value)?;
        }
        CommandPayload::Custom { type_id, data } => {
            write_u8(w, PAYLOAD_CUSTOM)?;
            write_str(w, type_id)?;
            write_bytes(w, data)?;
        }
    }

    write_u8(w, priority_tag(cmd.priority))?;
    write_u64_le(w, cmd.step.0)?;
    write_f64_le(w, cmd.timestamp)?;
    write_f64_le(w, cmd.issued_at)?;
    write_opt_str(w, &cmd.request_id)?;
    Ok(())
}

fn decode_command(r: &mut dyn Read) -> Result<Command, CodecError> {
    let command_type = read_str(r)?;

    let payload = match read_u8(r)? {
        PAYLOAD_SET_RESOURCE_AMOUNT => CommandPayload::SetResourceAmount {
            resource_id: read_str(r)?,
            amount: read_f64_le(r)?,
        },
        PAYLOAD_ADJUST_GENERATOR_OWNED => CommandPayload::AdjustGeneratorOwned {
            generator_id: read_str(r)?,
            delta: read_i64_le(r)?,
        },
        PAYLOAD_SET_GENERATOR_ENABLED => CommandPayload::SetGeneratorEnabled {
            generator_id: read_str(r)?,
            enabled: read_bool(r)?,
        },
        PAYLOAD_SET_PARAMETER => CommandPayload::SetParameter {
            key: read_str(r)?,
            value: read_f64_le(r)?,
        },
        PAYLOAD_CUSTOM => CommandPayload::Custom {
            type_id: read_str(r)?,
            data: read_bytes(r)?,
        },
        tag => return Err(CodecError::UnknownPayloadType { tag }),
    };

    let priority = priority_from_tag(read_u8(r)?)?;
    let step = StepId(read_u64_le(r)?);
    let timestamp = read_f64_le(r)?;
    let issued_at = read_f64_le(r)?;
    let request_id = read_opt_str(r)?;

    Ok(Command {
        command_type,
        payload,
        priority,
        step,
        timestamp,
        issued_at,
        request_id,
        arrival_seq: 0,
    })
}

// ── Start state encode/decode ───────────────────────────────────

fn encode_resource_def(w: &mut dyn Write, id: &str, state: &SerializedResourceState, index: usize) -> Result<(), CodecError> {
    write_str(w, id)?;
    write_f64_le(w, state.amounts[index])?;
    write_opt_f64(w, &state.capacities[index])?;
    write_bool(w, state.unlocked[index])?;
    write_bool(w, state.visible[index])?;
    Ok(())
}

fn encode_start_state(w: &mut dyn Write, state: &StartState) -> Result<(), CodecError> {
    let res = &state.resources;
    write_u32_le(w, res.ids.len() as u32)?;
    for i in 0..res.ids.len() {
        encode_resource_def(w, &res.ids[i], res, i)?;
    }

    match &res.automation_state {
        Some(bytes) => {
            write_u8(w, 1)?;
            write_bytes(w, bytes)?;
        }
        None => write_u8(w, 0)?,
    }
    match &res.transform_state {
        Some(bytes) => {
            write_u8(w, 1)?;
            write_bytes(w, bytes)?;
        }
        None => write_u8(w, 0)?,
    }

    write_u32_le(w, state.generators.len() as u32)?;
    for gen in &state.generators {
        write_str(w, &gen.id)?;
        write_u64_le(w, gen.owned)?;
        write_bool(w, gen.enabled)?;
        encode_flows(w, &gen.produces)?;
        encode_flows(w, &gen.consumes)?;
    }
    Ok(())
}

fn encode_flows(w: &mut dyn Write, flows: &[GeneratorFlow]) -> Result<(), CodecError> {
    write_u32_le(w, flows.len() as u32)?;
    for flow in flows {
        write_str(w, &flow.resource_id)?;
        write_f64_le(w, flow.rate_per_owned_per_second)?;
    }
    Ok(())
}

fn decode_flows(r: &mut dyn Read) -> Result<Vec<GeneratorFlow>, CodecError> {
    let count = read_u32_le(r)? as usize;
    let mut flows = Vec::with_capacity(count);
    for _ in 0..count {
        flows.push(GeneratorFlow {
            resource_id: read_str(r)?,
            rate_per_owned_per_second: read_f64_le(r)?,
        });
    }
    Ok(flows)
}

fn decode_start_state(r: &mut dyn Read) -> Result<StartState, CodecError> {
    let resource_count = read_u32_le(r)? as usize;
    let mut ids = Vec::with_capacity(resource_count);
    let mut amounts = Vec::with_capacity(resource_count);
    let mut capacities = Vec::with_capacity(resource_count);
    let mut unlocked = Vec::with_capacity(resource_count);
    let mut visible = Vec::with_capacity(resource_count);

    for _ in 0..resource_count {
        ids.push(read_str(r)?);
        amounts.push(read_f64_le(r)?);
        capacities.push(read_opt_f64(r)?);
        unlocked.push(read_bool(r)?);
        visible.push(read_bool(r)?);
    }

    let automation_state = match read_u8(r)? {
        0 => None,
        1 => Some(read_bytes(r)?),
        flag => {
            return Err(CodecError::MalformedLog {
                detail: format!("invalid automation_state presence flag: {flag}"),
            })
        }
    };
    let transform_state = match read_u8(r)? {
        0 => None,
        1 => Some(read_bytes(r)?),
        flag => {
            return Err(CodecError::MalformedLog {
                detail: format!("invalid transform_state presence flag: {flag}"),
            })
        }
    };

    let generator_count = read_u32_le(r)? as usize;
    let mut generators = Vec::with_capacity(generator_count);
    for _ in 0..generator_count {
        generators.push(GeneratorDef {
            id: read_str(r)?,
            owned: read_u64_le(r)?,
            enabled: read_bool(r)?,
            produces: decode_flows(r)?,
            consumes: decode_flows(r)?,
        });
    }

    Ok(StartState {
        resources: SerializedResourceState {
            ids,
            amounts,
            capacities,
            unlocked,
            visible,
            automation_state,
            transform_state,
        },
        generators,
    })
}

// ── Log encode/decode ───────────────────────────────────────────

/// Encodes a [`CommandLog`] to `w` in the binary command log format.
pub fn encode_log(w: &mut dyn Write, log: &CommandLog) -> Result<(), CodecError> {
    w.write_all(&MAGIC)?;
    write_str(w, FORMAT_VERSION)?;
    write_str(w, &log.version)?;

    encode_start_state(w, &log.start_state)?;

    write_u32_le(w, log.commands.len() as u32)?;
    for command in &log.commands {
        encode_command(w, command)?;
    }

    write_opt_u64(w, log.metadata.seed)?;
    write_u64_le(w, log.metadata.last_step)?;
    write_opt_u64(w, log.metadata.config_hash)?;
    Ok(())
}

fn write_opt_u64(w: &mut dyn Write, v: Option<u64>) -> Result<(), CodecError> {
    match v {
        Some(v) => {
            write_u8(w, 1)?;
            write_u64_le(w, v)?;
        }
        None => write_u8(w, 0)?,
    }
    Ok(())
}

fn read_opt_u64(r: &mut dyn Read) -> Result<Option<u64>, CodecError> {
    match read_u8(r)? {
        0 => Ok(None),
        1 => Ok(Some(read_u64_le(r)?)),
        flag => Err(CodecError::MalformedLog {
            detail: format!("invalid optional-u64 presence flag: {flag}"),
        }),
    }
}

/// Decodes a [`CommandLog`] from `r`, validating the magic bytes and
/// format version first.
pub fn decode_log(r: &mut dyn Read) -> Result<CommandLog, CodecError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(CodecError::InvalidMagic);
    }

    let format_version = read_str(r)?;
    if format_version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion { found: format_version });
    }

    let version = read_str(r)?;
    let start_state = decode_start_state(r)?;

    let command_count = read_u32_le(r)? as usize;
    let mut commands = Vec::with_capacity(command_count);
    for _ in 0..command_count {
        commands.push(decode_command(r)?);
    }

    let seed = read_opt_u64(r)?;
    let last_step = read_u64_le(r)?;
    let config_hash = read_opt_u64(r)?;

    Ok(CommandLog {
        version,
        start_state,
        commands,
        metadata: LogMetadata { seed, last_step, config_hash },
    })
}
