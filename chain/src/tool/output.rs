//! Parsers for the human-oriented output of the chain tools.

use serde_json::Value;

use stakeward_types::{Address, ElectionId, ElectionParams, NanoTokens, StakeBounds, ValidatorSetParams};

use crate::{Account, ChainError, PoolEvent, PoolEventKind, PoolInfo, SyncLag};

const RESULT_KEYWORD: &str = "Result: ";

fn data_err(what: &str, out: &str) -> ChainError {
    let snippet: String = out.chars().take(200).collect();
    ChainError::Data(format!("{what} in output: {snippet}"))
}

/// First JSON value in `s`, ignoring anything after it.
fn first_json(s: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(s.trim_start())
        .into_iter::<Value>()
        .next()
        .and_then(Result::ok)
}

/// The JSON printed after `Result: `.
pub fn result_json(out: &str) -> Result<Value, ChainError> {
    let start = out
        .find(RESULT_KEYWORD)
        .ok_or_else(|| data_err("no result", out))?;
    first_json(&out[start + RESULT_KEYWORD.len()..]).ok_or_else(|| data_err("malformed result", out))
}

/// The JSON printed after `Config p<n>: `.
pub fn config_param(out: &str, n: u32) -> Result<Option<Value>, ChainError> {
    let marker = format!("Config p{n}:");
    let Some(start) = out.find(&marker) else {
        return Ok(None);
    };
    let value = first_json(&out[start + marker.len()..])
        .ok_or_else(|| data_err(&format!("malformed config p{n}"), out))?;
    Ok((!value.is_null()).then_some(value))
}

/// An integer given as a JSON number, a decimal string, or a `0x` string.
pub fn value_u128(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x") {
                Some(hex) if hex.is_empty() => Some(0),
                Some(hex) => u128::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn field_u64(obj: &Value, key: &str) -> Result<u64, ChainError> {
    obj.get(key)
        .and_then(value_u128)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| ChainError::Data(format!("missing or invalid field {key}")))
}

fn field_nano(obj: &Value, key: &str) -> Result<NanoTokens, ChainError> {
    obj.get(key)
        .and_then(value_u128)
        .map(NanoTokens::new)
        .ok_or_else(|| ChainError::Data(format!("missing or invalid field {key}")))
}

/// `getconfig 1`: the elector account id.
pub fn elector_address(out: &str) -> Result<Address, ChainError> {
    let value = config_param(out, 1)?.ok_or_else(|| data_err("no config p1", out))?;
    let id = value
        .as_str()
        .ok_or_else(|| data_err("config p1 is not a string", out))?;
    Ok(Address::new(format!("-1:{id}")))
}

/// `getconfig 15`.
pub fn election_params(out: &str) -> Result<Option<ElectionParams>, ChainError> {
    let Some(v) = config_param(out, 15)? else {
        return Ok(None);
    };
    Ok(Some(ElectionParams {
        validators_elected_for: field_u64(&v, "validators_elected_for")?,
        elections_start_before: field_u64(&v, "elections_start_before")?,
        elections_end_before: field_u64(&v, "elections_end_before")?,
        stake_held_for: field_u64(&v, "stake_held_for")?,
    }))
}

/// `getconfig 16`.
pub fn validator_set_params(out: &str) -> Result<Option<ValidatorSetParams>, ChainError> {
    let Some(v) = config_param(out, 16)? else {
        return Ok(None);
    };
    let field = |key: &str| -> Result<u32, ChainError> {
        u32::try_from(field_u64(&v, key)?)
            .map_err(|_| ChainError::Data(format!("{key} out of range")))
    };
    Ok(Some(ValidatorSetParams {
        max_validators: field("max_validators")?,
        max_main_validators: field("max_main_validators")?,
        min_validators: field("min_validators")?,
    }))
}

/// `getconfig 17`.
pub fn stake_bounds(out: &str) -> Result<Option<StakeBounds>, ChainError> {
    let Some(v) = config_param(out, 17)? else {
        return Ok(None);
    };
    Ok(Some(StakeBounds {
        min_stake: field_nano(&v, "min_stake")?,
        max_stake: field_nano(&v, "max_stake")?,
    }))
}

/// `account <addr>`: `key: value` lines after `Succeeded.`.
pub fn account(address: &Address, out: &str) -> Result<Account, ChainError> {
    let mut acc_type = None;
    let mut balance = NanoTokens::ZERO;
    let mut started = false;
    for line in out.lines() {
        if !started {
            started = line.contains("Succeeded.");
            continue;
        }
        if line.contains("Account not found") {
            return Err(ChainError::Data(format!("account not found: {address}")));
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "acc_type" => acc_type = Some(value.trim().to_string()),
            "balance" => {
                let digits: String = value
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                balance = NanoTokens::new(
                    digits
                        .parse()
                        .map_err(|_| data_err("malformed balance", out))?,
                );
            }
            _ => {}
        }
    }
    let acc_type = acc_type.ok_or_else(|| data_err("no account state", out))?;
    Ok(Account {
        address: address.clone(),
        acc_type,
        balance,
    })
}

/// Console `getstats`. The console prints empty values for fields it does
/// not know yet (`"timediff": ,`), which are read as absent.
pub fn sync_lag(out: &str) -> Result<SyncLag, ChainError> {
    let mut payload = String::new();
    let mut started = false;
    for line in out.lines() {
        if line.starts_with('{') {
            started = true;
        }
        if !started {
            continue;
        }
        let trimmed = line.trim_end();
        if let Some((key, rest)) = trimmed.split_once(':') {
            let rest = rest.trim();
            if rest.is_empty() || rest == "," {
                payload.push_str(key);
                payload.push_str(": null");
                if rest == "," {
                    payload.push(',');
                }
                continue;
            }
        }
        payload.push_str(trimmed);
    }
    let stats = first_json(&payload).ok_or_else(|| data_err("malformed stats", out))?;
    Ok(match stats.get("timediff").and_then(Value::as_i64) {
        Some(lag) => SyncLag::Seconds(lag),
        None => SyncLag::Unknown,
    })
}

/// Active election id from the elector getter. Zero means no election.
pub fn active_election_ids(result: &Value) -> Result<Vec<ElectionId>, ChainError> {
    let raw = match result {
        Value::Array(items) => items.first(),
        Value::Object(map) => map.get("value0").or_else(|| map.values().next()),
        other => Some(other),
    }
    .ok_or_else(|| ChainError::Data(format!("no election id in {result}")))?;
    let id = value_u128(raw).ok_or_else(|| ChainError::Data(format!("bad election id {raw}")))?;
    Ok(if id == 0 {
        Vec::new()
    } else {
        vec![ElectionId::new(id.to_string())]
    })
}

/// Nonzero amounts in a getter result, in order.
pub fn amounts(result: &Value) -> Vec<NanoTokens> {
    let mut found = Vec::new();
    collect_amounts(result, &mut found);
    found.into_iter().filter(|a| *a != 0).map(NanoTokens::new).collect()
}

fn collect_amounts(value: &Value, into: &mut Vec<u128>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_amounts(v, into)),
        Value::Object(map) => map.values().for_each(|v| collect_amounts(v, into)),
        other => into.extend(value_u128(other)),
    }
}

/// Member stakes from the elector `get` getter:
/// `{"value0": {"members": {"<pubkey>": {"stake": "0x…", …}}}}`.
pub fn participant_stakes(result: &Value) -> Vec<NanoTokens> {
    let data = result.get("value0").unwrap_or(result);
    let Some(members) = data.get("members") else {
        return Vec::new();
    };
    let iter: Box<dyn Iterator<Item = &Value>> = match members {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return Vec::new(),
    };
    iter.filter_map(|m| m.get("stake").and_then(value_u128))
        .map(NanoTokens::new)
        .collect()
}

/// `depool events`: blocks of
///
/// ```text
/// event <id>
/// <Name> <unix time> (<date>)
/// <json>
/// ```
///
/// returned oldest first.
pub fn pool_events(out: &str) -> Result<Vec<PoolEvent>, ChainError> {
    let mut events = Vec::new();
    let mut lines = out.lines().map(str::trim);
    while let Some(line) = lines.next() {
        let Some(id) = line.strip_prefix("event ") else {
            continue;
        };
        let header = lines.next().unwrap_or_default();
        let mut parts = header.split_whitespace();
        let name = parts.next().unwrap_or_default().to_string();
        let created_at = parts.next().and_then(|t| t.parse().ok()).unwrap_or(0);
        let body = lines.next().and_then(first_json).unwrap_or(Value::Null);
        events.push(PoolEvent {
            id: id.trim().to_string(),
            created_at,
            kind: pool_event_kind(name, &body)?,
        });
    }
    events.sort_by_key(|e| e.created_at);
    Ok(events)
}

fn pool_event_kind(name: String, body: &Value) -> Result<PoolEventKind, ChainError> {
    Ok(match name.as_str() {
        "StakeSigningRequested" => {
            let id = body
                .get("electionId")
                .and_then(value_u128)
                .ok_or_else(|| ChainError::Data(format!("bad StakeSigningRequested: {body}")))?;
            let proxy = body
                .get("proxy")
                .and_then(Value::as_str)
                .ok_or_else(|| ChainError::Data(format!("bad StakeSigningRequested: {body}")))?;
            PoolEventKind::StakeSigningRequested {
                election_id: ElectionId::new(id.to_string()),
                proxy: Address::new(proxy),
            }
        }
        "TooLowDePoolBalance" => PoolEventKind::TooLowBalance {
            replenishment: body
                .get("replenishment")
                .and_then(value_u128)
                .map(NanoTokens::new)
                .ok_or_else(|| ChainError::Data(format!("bad TooLowDePoolBalance: {body}")))?,
        },
        _ => PoolEventKind::Other(name),
    })
}

/// `getDePoolInfo` result.
pub fn pool_info(result: &Value) -> Result<PoolInfo, ChainError> {
    let closed = result
        .get("poolClosed")
        .and_then(Value::as_bool)
        .ok_or_else(|| ChainError::Data(format!("no poolClosed in {result}")))?;
    let proxies = result
        .get("proxies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(Address::new)
                .collect()
        })
        .unwrap_or_default();
    let validator_wallet = result
        .get("validatorWallet")
        .and_then(Value::as_str)
        .map(Address::new)
        .unwrap_or_else(|| Address::new(""));
    Ok(PoolInfo {
        closed,
        proxies,
        validator_wallet,
    })
}
