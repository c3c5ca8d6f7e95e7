//! Typed register access shared by the adapter variants

use std::time::Duration;

use shared::{machine_warn, MachineId};

use super::codec;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::RegisterClient;

/// Largest block a single read may request
pub const MAX_READ_WORDS: u16 = 60;

pub async fn read_word<C: RegisterClient + ?Sized>(client: &C, address: u16) -> OrchestratorResult<u16> {
    client
        .read_registers(address, 1)
        .await?
        .first()
        .copied()
        .ok_or_else(|| OrchestratorError::protocol(address, "empty register response"))
}

pub async fn read_words<C: RegisterClient + ?Sized>(
    client: &C,
    address: u16,
    count: u16,
) -> OrchestratorResult<Vec<u16>> {
    let words = client.read_registers(address, count).await?;
    if words.len() < count as usize {
        return Err(OrchestratorError::protocol(
            address,
            format!("expected {count} words, got {}", words.len()),
        ));
    }
    Ok(words)
}

pub async fn read_flag<C: RegisterClient + ?Sized>(client: &C, address: u16) -> OrchestratorResult<bool> {
    client
        .read_coils(address, 1)
        .await?
        .first()
        .copied()
        .ok_or_else(|| OrchestratorError::protocol(address, "empty coil response"))
}

pub async fn read_text<C: RegisterClient + ?Sized>(
    client: &C,
    address: u16,
    words: u16,
) -> OrchestratorResult<String> {
    Ok(codec::decode_text(&read_words(client, address, words).await?))
}

/// Read a block larger than one request allows, pausing between chunks
pub async fn read_paced<C: RegisterClient + ?Sized>(
    client: &C,
    address: u16,
    count: usize,
    chunk: u16,
    pause: Duration,
) -> OrchestratorResult<Vec<u16>> {
    let chunk = chunk.max(1);
    let mut words = Vec::with_capacity(count);
    while words.len() < count {
        let offset = words.len();
        let length = chunk.min((count - offset) as u16);
        words.extend(read_words(client, address + offset as u16, length).await?);
        if words.len() < count && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    Ok(words)
}

/// Write a block in chunks, pausing between chunks
pub async fn write_paced<C: RegisterClient + ?Sized>(
    client: &C,
    address: u16,
    words: &[u16],
    chunk: usize,
    pause: Duration,
) -> OrchestratorResult<()> {
    let chunk = chunk.max(1);
    let chunks = words.chunks(chunk);
    let total = chunks.len();
    for (index, block) in chunks.enumerate() {
        client.write_registers(address + (index * chunk) as u16, block).await?;
        if index + 1 < total && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    Ok(())
}

/// Unwrap an optional field, logging and defaulting on failure
pub fn optional<T: Default>(machine_id: MachineId, field: &str, result: OrchestratorResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            machine_warn!(machine_id, "⚠️ Optional field {} unavailable: {}", field, e);
            T::default()
        }
    }
}
