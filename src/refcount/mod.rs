// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Refcount side-effect (component F): for writes that overwrite a vdi's
//! indirection slice, snapshot the displaced mapping before the forward and
//! release it only after the forward succeeds (spec §4.F, Invariant 3).

use tracing::warn;

use crate::{
    engine::LocalEngine,
    error::Outcome,
    wire::{GenerationRef, MAX_DATA_OBJS, Oid, data_ref_offset, data_vid_offset},
};

/// True when `[offset, offset + length)` lies wholly within the vdi's
/// `data_vdi_id` array — the only byte range the refcount side-effect
/// applies to.
pub fn is_data_vid_update(offset: u64, length: usize) -> bool {
    let end = offset.saturating_add(length as u64);
    offset >= data_vid_offset(0) && end <= data_vid_offset(MAX_DATA_OBJS)
}

/// Slot index and count within the `data_vdi_id` array touched by a write at
/// `(offset, length)`. Only meaningful when [`is_data_vid_update`] is true.
fn slot_range(offset: u64, length: usize) -> (usize, usize) {
    const VID_SIZE: u64 = 4;
    let start = ((offset - data_vid_offset(0)) / VID_SIZE) as usize;
    let n = length / VID_SIZE as usize;
    (start, n)
}

/// Pre-forward snapshot of the indirection slots a write is about to
/// overwrite: the vids currently occupying `[start, start+n)` and their
/// refcount witnesses.
pub struct RefcountSnapshot {
    pub start: usize,
    pub old_vids: Vec<u64>,
    pub refs: Vec<GenerationRef>,
}

/// Read the pre-image of the touched indirection slots from the local
/// replica. Must run before the forward is dispatched (Invariant 3).
pub async fn snapshot(
    engine: &dyn LocalEngine,
    vdi_oid: Oid,
    offset: u64,
    length: usize,
) -> Result<RefcountSnapshot, Outcome> {
    let (start, n) = slot_range(offset, length);

    let vid_bytes = engine
        .read_object(vdi_oid, n * 4, data_vid_offset(start))
        .await?;
    let ref_bytes = engine
        .read_object(vdi_oid, n * 8, data_ref_offset(start))
        .await?;

    let old_vids = vid_bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes(c.try_into().expect("4 bytes")) as u64)
        .collect();
    let refs = ref_bytes
        .chunks_exact(8)
        .map(|c| GenerationRef {
            generation: u32::from_be_bytes(c[0..4].try_into().expect("4 bytes")),
            count: u32::from_be_bytes(c[4..8].try_into().expect("4 bytes")),
        })
        .collect();

    Ok(RefcountSnapshot {
        start,
        old_vids,
        refs,
    })
}

/// Parse the new vids the write is installing, so they can be compared
/// against the pre-image.
fn new_vids(payload: &[u8]) -> Vec<u64> {
    payload
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes(c.try_into().expect("4 bytes")) as u64)
        .collect()
}

/// Post-forward step: for every displaced slot (`old != 0 && old != new`),
/// release the old target's refcount witness and clear the slot, then write
/// the cleared witnesses back to the vdi. Only called after the forward has
/// already succeeded (Invariant 3); errors here are logged, not surfaced,
/// because the client-visible write has already landed on every replica
/// (spec §7).
pub async fn apply(
    engine: &dyn LocalEngine,
    vdi_oid: Oid,
    payload: &[u8],
    snap: RefcountSnapshot,
) {
    let new = new_vids(payload);
    let mut cleared = snap.refs;

    for (i, &old_vid) in snap.old_vids.iter().enumerate() {
        let replaced = new.get(i).copied().unwrap_or(0);
        if old_vid == 0 || old_vid == replaced {
            continue;
        }
        let idx = snap.start + i;
        let witness = cleared[i];
        let data_oid = Oid::vid_to_data_oid(old_vid as u32, idx);
        if let Err(err) = engine
            .dec_object_refcnt(data_oid, witness.generation, witness.count)
            .await
        {
            warn!(?err, oid = old_vid, idx, "refcount decrement failed");
        }
        cleared[i] = GenerationRef::default();
    }

    let mut buf = Vec::with_capacity(cleared.len() * 8);
    for r in &cleared {
        buf.extend_from_slice(&r.generation.to_be_bytes());
        buf.extend_from_slice(&r.count.to_be_bytes());
    }
    if let Err(err) = engine
        .write_object(vdi_oid, &buf, data_ref_offset(snap.start), false)
        .await
    {
        warn!(?err, "failed to write back cleared refcount witnesses");
    }
}
