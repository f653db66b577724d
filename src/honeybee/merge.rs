//! Merging of lowered rooms by zone or by story.

use crate::boundary::BoundaryCondition;
use crate::error::DragonflyError;
use crate::honeybee::lower::split_plenum_id;
use crate::honeybee::{HbRoom, MergeMethod};
use crate::id::clean_string;
use anyhow::Result;
use log::info;
use std::collections::{HashMap, HashSet};

/// Merges rooms sharing a zone or a story into single rooms.
///
/// Only rooms connected through Surface faces are merged; a group falling
/// apart into several pieces yields one room per piece, named
/// `<key>_<k>`. Plenums are merged only by the `Plenum*` methods and must
/// form one connected piece per group. Faces between merged rooms are
/// removed.
pub fn merge_rooms(rooms: Vec<HbRoom>, method: MergeMethod) -> Result<Vec<HbRoom>> {
    if method == MergeMethod::None {
        return Ok(rooms);
    }
    let zone_of: HashMap<&str, Option<&str>> = rooms
        .iter()
        .map(|r| (r.identifier.as_str(), r.zone.as_deref()))
        .collect();

    // group key per room; None leaves the room as it is
    let keys: Vec<Option<(String, bool)>> = rooms
        .iter()
        .map(|r| {
            let (base, plenum) = split_plenum_id(&r.identifier);
            if plenum.is_some() && !method.merges_plenums() {
                return None;
            }
            let key = match method {
                MergeMethod::Zones | MergeMethod::PlenumZones => zone_of
                    .get(base)
                    .copied()
                    .flatten()
                    .unwrap_or(base)
                    .to_string(),
                _ => r.story.clone().unwrap_or_else(|| base.to_string()),
            };
            Some(match plenum {
                Some(suffix) => (format!("{}{}", key, suffix), true),
                None => (key, false),
            })
        })
        .collect();

    let mut order: Vec<String> = vec![];
    let mut groups: HashMap<String, (bool, Vec<usize>)> = HashMap::new();
    for (i, key) in keys.iter().enumerate() {
        if let Some((key, plenum)) = key {
            if !groups.contains_key(key) {
                order.push(key.clone());
            }
            groups.entry(key.clone()).or_insert((*plenum, vec![])).1.push(i);
        }
    }

    let mut renamed: HashMap<String, String> = HashMap::new();
    let mut merged_sets: Vec<(String, Vec<usize>)> = vec![];
    for key in &order {
        let Some((plenum, members)) = groups.get(key) else {
            continue;
        };
        let pieces = connected_pieces(&rooms, members);
        if *plenum && pieces.len() > 1 {
            return Err(DragonflyError::InvalidAssembly(format!(
                "Plenums of \"{}\" are not contiguous and cannot be merged into one room",
                key
            ))
            .into());
        }
        let split = pieces.len() > 1;
        for (k, piece) in pieces.into_iter().enumerate() {
            if piece.len() == 1 && !*plenum {
                continue;
            }
            let new_id = if *plenum {
                let (base, suffix) = split_plenum_id(key);
                format!("{}{}", clean_string(base), suffix.unwrap_or_default())
            } else if split {
                format!("{}_{}", clean_string(key), k + 1)
            } else {
                clean_string(key)
            };
            for &m in &piece {
                renamed.insert(rooms[m].identifier.clone(), new_id.clone());
            }
            merged_sets.push((new_id, piece));
        }
    }

    let mut slots: Vec<Option<HbRoom>> = rooms.into_iter().map(Some).collect();
    let mut first_of: HashMap<usize, HbRoom> = HashMap::new();
    for (new_id, piece) in merged_sets {
        let members: Vec<HbRoom> = piece.iter().filter_map(|&m| slots[m].take()).collect();
        if let (Some(&first), Some(room)) = (piece.first(), join(new_id, members)) {
            first_of.insert(first, room);
        }
    }
    let mut out = vec![];
    for (i, slot) in slots.into_iter().enumerate() {
        if let Some(room) = first_of.remove(&i).or(slot) {
            out.push(room);
        }
    }

    for room in &mut out {
        for face in &mut room.faces {
            remap(&mut face.boundary_condition, &renamed);
            for ap in &mut face.apertures {
                remap(&mut ap.boundary_condition, &renamed);
            }
        }
    }
    info!("Merged rooms into {} rooms", out.len());
    Ok(out)
}

/// Groups of rooms connected through Surface faces.
fn connected_pieces(rooms: &[HbRoom], members: &[usize]) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = members
        .iter()
        .map(|&m| (rooms[m].identifier.as_str(), m))
        .collect();
    let mut seen: HashSet<usize> = HashSet::new();
    let mut pieces = vec![];
    for &start in members {
        if !seen.insert(start) {
            continue;
        }
        let mut piece = vec![start];
        let mut stack = vec![start];
        while let Some(m) = stack.pop() {
            for face in &rooms[m].faces {
                let next = face
                    .boundary_condition
                    .adjacent_room()
                    .and_then(|id| index.get(id))
                    .copied();
                if let Some(n) = next.filter(|n| seen.insert(*n)) {
                    piece.push(n);
                    stack.push(n);
                }
            }
        }
        piece.sort_unstable();
        pieces.push(piece);
    }
    pieces
}

/// One room from several, dropping the faces between them.
fn join(identifier: String, members: Vec<HbRoom>) -> Option<HbRoom> {
    let ids: HashSet<String> = members.iter().map(|r| r.identifier.clone()).collect();
    let mut iter = members.into_iter();
    let mut out = iter.next()?;
    for room in iter {
        out.faces.extend(room.faces);
        out.outdoor_shades.extend(room.outdoor_shades);
    }
    out.faces.retain(|f| !f.boundary_condition.adjacent_room().is_some_and(|r| ids.contains(r)));
    out.identifier = identifier;
    out.display_name = None;
    Some(out)
}

fn remap(bc: &mut BoundaryCondition, renamed: &HashMap<String, String>) {
    if let BoundaryCondition::Surface {
        boundary_condition_objects,
    } = bc
    {
        if let Some(last) = boundary_condition_objects.last_mut() {
            if let Some(new_id) = renamed.get(last.as_str()) {
                *last = new_id.clone();
            }
        }
    }
}
