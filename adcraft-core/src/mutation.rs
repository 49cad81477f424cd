//! Mutation Engine - constrained re-selection against an existing spec
//!
//! Each mutation returns a fresh spec. Persisting it, rendering it and
//! superseding the old result is the caller's job.

use std::collections::HashSet;

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::catalog::{Catalog, Style};
use crate::error::{EngineError, EngineResult};
use crate::model::{
    new_id, Angle, CopyPool, CopySlot, Format, Language, SlotId, SlotType, Spec, SpecCopy, ZoneId,
};
use crate::selection::{candidates_for, pick_slot};

fn derive(spec: &Spec) -> Spec {
    Spec {
        id: new_id("sp"),
        created_at: Utc::now(),
        ..spec.clone()
    }
}

/// A random supported zone other than `current`, if the style has one.
fn other_zone<R: Rng + ?Sized>(style: &Style, current: &str, rng: &mut R) -> Option<ZoneId> {
    let others: Vec<&ZoneId> = style
        .definition
        .supported_zones
        .iter()
        .filter(|z| z.as_str() != current)
        .collect();
    others.choose(rng).map(|z| (*z).clone())
}

/// Slot currently filling `slot_type`, if it is still in the pool.
fn current_slot<'a>(spec: &Spec, pool: &'a CopyPool, slot_type: SlotType) -> Option<&'a CopySlot> {
    spec.copy.slot_ids.get(&slot_type).and_then(|id| pool.slot(id))
}

/// Angle-matched secondaries for every secondary type of `style`.
fn fill_secondaries<R: Rng + ?Sized>(
    copy: &mut SpecCopy,
    style: &Style,
    pool: &CopyPool,
    language: Language,
    primary: &CopySlot,
    rng: &mut R,
) -> EngineResult<()> {
    let none = HashSet::new();
    for slot_type in style.definition.secondary_slot_types() {
        let candidates = candidates_for(pool, language, *slot_type)?;
        if let Some(slot) = pick_slot(&candidates, primary.angle, &none, rng) {
            copy.fill(slot);
        }
    }
    Ok(())
}

/// Move to a different style of the same family and a different zone.
pub fn style_swap<R: Rng + ?Sized>(
    catalog: &Catalog,
    spec: &Spec,
    pool: &CopyPool,
    rng: &mut R,
) -> EngineResult<Spec> {
    let old_style = catalog.get_style(&spec.style_id)?;
    let family = catalog.get_family(&spec.family_id)?;
    let siblings: Vec<&Style> = catalog
        .styles_for_family(&spec.family_id)?
        .into_iter()
        .filter(|s| s.id() != spec.style_id)
        .collect();
    let style = siblings.choose(rng).copied().unwrap_or(old_style);

    let mut next = derive(spec);
    next.style_id = style.id().to_string();
    next.zone_id = other_zone(style, &spec.zone_id, rng)
        .unwrap_or_else(|| style.definition.supported_zones[0].clone());
    next.theme = style.definition.default_theme.clone();

    let def = &style.definition;
    let primary_type = def.primary_slot_type();
    let primary = if primary_type == old_style.definition.primary_slot_type() {
        current_slot(spec, pool, primary_type)
    } else {
        None
    };
    let primary = match primary {
        Some(slot) => slot,
        None => {
            let target = family
                .forced_angle
                .or_else(|| pool.slot(&spec.primary_slot_id).and_then(|s| s.angle));
            let candidates = candidates_for(pool, spec.language, primary_type)?;
            pick_slot(&candidates, target, &HashSet::new(), rng).ok_or_else(|| {
                EngineError::PreconditionFailed(format!("no {} copy to pick", primary_type.as_str()))
            })?
        }
    };

    let mut copy = SpecCopy::default();
    copy.fill(primary);
    let mut needed = vec![];
    for slot_type in def.secondary_slot_types() {
        match current_slot(spec, pool, *slot_type) {
            Some(kept) => copy.fill(kept),
            None => needed.push(*slot_type),
        }
    }
    let none = HashSet::new();
    for slot_type in needed {
        let candidates = candidates_for(pool, spec.language, slot_type)?;
        if let Some(slot) = pick_slot(&candidates, primary.angle, &none, rng) {
            copy.fill(slot);
        }
    }

    next.primary_slot_id = primary.id.clone();
    next.copy = copy;
    Ok(next)
}

/// Swap the primary copy, avoiding anything the lineage already showed.
///
/// `lineage_used` holds the primary slot ids of every result in the chain.
pub fn headline_swap<R: Rng + ?Sized>(
    catalog: &Catalog,
    spec: &Spec,
    pool: &CopyPool,
    lineage_used: &HashSet<SlotId>,
    rng: &mut R,
) -> EngineResult<Spec> {
    let style = catalog.get_style(&spec.style_id)?;
    let family = catalog.get_family(&spec.family_id)?;
    let primary_type = style.definition.primary_slot_type();
    let current = pool.slot(&spec.primary_slot_id);
    let current_angle = current.and_then(|s| s.angle);

    let mut candidates: Vec<&CopySlot> = candidates_for(pool, spec.language, primary_type)?
        .into_iter()
        .filter(|s| s.id != spec.primary_slot_id)
        .collect();
    if let Some(forced) = family.forced_angle {
        if candidates.iter().any(|s| s.angle == Some(forced)) {
            candidates.retain(|s| s.angle == Some(forced));
        }
    }

    let new_angle = |s: &&CopySlot| family.forced_angle.is_none() && s.angle != current_angle;
    let fresh = |s: &&CopySlot| !lineage_used.contains(&s.id);
    let tiers: [Vec<&CopySlot>; 4] = [
        candidates.iter().copied().filter(|s| fresh(s) && new_angle(s)).collect(),
        candidates.iter().copied().filter(fresh).collect(),
        candidates.iter().copied().filter(new_angle).collect(),
        candidates.clone(),
    ];
    let picked = tiers
        .iter()
        .find_map(|tier| tier.choose(rng).copied())
        .or(current)
        .ok_or_else(|| {
            EngineError::PreconditionFailed(format!(
                "no {} copy left for spec {}",
                primary_type.as_str(),
                spec.id
            ))
        })?;

    let mut next = derive(spec);
    let mut copy = SpecCopy::default();
    copy.fill(picked);
    fill_secondaries(&mut copy, style, pool, spec.language, picked, rng)?;
    next.primary_slot_id = picked.id.clone();
    next.copy = copy;
    if let Some(zone) = other_zone(style, &spec.zone_id, rng) {
        next.zone_id = zone;
    }
    Ok(next)
}

fn first_on_angle<'a>(slots: &[&'a CopySlot], angle: Option<Angle>) -> Option<&'a CopySlot> {
    angle
        .and_then(|a| slots.iter().find(|s| s.angle == Some(a)))
        .or_else(|| slots.first())
        .copied()
}

/// Re-resolve every filled slot in `language`, keeping angles where possible.
/// Slot types the language has no copy for keep their old text.
pub fn switch_language(catalog: &Catalog, spec: &Spec, pool: &CopyPool, language: Language) -> EngineResult<Spec> {
    let style = catalog.get_style(&spec.style_id)?;
    let mut next = derive(spec);
    next.language = language;
    if language == spec.language {
        return Ok(next);
    }

    let primary_type = style.definition.primary_slot_type();
    let old_primary = pool.slot(&spec.primary_slot_id);
    let primary = first_on_angle(
        &pool.filter(language, primary_type),
        old_primary.and_then(|s| s.angle),
    );
    let match_angle = primary.or(old_primary).and_then(|s| s.angle);

    let mut copy = SpecCopy::default();
    for slot_type in &style.definition.slot_types {
        let picked = if *slot_type == primary_type {
            primary
        } else {
            first_on_angle(&pool.filter(language, *slot_type), match_angle)
        };
        match picked {
            Some(slot) => copy.fill(slot),
            None => {
                if let (Some(text), Some(id)) = (spec.copy.texts.get(slot_type), spec.copy.slot_ids.get(slot_type)) {
                    copy.texts.insert(*slot_type, text.clone());
                    copy.slot_ids.insert(*slot_type, id.clone());
                    if *slot_type == SlotType::Quote {
                        copy.attribution = spec.copy.attribution.clone();
                    }
                }
            }
        }
    }
    if let Some(slot) = primary {
        next.primary_slot_id = slot.id.clone();
    }
    next.copy = copy;
    Ok(next)
}

/// Only the format and canvas change.
pub fn switch_format(spec: &Spec, format: Format) -> Spec {
    let mut next = derive(spec);
    next.format = format;
    next.canvas = format.dims();
    next
}
