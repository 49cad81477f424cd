//! Selection Engine - which style, zone and copy each variant gets
//!
//! Zones rotate by running spec index. Primary copy avoids repeats within a
//! batch and follows the angle rotation; secondary copy follows the primary's
//! angle so every creative reads in one voice.

use std::collections::HashSet;

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Style};
use crate::error::{EngineError, EngineResult};
use crate::model::{
    new_id, Angle, CopyPool, CopySlot, FamilyId, Format, ImageId, Language, SlotId, SlotType, Spec,
    SpecCopy, StyleId,
};

/// Which families a generation request covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "families")]
pub enum FamilySelection {
    Explicit(Vec<FamilyId>),
    All,
    /// Auto mode: the advisor's pick. Honors the style exclusion set.
    Recommended(FamilyId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleMode {
    #[default]
    OnePerFamily,
    AllStyles,
}

#[derive(Debug, Clone)]
pub struct SelectionOptions {
    pub families: FamilySelection,
    pub language: Language,
    pub format: Format,
    pub style_mode: StyleMode,
    /// Styles to avoid in auto mode, e.g. ones already used for sibling images.
    pub exclude_styles: HashSet<StyleId>,
    pub angle_rotation: Vec<Angle>,
}

impl SelectionOptions {
    pub fn new(families: FamilySelection, language: Language, format: Format) -> Self {
        Self {
            families,
            language,
            format,
            style_mode: StyleMode::OnePerFamily,
            exclude_styles: HashSet::new(),
            angle_rotation: Angle::ROTATION.to_vec(),
        }
    }
}

/// Pick one slot by tier: unused on target angle, any unused, used on target
/// angle, then anything at random. Tiers before the last take pool order.
pub(crate) fn pick_slot<'a, R: Rng + ?Sized>(
    candidates: &[&'a CopySlot],
    target: Option<Angle>,
    used: &HashSet<SlotId>,
    rng: &mut R,
) -> Option<&'a CopySlot> {
    let on_target = |s: &&&CopySlot| target.is_some() && s.angle == target;
    let unused = |s: &&&CopySlot| !used.contains(&s.id);

    candidates
        .iter()
        .find(|s| unused(s) && on_target(s))
        .or_else(|| candidates.iter().find(|s| unused(s)))
        .or_else(|| candidates.iter().find(|s| on_target(s)))
        .or_else(|| candidates.choose(rng))
        .copied()
}

/// Slots of `slot_type` in `language`, or of that type in any language if the
/// language has none. Fails only when the pool has no slot of the type at all.
pub(crate) fn candidates_for(
    pool: &CopyPool,
    language: Language,
    slot_type: SlotType,
) -> EngineResult<Vec<&CopySlot>> {
    let local = pool.filter(language, slot_type);
    if !local.is_empty() {
        return Ok(local);
    }
    let any: Vec<&CopySlot> = pool.slots.iter().filter(|s| s.slot_type == slot_type).collect();
    if any.is_empty() {
        return Err(EngineError::PreconditionFailed(format!(
            "copy pool for image {} has no {} slots",
            pool.image_id,
            slot_type.as_str()
        )));
    }
    tracing::debug!(
        language = %language,
        slot_type = slot_type.as_str(),
        "no copy in requested language, falling back to any language"
    );
    Ok(any)
}

fn resolve_families(catalog: &Catalog, selection: &FamilySelection) -> EngineResult<Vec<FamilyId>> {
    let ids = match selection {
        FamilySelection::Explicit(ids) if !ids.is_empty() => ids.clone(),
        FamilySelection::Explicit(_) | FamilySelection::All => {
            catalog.families().iter().map(|f| f.id.clone()).collect()
        }
        FamilySelection::Recommended(id) => vec![id.clone()],
    };
    for id in &ids {
        catalog.get_family(id)?;
    }
    Ok(ids)
}

fn candidate_styles<'c>(
    catalog: &'c Catalog,
    family_id: &str,
    options: &SelectionOptions,
) -> EngineResult<Vec<&'c Style>> {
    let all = catalog.styles_for_family(family_id)?;
    if all.is_empty() {
        return Err(EngineError::Configuration(format!(
            "no styles registered for family '{}'",
            family_id
        )));
    }
    if !matches!(options.families, FamilySelection::Recommended(_)) || options.exclude_styles.is_empty() {
        return Ok(all);
    }
    let kept: Vec<&Style> = all
        .iter()
        .copied()
        .filter(|s| !options.exclude_styles.contains(s.id()))
        .collect();
    Ok(if kept.is_empty() { all } else { kept })
}

/// Build every spec a generation request asks for, in family order.
#[tracing::instrument(skip(catalog, pool, options, rng), fields(language = %options.language, format = %options.format))]
pub fn build_specs<R: Rng + ?Sized>(
    catalog: &Catalog,
    image_id: &ImageId,
    pool: &CopyPool,
    options: &SelectionOptions,
    rng: &mut R,
) -> EngineResult<Vec<Spec>> {
    let families = resolve_families(catalog, &options.families)?;
    let mut used: HashSet<SlotId> = HashSet::new();
    let mut specs = vec![];

    for family_id in &families {
        let family = catalog.get_family(family_id)?;
        let candidates = candidate_styles(catalog, family_id, options)?;
        let styles: Vec<&Style> = match options.style_mode {
            StyleMode::AllStyles => candidates,
            StyleMode::OnePerFamily => candidates.choose(rng).copied().into_iter().collect(),
        };

        for style in styles {
            let index = specs.len();
            let def = &style.definition;
            let zone_id = def.supported_zones[index % def.supported_zones.len()].clone();

            let primary_type = def.primary_slot_type();
            let target = family.forced_angle.or_else(|| match primary_type {
                SlotType::Headline if !options.angle_rotation.is_empty() => {
                    Some(options.angle_rotation[index % options.angle_rotation.len()])
                }
                _ => None,
            });

            let mut primary_pool = candidates_for(pool, options.language, primary_type)?;
            if let Some(forced) = family.forced_angle {
                if primary_pool.iter().any(|s| s.angle == Some(forced)) {
                    primary_pool.retain(|s| s.angle == Some(forced));
                }
            }
            let primary = pick_slot(&primary_pool, target, &used, rng).ok_or_else(|| {
                EngineError::PreconditionFailed(format!("no {} copy to pick", primary_type.as_str()))
            })?;
            used.insert(primary.id.clone());

            let mut copy = SpecCopy::default();
            copy.fill(primary);
            for secondary_type in def.secondary_slot_types() {
                let secondary_pool = candidates_for(pool, options.language, *secondary_type)?;
                if let Some(slot) = pick_slot(&secondary_pool, primary.angle, &used, rng) {
                    copy.fill(slot);
                }
            }

            tracing::debug!(
                family = %family_id,
                style = style.id(),
                zone = %zone_id,
                slot = %primary.id,
                "spec selected"
            );

            specs.push(Spec {
                id: new_id("sp"),
                image_id: image_id.clone(),
                format: options.format,
                language: options.language,
                family_id: family_id.clone(),
                style_id: def.id.clone(),
                zone_id,
                primary_slot_id: primary.id.clone(),
                copy,
                theme: def.default_theme.clone(),
                canvas: options.format.dims(),
                created_at: Utc::now(),
            });
        }
    }

    Ok(specs)
}
