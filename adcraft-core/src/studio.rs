//! Studio - the engine's service surface
//!
//! Ties the catalog, selection, mutation and render pipeline to the outside
//! collaborators. A transport (the CLI today) calls these operations and
//! nothing else.
//!
//! Concurrency model:
//! - AI lookups are memoized per image under a per-image lock, so two first
//!   requests for the same image never both reach the analyzer.
//! - A mutation holds a per-result lock for its whole unit of work and the
//!   store's `mark_superseded` is a compare-and-set, so a lost race surfaces
//!   as `Conflict` rather than two active successors.
//! - Nothing is rolled back: a failed mutation may leave its new spec or
//!   result persisted while the old result stays active.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::collab::{Bucket, CopyGenerator, FamilyAdvisor, ObjectStorage, Store, ZoneAnalyzer};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::layout::sniff_image;
use crate::model::{
    new_id, Angle, CopyPool, FamilyId, Format, ImageAsset, ImageId, Language, RenderResult,
    Replacement, ResultId, SafeZones, SlotId, Spec, StyleId,
};
use crate::mutation::{headline_swap, style_swap, switch_format, switch_language};
use crate::render::RenderPipeline;
use crate::selection::{build_specs, FamilySelection, SelectionOptions, StyleMode};
use crate::stub::{FirstFamilyAdvisor, StockCopyGenerator, StockZoneAnalyzer};
use crate::text::load_font_database;
use crate::validation::Validator;

/// Everything the studio talks to outside its own process.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn ObjectStorage>,
    pub store: Arc<dyn Store>,
    pub analyzer: Arc<dyn ZoneAnalyzer>,
    pub copywriter: Arc<dyn CopyGenerator>,
    pub advisor: Arc<dyn FamilyAdvisor>,
}

impl Collaborators {
    /// Stock AI stand-ins over the given storage and store.
    pub fn stock(storage: Arc<dyn ObjectStorage>, store: Arc<dyn Store>) -> Self {
        Self {
            storage,
            store,
            analyzer: Arc::new(StockZoneAnalyzer),
            copywriter: Arc::new(StockCopyGenerator),
            advisor: Arc::new(FirstFamilyAdvisor),
        }
    }
}

/// A generation request. No families and no `auto` means every family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub families: Vec<FamilyId>,
    /// Let the advisor pick one family per image.
    #[serde(default)]
    pub auto: bool,
    pub language: Language,
    pub format: Format,
    #[serde(default)]
    pub style_mode: StyleMode,
}

impl GenerateRequest {
    pub fn new(language: Language, format: Format) -> Self {
        Self {
            families: vec![],
            auto: false,
            language,
            format,
            style_mode: StyleMode::OnePerFamily,
        }
    }

    pub fn families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<FamilyId>,
    {
        self.families = families.into_iter().map(Into::into).collect();
        self
    }

    pub fn auto(mut self) -> Self {
        self.auto = true;
        self
    }

    pub fn all_styles(mut self) -> Self {
        self.style_mode = StyleMode::AllStyles;
        self
    }
}

fn poisoned(what: &str) -> EngineError {
    EngineError::InvalidState(format!("{} lock poisoned", what))
}

/// One mutex per key, created on first use and removed once no caller holds
/// or waits on it.
struct KeyedLocks {
    name: &'static str,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn new(name: &'static str) -> Self {
        Self { name, locks: Mutex::default() }
    }

    /// Run `f` while holding the lock for `key`.
    fn with<T>(&self, key: &str, f: impl FnOnce() -> EngineResult<T>) -> EngineResult<T> {
        let handle = {
            let mut map = self.locks.lock().map_err(|_| poisoned(self.name))?;
            map.entry(key.to_string()).or_default().clone()
        };
        let outcome = match handle.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(poisoned(self.name)),
        };
        self.release(key, handle);
        outcome
    }

    /// Clones are only taken under the map lock, so a count of one there
    /// means the map holds the last reference.
    fn release(&self, key: &str, handle: Arc<Mutex<()>>) {
        let Ok(mut map) = self.locks.lock() else {
            return;
        };
        drop(handle);
        if map.get(key).is_some_and(|h| Arc::strong_count(h) == 1) {
            map.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|map| map.len()).unwrap_or_default()
    }
}

/// What a mutation starts from.
struct MutationInput {
    result: RenderResult,
    spec: Spec,
    zones: SafeZones,
    pool: CopyPool,
}

enum Resolution {
    Ready(Box<MutationInput>),
    /// Result, spec or cached AI data is missing, or the result already has
    /// a successor.
    Unusable(EngineError),
}

pub struct Studio {
    catalog: Arc<Catalog>,
    pipeline: RenderPipeline,
    storage: Arc<dyn ObjectStorage>,
    store: Arc<dyn Store>,
    analyzer: Arc<dyn ZoneAnalyzer>,
    copywriter: Arc<dyn CopyGenerator>,
    advisor: Arc<dyn FamilyAdvisor>,
    validator: Validator,
    angle_rotation: Vec<Angle>,
    rng: Mutex<StdRng>,
    image_locks: KeyedLocks,
    result_locks: KeyedLocks,
}

impl Studio {
    pub fn new(config: &EngineConfig, catalog: Arc<Catalog>, collab: Collaborators) -> Self {
        let fonts = load_font_database(&config.font_dirs);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        tracing::debug!(
            fonts = fonts.len(),
            seeded = config.seed.is_some(),
            policy = ?config.zone_policy,
            "studio ready"
        );
        Self {
            pipeline: RenderPipeline::new(catalog.clone(), fonts, collab.storage.clone()),
            catalog,
            storage: collab.storage,
            store: collab.store,
            analyzer: collab.analyzer,
            copywriter: collab.copywriter,
            advisor: collab.advisor,
            validator: Validator::new(config.zone_policy),
            angle_rotation: config.angle_rotation.clone(),
            rng: Mutex::new(rng),
            image_locks: KeyedLocks::new("image"),
            result_locks: KeyedLocks::new("result"),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> EngineResult<T>) -> EngineResult<T> {
        let mut rng = self.rng.lock().map_err(|_| poisoned("rng"))?;
        f(&mut *rng)
    }

    // --- Images ---

    /// Store an original and record its asset. PNG, JPEG and WebP only.
    #[tracing::instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub fn upload_image(&self, filename: &str, bytes: &[u8]) -> EngineResult<ImageAsset> {
        let info = sniff_image(bytes)?;
        let id = new_id("img");
        let location = self
            .storage
            .save(Bucket::Originals, &format!("{}.{}", id, info.extension), bytes)?;
        let image = ImageAsset {
            id,
            filename: filename.to_string(),
            location,
            width: info.width,
            height: info.height,
            created_at: Utc::now(),
        };
        self.store.insert_image(image.clone())?;
        tracing::info!(image = %image.id, width = image.width, height = image.height, "image uploaded");
        Ok(image)
    }

    fn source(&self, image_id: &str) -> EngineResult<(ImageAsset, Vec<u8>)> {
        let image = self
            .store
            .get_image(image_id)?
            .ok_or_else(|| EngineError::not_found("image", image_id))?;
        let bytes = self.storage.read(Bucket::Originals, &image.location)?;
        Ok((image, bytes))
    }

    /// Safe zones and copy pool for an image, asking the collaborators at
    /// most once per image.
    fn ai_data(&self, image: &ImageAsset, bytes: &[u8]) -> EngineResult<(SafeZones, CopyPool)> {
        self.image_locks.with(&image.id, || {
            let zones = match self.store.get_safe_zones(&image.id)? {
                Some(zones) => zones,
                None => {
                    let zones = self.validator.enforce(self.analyzer.analyze(image, bytes)?)?;
                    tracing::info!(image = %image.id, zones = zones.zones.len(), "safe zones analyzed");
                    self.store.put_safe_zones(zones.clone())?;
                    zones
                }
            };
            let pool = match self.store.get_copy_pool(&image.id)? {
                Some(pool) => pool,
                None => {
                    let pool = self.copywriter.generate(image, bytes)?;
                    tracing::info!(image = %image.id, slots = pool.slots.len(), "copy pool generated");
                    self.store.put_copy_pool(pool.clone())?;
                    pool
                }
            };
            Ok((zones, pool))
        })
    }

    // --- Generation ---

    #[tracing::instrument(skip(self, request), fields(language = %request.language, format = %request.format))]
    pub fn generate(&self, image_id: &str, request: &GenerateRequest) -> EngineResult<Vec<RenderResult>> {
        self.generate_excluding(image_id, request, &HashSet::new())
    }

    /// Generate for several images in order. In auto mode each image avoids
    /// the styles already used for earlier images where the family allows it.
    #[tracing::instrument(skip(self, image_ids, request), fields(images = image_ids.len()))]
    pub fn generate_batch(
        &self,
        image_ids: &[ImageId],
        request: &GenerateRequest,
    ) -> EngineResult<Vec<RenderResult>> {
        if image_ids.is_empty() {
            return Err(EngineError::Validation("no image ids given".into()));
        }
        let mut used_styles: HashSet<StyleId> = HashSet::new();
        let mut results = vec![];
        for image_id in image_ids {
            let batch = self.generate_excluding(image_id, request, &used_styles)?;
            if request.auto {
                used_styles.extend(batch.iter().map(|r| r.style_id.clone()));
            }
            results.extend(batch);
        }
        Ok(results)
    }

    fn generate_excluding(
        &self,
        image_id: &str,
        request: &GenerateRequest,
        exclude_styles: &HashSet<StyleId>,
    ) -> EngineResult<Vec<RenderResult>> {
        if image_id.trim().is_empty() {
            return Err(EngineError::Validation("image id is empty".into()));
        }
        let (image, source) = self.source(image_id)?;
        let (zones, pool) = self.ai_data(&image, &source)?;

        let families = if request.auto {
            let family = self.advisor.recommend(&image, self.catalog.families())?;
            tracing::info!(image = %image.id, family = %family, "family recommended");
            FamilySelection::Recommended(family)
        } else if request.families.is_empty() {
            FamilySelection::All
        } else {
            FamilySelection::Explicit(request.families.clone())
        };
        let mut options = SelectionOptions::new(families, request.language, request.format);
        options.style_mode = request.style_mode;
        options.exclude_styles = exclude_styles.clone();
        options.angle_rotation = self.angle_rotation.clone();

        let specs = self.with_rng(|rng| build_specs(&self.catalog, &image.id, &pool, &options, rng))?;
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            results.push(self.persist(spec, &zones, &source, None)?);
        }
        tracing::info!(image = %image.id, results = results.len(), "generation complete");
        Ok(results)
    }

    /// Store the spec, render it and record the result.
    fn persist(
        &self,
        spec: Spec,
        zones: &SafeZones,
        source: &[u8],
        supersedes: Option<ResultId>,
    ) -> EngineResult<RenderResult> {
        self.store.insert_spec(spec.clone())?;
        let output = self.pipeline.render(&spec, zones, source)?;
        let result = RenderResult {
            id: output.result_id,
            spec_id: spec.id,
            image_id: spec.image_id,
            family_id: spec.family_id,
            style_id: spec.style_id,
            primary_slot_id: spec.primary_slot_id,
            format: spec.format,
            location: output.location,
            render_hash: output.render_hash,
            approved: false,
            superseded_by: None,
            supersedes,
            created_at: Utc::now(),
        };
        self.store.insert_result(result.clone())?;
        Ok(result)
    }

    // --- Mutations ---

    fn resolve(&self, result_id: &str) -> EngineResult<Resolution> {
        let Some(result) = self.store.get_result(result_id)? else {
            return Ok(Resolution::Unusable(EngineError::not_found("result", result_id)));
        };
        if let Some(successor) = &result.superseded_by {
            return Ok(Resolution::Unusable(EngineError::InvalidState(format!(
                "result {} was superseded by {}",
                result.id, successor
            ))));
        }
        let Some(spec) = self.store.get_spec(&result.spec_id)? else {
            return Ok(Resolution::Unusable(EngineError::not_found("spec", &result.spec_id)));
        };
        let zones = self.store.get_safe_zones(&spec.image_id)?;
        let pool = self.store.get_copy_pool(&spec.image_id)?;
        let (Some(zones), Some(pool)) = (zones, pool) else {
            return Ok(Resolution::Unusable(EngineError::PreconditionFailed(format!(
                "no cached safe zones and copy for image {}",
                spec.image_id
            ))));
        };
        Ok(Resolution::Ready(Box::new(MutationInput { result, spec, zones, pool })))
    }

    /// Derive a new spec, render it and supersede the old result.
    fn apply(
        &self,
        input: MutationInput,
        change: impl FnOnce(&MutationInput, &mut StdRng) -> EngineResult<Spec>,
    ) -> EngineResult<Replacement> {
        let next = self.with_rng(|rng| change(&input, rng))?;
        let (_, source) = self.source(&input.spec.image_id)?;
        let result = self.persist(next, &input.zones, &source, Some(input.result.id.clone()))?;
        self.store.mark_superseded(&input.result.id, &result.id)?;
        tracing::info!(old = %input.result.id, new = %result.id, "result superseded");
        Ok(Replacement { result, superseded_id: input.result.id })
    }

    fn mutate(
        &self,
        result_id: &str,
        change: impl FnOnce(&MutationInput, &mut StdRng) -> EngineResult<Spec>,
    ) -> EngineResult<Replacement> {
        self.result_locks.with(result_id, || match self.resolve(result_id)? {
            Resolution::Ready(input) => self.apply(*input, change),
            Resolution::Unusable(err) => Err(err),
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn regenerate_style(&self, result_id: &str) -> EngineResult<Replacement> {
        self.mutate(result_id, |input, rng| style_swap(&self.catalog, &input.spec, &input.pool, rng))
    }

    #[tracing::instrument(skip(self))]
    pub fn regenerate_headline(&self, result_id: &str) -> EngineResult<Replacement> {
        self.mutate(result_id, |input, rng| {
            let used: HashSet<SlotId> = self
                .ancestry(&input.result)?
                .into_iter()
                .map(|r| r.primary_slot_id)
                .collect();
            headline_swap(&self.catalog, &input.spec, &input.pool, &used, rng)
        })
    }

    /// Apply a language and/or format to each result. Results that are unknown,
    /// already superseded, or lack their spec or cached AI data are skipped, so
    /// the returned list may be shorter than `result_ids`.
    #[tracing::instrument(skip(self, result_ids), fields(results = result_ids.len()))]
    pub fn switch(
        &self,
        result_ids: &[ResultId],
        language: Option<Language>,
        format: Option<Format>,
    ) -> EngineResult<Vec<Replacement>> {
        if result_ids.is_empty() {
            return Err(EngineError::Validation("no result ids given".into()));
        }
        if language.is_none() && format.is_none() {
            return Err(EngineError::Validation("switch needs a language or a format".into()));
        }

        let mut seen = HashSet::new();
        let mut replacements = vec![];
        for result_id in result_ids.iter().filter(|id| seen.insert(id.as_str())) {
            let replacement = self.result_locks.with(result_id, || {
                let input = match self.resolve(result_id)? {
                    Resolution::Ready(input) => input,
                    Resolution::Unusable(reason) => {
                        tracing::warn!(result = %result_id, %reason, "skipping result");
                        return Ok(None);
                    }
                };
                let replacement = self.apply(*input, |input, _rng| {
                    let mut spec = input.spec.clone();
                    if let Some(language) = language {
                        spec = switch_language(&self.catalog, &spec, &input.pool, language)?;
                    }
                    if let Some(format) = format {
                        spec = switch_format(&spec, format);
                    }
                    Ok(spec)
                })?;
                Ok(Some(replacement))
            })?;
            replacements.extend(replacement);
        }
        Ok(replacements)
    }

    // --- Results ---

    pub fn set_approval(&self, result_id: &str, approved: bool) -> EngineResult<RenderResult> {
        let result = self.store.set_approval(result_id, approved)?;
        tracing::info!(result = %result_id, approved, "approval set");
        Ok(result)
    }

    pub fn active_results(&self, image_id: &str) -> EngineResult<Vec<RenderResult>> {
        if self.store.get_image(image_id)?.is_none() {
            return Err(EngineError::not_found("image", image_id));
        }
        self.store.list_active_for_image(image_id)
    }

    /// `result` and everything it replaced, newest first.
    fn ancestry(&self, result: &RenderResult) -> EngineResult<Vec<RenderResult>> {
        let mut seen = HashSet::from([result.id.clone()]);
        let mut chain = vec![result.clone()];
        let mut cursor = result.supersedes.clone();
        while let Some(id) = cursor.filter(|id| seen.insert(id.clone())) {
            let Some(previous) = self.store.get_result(&id)? else {
                break;
            };
            cursor = previous.supersedes.clone();
            chain.push(previous);
        }
        Ok(chain)
    }

    /// The whole supersession chain `result_id` belongs to, oldest first.
    pub fn lineage(&self, result_id: &str) -> EngineResult<Vec<RenderResult>> {
        let result = self
            .store
            .get_result(result_id)?
            .ok_or_else(|| EngineError::not_found("result", result_id))?;
        let mut chain = self.ancestry(&result)?;
        chain.reverse();

        let mut seen: HashSet<ResultId> = chain.iter().map(|r| r.id.clone()).collect();
        let mut cursor = result.superseded_by.clone();
        while let Some(id) = cursor.filter(|id| seen.insert(id.clone())) {
            let Some(next) = self.store.get_result(&id)? else {
                break;
            };
            cursor = next.superseded_by.clone();
            chain.push(next);
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FamilyDefinition;
    use crate::model::{NormRect, Zone};
    use crate::storage::MemoryStorage;
    use crate::store::MemoryStore;
    use crate::styles::{builtin_catalog, PROMO, TESTIMONIAL};
    use crate::stub::stock_safe_zones;
    use crate::validation::ZonePolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(16, 20, image::Rgb([180, 150, 120]));
        let mut out = std::io::Cursor::new(vec![]);
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn seeded() -> EngineConfig {
        EngineConfig { seed: Some(11), ..EngineConfig::default() }
    }

    fn studio_with(config: &EngineConfig, collab: Collaborators) -> Studio {
        Studio::new(config, Arc::new(builtin_catalog().unwrap()), collab)
    }

    fn studio() -> (Studio, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let collab = Collaborators::stock(Arc::new(MemoryStorage::new()), store.clone());
        (studio_with(&seeded(), collab), store)
    }

    #[derive(Default)]
    struct CountingAnalyzer {
        calls: AtomicUsize,
    }

    impl ZoneAnalyzer for CountingAnalyzer {
        fn analyze(&self, image: &ImageAsset, _bytes: &[u8]) -> EngineResult<SafeZones> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(stock_safe_zones(&image.id))
        }
    }

    struct OutOfBoundsAnalyzer;

    impl ZoneAnalyzer for OutOfBoundsAnalyzer {
        fn analyze(&self, image: &ImageAsset, _bytes: &[u8]) -> EngineResult<SafeZones> {
            let mut zones = stock_safe_zones(&image.id);
            zones.zones.push(Zone { id: "D".into(), rect: NormRect::new(0.5, 0.9, 0.7, 0.3) });
            Ok(zones)
        }
    }

    struct FixedAdvisor(&'static str);

    impl FamilyAdvisor for FixedAdvisor {
        fn recommend(&self, _image: &ImageAsset, _families: &[FamilyDefinition]) -> EngineResult<FamilyId> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_upload_records_dimensions_and_original() {
        let (studio, _) = studio();
        let image = studio.upload_image("bag.png", &tiny_png()).unwrap();
        assert_eq!((image.width, image.height), (16, 20));
        assert_eq!(image.location, format!("/files/originals/{}.png", image.id));
        assert!(matches!(
            studio.upload_image("notes.txt", b"hello"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_ai_data_is_fetched_once_per_image() {
        let analyzer = Arc::new(CountingAnalyzer::default());
        let mut collab = Collaborators::stock(Arc::new(MemoryStorage::new()), Arc::new(MemoryStore::new()));
        collab.analyzer = analyzer.clone();
        let studio = studio_with(&seeded(), collab);

        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Square).families([PROMO]);
        studio.generate(&image.id, &request).unwrap();
        studio.generate(&image.id, &request).unwrap();
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_generate_rejects_empty_and_unknown_images() {
        let (studio, _) = studio();
        let request = GenerateRequest::new(Language::En, Format::Portrait);
        assert!(matches!(studio.generate("  ", &request), Err(EngineError::Validation(_))));
        assert!(matches!(
            studio.generate("img_missing", &request),
            Err(EngineError::NotFound { entity: "image", .. })
        ));
    }

    #[test]
    fn test_zone_policy_decides_out_of_bounds_zones() {
        let mut collab = Collaborators::stock(Arc::new(MemoryStorage::new()), Arc::new(MemoryStore::new()));
        collab.analyzer = Arc::new(OutOfBoundsAnalyzer);
        let config = EngineConfig { zone_policy: ZonePolicy::Reject, ..seeded() };
        let strict = studio_with(&config, collab.clone());
        let image = strict.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        assert!(matches!(strict.generate(&image.id, &request), Err(EngineError::Validation(_))));

        let lenient = studio_with(&seeded(), collab);
        let image = lenient.upload_image("b.png", &tiny_png()).unwrap();
        assert_eq!(lenient.generate(&image.id, &request).unwrap().len(), 1);
    }

    #[test]
    fn test_auto_batch_spreads_styles_across_images() {
        let mut collab = Collaborators::stock(Arc::new(MemoryStorage::new()), Arc::new(MemoryStore::new()));
        collab.advisor = Arc::new(FixedAdvisor(TESTIMONIAL));
        let studio = studio_with(&seeded(), collab);
        let ids: Vec<ImageId> = (0..3)
            .map(|i| studio.upload_image(&format!("{}.png", i), &tiny_png()).unwrap().id)
            .collect();

        let request = GenerateRequest::new(Language::En, Format::Square).auto();
        let results = studio.generate_batch(&ids, &request).unwrap();
        assert_eq!(results.len(), 3);
        let styles: HashSet<_> = results.iter().map(|r| r.style_id.as_str()).collect();
        assert_eq!(styles.len(), 3);
        assert!(results.iter().all(|r| r.family_id == TESTIMONIAL));
    }

    #[test]
    fn test_superseded_results_cannot_be_mutated_again() {
        let (studio, _) = studio();
        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let first = studio.generate(&image.id, &request).unwrap().remove(0);

        let replacement = studio.regenerate_headline(&first.id).unwrap();
        assert_eq!(replacement.superseded_id, first.id);
        assert_eq!(replacement.result.supersedes.as_deref(), Some(first.id.as_str()));
        assert!(matches!(
            studio.regenerate_style(&first.id),
            Err(EngineError::InvalidState(_))
        ));
        let skipped = studio.switch(&[first.id.clone()], Some(Language::Fr), None).unwrap();
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_keyed_locks_are_released_after_use() {
        let (studio, _) = studio();
        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let mut head = studio.generate(&image.id, &request).unwrap().remove(0).id;
        for _ in 0..3 {
            head = studio.regenerate_headline(&head).unwrap().result.id;
        }
        studio.switch(&[head, "rr_unknown".into()], None, Some(Format::Story)).unwrap();
        assert!(studio.regenerate_style("rr_unknown").is_err());

        assert_eq!(studio.image_locks.len(), 0);
        assert_eq!(studio.result_locks.len(), 0);
    }

    #[test]
    fn test_keyed_locks_survive_while_contended() {
        let locks = KeyedLocks::new("test");
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    locks
                        .with("k", || {
                            std::thread::yield_now();
                            Ok(())
                        })
                        .unwrap()
                });
            }
        });
        let inner = locks.with("k", || Ok(locks.locks.lock().unwrap().len())).unwrap();
        assert_eq!(inner, 1);
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_batch_switch_skips_superseded_ids_and_continues() {
        let (studio, store) = studio();
        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let a = studio.generate(&image.id, &request).unwrap().remove(0);
        let b = studio.generate(&image.id, &request).unwrap().remove(0);
        let a_next = studio.regenerate_style(&a.id).unwrap().result;

        let replacements = studio.switch(&[b.id.clone(), a.id.clone()], Some(Language::De), None).unwrap();
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].superseded_id, b.id);

        let a_now = store.get_result(&a.id).unwrap().unwrap();
        assert_eq!(a_now.superseded_by.as_deref(), Some(a_next.id.as_str()));
        let b_now = store.get_result(&b.id).unwrap().unwrap();
        assert_eq!(b_now.superseded_by.as_deref(), Some(replacements[0].result.id.as_str()));
    }

    #[test]
    fn test_mutation_without_cached_ai_data_is_a_precondition_failure() {
        let (studio, store) = studio();
        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let result = studio.generate(&image.id, &request).unwrap().remove(0);

        let mut snapshot = store.snapshot().unwrap();
        snapshot.safe_zones.clear();
        snapshot.copy_pools.clear();
        let bare = Arc::new(MemoryStore::restore(snapshot));
        let storage = studio.storage.clone();
        let studio = studio_with(&seeded(), Collaborators::stock(storage, bare));

        assert!(matches!(
            studio.regenerate_headline(&result.id),
            Err(EngineError::PreconditionFailed(_))
        ));
        assert!(studio.switch(&[result.id.clone()], None, Some(Format::Story)).unwrap().is_empty());
    }

    #[test]
    fn test_switch_validates_request_and_skips_missing_results() {
        let (studio, _) = studio();
        assert!(matches!(
            studio.switch(&[], Some(Language::De), None),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            studio.switch(&["rr_1".to_string()], None, None),
            Err(EngineError::Validation(_))
        ));

        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let result = studio.generate(&image.id, &request).unwrap().remove(0);
        let ids = vec!["rr_gone".to_string(), result.id.clone(), result.id.clone()];
        let switched = studio.switch(&ids, Some(Language::De), Some(Format::Story)).unwrap();
        assert_eq!(switched.len(), 1);
        assert_eq!(switched[0].superseded_id, result.id);
        assert_eq!(switched[0].result.format, Format::Story);
    }

    #[test]
    fn test_lineage_lists_chain_oldest_first_from_any_member() {
        let (studio, _) = studio();
        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let first = studio.generate(&image.id, &request).unwrap().remove(0);
        let second = studio.regenerate_headline(&first.id).unwrap().result;
        let third = studio.switch(&[second.id.clone()], None, Some(Format::Square)).unwrap().remove(0).result;

        let expected = vec![first.id.clone(), second.id.clone(), third.id.clone()];
        for member in &expected {
            let ids: Vec<_> = studio.lineage(member).unwrap().into_iter().map(|r| r.id).collect();
            assert_eq!(&ids, &expected);
        }
        let active = studio.active_results(&image.id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, third.id);
    }

    #[test]
    fn test_approval_round_trip() {
        let (studio, _) = studio();
        let image = studio.upload_image("a.png", &tiny_png()).unwrap();
        let request = GenerateRequest::new(Language::En, Format::Portrait).families([PROMO]);
        let result = studio.generate(&image.id, &request).unwrap().remove(0);
        assert!(studio.set_approval(&result.id, true).unwrap().approved);
        assert!(matches!(
            studio.set_approval("rr_missing", true),
            Err(EngineError::NotFound { entity: "result", .. })
        ));
    }
}
