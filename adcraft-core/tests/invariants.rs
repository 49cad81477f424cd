//! Contract Invariant Tests
//!
//! These tests drive the studio end to end through its public surface.

use std::collections::HashSet;
use std::sync::Arc;

use adcraft_core::{
    builtin_catalog, Bucket, Collaborators, EngineConfig, EngineError, Format, FsStorage,
    GenerateRequest, Language, MemoryStore, ObjectStorage, RenderResult, Store, Studio,
};

fn photo(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 140])
    });
    let mut out = std::io::Cursor::new(vec![]);
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

struct Harness {
    studio: Studio,
    store: Arc<MemoryStore>,
    storage: Arc<FsStorage>,
    _dir: tempfile::TempDir,
}

fn create_harness(seed: u64) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(FsStorage::new(dir.path()));
    let config = EngineConfig {
        storage_root: dir.path().to_path_buf(),
        seed: Some(seed),
        ..EngineConfig::default()
    };
    let studio = Studio::new(
        &config,
        Arc::new(builtin_catalog().unwrap()),
        Collaborators::stock(storage.clone(), store.clone()),
    );
    Harness { studio, store, storage, _dir: dir }
}

fn promo_result(h: &Harness) -> RenderResult {
    let image = h.studio.upload_image("product.png", &photo(80, 100)).unwrap();
    let request = GenerateRequest::new(Language::En, Format::Portrait).families(["promo"]);
    h.studio.generate(&image.id, &request).unwrap().remove(0)
}

#[test]
fn invariant_end_to_end_generation() {
    let h = create_harness(1);
    let image = h.studio.upload_image("product.png", &photo(800, 1000)).unwrap();
    assert_eq!((image.width, image.height), (800, 1000));

    let request = GenerateRequest::new(Language::En, Format::Portrait).families(["promo", "luxury"]);
    let results = h.studio.generate(&image.id, &request).unwrap();
    assert_eq!(results.len(), 2);

    let families: HashSet<_> = results.iter().map(|r| r.family_id.as_str()).collect();
    assert_eq!(families, HashSet::from(["promo", "luxury"]));

    for result in &results {
        let spec = h.store.get_spec(&result.spec_id).unwrap().unwrap();
        assert!(["A", "B", "C"].contains(&spec.zone_id.as_str()));
        assert_eq!((spec.canvas.width, spec.canvas.height), (1080, 1350));

        let png = h.storage.read(Bucket::Generated, &result.location).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1080, 1350));
        assert!(result.is_active());
    }
}

#[test]
fn invariant_mutation_chain_keeps_one_active() {
    let h = create_harness(2);
    let first = promo_result(&h);

    let mut head = first.id.clone();
    head = h.studio.regenerate_style(&head).unwrap().result.id;
    head = h.studio.regenerate_headline(&head).unwrap().result.id;
    head = h.studio.switch(&[head], Some(Language::Fr), None).unwrap().remove(0).result.id;
    head = h.studio.switch(&[head], None, Some(Format::Story)).unwrap().remove(0).result.id;

    let chain = h.studio.lineage(&first.id).unwrap();
    assert_eq!(chain.len(), 5);
    assert_eq!(chain.iter().filter(|r| r.is_active()).count(), 1);
    assert_eq!(chain.last().unwrap().id, head);

    let active = h.studio.active_results(&first.image_id).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, head);
}

#[test]
fn invariant_headline_regeneration_never_repeats() {
    let h = create_harness(3);
    let first = promo_result(&h);
    let second = h.studio.regenerate_headline(&first.id).unwrap().result;
    let third = h.studio.regenerate_headline(&second.id).unwrap().result;

    let ids = [&first.primary_slot_id, &second.primary_slot_id, &third.primary_slot_id];
    let distinct: HashSet<_> = ids.iter().collect();
    assert_eq!(distinct.len(), 3, "repeated headline in {:?}", ids);
}

#[test]
fn invariant_format_round_trip_preserves_creative() {
    let h = create_harness(4);
    let first = promo_result(&h);
    let story = h.studio.switch(&[first.id.clone()], None, Some(Format::Story)).unwrap().remove(0);
    let back = h
        .studio
        .switch(&[story.result.id.clone()], None, Some(Format::Portrait))
        .unwrap()
        .remove(0);

    let before = h.store.get_spec(&first.spec_id).unwrap().unwrap();
    let middle = h.store.get_spec(&story.result.spec_id).unwrap().unwrap();
    let after = h.store.get_spec(&back.result.spec_id).unwrap().unwrap();
    assert_eq!((middle.canvas.width, middle.canvas.height), (1080, 1920));
    assert_eq!(after.canvas, before.canvas);
    assert_eq!(after.style_id, before.style_id);
    assert_eq!(after.zone_id, before.zone_id);
    assert_eq!(after.copy, before.copy);
    assert_eq!(after.language, before.language);
}

#[test]
fn invariant_batch_switch_skips_unresolvable_items() {
    let h = create_harness(5);
    let a = promo_result(&h);
    let b = promo_result(&h);
    let ids = vec![a.id.clone(), "rr_unknown".to_string(), b.id.clone()];

    let replacements = h.studio.switch(&ids, Some(Language::Es), None).unwrap();
    let superseded: Vec<_> = replacements.iter().map(|r| r.superseded_id.clone()).collect();
    assert_eq!(superseded, vec![a.id, b.id]);
}

#[test]
fn invariant_concurrent_mutations_leave_one_successor() {
    let h = create_harness(6);
    let first = promo_result(&h);

    let outcomes: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| h.studio.regenerate_style(&first.id)))
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    for outcome in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert!(matches!(outcome, EngineError::InvalidState(_) | EngineError::Conflict(_)));
    }
    assert_eq!(h.studio.active_results(&first.image_id).unwrap().len(), 1);
}

#[test]
fn invariant_unknown_ids_are_not_found() {
    let h = create_harness(7);
    assert!(matches!(
        h.studio.regenerate_style("rr_missing"),
        Err(EngineError::NotFound { entity: "result", .. })
    ));
    assert!(matches!(
        h.studio.lineage("rr_missing"),
        Err(EngineError::NotFound { entity: "result", .. })
    ));
    let request = GenerateRequest::new(Language::En, Format::Square).families(["neon"]);
    let image = h.studio.upload_image("p.png", &photo(10, 10)).unwrap();
    assert!(matches!(
        h.studio.generate(&image.id, &request),
        Err(EngineError::NotFound { .. })
    ));
}

#[test]
fn invariant_seeded_studios_pick_the_same_creatives() {
    let picks = |seed| {
        let h = create_harness(seed);
        let image = h.studio.upload_image("p.png", &photo(20, 25)).unwrap();
        let request = GenerateRequest::new(Language::De, Format::Square).all_styles();
        let results = h.studio.generate(&image.id, &request).unwrap();
        let mut picked = vec![];
        for result in results {
            let spec = h.store.get_spec(&result.spec_id).unwrap().unwrap();
            picked.push((spec.style_id.clone(), spec.zone_id.clone(), spec.primary_text().to_string()));
        }
        picked
    };
    let first = picks(42);
    assert_eq!(first.len(), 9);
    assert_eq!(first, picks(42));
}
