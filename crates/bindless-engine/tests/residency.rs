use bindless_engine::device::{Capabilities, DeviceContext, HostBackend};
use bindless_engine::image::{Extent, ImageId, ImageStore, ImageTarget, PixelFormat, Region};
use bindless_engine::residency::{HandleSet, ResidentHandle};
use bindless_engine::TextureError;

fn host_store() -> ImageStore<HostBackend> {
    ImageStore::new(DeviceContext::new(HostBackend::new()))
}

fn rgba_image(store: &mut ImageStore<HostBackend>, size: u32) -> ImageId {
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::Rgba8)
        .unwrap();
    store.allocate(id, 1, Extent::d2(size, size)).unwrap();
    id
}

/// Deterministic stand-in for generated pixel data.
fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

// ---- residency state machine ----

#[test]
fn make_resident_then_release_toggles_is_resident() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 8);
    assert!(!store.is_resident(id));

    let handle = store.make_resident(id).unwrap();
    assert!(!handle.is_null());
    assert!(store.is_resident(id));
    assert_eq!(store.texture_handle(id), Some(handle));

    store.make_non_resident(id).unwrap();
    assert!(!store.is_resident(id));
    assert_eq!(store.texture_handle(id), None);
}

#[test]
fn second_make_resident_is_rejected_and_first_handle_survives() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 8);
    let first = store.make_resident(id).unwrap();

    assert!(matches!(
        store.make_resident(id),
        Err(TextureError::AlreadyResident(other)) if other == id
    ));
    assert_eq!(store.validate_handle(first).unwrap(), id);
    assert_eq!(store.texture_handle(id), Some(first));
    assert_eq!(store.registry().resident_count(), 1);
}

#[test]
fn releasing_a_non_resident_image_fails_without_side_effects() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 8);

    assert!(matches!(
        store.make_non_resident(id),
        Err(TextureError::NotResident(other)) if other == id
    ));
    assert!(!store.is_resident(id));

    // The image is still usable afterwards.
    store.make_resident(id).unwrap();
    assert!(store.is_resident(id));
}

#[test]
fn residency_requires_bindless_support() {
    let mut store = ImageStore::new(DeviceContext::new(HostBackend::without_bindless()));
    assert!(matches!(
        store.create_image(ImageTarget::Texture2D, PixelFormat::Rgba8),
        Err(TextureError::UnsupportedCapability(_))
    ));
}

// ---- handle sets ----

#[test]
fn handle_set_preserves_input_order() {
    let mut store = host_store();
    let ids = [
        rgba_image(&mut store, 4),
        rgba_image(&mut store, 4),
        rgba_image(&mut store, 4),
    ];

    let set = store.make_resident_all(ids).unwrap();
    assert_eq!(set.len(), 3);
    for (k, id) in ids.iter().enumerate() {
        assert_eq!(store.validate_handle(set[k]).unwrap(), *id);
        assert_eq!(store.texture_handle(*id), Some(set[k]));
    }
    assert_eq!(set.validate(&store).unwrap(), ids);
}

#[test]
fn handle_set_reports_the_first_bad_handle() {
    let mut store = host_store();
    let ids = [rgba_image(&mut store, 4), rgba_image(&mut store, 4)];
    let set = store.make_resident_all(ids).unwrap();

    store.make_non_resident(ids[1]).unwrap();
    assert!(matches!(
        set.validate(&store),
        Err(TextureError::StaleHandle(h)) if h == set[1]
    ));

    // Nothing is released when validation fails.
    assert!(store.make_non_resident_all(&set).is_err());
    assert!(store.is_resident(ids[0]));
}

#[test]
fn forged_handles_are_unknown() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 4);
    let real = store.make_resident(id).unwrap();

    let forged = HandleSet::new([real, ResidentHandle::from_raw(real.raw() ^ 0xffff)]);
    assert!(matches!(
        forged.validate(&store),
        Err(TextureError::UnknownHandle(_))
    ));
    assert!(matches!(
        store.validate_handle(ResidentHandle::NULL),
        Err(TextureError::UnknownHandle(_))
    ));
}

#[test]
fn handles_from_different_stores_never_collide() {
    let mut first = host_store();
    let mut second = host_store();
    let a = rgba_image(&mut first, 4);
    let b = rgba_image(&mut second, 4);

    let ha = first.make_resident(a).unwrap();
    let hb = second.make_resident(b).unwrap();
    assert_ne!(ha, hb);
    assert!(matches!(
        first.validate_handle(hb),
        Err(TextureError::UnknownHandle(h)) if h == hb
    ));
    assert!(matches!(
        second.validate_handle(ha),
        Err(TextureError::UnknownHandle(h)) if h == ha
    ));
}

#[test]
fn releasing_a_set_that_repeats_a_handle_changes_nothing() {
    let mut store = host_store();
    let ids = [rgba_image(&mut store, 4), rgba_image(&mut store, 4)];
    let set = store.make_resident_all(ids).unwrap();

    let repeated = HandleSet::new([set[0], set[1], set[0]]);
    assert!(matches!(
        store.make_non_resident_all(&repeated),
        Err(TextureError::DuplicateHandle(h)) if h == set[0]
    ));
    assert!(ids.iter().all(|&id| store.is_resident(id)));
    assert_eq!(set.validate(&store).unwrap(), ids);
}

// ---- uploads ----

#[test]
fn size_mismatched_upload_keeps_previous_contents() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 4);
    let original = pattern(4 * 4 * 4, 7);
    store
        .upload(id, 0, Region::full(Extent::d2(4, 4)), &original)
        .unwrap();

    let short = vec![0u8; 4 * 4 * 4 - 1];
    assert!(matches!(
        store.upload(id, 0, Region::full(Extent::d2(4, 4)), &short),
        Err(TextureError::SizeMismatch { expected: 64, actual: 63 })
    ));
    assert_eq!(store.read(id, 0).unwrap(), original);
}

#[test]
fn sub_region_upload_touches_only_that_region() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 4);
    store.clear(id, 0, &[0, 0, 0, 255]).unwrap();

    store
        .upload(id, 0, Region::d2(1, 2, 2, 1), &[9u8; 8])
        .unwrap();

    let bytes = store.read(id, 0).unwrap();
    for y in 0..4usize {
        for x in 0..4usize {
            let px = &bytes[(y * 4 + x) * 4..][..4];
            if y == 2 && (1..3).contains(&x) {
                assert_eq!(px, [9, 9, 9, 9]);
            } else {
                assert_eq!(px, [0, 0, 0, 255]);
            }
        }
    }
}

#[test]
fn upload_outside_the_level_is_rejected() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::R8)
        .unwrap();
    store.allocate(id, 2, Extent::d2(8, 8)).unwrap();

    // Level 1 is 4x4.
    assert!(matches!(
        store.upload(id, 1, Region::d2(2, 2, 4, 4), &[0u8; 16]),
        Err(TextureError::RegionOutOfBounds { level: 1, .. })
    ));
    assert!(matches!(
        store.upload(id, 2, Region::d2(0, 0, 1, 1), &[0u8; 1]),
        Err(TextureError::LevelOutOfRange { level: 2, levels: 2 })
    ));
    store
        .upload(id, 1, Region::d2(0, 0, 4, 4), &[0u8; 16])
        .unwrap();
}

#[test]
fn uploads_keep_handles_valid() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 2);
    let handle = store.make_resident(id).unwrap();

    store.clear(id, 0, &[1, 2, 3, 4]).unwrap();
    assert_eq!(store.validate_handle(handle).unwrap(), id);
    assert_eq!(store.read(id, 0).unwrap(), [1, 2, 3, 4].repeat(4));
}

#[test]
fn clear_region_fills_only_the_region() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::R8)
        .unwrap();
    store.allocate(id, 1, Extent::d2(4, 4)).unwrap();

    store.clear_region(id, 0, Region::d2(2, 1, 2, 2), &[7]).unwrap();
    #[rustfmt::skip]
    let expected = [
        0, 0, 0, 0,
        0, 0, 7, 7,
        0, 0, 7, 7,
        0, 0, 0, 0,
    ];
    assert_eq!(store.read(id, 0).unwrap(), expected);

    assert!(matches!(
        store.clear_region(id, 0, Region::d2(3, 3, 2, 1), &[1]),
        Err(TextureError::RegionOutOfBounds { .. })
    ));
    assert!(matches!(
        store.clear_region(id, 0, Region::d2(0, 0, 1, 1), &[1, 2]),
        Err(TextureError::SizeMismatch { expected: 1, actual: 2 })
    ));
    assert_eq!(store.read(id, 0).unwrap(), expected);
}

#[test]
fn generated_mipmaps_average_the_level_above() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::R8)
        .unwrap();
    #[rustfmt::skip]
    let base = [
        0,  4, 10, 10,
        8,  4, 10, 10,
        20, 20, 0, 0,
        20, 20, 0, 0,
    ];
    store
        .define_level(id, 0, Extent::d2(4, 4), Some(&base))
        .unwrap();
    store.generate_mipmaps(id).unwrap();

    assert_eq!(store.image(id).unwrap().layout().unwrap().levels, 3);
    assert_eq!(store.read(id, 1).unwrap(), [4, 10, 20, 0]);
    // (4 + 10 + 20 + 0) / 4 = 8.5 rounds away from zero.
    assert_eq!(store.read(id, 2).unwrap(), [9]);
}

#[test]
fn mipmaps_are_refused_for_compressed_and_multisample_images() {
    let mut store = host_store();
    let bc = store
        .create_image(ImageTarget::Texture2D, PixelFormat::Bc1Rgba)
        .unwrap();
    store.allocate(bc, 2, Extent::d2(8, 8)).unwrap();
    assert!(matches!(
        store.generate_mipmaps(bc),
        Err(TextureError::FormatMismatch { .. })
    ));

    let ms = store
        .create_image(ImageTarget::Texture2DMultisample, PixelFormat::Rgba8)
        .unwrap();
    store.allocate_multisample(ms, 4, Extent::d2(8, 8)).unwrap();
    assert!(matches!(
        store.generate_mipmaps(ms),
        Err(TextureError::UnsupportedOperation { .. })
    ));

    let empty = store
        .create_image(ImageTarget::Texture2D, PixelFormat::Rgba8)
        .unwrap();
    assert!(matches!(
        store.generate_mipmaps(empty),
        Err(TextureError::Unallocated(_))
    ));
}

#[test]
fn compressed_uploads_must_be_block_aligned() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::Bc1Rgba)
        .unwrap();
    store.allocate(id, 1, Extent::d2(8, 8)).unwrap();

    assert!(matches!(
        store.upload_compressed(id, 0, Region::d2(2, 0, 4, 4), &[0u8; 8]),
        Err(TextureError::UnalignedRegion { .. })
    ));
    assert!(matches!(
        store.upload(id, 0, Region::d2(0, 0, 4, 4), &[0u8; 8]),
        Err(TextureError::FormatMismatch { .. })
    ));
    store
        .upload_compressed(id, 0, Region::d2(4, 4, 4, 4), &[0u8; 8])
        .unwrap();
}

// ---- storage ----

#[test]
fn unsupported_targets_are_refused_at_creation() {
    let caps = Capabilities {
        buffer_images: false,
        ..Capabilities::default()
    };
    let mut store = ImageStore::new(DeviceContext::new(HostBackend::with_capabilities(caps)));
    assert!(matches!(
        store.create_image(ImageTarget::Buffer, PixelFormat::R32Float),
        Err(TextureError::UnsupportedTarget(ImageTarget::Buffer))
    ));
    assert!(store.is_empty());
}

#[test]
fn immutable_storage_cannot_be_redefined() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 4);
    assert!(matches!(
        store.define_level(id, 0, Extent::d2(8, 8), None),
        Err(TextureError::ImmutableStorage(_))
    ));
}

#[test]
fn resident_images_cannot_be_reshaped() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::Rgba8)
        .unwrap();
    store.define_level(id, 0, Extent::d2(4, 4), None).unwrap();
    store.make_resident(id).unwrap();

    assert!(matches!(
        store.define_level(id, 0, Extent::d2(8, 8), None),
        Err(TextureError::StorageLocked(_))
    ));

    store.make_non_resident(id).unwrap();
    store.define_level(id, 0, Extent::d2(8, 8), None).unwrap();
}

#[test]
fn mutable_levels_are_defined_in_order() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::R8)
        .unwrap();
    store
        .define_level(id, 0, Extent::d2(8, 4), Some(&[1u8; 32]))
        .unwrap();
    store
        .define_level(id, 1, Extent::d2(4, 2), Some(&[2u8; 8]))
        .unwrap();
    store.define_level(id, 2, Extent::d2(2, 1), None).unwrap();

    let layout = *store.image(id).unwrap().layout().unwrap();
    assert_eq!(layout.levels, 3);
    assert!(!layout.immutable);
    assert_eq!(store.read(id, 0).unwrap(), [1u8; 32]);
    assert_eq!(store.read(id, 1).unwrap(), [2u8; 8]);

    // Redefining a level in place keeps the others.
    store
        .define_level(id, 1, Extent::d2(4, 2), Some(&[3u8; 8]))
        .unwrap();
    assert_eq!(store.read(id, 0).unwrap(), [1u8; 32]);
    assert_eq!(store.read(id, 1).unwrap(), [3u8; 8]);
}

#[test]
fn mutable_levels_reject_gaps_and_wrong_extents() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2D, PixelFormat::R8)
        .unwrap();
    assert!(matches!(
        store.define_level(id, 1, Extent::d2(4, 4), None),
        Err(TextureError::Unallocated(_))
    ));

    store.define_level(id, 0, Extent::d2(8, 8), None).unwrap();
    assert!(matches!(
        store.define_level(id, 2, Extent::d2(2, 2), None),
        Err(TextureError::InvalidLayout(_))
    ));
    assert!(matches!(
        store.define_level(id, 1, Extent::d2(8, 8), None),
        Err(TextureError::InvalidLayout(_))
    ));
    assert!(matches!(
        store.define_level(id, 4, Extent::d2(1, 1), None),
        Err(TextureError::LevelOutOfRange { level: 4, levels: 4 })
    ));
    assert!(matches!(
        store.define_level(id, 1, Extent::d2(4, 4), Some(&[0u8; 15])),
        Err(TextureError::SizeMismatch { expected: 16, actual: 15 })
    ));
    assert_eq!(store.image(id).unwrap().layout().unwrap().levels, 1);

    // A new base extent starts the chain over.
    store.define_level(id, 1, Extent::d2(4, 4), None).unwrap();
    store.define_level(id, 0, Extent::d2(16, 16), None).unwrap();
    let layout = *store.image(id).unwrap().layout().unwrap();
    assert_eq!((layout.extent, layout.levels), (Extent::d2(16, 16), 1));
}

#[test]
fn layouts_follow_device_limits() {
    let caps = Capabilities {
        sample_counts: 4,
        mipmapped_1d: false,
        block_aligned_base: true,
        ..Capabilities::default()
    };
    let mut store = ImageStore::new(DeviceContext::new(HostBackend::with_capabilities(caps)));

    let line = store
        .create_image(ImageTarget::Texture1D, PixelFormat::R8)
        .unwrap();
    assert!(matches!(
        store.allocate(line, 4, Extent::d1(8)),
        Err(TextureError::InvalidLayout(_))
    ));
    store.allocate(line, 1, Extent::d1(8)).unwrap();

    let bc = store
        .create_image(ImageTarget::Texture2D, PixelFormat::Bc1Rgba)
        .unwrap();
    assert!(matches!(
        store.allocate(bc, 1, Extent::d2(10, 10)),
        Err(TextureError::InvalidLayout(_))
    ));
    store.allocate(bc, 1, Extent::d2(12, 12)).unwrap();

    let ms = store
        .create_image(ImageTarget::Texture2DMultisample, PixelFormat::Rgba8)
        .unwrap();
    assert!(matches!(
        store.allocate_multisample(ms, 2, Extent::d2(16, 16)),
        Err(TextureError::InvalidLayout(_))
    ));
    store.allocate_multisample(ms, 4, Extent::d2(16, 16)).unwrap();
}

#[test]
fn multisample_images_take_no_uploads() {
    let mut store = host_store();
    let id = store
        .create_image(ImageTarget::Texture2DMultisample, PixelFormat::Rgba8)
        .unwrap();
    store.allocate_multisample(id, 4, Extent::d2(16, 16)).unwrap();
    assert!(matches!(
        store.upload(id, 0, Region::d2(0, 0, 1, 1), &[0u8; 4]),
        Err(TextureError::UnsupportedOperation { .. })
    ));
}

// ---- destruction ----

#[test]
fn destroying_a_resident_image_invalidates_its_handle() {
    let mut store = host_store();
    let id = rgba_image(&mut store, 4);
    let handle = store.make_resident(id).unwrap();

    store.destroy(id).unwrap();
    assert!(matches!(
        store.validate_handle(handle),
        Err(TextureError::UseAfterDestroy(h)) if h == handle
    ));
    assert!(matches!(
        store.make_resident(id),
        Err(TextureError::DestroyedImage(_))
    ));
    assert!(matches!(store.destroy(id), Err(TextureError::DestroyedImage(_))));
    assert_eq!(store.registry().resident_count(), 0);
}

#[test]
fn destroy_unbinds_the_image() {
    let mut store = host_store();
    let a = rgba_image(&mut store, 4);
    let b = rgba_image(&mut store, 4);

    assert_eq!(store.bind(a).unwrap(), None);
    assert_eq!(store.bind(b).unwrap(), Some(a));
    store.destroy(b).unwrap();
    assert_eq!(store.bound(ImageTarget::Texture2D), None);
}

// ---- end to end ----

#[test]
fn four_noise_textures_round_trip_through_residency() {
    const SIZE: u32 = 512;
    let mut store = host_store();

    let mut ids = [ImageId::default(); 4];
    for (i, slot) in ids.iter_mut().enumerate() {
        let id = store
            .create_image(ImageTarget::Texture2D, PixelFormat::Rgba8)
            .unwrap();
        let pixels = pattern((SIZE * SIZE * 4) as usize, i as u8);
        store
            .define_level(id, 0, Extent::d2(SIZE, SIZE), Some(&pixels))
            .unwrap();
        *slot = id;
    }

    let set = store.make_resident_all(ids).unwrap();
    assert_eq!(set.len(), 4);
    let mut raw = set.to_raw().to_vec();
    assert!(raw.iter().all(|&h| h != 0));
    raw.sort_unstable();
    raw.dedup();
    assert_eq!(raw.len(), 4);
    assert!(ids.iter().all(|&id| store.is_resident(id)));
    assert_eq!(set.as_bytes().len(), 4 * 8);

    store.make_non_resident_all(&set).unwrap();
    assert!(ids.iter().all(|&id| !store.is_resident(id)));
    assert_eq!(store.registry().resident_count(), 0);

    for id in ids {
        store.destroy(id).unwrap();
    }
    assert!(store.is_empty());
}
