use super::*;
use crate::assets::raster::RasterImage;
use crate::foundation::core::Rgba8;

fn source(id: u64) -> ImageSource {
    let img = RasterImage::from_rgba(2, 1, vec![255, 0, 0, 128, 0, 0, 255, 255]).unwrap();
    ImageSource::raster(ImageId(id), &img).unwrap()
}

fn cache(capacity: usize) -> ImageCache {
    ImageCache::new(EngineConfig {
        image_cache_capacity: capacity,
        ..EngineConfig::default()
    })
}

#[test]
fn repeated_prepare_is_a_cache_hit() {
    let mut c = cache(4);
    let src = source(1);
    let a = c.prepare(&src, None).unwrap();
    let b = c.prepare(&src, None).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    let st = c.stats();
    assert_eq!((st.hits, st.misses, st.len), (1, 1, 1));

    // Never premultiplied twice.
    let PreparedImage::Raster(r) = &*b else {
        panic!("expected raster");
    };
    assert_eq!(r.buffer.pixel(0, 0).unwrap().to_array(), [128, 0, 0, 128]);
    assert_eq!(c.tag(ImageId(1)), Some(ImageTag::Raster));
}

#[test]
fn a_different_recolor_replaces_the_entry() {
    let mut c = cache(4);
    let src = source(1);
    let plain = c.prepare(&src, None).unwrap();
    let tinted = c
        .prepare(&src, Some(Recolor::new(Rgba8::WHITE, 255)))
        .unwrap();
    assert!(!Arc::ptr_eq(&plain, &tinted));
    assert_eq!(c.stats().replaced, 1);
    assert!(c.get(ImageId(1), None).is_none());
    assert!(c.get(ImageId(1), Some(Recolor::new(Rgba8::WHITE, 255))).is_some());
    // An inactive recolor is the same as none.
    c.prepare(&src, Some(Recolor::new(Rgba8::BLACK, 0))).unwrap();
    assert!(c.get(ImageId(1), None).is_some());
}

#[test]
fn least_recently_used_entries_are_evicted() {
    let mut c = cache(2);
    c.prepare(&source(1), None).unwrap();
    c.prepare(&source(2), None).unwrap();
    c.prepare(&source(1), None).unwrap();
    c.prepare(&source(3), None).unwrap();
    assert!(c.get(ImageId(1), None).is_some());
    assert!(c.get(ImageId(2), None).is_none());
    assert_eq!(c.stats().evicted, 1);
    assert_eq!(c.stats().len, 2);
}

#[test]
fn release_drops_the_entry() {
    let mut c = cache(4);
    let held = c.prepare(&source(7), None).unwrap();
    assert!(c.release(ImageId(7)));
    assert!(!c.release(ImageId(7)));
    assert!(c.get(ImageId(7), None).is_none());
    // Outstanding handles stay valid.
    assert_eq!(held.size(), (2, 1));
}

#[test]
fn preparation_errors_are_not_cached() {
    let mut c = cache(4);
    let bad = ImageSource::new(ImageId(3), vec![0u8; 2]);
    assert!(c.prepare(&bad, None).is_err());
    assert_eq!(c.stats().len, 0);
}
