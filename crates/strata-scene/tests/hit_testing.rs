//! Integration tests: color-key hit testing and snapshot placement.

use std::collections::HashSet;
use strata_scene::strata_core::kurbo::Point;
use strata_scene::strata_core::Attr;
use strata_scene::{CacheConfig, LayerConfig, NodeIndex, Scene, StageConfig};

fn stage_with_layer(scene: &mut Scene, width: f64, height: f64) -> (NodeIndex, NodeIndex) {
    let stage = scene
        .create_stage(StageConfig {
            width,
            height,
            pixel_ratio: 1.0,
        })
        .unwrap();
    let layer = scene.create_layer(LayerConfig::default());
    scene.add(stage, layer).unwrap();
    (stage, layer)
}

// ─── Color keys ─────────────────────────────────────────────────────────

#[test]
fn keys_stay_unique_across_many_shapes() {
    let mut scene = Scene::new();
    let shapes: Vec<_> = (0..300).map(|_| scene.create_rect(0.0, 0.0, 1.0, 1.0)).collect();
    let keys: HashSet<_> = shapes
        .iter()
        .filter_map(|&s| scene.node(s).and_then(|n| n.color_key()))
        .collect();
    assert_eq!(keys.len(), 300);
    for &shape in &shapes {
        let key = scene.node(shape).and_then(|n| n.color_key()).unwrap();
        assert_eq!(scene.shape_for_key(key), Some(shape));
    }
}

#[test]
fn destroyed_keys_are_released_immediately() {
    let mut scene = Scene::with_seed(12);
    let doomed = scene.create_circle(0.0, 0.0, 2.0);
    let key = scene.node(doomed).and_then(|n| n.color_key()).unwrap();
    scene.destroy(doomed).unwrap();
    assert_eq!(scene.shape_for_key(key), None);

    let survivors: Vec<_> = (0..200).map(|_| scene.create_rect(0.0, 0.0, 1.0, 1.0)).collect();
    let keys: HashSet<_> = survivors
        .iter()
        .filter_map(|&s| scene.node(s).and_then(|n| n.color_key()))
        .collect();
    assert_eq!(keys.len(), survivors.len());
}

// ─── Draw order ─────────────────────────────────────────────────────────

#[test]
fn later_sibling_wins_the_hit() {
    let mut scene = Scene::with_seed(13);
    let (stage, layer) = stage_with_layer(&mut scene, 100.0, 100.0);
    let a = scene.create_rect(10.0, 10.0, 50.0, 50.0);
    let b = scene.create_circle(50.0, 50.0, 20.0);
    scene.set(a, Attr::Fill, "red").unwrap();
    scene.set(b, Attr::Fill, "blue").unwrap();
    scene.add(layer, a).unwrap();
    scene.add(layer, b).unwrap();
    scene.tick();

    assert_eq!(scene.get_intersection(stage, Point::new(50.0, 50.0)), Some(b));
    assert_eq!(scene.get_intersection(stage, Point::new(15.0, 15.0)), Some(a));

    scene.move_to_top(a);
    scene.tick();
    assert_eq!(scene.get_intersection(stage, Point::new(50.0, 50.0)), Some(a));
}

#[test]
fn hit_stroke_width_widens_the_target() {
    let mut scene = Scene::with_seed(14);
    let (stage, layer) = stage_with_layer(&mut scene, 60.0, 60.0);
    let line = scene.create_line(vec![10.0, 30.0, 50.0, 30.0], false);
    scene.set(line, Attr::Stroke, "black").unwrap();
    scene.set(line, Attr::StrokeWidth, 1.0).unwrap();
    scene.add(layer, line).unwrap();
    scene.tick();
    assert_eq!(scene.get_intersection(stage, Point::new(30.0, 35.0)), None);

    scene.set(line, Attr::HitStrokeWidth, 12.0).unwrap();
    scene.tick();
    assert_eq!(scene.get_intersection(stage, Point::new(30.0, 35.0)), Some(line));
}

// ─── Snapshots ──────────────────────────────────────────────────────────

/// A group with two overlapping shapes, placed at the origin.
fn build_subtree(scene: &mut Scene, layer: NodeIndex) -> (NodeIndex, NodeIndex) {
    let group = scene.create_group();
    let rect = scene.create_rect(0.0, 0.0, 20.0, 12.0);
    let circle = scene.create_circle(20.0, 12.0, 6.0);
    scene.set(rect, Attr::Fill, "#cc3300").unwrap();
    scene.set(circle, Attr::Fill, "#0033cc").unwrap();
    scene.add(group, rect).unwrap();
    scene.add(group, circle).unwrap();
    scene.add(layer, group).unwrap();
    (group, rect)
}

fn move_group(scene: &mut Scene, group: NodeIndex) {
    scene.set_position(group, Point::new(30.0, 20.0));
    scene.set_scale(group, 2.0, 2.0);
}

#[test]
fn snapshot_follows_post_cache_transforms() {
    let mut live = Scene::with_seed(15);
    let (_, live_layer) = stage_with_layer(&mut live, 96.0, 64.0);
    let (live_group, _) = build_subtree(&mut live, live_layer);
    move_group(&mut live, live_group);
    live.tick();

    let mut frozen = Scene::with_seed(15);
    let (_, frozen_layer) = stage_with_layer(&mut frozen, 96.0, 64.0);
    let (frozen_group, _) = build_subtree(&mut frozen, frozen_layer);
    assert!(frozen.cache(frozen_group, CacheConfig::default()).unwrap());
    move_group(&mut frozen, frozen_group);
    frozen.tick();

    let a = live.scene_surface(live_layer).unwrap();
    let b = frozen.scene_surface(frozen_layer).unwrap();
    // Scaled bitmaps resample edges; compare well inside each shape and
    // well outside the subtree.
    for (x, y) in [(40, 30), (66, 42), (68, 44), (74, 50), (10, 10), (90, 60), (31, 50)] {
        let (pa, pb) = (a.pixel(x, y).unwrap(), b.pixel(x, y).unwrap());
        for c in 0..4 {
            assert!(
                (i32::from(pa[c]) - i32::from(pb[c])).abs() <= 2,
                "pixel ({x}, {y}): live {pa:?}, cached {pb:?}"
            );
        }
    }
}

#[test]
fn cached_subtree_still_hits_its_shapes() {
    let mut scene = Scene::with_seed(16);
    let (stage, layer) = stage_with_layer(&mut scene, 96.0, 64.0);
    let (group, rect) = build_subtree(&mut scene, layer);
    scene.cache(group, CacheConfig::default()).unwrap();
    move_group(&mut scene, group);
    scene.tick();
    assert_eq!(scene.get_intersection(stage, Point::new(40.0, 30.0)), Some(rect));
    assert_eq!(scene.get_intersection(stage, Point::new(5.0, 5.0)), None);
}
