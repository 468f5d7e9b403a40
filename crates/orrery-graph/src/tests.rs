use crate::body::TIME_REFERENCE_BODY;
use crate::module::{ModelModule, SphereModule};
use crate::*;
use glam::{DMat4, DVec2, DVec3, Mat4, Vec2, Vec3};
use orrery_core::constants::J2000_JD;
use orrery_core::time::greenwich_sidereal_time;
use orrery_sim::{CircularOrbit, FixedOrbit};
use std::rc::Rc;

const D: f64 = 1.5e11;
const JD: f64 = J2000_JD + 0.5;

struct Solar {
    graph: BodyGraph,
    sys: BodyId,
    star: BodyId,
    planet: BodyId,
}

/// Star at the origin of an isolated root, planet on a circular orbit of radius D
fn solar() -> Solar {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let star = graph.add_body(
        BodySpec::new("S")
            .with_kind(BodyKind::Star)
            .with_parent(sys)
            .with_radius(7e8)
            .with_influence(1e10),
    );
    let planet = graph.add_body(
        BodySpec::new("P")
            .with_parent(star)
            .with_radius(6.4e6)
            .with_influence(1e9)
            .with_orbit(Rc::new(CircularOrbit::new(D, 365.25))),
    );
    Solar { graph, sys, star, planet }
}

fn observer_at(graph: &mut BodyGraph, reference: BodyId, position: DVec3) -> Observer {
    Observer::new(graph, reference, position, ViewParams::default()).unwrap()
}

fn sphere(radius: f64) -> Box<SphereModule> {
    Box::new(SphereModule { radius, oblateness: 0.0, texture: None })
}

fn fixed(name: &str, parent: BodyId, pos: DVec3, radius: f64) -> BodySpec {
    BodySpec::new(name)
        .with_parent(parent)
        .with_radius(radius)
        .with_influence(radius * 2.0)
        .with_orbit(Rc::new(FixedOrbit::new(pos)))
}

#[test]
fn test_parent_round_trip_is_identity() {
    let Solar { mut graph, planet, .. } = solar();
    let pos = DVec3::new(1e7, -3e6, 2e5);

    let up = graph.body_to_parent_pos(planet, pos, JD);
    let back = graph.parent_to_body_pos(planet, up, JD);
    assert!((back - pos).length() < 1e-3, "drift {}", (back - pos).length());

    let m = graph.transform_parent_to_body(planet, JD) * graph.transform_body_to_parent(planet, JD);
    assert!(m.abs_diff_eq(DMat4::IDENTITY, 1e-9));
}

#[test]
fn test_extrapolation_is_exact_within_cadence() {
    let Solar { mut graph, planet, .. } = solar();
    let cadence = graph.config().cadence_days();

    graph.local_position(planet, JD + 0.123);
    let cache = graph.body(planet).unwrap().orbit_cache().clone();
    assert!(cache.is_valid());

    for k in 0..=10 {
        let t = cache.computed_jd() + cadence * k as f64 / 10.0;
        let pos = graph.local_position(planet, t);
        assert_eq!(pos, cache.computed_pos() + cache.delta_pos() * (t - cache.computed_jd()));
    }
    assert_eq!(graph.body(planet).unwrap().orbit_cache().computed_jd(), cache.computed_jd());
}

#[test]
fn test_visibility_is_monotonic_in_radius() {
    let Solar { mut graph, sys, .. } = solar();
    // 80 degrees off the view axis, outside the default field of view
    let angle = 80f64.to_radians();
    let pos = DVec3::new(angle.sin(), 0.0, -angle.cos()) * 1e9;
    let body = graph.add_body(fixed("Probe", sys, pos, 0.0));

    let ctx = graph.begin_frame(JD, ViewParams::default());
    let matrix = DMat4::from_translation(pos);
    let mut was_visible = false;
    let mut seen = Vec::new();
    for step in 0..=40 {
        graph.node_mut(body).unwrap().radius = 1e9 * step as f64 / 20.0;
        graph.pre_update(body, matrix, &ctx);
        let visible = graph.body(body).unwrap().frame().visible;
        assert!(visible || !was_visible, "became invisible at step {step}");
        was_visible = visible;
        seen.push(visible);
    }
    assert!(!seen[0]);
    assert!(*seen.last().unwrap());
}

#[test]
fn test_switch_round_trip_restores_position() {
    let Solar { mut graph, star, planet, .. } = solar();
    let start = DVec3::new(1e9, 2e9, 3e8);
    let mut observer = observer_at(&mut graph, star, start);

    assert!(observer.set_reference(&mut graph, planet, JD));
    assert_eq!(observer.reference_body(&graph), Some(planet));
    assert!(observer.set_reference(&mut graph, star, JD));

    assert!((observer.position() - start).length() < 1e-2);
    assert_eq!(observer.switch_count(), 2);

    let there = graph.calculate_switch_compensation(star, planet, JD).unwrap();
    let back = graph.calculate_switch_compensation(planet, star, JD).unwrap();
    assert!((back * there).abs_diff_eq(DMat4::IDENTITY, 1e-3));
}

#[test]
fn test_compensation_through_common_ancestor() {
    let Solar { mut graph, sys, star, planet } = solar();
    let moon = graph.add_body(fixed("M", planet, DVec3::new(4e8, 0.0, 0.0), 1.7e6));
    let far = graph.add_body(fixed("F", sys, DVec3::new(0.0, 3e12, 0.0), 1e6));

    let p = graph.local_position(planet, JD);
    // Origin of the moon seen from the far body's frame
    let m = graph.calculate_switch_compensation(moon, far, JD).unwrap();
    let expected = p + DVec3::new(4e8, 0.0, 0.0) - DVec3::new(0.0, 3e12, 0.0);
    assert!((m.transform_point3(DVec3::ZERO) - expected).length() < 1e-2);

    assert_eq!(graph.relative_position(star, moon, JD).map(|v| (v - p).x.round()), Some(4e8));
}

#[test]
fn test_system_index_sorted_far_to_near() {
    let Solar { mut graph, sys, star, planet } = solar();
    for i in 0..12 {
        let orbit = CircularOrbit::new(D * (0.2 + i as f64 * 0.3), 30.0 + i as f64 * 17.0);
        let spec = BodySpec::new(format!("B{i}")).with_parent(star).with_radius(1e6);
        graph.add_body(spec.with_orbit(Rc::new(orbit)));
    }
    let mut observer = observer_at(&mut graph, planet, DVec3::new(0.0, 0.0, 5e8));

    for frame in 0..20 {
        let jd = JD + frame as f64 * 3.7;
        let ctx = observer.update(&mut graph, jd).unwrap();
        let index = graph.body(sys).unwrap().system_index().unwrap();
        let keys: Vec<f64> = index
            .entries()
            .map(|id| graph.body(id).unwrap().frame())
            .map(|f| if f.stamp == ctx.stamp { f.distance } else { 0.0 })
            .collect();
        assert_eq!(keys.len(), 14);
        assert!(keys.windows(2).all(|w| w[0] >= w[1]), "frame {frame}: {keys:?}");
    }
}

#[test]
fn test_re_registration_migrates_children_and_handles() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let old = graph.add_body(BodySpec::new("S").with_kind(BodyKind::Star).with_parent(sys));
    let base = graph.add_body(BodySpec::new("Base").with_parent(old));
    graph.set_light(sys, old);
    let handle = BodyRef::acquire(&mut graph, old).unwrap();

    let spec = BodySpec::new("S").with_kind(BodyKind::Star).with_parent(sys);
    let new = graph.add_body(spec.with_radius(1.0));

    assert_ne!(old, new);
    assert!(graph.body(old).is_none());
    assert_eq!(graph.body(base).unwrap().parent(), Some(new));
    assert_eq!(graph.body(new).unwrap().children(), &[base]);
    assert_eq!(handle.resolve_id(&graph), Some(new));
    assert_eq!(graph.body(new).unwrap().live_handles(), 1);
    assert_eq!(graph.find_body("S"), Some(new));
    assert_eq!(graph.light(sys), Some(new));
    assert_eq!(graph.body(sys).unwrap().children(), &[new]);

    let indexed: Vec<BodyId> = graph.body(sys).unwrap().system_index().unwrap().entries().collect();
    assert!(indexed.contains(&new) && indexed.contains(&base) && !indexed.contains(&old));
}

#[test]
fn test_single_switch_without_jump() {
    let Solar { mut graph, star, planet, .. } = solar();
    let step = 1e9;
    let mut observer = observer_at(&mut graph, star, DVec3::new(2e9, 0.0, 0.0));
    observer.update(&mut graph, JD).unwrap();
    let mut last = graph.body(star).unwrap().frame().position();

    let mut frames_after_switch = 0;
    for _ in 0..400 {
        observer.move_toward(&mut graph, planet, step, JD).unwrap();
        observer.update(&mut graph, JD).unwrap();

        let now = graph.body(star).unwrap().frame().position();
        let jump = (now - last).length();
        assert!(jump <= step * (1.0 + 1e-9) + 1.0, "star jumped {jump} m");
        last = now;

        if observer.reference_body(&graph) == Some(planet) {
            frames_after_switch += 1;
            if frames_after_switch > 5 {
                break;
            }
        }
    }

    assert_eq!(observer.reference_body(&graph), Some(planet));
    assert_eq!(observer.switch_count(), 1);
}

#[test]
fn test_dispatch_stops_at_isolated_root() {
    let Solar { mut graph, sys, star, planet } = solar();
    let nested = graph.add_body(BodySpec {
        isolated: true,
        ..fixed("Cluster", sys, DVec3::new(0.0, 0.0, -9e15), 1e12)
    });
    let inner = graph.add_body(fixed("Far star", nested, DVec3::new(1e11, 0.0, 0.0), 7e8));

    let mut ctx = graph.begin_frame(JD, ViewParams::default());
    let matrix = DMat4::from_translation(DVec3::new(0.0, 0.0, -1e8));
    let root = graph.dispatch_update(planet, matrix, &mut ctx);
    assert_eq!(root, Some(sys));

    let stamp = |graph: &BodyGraph, id| graph.body(id).unwrap().frame().stamp;
    assert_eq!(stamp(&graph, star), ctx.stamp);
    assert_eq!(stamp(&graph, sys), ctx.stamp);
    assert_eq!(stamp(&graph, nested), ctx.stamp);
    assert_ne!(stamp(&graph, inner), ctx.stamp);
    assert_eq!(graph.body(inner).unwrap().system(), Some(nested));
}

#[test]
fn test_hide_show_keeps_identity() {
    let Solar { mut graph, sys, star, planet } = solar();
    let extent = graph.body(star).unwrap().extent();
    assert!(extent > D);

    assert!(graph.hide(planet));
    assert!(!graph.hide(planet));
    assert!(!graph.hide(sys), "roots cannot be hidden");
    assert!(graph.body(star).unwrap().children().is_empty());
    assert_eq!(graph.hidden(), &[planet]);
    assert_eq!(graph.find_body("P"), Some(planet));
    assert_eq!(graph.body(planet).unwrap().parent(), Some(star));
    assert_eq!(graph.body(star).unwrap().extent(), 0.0);

    assert!(graph.show(planet));
    assert_eq!(graph.body(star).unwrap().children(), &[planet]);
    assert!(graph.hidden().is_empty());
    assert_eq!(graph.body(star).unwrap().extent(), extent);
}

#[test]
fn test_remove_redirects_whole_subtree() {
    let Solar { mut graph, sys, star, planet } = solar();
    let moon = graph.add_body(fixed("M", planet, DVec3::X * 4e8, 1.7e6));
    let handle = BodyRef::acquire(&mut graph, moon).unwrap();

    assert_eq!(graph.remove_body(star), 3);
    assert!(!graph.exists("P") && !graph.exists("M") && !graph.exists("S"));
    assert_eq!(handle.resolve_id(&graph), Some(sys));
    assert_eq!(graph.body(sys).unwrap().live_handles(), 1);
    assert!(graph.body(sys).unwrap().system_index().unwrap().has_holes());
    assert_eq!(graph.body(sys).unwrap().extent(), 0.0);
}

#[test]
fn test_purge_spares_held_hidden_bodies() {
    let Solar { mut graph, planet, .. } = solar();
    let handle = BodyRef::acquire(&mut graph, planet).unwrap();
    graph.hide(planet);

    assert_eq!(graph.purge_hidden(), 0);
    handle.release(&mut graph);
    assert_eq!(graph.purge_hidden(), 1);
    assert!(graph.hidden().is_empty());
    assert!(!graph.exists("P"));
}

#[test]
fn test_nearest_child_wins_overlapping_influence() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let a = graph.add_body(fixed("A", sys, DVec3::new(1e6, 0.0, 0.0), 3e6));
    let b = graph.add_body(fixed("B", sys, DVec3::new(-1e6, 0.0, 0.0), 3e6));

    assert_eq!(graph.find_better_reference(sys, DVec3::new(-5e5, 0.0, 0.0), JD), Some(b));
    assert_eq!(graph.find_better_reference(sys, DVec3::new(5e5, 0.0, 0.0), JD), Some(a));
    // Ties go to the earlier child
    assert_eq!(graph.find_better_reference(sys, DVec3::ZERO, JD), Some(a));
    // Roots never hand the observer upward
    assert_eq!(graph.find_better_reference(sys, DVec3::new(0.0, 1e12, 0.0), JD), None);
    assert_eq!(graph.find_better_reference(a, DVec3::new(0.0, 1e8, 0.0), JD), Some(sys));
}

#[test]
fn test_pick_prefers_body_under_cursor() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let big = graph.add_body(fixed("Big", sys, DVec3::new(0.0, 0.0, -1e9), 1e7));
    let small = graph.add_body(fixed("Small", sys, DVec3::new(1e8, 0.0, -1e9), 1e6));
    let mut observer = observer_at(&mut graph, sys, DVec3::ZERO);
    let ctx = observer.update(&mut graph, JD).unwrap();

    assert_eq!(graph.find_body_at(sys, DVec2::new(960.0, 540.0), &ctx), Some(big));
    let small_pos = graph.body(small).unwrap().frame().screen_pos.unwrap();
    assert_eq!(graph.find_body_at(sys, small_pos + DVec2::new(3.0, 0.0), &ctx), Some(small));
    assert_eq!(graph.find_body_at(sys, DVec2::new(10.0, 10.0), &ctx), None);
}

#[test]
fn test_light_body_is_marked() {
    let Solar { mut graph, sys, star, planet } = solar();
    graph.set_light(sys, star);
    let mut observer = observer_at(&mut graph, planet, DVec3::new(0.0, 0.0, 2e7));
    observer.update(&mut graph, JD).unwrap();

    assert!(graph.body(star).unwrap().frame().is_light);
    assert!(!graph.body(planet).unwrap().frame().is_light);
    let index = graph.body(sys).unwrap().system_index().unwrap();
    let light_pos = index.light_position().unwrap();
    let star_pos = -graph.local_position(planet, JD) - DVec3::new(0.0, 0.0, 2e7);
    assert!((light_pos - star_pos).length() < 1.0);
}

#[test]
fn test_module_bounds_follow_asset_loading() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let model = ModelModule::new("station.glb", 400.0);
    let slot = model.slot();
    let mut modules = ModuleTiers::new();
    modules.push(DrawTier::Near, sphere(50.0));
    modules.push(DrawTier::Near, Box::new(model));
    let spec = fixed("Station", sys, DVec3::new(0.0, 0.0, -1e4), 50.0);
    let station = graph.add_body(spec.with_modules(modules));
    let mut observer = observer_at(&mut graph, sys, DVec3::ZERO);

    observer.update(&mut graph, JD).unwrap();
    assert_eq!(graph.body(station).unwrap().bounding_radius(), 50.0);

    slot.mark_ready();
    observer.update(&mut graph, JD).unwrap();
    assert_eq!(graph.body(station).unwrap().bounding_radius(), 400.0);
}

#[test]
fn test_time_reference_body_spins_with_sidereal_time() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let rotation = RotationElements { period_days: 0.99727, ..Default::default() };
    let earth = fixed(TIME_REFERENCE_BODY, sys, DVec3::new(0.0, 0.0, -1e8), 6.4e6);
    let earth = graph.add_body(earth.with_rotation(rotation.clone()));
    let mars = fixed("Mars", sys, DVec3::new(0.0, 1e7, -1e8), 3.4e6);
    let mars = graph.add_body(mars.with_rotation(rotation.clone()));
    let mut observer = observer_at(&mut graph, sys, DVec3::ZERO);
    let jd = JD + 123.456;
    observer.update(&mut graph, jd).unwrap();

    let gmst = greenwich_sidereal_time(jd).rem_euclid(std::f64::consts::TAU);
    assert!((graph.body(earth).unwrap().frame().spin - gmst).abs() < 1e-12);
    assert!((graph.body(mars).unwrap().frame().spin - rotation.spin_angle(jd)).abs() < 1e-12);
}

#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
}

impl Renderer for Recorder {
    fn begin_body_draw(&mut self, body: &BodyNode) {
        self.calls.push(format!("begin {}", body.name()));
    }

    fn end_body_draw(&mut self, body: &BodyNode) {
        self.calls.push(format!("end {}", body.name()));
    }

    fn clear_depth(&mut self) {
        self.calls.push("clear".into());
    }

    fn draw(&mut self, module: &dyn BodyModule, _model_view: &Mat4) {
        self.calls.push(format!("draw {}", module.kind()));
    }

    fn draw_halo(&mut self, _screen_pos: Vec2, _color: Vec3, _radius: f32) {
        self.calls.push("halo".into());
    }
}

#[test]
fn test_draw_order_and_halo_fallback() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let mut modules = ModuleTiers::new();
    modules.push(DrawTier::Far, sphere(1e7));
    graph.add_body(fixed("Near", sys, DVec3::new(0.0, 0.0, -1e8), 1e7).with_modules(modules));
    graph.add_body(fixed("Dot", sys, DVec3::new(0.0, 1e9, -1e11), 1.0));
    let mut observer = observer_at(&mut graph, sys, DVec3::ZERO);
    let ctx = observer.update(&mut graph, JD).unwrap();

    let mut recorder = Recorder::default();
    assert_eq!(graph.draw_system(sys, &mut recorder, &ctx), 2);
    assert_eq!(
        recorder.calls,
        vec!["begin Dot", "halo", "end Dot", "clear", "begin Near", "draw sphere", "end Near"]
    );

    let instances = graph.instances(&ctx);
    assert_eq!(instances.len(), ctx.updated.len());
    assert!(instances.iter().any(|i| i.flags & render::INSTANCE_NOTABLE != 0));
}

#[test]
fn test_load_system_skips_bad_records() {
    let json = r#"{
        "name": "Sol",
        "bodies": [
            { "name": "Sun", "type": "star", "radius": 6.9634e8 },
            { "name": "Earth", "display_name": "Terre", "orbit_body": "Earth", "rotation_period": 23.9345 },
            { "name": "Moon", "parent": "Earth", "orbit_body": "Moon", "atmosphere_height": "oops" },
            { "name": "Luna", "parent": "Earth", "orbit": "circular", "orbit_radius": 3.844e8, "orbit_period": 27.32 },
            { "name": "Ghost", "parent": "Nowhere", "radius": 1 },
            { "name": "Rock", "orbit": "made-up" },
            { "name": "Thing", "type": "nebula" },
            { "radius": 5 }
        ]
    }"#;
    let system = SystemConfig::from_json(json).unwrap();
    let mut graph = BodyGraph::default();
    let report = load_system(&mut graph, &LoaderRegistry::default(), &system).unwrap();

    assert_eq!(report.loaded, 3);
    assert_eq!(report.skipped, 5);
    let reasons: Vec<&ConfigError> = report.problems.iter().map(|(_, e)| e).collect();
    assert!(reasons.contains(&&ConfigError::UnknownParent("Nowhere".into())));
    assert!(reasons.contains(&&ConfigError::UnknownOrbit("made-up".into())));
    assert!(reasons.contains(&&ConfigError::UnknownKind("nebula".into())));
    assert!(reasons.contains(&&ConfigError::MissingField("name".into())));

    let root = report.root.unwrap();
    let sun = graph.find_body("Sun").unwrap();
    let earth = graph.find_body("Earth").unwrap();
    assert_eq!(graph.light(root), Some(sun));
    assert_eq!(graph.body(sun).unwrap().parent(), Some(root));
    assert_eq!(graph.body(earth).unwrap().radius(), orrery_sim::Planet::Earth.radius());
    assert_eq!(graph.find_body_name_i18n("terre"), Some(earth));
    assert!(graph.body(graph.find_body("Luna").unwrap()).unwrap().orbit().is_some());

    // Loading the same file again re-registers every body in place
    let again = load_system(&mut graph, &LoaderRegistry::default(), &system).unwrap();
    assert_eq!(again.replaced, 4);
    assert_eq!(graph.find_body("Sol"), again.root);
    let luna = graph.find_body("Luna").unwrap();
    assert_eq!(graph.body(luna).unwrap().parent(), graph.find_body("Earth"));
}

#[test]
fn test_lookup_cache() {
    let Solar { graph, planet, star, .. } = solar();
    assert_eq!(graph.find_body("P"), Some(planet));
    assert_eq!(graph.cached_lookup(), Some(planet));
    assert_eq!(graph.find_body_once("S"), Some(star));
    assert_eq!(graph.cached_lookup(), Some(planet));
    assert_eq!(graph.find_body("nope"), None);
    assert!(!graph.exists("nope"));
}

#[test]
fn test_observer_sky_coordinates() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let body = graph.add_body(fixed("World", sys, DVec3::ZERO, 6e6));
    let observer = observer_at(&mut graph, body, DVec3::new(6e6, 0.0, 0.0));

    let zenith = observer.to_horizontal(&graph, DVec3::X, JD).unwrap();
    assert!((zenith.altitude - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    let north = observer.to_horizontal(&graph, DVec3::Z, JD).unwrap();
    assert!(north.altitude.abs() < 1e-9 && north.azimuth.abs() < 1e-9);

    let eq = observer.to_equatorial(DVec3::X);
    assert!(eq.ra.abs() < 1e-12 && eq.dec.abs() < 1e-12);

    let local = observer.observer_to_body(&mut graph, sys, DVec3::new(0.0, 1.0, 0.0), JD).unwrap();
    assert!(local.abs_diff_eq(DVec3::new(6e6, 1.0, 0.0), 1e-6));
}

#[test]
fn test_enclosing_subtree_stays_visible_behind_viewer() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let planet = graph.add_body(fixed("P", sys, DVec3::ZERO, 1e6));
    let moon = graph.add_body(fixed("M", planet, DVec3::new(0.0, 0.0, -1e7), 1.7e5));
    // Planet center behind the viewer, moon straight ahead
    let mut observer = observer_at(&mut graph, planet, DVec3::new(0.0, 0.0, -2e6));

    let ctx = observer.update(&mut graph, JD).unwrap();
    assert_eq!(observer.reference_body(&graph), Some(planet));

    let planet_frame = graph.body(planet).unwrap().frame();
    assert!(!planet_frame.visible);
    assert!(planet_frame.subtree_visible);

    let moon_frame = graph.body(moon).unwrap().frame();
    assert_eq!(moon_frame.stamp, ctx.stamp);
    assert!(moon_frame.position().abs_diff_eq(DVec3::new(0.0, 0.0, -8e6), 1e-3));
    assert!(ctx.updated.contains(&moon));
    assert!(!ctx.updated.contains(&planet));
}

#[test]
fn test_subtree_hysteresis_holds_above_threshold() {
    let mut graph = BodyGraph::default();
    let sys = graph.add_body(BodySpec::system("Sys"));
    let body = graph.add_body(fixed("B", sys, DVec3::ZERO, 10.0));
    graph.add_body(fixed("C", body, DVec3::new(1e3, 0.0, 0.0), 100.0));

    let view = ViewParams::default();
    let half_fov = view.half_fov();
    let radius = graph.body(body).unwrap().subtree_radius();
    let behind = |fraction: f64| {
        DMat4::from_translation(DVec3::Z * radius / (fraction * half_fov).sin())
    };
    let ahead = DMat4::from_translation(DVec3::NEG_Z * radius * 10.0);

    let frame = |graph: &mut BodyGraph, matrix: DMat4| {
        let ctx = graph.begin_frame(JD, view);
        graph.pre_update(body, matrix, &ctx);
        graph.body(body).unwrap().frame().subtree_visible
    };

    assert!(frame(&mut graph, ahead));
    assert!(frame(&mut graph, behind(0.4)), "held while above 0.3 of the half field of view");
    assert!(frame(&mut graph, behind(0.35)));
    assert!(!frame(&mut graph, behind(0.2)), "dropped below the threshold");
    assert!(!frame(&mut graph, behind(0.4)), "no hold without last frame's visibility");
}

#[test]
fn test_update_system_compacts_removed_entries() {
    let Solar { mut graph, sys, star, .. } = solar();
    let near = graph.add_body(fixed("Near", sys, DVec3::new(0.0, 0.0, -1e9), 1e6));
    let mid = graph.add_body(fixed("Mid", sys, DVec3::new(0.0, 0.0, -5e9), 1e6));
    let far = graph.add_body(fixed("Far", sys, DVec3::new(0.0, 0.0, -2e10), 1e6));

    graph.remove_body(star);
    let index = graph.body(sys).unwrap().system_index().unwrap();
    assert!(index.has_holes());
    assert!(index.slots() > index.entries().count());

    let mut observer = observer_at(&mut graph, sys, DVec3::ZERO);
    let ctx = observer.update(&mut graph, JD).unwrap();

    let index = graph.body(sys).unwrap().system_index().unwrap();
    assert!(!index.has_holes());
    assert_eq!(index.slots(), 3);
    assert_eq!(index.entries().collect::<Vec<_>>(), vec![far, mid, near]);
    assert!(index.entries().all(|id| graph.body(id).unwrap().frame().stamp == ctx.stamp));
}

#[test]
fn test_removed_reference_keeps_scene_in_place() {
    let Solar { mut graph, planet, .. } = solar();
    let moon = graph.add_body(fixed("M", planet, DVec3::new(4e8, 0.0, 0.0), 1.7e6));
    let mut observer = observer_at(&mut graph, moon, DVec3::new(0.0, 0.0, 3e6));
    observer.update(&mut graph, JD).unwrap();
    assert_eq!(observer.reference_body(&graph), Some(moon));
    let before = graph.body(planet).unwrap().frame().position();

    graph.remove_body(moon);
    observer.update(&mut graph, JD).unwrap();

    assert_eq!(observer.reference_body(&graph), Some(planet));
    assert_eq!(observer.switch_count(), 0);
    assert!(observer.position().abs_diff_eq(DVec3::new(4e8, 0.0, 3e6), 1e-3));
    let after = graph.body(planet).unwrap().frame().position();
    assert!((after - before).length() < 1e-3, "planet jumped {} m", (after - before).length());
}
