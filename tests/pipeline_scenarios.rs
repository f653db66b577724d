use anyhow::Result;
use dragonfly::geom::region::Region2D;
use dragonfly::geom::segment::LineSegment2D;
use dragonfly::honeybee::HbModel;
use dragonfly::parameters::{HostWall, WindowParameter};
use dragonfly::{
    BoundaryCondition, Building, HoneybeeOptions, Location, Model, ObjectPerModel, Point, Point2, Polygon2D, Room2D,
    Story, Units,
};

const TOL: f64 = 0.01;

fn rect_room(id: &str, x: f64, y: f64, w: f64, h: f64) -> Result<Room2D> {
    Room2D::from_polygon(id, &Polygon2D::rectangle(Point2::new(x, y), w, h), 0., 3.)
}

fn l_shape(x: f64, y: f64) -> Polygon2D {
    Polygon2D::from_tuples(&[
        (x, y),
        (x + 20., y),
        (x + 20., y + 8.),
        (x + 8., y + 8.),
        (x + 8., y + 15.),
        (x, y + 15.),
    ])
}

fn campus() -> Result<Model> {
    let mut hall = Building::from_footprint("Hall", &[l_shape(3.5, -2.25)], &[4., 4., 4.], 0., TOL)?;
    hall.unique_stories[2].multiplier = 2;
    for story in &mut hall.unique_stories {
        for room in &mut story.room_2ds {
            room.set_outdoor_window_parameters(Some(WindowParameter::SimpleWindowRatio { window_ratio: 0.3 }));
        }
    }
    let annex = Building::from_footprint(
        "Annex",
        &[Polygon2D::rectangle(Point2::new(40., 0.), 12., 9.)],
        &[3.5],
        0.,
        TOL,
    )?;
    Model::new("Campus", vec![hall, annex], vec![], Units::Meters, TOL, 1.)
}

fn plan_vertices(model: &Model) -> Vec<Point2> {
    model
        .room_2ds()
        .flat_map(|r| r.floor_region().boundary.vertices().to_vec())
        .collect()
}

#[test]
fn test_adjacency_across_two_rectangles() -> Result<()> {
    let mut story = Story::new(
        "Level",
        vec![rect_room("Left", 0., 0., 10., 10.)?, rect_room("Right", 10., 0., 10., 10.)?],
        Some(3.),
        None,
    )?;
    story.solve_room_2d_adjacency(TOL, true)?;
    let left = story.room_2d("Left")?;
    let right = story.room_2d("Right")?;
    assert_eq!(left.boundary_conditions[1].adjacent_room(), Some("Right"));
    assert_eq!(right.boundary_conditions[3].adjacent_room(), Some("Left"));
    for room in [left, right] {
        let outdoors = room.boundary_conditions.iter().filter(|bc| bc.is_outdoors()).count();
        assert_eq!(outdoors, 3);
    }
    Ok(())
}

#[test]
fn test_small_room_join() -> Result<()> {
    let mut story = Story::new(
        "Level",
        vec![
            rect_room("Large", 0., 0., 10., 5.)?,
            rect_room("Medium", 0., 5., 9.8, 5.)?,
            rect_room("Closet", 9.8, 5., 0.2, 2.5)?,
        ],
        None,
        None,
    )?;
    story.join_small_room_2ds(1., true, TOL)?;
    assert_eq!(story.room_2ds.len(), 2);
    assert!((story.floor_area() - 99.5).abs() < TOL);
    assert!((story.room_2d("Medium")?.floor_area() - 49.5).abs() < TOL);
    Ok(())
}

#[test]
fn test_separate_top_bottom_keeps_floor_count() -> Result<()> {
    let square = Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.);
    let mut bldg = Building::from_footprint("Tower", &[square], &[4., 4.], 0., TOL)?;
    bldg.unique_stories[1].multiplier = 5;
    let before: u32 = bldg.unique_stories.iter().map(|s| s.multiplier).sum();
    let original: Vec<f64> = bldg.unique_stories.iter().map(|s| s.floor_height).collect();

    bldg.separate_top_bottom_floors();
    let after: u32 = bldg.unique_stories.iter().map(|s| s.multiplier).sum();
    assert_eq!(before, after);
    let mults: Vec<u32> = bldg.unique_stories.iter().map(|s| s.multiplier).collect();
    assert_eq!(mults, vec![1, 1, 3, 1]);
    let heights: Vec<f64> = bldg.unique_stories.iter().map(|s| s.floor_height).collect();
    // 4 + 4 * 4 is where the last repeat of the second story starts
    assert_eq!(heights, vec![0., 4., 8., 20.]);
    assert!(original.iter().all(|h| heights.contains(h)));
    assert!(bldg.unique_stories[0].room_2ds.iter().all(|r| r.is_ground_contact));
    assert!(bldg.unique_stories[3].room_2ds.iter().all(|r| r.is_top_exposed));
    Ok(())
}

#[test]
fn test_repeating_ratio_on_wall() -> Result<()> {
    let host = HostWall::new(Point::new(0., 0., 0.), Point::new(20., 0., 0.), 3.);
    let wp = WindowParameter::RepeatingWindowRatio {
        window_ratio: 0.4,
        window_height: 2.,
        sill_height: 0.8,
        horizontal_separation: 3.,
        vertical_separation: 0.,
    };
    let windows = wp.apply_uv(&host, TOL)?;
    let area: f64 = windows.iter().map(|w| w.area()).sum();
    assert!((area - 24.).abs() <= 0.24);
    for w in &windows {
        let (lo, hi) = w.bbox();
        assert!(lo.x > 0. && hi.x < 20. && lo.y > 0. && hi.y < 3.);
        assert!(hi.y - lo.y >= 1.);
    }
    Ok(())
}

#[test]
fn test_alley_walls_become_adiabatic() -> Result<()> {
    let mut buildings = vec![
        Building::from_footprint("West", &[Polygon2D::rectangle(Point2::new(0., 0.), 10., 10.)], &[3.], 0., TOL)?,
        Building::from_footprint("East", &[Polygon2D::rectangle(Point2::new(10.5, 0.), 10., 10.)], &[3.], 0., TOL)?,
    ];
    for bldg in &mut buildings {
        bldg.unique_stories[0].room_2ds[0]
            .set_outdoor_window_parameters(Some(WindowParameter::SimpleWindowRatio { window_ratio: 0.4 }));
    }
    Building::process_alleys(&mut buildings, 1., true, TOL)?;

    for (bldg, facing) in buildings.iter().zip([1, 3]) {
        let room = &bldg.unique_stories[0].room_2ds[0];
        for (i, bc) in room.boundary_conditions.iter().enumerate() {
            if i == facing {
                assert_eq!(*bc, BoundaryCondition::Adiabatic);
                assert!(room.window_parameters[i].is_none());
            } else {
                assert!(bc.is_outdoors());
                assert!(room.window_parameters[i].is_some());
            }
        }
    }
    Ok(())
}

#[test]
fn test_geojson_roundtrip_at_origin() -> Result<()> {
    let model = campus()?;
    let location = Location::new(42.36, -71.06);
    let origin = Point2::new(0., 0.);
    let dir = tempfile::tempdir()?;
    let path = model.to_geojson(&location, origin, dir.path(), None)?;

    let imported = Model::from_geojson(&path, Some(&location), origin, Units::Meters, TOL)?;
    assert_eq!(imported.buildings.len(), 2);
    for (src, dst) in model.buildings.iter().zip(&imported.buildings) {
        assert_eq!(src.identifier, dst.identifier);
        let expected = src.footprint(TOL);
        let found = dst.footprint(TOL);
        for v in expected.iter().flat_map(|r| r.boundary.vertices()) {
            let closest = found
                .iter()
                .flat_map(|r| r.boundary.vertices())
                .map(|p| ((p.x - v.x).powi(2) + (p.y - v.y).powi(2)).sqrt())
                .fold(f64::INFINITY, f64::min);
            assert!(closest < 1e-6, "vertex {:?} moved by {}", v, closest);
        }
    }
    Ok(())
}

#[test]
fn test_geojson_roundtrip_keeps_courtyard() -> Result<()> {
    let outer = Polygon2D::rectangle(Point2::new(-12., 6.), 30., 24.);
    let court = Polygon2D::rectangle(Point2::new(-2., 13.), 10., 8.);
    let cloister = Building::from_footprint_regions(
        "Cloister",
        &[Region2D::new(outer, vec![court.clone()])],
        &[3.5, 3.5],
        0.,
        TOL,
    )?;
    let model = Model::new("Abbey", vec![cloister], vec![], Units::Meters, TOL, 1.)?;
    let location = Location::new(42.36, -71.06);
    let origin = Point2::new(0., 0.);
    let dir = tempfile::tempdir()?;
    let path = model.to_geojson(&location, origin, dir.path(), None)?;

    let imported = Model::from_geojson(&path, Some(&location), origin, Units::Meters, TOL)?;
    assert!((imported.floor_area() - model.floor_area()).abs() < 1e-6);
    let found = imported.buildings[0].footprint(TOL);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].holes.len(), 1);
    for v in court.vertices() {
        let closest = found[0].holes[0]
            .vertices()
            .iter()
            .map(|p| ((p.x - v.x).powi(2) + (p.y - v.y).powi(2)).sqrt())
            .fold(f64::INFINITY, f64::min);
        assert!(closest < 1e-6, "courtyard vertex {:?} moved by {}", v, closest);
    }
    Ok(())
}

#[test]
fn test_duplicate_matches_source() -> Result<()> {
    let model = campus()?;
    assert_eq!(model.duplicate().to_dict(false)?, model.to_dict(false)?);
    Ok(())
}

#[test]
fn test_dict_roundtrip() -> Result<()> {
    let model = campus()?;
    let loaded = Model::from_dict(model.to_dict(false)?)?;
    assert_eq!(loaded, model);
    Ok(())
}

#[test]
fn test_unit_conversion_composes() -> Result<()> {
    let model = campus()?;
    let back = model.convert_to_units(Units::Feet).convert_to_units(Units::Meters);
    assert_eq!(back.units, Units::Meters);
    for (a, b) in plan_vertices(&model).iter().zip(plan_vertices(&back)) {
        assert!(a.is_equivalent(&b, 100. * TOL));
    }
    Ok(())
}

#[test]
fn test_intersected_rooms_share_equal_segments() -> Result<()> {
    let mut story = Story::new(
        "Level",
        vec![
            rect_room("Hall", 0., 0., 10., 20.)?,
            rect_room("RoomA", 10., 0., 10., 7.)?,
            rect_room("RoomB", 10., 7., 10., 13.)?,
        ],
        None,
        None,
    )?;
    story.solve_room_2d_adjacency(TOL, true)?;
    let segments: Vec<Vec<LineSegment2D>> = story.room_2ds.iter().map(|r| r.floor_segments()).collect();
    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            for a in &segments[i] {
                for b in &segments[j] {
                    if a.is_colinear_with(b, TOL) && a.overlap_length(b, TOL) > TOL {
                        assert!(a.is_reversed_equivalent(b, TOL), "{:?} overlaps {:?}", a, b);
                    }
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_lowering_preserves_floor_area() -> Result<()> {
    let model = campus()?;
    let options = HoneybeeOptions {
        object_per_model: ObjectPerModel::District,
        ..HoneybeeOptions::new()
    };
    let hb: Vec<HbModel> = model.to_honeybee(&options)?;
    assert_eq!(hb.len(), 1);
    let n_rooms = model.room_2ds().count() as f64;
    assert!((hb[0].floor_area() - model.floor_area()).abs() <= TOL * TOL * n_rooms);

    let expanded = model.to_honeybee(&HoneybeeOptions {
        object_per_model: ObjectPerModel::District,
        use_multiplier: false,
        ..HoneybeeOptions::new()
    })?;
    assert!((expanded[0].floor_area() - model.floor_area()).abs() <= TOL * TOL * n_rooms * 2.);
    Ok(())
}
