use approx::assert_relative_eq;
use sonarcore::processing::{PipelineConfig, PipelineContext, EVICTION_COUNT, TRIGGER_PERIOD};
use sonarcore::sonar_interface::{AltitudeReading, MosaicFrame, PoseUpdate, SonarFrame};
use sonarcore::store::{CsvFrameStore, MemoryFrameStore};
use sonarcore::SonarGeometry;

const ALTITUDE: f64 = 5.0;

fn geometry() -> SonarGeometry {
    SonarGeometry {
        alpha: 50f64.to_radians(),
        theta: 30f64.to_radians(),
        res: 1.0,
        n_samples: 10,
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        geometry: geometry(),
        ..Default::default()
    }
}

/// Straight eastward track at constant altitude: swath `i` is captured at (i, 0).
fn survey(ctx: &mut PipelineContext, swaths: usize) {
    ctx.on_altitude(AltitudeReading::new(ALTITUDE));
    for i in 0..swaths {
        ctx.on_pose(&PoseUpdate::new([i as f64, 0.0], [1.0, 0.0, 0.0, 0.0]));
        let right: Vec<u8> = (0..10u8).map(|s| 250 - 7 * s).collect();
        let left: Vec<u8> = (0..10u8).map(|s| 180 - 5 * s).collect();
        ctx.on_sonar(&SonarFrame::new(right, left)).unwrap();
        if i % 7 == 3 {
            // dropouts must not disturb the retained altitude
            ctx.on_altitude(AltitudeReading::new(-1.0));
        }
    }
}

fn assert_extent(frame: &MosaicFrame, lo_u: f64, hi_u: f64) {
    let half_width = 9.0 * geometry().ground_resolution(ALTITUDE);
    let (min_u, max_u, min_v, max_v) = frame.scatter.extent().unwrap();
    assert_relative_eq!(min_u, lo_u, epsilon = 1e-9);
    assert_relative_eq!(max_u, hi_u, epsilon = 1e-9);
    assert_relative_eq!(min_v, -half_width, epsilon = 1e-9);
    assert_relative_eq!(max_v, half_width, epsilon = 1e-9);
}

#[test]
fn straight_track_yields_one_tile_after_150_swaths() {
    let store = MemoryFrameStore::new();
    let mut ctx = PipelineContext::new(&config(), Box::new(store.clone())).unwrap();
    survey(&mut ctx, 150);
    assert_eq!(ctx.drain(), 150);

    let frames = store.frames();
    assert_eq!(frames.len(), 1);
    let frame = &frames[0];
    assert_eq!(frame.index, 1);
    assert_eq!(frame.swath_count, TRIGGER_PERIOD);
    assert_eq!(frame.scatter.len(), TRIGGER_PERIOD * 2 * 10);
    assert_extent(frame, -99.0, 0.0);

    let linear = frame.linear.as_ref().unwrap();
    assert_eq!(linear.e_axis.len(), 99);
    assert!(linear.defined_cells() > 0);
    let smoothing = frame.smoothing.as_ref().unwrap();
    assert_eq!(smoothing.filtered.len(), frame.scatter.len());

    let metrics = ctx.metrics();
    assert_eq!(metrics.swaths_processed, 150);
    assert_eq!(metrics.mosaics_built, 1);
    assert_eq!(metrics.smoothing_failures, 0);
}

#[test]
fn overlapping_tiles_share_half_the_window() {
    let store = MemoryFrameStore::new();
    let mut ctx = PipelineContext::new(&config(), Box::new(store.clone())).unwrap();
    survey(&mut ctx, 150);
    ctx.drain();
    assert_eq!(ctx.buffered(), TRIGGER_PERIOD);

    let outcome = ctx.tick().mosaic.unwrap();
    assert_eq!(outcome.index, Some(2));
    assert_eq!(outcome.buffer_len, TRIGGER_PERIOD - EVICTION_COUNT);

    let frames = store.frames();
    assert_eq!(frames.len(), 2);
    assert_extent(&frames[1], -149.0, -50.0);
}

#[test]
fn buffer_never_reaches_twice_the_trigger_period() {
    let mut ctx = PipelineContext::new(&config(), Box::new(MemoryFrameStore::new())).unwrap();
    survey(&mut ctx, 400);
    let mut peak = 0;
    while ctx.pending() > 0 {
        let outcome = ctx.tick();
        if let Some(mosaic) = outcome.mosaic {
            assert_eq!(mosaic.buffer_len, TRIGGER_PERIOD - EVICTION_COUNT);
        }
        peak = peak.max(ctx.buffered());
    }
    assert!(peak <= TRIGGER_PERIOD);
    assert_eq!(ctx.metrics().mosaics_built, 6);
}

#[test]
fn csv_store_writes_every_product() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFrameStore::new(dir.path().join("tiles")).unwrap();
    let mut ctx = PipelineContext::new(&config(), Box::new(store)).unwrap();
    survey(&mut ctx, TRIGGER_PERIOD + 1);
    ctx.drain();

    let tiles = dir.path().join("tiles");
    for name in [
        "raw_1.csv",
        "linear_1.csv",
        "knn_1.csv",
        "knn_filtered_1.csv",
        "frame_1.json",
    ] {
        assert!(tiles.join(name).exists(), "missing {}", name);
    }
    let raw = std::fs::read_to_string(tiles.join("raw_1.csv")).unwrap();
    assert_eq!(raw.lines().count(), 1 + TRIGGER_PERIOD * 2 * 10);
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tiles.join("frame_1.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["swath_count"], TRIGGER_PERIOD);
}
