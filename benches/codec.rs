//! Wire codec benchmark suite.
//!
//! Measures encoding of outgoing operations and classification of
//! inbound frames, the two hot paths of a busy session.
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rosbridge_client::protocol::{self, CovarianceConfig, Pose};
use rosbridge_client::{GoalId, IncomingFrame, OutgoingOperation};
use serde_json::json;

// ============================================================================
// Fixtures
// ============================================================================

const MAP_SIDES: &[usize] = &[64, 256];

fn pose_text() -> String {
    json!({
        "op": "publish",
        "topic": "/robot_pose",
        "msg": {
            "header": { "frame_id": "map" },
            "pose": {
                "position": { "x": 1.25, "y": -3.5, "z": 0.0 },
                "orientation": { "x": 0.0, "y": 0.0, "z": 0.38, "w": 0.92 }
            }
        }
    })
    .to_string()
}

fn status_text(entries: usize) -> String {
    let list: Vec<_> = (0..entries)
        .map(|i| {
            json!({
                "goal_info": { "goal_id": { "uuid": vec![i as u8; 16] } },
                "status": 4
            })
        })
        .collect();
    json!({
        "op": "publish",
        "topic": "/navigate_to_pose/_action/status",
        "msg": { "status_list": list }
    })
    .to_string()
}

fn map_text(side: usize) -> String {
    let data: Vec<i8> = (0..side * side).map(|i| (i % 101) as i8).collect();
    json!({
        "op": "publish",
        "topic": "/map",
        "msg": {
            "info": {
                "resolution": 0.05,
                "width": side,
                "height": side,
                "origin": { "position": { "x": -10.0, "y": -10.0, "z": 0.0 } }
            },
            "data": data
        }
    })
    .to_string()
}

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    group.bench_function("move_command", |b| {
        b.iter(|| OutgoingOperation::move_command(black_box(0.4), black_box(0.1)).encode());
    });

    let covariance = CovarianceConfig::default();
    group.bench_function("initial_pose", |b| {
        b.iter(|| {
            OutgoingOperation::initial_pose("map", Pose::planar(1.0, 2.0, 0.0, 0.7), &covariance)
                .encode()
        });
    });

    let id = GoalId::generate();
    group.bench_function("navigate_to_pose", |b| {
        b.iter(|| {
            OutgoingOperation::navigate_to_pose(
                "/navigate_to_pose",
                "nav2_msgs/action/NavigateToPose",
                "map",
                id.clone(),
                black_box(2.0),
                black_box(1.0),
                0.0,
            )
            .encode()
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let pose = pose_text();
    group.bench_function("pose", |b| {
        b.iter(|| protocol::decode(black_box(&pose)));
    });

    let status = status_text(8);
    group.bench_function("status_8", |b| {
        b.iter(|| IncomingFrame::decode(black_box(&status)));
    });

    for &side in MAP_SIDES {
        let map = map_text(side);
        group.bench_with_input(BenchmarkId::new("map", side), &map, |b, text| {
            b.iter(|| IncomingFrame::decode(black_box(text)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
