//! End-to-end processor behavior over RGBA float pixels.

use chroma_engine::{
    CdlTransform, Config, Context, Direction, DynamicPropertyKind, EnvMode,
    ExposureContrastStyle, ExposureContrastTransform, Interpolation, LogTransform,
    Lut3DTransform, LutLoader, MatrixTransform, Processor, Transform,
};

const EPSILON: f32 = 1e-5;

fn compile(t: &Transform, direction: Direction) -> Processor {
    let loader = LutLoader::new();
    let config = Config::new();
    let context = Context::new(EnvMode::None);
    Processor::compile_with(&loader, &config, &context, t, direction).unwrap()
}

#[test]
fn identity_matrix_is_bitwise_transparent() {
    let p = compile(
        &Transform::matrix(MatrixTransform::IDENTITY),
        Direction::Forward,
    );
    assert!(p.is_noop());
    assert_eq!(p.num_ops(), 0);

    let input = [0.1f32, 0.5, 0.9, 0.7];
    let mut px = input;
    p.apply_rgba(&mut px);
    assert_eq!(px, input);
}

#[test]
fn log10_round_trips_within_1e6() {
    let log = Transform::Log(LogTransform {
        base: 10.0,
        direction: Direction::Forward,
    });
    let fwd = compile(&log, Direction::Forward);
    let inv = compile(&log, Direction::Inverse);

    let input = [0.18f32, 0.5, 1.0, 1.0];
    let mut px = input;
    fwd.apply_rgba(&mut px);
    inv.apply_rgba(&mut px);
    for (got, want) in px.iter().zip(&input) {
        assert!((got - want).abs() < 1e-6, "{got} vs {want}");
    }

    // The paired chain is recognized and dropped entirely.
    let chain = Transform::group(vec![log.clone(), log.inverse()]);
    assert!(compile(&chain, Direction::Forward).is_noop());
}

#[test]
fn cdl_clamps_negatives_when_power_is_not_one() {
    let cdl = Transform::Cdl(CdlTransform {
        slope: [1.0; 3],
        offset: [-0.2; 3],
        power: [1.1; 3],
        saturation: 1.0,
        direction: Direction::Forward,
    });
    let p = compile(&cdl, Direction::Forward);

    let mut px = [0.1f32, 0.1, 0.1, 1.0];
    p.apply_rgba(&mut px);
    assert_eq!(px[0], 0.0);
    assert_eq!(px[1], 0.0);
    assert_eq!(px[2], 0.0);
    assert_eq!(px[3], 1.0);
}

#[test]
fn tetrahedral_ties_take_the_sorted_rgb_path() {
    // Side-2 cube with distinct corners; blue varies fastest.
    let corners: [[f32; 3]; 8] = [
        [0.00, 0.05, 0.10], // 000
        [0.10, 0.20, 0.90], // 001
        [0.15, 0.80, 0.25], // 010
        [0.20, 0.85, 0.95], // 011
        [0.70, 0.10, 0.30], // 100
        [0.75, 0.15, 0.85], // 101
        [0.80, 0.90, 0.35], // 110
        [1.00, 0.95, 1.00], // 111
    ];
    let t = Transform::Lut3D(Lut3DTransform {
        size: 2,
        data: corners.to_vec(),
        interpolation: Interpolation::Tetrahedral,
        direction: Direction::Forward,
    });
    let p = compile(&t, Direction::Forward);

    let mut px = [0.5f32, 0.5, 0.5, 1.0];
    p.apply_rgba(&mut px);

    // All fractions tie, so the first branch (fractions sorted R, G, B)
    // runs: walk 000 -> 100 -> 110 -> 111 with weight 0.5 per edge.
    let (c000, c100, c110, c111) = (corners[0], corners[4], corners[6], corners[7]);
    for i in 0..3 {
        let want = c000[i]
            + 0.5 * (c100[i] - c000[i])
            + 0.5 * (c110[i] - c100[i])
            + 0.5 * (c111[i] - c110[i]);
        assert!((px[i] - want).abs() < EPSILON, "channel {i}: {} vs {want}", px[i]);
    }
    assert_eq!(px[3], 1.0);
}

#[test]
fn dynamic_exposure_rebinds_after_compile() {
    let t = Transform::ExposureContrast(ExposureContrastTransform {
        dynamic_exposure: true,
        ..ExposureContrastTransform::neutral(ExposureContrastStyle::Linear)
    });
    let p = compile(&t, Direction::Forward);
    assert!(p.is_dynamic());
    assert!(!p.is_noop());

    let mut px = [0.18f32, 0.18, 0.18, 1.0];
    p.apply_rgba(&mut px);
    for v in &px[..3] {
        assert!((v - 0.18).abs() < EPSILON);
    }

    let exposure = p.dynamic_property(DynamicPropertyKind::Exposure).unwrap();
    exposure.set_double(1.0).unwrap();

    let mut px = [0.18f32, 0.18, 0.18, 1.0];
    p.apply_rgba(&mut px);
    for v in &px[..3] {
        assert!((v - 0.36).abs() < EPSILON);
    }
    assert_eq!(px[3], 1.0);
}

#[test]
fn inverse_lut3d_handles_out_of_gamut_input() {
    // 33^3 identity with the white corner pushed past 1.
    let size = 33;
    let mut data = Vec::with_capacity(size * size * size);
    for r in 0..size {
        for g in 0..size {
            for b in 0..size {
                let s = (size - 1) as f32;
                data.push([r as f32 / s, g as f32 / s, b as f32 / s]);
            }
        }
    }
    let last = data.len() - 1;
    data[last] = [1.2, 1.2, 1.2];

    let cube = Transform::Lut3D(Lut3DTransform {
        size,
        data,
        interpolation: Interpolation::Tetrahedral,
        direction: Direction::Forward,
    });
    let forward = compile(&cube, Direction::Forward);
    let inverse = compile(&cube, Direction::Inverse);

    let mut px = [1.1f32, 1.1, 1.1, 1.0];
    inverse.apply_rgba(&mut px);
    for v in &px[..3] {
        assert!(v.is_finite());
        assert!((0.0..=1.0).contains(v), "inverse left the domain: {v}");
    }

    forward.apply_rgba(&mut px);
    for v in &px[..3] {
        assert!((v - 1.1).abs() < 1e-3, "round trip drifted: {v}");
    }
}

#[test]
fn no_crosstalk_means_alpha_cannot_affect_rgb() {
    let t = Transform::group(vec![
        Transform::Log(LogTransform {
            base: 2.0,
            direction: Direction::Forward,
        }),
        Transform::matrix({
            let mut m = MatrixTransform::IDENTITY;
            m[0] = 1.3;
            m[5] = 0.7;
            m
        }),
    ]);
    let p = compile(&t, Direction::Forward);
    assert!(!p.has_channel_crosstalk());

    let mut a = [0.4f32, 0.5, 0.6, 1.0];
    let mut b = [0.4f32, 0.5, 0.6, 0.25];
    p.apply_rgba(&mut a);
    p.apply_rgba(&mut b);
    assert_eq!(&a[..3], &b[..3]);
}

#[test]
fn mixed_chain_inverse_round_trips() {
    let t = Transform::group(vec![
        Transform::Cdl(CdlTransform {
            slope: [1.1, 0.95, 1.02],
            offset: [0.02; 3],
            power: [1.0; 3],
            saturation: 0.85,
            direction: Direction::Forward,
        }),
        Transform::matrix({
            let mut m = MatrixTransform::IDENTITY;
            m[0] = 0.9;
            m[1] = 0.1;
            m
        }),
    ]);
    let fwd = compile(&t, Direction::Forward);
    let inv = compile(&t, Direction::Inverse);

    let input = [0.25f32, 0.5, 0.75, 1.0];
    let mut px = input;
    fwd.apply_rgba(&mut px);
    inv.apply_rgba(&mut px);
    for (got, want) in px.iter().zip(&input) {
        assert!((got - want).abs() < 1e-4, "{got} vs {want}");
    }
}
