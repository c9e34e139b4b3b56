//! End-to-end properties of the tire core, driven through the public API the
//! way the lap simulator drives it.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use rstest::rstest;

use mf_tire::steady_state;
use mf_tire::{KinematicInput, ParameterSet, SlipCommand, Tire};

fn tire() -> Tire {
    Tire::new(ParameterSet::default()).unwrap()
}

fn input(fz: f32, kappa: f32, alpha: f32, vx: f32, dt: f32) -> KinematicInput {
    KinematicInput {
        fz,
        vx,
        vy: 0.0,
        omega: vx / ParameterSet::default().re,
        slip: SlipCommand::Direct { kappa, alpha },
        dt,
    }
}

#[rstest]
#[case(0.0)]
#[case(20.0)]
#[case(49.0)]
fn no_load_no_force_regardless_of_slip(#[case] fz: f32) {
    let mut t = tire();
    let out = t.step(&input(fz, 0.1, 0.2, 30.0, 0.01)).unwrap();
    assert_eq!(out.forces.fx, 0.0);
    assert_eq!(out.forces.fy, 0.0);
    assert_eq!(out.forces.mz, 0.0);
}

#[test]
fn nominal_load_zero_slip_zero_output() {
    let mut t = tire();
    let out = t.step(&input(4500.0, 0.0, 0.0, 30.0, 0.01)).unwrap();
    assert_abs_diff_eq!(out.forces.fx, 0.0, epsilon = 1.0);
    assert_abs_diff_eq!(out.forces.fy, 0.0, epsilon = 1.0);
    assert_abs_diff_eq!(out.forces.mz, 0.0, epsilon = 1.0);
}

#[test]
fn lateral_force_at_small_slip_angle_matches_closed_form() {
    // alpha = 0.05 rad at optimal temperature and zero wear; closed-form
    // value with the default coefficients is about -3316 N (see the
    // steady_state unit tests for the derivation). Drive through the lag
    // until the effective slip has settled.
    let mut t = tire();
    let mut last = None;
    for _ in 0..400 {
        last = Some(t.step(&input(4500.0, 0.0, 0.05, 30.0, 0.001)).unwrap());
    }
    let out = last.unwrap();
    // tire has warmed from ambient but grip stays floored at 0.5..1.0; pin
    // the comparison to the pure force law instead of chasing temperature
    let p = ParameterSet::default();
    let grip = steady_state::grip_scaling(&p, out.temperature, out.wear);
    let expected = steady_state::lateral_force(&p, 4500.0, 0.05, grip);
    assert_relative_eq!(out.forces.fy, expected, max_relative = 0.02);
    // and at optimal temperature the magnitude is the documented one
    assert_relative_eq!(
        steady_state::lateral_force(&p, 4500.0, 0.05, 1.0),
        -3316.0,
        max_relative = 0.01
    );
}

#[rstest]
#[case(0.05, 0.0)]
#[case(0.0, 0.08)]
#[case(0.06, 0.04)]
fn forces_are_odd_in_slip(#[case] kappa: f32, #[case] alpha: f32) {
    // fresh tires either way so temperature/wear are held identical
    let mut pos = tire();
    let mut neg = tire();
    let a = pos.step(&input(4500.0, kappa, alpha, 30.0, 0.01)).unwrap();
    let b = neg.step(&input(4500.0, -kappa, -alpha, 30.0, 0.01)).unwrap();
    assert_abs_diff_eq!(a.forces.fx, -b.forces.fx, epsilon = 0.5);
    assert_abs_diff_eq!(a.forces.fy, -b.forces.fy, epsilon = 0.5);
}

#[test]
fn combined_output_bounded_by_uncombined_peaks() {
    let p = ParameterSet::default();
    let mut t = tire();
    for _ in 0..200 {
        let out = t.step(&input(4500.0, 0.08, 0.1, 30.0, 0.01)).unwrap();
        let (kappa_eff, alpha_eff) = t.effective_slip();
        let grip = steady_state::grip_scaling(&p, out.temperature, out.wear);
        let fx0 = steady_state::longitudinal_force(&p, 4500.0, kappa_eff, grip);
        let fy0 = steady_state::lateral_force(&p, 4500.0, alpha_eff, grip);
        assert!(out.forces.fx.abs() <= fx0.abs() + 1.0);
        assert!(out.forces.fy.abs() <= fy0.abs() + 1.0);
    }
}

#[test]
fn wear_monotone_and_reset_restores_everything() {
    let mut t = tire();
    let mut prev_wear = 0.0f32;
    for i in 0..600 {
        // mix of braking, cornering and coasting
        let (kappa, alpha) = match i % 3 {
            0 => (-0.1, 0.0),
            1 => (0.0, 0.12),
            _ => (0.0, 0.0),
        };
        let out = t.step(&input(4500.0, kappa, alpha, 25.0, 0.01)).unwrap();
        assert!(out.wear >= prev_wear);
        prev_wear = out.wear;
    }
    assert!(prev_wear > 0.0);

    t.reset();
    assert_eq!(t.wear(), 0.0);
    assert_eq!(t.temperature(), ParameterSet::default().ambient_temp);
    assert_eq!(t.effective_slip(), (0.0, 0.0));
}

#[test]
fn temperature_cools_to_ambient_without_slip() {
    let mut t = tire();
    // heat up with aggressive combined slip
    for _ in 0..2000 {
        t.step(&input(4500.0, 0.1, 0.1, 40.0, 0.01)).unwrap();
    }
    let hot = t.temperature();
    assert!(hot > 40.0);

    // free rolling, no slip energy: pure cooling
    let mut prev = hot;
    for _ in 0..20_000 {
        let out = t.step(&input(4500.0, 0.0, 0.0, 30.0, 0.01)).unwrap();
        assert!(out.temperature <= prev + 1e-4);
        prev = out.temperature;
    }
    assert!((prev - ParameterSet::default().ambient_temp).abs() < 1.0);
}

#[test]
fn inverse_round_trip_for_feasible_request() {
    let mut t = tire();
    let sol = t
        .request_forces(4500.0, 800.0, -2000.0, Some(85.0))
        .unwrap();
    assert!(sol.feasible);
    // the solution reports the force it actually achieves at (kappa, alpha)
    assert_abs_diff_eq!(sol.fx, 800.0, epsilon = 150.0);
    assert_abs_diff_eq!(sol.fy, -2000.0, epsilon = 150.0);

    // re-evaluating the forward model at the returned slip reproduces the
    // request within the grid interpolation tolerance (the table evaluates
    // at its bucket-center temperature, 90 °C for this request)
    let p = ParameterSet::default();
    let grip = steady_state::grip_scaling(&p, 90.0, 0.0);
    let unc = steady_state::uncombined_forces(&p, 4500.0, sol.kappa, sol.alpha, 90.0, 0.0);
    let (fx, fy) = mf_tire::combined::allocate(
        &p,
        &mf_tire::CombinedSlipConfig::default(),
        &unc,
        sol.kappa,
        sol.alpha,
        4500.0,
        grip,
    );
    assert_abs_diff_eq!(fx, 800.0, epsilon = 200.0);
    assert_abs_diff_eq!(fy, -2000.0, epsilon = 200.0);
}

#[test]
fn overshooting_lateral_request_returns_true_peak() {
    let p = ParameterSet::default();
    let peak = steady_state::peak_lateral_force(&p, 4500.0, 1.0);

    let mut t = tire();
    let sol = t
        .request_forces(4500.0, 0.0, peak * 1.2, Some(p.temp_opt))
        .unwrap();
    assert!(!sol.feasible);
    assert_relative_eq!(sol.fy, peak, max_relative = 0.04);
}

#[test]
fn relaxation_step_response_settles_in_three_time_constants() {
    let p = ParameterSet::default();
    let vx = 30.0;
    let dt = 0.001;
    let target = 0.1f32;

    let sigma_alpha = p.p_ky1 * 4500.0 / p.c_fy;
    let tau = sigma_alpha / vx;
    let steps = (3.0 * tau / dt).ceil() as usize;

    let mut t = tire();
    let mut prev = 0.0f32;
    for _ in 0..steps {
        t.step(&input(4500.0, 0.0, target, vx, dt)).unwrap();
        let (_, alpha_eff) = t.effective_slip();
        assert!(alpha_eff >= prev - 1e-7);
        assert!(alpha_eff <= target + 1e-6);
        prev = alpha_eff;
    }
    assert!((target - prev) / target < 0.05);
}

#[test]
fn parameter_file_round_trip_through_tire() {
    let dir = std::env::temp_dir().join("mf_tire_param_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("softs.tire");
    std::fs::write(
        &path,
        "% soft compound\nF_z0 = 4200\ntemp_opt = 95\nlambda_muy = 1.3\n",
    )
    .unwrap();

    let t = Tire::from_file(&path).unwrap();
    assert_eq!(t.params().fz0, 4200.0);
    assert_eq!(t.params().temp_opt, 95.0);
    assert_eq!(t.params().lambda_muy, 1.3);
    // untouched defaults survive
    assert_eq!(t.params().p_cy1, 1.3);
}
