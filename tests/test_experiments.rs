//! Test the experiment catalogue, parameter overrides and JSON loading.

use kalman_lab::experiment::{ExperimentCatalogue, FilterOverrides, MatrixSpec, VectorSpec};
use kalman_lab::runner::run_experiment;
use kalman_lab::Error;

const TWO_STATE_JSON: &str = r#"[
    {
        "name": "position and velocity",
        "description": "Position observed, velocity inferred.",
        "params": {
            "F": [[1.0, 1.0], [0.0, 1.0]],
            "H": [[1.0, 0.0]],
            "Q": [[0.01, 0.0], [0.0, 0.01]],
            "R": 0.25,
            "x0_hat": [0.0, 0.0],
            "P0_hat": [[10.0, 0.0], [0.0, 10.0]],
            "num_steps": 50
        },
        "true_system": {
            "initial_true_state": [0.0, 1.0],
            "true_F": [[1.0, 1.0], [0.0, 1.0]],
            "true_Q_stddev": [0.1, 0.1],
            "true_H": [[1.0, 0.0]],
            "true_R_stddev": 0.5
        }
    }
]"#;

fn expect_invalid_parameter<T: std::fmt::Debug>(res: Result<T, Error>) {
    match res {
        Err(Error::InvalidParameter(_)) => {}
        other => panic!("expected InvalidParameter, got {:?}", other),
    }
}

#[test]
fn test_standard_catalogue() {
    let catalogue = ExperimentCatalogue::standard();
    assert_eq!(catalogue.len(), 5);
    assert!(!catalogue.is_empty());

    let q: Vec<_> = catalogue.iter().map(|e| e.params.Q.clone()).collect();
    let r: Vec<_> = catalogue.iter().map(|e| e.params.R.clone()).collect();
    let scalars = |v: &[f64]| v.iter().map(|x| MatrixSpec::Scalar(*x)).collect::<Vec<_>>();
    assert_eq!(q, scalars(&[0.01, 0.0001, 1.0, 0.01, 0.01]));
    assert_eq!(r, scalars(&[0.25, 0.25, 0.25, 0.01, 5.0]));

    for experiment in catalogue.iter() {
        experiment.validate().unwrap();
        assert_eq!(experiment.params.num_steps, 100);
        assert_eq!(experiment.true_system.initial_true_state, VectorSpec::Scalar(10.));
        assert!(!experiment.description.is_empty());
    }
}

#[test]
fn test_lookup() {
    let catalogue = ExperimentCatalogue::standard();
    let names = catalogue.names();
    assert_eq!(names.len(), 5);

    let by_name = catalogue.by_name(names[3]).unwrap();
    assert_eq!(by_name, catalogue.get(3).unwrap());

    match catalogue.get(5) {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
    match catalogue.by_name("no such experiment") {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_overrides_applied() {
    let catalogue = ExperimentCatalogue::standard();
    let base = catalogue.get(0).unwrap();

    let mut overrides = FilterOverrides::default();
    overrides.set("Q", " 0.5 ").unwrap();
    overrides.set("num_steps", "20").unwrap();
    let edited = base.with_overrides(&overrides).unwrap();

    assert_eq!(edited.params.Q, MatrixSpec::Scalar(0.5));
    assert_eq!(edited.params.num_steps, 20);
    assert_eq!(edited.params.R, base.params.R);
    assert_eq!(edited.name, base.name);

    let result = run_experiment(&edited, 1).unwrap();
    assert_eq!(result.len(), 20);

    // The catalogue itself is unchanged
    assert_eq!(catalogue.get(0).unwrap().params.num_steps, 100);
}

#[test]
fn test_overrides_rejected() {
    let catalogue = ExperimentCatalogue::standard();
    let base = catalogue.get(0).unwrap();

    let mut overrides = FilterOverrides::default();
    expect_invalid_parameter(overrides.set("Q", "abc"));
    expect_invalid_parameter(overrides.set("num_steps", "2.5"));
    expect_invalid_parameter(overrides.set("G", "1"));

    for (key, value) in [("num_steps", "0"), ("num_steps", "-3"), ("Q", "-0.1"), ("R", "-1"), ("P0_hat", "-2")].iter() {
        let mut overrides = FilterOverrides::default();
        overrides.set(key, value).unwrap();
        expect_invalid_parameter(base.with_overrides(&overrides));
    }
}

#[test]
fn test_non_finite_overrides_rejected() {
    let catalogue = ExperimentCatalogue::standard();
    let base = catalogue.get(0).unwrap();

    for (key, value) in [("F", "inf"), ("H", "-inf"), ("Q", "NaN"), ("x0_hat", "inf"), ("P0_hat", "NaN")].iter() {
        let mut overrides = FilterOverrides::default();
        overrides.set(key, value).unwrap();
        expect_invalid_parameter(base.with_overrides(&overrides));
    }

    let mut nan_diagonal = base.params.clone();
    nan_diagonal.R = MatrixSpec::Rows(vec![vec![f64::NAN]]);
    expect_invalid_parameter(nan_diagonal.validate());
}

#[test]
fn test_load_json() {
    let catalogue = ExperimentCatalogue::from_json(TWO_STATE_JSON).unwrap();
    assert_eq!(catalogue.names(), vec!["position and velocity"]);

    let experiment = catalogue.by_name("position and velocity").unwrap();
    let result = run_experiment(experiment, 3).unwrap();
    assert_eq!(result.len(), 50);
    let last = result.final_state().unwrap();
    assert_eq!(last.x_hat.nrows(), 2);
    assert_eq!(last.P.shape(), (2, 2));
    assert_eq!(last.gain.shape(), (2, 1));
}

#[test]
fn test_load_json_rejected() {
    expect_invalid_parameter(ExperimentCatalogue::from_json("{ not json"));

    // Filter has two states, true system one
    let mismatched = TWO_STATE_JSON
        .replace(r#""initial_true_state": [0.0, 1.0]"#, r#""initial_true_state": 0.0"#)
        .replace(r#""true_F": [[1.0, 1.0], [0.0, 1.0]]"#, r#""true_F": 1.0"#)
        .replace(r#""true_Q_stddev": [0.1, 0.1]"#, r#""true_Q_stddev": 0.1"#)
        .replace(r#""true_H": [[1.0, 0.0]]"#, r#""true_H": 1.0"#);
    expect_invalid_parameter(ExperimentCatalogue::from_json(&mismatched));

    let ragged = TWO_STATE_JSON.replace("[[10.0, 0.0], [0.0, 10.0]]", "[[10.0, 0.0], [0.0]]");
    expect_invalid_parameter(ExperimentCatalogue::from_json(&ragged));

    let duplicated = format!(
        "[{0}, {0}]",
        TWO_STATE_JSON.trim().trim_start_matches('[').trim_end_matches(']')
    );
    expect_invalid_parameter(ExperimentCatalogue::from_json(&duplicated));
}
