//! Runs one experiment of the standard catalogue and prints its time series.
//!
//! Usage: run_experiment [index] [seed]

use kalman_lab::experiment::ExperimentCatalogue;
use kalman_lab::runner::run_experiment;

fn main() -> Result<(), kalman_lab::Error> {
    let mut args = std::env::args().skip(1);
    let index = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    let seed = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);

    let catalogue = ExperimentCatalogue::standard();
    let experiment = catalogue.get(index)?;
    println!("{}\n{}\n", experiment.name, experiment.description);

    let result = run_experiment(experiment, seed)?;
    let bounds = result.sigma_bounds(2.);
    println!("{:>4} {:>9} {:>9} {:>9} {:>9} {:>9}", "t", "x_true", "z", "x_hat", "-2sigma", "+2sigma");
    for (step, (lower, upper)) in result.steps().iter().zip(bounds.iter()) {
        println!(
            "{:>4} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3}",
            step.t, step.x_true[0], step.z[0], step.x_hat[0], lower[0], upper[0]
        );
    }

    let summary = result.summary();
    println!("\nrmse estimate {:.3}", summary.rmse_estimate);
    if let Some(rmse) = summary.rmse_measurement {
        println!("rmse measurement {:.3}", rmse);
    }
    println!("within 2 sigma {:.1}%", 100. * summary.within_two_sigma);
    Ok(())
}
