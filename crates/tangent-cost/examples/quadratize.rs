use argh::FromArgs;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;

use tangent_autodiff::{DerivativeOptions, DualNum};
use tangent_cost::{Cost, CostLinearizer};

#[derive(FromArgs)]
/// Quadraticize a stage cost around random reference points
struct Args {
    /// number of reference points
    #[argh(option, short = 'b', default = "4")]
    batch: usize,

    /// size of the state
    #[argh(option, short = 'n', default = "3")]
    state_dim: usize,

    /// size of the input
    #[argh(option, short = 'm', default = "2")]
    input_dim: usize,

    /// run the forward passes sequentially
    #[argh(switch)]
    sequential: bool,
}

/// Tracking cost with a soft obstacle at the origin and a smooth input penalty.
struct ObstacleCost {
    weight: f64,
}

impl Cost<f64> for ObstacleCost {
    fn cost<D: DualNum<f64> + Copy>(&self, state: ArrayView2<D>, input: ArrayView2<D>) -> Array1<D> {
        let weight = D::from(self.weight);
        let distance = state.mapv(|x| x * x).sum_axis(Axis(1));
        let obstacle = distance.mapv(|d| (-d).exp() * weight);
        let effort = input
            .mapv(|u| (u * D::from(2.0)).tanh().powi(2))
            .sum_axis(Axis(1));
        distance + obstacle + effort
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut rng = rand::rng();
    let state = Array2::from_shape_fn((args.batch, args.state_dim), |_| rng.random_range(-1.0..1.0));
    let input = Array2::from_shape_fn((args.batch, args.input_dim), |_| rng.random_range(-1.0..1.0));

    let options = DerivativeOptions::default().with_vectorize(!args.sequential);
    let mut linearizer = CostLinearizer::new(ObstacleCost { weight: 5.0 }).with_options(options);

    let value = linearizer.evaluate(&state, &input)?;
    log::info!("cost at the reference points: {}", value);

    linearizer.set_reference_point(None, None)?;

    let now = std::time::Instant::now();
    let expansion = linearizer.expansion()?;
    log::info!("expansion computed in {:?}", now.elapsed());

    for b in 0..args.batch {
        println!("reference point #{}", b);
        println!("  x = {}", state.row(b));
        println!("  u = {}", input.row(b));
        println!("  cx = {}", expansion.cx.row(b));
        println!("  cu = {}", expansion.cu.row(b));
        println!("  cxx =\n{}", expansion.cxx.index_axis(Axis(0), b));
        println!("  cxu =\n{}", expansion.cxu.index_axis(Axis(0), b));
        println!("  cuu =\n{}", expansion.cuu.index_axis(Axis(0), b));
        println!("  c = {}", expansion.c[b]);
    }

    Ok(())
}
