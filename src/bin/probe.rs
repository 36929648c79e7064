use std::error::Error;
use std::process;

use burn::tensor::{Tensor, TensorData};
use burn_ndarray::{NdArray, NdArrayDevice};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vfuncs::net::mlp::{DEFAULT_HIDDEN, DEFAULT_STACK};
use vfuncs::{
    BaseVfunc, DeterministicVfunc, LstmValueNetConfig, MlpValueNetConfig,
    NormalizedDeterministicVfunc, ObservationSpace, Values, ValueNetwork,
};

type ProbeBackend = NdArray<f32>;

const DEFAULT_SEED: u64 = 0x5EED_0000_BA5E;

#[derive(Parser, Debug)]
#[command(
    about = "Run a freshly initialised value function on random observations",
    version,
    author
)]
struct ProbeArgs {
    /// Width of the flat observation vector.
    #[arg(long = "obs-dim", default_value_t = 4)]
    obs_dim: usize,
    /// Hidden width of the value network.
    #[arg(long, default_value_t = DEFAULT_HIDDEN)]
    hidden: usize,
    /// Number of hidden layers for the feed-forward network.
    #[arg(long, default_value_t = DEFAULT_STACK)]
    depth: usize,
    /// Use an LSTM value network and feed `[steps, batch, obs-dim]` sequences.
    #[arg(long)]
    recurrent: bool,
    /// Sequence length for recurrent networks.
    #[arg(long, default_value_t = 3)]
    steps: usize,
    /// Number of observations (or environments) per call.
    #[arg(long, default_value_t = 4)]
    batch: usize,
    /// Seed for the random observations.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Mean used to rescale feed-forward outputs.
    #[arg(long)]
    mean: Option<f32>,
    /// Std used to rescale feed-forward outputs.
    #[arg(long)]
    std: Option<f32>,
    /// Split each call across this many CPU replicas.
    #[arg(long = "replicas")]
    replicas: Option<usize>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = ProbeArgs::parse();
    if args.obs_dim == 0 || args.batch == 0 {
        return Err("obs-dim and batch must be positive".into());
    }
    let device = NdArrayDevice::Cpu;
    let space = ObservationSpace::boxed([args.obs_dim]);
    let mut rng = StdRng::seed_from_u64(args.seed);

    if args.recurrent {
        if args.mean.is_some() || args.std.is_some() {
            return Err("--mean/--std require a feed-forward network".into());
        }
        if args.steps == 0 {
            return Err("steps must be positive".into());
        }
        let net =
            LstmValueNetConfig::new(args.obs_dim, args.hidden).init::<ProbeBackend>(&device);
        let vfunc = build(&args, space, net, 1)?;
        let obs = random_obs(&mut rng, [args.steps, args.batch, args.obs_dim]);
        let output = vfunc.forward(obs, None, None)?;
        report(&output.values)?;
        if let Some(hs) = output.aux.hs() {
            println!(
                "hidden state: batch {} x hidden {}{}",
                hs.batch_size(),
                hs.hidden_size(),
                if hs.cell.is_some() { " (with cell)" } else { "" }
            );
        }
        return Ok(());
    }

    let net = MlpValueNetConfig::new(args.obs_dim)
        .with_hidden(args.hidden)
        .with_stack_depth(args.depth)
        .init::<ProbeBackend>(&device);
    let obs = random_obs(&mut rng, [args.batch, args.obs_dim]);

    if args.mean.is_some() || args.std.is_some() {
        if args.replicas.is_some() {
            println!("normalized value functions run on one device; ignoring --replicas");
        }
        let mut vfunc = NormalizedDeterministicVfunc::with_device(space, net, device)?;
        if let Some(std) = args.std {
            vfunc.set_std_scalar(std)?;
        }
        if let Some(mean) = args.mean {
            vfunc.set_mean_scalar(mean)?;
        }
        let raw = vfunc.raw(obs.clone());
        let values = vfunc.forward(obs);
        report(&Values::Batch(raw))?;
        println!("rescaled:");
        report(&Values::Batch(values))?;
        return Ok(());
    }

    let vfunc = build(&args, space, net, 0)?;
    let output = vfunc.forward(obs, None, None)?;
    report(&output.values)
}

fn build<N: ValueNetwork<ProbeBackend>>(
    args: &ProbeArgs,
    space: ObservationSpace,
    net: N,
    dim: usize,
) -> Result<DeterministicVfunc<ProbeBackend, N>, Box<dyn Error>> {
    let builder = DeterministicVfunc::builder(space, net).with_device(NdArrayDevice::Cpu);
    let Some(replicas) = args.replicas else {
        return Ok(builder.build()?);
    };
    let mut vfunc = builder
        .with_data_parallel(vec![NdArrayDevice::Cpu; replicas], dim)
        .build()?;
    vfunc.set_dp_run(true)?;
    println!(
        "data parallel over {replicas} replicas along dim {dim} (enabled: {})",
        vfunc.data_parallel()
    );
    Ok(vfunc)
}

fn random_obs<const D: usize>(rng: &mut StdRng, shape: [usize; D]) -> Tensor<ProbeBackend, D> {
    let len = shape.iter().product::<usize>();
    let values: Vec<f32> = (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    Tensor::from_data(TensorData::new(values, shape), &NdArrayDevice::Cpu)
}

fn report(values: &Values<ProbeBackend>) -> Result<(), Box<dyn Error>> {
    let dims = values.dims();
    println!("values shape: {dims:?}");
    let flat = values.to_vec()?;
    let row = dims.last().copied().unwrap_or(1).max(1);
    for (index, chunk) in flat.chunks(row).enumerate() {
        let line: Vec<String> = chunk.iter().map(|value| format!("{value:>9.4}")).collect();
        println!("  [{index:>3}] {}", line.join(" "));
    }
    Ok(())
}
