//! Writes synthetic air / water / glass results in the simulator's layout:
//! `<dir>/<medium>/<medium>_result.jnii` plus `<medium>_simulation.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fluence_volume::simulation::{
    Domain, Forward, Medium, Session, SessionMetadata, SimulationConfig,
};
use fluence_volume::{Compression, ContainerRecord, FluenceVolume, payload};
use ndarray::Array4;

/// Write synthetic air, water and glass fluence results.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Output directory, one sub-directory per medium
    #[arg(default_value = "sample")]
    dir: PathBuf,
}

const DIM: usize = 40;
const GATES: usize = 5;

struct MediumSpec {
    name: &'static str,
    mua: f64,
    mus: f64,
    g: Option<f64>,
    n: f64,
    seed: u64,
}

const MEDIA: [MediumSpec; 3] = [
    MediumSpec { name: "air", mua: 0.0, mus: 0.0, g: Some(1.0), n: 1.0, seed: 12346 },
    MediumSpec { name: "water", mua: 0.0004, mus: 0.01, g: Some(0.9), n: 1.33, seed: 12347 },
    MediumSpec { name: "glass", mua: 0.0001, mus: 0.0, g: None, n: 1.52, seed: 12348 },
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// An expanding shell of photons launched at the centre of the `z = 0` face.
/// Denser media slow the front down and attenuate it.
fn synthesize(medium: &MediumSpec) -> FluenceVolume {
    let mut rng = SimpleRng::new(medium.seed);
    let noise: Vec<f32> = (0..DIM * DIM * DIM * GATES).map(|_| rng.next_f32()).collect();
    let c = DIM as f32 / 2.0;
    let speed = 8.0 / medium.n as f32;
    let decay = (1.0 + 200.0 * (medium.mua + medium.mus) as f32).recip();

    let data = Array4::from_shape_fn((DIM, DIM, DIM, GATES), |(x, y, z, t)| {
        let r = ((x as f32 - c).powi(2) + (y as f32 - c).powi(2) + (z as f32).powi(2)).sqrt();
        let front = speed * (t as f32 + 1.0);
        let shell = (-(r - front).powi(2) / 18.0).exp();
        let idx = ((x * DIM + y) * DIM + z) * GATES + t;
        let jitter = 0.9 + 0.2 * noise[idx];
        shell * decay.powi(t as i32 + 1) * jitter / (1.0 + r)
    });
    FluenceVolume::new(data)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let root = Args::parse().dir;
    let forward = Forward {
        t0: 0.0,
        t1: 5.0e-9,
        dt: 1.0e-9,
    };

    for medium in &MEDIA {
        let dir = root.join(medium.name);
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        let media = vec![
            Medium {
                mua: Some(0.0),
                mus: Some(0.0),
                g: Some(1.0),
                n: Some(1.0),
            },
            Medium {
                mua: Some(medium.mua),
                mus: Some(medium.mus),
                g: medium.g,
                n: Some(medium.n),
            },
        ];
        let config = SimulationConfig {
            domain: Some(Domain { media }),
            session: Some(Session {
                photons: Some(1000),
                id: Some(medium.name.to_string()),
            }),
            forward: Some(forward),
        };
        let config_path = dir.join(format!("{}_simulation.json", medium.name));
        std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)
            .with_context(|| format!("writing {}", config_path.display()))?;

        let volume = synthesize(medium);
        let mut record = ContainerRecord::new(payload::encode(&volume, Compression::Zlib)?);
        record.metadata = SessionMetadata {
            forward: Some(forward),
            ..SessionMetadata::default()
        };
        let path = dir.join(format!("{}_result.jnii", medium.name));
        record.write(&path)?;
        log::info!("wrote {} {:?}", path.display(), volume.shape());
    }
    Ok(())
}
