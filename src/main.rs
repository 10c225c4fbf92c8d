use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use fluence_volume::{
    ColorMap, DatasetAggregator, DatasetEntry, DatasetLoader, Interpolation, normalizer, render,
    report::DatasetReport,
};

/// Decode JNIfTI fluence results and render them on a shared per-gate scale.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory the PNG images are written to
    #[arg(long, default_value = "visualize")]
    out: PathBuf,

    /// Colour map: hot or gray
    #[arg(long, default_value = "hot")]
    colormap: ColorMap,

    /// Magnification applied to every slice
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..=64))]
    scale: u32,

    /// Number of leading time gates to show
    #[arg(long, default_value_t = 5)]
    gates: usize,

    /// Bilinear instead of nearest-neighbour magnification
    #[arg(long)]
    smooth: bool,

    /// `LABEL=PATH` pairs, bare `.jnii` paths or directories of results
    #[arg(required = true, value_name = "LABEL=PATH | DIR")]
    sources: Vec<String>,
}

impl Args {
    fn render_options(&self) -> render::RenderOptions {
        render::RenderOptions {
            colormap: self.colormap,
            pixel_scale: self.scale,
            max_gates: self.gates,
            interpolation: if self.smooth {
                Interpolation::Bilinear
            } else {
                Interpolation::Nearest
            },
            ..Default::default()
        }
    }
}

/// Decode every source in command-line order; a dataset that fails is logged
/// and left out.
fn load(sources: &[String]) -> Result<DatasetAggregator> {
    let mut pairs: Vec<(String, PathBuf)> = Vec::new();
    let mut results = Vec::new();
    for source in sources {
        match source.split_once('=') {
            Some((label, path)) => pairs.push((label.to_string(), PathBuf::from(path))),
            None if Path::new(source).is_dir() => {
                results.extend(DatasetLoader::load_from_paths(&pairs));
                pairs.clear();
                results.extend(DatasetLoader::load_from_directory(source)?);
            }
            None => {
                let path = PathBuf::from(source);
                pairs.push((DatasetLoader::label_for(&path), path));
            }
        }
    }
    results.extend(DatasetLoader::load_from_paths(&pairs));

    let mut datasets = DatasetAggregator::new();
    for result in results {
        match result {
            Ok(entry) => {
                if let Err(e) = datasets.insert(entry) {
                    log::error!("{e}");
                }
            }
            Err(e) => log::error!("failed to load dataset: {e}"),
        }
    }
    if datasets.is_empty() {
        bail!("no dataset could be loaded");
    }
    Ok(datasets)
}

fn render_dataset(
    entry: &DatasetEntry,
    ranges: Option<&[normalizer::GateRange]>,
    options: &render::RenderOptions,
    out_dir: &Path,
) -> Result<PathBuf> {
    let image = render::gate_strip(entry, ranges, options)?;
    let path = out_dir.join(format!("{}_fluence_map.png", entry.label.to_lowercase()));
    render::save(&image, &path)?;
    Ok(path)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = args.render_options();
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let datasets = load(&args.sources)?;

    // A shared scale only makes sense with something to compare against.
    let ranges = if datasets.len() >= 2 {
        let ranges = normalizer::compute_gate_ranges(datasets.all())
            .context("computing shared gate ranges")?;
        for range in &ranges {
            log::info!(
                "gate {} range {:.6} .. {:.6}",
                range.gate_index + 1,
                range.min,
                range.max
            );
        }
        Some(ranges)
    } else {
        None
    };

    let mut written = Vec::new();
    for entry in datasets.all() {
        match render_dataset(entry, ranges.as_deref(), &options, &args.out) {
            Ok(path) => written.push(path),
            Err(e) => log::error!("rendering '{}' failed: {e:#}", entry.label),
        }
        match DatasetReport::build(entry) {
            Ok(report) => report.log(),
            Err(e) => log::error!("report for '{}' failed: {e}", entry.label),
        }
    }

    if let Some(ranges) = &ranges {
        let grid = render::comparison_grid(datasets.all(), ranges, &options)?;
        let path = args.out.join("material_comparison.png");
        render::save(&grid, &path)?;
        written.push(path);
    }

    log::info!("wrote {} image(s) to {}", written.len(), args.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_render_options() {
        let args = Args::try_parse_from([
            "fluence-volume",
            "--colormap",
            "gray",
            "--scale",
            "2",
            "--gates",
            "3",
            "--smooth",
            "Air=air/air_result.jnii",
            "results",
        ])
        .unwrap();
        let options = args.render_options();
        assert_eq!(options.colormap, ColorMap::Gray);
        assert_eq!(options.pixel_scale, 2);
        assert_eq!(options.max_gates, 3);
        assert_eq!(options.interpolation, Interpolation::Bilinear);
        assert_eq!(args.out, PathBuf::from("visualize"));
        assert_eq!(args.sources, ["Air=air/air_result.jnii", "results"]);
    }

    #[test]
    fn rejects_missing_sources_and_bad_values() {
        assert!(Args::try_parse_from(["fluence-volume"]).is_err());
        assert!(Args::try_parse_from(["fluence-volume", "--colormap", "jet", "a.jnii"]).is_err());
        assert!(Args::try_parse_from(["fluence-volume", "--scale", "0", "a.jnii"]).is_err());
        assert!(Args::try_parse_from(["fluence-volume", "--scale", "100000", "a.jnii"]).is_err());
    }
}
