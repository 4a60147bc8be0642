use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};
use wmigen::api::{
    build_benchmark, build_density, datasets, generate_queries, model_fit, parse_features,
    sample_split, setup,
    BoundingBox, DegeneratePolicy, Density, Det, Domain, MspnParams, QueryParams, ReluNet,
    SatOracle, SmtProcessOracle, SpnNode, Suite, Term, VerifyParams, Z3Cfg, Z3Oracle,
};

mod data;
mod provenance;

use data::TableFormat;
use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "wmigen")]
#[command(about = "Weighted model integration benchmark generator")]
struct Cmd {
    /// -v for debug logs, -vv for trace; RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Random hyperplane queries over a box, written as a density
    Queries {
        #[arg(long, default_value_t = 3)]
        dim: usize,
        #[arg(long, default_value_t = -1.0, allow_hyphen_values = true)]
        lo: f64,
        #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
        hi: f64,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, default_value_t = 666)]
        seed: u64,
        #[command(flatten)]
        oracle: OracleArgs,
        #[arg(long)]
        out: PathBuf,
    },
    /// MSPN benchmarks from learned structures
    Mspn {
        #[arg(long)]
        min_inst_slices: usize,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(long, default_value_t = 666)]
        seed: u64,
        /// Restrict to one suite; both by default
        #[arg(long)]
        suite: Option<Suite>,
        /// Holds `<exp>.features` and `<exp>.train.data`
        #[arg(long, default_value = "mlc-datasets")]
        data_dir: PathBuf,
        /// Holds `<exp>-<mis>.spn.json`
        #[arg(long, default_value = "mspn-models")]
        models_dir: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[command(flatten)]
        oracle: OracleArgs,
    },
    /// Ground truth and training sets for the verification benchmark
    VerifyData {
        #[command(flatten)]
        problem: ProblemArgs,
        #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
        format: TableFormat,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Verification density from a trained network and a fitted tree
    VerifyDensity {
        #[command(flatten)]
        problem: ProblemArgs,
        /// ReLU network JSON
        #[arg(long)]
        relu: PathBuf,
        /// Density estimation tree JSON
        #[arg(long)]
        det: PathBuf,
        #[arg(long, default_value_t = 1e-2)]
        epsilon: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        threshold: f64,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print a provenance block, optionally summarizing a density file
    Report {
        #[arg(long)]
        density: Option<PathBuf>,
    },
}

#[derive(Args, Clone)]
struct QueryArgs {
    #[arg(long, default_value_t = 10)]
    nqueries: usize,
    /// Fraction of variables per query, in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    hardness: f64,
    /// Attempt budget; 0 disables it
    #[arg(long, default_value_t = QueryParams::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u64,
    /// Fail on a singular point system instead of resampling
    #[arg(long)]
    abort_on_degenerate: bool,
}

impl QueryArgs {
    fn params(&self) -> QueryParams {
        let mut p = QueryParams::new(self.nqueries, self.hardness);
        p.max_attempts = (self.max_attempts > 0).then_some(self.max_attempts);
        if self.abort_on_degenerate {
            p.on_degenerate = DegeneratePolicy::Abort;
        }
        p
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OracleKind {
    /// z3 linked into this binary
    Z3,
    /// External z3 process over SMT-LIB
    Z3Process,
}

#[derive(Args, Clone)]
struct OracleArgs {
    #[arg(long, value_enum, default_value_t = OracleKind::Z3)]
    oracle: OracleKind,
    /// Solver binary for `--oracle z3-process`
    #[arg(long, default_value = "z3")]
    z3_path: String,
    /// Per-check solver timeout
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl OracleArgs {
    fn build(&self) -> Box<dyn SatOracle> {
        let timeout = self.timeout_ms.map(Duration::from_millis);
        match self.oracle {
            OracleKind::Z3 => Box::new(Z3Oracle::new(Z3Cfg { timeout })),
            OracleKind::Z3Process => Box::new(SmtProcessOracle::z3(self.z3_path.clone(), timeout)),
        }
    }
}

#[derive(Args, Clone)]
struct ProblemArgs {
    #[arg(long, default_value_t = 3)]
    xdim: usize,
    #[arg(long, default_value_t = 1)]
    ydim: usize,
    #[arg(long, default_value_t = 3)]
    ncl: usize,
    #[arg(long, default_value_t = 2)]
    nhyper: usize,
    #[arg(long, default_value_t = 666)]
    seed: u64,
    #[arg(long, default_value_t = 10_000)]
    nn_train: usize,
    #[arg(long, default_value_t = 1_000)]
    nn_test: usize,
    #[arg(long, default_value_t = 1_000)]
    det_train: usize,
    #[arg(long, default_value_t = 100)]
    det_valid: usize,
}

impl ProblemArgs {
    fn params(&self, epsilon: f64, threshold: f64) -> VerifyParams {
        VerifyParams {
            xdim: self.xdim,
            ydim: self.ydim,
            ncl: self.ncl,
            nhyper: self.nhyper,
            epsilon,
            threshold,
            seed: self.seed,
            nn_train: self.nn_train,
            nn_test: self.nn_test,
            det_train: self.det_train,
            det_valid: self.det_valid,
        }
    }
}

fn main() -> Result<()> {
    let cmd = Cmd::parse();
    let level = match cmd.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    SubscriberBuilder::default()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    match cmd.action {
        Action::Queries {
            dim,
            lo,
            hi,
            query,
            seed,
            oracle,
            out,
        } => queries(dim, lo, hi, query.params(), seed, &oracle, &out),
        Action::Mspn {
            min_inst_slices,
            query,
            seed,
            suite,
            data_dir,
            models_dir,
            out_dir,
            oracle,
        } => {
            let params = MspnParams {
                min_inst_slices,
                seed,
                query: query.params(),
            };
            let suites = suite.map_or_else(|| Suite::ALL.to_vec(), |s| vec![s]);
            mspn(&params, &suites, &data_dir, &models_dir, &out_dir, &oracle)
        }
        Action::VerifyData {
            problem,
            format,
            out_dir,
        } => verify_data(&problem.params(1e-2, 0.0), format, &out_dir),
        Action::VerifyDensity {
            problem,
            relu,
            det,
            epsilon,
            threshold,
            out_dir,
        } => verify_density(&problem.params(epsilon, threshold), &relu, &det, &out_dir),
        Action::Report { density } => report(density.as_deref()),
    }
}

#[derive(Serialize)]
struct QueriesRun<'a> {
    dim: usize,
    lo: f64,
    hi: f64,
    seed: u64,
    query: &'a QueryParams,
}

fn queries(
    dim: usize,
    lo: f64,
    hi: f64,
    params: QueryParams,
    seed: u64,
    oracle: &OracleArgs,
    out: &Path,
) -> Result<()> {
    use rand::{rngs::StdRng, SeedableRng};

    tracing::info!(dim, lo, hi, nqueries = params.nqueries, hardness = params.hardness, seed, "queries");
    let bbox = BoundingBox::cube(dim, lo, hi)?;
    let domain = Domain::from_box("x", &bbox);
    let support = domain.bounds_formula();
    let names = domain.real_symbols();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut solver = oracle.build();
    let set = generate_queries(&bbox, &names, &support, params.clone(), &mut solver, &mut rng)?;
    tracing::info!(accepted = set.len(), attempts = set.stats.attempts, "queries done");

    let density = Density::new(domain, support, Term::Const(1.0), set.formulas());
    density
        .write_to(out)
        .with_context(|| format!("writing {}", out.display()))?;
    let run = QueriesRun {
        dim,
        lo,
        hi,
        seed,
        query: &params,
    };
    write_sidecar(out, Payload::new(&run)?.with_stats(&set.stats)?)?;
    Ok(())
}

fn mspn(
    params: &MspnParams,
    suites: &[Suite],
    data_dir: &Path,
    models_dir: &Path,
    out_dir: &Path,
    oracle: &OracleArgs,
) -> Result<()> {
    params.validate()?;
    let mut solver = oracle.build();
    for &suite in suites {
        let folder = out_dir.join(params.folder_name(suite));
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("creating {}", folder.display()))?;
        for exp in suite.experiments() {
            let out = folder.join(params.file_name(exp));
            if out.is_file() {
                tracing::warn!("{} exists. Skipping.", out.display());
                continue;
            }
            let structure = models_dir.join(params.structure_file_name(exp));
            if !structure.is_file() {
                tracing::warn!(experiment = exp, "no learned structure at {}. Skipping.", structure.display());
                continue;
            }

            tracing::info!(experiment = exp, "parsing data");
            let feats_path = data_dir.join(format!("{exp}.features"));
            let text = std::fs::read_to_string(&feats_path)
                .with_context(|| format!("reading {}", feats_path.display()))?;
            let features = parse_features(&text)
                .with_context(|| format!("parsing {}", feats_path.display()))?;
            let ranges = data::real_ranges(&data_dir.join(format!("{exp}.train.data")), &features)?;

            tracing::info!(experiment = exp, "encoding MSPN({})", params.min_inst_slices);
            let spn: SpnNode = read_json(&structure)?;
            let bench = build_benchmark(&features, &ranges, &spn, params, &mut solver)
                .with_context(|| format!("building {exp}"))?;
            bench
                .density
                .write_to(&out)
                .with_context(|| format!("writing {}", out.display()))?;
            write_sidecar(
                &out,
                Payload::new(&json!({"suite": suite, "experiment": exp, "mspn": params}))?
                    .with_stats(&bench.stats)?,
            )?;
        }
    }
    Ok(())
}

fn verify_data(params: &VerifyParams, format: TableFormat, out_dir: &Path) -> Result<()> {
    let folder = out_dir.join(params.folder_name());
    tracing::info!(
        xdim = params.xdim,
        ydim = params.ydim,
        ncl = params.ncl,
        nhyper = params.nhyper,
        "generating ground truth"
    );
    let (prior, truth) = setup(params)?;
    let sets = datasets(params, &prior, &truth)?;

    let truth_path = folder.join("ground-truth.json");
    let truth_doc = json!({
        "prior": prior,
        "halfspaces": truth.halfspaces.iter().map(|h| json!({
            "w": h.w.iter().collect::<Vec<_>>(),
            "factors": h.factors.row_iter().map(|r| r.iter().copied().collect::<Vec<_>>()).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    });
    std::fs::create_dir_all(&folder).with_context(|| format!("creating {}", folder.display()))?;
    std::fs::write(&truth_path, serde_json::to_vec_pretty(&truth_doc)?)
        .with_context(|| format!("writing {}", truth_path.display()))?;
    write_sidecar(&truth_path, Payload::new(params)?)?;

    for (name, ds) in [
        ("nn-train", &sets.nn_train),
        ("nn-test", &sets.nn_test),
        ("det-train", &sets.det_train),
        ("det-valid", &sets.det_valid),
    ] {
        let path = folder.join(format!("{name}.{}", format.extension()));
        let mut df = data::dataset_frame(ds)?;
        data::write_frame(&mut df, &path, format)?;
        tracing::info!(rows = ds.len(), "wrote {}", path.display());
        write_sidecar(&path, Payload::new(&json!({"problem": params, "split": name}))?)?;
    }
    Ok(())
}

fn verify_density(params: &VerifyParams, relu: &Path, det: &Path, out_dir: &Path) -> Result<()> {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let out = out_dir
        .join(params.folder_name())
        .join(format!("density_{}_{}.json", stem(relu), stem(det)));
    if out.is_file() {
        tracing::warn!("{} exists. Skipping.", out.display());
        return Ok(());
    }
    let (prior, truth) = setup(params)?;
    let net: ReluNet = read_json(relu)?;
    let tree: Det = read_json(det)?;
    let density = build_density(&net, &tree, &truth, params)?;
    // Same draws as the `nn-test` split written by verify-data.
    let (_, nn_test) = sample_split(&prior, &truth, params.nn_train, params.nn_test, params.seed)?;
    let fit = model_fit(&net, &tree, &nn_test, params)?;
    density
        .write_to(&out)
        .with_context(|| format!("writing {}", out.display()))?;
    write_sidecar(
        &out,
        Payload::new(&json!({"problem": params, "relu": relu, "det": det}))?.with_stats(&fit)?,
    )?;
    Ok(())
}

fn report(density: Option<&Path>) -> Result<()> {
    let summary = match density {
        Some(path) => {
            let doc: Value = read_json(path)?;
            let Some(queries) = doc["queries"].as_array() else {
                bail!("{} is not a density file", path.display());
            };
            json!({
                "path": path,
                "variables": doc["domain"]["variables"].as_array().map_or(0, Vec::len),
                "queries": queries.len(),
            })
        }
        None => Value::Null,
    };
    let obj = json!({
        "code_rev": provenance::current_git_rev(),
        "wmigen_version": wmigen::VERSION,
        "density": summary,
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cli_parses_mspn_flags() {
        let cmd = Cmd::try_parse_from([
            "wmigen",
            "-v",
            "mspn",
            "--min-inst-slices",
            "200",
            "--nqueries",
            "5",
            "--hardness",
            "0.3",
            "--suite",
            "small",
            "--oracle",
            "z3-process",
            "--timeout-ms",
            "1500",
        ])
        .unwrap();
        assert_eq!(cmd.verbose, 1);
        match cmd.action {
            Action::Mspn {
                min_inst_slices,
                query,
                suite,
                oracle,
                ..
            } => {
                assert_eq!(min_inst_slices, 200);
                assert_eq!(query.params().nqueries, 5);
                assert_eq!(suite, Some(Suite::Small));
                assert_eq!(oracle.oracle, OracleKind::Z3Process);
                assert_eq!(oracle.timeout_ms, Some(1500));
            }
            _ => panic!("expected mspn"),
        }
    }

    #[test]
    fn zero_max_attempts_means_unbounded() {
        let args = QueryArgs {
            nqueries: 1,
            hardness: 1.0,
            max_attempts: 0,
            abort_on_degenerate: true,
        };
        let p = args.params();
        assert_eq!(p.max_attempts, None);
        assert_eq!(p.on_degenerate, DegeneratePolicy::Abort);
    }

    #[test]
    fn mspn_run_writes_and_then_skips() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        let models = dir.path().join("models");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::create_dir_all(&models).unwrap();
        std::fs::write(data.join("iris.features"), "x: continuous.\ny: continuous.\nc: a, b.\n").unwrap();
        std::fs::write(data.join("iris.train.data"), "0.0,1.0,a\n2.0,3.0,b\n1.0,2.0,a\n").unwrap();
        let spn = json!({"type": "product", "children": [
            {"type": "leaf", "scope": [0], "densities": [0.5], "breaks": [0.0, 2.0]},
            {"type": "leaf", "scope": [1], "densities": [0.5], "breaks": [1.0, 3.0]},
            {"type": "leaf", "scope": [2], "densities": [0.4, 0.6]}
        ]});
        std::fs::write(models.join("iris-20.spn.json"), spn.to_string()).unwrap();

        let params = MspnParams {
            min_inst_slices: 20,
            seed: 1,
            query: QueryParams::new(3, 0.5),
        };
        let oracle = OracleArgs {
            oracle: OracleKind::Z3,
            z3_path: "z3".into(),
            timeout_ms: None,
        };
        let out = dir.path().join("out");
        mspn(&params, &[Suite::Small], &data, &models, &out, &oracle).unwrap();
        let written = out.join("small-mspns-20-3-0.5-1").join("iris-20.json");
        let doc: Value = read_json(&written).unwrap();
        assert_eq!(doc["queries"].as_array().unwrap().len(), 3);
        assert_eq!(doc["domain"]["var_domains"]["x"], json!([0.0, 2.0]));
        assert!(out.join("small-mspns-20-3-0.5-1").join("iris-20.provenance.json").is_file());

        let before = std::fs::read(&written).unwrap();
        mspn(&params, &[Suite::Small], &data, &models, &out, &oracle).unwrap();
        assert_eq!(std::fs::read(&written).unwrap(), before);
    }

    #[test]
    fn oracle_defaults_to_linked_z3() {
        let cmd = Cmd::try_parse_from(["wmigen", "queries", "--out", "q.json"]).unwrap();
        match cmd.action {
            Action::Queries { oracle, .. } => {
                assert_eq!(oracle.oracle, OracleKind::Z3);
                assert_eq!(oracle.timeout_ms, None);
            }
            _ => panic!("expected queries"),
        }
    }

    #[test]
    fn verify_density_records_model_fit() {
        let dir = tempdir().unwrap();
        let relu = dir.path().join("net.json");
        let det = dir.path().join("tree.json");
        std::fs::write(
            &relu,
            json!({"layers": [
                {"weights": [[1.0, 0.0, 0.0], [0.0, 1.0, 1.0]], "bias": [0.0, 0.0]},
                {"weights": [[0.5, -0.5]], "bias": [0.1]}
            ]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            &det,
            json!({"bounds": [[-3.0, 3.0], [-3.0, 3.0], [-3.0, 3.0]],
                   "tree": {"type": "leaf", "density": 0.25}})
            .to_string(),
        )
        .unwrap();
        let params = VerifyParams {
            nn_train: 20,
            nn_test: 6,
            det_train: 10,
            det_valid: 2,
            ..VerifyParams::default()
        };
        let out = dir.path().join("out");
        verify_density(&params, &relu, &det, &out).unwrap();
        let written = out.join("pfv-3-1-3-2").join("density_net_tree.json");
        let doc: Value = read_json(&written).unwrap();
        assert_eq!(doc["queries"].as_array().unwrap().len(), 4);
        let sidecar: Value = read_json(&out.join("pfv-3-1-3-2").join("density_net_tree.provenance.json")).unwrap();
        assert_eq!(sidecar["stats"]["points"], json!(6));
        let within = sidecar["stats"]["within_epsilon"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&within));
    }
}
