//! Acceptance-rate timing run for the query generator.
//!
//! Purpose
//! - Show how often random hyperplanes miss a support that covers only a
//!   corner of the box, for a few hardness values.
//!
//! Support: `[0,1]^n` cut by `Σ x_i >= 0.8 n`. Box-only supports accept
//! nearly everything, so the cut makes rejections visible.

use std::time::Instant;

use rand::{rngs::StdRng, SeedableRng};
use wmigen::api::{generate_queries, BoundingBox, Domain, Formula, QueryParams, Term, Z3Oracle};

fn main() {
    let n = 5;
    let bbox = BoundingBox::cube(n, 0.0, 1.0).expect("valid box");
    let domain = Domain::from_box("x", &bbox);
    let names = domain.real_symbols();
    let corner = Formula::Le(
        Term::Const(0.8 * n as f64),
        Term::weighted_sum(names.iter().map(|v| (1.0, v.as_str()))),
    );
    let support = Formula::and_all([domain.bounds_formula(), corner]);

    for hardness in [0.2, 0.5, 1.0] {
        let mut rng = StdRng::seed_from_u64(666);
        let start = Instant::now();
        let set = generate_queries(
            &bbox,
            &names,
            &support,
            QueryParams::new(20, hardness),
            &mut Z3Oracle::default(),
            &mut rng,
        )
        .expect("queries");
        let ms = start.elapsed().as_secs_f64() * 1e3;
        println!(
            "n={n} hardness={hardness} accepted={} attempts={} unsat={} degenerate={} ms={ms:.1}",
            set.len(),
            set.stats.attempts,
            set.stats.unsat,
            set.stats.degenerate
        );
    }
}
