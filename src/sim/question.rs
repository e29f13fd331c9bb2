//! Question and target generation
//!
//! A question is a small arithmetic expression plus four answer options: the
//! correct one and three distractors near it. Each option becomes a target.

use std::fmt;

use glam::Vec2;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::state::Target;
use crate::Viewport;
use crate::consts::{OPTION_COUNT, SPAWN_CIRCLE_RADIUS, TARGET_RADIUS};
use crate::settings::{Difficulty, Operation};

/// Binary operators used in prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }

    fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '×',
            BinOp::Div => '÷',
        }
    }

    /// Left-associative only: `a - (b - c)` needs its parentheses
    fn is_associative(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Mul)
    }
}

/// Arithmetic expression tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Num(i64),
    Bin {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate with floor division. `None` on division by zero or overflow.
    pub fn eval(&self) -> Option<i64> {
        match self {
            Expr::Num(n) => Some(*n),
            Expr::Bin { op, lhs, rhs } => {
                let (l, r) = (lhs.eval()?, rhs.eval()?);
                match op {
                    BinOp::Add => l.checked_add(r),
                    BinOp::Sub => l.checked_sub(r),
                    BinOp::Mul => l.checked_mul(r),
                    BinOp::Div => {
                        if r == 0 {
                            None
                        } else {
                            Some(l.div_euclid(r))
                        }
                    }
                }
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Num(_) => u8::MAX,
            Expr::Bin { op, .. } => op.precedence(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Bin { op, lhs, rhs } => {
                let wrap_lhs = lhs.precedence() < op.precedence();
                let wrap_rhs = rhs.precedence() < op.precedence()
                    || (rhs.precedence() == op.precedence() && !op.is_associative());

                if wrap_lhs {
                    write!(f, "({lhs})")?;
                } else {
                    write!(f, "{lhs}")?;
                }
                write!(f, " {} ", op.symbol())?;
                if wrap_rhs {
                    write!(f, "({rhs})")
                } else {
                    write!(f, "{rhs}")
                }
            }
        }
    }
}

/// A generated problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub expr: Expr,
    pub answer: i64,
    /// Shuffled; exactly one equals `answer`
    pub options: [i64; OPTION_COUNT],
}

/// Operand ranges for one difficulty tier (inclusive)
#[derive(Debug, Clone, Copy)]
struct TierRanges {
    add: (i64, i64),
    mul: (i64, i64),
    divisor: (i64, i64),
    quotient: (i64, i64),
    mixed: (i64, i64),
    /// Target drift speed (px per nominal frame)
    speed: f32,
}

const TIERS: [TierRanges; 3] = [
    // Easy
    TierRanges {
        add: (1, 20),
        mul: (1, 10),
        divisor: (1, 5),
        quotient: (1, 10),
        mixed: (2, 5),
        speed: 1.0,
    },
    // Medium
    TierRanges {
        add: (1, 50),
        mul: (2, 12),
        divisor: (2, 10),
        quotient: (2, 12),
        mixed: (2, 9),
        speed: 1.5,
    },
    // Hard
    TierRanges {
        add: (1, 100),
        mul: (2, 20),
        divisor: (2, 12),
        quotient: (2, 20),
        mixed: (2, 12),
        speed: 2.0,
    },
];

const DISTRACTOR_COUNT: usize = OPTION_COUNT - 1;
/// Failed distractor draws before the offset bound doubles
const WIDEN_EVERY: u32 = 16;
/// Failed draws before falling back to a deterministic fill
const MAX_DISTRACTOR_ATTEMPTS: u32 = 256;

fn pick(rng: &mut impl Rng, (lo, hi): (i64, i64)) -> i64 {
    rng.random_range(lo..=hi)
}

/// Generate a question for the given tier and operation
pub fn generate(difficulty: Difficulty, operation: Operation, rng: &mut impl Rng) -> Question {
    let tier = TIERS[difficulty.tier()];

    let expr = match operation {
        Operation::Addition => {
            Expr::bin(BinOp::Add, Expr::Num(pick(rng, tier.add)), Expr::Num(pick(rng, tier.add)))
        }
        Operation::Subtraction => {
            let (a, b) = (pick(rng, tier.add), pick(rng, tier.add));
            let (mut a, b) = if a < b { (b, a) } else { (a, b) };
            // Equal operands would give 0, which can't be a positive option
            if a == b {
                a += 1;
            }
            Expr::bin(BinOp::Sub, Expr::Num(a), Expr::Num(b))
        }
        Operation::Multiplication => {
            Expr::bin(BinOp::Mul, Expr::Num(pick(rng, tier.mul)), Expr::Num(pick(rng, tier.mul)))
        }
        Operation::Division => {
            let divisor = pick(rng, tier.divisor);
            let quotient = pick(rng, tier.quotient);
            Expr::bin(BinOp::Div, Expr::Num(divisor * quotient), Expr::Num(divisor))
        }
        Operation::Mixed => mixed_expr(rng, tier.mixed),
    };

    // Every template above evaluates to a positive integer
    let answer = expr.eval().unwrap_or(1).max(1);

    let mut options = [answer; OPTION_COUNT];
    options[1..].copy_from_slice(&distractors(answer, rng));
    options.shuffle(rng);

    let prompt = format!("{expr} = ?");
    log::debug!("Generated question {prompt} (answer {answer})");

    Question {
        prompt,
        expr,
        answer,
        options,
    }
}

/// One of the compound templates; all operands come from `range` (lo >= 2)
fn mixed_expr(rng: &mut impl Rng, range: (i64, i64)) -> Expr {
    let a = pick(rng, range);
    let b = pick(rng, range);
    let c = pick(rng, range);

    match rng.random_range(0..4) {
        // a + b × c
        0 => Expr::bin(
            BinOp::Add,
            Expr::Num(a),
            Expr::bin(BinOp::Mul, Expr::Num(b), Expr::Num(c)),
        ),
        // (a + b) × c
        1 => Expr::bin(
            BinOp::Mul,
            Expr::bin(BinOp::Add, Expr::Num(a), Expr::Num(b)),
            Expr::Num(c),
        ),
        // a × b - c, with c < a × b
        2 => {
            let c = rng.random_range(1..a * b);
            Expr::bin(
                BinOp::Sub,
                Expr::bin(BinOp::Mul, Expr::Num(a), Expr::Num(b)),
                Expr::Num(c),
            )
        }
        // a × b ÷ c (floor), with c <= a × b
        _ => {
            let c = rng.random_range(range.0..=range.1.min(a * b));
            Expr::bin(
                BinOp::Div,
                Expr::bin(BinOp::Mul, Expr::Num(a), Expr::Num(b)),
                Expr::Num(c),
            )
        }
    }
}

/// Three distinct positive values near `answer`, none equal to it
fn distractors(answer: i64, rng: &mut impl Rng) -> [i64; DISTRACTOR_COUNT] {
    let mut found: Vec<i64> = Vec::with_capacity(DISTRACTOR_COUNT);
    let mut bound = 10.max(answer.saturating_abs() * 3 / 10);
    let mut attempts = 0;

    while found.len() < DISTRACTOR_COUNT && attempts < MAX_DISTRACTOR_ATTEMPTS {
        attempts += 1;
        if attempts % WIDEN_EVERY == 0 {
            bound = bound.saturating_mul(2);
        }

        let offset = rng.random_range(1..=bound);
        let candidate = if rng.random_bool(0.5) {
            answer.saturating_add(offset)
        } else {
            answer.saturating_sub(offset)
        };

        if candidate != answer && candidate > 0 && !found.contains(&candidate) {
            found.push(candidate);
        }
    }

    if found.len() < DISTRACTOR_COUNT {
        log::warn!("Distractor search exhausted for answer {answer}, filling sequentially");
        let mut candidate = 1;
        while found.len() < DISTRACTOR_COUNT {
            if candidate != answer && !found.contains(&candidate) {
                found.push(candidate);
            }
            candidate += 1;
        }
    }

    let mut out = [0; DISTRACTOR_COUNT];
    out.copy_from_slice(&found);
    out
}

/// Lay out one target per option, evenly around the viewport center
pub fn spawn_targets(
    question: &Question,
    difficulty: Difficulty,
    viewport: Viewport,
    first_id: u32,
    rng: &mut impl Rng,
) -> Vec<Target> {
    let speed = TIERS[difficulty.tier()].speed;
    let center = viewport.center();
    let count = question.options.len();

    question
        .options
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let angle = std::f32::consts::TAU * i as f32 / count as f32;
            let pos = center + Vec2::new(angle.cos(), angle.sin()) * SPAWN_CIRCLE_RADIUS;

            Target {
                id: first_id + i as u32,
                value,
                pos: clamp_into(pos, TARGET_RADIUS, viewport),
                vel: Vec2::new(
                    (rng.random::<f32>() - 0.5) * speed,
                    (rng.random::<f32>() - 0.5) * speed,
                ),
                radius: TARGET_RADIUS,
                is_correct: value == question.answer,
                is_shot: false,
            }
        })
        .collect()
}

/// Clamp a position so a circle of `radius` stays inside the viewport.
/// Axes too small to fit the circle collapse to the center.
fn clamp_into(pos: Vec2, radius: f32, viewport: Viewport) -> Vec2 {
    let axis = |v: f32, dim: f32| {
        if dim < radius * 2.0 {
            dim / 2.0
        } else {
            v.clamp(radius, dim - radius)
        }
    };
    Vec2::new(axis(pos.x, viewport.width), axis(pos.y, viewport.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn assert_valid(q: &Question) {
        assert!(q.answer > 0, "{}: answer {}", q.prompt, q.answer);
        assert_eq!(q.options.iter().filter(|&&o| o == q.answer).count(), 1);
        for (i, a) in q.options.iter().enumerate() {
            assert!(*a > 0, "{}: option {a}", q.prompt);
            for b in &q.options[i + 1..] {
                assert_ne!(a, b, "{}: duplicate option", q.prompt);
            }
        }
        assert_eq!(q.expr.eval(), Some(q.answer));
    }

    #[test]
    fn test_all_tiers_and_operations_valid() {
        let mut rng = Pcg32::seed_from_u64(7);
        for difficulty in Difficulty::ALL {
            for operation in Operation::ALL {
                for _ in 0..200 {
                    assert_valid(&generate(difficulty, operation, &mut rng));
                }
            }
        }
    }

    #[test]
    fn test_subtraction_non_negative() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..500 {
            let q = generate(Difficulty::Hard, Operation::Subtraction, &mut rng);
            let Expr::Bin { op: BinOp::Sub, lhs, rhs } = &q.expr else {
                panic!("expected subtraction, got {}", q.prompt);
            };
            assert!(rhs.eval() <= lhs.eval());
            assert!(q.answer >= 0);
        }
    }

    #[test]
    fn test_division_is_exact() {
        let mut rng = Pcg32::seed_from_u64(13);
        for difficulty in Difficulty::ALL {
            for _ in 0..200 {
                let q = generate(difficulty, Operation::Division, &mut rng);
                let Expr::Bin { op: BinOp::Div, lhs, rhs } = &q.expr else {
                    panic!("expected division, got {}", q.prompt);
                };
                let (dividend, divisor) = (lhs.eval().unwrap(), rhs.eval().unwrap());
                assert_eq!(dividend, divisor * q.answer);
            }
        }
    }

    #[test]
    fn test_precedence_and_floor_division() {
        // 2 + 3 × 4 = 14
        let e = Expr::bin(
            BinOp::Add,
            Expr::Num(2),
            Expr::bin(BinOp::Mul, Expr::Num(3), Expr::Num(4)),
        );
        assert_eq!(e.eval(), Some(14));
        assert_eq!(e.to_string(), "2 + 3 × 4");

        // (2 + 3) × 4 = 20
        let e = Expr::bin(
            BinOp::Mul,
            Expr::bin(BinOp::Add, Expr::Num(2), Expr::Num(3)),
            Expr::Num(4),
        );
        assert_eq!(e.eval(), Some(20));
        assert_eq!(e.to_string(), "(2 + 3) × 4");

        // 3 × 5 ÷ 4 = 3
        let e = Expr::bin(
            BinOp::Div,
            Expr::bin(BinOp::Mul, Expr::Num(3), Expr::Num(5)),
            Expr::Num(4),
        );
        assert_eq!(e.eval(), Some(3));
        assert_eq!(e.to_string(), "3 × 5 ÷ 4");

        assert_eq!(Expr::bin(BinOp::Div, Expr::Num(1), Expr::Num(0)).eval(), None);
    }

    #[test]
    fn test_distractors_terminate_for_tiny_answer() {
        let mut rng = Pcg32::seed_from_u64(3);
        for _ in 0..100 {
            let d = distractors(1, &mut rng);
            assert!(d.iter().all(|&v| v > 1));
        }
    }

    #[test]
    fn test_spawn_targets_on_circle() {
        let mut rng = Pcg32::seed_from_u64(5);
        let q = generate(Difficulty::Easy, Operation::Addition, &mut rng);
        let viewport = Viewport::new(800.0, 600.0);
        let targets = spawn_targets(&q, Difficulty::Easy, viewport, 10, &mut rng);

        assert_eq!(targets.len(), OPTION_COUNT);
        assert_eq!(targets.iter().filter(|t| t.is_correct).count(), 1);
        assert_eq!(targets[0].id, 10);
        for t in &targets {
            let dist = t.pos.distance(viewport.center());
            assert!((dist - SPAWN_CIRCLE_RADIUS).abs() < 0.01);
            assert!(!t.is_shot);
        }
    }

    #[test]
    fn test_spawn_targets_tiny_viewport_stays_inside() {
        let mut rng = Pcg32::seed_from_u64(5);
        let q = generate(Difficulty::Hard, Operation::Mixed, &mut rng);
        let viewport = Viewport::new(200.0, 60.0);
        for t in spawn_targets(&q, Difficulty::Hard, viewport, 1, &mut rng) {
            assert!(t.pos.x >= t.radius && t.pos.x <= viewport.width - t.radius);
            assert_eq!(t.pos.y, 30.0);
        }
    }

    proptest! {
        #[test]
        fn prop_generate_valid(seed in any::<u64>(), d in 0usize..3, op in 0usize..5) {
            let mut rng = Pcg32::seed_from_u64(seed);
            assert_valid(&generate(Difficulty::ALL[d], Operation::ALL[op], &mut rng));
        }

        #[test]
        fn prop_distractors_valid(seed in any::<u64>(), answer in 1i64..1_000_000) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let d = distractors(answer, &mut rng);
            prop_assert!(d.iter().all(|&v| v > 0 && v != answer));
            prop_assert!(d[0] != d[1] && d[1] != d[2] && d[0] != d[2]);
        }
    }
}
